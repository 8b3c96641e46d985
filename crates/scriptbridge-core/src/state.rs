//! The embedded runtime state.
//!
//! [`State`] owns the value stack, the global table and the registry of
//! per-type records. Field access and calls follow metatable semantics:
//!
//! - reading a missing field consults `__index` (a table to continue the
//!   lookup in, or a function called with the object and key)
//! - writing a field that is not already present consults `__newindex`
//! - calling a non-function consults `__call`, passing the callee first
//!
//! Native calls run on a shared stack. Each call gets a frame that is
//! truncated when the call returns, whether it succeeded or failed, so the
//! stack is balanced after every operation.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};
use std::rc::Rc;

use log::{debug, trace};
use rustc_hash::FxHashMap;

use crate::call_context::CallContext;
use crate::config::Config;
use crate::error::ScriptError;
use crate::function::Function;
use crate::table::Table;
use crate::type_hash::TypeHash;
use crate::value::Value;

/// Maximum nesting of native calls.
pub const MAX_CALL_DEPTH: usize = 200;

/// Maximum number of `__index`/`__newindex` table hops for one access.
const MAX_META_CHAIN: usize = 100;

/// A runtime instance.
pub struct State {
    stack: Vec<Value>,
    globals: Table,
    registry: FxHashMap<TypeHash, Rc<dyn Any>>,
    config: Config,
    depth: usize,
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

impl State {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        debug!("opening state: {:?}", config);
        Self {
            stack: Vec::new(),
            globals: Table::new(),
            registry: FxHashMap::default(),
            config,
            depth: 0,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The global table.
    pub fn globals(&self) -> &Table {
        &self.globals
    }

    /// Current stack height. Zero between top-level operations.
    pub fn stack_len(&self) -> usize {
        self.stack.len()
    }

    pub(crate) fn stack_slot(&self, index: usize) -> Option<&Value> {
        self.stack.get(index)
    }

    pub(crate) fn push_slot(&mut self, value: Value) {
        self.stack.push(value);
    }

    // ========================================================================
    // Registry
    // ========================================================================

    /// Look up a registry record and downcast it to `T`.
    pub fn registry_get<T: Any>(&self, key: TypeHash) -> Option<Rc<T>> {
        self.registry.get(&key)?.clone().downcast::<T>().ok()
    }

    /// Store a registry record, replacing any previous one.
    pub fn registry_set(&mut self, key: TypeHash, value: Rc<dyn Any>) {
        if self.registry.insert(key, value).is_some() {
            trace!("registry slot {} replaced", key);
        }
    }

    pub fn registry_contains(&self, key: TypeHash) -> bool {
        self.registry.contains_key(&key)
    }

    // ========================================================================
    // Globals
    // ========================================================================

    pub fn get_global(&mut self, name: &str) -> Result<Value, ScriptError> {
        let globals = Value::Table(self.globals.clone());
        self.get_field(&globals, name)
    }

    pub fn set_global(&mut self, name: &str, value: impl Into<Value>) -> Result<(), ScriptError> {
        let globals = Value::Table(self.globals.clone());
        self.set_field(&globals, name, value)
    }

    /// Call the global function `name`.
    pub fn call_global(
        &mut self,
        name: &str,
        args: impl IntoIterator<Item = Value>,
    ) -> Result<Vec<Value>, ScriptError> {
        let callee = self.get_global(name)?;
        self.call(&callee, args)
    }

    // ========================================================================
    // Field access
    // ========================================================================

    /// Read `object[name]`, honoring `__index`.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn get_field(&mut self, object: &Value, name: &str) -> Result<Value, ScriptError> {
        let mut current = object.clone();
        for _ in 0..MAX_META_CHAIN {
            match &current {
                Value::Table(t) => {
                    let raw = t.raw_get(name);
                    if !raw.is_nil() {
                        return Ok(raw);
                    }
                }
                Value::Userdata(_) => {}
                other => {
                    return Err(ScriptError::NotIndexable {
                        type_name: other.type_name(),
                    });
                }
            }

            let handler = metatable_of(&current)
                .map(|mt| mt.raw_get("__index"))
                .unwrap_or_default();
            match handler {
                Value::Nil if current.as_table().is_some() => return Ok(Value::Nil),
                Value::Nil => {
                    return Err(ScriptError::NotIndexable {
                        type_name: current.type_name(),
                    });
                }
                Value::Function(f) => {
                    let results = self.invoke(&f, vec![current, Value::from(name)])?;
                    return Ok(results.into_iter().next().unwrap_or_default());
                }
                next => current = next,
            }
        }
        Err(ScriptError::runtime("'__index' chain too long; possible loop"))
    }

    /// Write `object[name] = value`, honoring `__newindex`.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn set_field(
        &mut self,
        object: &Value,
        name: &str,
        value: impl Into<Value>,
    ) -> Result<(), ScriptError> {
        let value = value.into();
        let mut current = object.clone();
        for _ in 0..MAX_META_CHAIN {
            if let Value::Table(t) = &current
                && t.contains_key(name)
            {
                t.raw_set(name, value);
                return Ok(());
            }

            let handler = metatable_of(&current)
                .map(|mt| mt.raw_get("__newindex"))
                .unwrap_or_default();
            match handler {
                Value::Function(f) => {
                    self.invoke(&f, vec![current, Value::from(name), value])?;
                    return Ok(());
                }
                Value::Nil => {
                    return match &current {
                        Value::Table(t) => {
                            t.raw_set(name, value);
                            Ok(())
                        }
                        other => Err(ScriptError::NotIndexable {
                            type_name: other.type_name(),
                        }),
                    };
                }
                next => current = next,
            }
        }
        Err(ScriptError::runtime("'__newindex' chain too long; possible loop"))
    }

    /// The script-visible metatable of `value`.
    ///
    /// A metatable carrying a `__metatable` field is protected: its value is
    /// returned in place of the metatable itself.
    pub fn get_metatable(&self, value: &Value) -> Option<Value> {
        let mt = metatable_of(value)?;
        let protected = mt.raw_get("__metatable");
        if protected.is_nil() {
            Some(Value::Table(mt))
        } else {
            Some(protected)
        }
    }

    // ========================================================================
    // Calls
    // ========================================================================

    /// Call `callee` with `args`, returning its results.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn call(
        &mut self,
        callee: &Value,
        args: impl IntoIterator<Item = Value>,
    ) -> Result<Vec<Value>, ScriptError> {
        match callee {
            Value::Function(f) => self.invoke(f, args.into_iter().collect()),
            Value::Table(_) | Value::Userdata(_) => {
                let handler = metatable_of(callee)
                    .map(|mt| mt.raw_get("__call"))
                    .unwrap_or_default();
                match handler {
                    Value::Function(f) => {
                        let full = std::iter::once(callee.clone()).chain(args).collect();
                        self.invoke(&f, full)
                    }
                    _ => Err(ScriptError::NotCallable {
                        type_name: callee.type_name(),
                    }),
                }
            }
            other => Err(ScriptError::NotCallable {
                type_name: other.type_name(),
            }),
        }
    }

    /// Call `object:name(args...)`: look the method up and pass `object`
    /// as the first argument.
    pub fn call_method(
        &mut self,
        object: &Value,
        name: &str,
        args: impl IntoIterator<Item = Value>,
    ) -> Result<Vec<Value>, ScriptError> {
        let method = self.get_field(object, name)?;
        if method.is_nil() {
            return Err(ScriptError::MethodNotFound {
                name: name.to_string(),
            });
        }
        let full: Vec<Value> = std::iter::once(object.clone()).chain(args).collect();
        self.call(&method, full)
    }

    fn invoke(&mut self, function: &Function, args: Vec<Value>) -> Result<Vec<Value>, ScriptError> {
        if self.depth >= MAX_CALL_DEPTH {
            return Err(ScriptError::runtime("stack overflow"));
        }

        let base = self.stack.len();
        let arg_count = args.len();
        self.stack.extend(args);
        self.depth += 1;
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            let mut ctx = CallContext::new(self, base, arg_count);
            function.invoke(&mut ctx)
        }));
        self.depth -= 1;
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(payload) => {
                // frame is unwound before the panic continues
                self.stack.truncate(base);
                resume_unwind(payload)
            }
        };

        let results = outcome.map(|count| {
            let top = self.stack.len();
            let available = top.saturating_sub(base + arg_count);
            self.stack.split_off(top - count.min(available))
        });
        self.stack.truncate(base);
        results
    }
}

impl Drop for State {
    fn drop(&mut self) {
        trace!(
            "closing state: {} registry records, {} globals",
            self.registry.len(),
            self.globals.len()
        );
        self.stack.clear();
        self.registry.clear();
        self.globals.clear();
    }
}

fn metatable_of(value: &Value) -> Option<Table> {
    match value {
        Value::Table(t) => t.metatable(),
        Value::Userdata(u) => u.metatable(),
        _ => None,
    }
}
