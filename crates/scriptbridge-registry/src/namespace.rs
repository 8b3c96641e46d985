//! Fluent registration of namespaces and their members.
//!
//! # Example
//!
//! ```
//! use scriptbridge_core::{State, Value};
//! use scriptbridge_registry::get_global_namespace;
//!
//! fn add(a: i32, b: i32) -> i32 {
//!     a + b
//! }
//!
//! let mut state = State::new();
//! get_global_namespace(&mut state)
//!     .begin_namespace("math")
//!     .add_function("add", add)
//!     .end_namespace()
//!     .unwrap();
//!
//! let math = state.get_global("math").unwrap();
//! let f = state.get_field(&math, "add").unwrap();
//! let sum = state.call(&f, [Value::Integer(2), Value::Integer(3)]).unwrap();
//! assert_eq!(sum, vec![Value::Integer(5)]);
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use log::debug;
use petgraph::graph::NodeIndex;
use scriptbridge_core::{
    CallContext, FromValue, Function, IntoResults, IntoValue, NativeResult, State, Table, TypeHash,
    Value,
};

use crate::callable::{Callable, CallableKind};
use crate::class_builder::ClassBuilder;
use crate::dispatch_table::{Categories, DispatchTable, Upcast};
use crate::error::RegistrationError;
use crate::namespace_tree::{NamespaceTree, Scope};
use crate::registered_type::RegisteredType;
use crate::signature::{IntoFunction, raw_function};

/// Start registering at the global scope of `state`.
pub fn get_global_namespace(state: &mut State) -> NamespaceBuilder<'_> {
    let tree = NamespaceTree::of(state);
    let root = tree.borrow().root();
    NamespaceBuilder {
        state,
        tree,
        path: vec![root],
    }
}

/// Builder positioned at one namespace.
///
/// Every method consumes the builder and returns it (or a
/// [`ClassBuilder`]), so registrations chain. Operations that can fail
/// return `Result`; a failure leaves the scope unchanged.
pub struct NamespaceBuilder<'s> {
    state: &'s mut State,
    tree: Rc<RefCell<NamespaceTree>>,
    path: Vec<NodeIndex>,
}

impl<'s> NamespaceBuilder<'s> {
    fn current(&self) -> NodeIndex {
        self.path
            .last()
            .copied()
            .unwrap_or_else(|| self.tree.borrow().root())
    }

    fn is_global(&self) -> bool {
        self.path.len() <= 1
    }

    fn scope(&self) -> Option<Scope> {
        self.tree.borrow().scope(self.current()).cloned()
    }

    fn scope_table(&self) -> Table {
        self.scope()
            .map(|scope| scope.table)
            .unwrap_or_else(|| self.state.globals().clone())
    }

    fn qualified_name(&self, name: &str) -> String {
        self.tree.borrow().qualified_name(self.current(), name)
    }

    /// Names of the open namespaces, outermost first.
    pub fn path(&self) -> Vec<String> {
        self.tree.borrow().get_namespace_path(self.current())
    }

    /// Open (or reopen) the child namespace `name`.
    pub fn begin_namespace(mut self, name: &str) -> Self {
        let hide = self.state.config().hide_metatables;
        let parent = self.current();
        let child = self
            .tree
            .borrow_mut()
            .get_or_create_child(parent, name, hide);
        self.path.push(child);
        debug!("namespace {}", self.path().join("."));
        self
    }

    /// Close the current namespace and return to its parent.
    pub fn end_namespace(mut self) -> Result<Self, RegistrationError> {
        if self.is_global() {
            return Err(RegistrationError::GlobalScope {
                operation: "endNamespace",
            });
        }
        self.path.pop();
        Ok(self)
    }

    /// Bind a native function under `name`, replacing any previous value.
    pub fn add_function<F, M>(self, name: &str, f: F) -> Self
    where
        F: IntoFunction<M>,
    {
        let function = f.into_function(&self.qualified_name(name));
        self.scope_table().raw_set(name, function);
        self
    }

    /// Bind a raw native function working on the call frame directly.
    pub fn add_cfunction<F>(self, name: &str, f: F) -> Self
    where
        F: Fn(&mut CallContext<'_>) -> NativeResult + 'static,
    {
        let function = raw_function(&self.qualified_name(name), f);
        self.scope_table().raw_set(name, function);
        self
    }

    fn scope_properties(
        &self,
        operation: &'static str,
    ) -> Result<Rc<DispatchTable>, RegistrationError> {
        if self.is_global() {
            return Err(RegistrationError::GlobalScope { operation });
        }
        self.scope()
            .map(|scope| scope.properties)
            .ok_or(RegistrationError::GlobalScope { operation })
    }

    /// Expose a shared variable as a namespace property.
    ///
    /// Reads return a copy of the current value. When `writable` is false,
    /// assignments fail with a read-only error.
    pub fn add_variable<U>(
        self,
        name: &str,
        cell: Rc<RefCell<U>>,
        writable: bool,
    ) -> Result<Self, RegistrationError>
    where
        U: Clone + IntoValue + FromValue + 'static,
    {
        let properties = self.scope_properties("addVariable")?;
        let qualified = self.qualified_name(name);
        install_variable(&properties, name, &qualified, cell, writable);
        Ok(self)
    }

    /// Expose a property backed by getter and setter functions.
    pub fn add_property<G, R, S, A>(
        self,
        name: &str,
        get: G,
        set: S,
    ) -> Result<Self, RegistrationError>
    where
        G: Fn() -> R + 'static,
        R: IntoResults,
        S: Fn(A) + 'static,
        A: FromValue,
    {
        let properties = self.scope_properties("addProperty")?;
        let qualified = self.qualified_name(name);
        install_scope_property(&properties, name, &qualified, get);
        let setter = IntoFunction::<fn(A)>::into_function(set, &qualified);
        properties.set(
            Categories::SETTER,
            name,
            Callable::new(CallableKind::Setter, setter),
        );
        Ok(self)
    }

    /// Expose a read-only property backed by a getter function.
    pub fn add_readonly_property<G, R>(self, name: &str, get: G) -> Result<Self, RegistrationError>
    where
        G: Fn() -> R + 'static,
        R: IntoResults,
    {
        let properties = self.scope_properties("addProperty")?;
        let qualified = self.qualified_name(name);
        install_scope_property(&properties, name, &qualified, get);
        properties.set(Categories::SETTER, name, Callable::read_only(name));
        Ok(self)
    }

    /// Open the class `T` under `name`.
    ///
    /// If this scope already binds `name` to the class table of `T`, the
    /// existing registration is reopened and new members add to it.
    pub fn begin_class<T: 'static>(mut self, name: &str) -> ClassBuilder<'s, T> {
        let table = self.scope_table();
        let existing = RegisteredType::lookup::<T>(self.state).filter(|record| {
            matches!(table.raw_get(name), Value::Table(t) if t.ptr_eq(record.static_table()))
        });
        let record = match existing {
            Some(record) => {
                debug!("reopening class {}", self.qualified_name(name));
                record
            }
            None => self.register_type::<T>(&table, name, None),
        };
        ClassBuilder::new(self, record)
    }

    /// Register the class `D` under `name`, inheriting the members of `B`.
    ///
    /// `B` must already be registered. `D` reaches its base object
    /// through `AsRef`/`AsMut`, which is how inherited methods receive it.
    pub fn derive_class<D, B>(
        mut self,
        name: &str,
    ) -> Result<ClassBuilder<'s, D>, RegistrationError>
    where
        D: AsRef<B> + AsMut<B> + 'static,
        B: 'static,
    {
        let base = RegisteredType::lookup::<B>(self.state).ok_or_else(|| {
            RegistrationError::BaseNotRegistered {
                name: name.to_string(),
            }
        })?;
        let table = self.scope_table();
        let upcast = Upcast::of::<D, B>();
        let record = self.register_type::<D>(&table, name, Some((&*base, upcast)));
        Ok(ClassBuilder::new(self, record))
    }

    fn register_type<T: 'static>(
        &mut self,
        table: &Table,
        name: &str,
        base: Option<(&RegisteredType, Upcast)>,
    ) -> Rc<RegisteredType> {
        let type_hash = TypeHash::of::<T>();
        let record = Rc::new(RegisteredType::create(self.state, name, type_hash, base));
        self.state.registry_set(type_hash, record.clone());
        table.raw_set(name, record.static_table().clone());
        record
    }
}

pub(crate) fn install_scope_property<G, R>(
    properties: &DispatchTable,
    name: &str,
    qualified: &str,
    get: G,
) where
    G: Fn() -> R + 'static,
    R: IntoResults,
{
    let getter = IntoFunction::<fn() -> R>::into_function(get, qualified);
    properties.set(
        Categories::GETTER,
        name,
        Callable::new(CallableKind::Getter, getter),
    );
}

/// Install getter and setter entries reading and writing `cell`.
pub(crate) fn install_variable<U>(
    properties: &DispatchTable,
    name: &str,
    qualified: &str,
    cell: Rc<RefCell<U>>,
    writable: bool,
) where
    U: Clone + IntoValue + FromValue + 'static,
{
    let source = cell.clone();
    let getter = Function::named(qualified, move |ctx| {
        let value = source.borrow().clone();
        ctx.push(value.into_value());
        Ok(1)
    });
    properties.set(
        Categories::GETTER,
        name,
        Callable::new(CallableKind::Getter, getter),
    );

    let setter = if writable {
        let setter = Function::named(qualified, move |ctx| {
            let value: U = ctx.get(1)?;
            *cell.borrow_mut() = value;
            Ok(0)
        });
        Callable::new(CallableKind::Setter, setter)
    } else {
        Callable::read_only(name)
    };
    properties.set(Categories::SETTER, name, setter);
}
