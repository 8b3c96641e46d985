//! Per-type registration records.
//!
//! Registering a class creates one [`RegisteredType`] holding the
//! companion tables the runtime sees:
//!
//! - the *const view*, metatable of const handles
//! - the *class view*, metatable of mutable handles
//! - the *static table*, the value bound to the class name in its
//!   namespace, whose metatable dispatches static members and `__call`
//!
//! The record is stored in the state registry under the type's identity,
//! so reopening a class or pushing an object finds the same tables.

use std::rc::Rc;

use log::debug;
use scriptbridge_core::{State, Table, TypeHash, Value};

use crate::dispatch_table::{DispatchTable, Upcast};
use crate::metamethods::{instance_index, instance_newindex, scope_index, scope_newindex};
use crate::object::collector;

/// Companion tables and dispatch tables of one registered class.
pub struct RegisteredType {
    name: String,
    type_hash: TypeHash,
    class: Rc<DispatchTable>,
    statics: Rc<DispatchTable>,
    const_view: Table,
    class_view: Table,
    static_table: Table,
    static_meta: Table,
}

impl RegisteredType {
    /// Build the tables for a new class, optionally deriving from `base`.
    pub(crate) fn create(
        state: &State,
        name: &str,
        type_hash: TypeHash,
        base: Option<(&RegisteredType, Upcast)>,
    ) -> Self {
        let (class, statics) = match base {
            Some((base, upcast)) => {
                debug!("registering class {} deriving from {}", name, base.name);
                (
                    DispatchTable::derived(name, type_hash, base.class.clone(), Some(upcast)),
                    DispatchTable::derived(name, type_hash, base.statics.clone(), None),
                )
            }
            None => {
                debug!("registering class {}", name);
                (
                    DispatchTable::new(name, type_hash),
                    DispatchTable::new(name, type_hash),
                )
            }
        };
        let class = Rc::new(class);
        let statics = Rc::new(statics);

        let const_view = Table::new();
        const_view.raw_set("__index", instance_index(class.clone(), true));
        const_view.raw_set("__newindex", instance_newindex(class.clone(), true));
        const_view.set_gc_hook(collector(name));

        let class_view = Table::new();
        class_view.raw_set("__index", instance_index(class.clone(), false));
        class_view.raw_set("__newindex", instance_newindex(class.clone(), false));
        class_view.set_gc_hook(collector(name));

        let static_meta = Table::new();
        static_meta.raw_set("__index", scope_index(statics.clone()));
        static_meta.raw_set("__newindex", scope_newindex(statics.clone()));
        let static_table = Table::new();
        static_table.set_metatable(Some(static_meta.clone()));

        if state.config().hide_metatables {
            for table in [&const_view, &class_view, &static_meta] {
                table.raw_set("__metatable", false);
            }
        }

        Self {
            name: name.to_string(),
            type_hash,
            class,
            statics,
            const_view,
            class_view,
            static_table,
            static_meta,
        }
    }

    /// The record for `T`, if `T` has been registered.
    pub fn lookup<T: 'static>(state: &State) -> Option<Rc<RegisteredType>> {
        state.registry_get::<RegisteredType>(TypeHash::of::<T>())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_hash(&self) -> TypeHash {
        self.type_hash
    }

    /// Instance members.
    pub fn class(&self) -> &Rc<DispatchTable> {
        &self.class
    }

    /// Static members.
    pub fn statics(&self) -> &Rc<DispatchTable> {
        &self.statics
    }

    pub fn const_view(&self) -> &Table {
        &self.const_view
    }

    pub fn class_view(&self) -> &Table {
        &self.class_view
    }

    /// The script-visible class value.
    pub fn static_table(&self) -> &Table {
        &self.static_table
    }

    pub fn has_constructor(&self) -> bool {
        self.static_meta.contains_key("__call")
    }

    /// Bind the class's `__call` handler. The previous one is released.
    pub(crate) fn set_constructor(&self, constructor: Value) {
        self.static_meta.raw_set("__call", constructor);
    }
}

impl std::fmt::Debug for RegisteredType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredType")
            .field("name", &self.name)
            .field("type_hash", &self.type_hash)
            .finish_non_exhaustive()
    }
}
