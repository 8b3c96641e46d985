//! String-keyed tables with an optional metatable.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::userdata::GcHook;
use crate::value::Value;

/// A reference-counted table handle.
///
/// Fields are keyed by name. Storing `nil` removes the field, so a
/// present field is never nil. A table may carry a metatable whose
/// `__index`, `__newindex` and `__call` entries drive the runtime's
/// dispatch, and a collection hook used when the table serves as a
/// userdata metatable.
#[derive(Clone, Default)]
pub struct Table(Rc<RefCell<TableData>>);

#[derive(Default)]
struct TableData {
    fields: FxHashMap<Rc<str>, Value>,
    metatable: Option<Table>,
    gc_hook: Option<GcHook>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a field without consulting the metatable.
    pub fn raw_get(&self, key: &str) -> Value {
        self.0.borrow().fields.get(key).cloned().unwrap_or_default()
    }

    /// Write a field without consulting the metatable.
    pub fn raw_set(&self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        let previous = {
            let mut data = self.0.borrow_mut();
            if value.is_nil() {
                data.fields.remove(key)
            } else {
                data.fields.insert(Rc::from(key), value)
            }
        };
        // Released outside the borrow: dropping a userdata may run a hook.
        drop(previous);
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.borrow().fields.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.borrow().fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().fields.is_empty()
    }

    /// Field names in unspecified order.
    pub fn keys(&self) -> Vec<String> {
        self.0.borrow().fields.keys().map(|k| k.to_string()).collect()
    }

    pub fn metatable(&self) -> Option<Table> {
        self.0.borrow().metatable.clone()
    }

    pub fn set_metatable(&self, metatable: Option<Table>) {
        let previous = std::mem::replace(&mut self.0.borrow_mut().metatable, metatable);
        drop(previous);
    }

    /// Hook run with the payload of a userdata using this table as its
    /// metatable, once, when the userdata is collected.
    pub fn gc_hook(&self) -> Option<GcHook> {
        self.0.borrow().gc_hook.clone()
    }

    pub fn set_gc_hook(&self, hook: GcHook) {
        self.0.borrow_mut().gc_hook = Some(hook);
    }

    /// Remove every field, the metatable and the hook.
    pub fn clear(&self) {
        let data = std::mem::take(&mut *self.0.borrow_mut());
        drop(data);
    }

    pub fn ptr_eq(&self, other: &Table) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn as_ptr(&self) -> *const () {
        Rc::as_ptr(&self.0).cast()
    }
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("len", &self.len())
            .field("has_metatable", &self.0.borrow().metatable.is_some())
            .finish()
    }
}
