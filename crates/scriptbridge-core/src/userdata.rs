//! Opaque native payloads owned by the runtime.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::table::Table;

/// Collection hook stored on a userdata metatable.
///
/// Receives the payload of a collected userdata by value.
pub type GcHook = Rc<dyn Fn(Box<dyn Any>)>;

/// A reference-counted userdata handle.
///
/// When the last handle goes away the payload is handed to the metatable's
/// collection hook, or simply dropped when there is none. Either way it
/// happens exactly once.
#[derive(Clone)]
pub struct AnyUserdata(Rc<UserdataCell>);

struct UserdataCell {
    payload: Option<Box<dyn Any>>,
    metatable: RefCell<Option<Table>>,
}

impl AnyUserdata {
    pub fn new(payload: Box<dyn Any>, metatable: Option<Table>) -> Self {
        Self(Rc::new(UserdataCell {
            payload: Some(payload),
            metatable: RefCell::new(metatable),
        }))
    }

    /// Borrow the payload as `T`, if that is its concrete type.
    pub fn payload<T: Any>(&self) -> Option<&T> {
        self.0.payload.as_deref()?.downcast_ref::<T>()
    }

    pub fn metatable(&self) -> Option<Table> {
        self.0.metatable.borrow().clone()
    }

    pub fn set_metatable(&self, metatable: Option<Table>) {
        let previous = self.0.metatable.replace(metatable);
        drop(previous);
    }

    pub fn ptr_eq(&self, other: &AnyUserdata) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn as_ptr(&self) -> *const () {
        Rc::as_ptr(&self.0).cast()
    }

    /// Number of live handles to this userdata.
    pub fn handle_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }
}

impl Drop for UserdataCell {
    fn drop(&mut self) {
        let Some(payload) = self.payload.take() else {
            return;
        };
        let hook = self.metatable.get_mut().as_ref().and_then(Table::gc_hook);
        match hook {
            Some(hook) => hook(payload),
            None => drop(payload),
        }
    }
}

impl fmt::Debug for AnyUserdata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyUserdata")
            .field("handles", &self.handle_count())
            .finish_non_exhaustive()
    }
}
