//! Object storage and receiver access.
//!
//! A registered class instance lives in the runtime as a userdata whose
//! payload is an [`Instance`]: the class's dispatch table, a const flag, and
//! the object itself in one of three ownership modes.
//!
//! | Mode | Created by | Destroyed |
//! |------|------------|-----------|
//! | [`Ownership::Value`] | placement constructor, [`push_value`] | at collection |
//! | [`Ownership::Boxed`] | boxed constructor, [`push_boxed`] | at collection |
//! | [`Ownership::Shared`] | shared constructor, [`push_shared`] | when the last [`SharedPtr`] is released |
//!
//! The metatable of the userdata is the class's mutable or const view,
//! chosen when the object is pushed.

use std::any::Any;
use std::cell::{BorrowError, BorrowMutError, Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use log::trace;
use scriptbridge_core::{
    AnyUserdata, CallContext, ConversionError, FromValue, GcHook, IntoResults, ScriptError, State,
    TypeHash, Value,
};

use crate::dispatch_table::DispatchTable;
use crate::registered_type::RegisteredType;

/// How an instance holds its object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ownership {
    /// The object is stored inline in the userdata
    Value,
    /// The userdata owns a heap allocation
    Boxed,
    /// The userdata holds one reference of a shared object
    Shared,
}

trait ObjectStorage {
    fn ownership(&self) -> Ownership;
    fn try_borrow(&self) -> Result<Ref<'_, dyn Any>, BorrowError>;
    fn try_borrow_mut(&self) -> Result<RefMut<'_, dyn Any>, BorrowMutError>;
    fn as_any(&self) -> &dyn Any;
}

struct InPlace<T>(RefCell<T>);

struct Boxed<T>(RefCell<Box<T>>);

struct Shared<T>(SharedPtr<T>);

impl<T: 'static> ObjectStorage for InPlace<T> {
    fn ownership(&self) -> Ownership {
        Ownership::Value
    }

    fn try_borrow(&self) -> Result<Ref<'_, dyn Any>, BorrowError> {
        self.0.try_borrow().map(|r| Ref::map(r, |t| t as &dyn Any))
    }

    fn try_borrow_mut(&self) -> Result<RefMut<'_, dyn Any>, BorrowMutError> {
        self.0
            .try_borrow_mut()
            .map(|r| RefMut::map(r, |t| t as &mut dyn Any))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T: 'static> ObjectStorage for Boxed<T> {
    fn ownership(&self) -> Ownership {
        Ownership::Boxed
    }

    fn try_borrow(&self) -> Result<Ref<'_, dyn Any>, BorrowError> {
        self.0.try_borrow().map(|r| Ref::map(r, |b| &**b as &dyn Any))
    }

    fn try_borrow_mut(&self) -> Result<RefMut<'_, dyn Any>, BorrowMutError> {
        self.0
            .try_borrow_mut()
            .map(|r| RefMut::map(r, |b| &mut **b as &mut dyn Any))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T: 'static> ObjectStorage for Shared<T> {
    fn ownership(&self) -> Ownership {
        Ownership::Shared
    }

    fn try_borrow(&self) -> Result<Ref<'_, dyn Any>, BorrowError> {
        self.0.0.try_borrow().map(|r| Ref::map(r, |t| t as &dyn Any))
    }

    fn try_borrow_mut(&self) -> Result<RefMut<'_, dyn Any>, BorrowMutError> {
        self.0
            .0
            .try_borrow_mut()
            .map(|r| RefMut::map(r, |t| t as &mut dyn Any))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The payload of a class instance userdata.
pub struct Instance {
    class: Rc<DispatchTable>,
    is_const: bool,
    storage: Box<dyn ObjectStorage>,
}

impl Instance {
    /// Dispatch table of the object's dynamic class.
    pub fn class(&self) -> &Rc<DispatchTable> {
        &self.class
    }

    pub fn is_const(&self) -> bool {
        self.is_const
    }

    pub fn ownership(&self) -> Ownership {
        self.storage.ownership()
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("class", &self.class.name())
            .field("is_const", &self.is_const)
            .field("ownership", &self.ownership())
            .finish()
    }
}

/// The instance behind `value`, if it is a registered class object.
pub fn instance_of(value: &Value) -> Option<&Instance> {
    value.as_userdata()?.payload::<Instance>()
}

fn short_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

fn invalid_receiver<T>(value: &Value) -> ScriptError {
    let actual = match instance_of(value) {
        Some(instance) => instance.class.name().to_string(),
        None => value.type_name().to_string(),
    };
    ScriptError::InvalidReceiver {
        expected: short_name::<T>(),
        actual,
    }
}

/// Borrow the object behind `value` as a `T`.
///
/// Succeeds when the object's class is `T` or derives from it.
pub fn borrow_object<T: 'static>(value: &Value) -> Result<Ref<'_, T>, ScriptError> {
    let instance = instance_of(value).ok_or_else(|| invalid_receiver::<T>(value))?;
    let object = instance
        .storage
        .try_borrow()
        .map_err(|_| ScriptError::BorrowConflict {
            type_name: instance.class.name().to_string(),
        })?;
    Ref::filter_map(object, |o| instance.class.cast_ref::<T>(o))
        .map_err(|_| invalid_receiver::<T>(value))
}

/// Mutably borrow the object behind `value` as a `T`.
///
/// Fails with [`ScriptError::ConstViolation`] for const handles.
pub fn borrow_object_mut<T: 'static>(value: &Value) -> Result<RefMut<'_, T>, ScriptError> {
    let instance = instance_of(value).ok_or_else(|| invalid_receiver::<T>(value))?;
    if instance.is_const {
        return Err(ScriptError::ConstViolation {
            type_name: instance.class.name().to_string(),
        });
    }
    let object = instance
        .storage
        .try_borrow_mut()
        .map_err(|_| ScriptError::BorrowConflict {
            type_name: instance.class.name().to_string(),
        })?;
    RefMut::filter_map(object, |o| instance.class.cast_mut::<T>(o))
        .map_err(|_| invalid_receiver::<T>(value))
}

// ============================================================================
// Shared ownership
// ============================================================================

/// A reference-counted object shared between native code and scripts.
///
/// Every script handle to a shared object holds one reference, so the
/// object outlives whichever side lets go first.
pub struct SharedPtr<T>(Rc<RefCell<T>>);

impl<T> SharedPtr<T> {
    pub fn new(value: T) -> Self {
        Self(Rc::new(RefCell::new(value)))
    }

    pub fn borrow(&self) -> Ref<'_, T> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.0.borrow_mut()
    }

    /// Number of live references, native and script.
    pub fn use_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    pub fn ptr_eq(&self, other: &SharedPtr<T>) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<T> Clone for SharedPtr<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T: fmt::Debug> fmt::Debug for SharedPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedPtr")
            .field("use_count", &self.use_count())
            .field("value", &self.0)
            .finish()
    }
}

/// Recover the shared reference held by a script handle.
impl<T: 'static> FromValue for SharedPtr<T> {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        let instance = instance_of(value)
            .ok_or_else(|| ConversionError::mismatch("shared object", value.type_name()))?;
        instance
            .storage
            .as_any()
            .downcast_ref::<Shared<T>>()
            .map(|shared| shared.0.clone())
            .ok_or_else(|| ConversionError::Failed {
                message: format!(
                    "{} is not held as a shared {}",
                    instance.class.name(),
                    short_name::<T>()
                ),
            })
    }
}

impl<T: 'static> IntoResults for SharedPtr<T> {
    fn push_results(self, ctx: &mut CallContext<'_>) -> Result<usize, ScriptError> {
        let value = push_shared(ctx.state(), self)?;
        ctx.push(value);
        Ok(1)
    }
}

/// A registered class object passed or returned by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Owned<T>(pub T);

/// Copies the object out of the script handle.
impl<T: Clone + 'static> FromValue for Owned<T> {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        borrow_object::<T>(value)
            .map(|object| Owned(object.clone()))
            .map_err(|e| ConversionError::Failed {
                message: e.to_string(),
            })
    }
}

impl<T: 'static> IntoResults for Owned<T> {
    fn push_results(self, ctx: &mut CallContext<'_>) -> Result<usize, ScriptError> {
        let value = push_value(ctx.state(), self.0)?;
        ctx.push(value);
        Ok(1)
    }
}

// ============================================================================
// Installation
// ============================================================================

fn install<T: 'static>(
    state: &State,
    storage: Box<dyn ObjectStorage>,
    is_const: bool,
) -> Result<Value, ScriptError> {
    let record = state
        .registry_get::<RegisteredType>(TypeHash::of::<T>())
        .ok_or_else(|| ScriptError::UnregisteredClass {
            type_name: short_name::<T>(),
        })?;
    let metatable = if is_const {
        record.const_view().clone()
    } else {
        record.class_view().clone()
    };
    let instance = Instance {
        class: record.class().clone(),
        is_const,
        storage,
    };
    trace!("installing {:?}", instance);
    Ok(Value::Userdata(AnyUserdata::new(
        Box::new(instance),
        Some(metatable),
    )))
}

/// Move `object` into the runtime. It is destroyed at collection.
pub fn push_value<T: 'static>(state: &State, object: T) -> Result<Value, ScriptError> {
    install::<T>(state, Box::new(InPlace(RefCell::new(object))), false)
}

/// Const-view counterpart of [`push_value`].
pub fn push_value_const<T: 'static>(state: &State, object: T) -> Result<Value, ScriptError> {
    install::<T>(state, Box::new(InPlace(RefCell::new(object))), true)
}

/// Hand a heap object to the runtime. It is destroyed at collection.
pub fn push_boxed<T: 'static>(state: &State, object: Box<T>) -> Result<Value, ScriptError> {
    install::<T>(state, Box::new(Boxed(RefCell::new(object))), false)
}

/// Const-view counterpart of [`push_boxed`].
pub fn push_boxed_const<T: 'static>(state: &State, object: Box<T>) -> Result<Value, ScriptError> {
    install::<T>(state, Box::new(Boxed(RefCell::new(object))), true)
}

/// Give the runtime one reference to a shared object.
pub fn push_shared<T: 'static>(state: &State, object: SharedPtr<T>) -> Result<Value, ScriptError> {
    install::<T>(state, Box::new(Shared(object)), false)
}

/// Const-view counterpart of [`push_shared`].
pub fn push_shared_const<T: 'static>(
    state: &State,
    object: SharedPtr<T>,
) -> Result<Value, ScriptError> {
    install::<T>(state, Box::new(Shared(object)), true)
}

/// Collection hook for a class's instance views.
pub(crate) fn collector(class_name: &str) -> GcHook {
    let name = class_name.to_string();
    Rc::new(move |payload: Box<dyn Any>| {
        if let Ok(instance) = payload.downcast::<Instance>() {
            trace!("collecting {} ({:?})", name, instance.ownership());
            drop(instance);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::get_global_namespace;
    use std::cell::Cell;

    #[derive(Debug, Clone, PartialEq)]
    struct Counter {
        hits: u32,
        drops: Rc<Cell<u32>>,
    }

    impl Drop for Counter {
        fn drop(&mut self) {
            self.drops.set(self.drops.get() + 1);
        }
    }

    fn registered() -> State {
        let mut state = State::new();
        get_global_namespace(&mut state)
            .begin_class::<Counter>("Counter")
            .end_class();
        state
    }

    fn counter(drops: &Rc<Cell<u32>>) -> Counter {
        Counter {
            hits: 0,
            drops: drops.clone(),
        }
    }

    #[test]
    fn value_objects_die_at_collection() {
        let state = registered();
        let drops = Rc::new(Cell::new(0));
        let handle = push_value(&state, counter(&drops)).unwrap();
        let alias = handle.clone();
        drop(handle);
        assert_eq!(drops.get(), 0);
        drop(alias);
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn boxed_objects_die_at_collection() {
        let state = registered();
        let drops = Rc::new(Cell::new(0));
        let handle = push_boxed(&state, Box::new(counter(&drops))).unwrap();
        assert_eq!(instance_of(&handle).map(Instance::ownership), Some(Ownership::Boxed));
        drop(handle);
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn shared_objects_outlive_the_handle() {
        let state = registered();
        let drops = Rc::new(Cell::new(0));
        let native = SharedPtr::new(counter(&drops));
        let handle = push_shared(&state, native.clone()).unwrap();
        assert_eq!(native.use_count(), 2);

        drop(handle);
        assert_eq!(native.use_count(), 1);
        assert_eq!(drops.get(), 0);

        drop(native);
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn shared_pointer_recovered_from_handle() {
        let state = registered();
        let drops = Rc::new(Cell::new(0));
        let native = SharedPtr::new(counter(&drops));
        let handle = push_shared(&state, native.clone()).unwrap();

        let recovered = SharedPtr::<Counter>::from_value(&handle).unwrap();
        assert!(recovered.ptr_eq(&native));

        let by_value = push_value(&state, counter(&drops)).unwrap();
        assert!(SharedPtr::<Counter>::from_value(&by_value).is_err());
    }

    #[test]
    fn mutation_through_handles() {
        let state = registered();
        let drops = Rc::new(Cell::new(0));
        let handle = push_value(&state, counter(&drops)).unwrap();
        borrow_object_mut::<Counter>(&handle).unwrap().hits += 3;
        assert_eq!(borrow_object::<Counter>(&handle).unwrap().hits, 3);
    }

    #[test]
    fn const_handles_refuse_mutation() {
        let state = registered();
        let drops = Rc::new(Cell::new(0));
        let handle = push_value_const(&state, counter(&drops)).unwrap();
        assert!(borrow_object::<Counter>(&handle).is_ok());
        assert_eq!(
            borrow_object_mut::<Counter>(&handle).unwrap_err(),
            ScriptError::ConstViolation {
                type_name: "Counter".into()
            }
        );
    }

    #[test]
    fn overlapping_mutable_borrow_conflicts() {
        let state = registered();
        let drops = Rc::new(Cell::new(0));
        let handle = push_value(&state, counter(&drops)).unwrap();
        let guard = borrow_object::<Counter>(&handle).unwrap();
        assert!(matches!(
            borrow_object_mut::<Counter>(&handle),
            Err(ScriptError::BorrowConflict { .. })
        ));
        drop(guard);
    }

    #[test]
    fn wrong_receiver_type() {
        let state = registered();
        let drops = Rc::new(Cell::new(0));
        let handle = push_value(&state, counter(&drops)).unwrap();
        let err = borrow_object::<String>(&handle).unwrap_err();
        assert_eq!(err.to_string(), "String expected, got Counter");

        let err = borrow_object::<Counter>(&Value::Integer(1)).unwrap_err();
        assert_eq!(err.to_string(), "Counter expected, got number");
    }

    #[test]
    fn unregistered_types_cannot_be_pushed() {
        let state = State::new();
        let err = push_value(&state, 5u8).unwrap_err();
        assert_eq!(err.to_string(), "u8 is not a registered class");
    }

    #[test]
    fn owned_copies_out() {
        let state = registered();
        let drops = Rc::new(Cell::new(0));
        let handle = push_value(&state, counter(&drops)).unwrap();
        let Owned(copy) = Owned::<Counter>::from_value(&handle).unwrap();
        assert_eq!(copy.hits, 0);
    }
}
