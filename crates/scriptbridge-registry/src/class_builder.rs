//! Fluent registration of a class's members.
//!
//! A [`ClassBuilder`] is obtained from
//! [`NamespaceBuilder::begin_class`] or [`NamespaceBuilder::derive_class`]
//! and returns to its namespace with [`end_class`](ClassBuilder::end_class).
//!
//! ```
//! use scriptbridge_core::{State, Value};
//! use scriptbridge_registry::{field, get_global_namespace};
//!
//! #[derive(Default)]
//! struct Point {
//!     x: f64,
//!     y: f64,
//! }
//!
//! impl Point {
//!     fn length(&self) -> f64 {
//!         (self.x * self.x + self.y * self.y).sqrt()
//!     }
//! }
//!
//! let mut state = State::new();
//! get_global_namespace(&mut state)
//!     .begin_class::<Point>("Point")
//!     .add_constructor(Point::default)
//!     .add_data("x", field!(Point, x), true)
//!     .and_then(|c| c.add_data("y", field!(Point, y), true))
//!     .and_then(|c| c.add_function("length", Point::length))
//!     .unwrap()
//!     .end_class();
//!
//! let p = state.call_global("Point", []).unwrap().remove(0);
//! state.set_field(&p, "x", 3.0).unwrap();
//! state.set_field(&p, "y", 4.0).unwrap();
//! let len = state.call_method(&p, "length", []).unwrap();
//! assert_eq!(len, vec![Value::Number(5.0)]);
//! ```

use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;

use log::{debug, warn};
use scriptbridge_core::{
    CallContext, FromValue, Function, IntoResults, IntoValue, NativeResult, ScriptError, Value,
};

use crate::callable::{Callable, CallableKind};
use crate::dispatch_table::Categories;
use crate::error::RegistrationError;
use crate::field::Field;
use crate::namespace::{NamespaceBuilder, install_scope_property, install_variable};
use crate::object::{
    SharedPtr, borrow_object, borrow_object_mut, push_boxed, push_shared, push_value,
};
use crate::registered_type::RegisteredType;
use crate::signature::{
    Factory, IntoConstructor, IntoFunction, IntoGetter, IntoMethod, IntoSetter, raw_const_method,
    raw_function, raw_method,
};

/// Names the runtime reserves on class tables.
const RESERVED_NAMES: &[&str] = &["__gc"];

fn check_member_name(name: &str) -> Result<(), RegistrationError> {
    if RESERVED_NAMES.contains(&name) {
        return Err(RegistrationError::ReservedName {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Builder for the members of class `T`.
pub struct ClassBuilder<'s, T> {
    namespace: NamespaceBuilder<'s>,
    record: Rc<RegisteredType>,
    _marker: PhantomData<fn() -> T>,
}

impl<'s, T: 'static> ClassBuilder<'s, T> {
    pub(crate) fn new(namespace: NamespaceBuilder<'s>, record: Rc<RegisteredType>) -> Self {
        Self {
            namespace,
            record,
            _marker: PhantomData,
        }
    }

    fn qualified_name(&self, member: &str) -> String {
        format!("{}.{}", self.record.name(), member)
    }

    /// The registration record of `T`.
    pub fn record(&self) -> &Rc<RegisteredType> {
        &self.record
    }

    // ========================================================================
    // Constructors
    // ========================================================================

    fn install_constructor<W>(self, factory: Factory<T>, wrap: W) -> Self
    where
        W: Fn(&mut CallContext<'_>, T) -> Result<Value, ScriptError> + 'static,
    {
        let constructor = Function::named(&self.qualified_name("__call"), move |ctx| {
            let object = factory(&*ctx)?;
            let value = wrap(ctx, object)?;
            ctx.push(value);
            Ok(1)
        });
        if self.record.has_constructor() {
            warn!("{}: replacing constructor", self.record.name());
        }
        self.record.set_constructor(Value::Function(constructor));
        self
    }

    /// Construct instances stored inline, destroyed at collection.
    ///
    /// Scripts call the class table: `Point(1, 2)`.
    pub fn add_constructor<F, M>(self, f: F) -> Self
    where
        F: IntoConstructor<T, M>,
    {
        self.install_constructor(f.into_factory(), |ctx, object| {
            push_value(ctx.state(), object)
        })
    }

    /// Construct heap-allocated instances, destroyed at collection.
    pub fn add_boxed_constructor<F, M>(self, f: F) -> Self
    where
        F: IntoConstructor<T, M>,
    {
        self.install_constructor(f.into_factory(), |ctx, object| {
            push_boxed(ctx.state(), Box::new(object))
        })
    }

    /// Construct shared instances that native code may also hold.
    pub fn add_shared_constructor<F, M>(self, f: F) -> Self
    where
        F: IntoConstructor<T, M>,
    {
        self.install_constructor(f.into_factory(), |ctx, object| {
            push_shared(ctx.state(), SharedPtr::new(object))
        })
    }

    // ========================================================================
    // Instance members
    // ========================================================================

    /// Register a method. Methods taking `&self` are also callable through
    /// const handles; methods taking `&mut self` are not.
    pub fn add_function<F, M>(self, name: &str, f: F) -> Result<Self, RegistrationError>
    where
        F: IntoMethod<T, M>,
    {
        check_member_name(name)?;
        let function = f.into_method(&self.qualified_name(name));
        let (kind, categories) = if F::IS_CONST {
            (
                CallableKind::ConstMethod,
                Categories::METHOD | Categories::CONST_METHOD,
            )
        } else {
            (CallableKind::Method, Categories::METHOD)
        };
        self.record
            .class()
            .set(categories, name, Callable::new(kind, function));
        Ok(self)
    }

    /// Register a raw method that reads its arguments from the call frame.
    /// Position 1 holds the receiver.
    pub fn add_cfunction<F>(self, name: &str, f: F) -> Result<Self, RegistrationError>
    where
        F: Fn(&mut T, &mut CallContext<'_>) -> NativeResult + 'static,
    {
        check_member_name(name)?;
        let function = raw_method::<T, F>(&self.qualified_name(name), f);
        self.record.class().set(
            Categories::METHOD,
            name,
            Callable::new(CallableKind::Raw, function),
        );
        Ok(self)
    }

    /// Const counterpart of [`add_cfunction`](Self::add_cfunction).
    pub fn add_const_cfunction<F>(self, name: &str, f: F) -> Result<Self, RegistrationError>
    where
        F: Fn(&T, &mut CallContext<'_>) -> NativeResult + 'static,
    {
        check_member_name(name)?;
        let function = raw_const_method::<T, F>(&self.qualified_name(name), f);
        self.record.class().set(
            Categories::METHOD | Categories::CONST_METHOD,
            name,
            Callable::new(CallableKind::Raw, function),
        );
        Ok(self)
    }

    /// Expose a data member. Reads copy the member out; writes replace it,
    /// or fail with a read-only error when `writable` is false.
    pub fn add_data<U>(
        self,
        name: &str,
        field: Field<T, U>,
        writable: bool,
    ) -> Result<Self, RegistrationError>
    where
        U: Clone + IntoValue + FromValue + 'static,
    {
        check_member_name(name)?;
        let qualified = self.qualified_name(name);
        let class = self.record.class();

        let getter = Function::named(&qualified, move |ctx| {
            let receiver = ctx.arg(1);
            let value = {
                let this = borrow_object::<T>(&receiver)?;
                (field.get)(&*this).clone()
            };
            ctx.push(value.into_value());
            Ok(1)
        });
        class.set(
            Categories::GETTER,
            name,
            Callable::new(CallableKind::Getter, getter),
        );

        let setter = if writable {
            let setter = Function::named(&qualified, move |ctx| {
                let receiver = ctx.arg(1);
                let value: U = ctx.get(2)?;
                let mut this = borrow_object_mut::<T>(&receiver)?;
                *(field.get_mut)(&mut *this) = value;
                Ok(0)
            });
            Callable::new(CallableKind::Setter, setter)
        } else {
            Callable::read_only(name)
        };
        class.set(Categories::SETTER, name, setter);
        Ok(self)
    }

    /// Expose a property through accessor functions.
    pub fn add_property<G, MG, S, MS>(
        self,
        name: &str,
        get: G,
        set: S,
    ) -> Result<Self, RegistrationError>
    where
        G: IntoGetter<T, MG>,
        S: IntoSetter<T, MS>,
    {
        check_member_name(name)?;
        let qualified = self.qualified_name(name);
        let class = self.record.class();
        class.set(
            Categories::GETTER,
            name,
            Callable::new(CallableKind::Getter, get.into_getter(&qualified)),
        );
        class.set(
            Categories::SETTER,
            name,
            Callable::new(CallableKind::Setter, set.into_setter(&qualified)),
        );
        Ok(self)
    }

    /// Expose a property with a getter only. Writes fail with a read-only
    /// error.
    pub fn add_readonly_property<G, MG>(
        self,
        name: &str,
        get: G,
    ) -> Result<Self, RegistrationError>
    where
        G: IntoGetter<T, MG>,
    {
        check_member_name(name)?;
        let qualified = self.qualified_name(name);
        let class = self.record.class();
        class.set(
            Categories::GETTER,
            name,
            Callable::new(CallableKind::Getter, get.into_getter(&qualified)),
        );
        class.set(Categories::SETTER, name, Callable::read_only(name));
        Ok(self)
    }

    // ========================================================================
    // Static members
    // ========================================================================

    /// Register a function on the class table: `Point.origin()`.
    pub fn add_static_function<F, M>(self, name: &str, f: F) -> Result<Self, RegistrationError>
    where
        F: IntoFunction<M>,
    {
        check_member_name(name)?;
        let function = f.into_function(&self.qualified_name(name));
        self.record.statics().set(
            Categories::METHOD,
            name,
            Callable::new(CallableKind::Function, function),
        );
        Ok(self)
    }

    /// Register a raw function on the class table.
    pub fn add_static_cfunction<F>(self, name: &str, f: F) -> Result<Self, RegistrationError>
    where
        F: Fn(&mut CallContext<'_>) -> NativeResult + 'static,
    {
        check_member_name(name)?;
        let function = raw_function(&self.qualified_name(name), f);
        self.record.statics().set(
            Categories::METHOD,
            name,
            Callable::new(CallableKind::Raw, function),
        );
        Ok(self)
    }

    /// Expose a shared variable as a static property.
    pub fn add_static_data<U>(
        self,
        name: &str,
        cell: Rc<RefCell<U>>,
        writable: bool,
    ) -> Result<Self, RegistrationError>
    where
        U: Clone + IntoValue + FromValue + 'static,
    {
        check_member_name(name)?;
        let qualified = self.qualified_name(name);
        install_variable(self.record.statics(), name, &qualified, cell, writable);
        Ok(self)
    }

    /// Expose a static property through accessor functions.
    pub fn add_static_property<G, R, S, A>(
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
        check_member_name(name)?;
        let qualified = self.qualified_name(name);
        let statics = self.record.statics();
        install_scope_property(statics, name, &qualified, get);
        let setter = IntoFunction::<fn(A)>::into_function(set, &qualified);
        statics.set(
            Categories::SETTER,
            name,
            Callable::new(CallableKind::Setter, setter),
        );
        Ok(self)
    }

    /// Expose a static property with a getter only.
    pub fn add_static_readonly_property<G, R>(
        self,
        name: &str,
        get: G,
    ) -> Result<Self, RegistrationError>
    where
        G: Fn() -> R + 'static,
        R: IntoResults,
    {
        check_member_name(name)?;
        let qualified = self.qualified_name(name);
        let statics = self.record.statics();
        install_scope_property(statics, name, &qualified, get);
        statics.set(Categories::SETTER, name, Callable::read_only(name));
        Ok(self)
    }

    /// Finish the class and return to the enclosing namespace.
    pub fn end_class(self) -> NamespaceBuilder<'s> {
        debug!(
            "class {} done: {} methods, {} getters, {} statics",
            self.record.name(),
            self.record.class().len(Categories::METHOD),
            self.record.class().len(Categories::GETTER),
            self.record.statics().len(Categories::METHOD),
        );
        self.namespace
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::get_global_namespace;
    use scriptbridge_core::State;

    #[derive(Default)]
    struct Widget {
        size: u32,
    }

    #[test]
    fn gc_is_reserved_everywhere() {
        let mut state = State::new();
        let class = get_global_namespace(&mut state).begin_class::<Widget>("Widget");
        let err = class.add_function("__gc", |_: &Widget| {}).err().unwrap();
        assert_eq!(
            err,
            RegistrationError::ReservedName {
                name: "__gc".into()
            }
        );

        let class = get_global_namespace(&mut state).begin_class::<Widget>("Widget");
        assert!(class.add_static_function("__gc", || {}).is_err());
    }

    #[test]
    fn const_methods_land_in_both_categories() {
        let mut state = State::new();
        let class = get_global_namespace(&mut state)
            .begin_class::<Widget>("Widget")
            .add_function("size", |w: &Widget| w.size)
            .and_then(|c| c.add_function("grow", |w: &mut Widget, by: u32| w.size += by))
            .unwrap();
        let table = class.record().class().clone();
        assert!(table.get_local(Categories::CONST_METHOD, "size").is_some());
        assert!(table.get_local(Categories::METHOD, "size").is_some());
        assert!(table.get_local(Categories::CONST_METHOD, "grow").is_none());
        assert!(table.get_local(Categories::METHOD, "grow").is_some());
    }

    #[test]
    fn reopening_keeps_members() {
        let mut state = State::new();
        get_global_namespace(&mut state)
            .begin_class::<Widget>("Widget")
            .add_function("size", |w: &Widget| w.size)
            .unwrap()
            .end_class();
        let class = get_global_namespace(&mut state)
            .begin_class::<Widget>("Widget")
            .add_function("twice", |w: &Widget| w.size * 2)
            .unwrap();
        let table = class.record().class().clone();
        assert!(table.get_local(Categories::METHOD, "size").is_some());
        assert!(table.get_local(Categories::METHOD, "twice").is_some());
    }

    #[test]
    fn last_constructor_wins() {
        let mut state = State::new();
        get_global_namespace(&mut state)
            .begin_class::<Widget>("Widget")
            .add_constructor(|| Widget { size: 1 })
            .add_constructor(|size: u32| Widget { size })
            .add_function("size", |w: &Widget| w.size)
            .unwrap()
            .end_class();

        let w = state
            .call_global("Widget", [Value::Integer(9)])
            .unwrap()
            .remove(0);
        assert_eq!(
            state.call_method(&w, "size", []).unwrap(),
            vec![Value::Integer(9)]
        );
    }
}
