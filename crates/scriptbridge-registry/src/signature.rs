//! Signature erasure for native functions.
//!
//! Each trait here turns a typed Rust callable into a runtime [`Function`]
//! that reads its arguments from the call frame, invokes the callable and
//! pushes the result. The `Marker` parameter encodes the callable's
//! signature so that one blanket impl per arity can coexist:
//!
//! - [`IntoFunction`]: free and static functions, arguments from position 1
//! - [`IntoMethod`]: instance methods, receiver at 1 and arguments from 2;
//!   const-ness is inferred from `&T` versus `&mut T`
//! - [`IntoConstructor`]: factories invoked through a class's `__call`,
//!   arguments from position 2 (position 1 is the class table)
//! - [`IntoGetter`] / [`IntoSetter`]: property accessors
//!
//! Up to eight arguments are supported. Panics in native code are caught
//! and surface as [`ScriptError::Panic`].

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use scriptbridge_core::{CallContext, FromValue, Function, IntoResults, ScriptError};

use crate::object::{borrow_object, borrow_object_mut};

/// Builds a `T` from the arguments of a constructor call.
pub type Factory<T> = Rc<dyn Fn(&CallContext<'_>) -> Result<T, ScriptError>>;

/// Marker for methods taking `&T`.
pub struct ConstReceiver;

/// Marker for methods taking `&mut T`.
pub struct MutReceiver;

/// A free function `Fn(A1, .., An) -> R`.
pub trait IntoFunction<Marker>: 'static {
    fn into_function(self, name: &str) -> Function;
}

/// An instance method `Fn(&T, ..) -> R` or `Fn(&mut T, ..) -> R`.
pub trait IntoMethod<T, Marker>: 'static {
    /// True when the receiver is `&T`.
    const IS_CONST: bool;

    fn into_method(self, name: &str) -> Function;
}

/// A constructor `Fn(A1, .., An) -> T`.
pub trait IntoConstructor<T, Marker>: 'static {
    fn into_factory(self) -> Factory<T>;
}

/// A property reader `Fn(&T) -> R`.
pub trait IntoGetter<T, Marker>: 'static {
    fn into_getter(self, name: &str) -> Function;
}

/// A property writer `Fn(&mut T, A)`.
pub trait IntoSetter<T, Marker>: 'static {
    fn into_setter(self, name: &str) -> Function;
}

/// Run native code, turning a panic into a script error.
pub(crate) fn guarded<R>(f: impl FnOnce() -> R) -> Result<R, ScriptError> {
    catch_unwind(AssertUnwindSafe(f)).map_err(|payload| ScriptError::Panic {
        message: panic_message(payload.as_ref()),
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn next_arg<A: FromValue>(ctx: &CallContext<'_>, position: &mut usize) -> Result<A, ScriptError> {
    let value = ctx.get::<A>(*position);
    *position += 1;
    value
}

macro_rules! impl_signature {
    ($($arg:ident),*) => {
        impl<F, R, $($arg,)*> IntoFunction<fn($($arg),*) -> R> for F
        where
            F: Fn($($arg),*) -> R + 'static,
            R: IntoResults,
            $($arg: FromValue,)*
        {
            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn into_function(self, name: &str) -> Function {
                Function::named(name, move |ctx| {
                    let mut position = 1;
                    $(let $arg = next_arg::<$arg>(ctx, &mut position)?;)*
                    guarded(|| (self)($($arg),*))?.push_results(ctx)
                })
            }
        }

        impl<T, F, R, $($arg,)*> IntoMethod<T, (ConstReceiver, fn($($arg),*) -> R)> for F
        where
            T: 'static,
            F: Fn(&T $(, $arg)*) -> R + 'static,
            R: IntoResults,
            $($arg: FromValue,)*
        {
            const IS_CONST: bool = true;

            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn into_method(self, name: &str) -> Function {
                Function::named(name, move |ctx| {
                    let receiver = ctx.arg(1);
                    let mut position = 2;
                    $(let $arg = next_arg::<$arg>(ctx, &mut position)?;)*
                    let result = {
                        let this = borrow_object::<T>(&receiver)?;
                        guarded(|| (self)(&*this $(, $arg)*))?
                    };
                    result.push_results(ctx)
                })
            }
        }

        impl<T, F, R, $($arg,)*> IntoMethod<T, (MutReceiver, fn($($arg),*) -> R)> for F
        where
            T: 'static,
            F: Fn(&mut T $(, $arg)*) -> R + 'static,
            R: IntoResults,
            $($arg: FromValue,)*
        {
            const IS_CONST: bool = false;

            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn into_method(self, name: &str) -> Function {
                Function::named(name, move |ctx| {
                    let receiver = ctx.arg(1);
                    let mut position = 2;
                    $(let $arg = next_arg::<$arg>(ctx, &mut position)?;)*
                    let result = {
                        let mut this = borrow_object_mut::<T>(&receiver)?;
                        guarded(|| (self)(&mut *this $(, $arg)*))?
                    };
                    result.push_results(ctx)
                })
            }
        }

        impl<T, F, $($arg,)*> IntoConstructor<T, fn($($arg),*)> for F
        where
            T: 'static,
            F: Fn($($arg),*) -> T + 'static,
            $($arg: FromValue,)*
        {
            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn into_factory(self) -> Factory<T> {
                Rc::new(move |ctx: &CallContext<'_>| {
                    let mut position = 2;
                    $(let $arg = next_arg::<$arg>(ctx, &mut position)?;)*
                    guarded(|| (self)($($arg),*))
                })
            }
        }
    };
}

impl_signature!();
impl_signature!(A1);
impl_signature!(A1, A2);
impl_signature!(A1, A2, A3);
impl_signature!(A1, A2, A3, A4);
impl_signature!(A1, A2, A3, A4, A5);
impl_signature!(A1, A2, A3, A4, A5, A6);
impl_signature!(A1, A2, A3, A4, A5, A6, A7);
impl_signature!(A1, A2, A3, A4, A5, A6, A7, A8);

impl<T, F, R> IntoGetter<T, fn() -> R> for F
where
    T: 'static,
    F: Fn(&T) -> R + 'static,
    R: IntoResults,
{
    fn into_getter(self, name: &str) -> Function {
        <F as IntoMethod<T, (ConstReceiver, fn() -> R)>>::into_method(self, name)
    }
}

impl<T, F, A> IntoSetter<T, fn(A)> for F
where
    T: 'static,
    F: Fn(&mut T, A) + 'static,
    A: FromValue,
{
    fn into_setter(self, name: &str) -> Function {
        <F as IntoMethod<T, (MutReceiver, fn(A))>>::into_method(self, name)
    }
}

/// Erase a raw function that works on the call frame directly.
pub(crate) fn raw_function<F>(name: &str, f: F) -> Function
where
    F: Fn(&mut CallContext<'_>) -> Result<usize, ScriptError> + 'static,
{
    Function::named(name, move |ctx| guarded(|| f(ctx))?)
}

/// Erase a raw method that works on the call frame directly.
///
/// The receiver is at position 1, so script arguments start at 2.
pub(crate) fn raw_method<T, F>(name: &str, f: F) -> Function
where
    T: 'static,
    F: Fn(&mut T, &mut CallContext<'_>) -> Result<usize, ScriptError> + 'static,
{
    Function::named(name, move |ctx| {
        let receiver = ctx.arg(1);
        let mut this = borrow_object_mut::<T>(&receiver)?;
        guarded(|| f(&mut *this, ctx))?
    })
}

/// Const counterpart of [`raw_method`].
pub(crate) fn raw_const_method<T, F>(name: &str, f: F) -> Function
where
    T: 'static,
    F: Fn(&T, &mut CallContext<'_>) -> Result<usize, ScriptError> + 'static,
{
    Function::named(name, move |ctx| {
        let receiver = ctx.arg(1);
        let this = borrow_object::<T>(&receiver)?;
        guarded(|| f(&*this, ctx))?
    })
}
