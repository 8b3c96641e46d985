//! Conversion traits for argument extraction and result pushing.
//!
//! - [`FromValue`]: extract a native value from a script [`Value`]
//! - [`IntoValue`]: turn a native value into a script [`Value`]
//! - [`IntoResults`]: push a native return value onto a call's result list
//!
//! ## Supported Types
//!
//! - Integers: `i8`..`i64`, `u8`..`u64`, `isize`, `usize`
//! - Floats: `f32`, `f64`
//! - `bool`, `char`, `String`, `&str` (into only)
//! - Runtime handles: `Value`, `Table`, `Function`, `AnyUserdata`
//! - `Option<T>` (nil maps to `None`)
//! - `()` (no results) and `Result<T, E>` (the error surfaces in script)
//!
//! Integer parameters accept floats with an integral value, mirroring the
//! runtime's single "number" type.

use std::fmt::Display;
use std::rc::Rc;

use crate::call_context::CallContext;
use crate::error::{ConversionError, ScriptError};
use crate::function::Function;
use crate::table::Table;
use crate::userdata::AnyUserdata;
use crate::value::Value;

/// Extract a native value from a script value.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self, ConversionError>;
}

/// Convert a native value into a script value.
pub trait IntoValue {
    fn into_value(self) -> Value;
}

/// Push a native return value as call results.
///
/// Returns the number of values pushed. Types that need the state to build
/// their script representation, such as registered class instances,
/// implement this trait directly instead of [`IntoValue`].
pub trait IntoResults {
    fn push_results(self, ctx: &mut CallContext<'_>) -> Result<usize, ScriptError>;
}

fn integer_of(value: &Value) -> Result<i64, ConversionError> {
    match value {
        Value::Integer(v) => Ok(*v),
        Value::Number(n) if n.fract() == 0.0 && *n >= i64::MIN as f64 && *n < i64::MAX as f64 => {
            Ok(*n as i64)
        }
        Value::Number(n) => Err(ConversionError::NotAnInteger { value: *n }),
        other => Err(ConversionError::mismatch("number", other.type_name())),
    }
}

// ============================================================================
// Numbers
// ============================================================================

macro_rules! impl_value_int {
    ($($ty:ty),*) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: &Value) -> Result<Self, ConversionError> {
                    let v = integer_of(value)?;
                    <$ty>::try_from(v).map_err(|_| ConversionError::IntegerOverflow {
                        value: v,
                        target_type: stringify!($ty),
                    })
                }
            }

            impl IntoValue for $ty {
                fn into_value(self) -> Value {
                    match i64::try_from(self) {
                        Ok(v) => Value::Integer(v),
                        Err(_) => Value::Number(self as f64),
                    }
                }
            }
        )*
    };
}

impl_value_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

macro_rules! impl_value_float {
    ($($ty:ty),*) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: &Value) -> Result<Self, ConversionError> {
                    value
                        .as_number()
                        .map(|n| n as $ty)
                        .ok_or_else(|| ConversionError::mismatch("number", value.type_name()))
                }
            }

            impl IntoValue for $ty {
                fn into_value(self) -> Value {
                    Value::Number(self as f64)
                }
            }
        )*
    };
}

impl_value_float!(f32, f64);

// ============================================================================
// Booleans, characters, strings
// ============================================================================

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Boolean(b) => Ok(*b),
            other => Err(ConversionError::mismatch("boolean", other.type_name())),
        }
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Boolean(self)
    }
}

impl FromValue for char {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        let s = value
            .as_str()
            .ok_or_else(|| ConversionError::mismatch("string", value.type_name()))?;
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(ConversionError::NotAChar {
                len: s.chars().count(),
            }),
        }
    }
}

impl IntoValue for char {
    fn into_value(self) -> Value {
        Value::String(Rc::from(self.encode_utf8(&mut [0; 4]) as &str))
    }
}

/// Numbers are coerced to their string form.
impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::String(s) => Ok(s.to_string()),
            Value::Integer(v) => Ok(v.to_string()),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(ConversionError::mismatch("string", other.type_name())),
        }
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::from(self)
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::from(self)
    }
}

// ============================================================================
// Runtime handles
// ============================================================================

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        Ok(value.clone())
    }
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

macro_rules! impl_value_handle {
    ($($ty:ty => $variant:ident, $name:literal);* $(;)?) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: &Value) -> Result<Self, ConversionError> {
                    match value {
                        Value::$variant(h) => Ok(h.clone()),
                        other => Err(ConversionError::mismatch($name, other.type_name())),
                    }
                }
            }

            impl IntoValue for $ty {
                fn into_value(self) -> Value {
                    Value::$variant(self)
                }
            }
        )*
    };
}

impl_value_handle! {
    Table => Table, "table";
    Function => Function, "function";
    AnyUserdata => Userdata, "userdata";
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Nil => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        self.map(IntoValue::into_value).unwrap_or_default()
    }
}

// ============================================================================
// Results
// ============================================================================

impl IntoResults for () {
    fn push_results(self, _ctx: &mut CallContext<'_>) -> Result<usize, ScriptError> {
        Ok(0)
    }
}

macro_rules! impl_into_results {
    ($($ty:ty),*) => {
        $(
            impl IntoResults for $ty {
                fn push_results(self, ctx: &mut CallContext<'_>) -> Result<usize, ScriptError> {
                    ctx.push(self.into_value());
                    Ok(1)
                }
            }
        )*
    };
}

impl_into_results!(
    i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, bool, char, String, &'static str,
    Value, Table, Function, AnyUserdata
);

impl<T: IntoValue> IntoResults for Option<T> {
    fn push_results(self, ctx: &mut CallContext<'_>) -> Result<usize, ScriptError> {
        ctx.push(self.into_value());
        Ok(1)
    }
}

/// An `Err` becomes a script-level error carrying its message.
impl<T: IntoResults, E: Display> IntoResults for Result<T, E> {
    fn push_results(self, ctx: &mut CallContext<'_>) -> Result<usize, ScriptError> {
        match self {
            Ok(v) => v.push_results(ctx),
            Err(e) => Err(ScriptError::native(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrowing_integers_are_checked() {
        assert_eq!(u8::from_value(&Value::Integer(255)), Ok(255));
        assert_eq!(
            u8::from_value(&Value::Integer(256)),
            Err(ConversionError::IntegerOverflow {
                value: 256,
                target_type: "u8"
            })
        );
        assert!(u32::from_value(&Value::Integer(-1)).is_err());
    }

    #[test]
    fn integral_floats_convert_to_integers() {
        assert_eq!(i32::from_value(&Value::Number(7.0)), Ok(7));
        assert_eq!(
            i32::from_value(&Value::Number(7.5)),
            Err(ConversionError::NotAnInteger { value: 7.5 })
        );
    }

    #[test]
    fn large_unsigned_becomes_float() {
        assert_eq!(u64::MAX.into_value(), Value::Number(u64::MAX as f64));
        assert_eq!(5u64.into_value(), Value::Integer(5));
    }

    #[test]
    fn mismatch_reports_both_types() {
        let err = f64::from_value(&Value::from("x")).unwrap_err();
        assert_eq!(err.to_string(), "number expected, got string");
    }

    #[test]
    fn chars_need_exactly_one_character() {
        assert_eq!(char::from_value(&Value::from("é")), Ok('é'));
        assert_eq!(
            char::from_value(&Value::from("ab")),
            Err(ConversionError::NotAChar { len: 2 })
        );
        assert_eq!('z'.into_value(), Value::from("z"));
    }

    #[test]
    fn strings_accept_numbers() {
        assert_eq!(String::from_value(&Value::Integer(12)), Ok("12".to_string()));
        assert!(String::from_value(&Value::Boolean(true)).is_err());
    }

    #[test]
    fn option_maps_nil() {
        assert_eq!(Option::<i32>::from_value(&Value::Nil), Ok(None));
        assert_eq!(Option::<i32>::from_value(&Value::Integer(3)), Ok(Some(3)));
        assert!(Option::<i32>::from_value(&Value::from("3")).is_err());
        assert_eq!(None::<bool>.into_value(), Value::Nil);
    }
}
