//! Error types raised across the script boundary.

use thiserror::Error;

/// Errors that can occur when converting a script value to a native type.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    /// Type mismatch during conversion
    #[error("{expected} expected, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// Integer overflow during conversion
    #[error("number {value} does not fit in {target_type}")]
    IntegerOverflow { value: i64, target_type: &'static str },

    /// A float with a fractional part where an integer was required
    #[error("number {value} has no integer representation")]
    NotAnInteger { value: f64 },

    /// A string that is not exactly one character long
    #[error("string of {len} characters cannot be converted to char")]
    NotAChar { len: usize },

    /// Generic conversion failure
    #[error("{message}")]
    Failed { message: String },
}

impl ConversionError {
    /// Create a type mismatch error.
    pub fn mismatch(expected: &'static str, actual: &'static str) -> Self {
        ConversionError::TypeMismatch { expected, actual }
    }
}

/// A script-level error.
///
/// Every failure that surfaces inside the runtime, whether raised by a
/// dispatch hook, by argument marshalling, or by native code, is carried
/// as one of these variants. The `Display` output is the message a script
/// would observe.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScriptError {
    /// Free-form runtime error
    #[error("{0}")]
    Runtime(String),

    /// Assignment to a member that has a read-only setter
    #[error("'{name}' is read-only")]
    ReadOnly { name: String },

    /// Assignment to a name with no setter anywhere in the chain
    #[error("No writable member '{name}'")]
    NoWritableMember { name: String },

    /// An argument could not be converted to the parameter type
    #[error("bad argument #{position} ({source})")]
    BadArgument {
        position: usize,
        #[source]
        source: ConversionError,
    },

    /// Call on a value that is neither a function nor has a `__call` hook
    #[error("attempt to call a {type_name} value")]
    NotCallable { type_name: &'static str },

    /// Method call where the looked-up member was absent
    #[error("attempt to call a nil value (method '{name}')")]
    MethodNotFound { name: String },

    /// Field access on a value without table semantics
    #[error("attempt to index a {type_name} value")]
    NotIndexable { type_name: &'static str },

    /// The receiver is not an instance of the expected class
    #[error("{expected} expected, got {actual}")]
    InvalidReceiver { expected: String, actual: String },

    /// Mutable access through a const handle
    #[error("non-const access to a const {type_name} object")]
    ConstViolation { type_name: String },

    /// The object is already borrowed by an active call
    #[error("{type_name} object is already borrowed")]
    BorrowConflict { type_name: String },

    /// A native type was pushed before its class was registered
    #[error("{type_name} is not a registered class")]
    UnregisteredClass { type_name: String },

    /// Error returned by native code
    #[error("{message}")]
    Native { message: String },

    /// Native code panicked
    #[error("native function panicked: {message}")]
    Panic { message: String },
}

impl ScriptError {
    /// Create a free-form runtime error.
    pub fn runtime(message: impl Into<String>) -> Self {
        ScriptError::Runtime(message.into())
    }

    /// Create an error carrying a native error's message.
    pub fn native(message: impl Into<String>) -> Self {
        ScriptError::Native {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_messages() {
        let err = ScriptError::ReadOnly { name: "x".into() };
        assert_eq!(err.to_string(), "'x' is read-only");

        let err = ScriptError::NoWritableMember { name: "z".into() };
        assert_eq!(err.to_string(), "No writable member 'z'");
    }

    #[test]
    fn bad_argument_keeps_source() {
        let err = ScriptError::BadArgument {
            position: 2,
            source: ConversionError::mismatch("number", "string"),
        };
        assert_eq!(err.to_string(), "bad argument #2 (number expected, got string)");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn native_message_is_verbatim() {
        assert_eq!(ScriptError::native("disk full").to_string(), "disk full");
    }
}
