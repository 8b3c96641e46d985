//! Registration-time errors.

use thiserror::Error;

/// Errors raised while building bindings.
///
/// These are host-side configuration mistakes. They are reported before
/// anything is installed, so a failed registration call leaves the
/// runtime's tables untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// `derive_class` named a base that was never registered
    #[error("base class of '{name}' is not registered")]
    BaseNotRegistered { name: String },

    /// A member name the runtime reserves for itself
    #[error("{name} metamethod registration is forbidden")]
    ReservedName { name: String },

    /// An operation that requires an enclosing namespace
    #[error("{operation} () called on global namespace")]
    GlobalScope { operation: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        let err = RegistrationError::ReservedName {
            name: "__gc".into(),
        };
        assert_eq!(err.to_string(), "__gc metamethod registration is forbidden");

        let err = RegistrationError::GlobalScope {
            operation: "endNamespace",
        };
        assert_eq!(err.to_string(), "endNamespace () called on global namespace");
    }
}
