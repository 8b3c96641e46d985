//! Type-erased member entries stored in dispatch tables.

use std::fmt;

use scriptbridge_core::{Function, ScriptError};

/// What a [`Callable`] does when dispatch reaches it.
///
/// The kind decides how an `__index` hook treats a hit: getters are
/// invoked on the spot, everything else is handed back as a function
/// value for the script to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallableKind {
    /// Free or static function
    Function,
    /// Instance method requiring a mutable receiver
    Method,
    /// Instance method callable through a const handle
    ConstMethod,
    /// Property or data-member reader
    Getter,
    /// Property or data-member writer
    Setter,
    /// Writer that always fails with a read-only error
    ReadOnly,
    /// Raw handler working directly on the call frame
    Raw,
}

/// A registered member: a runtime function plus its kind.
///
/// Everything the native side needs (the function pointer, a field
/// accessor, a variable cell) is captured by the wrapped closure and
/// released when the last clone of the entry is dropped.
#[derive(Clone)]
pub struct Callable {
    kind: CallableKind,
    function: Function,
}

impl Callable {
    pub fn new(kind: CallableKind, function: Function) -> Self {
        Self { kind, function }
    }

    /// A setter that rejects every assignment to `name`.
    pub fn read_only(name: &str) -> Self {
        let member = name.to_string();
        Self::new(
            CallableKind::ReadOnly,
            Function::named(name, move |_| {
                Err(ScriptError::ReadOnly {
                    name: member.clone(),
                })
            }),
        )
    }

    pub fn kind(&self) -> CallableKind {
        self.kind
    }

    pub fn function(&self) -> &Function {
        &self.function
    }

    pub fn is_getter(&self) -> bool {
        self.kind == CallableKind::Getter
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("kind", &self.kind)
            .field("name", &self.function.name())
            .finish()
    }
}
