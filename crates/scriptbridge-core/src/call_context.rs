//! Argument and result access for native calls.

use crate::convert::FromValue;
use crate::error::ScriptError;
use crate::state::State;
use crate::value::Value;

/// The frame of a native call.
///
/// Arguments are addressed by 1-based position. Reading past the last
/// argument yields `nil`, as scripts may pass fewer values than a function
/// declares. Results are pushed after the arguments; the function's return
/// value says how many of the pushed values are results.
pub struct CallContext<'s> {
    state: &'s mut State,
    base: usize,
    arg_count: usize,
}

impl<'s> CallContext<'s> {
    pub(crate) fn new(state: &'s mut State, base: usize, arg_count: usize) -> Self {
        Self {
            state,
            base,
            arg_count,
        }
    }

    /// Number of arguments passed to this call.
    pub fn arg_count(&self) -> usize {
        self.arg_count
    }

    /// The argument at `position` (1-based), or `nil` if absent.
    pub fn arg(&self, position: usize) -> Value {
        if position == 0 || position > self.arg_count {
            return Value::Nil;
        }
        self.state
            .stack_slot(self.base + position - 1)
            .cloned()
            .unwrap_or_default()
    }

    /// Convert the argument at `position` to `T`.
    pub fn get<T: FromValue>(&self, position: usize) -> Result<T, ScriptError> {
        T::from_value(&self.arg(position))
            .map_err(|source| ScriptError::BadArgument { position, source })
    }

    /// Push a result value.
    pub fn push(&mut self, value: impl Into<Value>) {
        self.state.push_slot(value.into());
    }

    /// The owning state, for nested calls and registry access.
    pub fn state(&mut self) -> &mut State {
        self.state
    }
}
