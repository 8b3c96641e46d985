//! Runtime collaborator for the scriptbridge binding layer.
//!
//! This crate provides the embedded runtime the registration layer binds
//! into: dynamically-typed [`Value`]s, [`Table`]s with metatables,
//! [`Function`] handles wrapping native closures, [`AnyUserdata`] payloads
//! with collection hooks, and the [`State`] that ties them together with a
//! value stack, a global table and a registry keyed by [`TypeHash`].
//!
//! Marshalling between native and script values goes through the
//! [`FromValue`], [`IntoValue`] and [`IntoResults`] traits.

mod call_context;
mod config;
mod convert;
mod error;
mod function;
mod state;
mod table;
mod type_hash;
mod userdata;
mod value;

pub use call_context::CallContext;
pub use config::Config;
pub use convert::{FromValue, IntoResults, IntoValue};
pub use error::{ConversionError, ScriptError};
pub use function::{Function, NativeResult};
pub use state::{MAX_CALL_DEPTH, State};
pub use table::Table;
pub use type_hash::{TypeHash, hash_constants};
pub use userdata::{AnyUserdata, GcHook};
pub use value::Value;
