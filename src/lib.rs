//! Bind native functions, classes and properties into an embedded
//! scripting runtime.
//!
//! The facade re-exports the two workspace crates:
//!
//! - [`runtime`]: the runtime model (values, tables, functions, userdata and
//!   the [`State`] with its calling convention) and the marshalling traits
//! - [`registry`]: the registration and dispatch engine
//!
//! ```
//! use scriptbridge::prelude::*;
//!
//! struct Account {
//!     balance: i64,
//! }
//!
//! impl Account {
//!     fn deposit(&mut self, amount: i64) {
//!         self.balance += amount;
//!     }
//! }
//!
//! let mut state = State::new();
//! get_global_namespace(&mut state)
//!     .begin_namespace("bank")
//!     .begin_class::<Account>("Account")
//!     .add_constructor(|| Account { balance: 0 })
//!     .add_function("deposit", Account::deposit)
//!     .and_then(|c| c.add_readonly_property("balance", |a: &Account| a.balance))
//!     .unwrap()
//!     .end_class()
//!     .end_namespace()
//!     .unwrap();
//!
//! let bank = state.get_global("bank").unwrap();
//! let class = state.get_field(&bank, "Account").unwrap();
//! let account = state.call(&class, []).unwrap().remove(0);
//! state.call_method(&account, "deposit", [Value::Integer(25)]).unwrap();
//! assert_eq!(state.get_field(&account, "balance").unwrap(), Value::Integer(25));
//! ```

pub use scriptbridge_core as runtime;
pub use scriptbridge_registry as registry;

pub use scriptbridge_core::{
    AnyUserdata, CallContext, Config, ConversionError, FromValue, Function, IntoResults,
    IntoValue, NativeResult, ScriptError, State, Table, TypeHash, Value,
};
pub use scriptbridge_registry::{
    ClassBuilder, Field, NamespaceBuilder, Owned, RegistrationError, SharedPtr, field,
    get_global_namespace,
};

pub mod prelude {
    pub use scriptbridge_core::{
        CallContext, Config, FromValue, Function, IntoResults, IntoValue, NativeResult,
        ScriptError, State, Table, Value,
    };
    pub use scriptbridge_registry::{
        ClassBuilder, Field, NamespaceBuilder, Owned, RegistrationError, SharedPtr,
        borrow_object, borrow_object_mut, field, get_global_namespace, push_boxed,
        push_boxed_const, push_shared, push_shared_const, push_value, push_value_const,
    };
}
