//! Registration layer of the scriptbridge binding library.
//!
//! Native functions, classes, properties and inheritance are bound into a
//! [`State`](scriptbridge_core::State) through a fluent builder:
//!
//! - [`get_global_namespace`] opens the root scope
//! - [`NamespaceBuilder`] registers functions, variables and properties,
//!   and opens nested namespaces and classes
//! - [`ClassBuilder`] registers constructors, methods, data members,
//!   properties and static members of one class
//!
//! Each registered class owns a [`RegisteredType`] holding its const view,
//! class view and static table. Instances are userdata carrying an
//! [`Instance`] payload; methods receive them through [`borrow_object`]
//! and [`borrow_object_mut`], following the class chain for inherited
//! members.

mod callable;
mod class_builder;
mod dispatch_table;
mod error;
mod field;
mod metamethods;
mod namespace;
mod namespace_tree;
mod object;
mod registered_type;
mod signature;

pub use callable::{Callable, CallableKind};
pub use class_builder::ClassBuilder;
pub use dispatch_table::{Categories, DispatchTable, Upcast};
pub use error::RegistrationError;
pub use field::Field;
pub use namespace::{NamespaceBuilder, get_global_namespace};
pub use namespace_tree::{NamespaceEdge, NamespaceTree, Scope};
pub use object::{
    Instance, Owned, Ownership, SharedPtr, borrow_object, borrow_object_mut, instance_of,
    push_boxed, push_boxed_const, push_shared, push_shared_const, push_value, push_value_const,
};
pub use registered_type::RegisteredType;
pub use signature::{
    ConstReceiver, Factory, IntoConstructor, IntoFunction, IntoGetter, IntoMethod, IntoSetter,
    MutReceiver,
};
