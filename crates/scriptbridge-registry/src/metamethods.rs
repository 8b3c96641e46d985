//! Dispatch hooks installed as `__index` / `__newindex` handlers.
//!
//! Instance views resolve reads through [`DispatchTable::resolve_field`]
//! and writes through the setter category. Static class tables and
//! namespace tables share the scope hooks, whose getters take no receiver.

use std::rc::Rc;

use scriptbridge_core::{Function, ScriptError, Value};

use crate::dispatch_table::{Categories, DispatchTable};

fn first(results: Vec<Value>) -> Value {
    results.into_iter().next().unwrap_or_default()
}

/// `__index` for instances: `(object, key) -> value`.
///
/// Getters are invoked with the object; methods are returned as function
/// values. Unknown keys read as `nil`.
pub(crate) fn instance_index(class: Rc<DispatchTable>, is_const: bool) -> Function {
    Function::named("__index", move |ctx| {
        let key: String = ctx.get(2)?;
        let value = match class.resolve_field(&key, is_const) {
            Some(member) if member.is_getter() => {
                let getter = Value::Function(member.function().clone());
                let receiver = ctx.arg(1);
                first(ctx.state().call(&getter, [receiver])?)
            }
            Some(member) => Value::Function(member.function().clone()),
            None => Value::Nil,
        };
        ctx.push(value);
        Ok(1)
    })
}

/// `__newindex` for instances: `(object, key, value)`.
///
/// A const view rejects every write; the message depends on whether the
/// class has a setter for the key at all.
pub(crate) fn instance_newindex(class: Rc<DispatchTable>, is_const: bool) -> Function {
    Function::named("__newindex", move |ctx| {
        let key: String = ctx.get(2)?;
        match class.get(Categories::SETTER, &key) {
            Some(_) if is_const => Err(ScriptError::ReadOnly { name: key }),
            Some(setter) => {
                let setter = Value::Function(setter.function().clone());
                let (receiver, value) = (ctx.arg(1), ctx.arg(3));
                ctx.state().call(&setter, [receiver, value])?;
                Ok(0)
            }
            None => Err(ScriptError::NoWritableMember { name: key }),
        }
    })
}

/// `__index` for static class tables and namespaces: `(table, key) -> value`.
pub(crate) fn scope_index(scope: Rc<DispatchTable>) -> Function {
    Function::named("__index", move |ctx| {
        let key: String = ctx.get(2)?;
        let value = match scope.resolve_field(&key, false) {
            Some(member) if member.is_getter() => {
                let getter = Value::Function(member.function().clone());
                first(ctx.state().call(&getter, [])?)
            }
            Some(member) => Value::Function(member.function().clone()),
            None => Value::Nil,
        };
        ctx.push(value);
        Ok(1)
    })
}

/// `__newindex` for static class tables and namespaces: `(table, key, value)`.
pub(crate) fn scope_newindex(scope: Rc<DispatchTable>) -> Function {
    Function::named("__newindex", move |ctx| {
        let key: String = ctx.get(2)?;
        match scope.get(Categories::SETTER, &key) {
            Some(setter) => {
                let setter = Value::Function(setter.function().clone());
                let value = ctx.arg(3);
                ctx.state().call(&setter, [value])?;
                Ok(0)
            }
            None => Err(ScriptError::NoWritableMember { name: key }),
        }
    })
}
