//! Native function handles.

use std::fmt;
use std::rc::Rc;

use crate::call_context::CallContext;
use crate::error::ScriptError;

/// Result of a native call: the number of values pushed as results.
pub type NativeResult = Result<usize, ScriptError>;

type NativeBody = dyn Fn(&mut CallContext<'_>) -> NativeResult;

/// A callable runtime value wrapping a native closure.
///
/// The closure receives the call's arguments through a [`CallContext`],
/// pushes its results, and returns how many it pushed. Whatever the closure
/// captures is released exactly once, when the last handle is dropped.
#[derive(Clone)]
pub struct Function {
    inner: Rc<FunctionInner>,
}

struct FunctionInner {
    name: Option<Rc<str>>,
    body: Box<NativeBody>,
}

impl Function {
    /// Wrap an anonymous native closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut CallContext<'_>) -> NativeResult + 'static,
    {
        Self {
            inner: Rc::new(FunctionInner {
                name: None,
                body: Box::new(f),
            }),
        }
    }

    /// Wrap a native closure with a diagnostic name.
    pub fn named<F>(name: &str, f: F) -> Self
    where
        F: Fn(&mut CallContext<'_>) -> NativeResult + 'static,
    {
        Self {
            inner: Rc::new(FunctionInner {
                name: Some(Rc::from(name)),
                body: Box::new(f),
            }),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    pub(crate) fn invoke(&self, ctx: &mut CallContext<'_>) -> NativeResult {
        (self.inner.body)(ctx)
    }

    pub fn ptr_eq(&self, other: &Function) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn as_ptr(&self) -> *const () {
        Rc::as_ptr(&self.inner).cast()
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name())
            .finish_non_exhaustive()
    }
}
