//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::cell::Cell;
use std::rc::Rc;

use scriptbridge::prelude::*;

/// Route `log` output through the test harness.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A fresh state with logging enabled.
pub fn new_state() -> State {
    init_logging();
    State::new()
}

/// The first result of a call, or nil.
pub fn first(results: Vec<Value>) -> Value {
    results.into_iter().next().unwrap_or_default()
}

/// Counts the destruction of the objects holding its tokens.
#[derive(Debug, Clone, Default)]
pub struct DropCounter(Rc<Cell<usize>>);

impl DropCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> DropToken {
        DropToken(self.0.clone())
    }

    pub fn count(&self) -> usize {
        self.0.get()
    }
}

/// Bumps its counter once when dropped.
#[derive(Debug)]
pub struct DropToken(Rc<Cell<usize>>);

impl Drop for DropToken {
    fn drop(&mut self) {
        self.0.set(self.0.get() + 1);
    }
}
