//! A small, explicitly owned registry of analysis results, keyed by id
//! (`"pta"`, `"constprop"`, `"taint"`, ...).
//!
//! The distilled spec describes a "process-wide" registry that later
//! analyses look results up from; modeling that as a real global would
//! make every analysis implicitly depend on ambient mutable state and
//! would block running two analyses concurrently in the same process.
//! Instead this is a context object threaded explicitly: whoever runs a
//! pipeline of analyses owns one and passes `&` or `&mut` references to
//! the stages that need it.

use std::any::Any;
use std::collections::HashMap;

#[derive(Default)]
pub struct ResultsRegistry {
    entries: HashMap<String, Box<dyn Any>>,
}

impl ResultsRegistry {
    pub fn new() -> Self {
        ResultsRegistry {
            entries: HashMap::new(),
        }
    }

    pub fn insert<T: 'static>(&mut self, id: impl Into<String>, value: T) {
        self.entries.insert(id.into(), Box::new(value));
    }

    pub fn get<T: 'static>(&self, id: &str) -> Option<&T> {
        self.entries.get(id).and_then(|v| v.downcast_ref::<T>())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }
}
