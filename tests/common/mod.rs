//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use treestate::core::{Call, EventInfo, Model, StateValue};
use treestate::CallbackError;

/// Model that records every named callback it runs.
///
/// Predicates answer from `flags`; `fail` always errors.
#[derive(Debug, Default)]
pub struct Journal {
    pub state: Option<StateValue>,
    pub log: Vec<String>,
    pub flags: HashMap<String, bool>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_flag(mut self, name: &str, value: bool) -> Self {
        self.flags.insert(name.to_string(), value);
        self
    }
}

impl Model for Journal {
    fn state(&self, _attribute: &str) -> Option<StateValue> {
        self.state.clone()
    }

    fn set_state(&mut self, _attribute: &str, value: StateValue) {
        self.state = Some(value);
    }

    fn call(&mut self, name: &str, call: Call<'_, EventInfo>) -> Option<Result<(), CallbackError>> {
        if name == "fail" {
            return Some(Err("boom".into()));
        }
        match call.args().get(0) {
            Some(arg) => self.log.push(format!("{name}({arg})")),
            None => self.log.push(name.to_string()),
        }
        Some(Ok(()))
    }

    fn check(&mut self, name: &str, _call: Call<'_, EventInfo>) -> Option<Result<bool, CallbackError>> {
        self.log.push(format!("?{name}"));
        self.flags.get(name).copied().map(Ok)
    }
}
