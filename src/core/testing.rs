//! Callback family used by the core unit tests: references are plain names.

use super::hooks::Hooks;

pub(crate) struct Plain;

impl Hooks for Plain {
    type Action = String;
    type Predicate = String;

    fn named_action(name: &str) -> String {
        name.to_string()
    }

    fn named_predicate(name: &str) -> String {
        name.to_string()
    }
}
