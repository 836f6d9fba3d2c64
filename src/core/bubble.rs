//! Resolution order of a trigger over the active states of one model.
//!
//! Each active leaf is tried in document order. From a leaf the trigger
//! bubbles towards the root until a level with transitions for it fires.
//! A level is attempted at most once per trigger, and a level that fired
//! marks the ancestors below it as handled. Engines drive a [`Bubbling`]
//! and run the transitions of each source it yields.

use super::event::Event;
use super::hooks::Hooks;
use super::registry::Registry;
use super::value::{ActiveTree, StateValue};
use crate::error::MachineError;
use std::collections::HashSet;

/// Cursor over the sources a trigger is attempted from.
pub struct Bubbling<'r, H: Hooks> {
    registry: &'r Registry<H>,
    event: &'r Event<H>,
    leaves: std::vec::IntoIter<Vec<String>>,
    /// Leaf being bubbled and the depth of the next level to try
    cursor: Option<(Vec<String>, usize)>,
    /// Depth of the source last handed out
    attempted: usize,
    handled: HashSet<String>,
    result: Option<bool>,
}

impl<'r, H: Hooks> Bubbling<'r, H> {
    /// `None` when no transition is registered under `trigger`.
    pub fn new(registry: &'r Registry<H>, trigger: &str, current: &StateValue) -> Option<Self> {
        let event = registry.event(trigger)?;
        Some(Self {
            registry,
            event,
            leaves: registry.leaf_paths(current).into_iter(),
            cursor: None,
            attempted: 0,
            handled: HashSet::new(),
            result: None,
        })
    }

    pub fn event(&self) -> &'r Event<H> {
        self.event
    }

    /// Next source to fire, given the model's state right now. Leaves that
    /// an earlier transition deactivated are skipped.
    pub fn next_source(&mut self, active: &StateValue) -> Option<String> {
        loop {
            let (leaf, depth) = match self.cursor.take() {
                Some(cursor) => cursor,
                None => {
                    let leaf = self.leaves.next()?;
                    let tree = ActiveTree::from_value(active, self.registry.separator());
                    if !tree.contains(leaf.as_slice()) {
                        continue;
                    }
                    let depth = leaf.len();
                    (leaf, depth)
                }
            };
            if depth == 0 {
                continue;
            }
            let source = self.registry.join(&leaf[..depth]);
            if !self.handled.insert(source.clone()) {
                continue;
            }
            self.cursor = Some((leaf, depth - 1));
            if self.event.transitions_from(&source).is_some() {
                self.attempted = depth;
                return Some(source);
            }
        }
    }

    /// Report whether the source last returned by [`next_source`](Self::next_source) fired.
    pub fn record(&mut self, fired: bool) {
        self.result = Some(self.result.unwrap_or(false) | fired);
        if !fired {
            return;
        }
        if let Some((leaf, _)) = self.cursor.take() {
            for level in 1..self.attempted {
                self.handled.insert(self.registry.join(&leaf[..level]));
            }
        }
    }

    /// `None` when no level had transitions, otherwise whether any fired.
    pub fn result(&self) -> Option<bool> {
        self.result
    }
}

impl<H: Hooks> Registry<H> {
    /// Classify a trigger that no active state had transitions for.
    ///
    /// `Ok(())` means the trigger is ignored: every active leaf ignores
    /// invalid triggers, its own setting overriding `default`. Otherwise the
    /// error is `InvalidTransition` for a known trigger and `UnknownTrigger`
    /// for a name no event carries.
    pub fn classify_unhandled(
        &self,
        trigger: &str,
        state: &StateValue,
        default: bool,
        machine: String,
    ) -> Result<(), MachineError> {
        if self.ignores_invalid(state, default) {
            Ok(())
        } else if self.has_trigger(trigger) {
            Err(MachineError::InvalidTransition {
                machine,
                trigger: trigger.to_string(),
                state: state.to_string(),
            })
        } else {
            Err(MachineError::UnknownTrigger {
                trigger: trigger.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{StateSpec, TransitionSpec};
    use crate::core::testing::Plain;

    type Spec = StateSpec<Plain>;

    /// B{1{a, b}} and parallel P{x, y}, with `go` on several levels.
    fn registry() -> Registry<Plain> {
        let mut reg = Registry::new(".", false);
        let b = Spec::new("B").children([Spec::new("1").children(["a", "b"]).initial("a")]).initial("1");
        let p = Spec::new("P").parallel(["x", "y"]);
        reg.add_states(&[], vec![b, p]).unwrap();
        for (source, dest) in [("B.1.a", "B.1.b"), ("B", "P"), ("P.x", "B"), ("P", "B"), ("P.y", "B")] {
            reg.add_transition(&[], TransitionSpec::new("go", source, dest)).unwrap();
        }
        reg
    }

    fn sources(reg: &Registry<Plain>, state: &StateValue, outcomes: &[bool]) -> (Vec<String>, Option<bool>) {
        let mut bubbling = Bubbling::new(reg, "go", state).unwrap();
        let mut seen = Vec::new();
        let mut outcomes = outcomes.iter();
        while let Some(source) = bubbling.next_source(state) {
            seen.push(source);
            bubbling.record(outcomes.next().copied().unwrap_or(false));
        }
        (seen, bubbling.result())
    }

    #[test]
    fn failed_levels_bubble_to_ancestors_with_transitions() {
        let reg = registry();
        let (seen, result) = sources(&reg, &StateValue::leaf("B.1.a"), &[false, true]);
        assert_eq!(seen, ["B.1.a", "B"]);
        assert_eq!(result, Some(true));
    }

    #[test]
    fn a_fired_level_stops_bubbling_for_its_leaf() {
        let reg = registry();
        let (seen, _) = sources(&reg, &StateValue::leaf("B.1.a"), &[true]);
        assert_eq!(seen, ["B.1.a"]);
    }

    #[test]
    fn shared_ancestors_are_attempted_once() {
        let reg = registry();
        let state = StateValue::from(vec!["P.x", "P.y"]);
        let (seen, result) = sources(&reg, &state, &[false, false, false]);
        assert_eq!(seen, ["P.x", "P", "P.y"]);
        assert_eq!(result, Some(false));
    }

    #[test]
    fn firing_marks_the_leafs_ancestors_handled() {
        let reg = registry();
        let state = StateValue::from(vec!["P.x", "P.y"]);
        let (seen, _) = sources(&reg, &state, &[true, false]);
        assert_eq!(seen, ["P.x", "P.y"]);
    }

    #[test]
    fn deactivated_leaves_are_skipped() {
        let reg = registry();
        let before = StateValue::from(vec!["P.x", "P.y"]);
        let mut bubbling = Bubbling::new(&reg, "go", &before).unwrap();
        assert_eq!(bubbling.next_source(&before).as_deref(), Some("P.x"));
        bubbling.record(true);
        assert_eq!(bubbling.next_source(&StateValue::leaf("B.1.a")), None);
    }

    #[test]
    fn unknown_triggers_have_no_bubbling() {
        let reg = registry();
        assert!(Bubbling::new(&reg, "nope", &StateValue::leaf("B.1.a")).is_none());
    }

    #[test]
    fn unhandled_triggers_are_classified() {
        let reg = registry();
        let state = StateValue::leaf("B.1.b");
        assert!(reg.classify_unhandled("go", &state, true, String::new()).is_ok());
        assert!(matches!(
            reg.classify_unhandled("go", &state, false, String::new()),
            Err(MachineError::InvalidTransition { .. })
        ));
        assert!(matches!(
            reg.classify_unhandled("nope", &state, false, String::new()),
            Err(MachineError::UnknownTrigger { .. })
        ));
    }
}
