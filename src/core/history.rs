//! Committed state changes of a model.
//!
//! When a machine is built with `record_history`, every committed state
//! change of a model is appended to that model's history. Histories are
//! plain values: `record` consumes the history and returns the extended one.

use super::value::StateValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One committed state change.
///
/// # Example
///
/// ```rust
/// use treestate::core::{StateTransition, StateValue};
/// use chrono::Utc;
///
/// let step = StateTransition {
///     trigger: "melt".to_string(),
///     from: StateValue::leaf("solid"),
///     to: StateValue::leaf("liquid"),
///     timestamp: Utc::now(),
/// };
/// assert!(!step.is_reflexive());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateTransition {
    /// Trigger or `to_<state>` jump that caused the change
    pub trigger: String,
    pub from: StateValue,
    pub to: StateValue,
    pub timestamp: DateTime<Utc>,
}

impl StateTransition {
    /// Whether the model ended up where it started, as with `=` destinations.
    pub fn is_reflexive(&self) -> bool {
        self.from == self.to
    }
}

/// Append-only log of [`StateTransition`]s.
///
/// # Example
///
/// ```rust
/// use treestate::core::{StateHistory, StateTransition, StateValue};
/// use chrono::Utc;
///
/// let step = |trigger: &str, from: &str, to: &str| StateTransition {
///     trigger: trigger.to_string(),
///     from: StateValue::leaf(from),
///     to: StateValue::leaf(to),
///     timestamp: Utc::now(),
/// };
/// let history = StateHistory::new()
///     .record(step("heat", "solid", "liquid"))
///     .record(step("heat", "liquid", "gas"));
///
/// assert_eq!(history.visited().len(), 3);
/// assert_eq!(history.count("heat"), 2);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StateHistory {
    steps: Vec<StateTransition>,
}

impl StateHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(mut self, step: StateTransition) -> Self {
        self.steps.push(step);
        self
    }

    /// Every state value the model rested in, starting with the first source.
    pub fn visited(&self) -> Vec<&StateValue> {
        self.steps
            .first()
            .map(|first| &first.from)
            .into_iter()
            .chain(self.steps.iter().map(|step| &step.to))
            .collect()
    }

    /// Number of committed changes caused by `trigger`.
    pub fn count(&self, trigger: &str) -> usize {
        self.steps.iter().filter(|step| step.trigger == trigger).count()
    }

    /// Changes committed at or after `instant`.
    pub fn since(&self, instant: DateTime<Utc>) -> impl Iterator<Item = &StateTransition> {
        self.steps.iter().filter(move |step| step.timestamp >= instant)
    }

    /// Wall time between the first and the last change.
    pub fn span(&self) -> Option<Duration> {
        let first = self.steps.first()?;
        let last = self.steps.last()?;
        last.timestamp.signed_duration_since(first.timestamp).to_std().ok()
    }

    pub fn steps(&self) -> &[StateTransition] {
        &self.steps
    }

    pub fn last(&self) -> Option<&StateTransition> {
        self.steps.last()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(trigger: &str, from: &str, to: &str) -> StateTransition {
        StateTransition {
            trigger: trigger.to_string(),
            from: StateValue::leaf(from),
            to: StateValue::leaf(to),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn empty_history_has_no_span() {
        let history = StateHistory::new();
        assert!(history.is_empty());
        assert!(history.visited().is_empty());
        assert!(history.span().is_none());
    }

    #[test]
    fn visited_lists_source_then_destinations() {
        let history = StateHistory::new()
            .record(step("deep", "A", "B_2_b"))
            .record(step("up", "B_2_b", "A"));
        assert_eq!(
            history.visited(),
            [&StateValue::leaf("A"), &StateValue::leaf("B_2_b"), &StateValue::leaf("A")]
        );
        assert_eq!(history.count("up"), 1);
        assert_eq!(history.last().map(|t| t.trigger.as_str()), Some("up"));
    }

    #[test]
    fn reflexive_steps_are_detected() {
        assert!(step("again", "B_1", "B_1").is_reflexive());
        assert!(!step("hop", "B_2_a", "B_1").is_reflexive());
    }

    #[test]
    fn since_filters_by_timestamp() {
        let history = StateHistory::new().record(step("go", "A", "B"));
        let cutoff = Utc::now();
        std::thread::sleep(Duration::from_millis(5));
        let history = history.record(step("back", "B", "A"));

        let recent: Vec<_> = history.since(cutoff).map(|t| t.trigger.as_str()).collect();
        assert_eq!(recent, ["back"]);
        assert!(history.span().unwrap() >= Duration::from_millis(5));
    }

    #[test]
    fn parallel_values_survive_serialization() {
        let history = StateHistory::new().record(StateTransition {
            trigger: "split".to_string(),
            from: StateValue::leaf("A"),
            to: StateValue::from(vec!["P_1", "P_2"]),
            timestamp: Utc::now(),
        });

        let json = serde_json::to_string(&history).unwrap();
        let restored: StateHistory = serde_json::from_str(&json).unwrap();
        assert_eq!(history, restored);
    }
}
