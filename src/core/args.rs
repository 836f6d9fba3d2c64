//! Trigger arguments and the plain-data view of an event in flight.

use super::model::ModelId;
use super::value::StateValue;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Positional and keyword arguments passed along with a trigger.
///
/// # Example
///
/// ```rust
/// use treestate::core::EventArgs;
/// use serde_json::json;
///
/// let args = EventArgs::new().arg(json!(3)).kwarg("force", json!(true));
/// assert_eq!(args.get(0), Some(&json!(3)));
/// assert_eq!(args.kw("force"), Some(&json!(true)));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EventArgs {
    #[serde(default)]
    pub positional: Vec<Value>,
    #[serde(default)]
    pub keywords: Map<String, Value>,
}

impl EventArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Set a keyword argument.
    pub fn kwarg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keywords.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.positional.get(index)
    }

    pub fn kw(&self, key: &str) -> Option<&Value> {
        self.keywords.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keywords.is_empty()
    }

    /// Merge call-time arguments behind a set of bound arguments.
    ///
    /// Bound positionals come first; call-time keywords override bound ones.
    pub fn bound_with(&self, call: &EventArgs) -> EventArgs {
        let mut positional = self.positional.clone();
        positional.extend(call.positional.iter().cloned());
        let mut keywords = self.keywords.clone();
        for (key, value) in &call.keywords {
            keywords.insert(key.clone(), value.clone());
        }
        EventArgs {
            positional,
            keywords,
        }
    }
}

impl fmt::Display for EventArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self.positional.iter().map(|v| v.to_string()).collect();
        parts.extend(self.keywords.iter().map(|(k, v)| format!("{k}={v}")));
        write!(f, "{}", parts.join(", "))
    }
}

/// Source and destination of a transition, as exposed to callbacks and
/// introspection. `dest` is `None` for internal transitions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionInfo {
    pub trigger: String,
    pub source: String,
    pub dest: Option<String>,
}

impl fmt::Display for TransitionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.dest {
            Some(dest) => write!(f, "{}: {} -> {}", self.trigger, self.source, dest),
            None => write!(f, "{}: {} (internal)", self.trigger, self.source),
        }
    }
}

/// Everything known about a trigger while it is being processed.
///
/// This is what model methods receive when the machine is configured to
/// send the event; closures get it wrapped together with a machine handle.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EventInfo {
    pub model: ModelId,
    pub trigger: String,
    pub args: EventArgs,
    /// The model's state when the trigger started, updated on state change
    pub state: Option<StateValue>,
    /// Fully qualified name of the level currently being attempted
    pub source: Option<String>,
    pub transition: Option<TransitionInfo>,
    pub error: Option<String>,
    pub result: bool,
}

impl EventInfo {
    pub fn new(model: ModelId, trigger: impl Into<String>, args: EventArgs) -> Self {
        Self {
            model,
            trigger: trigger.into(),
            args,
            state: None,
            source: None,
            transition: None,
            error: None,
            result: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bound_arguments_come_first() {
        let bound = EventArgs::new().arg(1).kwarg("mode", "slow");
        let call = EventArgs::new().arg(2).kwarg("mode", "fast");
        let merged = bound.bound_with(&call);
        assert_eq!(merged.positional, vec![json!(1), json!(2)]);
        assert_eq!(merged.kw("mode"), Some(&json!("fast")));
    }

    #[test]
    fn display_lists_positional_then_keywords() {
        let args = EventArgs::new().arg(1).kwarg("x", 2);
        assert_eq!(args.to_string(), "1, x=2");
    }

    #[test]
    fn internal_transition_display() {
        let info = TransitionInfo {
            trigger: "tick".into(),
            source: "A".into(),
            dest: None,
        };
        assert_eq!(info.to_string(), "tick: A (internal)");
    }
}
