//! Errors raised by machines and their configuration.

use crate::config::ConfigViolation;
use crate::core::ModelId;
use thiserror::Error;

/// Error type returned by user callbacks. Carried unchanged inside
/// [`MachineError::Callback`] so callers can downcast it.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while configuring or running a machine.
#[derive(Debug, Error)]
pub enum MachineError {
    #[error("State '{name}' is not a registered state")]
    UnregisteredState { name: String },

    #[error("State '{name}' is already registered in scope '{scope}'")]
    DuplicateState { name: String, scope: String },

    #[error("Invalid state name '{name}': names must be non-empty, must not be '*' and must not contain the separator '{separator}'")]
    InvalidStateName { name: String, separator: String },

    #[error("{machine}Can't trigger event '{trigger}' from state(s) {state}!")]
    InvalidTransition {
        machine: String,
        trigger: String,
        state: String,
    },

    #[error("Do not know event named '{trigger}'")]
    UnknownTrigger { trigger: String },

    #[error("Remapped destination '{name}' points into the reused states of '{branch}'")]
    AmbiguousDestination { name: String, branch: String },

    #[error("{machine}Attempt to process events synchronously while a transition is in progress; use a queued machine for nested triggers")]
    ReentrantTrigger { machine: String },

    #[error("No initial state configured. Call .initial(state) or pass an initial state to add_model")]
    NoInitialState,

    #[error("Model {id} is not registered with this machine")]
    UnknownModel { id: ModelId },

    #[error("Model {id} is still referenced by a running trigger")]
    ModelBusy { id: ModelId },

    #[error("Model {id} has no value in its state attribute '{attribute}'")]
    ModelNotInitialized { id: ModelId, attribute: String },

    #[error("Callback '{name}' could not be resolved on the model")]
    UnresolvedCallback { name: String },

    #[error("Callback '{callback}' failed: {source}")]
    Callback {
        callback: String,
        #[source]
        source: CallbackError,
    },

    #[error("'{name}' is defined by the model and was not bound by the machine")]
    Unbound { name: String },

    #[error("Invalid ordered transitions: {reason}")]
    InvalidOrdering { reason: String },

    #[error("Invalid machine configuration: {}", format_violations(.0))]
    InvalidConfig(Vec<ConfigViolation>),

    #[error("Configuration parse error: {0}")]
    Json(#[from] serde_json::Error),
}

fn format_violations(violations: &[ConfigViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl MachineError {
    /// The user error behind a failed callback, if this is one.
    pub fn callback_source(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::Callback { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }

    pub(crate) fn callback(callback: impl ToString, source: CallbackError) -> Self {
        Self::Callback {
            callback: callback.to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct Jammed;

    impl fmt::Display for Jammed {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "door jammed")
        }
    }

    impl std::error::Error for Jammed {}

    #[test]
    fn callback_errors_keep_their_source() {
        let err = MachineError::callback("open", Box::new(Jammed));
        assert_eq!(err.to_string(), "Callback 'open' failed: door jammed");
        assert!(err.callback_source().unwrap().downcast_ref::<Jammed>().is_some());
    }

    #[test]
    fn invalid_transition_message_names_trigger_and_state() {
        let err = MachineError::InvalidTransition {
            machine: String::new(),
            trigger: "melt".into(),
            state: "gas".into(),
        };
        assert_eq!(err.to_string(), "Can't trigger event 'melt' from state(s) gas!");
    }

    #[test]
    fn config_errors_list_every_violation() {
        let err = MachineError::InvalidConfig(vec![
            ConfigViolation::MissingInitial,
            ConfigViolation::UnknownState {
                name: "Z".into(),
                context: "transition 'go'".into(),
            },
        ]);
        let message = err.to_string();
        assert!(message.contains("initial"));
        assert!(message.contains("'Z'"));
    }
}
