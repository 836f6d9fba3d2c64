//! Serialisable snapshot of a machine: its state tree, transition table and
//! the current state of every model.

use crate::asyncio::AsyncMachine;
use crate::builder::Settings;
use crate::core::{Condition, Hooks, Initial, Model, ModelId, NestedState, Registry, StateValue};
use crate::effects::Machine;
use crate::error::MachineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MachineDescription {
    /// Version of the crate that produced the snapshot
    pub version: String,
    pub name: String,
    pub generated_at: DateTime<Utc>,
    pub separator: String,
    pub initial: Option<String>,
    pub queued: bool,
    pub states: Vec<StateDescription>,
    pub transitions: Vec<TransitionDescription>,
    pub hooks: HookDescription,
    pub models: Vec<ModelDescription>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateDescription {
    pub name: String,
    /// Fully qualified name
    pub path: String,
    pub parallel: bool,
    pub initial: Vec<String>,
    pub on_enter: Vec<String>,
    pub on_exit: Vec<String>,
    pub ignore_invalid_triggers: Option<bool>,
    pub children: Vec<StateDescription>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransitionDescription {
    pub trigger: String,
    pub source: String,
    /// `None` for internal transitions
    pub dest: Option<String>,
    pub auto: bool,
    pub conditions: Vec<String>,
    pub prepare: Vec<String>,
    pub before: Vec<String>,
    pub after: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HookDescription {
    pub prepare_event: Vec<String>,
    pub before_state_change: Vec<String>,
    pub after_state_change: Vec<String>,
    pub finalize_event: Vec<String>,
    pub on_exception: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelDescription {
    pub id: ModelId,
    pub state: StateValue,
}

impl MachineDescription {
    pub fn to_json(&self) -> Result<String, MachineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Transitions leaving `source`, auto transitions excluded.
    pub fn transitions_from<'d>(&'d self, source: &'d str) -> impl Iterator<Item = &'d TransitionDescription> {
        self.transitions
            .iter()
            .filter(move |t| !t.auto && t.source == source)
    }
}

fn labels<T: ToString>(items: &[T]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}

fn condition_labels<H: Hooks>(conditions: &[Condition<H>]) -> Vec<String> {
    conditions.iter().map(ToString::to_string).collect()
}

fn describe_state<H: Hooks>(state: &NestedState<H>, parent: Option<&str>, separator: &str) -> StateDescription {
    let path = match parent {
        Some(parent) => format!("{parent}{separator}{}", state.name()),
        None => state.name().to_string(),
    };
    let children = state
        .children()
        .iter()
        .map(|child| describe_state(child, Some(&path), separator))
        .collect();
    StateDescription {
        name: state.name().to_string(),
        parallel: state.initial().is_parallel(),
        initial: match state.initial() {
            Initial::None => Vec::new(),
            other => other.names().into_iter().map(str::to_string).collect(),
        },
        on_enter: labels(state.state().on_enter()),
        on_exit: labels(state.state().on_exit()),
        ignore_invalid_triggers: state.state().ignore_invalid_triggers(),
        children,
        path,
    }
}

/// Build a description from a registry snapshot and the models' states.
pub(crate) fn describe_registry<H: Hooks>(
    settings: &Settings,
    registry: &Registry<H>,
    models: Vec<ModelDescription>,
) -> MachineDescription {
    let separator = registry.separator();
    let transitions = registry
        .events()
        .iter()
        .flat_map(|event| {
            event.iter().map(move |transition| TransitionDescription {
                trigger: event.name().to_string(),
                source: transition.source().to_string(),
                dest: transition.dest().name().map(str::to_string),
                auto: event.is_auto(),
                conditions: condition_labels(transition.conditions()),
                prepare: labels(transition.prepare()),
                before: labels(transition.before()),
                after: labels(transition.after()),
            })
        })
        .collect();
    let hooks = registry.hooks();

    MachineDescription {
        version: env!("CARGO_PKG_VERSION").to_string(),
        name: settings.name.clone(),
        generated_at: Utc::now(),
        separator: separator.to_string(),
        initial: registry.initial().map(str::to_string),
        queued: settings.queued.is_queued(),
        states: registry
            .states()
            .iter()
            .map(|state| describe_state(state, None, separator))
            .collect(),
        transitions,
        hooks: HookDescription {
            prepare_event: labels(&hooks.prepare_event),
            before_state_change: labels(&hooks.before_state_change),
            after_state_change: labels(&hooks.after_state_change),
            finalize_event: labels(&hooks.finalize_event),
            on_exception: labels(&hooks.on_exception),
        },
        models,
    }
}

impl<M: Model> Machine<M> {
    /// Snapshot of the machine and its models.
    pub fn describe(&self) -> Result<MachineDescription, MachineError> {
        let models = self
            .models()
            .into_iter()
            .map(|id| self.state_of(id).map(|state| ModelDescription { id, state }))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(describe_registry(self.settings(), &self.registry(), models))
    }
}

impl<M: Model> AsyncMachine<M> {
    pub async fn describe(&self) -> Result<MachineDescription, MachineError> {
        let mut models = Vec::new();
        for id in self.models() {
            let state = self.state_of(id).await?;
            models.push(ModelDescription { id, state });
        }
        Ok(describe_registry(self.settings(), &self.registry(), models))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{StateSpec, TransitionSpec};
    use crate::core::Stateful;

    fn machine() -> Machine<Stateful> {
        Machine::builder()
            .name("door")
            .state(StateSpec::new("closed").on_enter("lock"))
            .state(StateSpec::new("open").children(["ajar", "wide"]).initial("ajar"))
            .initial("closed")
            .transition(TransitionSpec::new("push", "closed", "open").unless("is_locked").after("creak"))
            .transition(TransitionSpec::internal("knock", "closed"))
            .build()
            .unwrap()
    }

    #[test]
    fn describes_the_state_tree() {
        let description = machine().describe().unwrap();
        assert_eq!(description.name, "door");
        assert_eq!(description.initial.as_deref(), Some("closed"));
        assert_eq!(description.states[0].on_enter, vec!["lock".to_string()]);
        let open = &description.states[1];
        assert_eq!(open.initial, vec!["ajar".to_string()]);
        assert_eq!(open.children[1].path, "open_wide");
    }

    #[test]
    fn describes_transitions_with_labels() {
        let description = machine().describe().unwrap();
        let push: Vec<_> = description.transitions_from("closed").collect();
        assert_eq!(push.len(), 2);
        assert_eq!(push[0].trigger, "push");
        assert_eq!(push[0].conditions, vec!["unless is_locked".to_string()]);
        assert_eq!(push[0].after, vec!["creak".to_string()]);
        assert_eq!(push[1].dest, None);
        assert!(description.transitions.iter().any(|t| t.auto && t.trigger == "to_open_wide"));
    }

    #[test]
    fn includes_model_states_and_serialises() {
        let machine = machine();
        let id = machine.add_model(Stateful::new()).unwrap();
        let description = machine.describe().unwrap();
        assert_eq!(description.models[0].id, id);
        assert_eq!(description.models[0].state, StateValue::leaf("closed"));
        let json = description.to_json().unwrap();
        let back: MachineDescription = serde_json::from_str(&json).unwrap();
        assert_eq!(back, description);
    }
}
