//! Builder for constructing machines.

use crate::asyncio::{AsyncMachine, Cooperative};
use crate::builder::state::StateSpec;
use crate::builder::transition::{OrderedTransitions, TransitionSpec};
use crate::core::{Hooks, IntoAction, MachineHooks, Model, Registry};
use crate::effects::{Blocking, LockedMachine, Machine};
use crate::error::MachineError;
use serde::{Deserialize, Serialize};

/// How triggers issued while another trigger is running are handled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueMode {
    /// Process immediately; nested triggers on the same thread are rejected
    #[default]
    Off,
    /// One FIFO queue shared by every model
    Machine,
    /// One FIFO queue per model
    Model,
}

impl QueueMode {
    pub fn is_queued(&self) -> bool {
        !matches!(self, Self::Off)
    }
}

/// Engine settings fixed at build time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub name: String,
    /// Hand callbacks the full event context instead of only the arguments
    pub send_event: bool,
    pub auto_transitions: bool,
    pub ignore_invalid_triggers: bool,
    pub queued: QueueMode,
    pub model_attribute: String,
    pub separator: String,
    pub record_history: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            name: String::new(),
            send_event: false,
            auto_transitions: true,
            ignore_invalid_triggers: false,
            queued: QueueMode::Off,
            model_attribute: "state".to_string(),
            separator: "_".to_string(),
            record_history: false,
        }
    }
}

impl Settings {
    /// Prefix put in front of error messages: `"name: "`, or nothing.
    pub fn prefix(&self) -> String {
        if self.name.is_empty() {
            String::new()
        } else {
            format!("{}: ", self.name)
        }
    }
}

/// Builder for constructing machines with a fluent API.
///
/// # Example
///
/// ```rust
/// use treestate::builder::{MachineBuilder, TransitionSpec};
/// use treestate::core::Stateful;
/// use treestate::Blocking;
///
/// let machine = MachineBuilder::<Blocking<Stateful>>::new()
///     .states(["solid", "liquid", "gas"])
///     .initial("solid")
///     .transition(TransitionSpec::new("melt", "solid", "liquid"))
///     .build()
///     .unwrap();
/// assert!(machine.has_trigger("melt"));
/// ```
pub struct MachineBuilder<H: Hooks> {
    settings: Settings,
    initial: Option<String>,
    states: Vec<StateSpec<H>>,
    transitions: Vec<TransitionSpec<H>>,
    ordered: Option<OrderedTransitions<H>>,
    hooks: MachineHooks<H>,
}

impl<H: Hooks> MachineBuilder<H> {
    pub fn new() -> Self {
        Self {
            settings: Settings::default(),
            initial: None,
            states: Vec::new(),
            transitions: Vec::new(),
            ordered: None,
            hooks: MachineHooks::default(),
        }
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.settings.name = name.into();
        self
    }

    /// Initial state of every model added without one. A root name that is
    /// not declared is added as a leaf.
    pub fn initial(mut self, state: impl Into<String>) -> Self {
        self.initial = Some(state.into());
        self
    }

    pub fn send_event(mut self, send: bool) -> Self {
        self.settings.send_event = send;
        self
    }

    pub fn auto_transitions(mut self, enabled: bool) -> Self {
        self.settings.auto_transitions = enabled;
        self
    }

    pub fn ignore_invalid_triggers(mut self, ignore: bool) -> Self {
        self.settings.ignore_invalid_triggers = ignore;
        self
    }

    pub fn queued(mut self, mode: QueueMode) -> Self {
        self.settings.queued = mode;
        self
    }

    pub fn model_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.settings.model_attribute = attribute.into();
        self
    }

    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.settings.separator = separator.into();
        self
    }

    pub fn record_history(mut self, record: bool) -> Self {
        self.settings.record_history = record;
        self
    }

    pub fn state(mut self, spec: StateSpec<H>) -> Self {
        self.states.push(spec);
        self
    }

    pub fn states<S: Into<StateSpec<H>>>(mut self, specs: impl IntoIterator<Item = S>) -> Self {
        self.states.extend(specs.into_iter().map(Into::into));
        self
    }

    pub fn transition(mut self, spec: TransitionSpec<H>) -> Self {
        self.transitions.push(spec);
        self
    }

    pub fn transitions(mut self, specs: impl IntoIterator<Item = TransitionSpec<H>>) -> Self {
        self.transitions.extend(specs);
        self
    }

    pub fn ordered_transitions(mut self, ordered: OrderedTransitions<H>) -> Self {
        self.ordered = Some(ordered);
        self
    }

    pub fn prepare_event(mut self, action: impl IntoAction<H>) -> Self {
        self.hooks.prepare_event.push(action.into_action());
        self
    }

    pub fn before_state_change(mut self, action: impl IntoAction<H>) -> Self {
        self.hooks.before_state_change.push(action.into_action());
        self
    }

    pub fn after_state_change(mut self, action: impl IntoAction<H>) -> Self {
        self.hooks.after_state_change.push(action.into_action());
        self
    }

    pub fn finalize_event(mut self, action: impl IntoAction<H>) -> Self {
        self.hooks.finalize_event.push(action.into_action());
        self
    }

    pub fn on_exception(mut self, action: impl IntoAction<H>) -> Self {
        self.hooks.on_exception.push(action.into_action());
        self
    }

    /// Register everything collected so far. Any error aborts the build.
    pub(crate) fn into_parts(self) -> Result<(Settings, Registry<H>), MachineError> {
        let Self {
            settings,
            initial,
            mut states,
            transitions,
            ordered,
            hooks,
        } = self;

        let mut registry = Registry::new(settings.separator.clone(), settings.auto_transitions);
        if let Some(initial) = &initial {
            let declared = states.iter().any(|s| s.name() == initial.as_str());
            if !declared && !initial.contains(settings.separator.as_str()) {
                states.push(StateSpec::new(initial.clone()));
            }
        }
        registry.add_states(&[], states)?;
        if let Some(initial) = &initial {
            registry.set_initial(initial)?;
        }
        for spec in transitions {
            registry.add_transition(&[], spec)?;
        }
        if let Some(ordered) = &ordered {
            registry.add_ordered_transitions(ordered)?;
        }
        registry.hooks = hooks;
        Ok((settings, registry))
    }
}

impl<H: Hooks> Default for MachineBuilder<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model> MachineBuilder<Blocking<M>> {
    /// Build a blocking machine.
    pub fn build(self) -> Result<Machine<M>, MachineError> {
        let (settings, registry) = self.into_parts()?;
        Ok(Machine::from_parts(settings, registry))
    }

    /// Build a blocking machine wrapped in reentrant lock contexts.
    pub fn build_locked(self) -> Result<LockedMachine<M>, MachineError> {
        Ok(LockedMachine::new(self.build()?))
    }
}

impl<M: Model> MachineBuilder<Cooperative<M>> {
    /// Build an async machine handle.
    pub fn build(self) -> Result<AsyncMachine<M>, MachineError> {
        let (settings, registry) = self.into_parts()?;
        Ok(AsyncMachine::from_parts(settings, registry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::Plain;

    #[test]
    fn builder_registers_states_and_transitions() {
        let (settings, registry) = MachineBuilder::<Plain>::new()
            .states(["A", "B"])
            .initial("A")
            .transition(TransitionSpec::new("go", "A", "B"))
            .into_parts()
            .unwrap();
        assert_eq!(settings.separator, "_");
        assert_eq!(registry.initial(), Some("A"));
        assert!(registry.has_trigger("go"));
        assert!(registry.has_trigger("to_B"));
    }

    #[test]
    fn undeclared_initial_becomes_a_state() {
        let (_, registry) = MachineBuilder::<Plain>::new()
            .initial("idle")
            .into_parts()
            .unwrap();
        assert!(registry.get_state("idle").is_ok());
    }

    #[test]
    fn nested_initial_must_exist() {
        let result = MachineBuilder::<Plain>::new()
            .separator(".")
            .state(StateSpec::new("P").children(["x"]))
            .initial("P.y")
            .into_parts();
        assert!(matches!(result, Err(MachineError::UnregisteredState { .. })));
    }

    #[test]
    fn unknown_transition_endpoint_fails_the_build() {
        let result = MachineBuilder::<Plain>::new()
            .states(["A"])
            .transition(TransitionSpec::new("go", "A", "Z"))
            .into_parts();
        assert!(result.is_err());
    }

    #[test]
    fn ordered_transitions_start_at_initial() {
        let (_, registry) = MachineBuilder::<Plain>::new()
            .auto_transitions(false)
            .states(["A", "B", "C"])
            .initial("B")
            .ordered_transitions(OrderedTransitions::new())
            .into_parts()
            .unwrap();
        let found = registry.get_transitions(Some("next_state"), Some("B"), None);
        assert_eq!(found[0].dest.as_deref(), Some("C"));
    }

    #[test]
    fn builder_hooks_land_on_the_registry() {
        let (_, registry) = MachineBuilder::<Plain>::new()
            .states(["A"])
            .prepare_event("log")
            .finalize_event("flush")
            .into_parts()
            .unwrap();
        assert_eq!(registry.hooks().prepare_event, vec!["log".to_string()]);
        assert_eq!(registry.hooks().finalize_event, vec!["flush".to_string()]);
        assert!(registry.hooks().on_exception.is_empty());
    }

    #[test]
    fn prefix_follows_name() {
        let settings = Settings {
            name: "door".into(),
            ..Settings::default()
        };
        assert_eq!(settings.prefix(), "door: ");
        assert_eq!(Settings::default().prefix(), "");
    }
}
