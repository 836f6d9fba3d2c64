//! Declarative machine configuration.
//!
//! A [`MachineConfig`] is the serde form of a machine: states as plain
//! names or records, transitions as records or `[trigger, source, dest]`
//! triples. It is validated as a whole before anything is built.
//!
//! ```rust
//! use treestate::config::MachineConfig;
//! use treestate::core::{EventArgs, StateValue, Stateful};
//! use treestate::Machine;
//!
//! let config = MachineConfig::from_json(r#"{
//!     "initial": "solid",
//!     "states": ["solid", "liquid", {"name": "gas", "on_enter": "expand"}],
//!     "transitions": [
//!         ["melt", "solid", "liquid"],
//!         {"trigger": "evaporate", "source": "liquid", "dest": "gas"}
//!     ]
//! }"#).unwrap();
//! let machine: Machine<Stateful> = Machine::from_config(config).unwrap();
//! let id = machine.add_model(Stateful::new()).unwrap();
//! machine.trigger(id, "melt", EventArgs::new()).unwrap();
//! assert_eq!(machine.state_of(id).unwrap(), StateValue::leaf("liquid"));
//! ```

mod validate;

pub use validate::ConfigViolation;

use crate::asyncio::{AsyncMachine, Cooperative};
use crate::builder::{MachineBuilder, OrderedTransitions, Settings, StateSpec, Target, TransitionSpec};
use crate::core::{Blueprint, Hooks, Model};
use crate::effects::{Blocking, Machine};
use crate::error::MachineError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

/// One name or a list of names.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "OneOrMany", into = "Vec<String>")]
pub struct Names(pub Vec<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for Names {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(name) => Self(vec![name]),
            OneOrMany::Many(names) => Self(names),
        }
    }
}

impl From<Names> for Vec<String> {
    fn from(names: Names) -> Self {
        names.0
    }
}

impl Names {
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A state declaration: a plain name or a full record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateConfig {
    Name(String),
    Record(StateRecord),
}

impl StateConfig {
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) => name,
            Self::Record(record) => &record.name,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateRecord {
    pub name: String,
    pub on_enter: Names,
    pub on_exit: Names,
    pub ignore_invalid_triggers: Option<bool>,
    pub children: Vec<StateConfig>,
    /// Children that are all active together
    pub parallel: Vec<StateConfig>,
    pub initial: Option<String>,
    pub transitions: Vec<TransitionConfig>,
    /// Name of a machine, supplied at build time, whose states are grafted in
    pub embed: Option<String>,
    pub remap: BTreeMap<String, String>,
}

/// A transition declaration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransitionConfig {
    /// `[trigger, source, dest]`; a `null` dest makes it internal
    Positional(String, Names, Option<String>),
    Record(TransitionRecord),
}

impl TransitionConfig {
    pub fn trigger(&self) -> &str {
        match self {
            Self::Positional(trigger, _, _) => trigger,
            Self::Record(record) => &record.trigger,
        }
    }

    pub fn source(&self) -> &[String] {
        match self {
            Self::Positional(_, source, _) => &source.0,
            Self::Record(record) => &record.source.0,
        }
    }

    pub fn dest(&self) -> Option<&str> {
        match self {
            Self::Positional(_, _, dest) => dest.as_deref(),
            Self::Record(record) => record.dest.as_deref(),
        }
    }

    fn into_spec<H: Hooks>(self) -> TransitionSpec<H> {
        match self {
            Self::Positional(trigger, source, dest) => {
                TransitionSpec::new(trigger, source.0, target(dest))
            }
            Self::Record(record) => {
                let mut spec = TransitionSpec::new(record.trigger, record.source.0, target(record.dest));
                for name in record.conditions.0 {
                    spec = spec.when(name);
                }
                for name in record.unless.0 {
                    spec = spec.unless(name);
                }
                for name in record.prepare.0 {
                    spec = spec.prepare(name);
                }
                for name in record.before.0 {
                    spec = spec.before(name);
                }
                for name in record.after.0 {
                    spec = spec.after(name);
                }
                spec
            }
        }
    }
}

fn target(dest: Option<String>) -> Target {
    dest.map_or(Target::Internal, Target::from)
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionRecord {
    pub trigger: String,
    pub source: Names,
    pub dest: Option<String>,
    pub conditions: Names,
    pub unless: Names,
    pub prepare: Names,
    pub before: Names,
    pub after: Names,
}

/// Cyclic `next_state`-style transitions through a list of states.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderedConfig {
    /// Empty means every root state in declaration order
    pub states: Vec<String>,
    pub trigger: String,
    #[serde(rename = "loop")]
    pub looped: bool,
    pub loop_includes_initial: bool,
}

impl Default for OrderedConfig {
    fn default() -> Self {
        Self {
            states: Vec::new(),
            trigger: "next_state".to_string(),
            looped: true,
            loop_includes_initial: true,
        }
    }
}

/// Names of machine-wide callbacks.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HookConfig {
    pub prepare_event: Names,
    pub before_state_change: Names,
    pub after_state_change: Names,
    pub finalize_event: Names,
    pub on_exception: Names,
}

/// Serde form of a whole machine.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    #[serde(flatten)]
    pub settings: Settings,
    pub initial: Option<String>,
    pub states: Vec<StateConfig>,
    pub transitions: Vec<TransitionConfig>,
    pub ordered_transitions: Option<OrderedConfig>,
    #[serde(flatten)]
    pub hooks: HookConfig,
}

impl MachineConfig {
    pub fn from_json(json: &str) -> Result<Self, MachineError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, MachineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check every rule, accumulating all violations.
    pub fn validate(&self) -> Validation<(), NonEmptyVec<ConfigViolation>> {
        validate::validate(self, &BTreeMap::new())
    }

    /// Validate, then turn the configuration into a builder.
    pub fn into_builder<H: Hooks>(self) -> Result<MachineBuilder<H>, MachineError> {
        self.into_builder_with(&BTreeMap::new())
    }

    /// Like [`into_builder`](Self::into_builder), resolving `embed` entries
    /// against `blueprints`.
    pub fn into_builder_with<H: Hooks>(
        self,
        blueprints: &BTreeMap<String, Blueprint<H>>,
    ) -> Result<MachineBuilder<H>, MachineError> {
        let embedded: BTreeMap<String, Vec<String>> = blueprints
            .iter()
            .map(|(name, blueprint)| (name.clone(), blueprint_paths(blueprint, &self.settings.separator)))
            .collect();
        if let Validation::Failure(violations) = validate::validate(&self, &embedded) {
            return Err(MachineError::InvalidConfig(violations.iter().cloned().collect()));
        }

        let mut builder = MachineBuilder::new().with_settings(self.settings);
        if let Some(initial) = self.initial {
            builder = builder.initial(initial);
        }
        for state in self.states {
            builder = builder.state(state_spec(state, blueprints)?);
        }
        builder = builder.transitions(self.transitions.into_iter().map(TransitionConfig::into_spec));
        if let Some(ordered) = self.ordered_transitions {
            let mut chain = OrderedTransitions::new()
                .trigger(ordered.trigger)
                .looped(ordered.looped)
                .loop_includes_initial(ordered.loop_includes_initial);
            if !ordered.states.is_empty() {
                chain = chain.states(ordered.states);
            }
            builder = builder.ordered_transitions(chain);
        }
        let hooks = self.hooks;
        for name in hooks.prepare_event.0 {
            builder = builder.prepare_event(name);
        }
        for name in hooks.before_state_change.0 {
            builder = builder.before_state_change(name);
        }
        for name in hooks.after_state_change.0 {
            builder = builder.after_state_change(name);
        }
        for name in hooks.finalize_event.0 {
            builder = builder.finalize_event(name);
        }
        for name in hooks.on_exception.0 {
            builder = builder.on_exception(name);
        }
        Ok(builder)
    }
}

fn blueprint_paths<H: Hooks>(blueprint: &Blueprint<H>, separator: &str) -> Vec<String> {
    let mut paths = Vec::new();
    for state in blueprint.states() {
        paths.push(state.name().to_string());
        for relative in state.descendant_paths() {
            paths.push(format!("{}{separator}{}", state.name(), relative.join(separator)));
        }
    }
    paths
}

fn state_spec<H: Hooks>(
    state: StateConfig,
    blueprints: &BTreeMap<String, Blueprint<H>>,
) -> Result<StateSpec<H>, MachineError> {
    let record = match state {
        StateConfig::Name(name) => return Ok(StateSpec::new(name)),
        StateConfig::Record(record) => record,
    };
    let mut spec = StateSpec::new(record.name);
    for name in record.on_enter.0 {
        spec = spec.on_enter(name);
    }
    for name in record.on_exit.0 {
        spec = spec.on_exit(name);
    }
    if let Some(ignore) = record.ignore_invalid_triggers {
        spec = spec.ignore_invalid_triggers(ignore);
    }
    if !record.children.is_empty() {
        let children = record
            .children
            .into_iter()
            .map(|child| state_spec(child, blueprints))
            .collect::<Result<Vec<_>, _>>()?;
        spec = spec.children(children);
    }
    if !record.parallel.is_empty() {
        let regions = record
            .parallel
            .into_iter()
            .map(|child| state_spec(child, blueprints))
            .collect::<Result<Vec<_>, _>>()?;
        spec = spec.parallel(regions);
    }
    if let Some(embed) = record.embed {
        let blueprint = blueprints
            .get(&embed)
            .cloned()
            .ok_or_else(|| {
                MachineError::InvalidConfig(vec![ConfigViolation::UnknownBlueprint {
                    state: spec.name().to_string(),
                    name: embed.clone(),
                }])
            })?;
        spec = spec.embed(blueprint);
    }
    if let Some(initial) = record.initial {
        spec = spec.initial(initial);
    }
    for (from, to) in record.remap {
        spec = spec.remap(from, to);
    }
    for transition in record.transitions {
        spec = spec.transition(transition.into_spec());
    }
    Ok(spec)
}

impl<M: Model> Machine<M> {
    /// Build a blocking machine from a validated configuration.
    pub fn from_config(config: MachineConfig) -> Result<Self, MachineError> {
        config.into_builder::<Blocking<M>>()?.build()
    }

    pub fn from_json(json: &str) -> Result<Self, MachineError> {
        Self::from_config(MachineConfig::from_json(json)?)
    }
}

impl<M: Model> AsyncMachine<M> {
    pub fn from_config(config: MachineConfig) -> Result<Self, MachineError> {
        config.into_builder::<Cooperative<M>>()?.build()
    }

    pub fn from_json(json: &str) -> Result<Self, MachineError> {
        Self::from_config(MachineConfig::from_json(json)?)
    }
}
