//! Validation of declarative configurations.
//!
//! Every rule runs and every violation is reported, so a broken file can be
//! fixed in one pass.

use super::{MachineConfig, StateConfig, StateRecord, TransitionConfig};
use std::collections::{BTreeMap, HashSet};
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use thiserror::Error;

/// One problem found in a [`MachineConfig`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigViolation {
    #[error("no initial state configured")]
    MissingInitial,

    #[error("state in scope '{scope}' has an empty name")]
    EmptyName { scope: String },

    #[error("state name '{name}' must not be '*' or contain the separator '{separator}'")]
    InvalidName { name: String, separator: String },

    #[error("state '{name}' is declared twice in scope '{scope}'")]
    DuplicateState { name: String, scope: String },

    #[error("state '{name}' declares both children and parallel regions")]
    ConflictingLayout { name: String },

    #[error("initial child '{initial}' of state '{state}' is not one of its children")]
    UnknownInitial { state: String, initial: String },

    #[error("state '{state}' embeds unknown machine '{name}'")]
    UnknownBlueprint { state: String, name: String },

    #[error("state '{state}' remaps children without embedding a machine")]
    RemapWithoutEmbed { state: String },

    #[error("transition in {context} has an empty trigger")]
    EmptyTrigger { context: String },

    #[error("unknown state '{name}' referenced by {context}")]
    UnknownState { name: String, context: String },
}

pub(crate) type Checked = Validation<(), NonEmptyVec<ConfigViolation>>;

fn check(ok: bool, violation: impl FnOnce() -> ConfigViolation) -> Checked {
    if ok {
        Validation::success(())
    } else {
        Validation::fail(violation())
    }
}

/// Collects every fully qualified state name while checking declarations.
struct Walker<'c> {
    separator: &'c str,
    embedded: &'c BTreeMap<String, Vec<String>>,
    known: HashSet<String>,
    checks: Vec<Checked>,
}

impl Walker<'_> {
    fn join(&self, scope: &[String], name: &str) -> String {
        let mut parts: Vec<&str> = scope.iter().map(String::as_str).collect();
        parts.push(name);
        parts.join(self.separator)
    }

    fn states(&mut self, scope: &[String], states: &[StateConfig]) {
        let scope_name = scope.join(self.separator);
        let mut seen = HashSet::new();
        for state in states {
            let name = state.name();
            self.checks.push(check(!name.is_empty(), || ConfigViolation::EmptyName {
                scope: scope_name.clone(),
            }));
            self.checks.push(check(
                name != "*" && !name.contains(self.separator),
                || ConfigViolation::InvalidName {
                    name: name.to_string(),
                    separator: self.separator.to_string(),
                },
            ));
            self.checks.push(check(seen.insert(name), || ConfigViolation::DuplicateState {
                name: name.to_string(),
                scope: scope_name.clone(),
            }));
            self.known.insert(self.join(scope, name));
            if let StateConfig::Record(record) = state {
                self.record(scope, record);
            }
        }
    }

    fn record(&mut self, scope: &[String], record: &StateRecord) {
        let full = self.join(scope, &record.name);
        let mut path = scope.to_vec();
        path.push(record.name.clone());

        self.checks.push(check(
            record.children.is_empty() || record.parallel.is_empty(),
            || ConfigViolation::ConflictingLayout { name: full.clone() },
        ));
        self.checks.push(check(
            record.remap.is_empty() || record.embed.is_some(),
            || ConfigViolation::RemapWithoutEmbed { state: full.clone() },
        ));

        let mut child_names: Vec<String> = record
            .children
            .iter()
            .chain(&record.parallel)
            .map(|c| c.name().to_string())
            .collect();
        let embedded = self.embedded;
        if let Some(embed) = &record.embed {
            match embedded.get(embed) {
                Some(paths) => {
                    let prefix = path.join(self.separator);
                    for relative in paths {
                        let root = relative.split(self.separator).next().unwrap_or(relative);
                        if record.remap.contains_key(root) {
                            continue;
                        }
                        if !relative.contains(self.separator) {
                            child_names.push(relative.clone());
                        }
                        self.known.insert(format!("{prefix}{}{relative}", self.separator));
                    }
                }
                None => self.checks.push(Validation::fail(ConfigViolation::UnknownBlueprint {
                    state: full.clone(),
                    name: embed.clone(),
                })),
            }
        }
        if let Some(initial) = &record.initial {
            self.checks.push(check(child_names.contains(initial), || {
                ConfigViolation::UnknownInitial {
                    state: full.clone(),
                    initial: initial.clone(),
                }
            }));
        }

        self.states(&path, &record.children);
        self.states(&path, &record.parallel);
    }

    fn resolves(&self, scope: &[String], name: &str) -> bool {
        (!scope.is_empty() && self.known.contains(&self.join(scope, name))) || self.known.contains(name)
    }

    fn transitions(&mut self, scope: &[String], transitions: &[TransitionConfig]) {
        let context = if scope.is_empty() {
            "the machine".to_string()
        } else {
            format!("state '{}'", scope.join(self.separator))
        };
        for transition in transitions {
            let trigger = transition.trigger();
            self.checks.push(check(!trigger.is_empty(), || ConfigViolation::EmptyTrigger {
                context: context.clone(),
            }));
            let sources = transition.source().iter().filter(|s| s.as_str() != "*");
            let dest = transition.dest().filter(|d| *d != "=");
            for name in sources.map(String::as_str).chain(dest) {
                let known = self.resolves(scope, name);
                self.checks.push(check(known, || ConfigViolation::UnknownState {
                    name: name.to_string(),
                    context: format!("transition '{trigger}'"),
                }));
            }
        }
    }

    fn scoped_transitions(&mut self, scope: &[String], states: &[StateConfig]) {
        for state in states {
            if let StateConfig::Record(record) = state {
                let mut path = scope.to_vec();
                path.push(record.name.clone());
                self.transitions(&path, &record.transitions);
                self.scoped_transitions(&path, &record.children);
                self.scoped_transitions(&path, &record.parallel);
            }
        }
    }
}

/// Run every rule against `config`. `embedded` maps the machine names a
/// state may embed to the relative state paths they contribute.
pub(crate) fn validate(config: &MachineConfig, embedded: &BTreeMap<String, Vec<String>>) -> Checked {
    let mut walker = Walker {
        separator: &config.settings.separator,
        embedded,
        known: HashSet::new(),
        checks: Vec::new(),
    };
    walker.states(&[], &config.states);

    match &config.initial {
        None => walker.checks.push(Validation::fail(ConfigViolation::MissingInitial)),
        Some(initial) if initial.contains(walker.separator) => {
            let known = walker.known.contains(initial);
            walker.checks.push(check(known, || ConfigViolation::UnknownState {
                name: initial.clone(),
                context: "initial".to_string(),
            }));
        }
        // an undeclared root initial is added as a leaf
        Some(initial) => {
            walker.known.insert(initial.clone());
        }
    }

    walker.transitions(&[], &config.transitions);
    walker.scoped_transitions(&[], &config.states);
    if let Some(ordered) = &config.ordered_transitions {
        for name in &ordered.states {
            let known = walker.known.contains(name);
            walker.checks.push(check(known, || ConfigViolation::UnknownState {
                name: name.clone(),
                context: "ordered transitions".to_string(),
            }));
        }
    }

    Validation::all_vec(walker.checks).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violations(json: &str) -> Vec<ConfigViolation> {
        let config = MachineConfig::from_json(json).unwrap();
        match validate(&config, &BTreeMap::new()) {
            Validation::Success(()) => Vec::new(),
            Validation::Failure(errors) => errors.iter().cloned().collect(),
        }
    }

    #[test]
    fn valid_configuration_passes() {
        let found = violations(
            r#"{
                "initial": "A",
                "separator": ".",
                "states": ["A", {"name": "B", "children": ["x", "y"], "initial": "x"}],
                "transitions": [["go", "A", "B.y"], {"trigger": "back", "source": "*", "dest": "A"}]
            }"#,
        );
        assert!(found.is_empty(), "{found:?}");
    }

    #[test]
    fn every_violation_is_reported() {
        let found = violations(
            r#"{
                "states": ["A", "A", {"name": "B", "children": ["x"], "parallel": ["y"], "initial": "z"}],
                "transitions": [["go", "A", "Z"], ["", "Q", "A"]]
            }"#,
        );
        assert!(found.contains(&ConfigViolation::MissingInitial));
        assert!(found.contains(&ConfigViolation::DuplicateState {
            name: "A".into(),
            scope: String::new(),
        }));
        assert!(found.contains(&ConfigViolation::ConflictingLayout { name: "B".into() }));
        assert!(found.contains(&ConfigViolation::UnknownInitial {
            state: "B".into(),
            initial: "z".into(),
        }));
        assert!(found.contains(&ConfigViolation::UnknownState {
            name: "Z".into(),
            context: "transition 'go'".into(),
        }));
        assert!(found.iter().any(|v| matches!(v, ConfigViolation::EmptyTrigger { .. })));
        assert!(found.iter().any(|v| matches!(v, ConfigViolation::UnknownState { name, .. } if name == "Q")));
    }

    #[test]
    fn scoped_transitions_resolve_relative_names() {
        let found = violations(
            r#"{
                "initial": "P",
                "states": [{"name": "P", "children": ["a", "b"], "initial": "a",
                            "transitions": [["step", "a", "b"]]}]
            }"#,
        );
        assert!(found.is_empty(), "{found:?}");
    }

    #[test]
    fn names_containing_the_separator_are_rejected() {
        let found = violations(r#"{"initial": "A", "states": ["A", "B_C"]}"#);
        assert_eq!(
            found,
            vec![ConfigViolation::InvalidName {
                name: "B_C".into(),
                separator: "_".into(),
            }]
        );
    }
}
