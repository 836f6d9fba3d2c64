//! The state tree and event table of a machine.
//!
//! Everything here is pure: registering states and transitions, resolving
//! scoped names, and planning a hierarchical state change. Executing the
//! callbacks a plan calls for is left to the engines.

use super::args::TransitionInfo;
use super::event::Event;
use super::hooks::Hooks;
use super::state::{resolve, resolve_mut, CallbackKind, Initial, NestedState, State};
use super::transition::{Dest, Transition};
use super::value::{ActiveTree, StateValue};
use crate::builder::{Child, Layout, OrderedTransitions, Source, StateSpec, Target, TransitionSpec};
use crate::error::MachineError;
use std::collections::BTreeMap;

/// Machine-level callbacks, run around every event and state change.
pub struct MachineHooks<H: Hooks> {
    pub prepare_event: Vec<H::Action>,
    pub before_state_change: Vec<H::Action>,
    pub after_state_change: Vec<H::Action>,
    pub finalize_event: Vec<H::Action>,
    pub on_exception: Vec<H::Action>,
}

impl<H: Hooks> Default for MachineHooks<H> {
    fn default() -> Self {
        Self {
            prepare_event: Vec::new(),
            before_state_change: Vec::new(),
            after_state_change: Vec::new(),
            finalize_event: Vec::new(),
            on_exception: Vec::new(),
        }
    }
}

impl<H: Hooks> Clone for MachineHooks<H> {
    fn clone(&self) -> Self {
        Self {
            prepare_event: self.prepare_event.clone(),
            before_state_change: self.before_state_change.clone(),
            after_state_change: self.after_state_change.clone(),
            finalize_event: self.finalize_event.clone(),
            on_exception: self.on_exception.clone(),
        }
    }
}

/// Reusable copy of a machine's states and events, for embedding.
pub struct Blueprint<H: Hooks> {
    pub(crate) states: Vec<NestedState<H>>,
    pub(crate) events: Vec<Event<H>>,
    pub(crate) initial: Option<String>,
    pub(crate) separator: String,
}

impl<H: Hooks> Clone for Blueprint<H> {
    fn clone(&self) -> Self {
        Self {
            states: self.states.clone(),
            events: self.events.clone(),
            initial: self.initial.clone(),
            separator: self.separator.clone(),
        }
    }
}

impl<H: Hooks> Blueprint<H> {
    pub fn states(&self) -> &[NestedState<H>] {
        &self.states
    }

    pub fn initial(&self) -> Option<&str> {
        self.initial.as_deref()
    }
}

/// Exit and enter sequence for one hierarchical state change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatePlan {
    /// Absolute paths, exited in this order
    pub exits: Vec<Vec<String>>,
    /// Absolute paths, entered in this order
    pub enters: Vec<Vec<String>>,
    /// The model's state once the change is committed
    pub next: StateValue,
}

enum Pending<H: Hooks> {
    Scoped {
        scope: Vec<String>,
        spec: TransitionSpec<H>,
    },
    Grafted {
        trigger: String,
        transition: Transition<H>,
        dest: GraftDest,
        scope: Vec<String>,
        branch: Vec<String>,
    },
}

enum GraftDest {
    Keep,
    Remapped(String),
}

/// States, events, initial state and machine-level hooks.
pub struct Registry<H: Hooks> {
    separator: String,
    states: Vec<NestedState<H>>,
    events: Vec<Event<H>>,
    initial: Option<String>,
    auto_transitions: bool,
    pub(crate) hooks: MachineHooks<H>,
}

impl<H: Hooks> Clone for Registry<H> {
    fn clone(&self) -> Self {
        Self {
            separator: self.separator.clone(),
            states: self.states.clone(),
            events: self.events.clone(),
            initial: self.initial.clone(),
            auto_transitions: self.auto_transitions,
            hooks: self.hooks.clone(),
        }
    }
}

impl<H: Hooks> Registry<H> {
    pub fn new(separator: impl Into<String>, auto_transitions: bool) -> Self {
        Self {
            separator: separator.into(),
            states: Vec::new(),
            events: Vec::new(),
            initial: None,
            auto_transitions,
            hooks: MachineHooks::default(),
        }
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    pub fn initial(&self) -> Option<&str> {
        self.initial.as_deref()
    }

    pub fn hooks(&self) -> &MachineHooks<H> {
        &self.hooks
    }

    pub fn set_initial(&mut self, name: &str) -> Result<(), MachineError> {
        self.get_state(name)?;
        self.initial = Some(name.to_string());
        Ok(())
    }

    pub fn split(&self, name: &str) -> Vec<String> {
        name.split(self.separator.as_str()).map(str::to_string).collect()
    }

    pub fn join<S: AsRef<str>>(&self, path: &[S]) -> String {
        path.iter()
            .map(|s| s.as_ref())
            .collect::<Vec<_>>()
            .join(&self.separator)
    }

    /// Root-scope states in declaration order.
    pub fn states(&self) -> &[NestedState<H>] {
        &self.states
    }

    pub fn get_state(&self, name: &str) -> Result<&NestedState<H>, MachineError> {
        resolve(&self.states, &self.split(name)).ok_or_else(|| MachineError::UnregisteredState {
            name: name.to_string(),
        })
    }

    pub(crate) fn state_at<S: AsRef<str>>(&self, path: &[S]) -> Option<&NestedState<H>> {
        resolve(&self.states, path)
    }

    fn get_state_mut(&mut self, name: &str) -> Result<&mut NestedState<H>, MachineError> {
        let path = self.split(name);
        resolve_mut(&mut self.states, &path).ok_or_else(|| MachineError::UnregisteredState {
            name: name.to_string(),
        })
    }

    /// Every registered state as an absolute path, depth-first in declaration order.
    pub fn all_paths(&self) -> Vec<Vec<String>> {
        self.paths_in_scope(&[])
    }

    /// Every fully qualified state name, depth-first in declaration order.
    pub fn state_names(&self) -> Vec<String> {
        self.all_paths().iter().map(|p| self.join(p)).collect()
    }

    fn paths_in_scope(&self, scope: &[String]) -> Vec<Vec<String>> {
        let with_prefix = |prefix: &[String], state: &NestedState<H>| {
            state
                .descendant_paths()
                .into_iter()
                .map(|rel| {
                    let mut path = prefix.to_vec();
                    path.extend(rel);
                    path
                })
                .collect::<Vec<_>>()
        };
        if scope.is_empty() {
            let mut out = Vec::new();
            for state in &self.states {
                let root = vec![state.name().to_string()];
                out.push(root.clone());
                out.extend(with_prefix(&root, state));
            }
            out
        } else {
            match resolve(&self.states, scope) {
                Some(state) => with_prefix(scope, state),
                None => Vec::new(),
            }
        }
    }

    /// Resolve `name` relative to `scope` first, then from the root.
    pub fn resolve_scoped(&self, scope: &[String], name: &str) -> Option<Vec<String>> {
        let relative = self.split(name);
        let mut candidate = scope.to_vec();
        candidate.extend(relative.iter().cloned());
        if resolve(&self.states, &candidate).is_some() {
            return Some(candidate);
        }
        if !scope.is_empty() && resolve(&self.states, &relative).is_some() {
            return Some(relative);
        }
        None
    }

    pub fn events(&self) -> &[Event<H>] {
        &self.events
    }

    pub fn event(&self, trigger: &str) -> Option<&Event<H>> {
        self.events.iter().find(|e| e.name() == trigger)
    }

    pub fn has_trigger(&self, trigger: &str) -> bool {
        self.event(trigger).is_some()
    }

    fn event_entry(&mut self, trigger: &str) -> &mut Event<H> {
        let index = match self.events.iter().position(|e| e.name() == trigger) {
            Some(index) => index,
            None => {
                self.events.push(Event::new(trigger));
                self.events.len() - 1
            }
        };
        &mut self.events[index]
    }

    fn validate_name(&self, name: &str) -> Result<(), MachineError> {
        if name.is_empty() || name.contains(self.separator.as_str()) || name == Source::WILDCARD {
            return Err(MachineError::InvalidStateName {
                name: name.to_string(),
                separator: self.separator.clone(),
            });
        }
        Ok(())
    }

    /// Register states below `parent` (the root scope when empty).
    ///
    /// Returns the fully qualified names of every state added, children
    /// included. Scoped and grafted transitions are registered once the
    /// whole batch is in the tree.
    pub fn add_states(
        &mut self,
        parent: &[String],
        specs: Vec<StateSpec<H>>,
    ) -> Result<Vec<String>, MachineError> {
        let mut pending = Vec::new();
        let mut built = Vec::with_capacity(specs.len());
        for spec in specs {
            built.push(self.build_state(spec, parent, &mut pending)?);
        }

        let scope_name = self.join(parent);
        let siblings = if parent.is_empty() {
            &mut self.states
        } else {
            &mut resolve_mut(&mut self.states, parent)
                .ok_or_else(|| MachineError::UnregisteredState {
                    name: scope_name.clone(),
                })?
                .children
        };
        let mut added = Vec::new();
        for state in built {
            if siblings.iter().any(|s| s.name() == state.name()) {
                return Err(MachineError::DuplicateState {
                    name: state.name().to_string(),
                    scope: scope_name,
                });
            }
            let mut root = parent.to_vec();
            root.push(state.name().to_string());
            added.push(root.clone());
            for rel in state.descendant_paths() {
                let mut path = root.clone();
                path.extend(rel);
                added.push(path);
            }
            siblings.push(state);
        }

        for entry in pending {
            self.register_pending(entry)?;
        }
        if self.auto_transitions {
            self.extend_auto_transitions(&added);
        }
        Ok(added.iter().map(|p| self.join(p)).collect())
    }

    fn build_state(
        &self,
        spec: StateSpec<H>,
        prefix: &[String],
        pending: &mut Vec<Pending<H>>,
    ) -> Result<NestedState<H>, MachineError> {
        self.validate_name(&spec.name)?;
        let mut path = prefix.to_vec();
        path.push(spec.name.clone());

        let mut state = State::new(spec.name.clone()).with_ignore_invalid_triggers(spec.ignore_invalid_triggers);
        state.on_enter = spec.on_enter;
        state.on_exit = spec.on_exit;
        let mut node = NestedState::leaf(state);

        let (mut initial, children, parallel) = match spec.layout {
            Layout::Leaf => (None, Vec::new(), false),
            Layout::Branch { initial, children } => (initial, children, false),
            Layout::Parallel { children } => (None, children, true),
        };

        for child in children {
            match child {
                Child::State(child_spec) => {
                    if spec.remap.contains_key(&child_spec.name) {
                        continue;
                    }
                    node.children.push(self.build_state(child_spec, &path, pending)?);
                }
                Child::Machine(blueprint) => {
                    self.graft(&blueprint, &spec.remap, prefix, &path, &mut node, pending);
                    if initial.is_none() && !parallel {
                        initial = blueprint
                            .initial
                            .as_deref()
                            .and_then(|i| i.split(blueprint.separator.as_str()).next())
                            .filter(|first| !spec.remap.contains_key(*first))
                            .map(str::to_string);
                    }
                }
            }
        }

        for (i, child) in node.children.iter().enumerate() {
            if node.children[..i].iter().any(|c| c.name() == child.name()) {
                return Err(MachineError::DuplicateState {
                    name: child.name().to_string(),
                    scope: self.join(&path),
                });
            }
        }

        node.initial = if parallel {
            Initial::Parallel(node.children.iter().map(|c| c.name().to_string()).collect())
        } else if let Some(initial) = initial {
            if node.child(&initial).is_none() {
                let mut missing = path.clone();
                missing.push(initial);
                return Err(MachineError::UnregisteredState {
                    name: self.join(&missing),
                });
            }
            Initial::Child(initial)
        } else {
            Initial::None
        };

        for transition in spec.transitions {
            pending.push(Pending::Scoped {
                scope: path.clone(),
                spec: transition,
            });
        }
        Ok(node)
    }

    fn graft(
        &self,
        blueprint: &Blueprint<H>,
        remap: &BTreeMap<String, String>,
        scope: &[String],
        branch: &[String],
        node: &mut NestedState<H>,
        pending: &mut Vec<Pending<H>>,
    ) {
        for root in &blueprint.states {
            if !remap.contains_key(root.name()) {
                node.children.push(root.clone());
            }
        }
        let relocate = |name: &str| {
            let mut path = branch.to_vec();
            path.extend(name.split(blueprint.separator.as_str()).map(str::to_string));
            self.join(&path)
        };
        for event in blueprint.events.iter().filter(|e| !e.is_auto()) {
            for transition in event.iter() {
                let first = transition
                    .source
                    .split(blueprint.separator.as_str())
                    .next()
                    .unwrap_or_default();
                if remap.contains_key(first) {
                    continue;
                }
                let mut moved = transition.clone();
                moved.source = relocate(&transition.source);
                let dest = match &transition.dest {
                    Dest::Internal => GraftDest::Keep,
                    Dest::State(dest) => match remap.get(dest) {
                        Some(target) => GraftDest::Remapped(target.clone()),
                        None => {
                            moved.dest = Dest::State(relocate(dest));
                            GraftDest::Keep
                        }
                    },
                };
                pending.push(Pending::Grafted {
                    trigger: event.name().to_string(),
                    transition: moved,
                    dest,
                    scope: scope.to_vec(),
                    branch: branch.to_vec(),
                });
            }
        }
    }

    fn register_pending(&mut self, entry: Pending<H>) -> Result<(), MachineError> {
        match entry {
            Pending::Scoped { scope, spec } => self.add_transition(&scope, spec),
            Pending::Grafted {
                trigger,
                mut transition,
                dest,
                scope,
                branch,
            } => {
                if let GraftDest::Remapped(name) = dest {
                    let target = self
                        .resolve_scoped(&scope, &name)
                        .ok_or_else(|| MachineError::UnregisteredState { name: name.clone() })?;
                    if target.starts_with(&branch) {
                        return Err(MachineError::AmbiguousDestination {
                            name: name.clone(),
                            branch: self.join(&branch),
                        });
                    }
                    transition.dest = Dest::State(self.join(&target));
                }
                self.event_entry(&trigger).add_transition(transition);
                Ok(())
            }
        }
    }

    /// Keep `to_<state>` events complete after `added` states appeared.
    fn extend_auto_transitions(&mut self, added: &[Vec<String>]) {
        let added_names: Vec<String> = added.iter().map(|p| self.join(p)).collect();
        let existing: Vec<(String, String)> = self
            .events
            .iter()
            .filter(|e| e.is_auto())
            .filter_map(|e| {
                e.iter()
                    .next()
                    .and_then(|t| t.dest.name())
                    .map(|dest| (e.name().to_string(), dest.to_string()))
            })
            .collect();
        for (trigger, dest) in existing {
            let event = self.event_entry(&trigger);
            for source in &added_names {
                event.add_transition(Transition::new(source.clone(), Dest::State(dest.clone())));
            }
        }

        let all: Vec<String> = self.state_names();
        for dest in &added_names {
            let trigger = format!("to_{dest}");
            let created = !self.has_trigger(&trigger);
            let event = self.event_entry(&trigger);
            if created {
                event.auto = true;
            }
            for source in &all {
                event.add_transition(Transition::new(source.clone(), Dest::State(dest.clone())));
            }
        }
    }

    /// Register a transition whose names resolve relative to `scope`.
    ///
    /// `*` expands to every state below `scope`; `=` resolves to each source.
    pub fn add_transition(
        &mut self,
        scope: &[String],
        spec: TransitionSpec<H>,
    ) -> Result<(), MachineError> {
        let sources = match &spec.source {
            Source::All => self.paths_in_scope(scope),
            Source::States(names) => names
                .iter()
                .map(|name| {
                    self.resolve_scoped(scope, name)
                        .ok_or_else(|| MachineError::UnregisteredState { name: name.clone() })
                })
                .collect::<Result<Vec<_>, _>>()?,
        };
        let fixed_dest = match &spec.dest {
            Target::State(name) => Some(
                self.resolve_scoped(scope, name)
                    .ok_or_else(|| MachineError::UnregisteredState { name: name.clone() })?,
            ),
            Target::Internal | Target::Same => None,
        };

        let mut transitions = Vec::with_capacity(sources.len());
        for source in &sources {
            let dest = match (&spec.dest, &fixed_dest) {
                (Target::Internal, _) => Dest::Internal,
                (Target::Same, _) => Dest::State(self.join(source)),
                (Target::State(_), Some(dest)) => Dest::State(self.join(dest)),
                (Target::State(name), None) => {
                    return Err(MachineError::UnregisteredState { name: name.clone() })
                }
            };
            transitions.push(Transition {
                source: self.join(source),
                dest,
                prepare: spec.prepare.clone(),
                conditions: spec.conditions.clone(),
                before: spec.before.clone(),
                after: spec.after.clone(),
            });
        }
        let event = self.event_entry(&spec.trigger);
        for transition in transitions {
            event.add_transition(transition);
        }
        Ok(())
    }

    pub fn add_ordered_transitions(
        &mut self,
        ordered: &OrderedTransitions<H>,
    ) -> Result<(), MachineError> {
        let states = match &ordered.states {
            Some(states) => states.clone(),
            None => self.states.iter().map(|s| s.name().to_string()).collect(),
        };
        if states.len() < 2 {
            return Err(MachineError::InvalidOrdering {
                reason: "can't create ordered transitions with fewer than 2 states".to_string(),
            });
        }
        if let Some(initial) = &self.initial {
            if !states.contains(initial) {
                return Err(MachineError::InvalidOrdering {
                    reason: format!("initial state '{initial}' is not part of the ordering"),
                });
            }
        }
        let links = ordered.links(&states, self.initial.as_deref());
        for link in links {
            self.add_transition(&[], link)?;
        }
        Ok(())
    }

    /// Remove transitions of `trigger` matching the given source and dest.
    /// An event left without transitions is removed entirely.
    pub fn remove_transition(&mut self, trigger: &str, source: Option<&str>, dest: Option<&str>) {
        if let Some(event) = self.events.iter_mut().find(|e| e.name() == trigger) {
            event.retain(|t| {
                let source_matches = source.map_or(true, |s| t.source == s);
                let dest_matches = dest.map_or(true, |d| t.dest.name() == Some(d));
                !(source_matches && dest_matches)
            });
        }
        self.events.retain(|e| !(e.name() == trigger && e.is_empty()));
    }

    /// Transitions filtered by trigger, source and dest.
    pub fn get_transitions(
        &self,
        trigger: Option<&str>,
        source: Option<&str>,
        dest: Option<&str>,
    ) -> Vec<TransitionInfo> {
        self.events
            .iter()
            .filter(|e| trigger.map_or(true, |t| e.name() == t))
            .flat_map(|e| e.iter().map(move |t| t.info(e.name())))
            .filter(|info| source.map_or(true, |s| info.source == s))
            .filter(|info| dest.map_or(true, |d| info.dest.as_deref() == Some(d)))
            .collect()
    }

    /// Triggers with transitions from any of `states` or their ancestors,
    /// in event registration order.
    pub fn get_triggers(&self, states: &[&str]) -> Result<Vec<String>, MachineError> {
        let mut sources = Vec::new();
        for name in states {
            self.get_state(name)?;
            let mut path = self.split(name);
            while !path.is_empty() {
                sources.push(self.join(&path));
                path.pop();
            }
        }
        Ok(self
            .events
            .iter()
            .filter(|e| e.sources().any(|s| sources.iter().any(|src| src == s)))
            .map(|e| e.name().to_string())
            .collect())
    }

    pub fn add_state_callback(
        &mut self,
        state: &str,
        kind: CallbackKind,
        action: H::Action,
    ) -> Result<(), MachineError> {
        self.get_state_mut(state)?.state.add_callback(kind, action);
        Ok(())
    }

    /// Append `action` to one callback list of every transition of `trigger`.
    pub fn add_event_callback(
        &mut self,
        trigger: &str,
        stage: Stage,
        action: H::Action,
    ) -> Result<(), MachineError> {
        let event = self
            .events
            .iter_mut()
            .find(|e| e.name() == trigger)
            .ok_or_else(|| MachineError::UnknownTrigger {
                trigger: trigger.to_string(),
            })?;
        for transition in event.iter_mut() {
            let list = match stage {
                Stage::Prepare => &mut transition.prepare,
                Stage::Before => &mut transition.before,
                Stage::After => &mut transition.after,
            };
            list.push(action.clone());
        }
        Ok(())
    }

    /// Attach `on_enter_<state>` / `on_exit_<state>` methods a model defines.
    pub fn bind_model_callbacks(&mut self, defines: impl Fn(&str) -> bool) {
        let names = self.state_names();
        for name in names {
            for (kind, prefix) in [(CallbackKind::Enter, "on_enter_"), (CallbackKind::Exit, "on_exit_")] {
                let method = format!("{prefix}{name}");
                if !defines(&method) {
                    continue;
                }
                if let Ok(node) = self.get_state_mut(&name) {
                    if !node.state.has_callback(kind, &method) {
                        node.state.add_callback(kind, H::named_action(&method));
                    }
                }
            }
        }
    }

    pub fn blueprint(&self) -> Blueprint<H> {
        Blueprint {
            states: self.states.clone(),
            events: self.events.clone(),
            initial: self.initial.clone(),
            separator: self.separator.clone(),
        }
    }

    /// Active leaves of `value` as paths, in document order.
    pub fn leaf_paths(&self, value: &StateValue) -> Vec<Vec<String>> {
        value.leaves().into_iter().map(|leaf| self.split(leaf)).collect()
    }

    /// Fail unless every leaf of `value` names a registered state.
    pub fn validate_value(&self, value: &StateValue) -> Result<(), MachineError> {
        for leaf in value.leaves() {
            self.get_state(leaf)?;
        }
        Ok(())
    }

    /// Whether an invalid trigger is silently ignored in `value`:
    /// every active state must ignore it, state settings overriding `default`.
    pub fn ignores_invalid(&self, value: &StateValue, default: bool) -> bool {
        value.leaves().into_iter().all(|leaf| {
            self.get_state(leaf)
                .ok()
                .and_then(|s| s.state().ignore_invalid_triggers())
                .unwrap_or(default)
        })
    }

    /// Whether `name` is active in `value`. Without `allow_substates` the
    /// state must be an active leaf.
    pub fn is_state(&self, value: &StateValue, name: &str, allow_substates: bool) -> bool {
        let tree = ActiveTree::from_value(value, &self.separator);
        match tree.at(&self.split(name)) {
            Some(subtree) => subtree.is_empty() || allow_substates,
            None => false,
        }
    }

    /// State value of a model resting in `name`, descending through initial children.
    pub fn initial_value(&self, name: &str) -> Result<StateValue, MachineError> {
        let path = self.split(name);
        self.get_state(name)?;
        let mut tree = self.initial_tree(&path);
        for segment in path.iter().rev() {
            let mut parent = ActiveTree::new();
            parent.insert(segment, tree);
            tree = parent;
        }
        Ok(tree.to_value(&self.separator))
    }

    fn initial_tree(&self, path: &[String]) -> ActiveTree {
        let mut tree = ActiveTree::new();
        if let Some(state) = resolve(&self.states, path) {
            for name in state.initial().names() {
                let mut child = path.to_vec();
                child.push(name.to_string());
                tree.insert(name, self.initial_tree(&child));
            }
        }
        tree
    }

    /// Children entered below the newly entered state `path` on the way to
    /// `remaining`. Every region of a parallel state is entered, the one on
    /// the way in place and the others through their initial children.
    fn entry_tree(&self, path: &[String], remaining: &[String]) -> ActiveTree {
        let Some((head, rest)) = remaining.split_first() else {
            return self.initial_tree(path);
        };
        let mut tree = ActiveTree::new();
        let parallel = resolve(&self.states, path).filter(|state| state.initial().is_parallel());
        let regions: Vec<&str> = match parallel {
            Some(state) => state.children().iter().map(NestedState::name).collect(),
            None => vec![head.as_str()],
        };
        for name in regions {
            let mut child = path.to_vec();
            child.push(name.to_string());
            let subtree = if name == head {
                self.entry_tree(&child, rest)
            } else {
                self.initial_tree(&child)
            };
            tree.insert(name, subtree);
        }
        tree
    }

    /// Plan the exits, enters and resulting value for moving a model in
    /// `current` to `dest`.
    ///
    /// The longest prefix of `dest` that is already active stays untouched.
    /// When all of `dest` is active its last segment is left and re-entered.
    /// Inside a parallel scope only the targeted region is exited. Parallel
    /// states entered on the way to `dest` enter all of their regions.
    pub fn plan(&self, current: &StateValue, dest: &str) -> Result<StatePlan, MachineError> {
        self.get_state(dest)?;
        let dest_path = self.split(dest);
        let mut tree = ActiveTree::from_value(current, &self.separator);

        let mut shared = 0;
        let mut node = &tree;
        while shared < dest_path.len() {
            match node.child(&dest_path[shared]) {
                Some(child) => {
                    node = child;
                    shared += 1;
                }
                None => break,
            }
        }
        if shared == dest_path.len() {
            shared -= 1;
        }
        let root = &dest_path[..shared];
        let remaining = &dest_path[shared..];
        let head = remaining[0].as_str();

        let scoped = tree.at(root).cloned().unwrap_or_default();
        let narrowed = scoped.len() > 1;
        let exit_tree = if narrowed { scoped.only(head) } else { scoped };
        let exits = exit_tree
            .resolve_order()
            .into_iter()
            .map(|rel| {
                let mut path = root.to_vec();
                path.extend(rel);
                path
            })
            .collect();

        let mut entered = ActiveTree::new();
        entered.insert(head, self.entry_tree(&dest_path[..=shared], &remaining[1..]));
        let enters = entered
            .enter_order()
            .into_iter()
            .map(|rel| {
                let mut path = root.to_vec();
                path.extend(rel);
                path
            })
            .collect();
        let subtree = entered.child(head).cloned().unwrap_or_default();

        if let Some(scope) = tree.at_mut(root) {
            if !narrowed {
                scope.clear();
            }
            scope.insert(head, subtree);
        }

        Ok(StatePlan {
            exits,
            enters,
            next: tree.to_value(&self.separator),
        })
    }
}

/// Per-transition callback lists addressable through an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Prepare,
    Before,
    After,
}
