//! Transition specifications.

use crate::core::{Condition, Hooks, IntoAction, IntoPredicate};
use std::fmt;

/// Sources of a transition: explicit names or the `*` wildcard.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Source {
    /// Every registered state in the current scope
    All,
    States(Vec<String>),
}

impl Source {
    pub const WILDCARD: &'static str = "*";
}

impl From<&str> for Source {
    fn from(name: &str) -> Self {
        if name == Self::WILDCARD {
            Self::All
        } else {
            Self::States(vec![name.to_string()])
        }
    }
}

impl From<String> for Source {
    fn from(name: String) -> Self {
        Source::from(name.as_str())
    }
}

impl From<Vec<&str>> for Source {
    fn from(names: Vec<&str>) -> Self {
        if names.contains(&Self::WILDCARD) {
            Self::All
        } else {
            Self::States(names.into_iter().map(str::to_string).collect())
        }
    }
}

impl From<Vec<String>> for Source {
    fn from(names: Vec<String>) -> Self {
        names.iter().map(String::as_str).collect::<Vec<_>>().into()
    }
}

impl<const N: usize> From<[&str; N]> for Source {
    fn from(names: [&str; N]) -> Self {
        names.to_vec().into()
    }
}

/// Destination of a transition as written by the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    /// No state change
    Internal,
    /// Reflexive: leave and re-enter the source
    Same,
    State(String),
}

impl Target {
    pub const SAME: &'static str = "=";
}

impl From<&str> for Target {
    fn from(name: &str) -> Self {
        if name == Self::SAME {
            Self::Same
        } else {
            Self::State(name.to_string())
        }
    }
}

impl From<String> for Target {
    fn from(name: String) -> Self {
        Target::from(name.as_str())
    }
}

impl From<Option<&str>> for Target {
    fn from(name: Option<&str>) -> Self {
        name.map_or(Self::Internal, Target::from)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Internal => write!(f, "None"),
            Self::Same => write!(f, "{}", Self::SAME),
            Self::State(name) => write!(f, "{name}"),
        }
    }
}

/// Everything needed to register one trigger/source/dest combination.
///
/// # Example
///
/// ```rust
/// use treestate::builder::TransitionSpec;
/// use treestate::{Blocking, core::Stateful};
///
/// let spec: TransitionSpec<Blocking<Stateful>> = TransitionSpec::new("melt", "solid", "liquid")
///     .when("is_hot")
///     .unless("is_frozen_forever")
///     .after("log_melt");
/// assert_eq!(spec.conditions().len(), 2);
/// ```
pub struct TransitionSpec<H: Hooks> {
    pub(crate) trigger: String,
    pub(crate) source: Source,
    pub(crate) dest: Target,
    pub(crate) prepare: Vec<H::Action>,
    pub(crate) conditions: Vec<Condition<H>>,
    pub(crate) before: Vec<H::Action>,
    pub(crate) after: Vec<H::Action>,
}

impl<H: Hooks> Clone for TransitionSpec<H> {
    fn clone(&self) -> Self {
        Self {
            trigger: self.trigger.clone(),
            source: self.source.clone(),
            dest: self.dest.clone(),
            prepare: self.prepare.clone(),
            conditions: self.conditions.clone(),
            before: self.before.clone(),
            after: self.after.clone(),
        }
    }
}

impl<H: Hooks> TransitionSpec<H> {
    pub fn new(
        trigger: impl Into<String>,
        source: impl Into<Source>,
        dest: impl Into<Target>,
    ) -> Self {
        Self {
            trigger: trigger.into(),
            source: source.into(),
            dest: dest.into(),
            prepare: Vec::new(),
            conditions: Vec::new(),
            before: Vec::new(),
            after: Vec::new(),
        }
    }

    /// Transition that runs its callbacks without changing state.
    pub fn internal(trigger: impl Into<String>, source: impl Into<Source>) -> Self {
        Self::new(trigger, source, Target::Internal)
    }

    pub fn when(mut self, predicate: impl IntoPredicate<H>) -> Self {
        self.conditions.push(Condition::when(predicate));
        self
    }

    pub fn unless(mut self, predicate: impl IntoPredicate<H>) -> Self {
        self.conditions.push(Condition::unless(predicate));
        self
    }

    pub fn condition(mut self, condition: Condition<H>) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn prepare(mut self, action: impl IntoAction<H>) -> Self {
        self.prepare.push(action.into_action());
        self
    }

    pub fn before(mut self, action: impl IntoAction<H>) -> Self {
        self.before.push(action.into_action());
        self
    }

    pub fn after(mut self, action: impl IntoAction<H>) -> Self {
        self.after.push(action.into_action());
        self
    }

    pub fn trigger(&self) -> &str {
        &self.trigger
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn dest(&self) -> &Target {
        &self.dest
    }

    pub fn conditions(&self) -> &[Condition<H>] {
        &self.conditions
    }
}

impl<H: Hooks> fmt::Debug for TransitionSpec<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionSpec")
            .field("trigger", &self.trigger)
            .field("source", &self.source)
            .field("dest", &self.dest)
            .field("conditions", &self.conditions)
            .finish()
    }
}

/// Shorthand for `TransitionSpec::new`.
pub fn transition<H: Hooks>(
    trigger: impl Into<String>,
    source: impl Into<Source>,
    dest: impl Into<Target>,
) -> TransitionSpec<H> {
    TransitionSpec::new(trigger, source, dest)
}

/// Options for [`Machine::add_ordered_transitions`](crate::Machine::add_ordered_transitions).
///
/// Consecutive states are linked by `trigger`; with `looped` the last state
/// links back to the first (or to the one after the initial state when
/// `loop_includes_initial` is false). The list is rotated so that it starts
/// at the machine's initial state.
pub struct OrderedTransitions<H: Hooks> {
    pub(crate) states: Option<Vec<String>>,
    pub(crate) trigger: String,
    pub(crate) looped: bool,
    pub(crate) loop_includes_initial: bool,
    pub(crate) conditions: Vec<Condition<H>>,
    pub(crate) before: Vec<H::Action>,
    pub(crate) after: Vec<H::Action>,
    pub(crate) prepare: Vec<H::Action>,
}

impl<H: Hooks> Default for OrderedTransitions<H> {
    fn default() -> Self {
        Self {
            states: None,
            trigger: "next_state".to_string(),
            looped: true,
            loop_includes_initial: true,
            conditions: Vec::new(),
            before: Vec::new(),
            after: Vec::new(),
            prepare: Vec::new(),
        }
    }
}

impl<H: Hooks> OrderedTransitions<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the cycle to these states (defaults to every root state).
    pub fn states<S: Into<String>>(mut self, states: impl IntoIterator<Item = S>) -> Self {
        self.states = Some(states.into_iter().map(Into::into).collect());
        self
    }

    pub fn trigger(mut self, trigger: impl Into<String>) -> Self {
        self.trigger = trigger.into();
        self
    }

    pub fn looped(mut self, looped: bool) -> Self {
        self.looped = looped;
        self
    }

    pub fn loop_includes_initial(mut self, include: bool) -> Self {
        self.loop_includes_initial = include;
        self
    }

    pub fn when(mut self, predicate: impl IntoPredicate<H>) -> Self {
        self.conditions.push(Condition::when(predicate));
        self
    }

    pub fn unless(mut self, predicate: impl IntoPredicate<H>) -> Self {
        self.conditions.push(Condition::unless(predicate));
        self
    }

    pub fn before(mut self, action: impl IntoAction<H>) -> Self {
        self.before.push(action.into_action());
        self
    }

    pub fn after(mut self, action: impl IntoAction<H>) -> Self {
        self.after.push(action.into_action());
        self
    }

    pub fn prepare(mut self, action: impl IntoAction<H>) -> Self {
        self.prepare.push(action.into_action());
        self
    }

    /// Expand into one spec per link of the chain.
    pub(crate) fn links(&self, states: &[String], initial: Option<&str>) -> Vec<TransitionSpec<H>> {
        let mut order: Vec<String> = states.to_vec();
        if let Some(pos) = initial.and_then(|i| order.iter().position(|s| s == i)) {
            order.rotate_left(pos);
        }
        let mut links: Vec<(String, String)> = order
            .windows(2)
            .map(|pair| (pair[0].clone(), pair[1].clone()))
            .collect();
        if self.looped {
            if let Some(last) = order.last() {
                let back_to = if self.loop_includes_initial {
                    order.first()
                } else {
                    order.get(1)
                };
                if let Some(first) = back_to {
                    links.push((last.clone(), first.clone()));
                }
            }
        }
        links
            .into_iter()
            .map(|(source, dest)| {
                let mut spec = TransitionSpec::new(self.trigger.clone(), source, dest);
                spec.conditions = self.conditions.clone();
                spec.before = self.before.clone();
                spec.after = self.after.clone();
                spec.prepare = self.prepare.clone();
                spec
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::Plain;

    #[test]
    fn wildcard_source_parses() {
        assert_eq!(Source::from("*"), Source::All);
        assert_eq!(Source::from(vec!["A", "*"]), Source::All);
        assert_eq!(
            Source::from(["A", "B"]),
            Source::States(vec!["A".into(), "B".into()])
        );
    }

    #[test]
    fn reflexive_and_internal_targets_parse() {
        assert_eq!(Target::from("="), Target::Same);
        assert_eq!(Target::from(None), Target::Internal);
        assert_eq!(Target::from("B"), Target::State("B".into()));
    }

    #[test]
    fn conditions_keep_declaration_order() {
        let spec: TransitionSpec<Plain> = TransitionSpec::new("go", "A", "B")
            .unless("blocked")
            .when("ready");
        let rendered: Vec<String> = spec.conditions().iter().map(|c| c.to_string()).collect();
        assert_eq!(rendered, vec!["unless blocked", "ready"]);
    }

    #[test]
    fn ordered_links_rotate_to_initial() {
        let ordered: OrderedTransitions<Plain> = OrderedTransitions::new();
        let states: Vec<String> = ["A", "B", "C"].iter().map(|s| s.to_string()).collect();
        let links: Vec<(String, String)> = ordered
            .links(&states, Some("B"))
            .iter()
            .map(|s| (s.source_names()[0].clone(), s.dest.to_string()))
            .collect();
        assert_eq!(
            links,
            vec![
                ("B".to_string(), "C".to_string()),
                ("C".to_string(), "A".to_string()),
                ("A".to_string(), "B".to_string()),
            ]
        );
    }

    #[test]
    fn ordered_loop_can_skip_initial() {
        let ordered: OrderedTransitions<Plain> =
            OrderedTransitions::new().loop_includes_initial(false);
        let states: Vec<String> = ["A", "B", "C"].iter().map(|s| s.to_string()).collect();
        let links = ordered.links(&states, Some("A"));
        assert_eq!(links.len(), 3);
        assert_eq!(links[2].dest, Target::State("B".into()));
    }

    impl<H: Hooks> TransitionSpec<H> {
        fn source_names(&self) -> Vec<String> {
            match &self.source {
                Source::All => vec!["*".to_string()],
                Source::States(names) => names.clone(),
            }
        }
    }
}
