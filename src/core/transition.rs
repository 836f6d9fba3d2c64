//! Registered transitions.

use super::args::TransitionInfo;
use super::condition::Condition;
use super::hooks::Hooks;
use std::fmt;

/// Where a transition leads.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Dest {
    /// Callbacks run, the state does not change
    Internal,
    /// Fully qualified destination
    State(String),
}

impl Dest {
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Internal => None,
            Self::State(name) => Some(name),
        }
    }
}

/// A transition from one fully qualified source, owned by its event.
pub struct Transition<H: Hooks> {
    pub(crate) source: String,
    pub(crate) dest: Dest,
    pub(crate) prepare: Vec<H::Action>,
    pub(crate) conditions: Vec<Condition<H>>,
    pub(crate) before: Vec<H::Action>,
    pub(crate) after: Vec<H::Action>,
}

impl<H: Hooks> Clone for Transition<H> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            dest: self.dest.clone(),
            prepare: self.prepare.clone(),
            conditions: self.conditions.clone(),
            before: self.before.clone(),
            after: self.after.clone(),
        }
    }
}

impl<H: Hooks> Transition<H> {
    pub fn new(source: impl Into<String>, dest: Dest) -> Self {
        Self {
            source: source.into(),
            dest,
            prepare: Vec::new(),
            conditions: Vec::new(),
            before: Vec::new(),
            after: Vec::new(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn dest(&self) -> &Dest {
        &self.dest
    }

    pub fn prepare(&self) -> &[H::Action] {
        &self.prepare
    }

    pub fn conditions(&self) -> &[Condition<H>] {
        &self.conditions
    }

    pub fn before(&self) -> &[H::Action] {
        &self.before
    }

    pub fn after(&self) -> &[H::Action] {
        &self.after
    }

    pub fn is_internal(&self) -> bool {
        self.dest == Dest::Internal
    }

    pub fn info(&self, trigger: &str) -> TransitionInfo {
        TransitionInfo {
            trigger: trigger.to_string(),
            source: self.source.clone(),
            dest: self.dest.name().map(str::to_string),
        }
    }
}

impl<H: Hooks> fmt::Debug for Transition<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.dest {
            Dest::Internal => write!(f, "<Transition('{}', internal)>", self.source),
            Dest::State(dest) => write!(f, "<Transition('{}', '{}')>", self.source, dest),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::Plain;

    #[test]
    fn info_reports_internal_as_none() {
        let t: Transition<Plain> = Transition::new("A", Dest::Internal);
        assert!(t.is_internal());
        assert_eq!(t.info("tick").dest, None);
    }

    #[test]
    fn debug_shows_source_and_dest() {
        let t: Transition<Plain> = Transition::new("A", Dest::State("B".into()));
        assert_eq!(format!("{t:?}"), "<Transition('A', 'B')>");
    }
}
