//! Events: the transitions registered under one trigger name.

use super::hooks::Hooks;
use super::transition::Transition;
use std::fmt;

/// Ordered map of fully qualified source name to the transitions leaving it.
pub struct Event<H: Hooks> {
    name: String,
    pub(crate) transitions: Vec<(String, Vec<Transition<H>>)>,
    /// Synthesised `to_<state>` event
    pub(crate) auto: bool,
}

impl<H: Hooks> Clone for Event<H> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            transitions: self.transitions.clone(),
            auto: self.auto,
        }
    }
}

impl<H: Hooks> Event<H> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transitions: Vec::new(),
            auto: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_auto(&self) -> bool {
        self.auto
    }

    /// Transitions registered for `source`, in registration order.
    pub fn transitions_from(&self, source: &str) -> Option<&[Transition<H>]> {
        self.transitions
            .iter()
            .find(|(key, _)| key == source)
            .map(|(_, list)| list.as_slice())
    }

    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.transitions.iter().map(|(key, _)| key.as_str())
    }

    /// Every transition of the event, grouped by source in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Transition<H>> {
        self.transitions.iter().flat_map(|(_, list)| list.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Transition<H>> {
        self.transitions.iter_mut().flat_map(|(_, list)| list.iter_mut())
    }

    pub fn add_transition(&mut self, transition: Transition<H>) {
        match self
            .transitions
            .iter_mut()
            .find(|(key, _)| *key == transition.source)
        {
            Some((_, list)) => list.push(transition),
            None => self
                .transitions
                .push((transition.source.clone(), vec![transition])),
        }
    }

    /// Drop transitions matching `keep == false`, then empty source entries.
    pub fn retain(&mut self, mut keep: impl FnMut(&Transition<H>) -> bool) {
        for (_, list) in &mut self.transitions {
            list.retain(|t| keep(t));
        }
        self.transitions.retain(|(_, list)| !list.is_empty());
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}

impl<H: Hooks> fmt::Debug for Event<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sources: Vec<&str> = self.sources().collect();
        write!(f, "<Event('{}')@{:?}>", self.name, sources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::Plain;
    use crate::core::transition::Dest;

    fn event() -> Event<Plain> {
        let mut event = Event::new("go");
        event.add_transition(Transition::new("A", Dest::State("B".into())));
        event.add_transition(Transition::new("B", Dest::State("C".into())));
        event.add_transition(Transition::new("A", Dest::State("C".into())));
        event
    }

    #[test]
    fn transitions_group_by_source_in_order() {
        let event = event();
        let from_a = event.transitions_from("A").unwrap();
        assert_eq!(from_a.len(), 2);
        assert_eq!(from_a[1].dest(), &Dest::State("C".into()));
        assert_eq!(event.sources().collect::<Vec<_>>(), vec!["A", "B"]);
    }

    #[test]
    fn retain_drops_empty_sources() {
        let mut event = event();
        event.retain(|t| t.source() != "B");
        assert!(event.transitions_from("B").is_none());
        assert_eq!(event.iter().count(), 2);
    }
}
