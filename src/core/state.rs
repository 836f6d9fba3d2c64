//! States and the nested state tree.
//!
//! A [`State`] carries a local name, its enter/exit callbacks and the
//! tri-state `ignore_invalid_triggers` flag. A [`NestedState`] adds owned,
//! ordered children and the initial-child policy. Fully qualified names are
//! never stored: they are computed from the path of local names.

use super::hooks::Hooks;
use std::fmt;

/// Which callback list [`State::add_callback`] appends to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallbackKind {
    Enter,
    Exit,
}

/// A single named state.
pub struct State<H: Hooks> {
    name: String,
    pub(crate) on_enter: Vec<H::Action>,
    pub(crate) on_exit: Vec<H::Action>,
    ignore_invalid_triggers: Option<bool>,
}

impl<H: Hooks> Clone for State<H> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            on_enter: self.on_enter.clone(),
            on_exit: self.on_exit.clone(),
            ignore_invalid_triggers: self.ignore_invalid_triggers,
        }
    }
}

impl<H: Hooks> State<H> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            on_enter: Vec::new(),
            on_exit: Vec::new(),
            ignore_invalid_triggers: None,
        }
    }

    pub fn with_ignore_invalid_triggers(mut self, ignore: Option<bool>) -> Self {
        self.ignore_invalid_triggers = ignore;
        self
    }

    /// Local name, unique among siblings.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn on_enter(&self) -> &[H::Action] {
        &self.on_enter
    }

    pub fn on_exit(&self) -> &[H::Action] {
        &self.on_exit
    }

    /// `None` means the machine-level default applies.
    pub fn ignore_invalid_triggers(&self) -> Option<bool> {
        self.ignore_invalid_triggers
    }

    /// Append a callback to the enter or exit list.
    pub fn add_callback(&mut self, kind: CallbackKind, callback: H::Action) {
        match kind {
            CallbackKind::Enter => self.on_enter.push(callback),
            CallbackKind::Exit => self.on_exit.push(callback),
        }
    }

    pub(crate) fn has_callback(&self, kind: CallbackKind, label: &str) -> bool {
        let list = match kind {
            CallbackKind::Enter => &self.on_enter,
            CallbackKind::Exit => &self.on_exit,
        };
        list.iter().any(|cb| cb.to_string() == label)
    }
}

impl<H: Hooks> fmt::Debug for State<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("name", &self.name)
            .field("on_enter", &self.on_enter.iter().map(ToString::to_string).collect::<Vec<_>>())
            .field("on_exit", &self.on_exit.iter().map(ToString::to_string).collect::<Vec<_>>())
            .field("ignore_invalid_triggers", &self.ignore_invalid_triggers)
            .finish()
    }
}

/// Initial-child policy of a state with children.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Initial {
    /// The state may itself be the resting state
    None,
    /// Entering descends into this child
    Child(String),
    /// Entering fans out into every listed child
    Parallel(Vec<String>),
}

impl Initial {
    pub fn names(&self) -> Vec<&str> {
        match self {
            Self::None => Vec::new(),
            Self::Child(name) => vec![name.as_str()],
            Self::Parallel(names) => names.iter().map(String::as_str).collect(),
        }
    }

    pub fn is_parallel(&self) -> bool {
        matches!(self, Self::Parallel(_))
    }
}

/// A state with an ordered list of owned children.
pub struct NestedState<H: Hooks> {
    pub(crate) state: State<H>,
    pub(crate) initial: Initial,
    pub(crate) children: Vec<NestedState<H>>,
}

impl<H: Hooks> Clone for NestedState<H> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            initial: self.initial.clone(),
            children: self.children.clone(),
        }
    }
}

impl<H: Hooks> NestedState<H> {
    pub fn leaf(state: State<H>) -> Self {
        Self {
            state,
            initial: Initial::None,
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.state.name()
    }

    pub fn state(&self) -> &State<H> {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut State<H> {
        &mut self.state
    }

    pub fn initial(&self) -> &Initial {
        &self.initial
    }

    pub fn children(&self) -> &[NestedState<H>] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn child(&self, name: &str) -> Option<&NestedState<H>> {
        self.children.iter().find(|c| c.name() == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut NestedState<H>> {
        self.children.iter_mut().find(|c| c.name() == name)
    }

    /// Relative paths of this state's descendants, depth-first in
    /// declaration order (the state itself excluded).
    pub fn descendant_paths(&self) -> Vec<Vec<String>> {
        let mut out = Vec::new();
        for child in &self.children {
            out.push(vec![child.name().to_string()]);
            for mut sub in child.descendant_paths() {
                sub.insert(0, child.name().to_string());
                out.push(sub);
            }
        }
        out
    }
}

impl<H: Hooks> fmt::Debug for NestedState<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NestedState")
            .field("state", &self.state)
            .field("initial", &self.initial)
            .field("children", &self.children)
            .finish()
    }
}

/// Look up a state by path, starting from a list of root-scope states.
pub fn resolve<'a, H: Hooks, S: AsRef<str>>(
    roots: &'a [NestedState<H>],
    path: &[S],
) -> Option<&'a NestedState<H>> {
    let (first, rest) = path.split_first()?;
    let mut node = roots.iter().find(|s| s.name() == first.as_ref())?;
    for segment in rest {
        node = node.child(segment.as_ref())?;
    }
    Some(node)
}

pub fn resolve_mut<'a, H: Hooks, S: AsRef<str>>(
    roots: &'a mut [NestedState<H>],
    path: &[S],
) -> Option<&'a mut NestedState<H>> {
    let (first, rest) = path.split_first()?;
    let mut node = roots.iter_mut().find(|s| s.name() == first.as_ref())?;
    for segment in rest {
        node = node.child_mut(segment.as_ref())?;
    }
    Some(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::Plain;

    fn tree() -> Vec<NestedState<Plain>> {
        let mut c = NestedState::leaf(State::new("C"));
        let mut one = NestedState::leaf(State::new("1"));
        one.children.push(NestedState::leaf(State::new("a")));
        one.initial = Initial::Child("a".into());
        c.children.push(one);
        c.children.push(NestedState::leaf(State::new("2")));
        c.initial = Initial::Parallel(vec!["1".into(), "2".into()]);
        vec![NestedState::leaf(State::new("A")), c]
    }

    #[test]
    fn resolve_walks_local_names() {
        let roots = tree();
        assert_eq!(resolve(&roots, &["C", "1", "a"]).map(|s| s.name()), Some("a"));
        assert!(resolve(&roots, &["C", "3"]).is_none());
        assert!(resolve::<Plain, &str>(&roots, &[]).is_none());
    }

    #[test]
    fn descendant_paths_are_depth_first() {
        let roots = tree();
        let c = resolve(&roots, &["C"]).unwrap();
        let paths: Vec<String> = c.descendant_paths().iter().map(|p| p.join(".")).collect();
        assert_eq!(paths, vec!["1", "1.a", "2"]);
    }

    #[test]
    fn add_callback_appends_in_order() {
        let mut state: State<Plain> = State::new("A");
        state.add_callback(CallbackKind::Enter, "first".to_string());
        state.add_callback(CallbackKind::Enter, "second".to_string());
        state.add_callback(CallbackKind::Exit, "leaving".to_string());
        assert_eq!(state.on_enter(), &["first".to_string(), "second".to_string()]);
        assert!(state.has_callback(CallbackKind::Exit, "leaving"));
    }

    #[test]
    fn parallel_initial_lists_every_child() {
        let roots = tree();
        let c = resolve(&roots, &["C"]).unwrap();
        assert!(c.initial().is_parallel());
        assert_eq!(c.initial().names(), vec!["1", "2"]);
    }
}
