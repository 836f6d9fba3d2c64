//! State specifications.
//!
//! A [`StateSpec`] is the parsed form of one state declaration: a leaf, a
//! branch with an optional initial child, or a parallel state whose
//! children are all entered together. Branches and parallel states may
//! also graft in the states of an already built machine through a
//! [`Blueprint`], optionally remapping some of its states to states of the
//! enclosing scope.

use crate::builder::transition::TransitionSpec;
use crate::core::{Blueprint, Hooks, IntoAction};
use std::collections::BTreeMap;
use std::fmt;

/// One child entry of a branch or parallel state.
pub enum Child<H: Hooks> {
    State(StateSpec<H>),
    /// Every root state of a built machine, with its transitions
    Machine(Blueprint<H>),
}

impl<H: Hooks> Clone for Child<H> {
    fn clone(&self) -> Self {
        match self {
            Self::State(spec) => Self::State(spec.clone()),
            Self::Machine(blueprint) => Self::Machine(blueprint.clone()),
        }
    }
}

/// Shape of a state.
pub enum Layout<H: Hooks> {
    Leaf,
    Branch {
        initial: Option<String>,
        children: Vec<Child<H>>,
    },
    Parallel {
        children: Vec<Child<H>>,
    },
}

impl<H: Hooks> Clone for Layout<H> {
    fn clone(&self) -> Self {
        match self {
            Self::Leaf => Self::Leaf,
            Self::Branch { initial, children } => Self::Branch {
                initial: initial.clone(),
                children: children.clone(),
            },
            Self::Parallel { children } => Self::Parallel {
                children: children.clone(),
            },
        }
    }
}

/// Declaration of one state and, recursively, its children.
///
/// # Example
///
/// ```rust
/// use treestate::builder::{StateSpec, TransitionSpec};
/// use treestate::{Blocking, core::Stateful};
///
/// type H = Blocking<Stateful>;
///
/// let caffeinated: StateSpec<H> = StateSpec::new("caffeinated")
///     .children(["dithering", "running"])
///     .initial("dithering")
///     .transition(TransitionSpec::new("walk", "dithering", "running"))
///     .on_enter("drink");
/// assert!(caffeinated.is_branch());
/// ```
pub struct StateSpec<H: Hooks> {
    pub(crate) name: String,
    pub(crate) on_enter: Vec<H::Action>,
    pub(crate) on_exit: Vec<H::Action>,
    pub(crate) ignore_invalid_triggers: Option<bool>,
    pub(crate) layout: Layout<H>,
    pub(crate) transitions: Vec<TransitionSpec<H>>,
    pub(crate) remap: BTreeMap<String, String>,
}

impl<H: Hooks> Clone for StateSpec<H> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            on_enter: self.on_enter.clone(),
            on_exit: self.on_exit.clone(),
            ignore_invalid_triggers: self.ignore_invalid_triggers,
            layout: self.layout.clone(),
            transitions: self.transitions.clone(),
            remap: self.remap.clone(),
        }
    }
}

impl<H: Hooks> StateSpec<H> {
    /// A leaf state.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            on_enter: Vec::new(),
            on_exit: Vec::new(),
            ignore_invalid_triggers: None,
            layout: Layout::Leaf,
            transitions: Vec::new(),
            remap: BTreeMap::new(),
        }
    }

    pub fn on_enter(mut self, action: impl IntoAction<H>) -> Self {
        self.on_enter.push(action.into_action());
        self
    }

    pub fn on_exit(mut self, action: impl IntoAction<H>) -> Self {
        self.on_exit.push(action.into_action());
        self
    }

    pub fn ignore_invalid_triggers(mut self, ignore: bool) -> Self {
        self.ignore_invalid_triggers = Some(ignore);
        self
    }

    /// Turn the state into a branch (keeping any initial already set) and
    /// append children.
    pub fn children<C: Into<StateSpec<H>>>(mut self, children: impl IntoIterator<Item = C>) -> Self {
        let extra = children.into_iter().map(|c| Child::State(c.into()));
        self.layout = match self.layout {
            Layout::Leaf => Layout::Branch {
                initial: None,
                children: extra.collect(),
            },
            Layout::Branch {
                initial,
                mut children,
            } => {
                children.extend(extra);
                Layout::Branch { initial, children }
            }
            Layout::Parallel { mut children } => {
                children.extend(extra);
                Layout::Parallel { children }
            }
        };
        self
    }

    /// Turn the state into a parallel state and append regions.
    pub fn parallel<C: Into<StateSpec<H>>>(mut self, regions: impl IntoIterator<Item = C>) -> Self {
        let mut children = self.take_children();
        children.extend(regions.into_iter().map(|c| Child::State(c.into())));
        self.layout = Layout::Parallel { children };
        self
    }

    /// Default child entered with this state. Turns a leaf into a branch.
    pub fn initial(mut self, child: impl Into<String>) -> Self {
        let child = child.into();
        self.layout = match self.layout {
            Layout::Leaf => Layout::Branch {
                initial: Some(child),
                children: Vec::new(),
            },
            Layout::Branch { children, .. } => Layout::Branch {
                initial: Some(child),
                children,
            },
            parallel @ Layout::Parallel { .. } => parallel,
        };
        self
    }

    /// Graft the states and transitions of a built machine as children.
    pub fn embed(mut self, blueprint: Blueprint<H>) -> Self {
        self.layout = match self.layout {
            Layout::Leaf => Layout::Branch {
                initial: None,
                children: vec![Child::Machine(blueprint)],
            },
            Layout::Branch {
                initial,
                mut children,
            } => {
                children.push(Child::Machine(blueprint));
                Layout::Branch { initial, children }
            }
            Layout::Parallel { mut children } => {
                children.push(Child::Machine(blueprint));
                Layout::Parallel { children }
            }
        };
        self
    }

    /// Replace the child `from` by `to`, a state of the enclosing scope.
    pub fn remap(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.remap.insert(from.into(), to.into());
        self
    }

    /// Transition scoped to this state: names resolve among its descendants first.
    pub fn transition(mut self, spec: TransitionSpec<H>) -> Self {
        self.transitions.push(spec);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layout(&self) -> &Layout<H> {
        &self.layout
    }

    pub fn is_branch(&self) -> bool {
        matches!(self.layout, Layout::Branch { .. })
    }

    pub fn is_parallel(&self) -> bool {
        matches!(self.layout, Layout::Parallel { .. })
    }

    fn take_children(&mut self) -> Vec<Child<H>> {
        match std::mem::replace(&mut self.layout, Layout::Leaf) {
            Layout::Leaf => Vec::new(),
            Layout::Branch { children, .. } | Layout::Parallel { children } => children,
        }
    }
}

impl<H: Hooks> From<&str> for StateSpec<H> {
    fn from(name: &str) -> Self {
        StateSpec::new(name)
    }
}

impl<H: Hooks> From<String> for StateSpec<H> {
    fn from(name: String) -> Self {
        StateSpec::new(name)
    }
}

impl<H: Hooks> fmt::Debug for StateSpec<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.layout {
            Layout::Leaf => "leaf",
            Layout::Branch { .. } => "branch",
            Layout::Parallel { .. } => "parallel",
        };
        f.debug_struct("StateSpec")
            .field("name", &self.name)
            .field("kind", &kind)
            .field("remap", &self.remap)
            .finish()
    }
}
