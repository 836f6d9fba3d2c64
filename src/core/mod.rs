//! Pure core: the state tree, transitions, events and hierarchical planning.
//!
//! Nothing in this module runs a callback. Engines in [`crate::effects`] and
//! [`crate::asyncio`] drive the plans computed here.

pub mod args;
pub mod bubble;
pub mod condition;
pub mod event;
pub mod history;
pub mod hooks;
pub mod model;
pub mod registry;
pub mod state;
pub mod transition;
pub mod value;

#[cfg(test)]
pub(crate) mod testing;

pub use args::{EventArgs, EventInfo, TransitionInfo};
pub use bubble::Bubbling;
pub use condition::{Condition, IntoAction, IntoPredicate};
pub use event::Event;
pub use history::{StateHistory, StateTransition};
pub use hooks::{describe, Call, Hooks, Target};
pub use model::{Model, ModelId, Stateful};
pub use registry::{Blueprint, MachineHooks, Registry, Stage, StatePlan};
pub use state::{resolve, CallbackKind, Initial, NestedState, State};
pub use transition::{Dest, Transition};
pub use value::{ActiveTree, StateValue};
