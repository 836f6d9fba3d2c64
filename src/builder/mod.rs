//! Builder API for machine construction.
//!
//! States and transitions are declared as typed specs ([`StateSpec`],
//! [`TransitionSpec`]) and registered either through [`MachineBuilder`] or
//! directly on a built machine.

pub mod machine;
pub mod macros;
pub mod state;
pub mod transition;

pub use machine::{MachineBuilder, QueueMode, Settings};
pub use state::{Child, Layout, StateSpec};
pub use transition::{transition, OrderedTransitions, Source, Target, TransitionSpec};
