//! Treestate: a hierarchical state machine engine
//!
//! Treestate drives plain Rust models through nested and parallel states.
//! The pure core computes *what* a trigger does (which transition is
//! selected, which states are exited and entered); the engines run the
//! callbacks around it.
//!
//! # Core Concepts
//!
//! - **States**: leaves, branches with an initial child, or parallel states
//!   whose regions are all active together
//! - **Transitions**: guarded by conditions, wrapped in prepare, before and
//!   after callbacks, looked up from the deepest active state upwards
//! - **Models**: any type implementing [`core::Model`]; one machine can
//!   drive many models
//! - **Engines**: [`Machine`] (blocking), [`LockedMachine`] (thread-safe
//!   with reentrant contexts) and [`AsyncMachine`] (futures, cancellation)
//!
//! # Example
//!
//! ```rust
//! use treestate::builder::{StateSpec, TransitionSpec};
//! use treestate::core::{EventArgs, StateValue, Stateful};
//! use treestate::Machine;
//!
//! let machine: Machine<Stateful> = Machine::builder()
//!     .state(StateSpec::new("standing"))
//!     .state(StateSpec::new("walking").children(["slow", "fast"]).initial("slow"))
//!     .initial("standing")
//!     .transition(TransitionSpec::new("walk", "standing", "walking"))
//!     .transition(TransitionSpec::new("speed_up", "walking_slow", "walking_fast"))
//!     .transition(TransitionSpec::new("stop", "walking", "standing"))
//!     .build()
//!     .unwrap();
//!
//! let id = machine.add_model(Stateful::new()).unwrap();
//! machine.trigger(id, "walk", EventArgs::new()).unwrap();
//! machine.trigger(id, "speed_up", EventArgs::new()).unwrap();
//! assert_eq!(machine.state_of(id).unwrap(), StateValue::leaf("walking_fast"));
//!
//! // `stop` is declared on the parent and applies to every substate
//! machine.trigger(id, "stop", EventArgs::new()).unwrap();
//! assert!(machine.is_state(id, "standing", false).unwrap());
//! ```

pub mod asyncio;
pub mod builder;
pub mod config;
pub mod core;
pub mod effects;
pub mod error;
pub mod introspect;

// Re-export commonly used types
pub use asyncio::{AsyncCallback, AsyncMachine, AsyncPredicate, Cooperative};
pub use builder::{MachineBuilder, QueueMode, Settings, StateSpec, TransitionSpec};
pub use config::MachineConfig;
pub use core::{EventArgs, Model, ModelId, StateValue, Stateful};
pub use effects::{Blocking, Callback, Engine, EventData, LockedMachine, Machine, ModelHandle, Predicate};
pub use error::{CallbackError, MachineError};
pub use introspect::MachineDescription;
