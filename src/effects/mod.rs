//! Blocking engines: the imperative shell around the pure core.
//!
//! [`Machine`] runs callbacks on the calling thread against models it owns.
//! [`LockedMachine`] wraps it for use across threads. Both implement
//! [`Engine`], which is what a [`ModelHandle`] drives.

mod callback;
mod engine;
mod handle;
mod locking;
mod machine;
pub(crate) mod queue;
mod transition;

pub use callback::{Blocking, Callback, EventData, Predicate};
pub use engine::Engine;
pub use handle::{ModelHandle, ToPath};
pub use locking::{Context, LockedMachine};
pub use machine::Machine;
