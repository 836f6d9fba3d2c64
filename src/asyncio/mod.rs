//! Async engine: callbacks and conditions are futures.
//!
//! Callback batches run concurrently, batches run in protocol order and a
//! transition that passes its conditions cancels the other running trigger
//! tasks of its model.

mod callback;
mod handle;
mod machine;
mod transition;

pub use callback::{AsyncCall, AsyncCallback, AsyncEventData, AsyncPredicate, Cooperative, SharedModel};
pub use handle::AsyncModelHandle;
pub use machine::AsyncMachine;
