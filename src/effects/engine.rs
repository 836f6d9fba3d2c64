//! Operations shared by the plain and the locking blocking machines.

use super::callback::Blocking;
use super::machine::Machine;
use crate::core::{EventArgs, Model, ModelId, Registry, StateValue};
use crate::error::MachineError;
use std::sync::Arc;

/// Model-facing operations of a blocking machine.
///
/// Lets code (and [`ModelHandle`](super::ModelHandle)) drive either a
/// [`Machine`] or a [`LockedMachine`](super::LockedMachine).
pub trait Engine<M: Model> {
    fn registry(&self) -> Arc<Registry<Blocking<M>>>;

    fn add_model(&self, model: M) -> Result<ModelId, MachineError>;

    fn remove_model(&self, id: ModelId) -> Result<M, MachineError>;

    fn trigger(&self, id: ModelId, trigger: &str, args: EventArgs) -> Result<bool, MachineError>;

    fn dispatch(&self, trigger: &str, args: EventArgs) -> Result<bool, MachineError>;

    fn may_trigger(&self, id: ModelId, trigger: &str, args: EventArgs) -> Result<bool, MachineError>;

    fn to_state(&self, id: ModelId, dest: &str, args: EventArgs) -> Result<bool, MachineError>;

    fn state_of(&self, id: ModelId) -> Result<StateValue, MachineError>;

    fn is_state(&self, id: ModelId, name: &str, allow_substates: bool) -> Result<bool, MachineError>;
}

impl<M: Model> Engine<M> for Machine<M> {
    fn registry(&self) -> Arc<Registry<Blocking<M>>> {
        Machine::registry(self)
    }

    fn add_model(&self, model: M) -> Result<ModelId, MachineError> {
        Machine::add_model(self, model)
    }

    fn remove_model(&self, id: ModelId) -> Result<M, MachineError> {
        Machine::remove_model(self, id)
    }

    fn trigger(&self, id: ModelId, trigger: &str, args: EventArgs) -> Result<bool, MachineError> {
        Machine::trigger(self, id, trigger, args)
    }

    fn dispatch(&self, trigger: &str, args: EventArgs) -> Result<bool, MachineError> {
        Machine::dispatch(self, trigger, args)
    }

    fn may_trigger(&self, id: ModelId, trigger: &str, args: EventArgs) -> Result<bool, MachineError> {
        Machine::may_trigger(self, id, trigger, args)
    }

    fn to_state(&self, id: ModelId, dest: &str, args: EventArgs) -> Result<bool, MachineError> {
        Machine::to_state(self, id, dest, args)
    }

    fn state_of(&self, id: ModelId) -> Result<StateValue, MachineError> {
        Machine::state_of(self, id)
    }

    fn is_state(&self, id: ModelId, name: &str, allow_substates: bool) -> Result<bool, MachineError> {
        Machine::is_state(self, id, name, allow_substates)
    }
}
