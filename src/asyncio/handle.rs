//! Per-model convenience surface of the async machine.

use super::machine::AsyncMachine;
use crate::core::{EventArgs, Model, ModelId, StateValue};
use crate::error::MachineError;

/// A model addressed through its async machine. Resolves the same names as
/// [`ModelHandle`](crate::effects::ModelHandle).
pub struct AsyncModelHandle<'m, M: Model> {
    machine: &'m AsyncMachine<M>,
    id: ModelId,
}

impl<'m, M: Model> AsyncModelHandle<'m, M> {
    pub fn new(machine: &'m AsyncMachine<M>, id: ModelId) -> Self {
        Self { machine, id }
    }

    pub fn id(&self) -> ModelId {
        self.id
    }

    pub async fn state(&self) -> Result<StateValue, MachineError> {
        self.machine.state_of(self.id).await
    }

    pub async fn trigger(&self, trigger: &str, args: EventArgs) -> Result<bool, MachineError> {
        self.machine.trigger(self.id, trigger, args).await
    }

    pub async fn is(&self, state: &str) -> Result<bool, MachineError> {
        self.machine.is_state(self.id, state, false).await
    }

    pub async fn may(&self, trigger: &str, args: EventArgs) -> Result<bool, MachineError> {
        self.machine.may_trigger(self.id, trigger, args).await
    }

    pub async fn to(&self, state: &str, args: EventArgs) -> Result<bool, MachineError> {
        self.machine.trigger(self.id, &format!("to_{state}"), args).await
    }

    /// Resolve `<trigger>`, `is_<state>` or `may_<trigger>` and call it.
    pub async fn call(&self, name: &str, args: EventArgs) -> Result<bool, MachineError> {
        if M::defines(name) {
            return Err(MachineError::Unbound {
                name: name.to_string(),
            });
        }
        let registry = self.machine.registry();
        if registry.has_trigger(name) {
            return self.trigger(name, args).await;
        }
        if let Some(state) = name.strip_prefix("is_") {
            if registry.get_state(state).is_ok() {
                return self.is(state).await;
            }
        }
        if let Some(trigger) = name.strip_prefix("may_") {
            if registry.has_trigger(trigger) {
                return self.may(trigger, args).await;
            }
        }
        Err(MachineError::UnknownTrigger {
            trigger: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::asyncio::AsyncMachine;
    use crate::builder::TransitionSpec;
    use crate::core::{EventArgs, Stateful};

    #[tokio::test]
    async fn handle_resolves_convenience_names() {
        let machine: AsyncMachine<Stateful> = AsyncMachine::builder()
            .states(["A", "B"])
            .initial("A")
            .transition(TransitionSpec::new("go", "A", "B"))
            .build()
            .unwrap();
        let handle = machine.handle(machine.add_model(Stateful::new()).unwrap());
        assert!(handle.call("may_go", EventArgs::new()).await.unwrap());
        assert!(handle.call("go", EventArgs::new()).await.unwrap());
        assert!(handle.call("is_B", EventArgs::new()).await.unwrap());
        assert!(handle.to("A", EventArgs::new()).await.unwrap());
        assert!(handle.is("A").await.unwrap());
    }
}
