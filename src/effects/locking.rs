//! A machine whose operations run inside reentrant lock contexts.

use super::callback::Blocking;
use super::engine::Engine;
use super::handle::ModelHandle;
use super::machine::Machine;
use crate::builder::{StateSpec, TransitionSpec};
use crate::core::{EventArgs, Model, ModelId, Registry, StateHistory, StateValue};
use crate::error::MachineError;
use parking_lot::{ReentrantMutex, ReentrantMutexGuard, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

/// A reentrant lock context. The same thread may enter it repeatedly.
pub type Context = Arc<ReentrantMutex<()>>;

/// Guards held while inside a list of contexts; released in reverse order.
struct Entered<'a> {
    guards: Vec<ReentrantMutexGuard<'a, ()>>,
}

impl<'a> Entered<'a> {
    fn enter(contexts: &'a [Context]) -> Self {
        Self {
            guards: contexts.iter().map(|context| context.lock()).collect(),
        }
    }
}

impl Drop for Entered<'_> {
    fn drop(&mut self) {
        while let Some(guard) = self.guards.pop() {
            drop(guard);
        }
    }
}

/// Serialises access to a [`Machine`] across threads.
///
/// Every operation enters the machine contexts in declaration order;
/// triggers also enter the extra contexts registered for their model.
/// Contexts are reentrant, so callbacks running on the locking thread may
/// use the machine again. Nested triggers still follow the wrapped
/// machine's queue mode.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use std::thread;
/// use treestate::builder::TransitionSpec;
/// use treestate::core::{EventArgs, StateValue, Stateful};
/// use treestate::{LockedMachine, Machine};
///
/// let machine: Machine<Stateful> = Machine::builder()
///     .states(["A", "B"])
///     .initial("A")
///     .transition(TransitionSpec::new("flip", "A", "B"))
///     .transition(TransitionSpec::new("flip", "B", "A"))
///     .build()
///     .unwrap();
/// let locked = Arc::new(LockedMachine::new(machine));
/// let id = locked.add_model(Stateful::new()).unwrap();
///
/// let workers: Vec<_> = (0..4)
///     .map(|_| {
///         let locked = Arc::clone(&locked);
///         thread::spawn(move || locked.trigger(id, "flip", EventArgs::new()).unwrap())
///     })
///     .collect();
/// for worker in workers {
///     assert!(worker.join().unwrap());
/// }
/// assert_eq!(locked.state_of(id).unwrap(), StateValue::leaf("A"));
/// ```
pub struct LockedMachine<M: Model> {
    machine: Machine<M>,
    contexts: Vec<Context>,
    model_contexts: RwLock<HashMap<ModelId, Vec<Context>>>,
}

impl<M: Model> LockedMachine<M> {
    /// Wrap `machine` with a single reentrant context.
    pub fn new(machine: Machine<M>) -> Self {
        Self::with_contexts(machine, vec![Arc::new(ReentrantMutex::new(()))])
    }

    /// Wrap `machine` with caller-provided contexts, entered in order.
    pub fn with_contexts(machine: Machine<M>, contexts: Vec<Context>) -> Self {
        Self {
            machine,
            contexts,
            model_contexts: RwLock::new(HashMap::new()),
        }
    }

    /// Run `f` against the wrapped machine inside the machine contexts.
    pub fn locked<R>(&self, f: impl FnOnce(&Machine<M>) -> R) -> R {
        let _entered = Entered::enter(&self.contexts);
        f(&self.machine)
    }

    fn contexts_for(&self, id: ModelId) -> Vec<Context> {
        let mut contexts = self.contexts.clone();
        if let Some(extra) = self.model_contexts.read().get(&id) {
            contexts.extend(extra.iter().cloned());
        }
        contexts
    }

    fn locked_for<R>(&self, id: ModelId, f: impl FnOnce(&Machine<M>) -> R) -> R {
        let contexts = self.contexts_for(id);
        let _entered = Entered::enter(&contexts);
        f(&self.machine)
    }

    /// The wrapped machine, without locking.
    pub fn machine(&self) -> &Machine<M> {
        &self.machine
    }

    pub fn into_inner(self) -> Machine<M> {
        self.machine
    }

    pub fn add_model(&self, model: M) -> Result<ModelId, MachineError> {
        self.locked(|m| m.add_model(model))
    }

    /// Add a model whose triggers also enter `contexts`.
    pub fn add_model_with_contexts(
        &self,
        model: M,
        initial: Option<&str>,
        contexts: Vec<Context>,
    ) -> Result<ModelId, MachineError> {
        self.locked(|m| {
            let id = match initial {
                Some(initial) => m.add_model_with_initial(model, initial)?,
                None => m.add_model(model)?,
            };
            self.model_contexts.write().insert(id, contexts);
            Ok(id)
        })
    }

    pub fn remove_model(&self, id: ModelId) -> Result<M, MachineError> {
        self.locked(|m| {
            let model = m.remove_model(id)?;
            self.model_contexts.write().remove(&id);
            Ok(model)
        })
    }

    pub fn add_states<S>(&self, specs: impl IntoIterator<Item = S>) -> Result<Vec<String>, MachineError>
    where
        S: Into<StateSpec<Blocking<M>>>,
    {
        self.locked(|m| m.add_states(specs))
    }

    pub fn add_transition(&self, spec: TransitionSpec<Blocking<M>>) -> Result<(), MachineError> {
        self.locked(|m| m.add_transition(spec))
    }

    pub fn remove_transition(&self, trigger: &str, source: Option<&str>, dest: Option<&str>) {
        self.locked(|m| m.remove_transition(trigger, source, dest))
    }

    pub fn get_triggers(&self, states: &[&str]) -> Result<Vec<String>, MachineError> {
        self.locked(|m| m.get_triggers(states))
    }

    pub fn trigger(&self, id: ModelId, trigger: &str, args: EventArgs) -> Result<bool, MachineError> {
        self.locked_for(id, |m| m.trigger(id, trigger, args))
    }

    pub fn to_state(&self, id: ModelId, dest: &str, args: EventArgs) -> Result<bool, MachineError> {
        self.locked_for(id, |m| m.to_state(id, dest, args))
    }

    pub fn dispatch(&self, trigger: &str, args: EventArgs) -> Result<bool, MachineError> {
        let mut all = true;
        for id in self.locked(|m| m.models()) {
            all &= self.trigger(id, trigger, args.clone())?;
        }
        Ok(all)
    }

    pub fn may_trigger(&self, id: ModelId, trigger: &str, args: EventArgs) -> Result<bool, MachineError> {
        self.locked_for(id, |m| m.may_trigger(id, trigger, args))
    }

    pub fn state_of(&self, id: ModelId) -> Result<StateValue, MachineError> {
        self.locked(|m| m.state_of(id))
    }

    pub fn is_state(&self, id: ModelId, name: &str, allow_substates: bool) -> Result<bool, MachineError> {
        self.locked(|m| m.is_state(id, name, allow_substates))
    }

    pub fn set_state(&self, id: ModelId, value: impl Into<StateValue>) -> Result<(), MachineError> {
        self.locked(|m| m.set_state(id, value))
    }

    pub fn history(&self, id: ModelId) -> Result<StateHistory, MachineError> {
        self.locked(|m| m.history(id))
    }

    pub fn handle(&self, id: ModelId) -> ModelHandle<'_, M, Self> {
        ModelHandle::new(self, id)
    }
}

impl<M: Model> Engine<M> for LockedMachine<M> {
    fn registry(&self) -> Arc<Registry<Blocking<M>>> {
        self.locked(|m| m.registry())
    }

    fn add_model(&self, model: M) -> Result<ModelId, MachineError> {
        LockedMachine::add_model(self, model)
    }

    fn remove_model(&self, id: ModelId) -> Result<M, MachineError> {
        LockedMachine::remove_model(self, id)
    }

    fn trigger(&self, id: ModelId, trigger: &str, args: EventArgs) -> Result<bool, MachineError> {
        LockedMachine::trigger(self, id, trigger, args)
    }

    fn dispatch(&self, trigger: &str, args: EventArgs) -> Result<bool, MachineError> {
        LockedMachine::dispatch(self, trigger, args)
    }

    fn may_trigger(&self, id: ModelId, trigger: &str, args: EventArgs) -> Result<bool, MachineError> {
        LockedMachine::may_trigger(self, id, trigger, args)
    }

    fn to_state(&self, id: ModelId, dest: &str, args: EventArgs) -> Result<bool, MachineError> {
        LockedMachine::to_state(self, id, dest, args)
    }

    fn state_of(&self, id: ModelId) -> Result<StateValue, MachineError> {
        LockedMachine::state_of(self, id)
    }

    fn is_state(&self, id: ModelId, name: &str, allow_substates: bool) -> Result<bool, MachineError> {
        LockedMachine::is_state(self, id, name, allow_substates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Stateful;

    fn locked() -> LockedMachine<Stateful> {
        Machine::builder()
            .states(["A", "B"])
            .initial("A")
            .transition(TransitionSpec::new("go", "A", "B"))
            .build_locked()
            .unwrap()
    }

    #[test]
    fn contexts_are_released_after_each_call() {
        let machine = locked();
        let id = machine.add_model(Stateful::new()).unwrap();
        assert!(machine.trigger(id, "go", EventArgs::new()).unwrap());
        for context in &machine.contexts {
            assert!(!context.is_locked());
        }
    }

    #[test]
    fn model_contexts_are_entered_by_triggers() {
        let machine = locked();
        let extra: Context = Arc::new(ReentrantMutex::new(()));
        let id = machine
            .add_model_with_contexts(Stateful::new(), None, vec![Arc::clone(&extra)])
            .unwrap();
        let held = extra.lock();
        assert!(machine.trigger(id, "go", EventArgs::new()).unwrap());
        drop(held);
        assert!(!extra.is_locked());
        machine.remove_model(id).unwrap();
        assert!(machine.model_contexts.read().is_empty());
    }

    #[test]
    fn locked_machine_drives_handles() {
        let machine = locked();
        let handle = machine.handle(machine.add_model(Stateful::new()).unwrap());
        assert!(handle.call("go", EventArgs::new()).unwrap());
        assert!(handle.is("B").unwrap());
    }
}
