//! Running states, conditions, transitions and events against a model.
//!
//! The pure core decides *what* happens; the impls here run the callbacks
//! in the order the protocol requires and write the new state back.

use super::callback::{Blocking, EventData};
use super::machine::Run;
use crate::core::{Condition, Dest, Event, Model, State, Transition};
use crate::error::MachineError;
use tracing::{debug, info};

impl<M: Model> State<Blocking<M>> {
    /// Run the enter callbacks in registration order. The first failure
    /// stops the sequence.
    pub fn enter(&self, event: &EventData<'_, M>, model: &mut M) -> Result<(), MachineError> {
        for callback in self.on_enter() {
            callback.invoke(model, event)?;
        }
        Ok(())
    }

    /// Run the exit callbacks in registration order.
    pub fn exit(&self, event: &EventData<'_, M>, model: &mut M) -> Result<(), MachineError> {
        for callback in self.on_exit() {
            callback.invoke(model, event)?;
        }
        Ok(())
    }
}

impl<M: Model> Condition<Blocking<M>> {
    /// Whether the predicate returns the expected target value.
    pub fn check(&self, event: &EventData<'_, M>, model: &mut M) -> Result<bool, MachineError> {
        let outcome = self.predicate().evaluate(model, event)?;
        Ok(self.passes(outcome))
    }
}

impl<M: Model> Transition<Blocking<M>> {
    /// Prepare, check conditions, then run the state change between the
    /// before and after callbacks. `Ok(false)` means a condition failed.
    pub(crate) fn execute(
        &self,
        run: &Run<'_, M>,
        event: &mut EventData<'_, M>,
        model: &mut M,
    ) -> Result<bool, MachineError> {
        let machine = event.machine().name();
        debug!(machine, source = %self.source(), dest = ?self.dest().name(), "initiating transition");

        for callback in self.prepare() {
            callback.invoke(model, event)?;
        }
        debug!(machine, "executed callbacks before conditions");

        for condition in self.conditions() {
            if !condition.check(event, model)? {
                debug!(machine, %condition, "transition condition failed");
                return Ok(false);
            }
        }

        let hooks = run.registry.hooks();
        for callback in hooks.before_state_change.iter().chain(self.before()) {
            callback.invoke(model, event)?;
        }
        debug!(machine, "executed callbacks before transition");

        if let Dest::State(dest) = self.dest() {
            change_state(run, dest, event, model)?;
        }

        for callback in self.after().iter().chain(&hooks.after_state_change) {
            callback.invoke(model, event)?;
        }
        debug!(machine, "executed callbacks after transition");
        Ok(true)
    }
}

/// Exit what the plan leaves, commit the new value, enter what it reaches.
pub(crate) fn change_state<M: Model>(
    run: &Run<'_, M>,
    dest: &str,
    event: &mut EventData<'_, M>,
    model: &mut M,
) -> Result<(), MachineError> {
    let machine = event.machine();
    let attribute = machine.settings().model_attribute.as_str();
    let current = model
        .state(attribute)
        .ok_or_else(|| MachineError::ModelNotInitialized {
            id: event.model,
            attribute: attribute.to_string(),
        })?;
    let plan = run.registry.plan(&current, dest)?;

    for path in &plan.exits {
        let name = run.registry.join(path);
        let node = run
            .registry
            .state_at(path)
            .ok_or_else(|| MachineError::UnregisteredState { name: name.clone() })?;
        debug!(machine = machine.name(), state = %name, "exiting state, processing callbacks");
        node.state().exit(event, model)?;
        info!(machine = machine.name(), state = %name, "finished processing exit callbacks");
    }

    model.set_state(attribute, plan.next.clone());
    if machine.settings().record_history {
        run.entry.record(&event.info.trigger, current, plan.next.clone());
    }
    event.info.state = Some(plan.next);

    for path in &plan.enters {
        let name = run.registry.join(path);
        let node = run
            .registry
            .state_at(path)
            .ok_or_else(|| MachineError::UnregisteredState { name: name.clone() })?;
        debug!(machine = machine.name(), state = %name, "entering state, processing callbacks");
        node.state().enter(event, model)?;
        info!(machine = machine.name(), state = %name, "finished processing enter callbacks");
    }
    Ok(())
}

impl<M: Model> Event<Blocking<M>> {
    /// Try the transitions registered for `source` in order; the first that
    /// passes its conditions wins.
    pub(crate) fn fire(
        &self,
        run: &Run<'_, M>,
        source: &str,
        event: &mut EventData<'_, M>,
        model: &mut M,
    ) -> Result<bool, MachineError> {
        let Some(transitions) = self.transitions_from(source) else {
            return Ok(false);
        };
        event.info.source = Some(source.to_string());
        for callback in &run.registry.hooks().prepare_event {
            callback.invoke(model, event)?;
        }
        debug!(machine = event.machine().name(), trigger = self.name(), source, "executed machine preparation callbacks");

        for transition in transitions {
            event.info.transition = Some(transition.info(self.name()));
            if transition.execute(run, event, model)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Whether some transition from `source` would pass its conditions.
    /// Runs prepare callbacks and conditions, never changes state.
    pub(crate) fn can_fire(
        &self,
        run: &Run<'_, M>,
        source: &str,
        event: &mut EventData<'_, M>,
        model: &mut M,
    ) -> Result<bool, MachineError> {
        let Some(transitions) = self.transitions_from(source) else {
            return Ok(false);
        };
        event.info.source = Some(source.to_string());
        for transition in transitions {
            if let Dest::State(dest) = transition.dest() {
                if run.registry.get_state(dest).is_err() {
                    continue;
                }
            }
            event.info.transition = Some(transition.info(self.name()));
            for callback in run.registry.hooks().prepare_event.iter().chain(transition.prepare()) {
                callback.invoke(model, event)?;
            }
            let mut passed = true;
            for condition in transition.conditions() {
                if !condition.check(event, model)? {
                    passed = false;
                    break;
                }
            }
            if passed {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
