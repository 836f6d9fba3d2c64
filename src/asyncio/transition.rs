//! Async execution of states, conditions, transitions and events.
//!
//! Each callback batch is gathered and fails if any member fails; batches
//! themselves run one after another in protocol order.

use super::callback::{AsyncCallback, AsyncEventData, Cooperative, SharedModel};
use super::machine::Run;
use crate::core::{Condition, Dest, Event, Model, State, Transition};
use crate::error::MachineError;
use futures::future::try_join_all;
use tracing::{debug, info};

/// Run one batch of callbacks concurrently.
pub(crate) async fn gather<M: Model>(
    batch: &[AsyncCallback<M>],
    model: &SharedModel<M>,
    event: &AsyncEventData<M>,
) -> Result<(), MachineError> {
    try_join_all(batch.iter().map(|callback| callback.invoke(model, event))).await?;
    Ok(())
}

/// Evaluate every condition concurrently; all must pass.
async fn conditions_pass<M: Model>(
    conditions: &[Condition<Cooperative<M>>],
    model: &SharedModel<M>,
    event: &AsyncEventData<M>,
) -> Result<bool, MachineError> {
    let outcomes = try_join_all(conditions.iter().map(|condition| condition.check(model, event))).await?;
    Ok(outcomes.into_iter().all(|passed| passed))
}

impl<M: Model> State<Cooperative<M>> {
    pub async fn enter(&self, model: &SharedModel<M>, event: &AsyncEventData<M>) -> Result<(), MachineError> {
        gather(self.on_enter(), model, event).await
    }

    pub async fn exit(&self, model: &SharedModel<M>, event: &AsyncEventData<M>) -> Result<(), MachineError> {
        gather(self.on_exit(), model, event).await
    }
}

impl<M: Model> Condition<Cooperative<M>> {
    pub async fn check(&self, model: &SharedModel<M>, event: &AsyncEventData<M>) -> Result<bool, MachineError> {
        let outcome = self.predicate().evaluate(model, event).await?;
        Ok(self.passes(outcome))
    }
}

impl<M: Model> Transition<Cooperative<M>> {
    /// Like the blocking protocol, plus: once the conditions pass, every
    /// other running trigger task of the model is cancelled.
    pub(crate) async fn execute(&self, run: &Run<'_, M>, event: &mut AsyncEventData<M>) -> Result<bool, MachineError> {
        let machine = event.machine().name().to_string();
        let model = &run.entry.model;
        debug!(machine = %machine, source = %self.source(), dest = ?self.dest().name(), "initiating transition");

        gather(self.prepare(), model, event).await?;
        debug!(machine = %machine, "executed callbacks before conditions");

        if !conditions_pass(self.conditions(), model, event).await? {
            debug!(machine = %machine, "transition condition failed");
            return Ok(false);
        }

        run.entry.cancel_others(run.task);

        let hooks = run.registry.hooks();
        gather(&hooks.before_state_change, model, event).await?;
        gather(self.before(), model, event).await?;
        debug!(machine = %machine, "executed callbacks before transition");

        if let Dest::State(dest) = self.dest() {
            change_state(run, dest, event).await?;
        }

        gather(self.after(), model, event).await?;
        gather(&hooks.after_state_change, model, event).await?;
        debug!(machine = %machine, "executed callbacks after transition");
        Ok(true)
    }
}

async fn change_state<M: Model>(run: &Run<'_, M>, dest: &str, event: &mut AsyncEventData<M>) -> Result<(), MachineError> {
    let machine = event.machine().clone();
    let attribute = machine.settings().model_attribute.as_str();
    let model = &run.entry.model;
    let current = run.current_state(attribute).await?;
    let plan = run.registry.plan(&current, dest)?;

    for path in &plan.exits {
        let name = run.registry.join(path);
        let node = run
            .registry
            .state_at(path)
            .ok_or_else(|| MachineError::UnregisteredState { name: name.clone() })?;
        debug!(machine = machine.name(), state = %name, "exiting state, processing callbacks");
        node.state().exit(model, event).await?;
        info!(machine = machine.name(), state = %name, "finished processing exit callbacks");
    }

    model.lock().await.set_state(attribute, plan.next.clone());
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
        node.state().enter(model, event).await?;
        info!(machine = machine.name(), state = %name, "finished processing enter callbacks");
    }
    Ok(())
}

impl<M: Model> Event<Cooperative<M>> {
    pub(crate) async fn fire(&self, run: &Run<'_, M>, source: &str, event: &mut AsyncEventData<M>) -> Result<bool, MachineError> {
        let Some(transitions) = self.transitions_from(source) else {
            return Ok(false);
        };
        event.info.source = Some(source.to_string());
        gather(&run.registry.hooks().prepare_event, &run.entry.model, event).await?;
        debug!(machine = event.machine().name(), trigger = self.name(), source, "executed machine preparation callbacks");

        for transition in transitions {
            event.info.transition = Some(transition.info(self.name()));
            if transition.execute(run, event).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub(crate) async fn can_fire(&self, run: &Run<'_, M>, source: &str, event: &mut AsyncEventData<M>) -> Result<bool, MachineError> {
        let Some(transitions) = self.transitions_from(source) else {
            return Ok(false);
        };
        let model = &run.entry.model;
        event.info.source = Some(source.to_string());
        for transition in transitions {
            if let Dest::State(dest) = transition.dest() {
                if run.registry.get_state(dest).is_err() {
                    continue;
                }
            }
            event.info.transition = Some(transition.info(self.name()));
            gather(&run.registry.hooks().prepare_event, model, event).await?;
            gather(transition.prepare(), model, event).await?;
            if conditions_pass(transition.conditions(), model, event).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
