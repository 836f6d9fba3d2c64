//! The async machine: cooperative triggers with cancellation.

use super::callback::{AsyncCallback, AsyncEventData, Cooperative, SharedModel};
use super::handle::AsyncModelHandle;
use super::transition::gather;
use crate::builder::{MachineBuilder, OrderedTransitions, Settings, StateSpec, TransitionSpec};
use crate::core::{
    Blueprint, Bubbling, CallbackKind, Dest, EventArgs, EventInfo, IntoAction, Model, ModelId,
    NestedState, Registry, Stage, StateHistory, StateTransition, StateValue, Transition,
    TransitionInfo,
};
use crate::effects::queue::{QueueKey, QueuedJob, Queues};
use crate::error::MachineError;
use chrono::Utc;
use futures::future::{try_join_all, AbortHandle, Abortable, Aborted};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Identity of one externally issued trigger and everything it triggers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct TaskId(Uuid);

impl TaskId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

struct TaskSlot {
    abort: AbortHandle,
    protected: bool,
}

pub(crate) struct AsyncEntry<M> {
    pub(crate) id: ModelId,
    pub(crate) model: SharedModel<M>,
    history: Mutex<StateHistory>,
    tasks: Mutex<HashMap<TaskId, TaskSlot>>,
}

impl<M> AsyncEntry<M> {
    fn new(id: ModelId, model: M) -> Self {
        Self {
            id,
            model: Arc::new(tokio::sync::Mutex::new(model)),
            history: Mutex::new(StateHistory::new()),
            tasks: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn record(&self, trigger: &str, from: StateValue, to: StateValue) {
        let mut history = self.history.lock();
        let current = std::mem::take(&mut *history);
        *history = current.record(StateTransition {
            trigger: trigger.to_string(),
            from,
            to,
            timestamp: Utc::now(),
        });
    }

    fn register(&self, task: TaskId, abort: AbortHandle, protected: bool) -> Registered<'_, M> {
        self.tasks.lock().insert(task, TaskSlot { abort, protected });
        Registered { entry: self, task }
    }

    /// Abort every running task of this model except `current` and the
    /// protected ones.
    pub(crate) fn cancel_others(&self, current: TaskId) {
        for (task, slot) in self.tasks.lock().iter() {
            if *task != current && !slot.protected {
                debug!(model = %self.id, "cancel running task");
                slot.abort.abort();
            }
        }
    }

    fn running(&self) -> usize {
        self.tasks.lock().len()
    }
}

/// Unregisters a task when its trigger future completes or is dropped.
struct Registered<'e, M> {
    entry: &'e AsyncEntry<M>,
    task: TaskId,
}

impl<M> Drop for Registered<'_, M> {
    fn drop(&mut self) {
        self.entry.tasks.lock().remove(&self.task);
    }
}

pub(crate) struct Run<'r, M: Model> {
    pub(crate) registry: &'r Registry<Cooperative<M>>,
    pub(crate) entry: &'r AsyncEntry<M>,
    pub(crate) task: TaskId,
}

impl<M: Model> Run<'_, M> {
    pub(crate) async fn current_state(&self, attribute: &str) -> Result<StateValue, MachineError> {
        self.entry
            .model
            .lock()
            .await
            .state(attribute)
            .ok_or_else(|| MachineError::ModelNotInitialized {
                id: self.entry.id,
                attribute: attribute.to_string(),
            })
    }
}

enum Job {
    Trigger {
        model: ModelId,
        trigger: String,
        args: EventArgs,
    },
    Goto {
        model: ModelId,
        dest: String,
        args: EventArgs,
    },
}

impl QueuedJob for Job {
    fn model(&self) -> ModelId {
        match self {
            Self::Trigger { model, .. } | Self::Goto { model, .. } => *model,
        }
    }
}

struct Shared<M: Model> {
    settings: Settings,
    registry: RwLock<Arc<Registry<Cooperative<M>>>>,
    models: RwLock<Vec<Arc<AsyncEntry<M>>>>,
    queues: Queues<Job>,
}

/// Hierarchical machine whose callbacks are futures.
///
/// A cheap-to-clone handle. Triggers on the same model may run
/// concurrently; once one of them passes its conditions, the others are
/// cancelled and report `false`. Triggers issued from callbacks through
/// [`AsyncEventData::trigger`] belong to the task that issued them and
/// are never cancelled by it.
///
/// # Example
///
/// ```rust
/// use treestate::asyncio::{AsyncCallback, AsyncMachine};
/// use treestate::builder::TransitionSpec;
/// use treestate::core::{EventArgs, StateValue, Stateful};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let machine: AsyncMachine<Stateful> = AsyncMachine::builder()
///     .states(["idle", "busy"])
///     .initial("idle")
///     .transition(TransitionSpec::new("start", "idle", "busy").after(AsyncCallback::labelled(
///         "log",
///         |_call| async { Ok(()) },
///     )))
///     .build()
///     .unwrap();
/// let id = machine.add_model(Stateful::new()).unwrap();
/// assert!(machine.trigger(id, "start", EventArgs::new()).await.unwrap());
/// assert_eq!(machine.state_of(id).await.unwrap(), StateValue::leaf("busy"));
/// # }
/// ```
pub struct AsyncMachine<M: Model> {
    shared: Arc<Shared<M>>,
}

impl<M: Model> Clone for AsyncMachine<M> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<M: Model> AsyncMachine<M> {
    pub fn builder() -> MachineBuilder<Cooperative<M>> {
        MachineBuilder::new()
    }

    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Self {
        let registry = Registry::new(settings.separator.clone(), settings.auto_transitions);
        Self::from_parts(settings, registry)
    }

    pub(crate) fn from_parts(settings: Settings, registry: Registry<Cooperative<M>>) -> Self {
        Self {
            shared: Arc::new(Shared {
                settings,
                registry: RwLock::new(Arc::new(registry)),
                models: RwLock::new(Vec::new()),
                queues: Queues::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.shared.settings.name
    }

    pub fn settings(&self) -> &Settings {
        &self.shared.settings
    }

    pub fn registry(&self) -> Arc<Registry<Cooperative<M>>> {
        self.shared.registry.read().clone()
    }

    fn update<R>(
        &self,
        change: impl FnOnce(&mut Registry<Cooperative<M>>) -> Result<R, MachineError>,
    ) -> Result<R, MachineError> {
        let mut current = self.shared.registry.write();
        let mut next = Registry::clone(&current);
        let result = change(&mut next)?;
        *current = Arc::new(next);
        Ok(result)
    }

    // -- states ----------------------------------------------------------

    pub fn add_state(&self, spec: StateSpec<Cooperative<M>>) -> Result<Vec<String>, MachineError> {
        self.add_states_to("", [spec])
    }

    pub fn add_states<S>(&self, specs: impl IntoIterator<Item = S>) -> Result<Vec<String>, MachineError>
    where
        S: Into<StateSpec<Cooperative<M>>>,
    {
        self.add_states_to("", specs)
    }

    pub fn add_states_to<S>(
        &self,
        parent: &str,
        specs: impl IntoIterator<Item = S>,
    ) -> Result<Vec<String>, MachineError>
    where
        S: Into<StateSpec<Cooperative<M>>>,
    {
        let specs: Vec<StateSpec<Cooperative<M>>> = specs.into_iter().map(Into::into).collect();
        self.update(|registry| {
            let scope = if parent.is_empty() {
                Vec::new()
            } else {
                registry.get_state(parent)?;
                registry.split(parent)
            };
            let added = registry.add_states(&scope, specs)?;
            registry.bind_model_callbacks(M::defines);
            Ok(added)
        })
    }

    pub fn get_state(&self, name: &str) -> Result<NestedState<Cooperative<M>>, MachineError> {
        self.shared.registry.read().get_state(name).cloned()
    }

    pub fn states(&self) -> Vec<String> {
        self.shared.registry.read().state_names()
    }

    pub fn initial(&self) -> Option<String> {
        self.shared.registry.read().initial().map(str::to_string)
    }

    pub fn set_initial(&self, name: &str) -> Result<(), MachineError> {
        self.update(|registry| registry.set_initial(name))
    }

    pub fn on_enter(&self, state: &str, action: impl IntoAction<Cooperative<M>>) -> Result<(), MachineError> {
        let action = action.into_action();
        self.update(|registry| registry.add_state_callback(state, CallbackKind::Enter, action))
    }

    pub fn on_exit(&self, state: &str, action: impl IntoAction<Cooperative<M>>) -> Result<(), MachineError> {
        let action = action.into_action();
        self.update(|registry| registry.add_state_callback(state, CallbackKind::Exit, action))
    }

    pub fn blueprint(&self) -> Blueprint<Cooperative<M>> {
        self.shared.registry.read().blueprint()
    }

    // -- transitions -----------------------------------------------------

    pub fn add_transition(&self, spec: TransitionSpec<Cooperative<M>>) -> Result<(), MachineError> {
        self.add_transitions([spec])
    }

    pub fn add_transitions(
        &self,
        specs: impl IntoIterator<Item = TransitionSpec<Cooperative<M>>>,
    ) -> Result<(), MachineError> {
        let specs: Vec<_> = specs.into_iter().collect();
        self.update(|registry| {
            for spec in specs {
                registry.add_transition(&[], spec)?;
            }
            Ok(())
        })
    }

    pub fn add_ordered_transitions(&self, ordered: OrderedTransitions<Cooperative<M>>) -> Result<(), MachineError> {
        self.update(|registry| registry.add_ordered_transitions(&ordered))
    }

    pub fn remove_transition(&self, trigger: &str, source: Option<&str>, dest: Option<&str>) {
        let mut current = self.shared.registry.write();
        let mut next = Registry::clone(&current);
        next.remove_transition(trigger, source, dest);
        *current = Arc::new(next);
    }

    pub fn get_transitions(&self, trigger: Option<&str>, source: Option<&str>, dest: Option<&str>) -> Vec<TransitionInfo> {
        self.shared.registry.read().get_transitions(trigger, source, dest)
    }

    pub fn get_triggers(&self, states: &[&str]) -> Result<Vec<String>, MachineError> {
        self.shared.registry.read().get_triggers(states)
    }

    pub fn has_trigger(&self, trigger: &str) -> bool {
        self.shared.registry.read().has_trigger(trigger)
    }

    pub fn events(&self) -> Vec<String> {
        self.shared
            .registry
            .read()
            .events()
            .iter()
            .map(|e| e.name().to_string())
            .collect()
    }

    pub fn prepare(&self, trigger: &str, action: impl IntoAction<Cooperative<M>>) -> Result<(), MachineError> {
        let action = action.into_action();
        self.update(|registry| registry.add_event_callback(trigger, Stage::Prepare, action))
    }

    pub fn before(&self, trigger: &str, action: impl IntoAction<Cooperative<M>>) -> Result<(), MachineError> {
        let action = action.into_action();
        self.update(|registry| registry.add_event_callback(trigger, Stage::Before, action))
    }

    pub fn after(&self, trigger: &str, action: impl IntoAction<Cooperative<M>>) -> Result<(), MachineError> {
        let action = action.into_action();
        self.update(|registry| registry.add_event_callback(trigger, Stage::After, action))
    }

    // -- machine hooks ---------------------------------------------------

    fn add_hook(
        &self,
        select: impl FnOnce(&mut Registry<Cooperative<M>>) -> &mut Vec<AsyncCallback<M>>,
        action: AsyncCallback<M>,
    ) {
        let mut current = self.shared.registry.write();
        let mut next = Registry::clone(&current);
        select(&mut next).push(action);
        *current = Arc::new(next);
    }

    pub fn prepare_event(&self, action: impl IntoAction<Cooperative<M>>) {
        self.add_hook(|r| &mut r.hooks.prepare_event, action.into_action());
    }

    pub fn before_state_change(&self, action: impl IntoAction<Cooperative<M>>) {
        self.add_hook(|r| &mut r.hooks.before_state_change, action.into_action());
    }

    pub fn after_state_change(&self, action: impl IntoAction<Cooperative<M>>) {
        self.add_hook(|r| &mut r.hooks.after_state_change, action.into_action());
    }

    pub fn finalize_event(&self, action: impl IntoAction<Cooperative<M>>) {
        self.add_hook(|r| &mut r.hooks.finalize_event, action.into_action());
    }

    pub fn on_exception(&self, action: impl IntoAction<Cooperative<M>>) {
        self.add_hook(|r| &mut r.hooks.on_exception, action.into_action());
    }

    // -- models ----------------------------------------------------------

    pub fn add_model(&self, model: M) -> Result<ModelId, MachineError> {
        let initial = self.initial().ok_or(MachineError::NoInitialState)?;
        self.add_model_with_initial(model, &initial)
    }

    pub fn add_model_with_initial(&self, mut model: M, initial: &str) -> Result<ModelId, MachineError> {
        let registry = self.registry();
        let value = registry.initial_value(initial)?;
        model.set_state(&self.settings().model_attribute, value);
        for name in registry.state_names().iter().map(|s| format!("is_{s}")) {
            if M::defines(&name) {
                warn!(machine = self.name(), name = %name, "model already defines this name, skip binding");
            }
        }
        let id = ModelId::new();
        self.shared.models.write().push(Arc::new(AsyncEntry::new(id, model)));
        debug!(machine = self.name(), model = %id, initial, "model added");
        Ok(id)
    }

    /// Give a model back. Fails with [`MachineError::ModelBusy`] while a
    /// trigger is running on it or a callback still holds its handle.
    pub fn remove_model(&self, id: ModelId) -> Result<M, MachineError> {
        let mut models = self.shared.models.write();
        let index = models
            .iter()
            .position(|e| e.id == id)
            .ok_or(MachineError::UnknownModel { id })?;
        let entry = models.remove(index);
        let entry = match Arc::try_unwrap(entry) {
            Ok(entry) => entry,
            Err(entry) => {
                models.insert(index, entry);
                return Err(MachineError::ModelBusy { id });
            }
        };
        match Arc::try_unwrap(entry.model) {
            Ok(model) => {
                drop(models);
                self.shared.queues.purge_model(id);
                debug!(machine = self.name(), model = %id, "model removed");
                Ok(model.into_inner())
            }
            Err(model) => {
                models.insert(
                    index,
                    Arc::new(AsyncEntry {
                        id,
                        model,
                        history: entry.history,
                        tasks: entry.tasks,
                    }),
                );
                Err(MachineError::ModelBusy { id })
            }
        }
    }

    pub fn models(&self) -> Vec<ModelId> {
        self.shared.models.read().iter().map(|e| e.id).collect()
    }

    fn entry(&self, id: ModelId) -> Result<Arc<AsyncEntry<M>>, MachineError> {
        self.shared
            .models
            .read()
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or(MachineError::UnknownModel { id })
    }

    /// Shared handle to a model, for reading or editing it directly.
    pub fn model(&self, id: ModelId) -> Result<SharedModel<M>, MachineError> {
        Ok(Arc::clone(&self.entry(id)?.model))
    }

    pub async fn state_of(&self, id: ModelId) -> Result<StateValue, MachineError> {
        let entry = self.entry(id)?;
        let attribute = &self.settings().model_attribute;
        let state = entry.model.lock().await.state(attribute);
        state.ok_or_else(|| MachineError::ModelNotInitialized {
            id,
            attribute: attribute.clone(),
        })
    }

    pub async fn is_state(&self, id: ModelId, name: &str, allow_substates: bool) -> Result<bool, MachineError> {
        let value = self.state_of(id).await?;
        Ok(self.registry().is_state(&value, name, allow_substates))
    }

    pub async fn set_state(&self, id: ModelId, value: impl Into<StateValue>) -> Result<(), MachineError> {
        let value = value.into();
        self.registry().validate_value(&value)?;
        let entry = self.entry(id)?;
        entry
            .model
            .lock()
            .await
            .set_state(&self.settings().model_attribute, value);
        Ok(())
    }

    pub fn history(&self, id: ModelId) -> Result<StateHistory, MachineError> {
        Ok(self.entry(id)?.history.lock().clone())
    }

    /// Number of trigger tasks currently registered for a model.
    pub fn running_tasks(&self, id: ModelId) -> Result<usize, MachineError> {
        Ok(self.entry(id)?.running())
    }

    pub fn handle(&self, id: ModelId) -> AsyncModelHandle<'_, M> {
        AsyncModelHandle::new(self, id)
    }

    // -- triggering ------------------------------------------------------

    /// Fire `trigger` as a new task. Returns `false` when the task was
    /// cancelled by a concurrent transition of the same model.
    pub async fn trigger(&self, id: ModelId, trigger: &str, args: EventArgs) -> Result<bool, MachineError> {
        let job = Job::Trigger {
            model: id,
            trigger: trigger.to_string(),
            args,
        };
        self.run_task(id, false, job).await
    }

    /// Like [`trigger`](Self::trigger), but the task cannot be cancelled
    /// by other triggers.
    pub async fn trigger_protected(&self, id: ModelId, trigger: &str, args: EventArgs) -> Result<bool, MachineError> {
        let job = Job::Trigger {
            model: id,
            trigger: trigger.to_string(),
            args,
        };
        self.run_task(id, true, job).await
    }

    pub async fn to_state(&self, id: ModelId, dest: &str, args: EventArgs) -> Result<bool, MachineError> {
        let job = Job::Goto {
            model: id,
            dest: dest.to_string(),
            args,
        };
        self.run_task(id, false, job).await
    }

    /// Fire `trigger` on every model concurrently; `true` only if all
    /// succeeded. The first error cancels the rest.
    pub async fn dispatch(&self, trigger: &str, args: EventArgs) -> Result<bool, MachineError> {
        let models = self.models();
        let results = try_join_all(models.into_iter().map(|id| self.trigger(id, trigger, args.clone()))).await?;
        Ok(results.into_iter().all(|fired| fired))
    }

    pub async fn may_trigger(&self, id: ModelId, trigger: &str, args: EventArgs) -> Result<bool, MachineError> {
        let entry = self.entry(id)?;
        let registry = self.registry();
        let Some(event_def) = registry.event(trigger) else {
            return Ok(false);
        };
        let run = Run {
            registry: &registry,
            entry: &entry,
            task: TaskId::new(),
        };
        let current = run.current_state(&self.settings().model_attribute).await?;
        let mut event = AsyncEventData::new(self.clone(), run.task, EventInfo::new(id, trigger, args));
        event.info.state = Some(current.clone());

        for leaf in registry.leaf_paths(&current) {
            for depth in (1..=leaf.len()).rev() {
                let source = registry.join(&leaf[..depth]);
                match event_def.can_fire(&run, &source, &mut event).await {
                    Ok(true) => return Ok(true),
                    Ok(false) => {}
                    Err(err) if !registry.hooks().on_exception.is_empty() => {
                        event.info.error = Some(err.to_string());
                        gather(&registry.hooks().on_exception, &entry.model, &event).await?;
                    }
                    Err(err) => return Err(err),
                }
            }
        }
        Ok(false)
    }

    /// Run a trigger issued from inside `task`.
    pub(crate) async fn trigger_within(
        &self,
        task: TaskId,
        model: ModelId,
        trigger: String,
        args: EventArgs,
    ) -> Result<bool, MachineError> {
        self.process(
            task,
            Job::Trigger {
                model,
                trigger,
                args,
            },
        )
        .await
    }

    async fn run_task(&self, id: ModelId, protected: bool, job: Job) -> Result<bool, MachineError> {
        let entry = self.entry(id)?;
        let task = TaskId::new();
        let (abort, registration) = AbortHandle::new_pair();
        let _registered = entry.register(task, abort, protected);
        match Abortable::new(self.process(task, job), registration).await {
            Ok(result) => result,
            Err(Aborted) => {
                debug!(machine = self.name(), model = %id, "trigger cancelled by a concurrent transition");
                Ok(false)
            }
        }
    }

    async fn process(&self, task: TaskId, job: Job) -> Result<bool, MachineError> {
        match QueueKey::for_mode(self.settings().queued, job.model()) {
            None => self.run_job(task, job).await,
            Some(key) => {
                let Some(mut drain) = self.shared.queues.admit(key, job) else {
                    return Ok(true);
                };
                let mut first = None;
                while let Some(job) = drain.next_job() {
                    let result = self.run_job(task, job).await?;
                    first.get_or_insert(result);
                }
                Ok(first.unwrap_or(true))
            }
        }
    }

    async fn run_job(&self, task: TaskId, job: Job) -> Result<bool, MachineError> {
        let entry = self.entry(job.model())?;
        let registry = self.registry();
        let run = Run {
            registry: &registry,
            entry: &entry,
            task,
        };
        match job {
            Job::Trigger { trigger, args, .. } => self.trigger_event(&run, &trigger, args).await,
            Job::Goto { dest, args, .. } => self.goto(&run, &dest, args).await,
        }
    }

    async fn trigger_event(&self, run: &Run<'_, M>, trigger: &str, args: EventArgs) -> Result<bool, MachineError> {
        let model = &run.entry.model;
        let mut event = AsyncEventData::new(self.clone(), run.task, EventInfo::new(run.entry.id, trigger, args));
        event.info.state = model.lock().await.state(&self.settings().model_attribute);

        let outcome = match self.trigger_nested(run, &mut event).await {
            Ok(result) => self.check_result(run, result, trigger).await,
            Err(err) => Err(err),
        };
        let result = match outcome {
            Ok(result) => {
                event.info.result = result;
                Ok(result)
            }
            Err(err) => {
                event.info.error = Some(err.to_string());
                let handlers = &run.registry.hooks().on_exception;
                if handlers.is_empty() {
                    Err(err)
                } else {
                    debug!(machine = self.name(), trigger, error = %err, "handing error to exception callbacks");
                    gather(handlers, model, &event).await.map(|()| false)
                }
            }
        };

        if let Err(err) = gather(&run.registry.hooks().finalize_event, model, &event).await {
            error!(machine = self.name(), trigger, error = %err, "error while executing finalize callbacks");
        }
        result
    }

    async fn trigger_nested(&self, run: &Run<'_, M>, event: &mut AsyncEventData<M>) -> Result<Option<bool>, MachineError> {
        let attribute = &self.settings().model_attribute;
        let current = run.current_state(attribute).await?;
        let Some(mut bubbling) = Bubbling::new(run.registry, &event.info.trigger, &current) else {
            return Ok(None);
        };
        loop {
            let active = run.current_state(attribute).await?;
            let Some(source) = bubbling.next_source(&active) else {
                break;
            };
            let fired = bubbling.event().fire(run, &source, event).await?;
            bubbling.record(fired);
        }
        Ok(bubbling.result())
    }

    async fn check_result(&self, run: &Run<'_, M>, result: Option<bool>, trigger: &str) -> Result<bool, MachineError> {
        if let Some(result) = result {
            return Ok(result);
        }
        let state = run.current_state(&self.settings().model_attribute).await?;
        run.registry.classify_unhandled(
            trigger,
            &state,
            self.settings().ignore_invalid_triggers,
            self.settings().prefix(),
        )?;
        warn!(machine = self.name(), trigger, state = %state, "can't trigger event from current state, ignored");
        Ok(false)
    }

    async fn goto(&self, run: &Run<'_, M>, dest: &str, args: EventArgs) -> Result<bool, MachineError> {
        run.registry.get_state(dest)?;
        let current = run.current_state(&self.settings().model_attribute).await?;
        let transition: Transition<Cooperative<M>> =
            Transition::new(current.to_string(), Dest::State(dest.to_string()));
        let mut event = AsyncEventData::new(self.clone(), run.task, EventInfo::new(run.entry.id, "to_state", args));
        event.info.source = Some(current.to_string());
        event.info.state = Some(current);
        event.info.transition = Some(transition.info("to_state"));
        transition.execute(run, &mut event).await
    }
}

impl<M: Model> Default for AsyncMachine<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model> fmt::Debug for AsyncMachine<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncMachine")
            .field("name", &self.shared.settings.name)
            .field("states", &self.states())
            .field("models", &self.models().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Stateful;

    fn machine() -> AsyncMachine<Stateful> {
        AsyncMachine::builder()
            .states(["A", "B", "C"])
            .initial("A")
            .transition(TransitionSpec::new("go", "A", "B"))
            .transition(TransitionSpec::new("go", "B", "C"))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn trigger_moves_model() {
        let machine = machine();
        let id = machine.add_model(Stateful::new()).unwrap();
        assert!(machine.trigger(id, "go", EventArgs::new()).await.unwrap());
        assert_eq!(machine.state_of(id).await.unwrap(), StateValue::leaf("B"));
        assert_eq!(machine.running_tasks(id).unwrap(), 0);
    }

    #[tokio::test]
    async fn invalid_trigger_is_an_error() {
        let machine = machine();
        let id = machine.add_model_with_initial(Stateful::new(), "C").unwrap();
        let err = machine.trigger(id, "go", EventArgs::new()).await.unwrap_err();
        assert!(matches!(err, MachineError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn dispatch_reaches_every_model() {
        let machine = machine();
        let a = machine.add_model(Stateful::new()).unwrap();
        let b = machine.add_model_with_initial(Stateful::new(), "B").unwrap();
        assert!(machine.dispatch("go", EventArgs::new()).await.unwrap());
        assert_eq!(machine.state_of(a).await.unwrap(), StateValue::leaf("B"));
        assert_eq!(machine.state_of(b).await.unwrap(), StateValue::leaf("C"));
    }

    #[tokio::test]
    async fn remove_model_fails_while_handle_is_held() {
        let machine = machine();
        let id = machine.add_model(Stateful::new()).unwrap();
        let held = machine.model(id).unwrap();
        assert!(matches!(machine.remove_model(id), Err(MachineError::ModelBusy { .. })));
        drop(held);
        assert!(machine.remove_model(id).is_ok());
        assert!(machine.models().is_empty());
    }

    #[tokio::test]
    async fn may_trigger_leaves_state_alone() {
        let machine = machine();
        let id = machine.add_model(Stateful::new()).unwrap();
        assert!(machine.may_trigger(id, "go", EventArgs::new()).await.unwrap());
        assert!(!machine.may_trigger(id, "fly", EventArgs::new()).await.unwrap());
        assert_eq!(machine.state_of(id).await.unwrap(), StateValue::leaf("A"));
    }
}
