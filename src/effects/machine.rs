//! The blocking machine: registration, model binding and trigger processing.

use super::callback::{Blocking, Callback, EventData};
use super::handle::ModelHandle;
use super::queue::{QueueKey, QueuedJob, Queues};
use crate::builder::{MachineBuilder, OrderedTransitions, Settings, StateSpec, TransitionSpec};
use crate::core::{
    Blueprint, Bubbling, CallbackKind, Dest, EventArgs, EventInfo, IntoAction, Model, ModelId,
    NestedState, Registry, Stage, StateHistory, StateTransition, StateValue, Transition,
    TransitionInfo,
};
use crate::error::MachineError;
use chrono::Utc;
use parking_lot::{Mutex, MutexGuard, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use tracing::{debug, error, warn};

/// A model owned by the machine, with its recorded history.
pub(crate) struct ModelEntry<M> {
    pub(crate) id: ModelId,
    pub(crate) model: Mutex<M>,
    history: Mutex<StateHistory>,
}

impl<M> ModelEntry<M> {
    fn new(id: ModelId, model: M) -> Self {
        Self {
            id,
            model: Mutex::new(model),
            history: Mutex::new(StateHistory::new()),
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

    pub(crate) fn history(&self) -> StateHistory {
        self.history.lock().clone()
    }
}

/// Registry snapshot and model entry a trigger runs against.
pub(crate) struct Run<'r, M: Model> {
    pub(crate) registry: &'r Registry<Blocking<M>>,
    pub(crate) entry: &'r ModelEntry<M>,
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

/// Marks the current thread as processing a trigger until dropped.
struct Dispatching<'m> {
    active: &'m Mutex<HashMap<ThreadId, usize>>,
    thread: ThreadId,
}

impl Drop for Dispatching<'_> {
    fn drop(&mut self) {
        let mut active = self.active.lock();
        if let Some(depth) = active.get_mut(&self.thread) {
            *depth -= 1;
            if *depth == 0 {
                active.remove(&self.thread);
            }
        }
    }
}

/// A hierarchical state machine driving any number of models.
///
/// All methods take `&self`; share a machine between threads behind an
/// `Arc`. The state tree is replaced as a whole on every registration, so
/// a failed registration leaves the machine untouched and running triggers
/// keep the snapshot they started with.
///
/// # Example
///
/// ```rust
/// use treestate::builder::{StateSpec, TransitionSpec};
/// use treestate::core::{EventArgs, StateValue, Stateful};
/// use treestate::Machine;
///
/// let machine: Machine<Stateful> = Machine::builder()
///     .separator(".")
///     .states(["standing", "walking"])
///     .state(StateSpec::new("caffeinated").children(["dithering", "running"]).initial("dithering"))
///     .initial("standing")
///     .transition(TransitionSpec::new("drink", "*", "caffeinated"))
///     .transition(TransitionSpec::new("walk", "caffeinated.dithering", "caffeinated.running"))
///     .build()
///     .unwrap();
///
/// let lump = machine.add_model(Stateful::new()).unwrap();
/// machine.trigger(lump, "drink", EventArgs::new()).unwrap();
/// assert_eq!(machine.state_of(lump).unwrap(), StateValue::leaf("caffeinated.dithering"));
/// machine.trigger(lump, "walk", EventArgs::new()).unwrap();
/// assert!(machine.is_state(lump, "caffeinated", true).unwrap());
/// ```
pub struct Machine<M: Model> {
    settings: Settings,
    registry: RwLock<Arc<Registry<Blocking<M>>>>,
    models: RwLock<Vec<Arc<ModelEntry<M>>>>,
    queues: Queues<Job>,
    active: Mutex<HashMap<ThreadId, usize>>,
}

impl<M: Model> Machine<M> {
    pub fn builder() -> MachineBuilder<Blocking<M>> {
        MachineBuilder::new()
    }

    /// An empty machine with default settings.
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Self {
        let registry = Registry::new(settings.separator.clone(), settings.auto_transitions);
        Self::from_parts(settings, registry)
    }

    pub(crate) fn from_parts(settings: Settings, registry: Registry<Blocking<M>>) -> Self {
        Self {
            settings,
            registry: RwLock::new(Arc::new(registry)),
            models: RwLock::new(Vec::new()),
            queues: Queues::new(),
            active: Mutex::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.settings.name
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Snapshot of the current state tree and event table.
    pub fn registry(&self) -> Arc<Registry<Blocking<M>>> {
        self.registry.read().clone()
    }

    /// Apply `change` to a copy of the registry and swap it in on success.
    fn update<R>(
        &self,
        change: impl FnOnce(&mut Registry<Blocking<M>>) -> Result<R, MachineError>,
    ) -> Result<R, MachineError> {
        let mut current = self.registry.write();
        let mut next = Registry::clone(&current);
        let result = change(&mut next)?;
        *current = Arc::new(next);
        Ok(result)
    }

    // -- states ----------------------------------------------------------

    pub fn add_state(&self, spec: StateSpec<Blocking<M>>) -> Result<Vec<String>, MachineError> {
        self.add_states_to("", [spec])
    }

    /// Register root states. Returns every fully qualified name added.
    pub fn add_states<S>(&self, specs: impl IntoIterator<Item = S>) -> Result<Vec<String>, MachineError>
    where
        S: Into<StateSpec<Blocking<M>>>,
    {
        self.add_states_to("", specs)
    }

    /// Register states as children of `parent`.
    pub fn add_states_to<S>(
        &self,
        parent: &str,
        specs: impl IntoIterator<Item = S>,
    ) -> Result<Vec<String>, MachineError>
    where
        S: Into<StateSpec<Blocking<M>>>,
    {
        let specs: Vec<StateSpec<Blocking<M>>> = specs.into_iter().map(Into::into).collect();
        let added = self.update(|registry| {
            let scope = if parent.is_empty() {
                Vec::new()
            } else {
                registry.get_state(parent)?;
                registry.split(parent)
            };
            let added = registry.add_states(&scope, specs)?;
            registry.bind_model_callbacks(M::defines);
            Ok(added)
        })?;
        if !self.models.read().is_empty() {
            let names = added
                .iter()
                .flat_map(|name| [format!("is_{name}"), format!("to_{name}")]);
            self.warn_shadowed(names);
        }
        Ok(added)
    }

    pub fn get_state(&self, name: &str) -> Result<NestedState<Blocking<M>>, MachineError> {
        self.registry.read().get_state(name).cloned()
    }

    /// Every fully qualified state name, depth-first.
    pub fn states(&self) -> Vec<String> {
        self.registry.read().state_names()
    }

    pub fn initial(&self) -> Option<String> {
        self.registry.read().initial().map(str::to_string)
    }

    pub fn set_initial(&self, name: &str) -> Result<(), MachineError> {
        self.update(|registry| registry.set_initial(name))
    }

    pub fn on_enter(&self, state: &str, action: impl IntoAction<Blocking<M>>) -> Result<(), MachineError> {
        let action = action.into_action();
        self.update(|registry| registry.add_state_callback(state, CallbackKind::Enter, action))
    }

    pub fn on_exit(&self, state: &str, action: impl IntoAction<Blocking<M>>) -> Result<(), MachineError> {
        let action = action.into_action();
        self.update(|registry| registry.add_state_callback(state, CallbackKind::Exit, action))
    }

    pub fn blueprint(&self) -> Blueprint<Blocking<M>> {
        self.registry.read().blueprint()
    }

    // -- transitions -----------------------------------------------------

    pub fn add_transition(&self, spec: TransitionSpec<Blocking<M>>) -> Result<(), MachineError> {
        self.add_transitions([spec])
    }

    /// Register several transitions; either all of them or none.
    pub fn add_transitions(
        &self,
        specs: impl IntoIterator<Item = TransitionSpec<Blocking<M>>>,
    ) -> Result<(), MachineError> {
        let specs: Vec<_> = specs.into_iter().collect();
        let triggers: Vec<String> = specs.iter().map(|s| s.trigger().to_string()).collect();
        self.update(|registry| {
            for spec in specs {
                registry.add_transition(&[], spec)?;
            }
            Ok(())
        })?;
        if !self.models.read().is_empty() {
            self.warn_shadowed(
                triggers
                    .into_iter()
                    .flat_map(|t| [format!("may_{t}"), t]),
            );
        }
        Ok(())
    }

    pub fn add_ordered_transitions(
        &self,
        ordered: OrderedTransitions<Blocking<M>>,
    ) -> Result<(), MachineError> {
        self.update(|registry| registry.add_ordered_transitions(&ordered))
    }

    pub fn remove_transition(&self, trigger: &str, source: Option<&str>, dest: Option<&str>) {
        let mut current = self.registry.write();
        let mut next = Registry::clone(&current);
        next.remove_transition(trigger, source, dest);
        *current = Arc::new(next);
    }

    pub fn get_transitions(
        &self,
        trigger: Option<&str>,
        source: Option<&str>,
        dest: Option<&str>,
    ) -> Vec<TransitionInfo> {
        self.registry.read().get_transitions(trigger, source, dest)
    }

    /// Triggers valid from any of `states`, their ancestors included.
    pub fn get_triggers(&self, states: &[&str]) -> Result<Vec<String>, MachineError> {
        self.registry.read().get_triggers(states)
    }

    pub fn has_trigger(&self, trigger: &str) -> bool {
        self.registry.read().has_trigger(trigger)
    }

    /// Every trigger name in registration order.
    pub fn events(&self) -> Vec<String> {
        self.registry
            .read()
            .events()
            .iter()
            .map(|e| e.name().to_string())
            .collect()
    }

    pub fn prepare(&self, trigger: &str, action: impl IntoAction<Blocking<M>>) -> Result<(), MachineError> {
        self.add_event_callback(trigger, Stage::Prepare, action.into_action())
    }

    pub fn before(&self, trigger: &str, action: impl IntoAction<Blocking<M>>) -> Result<(), MachineError> {
        self.add_event_callback(trigger, Stage::Before, action.into_action())
    }

    pub fn after(&self, trigger: &str, action: impl IntoAction<Blocking<M>>) -> Result<(), MachineError> {
        self.add_event_callback(trigger, Stage::After, action.into_action())
    }

    fn add_event_callback(&self, trigger: &str, stage: Stage, action: Callback<M>) -> Result<(), MachineError> {
        self.update(|registry| registry.add_event_callback(trigger, stage, action))
    }

    // -- machine hooks ---------------------------------------------------

    fn add_hook(&self, select: impl FnOnce(&mut Registry<Blocking<M>>) -> &mut Vec<Callback<M>>, action: Callback<M>) {
        let mut current = self.registry.write();
        let mut next = Registry::clone(&current);
        select(&mut next).push(action);
        *current = Arc::new(next);
    }

    pub fn prepare_event(&self, action: impl IntoAction<Blocking<M>>) {
        self.add_hook(|r| &mut r.hooks.prepare_event, action.into_action());
    }

    pub fn before_state_change(&self, action: impl IntoAction<Blocking<M>>) {
        self.add_hook(|r| &mut r.hooks.before_state_change, action.into_action());
    }

    pub fn after_state_change(&self, action: impl IntoAction<Blocking<M>>) {
        self.add_hook(|r| &mut r.hooks.after_state_change, action.into_action());
    }

    pub fn finalize_event(&self, action: impl IntoAction<Blocking<M>>) {
        self.add_hook(|r| &mut r.hooks.finalize_event, action.into_action());
    }

    pub fn on_exception(&self, action: impl IntoAction<Blocking<M>>) {
        self.add_hook(|r| &mut r.hooks.on_exception, action.into_action());
    }

    // -- models ----------------------------------------------------------

    /// Take ownership of `model` and put it in the machine's initial state.
    pub fn add_model(&self, model: M) -> Result<ModelId, MachineError> {
        let initial = self.initial().ok_or(MachineError::NoInitialState)?;
        self.add_model_with_initial(model, &initial)
    }

    /// Take ownership of `model` and put it in `initial`, descending
    /// through initial children. No enter callbacks run.
    pub fn add_model_with_initial(&self, mut model: M, initial: &str) -> Result<ModelId, MachineError> {
        let registry = self.registry();
        let value = registry.initial_value(initial)?;
        model.set_state(&self.settings.model_attribute, value);
        self.warn_shadowed(convenience_names(&registry));

        let id = ModelId::new();
        self.models.write().push(Arc::new(ModelEntry::new(id, model)));
        debug!(machine = self.name(), model = %id, initial, "model added");
        Ok(id)
    }

    /// Give a model back. Its pending queued triggers are dropped.
    pub fn remove_model(&self, id: ModelId) -> Result<M, MachineError> {
        let mut models = self.models.write();
        let index = models
            .iter()
            .position(|e| e.id == id)
            .ok_or(MachineError::UnknownModel { id })?;
        let entry = models.remove(index);
        match Arc::try_unwrap(entry) {
            Ok(entry) => {
                drop(models);
                self.queues.purge_model(id);
                debug!(machine = self.name(), model = %id, "model removed");
                Ok(entry.model.into_inner())
            }
            Err(entry) => {
                models.insert(index, entry);
                Err(MachineError::ModelBusy { id })
            }
        }
    }

    pub fn models(&self) -> Vec<ModelId> {
        self.models.read().iter().map(|e| e.id).collect()
    }

    pub(crate) fn entry(&self, id: ModelId) -> Result<Arc<ModelEntry<M>>, MachineError> {
        self.models
            .read()
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or(MachineError::UnknownModel { id })
    }

    /// Lock a model. While this thread is inside a trigger the lock is only
    /// tried, so a callback reaching for a model in use fails instead of
    /// deadlocking.
    fn lock_model<'e>(&self, entry: &'e ModelEntry<M>, nested: bool) -> Result<MutexGuard<'e, M>, MachineError> {
        if nested {
            entry
                .model
                .try_lock()
                .ok_or(MachineError::ModelBusy { id: entry.id })
        } else {
            Ok(entry.model.lock())
        }
    }

    pub fn with_model<R>(&self, id: ModelId, f: impl FnOnce(&M) -> R) -> Result<R, MachineError> {
        let entry = self.entry(id)?;
        let model = self.lock_model(&entry, self.depth() > 0)?;
        Ok(f(&model))
    }

    /// Mutable access outside of any trigger. Changing the state attribute
    /// here bypasses every callback.
    pub fn with_model_mut<R>(&self, id: ModelId, f: impl FnOnce(&mut M) -> R) -> Result<R, MachineError> {
        let entry = self.entry(id)?;
        let mut model = self.lock_model(&entry, self.depth() > 0)?;
        Ok(f(&mut model))
    }

    fn current_state(&self, id: ModelId, model: &M) -> Result<StateValue, MachineError> {
        model
            .state(&self.settings.model_attribute)
            .ok_or_else(|| MachineError::ModelNotInitialized {
                id,
                attribute: self.settings.model_attribute.clone(),
            })
    }

    pub fn state_of(&self, id: ModelId) -> Result<StateValue, MachineError> {
        let entry = self.entry(id)?;
        let model = self.lock_model(&entry, self.depth() > 0)?;
        self.current_state(id, &model)
    }

    /// Whether `name` is active. Without `allow_substates` it must be an
    /// active leaf.
    pub fn is_state(&self, id: ModelId, name: &str, allow_substates: bool) -> Result<bool, MachineError> {
        let value = self.state_of(id)?;
        Ok(self.registry.read().is_state(&value, name, allow_substates))
    }

    /// Force a state without running any callback.
    pub fn set_state(&self, id: ModelId, value: impl Into<StateValue>) -> Result<(), MachineError> {
        let value = value.into();
        self.registry.read().validate_value(&value)?;
        let entry = self.entry(id)?;
        let mut model = self.lock_model(&entry, self.depth() > 0)?;
        model.set_state(&self.settings.model_attribute, value);
        Ok(())
    }

    pub fn history(&self, id: ModelId) -> Result<StateHistory, MachineError> {
        Ok(self.entry(id)?.history())
    }

    pub fn handle(&self, id: ModelId) -> ModelHandle<'_, M> {
        ModelHandle::new(self, id)
    }

    fn warn_shadowed(&self, names: impl IntoIterator<Item = String>) {
        for name in names {
            if M::defines(&name) {
                warn!(machine = self.name(), name = %name, "model already defines this name, skip binding");
            }
        }
    }

    // -- triggering ------------------------------------------------------

    /// Fire `trigger` on one model.
    ///
    /// Returns whether a transition happened. A queued machine that is
    /// already draining defers the trigger and returns `true`.
    pub fn trigger(&self, id: ModelId, trigger: &str, args: EventArgs) -> Result<bool, MachineError> {
        self.process(Job::Trigger {
            model: id,
            trigger: trigger.to_string(),
            args,
        })
    }

    /// Jump straight to `dest`, running the state change callbacks.
    pub fn to_state(&self, id: ModelId, dest: &str, args: EventArgs) -> Result<bool, MachineError> {
        self.process(Job::Goto {
            model: id,
            dest: dest.to_string(),
            args,
        })
    }

    /// Fire `trigger` on every model; `true` only if it succeeded for all.
    pub fn dispatch(&self, trigger: &str, args: EventArgs) -> Result<bool, MachineError> {
        let mut all = true;
        for id in self.models() {
            all &= self.trigger(id, trigger, args.clone())?;
        }
        Ok(all)
    }

    /// Whether `trigger` would currently succeed. Prepare callbacks and
    /// conditions run; the state never changes.
    pub fn may_trigger(&self, id: ModelId, trigger: &str, args: EventArgs) -> Result<bool, MachineError> {
        let entry = self.entry(id)?;
        let registry = self.registry();
        let Some(event_def) = registry.event(trigger) else {
            return Ok(false);
        };
        let _dispatching = self.dispatching();
        let mut model = self.lock_model(&entry, self.depth() > 1)?;
        let run = Run {
            registry: &registry,
            entry: &entry,
        };
        let current = self.current_state(id, &model)?;
        let mut event = EventData::new(self, EventInfo::new(id, trigger, args));
        event.info.state = Some(current.clone());

        for leaf in registry.leaf_paths(&current) {
            for depth in (1..=leaf.len()).rev() {
                let source = registry.join(&leaf[..depth]);
                match event_def.can_fire(&run, &source, &mut event, &mut model) {
                    Ok(true) => return Ok(true),
                    Ok(false) => {}
                    Err(err) if !registry.hooks().on_exception.is_empty() => {
                        event.info.error = Some(err.to_string());
                        for callback in &registry.hooks().on_exception {
                            callback.invoke(&mut model, &event)?;
                        }
                    }
                    Err(err) => return Err(err),
                }
            }
        }
        Ok(false)
    }

    fn depth(&self) -> usize {
        self.active
            .lock()
            .get(&thread::current().id())
            .copied()
            .unwrap_or(0)
    }

    fn dispatching(&self) -> Dispatching<'_> {
        let thread = thread::current().id();
        *self.active.lock().entry(thread).or_insert(0) += 1;
        Dispatching {
            active: &self.active,
            thread,
        }
    }

    fn process(&self, job: Job) -> Result<bool, MachineError> {
        match QueueKey::for_mode(self.settings.queued, job.model()) {
            None => {
                if self.depth() > 0 {
                    return Err(MachineError::ReentrantTrigger {
                        machine: self.settings.prefix(),
                    });
                }
                let _dispatching = self.dispatching();
                self.run_job(job)
            }
            Some(key) => {
                let Some(mut drain) = self.queues.admit(key, job) else {
                    return Ok(true);
                };
                let _dispatching = self.dispatching();
                let mut first = None;
                while let Some(job) = drain.next_job() {
                    let result = self.run_job(job)?;
                    first.get_or_insert(result);
                }
                Ok(first.unwrap_or(true))
            }
        }
    }

    fn run_job(&self, job: Job) -> Result<bool, MachineError> {
        let entry = self.entry(job.model())?;
        let registry = self.registry();
        let mut model = self.lock_model(&entry, self.depth() > 1)?;
        let run = Run {
            registry: &registry,
            entry: &entry,
        };
        match job {
            Job::Trigger { trigger, args, .. } => self.trigger_event(&run, &mut model, &trigger, args),
            Job::Goto { dest, args, .. } => self.goto(&run, &mut model, &dest, args),
        }
    }

    fn trigger_event(
        &self,
        run: &Run<'_, M>,
        model: &mut M,
        trigger: &str,
        args: EventArgs,
    ) -> Result<bool, MachineError> {
        let mut event = EventData::new(self, EventInfo::new(run.entry.id, trigger, args));
        event.info.state = model.state(&self.settings.model_attribute);

        let outcome = match self.trigger_nested(run, &mut event, model) {
            Ok(result) => self.check_result(run, result, model, trigger),
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
                    handlers
                        .iter()
                        .try_for_each(|callback| callback.invoke(model, &event))
                        .map(|()| false)
                }
            }
        };

        for callback in &run.registry.hooks().finalize_event {
            if let Err(err) = callback.invoke(model, &event) {
                error!(machine = self.name(), trigger, error = %err, "error while executing finalize callbacks");
                break;
            }
        }
        result
    }

    /// Attempt the trigger for every active leaf, bubbling towards the root
    /// until some level fires. `None` when no level had transitions.
    fn trigger_nested(
        &self,
        run: &Run<'_, M>,
        event: &mut EventData<'_, M>,
        model: &mut M,
    ) -> Result<Option<bool>, MachineError> {
        let current = self.current_state(run.entry.id, model)?;
        let Some(mut bubbling) = Bubbling::new(run.registry, &event.info.trigger, &current) else {
            return Ok(None);
        };
        loop {
            let active = self.current_state(run.entry.id, model)?;
            let Some(source) = bubbling.next_source(&active) else {
                break;
            };
            let fired = bubbling.event().fire(run, &source, event, model)?;
            bubbling.record(fired);
        }
        Ok(bubbling.result())
    }

    fn check_result(
        &self,
        run: &Run<'_, M>,
        result: Option<bool>,
        model: &M,
        trigger: &str,
    ) -> Result<bool, MachineError> {
        if let Some(result) = result {
            return Ok(result);
        }
        let state = self.current_state(run.entry.id, model)?;
        run.registry.classify_unhandled(
            trigger,
            &state,
            self.settings.ignore_invalid_triggers,
            self.settings.prefix(),
        )?;
        warn!(machine = self.name(), trigger, state = %state, "can't trigger event from current state, ignored");
        Ok(false)
    }

    fn goto(&self, run: &Run<'_, M>, model: &mut M, dest: &str, args: EventArgs) -> Result<bool, MachineError> {
        run.registry.get_state(dest)?;
        let current = self.current_state(run.entry.id, model)?;
        let transition: Transition<Blocking<M>> =
            Transition::new(current.to_string(), Dest::State(dest.to_string()));
        let mut event = EventData::new(self, EventInfo::new(run.entry.id, "to_state", args));
        event.info.source = Some(current.to_string());
        event.info.state = Some(current);
        event.info.transition = Some(transition.info("to_state"));
        transition.execute(run, &mut event, model)
    }
}

/// Names a [`ModelHandle`] resolves for the current registry.
fn convenience_names<M: Model>(registry: &Registry<Blocking<M>>) -> Vec<String> {
    let mut names: Vec<String> = registry
        .events()
        .iter()
        .flat_map(|e| [e.name().to_string(), format!("may_{}", e.name())])
        .collect();
    names.extend(registry.state_names().iter().map(|s| format!("is_{s}")));
    names
}

impl<M: Model> Default for Machine<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model> fmt::Debug for Machine<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("name", &self.settings.name)
            .field("states", &self.states())
            .field("models", &self.models().len())
            .finish()
    }
}
