//! Callback references for the blocking engine.

use super::machine::Machine;
use crate::core::hooks::type_label;
use crate::core::{describe, Call, EventArgs, EventInfo, Hooks, IntoAction, IntoPredicate, Model, Target};
use crate::error::{CallbackError, MachineError};
use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;

/// Context of one trigger as seen by blocking callbacks.
///
/// Dereferences to the [`EventInfo`] record; `trigger` lets a callback
/// fire further events on the same model (queued machines defer them).
pub struct EventData<'a, M: Model> {
    machine: &'a Machine<M>,
    pub(crate) info: EventInfo,
}

impl<'a, M: Model> EventData<'a, M> {
    pub(crate) fn new(machine: &'a Machine<M>, info: EventInfo) -> Self {
        Self { machine, info }
    }

    pub fn machine(&self) -> &'a Machine<M> {
        self.machine
    }

    pub fn info(&self) -> &EventInfo {
        &self.info
    }

    /// Fire another trigger on the model this event belongs to.
    pub fn trigger(&self, trigger: &str, args: EventArgs) -> Result<bool, MachineError> {
        self.machine.trigger(self.info.model, trigger, args)
    }
}

impl<M: Model> Deref for EventData<'_, M> {
    type Target = EventInfo;

    fn deref(&self) -> &EventInfo {
        &self.info
    }
}

impl<M: Model> fmt::Debug for EventData<'_, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventData").field("info", &self.info).finish()
    }
}

type ActionFn<M> =
    Arc<dyn Fn(&mut M, Call<'_, EventData<'_, M>>) -> Result<(), CallbackError> + Send + Sync>;
type PredicateFn<M> =
    Arc<dyn Fn(&mut M, Call<'_, EventData<'_, M>>) -> Result<bool, CallbackError> + Send + Sync>;

/// A callback run for its effect: a model method name or a closure,
/// optionally with bound leading arguments.
///
/// # Example
///
/// ```rust
/// use treestate::core::{EventArgs, Stateful};
/// use treestate::Callback;
///
/// let named: Callback<Stateful> = Callback::named("notify").bind(EventArgs::new().arg(1));
/// assert_eq!(named.to_string(), "notify(1)");
///
/// let direct: Callback<Stateful> = Callback::labelled("count", |_model, _call| Ok(()));
/// assert_eq!(direct.to_string(), "count");
/// ```
pub struct Callback<M: Model> {
    target: Target<ActionFn<M>>,
    bound: Option<EventArgs>,
}

impl<M: Model> Clone for Callback<M> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            bound: self.bound.clone(),
        }
    }
}

impl<M: Model> Callback<M> {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            target: Target::Named(name.into()),
            bound: None,
        }
    }

    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&mut M, Call<'_, EventData<'_, M>>) -> Result<(), CallbackError> + Send + Sync + 'static,
    {
        Self {
            target: Target::Direct {
                label: type_label::<F>(),
                func: Arc::new(func),
            },
            bound: None,
        }
    }

    pub fn labelled<F>(label: impl Into<String>, func: F) -> Self
    where
        F: Fn(&mut M, Call<'_, EventData<'_, M>>) -> Result<(), CallbackError> + Send + Sync + 'static,
    {
        Self {
            target: Target::Direct {
                label: label.into(),
                func: Arc::new(func),
            },
            bound: None,
        }
    }

    /// Bind leading arguments; trigger arguments follow them.
    pub fn bind(mut self, args: EventArgs) -> Self {
        self.bound = Some(args);
        self
    }

    pub fn label(&self) -> &str {
        self.target.label()
    }

    pub(crate) fn invoke(&self, model: &mut M, event: &EventData<'_, M>) -> Result<(), MachineError> {
        let send_event = event.machine().settings().send_event;
        let call = Call::prepare(event, &event.info.args, self.bound.as_ref(), send_event);
        let outcome = match &self.target {
            Target::Named(name) => model
                .call(name, call.map_event(|e| e.info()))
                .ok_or_else(|| MachineError::UnresolvedCallback { name: name.clone() })?,
            Target::Direct { func, .. } => func(model, call),
        };
        outcome.map_err(|source| MachineError::callback(self, source))
    }
}

impl<M: Model> fmt::Display for Callback<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&describe(&self.target, self.bound.as_ref()))
    }
}

impl<M: Model> fmt::Debug for Callback<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callback({self})")
    }
}

/// A condition callback: a model predicate name or a closure returning `bool`.
pub struct Predicate<M: Model> {
    target: Target<PredicateFn<M>>,
    bound: Option<EventArgs>,
}

impl<M: Model> Clone for Predicate<M> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            bound: self.bound.clone(),
        }
    }
}

impl<M: Model> Predicate<M> {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            target: Target::Named(name.into()),
            bound: None,
        }
    }

    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&mut M, Call<'_, EventData<'_, M>>) -> Result<bool, CallbackError> + Send + Sync + 'static,
    {
        Self {
            target: Target::Direct {
                label: type_label::<F>(),
                func: Arc::new(func),
            },
            bound: None,
        }
    }

    pub fn labelled<F>(label: impl Into<String>, func: F) -> Self
    where
        F: Fn(&mut M, Call<'_, EventData<'_, M>>) -> Result<bool, CallbackError> + Send + Sync + 'static,
    {
        Self {
            target: Target::Direct {
                label: label.into(),
                func: Arc::new(func),
            },
            bound: None,
        }
    }

    pub fn bind(mut self, args: EventArgs) -> Self {
        self.bound = Some(args);
        self
    }

    pub(crate) fn evaluate(&self, model: &mut M, event: &EventData<'_, M>) -> Result<bool, MachineError> {
        let send_event = event.machine().settings().send_event;
        let call = Call::prepare(event, &event.info.args, self.bound.as_ref(), send_event);
        let outcome = match &self.target {
            Target::Named(name) => model
                .check(name, call.map_event(|e| e.info()))
                .ok_or_else(|| MachineError::UnresolvedCallback { name: name.clone() })?,
            Target::Direct { func, .. } => func(model, call),
        };
        outcome.map_err(|source| MachineError::callback(self, source))
    }
}

impl<M: Model> fmt::Display for Predicate<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&describe(&self.target, self.bound.as_ref()))
    }
}

impl<M: Model> fmt::Debug for Predicate<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Predicate({self})")
    }
}

/// Callback family of the blocking engine.
pub struct Blocking<M>(PhantomData<fn() -> M>);

impl<M: Model> Hooks for Blocking<M> {
    type Action = Callback<M>;
    type Predicate = Predicate<M>;

    fn named_action(name: &str) -> Callback<M> {
        Callback::named(name)
    }

    fn named_predicate(name: &str) -> Predicate<M> {
        Predicate::named(name)
    }
}

impl<M: Model> IntoAction<Blocking<M>> for Callback<M> {
    fn into_action(self) -> Callback<M> {
        self
    }
}

impl<M: Model> IntoPredicate<Blocking<M>> for Predicate<M> {
    fn into_predicate(self) -> Predicate<M> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Stateful;

    #[test]
    fn named_callbacks_render_their_name() {
        let callback: Callback<Stateful> = Callback::named("on_done");
        assert_eq!(callback.to_string(), "on_done");
        assert_eq!(callback.label(), "on_done");
    }

    #[test]
    fn bound_predicates_render_arguments() {
        let predicate: Predicate<Stateful> =
            Predicate::named("is_ready").bind(EventArgs::new().kwarg("strict", true));
        assert_eq!(predicate.to_string(), "is_ready(strict=true)");
    }

    #[test]
    fn labelled_closures_keep_the_label() {
        let predicate: Predicate<Stateful> = Predicate::labelled("always", |_, _| Ok(true));
        assert_eq!(format!("{predicate:?}"), "Predicate(always)");
    }
}
