//! Callback references for the async engine.
//!
//! Direct callbacks return futures and receive an owned [`AsyncCall`], so
//! several of them can run at once. They reach the model through its shared
//! handle. Named callbacks are still plain model methods, called with the
//! model locked.

use super::machine::{AsyncMachine, TaskId};
use crate::core::hooks::type_label;
use crate::core::{describe, Call, EventArgs, EventInfo, Hooks, IntoAction, IntoPredicate, Model, Target};
use crate::error::{CallbackError, MachineError};
use futures::future::{BoxFuture, FutureExt};
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;
use tokio::sync::Mutex;

/// A model owned by an async machine.
pub type SharedModel<M> = Arc<Mutex<M>>;

/// Context of one trigger as seen by async callbacks.
pub struct AsyncEventData<M: Model> {
    machine: AsyncMachine<M>,
    task: TaskId,
    pub(crate) info: EventInfo,
}

impl<M: Model> Clone for AsyncEventData<M> {
    fn clone(&self) -> Self {
        Self {
            machine: self.machine.clone(),
            task: self.task,
            info: self.info.clone(),
        }
    }
}

impl<M: Model> AsyncEventData<M> {
    pub(crate) fn new(machine: AsyncMachine<M>, task: TaskId, info: EventInfo) -> Self {
        Self { machine, task, info }
    }

    pub fn machine(&self) -> &AsyncMachine<M> {
        &self.machine
    }

    pub fn info(&self) -> &EventInfo {
        &self.info
    }

    /// Fire another trigger on the same model as part of the current task.
    /// Committing it never cancels the trigger that issued it.
    pub fn trigger(&self, trigger: &str, args: EventArgs) -> BoxFuture<'_, Result<bool, MachineError>> {
        self.machine
            .trigger_within(self.task, self.info.model, trigger.to_string(), args)
            .boxed()
    }
}

impl<M: Model> Deref for AsyncEventData<M> {
    type Target = EventInfo;

    fn deref(&self) -> &EventInfo {
        &self.info
    }
}

impl<M: Model> fmt::Debug for AsyncEventData<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncEventData")
            .field("info", &self.info)
            .finish()
    }
}

/// Arguments handed to a direct async callback.
pub struct AsyncCall<M: Model> {
    model: SharedModel<M>,
    event: Option<AsyncEventData<M>>,
    args: EventArgs,
}

impl<M: Model> AsyncCall<M> {
    pub fn model(&self) -> &SharedModel<M> {
        &self.model
    }

    /// Present only when the machine sends the full event.
    pub fn event(&self) -> Option<&AsyncEventData<M>> {
        self.event.as_ref()
    }

    pub fn args(&self) -> &EventArgs {
        &self.args
    }
}

type AsyncActionFn<M> = Arc<dyn Fn(AsyncCall<M>) -> BoxFuture<'static, Result<(), CallbackError>> + Send + Sync>;
type AsyncPredicateFn<M> = Arc<dyn Fn(AsyncCall<M>) -> BoxFuture<'static, Result<bool, CallbackError>> + Send + Sync>;

fn prepare_call<M: Model>(
    model: &SharedModel<M>,
    event: &AsyncEventData<M>,
    bound: Option<&EventArgs>,
) -> AsyncCall<M> {
    let send_event = event.machine().settings().send_event;
    AsyncCall {
        model: Arc::clone(model),
        event: send_event.then(|| event.clone()),
        args: match bound {
            Some(bound) => bound.bound_with(&event.info.args),
            None => event.info.args.clone(),
        },
    }
}

/// A callback of the async engine: a model method name or an async closure.
///
/// # Example
///
/// ```rust
/// use treestate::asyncio::AsyncCallback;
/// use treestate::core::Stateful;
///
/// let notify: AsyncCallback<Stateful> = AsyncCallback::labelled("notify", |call| async move {
///     let _model = call.model().lock().await;
///     Ok(())
/// });
/// assert_eq!(notify.to_string(), "notify");
/// ```
pub struct AsyncCallback<M: Model> {
    target: Target<AsyncActionFn<M>>,
    bound: Option<EventArgs>,
}

impl<M: Model> Clone for AsyncCallback<M> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            bound: self.bound.clone(),
        }
    }
}

impl<M: Model> AsyncCallback<M> {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            target: Target::Named(name.into()),
            bound: None,
        }
    }

    pub fn new<F, Fut>(func: F) -> Self
    where
        F: Fn(AsyncCall<M>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), CallbackError>> + Send + 'static,
    {
        Self::labelled(type_label::<F>(), func)
    }

    pub fn labelled<F, Fut>(label: impl Into<String>, func: F) -> Self
    where
        F: Fn(AsyncCall<M>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), CallbackError>> + Send + 'static,
    {
        Self {
            target: Target::Direct {
                label: label.into(),
                func: Arc::new(move |call| func(call).boxed()),
            },
            bound: None,
        }
    }

    pub fn bind(mut self, args: EventArgs) -> Self {
        self.bound = Some(args);
        self
    }

    pub fn label(&self) -> &str {
        self.target.label()
    }

    pub(crate) async fn invoke(&self, model: &SharedModel<M>, event: &AsyncEventData<M>) -> Result<(), MachineError> {
        let outcome = match &self.target {
            Target::Named(name) => {
                let send_event = event.machine().settings().send_event;
                let call = Call::prepare(&event.info, &event.info.args, self.bound.as_ref(), send_event);
                let mut model = model.lock().await;
                model
                    .call(name, call)
                    .ok_or_else(|| MachineError::UnresolvedCallback { name: name.clone() })?
            }
            Target::Direct { func, .. } => func(prepare_call(model, event, self.bound.as_ref())).await,
        };
        outcome.map_err(|source| MachineError::callback(self, source))
    }
}

impl<M: Model> fmt::Display for AsyncCallback<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&describe(&self.target, self.bound.as_ref()))
    }
}

impl<M: Model> fmt::Debug for AsyncCallback<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AsyncCallback({self})")
    }
}

/// A condition of the async engine.
pub struct AsyncPredicate<M: Model> {
    target: Target<AsyncPredicateFn<M>>,
    bound: Option<EventArgs>,
}

impl<M: Model> Clone for AsyncPredicate<M> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            bound: self.bound.clone(),
        }
    }
}

impl<M: Model> AsyncPredicate<M> {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            target: Target::Named(name.into()),
            bound: None,
        }
    }

    pub fn new<F, Fut>(func: F) -> Self
    where
        F: Fn(AsyncCall<M>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool, CallbackError>> + Send + 'static,
    {
        Self::labelled(type_label::<F>(), func)
    }

    pub fn labelled<F, Fut>(label: impl Into<String>, func: F) -> Self
    where
        F: Fn(AsyncCall<M>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool, CallbackError>> + Send + 'static,
    {
        Self {
            target: Target::Direct {
                label: label.into(),
                func: Arc::new(move |call| func(call).boxed()),
            },
            bound: None,
        }
    }

    pub fn bind(mut self, args: EventArgs) -> Self {
        self.bound = Some(args);
        self
    }

    pub(crate) async fn evaluate(&self, model: &SharedModel<M>, event: &AsyncEventData<M>) -> Result<bool, MachineError> {
        let outcome = match &self.target {
            Target::Named(name) => {
                let send_event = event.machine().settings().send_event;
                let call = Call::prepare(&event.info, &event.info.args, self.bound.as_ref(), send_event);
                let mut model = model.lock().await;
                model
                    .check(name, call)
                    .ok_or_else(|| MachineError::UnresolvedCallback { name: name.clone() })?
            }
            Target::Direct { func, .. } => func(prepare_call(model, event, self.bound.as_ref())).await,
        };
        outcome.map_err(|source| MachineError::callback(self, source))
    }
}

impl<M: Model> fmt::Display for AsyncPredicate<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&describe(&self.target, self.bound.as_ref()))
    }
}

impl<M: Model> fmt::Debug for AsyncPredicate<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AsyncPredicate({self})")
    }
}

/// Callback family of the async engine.
pub struct Cooperative<M>(PhantomData<fn() -> M>);

impl<M: Model> Hooks for Cooperative<M> {
    type Action = AsyncCallback<M>;
    type Predicate = AsyncPredicate<M>;

    fn named_action(name: &str) -> AsyncCallback<M> {
        AsyncCallback::named(name)
    }

    fn named_predicate(name: &str) -> AsyncPredicate<M> {
        AsyncPredicate::named(name)
    }
}

impl<M: Model> IntoAction<Cooperative<M>> for AsyncCallback<M> {
    fn into_action(self) -> AsyncCallback<M> {
        self
    }
}

impl<M: Model> IntoPredicate<Cooperative<M>> for AsyncPredicate<M> {
    fn into_predicate(self) -> AsyncPredicate<M> {
        self
    }
}
