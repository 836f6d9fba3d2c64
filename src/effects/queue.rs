//! FIFO queues for triggers deferred while another trigger is processed.
//!
//! The first caller to find a queue idle becomes its drainer and receives a
//! [`Drain`] guard; everyone else only appends. Dropping a guard before the
//! queue is empty (an error, a cancelled future) discards what is left.

use crate::builder::QueueMode;
use crate::core::ModelId;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// A unit of deferred work tied to one model.
pub(crate) trait QueuedJob {
    fn model(&self) -> ModelId;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum QueueKey {
    Machine,
    Model(ModelId),
}

impl QueueKey {
    /// Queue a job for `model` belongs to, or `None` when queueing is off.
    pub(crate) fn for_mode(mode: QueueMode, model: ModelId) -> Option<Self> {
        match mode {
            QueueMode::Off => None,
            QueueMode::Machine => Some(Self::Machine),
            QueueMode::Model => Some(Self::Model(model)),
        }
    }
}

struct TransitionQueue<J> {
    pending: VecDeque<J>,
    draining: bool,
}

impl<J> Default for TransitionQueue<J> {
    fn default() -> Self {
        Self {
            pending: VecDeque::new(),
            draining: false,
        }
    }
}

pub(crate) struct Queues<J> {
    inner: Mutex<HashMap<QueueKey, TransitionQueue<J>>>,
}

impl<J: QueuedJob> Queues<J> {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Append `job`. Returns a guard when the caller has to drain the queue,
    /// `None` when a drain is already in progress.
    pub(crate) fn admit(&self, key: QueueKey, job: J) -> Option<Drain<'_, J>> {
        let mut queues = self.inner.lock();
        let queue = queues.entry(key).or_default();
        queue.pending.push_back(job);
        if queue.draining {
            debug!(queued = queue.pending.len(), "trigger deferred");
            return None;
        }
        queue.draining = true;
        Some(Drain {
            queues: self,
            key,
            finished: false,
        })
    }

    /// Drop every pending job of `model`.
    pub(crate) fn purge_model(&self, model: ModelId) {
        let mut queues = self.inner.lock();
        for queue in queues.values_mut() {
            queue.pending.retain(|job| job.model() != model);
        }
        queues.retain(|key, queue| !(*key == QueueKey::Model(model) && !queue.draining));
    }

    pub(crate) fn pending(&self, key: QueueKey) -> usize {
        self.inner
            .lock()
            .get(&key)
            .map_or(0, |queue| queue.pending.len())
    }
}

/// Exclusive right to process one queue.
pub(crate) struct Drain<'q, J: QueuedJob> {
    queues: &'q Queues<J>,
    key: QueueKey,
    finished: bool,
}

impl<J: QueuedJob> Drain<'_, J> {
    /// Next job in FIFO order; `None` ends the drain.
    pub(crate) fn next_job(&mut self) -> Option<J> {
        let mut queues = self.queues.inner.lock();
        let job = queues
            .get_mut(&self.key)
            .and_then(|queue| queue.pending.pop_front());
        if job.is_none() {
            queues.remove(&self.key);
            self.finished = true;
        }
        job
    }
}

impl<J: QueuedJob> Drop for Drain<'_, J> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Some(queue) = self.queues.inner.lock().remove(&self.key) {
            debug!(dropped = queue.pending.len(), "transition queue cleared");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Job(ModelId, u32);

    impl QueuedJob for Job {
        fn model(&self) -> ModelId {
            self.0
        }
    }

    #[test]
    fn first_caller_drains_in_fifo_order() {
        let queues = Queues::new();
        let model = ModelId::new();
        let mut drain = queues.admit(QueueKey::Machine, Job(model, 1)).unwrap();
        assert!(queues.admit(QueueKey::Machine, Job(model, 2)).is_none());
        assert!(queues.admit(QueueKey::Machine, Job(model, 3)).is_none());

        let order: Vec<u32> = std::iter::from_fn(|| drain.next_job()).map(|job| job.1).collect();
        assert_eq!(order, vec![1, 2, 3]);
        drop(drain);
        assert!(queues.admit(QueueKey::Machine, Job(model, 4)).is_some());
    }

    #[test]
    fn dropped_drain_discards_pending_jobs() {
        let queues = Queues::new();
        let model = ModelId::new();
        let mut drain = queues.admit(QueueKey::Machine, Job(model, 1)).unwrap();
        queues.admit(QueueKey::Machine, Job(model, 2));
        assert!(drain.next_job().is_some());
        drop(drain);
        assert_eq!(queues.pending(QueueKey::Machine), 0);
    }

    #[test]
    fn model_queues_are_independent() {
        let queues = Queues::new();
        let (a, b) = (ModelId::new(), ModelId::new());
        let _drain_a = queues.admit(QueueKey::Model(a), Job(a, 1)).unwrap();
        assert!(queues.admit(QueueKey::Model(b), Job(b, 1)).is_some());
    }

    #[test]
    fn purge_removes_only_that_model() {
        let queues = Queues::new();
        let (a, b) = (ModelId::new(), ModelId::new());
        let _drain = queues.admit(QueueKey::Machine, Job(a, 1)).unwrap();
        queues.admit(QueueKey::Machine, Job(b, 2));
        queues.admit(QueueKey::Machine, Job(a, 3));
        queues.purge_model(a);
        assert_eq!(queues.pending(QueueKey::Machine), 1);
    }
}
