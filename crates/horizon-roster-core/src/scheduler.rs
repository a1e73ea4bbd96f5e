//! Deferred task queue for next-tick execution.
//!
//! The roster subsystem never blocks and never spawns threads; when work must
//! wait (e.g. coalescing a burst of state churn before an expensive
//! recompute), it is pushed onto a [`DeferredQueue`] owned by the host. The
//! host drains the queue once per event-loop tick via
//! [`DeferredQueue::run_pending`].
//!
//! Tasks deferred while a drain is in progress run on the *next* drain, not
//! the current one, so a task that re-defers itself cannot starve the loop.
//!
//! # Example
//!
//! ```
//! use horizon_roster_core::DeferredQueue;
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! let queue = DeferredQueue::new();
//! let ran = Arc::new(AtomicUsize::new(0));
//!
//! let r = ran.clone();
//! queue.defer(move || {
//!     r.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! assert_eq!(ran.load(Ordering::SeqCst), 0);
//! queue.run_pending(); // the host's tick
//! assert_eq!(ran.load(Ordering::SeqCst), 1);
//! ```

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

new_key_type! {
    /// A unique identifier for a deferred task.
    ///
    /// Returned by [`DeferredQueue::defer`]; pass to [`DeferredQueue::cancel`]
    /// to drop the task before it runs.
    pub struct TaskId;
}

/// A boxed one-shot task.
type BoxedTask = Box<dyn FnOnce() + Send>;

/// Internal queue state: task storage plus FIFO execution order.
struct QueueState {
    tasks: SlotMap<TaskId, BoxedTask>,
    order: Vec<TaskId>,
}

impl QueueState {
    fn new() -> Self {
        Self {
            tasks: SlotMap::with_key(),
            order: Vec::new(),
        }
    }
}

/// A drain-on-tick queue of one-shot tasks.
///
/// The queue is the single point of asynchrony in the roster subsystem.
/// Pushing is cheap and never runs the task; execution happens when the host
/// calls [`run_pending`](Self::run_pending) on its own tick.
pub struct DeferredQueue {
    state: Mutex<QueueState>,
}

impl Default for DeferredQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl DeferredQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState::new()),
        }
    }

    /// Defer a task to the next tick.
    ///
    /// Returns the task ID, usable with [`cancel`](Self::cancel) until the
    /// task has run.
    pub fn defer<F>(&self, task: F) -> TaskId
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.state.lock();
        let id = state.tasks.insert(Box::new(task));
        state.order.push(id);
        id
    }

    /// Cancel a pending task.
    ///
    /// Returns `true` if the task was still pending and has been dropped.
    pub fn cancel(&self, id: TaskId) -> bool {
        self.state.lock().tasks.remove(id).is_some()
    }

    /// The number of tasks currently pending.
    pub fn pending_count(&self) -> usize {
        self.state.lock().tasks.len()
    }

    /// Whether no tasks are pending.
    pub fn is_empty(&self) -> bool {
        self.state.lock().tasks.is_empty()
    }

    /// Run every task that was pending when this call began.
    ///
    /// Tasks run in defer order, outside the queue lock, so a task may defer
    /// further work; that work lands on the next drain. Returns the number of
    /// tasks executed (cancelled tasks are not counted).
    pub fn run_pending(&self) -> usize {
        let (mut tasks, order) = {
            let mut state = self.state.lock();
            let tasks = std::mem::replace(&mut state.tasks, SlotMap::with_key());
            let order = std::mem::take(&mut state.order);
            (tasks, order)
        };

        let mut executed = 0;
        for id in order {
            if let Some(task) = tasks.remove(id) {
                task();
                executed += 1;
            }
        }

        if executed > 0 {
            tracing::trace!(
                target: "horizon_roster_core::scheduler",
                executed,
                "drained deferred queue"
            );
        }
        executed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_tasks_run_in_defer_order() {
        let queue = DeferredQueue::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let l = log.clone();
            queue.defer(move || l.lock().push(i));
        }

        assert_eq!(queue.run_pending(), 3);
        assert_eq!(*log.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn test_cancel_drops_task() {
        let queue = DeferredQueue::new();
        let ran = Arc::new(AtomicUsize::new(0));

        let r = ran.clone();
        let id = queue.defer(move || {
            r.fetch_add(1, Ordering::SeqCst);
        });

        assert!(queue.cancel(id));
        assert!(!queue.cancel(id));
        assert_eq!(queue.run_pending(), 0);
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_redefer_runs_next_drain() {
        let queue = Arc::new(DeferredQueue::new());
        let ran = Arc::new(AtomicUsize::new(0));

        let q = queue.clone();
        let r = ran.clone();
        queue.defer(move || {
            r.fetch_add(1, Ordering::SeqCst);
            let r2 = r.clone();
            q.defer(move || {
                r2.fetch_add(10, Ordering::SeqCst);
            });
        });

        assert_eq!(queue.run_pending(), 1);
        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert_eq!(queue.pending_count(), 1);

        assert_eq!(queue.run_pending(), 1);
        assert_eq!(ran.load(Ordering::SeqCst), 11);
        assert!(queue.is_empty());
    }
}
