//! Microtask queue.
//!
//! Continuations that must run "after the current operation" (resolved
//! definition waits, batched mutation delivery) are posted here and drained
//! by [`Host::run_until_idle`](crate::Host::run_until_idle). Tasks receive the
//! context they are drained against, so they can mutate it freely.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

/// A unique identifier for a queued task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

impl TaskId {
    /// Get the raw u64 value of this task ID.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Global counter for generating unique task IDs.
static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

fn next_task_id() -> TaskId {
    TaskId(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
}

/// A boxed continuation.
pub type BoxedTask<C> = Box<dyn FnOnce(&mut C) + Send + 'static>;

struct TaskData<C> {
    id: TaskId,
    task: BoxedTask<C>,
}

/// FIFO queue of continuations over a context `C`.
pub struct TaskQueue<C> {
    tasks: VecDeque<TaskData<C>>,
}

impl<C> TaskQueue<C> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            tasks: VecDeque::new(),
        }
    }

    /// Post a task. Returns an id that can cancel it while it is pending.
    pub fn post<F>(&mut self, task: F) -> TaskId
    where
        F: FnOnce(&mut C) + Send + 'static,
    {
        self.post_boxed(Box::new(task))
    }

    /// Post an already boxed task.
    pub fn post_boxed(&mut self, task: BoxedTask<C>) -> TaskId {
        let id = next_task_id();
        self.tasks.push_back(TaskData { id, task });
        id
    }

    /// Cancel a pending task.
    ///
    /// Returns `true` if the task was found and cancelled.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        if let Some(pos) = self.tasks.iter().position(|t| t.id == id) {
            self.tasks.remove(pos);
            true
        } else {
            false
        }
    }

    /// Check if there are any pending tasks.
    pub fn has_pending(&self) -> bool {
        !self.tasks.is_empty()
    }

    /// Get the number of pending tasks.
    pub fn pending_count(&self) -> usize {
        self.tasks.len()
    }

    /// Take the oldest task, if any.
    ///
    /// The caller runs it against the context; the queue itself never holds
    /// a borrow of the context, so tasks may post further tasks.
    pub fn pop(&mut self) -> Option<BoxedTask<C>> {
        self.tasks.pop_front().map(|data| data.task)
    }
}

impl<C> Default for TaskQueue<C> {
    fn default() -> Self {
        Self::new()
    }
}
