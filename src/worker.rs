//! Single background consumer for chapter I/O.
//!
//! Tasks run strictly one at a time in FIFO order. `push_task` may discard
//! everything that has not started yet; a task that is already running always
//! finishes and applies its result.

use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info};

pub type Task = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct QueueState {
    tasks: VecDeque<Task>,
    running: bool,
    shutdown: bool,
}

#[derive(Default)]
pub struct TaskQueue {
    state: Mutex<QueueState>,
    ready: Condvar,
    idle: Condvar,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue `task`, optionally dropping every queued task first.
    /// Returns how many pending tasks were discarded.
    pub fn push_task(&self, task: Task, clear_queue_first: bool) -> usize {
        let discarded = {
            let mut state = self.lock();
            if state.shutdown {
                debug!("Ignoring task pushed after shutdown");
                return 0;
            }
            let discarded = if clear_queue_first {
                let count = state.tasks.len();
                state.tasks.clear();
                count
            } else {
                0
            };
            state.tasks.push_back(task);
            discarded
        };
        if discarded > 0 {
            debug!(discarded, "Superseded pending worker tasks");
        }
        self.ready.notify_one();
        discarded
    }

    pub fn pending(&self) -> usize {
        self.lock().tasks.len()
    }

    /// Block until a task is available or shutdown is requested, then run it.
    /// Returns when shutdown is requested.
    pub fn worker_loop(&self) {
        loop {
            let task = {
                let state = self.lock();
                let mut state = self
                    .ready
                    .wait_while(state, |s| s.tasks.is_empty() && !s.shutdown)
                    .unwrap_or_else(PoisonError::into_inner);
                if state.shutdown {
                    state.tasks.clear();
                    state.running = false;
                    self.idle.notify_all();
                    break;
                }
                let Some(task) = state.tasks.pop_front() else {
                    continue;
                };
                state.running = true;
                task
            };

            if catch_unwind(AssertUnwindSafe(task)).is_err() {
                error!("Worker task panicked; continuing with next task");
            }

            let mut state = self.lock();
            state.running = false;
            if state.tasks.is_empty() {
                self.idle.notify_all();
            }
        }
        debug!("Worker loop exited");
    }

    /// Wake the worker and make it exit without running queued tasks.
    pub fn request_shutdown(&self) {
        let mut state = self.lock();
        state.shutdown = true;
        state.tasks.clear();
        drop(state);
        self.ready.notify_all();
        self.idle.notify_all();
    }

    pub fn is_shutdown(&self) -> bool {
        self.lock().shutdown
    }

    /// Block until the queue is empty and nothing is running (or shutdown).
    pub fn wait_idle(&self) {
        let state = self.lock();
        let _state = self
            .idle
            .wait_while(state, |s| {
                !s.shutdown && (s.running || !s.tasks.is_empty())
            })
            .unwrap_or_else(PoisonError::into_inner);
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owns the worker thread; shutting down (or dropping) joins it.
pub struct Worker {
    queue: Arc<TaskQueue>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    pub fn spawn() -> std::io::Result<Self> {
        let queue = Arc::new(TaskQueue::new());
        let thread_queue = Arc::clone(&queue);
        let handle = thread::Builder::new()
            .name("chapter-worker".to_string())
            .spawn(move || thread_queue.worker_loop())?;
        info!("Started chapter worker thread");
        Ok(Self {
            queue,
            handle: Some(handle),
        })
    }

    pub fn queue(&self) -> &Arc<TaskQueue> {
        &self.queue
    }

    pub fn push_task(&self, task: impl FnOnce() + Send + 'static, clear_queue_first: bool) {
        self.queue.push_task(Box::new(task), clear_queue_first);
    }

    pub fn wait_idle(&self) {
        self.queue.wait_idle();
    }

    pub fn shutdown(&mut self) {
        self.queue.request_shutdown();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Chapter worker thread panicked during shutdown");
            } else {
                info!("Chapter worker stopped");
            }
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
