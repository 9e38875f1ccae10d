//! Fixed-size thread pool for background task execution.
//!
//! The pool owns a set of named worker threads that pull boxed jobs from a
//! single FIFO queue guarded by one mutex and condition variable. Every
//! submission returns a [`TaskHandle`] that resolves to the task's result, or
//! to the panic the task raised.
//!
//! Side effects of submitted tasks are the caller's business: the pool adds no
//! serialization between tasks. Pushing events onto an
//! [`EventQueue`](crate::queue::EventQueue) from a task is fine since the queue
//! is itself thread-safe.
//!
//! # Example
//!
//! ```no_run
//! use haze_core::threadpool::{ThreadPool, ThreadPoolConfig};
//!
//! let pool = ThreadPool::new(ThreadPoolConfig::with_threads(4))?;
//!
//! let handle = pool.submit(|| 6 * 7)?;
//! assert_eq!(handle.wait()?, 42);
//!
//! // Once stopped, the pool rejects new work but drains what is queued.
//! pool.shutdown();
//! assert!(pool.submit(|| ()).is_err());
//! # Ok::<(), haze_core::ThreadPoolError>(())
//! ```
//!
//! # Shutdown
//!
//! [`ThreadPool::shutdown`] sets the stopped flag under the queue lock, wakes
//! every worker and joins them. Workers exit only once the pool is stopped
//! *and* the queue is empty, so tasks accepted before the stop still run.
//! Dropping the pool performs the same shutdown.

use std::any::Any;
use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError, bounded};
use parking_lot::{Condvar, Mutex};

use crate::error::{ThreadPoolError, ThreadPoolResult};

/// Counter for unique task IDs.
static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// A queued unit of work. Arguments are captured by the closure.
type Job = Box<dyn FnOnce() + Send + 'static>;

/// A unique identifier for a submitted task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

impl TaskId {
    /// Get the raw u64 value of this task ID.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Configuration for creating a thread pool.
#[derive(Debug, Clone)]
pub struct ThreadPoolConfig {
    /// Number of worker threads. `None` means one per available CPU.
    pub num_threads: Option<usize>,
    /// Name prefix for worker threads.
    pub thread_name: String,
    /// Stack size for worker threads in bytes.
    pub stack_size: Option<usize>,
}

impl Default for ThreadPoolConfig {
    fn default() -> Self {
        Self {
            num_threads: None,
            thread_name: "haze-worker".to_string(),
            stack_size: None,
        }
    }
}

impl ThreadPoolConfig {
    /// Create a new configuration with a fixed thread count.
    pub fn with_threads(num_threads: usize) -> Self {
        Self {
            num_threads: Some(num_threads),
            ..Default::default()
        }
    }

    /// Set the name prefix for worker threads.
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Set the stack size for worker threads.
    pub fn stack_size(mut self, size: usize) -> Self {
        self.stack_size = Some(size);
        self
    }
}

/// Queue state protected by the pool mutex.
struct PoolState {
    jobs: VecDeque<Job>,
    stopped: bool,
}

/// State shared between the pool handle and its workers.
struct Shared {
    state: Mutex<PoolState>,
    available: Condvar,
}

/// A fixed set of worker threads executing submitted tasks in FIFO order.
pub struct ThreadPool {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    worker_ids: Vec<ThreadId>,
    /// Set once the caller that took `workers` has joined them.
    joined: Mutex<bool>,
    joined_signal: Condvar,
    num_threads: usize,
}

static_assertions::assert_impl_all!(ThreadPool: Send, Sync);

impl ThreadPool {
    /// Create a new thread pool and start its workers.
    ///
    /// # Errors
    ///
    /// Returns [`ThreadPoolError::InvalidThreadCount`] for a zero thread count
    /// and [`ThreadPoolError::CreationFailed`] if a worker cannot be spawned.
    /// Workers that did start are stopped and joined before returning.
    pub fn new(config: ThreadPoolConfig) -> ThreadPoolResult<Self> {
        let num_threads = match config.num_threads {
            Some(0) => return Err(ThreadPoolError::InvalidThreadCount),
            Some(n) => n,
            None => thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
        };

        let shared = Arc::new(Shared {
            state: Mutex::new(PoolState {
                jobs: VecDeque::new(),
                stopped: false,
            }),
            available: Condvar::new(),
        });

        let mut workers = Vec::with_capacity(num_threads);
        for index in 0..num_threads {
            let mut builder =
                thread::Builder::new().name(format!("{}-{}", config.thread_name, index));
            if let Some(stack_size) = config.stack_size {
                builder = builder.stack_size(stack_size);
            }

            let worker_shared = shared.clone();
            match builder.spawn(move || worker_loop(&worker_shared)) {
                Ok(handle) => workers.push(handle),
                Err(err) => {
                    shared.state.lock().stopped = true;
                    shared.available.notify_all();
                    for handle in workers {
                        let _ = handle.join();
                    }
                    return Err(ThreadPoolError::CreationFailed(err.to_string()));
                }
            }
        }

        tracing::debug!(target: "haze_core::threadpool", num_threads, "thread pool started");

        let worker_ids = workers.iter().map(|handle| handle.thread().id()).collect();

        Ok(Self {
            shared,
            workers: Mutex::new(workers),
            worker_ids,
            joined: Mutex::new(false),
            joined_signal: Condvar::new(),
            num_threads,
        })
    }

    /// Create a pool with `num_threads` workers and default naming.
    pub fn with_threads(num_threads: usize) -> ThreadPoolResult<Self> {
        Self::new(ThreadPoolConfig::with_threads(num_threads))
    }

    /// Get the number of worker threads the pool was started with.
    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Get the number of tasks waiting for a worker.
    pub fn queued_tasks(&self) -> usize {
        self.shared.state.lock().jobs.len()
    }

    /// Check whether the pool has begun shutting down.
    pub fn is_stopped(&self) -> bool {
        self.shared.state.lock().stopped
    }

    /// Submit a task to the pool.
    ///
    /// The closure carries its own arguments. It is queued behind every task
    /// submitted before it and one idle worker is woken.
    ///
    /// # Errors
    ///
    /// Returns [`ThreadPoolError::Stopped`] once [`shutdown`](Self::shutdown)
    /// has been called.
    pub fn submit<F, T>(&self, task: F) -> ThreadPoolResult<TaskHandle<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let id = TaskId(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = bounded(1);

        let job: Job = Box::new(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(task))
                .map_err(|payload| ThreadPoolError::TaskPanicked(panic_message(payload.as_ref())));
            // The handle may already be gone; nobody is waiting then.
            let _ = sender.send(outcome);
        });

        {
            let mut state = self.shared.state.lock();
            if state.stopped {
                return Err(ThreadPoolError::Stopped);
            }
            state.jobs.push_back(job);
        }
        self.shared.available.notify_one();

        tracing::trace!(target: "haze_core::threadpool", task_id = id.0, "task submitted");
        Ok(TaskHandle { id, receiver })
    }

    /// Submit a task and block until it completes.
    ///
    /// Do not call this from inside a task running on the same pool: with every
    /// worker busy waiting, nothing is left to run the inner task.
    pub fn execute<F, T>(&self, task: F) -> ThreadPoolResult<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        self.submit(task)?.wait()
    }

    /// Stop accepting tasks and wait for the workers to drain the queue.
    ///
    /// Calling this more than once is harmless. Concurrent callers all block
    /// until the workers are joined. When called from one of the pool's own
    /// workers, that worker is left to finish on its own and the call returns
    /// without waiting.
    pub fn shutdown(&self) {
        self.shared.state.lock().stopped = true;
        self.shared.available.notify_all();

        let current = thread::current().id();
        let workers = std::mem::take(&mut *self.workers.lock());
        if workers.is_empty() {
            if self.worker_ids.contains(&current) {
                return;
            }
            // Another caller is joining; wait for it to finish.
            let mut joined = self.joined.lock();
            while !*joined {
                self.joined_signal.wait(&mut joined);
            }
            return;
        }

        for handle in workers {
            if handle.thread().id() == current {
                continue;
            }
            let _ = handle.join();
        }

        *self.joined.lock() = true;
        self.joined_signal.notify_all();

        tracing::debug!(target: "haze_core::threadpool", "thread pool stopped");
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPool")
            .field("num_threads", &self.num_threads)
            .field("queued_tasks", &self.queued_tasks())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

/// The loop every worker runs until the pool is stopped and drained.
fn worker_loop(shared: &Shared) {
    loop {
        let job = {
            let mut state = shared.state.lock();
            while !state.stopped && state.jobs.is_empty() {
                shared.available.wait(&mut state);
            }
            match state.jobs.pop_front() {
                Some(job) => job,
                // Stopped with nothing left to run.
                None => return,
            }
        };
        job();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// A handle to a submitted task, resolving to its result.
///
/// The pool has no timeouts of its own; [`wait_timeout`](Self::wait_timeout)
/// builds one on top of the handle.
#[derive(Debug)]
pub struct TaskHandle<T> {
    id: TaskId,
    receiver: Receiver<ThreadPoolResult<T>>,
}

impl<T> TaskHandle<T> {
    /// Get the unique task ID.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Check if the task's result is ready to be taken.
    pub fn is_finished(&self) -> bool {
        !self.receiver.is_empty()
    }

    /// Take the result without blocking.
    ///
    /// Returns `None` while the task is still queued or running. After the
    /// result has been taken once, later calls report
    /// [`ThreadPoolError::Disconnected`].
    pub fn try_get(&self) -> Option<ThreadPoolResult<T>> {
        match self.receiver.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(ThreadPoolError::Disconnected)),
        }
    }

    /// Block until the task completes and return its result.
    pub fn wait(self) -> ThreadPoolResult<T> {
        match self.receiver.recv() {
            Ok(outcome) => outcome,
            Err(_) => Err(ThreadPoolError::Disconnected),
        }
    }

    /// Block for at most `timeout`.
    ///
    /// Returns `None` if the task did not finish in time; the handle stays
    /// usable afterwards.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<ThreadPoolResult<T>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(outcome) => Some(outcome),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Err(ThreadPoolError::Disconnected)),
        }
    }
}
