//! Error types for the Haze core.

use thiserror::Error;

/// Errors reported by the [`ThreadPool`](crate::threadpool::ThreadPool) and its
/// [`TaskHandle`](crate::threadpool::TaskHandle)s.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ThreadPoolError {
    /// The pool has begun shutting down and no longer accepts tasks.
    #[error("thread pool has been stopped")]
    Stopped,

    /// A pool was configured with zero worker threads.
    #[error("thread pool needs at least one worker thread")]
    InvalidThreadCount,

    /// A worker thread could not be spawned.
    #[error("failed to create thread pool: {0}")]
    CreationFailed(String),

    /// The task panicked while running. Carries the panic message when it
    /// was a string payload.
    #[error("task panicked: {0}")]
    TaskPanicked(String),

    /// The task was dropped before it produced a result.
    #[error("task was dropped before completion")]
    Disconnected,
}

/// Result type for thread pool operations.
pub type ThreadPoolResult<T> = Result<T, ThreadPoolError>;
