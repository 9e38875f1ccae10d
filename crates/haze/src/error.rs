//! Error types for the Haze engine layer.

use haze_core::{ThreadPoolError, WindowId};
use thiserror::Error;

/// Errors reported by the application context and window registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HazeError {
    /// The window handle is stale or was never issued by this registry.
    #[error("window {0:?} does not exist or has been destroyed")]
    WindowNotFound(WindowId),

    /// Attempted to make a window its own parent or ancestor.
    #[error("cannot set a window as its own parent or ancestor")]
    CircularParentage,

    /// The graphics backend failed to create a context or renderer.
    #[error("backend error: {0}")]
    Backend(String),

    #[error(transparent)]
    ThreadPool(#[from] ThreadPoolError),
}

impl HazeError {
    /// Create a backend error from any message.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, HazeError>;
