//! Core systems for Haze.
//!
//! This crate provides the concurrency core the Haze engine layer is built on:
//!
//! - **Thread Pool**: fixed worker threads with waitable task handles
//! - **Event Queue**: thread-safe FIFO feeding the application's dispatch loop
//! - **Event Taxonomy**: event kinds, tags, categories and dispatch helpers
//! - **Input**: backend-neutral keys, mouse buttons and modifiers
//! - **Logging**: tracing targets and subscriber setup
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use haze_core::{EventKind, EventQueue, ThreadPool};
//!
//! let queue = Arc::new(EventQueue::new());
//! let pool = ThreadPool::with_threads(2)?;
//!
//! let producer = queue.clone();
//! pool.submit(move || {
//!     producer.emplace(EventKind::AppTick, None);
//! })?
//! .wait()?;
//!
//! let event = queue.poll().unwrap();
//! assert_eq!(*event.kind(), EventKind::AppTick);
//! # Ok::<(), haze_core::ThreadPoolError>(())
//! ```

mod error;
pub mod event;
pub mod input;
pub mod logging;
pub mod queue;
pub mod threadpool;

pub use error::{ThreadPoolError, ThreadPoolResult};
pub use event::{
    Event, EventCategory, EventDispatcher, EventHandlers, EventKind, EventType, WindowId,
};
pub use input::{Key, KeyAction, ModifierKey, MouseButton, MouseButtonAction};
pub use logging::PerfSpan;
pub use queue::EventQueue;
pub use threadpool::{TaskHandle, TaskId, ThreadPool, ThreadPoolConfig};
