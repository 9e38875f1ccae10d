//! Haze: a thin engine layer over a pluggable graphics backend.
//!
//! Haze manages windows, their layers and the event flow between native
//! window notifications and application code. Rendering goes through the
//! [`RenderContext`], [`Renderer`] and [`Backend`] traits, so the engine runs
//! on any backend, including the bundled [`headless`] one.
//!
//! - **Application**: the process context owning windows, queue and pool
//! - **Windows**: per-window context, renderer, layers and frame update
//! - **Layers**: ordered per-window behavior with overlays on top
//! - **Input**: polling through the focused window
//!
//! The concurrency core (event queue, thread pool, event taxonomy) lives in
//! [`haze_core`] and is re-exported here.
//!
//! # Example
//!
//! ```
//! use haze::headless::HeadlessBackend;
//! use haze::{Application, Event, EventType, FrameContext, Layer, WindowProps};
//!
//! struct ResizeLogger;
//!
//! impl Layer for ResizeLogger {
//!     fn name(&self) -> &str {
//!         "resize-logger"
//!     }
//!
//!     fn on_event(&mut self, event: &Event) {
//!         if event.event_type() == EventType::WindowResize {
//!             println!("resized: {event}");
//!         }
//!     }
//!
//!     fn update(&mut self, frame: &mut FrameContext<'_>) {
//!         frame.renderer.clear();
//!     }
//! }
//!
//! let backend = HeadlessBackend::new();
//! let mut app = Application::new(backend.clone())?;
//!
//! let main = app.add_window(WindowProps::new("main"))?;
//! app.window_mut(main).unwrap().layers_mut().push_layer(ResizeLogger);
//!
//! let surface = backend.surface("main").unwrap();
//! surface.simulate_resize(640, 480);
//! app.tick();
//! assert_eq!(surface.resizes(), [(640, 480)]);
//!
//! surface.simulate_close();
//! app.run();
//! # Ok::<(), haze::HazeError>(())
//! ```

mod application;
pub mod backend;
pub mod context;
mod error;
pub mod headless;
mod input;
pub mod layer;
pub mod registry;
pub mod renderer;
pub mod window;

pub use application::{AppState, Application, ApplicationConfig};
pub use backend::Backend;
pub use context::{ContextBinding, ContextCallbacks, RenderContext};
pub use error::{HazeError, Result};
pub use layer::{FrameContext, Layer, LayerId, LayerStack};
pub use registry::WindowRegistry;
pub use renderer::Renderer;
pub use window::{Window, WindowProps};

pub use haze_core::{
    Event, EventCategory, EventDispatcher, EventHandlers, EventKind, EventQueue, EventType, Key,
    KeyAction, ModifierKey, MouseButton, MouseButtonAction, TaskHandle, ThreadPool,
    ThreadPoolConfig, ThreadPoolError, WindowId, logging,
};
