//! The application context and its dispatch loop.
//!
//! [`Application`] owns everything process-wide: the window registry, the
//! event queue, the thread pool, the backend, the focused window and the
//! shutdown hooks. It is an ordinary value; nothing in Haze is a global, so
//! independent applications (and tests) never share state.
//!
//! # Main loop
//!
//! Every [`tick`](Application::tick) drains the event queue, routing each
//! event to its window and then applying global bookkeeping (focus, close
//! cascade), and only then updates every window. [`run`](Application::run)
//! ticks until the last window is gone or [`stop`](Application::stop) is
//! called.
//!
//! ```
//! use haze::headless::HeadlessBackend;
//! use haze::{Application, WindowProps};
//!
//! let mut app = Application::new(HeadlessBackend::new())?;
//! let main = app.add_window(WindowProps::new("main").with_size(800, 600))?;
//!
//! app.tick();
//! assert_eq!(app.focused_window(), Some(main));
//!
//! app.close_window(main)?;
//! app.run();
//! assert_eq!(app.window_count(), 0);
//! # Ok::<(), haze::HazeError>(())
//! ```

use std::fmt;
use std::sync::Arc;

use haze_core::{
    Event, EventKind, EventQueue, EventType, TaskHandle, ThreadPool, ThreadPoolConfig, WindowId,
};

use crate::backend::Backend;
use crate::context::ContextBinding;
use crate::error::{HazeError, Result};
use crate::registry::WindowRegistry;
use crate::window::{Window, WindowProps};

/// Configuration for an [`Application`].
#[derive(Debug, Clone, Default)]
pub struct ApplicationConfig {
    /// Configuration of the background thread pool.
    pub thread_pool: ThreadPoolConfig,
}

impl ApplicationConfig {
    /// Use a fixed number of worker threads.
    pub fn with_threads(num_threads: usize) -> Self {
        Self {
            thread_pool: ThreadPoolConfig::with_threads(num_threads),
        }
    }
}

/// Lifecycle of an [`Application`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    /// Constructed, no window added yet.
    Uninitialized,
    /// At least one window has been added and the loop may run.
    Running,
    /// The loop has ended. Terminal.
    Stopped,
}

/// The process context: windows, event queue, thread pool and backend.
pub struct Application {
    backend: Box<dyn Backend>,
    queue: Arc<EventQueue>,
    pool: ThreadPool,
    windows: WindowRegistry,
    focused: Option<WindowId>,
    state: AppState,
    shutdown_hooks: Vec<Box<dyn FnOnce()>>,
    shut_down: bool,
}

impl Application {
    /// Create an application with the default configuration.
    ///
    /// # Errors
    ///
    /// Fails if the thread pool cannot be started.
    pub fn new(backend: impl Backend + 'static) -> Result<Self> {
        Self::with_config(ApplicationConfig::default(), backend)
    }

    /// Create an application with a custom configuration.
    pub fn with_config(config: ApplicationConfig, backend: impl Backend + 'static) -> Result<Self> {
        let pool = ThreadPool::new(config.thread_pool)?;

        tracing::debug!(
            target: "haze::app",
            threads = pool.num_threads(),
            "application created"
        );

        Ok(Self {
            backend: Box::new(backend),
            queue: Arc::new(EventQueue::new()),
            pool,
            windows: WindowRegistry::new(),
            focused: None,
            state: AppState::Uninitialized,
            shutdown_hooks: Vec::new(),
            shut_down: false,
        })
    }

    /// Create an application or terminate the process.
    ///
    /// Initialization failures are fatal here: the error is logged and the
    /// process exits with status 1.
    pub fn new_or_exit(backend: impl Backend + 'static) -> Self {
        match Self::new(backend) {
            Ok(app) => app,
            Err(err) => {
                tracing::error!(target: "haze::app", error = %err, "failed to initialize application");
                std::process::exit(1);
            }
        }
    }

    /// Open a window.
    ///
    /// The window's context and renderer come from the backend, its native
    /// notifications are routed onto the event queue, and a `WindowFocus`
    /// event is queued for it. The first window starts the application.
    ///
    /// # Errors
    ///
    /// [`HazeError::WindowNotFound`] if `props.parent` is stale, or whatever
    /// the backend reports.
    pub fn add_window(&mut self, mut props: WindowProps) -> Result<WindowId> {
        // The registry owns the link from here on.
        let parent = props.parent.take();
        if let Some(parent) = parent {
            if !self.windows.contains(parent) {
                return Err(HazeError::WindowNotFound(parent));
            }
        }

        let mut context = self.backend.create_context(&props)?;
        let renderer = {
            let mut binding = ContextBinding::new(context.as_mut());
            self.backend.create_renderer(&mut *binding)?
        };

        let id = self
            .windows
            .insert(parent, |id| Window::new(id, props, context, renderer))?;

        if let Some(window) = self.windows.get_mut(id) {
            window.register_event_callbacks(self.queue.clone());
            tracing::debug!(target: "haze::window", ?id, title = window.title(), ?parent, "window created");
        }
        self.queue.emplace(EventKind::WindowFocus, id);

        if self.state == AppState::Uninitialized {
            self.state = AppState::Running;
        }

        Ok(id)
    }

    /// Tick until the application stops.
    ///
    /// Returns immediately, with a warning, if no window was ever added.
    #[tracing::instrument(skip(self), target = "haze::app", level = "debug")]
    pub fn run(&mut self) {
        if self.state != AppState::Running {
            tracing::warn!(target: "haze::app", state = ?self.state, "run called on an application that is not running");
            return;
        }

        tracing::info!(target: "haze::app", windows = self.windows.len(), "main loop started");
        while self.tick() {}
        tracing::info!(target: "haze::app", "main loop exited");
    }

    /// Run one main-loop iteration.
    ///
    /// Stops the application once no window is left. Returns whether the loop
    /// should continue.
    pub fn tick(&mut self) -> bool {
        if self.state != AppState::Running {
            return false;
        }
        if self.windows.is_empty() {
            tracing::debug!(target: "haze::app", "last window closed");
            self.state = AppState::Stopped;
            return false;
        }

        self.dispatch_events();

        for (_, window) in self.windows.iter_mut() {
            window.update();
        }
        true
    }

    /// Drain the event queue, including events queued while draining.
    ///
    /// Returns the number of events processed.
    pub fn dispatch_events(&mut self) -> usize {
        let mut processed = 0;
        while let Some(event) = self.queue.poll() {
            self.dispatch(&event);
            processed += 1;
        }
        processed
    }

    fn dispatch(&mut self, event: &Event) {
        tracing::trace!(target: "haze::dispatch", %event, "dispatching event");

        let Some(id) = event.window() else {
            return;
        };

        match self.windows.get_mut(id) {
            Some(window) => window.on_event(event),
            None => {
                tracing::trace!(target: "haze::dispatch", ?id, "event for a destroyed window skipped");
            }
        }

        match event.event_type() {
            EventType::WindowClose => self.on_window_close(id),
            EventType::WindowFocus => {
                if self.windows.contains(id) {
                    self.focused = Some(id);
                }
            }
            EventType::WindowLostFocus => {
                if self.focused == Some(id) {
                    self.focused = None;
                }
            }
            _ => {}
        }
    }

    /// Close a window, children first.
    ///
    /// A leaf is destroyed right away. A window with children instead queues a
    /// close for its whole subtree in reverse breadth-first order, so every
    /// descendant is destroyed before its ancestors.
    fn on_window_close(&mut self, id: WindowId) {
        if !self.windows.contains(id) {
            tracing::trace!(target: "haze::dispatch", ?id, "close for a destroyed window ignored");
            return;
        }

        if self.windows.has_children(id) {
            let subtree = self.windows.collect_subtree(id);
            tracing::debug!(target: "haze::dispatch", ?id, windows = subtree.len(), "closing window tree");
            for window in subtree.into_iter().rev() {
                self.queue.emplace(EventKind::WindowClose, window);
            }
            return;
        }

        if self.focused == Some(id) {
            self.focused = None;
        }
        if let Some(window) = self.windows.remove(id) {
            tracing::debug!(target: "haze::window", ?id, title = window.title(), "window closed");
        }
    }

    /// Queue a close request for a window.
    pub fn close_window(&self, id: WindowId) -> Result<()> {
        if !self.windows.contains(id) {
            return Err(HazeError::WindowNotFound(id));
        }
        self.queue.emplace(EventKind::WindowClose, id);
        Ok(())
    }

    /// End the main loop after the current tick.
    pub fn stop(&mut self) {
        if self.state != AppState::Stopped {
            tracing::debug!(target: "haze::app", "stop requested");
        }
        self.state = AppState::Stopped;
    }

    /// Register work to run at shutdown.
    ///
    /// Hooks run in reverse registration order.
    pub fn add_shutdown_hook(&mut self, hook: impl FnOnce() + 'static) {
        self.shutdown_hooks.push(Box::new(hook));
    }

    /// Tear the application down.
    ///
    /// Stops the loop, runs the shutdown hooks newest first, destroys every
    /// window (children before parents), discards pending events and drains
    /// the thread pool. Later calls do nothing; dropping the application
    /// calls this too.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.state = AppState::Stopped;

        let hooks = self.shutdown_hooks.len();
        while let Some(hook) = self.shutdown_hooks.pop() {
            hook();
        }

        self.windows.clear();
        self.focused = None;
        self.queue.clear();
        self.pool.shutdown();

        tracing::info!(target: "haze::app", hooks, "application shut down");
    }

    /// Run a closure on the thread pool.
    pub fn spawn<F, T>(&self, task: F) -> Result<TaskHandle<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        Ok(self.pool.submit(task)?)
    }

    /// Look up a live window.
    pub fn window(&self, id: WindowId) -> Option<&Window> {
        self.windows.get(id)
    }

    /// Look up a live window mutably.
    pub fn window_mut(&mut self, id: WindowId) -> Option<&mut Window> {
        self.windows.get_mut(id)
    }

    /// First window with the given title.
    pub fn find_window(&self, title: &str) -> Option<WindowId> {
        self.windows.find_by_title(title)
    }

    /// IDs of every live window.
    pub fn window_ids(&self) -> Vec<WindowId> {
        self.windows.ids()
    }

    /// Run `f` on every live window.
    pub fn for_each_window(&mut self, mut f: impl FnMut(WindowId, &mut Window)) {
        for (id, window) in self.windows.iter_mut() {
            f(id, window);
        }
    }

    /// Number of live windows.
    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    /// The registry holding every window and its parent/child links.
    pub fn windows(&self) -> &WindowRegistry {
        &self.windows
    }

    /// Window that last gained focus, if it still has it.
    pub fn focused_window(&self) -> Option<WindowId> {
        self.focused
    }

    /// Current lifecycle state.
    pub fn state(&self) -> AppState {
        self.state
    }

    /// Check whether the application is in [`AppState::Running`].
    pub fn is_running(&self) -> bool {
        self.state == AppState::Running
    }

    /// The pool backing [`spawn`](Self::spawn).
    pub fn thread_pool(&self) -> &ThreadPool {
        &self.pool
    }

    /// The queue producers push onto. Clone the `Arc` to share it.
    pub fn event_queue(&self) -> &Arc<EventQueue> {
        &self.queue
    }

    /// Re-parent a window; `None` makes it a root.
    pub fn set_parent(&mut self, id: WindowId, parent: Option<WindowId>) -> Result<()> {
        self.windows.set_parent(id, parent)
    }

    /// Parent of a window, `None` for roots.
    pub fn parent(&self, id: WindowId) -> Result<Option<WindowId>> {
        self.windows.parent(id)
    }

    /// Direct children of a window.
    pub fn children(&self, id: WindowId) -> Result<&[WindowId]> {
        self.windows.children(id)
    }
}

impl Drop for Application {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("state", &self.state)
            .field("windows", &self.windows)
            .field("focused", &self.focused)
            .field("pending_events", &self.queue.len())
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}
