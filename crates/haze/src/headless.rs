//! A backend without a display.
//!
//! [`HeadlessBackend`] creates in-memory contexts and renderers that record
//! what the engine does to them: binds, swaps, clears, resizes, vsync. Each
//! window gets a [`HeadlessSurface`] handle that tests (or tools) use to
//! inspect those records and to fire native notifications from any thread.
//!
//! ```
//! use haze::headless::HeadlessBackend;
//! use haze::{Application, WindowProps};
//!
//! let backend = HeadlessBackend::new();
//! let mut app = Application::new(backend.clone())?;
//! app.add_window(WindowProps::new("main"))?;
//!
//! backend.surface("main").unwrap().simulate_close();
//! while app.tick() {}
//!
//! assert_eq!(backend.destruction_log(), ["main"]);
//! # Ok::<(), haze::HazeError>(())
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use glam::Vec2;
use haze_core::{Key, KeyAction, ModifierKey, MouseButton, MouseButtonAction};
use parking_lot::Mutex;

use crate::backend::Backend;
use crate::context::{ContextCallbacks, RenderContext};
use crate::error::{HazeError, Result};
use crate::renderer::Renderer;
use crate::window::WindowProps;

#[derive(Debug, Default)]
struct SurfaceState {
    title: String,
    size: (u32, u32),
    vsync: bool,
    bound: bool,
    destroyed: bool,
    binds: usize,
    swaps: usize,
    clears: usize,
    resizes: Vec<(u32, u32)>,
    unbound_draws: usize,
    keys: HashMap<Key, KeyAction>,
    buttons: HashMap<MouseButton, MouseButtonAction>,
    cursor: Vec2,
    callbacks: ContextCallbacks,
}

/// Shared view of one headless window.
#[derive(Debug, Clone)]
pub struct HeadlessSurface {
    state: Arc<Mutex<SurfaceState>>,
}

impl HeadlessSurface {
    pub fn title(&self) -> String {
        self.state.lock().title.clone()
    }

    /// Size last reported through [`simulate_resize`](Self::simulate_resize).
    pub fn size(&self) -> (u32, u32) {
        self.state.lock().size
    }

    pub fn is_bound(&self) -> bool {
        self.state.lock().bound
    }

    pub fn is_vsync(&self) -> bool {
        self.state.lock().vsync
    }

    /// Whether the context has been dropped.
    pub fn is_destroyed(&self) -> bool {
        self.state.lock().destroyed
    }

    pub fn bind_count(&self) -> usize {
        self.state.lock().binds
    }

    pub fn swap_count(&self) -> usize {
        self.state.lock().swaps
    }

    pub fn clear_count(&self) -> usize {
        self.state.lock().clears
    }

    /// Every `Renderer::resize` call, in order.
    pub fn resizes(&self) -> Vec<(u32, u32)> {
        self.state.lock().resizes.clone()
    }

    /// Draw calls (clear, resize, swap) issued while the context was unbound.
    pub fn unbound_draws(&self) -> usize {
        self.state.lock().unbound_draws
    }

    pub fn simulate_close(&self) {
        let callback = self.state.lock().callbacks.window_closed.clone();
        callback();
    }

    pub fn simulate_resize(&self, width: u32, height: u32) {
        let callback = {
            let mut state = self.state.lock();
            state.size = (width, height);
            state.callbacks.window_resized.clone()
        };
        callback(width, height);
    }

    pub fn simulate_move(&self, x: i32, y: i32) {
        let callback = self.state.lock().callbacks.window_moved.clone();
        callback(x, y);
    }

    pub fn simulate_focus(&self, focused: bool) {
        let callback = self.state.lock().callbacks.window_focus_changed.clone();
        callback(focused);
    }

    /// Change a key's state and report it.
    pub fn simulate_key(&self, key: Key, action: KeyAction, modifiers: ModifierKey) {
        let callback = {
            let mut state = self.state.lock();
            state.keys.insert(key, action);
            state.callbacks.key_triggered.clone()
        };
        callback(key, 0, action, modifiers);
    }

    /// Change a mouse button's state and report it.
    pub fn simulate_click(&self, button: MouseButton, action: MouseButtonAction, modifiers: ModifierKey) {
        let callback = {
            let mut state = self.state.lock();
            state.buttons.insert(button, action);
            state.callbacks.mouse_clicked.clone()
        };
        callback(button, action, modifiers);
    }

    pub fn simulate_cursor(&self, x: f32, y: f32) {
        let callback = {
            let mut state = self.state.lock();
            state.cursor = Vec2::new(x, y);
            state.callbacks.mouse_moved.clone()
        };
        callback(x, y);
    }

    pub fn simulate_scroll(&self, x_offset: f32, y_offset: f32) {
        let callback = self.state.lock().callbacks.mouse_scrolled.clone();
        callback(x_offset, y_offset);
    }
}

/// A render context backed by a [`HeadlessSurface`].
#[derive(Debug)]
pub struct HeadlessContext {
    surface: HeadlessSurface,
    destruction_log: Arc<Mutex<Vec<String>>>,
}

impl RenderContext for HeadlessContext {
    fn bind(&mut self) {
        let mut state = self.surface.state.lock();
        state.bound = true;
        state.binds += 1;
    }

    fn unbind(&mut self) {
        self.surface.state.lock().bound = false;
    }

    fn swap_buffers(&mut self) {
        let mut state = self.surface.state.lock();
        state.swaps += 1;
        if !state.bound {
            state.unbound_draws += 1;
        }
    }

    fn set_vsync(&mut self, enabled: bool) {
        self.surface.state.lock().vsync = enabled;
    }

    fn is_vsync(&self) -> bool {
        self.surface.state.lock().vsync
    }

    fn key_state(&self, key: Key) -> KeyAction {
        self.surface
            .state
            .lock()
            .keys
            .get(&key)
            .copied()
            .unwrap_or_default()
    }

    fn mouse_button_state(&self, button: MouseButton) -> MouseButtonAction {
        self.surface
            .state
            .lock()
            .buttons
            .get(&button)
            .copied()
            .unwrap_or_default()
    }

    fn mouse_position(&self) -> Vec2 {
        self.surface.state.lock().cursor
    }

    fn set_callbacks(&mut self, callbacks: ContextCallbacks) {
        self.surface.state.lock().callbacks = callbacks;
    }
}

impl Drop for HeadlessContext {
    fn drop(&mut self) {
        let title = {
            let mut state = self.surface.state.lock();
            state.destroyed = true;
            // Release the engine's callbacks along with the context.
            state.callbacks = ContextCallbacks::default();
            state.title.clone()
        };
        tracing::trace!(target: "haze::window", %title, "headless context destroyed");
        self.destruction_log.lock().push(title);
    }
}

/// A renderer that counts what it is asked to do.
#[derive(Debug)]
pub struct HeadlessRenderer {
    surface: HeadlessSurface,
}

impl Renderer for HeadlessRenderer {
    fn clear(&mut self) {
        let mut state = self.surface.state.lock();
        state.clears += 1;
        if !state.bound {
            state.unbound_draws += 1;
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        let mut state = self.surface.state.lock();
        state.resizes.push((width, height));
        if !state.bound {
            state.unbound_draws += 1;
        }
    }
}

#[derive(Debug, Default)]
struct BackendShared {
    surfaces: Mutex<Vec<HeadlessSurface>>,
    /// Surface created by the last `create_context`, awaiting its renderer.
    pending: Mutex<Option<HeadlessSurface>>,
    destruction_log: Arc<Mutex<Vec<String>>>,
    fail_next_context: AtomicBool,
}

/// Backend producing [`HeadlessContext`]s and [`HeadlessRenderer`]s.
///
/// Clones share state, so keep one clone to inspect what the application did.
#[derive(Debug, Clone, Default)]
pub struct HeadlessBackend {
    shared: Arc<BackendShared>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently created live surface titled `title`.
    pub fn surface(&self, title: &str) -> Option<HeadlessSurface> {
        self.shared
            .surfaces
            .lock()
            .iter()
            .rev()
            .find(|surface| {
                let state = surface.state.lock();
                state.title == title && !state.destroyed
            })
            .cloned()
    }

    /// Every surface ever created, oldest first.
    pub fn surfaces(&self) -> Vec<HeadlessSurface> {
        self.shared.surfaces.lock().clone()
    }

    /// Titles of destroyed contexts in destruction order.
    pub fn destruction_log(&self) -> Vec<String> {
        self.shared.destruction_log.lock().clone()
    }

    /// Make the next `create_context` call fail.
    pub fn fail_next_context(&self) {
        self.shared.fail_next_context.store(true, Ordering::SeqCst);
    }
}

impl Backend for HeadlessBackend {
    fn create_context(&self, props: &WindowProps) -> Result<Box<dyn RenderContext>> {
        if self.shared.fail_next_context.swap(false, Ordering::SeqCst) {
            return Err(HazeError::backend(format!(
                "headless context for '{}' refused",
                props.title
            )));
        }

        let surface = HeadlessSurface {
            state: Arc::new(Mutex::new(SurfaceState {
                title: props.title.clone(),
                size: (props.width, props.height),
                vsync: props.vsync,
                ..Default::default()
            })),
        };
        self.shared.surfaces.lock().push(surface.clone());
        *self.shared.pending.lock() = Some(surface.clone());

        Ok(Box::new(HeadlessContext {
            surface,
            destruction_log: self.shared.destruction_log.clone(),
        }))
    }

    fn create_renderer(&self, _context: &mut dyn RenderContext) -> Result<Box<dyn Renderer>> {
        let surface = self
            .shared
            .pending
            .lock()
            .take()
            .ok_or_else(|| HazeError::backend("no headless context awaiting a renderer"))?;
        Ok(Box::new(HeadlessRenderer { surface }))
    }
}
