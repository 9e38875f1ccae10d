//! Render contexts and the notifications they deliver.
//!
//! A [`RenderContext`] is the backend's per-window drawing surface plus its
//! native event source. The engine installs a [`ContextCallbacks`] set on every
//! context; backends invoke those callbacks, from any thread, when the native
//! window reports something, and the engine turns each call into an event on
//! the application's queue.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use glam::Vec2;
use haze_core::{Key, KeyAction, ModifierKey, MouseButton, MouseButtonAction};

/// Capabilities the engine needs from a backend's per-window context.
pub trait RenderContext {
    /// Make this context current on the calling thread.
    fn bind(&mut self);

    /// Release this context from the calling thread.
    fn unbind(&mut self);

    /// Present the back buffer.
    fn swap_buffers(&mut self);

    fn set_vsync(&mut self, enabled: bool);

    fn is_vsync(&self) -> bool;

    /// Current state of a keyboard key.
    fn key_state(&self, key: Key) -> KeyAction;

    /// Current state of a mouse button.
    fn mouse_button_state(&self, button: MouseButton) -> MouseButtonAction;

    /// Cursor position in window coordinates.
    fn mouse_position(&self) -> Vec2;

    /// Replace the notification callbacks.
    fn set_callbacks(&mut self, callbacks: ContextCallbacks);
}

pub type CloseCallback = Arc<dyn Fn() + Send + Sync>;
pub type ResizeCallback = Arc<dyn Fn(u32, u32) + Send + Sync>;
pub type MoveCallback = Arc<dyn Fn(i32, i32) + Send + Sync>;
pub type FocusCallback = Arc<dyn Fn(bool) + Send + Sync>;
/// Receives the key, its platform scancode, the action and held modifiers.
pub type KeyCallback = Arc<dyn Fn(Key, i32, KeyAction, ModifierKey) + Send + Sync>;
pub type CursorCallback = Arc<dyn Fn(f32, f32) + Send + Sync>;
pub type ClickCallback = Arc<dyn Fn(MouseButton, MouseButtonAction, ModifierKey) + Send + Sync>;
pub type ScrollCallback = Arc<dyn Fn(f32, f32) + Send + Sync>;

/// Notification hooks a context fires when its native window reports events.
///
/// Every callback defaults to a no-op.
#[derive(Clone)]
pub struct ContextCallbacks {
    pub window_closed: CloseCallback,
    pub window_resized: ResizeCallback,
    pub window_moved: MoveCallback,
    /// Called with `true` when focus is gained and `false` when lost.
    pub window_focus_changed: FocusCallback,
    pub key_triggered: KeyCallback,
    pub mouse_moved: CursorCallback,
    pub mouse_clicked: ClickCallback,
    pub mouse_scrolled: ScrollCallback,
}

impl Default for ContextCallbacks {
    fn default() -> Self {
        Self {
            window_closed: Arc::new(|| {}),
            window_resized: Arc::new(|_, _| {}),
            window_moved: Arc::new(|_, _| {}),
            window_focus_changed: Arc::new(|_| {}),
            key_triggered: Arc::new(|_, _, _, _| {}),
            mouse_moved: Arc::new(|_, _| {}),
            mouse_clicked: Arc::new(|_, _, _| {}),
            mouse_scrolled: Arc::new(|_, _| {}),
        }
    }
}

impl fmt::Debug for ContextCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextCallbacks").finish_non_exhaustive()
    }
}

/// A scoped binding of a render context.
///
/// Binds on creation and unbinds when dropped, including during unwinding.
pub struct ContextBinding<'a> {
    context: &'a mut dyn RenderContext,
}

impl<'a> ContextBinding<'a> {
    pub fn new(context: &'a mut dyn RenderContext) -> Self {
        context.bind();
        Self { context }
    }
}

impl<'a> Deref for ContextBinding<'a> {
    type Target = dyn RenderContext + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.context
    }
}

impl<'a> DerefMut for ContextBinding<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.context
    }
}

impl Drop for ContextBinding<'_> {
    fn drop(&mut self) {
        self.context.unbind();
    }
}
