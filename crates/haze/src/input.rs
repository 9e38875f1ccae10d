//! Input polling through the focused window.
//!
//! Events report input as it happens; these queries answer "is it down right
//! now" by asking the focused window's render context. With no focused window
//! every query reports nothing pressed.

use glam::Vec2;
use haze_core::{Key, MouseButton, MouseButtonAction};

use crate::application::Application;
use crate::window::Window;

impl Application {
    fn focused_for_input(&self, query: &'static str) -> Option<&Window> {
        let window = self.focused_window().and_then(|id| self.window(id));
        if window.is_none() {
            tracing::warn!(target: "haze::input", query, "input polled without a focused window");
        }
        window
    }

    /// `true` while `key` is pressed or auto-repeating in the focused window.
    pub fn is_key_pressed(&self, key: Key) -> bool {
        self.focused_for_input("is_key_pressed")
            .is_some_and(|window| window.key_state(key).is_down())
    }

    /// `true` while `button` is pressed in the focused window.
    pub fn is_mouse_button_pressed(&self, button: MouseButton) -> bool {
        self.focused_for_input("is_mouse_button_pressed")
            .is_some_and(|window| window.mouse_button_state(button) == MouseButtonAction::Press)
    }

    /// Cursor position in the focused window, or the origin.
    pub fn mouse_position(&self) -> Vec2 {
        self.focused_for_input("mouse_position")
            .map_or(Vec2::ZERO, |window| window.context().mouse_position())
    }
}
