//! Event taxonomy and dispatch helpers.
//!
//! Every event is an [`Event`]: a closed [`EventKind`] payload, the
//! [`WindowId`] of the window it concerns (if any) and a handled flag. Each
//! kind maps to one fine-grained [`EventType`] tag and a coarse
//! [`EventCategory`] bitmask used for filtering.
//!
//! Events travel between threads as `Arc<Event>`, so the handled flag is
//! atomic and only ever goes from `false` to `true`.
//!
//! # Dispatching
//!
//! ```
//! use haze_core::event::{Event, EventDispatcher, EventKind, EventType};
//!
//! let event = Event::app(EventKind::WindowResize { width: 800, height: 600 });
//!
//! let mut dispatcher = EventDispatcher::new(&event);
//! let handled = dispatcher.dispatch(EventType::WindowResize, |event| {
//!     event.kind().aspect_ratio().is_some()
//! });
//!
//! assert!(handled);
//! assert!(event.is_handled());
//! ```

use std::collections::HashMap;
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::input::{Key, ModifierKey, MouseButton};

slotmap::new_key_type! {
    /// A generational handle to a window.
    ///
    /// Handles stay valid to copy around after the window is destroyed;
    /// lookups with a stale handle simply fail.
    pub struct WindowId;
}

/// Fine-grained event tag, one per [`EventKind`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    WindowClose,
    WindowResize,
    WindowFocus,
    WindowLostFocus,
    WindowMoved,
    AppTick,
    AppUpdate,
    AppRender,
    KeyPressed,
    KeyReleased,
    MouseButtonPressed,
    MouseButtonReleased,
    MouseMoved,
    MouseScrolled,
}

impl EventType {
    /// The tag's name as used in log output.
    pub fn name(self) -> &'static str {
        match self {
            EventType::WindowClose => "WindowClose",
            EventType::WindowResize => "WindowResize",
            EventType::WindowFocus => "WindowFocus",
            EventType::WindowLostFocus => "WindowLostFocus",
            EventType::WindowMoved => "WindowMoved",
            EventType::AppTick => "AppTick",
            EventType::AppUpdate => "AppUpdate",
            EventType::AppRender => "AppRender",
            EventType::KeyPressed => "KeyPressed",
            EventType::KeyReleased => "KeyReleased",
            EventType::MouseButtonPressed => "MouseButtonPressed",
            EventType::MouseButtonReleased => "MouseButtonReleased",
            EventType::MouseMoved => "MouseMoved",
            EventType::MouseScrolled => "MouseScrolled",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Coarse event categories. Flags combine with `|`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EventCategory(u8);

impl EventCategory {
    /// No category.
    pub const NONE: Self = Self(0);
    /// Window and application lifecycle events.
    pub const APPLICATION: Self = Self(1 << 0);
    /// Any user input.
    pub const INPUT: Self = Self(1 << 1);
    /// Keyboard input.
    pub const KEYBOARD: Self = Self(1 << 2);
    /// Mouse input.
    pub const MOUSE: Self = Self(1 << 3);
    /// Mouse button input.
    pub const MOUSE_BUTTON: Self = Self(1 << 4);

    /// Get the raw bits.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Check whether every flag in `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Check whether any flag in `other` is set.
    pub const fn intersects(self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }
}

impl BitOr for EventCategory {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for EventCategory {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for EventCategory {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

/// The payload of an event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EventKind {
    /// The window was asked to close.
    WindowClose,
    /// The window's framebuffer changed size.
    WindowResize { width: u32, height: u32 },
    /// The window gained input focus.
    WindowFocus,
    /// The window lost input focus.
    WindowLostFocus,
    /// The window moved on screen.
    WindowMoved { x: i32, y: i32 },
    AppTick,
    AppUpdate,
    AppRender,
    /// A key went down, or auto-repeated when `repeat_count > 0`.
    KeyPressed {
        key: Key,
        repeat_count: u32,
        modifiers: ModifierKey,
    },
    KeyReleased { key: Key, modifiers: ModifierKey },
    MouseButtonPressed {
        button: MouseButton,
        modifiers: ModifierKey,
    },
    MouseButtonReleased {
        button: MouseButton,
        modifiers: ModifierKey,
    },
    /// The cursor moved, in window coordinates.
    MouseMoved { x: f32, y: f32 },
    MouseScrolled { x_offset: f32, y_offset: f32 },
}

impl EventKind {
    /// Get the tag of this kind.
    pub fn event_type(&self) -> EventType {
        match self {
            EventKind::WindowClose => EventType::WindowClose,
            EventKind::WindowResize { .. } => EventType::WindowResize,
            EventKind::WindowFocus => EventType::WindowFocus,
            EventKind::WindowLostFocus => EventType::WindowLostFocus,
            EventKind::WindowMoved { .. } => EventType::WindowMoved,
            EventKind::AppTick => EventType::AppTick,
            EventKind::AppUpdate => EventType::AppUpdate,
            EventKind::AppRender => EventType::AppRender,
            EventKind::KeyPressed { .. } => EventType::KeyPressed,
            EventKind::KeyReleased { .. } => EventType::KeyReleased,
            EventKind::MouseButtonPressed { .. } => EventType::MouseButtonPressed,
            EventKind::MouseButtonReleased { .. } => EventType::MouseButtonReleased,
            EventKind::MouseMoved { .. } => EventType::MouseMoved,
            EventKind::MouseScrolled { .. } => EventType::MouseScrolled,
        }
    }

    /// Get the categories this kind belongs to.
    pub fn category(&self) -> EventCategory {
        match self {
            EventKind::WindowClose
            | EventKind::WindowResize { .. }
            | EventKind::WindowFocus
            | EventKind::WindowLostFocus
            | EventKind::WindowMoved { .. }
            | EventKind::AppTick
            | EventKind::AppUpdate
            | EventKind::AppRender => EventCategory::APPLICATION,
            EventKind::KeyPressed { .. } | EventKind::KeyReleased { .. } => {
                EventCategory::KEYBOARD | EventCategory::INPUT
            }
            EventKind::MouseButtonPressed { .. } | EventKind::MouseButtonReleased { .. } => {
                EventCategory::MOUSE | EventCategory::MOUSE_BUTTON | EventCategory::INPUT
            }
            EventKind::MouseMoved { .. } | EventKind::MouseScrolled { .. } => {
                EventCategory::MOUSE | EventCategory::INPUT
            }
        }
    }

    /// Width over height for a resize, `None` for other kinds or a zero height.
    pub fn aspect_ratio(&self) -> Option<f32> {
        match *self {
            EventKind::WindowResize { width, height } if height > 0 => {
                Some(width as f32 / height as f32)
            }
            _ => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.event_type().name())?;
        match *self {
            EventKind::WindowResize { width, height } => write!(f, ": {width}x{height}"),
            EventKind::WindowMoved { x, y } => write!(f, ": ({x}, {y})"),
            EventKind::KeyPressed {
                key,
                repeat_count,
                modifiers,
            } => write!(f, ": {key} (repeat {repeat_count}, mods {modifiers})"),
            EventKind::KeyReleased { key, modifiers } => write!(f, ": {key} (mods {modifiers})"),
            EventKind::MouseButtonPressed { button, modifiers }
            | EventKind::MouseButtonReleased { button, modifiers } => {
                write!(f, ": {button} (mods {modifiers})")
            }
            EventKind::MouseMoved { x, y } => write!(f, ": ({x}, {y})"),
            EventKind::MouseScrolled { x_offset, y_offset } => {
                write!(f, ": ({x_offset}, {y_offset})")
            }
            EventKind::WindowClose
            | EventKind::WindowFocus
            | EventKind::WindowLostFocus
            | EventKind::AppTick
            | EventKind::AppUpdate
            | EventKind::AppRender => Ok(()),
        }
    }
}

/// An event addressed to a window (or to nobody in particular).
#[derive(Debug)]
pub struct Event {
    window: Option<WindowId>,
    kind: EventKind,
    handled: AtomicBool,
}

static_assertions::assert_impl_all!(Event: Send, Sync);

impl Event {
    /// Create an unhandled event.
    ///
    /// `window` accepts either a `WindowId` or `None`.
    pub fn new(kind: EventKind, window: impl Into<Option<WindowId>>) -> Self {
        Self {
            window: window.into(),
            kind,
            handled: AtomicBool::new(false),
        }
    }

    /// Create an event that concerns no window.
    pub fn app(kind: EventKind) -> Self {
        Self::new(kind, None)
    }

    /// The window this event concerns, if any.
    pub fn window(&self) -> Option<WindowId> {
        self.window
    }

    /// The event payload.
    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    /// The event tag.
    pub fn event_type(&self) -> EventType {
        self.kind.event_type()
    }

    /// The event categories.
    pub fn category(&self) -> EventCategory {
        self.kind.category()
    }

    /// Check whether the event belongs to any of the given categories.
    pub fn is_in_category(&self, category: EventCategory) -> bool {
        self.category().intersects(category)
    }

    /// Check whether a handler has consumed this event.
    pub fn is_handled(&self) -> bool {
        self.handled.load(Ordering::Acquire)
    }

    /// Mark the event consumed. There is no way back.
    pub fn mark_handled(&self) {
        self.handled.store(true, Ordering::Release);
    }

    /// Mark the event handled unless it has tag `ty`.
    pub fn filter_type(&self, ty: EventType) {
        if self.event_type() != ty {
            self.mark_handled();
        }
    }

    /// Mark the event handled unless it belongs to one of `category`.
    pub fn filter_category(&self, category: EventCategory) {
        if !self.is_in_category(category) {
            self.mark_handled();
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(window) = self.window {
            write!(f, " [window {window:?}]")?;
        }
        Ok(())
    }
}

/// Routes one event to a handler if the tag matches.
pub struct EventDispatcher<'a> {
    event: &'a Event,
}

impl<'a> EventDispatcher<'a> {
    pub fn new(event: &'a Event) -> Self {
        Self { event }
    }

    /// Run `handler` if the event has tag `ty`.
    ///
    /// Returns `true` without running the handler for an event that is already
    /// handled. Otherwise returns `true` (and marks the event handled) only
    /// when the tag matches and the handler returns `true`.
    pub fn dispatch<F>(&mut self, ty: EventType, handler: F) -> bool
    where
        F: FnOnce(&Event) -> bool,
    {
        if self.event.is_handled() {
            return true;
        }
        if self.event.event_type() == ty && handler(self.event) {
            self.event.mark_handled();
            return true;
        }
        false
    }
}

type Handler = Box<dyn FnMut(&Event) -> bool + Send>;

/// A table of handlers keyed by event tag.
///
/// Handlers for one tag run in registration order until one of them returns
/// `true`, which marks the event handled and stops the walk.
#[derive(Default)]
pub struct EventHandlers {
    handlers: HashMap<EventType, Vec<Handler>>,
}

impl EventHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for events tagged `ty`.
    pub fn register<F>(&mut self, ty: EventType, handler: F)
    where
        F: FnMut(&Event) -> bool + Send + 'static,
    {
        self.handlers.entry(ty).or_default().push(Box::new(handler));
    }

    /// Offer `event` to the handlers registered for its tag.
    ///
    /// Returns whether the event is handled afterwards.
    pub fn handle(&mut self, event: &Event) -> bool {
        if event.is_handled() {
            return true;
        }
        let Some(handlers) = self.handlers.get_mut(&event.event_type()) else {
            return false;
        };
        for handler in handlers.iter_mut() {
            if handler(event) {
                event.mark_handled();
                return true;
            }
        }
        false
    }

    /// Number of handlers registered for `ty`.
    pub fn count(&self, ty: EventType) -> usize {
        self.handlers.get(&ty).map_or(0, Vec::len)
    }

    /// Remove every handler for `ty`.
    pub fn clear(&mut self, ty: EventType) {
        self.handlers.remove(&ty);
    }
}

impl fmt::Debug for EventHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.handlers.iter().map(|(ty, list)| (ty, list.len())))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    fn key_pressed() -> Event {
        Event::app(EventKind::KeyPressed {
            key: Key::A,
            repeat_count: 0,
            modifiers: ModifierKey::NONE,
        })
    }

    #[test]
    fn test_categories() {
        let key = key_pressed();
        assert!(key.is_in_category(EventCategory::KEYBOARD));
        assert!(key.is_in_category(EventCategory::INPUT));
        assert!(!key.is_in_category(EventCategory::MOUSE));

        let click = Event::app(EventKind::MouseButtonPressed {
            button: MouseButton::Left,
            modifiers: ModifierKey::NONE,
        });
        assert!(click.category().contains(EventCategory::MOUSE | EventCategory::MOUSE_BUTTON));

        let close = Event::app(EventKind::WindowClose);
        assert_eq!(close.category(), EventCategory::APPLICATION);
    }

    #[test]
    fn test_filter_category() {
        let key = key_pressed();
        key.filter_category(EventCategory::MOUSE);
        assert!(key.is_handled());

        let moved = Event::app(EventKind::MouseMoved { x: 1.0, y: 2.0 });
        moved.filter_category(EventCategory::MOUSE);
        assert!(!moved.is_handled());
        // Filtering again changes nothing.
        moved.filter_category(EventCategory::MOUSE);
        assert!(!moved.is_handled());
    }

    #[test]
    fn test_filter_on_handled_event_is_noop() {
        let moved = Event::app(EventKind::MouseMoved { x: 1.0, y: 2.0 });
        moved.mark_handled();
        moved.filter_category(EventCategory::MOUSE);
        moved.filter_type(EventType::MouseMoved);
        assert!(moved.is_handled());
    }

    #[test]
    fn test_filter_type() {
        let close = Event::app(EventKind::WindowClose);
        close.filter_type(EventType::WindowClose);
        assert!(!close.is_handled());
        close.filter_type(EventType::WindowFocus);
        assert!(close.is_handled());
    }

    #[test]
    fn test_dispatch_matching_handler() {
        let event = key_pressed();
        let mut dispatcher = EventDispatcher::new(&event);
        assert!(dispatcher.dispatch(EventType::KeyPressed, |_| true));
        assert!(event.is_handled());
    }

    #[test]
    fn test_dispatch_handler_declines() {
        let event = key_pressed();
        let mut dispatcher = EventDispatcher::new(&event);
        assert!(!dispatcher.dispatch(EventType::KeyPressed, |_| false));
        assert!(!event.is_handled());
    }

    #[test]
    fn test_dispatch_mismatch_and_handled() {
        let event = key_pressed();
        let mut calls = 0;

        let mut dispatcher = EventDispatcher::new(&event);
        assert!(!dispatcher.dispatch(EventType::KeyReleased, |_| {
            calls += 1;
            true
        }));
        assert_eq!(calls, 0);

        event.mark_handled();
        assert!(dispatcher.dispatch(EventType::KeyPressed, |_| {
            calls += 1;
            true
        }));
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_second_dispatch_after_success_skips_handler() {
        let event = key_pressed();
        let mut calls = 0;

        let mut dispatcher = EventDispatcher::new(&event);
        assert!(dispatcher.dispatch(EventType::KeyPressed, |_| {
            calls += 1;
            true
        }));
        assert_eq!(calls, 1);

        assert!(dispatcher.dispatch(EventType::KeyPressed, |_| {
            calls += 1;
            true
        }));
        assert!(dispatcher.dispatch(EventType::MouseMoved, |_| {
            calls += 1;
            false
        }));
        assert_eq!(calls, 1);

        // A fresh dispatcher over the same event sees it as consumed too.
        let mut again = EventDispatcher::new(&event);
        assert!(again.dispatch(EventType::KeyPressed, |_| {
            calls += 1;
            true
        }));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_handlers_run_in_order_until_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut handlers = EventHandlers::new();

        let first = calls.clone();
        handlers.register(EventType::WindowClose, move |_| {
            first.fetch_add(1, Ordering::SeqCst);
            false
        });
        let second = calls.clone();
        handlers.register(EventType::WindowClose, move |_| {
            second.fetch_add(10, Ordering::SeqCst);
            true
        });
        let third = calls.clone();
        handlers.register(EventType::WindowClose, move |_| {
            third.fetch_add(100, Ordering::SeqCst);
            true
        });

        let event = Event::app(EventKind::WindowClose);
        assert!(handlers.handle(&event));
        assert!(event.is_handled());
        assert_eq!(calls.load(Ordering::SeqCst), 11);
        assert_eq!(handlers.count(EventType::WindowClose), 3);

        // Unregistered tags fall through.
        assert!(!handlers.handle(&key_pressed()));
    }

    #[test]
    fn test_aspect_ratio() {
        let resize = EventKind::WindowResize {
            width: 1600,
            height: 800,
        };
        assert_eq!(resize.aspect_ratio(), Some(2.0));
        assert_eq!(
            EventKind::WindowResize { width: 10, height: 0 }.aspect_ratio(),
            None
        );
        assert_eq!(EventKind::AppTick.aspect_ratio(), None);
    }

    #[test]
    fn test_display() {
        let resize = Event::app(EventKind::WindowResize {
            width: 800,
            height: 600,
        });
        assert_eq!(resize.to_string(), "WindowResize: 800x600");
        assert_eq!(
            key_pressed().to_string(),
            "KeyPressed: A (repeat 0, mods None)"
        );
    }
}
