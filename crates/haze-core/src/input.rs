//! Input enumerations shared by events, render contexts and input polling.
//!
//! Keys, mouse buttons and modifier flags are backend-neutral. Conversions
//! from winit types are provided so winit-based backends can feed
//! [`EventKind`](crate::event::EventKind) values directly.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

use winit::keyboard::{KeyCode, ModifiersState};

/// A physical keyboard key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Key {
    /// A key with no Haze mapping.
    #[default]
    Unknown,
    Space,
    Apostrophe,
    Comma,
    Minus,
    Period,
    Slash,
    Num0,
    Num1,
    Num2,
    Num3,
    Num4,
    Num5,
    Num6,
    Num7,
    Num8,
    Num9,
    Semicolon,
    Equal,
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
    P,
    Q,
    R,
    S,
    T,
    U,
    V,
    W,
    X,
    Y,
    Z,
    LeftBracket,
    Backslash,
    RightBracket,
    GraveAccent,
    /// First non-US key.
    World1,
    /// Second non-US key.
    World2,
    Esc,
    Enter,
    Tab,
    Backspace,
    Insert,
    Delete,
    Right,
    Left,
    Down,
    Up,
    PageUp,
    PageDown,
    Home,
    End,
    CapsLock,
    ScrollLock,
    NumLock,
    PrintScreen,
    Pause,
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
    F13,
    F14,
    F15,
    F16,
    F17,
    F18,
    F19,
    F20,
    F21,
    F22,
    F23,
    F24,
    F25,
    Numpad0,
    Numpad1,
    Numpad2,
    Numpad3,
    Numpad4,
    Numpad5,
    Numpad6,
    Numpad7,
    Numpad8,
    Numpad9,
    NumpadDecimal,
    NumpadDivide,
    NumpadMultiply,
    NumpadSubtract,
    NumpadAdd,
    NumpadEnter,
    NumpadEqual,
    LeftShift,
    LeftControl,
    LeftAlt,
    LeftSuper,
    RightShift,
    RightControl,
    RightAlt,
    RightSuper,
    Menu,
}

impl Key {
    /// Translate a winit physical key code.
    ///
    /// Codes without a Haze counterpart map to [`Key::Unknown`].
    pub fn from_key_code(code: KeyCode) -> Self {
        match code {
            KeyCode::Space => Key::Space,
            KeyCode::Quote => Key::Apostrophe,
            KeyCode::Comma => Key::Comma,
            KeyCode::Minus => Key::Minus,
            KeyCode::Period => Key::Period,
            KeyCode::Slash => Key::Slash,
            KeyCode::Digit0 => Key::Num0,
            KeyCode::Digit1 => Key::Num1,
            KeyCode::Digit2 => Key::Num2,
            KeyCode::Digit3 => Key::Num3,
            KeyCode::Digit4 => Key::Num4,
            KeyCode::Digit5 => Key::Num5,
            KeyCode::Digit6 => Key::Num6,
            KeyCode::Digit7 => Key::Num7,
            KeyCode::Digit8 => Key::Num8,
            KeyCode::Digit9 => Key::Num9,
            KeyCode::Semicolon => Key::Semicolon,
            KeyCode::Equal => Key::Equal,
            KeyCode::KeyA => Key::A,
            KeyCode::KeyB => Key::B,
            KeyCode::KeyC => Key::C,
            KeyCode::KeyD => Key::D,
            KeyCode::KeyE => Key::E,
            KeyCode::KeyF => Key::F,
            KeyCode::KeyG => Key::G,
            KeyCode::KeyH => Key::H,
            KeyCode::KeyI => Key::I,
            KeyCode::KeyJ => Key::J,
            KeyCode::KeyK => Key::K,
            KeyCode::KeyL => Key::L,
            KeyCode::KeyM => Key::M,
            KeyCode::KeyN => Key::N,
            KeyCode::KeyO => Key::O,
            KeyCode::KeyP => Key::P,
            KeyCode::KeyQ => Key::Q,
            KeyCode::KeyR => Key::R,
            KeyCode::KeyS => Key::S,
            KeyCode::KeyT => Key::T,
            KeyCode::KeyU => Key::U,
            KeyCode::KeyV => Key::V,
            KeyCode::KeyW => Key::W,
            KeyCode::KeyX => Key::X,
            KeyCode::KeyY => Key::Y,
            KeyCode::KeyZ => Key::Z,
            KeyCode::BracketLeft => Key::LeftBracket,
            KeyCode::Backslash => Key::Backslash,
            KeyCode::BracketRight => Key::RightBracket,
            KeyCode::Backquote => Key::GraveAccent,
            KeyCode::IntlBackslash => Key::World1,
            KeyCode::IntlRo | KeyCode::IntlYen => Key::World2,
            KeyCode::Escape => Key::Esc,
            KeyCode::Enter => Key::Enter,
            KeyCode::Tab => Key::Tab,
            KeyCode::Backspace => Key::Backspace,
            KeyCode::Insert => Key::Insert,
            KeyCode::Delete => Key::Delete,
            KeyCode::ArrowRight => Key::Right,
            KeyCode::ArrowLeft => Key::Left,
            KeyCode::ArrowDown => Key::Down,
            KeyCode::ArrowUp => Key::Up,
            KeyCode::PageUp => Key::PageUp,
            KeyCode::PageDown => Key::PageDown,
            KeyCode::Home => Key::Home,
            KeyCode::End => Key::End,
            KeyCode::CapsLock => Key::CapsLock,
            KeyCode::ScrollLock => Key::ScrollLock,
            KeyCode::NumLock => Key::NumLock,
            KeyCode::PrintScreen => Key::PrintScreen,
            KeyCode::Pause => Key::Pause,
            KeyCode::F1 => Key::F1,
            KeyCode::F2 => Key::F2,
            KeyCode::F3 => Key::F3,
            KeyCode::F4 => Key::F4,
            KeyCode::F5 => Key::F5,
            KeyCode::F6 => Key::F6,
            KeyCode::F7 => Key::F7,
            KeyCode::F8 => Key::F8,
            KeyCode::F9 => Key::F9,
            KeyCode::F10 => Key::F10,
            KeyCode::F11 => Key::F11,
            KeyCode::F12 => Key::F12,
            KeyCode::F13 => Key::F13,
            KeyCode::F14 => Key::F14,
            KeyCode::F15 => Key::F15,
            KeyCode::F16 => Key::F16,
            KeyCode::F17 => Key::F17,
            KeyCode::F18 => Key::F18,
            KeyCode::F19 => Key::F19,
            KeyCode::F20 => Key::F20,
            KeyCode::F21 => Key::F21,
            KeyCode::F22 => Key::F22,
            KeyCode::F23 => Key::F23,
            KeyCode::F24 => Key::F24,
            KeyCode::F25 => Key::F25,
            KeyCode::Numpad0 => Key::Numpad0,
            KeyCode::Numpad1 => Key::Numpad1,
            KeyCode::Numpad2 => Key::Numpad2,
            KeyCode::Numpad3 => Key::Numpad3,
            KeyCode::Numpad4 => Key::Numpad4,
            KeyCode::Numpad5 => Key::Numpad5,
            KeyCode::Numpad6 => Key::Numpad6,
            KeyCode::Numpad7 => Key::Numpad7,
            KeyCode::Numpad8 => Key::Numpad8,
            KeyCode::Numpad9 => Key::Numpad9,
            KeyCode::NumpadDecimal => Key::NumpadDecimal,
            KeyCode::NumpadDivide => Key::NumpadDivide,
            KeyCode::NumpadMultiply => Key::NumpadMultiply,
            KeyCode::NumpadSubtract => Key::NumpadSubtract,
            KeyCode::NumpadAdd => Key::NumpadAdd,
            KeyCode::NumpadEnter => Key::NumpadEnter,
            KeyCode::NumpadEqual => Key::NumpadEqual,
            KeyCode::ShiftLeft => Key::LeftShift,
            KeyCode::ControlLeft => Key::LeftControl,
            KeyCode::AltLeft => Key::LeftAlt,
            KeyCode::SuperLeft => Key::LeftSuper,
            KeyCode::ShiftRight => Key::RightShift,
            KeyCode::ControlRight => Key::RightControl,
            KeyCode::AltRight => Key::RightAlt,
            KeyCode::SuperRight => Key::RightSuper,
            KeyCode::ContextMenu => Key::Menu,
            _ => Key::Unknown,
        }
    }

    /// Check whether this is one of the modifier keys.
    pub fn is_modifier(self) -> bool {
        matches!(
            self,
            Key::LeftShift
                | Key::LeftControl
                | Key::LeftAlt
                | Key::LeftSuper
                | Key::RightShift
                | Key::RightControl
                | Key::RightAlt
                | Key::RightSuper
        )
    }
}

impl From<KeyCode> for Key {
    fn from(code: KeyCode) -> Self {
        Self::from_key_code(code)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A mouse button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    SideButton1,
    SideButton2,
    SideButton3,
    SideButton4,
    SideButton5,
}

impl MouseButton {
    /// Translate a winit mouse button.
    ///
    /// `Back` and `Forward` become the first two side buttons. Other buttons
    /// are numbered by winit from zero for the first extra button past the
    /// standard five; those fill the remaining side buttons, and anything
    /// beyond yields `None`.
    pub fn from_winit(button: winit::event::MouseButton) -> Option<Self> {
        use winit::event::MouseButton as W;

        match button {
            W::Left => Some(MouseButton::Left),
            W::Right => Some(MouseButton::Right),
            W::Middle => Some(MouseButton::Middle),
            W::Back => Some(MouseButton::SideButton1),
            W::Forward => Some(MouseButton::SideButton2),
            W::Other(0) => Some(MouseButton::SideButton3),
            W::Other(1) => Some(MouseButton::SideButton4),
            W::Other(2) => Some(MouseButton::SideButton5),
            W::Other(_) => None,
        }
    }
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Modifier keys held while a key or button event happened.
///
/// Flags combine with `|`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ModifierKey(u8);

impl ModifierKey {
    /// No modifiers.
    pub const NONE: Self = Self(0);
    /// Either shift key.
    pub const SHIFT: Self = Self(1 << 0);
    /// Either control key.
    pub const CONTROL: Self = Self(1 << 1);
    /// Either alt key.
    pub const ALT: Self = Self(1 << 2);
    /// Either super (logo) key.
    pub const SUPER: Self = Self(1 << 3);
    /// Caps lock is active.
    pub const CAPS_LOCK: Self = Self(1 << 4);
    /// Num lock is active.
    pub const NUM_LOCK: Self = Self(1 << 5);

    /// Create from raw bits.
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & 0b0011_1111)
    }

    /// Get the raw bits.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Check whether every flag in `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Check whether no modifier is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for ModifierKey {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ModifierKey {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for ModifierKey {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

impl From<ModifiersState> for ModifierKey {
    fn from(state: ModifiersState) -> Self {
        let mut mods = ModifierKey::NONE;
        if state.shift_key() {
            mods |= ModifierKey::SHIFT;
        }
        if state.control_key() {
            mods |= ModifierKey::CONTROL;
        }
        if state.alt_key() {
            mods |= ModifierKey::ALT;
        }
        if state.super_key() {
            mods |= ModifierKey::SUPER;
        }
        mods
    }
}

impl fmt::Display for ModifierKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(ModifierKey, &str); 6] = [
            (ModifierKey::SHIFT, "Shift"),
            (ModifierKey::CONTROL, "Control"),
            (ModifierKey::ALT, "Alt"),
            (ModifierKey::SUPER, "Super"),
            (ModifierKey::CAPS_LOCK, "CapsLock"),
            (ModifierKey::NUM_LOCK, "NumLock"),
        ];

        if self.is_empty() {
            return f.write_str("None");
        }

        let mut first = true;
        for (flag, name) in NAMES {
            if self.contains(flag) {
                if !first {
                    f.write_str("+")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// State of a key as reported by a render context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyAction {
    #[default]
    Release,
    Press,
    /// Held down long enough to auto-repeat.
    Repeat,
}

impl KeyAction {
    /// `true` for `Press` and `Repeat`.
    pub fn is_down(self) -> bool {
        matches!(self, KeyAction::Press | KeyAction::Repeat)
    }
}

/// State of a mouse button as reported by a render context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MouseButtonAction {
    #[default]
    Release,
    Press,
}

impl From<winit::event::ElementState> for MouseButtonAction {
    fn from(state: winit::event::ElementState) -> Self {
        match state {
            winit::event::ElementState::Pressed => MouseButtonAction::Press,
            winit::event::ElementState::Released => MouseButtonAction::Release,
        }
    }
}
