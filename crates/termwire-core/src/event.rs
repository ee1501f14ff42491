#![forbid(unsafe_code)]

//! Input event types.
//!
//! # Design Notes
//!
//! - Mouse coordinates are 0-indexed (the wire protocol is 1-indexed)
//! - `KeyEventKind` is `Press` unless the terminal was asked to report
//!   event types through the keyboard enhancement flags
//! - Modifier, state and enhancement sets are `bitflags` over the exact bit
//!   values the kitty keyboard protocol and this crate's API publish

use bitflags::bitflags;

use crate::error::{Error, Result};

/// An input event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Event {
    /// The terminal window gained focus.
    FocusGained,

    /// The terminal window lost focus.
    FocusLost,

    /// A keyboard event.
    Key(KeyEvent),

    /// A mouse event.
    Mouse(MouseEvent),

    /// Text delivered through bracketed paste.
    Paste(String),

    /// The terminal was resized to `(columns, rows)`.
    Resize(u16, u16),
}

/// A keyboard event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    /// The key.
    pub code: KeyCode,

    /// Modifier keys held during the event.
    pub modifiers: KeyModifiers,

    /// Press, repeat or release.
    pub kind: KeyEventKind,

    /// Keypad and lock state.
    pub state: KeyEventState,
}

impl KeyEvent {
    /// A press of `code` with no modifiers and no state.
    #[must_use]
    pub const fn new(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    #[must_use]
    pub const fn with_modifiers(mut self, modifiers: KeyModifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    #[must_use]
    pub const fn with_kind(mut self, kind: KeyEventKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub const fn with_state(mut self, state: KeyEventState) -> Self {
        self.state = state;
        self
    }

    /// Check if this is a specific character key.
    #[must_use]
    pub fn is_char(&self, c: char) -> bool {
        matches!(self.code, KeyCode::Char(ch) if ch == c)
    }
}

impl From<KeyCode> for KeyEvent {
    fn from(code: KeyCode) -> Self {
        Self::new(code)
    }
}

/// Key codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Backspace,
    Enter,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    PageUp,
    PageDown,
    Tab,
    /// Shift+Tab.
    BackTab,
    Delete,
    Insert,
    /// Function key, 1 through 35. Use [`KeyCode::function`] for checked
    /// construction.
    F(u8),
    /// A character key.
    Char(char),
    Null,
    Esc,
    CapsLock,
    ScrollLock,
    NumLock,
    PrintScreen,
    Pause,
    Menu,
    /// The "5" key on a keypad with Num Lock off.
    KeypadBegin,
    Media(MediaKeyCode),
    /// A modifier key pressed on its own (kitty protocol only).
    Modifier(ModifierKeyCode),
}

impl KeyCode {
    /// Highest function key number.
    pub const MAX_FUNCTION_KEY: u8 = 35;

    /// `F(n)` for `1 <= n <= 35`.
    pub fn function(n: u8) -> Result<Self> {
        if (1..=Self::MAX_FUNCTION_KEY).contains(&n) {
            Ok(Self::F(n))
        } else {
            Err(Error::invalid(format!("function key F({n}) is outside 1..=35")))
        }
    }
}

/// Media keys reported by the kitty keyboard protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKeyCode {
    Play,
    Pause,
    PlayPause,
    Reverse,
    Stop,
    FastForward,
    Rewind,
    TrackNext,
    TrackPrevious,
    Record,
    LowerVolume,
    RaiseVolume,
    MuteVolume,
}

/// Modifier keys reported on their own by the kitty keyboard protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModifierKeyCode {
    LeftShift,
    LeftControl,
    LeftAlt,
    LeftSuper,
    LeftHyper,
    LeftMeta,
    RightShift,
    RightControl,
    RightAlt,
    RightSuper,
    RightHyper,
    RightMeta,
    IsoLevel3Shift,
    IsoLevel5Shift,
}

/// The type of key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyEventKind {
    #[default]
    Press,
    Repeat,
    Release,
}

bitflags! {
    /// Modifier keys held during a key or mouse event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct KeyModifiers: u8 {
        const NONE    = 0;
        const SHIFT   = 0b0000_0001;
        const CONTROL = 0b0000_0010;
        const ALT     = 0b0000_0100;
        const SUPER   = 0b0000_1000;
        const HYPER   = 0b0001_0000;
        const META    = 0b0010_0000;
    }
}

bitflags! {
    /// Extra key state reported by the kitty keyboard protocol.
    ///
    /// `CAPS_LOCK` and `NUM_LOCK` occupy separate bits so both locks can be
    /// reported at once.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct KeyEventState: u8 {
        const NONE      = 0;
        /// The key is on the keypad.
        const KEYPAD    = 0b0000_0001;
        const CAPS_LOCK = 0b0000_1000;
        const NUM_LOCK  = 0b0001_0000;
    }
}

bitflags! {
    /// Progressive enhancement flags of the kitty keyboard protocol.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct KeyboardEnhancementFlags: u8 {
        /// Report ambiguous keys (Esc, Alt+key, ...) as CSI-u sequences.
        const DISAMBIGUATE_ESCAPE_CODES       = 0b0000_0001;
        /// Report repeat and release events.
        const REPORT_EVENT_TYPES              = 0b0000_0010;
        /// Report shifted and base-layout keys alongside the key.
        const REPORT_ALTERNATE_KEYS           = 0b0000_0100;
        /// Report every key, including plain text keys, as CSI-u.
        const REPORT_ALL_KEYS_AS_ESCAPE_CODES = 0b0000_1000;
        /// Report the text a key would insert.
        const REPORT_ASSOCIATED_TEXT          = 0b0001_0000;
    }
}

/// A mouse event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MouseEvent {
    pub kind: MouseEventKind,

    /// Column (0-indexed, leftmost column is 0).
    pub column: u16,

    /// Row (0-indexed, topmost row is 0).
    pub row: u16,

    /// Modifier keys held during the event.
    pub modifiers: KeyModifiers,
}

impl MouseEvent {
    #[must_use]
    pub const fn new(kind: MouseEventKind, column: u16, row: u16) -> Self {
        Self {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    #[must_use]
    pub const fn with_modifiers(mut self, modifiers: KeyModifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

/// The type of mouse event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseEventKind {
    Down(MouseButton),
    Up(MouseButton),
    /// Moved while the button is held.
    Drag(MouseButton),
    /// Moved with no button held.
    Moved,
    ScrollUp,
    ScrollDown,
}

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}
