#![forbid(unsafe_code)]

//! termwire public facade crate.
//!
//! Re-exports the command, style and event types from `termwire-core` and
//! the native terminal from `termwire-tty`, plus a prelude for day-to-day
//! use:
//!
//! ```no_run
//! use termwire::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let mut term = Terminal::open()?;
//!     term.enable_raw_mode()?;
//!     term.execute(&[Command::EnterAlternateScreen, Command::Hide])?;
//!     loop {
//!         if let Event::Key(key) = term.read()? {
//!             if key.code == KeyCode::Esc {
//!                 break;
//!             }
//!         }
//!     }
//!     term.execute(&[Command::Show, Command::LeaveAlternateScreen])?;
//!     term.disable_raw_mode()
//! }
//! ```

// --- Command re-exports ----------------------------------------------------

pub use termwire_core::command::{ClearType, Command, CursorShape};
pub use termwire_core::output_queue::OutputQueue;
pub use termwire_core::strategy::{AnsiStrategy, ConsoleApi, LegacyConsole, Strategy};
pub use termwire_core::style::{Attribute, Color, Colors, ContentStyle};

// --- Event re-exports ------------------------------------------------------

pub use termwire_core::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers,
    KeyboardEnhancementFlags, MediaKeyCode, ModifierKeyCode, MouseButton, MouseEvent,
    MouseEventKind,
};
pub use termwire_core::event_pump::EventPump;
pub use termwire_core::input_parser::{InputParser, ParsedEvent};

// --- State re-exports ------------------------------------------------------

pub use termwire_core::byte_source::ByteSource;
pub use termwire_core::clock::{Clock, MonotonicClock};
pub use termwire_core::config::TermwireConfig;
pub use termwire_core::enhancement::KeyboardEnhancementStack;
pub use termwire_core::raw_mode::{RawModeController, RawModeGuard, TerminalMode};

// --- Terminal re-exports ---------------------------------------------------

pub use termwire_tty::{Terminal, size_from_env_values};
#[cfg(unix)]
pub use termwire_tty::{
    TtyByteSource, TtyMode, disable_raw_mode, enable_raw_mode, is_raw_mode_enabled, raw_mode,
    size, window_size,
};

// --- Errors ---------------------------------------------------------------

pub use termwire_core::error::{Error, Result};

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        Attribute, ClearType, Color, Colors, Command, ContentStyle, CursorShape, Error, Event,
        KeyCode, KeyEvent, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags, MouseButton,
        MouseEvent, MouseEventKind, Result, Terminal,
    };

    #[cfg(unix)]
    pub use crate::{disable_raw_mode, enable_raw_mode, size};

    pub use crate::{core, tty};
}

pub use termwire_core as core;
pub use termwire_tty as tty;
