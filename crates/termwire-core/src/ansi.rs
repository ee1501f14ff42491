#![forbid(unsafe_code)]

//! ANSI escape sequence encoding for [`Command`]s.
//!
//! Pure byte generation: no state, no terminal queries. The same command
//! always produces the same bytes.
//!
//! # Sequence Reference
//!
//! | Category | Sequence | Description |
//! |----------|----------|-------------|
//! | CSI | `ESC [ row ; col H` | CUP (1-indexed) |
//! | CSI | `ESC [ n A/B/C/D` | Relative cursor motion |
//! | CSI | `ESC [ n E/F` | Next/previous line |
//! | CSI | `ESC [ col G` / `ESC [ row d` | Absolute column / row |
//! | CSI | `ESC [ n SP q` | DECSCUSR cursor shape |
//! | CSI | `ESC [ n S/T` | Scroll up/down |
//! | CSI | `ESC [ n J/K` | Erase display/line |
//! | CSI | `ESC [ 8 ; rows ; cols t` | Window resize |
//! | CSI | `ESC [ > f u` / `ESC [ < u` | Kitty keyboard push/pop |
//! | SGR | `ESC [ 38/48/58 ; … m` | Foreground/background/underline color |
//! | DEC | `ESC [ ? n h/l` | Private modes (25, 12, 7, 1049, 1004, 2004, mouse) |

use std::io::{self, Write};

use crate::command::{ClearType, Command, CursorShape};
use crate::event::KeyboardEnhancementFlags;
use crate::style::{Attribute, Color, Colors, ContentStyle};

// =============================================================================
// Fixed Sequences
// =============================================================================

/// SGR reset: `CSI 0 m`
pub const SGR_RESET: &[u8] = b"\x1b[0m";

/// Save cursor position: `CSI s`
pub const CURSOR_SAVE: &[u8] = b"\x1b[s";

/// Restore cursor position: `CSI u`
pub const CURSOR_RESTORE: &[u8] = b"\x1b[u";

/// Hide cursor: `CSI ? 25 l`
pub const CURSOR_HIDE: &[u8] = b"\x1b[?25l";

/// Show cursor: `CSI ? 25 h`
pub const CURSOR_SHOW: &[u8] = b"\x1b[?25h";

/// Enable cursor blinking: `CSI ? 12 h`
pub const CURSOR_BLINK_ENABLE: &[u8] = b"\x1b[?12h";

/// Disable cursor blinking: `CSI ? 12 l`
pub const CURSOR_BLINK_DISABLE: &[u8] = b"\x1b[?12l";

/// Ask the terminal for the cursor position: `CSI 6 n`.
///
/// The reply is `CSI row ; col R`.
pub const CURSOR_POSITION_QUERY: &[u8] = b"\x1b[6n";

/// Enable alternate screen: `CSI ? 1049 h`
pub const ALT_SCREEN_ENTER: &[u8] = b"\x1b[?1049h";

/// Disable alternate screen: `CSI ? 1049 l`
pub const ALT_SCREEN_LEAVE: &[u8] = b"\x1b[?1049l";

/// Enable auto-wrap: `CSI ? 7 h`
pub const LINE_WRAP_ENABLE: &[u8] = b"\x1b[?7h";

/// Disable auto-wrap: `CSI ? 7 l`
pub const LINE_WRAP_DISABLE: &[u8] = b"\x1b[?7l";

/// Enable bracketed paste: `CSI ? 2004 h`
pub const BRACKETED_PASTE_ENABLE: &[u8] = b"\x1b[?2004h";

/// Disable bracketed paste: `CSI ? 2004 l`
pub const BRACKETED_PASTE_DISABLE: &[u8] = b"\x1b[?2004l";

/// Enable focus reporting: `CSI ? 1004 h`
pub const FOCUS_ENABLE: &[u8] = b"\x1b[?1004h";

/// Disable focus reporting: `CSI ? 1004 l`
pub const FOCUS_DISABLE: &[u8] = b"\x1b[?1004l";

/// Enable mouse reporting.
///
/// Enables, in order:
/// - 1000: Normal mouse tracking
/// - 1002: Button event tracking (motion while pressed)
/// - 1003: Any-event tracking (motion with no button)
/// - 1015: urxvt coordinates
/// - 1006: SGR extended coordinates
pub const MOUSE_ENABLE: &[u8] = b"\x1b[?1000h\x1b[?1002h\x1b[?1003h\x1b[?1015h\x1b[?1006h";

/// Disable mouse reporting, the enable set in reverse order.
pub const MOUSE_DISABLE: &[u8] = b"\x1b[?1006l\x1b[?1015l\x1b[?1003l\x1b[?1002l\x1b[?1000l";

/// Pop one entry off the terminal's keyboard enhancement stack: `CSI < u`
pub const KEYBOARD_ENHANCEMENT_POP: &[u8] = b"\x1b[<u";

// =============================================================================
// Command Dispatch
// =============================================================================

/// Write the ANSI encoding of `command` to `w`.
pub fn write_command<W: Write>(w: &mut W, command: &Command) -> io::Result<()> {
    match command {
        Command::MoveTo(column, row) => cup(w, *column, *row),
        Command::MoveToNextLine(n) => write!(w, "\x1b[{n}E"),
        Command::MoveToPreviousLine(n) => write!(w, "\x1b[{n}F"),
        Command::MoveToColumn(column) => write!(w, "\x1b[{}G", u32::from(*column) + 1),
        Command::MoveToRow(row) => write!(w, "\x1b[{}d", u32::from(*row) + 1),
        Command::MoveUp(n) => write!(w, "\x1b[{n}A"),
        Command::MoveDown(n) => write!(w, "\x1b[{n}B"),
        Command::MoveRight(n) => write!(w, "\x1b[{n}C"),
        Command::MoveLeft(n) => write!(w, "\x1b[{n}D"),
        Command::SavePosition => w.write_all(CURSOR_SAVE),
        Command::RestorePosition => w.write_all(CURSOR_RESTORE),
        Command::Hide => w.write_all(CURSOR_HIDE),
        Command::Show => w.write_all(CURSOR_SHOW),
        Command::EnableBlinking => w.write_all(CURSOR_BLINK_ENABLE),
        Command::DisableBlinking => w.write_all(CURSOR_BLINK_DISABLE),
        Command::SetCursorShape(shape) => write!(w, "\x1b[{} q", decscusr_param(*shape)),
        Command::EnableMouseCapture => w.write_all(MOUSE_ENABLE),
        Command::DisableMouseCapture => w.write_all(MOUSE_DISABLE),
        Command::PushKeyboardEnhancementFlags(flags) => keyboard_enhancement_push(w, *flags),
        Command::PopKeyboardEnhancementFlags => w.write_all(KEYBOARD_ENHANCEMENT_POP),
        Command::EnableFocusChange => w.write_all(FOCUS_ENABLE),
        Command::DisableFocusChange => w.write_all(FOCUS_DISABLE),
        Command::EnableBracketedPaste => w.write_all(BRACKETED_PASTE_ENABLE),
        Command::DisableBracketedPaste => w.write_all(BRACKETED_PASTE_DISABLE),
        Command::SetForegroundColor(color) => sgr_color(w, ColorChannel::Foreground, *color),
        Command::SetBackgroundColor(color) => sgr_color(w, ColorChannel::Background, *color),
        Command::SetUnderlineColor(color) => sgr_color(w, ColorChannel::Underline, *color),
        Command::SetColors(colors) => sgr_colors(w, colors),
        Command::SetAttribute(attribute) => sgr_attributes(w, std::slice::from_ref(attribute)),
        Command::SetAttributes(attributes) => sgr_attributes(w, attributes),
        Command::SetStyle(style) => sgr_style(w, style),
        Command::ResetColor => w.write_all(SGR_RESET),
        Command::DisableLineWrap => w.write_all(LINE_WRAP_DISABLE),
        Command::EnableLineWrap => w.write_all(LINE_WRAP_ENABLE),
        Command::EnterAlternateScreen => w.write_all(ALT_SCREEN_ENTER),
        Command::LeaveAlternateScreen => w.write_all(ALT_SCREEN_LEAVE),
        Command::ScrollUp(n) => write!(w, "\x1b[{n}S"),
        Command::ScrollDown(n) => write!(w, "\x1b[{n}T"),
        Command::Clear(kind) => w.write_all(clear_sequence(*kind)),
        Command::SetSize(columns, rows) => write!(w, "\x1b[8;{rows};{columns}t"),
        Command::Print(text) => w.write_all(text.as_bytes()),
    }
}

/// Encode a single command into a fresh buffer.
#[must_use]
pub fn encode(command: &Command) -> Vec<u8> {
    let mut buf = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = write_command(&mut buf, command);
    buf
}

// =============================================================================
// Cursor
// =============================================================================

/// CUP (Cursor Position): `CSI row ; col H`
///
/// Column and row are 0-indexed input, converted to 1-indexed for ANSI.
pub fn cup<W: Write>(w: &mut W, column: u16, row: u16) -> io::Result<()> {
    write!(w, "\x1b[{};{}H", u32::from(row) + 1, u32::from(column) + 1)
}

/// DECSCUSR parameter for a cursor shape.
#[must_use]
pub const fn decscusr_param(shape: CursorShape) -> u8 {
    match shape {
        CursorShape::UnderScore => 3,
        CursorShape::Line => 4,
        CursorShape::Block => 5,
    }
}

/// Push flags onto the terminal's keyboard enhancement stack: `CSI > f u`
pub fn keyboard_enhancement_push<W: Write>(
    w: &mut W,
    flags: KeyboardEnhancementFlags,
) -> io::Result<()> {
    write!(w, "\x1b[>{}u", flags.bits())
}

// =============================================================================
// Erase Operations
// =============================================================================

/// ED/EL sequence for a clear type.
#[must_use]
pub const fn clear_sequence(kind: ClearType) -> &'static [u8] {
    match kind {
        ClearType::All => b"\x1b[2J",
        ClearType::Purge => b"\x1b[3J",
        ClearType::FromCursorDown => b"\x1b[0J",
        ClearType::FromCursorUp => b"\x1b[1J",
        ClearType::CurrentLine => b"\x1b[2K",
        ClearType::UntilNewLine => b"\x1b[0K",
    }
}

// =============================================================================
// SGR (Select Graphic Rendition)
// =============================================================================

/// Which color an SGR color selector targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorChannel {
    Foreground,
    Background,
    Underline,
}

impl ColorChannel {
    /// Extended color selector (38/48/58).
    #[must_use]
    pub const fn selector(self) -> u8 {
        match self {
            Self::Foreground => 38,
            Self::Background => 48,
            Self::Underline => 58,
        }
    }

    /// Default color code (39/49/59).
    #[must_use]
    pub const fn default_code(self) -> u8 {
        self.selector() + 1
    }
}

/// Write one SGR color sequence.
///
/// - `Reset` → `CSI 39 m` / `CSI 49 m` / `CSI 59 m`
/// - named and palette colors → `CSI 38;5;n m`
/// - RGB → `CSI 38;2;r;g;b m`
pub fn sgr_color<W: Write>(w: &mut W, channel: ColorChannel, color: Color) -> io::Result<()> {
    let selector = channel.selector();
    match color {
        Color::Reset => write!(w, "\x1b[{}m", channel.default_code()),
        Color::Rgb { r, g, b } => write!(w, "\x1b[{selector};2;{r};{g};{b}m"),
        other => match other.palette_index() {
            Some(index) => write!(w, "\x1b[{selector};5;{index}m"),
            None => Ok(()),
        },
    }
}

/// Write each present color as its own sequence, foreground first.
pub fn sgr_colors<W: Write>(w: &mut W, colors: &Colors) -> io::Result<()> {
    if let Some(fg) = colors.foreground {
        sgr_color(w, ColorChannel::Foreground, fg)?;
    }
    if let Some(bg) = colors.background {
        sgr_color(w, ColorChannel::Background, bg)?;
    }
    Ok(())
}

/// Write all attributes as a single `CSI a;b;c m`.
///
/// Emits nothing for an empty list; a bare `CSI m` would reset everything.
pub fn sgr_attributes<W: Write>(w: &mut W, attributes: &[Attribute]) -> io::Result<()> {
    let Some((first, rest)) = attributes.split_first() else {
        return Ok(());
    };
    w.write_all(b"\x1b[")?;
    w.write_all(first.sgr().as_bytes())?;
    for attribute in rest {
        w.write_all(b";")?;
        w.write_all(attribute.sgr().as_bytes())?;
    }
    w.write_all(b"m")
}

/// Colors (foreground, background, underline), then attributes.
pub fn sgr_style<W: Write>(w: &mut W, style: &ContentStyle) -> io::Result<()> {
    if let Some(fg) = style.foreground {
        sgr_color(w, ColorChannel::Foreground, fg)?;
    }
    if let Some(bg) = style.background {
        sgr_color(w, ColorChannel::Background, bg)?;
    }
    if let Some(ul) = style.underline {
        sgr_color(w, ColorChannel::Underline, ul)?;
    }
    sgr_attributes(w, &style.attributes)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn to_bytes<F: FnOnce(&mut Vec<u8>) -> io::Result<()>>(f: F) -> Vec<u8> {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        buf
    }

    // Cursor Tests

    #[test]
    fn move_to_origin() {
        assert_eq!(encode(&Command::MoveTo(0, 0)), [0x1B, 0x5B, 0x31, 0x3B, 0x31, 0x48]);
    }

    #[test]
    fn move_to_is_row_then_column() {
        assert_eq!(encode(&Command::MoveTo(9, 4)), b"\x1b[5;10H");
    }

    #[test]
    fn move_to_max_does_not_wrap() {
        assert_eq!(
            encode(&Command::MoveTo(u16::MAX, u16::MAX)),
            b"\x1b[65536;65536H"
        );
    }

    #[test]
    fn relative_moves() {
        assert_eq!(encode(&Command::MoveUp(3)), b"\x1b[3A");
        assert_eq!(encode(&Command::MoveDown(1)), b"\x1b[1B");
        assert_eq!(encode(&Command::MoveRight(12)), b"\x1b[12C");
        assert_eq!(encode(&Command::MoveLeft(2)), b"\x1b[2D");
    }

    #[test]
    fn zero_moves_are_sent_literally() {
        assert_eq!(encode(&Command::MoveUp(0)), b"\x1b[0A");
        assert_eq!(encode(&Command::MoveLeft(0)), b"\x1b[0D");
    }

    #[test]
    fn absolute_column_and_row() {
        assert_eq!(encode(&Command::MoveToColumn(0)), b"\x1b[1G");
        assert_eq!(encode(&Command::MoveToRow(7)), b"\x1b[8d");
        assert_eq!(encode(&Command::MoveToNextLine(2)), b"\x1b[2E");
        assert_eq!(encode(&Command::MoveToPreviousLine(4)), b"\x1b[4F");
    }

    #[test]
    fn cursor_modes() {
        assert_eq!(encode(&Command::SavePosition), b"\x1b[s");
        assert_eq!(encode(&Command::RestorePosition), b"\x1b[u");
        assert_eq!(encode(&Command::Hide), b"\x1b[?25l");
        assert_eq!(encode(&Command::Show), b"\x1b[?25h");
        assert_eq!(encode(&Command::EnableBlinking), b"\x1b[?12h");
        assert_eq!(encode(&Command::DisableBlinking), b"\x1b[?12l");
    }

    #[test]
    fn cursor_shapes() {
        assert_eq!(
            encode(&Command::SetCursorShape(CursorShape::UnderScore)),
            b"\x1b[3 q"
        );
        assert_eq!(encode(&Command::SetCursorShape(CursorShape::Line)), b"\x1b[4 q");
        assert_eq!(encode(&Command::SetCursorShape(CursorShape::Block)), b"\x1b[5 q");
    }

    // Mode Tests

    #[test]
    fn screen_and_wrap_modes() {
        assert_eq!(encode(&Command::EnterAlternateScreen), b"\x1b[?1049h");
        assert_eq!(encode(&Command::LeaveAlternateScreen), b"\x1b[?1049l");
        assert_eq!(encode(&Command::EnableLineWrap), b"\x1b[?7h");
        assert_eq!(encode(&Command::DisableLineWrap), b"\x1b[?7l");
    }

    #[test]
    fn input_reporting_modes() {
        assert_eq!(encode(&Command::EnableBracketedPaste), b"\x1b[?2004h");
        assert_eq!(encode(&Command::DisableBracketedPaste), b"\x1b[?2004l");
        assert_eq!(encode(&Command::EnableFocusChange), b"\x1b[?1004h");
        assert_eq!(encode(&Command::DisableFocusChange), b"\x1b[?1004l");
    }

    #[test]
    fn mouse_capture_covers_all_modes() {
        let enable = encode(&Command::EnableMouseCapture);
        let disable = encode(&Command::DisableMouseCapture);
        for mode in ["1000", "1002", "1003", "1015", "1006"] {
            let on = format!("\x1b[?{mode}h");
            let off = format!("\x1b[?{mode}l");
            assert!(enable.windows(on.len()).any(|w| w == on.as_bytes()), "{mode}h");
            assert!(disable.windows(off.len()).any(|w| w == off.as_bytes()), "{mode}l");
        }
        assert!(disable.starts_with(b"\x1b[?1006l"));
    }

    #[test]
    fn keyboard_enhancement_push_pop() {
        let flags = KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
            | KeyboardEnhancementFlags::REPORT_EVENT_TYPES;
        assert_eq!(
            encode(&Command::PushKeyboardEnhancementFlags(flags)),
            b"\x1b[>3u"
        );
        assert_eq!(encode(&Command::PopKeyboardEnhancementFlags), b"\x1b[<u");
    }

    #[test]
    fn scroll_clear_and_size() {
        assert_eq!(encode(&Command::ScrollUp(2)), b"\x1b[2S");
        assert_eq!(encode(&Command::ScrollDown(5)), b"\x1b[5T");
        assert_eq!(encode(&Command::Clear(ClearType::All)), b"\x1b[2J");
        assert_eq!(encode(&Command::Clear(ClearType::Purge)), b"\x1b[3J");
        assert_eq!(encode(&Command::Clear(ClearType::FromCursorDown)), b"\x1b[0J");
        assert_eq!(encode(&Command::Clear(ClearType::FromCursorUp)), b"\x1b[1J");
        assert_eq!(encode(&Command::Clear(ClearType::CurrentLine)), b"\x1b[2K");
        assert_eq!(encode(&Command::Clear(ClearType::UntilNewLine)), b"\x1b[0K");
        assert_eq!(encode(&Command::SetSize(80, 24)), b"\x1b[8;24;80t");
    }

    // SGR Tests

    #[test]
    fn rgb_foreground_bytes() {
        assert_eq!(
            encode(&Command::SetForegroundColor(Color::Rgb { r: 255, g: 128, b: 0 })),
            [
                0x1B, 0x5B, 0x33, 0x38, 0x3B, 0x32, 0x3B, 0x32, 0x35, 0x35, 0x3B, 0x31, 0x32,
                0x38, 0x3B, 0x30, 0x6D
            ]
        );
    }

    #[test]
    fn named_and_palette_colors() {
        assert_eq!(
            to_bytes(|w| sgr_color(w, ColorChannel::Foreground, Color::Red)),
            b"\x1b[38;5;9m"
        );
        assert_eq!(
            to_bytes(|w| sgr_color(w, ColorChannel::Background, Color::DarkBlue)),
            b"\x1b[48;5;4m"
        );
        assert_eq!(
            to_bytes(|w| sgr_color(w, ColorChannel::Underline, Color::AnsiValue(200))),
            b"\x1b[58;5;200m"
        );
    }

    #[test]
    fn reset_color_per_channel() {
        assert_eq!(encode(&Command::SetForegroundColor(Color::Reset)), b"\x1b[39m");
        assert_eq!(encode(&Command::SetBackgroundColor(Color::Reset)), b"\x1b[49m");
        assert_eq!(encode(&Command::SetUnderlineColor(Color::Reset)), b"\x1b[59m");
        assert_eq!(encode(&Command::ResetColor), b"\x1b[0m");
    }

    #[test]
    fn set_colors_emits_separate_selectors() {
        let colors = Colors::new(Color::Green, Color::Rgb { r: 1, g: 2, b: 3 });
        assert_eq!(
            encode(&Command::SetColors(colors)),
            b"\x1b[38;5;10m\x1b[48;2;1;2;3m"
        );
        let bg_only = Colors {
            foreground: None,
            background: Some(Color::Reset),
        };
        assert_eq!(encode(&Command::SetColors(bg_only)), b"\x1b[49m");
    }

    #[test]
    fn attributes_share_one_sequence() {
        assert_eq!(encode(&Command::SetAttribute(Attribute::Bold)), b"\x1b[1m");
        assert_eq!(
            encode(&Command::SetAttributes(vec![
                Attribute::Bold,
                Attribute::Italic,
                Attribute::Undercurled,
            ])),
            b"\x1b[1;3;4:3m"
        );
        assert!(encode(&Command::SetAttributes(Vec::new())).is_empty());
    }

    #[test]
    fn style_orders_colors_before_attributes() {
        let style = ContentStyle::new()
            .attribute(Attribute::Reverse)
            .underline(Color::Yellow)
            .foreground(Color::Black)
            .background(Color::White)
            .attribute(Attribute::NoBlink);
        assert_eq!(
            encode(&Command::SetStyle(style)),
            b"\x1b[38;5;0m\x1b[48;5;15m\x1b[58;5;11m\x1b[7;25m"
        );
    }

    #[test]
    fn print_is_raw() {
        assert_eq!(encode(&Command::Print("héllo\x1b".into())), "héllo\x1b".as_bytes());
    }

    #[test]
    fn encoding_is_deterministic() {
        let command = Command::SetStyle(
            ContentStyle::new()
                .foreground(Color::Rgb { r: 9, g: 8, b: 7 })
                .attribute(Attribute::Dim),
        );
        assert_eq!(encode(&command), encode(&command));
    }
}
