#![forbid(unsafe_code)]

//! Input parser state machine.
//!
//! Decodes terminal input bytes into [`Event`] values with DoS protection.
//!
//! # Design
//!
//! The parser is an incremental state machine. Bytes can arrive split at any
//! point; a sequence cut across two reads is completed by the second one.
//! It handles:
//! - ASCII characters and control codes
//! - UTF-8 multi-byte sequences (invalid input decodes to U+FFFD)
//! - CSI sequences: xterm keys, `~` keys, kitty CSI-u, SGR mouse, focus,
//!   resize reports and cursor position reports
//! - SS3 function keys
//! - OSC and DCS strings (consumed and discarded)
//! - Bracketed paste
//!
//! Malformed sequences never produce an error: they are dropped at their
//! final byte.
//!
//! # Timing
//!
//! A lone ESC is ambiguous: it may be the Escape key or the start of a
//! sequence. The caller passes a timestamp with every [`feed`](InputParser::feed).
//! When no byte follows within the escape timeout, the pending ESC becomes
//! `Key(Esc)`. Other incomplete prefixes (`ESC [`, `ESC O`, `ESC ]`, `ESC P`,
//! a partial UTF-8 character) expire the same way and are reinterpreted as
//! Alt-modified keys followed by their remaining bytes.
//!
//! # DoS Protection
//!
//! - CSI sequences: 256 bytes max
//! - OSC/DCS strings: 4 KiB max
//! - Paste content: 1 MiB max (the terminator is still recognized)

use std::collections::VecDeque;
use std::time::Duration;

use crate::config::DEFAULT_ESCAPE_TIMEOUT;
use crate::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers,
    KeyboardEnhancementFlags, MediaKeyCode, ModifierKeyCode, MouseButton, MouseEvent,
    MouseEventKind,
};

/// DoS protection: maximum CSI sequence length.
const MAX_CSI_LEN: usize = 256;

/// DoS protection: maximum OSC/DCS string length.
const MAX_STRING_LEN: usize = 4096;

/// DoS protection: maximum paste content length.
const MAX_PASTE_LEN: usize = 1024 * 1024;

/// Size of the diagnostic ring of recent input bytes.
const RECENT_BYTES: usize = 64;

/// Bracketed paste terminator. ESC appears only at index 0.
const PASTE_END: &[u8] = b"\x1b[201~";

/// Output of the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedEvent {
    /// A user-facing event.
    Event(Event),
    /// A `CSI row ; col R` reply, converted to 0-based `(column, row)`.
    CursorPosition { column: u16, row: u16 },
}

impl From<Event> for ParsedEvent {
    fn from(event: Event) -> Self {
        Self::Event(event)
    }
}

/// Which string type an OSC/DCS state is collecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StringKind {
    Osc,
    Dcs,
}

impl StringKind {
    const fn introducer(self) -> char {
        match self {
            Self::Osc => ']',
            Self::Dcs => 'P',
        }
    }
}

/// Parser state machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum ParserState {
    /// Normal character input.
    #[default]
    Ground,
    /// After ESC (0x1B).
    Escape,
    /// After `ESC [`, collecting parameter bytes.
    CsiParam,
    /// Collecting CSI intermediate bytes (0x20..=0x2F).
    CsiIntermediate,
    /// After `ESC O`.
    Ss3,
    /// Inside `ESC ] ...`.
    OscString,
    /// Inside `ESC P ...`.
    Dcs,
    /// ESC seen inside an OSC/DCS string; `\` completes ST.
    StringEscape(StringKind),
    /// Between `CSI 200 ~` and `CSI 201 ~`.
    PasteBody,
    /// Collecting a UTF-8 multi-byte sequence.
    Utf8Cont {
        collected: u8,
        expected: u8,
        /// The lead byte followed an ESC.
        alt: bool,
    },
}

impl ParserState {
    /// States that expire after the escape timeout.
    const fn is_timed(self) -> bool {
        !matches!(self, Self::Ground | Self::PasteBody)
    }
}

/// Terminal input parser.
///
/// ```
/// use termwire_core::event::{Event, KeyCode, KeyEvent};
/// use termwire_core::input_parser::InputParser;
///
/// let mut parser = InputParser::new();
/// let events = parser.parse(b"\x1b[A");
/// assert_eq!(events, vec![Event::Key(KeyEvent::new(KeyCode::Up))]);
/// ```
#[derive(Debug)]
pub struct InputParser {
    state: ParserState,
    /// Bytes of the CSI or OSC/DCS sequence being collected.
    buffer: Vec<u8>,
    /// The sequence in `buffer` is malformed or overlong; drop it at its end.
    discard: bool,
    paste: Vec<u8>,
    /// Length of the `PASTE_END` prefix matched so far.
    paste_match: usize,
    utf8: [u8; 4],
    recent: VecDeque<u8>,
    escape_timeout: Duration,
    /// Timestamp of the most recent byte.
    last_input: Duration,
    flags: KeyboardEnhancementFlags,
    expect_cursor_report: bool,
}

impl Default for InputParser {
    fn default() -> Self {
        Self::new()
    }
}

impl InputParser {
    /// Create a parser with the default escape timeout.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: ParserState::Ground,
            buffer: Vec::with_capacity(64),
            discard: false,
            paste: Vec::new(),
            paste_match: 0,
            utf8: [0; 4],
            recent: VecDeque::with_capacity(RECENT_BYTES),
            escape_timeout: DEFAULT_ESCAPE_TIMEOUT,
            last_input: Duration::ZERO,
            flags: KeyboardEnhancementFlags::empty(),
            expect_cursor_report: false,
        }
    }

    #[must_use]
    pub fn with_escape_timeout(mut self, timeout: Duration) -> Self {
        self.escape_timeout = timeout;
        self
    }

    #[must_use]
    pub fn escape_timeout(&self) -> Duration {
        self.escape_timeout
    }

    /// Keyboard enhancement flags in effect on the terminal.
    pub fn set_enhancement_flags(&mut self, flags: KeyboardEnhancementFlags) {
        self.flags = flags;
    }

    #[must_use]
    pub fn enhancement_flags(&self) -> KeyboardEnhancementFlags {
        self.flags
    }

    /// While set, `CSI r ; c R` is always read as a cursor report, never as
    /// a modified F3.
    pub fn set_cursor_report_expected(&mut self, expected: bool) {
        self.expect_cursor_report = expected;
    }

    /// Feed bytes that arrived at `now`.
    ///
    /// A pending prefix whose timeout elapsed before `now` is resolved first.
    pub fn feed(&mut self, input: &[u8], now: Duration) -> Vec<ParsedEvent> {
        let mut out = Vec::new();
        self.expire(now, &mut out);
        for &byte in input {
            self.record(byte);
            self.process_byte(byte, &mut out);
        }
        if !input.is_empty() {
            self.last_input = now;
        }
        out
    }

    /// Resolve pending prefixes whose timeout has elapsed at `now`.
    pub fn poll_timeout(&mut self, now: Duration) -> Vec<ParsedEvent> {
        let mut out = Vec::new();
        self.expire(now, &mut out);
        out
    }

    /// When the pending prefix, if any, expires.
    #[must_use]
    pub fn escape_deadline(&self) -> Option<Duration> {
        self.state
            .is_timed()
            .then(|| self.last_input.saturating_add(self.escape_timeout))
    }

    /// Parse bytes with no time passing, keeping only user-facing events.
    ///
    /// A trailing lone ESC stays pending.
    pub fn parse(&mut self, input: &[u8]) -> Vec<Event> {
        self.feed(input, self.last_input)
            .into_iter()
            .filter_map(|parsed| match parsed {
                ParsedEvent::Event(event) => Some(event),
                ParsedEvent::CursorPosition { .. } => None,
            })
            .collect()
    }

    /// The last bytes fed, oldest first. For diagnostics only.
    #[must_use]
    pub fn recent_bytes(&self) -> Vec<u8> {
        self.recent.iter().copied().collect()
    }

    /// True when no sequence, paste or character is partially collected.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.state == ParserState::Ground
    }

    fn record(&mut self, byte: u8) {
        if self.recent.len() == RECENT_BYTES {
            self.recent.pop_front();
        }
        self.recent.push_back(byte);
    }

    // ── Timeouts ─────────────────────────────────────────────────────────

    fn expire(&mut self, now: Duration, out: &mut Vec<ParsedEvent>) {
        while let Some(deadline) = self.escape_deadline() {
            if now < deadline {
                break;
            }
            self.resolve_pending(out);
        }
    }

    /// Reinterpret an incomplete prefix as keys.
    fn resolve_pending(&mut self, out: &mut Vec<ParsedEvent>) {
        let state = std::mem::take(&mut self.state);
        let collected = std::mem::take(&mut self.buffer);
        let discarded = std::mem::take(&mut self.discard);
        crate::trace!(state = ?state, "escape timeout");
        match state {
            ParserState::Ground | ParserState::PasteBody => {}
            ParserState::Escape => push_key(out, KeyEvent::new(KeyCode::Esc)),
            ParserState::Ss3 => push_key(out, alt(KeyCode::Char('O'))),
            ParserState::CsiParam | ParserState::CsiIntermediate => {
                push_key(out, alt(KeyCode::Char('[')));
                if !discarded {
                    self.replay(&collected, out);
                }
            }
            ParserState::OscString | ParserState::Dcs | ParserState::StringEscape(_) => {
                let kind = match state {
                    ParserState::Dcs | ParserState::StringEscape(StringKind::Dcs) => StringKind::Dcs,
                    _ => StringKind::Osc,
                };
                push_key(out, alt(KeyCode::Char(kind.introducer())));
                if !discarded {
                    self.replay(&collected, out);
                }
                if matches!(state, ParserState::StringEscape(_)) {
                    self.process_byte(0x1B, out);
                }
            }
            ParserState::Utf8Cont { alt: with_alt, .. } => {
                push_key(out, replacement(with_alt));
            }
        }
    }

    fn replay(&mut self, bytes: &[u8], out: &mut Vec<ParsedEvent>) {
        for &byte in bytes {
            self.process_byte(byte, out);
        }
    }

    // ── Byte dispatch ────────────────────────────────────────────────────

    fn process_byte(&mut self, byte: u8, out: &mut Vec<ParsedEvent>) {
        match self.state {
            ParserState::Ground => self.process_ground(byte, out),
            ParserState::Escape => self.process_escape(byte, out),
            ParserState::CsiParam => self.process_csi_param(byte, out),
            ParserState::CsiIntermediate => self.process_csi_intermediate(byte, out),
            ParserState::Ss3 => self.process_ss3(byte, out),
            ParserState::OscString => self.process_string(StringKind::Osc, byte),
            ParserState::Dcs => self.process_string(StringKind::Dcs, byte),
            ParserState::StringEscape(_) => self.process_string_escape(byte, out),
            ParserState::PasteBody => self.process_paste_byte(byte, out),
            ParserState::Utf8Cont {
                collected,
                expected,
                alt,
            } => self.process_utf8(byte, collected, expected, alt, out),
        }
    }

    /// Process byte in ground state.
    fn process_ground(&mut self, byte: u8, out: &mut Vec<ParsedEvent>) {
        match byte {
            0x1B => self.state = ParserState::Escape,
            0x00..=0x7F => {
                if let Some(key) = ascii_key(byte) {
                    push_key(out, key);
                }
            }
            _ => self.start_utf8(byte, false, out),
        }
    }

    fn start_utf8(&mut self, lead: u8, with_alt: bool, out: &mut Vec<ParsedEvent>) {
        let expected = match lead {
            0xC2..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF4 => 4,
            // Stray continuation bytes and bytes that never start UTF-8.
            _ => {
                self.state = ParserState::Ground;
                push_key(out, replacement(with_alt));
                return;
            }
        };
        self.utf8[0] = lead;
        self.state = ParserState::Utf8Cont {
            collected: 1,
            expected,
            alt: with_alt,
        };
    }

    /// Process UTF-8 continuation bytes.
    fn process_utf8(
        &mut self,
        byte: u8,
        collected: u8,
        expected: u8,
        with_alt: bool,
        out: &mut Vec<ParsedEvent>,
    ) {
        if byte & 0xC0 != 0x80 {
            // Truncated character: report it, then treat the byte afresh.
            self.state = ParserState::Ground;
            push_key(out, replacement(with_alt));
            self.process_byte(byte, out);
            return;
        }

        self.utf8[usize::from(collected)] = byte;
        let collected = collected + 1;
        if collected < expected {
            self.state = ParserState::Utf8Cont {
                collected,
                expected,
                alt: with_alt,
            };
            return;
        }

        self.state = ParserState::Ground;
        let ch = std::str::from_utf8(&self.utf8[..usize::from(expected)])
            .ok()
            .and_then(|s| s.chars().next())
            .unwrap_or(char::REPLACEMENT_CHARACTER);
        let mut key = KeyEvent::new(KeyCode::Char(ch));
        if with_alt {
            key.modifiers |= KeyModifiers::ALT;
        }
        push_key(out, key);
    }

    /// Process byte after ESC.
    fn process_escape(&mut self, byte: u8, out: &mut Vec<ParsedEvent>) {
        self.state = ParserState::Ground;
        match byte {
            b'[' => self.begin_sequence(ParserState::CsiParam),
            b'O' => self.state = ParserState::Ss3,
            b']' => self.begin_sequence(ParserState::OscString),
            b'P' => self.begin_sequence(ParserState::Dcs),
            0x1B => push_key(out, alt(KeyCode::Esc)),
            0x00..=0x7F => {
                if let Some(mut key) = ascii_key(byte) {
                    key.modifiers |= KeyModifiers::ALT;
                    push_key(out, key);
                }
            }
            _ => self.start_utf8(byte, true, out),
        }
    }

    fn begin_sequence(&mut self, state: ParserState) {
        self.state = state;
        self.buffer.clear();
        self.discard = false;
    }

    // ── CSI ──────────────────────────────────────────────────────────────

    fn push_sequence_byte(&mut self, byte: u8, limit: usize) {
        if self.buffer.len() >= limit {
            self.discard = true;
        } else {
            self.buffer.push(byte);
        }
    }

    /// Process byte while collecting CSI parameters.
    fn process_csi_param(&mut self, byte: u8, out: &mut Vec<ParsedEvent>) {
        match byte {
            0x30..=0x3F => self.push_sequence_byte(byte, MAX_CSI_LEN),
            0x20..=0x2F => {
                self.push_sequence_byte(byte, MAX_CSI_LEN);
                self.state = ParserState::CsiIntermediate;
            }
            0x40..=0x7E => self.finish_csi(byte, out),
            0x1B => {
                crate::trace!("CSI aborted by ESC");
                self.state = ParserState::Escape;
            }
            // C0 controls inside a sequence are ignored.
            0x00..=0x1F => {}
            _ => self.discard = true,
        }
    }

    fn process_csi_intermediate(&mut self, byte: u8, out: &mut Vec<ParsedEvent>) {
        match byte {
            0x20..=0x2F => self.push_sequence_byte(byte, MAX_CSI_LEN),
            0x30..=0x3F => self.discard = true,
            0x40..=0x7E => self.finish_csi(byte, out),
            0x1B => self.state = ParserState::Escape,
            0x00..=0x1F => {}
            _ => self.discard = true,
        }
    }

    fn finish_csi(&mut self, final_byte: u8, out: &mut Vec<ParsedEvent>) {
        let had_intermediate = self.state == ParserState::CsiIntermediate;
        self.state = ParserState::Ground;
        let params = std::mem::take(&mut self.buffer);
        if std::mem::take(&mut self.discard) || had_intermediate {
            crate::trace!(len = params.len(), final_byte, "dropping CSI sequence");
            return;
        }
        if let Some(parsed) = self.parse_csi_sequence(&params, final_byte) {
            out.push(parsed);
        }
        // Keep the allocation.
        self.buffer = params;
        self.buffer.clear();
    }

    /// Parse a complete CSI sequence.
    fn parse_csi_sequence(&mut self, params: &[u8], final_byte: u8) -> Option<ParsedEvent> {
        // Private markers: only SGR mouse is input; `?`, `>` and `=` prefix
        // replies to queries this crate never sends.
        if let Some((&marker, rest)) = params.split_first()
            && matches!(marker, b'<' | b'=' | b'>' | b'?')
        {
            return match (marker, final_byte) {
                (b'<', b'M' | b'm') => parse_sgr_mouse(rest, final_byte),
                _ => None,
            };
        }
        let params = std::str::from_utf8(params).ok()?;

        match (params, final_byte) {
            ("", b'I') => return Some(Event::FocusGained.into()),
            ("", b'O') => return Some(Event::FocusLost.into()),
            ("200", b'~') => {
                self.state = ParserState::PasteBody;
                self.paste.clear();
                self.paste_match = 0;
                return None;
            }
            // Stray end marker outside a paste.
            ("201", b'~') => return None,
            ("", b'Z') => {
                return Some(key_event(
                    KeyEvent::new(KeyCode::BackTab).with_modifiers(KeyModifiers::SHIFT),
                ));
            }
            _ => {}
        }

        match final_byte {
            b'R' => self.parse_csi_r(params),
            b'A' | b'B' | b'C' | b'D' | b'H' | b'F' | b'P' | b'Q' | b'S' => {
                let code = letter_key(final_byte)?;
                self.letter_key_event(code, params).map(key_event)
            }
            b'~' => self.parse_csi_tilde(params).map(key_event),
            b'u' => self.parse_kitty_keyboard(params).map(key_event),
            b't' => parse_resize(params),
            _ => None,
        }
    }

    /// `CSI R` is F3 or a cursor position report depending on its parameters
    /// and on whether a report is awaited.
    fn parse_csi_r(&self, params: &str) -> Option<ParsedEvent> {
        let position = parse_pair(params).map(|(row, column)| ParsedEvent::CursorPosition {
            column: column.saturating_sub(1),
            row: row.saturating_sub(1),
        });
        if self.expect_cursor_report && position.is_some() {
            return position;
        }
        self.letter_key_event(KeyCode::F(3), params)
            .map(key_event)
            .or(position)
    }

    /// Keys of the form `CSI [1 ; m[:e]] X`.
    fn letter_key_event(&self, code: KeyCode, params: &str) -> Option<KeyEvent> {
        if params.is_empty() {
            return Some(KeyEvent::new(code));
        }
        let (first, field) = params.split_once(';')?;
        // A bare mask of 1 is never sent for a key; `CSI 1;1 H` is cursor
        // addressing.
        if first != "1" || field == "1" {
            return None;
        }
        self.modified_key(code, field)
    }

    /// Parse CSI sequences ending in `~`.
    fn parse_csi_tilde(&self, params: &str) -> Option<KeyEvent> {
        let (number, field) = match params.split_once(';') {
            Some((number, field)) => (number, Some(field)),
            None => (params, None),
        };
        let number: u32 = number.parse().ok()?;
        let code = match number {
            1 | 7 => KeyCode::Home,
            2 => KeyCode::Insert,
            3 => KeyCode::Delete,
            4 | 8 => KeyCode::End,
            5 => KeyCode::PageUp,
            6 => KeyCode::PageDown,
            11..=15 => KeyCode::F(function_number(number - 10)),
            17..=21 => KeyCode::F(function_number(number - 11)),
            23..=26 => KeyCode::F(function_number(number - 12)),
            28 | 29 => KeyCode::F(function_number(number - 13)),
            31..=34 => KeyCode::F(function_number(number - 14)),
            57_427
                if self
                    .flags
                    .contains(KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES) =>
            {
                KeyCode::KeypadBegin
            }
            _ => return None,
        };
        let mut key = match field {
            Some(field) => self.modified_key(code, field)?,
            None => KeyEvent::new(code),
        };
        if code == KeyCode::KeypadBegin {
            key.state |= KeyEventState::KEYPAD;
        }
        Some(key)
    }

    /// Apply a `m[:e]` modifier field to `code`.
    fn modified_key(&self, code: KeyCode, field: &str) -> Option<KeyEvent> {
        let (modifiers, state, kind) = self.modifier_field(field)?;
        Some(
            KeyEvent::new(code)
                .with_modifiers(modifiers)
                .with_kind(kind)
                .with_state(state),
        )
    }

    /// Decode `m[:e]`. The kind is forced to `Press` unless event types are
    /// being reported.
    fn modifier_field(&self, field: &str) -> Option<(KeyModifiers, KeyEventState, KeyEventKind)> {
        let (mask, event) = match field.split_once(':') {
            Some((mask, event)) => (mask, Some(event)),
            None => (field, None),
        };
        let (modifiers, state) = if mask.is_empty() {
            (KeyModifiers::NONE, KeyEventState::NONE)
        } else {
            decode_modifier_mask(mask.parse().ok()?)?
        };
        let kind = match event {
            Some(event) => match event.parse::<u8>().ok()? {
                1 => KeyEventKind::Press,
                2 => KeyEventKind::Repeat,
                3 => KeyEventKind::Release,
                _ => return None,
            },
            None => KeyEventKind::Press,
        };
        let kind = if self
            .flags
            .contains(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        {
            kind
        } else {
            KeyEventKind::Press
        };
        Some((modifiers, state, kind))
    }

    /// Parse kitty keyboard protocol CSI u sequences.
    ///
    /// Format: `CSI code[:shifted[:base]] ; modifiers[:event] ; text u`
    fn parse_kitty_keyboard(&self, params: &str) -> Option<KeyEvent> {
        let mut fields = params.split(';');
        let mut key_parts = fields.next()?.split(':');
        let codepoint: u32 = key_parts.next()?.parse().ok()?;
        let shifted = key_parts
            .next()
            .filter(|s| !s.is_empty())
            .and_then(|s| s.parse::<u32>().ok())
            .and_then(char::from_u32);
        let field = fields.next().unwrap_or("");
        let text = fields.next();

        let (code, extra_state) = self.kitty_keycode(codepoint)?;
        let (mut modifiers, mut state, kind) = self.modifier_field(field)?;
        state |= extra_state;

        let mut code = code;
        if let KeyCode::Char(_) = code {
            if modifiers.contains(KeyModifiers::SHIFT)
                && let Some(shifted) = shifted
            {
                code = KeyCode::Char(shifted);
            }
            if let Some(ch) = text.and_then(associated_char) {
                code = KeyCode::Char(ch);
            }
        }
        if let KeyCode::Modifier(modifier) = code {
            modifiers |= modifier_key_flag(modifier);
        }

        Some(
            KeyEvent::new(code)
                .with_modifiers(modifiers)
                .with_kind(kind)
                .with_state(state),
        )
    }

    /// Map a kitty key number to a key code plus any implied state.
    ///
    /// Lock, media and modifier keys only exist when escape codes are being
    /// disambiguated.
    fn kitty_keycode(&self, codepoint: u32) -> Option<(KeyCode, KeyEventState)> {
        let disambiguate = self
            .flags
            .contains(KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES);
        let keypad = KeyEventState::KEYPAD;
        let plain = |code| Some((code, KeyEventState::NONE));
        let gated = |code| disambiguate.then_some((code, KeyEventState::NONE));

        match codepoint {
            9 => plain(KeyCode::Tab),
            13 => plain(KeyCode::Enter),
            27 => plain(KeyCode::Esc),
            8 | 127 => plain(KeyCode::Backspace),
            57_358 => gated(KeyCode::CapsLock),
            57_359 => gated(KeyCode::ScrollLock),
            57_360 => gated(KeyCode::NumLock),
            57_361 => gated(KeyCode::PrintScreen),
            57_362 => gated(KeyCode::Pause),
            57_363 => gated(KeyCode::Menu),
            57_376..=57_398 => plain(KeyCode::F(function_number(codepoint - 57_376 + 13))),
            57_399..=57_408 => {
                let digit = char::from_digit(codepoint - 57_399, 10)?;
                Some((KeyCode::Char(digit), keypad))
            }
            57_409..=57_426 => {
                let code = match codepoint {
                    57_409 => KeyCode::Char('.'),
                    57_410 => KeyCode::Char('/'),
                    57_411 => KeyCode::Char('*'),
                    57_412 => KeyCode::Char('-'),
                    57_413 => KeyCode::Char('+'),
                    57_414 => KeyCode::Enter,
                    57_415 => KeyCode::Char('='),
                    57_416 => KeyCode::Char(','),
                    57_417 => KeyCode::Left,
                    57_418 => KeyCode::Right,
                    57_419 => KeyCode::Up,
                    57_420 => KeyCode::Down,
                    57_421 => KeyCode::PageUp,
                    57_422 => KeyCode::PageDown,
                    57_423 => KeyCode::Home,
                    57_424 => KeyCode::End,
                    57_425 => KeyCode::Insert,
                    _ => KeyCode::Delete,
                };
                Some((code, keypad))
            }
            57_427 => disambiguate.then_some((KeyCode::KeypadBegin, keypad)),
            57_428..=57_440 => gated(KeyCode::Media(media_key(codepoint)?)),
            57_441..=57_454 => gated(KeyCode::Modifier(modifier_key(codepoint)?)),
            // Remaining private-use values are unassigned function keys.
            57_344..=63_743 => None,
            _ => char::from_u32(codepoint).map(|ch| (KeyCode::Char(ch), KeyEventState::NONE)),
        }
    }

    // ── SS3 ──────────────────────────────────────────────────────────────

    /// Process `ESC O x`.
    fn process_ss3(&mut self, byte: u8, out: &mut Vec<ParsedEvent>) {
        self.state = ParserState::Ground;
        let code = match byte {
            b'P' => KeyCode::F(1),
            b'Q' => KeyCode::F(2),
            b'R' => KeyCode::F(3),
            b'S' => KeyCode::F(4),
            b'A' => KeyCode::Up,
            b'B' => KeyCode::Down,
            b'C' => KeyCode::Right,
            b'D' => KeyCode::Left,
            b'H' => KeyCode::Home,
            b'F' => KeyCode::End,
            0x1B => {
                self.state = ParserState::Escape;
                return;
            }
            _ => return,
        };
        push_key(out, KeyEvent::new(code));
    }

    // ── OSC / DCS ────────────────────────────────────────────────────────

    fn process_string(&mut self, kind: StringKind, byte: u8) {
        match byte {
            0x07 => self.finish_string(),
            0x1B => self.state = ParserState::StringEscape(kind),
            _ => self.push_sequence_byte(byte, MAX_STRING_LEN),
        }
    }

    fn process_string_escape(&mut self, byte: u8, out: &mut Vec<ParsedEvent>) {
        if byte == b'\\' {
            self.finish_string();
            return;
        }
        // ESC not followed by `\` cancels the string and starts a new escape.
        crate::trace!("string cancelled by ESC");
        self.buffer.clear();
        self.discard = false;
        self.state = ParserState::Escape;
        self.process_escape(byte, out);
    }

    fn finish_string(&mut self) {
        crate::trace!(len = self.buffer.len(), overflow = self.discard, "discarding string");
        self.state = ParserState::Ground;
        self.buffer.clear();
        self.discard = false;
    }

    // ── Bracketed paste ──────────────────────────────────────────────────

    /// Process bytes between the paste markers.
    fn process_paste_byte(&mut self, byte: u8, out: &mut Vec<ParsedEvent>) {
        if byte == PASTE_END[self.paste_match] {
            self.paste_match += 1;
            if self.paste_match == PASTE_END.len() {
                self.state = ParserState::Ground;
                self.paste_match = 0;
                let text = String::from_utf8_lossy(&self.paste).into_owned();
                self.paste.clear();
                out.push(Event::Paste(text).into());
            }
            return;
        }

        // The partial terminator was content after all.
        let matched = std::mem::take(&mut self.paste_match);
        for i in 0..matched {
            self.push_paste(PASTE_END[i]);
        }
        if byte == PASTE_END[0] {
            self.paste_match = 1;
        } else {
            self.push_paste(byte);
        }
    }

    fn push_paste(&mut self, byte: u8) {
        if self.paste.len() < MAX_PASTE_LEN {
            self.paste.push(byte);
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────

fn push_key(out: &mut Vec<ParsedEvent>, key: KeyEvent) {
    out.push(key_event(key));
}

fn key_event(key: KeyEvent) -> ParsedEvent {
    ParsedEvent::Event(Event::Key(key))
}

fn alt(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code).with_modifiers(KeyModifiers::ALT)
}

fn replacement(with_alt: bool) -> KeyEvent {
    let key = KeyEvent::new(KeyCode::Char(char::REPLACEMENT_CHARACTER));
    if with_alt {
        key.with_modifiers(KeyModifiers::ALT)
    } else {
        key
    }
}

/// Key for a single byte below 0x80, other than ESC.
fn ascii_key(byte: u8) -> Option<KeyEvent> {
    let ctrl = |ch: u8| KeyEvent::new(KeyCode::Char(char::from(ch))).with_modifiers(KeyModifiers::CONTROL);
    let key = match byte {
        b'\r' | b'\n' => KeyEvent::new(KeyCode::Enter),
        b'\t' => KeyEvent::new(KeyCode::Tab),
        0x7F => KeyEvent::new(KeyCode::Backspace),
        0x00 => ctrl(b' '),
        0x01..=0x1A => ctrl(byte - 0x01 + b'a'),
        0x1C..=0x1F => ctrl(byte - 0x1C + b'4'),
        0x20..=0x7E => KeyEvent::new(KeyCode::Char(char::from(byte))),
        _ => return None,
    };
    Some(key)
}

fn letter_key(final_byte: u8) -> Option<KeyCode> {
    Some(match final_byte {
        b'A' => KeyCode::Up,
        b'B' => KeyCode::Down,
        b'C' => KeyCode::Right,
        b'D' => KeyCode::Left,
        b'H' => KeyCode::Home,
        b'F' => KeyCode::End,
        b'P' => KeyCode::F(1),
        b'Q' => KeyCode::F(2),
        b'S' => KeyCode::F(4),
        _ => return None,
    })
}

/// Function key numbers here come from fixed tables and always fit.
fn function_number(n: u32) -> u8 {
    u8::try_from(n).unwrap_or(KeyCode::MAX_FUNCTION_KEY)
}

/// Decode an xterm/kitty modifier parameter (`1 + bits`).
///
/// Bits: shift 1, alt 2, ctrl 4, super 8, hyper 16, meta 32, caps lock 64,
/// num lock 128.
fn decode_modifier_mask(value: u16) -> Option<(KeyModifiers, KeyEventState)> {
    let bits = u8::try_from(value.saturating_sub(1)).ok()?;
    let mut modifiers = KeyModifiers::NONE;
    for (bit, flag) in [
        (1, KeyModifiers::SHIFT),
        (2, KeyModifiers::ALT),
        (4, KeyModifiers::CONTROL),
        (8, KeyModifiers::SUPER),
        (16, KeyModifiers::HYPER),
        (32, KeyModifiers::META),
    ] {
        if bits & bit != 0 {
            modifiers |= flag;
        }
    }
    let mut state = KeyEventState::NONE;
    if bits & 64 != 0 {
        state |= KeyEventState::CAPS_LOCK;
    }
    if bits & 128 != 0 {
        state |= KeyEventState::NUM_LOCK;
    }
    Some((modifiers, state))
}

/// Associated text, colon-separated codepoints, when it is one character.
fn associated_char(text: &str) -> Option<char> {
    let mut chars = text
        .split(':')
        .map(|cp| cp.parse::<u32>().ok().and_then(char::from_u32));
    let first = chars.next()??;
    chars.next().is_none().then_some(first)
}

fn media_key(codepoint: u32) -> Option<MediaKeyCode> {
    Some(match codepoint {
        57_428 => MediaKeyCode::Play,
        57_429 => MediaKeyCode::Pause,
        57_430 => MediaKeyCode::PlayPause,
        57_431 => MediaKeyCode::Reverse,
        57_432 => MediaKeyCode::Stop,
        57_433 => MediaKeyCode::FastForward,
        57_434 => MediaKeyCode::Rewind,
        57_435 => MediaKeyCode::TrackNext,
        57_436 => MediaKeyCode::TrackPrevious,
        57_437 => MediaKeyCode::Record,
        57_438 => MediaKeyCode::LowerVolume,
        57_439 => MediaKeyCode::RaiseVolume,
        57_440 => MediaKeyCode::MuteVolume,
        _ => return None,
    })
}

fn modifier_key(codepoint: u32) -> Option<ModifierKeyCode> {
    Some(match codepoint {
        57_441 => ModifierKeyCode::LeftShift,
        57_442 => ModifierKeyCode::LeftControl,
        57_443 => ModifierKeyCode::LeftAlt,
        57_444 => ModifierKeyCode::LeftSuper,
        57_445 => ModifierKeyCode::LeftHyper,
        57_446 => ModifierKeyCode::LeftMeta,
        57_447 => ModifierKeyCode::RightShift,
        57_448 => ModifierKeyCode::RightControl,
        57_449 => ModifierKeyCode::RightAlt,
        57_450 => ModifierKeyCode::RightSuper,
        57_451 => ModifierKeyCode::RightHyper,
        57_452 => ModifierKeyCode::RightMeta,
        57_453 => ModifierKeyCode::IsoLevel3Shift,
        57_454 => ModifierKeyCode::IsoLevel5Shift,
        _ => return None,
    })
}

/// A modifier key counts as held while it is reported.
fn modifier_key_flag(key: ModifierKeyCode) -> KeyModifiers {
    match key {
        ModifierKeyCode::LeftShift | ModifierKeyCode::RightShift => KeyModifiers::SHIFT,
        ModifierKeyCode::LeftControl | ModifierKeyCode::RightControl => KeyModifiers::CONTROL,
        ModifierKeyCode::LeftAlt | ModifierKeyCode::RightAlt => KeyModifiers::ALT,
        ModifierKeyCode::LeftSuper | ModifierKeyCode::RightSuper => KeyModifiers::SUPER,
        ModifierKeyCode::LeftHyper | ModifierKeyCode::RightHyper => KeyModifiers::HYPER,
        ModifierKeyCode::LeftMeta | ModifierKeyCode::RightMeta => KeyModifiers::META,
        ModifierKeyCode::IsoLevel3Shift | ModifierKeyCode::IsoLevel5Shift => KeyModifiers::NONE,
    }
}

/// `a ; b` as two numbers.
fn parse_pair(params: &str) -> Option<(u16, u16)> {
    let (a, b) = params.split_once(';')?;
    Some((a.parse().ok()?, b.parse().ok()?))
}

/// `CSI 8 ; rows ; cols t`
fn parse_resize(params: &str) -> Option<ParsedEvent> {
    let rest = params.strip_prefix("8;")?;
    let (rows, columns) = parse_pair(rest)?;
    Some(Event::Resize(columns, rows).into())
}

/// Parse SGR mouse protocol events: `CSI < b ; x ; y M|m`.
fn parse_sgr_mouse(params: &[u8], final_byte: u8) -> Option<ParsedEvent> {
    let params = std::str::from_utf8(params).ok()?;
    let mut parts = params.split(';');
    let cb: u16 = parts.next()?.parse().ok()?;
    let x: u16 = parts.next()?.parse().ok()?;
    let y: u16 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }

    let button_number = (cb & 0b11) | ((cb & 0b1100_0000) >> 4);
    let motion = cb & 0b10_0000 != 0;
    let button = |n| match n {
        0 => Some(MouseButton::Left),
        1 => Some(MouseButton::Middle),
        2 => Some(MouseButton::Right),
        _ => None,
    };

    let kind = match (button_number, motion) {
        (0..=2, true) => MouseEventKind::Drag(button(button_number)?),
        (0..=2, false) if final_byte == b'm' => MouseEventKind::Up(button(button_number)?),
        (0..=2, false) => MouseEventKind::Down(button(button_number)?),
        (3..=5, true) => MouseEventKind::Moved,
        (4, false) => MouseEventKind::ScrollUp,
        (5, false) => MouseEventKind::ScrollDown,
        // Horizontal scroll and extra buttons have no representation.
        _ => return None,
    };

    let mut modifiers = KeyModifiers::NONE;
    if cb & 4 != 0 {
        modifiers |= KeyModifiers::SHIFT;
    }
    if cb & 8 != 0 {
        modifiers |= KeyModifiers::ALT;
    }
    if cb & 16 != 0 {
        modifiers |= KeyModifiers::CONTROL;
    }

    Some(
        Event::Mouse(
            MouseEvent::new(kind, x.saturating_sub(1), y.saturating_sub(1))
                .with_modifiers(modifiers),
        )
        .into(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code))
    }

    fn key_with(code: KeyCode, modifiers: KeyModifiers) -> Event {
        Event::Key(KeyEvent::new(code).with_modifiers(modifiers))
    }

    fn kitty_parser(flags: KeyboardEnhancementFlags) -> InputParser {
        let mut parser = InputParser::new();
        parser.set_enhancement_flags(flags);
        parser
    }

    #[test]
    fn ascii_characters_parsed() {
        let mut parser = InputParser::new();
        assert_eq!(
            parser.parse(b"abc"),
            vec![
                key(KeyCode::Char('a')),
                key(KeyCode::Char('b')),
                key(KeyCode::Char('c'))
            ]
        );
    }

    #[test]
    fn control_characters() {
        let mut parser = InputParser::new();
        assert_eq!(
            parser.parse(&[0x01]),
            vec![key_with(KeyCode::Char('a'), KeyModifiers::CONTROL)]
        );
        assert_eq!(parser.parse(&[0x7F]), vec![key(KeyCode::Backspace)]);
        assert_eq!(parser.parse(b"\r\n"), vec![key(KeyCode::Enter), key(KeyCode::Enter)]);
        assert_eq!(parser.parse(b"\t"), vec![key(KeyCode::Tab)]);
        assert_eq!(
            parser.parse(&[0x00]),
            vec![key_with(KeyCode::Char(' '), KeyModifiers::CONTROL)]
        );
        assert_eq!(
            parser.parse(&[0x1C, 0x1F]),
            vec![
                key_with(KeyCode::Char('4'), KeyModifiers::CONTROL),
                key_with(KeyCode::Char('7'), KeyModifiers::CONTROL)
            ]
        );
    }

    #[test]
    fn arrow_keys() {
        let mut parser = InputParser::new();
        let expected = Event::Key(KeyEvent {
            code: KeyCode::Up,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        });
        assert_eq!(parser.parse(&[0x1B, 0x5B, 0x41]), vec![expected]);
        assert_eq!(parser.parse(b"\x1b[B"), vec![key(KeyCode::Down)]);
        assert_eq!(parser.parse(b"\x1b[C"), vec![key(KeyCode::Right)]);
        assert_eq!(parser.parse(b"\x1b[D"), vec![key(KeyCode::Left)]);
        assert_eq!(parser.parse(b"\x1b[H"), vec![key(KeyCode::Home)]);
        assert_eq!(parser.parse(b"\x1b[F"), vec![key(KeyCode::End)]);
    }

    #[test]
    fn function_keys_ss3() {
        let mut parser = InputParser::new();
        assert_eq!(parser.parse(b"\x1bOP"), vec![key(KeyCode::F(1))]);
        assert_eq!(parser.parse(b"\x1bOQ"), vec![key(KeyCode::F(2))]);
        assert_eq!(parser.parse(b"\x1bOR"), vec![key(KeyCode::F(3))]);
        assert_eq!(parser.parse(b"\x1bOS"), vec![key(KeyCode::F(4))]);
        assert_eq!(parser.parse(b"\x1bOA"), vec![key(KeyCode::Up)]);
    }

    #[test]
    fn function_keys_csi() {
        let mut parser = InputParser::new();
        let cases: &[(&[u8], KeyCode)] = &[
            (b"\x1b[11~", KeyCode::F(1)),
            (b"\x1b[15~", KeyCode::F(5)),
            (b"\x1b[17~", KeyCode::F(6)),
            (b"\x1b[21~", KeyCode::F(10)),
            (b"\x1b[23~", KeyCode::F(11)),
            (b"\x1b[26~", KeyCode::F(14)),
            (b"\x1b[28~", KeyCode::F(15)),
            (b"\x1b[29~", KeyCode::F(16)),
            (b"\x1b[31~", KeyCode::F(17)),
            (b"\x1b[34~", KeyCode::F(20)),
            (b"\x1b[2~", KeyCode::Insert),
            (b"\x1b[3~", KeyCode::Delete),
            (b"\x1b[5~", KeyCode::PageUp),
            (b"\x1b[6~", KeyCode::PageDown),
            (b"\x1b[7~", KeyCode::Home),
            (b"\x1b[8~", KeyCode::End),
        ];
        for (input, code) in cases {
            assert_eq!(parser.parse(input), vec![key(*code)], "{input:?}");
        }
        assert!(parser.parse(b"\x1b[99~").is_empty());
    }

    #[test]
    fn modifiers_in_csi() {
        let mut parser = InputParser::new();
        assert_eq!(
            parser.parse(b"\x1b[1;2A"),
            vec![key_with(KeyCode::Up, KeyModifiers::SHIFT)]
        );
        assert_eq!(
            parser.parse(b"\x1b[1;5A"),
            vec![key_with(KeyCode::Up, KeyModifiers::CONTROL)]
        );
        assert_eq!(
            parser.parse(b"\x1b[3;3~"),
            vec![key_with(KeyCode::Delete, KeyModifiers::ALT)]
        );
        assert_eq!(
            parser.parse(b"\x1b[1;8P"),
            vec![key_with(
                KeyCode::F(1),
                KeyModifiers::SHIFT | KeyModifiers::ALT | KeyModifiers::CONTROL
            )]
        );
    }

    #[test]
    fn letter_keys_reject_output_shapes() {
        let mut parser = InputParser::new();
        // Cursor motion and scrolling, as this crate encodes them.
        assert!(parser.parse(b"\x1b[3A\x1b[1C\x1b[2S\x1b[0D\x1b[4;7H").is_empty());
        assert!(parser.is_idle());
    }

    #[test]
    fn home_at_origin_is_cursor_addressing() {
        let mut parser = InputParser::new();
        assert!(parser.feed(b"\x1b[1;1H", Duration::ZERO).is_empty());
        assert!(parser.feed(b"\x1b[1;1A\x1b[1;1P", Duration::ZERO).is_empty());
        assert!(parser.is_idle());
        // An explicit event type still makes it a key.
        assert_eq!(parser.parse(b"\x1b[1;1:1H"), vec![key(KeyCode::Home)]);
        assert_eq!(
            parser.parse(b"\x1b[1;2H"),
            vec![key_with(KeyCode::Home, KeyModifiers::SHIFT)]
        );
        // Unexpected and at the origin: a stale report, not F3.
        assert_eq!(
            parser.feed(b"\x1b[1;1R", Duration::ZERO),
            vec![ParsedEvent::CursorPosition { column: 0, row: 0 }]
        );
    }

    #[test]
    fn backtab() {
        let mut parser = InputParser::new();
        assert_eq!(
            parser.parse(b"\x1b[Z"),
            vec![key_with(KeyCode::BackTab, KeyModifiers::SHIFT)]
        );
    }

    #[test]
    fn f3_versus_cursor_report() {
        let mut parser = InputParser::new();
        assert_eq!(parser.parse(b"\x1b[R"), vec![key(KeyCode::F(3))]);
        assert_eq!(
            parser.feed(b"\x1b[1;5R", Duration::ZERO),
            vec![ParsedEvent::Event(key_with(KeyCode::F(3), KeyModifiers::CONTROL))]
        );
        assert_eq!(
            parser.feed(b"\x1b[12;40R", Duration::ZERO),
            vec![ParsedEvent::CursorPosition { column: 39, row: 11 }]
        );

        parser.set_cursor_report_expected(true);
        assert_eq!(
            parser.feed(b"\x1b[1;5R", Duration::ZERO),
            vec![ParsedEvent::CursorPosition { column: 4, row: 0 }]
        );
        // Cursor reports never reach `parse`.
        assert!(parser.parse(b"\x1b[3;3R").is_empty());
    }

    #[test]
    fn kitty_keyboard_basic_char() {
        let mut parser = InputParser::new();
        assert_eq!(parser.parse(b"\x1b[97u"), vec![key(KeyCode::Char('a'))]);
        assert_eq!(parser.parse(b"\x1b[27u"), vec![key(KeyCode::Esc)]);
        assert_eq!(parser.parse(b"\x1b[13;3u"), vec![key_with(KeyCode::Enter, KeyModifiers::ALT)]);
    }

    #[test]
    fn kitty_kind_requires_event_type_flag() {
        let mut parser = InputParser::new();
        assert_eq!(
            parser.parse(b"\x1b[97;5:3u"),
            vec![key_with(KeyCode::Char('a'), KeyModifiers::CONTROL)]
        );

        let mut parser = kitty_parser(KeyboardEnhancementFlags::REPORT_EVENT_TYPES);
        assert_eq!(
            parser.parse(b"\x1b[97;5:2u"),
            vec![Event::Key(
                KeyEvent::new(KeyCode::Char('a'))
                    .with_modifiers(KeyModifiers::CONTROL)
                    .with_kind(KeyEventKind::Repeat)
            )]
        );
        assert_eq!(
            parser.parse(b"\x1b[1;1:3B"),
            vec![Event::Key(KeyEvent::new(KeyCode::Down).with_kind(KeyEventKind::Release))]
        );
    }

    #[test]
    fn kitty_function_and_keypad_keys() {
        let mut parser = InputParser::new();
        assert_eq!(parser.parse(b"\x1b[57376u"), vec![key(KeyCode::F(13))]);
        assert_eq!(parser.parse(b"\x1b[57398u"), vec![key(KeyCode::F(35))]);
        assert_eq!(
            parser.parse(b"\x1b[57400u"),
            vec![Event::Key(
                KeyEvent::new(KeyCode::Char('1')).with_state(KeyEventState::KEYPAD)
            )]
        );
        assert_eq!(
            parser.parse(b"\x1b[57414u"),
            vec![Event::Key(KeyEvent::new(KeyCode::Enter).with_state(KeyEventState::KEYPAD))]
        );
        assert!(parser.parse(b"\x1b[57370u").is_empty());
    }

    #[test]
    fn kitty_lock_media_and_modifier_keys_are_gated() {
        let mut parser = InputParser::new();
        assert!(parser.parse(b"\x1b[57358u").is_empty());
        assert!(parser.parse(b"\x1b[57428u").is_empty());
        assert!(parser.parse(b"\x1b[57427u").is_empty());
        assert!(parser.parse(b"\x1b[57427~").is_empty());
        assert!(parser.is_idle());

        let mut parser = kitty_parser(KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES);
        assert_eq!(parser.parse(b"\x1b[57358u"), vec![key(KeyCode::CapsLock)]);
        assert_eq!(parser.parse(b"\x1b[57363u"), vec![key(KeyCode::Menu)]);
        assert_eq!(
            parser.parse(b"\x1b[57430u"),
            vec![key(KeyCode::Media(MediaKeyCode::PlayPause))]
        );
        assert_eq!(
            parser.parse(b"\x1b[57441;2u"),
            vec![key_with(
                KeyCode::Modifier(ModifierKeyCode::LeftShift),
                KeyModifiers::SHIFT
            )]
        );
        assert_eq!(
            parser.parse(b"\x1b[57449u"),
            vec![key_with(
                KeyCode::Modifier(ModifierKeyCode::RightAlt),
                KeyModifiers::ALT
            )]
        );
        assert_eq!(
            parser.parse(b"\x1b[57427u"),
            vec![Event::Key(
                KeyEvent::new(KeyCode::KeypadBegin).with_state(KeyEventState::KEYPAD)
            )]
        );
        assert_eq!(
            parser.parse(b"\x1b[57427~"),
            vec![Event::Key(
                KeyEvent::new(KeyCode::KeypadBegin).with_state(KeyEventState::KEYPAD)
            )]
        );
    }

    #[test]
    fn kitty_lock_state_bits() {
        let mut parser = InputParser::new();
        // 1 + caps(64) + num(128)
        assert_eq!(
            parser.parse(b"\x1b[97;193u"),
            vec![Event::Key(
                KeyEvent::new(KeyCode::Char('a'))
                    .with_state(KeyEventState::CAPS_LOCK | KeyEventState::NUM_LOCK)
            )]
        );
        assert_eq!(
            parser.parse(b"\x1b[97;49u"),
            vec![key_with(
                KeyCode::Char('a'),
                KeyModifiers::HYPER | KeyModifiers::META
            )]
        );
    }

    #[test]
    fn kitty_alternate_key_and_text() {
        let mut parser = InputParser::new();
        assert_eq!(
            parser.parse(b"\x1b[97:65;2u"),
            vec![key_with(KeyCode::Char('A'), KeyModifiers::SHIFT)]
        );
        // Shifted key ignored without Shift.
        assert_eq!(parser.parse(b"\x1b[97:65u"), vec![key(KeyCode::Char('a'))]);
        // Associated text wins.
        assert_eq!(
            parser.parse(b"\x1b[97;;233u"),
            vec![key(KeyCode::Char('é'))]
        );
        assert_eq!(
            parser.parse(b"\x1b[97;1;104:105u"),
            vec![key(KeyCode::Char('a'))]
        );
    }

    #[test]
    fn alt_key_escapes() {
        let mut parser = InputParser::new();
        assert_eq!(
            parser.parse(b"\x1ba"),
            vec![key_with(KeyCode::Char('a'), KeyModifiers::ALT)]
        );
        assert_eq!(
            parser.parse(b"\x1b\r"),
            vec![key_with(KeyCode::Enter, KeyModifiers::ALT)]
        );
        assert_eq!(
            parser.parse(b"\x1b\x01"),
            vec![key_with(
                KeyCode::Char('a'),
                KeyModifiers::CONTROL | KeyModifiers::ALT
            )]
        );
        assert_eq!(
            parser.parse("\x1bé".as_bytes()),
            vec![key_with(KeyCode::Char('é'), KeyModifiers::ALT)]
        );
    }

    #[test]
    fn double_escape_is_alt_escape() {
        let mut parser = InputParser::new();
        assert_eq!(
            parser.feed(&[0x1B, 0x1B], Duration::ZERO),
            vec![ParsedEvent::Event(key_with(KeyCode::Esc, KeyModifiers::ALT))]
        );
        assert!(parser.is_idle());
    }

    #[test]
    fn lone_escape_waits_for_timeout() {
        let mut parser = InputParser::new().with_escape_timeout(100 * MS);
        assert!(parser.feed(&[0x1B], Duration::ZERO).is_empty());
        assert_eq!(parser.escape_deadline(), Some(100 * MS));
        assert!(parser.poll_timeout(99 * MS).is_empty());
        assert_eq!(
            parser.poll_timeout(100 * MS),
            vec![ParsedEvent::Event(key(KeyCode::Esc))]
        );
        assert_eq!(parser.escape_deadline(), None);
        assert!(parser.poll_timeout(500 * MS).is_empty());
    }

    #[test]
    fn late_byte_after_escape_is_separate_key() {
        let mut parser = InputParser::new().with_escape_timeout(100 * MS);
        parser.feed(&[0x1B], Duration::ZERO);
        assert_eq!(
            parser.feed(b"a", 150 * MS),
            vec![
                ParsedEvent::Event(key(KeyCode::Esc)),
                ParsedEvent::Event(key(KeyCode::Char('a')))
            ]
        );
    }

    #[test]
    fn split_sequence_within_timeout_completes() {
        let mut parser = InputParser::new().with_escape_timeout(100 * MS);
        assert!(parser.feed(b"\x1b", Duration::ZERO).is_empty());
        assert!(parser.feed(b"[1;", 20 * MS).is_empty());
        assert_eq!(
            parser.feed(b"2A", 40 * MS),
            vec![ParsedEvent::Event(key_with(KeyCode::Up, KeyModifiers::SHIFT))]
        );
    }

    #[test]
    fn stalled_csi_prefix_becomes_alt_bracket() {
        let mut parser = InputParser::new().with_escape_timeout(100 * MS);
        parser.feed(b"\x1b[1", Duration::ZERO);
        assert_eq!(
            parser.poll_timeout(100 * MS),
            vec![
                ParsedEvent::Event(key_with(KeyCode::Char('['), KeyModifiers::ALT)),
                ParsedEvent::Event(key(KeyCode::Char('1')))
            ]
        );
        assert!(parser.is_idle());
    }

    #[test]
    fn stalled_string_with_trailing_escape() {
        let mut parser = InputParser::new().with_escape_timeout(10 * MS);
        parser.feed(b"\x1b]x\x1b", Duration::ZERO);
        assert_eq!(
            parser.poll_timeout(10 * MS),
            vec![
                ParsedEvent::Event(key_with(KeyCode::Char(']'), KeyModifiers::ALT)),
                ParsedEvent::Event(key(KeyCode::Char('x'))),
                ParsedEvent::Event(key(KeyCode::Esc)),
            ]
        );
    }

    #[test]
    fn focus_events() {
        let mut parser = InputParser::new();
        assert_eq!(parser.parse(b"\x1b[I"), vec![Event::FocusGained]);
        assert_eq!(parser.parse(b"\x1b[O"), vec![Event::FocusLost]);
    }

    #[test]
    fn resize_report() {
        let mut parser = InputParser::new();
        assert_eq!(parser.parse(b"\x1b[8;24;80t"), vec![Event::Resize(80, 24)]);
        assert!(parser.parse(b"\x1b[4;24;80t").is_empty());
    }

    #[test]
    fn bracketed_paste() {
        let mut parser = InputParser::new();
        let mut input = b"\x1b[200~".to_vec();
        input.extend_from_slice(b"Hi");
        input.extend_from_slice(b"\x1b[201~");
        assert_eq!(parser.parse(&input), vec![Event::Paste("Hi".into())]);
    }

    #[test]
    fn paste_keeps_escape_bytes_and_split_terminator() {
        let mut parser = InputParser::new();
        assert!(parser.parse(b"\x1b[200~a\x1b[A\x1b[20").is_empty());
        assert!(parser.parse(b"1").is_empty());
        assert_eq!(
            parser.parse(b"~z"),
            vec![Event::Paste("a\x1b[A".into()), key(KeyCode::Char('z'))]
        );
    }

    #[test]
    fn paste_with_partial_terminator_then_escape() {
        let mut parser = InputParser::new();
        assert_eq!(
            parser.parse(b"\x1b[200~\x1b[2\x1b[201~"),
            vec![Event::Paste("\x1b[2".into())]
        );
    }

    #[test]
    fn paste_is_not_timed() {
        let mut parser = InputParser::new().with_escape_timeout(MS);
        parser.feed(b"\x1b[200~abc", Duration::ZERO);
        assert_eq!(parser.escape_deadline(), None);
        assert!(parser.poll_timeout(Duration::from_secs(10)).is_empty());
        assert_eq!(
            parser.feed(b"\x1b[201~", Duration::from_secs(10)),
            vec![ParsedEvent::Event(Event::Paste("abc".into()))]
        );
    }

    #[test]
    fn paste_invalid_utf8_is_lossy() {
        let mut parser = InputParser::new();
        assert_eq!(
            parser.parse(b"\x1b[200~a\xffb\x1b[201~"),
            vec![Event::Paste("a\u{FFFD}b".into())]
        );
    }

    #[test]
    fn stray_paste_end_is_dropped() {
        let mut parser = InputParser::new();
        assert!(parser.parse(b"\x1b[201~").is_empty());
    }

    #[test]
    fn mouse_sgr_protocol() {
        let mut parser = InputParser::new();
        assert_eq!(
            parser.parse(&[0x1B, 0x5B, 0x3C, 0x30, 0x3B, 0x35, 0x3B, 0x31, 0x30, 0x4D]),
            vec![Event::Mouse(MouseEvent::new(
                MouseEventKind::Down(MouseButton::Left),
                4,
                9
            ))]
        );
        assert_eq!(
            parser.parse(b"\x1b[<2;1;1m"),
            vec![Event::Mouse(MouseEvent::new(
                MouseEventKind::Up(MouseButton::Right),
                0,
                0
            ))]
        );
    }

    #[test]
    fn mouse_motion_scroll_and_modifiers() {
        let mut parser = InputParser::new();
        assert_eq!(
            parser.parse(b"\x1b[<33;3;4M"),
            vec![Event::Mouse(MouseEvent::new(
                MouseEventKind::Drag(MouseButton::Middle),
                2,
                3
            ))]
        );
        assert_eq!(
            parser.parse(b"\x1b[<35;3;4M"),
            vec![Event::Mouse(MouseEvent::new(MouseEventKind::Moved, 2, 3))]
        );
        assert_eq!(
            parser.parse(b"\x1b[<64;1;1M"),
            vec![Event::Mouse(MouseEvent::new(MouseEventKind::ScrollUp, 0, 0))]
        );
        assert_eq!(
            parser.parse(b"\x1b[<81;1;1M"),
            vec![Event::Mouse(
                MouseEvent::new(MouseEventKind::ScrollDown, 0, 0)
                    .with_modifiers(KeyModifiers::CONTROL)
            )]
        );
        assert_eq!(
            parser.parse(b"\x1b[<12;5;5M"),
            vec![Event::Mouse(
                MouseEvent::new(MouseEventKind::Down(MouseButton::Left), 4, 4)
                    .with_modifiers(KeyModifiers::SHIFT | KeyModifiers::ALT)
            )]
        );
        // Horizontal scroll has no event.
        assert!(parser.parse(b"\x1b[<66;1;1M").is_empty());
    }

    #[test]
    fn private_marker_replies_are_dropped() {
        let mut parser = InputParser::new();
        assert!(parser.parse(b"\x1b[?1u\x1b[>1;2c\x1b[?62;c").is_empty());
        assert!(parser.is_idle());
    }

    #[test]
    fn utf8_characters() {
        let mut parser = InputParser::new();
        assert_eq!(parser.parse(&[0xC3, 0xA9]), vec![key(KeyCode::Char('é'))]);
        assert_eq!(
            parser.parse("日🎉".as_bytes()),
            vec![key(KeyCode::Char('日')), key(KeyCode::Char('🎉'))]
        );
    }

    #[test]
    fn utf8_split_across_feeds() {
        let mut parser = InputParser::new();
        assert!(parser.parse(&[0xE6, 0x97]).is_empty());
        assert_eq!(parser.parse(&[0xA5]), vec![key(KeyCode::Char('日'))]);
    }

    #[test]
    fn invalid_utf8_becomes_replacement_and_reprocesses() {
        let mut parser = InputParser::new();
        assert_eq!(
            parser.parse(&[0xC3, b'a']),
            vec![
                key(KeyCode::Char(char::REPLACEMENT_CHARACTER)),
                key(KeyCode::Char('a'))
            ]
        );
        assert_eq!(
            parser.parse(&[0x80, 0xFF]),
            vec![
                key(KeyCode::Char(char::REPLACEMENT_CHARACTER)),
                key(KeyCode::Char(char::REPLACEMENT_CHARACTER))
            ]
        );
        // Surrogate encoding decodes to the replacement character too.
        assert_eq!(
            parser.parse(&[0xED, 0xA0, 0x80]),
            vec![key(KeyCode::Char(char::REPLACEMENT_CHARACTER))]
        );
    }

    #[test]
    fn osc_and_dcs_are_discarded() {
        let mut parser = InputParser::new();
        assert_eq!(
            parser.parse(b"\x1b]11;rgb:0000/0000/0000\x07x"),
            vec![key(KeyCode::Char('x'))]
        );
        assert_eq!(
            parser.parse(b"\x1bP1$r0m\x1b\\y"),
            vec![key(KeyCode::Char('y'))]
        );
    }

    #[test]
    fn escape_inside_string_starts_new_sequence() {
        let mut parser = InputParser::new();
        assert_eq!(parser.parse(b"\x1b]junk\x1b[A"), vec![key(KeyCode::Up)]);
    }

    #[test]
    fn dos_protection_csi() {
        let mut parser = InputParser::new();
        let mut seq = vec![0x1B, b'['];
        seq.extend(std::iter::repeat_n(b'0', MAX_CSI_LEN + 100));
        seq.push(b'A');
        assert!(parser.parse(&seq).is_empty());
        assert!(parser.is_idle());
        assert_eq!(parser.parse(b"\x1b[A"), vec![key(KeyCode::Up)]);
    }

    #[test]
    fn dos_protection_osc() {
        let mut parser = InputParser::new();
        let mut seq = b"\x1b]".to_vec();
        seq.extend(std::iter::repeat_n(b'x', MAX_STRING_LEN * 2));
        seq.push(0x07);
        assert!(parser.parse(&seq).is_empty());
        assert_eq!(parser.parse(b"q"), vec![key(KeyCode::Char('q'))]);
    }

    #[test]
    fn dos_protection_paste() {
        let mut parser = InputParser::new();
        parser.parse(b"\x1b[200~");
        parser.parse(&vec![b'x'; MAX_PASTE_LEN + 100]);
        let events = parser.parse(b"\x1b[201~");
        assert!(matches!(
            events.as_slice(),
            [Event::Paste(text)] if text.len() == MAX_PASTE_LEN
        ));
        assert!(parser.is_idle());
    }

    #[test]
    fn recent_bytes_ring() {
        let mut parser = InputParser::new();
        parser.parse(&[b'a'; 100]);
        parser.parse(b"xyz");
        let recent = parser.recent_bytes();
        assert_eq!(recent.len(), RECENT_BYTES);
        assert!(recent.ends_with(b"xyz"));
    }

    #[test]
    fn no_panic_on_invalid_input() {
        let mut parser = InputParser::new();
        let garbage = [
            0xFF, 0xFE, 0x00, 0x1B, 0x1B, 0x1B, b'[', 0xFF, b']', 0x00, 0x1B, b'P', 0x1B,
            b'[', b'<', b';', b'M', 0xF4, 0x90,
        ];
        let _ = parser.parse(&garbage);
        let _ = parser.poll_timeout(Duration::from_secs(60));
        assert!(parser.is_idle());
    }
}
