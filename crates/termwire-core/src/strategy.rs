#![forbid(unsafe_code)]

//! Output strategies: how a [`Command`] takes effect.
//!
//! The [`OutputQueue`](crate::output_queue::OutputQueue) owns one byte
//! buffer. A strategy appends bytes to it, and may also anchor side effects
//! ("barriers") at byte offsets in that buffer. During flush the queue writes
//! bytes up to the next barrier, flushes the writer, asks the strategy to
//! apply the barrier, and continues. Printed text and console calls therefore
//! happen in the order they were queued.
//!
//! - [`AnsiStrategy`] emits escape sequences and never anchors anything.
//! - [`LegacyConsole`] emits only `Print` bytes and turns the rest into
//!   [`ConsoleApi`] calls.

use std::collections::VecDeque;
use std::io;

use crate::ansi;
use crate::command::{ClearType, Command};
use crate::error::{Error, Result};
use crate::style::{Attribute, Color};

/// Turns commands into queued bytes and deferred effects.
///
/// # Contract
///
/// - `encode` either succeeds, or fails having appended nothing to `out` and
///   recorded nothing.
/// - Barrier offsets are positions in the queue buffer, non-decreasing, and
///   never beyond its length.
/// - `consumed(n)` is called after the first `n` bytes left the buffer;
///   offsets shift down by `n`.
pub trait Strategy {
    /// Name used in [`Error::Unsupported`].
    fn name(&self) -> &'static str;

    /// Append the effect of `command` to `out`.
    fn encode(&mut self, command: &Command, out: &mut Vec<u8>) -> Result<()>;

    /// Offset of the earliest pending barrier.
    fn next_barrier(&self) -> Option<usize> {
        None
    }

    /// Carry out the earliest pending barrier. Called once every byte before
    /// it has been written and the writer flushed.
    fn apply_barrier(&mut self) -> Result<()> {
        Ok(())
    }

    /// The first `n` buffered bytes were written and removed.
    fn consumed(&mut self, n: usize) {
        let _ = n;
    }
}

// =============================================================================
// ANSI
// =============================================================================

/// Escape-sequence strategy for VT-compatible terminals.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnsiStrategy;

impl Strategy for AnsiStrategy {
    fn name(&self) -> &'static str {
        "ansi"
    }

    fn encode(&mut self, command: &Command, out: &mut Vec<u8>) -> Result<()> {
        ansi::write_command(out, command)?;
        Ok(())
    }
}

// =============================================================================
// Legacy Console
// =============================================================================

/// Console calls needed by [`LegacyConsole`].
///
/// Coordinates are 0-based `(column, row)`.
pub trait ConsoleApi {
    fn cursor_position(&mut self) -> io::Result<(u16, u16)>;
    fn set_cursor_position(&mut self, column: u16, row: u16) -> io::Result<()>;
    fn set_cursor_visibility(&mut self, visible: bool) -> io::Result<()>;
    fn set_foreground(&mut self, color: Color) -> io::Result<()>;
    fn set_background(&mut self, color: Color) -> io::Result<()>;
    /// Restore the console's default colors.
    fn reset_colors(&mut self) -> io::Result<()>;
    fn clear(&mut self, kind: ClearType) -> io::Result<()>;
    /// Scroll the buffer contents; positive moves text up.
    fn scroll(&mut self, lines: i32) -> io::Result<()>;
    fn set_size(&mut self, columns: u16, rows: u16) -> io::Result<()>;
    fn size(&mut self) -> io::Result<(u16, u16)>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConsoleOp {
    MoveTo(u16, u16),
    /// Relative move; `to_line_start` also sends the cursor to column 0.
    MoveBy {
        dx: i32,
        dy: i32,
        to_line_start: bool,
    },
    MoveToColumn(u16),
    MoveToRow(u16),
    Visibility(bool),
    Foreground(Color),
    Background(Color),
    ResetColors,
    Clear(ClearType),
    Scroll(i32),
    SetSize(u16, u16),
    Save,
    Restore,
}

/// Strategy for consoles that do not understand escape sequences.
///
/// Only `Print` contributes bytes. Every other supported command becomes a
/// console call anchored at the current end of the buffer, so it runs after
/// the text queued before it and before the text queued after it.
/// Relative motion is resolved against the console's cursor at apply time.
#[derive(Debug)]
pub struct LegacyConsole<C: ConsoleApi> {
    console: C,
    pending: VecDeque<(usize, ConsoleOp)>,
    saved: Option<(u16, u16)>,
}

impl<C: ConsoleApi> LegacyConsole<C> {
    pub fn new(console: C) -> Self {
        Self {
            console,
            pending: VecDeque::new(),
            saved: None,
        }
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    pub fn console_mut(&mut self) -> &mut C {
        &mut self.console
    }

    /// Console calls queued but not yet applied.
    #[must_use]
    pub fn pending_ops(&self) -> usize {
        self.pending.len()
    }

    fn unsupported(&self, command: &Command) -> Error {
        Error::Unsupported {
            command: command.name(),
            strategy: self.name(),
        }
    }

    fn translate(&self, command: &Command) -> Result<Vec<ConsoleOp>> {
        let up = |n: u16| -i32::from(n);
        let ops = match command {
            Command::MoveTo(column, row) => vec![ConsoleOp::MoveTo(*column, *row)],
            Command::MoveUp(n) => vec![ConsoleOp::MoveBy { dx: 0, dy: up(*n), to_line_start: false }],
            Command::MoveDown(n) => vec![ConsoleOp::MoveBy { dx: 0, dy: i32::from(*n), to_line_start: false }],
            Command::MoveLeft(n) => vec![ConsoleOp::MoveBy { dx: up(*n), dy: 0, to_line_start: false }],
            Command::MoveRight(n) => vec![ConsoleOp::MoveBy { dx: i32::from(*n), dy: 0, to_line_start: false }],
            Command::MoveToNextLine(n) => vec![ConsoleOp::MoveBy { dx: 0, dy: i32::from(*n), to_line_start: true }],
            Command::MoveToPreviousLine(n) => vec![ConsoleOp::MoveBy { dx: 0, dy: up(*n), to_line_start: true }],
            Command::MoveToColumn(column) => vec![ConsoleOp::MoveToColumn(*column)],
            Command::MoveToRow(row) => vec![ConsoleOp::MoveToRow(*row)],
            Command::SavePosition => vec![ConsoleOp::Save],
            Command::RestorePosition => vec![ConsoleOp::Restore],
            Command::Show => vec![ConsoleOp::Visibility(true)],
            Command::Hide => vec![ConsoleOp::Visibility(false)],
            Command::SetForegroundColor(color) => vec![ConsoleOp::Foreground(*color)],
            Command::SetBackgroundColor(color) => vec![ConsoleOp::Background(*color)],
            Command::SetColors(colors) => colors
                .foreground
                .map(ConsoleOp::Foreground)
                .into_iter()
                .chain(colors.background.map(ConsoleOp::Background))
                .collect(),
            Command::ResetColor => vec![ConsoleOp::ResetColors],
            Command::SetAttribute(Attribute::Reset) => vec![ConsoleOp::ResetColors],
            Command::SetAttributes(attributes)
                if attributes.iter().all(|a| *a == Attribute::Reset) =>
            {
                if attributes.is_empty() {
                    Vec::new()
                } else {
                    vec![ConsoleOp::ResetColors]
                }
            }
            Command::SetStyle(style)
                if style.underline.is_none() && style.attributes.is_empty() =>
            {
                style
                    .foreground
                    .map(ConsoleOp::Foreground)
                    .into_iter()
                    .chain(style.background.map(ConsoleOp::Background))
                    .collect()
            }
            Command::Clear(kind) => vec![ConsoleOp::Clear(*kind)],
            Command::ScrollUp(n) => vec![ConsoleOp::Scroll(i32::from(*n))],
            Command::ScrollDown(n) => vec![ConsoleOp::Scroll(up(*n))],
            Command::SetSize(columns, rows) => vec![ConsoleOp::SetSize(*columns, *rows)],
            _ => return Err(self.unsupported(command)),
        };
        Ok(ops)
    }

    fn apply(&mut self, op: ConsoleOp) -> io::Result<()> {
        match op {
            ConsoleOp::MoveTo(column, row) => self.console.set_cursor_position(column, row),
            ConsoleOp::MoveBy { dx, dy, to_line_start } => {
                let (column, row) = self.console.cursor_position()?;
                let column = if to_line_start { 0 } else { offset(column, dx) };
                self.console.set_cursor_position(column, offset(row, dy))
            }
            ConsoleOp::MoveToColumn(column) => {
                let (_, row) = self.console.cursor_position()?;
                self.console.set_cursor_position(column, row)
            }
            ConsoleOp::MoveToRow(row) => {
                let (column, _) = self.console.cursor_position()?;
                self.console.set_cursor_position(column, row)
            }
            ConsoleOp::Visibility(visible) => self.console.set_cursor_visibility(visible),
            ConsoleOp::Foreground(color) => self.console.set_foreground(color),
            ConsoleOp::Background(color) => self.console.set_background(color),
            ConsoleOp::ResetColors => self.console.reset_colors(),
            ConsoleOp::Clear(kind) => self.console.clear(kind),
            ConsoleOp::Scroll(lines) => self.console.scroll(lines),
            ConsoleOp::SetSize(columns, rows) => self.console.set_size(columns, rows),
            ConsoleOp::Save => {
                self.saved = Some(self.console.cursor_position()?);
                Ok(())
            }
            ConsoleOp::Restore => match self.saved {
                Some((column, row)) => self.console.set_cursor_position(column, row),
                None => Ok(()),
            },
        }
    }
}

fn offset(base: u16, delta: i32) -> u16 {
    let moved = i32::from(base).saturating_add(delta);
    u16::try_from(moved.max(0)).unwrap_or(u16::MAX)
}

impl<C: ConsoleApi> Strategy for LegacyConsole<C> {
    fn name(&self) -> &'static str {
        "legacy console"
    }

    fn encode(&mut self, command: &Command, out: &mut Vec<u8>) -> Result<()> {
        if let Command::Print(text) = command {
            out.extend_from_slice(text.as_bytes());
            return Ok(());
        }
        let ops = self.translate(command)?;
        let anchor = out.len();
        self.pending.extend(ops.into_iter().map(|op| (anchor, op)));
        Ok(())
    }

    fn next_barrier(&self) -> Option<usize> {
        self.pending.front().map(|(at, _)| *at)
    }

    /// A failed call stays queued and is retried by the next flush.
    fn apply_barrier(&mut self) -> Result<()> {
        if let Some(&(_, op)) = self.pending.front() {
            self.apply(op)?;
            self.pending.pop_front();
        }
        Ok(())
    }

    fn consumed(&mut self, n: usize) {
        for (at, _) in &mut self.pending {
            *at = at.saturating_sub(n);
        }
    }
}
