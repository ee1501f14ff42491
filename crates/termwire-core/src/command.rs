#![forbid(unsafe_code)]

//! The command vocabulary.
//!
//! A [`Command`] is inert data. Turning it into bytes (or console calls) is
//! the job of a [`Strategy`](crate::strategy::Strategy); batching it is the
//! job of the [`OutputQueue`](crate::output_queue::OutputQueue).

use crate::event::KeyboardEnhancementFlags;
use crate::style::{Attribute, Color, Colors, ContentStyle};

/// Cursor shapes for DECSCUSR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CursorShape {
    UnderScore,
    Line,
    Block,
}

/// What part of the screen `Clear` erases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClearType {
    /// The whole visible screen.
    All,
    /// The scrollback buffer.
    Purge,
    FromCursorDown,
    FromCursorUp,
    CurrentLine,
    /// From the cursor to the end of the line.
    UntilNewLine,
}

/// A terminal command.
///
/// Coordinates and counts are 0-based cells unless noted; the encoder adds
/// the 1 the wire format expects.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Command {
    /// Move to `(column, row)`.
    MoveTo(u16, u16),
    /// Move down `n` lines, to column 0.
    MoveToNextLine(u16),
    /// Move up `n` lines, to column 0.
    MoveToPreviousLine(u16),
    MoveToColumn(u16),
    MoveToRow(u16),
    MoveUp(u16),
    MoveRight(u16),
    MoveDown(u16),
    MoveLeft(u16),
    /// Save the cursor position in the terminal.
    SavePosition,
    /// Restore the position saved by `SavePosition`.
    RestorePosition,
    Hide,
    Show,
    EnableBlinking,
    DisableBlinking,
    SetCursorShape(CursorShape),
    EnableMouseCapture,
    DisableMouseCapture,
    PushKeyboardEnhancementFlags(KeyboardEnhancementFlags),
    PopKeyboardEnhancementFlags,
    EnableFocusChange,
    DisableFocusChange,
    EnableBracketedPaste,
    DisableBracketedPaste,
    SetForegroundColor(Color),
    SetBackgroundColor(Color),
    SetUnderlineColor(Color),
    SetColors(Colors),
    SetAttribute(Attribute),
    SetAttributes(Vec<Attribute>),
    SetStyle(ContentStyle),
    ResetColor,
    DisableLineWrap,
    EnableLineWrap,
    EnterAlternateScreen,
    LeaveAlternateScreen,
    ScrollUp(u16),
    ScrollDown(u16),
    Clear(ClearType),
    /// Resize the window to `(columns, rows)`.
    SetSize(u16, u16),
    /// Text written verbatim.
    Print(String),
}

impl Command {
    /// The variant name, used in error messages and logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::MoveTo(..) => "MoveTo",
            Self::MoveToNextLine(_) => "MoveToNextLine",
            Self::MoveToPreviousLine(_) => "MoveToPreviousLine",
            Self::MoveToColumn(_) => "MoveToColumn",
            Self::MoveToRow(_) => "MoveToRow",
            Self::MoveUp(_) => "MoveUp",
            Self::MoveRight(_) => "MoveRight",
            Self::MoveDown(_) => "MoveDown",
            Self::MoveLeft(_) => "MoveLeft",
            Self::SavePosition => "SavePosition",
            Self::RestorePosition => "RestorePosition",
            Self::Hide => "Hide",
            Self::Show => "Show",
            Self::EnableBlinking => "EnableBlinking",
            Self::DisableBlinking => "DisableBlinking",
            Self::SetCursorShape(_) => "SetCursorShape",
            Self::EnableMouseCapture => "EnableMouseCapture",
            Self::DisableMouseCapture => "DisableMouseCapture",
            Self::PushKeyboardEnhancementFlags(_) => "PushKeyboardEnhancementFlags",
            Self::PopKeyboardEnhancementFlags => "PopKeyboardEnhancementFlags",
            Self::EnableFocusChange => "EnableFocusChange",
            Self::DisableFocusChange => "DisableFocusChange",
            Self::EnableBracketedPaste => "EnableBracketedPaste",
            Self::DisableBracketedPaste => "DisableBracketedPaste",
            Self::SetForegroundColor(_) => "SetForegroundColor",
            Self::SetBackgroundColor(_) => "SetBackgroundColor",
            Self::SetUnderlineColor(_) => "SetUnderlineColor",
            Self::SetColors(_) => "SetColors",
            Self::SetAttribute(_) => "SetAttribute",
            Self::SetAttributes(_) => "SetAttributes",
            Self::SetStyle(_) => "SetStyle",
            Self::ResetColor => "ResetColor",
            Self::DisableLineWrap => "DisableLineWrap",
            Self::EnableLineWrap => "EnableLineWrap",
            Self::EnterAlternateScreen => "EnterAlternateScreen",
            Self::LeaveAlternateScreen => "LeaveAlternateScreen",
            Self::ScrollUp(_) => "ScrollUp",
            Self::ScrollDown(_) => "ScrollDown",
            Self::Clear(_) => "Clear",
            Self::SetSize(..) => "SetSize",
            Self::Print(_) => "Print",
        }
    }
}

impl From<&str> for Command {
    fn from(text: &str) -> Self {
        Self::Print(text.to_owned())
    }
}
