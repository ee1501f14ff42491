#![forbid(unsafe_code)]

//! Buffered command output.
//!
//! [`OutputQueue`] accumulates encoded commands and writes them only on
//! [`flush`](OutputQueue::flush). Bytes leave in exactly the order they were
//! queued; nothing is merged or reordered.
//!
//! # Failure semantics
//!
//! - `enqueue` stops at the first command that cannot be encoded. Earlier
//!   commands in the same call stay queued; the failing one adds nothing.
//! - `flush` retries `Interrupted`, treats a zero-length write as
//!   `WriteZero`, and on failure keeps the unwritten tail at the head of the
//!   buffer so the next flush resumes where this one stopped.

use std::io::{self, Write};
use std::sync::Arc;

use crate::command::Command;
use crate::enhancement::KeyboardEnhancementStack;
use crate::error::Result;
use crate::strategy::{AnsiStrategy, Strategy};

/// A writer plus a buffer of not-yet-written command output.
#[derive(Debug)]
pub struct OutputQueue<W: Write, S: Strategy = AnsiStrategy> {
    writer: W,
    buffer: Vec<u8>,
    strategy: S,
    enhancement: Arc<KeyboardEnhancementStack>,
}

impl<W: Write> OutputQueue<W> {
    /// ANSI output tracking the process-wide enhancement stack.
    pub fn new(writer: W) -> Self {
        Self::with_strategy(writer, AnsiStrategy, KeyboardEnhancementStack::global())
    }
}

impl<W: Write, S: Strategy> OutputQueue<W, S> {
    pub fn with_strategy(writer: W, strategy: S, enhancement: Arc<KeyboardEnhancementStack>) -> Self {
        Self {
            writer,
            buffer: Vec::with_capacity(256),
            strategy,
            enhancement,
        }
    }

    /// Encode `commands` into the buffer without writing anything.
    pub fn enqueue(&mut self, commands: &[Command]) -> Result<()> {
        for command in commands {
            self.enqueue_one(command)?;
        }
        Ok(())
    }

    fn enqueue_one(&mut self, command: &Command) -> Result<()> {
        // Update the shadow stack first so a full or empty stack rejects the
        // command before any byte is queued.
        let undo = match command {
            Command::PushKeyboardEnhancementFlags(flags) => {
                self.enhancement.push(*flags)?;
                StackUndo::Pop
            }
            Command::PopKeyboardEnhancementFlags => StackUndo::Push(self.enhancement.pop()?),
            _ => StackUndo::None,
        };

        let mark = self.buffer.len();
        if let Err(err) = self.strategy.encode(command, &mut self.buffer) {
            self.buffer.truncate(mark);
            let restored = match undo {
                StackUndo::Pop => self.enhancement.pop().map(drop),
                StackUndo::Push(flags) => self.enhancement.push(flags),
                StackUndo::None => Ok(()),
            };
            if let Err(undo_err) = restored {
                crate::warn!(
                    command = command.name(),
                    error = %undo_err,
                    "keyboard enhancement stack left out of step after rejected command"
                );
            }
            crate::debug!(command = command.name(), error = %err, "enqueue rejected");
            return Err(err);
        }
        crate::trace!(command = command.name(), bytes = self.buffer.len() - mark, "enqueued");
        Ok(())
    }

    /// `enqueue` followed by `flush`.
    pub fn execute(&mut self, commands: &[Command]) -> Result<()> {
        self.enqueue(commands)?;
        self.flush()
    }

    /// Write everything queued, then flush the writer.
    pub fn flush(&mut self) -> Result<()> {
        let mut written = 0;
        let result = self.write_through_barriers(&mut written);
        if written > 0 {
            self.buffer.drain(..written);
            self.strategy.consumed(written);
        }
        if let Err(err) = result {
            crate::warn!(written, remaining = self.buffer.len(), error = %err, "flush failed");
            return Err(err);
        }
        self.writer.flush()?;
        Ok(())
    }

    fn write_through_barriers(&mut self, written: &mut usize) -> Result<()> {
        loop {
            let barrier = self.strategy.next_barrier();
            let end = barrier.map_or(self.buffer.len(), |at| at.min(self.buffer.len()));
            while *written < end {
                match self.writer.write(&self.buffer[*written..end]) {
                    Ok(0) => {
                        return Err(io::Error::new(
                            io::ErrorKind::WriteZero,
                            "writer accepted no bytes",
                        )
                        .into());
                    }
                    Ok(n) => *written += n,
                    Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                    Err(err) => return Err(err.into()),
                }
            }
            if barrier.is_none() {
                return Ok(());
            }
            self.writer.flush()?;
            self.strategy.apply_barrier()?;
        }
    }

    /// Bytes queued but not yet written.
    #[must_use]
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// The enhancement stack this queue updates.
    pub fn enhancement(&self) -> &Arc<KeyboardEnhancementStack> {
        &self.enhancement
    }

    /// Give back the writer, discarding anything still queued.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

enum StackUndo {
    None,
    Pop,
    Push(crate::event::KeyboardEnhancementFlags),
}
