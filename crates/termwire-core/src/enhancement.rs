#![forbid(unsafe_code)]

//! Shadow of the terminal's keyboard enhancement stack.
//!
//! The terminal keeps one stack of kitty keyboard flags per screen. This type
//! mirrors it so the parser knows which encoding to expect. It is updated
//! when a push or pop command is queued, not when the bytes reach the
//! terminal.
//!
//! The stack is shared between the output queue (which pushes and pops) and
//! the event pump (which reads the top), so it lives behind a mutex. A
//! poisoned lock is recovered: the stack holds plain flag values and cannot
//! be left half-updated.

use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use crate::config::TermwireConfig;
use crate::error::{Error, Result};
use crate::event::KeyboardEnhancementFlags;

/// Bounded stack of keyboard enhancement flag sets.
#[derive(Debug)]
pub struct KeyboardEnhancementStack {
    entries: Mutex<Vec<KeyboardEnhancementFlags>>,
    max_depth: usize,
}

impl KeyboardEnhancementStack {
    /// An empty stack holding at most `max_depth` entries.
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        Self {
            entries: Mutex::new(Vec::with_capacity(max_depth.min(64))),
            max_depth,
        }
    }

    /// The process-wide stack, sized from [`TermwireConfig::from_env`] on
    /// first use.
    pub fn global() -> Arc<Self> {
        static GLOBAL: OnceLock<Arc<KeyboardEnhancementStack>> = OnceLock::new();
        GLOBAL
            .get_or_init(|| {
                let depth = TermwireConfig::from_env().enhancement_stack_depth;
                Arc::new(Self::new(depth))
            })
            .clone()
    }

    fn entries(&self) -> MutexGuard<'_, Vec<KeyboardEnhancementFlags>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Push `flags`. Fails when the stack is full.
    pub fn push(&self, flags: KeyboardEnhancementFlags) -> Result<()> {
        let mut entries = self.entries();
        if entries.len() >= self.max_depth {
            return Err(Error::invalid(format!(
                "keyboard enhancement stack is full ({} entries)",
                self.max_depth
            )));
        }
        entries.push(flags);
        crate::debug!(depth = entries.len(), flags = flags.bits(), "enhancement push");
        Ok(())
    }

    /// Pop the top entry. Fails when the stack is empty.
    pub fn pop(&self) -> Result<KeyboardEnhancementFlags> {
        let mut entries = self.entries();
        let flags = entries
            .pop()
            .ok_or_else(|| Error::invalid("keyboard enhancement stack is empty"))?;
        crate::debug!(depth = entries.len(), "enhancement pop");
        Ok(flags)
    }

    /// Flags currently in effect; empty when nothing has been pushed.
    #[must_use]
    pub fn top(&self) -> KeyboardEnhancementFlags {
        self.entries().last().copied().unwrap_or_default()
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.entries().len()
    }

    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries().clear();
    }
}

impl Default for KeyboardEnhancementStack {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_ENHANCEMENT_DEPTH)
    }
}
