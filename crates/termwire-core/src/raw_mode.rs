#![forbid(unsafe_code)]

//! Reference-counted raw mode.
//!
//! Raw mode is process-wide terminal state, so nested callers share one
//! counter. The first [`enable`](RawModeController::enable) captures the
//! prior mode and switches the terminal; the matching last
//! [`disable`](RawModeController::disable) restores it. Calls in between
//! only move the counter.
//!
//! The OS side sits behind [`TerminalMode`] so the counting logic is tested
//! here without a terminal. `termwire-tty` provides the termios implementation
//! and the process-wide controller.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use crate::error::{Error, Result};

/// OS hook used by [`RawModeController`].
pub trait TerminalMode: Send {
    /// Save the current mode and switch to raw mode.
    fn enable_raw(&mut self) -> Result<()>;

    /// Restore the mode saved by the last `enable_raw`.
    fn disable_raw(&mut self) -> Result<()>;

    /// Window size as `(columns, rows)`.
    fn size(&self) -> Result<(u16, u16)>;
}

struct State {
    depth: u32,
    mode: Box<dyn TerminalMode>,
}

/// Shared raw-mode counter over a [`TerminalMode`].
pub struct RawModeController {
    state: Mutex<State>,
}

impl fmt::Debug for RawModeController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawModeController")
            .field("depth", &self.depth())
            .finish_non_exhaustive()
    }
}

impl RawModeController {
    pub fn new(mode: impl TerminalMode + 'static) -> Self {
        Self {
            state: Mutex::new(State {
                depth: 0,
                mode: Box::new(mode),
            }),
        }
    }

    /// Enter raw mode, or add one more holder if already raw.
    ///
    /// On failure the counter is unchanged.
    pub fn enable(&self) -> Result<()> {
        let mut state = self.lock();
        if state.depth == 0 {
            state.mode.enable_raw()?;
            crate::info!("raw mode enabled");
        }
        state.depth = state
            .depth
            .checked_add(1)
            .ok_or_else(|| Error::invalid("raw mode enabled too many times"))?;
        Ok(())
    }

    /// Drop one holder, restoring the saved mode when the last one leaves.
    ///
    /// Disabling when raw mode is off does nothing. If the restore fails the
    /// counter stays at one so the call can be retried.
    pub fn disable(&self) -> Result<()> {
        let mut state = self.lock();
        match state.depth {
            0 => Ok(()),
            1 => {
                state.mode.disable_raw()?;
                state.depth = 0;
                crate::info!("raw mode disabled");
                Ok(())
            }
            _ => {
                state.depth -= 1;
                Ok(())
            }
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.depth() > 0
    }

    /// Number of outstanding enables.
    #[must_use]
    pub fn depth(&self) -> u32 {
        self.lock().depth
    }

    /// Window size as `(columns, rows)`.
    pub fn terminal_size(&self) -> Result<(u16, u16)> {
        self.lock().mode.size()
    }

    /// Enable raw mode for the lifetime of the returned guard.
    pub fn guard(&self) -> Result<RawModeGuard<'_>> {
        self.enable()?;
        Ok(RawModeGuard { controller: self })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// RAII holder of one raw-mode reference.
///
/// Dropping the guard calls [`RawModeController::disable`]. Errors during
/// drop are ignored; call [`RawModeGuard::release`] to observe them.
#[derive(Debug)]
pub struct RawModeGuard<'a> {
    controller: &'a RawModeController,
}

impl RawModeGuard<'_> {
    /// Give up the reference now, reporting any restore error.
    pub fn release(self) -> Result<()> {
        let controller = self.controller;
        std::mem::forget(self);
        controller.disable()
    }
}

impl Drop for RawModeGuard<'_> {
    fn drop(&mut self) {
        let _ = self.controller.disable();
    }
}
