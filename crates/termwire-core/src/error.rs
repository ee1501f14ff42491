#![forbid(unsafe_code)]

//! Error type shared by every termwire API.
//!
//! The parser never produces errors: malformed input is dropped. Everything
//! else surfaces one of the four kinds below at the call that failed.

use std::io;

/// Errors returned by termwire operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Writer or reader failure, including end of input and short writes.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// A value was outside its documented range, or a stack operation was
    /// not possible (pop on empty, push beyond capacity).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The active output strategy cannot carry out the command.
    #[error("{command} is not supported by the {strategy} strategy")]
    Unsupported {
        /// Name of the rejected command.
        command: &'static str,
        /// Name of the strategy that rejected it.
        strategy: &'static str,
    },

    /// The terminal did not answer a cursor position query in time.
    #[error("timed out waiting for the cursor position report")]
    Timeout,
}

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// True if this is an [`Error::Io`] of the given kind.
    #[must_use]
    pub fn is_io_kind(&self, kind: io::ErrorKind) -> bool {
        matches!(self, Self::Io(err) if err.kind() == kind)
    }
}

/// Result alias used across termwire.
pub type Result<T, E = Error> = std::result::Result<T, E>;
