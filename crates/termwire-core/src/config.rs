#![forbid(unsafe_code)]

//! Runtime tunables.
//!
//! Defaults suit interactive use. Each knob can be overridden through an
//! environment variable, read once by [`TermwireConfig::from_env`]:
//!
//! | Variable | Field | Unit |
//! |----------|-------|------|
//! | `TERMWIRE_ESC_TIMEOUT_MS` | [`escape_timeout`](TermwireConfig::escape_timeout) | ms |
//! | `TERMWIRE_CURSOR_TIMEOUT_MS` | [`cursor_query_timeout`](TermwireConfig::cursor_query_timeout) | ms |
//! | `TERMWIRE_CURSOR_RETRY_MS` | [`cursor_query_retry`](TermwireConfig::cursor_query_retry) | ms |
//! | `TERMWIRE_ENHANCEMENT_DEPTH` | [`enhancement_stack_depth`](TermwireConfig::enhancement_stack_depth) | entries |
//!
//! Values that do not parse are ignored (the default is kept and a warning
//! is logged).

use std::env;
use std::time::Duration;

/// How long a lone ESC waits for a follow-up byte before it is reported as
/// the Escape key.
pub const DEFAULT_ESCAPE_TIMEOUT: Duration = Duration::from_millis(100);

/// Total time a cursor position query waits for the terminal's reply.
pub const DEFAULT_CURSOR_QUERY_TIMEOUT: Duration = Duration::from_secs(2);

/// Slice length for each read attempt while waiting for a cursor reply.
pub const DEFAULT_CURSOR_QUERY_RETRY: Duration = Duration::from_millis(100);

/// Default bound on the keyboard enhancement stack.
pub const DEFAULT_ENHANCEMENT_DEPTH: usize = 16;

/// Smallest enhancement stack bound accepted from configuration.
pub const MIN_ENHANCEMENT_DEPTH: usize = 8;

/// Bytes requested from the byte source per read.
pub const DEFAULT_READ_CHUNK: usize = 1024;

/// Tunables for the event pump, parser and enhancement stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermwireConfig {
    /// Lone-ESC disambiguation window.
    pub escape_timeout: Duration,
    /// Overall budget for [`EventPump::cursor_position`](crate::event_pump::EventPump::cursor_position).
    pub cursor_query_timeout: Duration,
    /// Per-attempt read slice while waiting for a cursor reply.
    pub cursor_query_retry: Duration,
    /// Maximum number of entries on the keyboard enhancement stack.
    pub enhancement_stack_depth: usize,
    /// Read buffer size.
    pub read_chunk: usize,
}

impl Default for TermwireConfig {
    fn default() -> Self {
        Self {
            escape_timeout: DEFAULT_ESCAPE_TIMEOUT,
            cursor_query_timeout: DEFAULT_CURSOR_QUERY_TIMEOUT,
            cursor_query_retry: DEFAULT_CURSOR_QUERY_RETRY,
            enhancement_stack_depth: DEFAULT_ENHANCEMENT_DEPTH,
            read_chunk: DEFAULT_READ_CHUNK,
        }
    }
}

/// Raw environment snapshot, split out so parsing can be tested without
/// touching the process environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigInputs {
    pub escape_timeout_ms: Option<String>,
    pub cursor_timeout_ms: Option<String>,
    pub cursor_retry_ms: Option<String>,
    pub enhancement_depth: Option<String>,
}

impl ConfigInputs {
    /// Read the `TERMWIRE_*` variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            escape_timeout_ms: env::var("TERMWIRE_ESC_TIMEOUT_MS").ok(),
            cursor_timeout_ms: env::var("TERMWIRE_CURSOR_TIMEOUT_MS").ok(),
            cursor_retry_ms: env::var("TERMWIRE_CURSOR_RETRY_MS").ok(),
            enhancement_depth: env::var("TERMWIRE_ENHANCEMENT_DEPTH").ok(),
        }
    }
}

impl TermwireConfig {
    /// Defaults overridden by the environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_inputs(&ConfigInputs::from_env())
    }

    /// Defaults overridden by an explicit snapshot.
    #[must_use]
    pub fn from_inputs(inputs: &ConfigInputs) -> Self {
        let mut config = Self::default();
        if let Some(ms) = parse_number("TERMWIRE_ESC_TIMEOUT_MS", &inputs.escape_timeout_ms) {
            config.escape_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_number("TERMWIRE_CURSOR_TIMEOUT_MS", &inputs.cursor_timeout_ms) {
            config.cursor_query_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_number("TERMWIRE_CURSOR_RETRY_MS", &inputs.cursor_retry_ms)
            && ms > 0
        {
            config.cursor_query_retry = Duration::from_millis(ms);
        }
        if let Some(depth) = parse_number("TERMWIRE_ENHANCEMENT_DEPTH", &inputs.enhancement_depth) {
            let depth = usize::try_from(depth).unwrap_or(usize::MAX);
            config.enhancement_stack_depth = depth.max(MIN_ENHANCEMENT_DEPTH);
        }
        config
    }

    /// Replace the ESC disambiguation window.
    #[must_use]
    pub const fn with_escape_timeout(mut self, timeout: Duration) -> Self {
        self.escape_timeout = timeout;
        self
    }

    /// Replace the cursor query budget and retry slice.
    #[must_use]
    pub const fn with_cursor_query(mut self, timeout: Duration, retry: Duration) -> Self {
        self.cursor_query_timeout = timeout;
        self.cursor_query_retry = retry;
        self
    }
}

fn parse_number(name: &str, raw: &Option<String>) -> Option<u64> {
    let raw = raw.as_deref()?.trim();
    match raw.parse::<u64>() {
        Ok(value) => Some(value),
        Err(_) => {
            crate::warn!(variable = name, value = raw, "ignoring unparseable setting");
            let _ = name;
            None
        }
    }
}
