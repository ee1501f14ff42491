#![forbid(unsafe_code)]

//! Event pump: byte source in, events out.
//!
//! The pump is the only thing that drives the [`InputParser`]. It reads from
//! a [`ByteSource`], stamps every chunk with the [`Clock`], and resolves
//! escape timeouts while it waits, so a lone ESC becomes `Key(Esc)` even when
//! no further input ever arrives.
//!
//! Events from one read are delivered in arrival order. Cursor position
//! replies never enter the event queue: they are taken by
//! [`EventPump::cursor_position`] or dropped when nobody asked.

use std::collections::VecDeque;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use crate::ansi;
use crate::byte_source::ByteSource;
use crate::clock::{Clock, MonotonicClock};
use crate::config::TermwireConfig;
use crate::enhancement::KeyboardEnhancementStack;
use crate::error::{Error, Result};
use crate::event::Event;
use crate::input_parser::{InputParser, ParsedEvent};

/// Reads, parses and queues terminal input.
#[derive(Debug)]
pub struct EventPump<S: ByteSource, C: Clock = MonotonicClock> {
    source: S,
    clock: C,
    parser: InputParser,
    queue: VecDeque<Event>,
    enhancement: Arc<KeyboardEnhancementStack>,
    config: TermwireConfig,
    buf: Vec<u8>,
    /// A cursor position query is in flight.
    awaiting_cursor: bool,
    cursor_reply: Option<(u16, u16)>,
}

impl<S: ByteSource> EventPump<S> {
    /// A pump on the real clock, the process-wide enhancement stack and the
    /// environment's configuration.
    pub fn new(source: S) -> Self {
        Self::with_parts(
            source,
            MonotonicClock::new(),
            KeyboardEnhancementStack::global(),
            TermwireConfig::from_env(),
        )
    }
}

impl<S: ByteSource, C: Clock> EventPump<S, C> {
    pub fn with_parts(
        source: S,
        clock: C,
        enhancement: Arc<KeyboardEnhancementStack>,
        config: TermwireConfig,
    ) -> Self {
        Self {
            source,
            clock,
            parser: InputParser::new().with_escape_timeout(config.escape_timeout),
            queue: VecDeque::new(),
            enhancement,
            buf: vec![0; config.read_chunk.max(1)],
            config,
            awaiting_cursor: false,
            cursor_reply: None,
        }
    }

    /// Wait up to `timeout` for an event.
    ///
    /// Returns `true` once at least one complete event is queued. A zero
    /// timeout performs a single non-blocking read.
    pub fn poll(&mut self, timeout: Duration) -> Result<bool> {
        if !self.queue.is_empty() {
            return Ok(true);
        }

        let start = self.clock.now_mono();
        self.expire(start);
        if timeout.is_zero() {
            if self.queue.is_empty() {
                self.fill(Some(Duration::ZERO))?;
            }
            return Ok(!self.queue.is_empty());
        }

        let deadline = start.saturating_add(timeout);
        loop {
            if !self.queue.is_empty() {
                return Ok(true);
            }
            let now = self.clock.now_mono();
            if now >= deadline {
                return Ok(false);
            }
            let wait = self.wait_budget(now, deadline - now);
            self.fill(Some(wait))?;
            self.expire(self.clock.now_mono());
        }
    }

    /// Block until an event is available and return it.
    pub fn read(&mut self) -> Result<Event> {
        loop {
            if let Some(event) = self.queue.pop_front() {
                return Ok(event);
            }
            let now = self.clock.now_mono();
            self.expire(now);
            if !self.queue.is_empty() {
                continue;
            }
            let wait = self
                .parser
                .escape_deadline()
                .map(|deadline| deadline.saturating_sub(now));
            self.fill(wait)?;
        }
    }

    /// Return a queued or immediately readable event without blocking.
    pub fn try_read(&mut self) -> Result<Option<Event>> {
        if self.poll(Duration::ZERO)? {
            return Ok(self.queue.pop_front());
        }
        Ok(None)
    }

    /// Ask the terminal where the cursor is, as 0-based `(column, row)`.
    ///
    /// Writes `CSI 6 n` to `writer` and reads until the reply arrives,
    /// waiting in slices of the configured retry interval up to the
    /// configured timeout. Events that arrive in the meantime stay queued in
    /// order. Fails with [`Error::Timeout`] if no reply comes.
    ///
    /// Raw mode must be on, or the terminal echoes the reply instead of
    /// sending it.
    pub fn cursor_position<W: Write>(&mut self, writer: &mut W) -> Result<(u16, u16)> {
        let span = crate::debug_span!("cursor_position");
        let _guard = span.enter();

        writer.write_all(ansi::CURSOR_POSITION_QUERY)?;
        writer.flush()?;

        self.cursor_reply = None;
        self.awaiting_cursor = true;
        self.parser.set_cursor_report_expected(true);
        let result = self.await_cursor_reply();
        self.awaiting_cursor = false;
        self.parser.set_cursor_report_expected(false);
        result
    }

    fn await_cursor_reply(&mut self) -> Result<(u16, u16)> {
        let deadline = self
            .clock
            .now_mono()
            .saturating_add(self.config.cursor_query_timeout);
        loop {
            if let Some(position) = self.cursor_reply.take() {
                return Ok(position);
            }
            let now = self.clock.now_mono();
            self.expire(now);
            if let Some(position) = self.cursor_reply.take() {
                return Ok(position);
            }
            if now >= deadline {
                crate::debug!(
                    timeout_ms = self.config.cursor_query_timeout.as_millis() as u64,
                    "cursor position query timed out"
                );
                return Err(Error::Timeout);
            }
            let slice = (deadline - now).min(self.config.cursor_query_retry);
            let wait = self.wait_budget(now, slice);
            self.fill(Some(wait))?;
        }
    }

    /// Number of events ready for [`read`](Self::read).
    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// The parser, for diagnostics such as
    /// [`recent_bytes`](InputParser::recent_bytes).
    #[must_use]
    pub fn parser(&self) -> &InputParser {
        &self.parser
    }

    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    #[must_use]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    #[must_use]
    pub fn config(&self) -> &TermwireConfig {
        &self.config
    }

    /// Shorten `wait` so a pending escape prefix is resolved on time.
    fn wait_budget(&self, now: Duration, wait: Duration) -> Duration {
        match self.parser.escape_deadline() {
            Some(deadline) => wait.min(deadline.saturating_sub(now)),
            None => wait,
        }
    }

    /// One read from the source, parsed and queued.
    fn fill(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.parser.set_enhancement_flags(self.enhancement.top());
        let n = self.source.read_available(&mut self.buf, timeout)?;
        if let Some((columns, rows)) = self.source.take_resize() {
            self.queue.push_back(Event::Resize(columns, rows));
        }
        if n > 0 {
            let now = self.clock.now_mono();
            let parsed = self.parser.feed(&self.buf[..n], now);
            self.dispatch(parsed);
        }
        Ok(())
    }

    fn expire(&mut self, now: Duration) {
        let parsed = self.parser.poll_timeout(now);
        self.dispatch(parsed);
    }

    fn dispatch(&mut self, parsed: Vec<ParsedEvent>) {
        for item in parsed {
            match item {
                ParsedEvent::Event(event) => self.queue.push_back(event),
                ParsedEvent::CursorPosition { column, row } => {
                    if self.awaiting_cursor && self.cursor_reply.is_none() {
                        self.cursor_reply = Some((column, row));
                    } else {
                        crate::debug!(column, row, "dropping unsolicited cursor report");
                    }
                }
            }
        }
    }
}
