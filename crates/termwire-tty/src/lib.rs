#![forbid(unsafe_code)]
//! Native Unix terminal backend for termwire.
//!
//! This crate supplies the OS half of the core contract:
//!
//! - [`TtyMode`]: termios raw mode on `/dev/tty` and the window size query.
//! - [`raw_mode`]: the process-wide reference-counted raw-mode controller,
//!   with [`enable_raw_mode`] and friends as free functions.
//! - [`TtyByteSource`]: `/dev/tty` input multiplexed with SIGWINCH through
//!   `poll(2)`. Only one may exist per process.
//! - [`Terminal`]: an output queue and an event pump over the real terminal.
//!
//! ## Sequences this crate writes itself
//!
//! | Purpose                  | Bytes      |
//! |--------------------------|------------|
//! | Cursor position query    | `CSI 6 n`  |
//!
//! Everything else goes through [`termwire_core::output_queue::OutputQueue`].

use core::time::Duration;
use std::io::{self, Stdout, Write};

use termwire_core::byte_source::ByteSource;
use termwire_core::clock::{Clock, MonotonicClock};
use termwire_core::command::Command;
use termwire_core::error::{Error, Result};
use termwire_core::event::Event;
use termwire_core::event_pump::EventPump;
use termwire_core::output_queue::OutputQueue;
use termwire_core::raw_mode::RawModeController;

#[cfg(unix)]
pub use unix::{TtyByteSource, TtyMode, window_size};

// ── Window Size Fallback ─────────────────────────────────────────────────

/// Size from `COLUMNS`/`LINES` style values, when both are positive numbers.
#[must_use]
pub fn size_from_env_values(columns: Option<&str>, lines: Option<&str>) -> Option<(u16, u16)> {
    let columns: u16 = columns?.trim().parse().ok()?;
    let rows: u16 = lines?.trim().parse().ok()?;
    (columns > 0 && rows > 0).then_some((columns, rows))
}

fn size_from_env() -> Option<(u16, u16)> {
    let columns = std::env::var("COLUMNS").ok();
    let lines = std::env::var("LINES").ok();
    size_from_env_values(columns.as_deref(), lines.as_deref())
}

// ── Process-wide Raw Mode ────────────────────────────────────────────────

/// The raw-mode controller shared by the whole process.
#[cfg(unix)]
pub fn raw_mode() -> &'static RawModeController {
    use std::sync::OnceLock;

    static RAW_MODE: OnceLock<RawModeController> = OnceLock::new();
    RAW_MODE.get_or_init(|| RawModeController::new(TtyMode::new()))
}

/// Enter raw mode, or add a holder if it is already on.
#[cfg(unix)]
pub fn enable_raw_mode() -> Result<()> {
    raw_mode().enable()
}

/// Drop one raw-mode holder; the last one restores the saved mode.
#[cfg(unix)]
pub fn disable_raw_mode() -> Result<()> {
    raw_mode().disable()
}

#[cfg(unix)]
#[must_use]
pub fn is_raw_mode_enabled() -> bool {
    raw_mode().is_enabled()
}

/// Terminal size as `(columns, rows)`.
#[cfg(unix)]
pub fn size() -> Result<(u16, u16)> {
    raw_mode().terminal_size()
}

#[cfg(unix)]
mod unix {
    use std::fs::{File, OpenOptions};
    use std::io::{self, Read};
    use std::os::fd::AsFd;
    use std::os::unix::net::UnixStream;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use nix::errno::Errno;
    use nix::poll::{PollFd, PollFlags, PollTimeout};
    use nix::sys::termios::{self, SetArg, Termios};
    use signal_hook::SigId;
    use signal_hook::consts::signal::SIGWINCH;
    use termwire_core::byte_source::ByteSource;
    use termwire_core::error::Result;
    use termwire_core::raw_mode::TerminalMode;

    use super::size_from_env;

    // ── Terminal Mode ────────────────────────────────────────────────────

    /// termios raw mode on the controlling terminal.
    ///
    /// `/dev/tty` is opened when raw mode is first entered and kept for the
    /// restore, so redirecting stdin or stdout does not matter.
    #[derive(Default)]
    pub struct TtyMode {
        tty: Option<File>,
        saved: Option<Termios>,
    }

    impl TtyMode {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl std::fmt::Debug for TtyMode {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("TtyMode")
                .field("raw", &self.saved.is_some())
                .finish()
        }
    }

    impl TerminalMode for TtyMode {
        fn enable_raw(&mut self) -> Result<()> {
            let tty = match self.tty.take() {
                Some(tty) => tty,
                None => OpenOptions::new().read(true).write(true).open("/dev/tty")?,
            };
            let original = termios::tcgetattr(&tty).map_err(io::Error::from)?;
            let mut raw = original.clone();
            termios::cfmakeraw(&mut raw);
            let applied = termios::tcsetattr(&tty, SetArg::TCSAFLUSH, &raw);
            self.tty = Some(tty);
            applied.map_err(io::Error::from)?;
            self.saved = Some(original);
            Ok(())
        }

        fn disable_raw(&mut self) -> Result<()> {
            if let (Some(tty), Some(saved)) = (&self.tty, &self.saved) {
                termios::tcsetattr(tty, SetArg::TCSAFLUSH, saved).map_err(io::Error::from)?;
            }
            self.saved = None;
            Ok(())
        }

        fn size(&self) -> Result<(u16, u16)> {
            match &self.tty {
                Some(tty) => tty_size(tty),
                None => window_size(),
            }
        }
    }

    // ── Window Size ──────────────────────────────────────────────────────

    /// Size of the controlling terminal as `(columns, rows)`.
    ///
    /// Falls back to `COLUMNS`/`LINES` when the ioctl fails or reports zero.
    pub fn window_size() -> Result<(u16, u16)> {
        match File::open("/dev/tty") {
            Ok(tty) => tty_size(&tty),
            Err(err) => size_from_env().ok_or_else(|| err.into()),
        }
    }

    fn tty_size(tty: &File) -> Result<(u16, u16)> {
        match rustix::termios::tcgetwinsize(tty) {
            Ok(ws) if ws.ws_col > 0 && ws.ws_row > 0 => Ok((ws.ws_col, ws.ws_row)),
            Ok(_) => size_from_env().ok_or_else(|| {
                io::Error::new(io::ErrorKind::Unsupported, "terminal reports a zero size").into()
            }),
            Err(errno) => size_from_env().ok_or_else(|| io::Error::from(errno).into()),
        }
    }

    // ── Single Reader Lock ───────────────────────────────────────────────

    static READER_TAKEN: AtomicBool = AtomicBool::new(false);

    /// Held by the one [`TtyByteSource`] reading `/dev/tty`.
    #[derive(Debug)]
    pub(crate) struct ReaderLock(());

    impl ReaderLock {
        pub(crate) fn acquire() -> io::Result<Self> {
            READER_TAKEN
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .map(|_| Self(()))
                .map_err(|_| {
                    io::Error::new(
                        io::ErrorKind::ResourceBusy,
                        "terminal input already has a reader in this process",
                    )
                })
        }
    }

    impl Drop for ReaderLock {
        fn drop(&mut self) {
            READER_TAKEN.store(false, Ordering::Release);
        }
    }

    // ── Resize Notification ──────────────────────────────────────────────

    /// SIGWINCH delivered as a byte on a socket pair.
    ///
    /// signal-hook's handler writes to the sending half; we poll the
    /// receiving half next to the tty, so no thread is needed.
    #[derive(Debug)]
    pub(crate) struct ResizeSignal {
        rx: UnixStream,
        id: Option<SigId>,
    }

    impl ResizeSignal {
        fn register() -> io::Result<Self> {
            let (rx, tx) = UnixStream::pair()?;
            rx.set_nonblocking(true)?;
            tx.set_nonblocking(true)?;
            let id = signal_hook::low_level::pipe::register(SIGWINCH, tx)?;
            Ok(Self { rx, id: Some(id) })
        }

        /// A signal-free stand-in; whoever holds the peer triggers it.
        #[cfg(test)]
        pub(crate) fn from_stream(rx: UnixStream) -> io::Result<Self> {
            rx.set_nonblocking(true)?;
            Ok(Self { rx, id: None })
        }

        /// Consume every pending notification.
        fn drain(&mut self) {
            let mut sink = [0u8; 64];
            loop {
                match self.rx.read(&mut sink) {
                    Ok(0) => break,
                    Ok(_) => continue,
                    Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                    Err(_) => break,
                }
            }
        }
    }

    impl Drop for ResizeSignal {
        fn drop(&mut self) {
            if let Some(id) = self.id.take() {
                signal_hook::low_level::unregister(id);
            }
        }
    }

    // ── Byte Source ──────────────────────────────────────────────────────

    /// Terminal input from `/dev/tty`.
    ///
    /// `read_available` waits with `poll(2)` on the tty and, when registered,
    /// the SIGWINCH socket. A resize wakes the wait, records the new size for
    /// [`take_resize`](ByteSource::take_resize) and returns `Ok(0)`. A signal
    /// interrupting the wait is also `Ok(0)`.
    pub struct TtyByteSource {
        input: File,
        resize: Option<ResizeSignal>,
        pending_resize: Option<(u16, u16)>,
        query_size: fn() -> Result<(u16, u16)>,
        _lock: Option<ReaderLock>,
    }

    impl std::fmt::Debug for TtyByteSource {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("TtyByteSource")
                .field("resize", &self.resize.is_some())
                .field("pending_resize", &self.pending_resize)
                .finish_non_exhaustive()
        }
    }

    impl TtyByteSource {
        /// Open the controlling terminal for reading.
        ///
        /// Fails with `ResourceBusy` while another source is open. Resize
        /// notification is best effort: if the handler cannot be installed
        /// the source still reads input.
        pub fn open() -> Result<Self> {
            let lock = ReaderLock::acquire()?;
            let input = File::open("/dev/tty")?;
            let resize = match ResizeSignal::register() {
                Ok(signal) => Some(signal),
                Err(err) => {
                    termwire_core::warn!(error = %err, "SIGWINCH handler unavailable");
                    None
                }
            };
            Ok(Self {
                input,
                resize,
                pending_resize: None,
                query_size: window_size,
                _lock: Some(lock),
            })
        }

        /// Read from an arbitrary descriptor, such as a pipe or socket.
        ///
        /// No resize notifications and no single-reader lock.
        #[must_use]
        pub fn from_file(input: File) -> Self {
            Self {
                input,
                resize: None,
                pending_resize: None,
                query_size: window_size,
                _lock: None,
            }
        }

        #[cfg(test)]
        pub(crate) fn with_resize(
            mut self,
            resize: ResizeSignal,
            query_size: fn() -> Result<(u16, u16)>,
        ) -> Self {
            self.resize = Some(resize);
            self.query_size = query_size;
            self
        }

        fn note_resize(&mut self) {
            if let Some(signal) = self.resize.as_mut() {
                signal.drain();
            }
            match (self.query_size)() {
                Ok(size) => self.pending_resize = Some(size),
                Err(err) => {
                    termwire_core::debug!(error = %err, "size query after SIGWINCH failed");
                }
            }
        }
    }

    /// `poll(2)` timeout in whole milliseconds, rounded up so short waits
    /// still sleep.
    fn poll_timeout(timeout: Option<Duration>) -> PollTimeout {
        match timeout {
            None => PollTimeout::NONE,
            Some(d) => {
                let ms = d.as_micros().div_ceil(1000);
                PollTimeout::from(u16::try_from(ms).unwrap_or(u16::MAX))
            }
        }
    }

    impl ByteSource for TtyByteSource {
        fn read_available(&mut self, buf: &mut [u8], timeout: Option<Duration>) -> io::Result<usize> {
            let (input_ready, resized) = {
                let mut fds = Vec::with_capacity(2);
                fds.push(PollFd::new(self.input.as_fd(), PollFlags::POLLIN));
                if let Some(signal) = &self.resize {
                    fds.push(PollFd::new(signal.rx.as_fd(), PollFlags::POLLIN));
                }
                match nix::poll::poll(&mut fds, poll_timeout(timeout)) {
                    Ok(0) => return Ok(0),
                    Ok(_) => {}
                    Err(Errno::EINTR) => return Ok(0),
                    Err(errno) => return Err(errno.into()),
                }
                let ready = |fd: &PollFd<'_>| {
                    fd.revents().is_some_and(|r| {
                        r.intersects(PollFlags::POLLIN | PollFlags::POLLHUP | PollFlags::POLLERR)
                    })
                };
                (ready(&fds[0]), fds.get(1).is_some_and(ready))
            };

            if resized {
                self.note_resize();
            }
            if !input_ready {
                return Ok(0);
            }
            loop {
                return match self.input.read(buf) {
                    Ok(0) => Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "terminal input closed",
                    )),
                    Ok(n) => Ok(n),
                    Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                    Err(err) if err.kind() == io::ErrorKind::WouldBlock => Ok(0),
                    Err(err) => Err(err),
                };
            }
        }

        fn take_resize(&mut self) -> Option<(u16, u16)> {
            self.pending_resize.take()
        }
    }

}

// ── Terminal ─────────────────────────────────────────────────────────────

/// Output queue, event pump and raw-mode controller for one terminal.
///
/// Output is buffered until [`flush`](Terminal::flush) or
/// [`execute`](Terminal::execute). Input is read through the pump; only one
/// `Terminal` over the real tty can exist at a time.
pub struct Terminal<W: Write = Stdout, S: ByteSource = DefaultSource, C: Clock = MonotonicClock> {
    output: OutputQueue<W>,
    events: EventPump<S, C>,
    raw_mode: &'static RawModeController,
}

/// Input source a [`Terminal`] reads by default.
#[cfg(unix)]
pub type DefaultSource = TtyByteSource;
#[cfg(not(unix))]
pub type DefaultSource = termwire_core::byte_source::ScriptedSource;

#[cfg(unix)]
impl Terminal {
    /// The controlling terminal, drawing on stdout.
    pub fn open() -> Result<Self> {
        Self::with_writer(io::stdout())
    }
}

#[cfg(unix)]
impl<W: Write> Terminal<W> {
    /// The controlling terminal, drawing on `writer`.
    pub fn with_writer(writer: W) -> Result<Self> {
        let source = TtyByteSource::open()?;
        Ok(Self::from_parts(
            OutputQueue::new(writer),
            EventPump::new(source),
            raw_mode(),
        ))
    }
}

impl<W: Write, S: ByteSource, C: Clock> Terminal<W, S, C> {
    pub fn from_parts(
        output: OutputQueue<W>,
        events: EventPump<S, C>,
        raw_mode: &'static RawModeController,
    ) -> Self {
        Self {
            output,
            events,
            raw_mode,
        }
    }

    /// Buffer `commands` without writing.
    pub fn enqueue(&mut self, commands: &[Command]) -> Result<()> {
        self.output.enqueue(commands)
    }

    /// Buffer `commands` and flush.
    pub fn execute(&mut self, commands: &[Command]) -> Result<()> {
        self.output.execute(commands)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.output.flush()
    }

    /// Wait up to `timeout` for an event.
    pub fn poll(&mut self, timeout: Duration) -> Result<bool> {
        self.events.poll(timeout)
    }

    /// Block until the next event.
    pub fn read(&mut self) -> Result<Event> {
        self.events.read()
    }

    pub fn try_read(&mut self) -> Result<Option<Event>> {
        self.events.try_read()
    }

    pub fn enable_raw_mode(&self) -> Result<()> {
        self.raw_mode.enable()
    }

    pub fn disable_raw_mode(&self) -> Result<()> {
        self.raw_mode.disable()
    }

    #[must_use]
    pub fn is_raw_mode_enabled(&self) -> bool {
        self.raw_mode.is_enabled()
    }

    /// Terminal size as `(columns, rows)`.
    pub fn terminal_size(&self) -> Result<(u16, u16)> {
        self.raw_mode.terminal_size()
    }

    /// Cursor position as 0-based `(column, row)`.
    ///
    /// Pending output is flushed first so the answer reflects it. Raw mode
    /// is switched on for the duration of the query if it was off.
    pub fn cursor_position(&mut self) -> Result<(u16, u16)> {
        self.output.flush()?;
        let guard = if self.raw_mode.is_enabled() {
            None
        } else {
            Some(self.raw_mode.guard()?)
        };
        let result = self.events.cursor_position(self.output.writer_mut());
        if let Some(guard) = guard {
            guard.release()?;
        }
        result
    }

    pub fn output(&self) -> &OutputQueue<W> {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut OutputQueue<W> {
        &mut self.output
    }

    pub fn events(&self) -> &EventPump<S, C> {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventPump<S, C> {
        &mut self.events
    }
}

impl<W: Write, S: ByteSource, C: Clock> std::fmt::Debug for Terminal<W, S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Terminal")
            .field("pending_output", &self.output.pending().len())
            .field("pending_events", &self.events.pending_events())
            .field("raw_mode", &self.raw_mode.depth())
            .finish()
    }
}

/// Timeout error check for callers that retry cursor queries.
#[must_use]
pub fn is_timeout(err: &Error) -> bool {
    matches!(err, Error::Timeout)
}
