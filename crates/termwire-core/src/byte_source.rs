#![forbid(unsafe_code)]

//! Input byte sources.
//!
//! The event pump reads terminal input through [`ByteSource`]. The native
//! implementation lives in `termwire-tty`; [`ScriptedSource`] replays a fixed
//! script for tests.

use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::ManualClock;

/// A readable stream of terminal input bytes.
///
/// # Contract
///
/// - `read_available` waits at most `timeout` (forever for `None`) for input,
///   then returns the bytes already available, up to `buf.len()`.
/// - `Ok(0)` means the wait ended without input: the timeout elapsed, or a
///   resize notification arrived (see [`take_resize`](Self::take_resize)).
/// - End of input is `Err` with kind `UnexpectedEof`.
pub trait ByteSource {
    fn read_available(&mut self, buf: &mut [u8], timeout: Option<Duration>) -> io::Result<usize>;

    /// The latest window size reported since the last call, if any.
    fn take_resize(&mut self) -> Option<(u16, u16)> {
        None
    }
}

impl<T: ByteSource + ?Sized> ByteSource for &mut T {
    fn read_available(&mut self, buf: &mut [u8], timeout: Option<Duration>) -> io::Result<usize> {
        (**self).read_available(buf, timeout)
    }

    fn take_resize(&mut self) -> Option<(u16, u16)> {
        (**self).take_resize()
    }
}

impl<T: ByteSource + ?Sized> ByteSource for Box<T> {
    fn read_available(&mut self, buf: &mut [u8], timeout: Option<Duration>) -> io::Result<usize> {
        (**self).read_available(buf, timeout)
    }

    fn take_resize(&mut self) -> Option<(u16, u16)> {
        (**self).take_resize()
    }
}

/// One step of a [`ScriptedSource`] script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    /// Bytes available immediately.
    Bytes(Vec<u8>),
    /// Silence on the line for this long.
    Pause(Duration),
    /// A window size change notification.
    Resize(u16, u16),
    /// End of input.
    Close,
}

/// Deterministic [`ByteSource`] for tests.
///
/// Waiting is simulated: a read that has to wait advances the attached
/// [`ManualClock`] instead of sleeping. A read with no timeout and nothing
/// left to replay fails with `UnexpectedEof` rather than hanging.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    script: VecDeque<Chunk>,
    clock: Option<Arc<ManualClock>>,
    resize: Option<(u16, u16)>,
    reads: usize,
}

impl ScriptedSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance `clock` whenever a read waits.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<ManualClock>) -> Self {
        self.clock = Some(clock);
        self
    }

    #[must_use]
    pub fn bytes(mut self, bytes: impl AsRef<[u8]>) -> Self {
        self.push(Chunk::Bytes(bytes.as_ref().to_vec()));
        self
    }

    #[must_use]
    pub fn pause(mut self, duration: Duration) -> Self {
        self.push(Chunk::Pause(duration));
        self
    }

    #[must_use]
    pub fn resize(mut self, columns: u16, rows: u16) -> Self {
        self.push(Chunk::Resize(columns, rows));
        self
    }

    #[must_use]
    pub fn close(mut self) -> Self {
        self.push(Chunk::Close);
        self
    }

    /// Append a step to the end of the script.
    pub fn push(&mut self, chunk: Chunk) {
        self.script.push_back(chunk);
    }

    /// Number of `read_available` calls so far.
    #[must_use]
    pub fn reads(&self) -> usize {
        self.reads
    }

    /// True once every step has been replayed.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.script.is_empty()
    }

    fn wait(&self, dt: Duration) {
        if let Some(clock) = &self.clock {
            clock.advance(dt);
        }
    }
}

impl ByteSource for ScriptedSource {
    fn read_available(&mut self, buf: &mut [u8], timeout: Option<Duration>) -> io::Result<usize> {
        self.reads += 1;
        let mut budget = timeout;
        loop {
            match self.script.front_mut() {
                Some(Chunk::Bytes(bytes)) => {
                    let n = bytes.len().min(buf.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                    bytes.drain(..n);
                    if bytes.is_empty() {
                        self.script.pop_front();
                    }
                    return Ok(n);
                }
                Some(Chunk::Resize(columns, rows)) => {
                    self.resize = Some((*columns, *rows));
                    self.script.pop_front();
                    return Ok(0);
                }
                Some(Chunk::Pause(remaining)) => {
                    let pause = *remaining;
                    match budget {
                        Some(left) if left < pause => {
                            *remaining = pause - left;
                            self.wait(left);
                            return Ok(0);
                        }
                        _ => {
                            self.script.pop_front();
                            self.wait(pause);
                            budget = budget.map(|left| left - pause);
                        }
                    }
                }
                Some(Chunk::Close) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "scripted input closed",
                    ));
                }
                None => {
                    return match budget {
                        Some(left) => {
                            self.wait(left);
                            Ok(0)
                        }
                        None => Err(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            "scripted input exhausted",
                        )),
                    };
                }
            }
        }
    }

    fn take_resize(&mut self) -> Option<(u16, u16)> {
        self.resize.take()
    }
}
