#![forbid(unsafe_code)]

//! Monotonic time as a capability.
//!
//! The event pump never calls `Instant::now` directly. It asks a [`Clock`],
//! so escape and cursor-query timeouts can be driven by [`ManualClock`] in
//! tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

/// Source of monotonic time, measured from an arbitrary epoch.
pub trait Clock {
    fn now_mono(&self) -> Duration;
}

impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn now_mono(&self) -> Duration {
        (**self).now_mono()
    }
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now_mono(&self) -> Duration {
        (**self).now_mono()
    }
}

/// Monotonic clock backed by `std::time::Instant`.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_mono(&self) -> Duration {
        self.epoch.elapsed()
    }
}

/// Clock that only moves when told to.
///
/// Shared through `Arc` between a test and the
/// [`ScriptedSource`](crate::byte_source::ScriptedSource) that simulates
/// waiting.
#[derive(Debug, Default)]
pub struct ManualClock {
    nanos: AtomicU64,
}

impl ManualClock {
    /// A clock starting at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            nanos: AtomicU64::new(0),
        }
    }

    pub fn set(&self, now: Duration) {
        self.nanos.store(saturating_nanos(now), Ordering::SeqCst);
    }

    pub fn advance(&self, dt: Duration) {
        let dt = saturating_nanos(dt);
        // fetch_update never fails with a closure that always returns Some.
        let _ = self
            .nanos
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                Some(n.saturating_add(dt))
            });
    }
}

impl Clock for ManualClock {
    fn now_mono(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}

fn saturating_nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

/// Build a `Duration`, rejecting a nanosecond part of one second or more.
pub fn checked_duration(secs: u64, nanos: u32) -> Result<Duration> {
    if nanos >= 1_000_000_000 {
        return Err(Error::invalid(format!(
            "duration nanoseconds {nanos} must be below 1_000_000_000"
        )));
    }
    Ok(Duration::new(secs, nanos))
}
