//! Simulation step counter and timestamp sources.
//!
//! # Design
//!
//! The engine's canonical time is the integer `Tick` (the route step index).
//! Delivery records additionally carry a floating-point timestamp in seconds;
//! where that comes from is pluggable through [`Clock`]:
//!
//! - [`SystemClock`] — Unix wall time, what a live dashboard wants.
//! - [`SteppedClock`] — `start + tick * period + congestion`, fully
//!   deterministic, what tests and replayable runs want.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

// ── Tick ─────────────────────────────────────────────────────────────────────

/// An absolute simulation step counter.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Tick(pub u64);

impl Tick {
    pub const ZERO: Tick = Tick(0);

    /// The tick after `self`.
    #[inline]
    pub fn next(self) -> Tick {
        Tick(self.0 + 1)
    }

    /// Cast to `usize` for indexing a route.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::ops::Add<u64> for Tick {
    type Output = Tick;
    #[inline]
    fn add(self, rhs: u64) -> Tick {
        Tick(self.0 + rhs)
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

// ── Clock ─────────────────────────────────────────────────────────────────────

/// Source of delivery timestamps, in seconds.
///
/// `now_secs` is told the current tick; `add_delay` is told about congestion
/// slowdowns so simulated clocks can account for them.
pub trait Clock: Send + Sync + 'static {
    fn now_secs(&self, tick: Tick) -> f64;

    fn add_delay(&self, _delay: Duration) {}
}

/// Unix wall-clock seconds.  Ignores the tick.
#[derive(Copy, Clone, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self, _tick: Tick) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default()
    }
}

/// Deterministic clock: `start_secs + tick * period + accumulated delay`.
#[derive(Debug)]
pub struct SteppedClock {
    start_secs: f64,
    period:     Duration,
    /// Congestion delay in microseconds.
    delay_us:   AtomicU64,
}

impl SteppedClock {
    pub fn new(start_secs: f64, period: Duration) -> Self {
        Self { start_secs, period, delay_us: AtomicU64::new(0) }
    }

    /// Total congestion delay recorded so far.
    pub fn accumulated_delay(&self) -> Duration {
        Duration::from_micros(self.delay_us.load(Ordering::Relaxed))
    }
}

impl Clock for SteppedClock {
    fn now_secs(&self, tick: Tick) -> f64 {
        self.start_secs
            + tick.0 as f64 * self.period.as_secs_f64()
            + self.accumulated_delay().as_secs_f64()
    }

    fn add_delay(&self, delay: Duration) {
        self.delay_us.fetch_add(delay.as_micros() as u64, Ordering::Relaxed);
    }
}
