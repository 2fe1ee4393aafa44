//! # Last-activity tracking shared between the transport and the tick.
//!
//! [`LivenessTracker`] holds a single timestamp of last-observed activity.
//! It is written by the transport's activity notification (once per inbound
//! message) and read by the periodic tick, concurrently, for the lifetime of
//! one watchdog.
//!
//! ## Rules
//! - `record()` never blocks: one relaxed atomic `fetch_max`.
//! - The stored timestamp is **monotonically non-decreasing**, even under
//!   concurrent writers (`fetch_max` keeps the greater of previous and now).
//! - Reads never observe a torn value: the timestamp is a single `AtomicU64`
//!   of nanoseconds against an `Instant` origin captured at construction,
//!   so wall-clock adjustments cannot move it.
//! - The tracker is initialized to "now", so it is never read before first
//!   write and a freshly started watchdog is never immediately stale.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, Instant};

/// Concurrency-safe last-activity timestamp.
///
/// ### Responsibilities
/// - Absorb activity notifications from the transport context (fast, lock-free)
/// - Answer "how long has the subscription been silent" for the tick context
/// - Reset after a successful recovery so the just-restored link is not
///   immediately judged stale again
#[derive(Debug)]
pub struct LivenessTracker {
    /// Time origin; all stored values are offsets from here.
    origin: Instant,
    /// Nanoseconds since `origin` at the last observed activity.
    last: AtomicU64,
}

impl LivenessTracker {
    /// Creates a tracker with last-activity set to now.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            last: AtomicU64::new(0),
        }
    }

    /// Records activity at the current instant.
    ///
    /// Callable from the transport's notification context at any time,
    /// including concurrently with [`elapsed`](Self::elapsed). The stored
    /// timestamp only ever advances: concurrent calls resolve to the
    /// greatest observed instant.
    pub fn record(&self) {
        let now = self.now_nanos();
        self.last.fetch_max(now, AtomicOrdering::Relaxed);
    }

    /// Equivalent to [`record`](Self::record); used after a successful
    /// recovery so the restored link starts with a fresh quiet period.
    pub fn reset(&self) {
        self.record();
    }

    /// Returns the time elapsed since the last observed activity.
    pub fn elapsed(&self) -> Duration {
        let now = self.now_nanos();
        let last = self.last.load(AtomicOrdering::Relaxed);
        Duration::from_nanos(now.saturating_sub(last))
    }

    fn now_nanos(&self) -> u64 {
        // Saturates after ~584 years of watchdog uptime.
        self.origin.elapsed().as_nanos().min(u128::from(u64::MAX)) as u64
    }
}

impl Default for LivenessTracker {
    fn default() -> Self {
        Self::new()
    }
}
