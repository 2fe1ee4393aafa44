//! # Runtime events emitted by the watchdog.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Link events**: connection state of the supervised subscription
//!   (up, lost, connect failure).
//! - **Liveness events**: staleness detection by the periodic tick.
//! - **Recovery events**: the ordered recovery sequence and its steps,
//!   including tunnel subprocess lifecycle and streamed output.
//! - **Lifecycle events**: shutdown of the watchdog itself.
//!
//! The [`Event`] struct carries additional metadata such as timestamps,
//! failure reasons, silence durations, and subprocess exit codes.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when events are
//! delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tunnelvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::StaleDetected)
//!     .with_elapsed(Duration::from_secs(65))
//!     .with_reason("no message observed");
//!
//! assert_eq!(ev.kind, EventKind::StaleDetected);
//! assert_eq!(ev.elapsed_ms, Some(65_000));
//! assert_eq!(ev.reason.as_deref(), Some("no message observed"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of watchdog events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Link events ===
    /// Connect and subscribe both succeeded; the link is considered healthy.
    ///
    /// Sets:
    /// - `topic`: the subscribed topic filter
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    LinkUp,

    /// The transport reported the broker connection lost.
    ///
    /// Informational only: the periodic tick remains the sole recovery
    /// trigger (a lost connection shows up as silence).
    ///
    /// Sets:
    /// - `reason`: transport-supplied cause
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    ConnectionLost,

    /// The direct connect-and-subscribe path failed; a full recovery
    /// sequence follows.
    ///
    /// Sets:
    /// - `reason`: transport error (names the failed step)
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    ConnectFailed,

    // === Liveness events ===
    /// The tick observed silence beyond the stale threshold.
    ///
    /// Sets:
    /// - `elapsed_ms`: observed silence duration (ms)
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    StaleDetected,

    // === Recovery events ===
    /// A full recovery sequence (kill, start, settle, connect, subscribe)
    /// is beginning.
    ///
    /// Sets:
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    RecoveryStarted,

    /// A tunnel subprocess was launched.
    ///
    /// Sets:
    /// - `reason`: the shell command line
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    CommandRunning,

    /// One line of combined stdout/stderr from a tunnel subprocess,
    /// streamed while the command runs.
    ///
    /// Sets:
    /// - `reason`: the output line
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    CommandOutput,

    /// A tunnel subprocess exited.
    ///
    /// Sets:
    /// - `exit_code`: process exit code (absent when signal-terminated)
    /// - `reason`: set to a note when no exit code is available
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    CommandExited,

    /// A tunnel command could not be spawned or awaited.
    ///
    /// The recovery sequence proceeds regardless; the subsequent connect
    /// attempt is the real signal of success or failure.
    ///
    /// Sets:
    /// - `reason`: spawn/wait error message
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    TunnelSpawnFailed,

    /// Pausing for the tunnel to establish before connecting.
    ///
    /// Sets:
    /// - `delay_ms`: settle delay (ms)
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    Settling,

    /// The recovery sequence completed: connected, resubscribed, and the
    /// liveness clock reset.
    ///
    /// Sets:
    /// - `topic`: the resubscribed topic filter
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    RecoverySucceeded,

    /// The recovery sequence failed at the connect or subscribe step.
    ///
    /// The link stays down until the next scheduled tick retries.
    ///
    /// Sets:
    /// - `reason`: transport error (names the failed step)
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    RecoveryFailed,

    // === Lifecycle events ===
    /// Shutdown requested (OS signal observed or runtime token cancelled).
    ///
    /// Sets:
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    ShutdownRequested,

    /// The watchdog exited cleanly; ticker and connection handle released.
    ///
    /// Sets:
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    Stopped,

    /// The final disconnect overran the shutdown grace window and was
    /// abandoned.
    ///
    /// Sets:
    /// - `delay_ms`: the grace window (ms)
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    GraceExceeded,
}

/// Watchdog event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Human-readable detail (errors, command lines, output lines).
    pub reason: Option<Arc<str>>,
    /// Topic filter, where applicable.
    pub topic: Option<Arc<str>>,
    /// Observed silence duration in milliseconds (compact).
    pub elapsed_ms: Option<u64>,
    /// Settle/grace delay in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Subprocess exit code, where applicable.
    pub exit_code: Option<i32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and
    /// next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            reason: None,
            topic: None,
            elapsed_ms: None,
            delay_ms: None,
            exit_code: None,
        }
    }

    /// Attaches a human-readable detail line.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a topic filter.
    #[inline]
    pub fn with_topic(mut self, topic: impl Into<Arc<str>>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// Attaches an observed silence duration (stored as milliseconds).
    #[inline]
    pub fn with_elapsed(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u64::MAX)) as u64;
        self.elapsed_ms = Some(ms);
        self
    }

    /// Attaches a settle or grace delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches a subprocess exit code.
    #[inline]
    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = Some(code);
        self
    }
}
