//! Error types used by the tunnelvisor watchdog.
//!
//! This module defines the failure taxonomy of the watchdog:
//!
//! - [`ConfigError`] — invalid or incomplete configuration; fatal at startup only.
//! - [`TransportError`] — connect/subscribe/disconnect failures reported by the
//!   bus-client adapter; recovered by re-attempting at the next tick, never fatal.
//! - [`TunnelError`] — the tunnel command could not be spawned or awaited; logged,
//!   the recovery sequence proceeds (the subsequent connect attempt is the real
//!   signal of whether the tunnel came up).
//! - [`RuntimeError`] — errors raised by the watchdog runtime itself.
//!
//! All types provide helper methods (`as_label`, `as_message`) for logging.

use std::time::Duration;
use thiserror::Error;

/// # Errors raised while validating the watchdog configuration.
///
/// These are fatal at startup: the watchdog must not start without its
/// required commands and connection target configured.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required setting is unset or blank.
    #[error("missing required setting: {0}")]
    MissingSetting(&'static str),

    /// The tick interval is zero; the periodic schedule cannot be armed.
    #[error("tick interval must be non-zero")]
    ZeroTickInterval,
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::MissingSetting(_) => "config_missing_setting",
            ConfigError::ZeroTickInterval => "config_zero_tick_interval",
        }
    }
}

/// # Errors reported by the bus-client adapter.
///
/// Every variant is recoverable: the next scheduled tick re-attempts the
/// connection, so none of these ever propagate out of the tick handler.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TransportError {
    /// Connecting to the broker failed.
    #[error("connect failed: {reason}")]
    Connect {
        /// Adapter-supplied failure detail.
        reason: String,
    },

    /// Subscribing to the topic failed (independently of connect).
    #[error("subscribe failed: {reason}")]
    Subscribe {
        /// Adapter-supplied failure detail.
        reason: String,
    },

    /// Disconnecting failed. Always ignored by the recovery sequence.
    #[error("disconnect failed: {reason}")]
    Disconnect {
        /// Adapter-supplied failure detail.
        reason: String,
    },
}

impl TransportError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use tunnelvisor::TransportError;
    ///
    /// let err = TransportError::Connect { reason: "refused".into() };
    /// assert_eq!(err.as_label(), "transport_connect");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TransportError::Connect { .. } => "transport_connect",
            TransportError::Subscribe { .. } => "transport_subscribe",
            TransportError::Disconnect { .. } => "transport_disconnect",
        }
    }

    /// Returns the recovery step this error belongs to, for step attribution
    /// in recovery logs.
    ///
    /// # Example
    /// ```
    /// use tunnelvisor::TransportError;
    ///
    /// let err = TransportError::Subscribe { reason: "no session".into() };
    /// assert_eq!(err.step(), "subscribe");
    /// ```
    pub fn step(&self) -> &'static str {
        match self {
            TransportError::Connect { .. } => "connect",
            TransportError::Subscribe { .. } => "subscribe",
            TransportError::Disconnect { .. } => "disconnect",
        }
    }
}

/// # Errors raised while running a tunnel command.
///
/// Spawn and wait failures are logged and the recovery sequence continues;
/// if the tunnel truly did not come up, the connect step fails and is
/// handled as a [`TransportError`].
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TunnelError {
    /// The subprocess could not be launched.
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        /// The shell command that failed to launch.
        command: String,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// Waiting for the subprocess to exit failed.
    #[error("failed to wait for `{command}`: {source}")]
    Wait {
        /// The shell command being awaited.
        command: String,
        /// Underlying OS error.
        source: std::io::Error,
    },
}

impl TunnelError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use tunnelvisor::TunnelError;
    ///
    /// let err = TunnelError::Spawn {
    ///     command: "ssh -N -L 1883:localhost:1883 host".into(),
    ///     source: std::io::Error::other("no such file"),
    /// };
    /// assert_eq!(err.as_label(), "tunnel_spawn");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TunnelError::Spawn { .. } => "tunnel_spawn",
            TunnelError::Wait { .. } => "tunnel_wait",
        }
    }
}

/// # Errors produced by the watchdog runtime.
///
/// These represent failures of the supervisory loop itself, not of the
/// link it supervises.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The final disconnect did not complete within the shutdown grace
    /// window; the connection handle was dropped without a clean close.
    #[error("shutdown grace {grace:?} exceeded while disconnecting; handle dropped")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use tunnelvisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5) };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::GraceExceeded { grace } => {
                format!("grace exceeded after {grace:?}; connection dropped uncleanly")
            }
        }
    }
}
