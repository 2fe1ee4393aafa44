//! # Watchdog configuration.
//!
//! Provides [`WatchdogConfig`]: every knob of the watchdog, loaded once at
//! startup and immutable thereafter. There is no configuration framework;
//! construct the struct, adjust fields, and hand it to
//! [`Watchdog::new`](crate::Watchdog::new), which runs [`WatchdogConfig::validate`]
//! as the fatal startup gate.
//!
//! ## Preconditions
//! - `stale_threshold` must be strictly greater than `tick_interval` in any
//!   reasonable deployment, else the watchdog never observes a full quiet
//!   period before re-checking. Documented, **not enforced**.
//! - A long-lived `tunnel_start_command` must background itself (e.g.
//!   `ssh -f`): the recovery step waits for the command to exit.

use std::time::Duration;

use crate::error::ConfigError;

/// Immutable watchdog configuration.
///
/// ## Field semantics
/// - `broker_addr`: bus-client connection target (passed to the connector)
/// - `topic`: subscription filter string
/// - `tunnel_start_command`: shell command establishing the tunnel (required)
/// - `tunnel_kill_command`: shell command terminating any existing tunnel
///   (blank = skip that recovery step)
/// - `stale_threshold`: silence duration that triggers recovery
/// - `tick_interval`: liveness check cadence — also the only retry cadence
///   after a failed recovery (no backoff by design)
/// - `settle_delay`: fixed pause between starting the tunnel and connecting
/// - `grace`: shutdown bound for the final disconnect
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by Bus)
#[derive(Clone, Debug)]
pub struct WatchdogConfig {
    /// Bus-client connection target, e.g. `tcp://localhost:1883`.
    pub broker_addr: String,

    /// Topic filter to (re)subscribe to.
    pub topic: String,

    /// Shell command that establishes the tunnel. Required.
    ///
    /// Runs to completion during recovery; background long-lived tunnels
    /// (`ssh -f -N -L 1883:localhost:1883 user@bastion`).
    pub tunnel_start_command: String,

    /// Shell command that terminates any existing tunnel, e.g.
    /// `pkill -f 'ssh -N -L 1883'`. Blank skips the kill step.
    pub tunnel_kill_command: String,

    /// Silence duration after which the subscription is judged stale.
    pub stale_threshold: Duration,

    /// Interval between liveness checks. Must be non-zero.
    pub tick_interval: Duration,

    /// Pause after starting the tunnel before the broker port is assumed
    /// reachable.
    pub settle_delay: Duration,

    /// Maximum time to wait for the final disconnect at shutdown before
    /// abandoning it.
    pub grace: Duration,

    /// Capacity of the event bus broadcast ring buffer.
    pub bus_capacity: usize,
}

impl WatchdogConfig {
    /// Validates the configuration; the watchdog must not start otherwise.
    ///
    /// # Errors
    /// - [`ConfigError::MissingSetting`] for a blank broker address, topic,
    ///   or tunnel start command (the kill command is optional).
    /// - [`ConfigError::ZeroTickInterval`] when the tick interval is zero.
    ///
    /// # Example
    /// ```
    /// use tunnelvisor::WatchdogConfig;
    ///
    /// let mut cfg = WatchdogConfig::default();
    /// assert!(cfg.validate().is_err()); // no tunnel command configured
    ///
    /// cfg.tunnel_start_command = "ssh -f -N -L 1883:localhost:1883 bastion".into();
    /// assert!(cfg.validate().is_ok());
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.broker_addr.trim().is_empty() {
            return Err(ConfigError::MissingSetting("broker_addr"));
        }
        if self.topic.trim().is_empty() {
            return Err(ConfigError::MissingSetting("topic"));
        }
        if self.tunnel_start_command.trim().is_empty() {
            return Err(ConfigError::MissingSetting("tunnel_start_command"));
        }
        if self.tick_interval.is_zero() {
            return Err(ConfigError::ZeroTickInterval);
        }
        Ok(())
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for WatchdogConfig {
    /// Default configuration:
    ///
    /// - `broker_addr = "tcp://localhost:1883"` (tunnel-local broker port)
    /// - `topic = "#"` (any activity counts as liveness)
    /// - tunnel commands empty — the start command **must** be filled in
    ///   before [`validate`](WatchdogConfig::validate) passes
    /// - `stale_threshold = 60s`, `tick_interval = 5s` (check 12× per
    ///   quiet period)
    /// - `settle_delay = 2s` (typical ssh port-forward establishment)
    /// - `grace = 10s`, `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            broker_addr: "tcp://localhost:1883".to_string(),
            topic: "#".to_string(),
            tunnel_start_command: String::new(),
            tunnel_kill_command: String::new(),
            stale_threshold: Duration::from_secs(60),
            tick_interval: Duration::from_secs(5),
            settle_delay: Duration::from_secs(2),
            grace: Duration::from_secs(10),
            bus_capacity: 1024,
        }
    }
}
