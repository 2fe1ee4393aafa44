//! # Tunnel lifecycle steps over the command runner.
//!
//! [`TunnelController`] gives the recovery sequence its three tunnel steps
//! with the right failure semantics for each:
//!
//! - [`kill_existing`](TunnelController::kill_existing): failures ignored
//!   entirely — the tunnel may simply not exist.
//! - [`start`](TunnelController::start): a spawn failure is published and
//!   the sequence proceeds; the subsequent connect attempt is the real
//!   signal of whether the tunnel came up.
//! - [`settle`](TunnelController::settle): a fixed pause before the broker
//!   port is assumed reachable.
//!
//! The controller owns no subprocess state; each step runs its command to
//! completion through [`CommandRunner`].

use std::time::Duration;

use tokio::time;

use crate::events::{Bus, Event, EventKind};

use super::runner::CommandRunner;

/// Kill / start / settle semantics for the external tunnel process.
pub struct TunnelController {
    runner: CommandRunner,
    start_command: String,
    kill_command: String,
    settle_delay: Duration,
    bus: Bus,
}

impl TunnelController {
    /// Creates a controller for the given commands.
    ///
    /// `kill_command` may be blank (that step becomes a no-op). The start
    /// command must background itself if it is long-lived (e.g. `ssh -f`);
    /// the runner waits for it to exit.
    pub fn new(bus: Bus, start_command: String, kill_command: String, settle_delay: Duration) -> Self {
        Self {
            runner: CommandRunner::new(bus.clone()),
            start_command,
            kill_command,
            settle_delay,
            bus,
        }
    }

    /// Kills any existing tunnel. Non-zero exits and spawn errors are both
    /// ignored: there may be nothing to kill.
    pub async fn kill_existing(&self) {
        if let Err(e) = self.runner.run(&self.kill_command).await {
            self.bus
                .publish(Event::new(EventKind::TunnelSpawnFailed).with_reason(e.to_string()));
        }
    }

    /// Starts a fresh tunnel. A spawn failure is published but does not
    /// abort the recovery sequence.
    pub async fn start(&self) {
        if let Err(e) = self.runner.run(&self.start_command).await {
            self.bus
                .publish(Event::new(EventKind::TunnelSpawnFailed).with_reason(e.to_string()));
        }
    }

    /// Waits the fixed settle delay so the tunnel can establish before the
    /// connect step. Blocking from the tick context's point of view.
    pub async fn settle(&self) {
        self.bus
            .publish(Event::new(EventKind::Settling).with_delay(self.settle_delay));
        time::sleep(self.settle_delay).await;
    }
}
