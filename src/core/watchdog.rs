//! # Watchdog: lifecycle, periodic tick, and orderly shutdown.
//!
//! The [`Watchdog`] owns the event bus, a [`SubscriberSet`], the liveness
//! tracker, and the recovery driver. [`Watchdog::run`] performs the initial
//! ensure-connected pass, then drives the periodic liveness tick until a
//! shutdown signal or the runtime token stops it.
//!
//! ## High-level flow
//! ```text
//! Watchdog::run(token):
//!   - forwarder task: Bus.subscribe() ─► SubscriberSet::emit(&Event)
//!   - driver.ensure_connected()                 (startup path)
//!   - interval(tick_interval), MissedTickBehavior::Delay
//!   - loop select:
//!       OS signal ────────────┐
//!       token cancelled ──────┼─► break
//!       ticker.tick() ─► driver.on_tick()       (recovery runs inline here)
//!   - publish ShutdownRequested
//!   - disconnect within grace ─► Stopped        (or GraceExceeded)
//! ```
//!
//! ## Rules
//! - **Ticks never overlap.** Recovery runs inline in the tick arm, so the
//!   ticker is simply not polled while a recovery (settle delay, subprocess
//!   waits) is in flight; `MissedTickBehavior::Delay` reschedules the next
//!   tick a full interval after the loop resumes. Monitoring is paused for
//!   the duration of a recovery attempt — a recovery in progress *is* the
//!   meaningful state, and a concurrent attempt would race on the tunnel
//!   and the connection handle.
//! - **No leaks on any exit path.** The ticker dies with `run`; the
//!   connection handle is disconnected within `grace` and dropped
//!   regardless of the outcome.
//! - **Shutdown is observed between ticks.** An in-flight recovery step is
//!   never cancelled; the signal takes effect when it completes.

use std::sync::Arc;

use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::client::BusConnector;
use crate::config::WatchdogConfig;
use crate::core::{recovery::RecoveryDriver, shutdown};
use crate::error::{ConfigError, RuntimeError};
use crate::events::{Bus, Event, EventKind};
use crate::liveness::LivenessTracker;
use crate::subscribers::{Subscribe, SubscriberSet};

/// Supervises one bus subscription behind one tunnel.
///
/// Construct with [`Watchdog::new`], then call [`Watchdog::run`]; cancel the
/// token (or send a termination signal) to stop.
pub struct Watchdog {
    cfg: WatchdogConfig,
    bus: Bus,
    subs: Arc<SubscriberSet>,
    driver: RecoveryDriver,
}

impl Watchdog {
    /// Validates the configuration and assembles the watchdog.
    ///
    /// # Errors
    /// [`ConfigError`] when required settings are missing — the watchdog
    /// must not start without its commands and connection target.
    pub fn new(
        cfg: WatchdogConfig,
        connector: Box<dyn BusConnector>,
        subscribers: Vec<Arc<dyn Subscribe>>,
    ) -> Result<Self, ConfigError> {
        cfg.validate()?;

        let bus = Bus::new(cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(subscribers));
        let liveness = Arc::new(LivenessTracker::new());
        let driver = RecoveryDriver::new(&cfg, connector, bus.clone(), liveness);

        Ok(Self {
            cfg,
            bus,
            subs,
            driver,
        })
    }

    /// Handle to the event bus, e.g. to attach an extra receiver.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Runs the watchdog until a termination signal arrives or
    /// `runtime_token` is cancelled.
    ///
    /// The initial connect uses the same ensure-connected path as the tick
    /// loop; a failed startup is not fatal — the ticks keep retrying at the
    /// configured interval.
    ///
    /// # Errors
    /// [`RuntimeError::GraceExceeded`] when the final disconnect did not
    /// complete within [`WatchdogConfig::grace`]; the handle is dropped
    /// regardless.
    pub async fn run(mut self, runtime_token: CancellationToken) -> Result<(), RuntimeError> {
        self.forward_to_subscribers();

        self.driver.ensure_connected().await;

        let mut ticker = time::interval(self.cfg.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first interval tick completes immediately; consume it so the
        // first liveness check happens one full interval after startup.
        ticker.tick().await;

        let signal = shutdown::wait_for_shutdown_signal();
        tokio::pin!(signal);

        loop {
            tokio::select! {
                _ = &mut signal => break,
                _ = runtime_token.cancelled() => break,
                _ = ticker.tick() => self.driver.on_tick().await,
            }
        }

        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        self.finish().await
    }

    /// Forwards bus events to the subscriber set (fire-and-forget).
    fn forward_to_subscribers(&self) {
        let mut rx = self.bus.subscribe();
        let subs = Arc::clone(&self.subs);
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => subs.emit(&ev),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    /// Releases the connection within the grace window.
    async fn finish(mut self) -> Result<(), RuntimeError> {
        let grace = self.cfg.grace;
        match time::timeout(grace, self.driver.shutdown()).await {
            Ok(()) => {
                self.bus.publish(Event::new(EventKind::Stopped));
                Ok(())
            }
            Err(_elapsed) => {
                // Dropping the timed-out future drops the handle with it.
                self.bus
                    .publish(Event::new(EventKind::GraceExceeded).with_delay(grace));
                Err(RuntimeError::GraceExceeded { grace })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fake::{FakeConnector, FakeHub};
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn config() -> WatchdogConfig {
        WatchdogConfig {
            topic: "sensors/#".into(),
            tunnel_start_command: "echo tunnel-start".into(),
            tunnel_kill_command: "echo tunnel-kill".into(),
            tick_interval: Duration::from_millis(10),
            stale_threshold: Duration::from_secs(60),
            settle_delay: Duration::from_millis(1),
            grace: Duration::from_millis(100),
            ..WatchdogConfig::default()
        }
    }

    fn watchdog(cfg: WatchdogConfig, hub: &Arc<FakeHub>) -> Watchdog {
        let connector = Box::new(FakeConnector {
            hub: Arc::clone(hub),
        });
        Watchdog::new(cfg, connector, vec![]).expect("valid config")
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let hub = Arc::new(FakeHub::default());
        let connector = Box::new(FakeConnector {
            hub: Arc::clone(&hub),
        });
        let err = Watchdog::new(WatchdogConfig::default(), connector, vec![]);
        assert!(err.is_err(), "blank tunnel command accepted");
    }

    #[tokio::test]
    async fn test_run_connects_and_releases_on_cancel() {
        let hub = Arc::new(FakeHub::default());
        let dog = watchdog(config(), &hub);
        let token = CancellationToken::new();

        let handle = tokio::spawn(dog.run(token.clone()));
        tokio::time::sleep(Duration::from_millis(30)).await;
        token.cancel();

        let result = handle.await.unwrap();
        assert!(result.is_ok());
        assert_eq!(hub.connects.load(Ordering::SeqCst), 1);
        assert_eq!(hub.live.load(Ordering::SeqCst), 0, "handle leaked");
        assert_eq!(hub.disconnects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_startup_retries_on_tick_cadence() {
        let hub = Arc::new(FakeHub::default());
        hub.fail_connect.store(true, Ordering::SeqCst);
        let dog = watchdog(config(), &hub);
        let token = CancellationToken::new();

        let handle = tokio::spawn(dog.run(token.clone()));
        tokio::time::sleep(Duration::from_millis(60)).await;
        token.cancel();
        handle.await.unwrap().unwrap();

        // Startup pass (2 attempts) plus at least one tick retry.
        assert!(
            hub.connects.load(Ordering::SeqCst) >= 4,
            "no tick-cadence retries observed: {} connects",
            hub.connects.load(Ordering::SeqCst)
        );
        assert_eq!(hub.live.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stale_link_recovers_via_tick_loop() {
        let hub = Arc::new(FakeHub::default());
        let mut cfg = config();
        cfg.stale_threshold = Duration::from_millis(1);
        let dog = watchdog(cfg, &hub);
        let mut rx = dog.bus().subscribe();
        let token = CancellationToken::new();

        let handle = tokio::spawn(dog.run(token.clone()));
        tokio::time::sleep(Duration::from_millis(60)).await;
        token.cancel();
        handle.await.unwrap().unwrap();

        let mut stale = 0;
        let mut recovered = 0;
        while let Ok(ev) = rx.try_recv() {
            match ev.kind {
                EventKind::StaleDetected => stale += 1,
                EventKind::RecoverySucceeded => recovered += 1,
                _ => {}
            }
        }
        assert!(stale >= 1, "no staleness detected");
        assert!(recovered >= 1, "no recovery completed");
        assert_eq!(hub.live.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_hanging_disconnect_hits_grace() {
        let hub = Arc::new(FakeHub::default());
        let mut cfg = config();
        cfg.grace = Duration::from_millis(20);
        let dog = watchdog(cfg, &hub);
        let token = CancellationToken::new();

        let handle = tokio::spawn(dog.run(token.clone()));
        tokio::time::sleep(Duration::from_millis(30)).await;
        hub.hang_disconnect.store(true, Ordering::SeqCst);
        token.cancel();

        let result = handle.await.unwrap();
        assert!(
            matches!(result, Err(RuntimeError::GraceExceeded { .. })),
            "expected grace overrun, got {result:?}"
        );
        assert_eq!(hub.live.load(Ordering::SeqCst), 0, "abandoned handle leaked");
    }
}
