//! # Recovery state machine for the supervised link.
//!
//! [`RecoveryDriver`] owns everything a recovery pass touches: the bus-client
//! connector, the single live connection handle, the tunnel controller, and
//! the link state. The watchdog's tick loop calls into it; nothing here ever
//! propagates an error out of a tick.
//!
//! ## States
//! ```text
//!            ensure_connected() ok
//! DISCONNECTED ────────────────────► CONNECTED
//!      ▲  ▲                              │ silence > stale_threshold
//!      │  │ recovery failed              ▼
//!      │  └───────────────────────── RECOVERING
//!      │                                 │ recovery succeeded
//!      └── shutdown()                    └────────────► CONNECTED
//! ```
//!
//! ## Recovery sequence (strictly ordered, each step best-effort)
//! ```text
//! 1. kill-tunnel command     (failures ignored — tunnel may not exist)
//! 2. start-tunnel command    (spawn failure published, sequence proceeds)
//! 3. settle delay            (tunnel needs time before the port is reachable)
//! 4. disconnect if connected (defensive, idempotent, errors ignored)
//! 5. connect
//! 6. subscribe
//! ```
//! On success of 5–6: `CONNECTED`, liveness reset. On failure of either:
//! `DISCONNECTED`, no further retries this tick — the next scheduled tick is
//! the only retry cadence (no backoff, no retry counters, by design).
//!
//! ## Rules
//! - At most one connection handle exists at any instant: the old handle is
//!   taken out and dropped before any new connect.
//! - A stale tick recovers **unconditionally**, even if the client still
//!   reports itself connected — a transport can look healthy while the
//!   subscription has silently stopped delivering.
//! - Exactly one of `RecoverySucceeded` / `RecoveryFailed` is published per
//!   recovery pass.

use std::sync::Arc;
use std::time::Duration;

use crate::client::{BusConnection, BusConnector, TransportEvents};
use crate::config::WatchdogConfig;
use crate::error::TransportError;
use crate::events::{Bus, Event, EventKind};
use crate::liveness::LivenessTracker;
use crate::tunnel::TunnelController;

/// Connection state of the supervised link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LinkState {
    Disconnected,
    Connected,
    Recovering,
}

/// Transport observer installed on every connection: feeds the liveness
/// tracker and surfaces connection-lost notices as events.
struct LinkListener {
    liveness: Arc<LivenessTracker>,
    bus: Bus,
}

impl TransportEvents for LinkListener {
    fn on_message(&self) {
        self.liveness.record();
    }

    fn on_connection_lost(&self, reason: &str) {
        // Informational: the tick loop remains the only recovery trigger.
        self.bus
            .publish(Event::new(EventKind::ConnectionLost).with_reason(reason));
    }
}

/// Drives the link through connect, staleness detection, and recovery.
pub(crate) struct RecoveryDriver {
    broker_addr: String,
    topic: String,
    stale_threshold: Duration,
    connector: Box<dyn BusConnector>,
    tunnel: TunnelController,
    liveness: Arc<LivenessTracker>,
    listener: Arc<dyn TransportEvents>,
    conn: Option<Box<dyn BusConnection>>,
    state: LinkState,
    bus: Bus,
}

impl RecoveryDriver {
    pub(crate) fn new(
        cfg: &WatchdogConfig,
        connector: Box<dyn BusConnector>,
        bus: Bus,
        liveness: Arc<LivenessTracker>,
    ) -> Self {
        let tunnel = TunnelController::new(
            bus.clone(),
            cfg.tunnel_start_command.clone(),
            cfg.tunnel_kill_command.clone(),
            cfg.settle_delay,
        );
        let listener = Arc::new(LinkListener {
            liveness: Arc::clone(&liveness),
            bus: bus.clone(),
        });
        Self {
            broker_addr: cfg.broker_addr.clone(),
            topic: cfg.topic.clone(),
            stale_threshold: cfg.stale_threshold,
            connector,
            tunnel,
            liveness,
            listener,
            conn: None,
            state: LinkState::Disconnected,
            bus,
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> LinkState {
        self.state
    }

    /// One periodic liveness check.
    ///
    /// Dispatches on the link state:
    /// - `Connected`: compare silence against the stale threshold; recover
    ///   on breach.
    /// - `Disconnected`: re-run the ensure-connected path — the tick
    ///   interval is the only retry cadence after a failure.
    /// - `Recovering` is unobservable here: recovery runs inline in the
    ///   tick, so a new tick can only see a settled state.
    pub(crate) async fn on_tick(&mut self) {
        match self.state {
            LinkState::Connected => {
                let elapsed = self.liveness.elapsed();
                if elapsed > self.stale_threshold {
                    self.on_stale_tick(elapsed).await;
                }
            }
            LinkState::Disconnected => self.ensure_connected().await,
            LinkState::Recovering => {}
        }
    }

    /// Startup path (and disconnected-state retry): direct connect and
    /// subscribe; on any failure, exactly one full recovery pass. If that
    /// also fails the link stays `Disconnected` until the next tick.
    pub(crate) async fn ensure_connected(&mut self) {
        match self.connect_and_subscribe().await {
            Ok(()) => {
                self.state = LinkState::Connected;
                self.liveness.reset();
                self.bus
                    .publish(Event::new(EventKind::LinkUp).with_topic(self.topic.as_str()));
            }
            Err(e) => {
                self.bus
                    .publish(Event::new(EventKind::ConnectFailed).with_reason(e.to_string()));
                self.recover().await;
            }
        }
    }

    /// Staleness breach observed by the tick: run the full recovery
    /// sequence unconditionally.
    pub(crate) async fn on_stale_tick(&mut self, elapsed: Duration) {
        self.bus
            .publish(Event::new(EventKind::StaleDetected).with_elapsed(elapsed));
        self.recover().await;
    }

    /// The full ordered sequence: kill → start → settle → connect →
    /// subscribe. Tunnel step failures are published and skipped over; only
    /// connect/subscribe failures decide the outcome.
    async fn recover(&mut self) {
        self.state = LinkState::Recovering;
        self.bus.publish(Event::new(EventKind::RecoveryStarted));

        self.tunnel.kill_existing().await;
        self.tunnel.start().await;
        self.tunnel.settle().await;

        match self.connect_and_subscribe().await {
            Ok(()) => {
                self.state = LinkState::Connected;
                self.liveness.reset();
                self.bus.publish(
                    Event::new(EventKind::RecoverySucceeded).with_topic(self.topic.as_str()),
                );
            }
            Err(e) => {
                self.state = LinkState::Disconnected;
                self.bus
                    .publish(Event::new(EventKind::RecoveryFailed).with_reason(e.to_string()));
            }
        }
    }

    /// Defensive disconnect, then connect and subscribe. The old handle is
    /// always discarded first, so at most one handle exists at a time.
    async fn connect_and_subscribe(&mut self) -> Result<(), TransportError> {
        if let Some(mut old) = self.conn.take() {
            if old.is_connected() {
                let _ = old.disconnect().await;
            }
        }

        let mut conn = self
            .connector
            .connect(&self.broker_addr, Arc::clone(&self.listener))
            .await?;
        if let Err(e) = conn.subscribe(&self.topic).await {
            let _ = conn.disconnect().await;
            return Err(e);
        }
        self.conn = Some(conn);
        Ok(())
    }

    /// Releases the connection handle: disconnect if connected (errors
    /// ignored), then drop.
    pub(crate) async fn shutdown(&mut self) {
        if let Some(mut conn) = self.conn.take() {
            if conn.is_connected() {
                let _ = conn.disconnect().await;
            }
        }
        self.state = LinkState::Disconnected;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fake::{FakeConnector, FakeHub};
    use std::sync::atomic::Ordering;
    use tokio::sync::broadcast::Receiver;

    fn driver(hub: &Arc<FakeHub>, stale_threshold: Duration) -> (RecoveryDriver, Receiver<Event>) {
        let bus = Bus::new(512);
        let rx = bus.subscribe();
        let cfg = WatchdogConfig {
            topic: "sensors/#".into(),
            tunnel_start_command: "echo tunnel-start".into(),
            tunnel_kill_command: "echo tunnel-kill".into(),
            settle_delay: Duration::from_millis(5),
            stale_threshold,
            ..WatchdogConfig::default()
        };
        let liveness = Arc::new(LivenessTracker::new());
        let connector = Box::new(FakeConnector {
            hub: Arc::clone(hub),
        });
        (RecoveryDriver::new(&cfg, connector, bus, liveness), rx)
    }

    fn drain(rx: &mut Receiver<Event>) -> Vec<Event> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push(ev);
        }
        out
    }

    fn position(events: &[Event], pred: impl Fn(&Event) -> bool, what: &str) -> usize {
        events
            .iter()
            .position(pred)
            .unwrap_or_else(|| panic!("event missing: {what}"))
    }

    #[tokio::test]
    async fn test_ensure_connected_success() {
        let hub = Arc::new(FakeHub::default());
        let (mut driver, mut rx) = driver(&hub, Duration::from_secs(60));

        driver.ensure_connected().await;

        assert_eq!(driver.state(), LinkState::Connected);
        assert_eq!(hub.connects.load(Ordering::SeqCst), 1);
        assert_eq!(hub.live.load(Ordering::SeqCst), 1);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::LinkUp);
        assert_eq!(events[0].topic.as_deref(), Some("sensors/#"));
    }

    #[tokio::test]
    async fn test_startup_failure_runs_recovery_exactly_once() {
        let hub = Arc::new(FakeHub::default());
        hub.fail_connect.store(true, Ordering::SeqCst);
        let (mut driver, mut rx) = driver(&hub, Duration::from_secs(60));

        driver.ensure_connected().await;

        // One direct attempt plus one attempt inside the recovery pass.
        assert_eq!(hub.connects.load(Ordering::SeqCst), 2);
        assert_eq!(driver.state(), LinkState::Disconnected);
        assert_eq!(hub.live.load(Ordering::SeqCst), 0);

        let events = drain(&mut rx);
        let failed = position(&events, |e| e.kind == EventKind::ConnectFailed, "ConnectFailed");
        let started = position(
            &events,
            |e| e.kind == EventKind::RecoveryStarted,
            "RecoveryStarted",
        );
        let recovery_failed = position(
            &events,
            |e| e.kind == EventKind::RecoveryFailed,
            "RecoveryFailed",
        );
        assert!(failed < started && started < recovery_failed);
        assert_eq!(
            events
                .iter()
                .filter(|e| e.kind == EventKind::RecoveryStarted)
                .count(),
            1,
            "recovery must run exactly once per ensure_connected failure"
        );
    }

    #[tokio::test]
    async fn test_recovery_step_order_is_invariant() {
        let hub = Arc::new(FakeHub::default());
        let (mut driver, mut rx) = driver(&hub, Duration::from_secs(60));
        driver.ensure_connected().await;

        driver.on_stale_tick(Duration::from_secs(65)).await;

        let events = drain(&mut rx);
        let stale = position(&events, |e| e.kind == EventKind::StaleDetected, "StaleDetected");
        let kill = position(
            &events,
            |e| {
                e.kind == EventKind::CommandRunning
                    && e.reason.as_deref() == Some("echo tunnel-kill")
            },
            "kill command",
        );
        let start = position(
            &events,
            |e| {
                e.kind == EventKind::CommandRunning
                    && e.reason.as_deref() == Some("echo tunnel-start")
            },
            "start command",
        );
        let settle = position(&events, |e| e.kind == EventKind::Settling, "Settling");
        let done = position(
            &events,
            |e| e.kind == EventKind::RecoverySucceeded,
            "RecoverySucceeded",
        );
        assert!(
            stale < kill && kill < start && start < settle && settle < done,
            "sequence out of order: stale={stale} kill={kill} start={start} settle={settle} done={done}"
        );
        assert_eq!(events[stale].elapsed_ms, Some(65_000));
    }

    #[tokio::test]
    async fn test_stale_recovery_replaces_handle_and_resets_liveness() {
        let hub = Arc::new(FakeHub::default());
        let (mut driver, _rx) = driver(&hub, Duration::from_secs(60));
        driver.ensure_connected().await;

        std::thread::sleep(Duration::from_millis(30));
        driver.on_stale_tick(driver.liveness.elapsed()).await;

        assert_eq!(driver.state(), LinkState::Connected);
        // Old handle disconnected defensively, new one live.
        assert!(hub.disconnects.load(Ordering::SeqCst) >= 1);
        assert_eq!(hub.live.load(Ordering::SeqCst), 1);
        assert_eq!(hub.connects.load(Ordering::SeqCst), 2);
        assert!(
            driver.liveness.elapsed() < Duration::from_millis(30),
            "liveness not reset after successful recovery"
        );
    }

    #[tokio::test]
    async fn test_subscribe_failure_retries_once_per_tick_without_growth() {
        let hub = Arc::new(FakeHub::default());
        hub.fail_subscribe.store(true, Ordering::SeqCst);
        let (mut driver, mut rx) = driver(&hub, Duration::from_secs(60));

        driver.ensure_connected().await;
        assert_eq!(driver.state(), LinkState::Disconnected);

        for _ in 0..3 {
            driver.on_tick().await;
            assert_eq!(driver.state(), LinkState::Disconnected);
        }

        // Each pass: one direct attempt plus one recovery attempt.
        assert_eq!(hub.connects.load(Ordering::SeqCst), 8);
        assert_eq!(
            drain(&mut rx)
                .iter()
                .filter(|e| e.kind == EventKind::RecoveryStarted)
                .count(),
            4,
            "expected exactly one recovery sequence per pass"
        );
        // Failed subscribes must not leak handles.
        assert_eq!(hub.live.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fresh_link_is_left_alone() {
        let hub = Arc::new(FakeHub::default());
        let (mut driver, mut rx) = driver(&hub, Duration::from_secs(60));
        driver.ensure_connected().await;
        drain(&mut rx);

        driver.on_tick().await;

        assert_eq!(hub.connects.load(Ordering::SeqCst), 1);
        assert!(
            drain(&mut rx).is_empty(),
            "tick on a fresh link published events"
        );
    }

    #[tokio::test]
    async fn test_tick_triggers_recovery_on_stale() {
        let hub = Arc::new(FakeHub::default());
        let (mut driver, mut rx) = driver(&hub, Duration::from_millis(1));
        driver.ensure_connected().await;

        std::thread::sleep(Duration::from_millis(10));
        driver.on_tick().await;

        let events = drain(&mut rx);
        assert!(
            events.iter().any(|e| e.kind == EventKind::RecoverySucceeded),
            "stale tick did not recover"
        );
        assert!(driver.liveness.elapsed() < Duration::from_millis(10));
    }

    #[tokio::test]
    async fn test_shutdown_releases_handle() {
        let hub = Arc::new(FakeHub::default());
        let (mut driver, _rx) = driver(&hub, Duration::from_secs(60));
        driver.ensure_connected().await;

        driver.shutdown().await;

        assert_eq!(driver.state(), LinkState::Disconnected);
        assert_eq!(hub.disconnects.load(Ordering::SeqCst), 1);
        assert_eq!(hub.live.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_shutdown_without_connection_is_noop() {
        let hub = Arc::new(FakeHub::default());
        let (mut driver, _rx) = driver(&hub, Duration::from_secs(60));

        driver.shutdown().await;

        assert_eq!(hub.disconnects.load(Ordering::SeqCst), 0);
    }
}
