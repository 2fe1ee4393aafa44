//! Custom subscriber demo: recovery statistics next to the log writer.
//!
//! The broker here refuses every connect, so the watchdog loops through
//! full recovery passes at the tick cadence — one per tick, no backoff —
//! while a custom [`Subscribe`] implementation counts the outcomes.
//!
//! Run with: `cargo run --example custom_subscriber`

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use tunnelvisor::{
    BusConnection, BusConnector, Event, EventKind, LogWriter, Subscribe, TransportError,
    TransportEvents, Watchdog, WatchdogConfig,
};

/// Counts recovery outcomes; a stand-in for metrics or alerting hooks.
#[derive(Default)]
struct RecoveryStats {
    attempts: AtomicU64,
    failed: AtomicU64,
}

#[async_trait]
impl Subscribe for RecoveryStats {
    async fn on_event(&self, event: &Event) {
        match event.kind {
            EventKind::RecoveryStarted => {
                self.attempts.fetch_add(1, Ordering::Relaxed);
            }
            EventKind::RecoveryFailed => {
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }

    fn name(&self) -> &'static str {
        "recovery_stats"
    }
}

/// A broker that is simply unreachable.
struct DownBroker;

#[async_trait]
impl BusConnector for DownBroker {
    async fn connect(
        &self,
        _addr: &str,
        _events: Arc<dyn TransportEvents>,
    ) -> Result<Box<dyn BusConnection>, TransportError> {
        Err(TransportError::Connect {
            reason: "connection refused".into(),
        })
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let mut cfg = WatchdogConfig::default();
    cfg.tunnel_start_command = "echo pretending to start a tunnel".into();
    cfg.tick_interval = Duration::from_millis(500);
    cfg.settle_delay = Duration::from_millis(100);

    let stats = Arc::new(RecoveryStats::default());
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter), stats.clone()];
    let dog = Watchdog::new(cfg, Box::new(DownBroker), subs)?;

    let token = CancellationToken::new();
    let stopper = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        stopper.cancel();
    });

    dog.run(token).await?;

    println!(
        "recovery attempts: {}, failed: {}",
        stats.attempts.load(Ordering::Relaxed),
        stats.failed.load(Ordering::Relaxed)
    );
    Ok(())
}
