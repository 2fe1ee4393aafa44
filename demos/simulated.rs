//! End-to-end demo against an in-memory broker.
//!
//! Each simulated connection delivers a short burst of messages and then
//! goes silent — the exact failure the watchdog exists to catch. Watch the
//! log: `[link-up]`, a burst of activity, then `[stale]` → recovery →
//! `[recovered]`, repeating until the demo stops itself.
//!
//! Run with: `cargo run --example simulated`

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use tunnelvisor::{
    BusConnection, BusConnector, LogWriter, Subscribe, TransportError, TransportEvents, Watchdog,
    WatchdogConfig,
};

/// In-memory broker: every connection pumps five messages into the
/// watchdog's observer, 200 ms apart, then stops delivering.
struct SimulatedBroker;

#[async_trait]
impl BusConnector for SimulatedBroker {
    async fn connect(
        &self,
        _addr: &str,
        events: Arc<dyn TransportEvents>,
    ) -> Result<Box<dyn BusConnection>, TransportError> {
        let stop = CancellationToken::new();
        let pump = stop.clone();
        tokio::spawn(async move {
            for _ in 0..5 {
                if pump.is_cancelled() {
                    return;
                }
                events.on_message();
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
            // Subscription silently dies here; the transport still
            // reports itself connected.
        });
        Ok(Box::new(SimulatedConnection {
            stop,
            connected: true,
        }))
    }
}

struct SimulatedConnection {
    stop: CancellationToken,
    connected: bool,
}

#[async_trait]
impl BusConnection for SimulatedConnection {
    async fn subscribe(&mut self, _topic: &str) -> Result<(), TransportError> {
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        self.stop.cancel();
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

impl Drop for SimulatedConnection {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let mut cfg = WatchdogConfig::default();
    cfg.topic = "sensors/#".into();
    cfg.tunnel_start_command = "echo simulated tunnel up".into();
    cfg.tunnel_kill_command = "echo simulated tunnel torn down".into();
    cfg.stale_threshold = Duration::from_secs(2);
    cfg.tick_interval = Duration::from_millis(500);
    cfg.settle_delay = Duration::from_millis(200);

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter)];
    let dog = Watchdog::new(cfg, Box::new(SimulatedBroker), subs)?;

    // Stop the demo after a few recovery cycles.
    let token = CancellationToken::new();
    let stopper = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(10)).await;
        stopper.cancel();
    });

    match dog.run(token).await {
        Ok(()) => println!("watchdog stopped gracefully"),
        Err(e) => println!("watchdog stopped with error: {e}"),
    }
    Ok(())
}
