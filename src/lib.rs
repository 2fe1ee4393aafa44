//! # tunnelvisor
//!
//! **Tunnelvisor** keeps a message-bus subscription alive across an
//! unreliable network path that needs an external tunnel process (an SSH
//! port-forward, say) to reach the broker.
//!
//! It watches how long the subscription has been silent; when the silence
//! exceeds a threshold it tears the tunnel down, starts a fresh one, waits
//! for it to settle, reconnects, and resubscribes — without manual
//! intervention, and without ever letting a failed step crash the
//! monitoring loop itself.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │ Watchdog (lifecycle)                                            │
//! │  - Bus (broadcast events) ─► SubscriberSet ─► LogWriter, custom │
//! │  - periodic tick, serialized with recovery (never overlapping)  │
//! │  - startup ensure-connected, signal/token-driven shutdown       │
//! └──────────────────────────────┬──────────────────────────────────┘
//!                                ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │ RecoveryDriver (state machine)                                  │
//! │   DISCONNECTED ──► CONNECTED ──► RECOVERING ──► …               │
//! │   sequence: kill ► start ► settle ► connect ► subscribe         │
//! └───────┬─────────────────────────────────┬───────────────────────┘
//!         ▼                                 ▼
//!  TunnelController                  BusConnector ─► BusConnection
//!  (CommandRunner, `sh -c`,          (your transport adapter;
//!   line-streamed output)             one owned handle at a time)
//!
//!  transport ── per inbound message ──► TransportEvents::on_message()
//!                                              │
//!                                              ▼
//!                                       LivenessTracker
//!                                  (atomic last-activity stamp,
//!                                   read by the periodic tick)
//! ```
//!
//! ## Behavior in one paragraph
//! Every `tick_interval` the watchdog compares "now − last activity" with
//! `stale_threshold`. On breach it runs the recovery sequence
//! unconditionally — even if the client still claims to be connected,
//! because a transport can look healthy while the subscription has
//! silently died. Every step is best-effort: a failing kill command never
//! blocks the start command, a failed tunnel spawn still lets the connect
//! attempt decide the outcome, and a failed connect simply parks the link
//! until the next tick. There is no backoff and no retry counter: the tick
//! interval *is* the retry cadence, a deliberate simplicity/robustness
//! tradeoff (at the cost of hammering the tunnel command under persistent
//! failure).
//!
//! ## Features
//! | Area           | Description                                              | Key types / traits                      |
//! |----------------|----------------------------------------------------------|-----------------------------------------|
//! | **Supervision**| Liveness tick, recovery state machine, lifecycle.        | [`Watchdog`], [`WatchdogConfig`]        |
//! | **Transport**  | Capability traits the watchdog supervises.               | [`BusConnector`], [`BusConnection`], [`TransportEvents`] |
//! | **Tunnel**     | Shell-command control of the external tunnel.            | [`TunnelController`], [`CommandRunner`] |
//! | **Liveness**   | Concurrency-safe last-activity timestamp.                | [`LivenessTracker`]                     |
//! | **Events**     | Every transition and step, observable.                   | [`Event`], [`EventKind`], [`Bus`]       |
//! | **Subscribers**| Non-blocking fan-out, built-in stdout/stderr log sink.   | [`Subscribe`], [`SubscriberSet`], [`LogWriter`] |
//! | **Errors**     | Startup-fatal vs. tick-recoverable taxonomy.             | [`ConfigError`], [`TransportError`], [`TunnelError`], [`RuntimeError`] |
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use async_trait::async_trait;
//! use tokio_util::sync::CancellationToken;
//! use tunnelvisor::{
//!     BusConnection, BusConnector, LogWriter, Subscribe, TransportError, TransportEvents,
//!     Watchdog, WatchdogConfig,
//! };
//!
//! /// Your transport adapter: connects to the real broker and wires the
//! /// watchdog's observer into its message callback.
//! struct MyClient;
//!
//! #[async_trait]
//! impl BusConnector for MyClient {
//!     async fn connect(
//!         &self,
//!         addr: &str,
//!         events: Arc<dyn TransportEvents>,
//!     ) -> Result<Box<dyn BusConnection>, TransportError> {
//!         let _ = (addr, events); // open the transport, wire the observer in
//!         Err(TransportError::Connect { reason: "not wired in this example".into() })
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cfg = WatchdogConfig::default();
//!     cfg.topic = "sensors/#".into();
//!     cfg.tunnel_start_command = "ssh -f -N -L 1883:localhost:1883 bastion".into();
//!     cfg.tunnel_kill_command = "pkill -f 'ssh -f -N -L 1883'".into();
//!     cfg.stale_threshold = Duration::from_secs(60);
//!     cfg.tick_interval = Duration::from_secs(5);
//!
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter)];
//!     let dog = Watchdog::new(cfg, Box::new(MyClient), subs)?;
//!     dog.run(CancellationToken::new()).await?;
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod core;
mod error;
mod events;
mod liveness;
mod subscribers;
mod tunnel;

// ---- Public re-exports ----

pub use client::{BusConnection, BusConnector, TransportEvents};
pub use config::WatchdogConfig;
pub use core::Watchdog;
pub use error::{ConfigError, RuntimeError, TransportError, TunnelError};
pub use events::{Bus, Event, EventKind};
pub use liveness::LivenessTracker;
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use tunnel::{CommandOutcome, CommandRunner, TunnelController};
