//! # Bus-client capability traits.
//!
//! The watchdog never speaks a broker protocol itself; it consumes a small
//! capability set through these traits and supervises whatever implements
//! them (an MQTT client, an AMQP client, an in-memory fake in tests).
//!
//! ## Shape
//! ```text
//! BusConnector::connect(addr, events) ─► Box<dyn BusConnection>  (one live handle)
//!                                        │
//!                                        ├─ subscribe(topic)
//!                                        ├─ disconnect()
//!                                        └─ is_connected()
//!
//! transport ── per inbound message ──► TransportEvents::on_message()
//!           ── on link loss ─────────► TransportEvents::on_connection_lost()
//! ```
//!
//! ## Rules
//! - Exactly one [`BusConnection`] exists at a time: the recovery driver
//!   holds it as `Option<Box<dyn BusConnection>>` and drops the old handle
//!   before any new connect, so ownership enforces the single-handle rule.
//! - `connect()` must not require a prior disconnect at the protocol level;
//!   the driver still disconnects a live handle first, defensively.
//! - `subscribe()` may fail independently of `connect()`; the driver treats
//!   the two as separate recovery steps.
//! - [`TransportEvents`] implementations must never block: the notification
//!   context runs on the transport's own task/thread.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TransportError;

/// # Transport event observer.
///
/// One method per transport event, replacing protocol-level callback
/// objects. The watchdog installs its own listener at connect time; payloads
/// are ignored — only the occurrence of a message matters.
pub trait TransportEvents: Send + Sync + 'static {
    /// Invoked once per inbound message. Must not block.
    fn on_message(&self);

    /// Invoked when the transport reports the broker connection lost.
    ///
    /// Informational: the periodic tick remains the only recovery trigger.
    fn on_connection_lost(&self, reason: &str) {
        let _ = reason;
    }
}

/// # Factory for broker connections.
///
/// A connector owns everything protocol-shaped (credentials, client
/// identity, session options — all outside this crate's scope) and
/// produces one owned [`BusConnection`] per successful connect against the
/// configured broker address.
#[async_trait]
pub trait BusConnector: Send + Sync + 'static {
    /// Connects to the broker at `addr` and installs `events` as the
    /// transport observer for the new connection.
    ///
    /// May be called while a prior connection attempt is believed failed;
    /// implementations must not require a matching disconnect first.
    async fn connect(
        &self,
        addr: &str,
        events: Arc<dyn TransportEvents>,
    ) -> Result<Box<dyn BusConnection>, TransportError>;
}

/// # One live broker connection.
///
/// Opaque ownership of a single connection. Dropped handles release their
/// transport resources; the driver never holds more than one.
#[async_trait]
pub trait BusConnection: Send {
    /// Subscribes to the given topic filter.
    async fn subscribe(&mut self, topic: &str) -> Result<(), TransportError>;

    /// Disconnects from the broker. Idempotent from the watchdog's point of
    /// view: errors are ignored by every caller.
    async fn disconnect(&mut self) -> Result<(), TransportError>;

    /// Reports transport-level connection state.
    ///
    /// A client can report `true` here while the subscription has silently
    /// stopped delivering — which is exactly the failure the watchdog
    /// exists to catch, so this is never used to skip recovery.
    fn is_connected(&self) -> bool;
}

/// Scripted in-memory transport for driver and watchdog tests.
#[cfg(test)]
pub(crate) mod fake {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::{BusConnection, BusConnector, TransportEvents};
    use crate::error::TransportError;

    /// Shared counters and failure switches, observable from the test body.
    #[derive(Default)]
    pub struct FakeHub {
        pub fail_connect: AtomicBool,
        pub fail_subscribe: AtomicBool,
        pub hang_disconnect: AtomicBool,
        pub connects: AtomicUsize,
        pub subscribes: AtomicUsize,
        pub disconnects: AtomicUsize,
        /// Live connection handles; must never exceed 1.
        pub live: AtomicUsize,
    }

    pub struct FakeConnector {
        pub hub: Arc<FakeHub>,
    }

    #[async_trait]
    impl BusConnector for FakeConnector {
        async fn connect(
            &self,
            _addr: &str,
            _events: Arc<dyn TransportEvents>,
        ) -> Result<Box<dyn BusConnection>, TransportError> {
            self.hub.connects.fetch_add(1, Ordering::SeqCst);
            if self.hub.fail_connect.load(Ordering::SeqCst) {
                return Err(TransportError::Connect {
                    reason: "refused".into(),
                });
            }
            let live = self.hub.live.fetch_add(1, Ordering::SeqCst) + 1;
            assert!(live <= 1, "{live} live connection handles");
            Ok(Box::new(FakeConnection {
                hub: Arc::clone(&self.hub),
                connected: true,
            }))
        }
    }

    pub struct FakeConnection {
        hub: Arc<FakeHub>,
        connected: bool,
    }

    #[async_trait]
    impl BusConnection for FakeConnection {
        async fn subscribe(&mut self, _topic: &str) -> Result<(), TransportError> {
            self.hub.subscribes.fetch_add(1, Ordering::SeqCst);
            if self.hub.fail_subscribe.load(Ordering::SeqCst) {
                return Err(TransportError::Subscribe {
                    reason: "broker rejected filter".into(),
                });
            }
            Ok(())
        }

        async fn disconnect(&mut self) -> Result<(), TransportError> {
            if self.hub.hang_disconnect.load(Ordering::SeqCst) {
                futures::future::pending::<()>().await;
            }
            self.connected = false;
            self.hub.disconnects.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.connected
        }
    }

    impl Drop for FakeConnection {
        fn drop(&mut self) {
            self.hub.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}
