//! Watchdog events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by the recovery driver, the tunnel
//! runner, and the transport listener.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] — event classification and payload metadata
//! - [`Bus`] — thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `RecoveryDriver`, `TunnelController`, `CommandRunner`
//!   output pumps, `LinkListener`, `Watchdog`.
//! - **Consumer**: `Watchdog`'s forwarder task, which fans out to the
//!   [`SubscriberSet`](crate::subscribers::SubscriberSet).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
