//! # notifyhub-realtime
//!
//! Client half of the NotifyHub real-time protocol. Provides:
//!
//! - A WebSocket transport with heartbeat, outbound queueing and
//!   exponential-backoff reconnection
//! - A typed event dispatcher with wildcard subscriptions
//! - An in-memory notification store with preference gating,
//!   quiet hours and filtered views
//! - [`NotificationCenter`], which wires the three together

pub mod center;
pub mod connection;
pub mod dispatch;
pub mod message;
pub mod notification;

pub use center::NotificationCenter;
pub use connection::transport::TransportConnection;
pub use dispatch::dispatcher::EventDispatcher;
pub use message::{ConnectionStatus, Envelope, EventType};
pub use notification::store::NotificationStore;
