//! Transport connection: connector seam, reconnect backoff, state-machine
//! driver and the caller-facing handle.

pub mod backoff;
pub mod connector;
mod driver;
pub mod transport;

pub use backoff::ReconnectPolicy;
pub use connector::{Connector, Socket, WsConnector};
pub use transport::{TransportConnection, TransportStats};

#[cfg(test)]
pub(crate) mod mock;
