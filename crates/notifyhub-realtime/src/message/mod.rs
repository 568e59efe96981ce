//! Wire envelope, event type tags, and JSON codec.

pub mod envelope;
pub mod serializer;
pub mod types;

pub use envelope::Envelope;
pub use types::{ConnectionStatus, EventType, StatusPayload};
