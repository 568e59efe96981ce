//! JSON serialization for wire envelopes.

use notifyhub_core::AppResult;

use super::envelope::Envelope;

/// Serialize an envelope to its text frame.
pub fn encode(envelope: &Envelope) -> AppResult<String> {
    Ok(serde_json::to_string(envelope)?)
}

/// Parse a text frame into an envelope.
pub fn decode(text: &str) -> AppResult<Envelope> {
    Ok(serde_json::from_str(text)?)
}
