//! NIP-01 canonical serialization.
//!
//! The event id is the SHA-256 of the UTF-8 JSON array
//!
//! ```text
//! [0, <pubkey hex>, <created_at>, <kind>, <tags>, <content>]
//! ```
//!
//! written with no whitespace. String escaping follows JSON: `\n`, `\"`,
//! `\\`, `\r`, `\t`, `\b`, `\f` use short escapes, other control
//! characters use `\u00XX`, and everything else is emitted as raw UTF-8.
//! `serde_json`'s compact writer produces exactly this form.

use marginalia_crypto::hash::sha256;
use marginalia_types::{EventId, MarginaliaError, Result};

use crate::event::UnsignedEvent;

/// Serializes the canonical id preimage of `event`.
///
/// # Errors
///
/// Returns [`MarginaliaError::ProtocolError`] if JSON serialization fails.
pub fn to_canonical_json(event: &UnsignedEvent) -> Result<String> {
    let preimage = (
        0u8,
        event.pubkey.to_hex(),
        event.created_at.as_secs(),
        event.kind.as_u16(),
        &event.tags,
        &event.content,
    );
    serde_json::to_string(&preimage).map_err(|e| MarginaliaError::ProtocolError {
        reason: format!("canonical serialization failed: {e}"),
    })
}

/// Computes the NIP-01 event id.
pub fn compute_event_id(event: &UnsignedEvent) -> Result<EventId> {
    let json = to_canonical_json(event)?;
    Ok(EventId::new(sha256(json.as_bytes())))
}
