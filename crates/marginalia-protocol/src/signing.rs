//! Event signing and verification.
//!
//! Signatures are computed over the 32-byte event id, which is itself
//! the hash of the canonical serialization, never over raw struct bytes.

use marginalia_crypto::signing::{verify_digest, Keys};
use marginalia_types::{MarginaliaError, Result};

use crate::event::{Event, UnsignedEvent};
use crate::validation::{validate_event_id, validate_tags};

// ---------------------------------------------------------------------------
// Signing
// ---------------------------------------------------------------------------

/// Signs an [`UnsignedEvent`] with a local keypair.
///
/// # Process
///
/// 1. Check the event's pubkey is the keypair's public key.
/// 2. Compute the canonical id.
/// 3. Sign the id with BIP-340.
///
/// # Errors
///
/// - [`MarginaliaError::SignerError`] if the event names another author.
/// - [`MarginaliaError::ProtocolError`] if canonical serialization fails.
/// - [`MarginaliaError::CryptoError`] if signing fails.
pub fn sign_event(keys: &Keys, unsigned: UnsignedEvent) -> Result<Event> {
    if unsigned.pubkey != keys.public_key() {
        return Err(MarginaliaError::SignerError {
            reason: format!(
                "event author {} does not match signing key {}",
                unsigned.pubkey,
                keys.public_key()
            ),
        });
    }

    let id = unsigned.id()?;
    let sig = keys.sign_digest(id.as_bytes())?;

    Ok(Event {
        id,
        pubkey: unsigned.pubkey,
        created_at: unsigned.created_at,
        kind: unsigned.kind,
        tags: unsigned.tags,
        content: unsigned.content,
        sig,
    })
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Verifies a signed [`Event`].
///
/// # Process
///
/// 1. Check tag shape.
/// 2. Recompute the id and compare.
/// 3. Verify the signature over the id against `event.pubkey`.
///
/// # Errors
///
/// - [`MarginaliaError::ProtocolError`] if tags are malformed or the id
///   does not match.
/// - [`MarginaliaError::CryptoError`] if the signature is invalid.
pub fn verify_event(event: &Event) -> Result<()> {
    validate_tags(&event.tags)?;
    validate_event_id(event)?;
    verify_digest(&event.pubkey, event.id.as_bytes(), &event.sig)
}
