//! Event validation: id integrity, tag shape, and clock skew.
//!
//! Id and tag checks run inside [`crate::signing::verify_event`]. The
//! clock-skew check is applied by relay clients to events they receive.

use marginalia_types::{MarginaliaError, Result, Timestamp};

use crate::event::{Event, Tag};

// ---------------------------------------------------------------------------
// Event id validation
// ---------------------------------------------------------------------------

/// Validates the `id` field by recomputing it from the other fields.
///
/// # Errors
///
/// Returns [`MarginaliaError::ProtocolError`] if the recomputed id does
/// not match `event.id`.
pub fn validate_event_id(event: &Event) -> Result<()> {
    let expected = event.unsigned().id()?;
    if expected != event.id {
        return Err(MarginaliaError::ProtocolError {
            reason: format!("event id mismatch: expected {expected}, got {}", event.id),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tag validation
// ---------------------------------------------------------------------------

/// Validates that every tag has a non-empty name.
pub fn validate_tags(tags: &[Tag]) -> Result<()> {
    for (i, tag) in tags.iter().enumerate() {
        match tag.first() {
            Some(name) if !name.is_empty() => {}
            _ => {
                return Err(MarginaliaError::ProtocolError {
                    reason: format!("tag {i} has no name"),
                })
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Timestamp validation
// ---------------------------------------------------------------------------

/// How far ahead of the local clock a received event may be dated.
pub const MAX_FUTURE_SKEW_SECS: u64 = 15 * 60;

/// Validates that `created_at` is not more than `max_future_secs` ahead
/// of `now`.
///
/// Old events are always accepted: Nostr events are routinely fetched
/// long after they were written.
///
/// # Errors
///
/// Returns [`MarginaliaError::ProtocolError`] if the event is dated too
/// far in the future.
pub fn validate_created_at(created_at: Timestamp, now: Timestamp, max_future_secs: u64) -> Result<()> {
    let limit = now.as_secs().saturating_add(max_future_secs);
    if created_at.as_secs() > limit {
        return Err(MarginaliaError::ProtocolError {
            reason: format!(
                "created_at {created_at} is more than {max_future_secs}s ahead of {now}"
            ),
        });
    }
    Ok(())
}
