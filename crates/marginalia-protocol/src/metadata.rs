//! Kind-0 user metadata.
//!
//! A user's profile is the content of their newest kind-0 event: a JSON
//! object with optional `name`, `about`, and `picture` fields. Some
//! clients write `image` instead of `picture`, and `display_name`
//! instead of `name`; both are accepted as fallbacks.

use marginalia_crypto::signing::PublicKey;
use marginalia_types::{Kind, MarginaliaError, Result};
use serde::{Deserialize, Serialize};

use crate::event::Event;

/// Maximum accepted metadata content size (64 KiB).
pub const MAX_METADATA_LEN: usize = 65_536;

// ---------------------------------------------------------------------------
// Wire shape
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct MetadataContent {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    about: Option<String>,
    #[serde(default)]
    picture: Option<String>,
    #[serde(default)]
    image: Option<String>,
}

// ---------------------------------------------------------------------------
// UserProfile
// ---------------------------------------------------------------------------

/// Public profile of a user as shown by the reader.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// The user's public key.
    pub pubkey: PublicKey,
    /// Display name.
    pub name: Option<String>,
    /// Short biography.
    pub about: Option<String>,
    /// Avatar URL.
    pub picture: Option<String>,
}

impl UserProfile {
    /// A profile with no metadata beyond the key.
    pub fn bare(pubkey: PublicKey) -> Self {
        Self {
            pubkey,
            name: None,
            about: None,
            picture: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parses a kind-0 event into a [`UserProfile`].
///
/// Empty strings are treated as absent.
///
/// # Errors
///
/// Returns [`MarginaliaError::ProtocolError`] if the event is not kind 0,
/// exceeds [`MAX_METADATA_LEN`], or its content is not a JSON object.
pub fn parse_metadata(event: &Event) -> Result<UserProfile> {
    if event.kind != Kind::METADATA {
        return Err(MarginaliaError::ProtocolError {
            reason: format!("expected kind 0 metadata, got kind {}", event.kind),
        });
    }

    if event.content.len() > MAX_METADATA_LEN {
        return Err(MarginaliaError::ProtocolError {
            reason: format!(
                "metadata length {} exceeds maximum {MAX_METADATA_LEN}",
                event.content.len()
            ),
        });
    }

    let content: MetadataContent =
        serde_json::from_str(&event.content).map_err(|e| MarginaliaError::ProtocolError {
            reason: format!("invalid metadata JSON: {e}"),
        })?;

    Ok(UserProfile {
        pubkey: event.pubkey,
        name: non_empty(content.name).or_else(|| non_empty(content.display_name)),
        about: non_empty(content.about),
        picture: non_empty(content.picture).or_else(|| non_empty(content.image)),
    })
}

/// Picks the newest kind-0 event authored by `author`.
///
/// Ties on `created_at` are broken by the lowest id, per NIP-01's rule
/// for replaceable events.
pub fn latest_metadata<'a>(events: &'a [Event], author: &PublicKey) -> Option<&'a Event> {
    events
        .iter()
        .filter(|e| e.kind == Kind::METADATA && &e.pubkey == author)
        .max_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| b.id.as_bytes().cmp(a.id.as_bytes()))
        })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}
