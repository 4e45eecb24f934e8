//! Core event types for the Nostr protocol.
//!
//! An [`UnsignedEvent`] carries everything a signer needs. An [`Event`]
//! is the signed form relays accept: the unsigned fields plus the id
//! and the BIP-340 signature over that id.

use marginalia_crypto::signing::{PublicKey, Signature};
use marginalia_types::{EventId, Kind, Result, Timestamp};
use serde::{Deserialize, Serialize};

use crate::canonical::compute_event_id;

/// A tag is a non-empty list of strings; the first element is its name.
pub type Tag = Vec<String>;

/// Builds a two-element tag `[name, value]`.
pub fn tag(name: &str, value: &str) -> Tag {
    vec![name.to_string(), value.to_string()]
}

// ---------------------------------------------------------------------------
// UnsignedEvent
// ---------------------------------------------------------------------------

/// An event that has not been signed yet.
///
/// The `pubkey` is the intended author; signers refuse events whose
/// pubkey is not their own.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct UnsignedEvent {
    /// Author public key.
    pub pubkey: PublicKey,
    /// Creation time in Unix seconds.
    pub created_at: Timestamp,
    /// Event kind.
    pub kind: Kind,
    /// Ordered tags.
    pub tags: Vec<Tag>,
    /// Event content.
    pub content: String,
}

impl UnsignedEvent {
    /// Creates an unsigned event stamped with the current time.
    pub fn new(pubkey: PublicKey, kind: Kind, content: impl Into<String>, tags: Vec<Tag>) -> Self {
        Self {
            pubkey,
            created_at: Timestamp::now(),
            kind,
            tags,
            content: content.into(),
        }
    }

    /// Replaces the creation time.
    pub fn with_created_at(mut self, created_at: Timestamp) -> Self {
        self.created_at = created_at;
        self
    }

    /// Computes the NIP-01 id of this event.
    pub fn id(&self) -> Result<EventId> {
        compute_event_id(self)
    }
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// A signed Nostr event, in NIP-01 JSON shape.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// SHA-256 of the canonical serialization.
    pub id: EventId,
    /// Author public key.
    pub pubkey: PublicKey,
    /// Creation time in Unix seconds.
    pub created_at: Timestamp,
    /// Event kind.
    pub kind: Kind,
    /// Ordered tags.
    pub tags: Vec<Tag>,
    /// Event content.
    pub content: String,
    /// BIP-340 signature over `id`.
    pub sig: Signature,
}

impl Event {
    /// Returns the unsigned fields of this event.
    pub fn unsigned(&self) -> UnsignedEvent {
        UnsignedEvent {
            pubkey: self.pubkey,
            created_at: self.created_at,
            kind: self.kind,
            tags: self.tags.clone(),
            content: self.content.clone(),
        }
    }

    /// Returns the value of the first tag named `name`.
    pub fn tag_value(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.first().map(String::as_str) == Some(name))
            .and_then(|t| t.get(1))
            .map(String::as_str)
    }
}
