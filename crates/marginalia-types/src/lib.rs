//! Core shared types for Marginalia.
//!
//! This crate defines the fundamental types used across the workspace:
//! identifiers, timestamps, login methods, the central error enum, and
//! application configuration.

pub mod config;

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// EventId
// ---------------------------------------------------------------------------

/// Nostr event identifier: SHA-256 of the canonical event serialization.
///
/// Serialized as 64 lowercase hex characters, the form used on the wire.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct EventId([u8; 32]);

impl EventId {
    /// The fixed byte length of an event ID.
    pub const LEN: usize = 32;

    /// Creates a new `EventId` from raw bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns the lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl From<[u8; 32]> for EventId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for EventId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for EventId {
    type Err = MarginaliaError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| MarginaliaError::ProtocolError {
            reason: "invalid hex encoding for event id".into(),
        })?;
        if bytes.len() != Self::LEN {
            return Err(MarginaliaError::ProtocolError {
                reason: format!("expected 32 bytes for event id, got {}", bytes.len()),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl Serialize for EventId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EventId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Kind
// ---------------------------------------------------------------------------

/// Nostr event kind.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Kind(u16);

impl Kind {
    /// User metadata (NIP-01).
    pub const METADATA: Kind = Kind(0);
    /// Short text note (NIP-01).
    pub const TEXT_NOTE: Kind = Kind(1);
    /// Highlight (NIP-84).
    pub const HIGHLIGHT: Kind = Kind(9802);

    /// Creates a kind from its numeric value.
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    /// Returns the numeric value.
    pub const fn as_u16(&self) -> u16 {
        self.0
    }
}

impl From<u16> for Kind {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Timestamp
// ---------------------------------------------------------------------------

/// Seconds since the Unix epoch, the `created_at` unit of Nostr events.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Current UTC time, truncated to whole seconds.
    pub fn now() -> Self {
        Self(Utc::now().timestamp().max(0) as u64)
    }

    /// Creates a timestamp from Unix seconds.
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    /// Returns the Unix seconds value.
    pub const fn as_secs(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// LoginMethod
// ---------------------------------------------------------------------------

/// How the current user authenticated.
///
/// The string tags are the values persisted under the session method key.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginMethod {
    /// Private key held locally (NIP-19 `nsec`).
    Nsec,
    /// Browser-extension signer (NIP-07).
    Nip07,
    /// Remote signer (NIP-46).
    Nip46,
    /// Generic remote session tag; accepted when read back from storage.
    Remote,
}

impl LoginMethod {
    /// Returns the persisted tag for this method.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nsec => "nsec",
            Self::Nip07 => "nip07",
            Self::Nip46 => "nip46",
            Self::Remote => "remote",
        }
    }
}

impl fmt::Display for LoginMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoginMethod {
    type Err = MarginaliaError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "nsec" => Ok(Self::Nsec),
            "nip07" => Ok(Self::Nip07),
            "nip46" => Ok(Self::Nip46),
            "remote" => Ok(Self::Remote),
            other => Err(MarginaliaError::InvalidInput {
                reason: format!("unknown login method '{other}'"),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// MarginaliaError
// ---------------------------------------------------------------------------

/// Central error type for Marginalia.
///
/// All crates in the workspace convert their internal errors into variants
/// of this enum.
#[derive(Debug, Error)]
pub enum MarginaliaError {
    /// A key is malformed (bad bech32, wrong prefix, wrong length, off-curve).
    #[error("invalid key: {reason}")]
    InvalidKey {
        /// Human-readable description of why the key is invalid.
        reason: String,
    },

    /// A cryptographic operation failed (signing or verification).
    #[error("crypto error: {reason}")]
    CryptoError {
        /// Human-readable description of the cryptographic failure.
        reason: String,
    },

    /// An event or wire message is malformed.
    #[error("protocol error: {reason}")]
    ProtocolError {
        /// Human-readable description of the protocol failure.
        reason: String,
    },

    /// A relay connection or relay response failed.
    #[error("relay error: {reason}")]
    RelayError {
        /// Human-readable description of the relay failure.
        reason: String,
    },

    /// Reading or writing persisted session state failed.
    #[error("storage error: {reason}")]
    StorageError {
        /// Human-readable description of the storage failure.
        reason: String,
    },

    /// A signer refused or failed to produce a result.
    #[error("signer error: {reason}")]
    SignerError {
        /// Human-readable description of the signer failure.
        reason: String,
    },

    /// No NIP-07 browser extension is available.
    #[error("NIP-07 browser extension not found")]
    ExtensionUnavailable,

    /// The operation requires a logged-in session.
    #[error("not logged in to Nostr")]
    NotLoggedIn,

    /// A configuration value is invalid or missing.
    #[error("config error: {reason}")]
    ConfigError {
        /// Human-readable description of the configuration problem.
        reason: String,
    },

    /// A caller-supplied argument is empty or malformed.
    #[error("invalid input: {reason}")]
    InvalidInput {
        /// Human-readable description of the input problem.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Result alias
// ---------------------------------------------------------------------------

/// Convenience result type using [`MarginaliaError`].
pub type Result<T> = std::result::Result<T, MarginaliaError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_id_roundtrip_hex() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let id = EventId::new([0xABu8; 32]);
        let parsed: EventId = id.to_string().parse()?;
        assert_eq!(id, parsed);
        Ok(())
    }

    #[test]
    fn event_id_invalid_length() {
        let result: std::result::Result<EventId, _> = "abcd".parse();
        assert!(result.is_err());
    }

    #[test]
    fn event_id_invalid_chars() {
        let result: std::result::Result<EventId, _> = "zz".repeat(32).parse();
        assert!(result.is_err());
    }

    #[test]
    fn event_id_serializes_as_hex_string() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let id = EventId::new([0x01u8; 32]);
        let json = serde_json::to_string(&id)?;
        assert_eq!(json, format!("\"{}\"", "01".repeat(32)));
        let back: EventId = serde_json::from_str(&json)?;
        assert_eq!(back, id);
        Ok(())
    }

    #[test]
    fn kind_constants() {
        assert_eq!(Kind::METADATA.as_u16(), 0);
        assert_eq!(Kind::HIGHLIGHT.as_u16(), 9802);
        assert_eq!(Kind::from(1), Kind::TEXT_NOTE);
    }

    #[test]
    fn timestamp_is_plain_number_in_json() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let ts = Timestamp::from_secs(1_700_000_000);
        assert_eq!(serde_json::to_string(&ts)?, "1700000000");
        Ok(())
    }

    #[test]
    fn timestamp_now_is_recent() {
        // 2023-11-14, well before any plausible test run.
        assert!(Timestamp::now().as_secs() > 1_700_000_000);
    }

    #[test]
    fn login_method_tags_roundtrip() -> std::result::Result<(), MarginaliaError> {
        for method in [
            LoginMethod::Nsec,
            LoginMethod::Nip07,
            LoginMethod::Nip46,
            LoginMethod::Remote,
        ] {
            assert_eq!(method.as_str().parse::<LoginMethod>()?, method);
        }
        Ok(())
    }

    #[test]
    fn login_method_rejects_unknown_tag() {
        assert!("password".parse::<LoginMethod>().is_err());
        assert!("".parse::<LoginMethod>().is_err());
    }

    #[test]
    fn login_method_serde_uses_tags() -> std::result::Result<(), Box<dyn std::error::Error>> {
        assert_eq!(serde_json::to_string(&LoginMethod::Nip46)?, "\"nip46\"");
        Ok(())
    }

    #[test]
    fn error_display() {
        let err = MarginaliaError::InvalidKey {
            reason: "bad prefix".into(),
        };
        assert!(err.to_string().contains("bad prefix"));
        assert_eq!(
            MarginaliaError::ExtensionUnavailable.to_string(),
            "NIP-07 browser extension not found"
        );
    }
}
