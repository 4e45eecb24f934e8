//! Application configuration with sensible defaults.
//!
//! All operational parameters are centralized here. Every value has a
//! documented default.

use serde::{Deserialize, Serialize};

use crate::{MarginaliaError, Result};

/// Relays used when no explicit list is configured.
pub const DEFAULT_RELAYS: [&str; 3] = [
    "wss://relay.damus.io",
    "wss://relay.snort.social",
    "wss://nos.lol",
];

/// Global application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Relay WebSocket URLs events are published to and queried from.
    pub relays: Vec<String>,

    /// Seconds to wait for a relay WebSocket handshake.
    pub connect_timeout_secs: u64,

    /// Seconds to wait for a relay `OK` / `EOSE` after sending.
    pub read_timeout_secs: u64,

    /// Seconds to wait for a NIP-46 remote signer response.
    pub nip46_timeout_secs: u64,

    /// Sentences of context kept before a highlighted selection.
    pub context_sentences_before: usize,

    /// Sentences of context kept after a highlighted selection.
    pub context_sentences_after: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            relays: DEFAULT_RELAYS.iter().map(|s| s.to_string()).collect(),
            connect_timeout_secs: 10,
            read_timeout_secs: 10,
            nip46_timeout_secs: 30,
            context_sentences_before: 2,
            context_sentences_after: 2,
        }
    }
}

impl AppConfig {
    /// Validates all configuration values.
    ///
    /// Returns an error if any value is outside its acceptable range.
    pub fn validate(&self) -> Result<()> {
        for relay in &self.relays {
            if !(relay.starts_with("wss://") || relay.starts_with("ws://")) {
                return Err(MarginaliaError::ConfigError {
                    reason: format!("relay url must use ws:// or wss://, got '{relay}'"),
                });
            }
        }

        if self.connect_timeout_secs == 0 {
            return Err(MarginaliaError::ConfigError {
                reason: "connect_timeout_secs must be greater than 0".into(),
            });
        }

        if self.read_timeout_secs == 0 {
            return Err(MarginaliaError::ConfigError {
                reason: "read_timeout_secs must be greater than 0".into(),
            });
        }

        if self.nip46_timeout_secs == 0 {
            return Err(MarginaliaError::ConfigError {
                reason: "nip46_timeout_secs must be greater than 0".into(),
            });
        }

        Ok(())
    }
}
