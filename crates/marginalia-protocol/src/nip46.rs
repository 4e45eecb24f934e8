//! NIP-46 remote signer messages.
//!
//! Requests and responses are small JSON-RPC objects. They travel as
//! the encrypted content of kind-24133 events; encryption and relay
//! routing belong to the transport, so this module only covers the
//! plaintext shapes.

use marginalia_types::{MarginaliaError, Result};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::event::{Event, Tag, UnsignedEvent};

/// Value a remote signer returns for a successful `connect`.
pub const CONNECT_ACK: &str = "ack";

// ---------------------------------------------------------------------------
// Method
// ---------------------------------------------------------------------------

/// Remote signer methods used by this client.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Nip46Method {
    /// Establish the session.
    Connect,
    /// Return the user's public key (hex).
    GetPublicKey,
    /// Sign an event template and return the signed event JSON.
    SignEvent,
}

impl Nip46Method {
    /// Returns the wire name of the method.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::GetPublicKey => "get_public_key",
            Self::SignEvent => "sign_event",
        }
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// A request sent to the remote signer.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Nip46Request {
    /// Random request id, echoed in the response.
    pub id: String,
    /// Method name.
    pub method: String,
    /// Positional string parameters.
    pub params: Vec<String>,
}

/// Event template as sent in `sign_event` params.
#[derive(Serialize)]
struct EventTemplate<'a> {
    kind: u16,
    content: &'a str,
    tags: &'a [Tag],
    created_at: u64,
}

impl Nip46Request {
    /// Creates a request with a fresh random id.
    pub fn new(method: Nip46Method, params: Vec<String>) -> Self {
        let mut id = [0u8; 16];
        OsRng.fill_bytes(&mut id);
        Self {
            id: hex::encode(id),
            method: method.as_str().to_string(),
            params,
        }
    }

    /// `connect` request for `remote_pubkey_hex`, with an optional
    /// connection secret.
    pub fn connect(remote_pubkey_hex: &str, secret: Option<&str>) -> Self {
        let mut params = vec![remote_pubkey_hex.to_string()];
        if let Some(secret) = secret {
            params.push(secret.to_string());
        }
        Self::new(Nip46Method::Connect, params)
    }

    /// `get_public_key` request.
    pub fn get_public_key() -> Self {
        Self::new(Nip46Method::GetPublicKey, Vec::new())
    }

    /// `sign_event` request for `event`.
    pub fn sign_event(event: &UnsignedEvent) -> Result<Self> {
        let template = EventTemplate {
            kind: event.kind.as_u16(),
            content: &event.content,
            tags: &event.tags,
            created_at: event.created_at.as_secs(),
        };
        let json = serde_json::to_string(&template).map_err(|e| MarginaliaError::ProtocolError {
            reason: format!("failed to encode sign_event params: {e}"),
        })?;
        Ok(Self::new(Nip46Method::SignEvent, vec![json]))
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// A response from the remote signer.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Nip46Response {
    /// Id of the request this answers.
    pub id: String,
    /// Result string on success.
    #[serde(default)]
    pub result: Option<String>,
    /// Error message on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Nip46Response {
    /// Successful response.
    pub fn ok(id: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            result: Some(result.into()),
            error: None,
        }
    }

    /// Failed response.
    pub fn err(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            result: None,
            error: Some(error.into()),
        }
    }

    /// Extracts the result for the request `expected_id`.
    ///
    /// # Errors
    ///
    /// - [`MarginaliaError::ProtocolError`] if the id does not match or
    ///   neither `result` nor `error` is present.
    /// - [`MarginaliaError::SignerError`] if the signer reported an error.
    pub fn into_result(self, expected_id: &str) -> Result<String> {
        if self.id != expected_id {
            return Err(MarginaliaError::ProtocolError {
                reason: format!(
                    "nip46 response id {} does not match request {expected_id}",
                    self.id
                ),
            });
        }

        if let Some(error) = self.error.filter(|e| !e.is_empty()) {
            return Err(MarginaliaError::SignerError {
                reason: format!("remote signer: {error}"),
            });
        }

        self.result.ok_or_else(|| MarginaliaError::ProtocolError {
            reason: "nip46 response has neither result nor error".into(),
        })
    }
}

/// Parses the `sign_event` result into a signed [`Event`].
pub fn parse_signed_event(result: &str) -> Result<Event> {
    serde_json::from_str(result).map_err(|e| MarginaliaError::ProtocolError {
        reason: format!("remote signer returned malformed event: {e}"),
    })
}
