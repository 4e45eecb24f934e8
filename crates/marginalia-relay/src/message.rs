//! NIP-01 relay wire messages.
//!
//! Every message is a JSON array whose first element names its type.
//! Clients send `EVENT`, `REQ` and `CLOSE`; relays answer with `EVENT`,
//! `OK`, `EOSE`, `NOTICE` and `CLOSED`.

use marginalia_crypto::signing::PublicKey;
use marginalia_protocol::event::Event;
use marginalia_types::{EventId, Kind, MarginaliaError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// Subscription filter. Empty lists match everything.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    /// Author public keys.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<PublicKey>,
    /// Event kinds.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kinds: Vec<Kind>,
    /// Maximum number of stored events the relay should return.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl Filter {
    /// An empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an author.
    pub fn author(mut self, pubkey: PublicKey) -> Self {
        self.authors.push(pubkey);
        self
    }

    /// Adds a kind.
    pub fn kind(mut self, kind: Kind) -> Self {
        self.kinds.push(kind);
        self
    }

    /// Sets the result limit.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns `true` if `event` matches the author and kind criteria.
    pub fn matches(&self, event: &Event) -> bool {
        (self.authors.is_empty() || self.authors.contains(&event.pubkey))
            && (self.kinds.is_empty() || self.kinds.contains(&event.kind))
    }
}

// ---------------------------------------------------------------------------
// Client -> relay
// ---------------------------------------------------------------------------

/// A message sent from client to relay.
#[derive(Clone, Debug, PartialEq)]
pub enum ClientMessage {
    /// `["EVENT", <event>]`
    Event(Box<Event>),
    /// `["REQ", <subscription id>, <filter>...]`
    Req {
        subscription_id: String,
        filters: Vec<Filter>,
    },
    /// `["CLOSE", <subscription id>]`
    Close(String),
}

impl ClientMessage {
    /// Encodes the message as a JSON array.
    pub fn to_json(&self) -> Result<String> {
        let value = match self {
            Self::Event(event) => Value::Array(vec![Value::from("EVENT"), to_value(event)?]),
            Self::Req {
                subscription_id,
                filters,
            } => {
                let mut items = vec![Value::from("REQ"), Value::from(subscription_id.as_str())];
                for filter in filters {
                    items.push(to_value(filter)?);
                }
                Value::Array(items)
            }
            Self::Close(subscription_id) => {
                Value::Array(vec![Value::from("CLOSE"), Value::from(subscription_id.as_str())])
            }
        };
        Ok(value.to_string())
    }
}

fn to_value<T: Serialize>(v: &T) -> Result<Value> {
    serde_json::to_value(v).map_err(|e| MarginaliaError::ProtocolError {
        reason: format!("failed to encode relay message: {e}"),
    })
}

// ---------------------------------------------------------------------------
// Relay -> client
// ---------------------------------------------------------------------------

/// A message received from a relay.
#[derive(Clone, Debug, PartialEq)]
pub enum RelayMessage {
    /// `["EVENT", <subscription id>, <event>]`
    Event {
        subscription_id: String,
        event: Box<Event>,
    },
    /// `["OK", <event id>, <accepted>, <message>]`
    Ok {
        event_id: EventId,
        accepted: bool,
        message: String,
    },
    /// `["EOSE", <subscription id>]`
    Eose(String),
    /// `["NOTICE", <message>]`
    Notice(String),
    /// `["CLOSED", <subscription id>, <message>]`
    Closed {
        subscription_id: String,
        message: String,
    },
}

impl RelayMessage {
    /// Parses a relay message from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`MarginaliaError::ProtocolError`] for malformed JSON,
    /// missing elements, or unknown message types.
    pub fn from_json(text: &str) -> Result<Self> {
        let items: Vec<Value> = serde_json::from_str(text).map_err(|e| MarginaliaError::ProtocolError {
            reason: format!("relay message is not a JSON array: {e}"),
        })?;

        let kind = items.first().and_then(Value::as_str).ok_or_else(|| MarginaliaError::ProtocolError {
            reason: "relay message has no type".into(),
        })?;

        match kind {
            "EVENT" => {
                let event = items.get(2).cloned().ok_or_else(|| missing(kind, "event"))?;
                let event: Event = serde_json::from_value(event).map_err(|e| MarginaliaError::ProtocolError {
                    reason: format!("malformed event from relay: {e}"),
                })?;
                Ok(Self::Event {
                    subscription_id: str_at(&items, 1, kind, "subscription id")?,
                    event: Box::new(event),
                })
            }
            "OK" => {
                let event_id = str_at(&items, 1, kind, "event id")?
                    .parse::<EventId>()
                    .map_err(|e| MarginaliaError::ProtocolError {
                        reason: format!("bad event id in OK: {e}"),
                    })?;
                let accepted = items.get(2).and_then(Value::as_bool).ok_or_else(|| missing(kind, "accepted flag"))?;
                let message = items.get(3).and_then(Value::as_str).unwrap_or_default().to_string();
                Ok(Self::Ok {
                    event_id,
                    accepted,
                    message,
                })
            }
            "EOSE" => Ok(Self::Eose(str_at(&items, 1, kind, "subscription id")?)),
            "NOTICE" => Ok(Self::Notice(str_at(&items, 1, kind, "message")?)),
            "CLOSED" => Ok(Self::Closed {
                subscription_id: str_at(&items, 1, kind, "subscription id")?,
                message: items.get(2).and_then(Value::as_str).unwrap_or_default().to_string(),
            }),
            other => Err(MarginaliaError::ProtocolError {
                reason: format!("unknown relay message type: {other}"),
            }),
        }
    }
}

fn str_at(items: &[Value], index: usize, kind: &str, what: &str) -> Result<String> {
    items
        .get(index)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| missing(kind, what))
}

fn missing(kind: &str, what: &str) -> MarginaliaError {
    MarginaliaError::ProtocolError {
        reason: format!("{kind} message missing {what}"),
    }
}
