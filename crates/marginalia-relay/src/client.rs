//! Relay client abstraction.

use async_trait::async_trait;
use marginalia_protocol::event::Event;
use marginalia_types::{EventId, Result};

use crate::message::Filter;

/// A relay's answer to a published event.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PublishAck {
    /// Relay URL.
    pub relay: String,
    /// Event the ack refers to.
    pub event_id: EventId,
    /// Whether the relay stored the event.
    pub accepted: bool,
    /// Machine-prefixed reason (`duplicate:`, `blocked:`, ...), may be empty.
    pub message: String,
}

/// Operations Marginalia performs against a single relay.
///
/// Implemented by [`crate::websocket::WebSocketRelay`] and by in-memory
/// fakes in tests.
#[async_trait]
pub trait RelayClient: Send + Sync {
    /// Relay URL, for logging.
    fn url(&self) -> &str;

    /// Sends an event and waits for the relay's `OK`.
    async fn publish(&self, event: &Event) -> Result<PublishAck>;

    /// Fetches stored events matching `filter` (until `EOSE`).
    async fn query(&self, filter: Filter) -> Result<Vec<Event>>;
}
