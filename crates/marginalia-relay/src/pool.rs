//! Fan-out over a set of relays.
//!
//! Publishing succeeds when at least one relay accepts the event.
//! Queries run against every relay concurrently; results are merged,
//! de-duplicated by id and ordered newest first. A relay that fails is
//! logged and skipped unless every relay failed.

use std::collections::HashSet;
use std::sync::Arc;

use futures_util::future::join_all;
use marginalia_protocol::event::Event;
use marginalia_types::config::AppConfig;
use marginalia_types::{MarginaliaError, Result};

use crate::client::{PublishAck, RelayClient};
use crate::message::Filter;
use crate::websocket::WebSocketRelay;

/// A set of relays used together.
#[derive(Clone, Default)]
pub struct RelayPool {
    relays: Vec<Arc<dyn RelayClient>>,
}

impl std::fmt::Debug for RelayPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayPool").field("relays", &self.urls()).finish()
    }
}

impl RelayPool {
    /// Creates a pool from existing clients.
    pub fn new(relays: Vec<Arc<dyn RelayClient>>) -> Self {
        Self { relays }
    }

    /// A pool with no relays. Publishing through it only logs.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a WebSocket relay for every URL in `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let relays = config
            .relays
            .iter()
            .map(|url| WebSocketRelay::from_config(url, config).map(|r| Arc::new(r) as Arc<dyn RelayClient>))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { relays })
    }

    /// Returns `true` if the pool has no relays.
    pub fn is_empty(&self) -> bool {
        self.relays.is_empty()
    }

    /// Number of relays.
    pub fn len(&self) -> usize {
        self.relays.len()
    }

    /// URLs of all relays, in insertion order.
    pub fn urls(&self) -> Vec<String> {
        self.relays.iter().map(|r| r.url().to_string()).collect()
    }

    /// Publishes `event` to every relay.
    ///
    /// Returns the acks of the relays that accepted it.
    ///
    /// # Errors
    ///
    /// Returns [`MarginaliaError::RelayError`] if the pool is empty or no
    /// relay accepted the event.
    pub async fn publish(&self, event: &Event) -> Result<Vec<PublishAck>> {
        if self.relays.is_empty() {
            return Err(MarginaliaError::RelayError {
                reason: "no relays configured".into(),
            });
        }

        let results = join_all(self.relays.iter().map(|r| r.publish(event))).await;

        let mut accepted = Vec::new();
        let mut failures = Vec::new();
        for (relay, result) in self.relays.iter().zip(results) {
            match result {
                Ok(ack) if ack.accepted => accepted.push(ack),
                Ok(ack) => {
                    tracing::warn!(relay = relay.url(), message = %ack.message, "relay rejected event");
                    failures.push(format!("{}: rejected ({})", relay.url(), ack.message));
                }
                Err(e) => {
                    tracing::warn!(relay = relay.url(), error = %e, "publish failed");
                    failures.push(e.to_string());
                }
            }
        }

        if accepted.is_empty() {
            return Err(MarginaliaError::RelayError {
                reason: format!("no relay accepted event {}: {}", event.id, failures.join("; ")),
            });
        }

        tracing::info!(id = %event.id, accepted = accepted.len(), total = self.relays.len(), "event published");
        Ok(accepted)
    }

    /// Queries every relay and merges the results.
    ///
    /// # Errors
    ///
    /// Returns [`MarginaliaError::RelayError`] only if every relay failed.
    /// An empty pool yields an empty result.
    pub async fn query(&self, filter: Filter) -> Result<Vec<Event>> {
        if self.relays.is_empty() {
            return Ok(Vec::new());
        }

        let results = join_all(self.relays.iter().map(|r| r.query(filter.clone()))).await;

        let mut batches = Vec::new();
        let mut failures = Vec::new();
        for (relay, result) in self.relays.iter().zip(results) {
            match result {
                Ok(events) => batches.push(events),
                Err(e) => {
                    tracing::warn!(relay = relay.url(), error = %e, "query failed");
                    failures.push(e.to_string());
                }
            }
        }

        if batches.is_empty() {
            return Err(MarginaliaError::RelayError {
                reason: format!("all relays failed: {}", failures.join("; ")),
            });
        }

        Ok(merge_events(batches, filter.limit))
    }
}

/// Merges event batches: de-duplicate by id, newest first, ties by id,
/// truncated to `limit`.
pub fn merge_events(batches: Vec<Vec<Event>>, limit: Option<usize>) -> Vec<Event> {
    let mut seen = HashSet::new();
    let mut merged: Vec<Event> = batches
        .into_iter()
        .flatten()
        .filter(|e| seen.insert(e.id))
        .collect();

    merged.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.as_bytes().cmp(b.id.as_bytes()))
    });

    if let Some(limit) = limit {
        merged.truncate(limit);
    }
    merged
}
