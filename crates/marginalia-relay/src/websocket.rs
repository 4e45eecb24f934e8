//! WebSocket relay client.
//!
//! Opens a fresh connection per operation: publish sends `EVENT` and
//! waits for the matching `OK`; query sends `REQ`, collects `EVENT`s
//! until `EOSE`, then sends `CLOSE`. Both waits are bounded by the read
//! timeout, the handshake by the connect timeout.
//!
//! Received events that fail signature checks, or are dated more than
//! [`MAX_FUTURE_SKEW_SECS`] ahead of the local clock, are dropped.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use marginalia_protocol::event::Event;
use marginalia_protocol::signing::verify_event;
use marginalia_protocol::validation::{validate_created_at, MAX_FUTURE_SKEW_SECS};
use marginalia_types::config::AppConfig;
use marginalia_types::{EventId, MarginaliaError, Result, Timestamp};
use rand::rngs::OsRng;
use rand::RngCore;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::client::{PublishAck, RelayClient};
use crate::message::{ClientMessage, Filter, RelayMessage};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A relay reached over `ws://` or `wss://`.
#[derive(Clone, Debug)]
pub struct WebSocketRelay {
    url: Url,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl WebSocketRelay {
    /// Creates a relay client for `url`.
    ///
    /// # Errors
    ///
    /// Returns [`MarginaliaError::ConfigError`] if the URL does not parse
    /// or its scheme is not `ws`/`wss`.
    pub fn new(url: &str, connect_timeout: Duration, read_timeout: Duration) -> Result<Self> {
        let url = Url::parse(url).map_err(|e| MarginaliaError::ConfigError {
            reason: format!("invalid relay url {url}: {e}"),
        })?;
        if url.scheme() != "ws" && url.scheme() != "wss" {
            return Err(MarginaliaError::ConfigError {
                reason: format!("relay url {url} must use ws:// or wss://"),
            });
        }
        Ok(Self {
            url,
            connect_timeout,
            read_timeout,
        })
    }

    /// Creates a relay client using the timeouts from `config`.
    pub fn from_config(url: &str, config: &AppConfig) -> Result<Self> {
        Self::new(
            url,
            Duration::from_secs(config.connect_timeout_secs),
            Duration::from_secs(config.read_timeout_secs),
        )
    }

    async fn connect(&self) -> Result<WsStream> {
        let (ws, _response) = timeout(self.connect_timeout, connect_async(self.url.as_str()))
            .await
            .map_err(|_| self.error("connect timeout"))?
            .map_err(|e| self.error(&format!("connect failed: {e}")))?;
        tracing::debug!(relay = %self.url, "connected");
        Ok(ws)
    }

    async fn send(&self, ws: &mut WsStream, msg: &ClientMessage) -> Result<()> {
        let text = msg.to_json()?;
        timeout(self.read_timeout, ws.send(Message::Text(text)))
            .await
            .map_err(|_| self.error("send timeout"))?
            .map_err(|e| self.error(&format!("send failed: {e}")))
    }

    /// Reads the next relay message, skipping control frames and
    /// unparseable text.
    async fn next_message(&self, ws: &mut WsStream) -> Result<RelayMessage> {
        loop {
            let frame = ws
                .next()
                .await
                .ok_or_else(|| self.error("connection closed"))?
                .map_err(|e| self.error(&format!("receive failed: {e}")))?;

            match frame {
                Message::Text(text) => match RelayMessage::from_json(&text) {
                    Ok(msg) => return Ok(msg),
                    Err(e) => tracing::warn!(relay = %self.url, error = %e, "ignoring relay message"),
                },
                Message::Close(_) => return Err(self.error("connection closed by relay")),
                Message::Binary(_) | Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
    }

    async fn await_ok(&self, ws: &mut WsStream, id: EventId) -> Result<PublishAck> {
        loop {
            match self.next_message(ws).await? {
                RelayMessage::Ok {
                    event_id,
                    accepted,
                    message,
                } if event_id == id => {
                    return Ok(PublishAck {
                        relay: self.url.to_string(),
                        event_id,
                        accepted,
                        message,
                    })
                }
                RelayMessage::Notice(notice) => {
                    tracing::warn!(relay = %self.url, %notice, "relay notice");
                }
                _ => {}
            }
        }
    }

    async fn collect_until_eose(&self, ws: &mut WsStream, sub: &str, filter: &Filter) -> Result<Vec<Event>> {
        let mut events = Vec::new();
        loop {
            match self.next_message(ws).await? {
                RelayMessage::Event {
                    subscription_id,
                    event,
                } if subscription_id == sub => {
                    if !filter.matches(&event) {
                        continue;
                    }
                    let checked = validate_created_at(event.created_at, Timestamp::now(), MAX_FUTURE_SKEW_SECS)
                        .and_then(|()| verify_event(&event));
                    match checked {
                        Ok(()) => events.push(*event),
                        Err(e) => {
                            tracing::warn!(relay = %self.url, id = %event.id, error = %e, "dropping invalid event")
                        }
                    }
                }
                RelayMessage::Eose(id) if id == sub => return Ok(events),
                RelayMessage::Closed {
                    subscription_id,
                    message,
                } if subscription_id == sub => {
                    tracing::warn!(relay = %self.url, %message, "subscription closed by relay");
                    return Ok(events);
                }
                RelayMessage::Notice(notice) => {
                    tracing::warn!(relay = %self.url, %notice, "relay notice");
                }
                _ => {}
            }
        }
    }

    fn error(&self, what: &str) -> MarginaliaError {
        MarginaliaError::RelayError {
            reason: format!("{}: {what}", self.url),
        }
    }
}

fn subscription_id() -> String {
    let mut bytes = [0u8; 8];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[async_trait]
impl RelayClient for WebSocketRelay {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn publish(&self, event: &Event) -> Result<PublishAck> {
        let mut ws = self.connect().await?;
        self.send(&mut ws, &ClientMessage::Event(Box::new(event.clone()))).await?;

        let ack = timeout(self.read_timeout, self.await_ok(&mut ws, event.id))
            .await
            .map_err(|_| self.error("timed out waiting for OK"));

        if let Err(e) = ws.close(None).await {
            tracing::debug!(relay = %self.url, error = %e, "close failed");
        }

        let ack = ack??;
        tracing::debug!(relay = %self.url, id = %ack.event_id, accepted = ack.accepted, "publish ack");
        Ok(ack)
    }

    async fn query(&self, filter: Filter) -> Result<Vec<Event>> {
        let sub = subscription_id();
        let mut ws = self.connect().await?;
        self.send(
            &mut ws,
            &ClientMessage::Req {
                subscription_id: sub.clone(),
                filters: vec![filter.clone()],
            },
        )
        .await?;

        let events = timeout(self.read_timeout, self.collect_until_eose(&mut ws, &sub, &filter))
            .await
            .map_err(|_| self.error("timed out waiting for EOSE"));

        if let Err(e) = self.send(&mut ws, &ClientMessage::Close(sub)).await {
            tracing::debug!(relay = %self.url, error = %e, "CLOSE failed");
        }
        if let Err(e) = ws.close(None).await {
            tracing::debug!(relay = %self.url, error = %e, "close failed");
        }

        let events = events??;
        tracing::debug!(relay = %self.url, count = events.len(), "query complete");
        Ok(events)
    }
}
