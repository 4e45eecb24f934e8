//! Integration tests for marginalia-relay.
//!
//! Pool behaviour is tested against in-memory fake relays. The
//! WebSocket client is tested against a loopback relay served with
//! `tokio-tungstenite` on 127.0.0.1.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use marginalia_crypto::signing::Keys;
use marginalia_protocol::event::{Event, UnsignedEvent};
use marginalia_protocol::signing::sign_event;
use marginalia_relay::{Filter, PublishAck, RelayClient, RelayPool, WebSocketRelay};
use marginalia_types::{Kind, MarginaliaError, Result, Timestamp};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn keys() -> Keys {
    Keys::from_secret_bytes(&[0x42u8; 32]).unwrap_or_else(|_| Keys::generate())
}

fn event_at(keys: &Keys, kind: Kind, content: &str, secs: u64) -> Result<Event> {
    let unsigned = UnsignedEvent::new(keys.public_key(), kind, content, Vec::new())
        .with_created_at(Timestamp::from_secs(secs));
    sign_event(keys, unsigned)
}

/// Fake relay: stores published events and answers queries from them.
struct FakeRelay {
    url: String,
    accept: bool,
    fail: bool,
    stored: Mutex<Vec<Event>>,
}

impl FakeRelay {
    fn new(url: &str, accept: bool, fail: bool, stored: Vec<Event>) -> Arc<Self> {
        Arc::new(Self {
            url: url.to_string(),
            accept,
            fail,
            stored: Mutex::new(stored),
        })
    }

    fn stored_len(&self) -> usize {
        self.stored.lock().map(|s| s.len()).unwrap_or(0)
    }
}

#[async_trait]
impl RelayClient for FakeRelay {
    fn url(&self) -> &str {
        &self.url
    }

    async fn publish(&self, event: &Event) -> Result<PublishAck> {
        if self.fail {
            return Err(MarginaliaError::RelayError {
                reason: format!("{}: unreachable", self.url),
            });
        }
        if self.accept {
            if let Ok(mut stored) = self.stored.lock() {
                stored.push(event.clone());
            }
        }
        Ok(PublishAck {
            relay: self.url.clone(),
            event_id: event.id,
            accepted: self.accept,
            message: if self.accept { String::new() } else { "blocked: test".into() },
        })
    }

    async fn query(&self, filter: Filter) -> Result<Vec<Event>> {
        if self.fail {
            return Err(MarginaliaError::RelayError {
                reason: format!("{}: unreachable", self.url),
            });
        }
        let stored = self.stored.lock().map(|s| s.clone()).unwrap_or_default();
        Ok(stored.into_iter().filter(|e| filter.matches(e)).collect())
    }
}

fn as_client(relay: &Arc<FakeRelay>) -> Arc<dyn RelayClient> {
    relay.clone()
}

// ---------------------------------------------------------------------------
// 1. Pool publish
// ---------------------------------------------------------------------------

#[tokio::test]
async fn publish_succeeds_when_any_relay_accepts() -> Result<()> {
    let good = FakeRelay::new("wss://good", true, false, Vec::new());
    let down = FakeRelay::new("wss://down", true, true, Vec::new());
    let picky = FakeRelay::new("wss://picky", false, false, Vec::new());
    let pool = RelayPool::new(vec![as_client(&down), as_client(&picky), as_client(&good)]);

    let event = event_at(&keys(), Kind::TEXT_NOTE, "hello", 10)?;
    let acks = pool.publish(&event).await?;

    assert_eq!(acks.len(), 1);
    assert_eq!(acks[0].relay, "wss://good");
    assert_eq!(good.stored_len(), 1);
    assert_eq!(picky.stored_len(), 0);
    Ok(())
}

#[tokio::test]
async fn publish_fails_when_nobody_accepts() -> Result<()> {
    let down = FakeRelay::new("wss://down", true, true, Vec::new());
    let picky = FakeRelay::new("wss://picky", false, false, Vec::new());
    let pool = RelayPool::new(vec![as_client(&down), as_client(&picky)]);

    let event = event_at(&keys(), Kind::TEXT_NOTE, "hello", 10)?;
    match pool.publish(&event).await {
        Err(MarginaliaError::RelayError { reason }) => {
            assert!(reason.contains("wss://down"));
            assert!(reason.contains("blocked: test"));
        }
        other => panic!("expected relay error, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn empty_pool_publish_is_an_error() -> Result<()> {
    let event = event_at(&keys(), Kind::TEXT_NOTE, "hello", 10)?;
    assert!(RelayPool::empty().publish(&event).await.is_err());
    Ok(())
}

// ---------------------------------------------------------------------------
// 2. Pool query
// ---------------------------------------------------------------------------

#[tokio::test]
async fn query_merges_dedups_newest_first() -> Result<()> {
    let keys = keys();
    let old = event_at(&keys, Kind::METADATA, r#"{"name":"old"}"#, 100)?;
    let new = event_at(&keys, Kind::METADATA, r#"{"name":"new"}"#, 200)?;
    let note = event_at(&keys, Kind::TEXT_NOTE, "note", 300)?;

    let a = FakeRelay::new("wss://a", true, false, vec![old.clone(), note]);
    let b = FakeRelay::new("wss://b", true, false, vec![new.clone(), old.clone()]);
    let down = FakeRelay::new("wss://down", true, true, Vec::new());
    let pool = RelayPool::new(vec![as_client(&a), as_client(&b), as_client(&down)]);

    let events = pool
        .query(Filter::new().author(keys.public_key()).kind(Kind::METADATA))
        .await?;
    assert_eq!(events, vec![new.clone(), old]);

    let limited = pool.query(Filter::new().kind(Kind::METADATA).limit(1)).await?;
    assert_eq!(limited, vec![new]);
    Ok(())
}

#[tokio::test]
async fn query_fails_only_when_all_relays_fail() {
    let down = FakeRelay::new("wss://down", true, true, Vec::new());
    let pool = RelayPool::new(vec![as_client(&down)]);
    assert!(pool.query(Filter::new()).await.is_err());
    assert!(matches!(RelayPool::empty().query(Filter::new()).await, Ok(v) if v.is_empty()));
}

// ---------------------------------------------------------------------------
// 3. WebSocket relay against a loopback server
// ---------------------------------------------------------------------------

/// Serves one connection: answers EVENT with OK and REQ with the given
/// stored events followed by EOSE.
async fn serve_once(listener: TcpListener, stored: Vec<Event>) {
    let Ok((stream, _)) = listener.accept().await else {
        return;
    };
    let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
        return;
    };

    while let Some(Ok(frame)) = ws.next().await {
        let Message::Text(text) = frame else {
            continue;
        };
        let Ok(items) = serde_json::from_str::<Vec<Value>>(&text) else {
            continue;
        };
        let replies: Vec<String> = match items.first().and_then(Value::as_str) {
            Some("EVENT") => {
                let id = items[1]["id"].as_str().unwrap_or_default().to_string();
                vec![
                    Value::Array(vec!["NOTICE".into(), "welcome".into()]).to_string(),
                    Value::Array(vec!["OK".into(), id.into(), true.into(), "".into()]).to_string(),
                ]
            }
            Some("REQ") => {
                let sub = items[1].as_str().unwrap_or_default().to_string();
                let mut out: Vec<String> = stored
                    .iter()
                    .map(|e| {
                        let ev = serde_json::to_value(e).unwrap_or(Value::Null);
                        Value::Array(vec!["EVENT".into(), sub.clone().into(), ev]).to_string()
                    })
                    .collect();
                out.push(Value::Array(vec!["EOSE".into(), sub.into()]).to_string());
                out
            }
            _ => Vec::new(),
        };
        for reply in replies {
            if ws.send(Message::Text(reply)).await.is_err() {
                return;
            }
        }
    }
}

async fn loopback(stored: Vec<Event>) -> std::io::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(serve_once(listener, stored));
    Ok(format!("ws://{addr}"))
}

#[tokio::test]
async fn websocket_publish_waits_for_ok() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let url = loopback(Vec::new()).await?;
    let relay = WebSocketRelay::new(&url, Duration::from_secs(5), Duration::from_secs(5))?;

    let event = event_at(&keys(), Kind::HIGHLIGHT, "excerpt", 50)?;
    let ack = relay.publish(&event).await?;
    assert!(ack.accepted);
    assert_eq!(ack.event_id, event.id);
    Ok(())
}

#[tokio::test]
async fn websocket_query_drops_forged_and_future_events() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let keys = keys();
    let meta = event_at(&keys, Kind::METADATA, r#"{"name":"ada"}"#, 70)?;
    let mut forged = event_at(&keys, Kind::METADATA, r#"{"name":"eve"}"#, 80)?;
    forged.content = r#"{"name":"mallory"}"#.into();
    let tomorrow = Timestamp::now().as_secs() + 86_400;
    let future = event_at(&keys, Kind::METADATA, r#"{"name":"from tomorrow"}"#, tomorrow)?;

    let url = loopback(vec![meta.clone(), forged, future]).await?;
    let relay = WebSocketRelay::new(&url, Duration::from_secs(5), Duration::from_secs(5))?;

    let events = relay
        .query(Filter::new().author(keys.public_key()).kind(Kind::METADATA).limit(5))
        .await?;
    assert_eq!(events, vec![meta]);
    Ok(())
}

#[tokio::test]
async fn websocket_connect_failure_is_relay_error() -> std::result::Result<(), Box<dyn std::error::Error>> {
    // Bind then drop to get a port with nothing listening.
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);

    let relay = WebSocketRelay::new(&format!("ws://{addr}"), Duration::from_secs(2), Duration::from_secs(2))?;
    let event = event_at(&keys(), Kind::TEXT_NOTE, "x", 1)?;
    assert!(matches!(
        relay.publish(&event).await,
        Err(MarginaliaError::RelayError { .. })
    ));
    Ok(())
}
