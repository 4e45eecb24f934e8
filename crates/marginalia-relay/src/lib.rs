//! Nostr relay access for Marginalia.
//!
//! # Modules
//!
//! - [`message`]: NIP-01 client/relay wire messages and [`message::Filter`]
//! - [`client`]: the [`client::RelayClient`] trait and publish acks
//! - [`websocket`]: WebSocket relay client (one connection per operation)
//! - [`pool`]: fan-out over several relays

pub mod client;
pub mod message;
pub mod pool;
pub mod websocket;

pub use client::{PublishAck, RelayClient};
pub use message::{ClientMessage, Filter, RelayMessage};
pub use pool::RelayPool;
pub use websocket::WebSocketRelay;
