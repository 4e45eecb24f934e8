//! Nostr login session for Marginalia.
//!
//! [`auth::NostrAuth`] is the object a host application constructs once
//! and keeps around: it dispatches logins to a signer strategy, persists
//! the session markers, and signs and publishes events.
//!
//! # Modules
//!
//! - [`store`]: session marker persistence (memory, JSON file)
//! - [`signer`]: local key, NIP-07 and NIP-46 signers
//! - [`auth`]: `NostrAuth` and `LoginRequest`

pub mod auth;
pub mod signer;
pub mod store;

pub use auth::{LoginRequest, NostrAuth};
pub use signer::{LocalKeySigner, Nip07Provider, Nip07Signer, Nip46Signer, Nip46Transport, NostrSigner};
pub use store::{FileSessionStore, MemorySessionStore, SessionStore};
