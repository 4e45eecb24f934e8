//! Nostr event protocol for Marginalia.
//!
//! Defines the NIP-01 event format, its canonical serialization and id,
//! BIP-340 signing/verification, and the event shapes this application
//! produces or consumes.
//!
//! # Modules
//!
//! - [`event`]: `UnsignedEvent`, `Event`, tag helpers
//! - [`canonical`]: NIP-01 canonical serialization and event id
//! - [`signing`]: event signing and verification
//! - [`validation`]: id recomputation, tag shape, clock skew
//! - [`highlight`]: NIP-84 highlight events
//! - [`metadata`]: kind-0 user metadata and [`metadata::UserProfile`]
//! - [`nip46`]: remote signer JSON-RPC messages

pub mod canonical;
pub mod event;
pub mod highlight;
pub mod metadata;
pub mod nip46;
pub mod signing;
pub mod validation;
