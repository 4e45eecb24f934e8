//! Cryptographic primitives for Marginalia.
//!
//! This crate is the only place in the workspace that touches raw key
//! material or signature math.
//!
//! # Modules
//!
//! - [`signing`]: secp256k1 BIP-340 keypairs, signing, and verification
//! - [`hash`]: SHA-256
//! - [`nip19`]: bech32 `npub` / `nsec` encoding

pub mod hash;
pub mod nip19;
pub mod signing;
