//! NIP-19 bech32 key encoding.
//!
//! Public keys are shown to users as `npub1...` and secret keys are
//! exchanged as `nsec1...`. Both are plain Bech32 (not Bech32m) over the
//! raw 32 bytes. Parsers here also accept 64-character hex, which is
//! what relays and event JSON carry.

use bech32::{self, FromBase32, ToBase32, Variant};
use marginalia_types::{MarginaliaError, Result};
use zeroize::Zeroize;

use crate::signing::{Keys, PublicKey};

/// Human-readable prefix for public keys.
pub const NPUB_HRP: &str = "npub";

/// Human-readable prefix for secret keys.
pub const NSEC_HRP: &str = "nsec";

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Encodes a public key as `npub1...`.
pub fn encode_npub(public_key: &PublicKey) -> Result<String> {
    encode(NPUB_HRP, public_key.as_bytes())
}

/// Encodes the secret half of `keys` as `nsec1...`.
pub fn encode_nsec(keys: &Keys) -> Result<String> {
    encode(NSEC_HRP, keys.secret_key().as_bytes())
}

fn encode(hrp: &str, bytes: &[u8; 32]) -> Result<String> {
    bech32::encode(hrp, bytes.to_base32(), Variant::Bech32).map_err(|e| {
        MarginaliaError::CryptoError {
            reason: format!("bech32 encoding failed: {e}"),
        }
    })
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decodes an `npub1...` string.
///
/// # Errors
///
/// Returns [`MarginaliaError::InvalidKey`] on a bad checksum, a prefix
/// other than `npub`, a payload that is not 32 bytes, or bytes that are
/// not a curve point.
pub fn decode_npub(s: &str) -> Result<PublicKey> {
    let bytes = decode(NPUB_HRP, s)?;
    PublicKey::from_bytes(bytes)
}

/// Decodes an `nsec1...` string into a signing keypair.
///
/// # Errors
///
/// Returns [`MarginaliaError::InvalidKey`] on a bad checksum, a prefix
/// other than `nsec`, a payload that is not 32 bytes, or an out-of-range
/// scalar.
pub fn decode_nsec(s: &str) -> Result<Keys> {
    let mut bytes = decode(NSEC_HRP, s)?;
    let keys = Keys::from_secret_bytes(&bytes);
    bytes.zeroize();
    keys
}

fn decode(expected_hrp: &str, s: &str) -> Result<[u8; 32]> {
    let (hrp, data_base32, variant) = bech32::decode(s).map_err(|e| MarginaliaError::InvalidKey {
        reason: format!("bech32 decoding failed: {e}"),
    })?;

    if hrp != expected_hrp {
        return Err(MarginaliaError::InvalidKey {
            reason: format!("expected HRP '{expected_hrp}', got '{hrp}'"),
        });
    }

    if variant != Variant::Bech32 {
        return Err(MarginaliaError::InvalidKey {
            reason: "expected bech32, got bech32m".into(),
        });
    }

    let mut data = Vec::<u8>::from_base32(&data_base32).map_err(|e| MarginaliaError::InvalidKey {
        reason: format!("bech32 base32 conversion failed: {e}"),
    })?;

    if data.len() != 32 {
        let len = data.len();
        data.zeroize();
        return Err(MarginaliaError::InvalidKey {
            reason: format!("expected 32-byte payload, got {len}"),
        });
    }

    let mut out = [0u8; 32];
    out.copy_from_slice(&data);
    data.zeroize();
    Ok(out)
}

// ---------------------------------------------------------------------------
// Lenient parsers
// ---------------------------------------------------------------------------

/// Parses a public key given either as `npub1...` or as 64-char hex.
pub fn parse_public_key(s: &str) -> Result<PublicKey> {
    let s = s.trim();
    if s.starts_with(NPUB_HRP) {
        decode_npub(s)
    } else {
        s.parse()
    }
}

/// Parses a secret key given either as `nsec1...` or as 64-char hex.
pub fn parse_secret_key(s: &str) -> Result<Keys> {
    let s = s.trim();
    if s.starts_with(NSEC_HRP) {
        decode_nsec(s)
    } else {
        Keys::from_secret_hex(s)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
