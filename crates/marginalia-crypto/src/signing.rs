//! secp256k1 BIP-340 Schnorr signature operations.
//!
//! Provides keypair generation, signing of 32-byte digests, and
//! signature verification against x-only public keys. The secret key
//! is zeroized on drop.

use std::fmt;
use std::str::FromStr;

use k256::schnorr::{SigningKey, VerifyingKey};
use marginalia_types::{MarginaliaError, Result};
use rand::rngs::OsRng;
use rand::RngCore;
use signature::hazmat::{PrehashSigner, PrehashVerifier};
use zeroize::{Zeroize, ZeroizeOnDrop};

// ---------------------------------------------------------------------------
// PublicKey
// ---------------------------------------------------------------------------

/// BIP-340 x-only public key (32 bytes).
///
/// Only constructed from bytes that decode to a valid curve point, so
/// every `PublicKey` can be used for verification.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct PublicKey([u8; 32]);

impl PublicKey {
    /// Fixed byte length of an x-only public key.
    pub const LEN: usize = 32;

    /// Creates a [`PublicKey`] from raw bytes, checking that they name a
    /// point on the curve.
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self> {
        VerifyingKey::from_bytes(&bytes).map_err(|e| MarginaliaError::InvalidKey {
            reason: format!("public key is not a valid x-only point: {e}"),
        })?;
        Ok(Self(bytes))
    }

    /// Returns the underlying 32-byte array.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns the lowercase hex encoding used in event JSON.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for PublicKey {
    type Err = MarginaliaError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_bytes(decode_hex_32(s, "public key")?)
    }
}

impl serde::Serialize for PublicKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for PublicKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

/// BIP-340 Schnorr signature (64 bytes).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Signature([u8; 64]);

impl Signature {
    /// Fixed byte length of a Schnorr signature.
    pub const LEN: usize = 64;

    /// Creates a [`Signature`] from raw bytes.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Returns the underlying 64-byte array.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for Signature {
    type Err = MarginaliaError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| MarginaliaError::CryptoError {
            reason: "invalid hex encoding for signature".into(),
        })?;
        if bytes.len() != Self::LEN {
            return Err(MarginaliaError::CryptoError {
                reason: format!("expected 64 bytes for signature, got {}", bytes.len()),
            });
        }
        let mut arr = [0u8; 64];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl serde::Serialize for Signature {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for Signature {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// SecretKey
// ---------------------------------------------------------------------------

/// Raw 32-byte secp256k1 secret scalar, exactly as the user supplied it.
///
/// BIP-340 may negate the scalar internally; this keeps the original
/// bytes so an `nsec` encodes back to the same string.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey([u8; 32]);

impl SecretKey {
    /// Returns the secret bytes.
    ///
    /// # Security
    ///
    /// Callers must not log or persist the returned bytes unencoded.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns the lowercase hex encoding of the secret.
    pub fn to_secret_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(..)")
    }
}

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// secp256k1 signing keypair.
pub struct Keys {
    secret: SecretKey,
    signing_key: SigningKey,
    public_key: PublicKey,
}

impl Keys {
    /// Generates a new random keypair using OS-level entropy.
    pub fn generate() -> Self {
        loop {
            let mut bytes = [0u8; 32];
            OsRng.fill_bytes(&mut bytes);
            let keys = Self::from_secret_bytes(&bytes);
            bytes.zeroize();
            // Zero or >= curve order; astronomically rare.
            if let Ok(keys) = keys {
                return keys;
            }
        }
    }

    /// Reconstructs a keypair deterministically from a 32-byte secret.
    ///
    /// # Errors
    ///
    /// Returns [`MarginaliaError::InvalidKey`] if the bytes are zero or
    /// not below the curve order.
    pub fn from_secret_bytes(bytes: &[u8; 32]) -> Result<Self> {
        let signing_key = SigningKey::from_bytes(bytes).map_err(|e| MarginaliaError::InvalidKey {
            reason: format!("secret key out of range: {e}"),
        })?;
        let public_bytes: [u8; 32] = signing_key.verifying_key().to_bytes().into();
        Ok(Self {
            secret: SecretKey(*bytes),
            signing_key,
            public_key: PublicKey(public_bytes),
        })
    }

    /// Parses a 64-character hex secret.
    pub fn from_secret_hex(s: &str) -> Result<Self> {
        let mut bytes = decode_hex_32(s, "secret key")?;
        let keys = Self::from_secret_bytes(&bytes);
        bytes.zeroize();
        keys
    }

    /// Returns the x-only public key.
    pub fn public_key(&self) -> PublicKey {
        self.public_key
    }

    /// Returns the secret half of this keypair.
    pub fn secret_key(&self) -> &SecretKey {
        &self.secret
    }

    /// Signs a 32-byte digest (an event id) with BIP-340.
    ///
    /// # Errors
    ///
    /// Returns [`MarginaliaError::CryptoError`] if signing fails.
    pub fn sign_digest(&self, digest: &[u8; 32]) -> Result<Signature> {
        let sig: k256::schnorr::Signature =
            self.signing_key
                .sign_prehash(digest)
                .map_err(|e| MarginaliaError::CryptoError {
                    reason: format!("schnorr signing failed: {e}"),
                })?;
        Ok(Signature(sig.to_bytes()))
    }
}

// Keys intentionally does not implement Clone or Debug to keep the secret
// out of logs and copies.

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Verifies a BIP-340 signature over a 32-byte digest.
///
/// Returns `Ok(())` if the signature is valid, or
/// [`MarginaliaError::CryptoError`] if verification fails.
pub fn verify_digest(public_key: &PublicKey, digest: &[u8; 32], signature: &Signature) -> Result<()> {
    let vk = VerifyingKey::from_bytes(&public_key.0).map_err(|e| MarginaliaError::CryptoError {
        reason: format!("invalid public key: {e}"),
    })?;
    let sig = k256::schnorr::Signature::try_from(&signature.0[..]).map_err(|e| {
        MarginaliaError::CryptoError {
            reason: format!("malformed signature: {e}"),
        }
    })?;
    vk.verify_prehash(digest, &sig)
        .map_err(|e| MarginaliaError::CryptoError {
            reason: format!("signature verification failed: {e}"),
        })
}

fn decode_hex_32(s: &str, what: &str) -> Result<[u8; 32]> {
    let bytes = hex::decode(s).map_err(|_| MarginaliaError::InvalidKey {
        reason: format!("invalid hex encoding for {what}"),
    })?;
    if bytes.len() != 32 {
        return Err(MarginaliaError::InvalidKey {
            reason: format!("expected 32 bytes for {what}, got {}", bytes.len()),
        });
    }
    let mut arr = [0u8; 32];
    arr.copy_from_slice(&bytes);
    Ok(arr)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
