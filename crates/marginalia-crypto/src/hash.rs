//! SHA-256 hashing.
//!
//! Nostr event ids are SHA-256 digests of the canonical event
//! serialization, and BIP-340 signs those 32-byte digests directly.

use sha2::{Digest, Sha256};

/// Computes the SHA-256 hash of arbitrary data.
///
/// Returns a fixed 32-byte digest.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_vector() {
        assert_eq!(
            hex::encode(sha256(b"")),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn abc_vector() {
        assert_eq!(
            hex::encode(sha256(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn deterministic() {
        assert_eq!(sha256(b"highlight"), sha256(b"highlight"));
        assert_ne!(sha256(b"highlight"), sha256(b"Highlight"));
    }
}
