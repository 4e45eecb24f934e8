//! Signer strategies.
//!
//! Every login method ends in a [`NostrSigner`]: something that knows the
//! user's public key and can turn an [`UnsignedEvent`] into a signed
//! [`Event`]. Where the key lives differs:
//!
//! - [`LocalKeySigner`]: in this process (nsec login)
//! - [`Nip07Signer`]: in a browser extension, reached through a
//!   host-supplied [`Nip07Provider`]
//! - [`Nip46Signer`]: on a remote signer, reached through a
//!   host-supplied [`Nip46Transport`]
//!
//! Events returned by external signers are verified before use.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use marginalia_crypto::nip19::parse_secret_key;
use marginalia_crypto::signing::{Keys, PublicKey};
use marginalia_protocol::event::{Event, UnsignedEvent};
use marginalia_protocol::nip46::{parse_signed_event, Nip46Request, Nip46Response, CONNECT_ACK};
use marginalia_protocol::signing::{sign_event, verify_event};
use marginalia_types::{MarginaliaError, Result};

/// Something that can sign events for the logged-in user.
#[async_trait]
pub trait NostrSigner: Send + Sync {
    /// The user's public key.
    async fn public_key(&self) -> Result<PublicKey>;

    /// Signs `unsigned`. The event's pubkey must be the user's.
    async fn sign_event(&self, unsigned: UnsignedEvent) -> Result<Event>;
}

/// Checks that an externally signed event is valid and is the event
/// that was asked for.
fn check_returned(requested: &UnsignedEvent, event: Event) -> Result<Event> {
    verify_event(&event)?;
    if event.id != requested.id()? {
        return Err(MarginaliaError::SignerError {
            reason: format!("signer returned a different event ({})", event.id),
        });
    }
    Ok(event)
}

// ---------------------------------------------------------------------------
// Local key
// ---------------------------------------------------------------------------

/// Signs with a private key held in memory.
pub struct LocalKeySigner {
    keys: Keys,
}

impl LocalKeySigner {
    pub fn new(keys: Keys) -> Self {
        Self { keys }
    }

    /// Builds a signer from an `nsec1...` string or 64-char hex key.
    pub fn from_nsec(nsec: &str) -> Result<Self> {
        Ok(Self::new(parse_secret_key(nsec)?))
    }

    pub fn keys(&self) -> &Keys {
        &self.keys
    }
}

#[async_trait]
impl NostrSigner for LocalKeySigner {
    async fn public_key(&self) -> Result<PublicKey> {
        Ok(self.keys.public_key())
    }

    async fn sign_event(&self, unsigned: UnsignedEvent) -> Result<Event> {
        sign_event(&self.keys, unsigned)
    }
}

// ---------------------------------------------------------------------------
// NIP-07
// ---------------------------------------------------------------------------

/// Host bridge to a NIP-07 extension (`window.nostr`).
#[async_trait]
pub trait Nip07Provider: Send + Sync {
    /// `getPublicKey()`: hex public key.
    async fn get_public_key(&self) -> Result<String>;

    /// `signEvent(template)`: the signed event.
    async fn sign_event(&self, unsigned: &UnsignedEvent) -> Result<Event>;
}

/// Signs through a NIP-07 extension.
pub struct Nip07Signer {
    provider: Arc<dyn Nip07Provider>,
}

impl Nip07Signer {
    pub fn new(provider: Arc<dyn Nip07Provider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl NostrSigner for Nip07Signer {
    async fn public_key(&self) -> Result<PublicKey> {
        let hex = self.provider.get_public_key().await?;
        hex.trim().parse().map_err(|e| MarginaliaError::SignerError {
            reason: format!("extension returned an invalid public key: {e}"),
        })
    }

    async fn sign_event(&self, unsigned: UnsignedEvent) -> Result<Event> {
        let event = self.provider.sign_event(&unsigned).await?;
        check_returned(&unsigned, event)
    }
}

// ---------------------------------------------------------------------------
// NIP-46
// ---------------------------------------------------------------------------

/// Encrypted request/response channel to a remote signer.
///
/// Implementations wrap each request in a kind-24133 event from `local`
/// to `remote`, publish it, and wait for the matching response.
#[async_trait]
pub trait Nip46Transport: Send + Sync {
    async fn send(&self, local: &Keys, remote: &PublicKey, request: Nip46Request) -> Result<Nip46Response>;
}

/// Signs through a NIP-46 remote signer.
pub struct Nip46Signer {
    transport: Arc<dyn Nip46Transport>,
    local: Keys,
    remote: PublicKey,
    user: PublicKey,
    timeout: Duration,
}

impl Nip46Signer {
    /// Connects to `remote` and resolves the user's public key.
    ///
    /// # Process
    ///
    /// 1. `connect` with the remote pubkey and optional secret; the
    ///    signer must answer `ack` or echo the secret.
    /// 2. `get_public_key` for the user's key.
    ///
    /// # Errors
    ///
    /// - [`MarginaliaError::SignerError`] if the signer refuses, answers
    ///   unexpectedly or times out.
    /// - Transport errors are propagated.
    pub async fn connect(
        transport: Arc<dyn Nip46Transport>,
        local: Keys,
        remote: PublicKey,
        secret: Option<&str>,
        timeout: Duration,
    ) -> Result<Self> {
        let mut signer = Self {
            transport,
            local,
            remote,
            user: remote,
            timeout,
        };

        let ack = signer
            .call(Nip46Request::connect(&remote.to_hex(), secret))
            .await?;
        if ack != CONNECT_ACK && Some(ack.as_str()) != secret {
            return Err(MarginaliaError::SignerError {
                reason: format!("unexpected connect reply: {ack}"),
            });
        }

        let user = signer.call(Nip46Request::get_public_key()).await?;
        signer.user = user.trim().parse().map_err(|e| MarginaliaError::SignerError {
            reason: format!("remote signer returned an invalid public key: {e}"),
        })?;

        tracing::debug!(remote = %remote, user = %signer.user, "nip46 signer connected");
        Ok(signer)
    }

    /// Remote signer's public key.
    pub fn remote(&self) -> PublicKey {
        self.remote
    }

    async fn call(&self, request: Nip46Request) -> Result<String> {
        let id = request.id.clone();
        let method = request.method.clone();
        let response = tokio::time::timeout(
            self.timeout,
            self.transport.send(&self.local, &self.remote, request),
        )
        .await
        .map_err(|_| MarginaliaError::SignerError {
            reason: format!("remote signer did not answer {method} within {:?}", self.timeout),
        })??;
        response.into_result(&id)
    }
}

#[async_trait]
impl NostrSigner for Nip46Signer {
    async fn public_key(&self) -> Result<PublicKey> {
        Ok(self.user)
    }

    async fn sign_event(&self, unsigned: UnsignedEvent) -> Result<Event> {
        if unsigned.pubkey != self.user {
            return Err(MarginaliaError::SignerError {
                reason: format!("event author {} is not the remote user {}", unsigned.pubkey, self.user),
            });
        }
        let result = self.call(Nip46Request::sign_event(&unsigned)?).await?;
        check_returned(&unsigned, parse_signed_event(&result)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marginalia_crypto::nip19::encode_nsec;
    use marginalia_types::Kind;

    fn keys(byte: u8) -> Keys {
        Keys::from_secret_bytes(&[byte; 32]).expect("valid scalar")
    }

    #[tokio::test]
    async fn local_signer_from_nsec_signs() -> Result<()> {
        let nsec = encode_nsec(&keys(0x10))?;
        let signer = LocalKeySigner::from_nsec(&nsec)?;
        let pk = signer.public_key().await?;
        assert_eq!(pk, keys(0x10).public_key());

        let event = signer
            .sign_event(UnsignedEvent::new(pk, Kind::TEXT_NOTE, "x", Vec::new()))
            .await?;
        verify_event(&event)
    }

    #[test]
    fn local_signer_rejects_bad_nsec() {
        assert!(LocalKeySigner::from_nsec("nsec1notakey").is_err());
    }

    #[test]
    fn returned_event_must_match_request() -> Result<()> {
        let k = keys(0x11);
        let requested = UnsignedEvent::new(k.public_key(), Kind::TEXT_NOTE, "asked", Vec::new());
        let mut other = requested.clone();
        other.content = "swapped".into();
        let signed_other = sign_event(&k, other)?;
        assert!(matches!(
            check_returned(&requested, signed_other),
            Err(MarginaliaError::SignerError { .. })
        ));
        Ok(())
    }
}
