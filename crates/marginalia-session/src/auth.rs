//! Login dispatch, session state and publishing.
//!
//! [`NostrAuth`] has two faces. The `try_*` methods return typed
//! errors. The plain methods (`login_with_nsec`, `publish_event`, ...)
//! log the error with `tracing` and collapse it to `bool` / `Option`,
//! which is what UI callers consume.
//!
//! Session state queries ([`NostrAuth::is_logged_in`],
//! [`NostrAuth::current_method`], [`NostrAuth::pubkey`]) read the
//! [`SessionStore`] only, never the live signer.

use std::sync::Arc;
use std::time::Duration;

use marginalia_crypto::nip19::{parse_public_key, parse_secret_key};
use marginalia_crypto::signing::{Keys, PublicKey};
use marginalia_protocol::event::{Event, Tag, UnsignedEvent};
use marginalia_protocol::highlight::{build_highlight, BookMetadata};
use marginalia_protocol::metadata::{latest_metadata, parse_metadata, UserProfile};
use marginalia_protocol::signing::verify_event;
use marginalia_relay::{Filter, RelayPool};
use marginalia_types::config::AppConfig;
use marginalia_types::{EventId, Kind, LoginMethod, MarginaliaError, Result};
use tokio::sync::RwLock;

use crate::signer::{LocalKeySigner, Nip07Provider, Nip07Signer, Nip46Signer, Nip46Transport, NostrSigner};
use crate::store::{SessionStore, KEY_METHOD, KEY_NSEC, KEY_PUBKEY, KEY_REMOTE, SESSION_KEYS};

/// Default NIP-46 request timeout.
const DEFAULT_NIP46_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// LoginRequest
// ---------------------------------------------------------------------------

/// A login attempt as collected by a login form.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LoginRequest {
    /// Private key login.
    Nsec { nsec: String },
    /// Browser extension login.
    Nip07,
    /// Remote signer login.
    Nip46 {
        remote_pubkey: String,
        local_nsec: Option<String>,
    },
}

impl LoginRequest {
    /// Builds a request from a method and the raw form fields.
    ///
    /// `credential` is the nsec for [`LoginMethod::Nsec`] and the remote
    /// pubkey for [`LoginMethod::Nip46`]. Fields are trimmed; an empty
    /// local nsec counts as absent.
    ///
    /// # Errors
    ///
    /// [`MarginaliaError::InvalidInput`] if a required field is empty or
    /// the method has no login flow (`remote`).
    pub fn new(method: LoginMethod, credential: Option<&str>, local_nsec: Option<&str>) -> Result<Self> {
        let credential = credential.map(str::trim).unwrap_or_default();
        match method {
            LoginMethod::Nsec => {
                require(credential, "nsec")?;
                Ok(Self::Nsec {
                    nsec: credential.to_string(),
                })
            }
            LoginMethod::Nip07 => Ok(Self::Nip07),
            LoginMethod::Nip46 => {
                require(credential, "remote signer public key")?;
                Ok(Self::Nip46 {
                    remote_pubkey: credential.to_string(),
                    local_nsec: local_nsec.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string),
                })
            }
            LoginMethod::Remote => Err(MarginaliaError::InvalidInput {
                reason: "invalid login method".into(),
            }),
        }
    }

    /// Method this request logs in with.
    pub fn method(&self) -> LoginMethod {
        match self {
            Self::Nsec { .. } => LoginMethod::Nsec,
            Self::Nip07 => LoginMethod::Nip07,
            Self::Nip46 { .. } => LoginMethod::Nip46,
        }
    }
}

fn require(value: &str, what: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(MarginaliaError::InvalidInput {
            reason: format!("{what} is empty"),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// NostrAuth
// ---------------------------------------------------------------------------

/// The Nostr session of one user of the reader.
pub struct NostrAuth {
    store: Arc<dyn SessionStore>,
    relays: RelayPool,
    nip07: Option<Arc<dyn Nip07Provider>>,
    nip46: Option<Arc<dyn Nip46Transport>>,
    nip46_timeout: Duration,
    signer: RwLock<Option<Arc<dyn NostrSigner>>>,
}

impl NostrAuth {
    /// Creates a session over `store`, publishing to `relays`.
    pub fn new(store: Arc<dyn SessionStore>, relays: RelayPool) -> Self {
        Self {
            store,
            relays,
            nip07: None,
            nip46: None,
            nip46_timeout: DEFAULT_NIP46_TIMEOUT,
            signer: RwLock::new(None),
        }
    }

    /// Creates a session using the relays and timeouts from `config`.
    pub fn from_config(store: Arc<dyn SessionStore>, config: &AppConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(store, RelayPool::from_config(config)?)
            .with_nip46_timeout(Duration::from_secs(config.nip46_timeout_secs)))
    }

    /// Installs the NIP-07 extension bridge.
    pub fn with_nip07(mut self, provider: Arc<dyn Nip07Provider>) -> Self {
        self.nip07 = Some(provider);
        self
    }

    /// Installs the NIP-46 transport.
    pub fn with_nip46(mut self, transport: Arc<dyn Nip46Transport>) -> Self {
        self.nip46 = Some(transport);
        self
    }

    pub fn with_nip46_timeout(mut self, timeout: Duration) -> Self {
        self.nip46_timeout = timeout;
        self
    }

    /// Relays this session publishes to.
    pub fn relays(&self) -> &RelayPool {
        &self.relays
    }

    // -----------------------------------------------------------------------
    // Login
    // -----------------------------------------------------------------------

    /// Logs in with a private key (`nsec1...` or hex).
    ///
    /// Persists method `nsec`, the pubkey, and the key as given.
    pub async fn try_login_with_nsec(&self, nsec: &str) -> Result<PublicKey> {
        let nsec = nsec.trim();
        require(nsec, "nsec")?;

        let signer = LocalKeySigner::from_nsec(nsec)?;
        let pubkey = signer.public_key().await?;

        self.save_session(LoginMethod::Nsec, &pubkey, Some(nsec), None)?;
        self.install(Arc::new(signer)).await;

        tracing::info!(%pubkey, method = "nsec", "logged in");
        Ok(pubkey)
    }

    pub async fn login_with_nsec(&self, nsec: &str) -> bool {
        report(self.try_login_with_nsec(nsec).await, "nsec login failed")
    }

    /// Logs in through the NIP-07 extension.
    ///
    /// # Errors
    ///
    /// [`MarginaliaError::ExtensionUnavailable`] if no provider is
    /// installed.
    pub async fn try_login_with_nip07(&self) -> Result<PublicKey> {
        let provider = self.nip07.clone().ok_or(MarginaliaError::ExtensionUnavailable)?;
        let signer = Nip07Signer::new(provider);
        let pubkey = signer.public_key().await?;

        self.save_session(LoginMethod::Nip07, &pubkey, None, None)?;
        self.install(Arc::new(signer)).await;

        tracing::info!(%pubkey, method = "nip07", "logged in");
        Ok(pubkey)
    }

    pub async fn login_with_nip07(&self) -> bool {
        report(self.try_login_with_nip07().await, "nip07 login failed")
    }

    /// Logs in through a NIP-46 remote signer.
    ///
    /// `remote_pubkey` may be `npub1...` or hex. The local client key
    /// comes from `local_nsec`, or is generated; it is persisted only
    /// when supplied. The remote signer's key is persisted for
    /// [`restore`](Self::restore).
    pub async fn try_login_with_nip46(&self, remote_pubkey: &str, local_nsec: Option<&str>) -> Result<PublicKey> {
        let remote_pubkey = remote_pubkey.trim();
        require(remote_pubkey, "remote signer public key")?;
        let local_nsec = local_nsec.map(str::trim).filter(|s| !s.is_empty());

        let transport = self.nip46.clone().ok_or_else(|| MarginaliaError::SignerError {
            reason: "no NIP-46 transport configured".into(),
        })?;
        let remote = parse_public_key(remote_pubkey)?;
        let local = match local_nsec {
            Some(nsec) => parse_secret_key(nsec)?,
            None => Keys::generate(),
        };

        let signer = Nip46Signer::connect(transport, local, remote, None, self.nip46_timeout).await?;
        let pubkey = signer.public_key().await?;

        self.save_session(LoginMethod::Nip46, &pubkey, local_nsec, Some(&signer.remote()))?;
        self.install(Arc::new(signer)).await;

        tracing::info!(%pubkey, %remote, method = "nip46", "logged in");
        Ok(pubkey)
    }

    pub async fn login_with_nip46(&self, remote_pubkey: &str, local_nsec: Option<&str>) -> bool {
        report(
            self.try_login_with_nip46(remote_pubkey, local_nsec).await,
            "nip46 login failed",
        )
    }

    /// Dispatches `request` to the matching login flow.
    pub async fn try_login(&self, request: LoginRequest) -> Result<PublicKey> {
        match request {
            LoginRequest::Nsec { nsec } => self.try_login_with_nsec(&nsec).await,
            LoginRequest::Nip07 => self.try_login_with_nip07().await,
            LoginRequest::Nip46 {
                remote_pubkey,
                local_nsec,
            } => self.try_login_with_nip46(&remote_pubkey, local_nsec.as_deref()).await,
        }
    }

    pub async fn login(&self, request: LoginRequest) -> bool {
        let method = request.method();
        match self.try_login(request).await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(error = %e, %method, "login failed");
                false
            }
        }
    }

    /// Rebuilds the signer from the persisted session.
    ///
    /// - `nsec`: from the stored key.
    /// - `nip07`: from the installed provider.
    /// - `nip46`: reconnects with the stored local key (or a fresh one)
    ///   to the stored remote signer. Sessions without a stored remote
    ///   signer cannot be restored.
    ///
    /// Returns whether a live signer exists afterwards. The session
    /// markers are left untouched on failure.
    pub async fn restore(&self) -> bool {
        match self.try_restore().await {
            Ok(restored) => restored,
            Err(e) => {
                tracing::warn!(error = %e, "could not restore nostr session");
                false
            }
        }
    }

    async fn try_restore(&self) -> Result<bool> {
        if self.signer.read().await.is_some() {
            return Ok(true);
        }
        let (Some(method), Some(pubkey)) = (self.current_method(), self.pubkey()) else {
            return Ok(false);
        };
        let pubkey: PublicKey = pubkey.parse()?;

        let signer: Arc<dyn NostrSigner> = match method {
            LoginMethod::Nsec => {
                let nsec = self.stored(KEY_NSEC)?.ok_or_else(|| MarginaliaError::StorageError {
                    reason: "nsec session has no stored key".into(),
                })?;
                Arc::new(LocalKeySigner::from_nsec(&nsec)?)
            }
            LoginMethod::Nip07 => {
                let provider = self.nip07.clone().ok_or(MarginaliaError::ExtensionUnavailable)?;
                Arc::new(Nip07Signer::new(provider))
            }
            LoginMethod::Nip46 => {
                let Some(remote) = self.stored(KEY_REMOTE)? else {
                    tracing::warn!(%pubkey, "nip46 session has no stored remote signer");
                    return Ok(false);
                };
                let remote: PublicKey = remote.parse()?;
                let transport = self.nip46.clone().ok_or_else(|| MarginaliaError::SignerError {
                    reason: "no NIP-46 transport configured".into(),
                })?;
                let local = match self.stored(KEY_NSEC)? {
                    Some(nsec) => parse_secret_key(&nsec)?,
                    None => Keys::generate(),
                };
                Arc::new(Nip46Signer::connect(transport, local, remote, None, self.nip46_timeout).await?)
            }
            LoginMethod::Remote => return Ok(false),
        };

        let live = signer.public_key().await?;
        if live != pubkey {
            return Err(MarginaliaError::SignerError {
                reason: format!("restored signer key {live} does not match session {pubkey}"),
            });
        }

        self.install(signer).await;
        tracing::info!(%pubkey, %method, "session restored");
        Ok(true)
    }

    /// Clears the session. Storage errors are logged, never returned.
    pub async fn logout(&self) {
        for key in SESSION_KEYS.into_iter().rev() {
            if let Err(e) = self.store.remove(key) {
                tracing::error!(error = %e, key, "logout failed to clear session key");
            }
        }
        *self.signer.write().await = None;
        tracing::info!("logged out");
    }

    /// Whether a NIP-07 extension bridge is installed.
    pub fn is_nip07_available(&self) -> bool {
        self.nip07.is_some()
    }

    /// Whether a NIP-46 transport is installed.
    pub fn is_nip46_available(&self) -> bool {
        self.nip46.is_some()
    }

    // -----------------------------------------------------------------------
    // Session state (storage only)
    // -----------------------------------------------------------------------

    /// `true` iff both method and pubkey are stored and non-empty.
    pub fn is_logged_in(&self) -> bool {
        let present = |key: &str| matches!(self.stored(key), Ok(Some(v)) if !v.is_empty());
        present(KEY_METHOD) && present(KEY_PUBKEY)
    }

    /// Stored login method; unknown tags yield `None`.
    pub fn current_method(&self) -> Option<LoginMethod> {
        self.stored(KEY_METHOD).ok().flatten()?.parse().ok()
    }

    /// Stored pubkey, as stored.
    pub fn pubkey(&self) -> Option<String> {
        self.stored(KEY_PUBKEY).ok().flatten()
    }

    /// Whether a signer is live in this process.
    pub async fn has_signer(&self) -> bool {
        self.signer.read().await.is_some()
    }

    fn stored(&self, key: &str) -> Result<Option<String>> {
        self.store.get(key).map_err(|e| {
            tracing::warn!(error = %e, key, "session read failed");
            e
        })
    }

    /// Writes a complete session, the method last.
    ///
    /// Keys passed as `None` are removed. If any write fails, every key
    /// is put back to its previous value and the error is returned.
    fn save_session(
        &self,
        method: LoginMethod,
        pubkey: &PublicKey,
        nsec: Option<&str>,
        remote: Option<&PublicKey>,
    ) -> Result<()> {
        let pubkey = pubkey.to_hex();
        let remote = remote.map(PublicKey::to_hex);
        let values = [
            (KEY_PUBKEY, Some(pubkey.as_str())),
            (KEY_NSEC, nsec),
            (KEY_REMOTE, remote.as_deref()),
            (KEY_METHOD, Some(method.as_str())),
        ];

        let previous = SESSION_KEYS
            .into_iter()
            .map(|key| Ok((key, self.stored(key)?)))
            .collect::<Result<Vec<_>>>()?;

        for (key, value) in values {
            if let Err(e) = self.write(key, value) {
                tracing::warn!(error = %e, key, "session write failed; rolling back");
                for (key, old) in previous.iter().rev() {
                    if let Err(e) = self.write(key, old.as_deref()) {
                        tracing::error!(error = %e, key, "failed to roll back session key");
                    }
                }
                return Err(e);
            }
        }
        Ok(())
    }

    fn write(&self, key: &str, value: Option<&str>) -> Result<()> {
        match value {
            Some(v) => self.store.set(key, v),
            None => self.store.remove(key),
        }
    }

    async fn install(&self, signer: Arc<dyn NostrSigner>) {
        *self.signer.write().await = Some(signer);
    }

    async fn active_signer(&self) -> Result<Arc<dyn NostrSigner>> {
        if !self.is_logged_in() {
            return Err(MarginaliaError::NotLoggedIn);
        }
        if let Some(signer) = self.signer.read().await.clone() {
            return Ok(signer);
        }
        if self.try_restore().await? {
            if let Some(signer) = self.signer.read().await.clone() {
                return Ok(signer);
            }
        }
        Err(MarginaliaError::SignerError {
            reason: "session has no usable signer".into(),
        })
    }

    // -----------------------------------------------------------------------
    // Publishing
    // -----------------------------------------------------------------------

    /// Signs an event with the active signer and verifies the result.
    pub async fn try_sign(&self, kind: Kind, content: &str, tags: Vec<Tag>) -> Result<Event> {
        let signer = self.active_signer().await?;
        let pubkey = signer.public_key().await?;
        let event = signer
            .sign_event(UnsignedEvent::new(pubkey, kind, content, tags))
            .await?;
        verify_event(&event)?;
        Ok(event)
    }

    /// Signs and publishes an event.
    ///
    /// With an empty relay pool the signed event is only logged.
    ///
    /// # Errors
    ///
    /// - [`MarginaliaError::NotLoggedIn`] without a session.
    /// - Signer errors from the active signer.
    /// - [`MarginaliaError::RelayError`] if no relay accepted the event.
    pub async fn try_publish_event(&self, kind: Kind, content: &str, tags: Vec<Tag>) -> Result<EventId> {
        let event = self.try_sign(kind, content, tags).await?;

        if self.relays.is_empty() {
            tracing::info!(id = %event.id, kind = %event.kind, "no relays configured; event signed but not sent");
            return Ok(event.id);
        }

        self.relays.publish(&event).await?;
        Ok(event.id)
    }

    pub async fn publish_event(&self, kind: Kind, content: &str, tags: Vec<Tag>) -> Option<EventId> {
        if !self.is_logged_in() {
            return None;
        }
        self.try_publish_event(kind, content, tags)
            .await
            .map_err(|e| tracing::error!(error = %e, %kind, "failed to publish event"))
            .ok()
    }

    /// Publishes a NIP-84 highlight.
    pub async fn try_publish_highlight(
        &self,
        text: &str,
        book: &BookMetadata,
        context: &str,
        comment: Option<&str>,
    ) -> Result<EventId> {
        let signer = self.active_signer().await?;
        let pubkey = signer.public_key().await?;
        let unsigned = build_highlight(pubkey, text, book, context, comment)?;
        self.try_publish_event(unsigned.kind, &unsigned.content, unsigned.tags)
            .await
    }

    pub async fn publish_highlight(
        &self,
        text: &str,
        title: &str,
        creator: &str,
        context: &str,
        comment: Option<&str>,
    ) -> Option<EventId> {
        if !self.is_logged_in() {
            return None;
        }
        let book = BookMetadata::new(title, creator);
        self.try_publish_highlight(text, &book, context, comment)
            .await
            .map_err(|e| tracing::error!(error = %e, "failed to publish highlight"))
            .ok()
    }

    // -----------------------------------------------------------------------
    // Profile
    // -----------------------------------------------------------------------

    /// Fetches the logged-in user's kind-0 profile.
    ///
    /// Falls back to a bare profile when relays have none.
    pub async fn try_user_profile(&self) -> Result<UserProfile> {
        if !self.is_logged_in() {
            return Err(MarginaliaError::NotLoggedIn);
        }
        let pubkey: PublicKey = self.pubkey().ok_or(MarginaliaError::NotLoggedIn)?.parse()?;

        let filter = Filter::new().author(pubkey).kind(Kind::METADATA).limit(1);
        let events = match self.relays.query(filter).await {
            Ok(events) => events,
            Err(e) => {
                tracing::warn!(error = %e, "profile lookup failed");
                Vec::new()
            }
        };

        match latest_metadata(&events, &pubkey) {
            Some(event) => parse_metadata(event),
            None => Ok(UserProfile::bare(pubkey)),
        }
    }

    pub async fn user_profile(&self) -> Option<UserProfile> {
        if !self.is_logged_in() {
            return None;
        }
        self.try_user_profile()
            .await
            .map_err(|e| tracing::error!(error = %e, "failed to get user profile"))
            .ok()
    }
}

fn report(result: Result<PublicKey>, what: &'static str) -> bool {
    match result {
        Ok(_) => true,
        Err(e) => {
            tracing::error!(error = %e, "{what}");
            false
        }
    }
}
