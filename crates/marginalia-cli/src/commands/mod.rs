//! Subcommand implementations.
//!
//! - [`session`]: login, logout, status, profile
//! - [`keys`]: key generation
//! - [`publish`]: generic signed events
//! - [`highlight`]: selection context and highlight posting

pub mod highlight;
pub mod keys;
pub mod publish;
pub mod session;

use std::sync::Arc;

use marginalia_crypto::nip19::encode_npub;
use marginalia_crypto::signing::PublicKey;
use marginalia_session::{FileSessionStore, NostrAuth};

use crate::GlobalOpts;

/// Opens the file-backed session configured in `opts`.
pub fn open_session(opts: &GlobalOpts) -> Result<NostrAuth, String> {
    let path = opts.config.session_path();
    tracing::debug!(path = %path.display(), "opening session");
    let store = FileSessionStore::open(path).map_err(|e| e.to_string())?;
    NostrAuth::from_config(Arc::new(store), &opts.config.app).map_err(|e| e.to_string())
}

/// Bech32 form of `pubkey`, or `None` if encoding fails.
pub fn npub_of(pubkey: &PublicKey) -> Option<String> {
    encode_npub(pubkey).ok()
}
