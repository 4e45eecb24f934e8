//! Session commands: login, logout, status, profile.

use clap::Subcommand;
use marginalia_crypto::signing::PublicKey;

use super::{npub_of, open_session};
use crate::output;
use crate::GlobalOpts;

#[derive(Subcommand)]
pub enum LoginAction {
    /// Log in with a private key.
    Nsec {
        /// `nsec1...` or 64 hex characters.
        nsec: String,
    },
    /// Log in through a NIP-07 browser extension.
    Nip07,
    /// Log in through a NIP-46 remote signer (needs a host that provides
    /// the relay transport).
    Nip46 {
        /// Remote signer public key (`npub1...` or hex).
        remote: String,
        /// Local client key; generated when omitted.
        #[arg(long)]
        local_nsec: Option<String>,
    },
}

pub async fn login(action: LoginAction, opts: &GlobalOpts) -> std::result::Result<(), String> {
    let auth = open_session(opts)?;
    let (pubkey, method) = match action {
        LoginAction::Nsec { nsec } => (auth.try_login_with_nsec(&nsec).await, "nsec"),
        LoginAction::Nip07 => (auth.try_login_with_nip07().await, "nip07"),
        LoginAction::Nip46 { .. } if !auth.is_nip46_available() => {
            return Err("NIP-46 remote signer transport not available in a terminal".into());
        }
        LoginAction::Nip46 { remote, local_nsec } => (
            auth.try_login_with_nip46(&remote, local_nsec.as_deref()).await,
            "nip46",
        ),
    };
    let pubkey = pubkey.map_err(|e| e.to_string())?;
    print_identity(&pubkey, method, opts.json);
    Ok(())
}

fn print_identity(pubkey: &PublicKey, method: &str, json: bool) {
    let npub = npub_of(pubkey).unwrap_or_else(|| pubkey.to_hex());
    if json {
        output::print_record(
            &[
                ("status", "ok".into()),
                ("method", method.into()),
                ("pubkey", pubkey.to_hex().into()),
                ("npub", npub.into()),
            ],
            true,
        );
    } else {
        output::print_success(&format!("logged in as {npub} ({method})"), false);
    }
}

pub async fn logout(opts: &GlobalOpts) -> std::result::Result<(), String> {
    let auth = open_session(opts)?;
    auth.logout().await;
    output::print_success("logged out", opts.json);
    Ok(())
}

pub fn status(opts: &GlobalOpts) -> std::result::Result<(), String> {
    let auth = open_session(opts)?;
    let pubkey = auth.pubkey();
    let npub = pubkey
        .as_deref()
        .and_then(|pk| pk.parse::<PublicKey>().ok())
        .and_then(|pk| npub_of(&pk));

    output::print_record(
        &[
            ("logged_in", auth.is_logged_in().into()),
            ("method", auth.current_method().map(|m| m.to_string()).into()),
            ("pubkey", pubkey.into()),
            ("npub", npub.into()),
        ],
        opts.json,
    );
    Ok(())
}

pub async fn profile(opts: &GlobalOpts) -> std::result::Result<(), String> {
    let auth = open_session(opts)?;
    let profile = auth.try_user_profile().await.map_err(|e| e.to_string())?;

    output::print_record(
        &[
            ("pubkey", profile.pubkey.to_hex().into()),
            ("npub", npub_of(&profile.pubkey).into()),
            ("name", profile.name.into()),
            ("about", profile.about.into()),
            ("picture", profile.picture.into()),
        ],
        opts.json,
    );
    Ok(())
}
