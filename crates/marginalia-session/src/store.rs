//! Session marker persistence.
//!
//! A session is a handful of string values under fixed keys
//! ([`KEY_METHOD`], [`KEY_PUBKEY`], [`KEY_NSEC`], and [`KEY_REMOTE`] for
//! remote signer sessions). Values are opaque:
//! the store neither validates nor versions them.
//!
//! # File format
//!
//! ```json
//! {
//!   "nostr_method": "nsec",
//!   "nostr_pubkey": "<hex 32 bytes>",
//!   "nostr_nsec": "nsec1...",
//!   "nostr_remote": "<hex 32 bytes, NIP-46 only>"
//! }
//! ```
//!
//! The file may hold a private key, so it is created with mode `0600`
//! on Unix.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use marginalia_types::{MarginaliaError, Result};

/// Key holding the login method tag.
pub const KEY_METHOD: &str = "nostr_method";
/// Key holding the user's hex public key.
pub const KEY_PUBKEY: &str = "nostr_pubkey";
/// Key holding a private key (nsec login, or NIP-46 local key).
pub const KEY_NSEC: &str = "nostr_nsec";
/// Key holding the NIP-46 remote signer's hex public key.
pub const KEY_REMOTE: &str = "nostr_remote";

/// Every key a session may write, in write order. The method goes last
/// so a session only becomes visible once the rest of it is in place.
pub const SESSION_KEYS: [&str; 4] = [KEY_PUBKEY, KEY_NSEC, KEY_REMOTE, KEY_METHOD];

// ---------------------------------------------------------------------------
// SessionStore
// ---------------------------------------------------------------------------

/// Key-value persistence for session markers.
pub trait SessionStore: Send + Sync {
    /// Returns the value under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

fn lock(entries: &Mutex<BTreeMap<String, String>>) -> Result<MutexGuard<'_, BTreeMap<String, String>>> {
    entries.lock().map_err(|_| MarginaliaError::StorageError {
        reason: "session store lock poisoned".into(),
    })
}

// ---------------------------------------------------------------------------
// MemorySessionStore
// ---------------------------------------------------------------------------

/// In-process session store.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(lock(&self.entries)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        lock(&self.entries)?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        lock(&self.entries)?.remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FileSessionStore
// ---------------------------------------------------------------------------

/// Session store backed by a JSON object file.
///
/// The file is read once on [`open`](Self::open) and rewritten
/// atomically on every change.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileSessionStore {
    /// Opens the store at `path`.
    ///
    /// A missing or empty file is an empty session.
    ///
    /// # Errors
    ///
    /// Returns [`MarginaliaError::StorageError`] if the file exists but
    /// cannot be read or is not a JSON object of strings.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let raw = fs::read_to_string(&path).map_err(|e| MarginaliaError::StorageError {
                reason: format!("failed to read session file {}: {e}", path.display()),
            })?;
            if raw.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&raw).map_err(|e| MarginaliaError::StorageError {
                    reason: format!("failed to parse session file {}: {e}", path.display()),
                })?
            }
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let json = serde_json::to_string_pretty(entries).map_err(|e| MarginaliaError::StorageError {
            reason: format!("failed to serialize session: {e}"),
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| MarginaliaError::StorageError {
                reason: format!("failed to create session directory: {e}"),
            })?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        {
            let mut file = create_private(&tmp_path).map_err(|e| MarginaliaError::StorageError {
                reason: format!("failed to create temp session file: {e}"),
            })?;
            file.write_all(json.as_bytes())
                .and_then(|()| file.sync_all())
                .map_err(|e| MarginaliaError::StorageError {
                    reason: format!("failed to write temp session file: {e}"),
                })?;
        }

        fs::rename(&tmp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            MarginaliaError::StorageError {
                reason: format!("failed to rename session file: {e}"),
            }
        })?;

        tracing::debug!(path = %self.path.display(), keys = entries.len(), "session saved");
        Ok(())
    }
}

#[cfg(unix)]
fn create_private(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn create_private(path: &Path) -> std::io::Result<fs::File> {
    fs::File::create(path)
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(lock(&self.entries)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = lock(&self.entries)?;
        let previous = entries.insert(key.to_string(), value.to_string());
        if let Err(e) = self.persist(&entries) {
            match previous {
                Some(old) => entries.insert(key.to_string(), old),
                None => entries.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = lock(&self.entries)?;
        match entries.remove(key) {
            Some(old) => {
                if let Err(e) = self.persist(&entries) {
                    entries.insert(key.to_string(), old);
                    return Err(e);
                }
                Ok(())
            }
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_set_get_remove() -> Result<()> {
        let store = MemorySessionStore::new();
        assert_eq!(store.get(KEY_METHOD)?, None);
        store.set(KEY_METHOD, "nsec")?;
        assert_eq!(store.get(KEY_METHOD)?.as_deref(), Some("nsec"));
        store.remove(KEY_METHOD)?;
        store.remove(KEY_METHOD)?;
        assert_eq!(store.get(KEY_METHOD)?, None);
        Ok(())
    }

    #[test]
    fn file_store_survives_reopen() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("session.json");

        let store = FileSessionStore::open(&path)?;
        store.set(KEY_METHOD, "nip07")?;
        store.set(KEY_PUBKEY, "abcd")?;
        store.remove(KEY_PUBKEY)?;
        drop(store);

        let reopened = FileSessionStore::open(&path)?;
        assert_eq!(reopened.get(KEY_METHOD)?.as_deref(), Some("nip07"));
        assert_eq!(reopened.get(KEY_PUBKEY)?, None);
        assert!(!path.with_extension("json.tmp").exists());
        Ok(())
    }

    #[test]
    fn file_store_rejects_garbage() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("session.json");
        fs::write(&path, "[1,2,3]")?;
        assert!(matches!(
            FileSessionStore::open(&path),
            Err(MarginaliaError::StorageError { .. })
        ));
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn file_store_is_private() -> std::result::Result<(), Box<dyn std::error::Error>> {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("session.json");
        FileSessionStore::open(&path)?.set(KEY_NSEC, "nsec1xyz")?;
        assert_eq!(fs::metadata(&path)?.permissions().mode() & 0o777, 0o600);
        Ok(())
    }
}
