//! Config file support.
//!
//! The CLI is configured by an optional JSON file with CLI flags merged
//! on top (flags win).
//!
//! Example `marginalia.json`:
//! ```json
//! {
//!   "data_dir": "/home/reader/.marginalia",
//!   "relays": ["wss://nos.lol"],
//!   "read_timeout_secs": 5,
//!   "context_sentences_before": 1
//! }
//! ```
//!
//! Every [`AppConfig`] field is optional in the file.

use std::path::{Path, PathBuf};

use marginalia_types::config::AppConfig;
use serde::{Deserialize, Serialize};

/// File name of the persisted session inside the data directory.
pub const SESSION_FILE: &str = "session.json";

/// JSON config file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigFile {
    pub data_dir: Option<String>,
    #[serde(flatten)]
    pub app: AppConfig,
}

/// Fully resolved CLI configuration.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub app: AppConfig,
    pub data_dir: PathBuf,
}

impl CliConfig {
    /// Loads `config_path` (if any), applies the CLI overrides and
    /// validates the result.
    pub fn resolve(
        config_path: Option<&Path>,
        data_dir: Option<PathBuf>,
        relays: &[String],
    ) -> Result<Self, String> {
        let base = match config_path {
            Some(path) => Self::load(path)?,
            None => Self {
                app: AppConfig::default(),
                data_dir: default_data_dir(),
            },
        };
        let merged = base.merge_cli(data_dir, relays);
        merged.app.validate().map_err(|e| e.to_string())?;
        Ok(merged)
    }

    /// Load config from a JSON file.
    pub fn load(path: &Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read config file: {e}"))?;

        let file: ConfigFile = serde_json::from_str(&text)
            .map_err(|e| format!("invalid config JSON: {e}"))?;

        Ok(Self {
            data_dir: file
                .data_dir
                .map(PathBuf::from)
                .unwrap_or_else(default_data_dir),
            app: file.app,
        })
    }

    /// Merge CLI overrides onto a config-file base.
    pub fn merge_cli(mut self, data_dir: Option<PathBuf>, relays: &[String]) -> Self {
        if let Some(dir) = data_dir {
            self.data_dir = dir;
        }
        if !relays.is_empty() {
            self.app.relays = relays.to_vec();
        }
        self
    }

    /// Path of the session file.
    pub fn session_path(&self) -> PathBuf {
        self.data_dir.join(SESSION_FILE)
    }
}

fn default_data_dir() -> PathBuf {
    if let Some(data) = dirs::data_dir() {
        return data.join("marginalia");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".marginalia");
    }
    PathBuf::from("marginalia-data")
}
