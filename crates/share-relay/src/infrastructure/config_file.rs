//! Optional TOML configuration file.
//!
//! Every key is optional.  Anything left out falls back to the CLI/env
//! value or the built-in default, in that order (see `main.rs`).
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0"
//! port = 10000
//! ping_interval_secs = 30
//! log_level = "info"
//!
//! [allow_list]
//! location = "https://example.com/UUID.txt"
//! ttl_secs = 30
//! timeout_secs = 5
//!
//! [sessions]
//! idle_timeout_secs = 300
//! sweep_interval_secs = 300
//! join_policy = "require-reservation"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use share_core::JoinPolicy;
use thiserror::Error;

/// Error type for configuration file loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

// ── Schema ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub server: ServerSection,
    pub allow_list: AllowListSection,
    pub sessions: SessionsSection,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    /// Interface the single listener binds to.
    pub bind: Option<String>,
    /// Port shared by WebSocket upgrades and the HTTP API.
    pub port: Option<u16>,
    pub ping_interval_secs: Option<u64>,
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AllowListSection {
    /// URL or file path.
    pub location: Option<String>,
    pub ttl_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SessionsSection {
    pub idle_timeout_secs: Option<u64>,
    pub sweep_interval_secs: Option<u64>,
    pub join_policy: Option<JoinPolicy>,
}

/// Reads and parses the config file at `path`.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read (including when it
/// does not exist, since an explicitly named file is expected to be there),
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
