//! YAML configuration.
//!
//! # Storage layout
//!
//! ```text
//! ~/.emailbot/
//!   config.yaml     (optional — server, username, mailbox, messages_dir)
//! ```
//!
//! Command-line flags take precedence over file values; see [`Config::merge`].
//! As with the sidecar store, `load_at` takes an explicit path for tests and
//! `load` derives it from `dirs::home_dir()`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default local directory downloaded messages are saved in.
pub const DEFAULT_MESSAGES_DIR: &str = "messages";

/// Default mailbox to read messages from.
pub const DEFAULT_MAILBOX: &str = "INBOX";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Mail server and port, e.g. `mail.example.com:993`.
    pub server: Option<String>,
    pub username: Option<String>,
    /// Mailbox to read from (typically `INBOX` or `INBOX/subfolder`).
    pub mailbox: Option<String>,
    /// Local directory messages are saved in.
    pub messages_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: None,
            username: None,
            mailbox: None,
            messages_dir: PathBuf::from(DEFAULT_MESSAGES_DIR),
        }
    }
}

/// Settings given on the command line; `None` means the flag was not passed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub server: Option<String>,
    pub username: Option<String>,
    pub mailbox: Option<String>,
    pub messages_dir: Option<PathBuf>,
}

impl Config {
    /// Overlay every setting present in `overrides` on top of `self`.
    pub fn merge(mut self, overrides: ConfigOverrides) -> Self {
        if overrides.server.is_some() {
            self.server = overrides.server;
        }
        if overrides.username.is_some() {
            self.username = overrides.username;
        }
        if overrides.mailbox.is_some() {
            self.mailbox = overrides.mailbox;
        }
        if let Some(dir) = overrides.messages_dir {
            self.messages_dir = dir;
        }
        self
    }

    /// Fail with [`ConfigError::Missing`] if a required setting is absent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.as_deref().map_or(true, str::is_empty) {
            return Err(ConfigError::Missing("server"));
        }
        if self.username.as_deref().map_or(true, str::is_empty) {
            return Err(ConfigError::Missing("username"));
        }
        Ok(())
    }

    /// Configured mailbox, or [`DEFAULT_MAILBOX`].
    pub fn mailbox_or_default(&self) -> &str {
        self.mailbox.as_deref().unwrap_or(DEFAULT_MAILBOX)
    }
}

/// `<home>/.emailbot/config.yaml` — pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    home.join(".emailbot").join("config.yaml")
}

/// Load the config file at `path`, or defaults if it does not exist.
pub fn load_at(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Load `<home>/.emailbot/config.yaml`. Without a home directory there is no
/// config file to read, so the defaults apply.
pub fn load_in(home: Option<&Path>) -> Result<Config, ConfigError> {
    match home {
        Some(home) => load_at(&config_path_at(home)),
        None => Ok(Config::default()),
    }
}

/// `load_in` convenience wrapper for `~/.emailbot/config.yaml`.
pub fn load() -> Result<Config, ConfigError> {
    load_in(dirs::home_dir().as_deref())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
