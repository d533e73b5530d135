//! Error types for emailbot-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from sidecar load/save.
#[derive(Debug, Error)]
pub enum SidecarError {
    /// I/O failure on the sidecar or its tmp file.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The sidecar exists but is not a valid record document.
    #[error("failed to parse sidecar at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// YAML serialization error (save path).
    #[error("YAML serialization error: {0}")]
    Serialize(#[from] serde_yaml::Error),
}

/// Errors from loading or validating the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A required setting was given neither on the command line nor in the file.
    #[error("required parameter not found: {0}")]
    Missing(&'static str),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SidecarError {
    SidecarError::Io {
        path: path.into(),
        source,
    }
}
