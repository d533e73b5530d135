//! Error types for emailbot-process.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use emailbot_core::{ConfigError, SidecarError};

use crate::driver::BoxError;

/// The per-item step an error occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Lock,
    Load,
    Process,
    Save,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Lock => write!(f, "lock"),
            Step::Load => write!(f, "load"),
            Step::Process => write!(f, "process"),
            Step::Save => write!(f, "save"),
        }
    }
}

/// All errors that can arise from processing items.
///
/// Item-level variants carry the item path; none of them are retried.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Missing or malformed configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// No password could be obtained for the mail source.
    #[error("credential error: {0}")]
    Credentials(#[from] CredentialError),

    /// The mail source failed; nothing was processed.
    #[error("sync error: {0}")]
    Sync(#[from] SourceError),

    /// Another process (or another handle in this one) holds the item lock.
    #[error("{} is already locked - are multiple processes running?", .item.display())]
    Concurrency { item: PathBuf },

    /// The lock could not be attempted at all (missing file, permissions, ...).
    #[error("{} could not be locked: {source}", .item.display())]
    Lock {
        item: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Sidecar load or save failed.
    #[error("{step} step failed for {}: {source}", .item.display())]
    Sidecar {
        item: PathBuf,
        step: Step,
        #[source]
        source: SidecarError,
    },

    /// The processor reported failure; the sidecar was left untouched.
    #[error("error processing {}: {source}", .item.display())]
    Processing {
        item: PathBuf,
        #[source]
        source: BoxError,
    },

    /// The messages directory could not be scanned.
    #[error("failed to list items in {}: {source}", .path.display())]
    Discover {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The item discovery glob did not compile.
    #[error("invalid item pattern: {0}")]
    Pattern(#[from] globset::Error),
}

impl ProcessError {
    /// Item the error refers to, for item-level failures.
    pub fn item(&self) -> Option<&PathBuf> {
        match self {
            ProcessError::Concurrency { item }
            | ProcessError::Lock { item, .. }
            | ProcessError::Sidecar { item, .. }
            | ProcessError::Processing { item, .. } => Some(item),
            _ => None,
        }
    }

    /// Step the error occurred in, for item-level failures.
    pub fn step(&self) -> Option<Step> {
        match self {
            ProcessError::Concurrency { .. } | ProcessError::Lock { .. } => Some(Step::Lock),
            ProcessError::Sidecar { step, .. } => Some(*step),
            ProcessError::Processing { .. } => Some(Step::Process),
            _ => None,
        }
    }
}

/// Errors from a [`MailSource`](crate::source::MailSource).
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The requested mailbox does not exist at the source.
    #[error("mailbox not found: {0}")]
    MailboxNotFound(PathBuf),

    /// Transport or authentication failure in a remote source.
    #[error("{0}")]
    Remote(String),
}

/// Errors from resolving a password.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("failed to read password from terminal: {0}")]
    Prompt(#[source] std::io::Error),

    #[error("no password available for {username} on {server}")]
    Unavailable { username: String, server: String },
}

pub(crate) fn source_io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SourceError {
    SourceError::Io {
        path: path.into(),
        source,
    }
}
