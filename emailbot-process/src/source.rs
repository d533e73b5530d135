//! Mail sources — the collaborator that downloads messages before processing.
//!
//! A source saves each message of a mailbox as a `.eml` file in the local
//! messages directory and reports which files it added this time and which
//! were already there. Nothing else about the transport is visible to the
//! processing side.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::batch::discover;
use crate::error::{source_io_err, ProcessError, SourceError};

/// Everything a source needs to sync one mailbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    /// Server address, e.g. `mail.example.com:993`.
    pub server: String,
    pub username: String,
    /// `None` when the source reported it needs no password.
    pub password: Option<String>,
    pub mailbox: String,
    /// Local directory messages are saved in.
    pub local_dir: PathBuf,
}

/// Local files produced by a sync, in the order the source reports them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Saved during this sync.
    pub new_emails: Vec<PathBuf>,
    /// Already present locally before this sync.
    pub existing_emails: Vec<PathBuf>,
}

/// Downloads a mailbox into a local directory.
pub trait MailSource {
    fn sync(&self, request: &SyncRequest) -> Result<SyncOutcome, SourceError>;

    /// Whether [`SyncRequest::password`] must be resolved before `sync`.
    fn needs_password(&self) -> bool {
        true
    }
}

// ---------------------------------------------------------------------------
// SpoolSource
// ---------------------------------------------------------------------------

/// Source backed by a local spool directory.
///
/// The request's `server` names the spool root and `mailbox` a directory
/// below it (`INBOX/subfolder` nests). Each `*.eml` file in the mailbox
/// directory is copied into `local_dir` unless a file with the same name is
/// already there. Copies go through a `.tmp` sibling and a rename, so a
/// partially copied message is never visible under its `.eml` name.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpoolSource;

impl SpoolSource {
    fn mailbox_dir(request: &SyncRequest) -> PathBuf {
        let mut dir = PathBuf::from(&request.server);
        for part in request.mailbox.split('/').filter(|p| !p.is_empty()) {
            dir.push(part);
        }
        dir
    }
}

impl MailSource for SpoolSource {
    fn sync(&self, request: &SyncRequest) -> Result<SyncOutcome, SourceError> {
        let mailbox = Self::mailbox_dir(request);
        if !mailbox.is_dir() {
            return Err(SourceError::MailboxNotFound(mailbox));
        }
        let messages = discover(&mailbox).map_err(|e| match e {
            ProcessError::Discover { path, source } => source_io_err(path, source),
            other => SourceError::Remote(other.to_string()),
        })?;

        std::fs::create_dir_all(&request.local_dir)
            .map_err(|e| source_io_err(&request.local_dir, e))?;

        let mut outcome = SyncOutcome::default();
        for message in messages {
            let Some(name) = message.file_name() else {
                continue;
            };
            let target = request.local_dir.join(name);
            match std::fs::metadata(&target) {
                Ok(_) => {
                    tracing::debug!("already present: {}", target.display());
                    outcome.existing_emails.push(target);
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    copy_atomic(&message, &target)?;
                    tracing::info!("downloaded: {}", target.display());
                    outcome.new_emails.push(target);
                }
                Err(e) => return Err(source_io_err(target, e)),
            }
        }
        Ok(outcome)
    }

    fn needs_password(&self) -> bool {
        false
    }
}

fn copy_atomic(from: &Path, to: &Path) -> Result<(), SourceError> {
    let mut tmp = to.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    std::fs::copy(from, &tmp).map_err(|e| source_io_err(from, e))?;
    if let Err(e) = std::fs::rename(&tmp, to) {
        let _ = std::fs::remove_file(&tmp);
        return Err(source_io_err(to, e));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn request(spool: &Path, mailbox: &str, local: &Path) -> SyncRequest {
        SyncRequest {
            server: spool.to_string_lossy().into_owned(),
            username: "bot".to_string(),
            password: None,
            mailbox: mailbox.to_string(),
            local_dir: local.to_path_buf(),
        }
    }

    #[test]
    fn first_sync_reports_everything_new() {
        let spool = TempDir::new().unwrap();
        let local = TempDir::new().unwrap();
        let inbox = spool.path().join("INBOX");
        std::fs::create_dir_all(&inbox).unwrap();
        std::fs::write(inbox.join("2.eml"), "two").unwrap();
        std::fs::write(inbox.join("1.eml"), "one").unwrap();
        std::fs::write(inbox.join("readme.txt"), "skip").unwrap();

        let messages = local.path().join("messages");
        let outcome = SpoolSource
            .sync(&request(spool.path(), "INBOX", &messages))
            .unwrap();

        assert_eq!(
            outcome.new_emails,
            vec![messages.join("1.eml"), messages.join("2.eml")]
        );
        assert!(outcome.existing_emails.is_empty());
        assert_eq!(std::fs::read_to_string(messages.join("1.eml")).unwrap(), "one");
        assert!(!messages.join("readme.txt").exists());
    }

    #[test]
    fn second_sync_reports_only_additions_as_new() {
        let spool = TempDir::new().unwrap();
        let local = TempDir::new().unwrap();
        let inbox = spool.path().join("INBOX").join("bots");
        std::fs::create_dir_all(&inbox).unwrap();
        std::fs::write(inbox.join("1.eml"), "one").unwrap();

        let req = request(spool.path(), "INBOX/bots", local.path());
        SpoolSource.sync(&req).unwrap();
        std::fs::write(inbox.join("3.eml"), "three").unwrap();
        let outcome = SpoolSource.sync(&req).unwrap();

        assert_eq!(outcome.new_emails, vec![local.path().join("3.eml")]);
        assert_eq!(outcome.existing_emails, vec![local.path().join("1.eml")]);
    }

    #[test]
    fn missing_mailbox_is_an_error() {
        let spool = TempDir::new().unwrap();
        let local = TempDir::new().unwrap();
        let err = SpoolSource
            .sync(&request(spool.path(), "Archive", local.path()))
            .unwrap_err();
        assert!(matches!(err, SourceError::MailboxNotFound(_)));
    }

    #[test]
    fn spool_needs_no_password() {
        assert!(!SpoolSource.needs_password());
    }
}
