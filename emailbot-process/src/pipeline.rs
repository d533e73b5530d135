//! Sync-then-process entrypoint shared by the CLI and embedding programs.

use emailbot_core::Config;

use crate::credentials::CredentialChain;
use crate::driver::{Driver, ItemOutcome, Processor};
use crate::error::ProcessError;
use crate::lock::ItemLock;
use crate::source::{MailSource, SyncRequest};

/// What one [`process`] run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessSummary {
    /// Messages the source saved during this run.
    pub synced_new: usize,
    /// Messages the source found already present.
    pub synced_existing: usize,
    /// Outcomes of the new-item phase (empty when it was skipped).
    pub new: Vec<ItemOutcome>,
    /// Outcomes of the all-items phase (empty when it was skipped).
    pub all: Vec<ItemOutcome>,
}

/// Sync the configured mailbox, then run the processing phases.
///
/// 1. Validate `config` — a usage error surfaces before any I/O.
/// 2. Resolve the password if `source` needs one.
/// 3. Sync once; a failure aborts the whole run.
/// 4. `new_fn` (if given) over the newly saved messages, in source order.
/// 5. `all_fn` (if given) over every message in the messages directory,
///    whether or not step 4 ran.
pub fn process<L: ItemLock>(
    config: &Config,
    source: &dyn MailSource,
    credentials: &CredentialChain,
    driver: &Driver<L>,
    new_fn: Option<&mut dyn Processor>,
    all_fn: Option<&mut dyn Processor>,
) -> Result<ProcessSummary, ProcessError> {
    config.validate()?;
    let server = config.server.clone().unwrap_or_default();
    let username = config.username.clone().unwrap_or_default();

    let password = if source.needs_password() {
        Some(credentials.resolve(&username, &server)?)
    } else {
        None
    };

    let request = SyncRequest {
        server,
        username,
        password,
        mailbox: config.mailbox_or_default().to_string(),
        local_dir: config.messages_dir.clone(),
    };
    let synced = source.sync(&request)?;
    tracing::info!(
        "synced {} new, {} existing message(s) from {}",
        synced.new_emails.len(),
        synced.existing_emails.len(),
        request.mailbox
    );

    let mut summary = ProcessSummary {
        synced_new: synced.new_emails.len(),
        synced_existing: synced.existing_emails.len(),
        ..ProcessSummary::default()
    };

    if let Some(processor) = new_fn {
        summary.new = driver.process_new(&synced.new_emails, processor)?;
    }
    if let Some(processor) = all_fn {
        summary.all = driver.process_all(&config.messages_dir, processor)?;
    }
    Ok(summary)
}
