//! # emailbot-process
//!
//! Lock-guarded, sidecar-backed processing of downloaded email files.
//!
//! [`Driver::process_one`] applies a [`Processor`] to one item exactly under
//! its advisory lock; [`Driver::process_new`] and [`Driver::process_all`] run
//! batches; [`pipeline::process`] syncs from a [`MailSource`] first and then
//! runs both phases.

pub mod batch;
pub mod credentials;
pub mod driver;
pub mod error;
pub mod lock;
pub mod pipeline;
pub mod source;

pub use batch::{discover, ITEM_PATTERN};
pub use credentials::{
    CredentialChain, CredentialProvider, EnvPassword, PromptPassword, StaticPassword,
};
pub use driver::{BoxError, Driver, ItemOutcome, Processor};
pub use error::{CredentialError, ProcessError, SourceError, Step};
pub use lock::{FileLock, ItemLock, LockHandle, MemoryLock};
pub use pipeline::{process, ProcessSummary};
pub use source::{MailSource, SpoolSource, SyncOutcome, SyncRequest};
