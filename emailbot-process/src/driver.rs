//! Single-item processing under lock.
//!
//! ## `process_one` — per-item protocol
//!
//! 1. Try to lock the item (non-blocking) → `Concurrency` error if held.
//! 2. Load the sidecar (empty if absent).
//! 3. Apply the processor to the item path and a snapshot of its history.
//! 4. If it returned a record: append it and save the sidecar.
//!    If not: leave the sidecar untouched.
//! 5. Release the lock, whatever happened in 2–4.

use std::path::{Path, PathBuf};

use emailbot_core::{sidecar, Record, SidecarData};

use crate::error::{ProcessError, Step};
use crate::lock::{FileLock, ItemLock, LockGuard};

/// Error type processors may fail with.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Business logic applied to one item.
///
/// Receives the item path and its history so far; returns the record to
/// append, or `None` when nothing worth recording happened. Processors know
/// nothing about locking or persistence.
pub trait Processor {
    fn apply(&mut self, item: &Path, history: &SidecarData) -> Result<Option<Record>, BoxError>;
}

impl<F> Processor for F
where
    F: FnMut(&Path, &SidecarData) -> Result<Option<Record>, BoxError>,
{
    fn apply(&mut self, item: &Path, history: &SidecarData) -> Result<Option<Record>, BoxError> {
        self(item, history)
    }
}

// ---------------------------------------------------------------------------
// Item outcome
// ---------------------------------------------------------------------------

/// Outcome of processing a single item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// A record was appended and the sidecar saved.
    Recorded { item: PathBuf, key: String },
    /// The processor returned no record; the sidecar was not touched.
    Unchanged { item: PathBuf },
}

impl ItemOutcome {
    pub fn item(&self) -> &Path {
        match self {
            ItemOutcome::Recorded { item, .. } | ItemOutcome::Unchanged { item } => item,
        }
    }

    pub fn is_recorded(&self) -> bool {
        matches!(self, ItemOutcome::Recorded { .. })
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Runs processors over items, one at a time, under an [`ItemLock`].
#[derive(Debug, Clone)]
pub struct Driver<L = FileLock> {
    lock: L,
}

impl Default for Driver<FileLock> {
    fn default() -> Self {
        Self { lock: FileLock }
    }
}

impl<L: ItemLock> Driver<L> {
    pub fn new(lock: L) -> Self {
        Self { lock }
    }

    pub fn lock(&self) -> &L {
        &self.lock
    }

    /// Apply `processor` to `item` exactly once under the item's lock.
    pub fn process_one(
        &self,
        item: &Path,
        processor: &mut dyn Processor,
    ) -> Result<ItemOutcome, ProcessError> {
        // Step 1: lock. The guard releases on every return below.
        let handle = self
            .lock
            .try_acquire(item)
            .map_err(|e| ProcessError::Lock {
                item: item.to_path_buf(),
                source: e,
            })?
            .ok_or_else(|| ProcessError::Concurrency {
                item: item.to_path_buf(),
            })?;
        let _guard = LockGuard::new(item, handle);
        tracing::debug!("locked: {}", item.display());

        // Step 2: load history.
        let mut data = sidecar::load(item).map_err(|e| ProcessError::Sidecar {
            item: item.to_path_buf(),
            step: Step::Load,
            source: e,
        })?;

        // Step 3: apply.
        let record = processor
            .apply(item, &data)
            .map_err(|e| ProcessError::Processing {
                item: item.to_path_buf(),
                source: e,
            })?;

        // Step 4: append + save, or leave the sidecar alone.
        let Some(record) = record else {
            tracing::debug!("unchanged: {}", item.display());
            return Ok(ItemOutcome::Unchanged {
                item: item.to_path_buf(),
            });
        };
        let key = record.key.clone();
        data.records.push(record);
        sidecar::save(item, &data).map_err(|e| ProcessError::Sidecar {
            item: item.to_path_buf(),
            step: Step::Save,
            source: e,
        })?;

        tracing::info!("recorded '{key}': {}", item.display());
        Ok(ItemOutcome::Recorded {
            item: item.to_path_buf(),
            key,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock::{LockHandle, MemoryLock};
    use emailbot_core::sidecar::sidecar_path;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;
    use tracing::field::{Field, Visit};
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    fn item(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, "Subject: test\r\n\r\n").unwrap();
        path
    }

    fn record_synced(_: &Path, _: &SidecarData) -> Result<Option<Record>, BoxError> {
        Ok(Some(Record::new("synced")))
    }

    #[test]
    fn first_time_processing_writes_one_record() {
        let tmp = TempDir::new().unwrap();
        let path = item(&tmp, "msg1.eml");

        let outcome = Driver::default()
            .process_one(&path, &mut record_synced)
            .unwrap();

        assert_eq!(
            outcome,
            ItemOutcome::Recorded {
                item: path.clone(),
                key: "synced".to_string()
            }
        );
        let data = sidecar::load(&path).unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data.records[0].key, "synced");
        assert!(tmp.path().join("msg1.eml.emailbot.yaml").exists());
    }

    #[test]
    fn rerun_appends_after_existing_record() {
        let tmp = TempDir::new().unwrap();
        let path = item(&tmp, "msg.eml");
        let driver = Driver::default();

        driver.process_one(&path, &mut record_synced).unwrap();
        let first = sidecar::load(&path).unwrap().records[0].clone();
        driver
            .process_one(&path, &mut |_: &Path, _: &SidecarData| -> Result<Option<Record>, BoxError> {
                Ok(Some(Record::new("again")))
            })
            .unwrap();

        let data = sidecar::load(&path).unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data.records[0], first);
        assert_eq!(data.records[1].key, "again");
    }

    #[test]
    fn processor_sees_snapshot_of_history() {
        let tmp = TempDir::new().unwrap();
        let path = item(&tmp, "msg.eml");
        let driver = Driver::default();
        driver.process_one(&path, &mut record_synced).unwrap();

        let mut seen = Vec::new();
        driver
            .process_one(&path, &mut |p: &Path, h: &SidecarData| -> Result<Option<Record>, BoxError> {
                seen.push((p.to_path_buf(), h.clone()));
                Ok(None)
            })
            .unwrap();

        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, path);
        assert!(seen[0].1.has_key("synced"));
    }

    #[test]
    fn no_record_leaves_missing_sidecar_missing() {
        let tmp = TempDir::new().unwrap();
        let path = item(&tmp, "msg.eml");

        let outcome = Driver::default()
            .process_one(&path, &mut |_: &Path, _: &SidecarData| -> Result<Option<Record>, BoxError> {
                Ok(None)
            })
            .unwrap();

        assert_eq!(outcome, ItemOutcome::Unchanged { item: path.clone() });
        assert!(!sidecar_path(&path).exists());
    }

    #[test]
    fn no_record_leaves_existing_sidecar_byte_identical() {
        let tmp = TempDir::new().unwrap();
        let path = item(&tmp, "msg.eml");
        let original = "process_records:\n- time: 2020-01-02T03:04:05.678+01:00\n  key: hand-written\n";
        std::fs::write(sidecar_path(&path), original).unwrap();

        Driver::default()
            .process_one(&path, &mut |_: &Path, _: &SidecarData| -> Result<Option<Record>, BoxError> {
                Ok(None)
            })
            .unwrap();

        assert_eq!(std::fs::read_to_string(sidecar_path(&path)).unwrap(), original);
    }

    #[test]
    fn processor_error_leaves_sidecar_untouched_and_unlocks() {
        let tmp = TempDir::new().unwrap();
        let path = item(&tmp, "msg.eml");
        let lock = MemoryLock::new();
        let driver = Driver::new(lock.clone());

        let err = driver
            .process_one(&path, &mut |_: &Path, _: &SidecarData| -> Result<Option<Record>, BoxError> {
                Err("smtp relay refused".into())
            })
            .unwrap_err();

        assert!(matches!(err, ProcessError::Processing { .. }));
        assert_eq!(err.step(), Some(Step::Process));
        assert_eq!(err.item(), Some(&path));
        assert!(err.to_string().contains("msg.eml"));
        assert!(!sidecar_path(&path).exists());
        assert!(!lock.is_locked(&path), "lock must be released on failure");
    }

    #[test]
    fn held_lock_is_a_concurrency_error() {
        let tmp = TempDir::new().unwrap();
        let path = item(&tmp, "msg.eml");
        let lock = MemoryLock::new();
        let _held = lock.try_acquire(&path).unwrap().unwrap();

        let mut called = false;
        let err = Driver::new(lock.clone())
            .process_one(&path, &mut |_: &Path, _: &SidecarData| -> Result<Option<Record>, BoxError> {
                called = true;
                Ok(Some(Record::new("synced")))
            })
            .unwrap_err();

        assert!(matches!(err, ProcessError::Concurrency { .. }));
        assert!(err.to_string().contains("already locked"));
        assert!(!called, "processor must not run without the lock");
        assert!(!sidecar_path(&path).exists());
    }

    #[test]
    fn corrupt_sidecar_is_not_treated_as_empty() {
        let tmp = TempDir::new().unwrap();
        let path = item(&tmp, "msg.eml");
        std::fs::write(sidecar_path(&path), "process_records: {{{{\n").unwrap();
        let lock = MemoryLock::new();

        let mut called = false;
        let err = Driver::new(lock.clone())
            .process_one(&path, &mut |_: &Path, _: &SidecarData| -> Result<Option<Record>, BoxError> {
                called = true;
                Ok(Some(Record::new("synced")))
            })
            .unwrap_err();

        assert_eq!(err.step(), Some(Step::Load));
        assert!(!called);
        assert_eq!(
            std::fs::read_to_string(sidecar_path(&path)).unwrap(),
            "process_records: {{{{\n"
        );
        assert!(!lock.is_locked(&path));
    }

    // Lock whose release always fails, plus a layer collecting WARN messages.

    struct StuckLock;
    struct StuckHandle;

    impl ItemLock for StuckLock {
        fn try_acquire(&self, _: &Path) -> std::io::Result<Option<Box<dyn LockHandle>>> {
            Ok(Some(Box::new(StuckHandle)))
        }
    }

    impl LockHandle for StuckHandle {
        fn release(&mut self) -> std::io::Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "unlock refused"))
        }
    }

    #[derive(Clone, Default)]
    struct Warnings(Arc<Mutex<Vec<String>>>);

    struct MessageVisitor(String);

    impl Visit for MessageVisitor {
        fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
            if field.name() == "message" {
                self.0 = format!("{value:?}");
            }
        }
    }

    impl<S: Subscriber> Layer<S> for Warnings {
        fn on_event(&self, event: &Event<'_>, _: Context<'_, S>) {
            if *event.metadata().level() == Level::WARN {
                let mut visitor = MessageVisitor(String::new());
                event.record(&mut visitor);
                self.0.lock().unwrap().push(visitor.0);
            }
        }
    }

    #[test]
    fn failed_release_is_logged_and_keeps_the_record() {
        let tmp = TempDir::new().unwrap();
        let path = item(&tmp, "msg.eml");
        let warnings = Warnings::default();
        let subscriber = tracing_subscriber::registry().with(warnings.clone());

        let outcome = tracing::subscriber::with_default(subscriber, || {
            Driver::new(StuckLock).process_one(&path, &mut record_synced)
        })
        .unwrap();

        assert_eq!(
            outcome,
            ItemOutcome::Recorded {
                item: path.clone(),
                key: "synced".to_string()
            }
        );
        assert!(sidecar::load(&path).unwrap().has_key("synced"));

        let warnings = warnings.0.lock().unwrap();
        assert_eq!(warnings.len(), 1, "{warnings:?}");
        assert!(warnings[0].contains("error unlocking"));
        assert!(warnings[0].contains("msg.eml"));
        assert!(warnings[0].contains("unlock refused"));
    }

    #[test]
    fn missing_item_is_a_lock_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("vanished.eml");
        let err = Driver::default()
            .process_one(&path, &mut record_synced)
            .unwrap_err();
        assert!(matches!(err, ProcessError::Lock { .. }));
        assert!(!sidecar_path(&path).exists());
    }
}
