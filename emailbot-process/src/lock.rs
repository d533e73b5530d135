//! Per-item advisory locks.
//!
//! The lock target is the item file itself, not its sidecar. Acquisition
//! never blocks: a held lock is reported as `Ok(None)` so the caller can fail
//! fast instead of waiting.
//!
//! [`FileLock`] uses `flock`-style locks through `fs2`. These are taken per
//! open file description, so two acquisitions from the same process exclude
//! each other just like two processes do. [`MemoryLock`] is an in-process
//! stand-in that touches no files.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use fs2::FileExt;

/// Capability to take an exclusive, non-blocking lock keyed by item path.
pub trait ItemLock {
    /// `Ok(Some(_))` when acquired, `Ok(None)` when already held elsewhere.
    fn try_acquire(&self, item: &Path) -> io::Result<Option<Box<dyn LockHandle>>>;
}

/// A held lock.
pub trait LockHandle {
    /// Release the lock. Calling it again after success is a no-op.
    fn release(&mut self) -> io::Result<()>;
}

// ---------------------------------------------------------------------------
// FileLock
// ---------------------------------------------------------------------------

/// Advisory lock on the item file.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLock;

impl ItemLock for FileLock {
    fn try_acquire(&self, item: &Path) -> io::Result<Option<Box<dyn LockHandle>>> {
        let file = OpenOptions::new().read(true).open(item)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Box::new(FileLockHandle { file: Some(file) }))),
            Err(err) if is_contended(&err) => Ok(None),
            Err(err) => Err(err),
        }
    }
}

fn is_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

struct FileLockHandle {
    file: Option<File>,
}

impl LockHandle for FileLockHandle {
    fn release(&mut self) -> io::Result<()> {
        match self.file.take() {
            // Explicit unlock; closing the file alone would hide errors.
            Some(file) => FileExt::unlock(&file),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryLock
// ---------------------------------------------------------------------------

/// In-process lock table. Clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct MemoryLock {
    held: Arc<Mutex<HashSet<PathBuf>>>,
}

impl MemoryLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `item` is currently locked through this table.
    pub fn is_locked(&self, item: &Path) -> bool {
        self.held
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(item)
    }
}

impl ItemLock for MemoryLock {
    fn try_acquire(&self, item: &Path) -> io::Result<Option<Box<dyn LockHandle>>> {
        let mut held = self
            .held
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !held.insert(item.to_path_buf()) {
            return Ok(None);
        }
        Ok(Some(Box::new(MemoryLockHandle {
            held: Arc::clone(&self.held),
            item: Some(item.to_path_buf()),
        })))
    }
}

struct MemoryLockHandle {
    held: Arc<Mutex<HashSet<PathBuf>>>,
    item: Option<PathBuf>,
}

impl LockHandle for MemoryLockHandle {
    fn release(&mut self) -> io::Result<()> {
        if let Some(item) = self.item.take() {
            self.held
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .remove(&item);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// LockGuard
// ---------------------------------------------------------------------------

/// Releases the wrapped lock when dropped, on every exit path.
///
/// A failed release is logged and otherwise ignored: whatever was persisted
/// while the lock was held stays persisted.
pub(crate) struct LockGuard {
    item: PathBuf,
    handle: Box<dyn LockHandle>,
}

impl LockGuard {
    pub(crate) fn new(item: &Path, handle: Box<dyn LockHandle>) -> Self {
        Self {
            item: item.to_path_buf(),
            handle,
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        match self.handle.release() {
            Ok(()) => tracing::debug!("unlocked: {}", self.item.display()),
            Err(err) => tracing::warn!(
                "error unlocking {} (ignored): {err}",
                self.item.display()
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
