//! Batch runs over newly synced items or every item on disk.
//!
//! Both entry points process sequentially and stop at the first failing item;
//! items before it stay durably processed, items after it are not attempted.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher};

use crate::driver::{Driver, ItemOutcome, Processor};
use crate::error::ProcessError;
use crate::lock::ItemLock;

/// File-name glob selecting items inside the messages directory.
///
/// Sidecars (`*.eml.emailbot.yaml`) and their tmp files never match.
pub const ITEM_PATTERN: &str = "*.eml";

fn item_matcher() -> Result<GlobMatcher, ProcessError> {
    Ok(Glob::new(ITEM_PATTERN)?.compile_matcher())
}

/// List the items directly inside `dir` (non-recursive), sorted by path.
///
/// A missing directory holds no items.
pub fn discover(dir: &Path) -> Result<Vec<PathBuf>, ProcessError> {
    let matcher = item_matcher()?;
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(vec![]),
        Err(e) => {
            return Err(ProcessError::Discover {
                path: dir.to_path_buf(),
                source: e,
            })
        }
    };

    let mut items = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ProcessError::Discover {
            path: dir.to_path_buf(),
            source: e,
        })?;
        // Follows symlinks; dangling links are skipped.
        if !std::fs::metadata(entry.path()).map(|m| m.is_file()).unwrap_or(false) {
            continue;
        }
        if matcher.is_match(entry.file_name()) {
            items.push(entry.path());
        }
    }
    items.sort();
    Ok(items)
}

impl<L: ItemLock> Driver<L> {
    /// Process `items` in the order given.
    pub fn process_new(
        &self,
        items: &[PathBuf],
        processor: &mut dyn Processor,
    ) -> Result<Vec<ItemOutcome>, ProcessError> {
        let mut outcomes = Vec::with_capacity(items.len());
        for item in items {
            outcomes.push(self.process_one(item, processor)?);
        }
        Ok(outcomes)
    }

    /// Process every item found in `dir` by [`discover`].
    pub fn process_all(
        &self,
        dir: &Path,
        processor: &mut dyn Processor,
    ) -> Result<Vec<ItemOutcome>, ProcessError> {
        let items = discover(dir)?;
        tracing::debug!("found {} item(s) in {}", items.len(), dir.display());
        self.process_new(&items, processor)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
