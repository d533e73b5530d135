//! Domain types stored in an item's sidecar.
//!
//! Serialized with serde + serde_yaml. Field names match the on-disk schema:
//!
//! ```yaml
//! process_records:
//!   - time: 2024-05-01T09:30:00.123456789Z
//!     key: synced
//!     data: optional payload
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One processing step recorded against an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// When the record was inserted.
    pub time: DateTime<Utc>,
    /// Caller-defined tag naming the step that produced the record.
    pub key: String,
    /// Optional output of the step. Omitted from the file when absent or empty.
    #[serde(default, skip_serializing_if = "no_data")]
    pub data: Option<String>,
}

impl Record {
    /// A record stamped with the current time and no payload.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            time: Utc::now(),
            key: key.into(),
            data: None,
        }
    }

    /// Attach a payload. An empty payload is the same as none.
    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into()).filter(|d| !d.is_empty());
        self
    }
}

fn no_data(data: &Option<String>) -> bool {
    data.as_deref().map_or(true, str::is_empty)
}

// ---------------------------------------------------------------------------
// SidecarData
// ---------------------------------------------------------------------------

/// Ordered processing history of one item, oldest first.
///
/// Processors receive this as a snapshot; new records are appended by the
/// driver, never by mutating the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SidecarData {
    #[serde(
        rename = "process_records",
        default,
        deserialize_with = "null_as_empty"
    )]
    pub records: Vec<Record>,
}

impl SidecarData {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Most recently appended record.
    pub fn latest(&self) -> Option<&Record> {
        self.records.last()
    }

    /// Most recently appended record carrying `key`.
    pub fn latest_with_key(&self, key: &str) -> Option<&Record> {
        self.records.iter().rev().find(|r| r.key == key)
    }

    /// Whether any step tagged `key` has been recorded.
    pub fn has_key(&self, key: &str) -> bool {
        self.latest_with_key(key).is_some()
    }
}

/// `process_records:` with no value is a YAML null; treat it like an empty list.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Record>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Record>>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
