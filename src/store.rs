//! Dashboard persistence store, a keyed and upserting collection of saved dashboards.
//!
//! DESIGN
//! ======
//! All dashboards live as one JSON array under a single key of a durable
//! key-value namespace ([`KvBackend`]). Every mutator reads the whole array,
//! modifies it, and writes the whole array back, so no caller ever writes a
//! stale copy it captured earlier. Upsert is by `id` and keeps array position.
//! `lastModified` is stamped on save and only drives display ordering; the
//! last writer always wins.
//!
//! ERROR HANDLING
//! ==============
//! Missing or corrupt data reads as an empty collection and is logged, never
//! returned to the caller. Mutators work on the raw JSON records, so entries
//! that fail to type-check are listed as absent but are not destroyed by a
//! later save or delete. Backend I/O failures on save/delete are returned.

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::flow::{FlowEdge, FlowNode};
use crate::layout::Layouts;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid store key: {0:?}")]
    InvalidKey(String),
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("dashboard encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Which editing surface a dashboard belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DashboardKind {
    Grid,
    Flow,
}

impl DashboardKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Grid => "grid",
            Self::Flow => "flow",
        }
    }
}

impl fmt::Display for DashboardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DashboardKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "grid" => Ok(Self::Grid),
            "flow" => Ok(Self::Flow),
            other => Err(format!("unknown dashboard kind: {other}")),
        }
    }
}

/// Saved grid dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredGrid {
    pub id: String,
    pub title: String,
    pub last_modified: i64,
    pub layouts: Layouts,
}

/// Saved flow dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFlow {
    pub id: String,
    pub title: String,
    pub last_modified: i64,
    pub nodes: Vec<FlowNode>,
    pub edges: Vec<FlowEdge>,
}

/// One record of the persisted collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoredDashboard {
    Grid(StoredGrid),
    Flow(StoredFlow),
}

impl StoredDashboard {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Grid(g) => &g.id,
            Self::Flow(f) => &f.id,
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        match self {
            Self::Grid(g) => &g.title,
            Self::Flow(f) => &f.title,
        }
    }

    #[must_use]
    pub fn last_modified(&self) -> i64 {
        match self {
            Self::Grid(g) => g.last_modified,
            Self::Flow(f) => f.last_modified,
        }
    }

    #[must_use]
    pub fn kind(&self) -> DashboardKind {
        match self {
            Self::Grid(_) => DashboardKind::Grid,
            Self::Flow(_) => DashboardKind::Flow,
        }
    }

    fn set_last_modified(&mut self, ts: i64) {
        match self {
            Self::Grid(g) => g.last_modified = ts,
            Self::Flow(f) => f.last_modified = ts,
        }
    }
}

/// Fresh random dashboard identity.
#[must_use]
pub fn new_dashboard_id() -> String {
    Uuid::new_v4().to_string()
}

/// Milliseconds since the Unix epoch; `0` if the clock is before it.
#[must_use]
pub fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

// =============================================================================
// BACKENDS
// =============================================================================

/// Durable string-keyed namespace the store writes into.
pub trait KvBackend {
    /// Read the value under `key`, `None` if it was never written.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backend cannot be read.
    fn read(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Replace the value under `key`.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backend cannot be written.
    fn write(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// In-process backend.
#[derive(Debug, Default, Clone)]
pub struct MemoryBackend {
    entries: HashMap<String, String>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvBackend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

/// One `<key>.json` file per key inside a data directory.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(StoreError::InvalidKey(key.to_owned()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KvBackend for FileBackend {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}

// =============================================================================
// STORE
// =============================================================================

/// Saved-dashboard collection over a [`KvBackend`].
pub struct DashboardStore<B: KvBackend> {
    backend: B,
    key: String,
}

impl<B: KvBackend> DashboardStore<B> {
    #[must_use]
    pub fn new(backend: B, key: impl Into<String>) -> Self {
        Self { backend, key: key.into() }
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// All well-formed dashboards in stored order. Empty on missing or corrupt data.
    #[must_use]
    pub fn list(&self) -> Vec<StoredDashboard> {
        let records = match self.records() {
            Ok(records) => records,
            Err(e) => {
                error!(error = %e, key = %self.key, "failed to read stored dashboards");
                return Vec::new();
            }
        };
        records
            .into_iter()
            .filter_map(|record| match serde_json::from_value::<StoredDashboard>(record) {
                Ok(dashboard) => Some(dashboard),
                Err(e) => {
                    warn!(error = %e, key = %self.key, "skipping malformed stored dashboard");
                    None
                }
            })
            .collect()
    }

    /// Dashboards of one kind, as the load dialog shows them.
    #[must_use]
    pub fn list_kind(&self, kind: DashboardKind) -> Vec<StoredDashboard> {
        self.list().into_iter().filter(|d| d.kind() == kind).collect()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<StoredDashboard> {
        self.list().into_iter().find(|d| d.id() == id)
    }

    /// Upsert by id, stamping `lastModified`. Returns the record as stored.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backend cannot be read or written.
    pub fn save(&mut self, mut dashboard: StoredDashboard) -> Result<StoredDashboard, StoreError> {
        let mut records = self.records()?;
        let existing = records.iter().position(|r| record_id(r) == Some(dashboard.id()));

        let previous = existing
            .and_then(|idx| records[idx].get("lastModified"))
            .and_then(Value::as_i64);
        let stamp = match previous {
            Some(prev) => now_ms().max(prev.saturating_add(1)),
            None => now_ms(),
        };
        dashboard.set_last_modified(stamp);

        let value = serde_json::to_value(&dashboard)?;
        match existing {
            Some(idx) => records[idx] = value,
            None => records.push(value),
        }
        self.write_records(&records)?;

        info!(id = %dashboard.id(), kind = %dashboard.kind(), replaced = existing.is_some(), "dashboard saved");
        Ok(dashboard)
    }

    /// Remove by id. Returns whether anything was removed; absent ids are a no-op.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backend cannot be read or written.
    pub fn delete(&mut self, id: &str) -> Result<bool, StoreError> {
        let mut records = self.records()?;
        let before = records.len();
        records.retain(|r| record_id(r) != Some(id));
        if records.len() == before {
            return Ok(false);
        }
        self.write_records(&records)?;
        info!(id, "dashboard deleted");
        Ok(true)
    }

    /// Raw records. Corrupt JSON is logged and reads as empty.
    fn records(&self) -> Result<Vec<Value>, StoreError> {
        let Some(raw) = self.backend.read(&self.key)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str::<Vec<Value>>(&raw) {
            Ok(records) => Ok(records),
            Err(e) => {
                error!(error = %e, key = %self.key, "stored dashboards are corrupt; treating as empty");
                Ok(Vec::new())
            }
        }
    }

    fn write_records(&mut self, records: &[Value]) -> Result<(), StoreError> {
        let raw = serde_json::to_string(records)?;
        self.backend.write(&self.key, &raw)
    }
}

fn record_id(record: &Value) -> Option<&str> {
    record.get("id").and_then(Value::as_str)
}
