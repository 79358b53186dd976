//! Serialization codec: portable JSON envelopes for export and import.
//!
//! DESIGN
//! ======
//! Export writes a pretty-printed `{title, layouts}` (grid) or
//! `{title, nodes, edges}` (flow) envelope and derives a download name from
//! the title. Import accepts raw text or an already-parsed value, recovers
//! the payload, and scans entity ids of the form `block-<n>` / `node-<n>` so
//! the editor's creation counter resumes past every id already in use.
//! Imported dashboards always get a fresh identity; an id embedded in the
//! file is ignored, so importing the same file twice yields two dashboards.
//!
//! ERROR HANDLING
//! ==============
//! `decode_*` functions return a typed [`CodecError`]. The `parse_*` and
//! `read_import` boundary logs that error and returns `None`; malformed
//! input never propagates further.

#[cfg(test)]
#[path = "codec_test.rs"]
mod codec_test;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info};

use crate::consts::{BLOCK_ID_PREFIX, FLOW_EXPORT_FALLBACK, GRID_EXPORT_FALLBACK, NODE_ID_PREFIX};
use crate::flow::{FlowEdge, FlowNode};
use crate::layout::Layouts;
use crate::store::{StoredDashboard, StoredFlow, StoredGrid, new_dashboard_id, now_ms};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("invalid dashboard json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("file io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a grid or flow dashboard (expected `layouts` or `nodes`)")]
    UnknownEnvelope,
}

/// A named downloadable artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Input to the import functions: raw file text or an already-parsed value.
pub enum ImportSource<'a> {
    Text(&'a str),
    Value(Value),
}

impl<'a> From<&'a str> for ImportSource<'a> {
    fn from(raw: &'a str) -> Self {
        Self::Text(raw)
    }
}

impl<'a> From<&'a String> for ImportSource<'a> {
    fn from(raw: &'a String) -> Self {
        Self::Text(raw.as_str())
    }
}

impl From<Value> for ImportSource<'_> {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl ImportSource<'_> {
    fn into_value(self) -> Result<Value, CodecError> {
        match self {
            Self::Text(raw) => Ok(serde_json::from_str(raw)?),
            Self::Value(value) => Ok(value),
        }
    }
}

#[derive(Deserialize)]
struct GridEnvelope {
    title: String,
    layouts: Layouts,
}

#[derive(Serialize)]
struct GridEnvelopeRef<'a> {
    title: &'a str,
    layouts: &'a Layouts,
}

#[derive(Deserialize)]
struct FlowEnvelope {
    title: String,
    nodes: Vec<FlowNode>,
    edges: Vec<FlowEdge>,
}

#[derive(Serialize)]
struct FlowEnvelopeRef<'a> {
    title: &'a str,
    nodes: &'a [FlowNode],
    edges: &'a [FlowEdge],
}

/// A parsed grid envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct GridImport {
    pub title: String,
    pub layouts: Layouts,
    /// Largest `block-<n>` suffix across every breakpoint; `0` if none.
    pub max_block_id: u64,
}

impl GridImport {
    /// Counter value that cannot collide with any imported block id.
    #[must_use]
    pub fn next_block_id(&self) -> u64 {
        self.max_block_id.saturating_add(1)
    }

    /// Stored record under a fresh identity.
    #[must_use]
    pub fn into_stored(self) -> StoredDashboard {
        StoredDashboard::Grid(StoredGrid {
            id: new_dashboard_id(),
            title: self.title,
            last_modified: now_ms(),
            layouts: self.layouts,
        })
    }
}

/// A parsed flow envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowImport {
    pub title: String,
    pub nodes: Vec<FlowNode>,
    pub edges: Vec<FlowEdge>,
    /// Largest `node-<n>` suffix; `0` if none.
    pub max_node_id: u64,
}

impl FlowImport {
    #[must_use]
    pub fn next_node_id(&self) -> u64 {
        self.max_node_id.saturating_add(1)
    }

    /// Stored record under a fresh identity.
    #[must_use]
    pub fn into_stored(self) -> StoredDashboard {
        StoredDashboard::Flow(StoredFlow {
            id: new_dashboard_id(),
            title: self.title,
            last_modified: now_ms(),
            nodes: self.nodes,
            edges: self.edges,
        })
    }
}

/// Either kind of parsed envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Import {
    Grid(GridImport),
    Flow(FlowImport),
}

impl Import {
    #[must_use]
    pub fn title(&self) -> &str {
        match self {
            Self::Grid(g) => &g.title,
            Self::Flow(f) => &f.title,
        }
    }

    #[must_use]
    pub fn into_stored(self) -> StoredDashboard {
        match self {
            Self::Grid(g) => g.into_stored(),
            Self::Flow(f) => f.into_stored(),
        }
    }
}

// =============================================================================
// EXPORT
// =============================================================================

/// Download name for `title`: lower-cased, every non-alphanumeric replaced
/// with `_`, `fallback` when the title is blank.
#[must_use]
pub fn export_filename(title: &str, fallback: &str) -> String {
    let trimmed = title.trim();
    let base = if trimmed.is_empty() { fallback } else { trimmed };
    let stem: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    format!("{stem}.json")
}

/// Pretty-printed grid envelope.
///
/// # Errors
///
/// Returns [`CodecError::Json`] if serialization fails.
pub fn export_grid(title: &str, layouts: &Layouts) -> Result<ExportFile, CodecError> {
    let bytes = serde_json::to_vec_pretty(&GridEnvelopeRef { title, layouts })?;
    Ok(ExportFile { filename: export_filename(title, GRID_EXPORT_FALLBACK), bytes })
}

/// Pretty-printed flow envelope.
///
/// # Errors
///
/// Returns [`CodecError::Json`] if serialization fails.
pub fn export_flow(title: &str, nodes: &[FlowNode], edges: &[FlowEdge]) -> Result<ExportFile, CodecError> {
    let bytes = serde_json::to_vec_pretty(&FlowEnvelopeRef { title, nodes, edges })?;
    Ok(ExportFile { filename: export_filename(title, FLOW_EXPORT_FALLBACK), bytes })
}

/// Export a stored dashboard of either kind.
///
/// # Errors
///
/// Returns [`CodecError::Json`] if serialization fails.
pub fn export_stored(dashboard: &StoredDashboard) -> Result<ExportFile, CodecError> {
    match dashboard {
        StoredDashboard::Grid(g) => export_grid(&g.title, &g.layouts),
        StoredDashboard::Flow(f) => export_flow(&f.title, &f.nodes, &f.edges),
    }
}

/// Write `file` into `dir` under its filename, creating `dir` if needed.
///
/// # Errors
///
/// Returns [`CodecError::Io`] if the directory or file cannot be written.
pub async fn write_export(dir: impl AsRef<Path>, file: &ExportFile) -> Result<PathBuf, CodecError> {
    let dir = dir.as_ref();
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(&file.filename);
    tokio::fs::write(&path, &file.bytes).await?;
    info!(path = %path.display(), bytes = file.bytes.len(), "dashboard exported");
    Ok(path)
}

// =============================================================================
// IMPORT
// =============================================================================

/// Largest `n` over ids of the exact form `<prefix><n>`; `0` when none match.
/// Suffixes the counter could not advance past (`u64::MAX` and beyond) are
/// ignored.
#[must_use]
pub fn max_id_suffix<'a>(ids: impl IntoIterator<Item = &'a str>, prefix: &str) -> u64 {
    ids.into_iter()
        .filter_map(|id| {
            let rest = id.strip_prefix(prefix)?;
            if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            match rest.parse::<u64>() {
                Ok(n) if n < u64::MAX => Some(n),
                Ok(_) => {
                    debug!(id, "id suffix at counter limit ignored");
                    None
                }
                Err(e) => {
                    debug!(id, error = %e, "id suffix out of range ignored");
                    None
                }
            }
        })
        .max()
        .unwrap_or(0)
}

/// Decode a grid envelope.
///
/// # Errors
///
/// Returns [`CodecError::Json`] on unparsable text or a structural mismatch.
pub fn decode_grid<'a>(source: impl Into<ImportSource<'a>>) -> Result<GridImport, CodecError> {
    let envelope: GridEnvelope = serde_json::from_value(source.into().into_value()?)?;
    let max_block_id = max_id_suffix(
        envelope.layouts.values().flatten().map(|b| b.id.as_str()),
        BLOCK_ID_PREFIX,
    );
    Ok(GridImport { title: envelope.title, layouts: envelope.layouts, max_block_id })
}

/// Decode a flow envelope.
///
/// # Errors
///
/// Returns [`CodecError::Json`] on unparsable text or a structural mismatch.
pub fn decode_flow<'a>(source: impl Into<ImportSource<'a>>) -> Result<FlowImport, CodecError> {
    let envelope: FlowEnvelope = serde_json::from_value(source.into().into_value()?)?;
    let max_node_id = max_id_suffix(envelope.nodes.iter().map(|n| n.id.as_str()), NODE_ID_PREFIX);
    Ok(FlowImport { title: envelope.title, nodes: envelope.nodes, edges: envelope.edges, max_node_id })
}

/// Decode either envelope, telling them apart by `layouts` / `nodes`.
///
/// # Errors
///
/// Returns [`CodecError::UnknownEnvelope`] if neither key is present, or
/// [`CodecError::Json`] if the matching envelope does not decode.
pub fn decode_any<'a>(source: impl Into<ImportSource<'a>>) -> Result<Import, CodecError> {
    let value = source.into().into_value()?;
    if value.get("layouts").is_some() {
        decode_grid(value).map(Import::Grid)
    } else if value.get("nodes").is_some() {
        decode_flow(value).map(Import::Flow)
    } else {
        Err(CodecError::UnknownEnvelope)
    }
}

/// Parse a grid envelope; `None` (logged) on any failure.
#[must_use]
pub fn parse_grid<'a>(source: impl Into<ImportSource<'a>>) -> Option<GridImport> {
    log_failure(decode_grid(source), "grid")
}

/// Parse a flow envelope; `None` (logged) on any failure.
#[must_use]
pub fn parse_flow<'a>(source: impl Into<ImportSource<'a>>) -> Option<FlowImport> {
    log_failure(decode_flow(source), "flow")
}

/// Parse either envelope; `None` (logged) on any failure.
#[must_use]
pub fn parse_any<'a>(source: impl Into<ImportSource<'a>>) -> Option<Import> {
    log_failure(decode_any(source), "dashboard")
}

/// Read and parse an export file. The dashboard state is untouched until the
/// returned future resolves.
pub async fn read_import(path: impl AsRef<Path>) -> Option<Import> {
    let path = path.as_ref();
    match tokio::fs::read_to_string(path).await {
        Ok(raw) => parse_any(raw.as_str()),
        Err(e) => {
            error!(error = %e, path = %path.display(), "could not read import file");
            None
        }
    }
}

fn log_failure<T>(result: Result<T, CodecError>, what: &str) -> Option<T> {
    match result {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            error!(error = %e, "error parsing {what} data");
            None
        }
    }
}
