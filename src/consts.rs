//! Shared constants for the layout engine.

// ── Grid placement ──────────────────────────────────────────────

/// Row ceiling for the placement search. Bounds the occupancy matrix only;
/// blocks may still live below it.
pub const DEFAULT_MAX_ROWS: u32 = 1000;

/// Largest configurable row ceiling. The occupancy matrix is `cols × rows`
/// cells and is rebuilt on every placement.
pub const MAX_ROWS_LIMIT: u32 = 10_000;

/// Id prefix the grid renderer gives its drop-preview placeholder.
pub const DROP_PLACEHOLDER_PREFIX: &str = "__dropping-elem";

// ── Identity ────────────────────────────────────────────────────

/// Prefix for grid block ids (`block-<n>`).
pub const BLOCK_ID_PREFIX: &str = "block-";

/// Prefix for flow node ids (`node-<n>`).
pub const NODE_ID_PREFIX: &str = "node-";

/// Prefix for flow edge ids (`edge-<source><sourceHandle>-<target><targetHandle>`,
/// handles empty when absent).
pub const EDGE_ID_PREFIX: &str = "edge-";

/// First counter value handed out by a fresh editor.
pub const FIRST_ENTITY_ID: u64 = 1;

// ── Persistence ─────────────────────────────────────────────────

/// Store namespace key holding the JSON array of saved dashboards.
pub const DEFAULT_STORE_KEY: &str = "blockboard-dashboards";

/// Default data directory for the file-backed store.
pub const DEFAULT_DATA_DIR: &str = ".blockboard";

// ── Export ──────────────────────────────────────────────────────

/// Download name used when a grid dashboard has a blank title.
pub const GRID_EXPORT_FALLBACK: &str = "grid-export";

/// Download name used when a flow dashboard has a blank title.
pub const FLOW_EXPORT_FALLBACK: &str = "flow-export";

/// Default title for a newly created grid dashboard.
pub const DEFAULT_GRID_TITLE: &str = "My Grid Dashboard";

/// Default title for a newly created flow dashboard.
pub const DEFAULT_FLOW_TITLE: &str = "My Flow Dashboard";

// ── Flow canvas ─────────────────────────────────────────────────

/// Diagonal step between auto-positioned flow nodes, in pixels.
pub const FLOW_NODE_STEP_PX: f64 = 40.0;
