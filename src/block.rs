//! Block model: block kinds, the size-constraint table, and typed payloads.
//!
//! A [`Block`] is one positioned widget on the grid. Its `data` field stays an
//! opaque JSON string on the wire because only the rendering layer interprets
//! it; [`Block::payload`] is the typed view over that string for code that
//! needs to read or replace it.
//!
//! Size constraints are copied onto a block when it is created and are never
//! recomputed from the table afterwards.

#[cfg(test)]
#[path = "block_test.rs"]
mod block_test;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::grid::{Footprint, GridPos};

/// Identifier of a block, unique within one dashboard (`block-<n>`).
pub type BlockId = String;

/// One row of a data-table payload. Columns are open-ended.
pub type TableRow = Map<String, Value>;

// =============================================================================
// ERRORS
// =============================================================================

/// Failure to decode or assign a typed payload.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("malformed {kind} payload: {source}")]
    Malformed {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("{payload} payload does not fit a {kind} entity")]
    Mismatch { kind: &'static str, payload: &'static str },
    #[error("payload encode failed: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Unknown block type name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown block type: {0}")]
pub struct UnknownBlockKind(pub String);

// =============================================================================
// BLOCK KIND + CONSTRAINT TABLE
// =============================================================================

/// The kind of widget a block renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockKind {
    /// Free text paragraph.
    Text,
    /// Pie chart over named values.
    PieChart,
    /// Line chart over named values.
    LineChart,
    /// Bar chart over named values.
    BarChart,
    /// Tabular rows with open-ended columns.
    DataTable,
}

/// Size bounds for a block kind, in grid units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeConstraints {
    pub default_w: u32,
    pub default_h: u32,
    pub min_w: u32,
    pub min_h: u32,
    pub max_w: u32,
}

impl SizeConstraints {
    /// Footprint a freshly created block of this kind occupies.
    #[must_use]
    pub fn footprint(self) -> Footprint {
        Footprint { w: self.default_w, h: self.default_h }
    }
}

impl BlockKind {
    /// Every kind, in palette order.
    pub const ALL: [BlockKind; 5] = [Self::Text, Self::PieChart, Self::LineChart, Self::BarChart, Self::DataTable];

    /// Wire name, as used in the `type` field.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::PieChart => "pie-chart",
            Self::LineChart => "line-chart",
            Self::BarChart => "bar-chart",
            Self::DataTable => "data-table",
        }
    }

    /// Human-readable palette label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Text => "Text Block",
            Self::PieChart => "Pie Chart",
            Self::LineChart => "Line Chart",
            Self::BarChart => "Bar Chart",
            Self::DataTable => "Data Table",
        }
    }

    /// Authoritative size bounds, consulted at creation time only.
    #[must_use]
    pub fn constraints(self) -> SizeConstraints {
        let (default_w, default_h, min_w, min_h, max_w) = match self {
            Self::Text => (4, 3, 1, 2, 12),
            Self::PieChart => (4, 4, 3, 3, 8),
            Self::LineChart | Self::BarChart => (6, 4, 4, 3, 12),
            Self::DataTable => (6, 5, 3, 5, 12),
        };
        SizeConstraints { default_w, default_h, min_w, min_h, max_w }
    }

    /// Payload a new block of this kind starts with.
    #[must_use]
    pub fn default_payload(self) -> BlockPayload {
        match self {
            Self::Text => BlockPayload::Text(TextContent { content: "Enter your text here...".into() }),
            Self::PieChart => BlockPayload::Series(vec![
                ChartPoint::colored("A", 400.0, "#0088FE"),
                ChartPoint::colored("B", 300.0, "#00C49F"),
                ChartPoint::colored("C", 200.0, "#FFBB28"),
            ]),
            Self::LineChart | Self::BarChart => BlockPayload::Series(vec![
                ChartPoint::new("Jan", 400.0),
                ChartPoint::new("Feb", 300.0),
                ChartPoint::new("Mar", 200.0),
            ]),
            Self::DataTable => BlockPayload::Table(default_table_rows()),
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockKind {
    type Err = UnknownBlockKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownBlockKind(s.to_owned()))
    }
}

fn default_table_rows() -> Vec<TableRow> {
    [
        ("2024-01-01", 20, 1013),
        ("2024-01-02", 22, 1012),
        ("2024-01-03", 19, 1014),
        ("2024-01-04", 21, 1015),
        ("2024-01-05", 23, 1011),
    ]
    .into_iter()
    .map(|(date, temperature, pressure)| {
        let mut row = Map::new();
        row.insert("date".into(), Value::from(date));
        row.insert("temperature".into(), Value::from(temperature));
        row.insert("pressure".into(), Value::from(pressure));
        row
    })
    .collect()
}

// =============================================================================
// PAYLOADS
// =============================================================================

/// Text block content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    pub content: String,
}

/// One named value in a chart series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub name: String,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl ChartPoint {
    #[must_use]
    pub fn new(name: &str, value: f64) -> Self {
        Self { name: name.to_owned(), value, color: None }
    }

    #[must_use]
    pub fn colored(name: &str, value: f64, color: &str) -> Self {
        Self { name: name.to_owned(), value, color: Some(color.to_owned()) }
    }
}

/// Decoded block payload. Which variant is valid depends on the block kind.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockPayload {
    Text(TextContent),
    Series(Vec<ChartPoint>),
    Table(Vec<TableRow>),
}

impl BlockPayload {
    /// Decode the raw `data` string of a block of `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError::Malformed`] if the string is not valid JSON of
    /// the shape this kind expects.
    pub fn decode(kind: BlockKind, raw: &str) -> Result<Self, PayloadError> {
        let malformed = |source| PayloadError::Malformed { kind: kind.as_str(), source };
        match kind {
            BlockKind::Text => serde_json::from_str(raw).map(Self::Text).map_err(malformed),
            BlockKind::PieChart | BlockKind::LineChart | BlockKind::BarChart => {
                serde_json::from_str(raw).map(Self::Series).map_err(malformed)
            }
            BlockKind::DataTable => serde_json::from_str(raw).map(Self::Table).map_err(malformed),
        }
    }

    /// Encode into the opaque string stored on the block.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError::Encode`] if serialization fails.
    pub fn encode(&self) -> Result<String, PayloadError> {
        match self {
            Self::Text(text) => serde_json::to_string(text),
            Self::Series(points) => serde_json::to_string(points),
            Self::Table(rows) => serde_json::to_string(rows),
        }
        .map_err(PayloadError::Encode)
    }

    /// Whether this payload is valid for blocks of `kind`.
    #[must_use]
    pub fn fits(&self, kind: BlockKind) -> bool {
        matches!(
            (self, kind),
            (Self::Text(_), BlockKind::Text)
                | (Self::Series(_), BlockKind::PieChart | BlockKind::LineChart | BlockKind::BarChart)
                | (Self::Table(_), BlockKind::DataTable)
        )
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Series(_) => "series",
            Self::Table(_) => "table",
        }
    }
}

// =============================================================================
// BLOCK
// =============================================================================

/// A positioned, sized widget instance in a grid layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Unique id within the dashboard. Older exports call this `i`.
    #[serde(alias = "i")]
    pub id: BlockId,
    /// Column of the top-left cell.
    pub x: u32,
    /// Row of the top-left cell.
    pub y: u32,
    /// Width in columns.
    pub w: u32,
    /// Height in rows.
    pub h: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_w: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_h: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_w: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_h: Option<u32>,
    /// Widget kind; selects rendering and payload shape.
    #[serde(rename = "type")]
    pub kind: BlockKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Opaque JSON payload, decoded with [`Block::payload`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    /// Renderer-owned fields we do not interpret, kept for round-tripping.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Block {
    /// Create a block of `kind` at `pos` with the kind's default size,
    /// constraints and payload.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError::Encode`] if the default payload fails to encode.
    pub fn new(id: impl Into<BlockId>, kind: BlockKind, pos: GridPos) -> Result<Self, PayloadError> {
        let c = kind.constraints();
        Ok(Self {
            id: id.into(),
            x: pos.x,
            y: pos.y,
            w: c.default_w,
            h: c.default_h,
            min_w: Some(c.min_w),
            min_h: Some(c.min_h),
            max_w: Some(c.max_w),
            max_h: None,
            kind,
            title: None,
            data: Some(kind.default_payload().encode()?),
            extra: Map::new(),
        })
    }

    /// Exclusive right edge in columns.
    #[must_use]
    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.w)
    }

    /// Exclusive bottom edge in rows.
    #[must_use]
    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.h)
    }

    /// Whether the two blocks' rectangles share at least one cell.
    #[must_use]
    pub fn overlaps(&self, other: &Block) -> bool {
        self.x < other.right() && other.x < self.right() && self.y < other.bottom() && other.y < self.bottom()
    }

    /// Whether `w`/`h` respect whatever constraints the block carries.
    #[must_use]
    pub fn fits_constraints(&self) -> bool {
        self.min_w.is_none_or(|min| self.w >= min)
            && self.max_w.is_none_or(|max| self.w <= max)
            && self.min_h.is_none_or(|min| self.h >= min)
            && self.max_h.is_none_or(|max| self.h <= max)
    }

    /// Typed view of `data`. A block without data reads as its kind's default.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError::Malformed`] if `data` does not decode for this kind.
    pub fn payload(&self) -> Result<BlockPayload, PayloadError> {
        match self.data.as_deref() {
            Some(raw) => BlockPayload::decode(self.kind, raw),
            None => Ok(self.kind.default_payload()),
        }
    }

    /// Replace `data` with an encoded typed payload.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError::Mismatch`] if the payload does not fit this kind.
    pub fn set_payload(&mut self, payload: &BlockPayload) -> Result<(), PayloadError> {
        if !payload.fits(self.kind) {
            return Err(PayloadError::Mismatch { kind: self.kind.as_str(), payload: payload.name() });
        }
        self.data = Some(payload.encode()?);
        Ok(())
    }
}
