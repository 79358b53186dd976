//! Responsive breakpoints and layout-delta reconciliation.
//!
//! DESIGN
//! ======
//! Each breakpoint owns an independent block sequence. The grid renderer
//! reports drag/resize results as bare `{id, x, y, w, h}` deltas; those are
//! merged onto the stored blocks so type, title, data and constraints survive
//! every interaction. Reconciliation never adds or removes a block: deltas
//! for unknown ids are dropped, and blocks without a delta are left alone.
//!
//! Functions here take the prior sequence by reference and return the new
//! one, so callers always write back a whole sequence derived from current
//! state.

#[cfg(test)]
#[path = "layout_test.rs"]
mod layout_test;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::block::{Block, BlockId};
use crate::consts::DROP_PLACEHOLDER_PREFIX;

/// Blocks per breakpoint, as persisted and exported.
pub type Layouts = BTreeMap<Breakpoint, Vec<Block>>;

// =============================================================================
// BREAKPOINTS
// =============================================================================

/// Responsive width tier. Ordered widest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Breakpoint {
    #[default]
    Lg,
    Md,
    Sm,
    Xs,
    Xxs,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown breakpoint: {0}")]
pub struct UnknownBreakpoint(pub String);

impl Breakpoint {
    /// Every breakpoint, widest first.
    pub const ALL: [Breakpoint; 5] = [Self::Lg, Self::Md, Self::Sm, Self::Xs, Self::Xxs];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lg => "lg",
            Self::Md => "md",
            Self::Sm => "sm",
            Self::Xs => "xs",
            Self::Xxs => "xxs",
        }
    }

    /// Smallest container width, in pixels, at which this breakpoint applies.
    #[must_use]
    pub fn min_width(self) -> u32 {
        match self {
            Self::Lg => 1200,
            Self::Md => 996,
            Self::Sm => 768,
            Self::Xs => 480,
            Self::Xxs => 0,
        }
    }

    /// Column count of the grid at this breakpoint.
    #[must_use]
    pub fn cols(self) -> u32 {
        match self {
            Self::Lg => 12,
            Self::Md => 10,
            Self::Sm => 6,
            Self::Xs => 4,
            Self::Xxs => 2,
        }
    }

    /// Widest breakpoint whose minimum width fits `width_px`.
    #[must_use]
    pub fn for_width(width_px: u32) -> Self {
        Self::ALL
            .into_iter()
            .find(|bp| width_px >= bp.min_width())
            .unwrap_or(Self::Xxs)
    }
}

impl fmt::Display for Breakpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Breakpoint {
    type Err = UnknownBreakpoint;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|bp| bp.as_str() == s)
            .ok_or_else(|| UnknownBreakpoint(s.to_owned()))
    }
}

// =============================================================================
// DELTAS
// =============================================================================

/// Position/size reported by the grid renderer after drag or resize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutDelta {
    #[serde(alias = "i")]
    pub id: BlockId,
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl LayoutDelta {
    /// Whether this entry is the renderer's drop-preview placeholder.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.id.starts_with(DROP_PLACEHOLDER_PREFIX)
    }
}

/// Sparse property edit from the properties panel. Only present fields apply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl BlockPatch {
    fn apply(&self, block: &mut Block) {
        if let Some(ref title) = self.title {
            block.title = Some(title.clone());
        }
        if let Some(ref data) = self.data {
            block.data = Some(data.clone());
        }
    }
}

/// Result of [`apply_property_update`].
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyUpdate {
    /// Full block sequence after the edit.
    pub blocks: Vec<Block>,
    /// The edited block as it now reads, if the id was found.
    pub updated: Option<Block>,
}

// =============================================================================
// RECONCILIATION
// =============================================================================

/// Merge renderer deltas onto `blocks`.
///
/// Placeholder entries are discarded, deltas for unknown ids are dropped, and
/// when one id appears more than once the last delta wins. The result has
/// exactly the ids of `blocks`, in the same order.
#[must_use]
pub fn apply_layout_change(blocks: &[Block], deltas: &[LayoutDelta]) -> Vec<Block> {
    let mut updated = blocks.to_vec();
    for delta in deltas {
        if delta.is_placeholder() {
            continue;
        }
        let Some(block) = updated.iter_mut().find(|b| b.id == delta.id) else {
            debug!(id = %delta.id, "layout delta for unknown block dropped");
            continue;
        };
        block.x = delta.x;
        block.y = delta.y;
        block.w = delta.w;
        block.h = delta.h;
    }
    updated
}

/// Merge a property patch onto the block with `id`.
#[must_use]
pub fn apply_property_update(blocks: &[Block], id: &str, patch: &BlockPatch) -> PropertyUpdate {
    let mut blocks = blocks.to_vec();
    let updated = blocks.iter_mut().find(|b| b.id == id).map(|block| {
        patch.apply(block);
        block.clone()
    });
    PropertyUpdate { blocks, updated }
}

/// Ids of `blocks`, in order.
#[must_use]
pub fn block_ids(blocks: &[Block]) -> Vec<&str> {
    blocks.iter().map(|b| b.id.as_str()).collect()
}
