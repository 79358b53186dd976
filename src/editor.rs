//! Grid editing state: per-breakpoint layouts, selection, and block counter.
//!
//! `GridEditor` is the explicit state object the UI adapter drives. Every
//! mutator reads the current breakpoint's sequence, derives a new one through
//! the pure functions in [`crate::layout`] and [`crate::grid`], and writes the
//! whole sequence back. Breakpoints are independent snapshots; switching the
//! active one is a plain read of another map entry.

#[cfg(test)]
#[path = "editor_test.rs"]
mod editor_test;

use tracing::{debug, warn};

use crate::block::{Block, BlockKind, BlockPayload, PayloadError};
use crate::codec::{GridImport, max_id_suffix};
use crate::consts::{BLOCK_ID_PREFIX, DEFAULT_GRID_TITLE, DEFAULT_MAX_ROWS, FIRST_ENTITY_ID};
use crate::grid::{self, GridBounds, GridPos, PlaceError};
use crate::layout::{self, BlockPatch, Breakpoint, LayoutDelta, Layouts};
use crate::store::{StoredDashboard, StoredGrid, new_dashboard_id, now_ms};

#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("block not found: {0}")]
    UnknownBlock(String),
    #[error("block id counter exhausted")]
    IdsExhausted,
    #[error(transparent)]
    Place(#[from] PlaceError),
    #[error(transparent)]
    Payload(#[from] PayloadError),
}

/// Editing state for one grid dashboard.
pub struct GridEditor {
    id: String,
    title: String,
    layouts: Layouts,
    breakpoint: Breakpoint,
    /// Value copy of the selected block, refreshed on every write to it.
    selected: Option<Block>,
    next_block: u64,
    max_rows: u32,
}

impl Default for GridEditor {
    fn default() -> Self {
        Self::new(DEFAULT_GRID_TITLE)
    }
}

impl GridEditor {
    /// Empty dashboard with a fresh identity and an empty `lg` layout.
    #[must_use]
    pub fn new(title: &str) -> Self {
        let mut layouts = Layouts::new();
        layouts.insert(Breakpoint::Lg, Vec::new());
        Self {
            id: new_dashboard_id(),
            title: title.to_owned(),
            layouts,
            breakpoint: Breakpoint::Lg,
            selected: None,
            next_block: FIRST_ENTITY_ID,
            max_rows: DEFAULT_MAX_ROWS,
        }
    }

    /// Resume editing a saved dashboard under its stored identity.
    #[must_use]
    pub fn from_stored(stored: StoredGrid) -> Self {
        let max = max_id_suffix(stored.layouts.values().flatten().map(|b| b.id.as_str()), BLOCK_ID_PREFIX);
        Self {
            id: stored.id,
            title: stored.title,
            layouts: stored.layouts,
            breakpoint: Breakpoint::Lg,
            selected: None,
            next_block: max.saturating_add(1),
            max_rows: DEFAULT_MAX_ROWS,
        }
    }

    /// Start editing an imported file. Always issues a fresh identity.
    #[must_use]
    pub fn from_import(import: GridImport) -> Self {
        let next_block = import.next_block_id();
        Self {
            id: new_dashboard_id(),
            title: import.title,
            layouts: import.layouts,
            breakpoint: Breakpoint::Lg,
            selected: None,
            next_block,
            max_rows: DEFAULT_MAX_ROWS,
        }
    }

    /// Override the placement row ceiling.
    #[must_use]
    pub fn with_max_rows(mut self, max_rows: u32) -> Self {
        self.max_rows = max_rows;
        self
    }

    // --- Queries ---

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: &str) {
        title.clone_into(&mut self.title);
    }

    #[must_use]
    pub fn layouts(&self) -> &Layouts {
        &self.layouts
    }

    #[must_use]
    pub fn breakpoint(&self) -> Breakpoint {
        self.breakpoint
    }

    /// Blocks of the active breakpoint.
    #[must_use]
    pub fn blocks(&self) -> &[Block] {
        self.blocks_at(self.breakpoint)
    }

    #[must_use]
    pub fn blocks_at(&self, breakpoint: Breakpoint) -> &[Block] {
        self.layouts.get(&breakpoint).map(Vec::as_slice).unwrap_or_default()
    }

    #[must_use]
    pub fn block(&self, id: &str) -> Option<&Block> {
        self.blocks().iter().find(|b| b.id == id)
    }

    #[must_use]
    pub fn selection(&self) -> Option<&Block> {
        self.selected.as_ref()
    }

    /// Counter value the next created block will use.
    #[must_use]
    pub fn next_block_id(&self) -> u64 {
        self.next_block
    }

    /// Placement search area for the active breakpoint.
    #[must_use]
    pub fn bounds(&self) -> GridBounds {
        GridBounds { cols: self.breakpoint.cols(), max_rows: self.max_rows }
    }

    // --- Breakpoints ---

    pub fn set_breakpoint(&mut self, breakpoint: Breakpoint) {
        self.breakpoint = breakpoint;
    }

    /// Switch to the breakpoint matching a container width.
    pub fn set_width(&mut self, width_px: u32) -> Breakpoint {
        self.breakpoint = Breakpoint::for_width(width_px);
        self.breakpoint
    }

    // --- Block lifecycle ---

    /// Add a block of `kind` at the first free position on the active
    /// breakpoint. When the row ceiling is exhausted the block goes directly
    /// below the current extent instead.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::Place`] if the kind's default width does not fit
    /// the breakpoint's columns, or [`EditorError::IdsExhausted`] once the
    /// block counter cannot advance.
    pub fn add_block(&mut self, kind: BlockKind) -> Result<Block, EditorError> {
        let footprint = kind.constraints().footprint();
        let pos = match grid::place(self.blocks(), footprint, self.bounds()) {
            Ok(pos) => pos,
            Err(PlaceError::Exhausted { max_rows }) => {
                let y = grid::bottom_extent(self.blocks());
                warn!(max_rows, y, kind = %kind, "no room within row ceiling; appending below layout");
                GridPos { x: 0, y }
            }
            Err(e) => return Err(e.into()),
        };
        self.insert_block(kind, pos)
    }

    /// Add a block dropped from the palette at an exact coordinate. Overlap is
    /// left to the renderer's compaction pass.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::IdsExhausted`] once the block counter cannot
    /// advance, or [`EditorError::Payload`] if the default payload fails to encode.
    pub fn drop_block(&mut self, kind: BlockKind, pos: GridPos) -> Result<Block, EditorError> {
        self.insert_block(kind, pos)
    }

    fn insert_block(&mut self, kind: BlockKind, pos: GridPos) -> Result<Block, EditorError> {
        let n = self.next_block;
        let next = n.checked_add(1).ok_or(EditorError::IdsExhausted)?;
        let mut block = Block::new(format!("{BLOCK_ID_PREFIX}{n}"), kind, pos)?;
        block.title = Some(format!("{} {n}", kind.label()));

        self.layouts.entry(self.breakpoint).or_default().push(block.clone());
        self.next_block = next;
        debug!(id = %block.id, x = pos.x, y = pos.y, breakpoint = %self.breakpoint, "block added");
        Ok(block)
    }

    /// Remove a block from the active breakpoint. Returns whether it existed.
    pub fn delete_block(&mut self, id: &str) -> bool {
        let Some(blocks) = self.layouts.get_mut(&self.breakpoint) else {
            return false;
        };
        let before = blocks.len();
        blocks.retain(|b| b.id != id);
        let removed = blocks.len() != before;
        if self.selected.as_ref().is_some_and(|b| b.id == id) {
            self.selected = None;
        }
        removed
    }

    // --- Reconciliation ---

    /// Merge renderer drag/resize deltas into the active breakpoint.
    pub fn apply_layout_change(&mut self, deltas: &[LayoutDelta]) -> &[Block] {
        let updated = layout::apply_layout_change(self.blocks(), deltas);
        self.layouts.insert(self.breakpoint, updated);
        self.refresh_selection();
        self.blocks()
    }

    /// Merge a property edit into a block on the active breakpoint. If that
    /// block is selected, the selection is replaced by the updated value.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::UnknownBlock`] if no block has `id`.
    pub fn apply_property_update(&mut self, id: &str, patch: &BlockPatch) -> Result<Block, EditorError> {
        let result = layout::apply_property_update(self.blocks(), id, patch);
        let updated = result.updated.ok_or_else(|| EditorError::UnknownBlock(id.to_owned()))?;
        self.layouts.insert(self.breakpoint, result.blocks);
        if self.selected.as_ref().is_some_and(|b| b.id == id) {
            self.selected = Some(updated.clone());
        }
        Ok(updated)
    }

    /// Replace a block's data with a typed payload.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::UnknownBlock`] or [`EditorError::Payload`] when
    /// the payload does not fit the block's kind.
    pub fn set_block_payload(&mut self, id: &str, payload: &BlockPayload) -> Result<Block, EditorError> {
        let mut staged = self
            .block(id)
            .cloned()
            .ok_or_else(|| EditorError::UnknownBlock(id.to_owned()))?;
        staged.set_payload(payload)?;
        let patch = BlockPatch { title: None, data: staged.data };
        self.apply_property_update(id, &patch)
    }

    // --- Selection ---

    pub fn select(&mut self, id: &str) -> Option<&Block> {
        self.selected = self.block(id).cloned();
        self.selected.as_ref()
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    fn refresh_selection(&mut self) {
        if let Some(id) = self.selected.as_ref().map(|b| b.id.clone()) {
            if let Some(current) = self.block(&id).cloned() {
                self.selected = Some(current);
            }
        }
    }

    // --- Persistence ---

    /// Snapshot for the persistence store.
    #[must_use]
    pub fn snapshot(&self) -> StoredDashboard {
        StoredDashboard::Grid(StoredGrid {
            id: self.id.clone(),
            title: self.title.clone(),
            last_modified: now_ms(),
            layouts: self.layouts.clone(),
        })
    }
}
