use super::*;
use crate::block::{ChartPoint, TextContent};
use crate::codec;

fn delta(id: &str, x: u32, y: u32, w: u32, h: u32) -> LayoutDelta {
    LayoutDelta { id: id.into(), x, y, w, h }
}

fn positions(editor: &GridEditor) -> Vec<(u32, u32)> {
    editor.blocks().iter().map(|b| (b.x, b.y)).collect()
}

// =============================================================
// Construction
// =============================================================

#[test]
fn new_editor_starts_empty_on_lg() {
    let editor = GridEditor::new("Sales");
    assert_eq!(editor.title(), "Sales");
    assert_eq!(editor.breakpoint(), Breakpoint::Lg);
    assert!(editor.blocks().is_empty());
    assert_eq!(editor.layouts().len(), 1);
    assert!(editor.layouts().contains_key(&Breakpoint::Lg));
    assert_eq!(editor.next_block_id(), 1);
    assert!(editor.selection().is_none());
}

#[test]
fn editors_get_distinct_ids() {
    assert_ne!(GridEditor::default().id(), GridEditor::default().id());
}

#[test]
fn default_title() {
    assert_eq!(GridEditor::default().title(), DEFAULT_GRID_TITLE);
}

// =============================================================
// add_block
// =============================================================

#[test]
fn first_block_lands_at_origin() {
    let mut editor = GridEditor::new("t");
    let b = editor.add_block(BlockKind::Text).unwrap();
    assert_eq!((b.x, b.y, b.w, b.h), (0, 0, 4, 3));
    assert_eq!(b.id, "block-1");
    assert_eq!(b.title.as_deref(), Some("Text Block 1"));
    assert_eq!(editor.next_block_id(), 2);
    assert_eq!(editor.blocks(), &[b]);
}

#[test]
fn blocks_fill_the_row_then_wrap() {
    let mut editor = GridEditor::new("t");
    editor.add_block(BlockKind::Text).unwrap();
    editor.add_block(BlockKind::Text).unwrap();
    let third = editor.add_block(BlockKind::LineChart).unwrap();
    assert_eq!(positions(&editor), vec![(0, 0), (4, 0), (0, 3)]);
    assert_eq!(third.id, "block-3");
    assert_eq!((third.w, third.h), (6, 4));
}

#[test]
fn new_blocks_never_overlap() {
    let mut editor = GridEditor::new("t");
    let kinds = [
        BlockKind::DataTable,
        BlockKind::PieChart,
        BlockKind::Text,
        BlockKind::BarChart,
        BlockKind::LineChart,
        BlockKind::Text,
        BlockKind::PieChart,
    ];
    for kind in kinds {
        editor.add_block(kind).unwrap();
    }
    let blocks = editor.blocks();
    for (i, a) in blocks.iter().enumerate() {
        for b in &blocks[i + 1..] {
            assert!(!a.overlaps(b), "{} overlaps {}", a.id, b.id);
        }
    }
}

#[test]
fn exhausted_ceiling_appends_below() {
    let mut editor = GridEditor::new("t").with_max_rows(3);
    for _ in 0..3 {
        editor.add_block(BlockKind::Text).unwrap();
    }
    let fourth = editor.add_block(BlockKind::Text).unwrap();
    assert_eq!((fourth.x, fourth.y), (0, 3));
}

#[test]
fn too_wide_for_breakpoint_is_rejected() {
    let mut editor = GridEditor::new("t");
    editor.set_breakpoint(Breakpoint::Xxs);
    let err = editor.add_block(BlockKind::Text).unwrap_err();
    assert!(matches!(err, EditorError::Place(PlaceError::TooWide { w: 4, cols: 2 })));
    assert!(editor.blocks().is_empty());
    assert_eq!(editor.next_block_id(), 1);
}

#[test]
fn bounds_follow_breakpoint() {
    let mut editor = GridEditor::new("t").with_max_rows(50);
    assert_eq!(editor.bounds(), GridBounds { cols: 12, max_rows: 50 });
    editor.set_breakpoint(Breakpoint::Sm);
    assert_eq!(editor.bounds(), GridBounds { cols: 6, max_rows: 50 });
}

// =============================================================
// drop_block
// =============================================================

#[test]
fn drop_places_exactly_even_when_overlapping() {
    let mut editor = GridEditor::new("t");
    editor.add_block(BlockKind::Text).unwrap();
    let dropped = editor.drop_block(BlockKind::PieChart, GridPos { x: 1, y: 1 }).unwrap();
    assert_eq!((dropped.x, dropped.y), (1, 1));
    assert_eq!(dropped.id, "block-2");
    assert_eq!(dropped.min_w, Some(3));
    assert_eq!(editor.blocks().len(), 2);
}

// =============================================================
// Breakpoints
// =============================================================

#[test]
fn breakpoints_are_independent() {
    let mut editor = GridEditor::new("t");
    editor.add_block(BlockKind::Text).unwrap();

    editor.set_breakpoint(Breakpoint::Md);
    assert!(editor.blocks().is_empty());
    let md_block = editor.add_block(BlockKind::Text).unwrap();
    assert_eq!((md_block.x, md_block.y), (0, 0));

    editor.set_breakpoint(Breakpoint::Lg);
    assert_eq!(editor.blocks().len(), 1);
    assert_eq!(editor.blocks_at(Breakpoint::Md).len(), 1);
}

#[test]
fn counter_is_shared_across_breakpoints() {
    let mut editor = GridEditor::new("t");
    editor.add_block(BlockKind::Text).unwrap();
    editor.set_breakpoint(Breakpoint::Sm);
    let b = editor.add_block(BlockKind::Text).unwrap();
    assert_eq!(b.id, "block-2");
}

#[test]
fn set_width_selects_breakpoint() {
    let mut editor = GridEditor::new("t");
    assert_eq!(editor.set_width(800), Breakpoint::Sm);
    assert_eq!(editor.breakpoint(), Breakpoint::Sm);
}

// =============================================================
// Reconciliation through the editor
// =============================================================

#[test]
fn layout_change_updates_active_breakpoint_only() {
    let mut editor = GridEditor::new("t");
    editor.add_block(BlockKind::Text).unwrap();
    editor.set_breakpoint(Breakpoint::Md);
    editor.add_block(BlockKind::Text).unwrap();

    let blocks = editor.apply_layout_change(&[delta("block-2", 3, 3, 5, 4), delta("block-1", 9, 9, 1, 1)]);
    assert_eq!((blocks[0].x, blocks[0].y, blocks[0].w, blocks[0].h), (3, 3, 5, 4));

    let lg = editor.blocks_at(Breakpoint::Lg);
    assert_eq!((lg[0].x, lg[0].y), (0, 0));
}

#[test]
fn layout_change_refreshes_selection() {
    let mut editor = GridEditor::new("t");
    editor.add_block(BlockKind::Text).unwrap();
    editor.select("block-1");
    editor.apply_layout_change(&[delta("block-1", 2, 5, 4, 3)]);
    let selected = editor.selection().unwrap();
    assert_eq!((selected.x, selected.y), (2, 5));
}

#[test]
fn property_update_refreshes_selection() {
    let mut editor = GridEditor::new("t");
    editor.add_block(BlockKind::Text).unwrap();
    editor.select("block-1").unwrap();

    let patch = BlockPatch { title: Some("Notes".into()), data: None };
    let updated = editor.apply_property_update("block-1", &patch).unwrap();
    assert_eq!(updated.title.as_deref(), Some("Notes"));
    assert_eq!(editor.selection(), Some(&updated));
    assert_eq!(editor.block("block-1"), Some(&updated));
}

#[test]
fn property_update_leaves_other_selection_alone() {
    let mut editor = GridEditor::new("t");
    editor.add_block(BlockKind::Text).unwrap();
    editor.add_block(BlockKind::Text).unwrap();
    editor.select("block-2");

    let patch = BlockPatch { title: Some("Renamed".into()), data: None };
    editor.apply_property_update("block-1", &patch).unwrap();
    assert_eq!(editor.selection().unwrap().title.as_deref(), Some("Text Block 2"));
}

#[test]
fn property_update_unknown_block_errors() {
    let mut editor = GridEditor::new("t");
    let err = editor.apply_property_update("block-9", &BlockPatch::default()).unwrap_err();
    assert!(matches!(err, EditorError::UnknownBlock(ref id) if id == "block-9"));
}

#[test]
fn typed_payload_update() {
    let mut editor = GridEditor::new("t");
    editor.add_block(BlockKind::BarChart).unwrap();
    let payload = BlockPayload::Series(vec![ChartPoint::new("Q1", 10.0), ChartPoint::new("Q2", 20.0)]);
    let updated = editor.set_block_payload("block-1", &payload).unwrap();
    assert_eq!(updated.payload().unwrap(), payload);
}

#[test]
fn typed_payload_mismatch_is_rejected() {
    let mut editor = GridEditor::new("t");
    editor.add_block(BlockKind::BarChart).unwrap();
    let before = editor.block("block-1").cloned();
    let err = editor
        .set_block_payload("block-1", &BlockPayload::Text(TextContent { content: "x".into() }))
        .unwrap_err();
    assert!(matches!(err, EditorError::Payload(PayloadError::Mismatch { .. })));
    assert_eq!(editor.block("block-1").cloned(), before);
}

// =============================================================
// Selection / delete
// =============================================================

#[test]
fn select_unknown_clears_selection() {
    let mut editor = GridEditor::new("t");
    editor.add_block(BlockKind::Text).unwrap();
    editor.select("block-1");
    assert!(editor.select("missing").is_none());
    assert!(editor.selection().is_none());
}

#[test]
fn delete_removes_block_and_selection() {
    let mut editor = GridEditor::new("t");
    editor.add_block(BlockKind::Text).unwrap();
    editor.add_block(BlockKind::Text).unwrap();
    editor.select("block-1");
    assert!(editor.delete_block("block-1"));
    assert!(editor.selection().is_none());
    assert_eq!(editor.blocks().len(), 1);
    assert_eq!(editor.blocks()[0].id, "block-2");
}

#[test]
fn delete_keeps_unrelated_selection() {
    let mut editor = GridEditor::new("t");
    editor.add_block(BlockKind::Text).unwrap();
    editor.add_block(BlockKind::Text).unwrap();
    editor.select("block-2");
    editor.delete_block("block-1");
    assert_eq!(editor.selection().unwrap().id, "block-2");
}

#[test]
fn delete_unknown_is_noop() {
    let mut editor = GridEditor::new("t");
    editor.add_block(BlockKind::Text).unwrap();
    assert!(!editor.delete_block("block-7"));
    assert_eq!(editor.blocks().len(), 1);
}

#[test]
fn delete_does_not_reuse_ids() {
    let mut editor = GridEditor::new("t");
    editor.add_block(BlockKind::Text).unwrap();
    editor.delete_block("block-1");
    let b = editor.add_block(BlockKind::Text).unwrap();
    assert_eq!(b.id, "block-2");
}

// =============================================================
// Persistence / import
// =============================================================

#[test]
fn snapshot_roundtrips_through_from_stored() {
    let mut editor = GridEditor::new("Ops");
    editor.add_block(BlockKind::Text).unwrap();
    editor.add_block(BlockKind::PieChart).unwrap();

    let StoredDashboard::Grid(stored) = editor.snapshot() else {
        panic!("expected grid snapshot");
    };
    assert_eq!(stored.id, editor.id());
    assert_eq!(stored.title, "Ops");
    assert!(stored.last_modified > 0);

    let resumed = GridEditor::from_stored(stored);
    assert_eq!(resumed.id(), editor.id());
    assert_eq!(resumed.layouts(), editor.layouts());
    assert_eq!(resumed.next_block_id(), 3);
}

#[test]
fn from_stored_counter_spans_all_breakpoints() {
    let mut editor = GridEditor::new("t");
    editor.add_block(BlockKind::Text).unwrap();
    editor.set_breakpoint(Breakpoint::Xs);
    editor.add_block(BlockKind::Text).unwrap();
    editor.add_block(BlockKind::Text).unwrap();

    let StoredDashboard::Grid(stored) = editor.snapshot() else {
        panic!("expected grid snapshot");
    };
    assert_eq!(GridEditor::from_stored(stored).next_block_id(), 4);
}

#[test]
fn import_issues_fresh_identity() {
    let mut editor = GridEditor::new("Imported");
    editor.add_block(BlockKind::Text).unwrap();
    editor.add_block(BlockKind::Text).unwrap();
    let file = codec::export_grid(editor.title(), editor.layouts()).unwrap();
    let raw = String::from_utf8(file.bytes).unwrap();

    let a = GridEditor::from_import(codec::parse_grid(raw.as_str()).unwrap());
    let b = GridEditor::from_import(codec::parse_grid(raw.as_str()).unwrap());
    assert_ne!(a.id(), editor.id());
    assert_ne!(a.id(), b.id());
    assert_eq!(a.title(), "Imported");
    assert_eq!(a.layouts(), editor.layouts());
    assert_eq!(a.next_block_id(), 3);
}

#[test]
fn exhausted_counter_is_an_error() {
    let raw = r#"{"title":"t","layouts":{"lg":[{"id":"block-18446744073709551613","x":0,"y":0,"w":4,"h":3,"type":"text"}]}}"#;
    let mut editor = GridEditor::from_import(codec::parse_grid(raw).unwrap());
    assert_eq!(editor.next_block_id(), u64::MAX - 1);

    let last = editor.add_block(BlockKind::Text).unwrap();
    assert_eq!(last.id, "block-18446744073709551614");
    assert_eq!(editor.next_block_id(), u64::MAX);

    let err = editor.drop_block(BlockKind::Text, GridPos { x: 0, y: 9 }).unwrap_err();
    assert!(matches!(err, EditorError::IdsExhausted));
    assert_eq!(editor.blocks().len(), 2);
}

#[test]
fn from_stored_with_maximal_id_does_not_overflow() {
    let mut editor = GridEditor::new("t");
    editor.add_block(BlockKind::Text).unwrap();
    let StoredDashboard::Grid(mut stored) = editor.snapshot() else {
        panic!("expected grid snapshot");
    };
    for block in stored.layouts.values_mut().flatten() {
        block.id = format!("block-{}", u64::MAX - 1);
    }
    assert_eq!(GridEditor::from_stored(stored).next_block_id(), u64::MAX);
}
