// SPDX-License-Identifier: MIT

//! Test cases for the defect index and spatial grid
//!
//! Tests cover:
//! - Index building and per-die lookup
//! - Batch queries equal the union of single-die queries
//! - Range queries over die coordinates
//! - Parallel-array ingestion with floor-division splitting
//! - Extra-column carrying through array conversion
//! - Unbuilt-index emptiness
//! - Defect record validation
//! - Spatial grid bucketing

use wafermap_viewer::defect::{
    Defect, DefectClass, DefectIndex, DefectSet, ExtraValue, SpatialGrid,
};
use wafermap_viewer::error::DataError;

fn defect(row: i32, col: i32, x: f32, y: f32) -> Defect {
    Defect {
        die_row: row,
        die_col: col,
        x,
        y,
        class: DefectClass::Particle,
        size: None,
    }
}

#[test]
fn test_build_and_lookup() {
    let defects = vec![
        defect(0, 0, 0.5, 0.5),
        defect(0, 0, 0.2, 0.8),
        defect(1, -3, 0.1, 0.1),
    ];
    let index = DefectIndex::build(&defects);

    assert_eq!(index.defects_on_die(0, 0).len(), 2);
    assert_eq!(index.defects_on_die(1, -3), &[2]);
    assert!(index.defects_on_die(9, 9).is_empty());
}

#[test]
fn test_batch_query_equals_union_of_singles() {
    let mut defects = Vec::new();
    for i in 0..200 {
        defects.push(defect(i % 7, (i * 3) % 11, 0.5, 0.5));
    }
    let index = DefectIndex::build(&defects);

    let keys = [(0, 0), (1, 3), (2, 6), (5, 5)];
    let batch = index.defects_on_dies(&keys);

    let mut union: Vec<u32> = keys
        .iter()
        .flat_map(|&(r, c)| index.defects_on_die(r, c).iter().copied())
        .collect();
    union.sort_unstable();

    let mut sorted = batch.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, union, "batch query must equal the per-die union");
}

#[test]
fn test_collect_defects_resolves_indices() {
    let defects = vec![defect(2, 2, 0.1, 0.2), defect(2, 2, 0.3, 0.4)];
    let index = DefectIndex::build(&defects);

    let collected = index.collect_defects(&[(2, 2)], &defects);
    assert_eq!(collected.len(), 2);
    assert_eq!(collected[0].x, 0.1);
    assert_eq!(collected[1].y, 0.4);
}

#[test]
fn test_range_query_covers_the_rectangle() {
    let mut defects = Vec::new();
    for row in -5..=5 {
        for col in -5..=5 {
            defects.push(defect(row, col, 0.5, 0.5));
        }
    }
    let index = DefectIndex::build(&defects);

    let hits = index.query_range(-1, 1, -1, 1);
    assert_eq!(hits.len(), 9, "a 3x3 die window holds 9 defects");

    let all = index.query_range(-5, 5, -5, 5);
    assert_eq!(all.len(), defects.len());
}

#[test]
fn test_stats_report_totals() {
    let defects = vec![
        defect(0, 0, 0.5, 0.5),
        defect(0, 0, 0.6, 0.5),
        defect(0, 0, 0.7, 0.5),
        defect(1, 1, 0.5, 0.5),
    ];
    let index = DefectIndex::build(&defects);
    let stats = index.stats();

    assert_eq!(stats.total_defects, 4);
    assert_eq!(stats.die_count, 2);
    assert_eq!(stats.max_defects_per_die, 3);
    assert!((stats.avg_defects_per_die - 2.0).abs() < 1e-9);
}

#[test]
fn test_clear_empties_the_index() {
    let defects = vec![defect(0, 0, 0.5, 0.5)];
    let mut index = DefectIndex::build(&defects);
    assert!(!index.is_empty());
    index.clear();
    assert!(index.is_empty());
    assert!(index.defects_on_die(0, 0).is_empty());
}

#[test]
fn test_defect_set_rejects_out_of_range_position() {
    let bad = Defect {
        x: 1.5,
        ..defect(0, 0, 0.0, 0.0)
    };
    let err = DefectSet::new(vec![defect(0, 0, 0.5, 0.5), bad])
        .expect_err("out-of-range x must be rejected");
    match err {
        DataError::Record { index, .. } => assert_eq!(index, 1),
        other => panic!("expected Record error, got {other:?}"),
    }
}

#[test]
fn test_defect_set_rejects_non_positive_size() {
    let bad = Defect {
        size: Some(0.0),
        ..defect(0, 0, 0.5, 0.5)
    };
    assert!(DefectSet::new(vec![bad]).is_err());
}

#[test]
fn test_from_arrays_splits_by_floor_division() {
    // Die pitch 10: logical coordinate 25 lands on die 2 at rel 0.5,
    // and -5 lands on die -1 at rel 0.5.
    let classes = vec!["Scratch".to_string(), "Void".to_string()];
    let set = DefectSet::from_arrays(
        &[25.0, -5.0],
        &[25.0, -5.0],
        Some(&classes),
        Vec::new(),
        10.0,
        10.0,
    )
    .expect("from_arrays should succeed");

    let defects = set.defects();
    assert_eq!(defects[0].die_col, 2);
    assert_eq!(defects[0].die_row, 2);
    assert!((defects[0].x - 0.5).abs() < 1e-6);
    assert_eq!(defects[1].die_col, -1);
    assert_eq!(defects[1].die_row, -1);
    assert!((defects[1].y - 0.5).abs() < 1e-6);
}

#[test]
fn test_from_arrays_rejects_mismatched_lengths() {
    let err = DefectSet::from_arrays(&[1.0, 2.0], &[1.0], None, Vec::new(), 10.0, 10.0)
        .expect_err("mismatched arrays must fail");
    match err {
        DataError::ArrayLengthMismatch { x_len, y_len } => {
            assert_eq!((x_len, y_len), (2, 1));
        }
        other => panic!("expected ArrayLengthMismatch, got {other:?}"),
    }
}

#[test]
fn test_from_arrays_carries_extra_columns() {
    let extras = vec![
        (
            "severity".to_string(),
            vec![ExtraValue::Number(3.0), ExtraValue::Number(1.0)],
        ),
        (
            "inspector".to_string(),
            vec![
                ExtraValue::Text("A-12".to_string()),
                ExtraValue::Text("B-07".to_string()),
            ],
        ),
    ];
    let set = DefectSet::from_arrays(&[25.0, -5.0], &[25.0, -5.0], None, extras, 10.0, 10.0)
        .expect("from_arrays should succeed");

    let mut columns: Vec<&str> = set.extra_columns().collect();
    columns.sort_unstable();
    assert_eq!(columns, ["inspector", "severity"], "both columns survive");
    assert_eq!(
        set.extra("severity", 1),
        Some(&ExtraValue::Number(1.0)),
        "values stay index-aligned with the defects"
    );
    assert_eq!(
        set.extra("inspector", 0),
        Some(&ExtraValue::Text("A-12".to_string()))
    );
    assert_eq!(set.extra("severity", 2), None, "out of range yields nothing");
    assert_eq!(set.extra("lot", 0), None, "unknown column yields nothing");
}

#[test]
fn test_from_arrays_rejects_short_extra_column() {
    let extras = vec![("severity".to_string(), vec![ExtraValue::Number(3.0)])];
    let err = DefectSet::from_arrays(&[25.0, -5.0], &[25.0, -5.0], None, extras, 10.0, 10.0)
        .expect_err("a column shorter than the defect list must fail");
    assert!(
        err.to_string().contains("severity"),
        "error names the offending column: {err}"
    );
}

#[test]
fn test_unbuilt_index_answers_empty() {
    // Queries are valid before any build; they just find nothing.
    let index = DefectIndex::default();
    assert!(index.defects_on_die(0, 0).is_empty());
    assert!(index.defects_on_dies(&[(0, 0), (1, 1)]).is_empty());
    assert!(index.query_range(-5, 5, -5, 5).is_empty());
    assert!(index.die_position(0, 0).is_none());

    let stats = index.stats();
    assert_eq!(stats.total_defects, 0);
    assert_eq!(stats.die_count, 0);
    assert_eq!(stats.max_defects_per_die, 0);
}

#[test]
fn test_class_from_label_fallback() {
    assert_eq!(
        DefectClass::from_label("Scratch").expect("known label"),
        DefectClass::Scratch
    );
    assert_eq!(
        DefectClass::from_label("weird-new-class").expect("unknown label maps to Other"),
        DefectClass::Other
    );
    assert!(DefectClass::from_label("").is_err(), "empty label is invalid");
}

#[test]
fn test_spatial_grid_range_query_is_exact() {
    let mut grid = SpatialGrid::new(10.0);
    grid.insert(5.0, 5.0, "inside");
    grid.insert(9.9, 9.9, "edge");
    grid.insert(25.0, 25.0, "outside");

    let hits = grid.query_range(0.0, 0.0, 10.0, 10.0);
    assert_eq!(hits.len(), 2);
    assert!(!hits.contains(&&"outside"));
}

#[test]
fn test_spatial_grid_nearby_is_a_superset_of_the_radius() {
    let mut grid = SpatialGrid::new(10.0);
    grid.insert(0.0, 0.0, 1u32);
    grid.insert(3.0, 4.0, 2u32);
    grid.insert(50.0, 50.0, 3u32);

    let near = grid.nearby(0.0, 0.0, 5.0);
    assert!(near.contains(&&1));
    assert!(near.contains(&&2));
    assert!(!near.contains(&&3));
}
