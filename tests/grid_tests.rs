// SPDX-License-Identifier: MIT

//! Test cases for die grid generation
//!
//! Tests cover:
//! - Config validation failures
//! - Deterministic generation for the 300mm preset
//! - Corner-based inner-radius acceptance
//! - Scribe-gap separation between die footprints
//! - Grid symmetry about the wafer center
//! - Die hit testing and rectangle queries
//! - Reticle tile bucketing

use wafermap_viewer::wafer::{
    preset_150mm, preset_300mm, DieGrid, NotchPosition, WaferConfig, XDirection, YDirection,
};

const CANVAS: f32 = 800.0;

fn small_config() -> WaferConfig {
    WaferConfig {
        diameter: 100.0,
        edge_exclusion: 3.0,
        notch: NotchPosition::Down,
        die_width: 10.0,
        die_height: 10.0,
        die_offset_x: 0.0,
        die_offset_y: 0.0,
        scribe_line_x: 0.2,
        scribe_line_y: 0.2,
        reticle_x: 2,
        reticle_y: 2,
        show_reticle_border: false,
        x_positive: XDirection::Right,
        y_positive: YDirection::Up,
    }
}

#[test]
fn test_invalid_diameter_rejected() {
    let mut config = small_config();
    config.diameter = 0.0;
    assert!(config.validate().is_err());
    assert!(DieGrid::generate(&config, CANVAS).is_err());
}

#[test]
fn test_edge_exclusion_must_stay_inside_radius() {
    let mut config = small_config();
    config.edge_exclusion = 60.0; // exceeds the 50mm radius
    let err = config.validate().expect_err("validation should fail");
    assert_eq!(err.field, "edge_exclusion");
}

#[test]
fn test_die_larger_than_wafer_rejected() {
    let mut config = small_config();
    config.die_width = 80.0;
    assert!(config.validate().is_err());
}

#[test]
fn test_negative_scribe_rejected() {
    let mut config = small_config();
    config.scribe_line_y = -0.1;
    assert!(config.validate().is_err());
}

#[test]
fn test_zero_reticle_rejected() {
    let mut config = small_config();
    config.reticle_x = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_generation_is_deterministic() {
    let config = preset_300mm();
    let a = DieGrid::generate(&config, CANVAS).expect("generate should succeed");
    let b = DieGrid::generate(&config, CANVAS).expect("generate should succeed");

    assert_eq!(a.positions.len(), b.positions.len());
    for (x, y) in a.positions.iter().zip(b.positions.iter()) {
        assert_eq!(x, y);
    }
}

#[test]
fn test_300mm_preset_produces_a_populated_grid() {
    let config = preset_300mm();
    let grid = DieGrid::generate(&config, CANVAS).expect("generate should succeed");

    assert!(
        grid.positions.len() > 100,
        "a 300mm wafer with 10mm dies should hold hundreds of dies, got {}",
        grid.positions.len()
    );
    assert!(grid.inner_radius < grid.outer_radius);
    assert!(grid.die_px_w > 0.0 && grid.die_px_h > 0.0);
}

#[test]
fn test_all_die_corners_inside_inner_radius() {
    let config = preset_150mm();
    let grid = DieGrid::generate(&config, CANVAS).expect("generate should succeed");

    // Small tolerance matches the generator's own edge-die handling.
    let limit = grid.inner_radius + 0.011 * grid.scale;
    for die in &grid.positions {
        let corners = [
            (die.canvas_x, die.canvas_y),
            (die.canvas_x + grid.die_px_w, die.canvas_y),
            (die.canvas_x, die.canvas_y + grid.die_px_h),
            (die.canvas_x + grid.die_px_w, die.canvas_y + grid.die_px_h),
        ];
        for (cx, cy) in corners {
            let dx = cx - grid.center_x;
            let dy = cy - grid.center_y;
            let dist = (dx * dx + dy * dy).sqrt();
            assert!(
                dist <= limit,
                "die ({}, {}) corner at distance {dist} exceeds {limit}",
                die.row,
                die.col
            );
        }
    }
}

#[test]
fn test_die_footprints_separated_by_scribe_gap() {
    let config = small_config();
    let grid = DieGrid::generate(&config, CANVAS).expect("generate should succeed");
    assert!(grid.positions.len() > 1);

    let gap_x = (config.scribe_line_x as f32) * grid.scale;
    let gap_y = (config.scribe_line_y as f32) * grid.scale;

    // Any two dies must clear each other on at least one axis by a full
    // die plus the scribe gap.
    for (i, a) in grid.positions.iter().enumerate() {
        for b in &grid.positions[i + 1..] {
            let dx = (a.canvas_x - b.canvas_x).abs();
            let dy = (a.canvas_y - b.canvas_y).abs();
            let clear_x = dx + 1e-3 >= grid.die_px_w + gap_x;
            let clear_y = dy + 1e-3 >= grid.die_px_h + gap_y;
            assert!(
                clear_x || clear_y,
                "dies ({}, {}) and ({}, {}) overlap: dx={dx} dy={dy}",
                a.row,
                a.col,
                b.row,
                b.col
            );
        }
    }
}

#[test]
fn test_centered_grid_is_symmetric() {
    // No offsets: for every accepted (row, col) the mirrored die must also
    // be accepted.
    let config = small_config();
    let grid = DieGrid::generate(&config, CANVAS).expect("generate should succeed");

    assert!(!grid.positions.is_empty());
    for die in &grid.positions {
        let mirrored = grid
            .positions
            .iter()
            .any(|d| d.row == -die.row && d.col == -die.col);
        assert!(
            mirrored,
            "die ({}, {}) has no mirrored counterpart",
            die.row, die.col
        );
    }
}

#[test]
fn test_die_at_finds_the_right_die() {
    let config = small_config();
    let grid = DieGrid::generate(&config, CANVAS).expect("generate should succeed");

    let target = grid.positions[grid.positions.len() / 2];
    let hit = grid
        .die_at(
            target.canvas_x + grid.die_px_w / 2.0,
            target.canvas_y + grid.die_px_h / 2.0,
        )
        .expect("center of a die must hit");
    assert_eq!((hit.row, hit.col), (target.row, target.col));
}

#[test]
fn test_die_at_misses_outside_the_wafer() {
    let config = small_config();
    let grid = DieGrid::generate(&config, CANVAS).expect("generate should succeed");
    assert!(grid.die_at(0.0, 0.0).is_none());
    assert!(grid.die_at(CANVAS, CANVAS).is_none());
}

#[test]
fn test_dies_in_rect_uses_center_inclusion() {
    let config = small_config();
    let grid = DieGrid::generate(&config, CANVAS).expect("generate should succeed");

    let target = grid.positions[0];
    let cx = target.canvas_x + grid.die_px_w / 2.0;
    let cy = target.canvas_y + grid.die_px_h / 2.0;

    // A rect tightly around one die center selects exactly that die.
    let selected = grid.dies_in_rect(cx - 1.0, cy - 1.0, cx + 1.0, cy + 1.0);
    assert_eq!(selected.len(), 1);
    assert_eq!((selected[0].row, selected[0].col), (target.row, target.col));

    // A rect that clips the die corner but not its center selects nothing.
    let clipped = grid.dies_in_rect(
        target.canvas_x - 1.0,
        target.canvas_y - 1.0,
        target.canvas_x + 1.0,
        target.canvas_y + 1.0,
    );
    assert!(clipped.is_empty());
}

#[test]
fn test_whole_canvas_rect_selects_every_die() {
    let config = small_config();
    let grid = DieGrid::generate(&config, CANVAS).expect("generate should succeed");
    let all = grid.dies_in_rect(0.0, 0.0, CANVAS, CANVAS);
    assert_eq!(all.len(), grid.positions.len());
}

#[test]
fn test_reticle_tiles_cover_each_shot_once() {
    let config = small_config();
    let grid = DieGrid::generate(&config, CANVAS).expect("generate should succeed");
    let tiles = grid.reticle_tiles(&config);

    assert!(!tiles.is_empty());
    let mut seen = std::collections::HashSet::new();
    for tile in &tiles {
        assert!(
            seen.insert((tile.reticle_row, tile.reticle_col)),
            "reticle ({}, {}) emitted twice",
            tile.reticle_row,
            tile.reticle_col
        );
        assert!(tile.width > 0.0 && tile.height > 0.0);
    }

    // 2x2 reticle: fewer tiles than dies, but at least a quarter of them.
    assert!(tiles.len() < grid.positions.len());
    assert!(tiles.len() * 4 >= grid.positions.len());
}

#[test]
fn test_empty_grid_for_tiny_canvas_with_giant_exclusion() {
    let mut config = small_config();
    config.edge_exclusion = 49.0;
    let grid = DieGrid::generate(&config, CANVAS).expect("generate should succeed");
    assert!(
        grid.positions.is_empty(),
        "a 1mm effective radius cannot hold a 10mm die"
    );
    assert!(grid.reticle_tiles(&config).is_empty());
}
