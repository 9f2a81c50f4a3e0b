// SPDX-License-Identifier: MIT

//! Test cases for the interaction controller
//!
//! Tests cover:
//! - Rubber-band selection and the minimum size threshold
//! - Hover hit testing and change-only events
//! - Click resolution to die info
//! - Pan accumulation and wheel zoom clamping
//! - Feature toggles disabling gestures

use wafermap_viewer::defect::{Defect, DefectClass, DefectIndex};
use wafermap_viewer::interact::{
    InteractionController, InteractionEvent, PointerButton, Scene,
};
use wafermap_viewer::wafer::{
    preset_150mm, DieGrid, RenderOptions, MAX_ZOOM, MIN_ZOOM,
};

const CANVAS: f32 = 800.0;

struct Fixture {
    grid: DieGrid,
    index: DefectIndex,
    defects: Vec<Defect>,
}

impl Fixture {
    fn new() -> Self {
        let config = preset_150mm();
        let grid = DieGrid::generate(&config, CANVAS).expect("generate should succeed");

        // One defect on every die so selections always carry data.
        let defects: Vec<Defect> = grid
            .positions
            .iter()
            .map(|die| Defect {
                die_row: die.row,
                die_col: die.col,
                x: 0.5,
                y: 0.5,
                class: DefectClass::Scratch,
                size: None,
            })
            .collect();

        let mut index = DefectIndex::build(&defects);
        index.build_die_positions(&grid.positions);

        Self {
            grid,
            index,
            defects,
        }
    }

    fn scene(&self) -> Scene<'_> {
        Scene {
            grid: &self.grid,
            index: &self.index,
            defects: &self.defects,
        }
    }

    /// Screen position of a die center at identity view.
    fn die_center(&self, i: usize) -> (f32, f32) {
        let die = &self.grid.positions[i];
        (
            die.canvas_x + self.grid.die_px_w / 2.0,
            die.canvas_y + self.grid.die_px_h / 2.0,
        )
    }
}

#[test]
fn test_small_selection_is_discarded_silently() {
    let fx = Fixture::new();
    let mut ctl = InteractionController::new(RenderOptions::default());

    ctl.pointer_down(400.0, 400.0, PointerButton::Primary);
    let during = ctl.pointer_move(410.0, 415.0, CANVAS, fx.scene());
    assert!(during.is_none(), "selection drag must not emit events");

    // 10x15 px is under the 20px threshold on both axes.
    let event = ctl.pointer_up(410.0, 415.0, CANVAS, fx.scene());
    assert!(event.is_none(), "sub-threshold selection must be discarded");
}

#[test]
fn test_selection_one_axis_below_threshold_is_discarded() {
    let fx = Fixture::new();
    let mut ctl = InteractionController::new(RenderOptions::default());

    ctl.pointer_down(300.0, 300.0, PointerButton::Primary);
    // 200px wide but only 10px tall.
    let event = ctl.pointer_up(500.0, 310.0, CANVAS, fx.scene());
    assert!(event.is_none());
}

#[test]
fn test_large_selection_returns_covered_dies() {
    let fx = Fixture::new();
    let mut ctl = InteractionController::new(RenderOptions::default());

    ctl.pointer_down(300.0, 300.0, PointerButton::Primary);
    ctl.pointer_move(500.0, 500.0, CANVAS, fx.scene());
    assert!(ctl.selection_rect().is_some(), "band visible while dragging");

    let event = ctl
        .pointer_up(500.0, 500.0, CANVAS, fx.scene())
        .expect("a 200x200 selection must emit");
    let InteractionEvent::Selection(dies) = event else {
        panic!("expected Selection event");
    };

    assert!(!dies.is_empty(), "central area must contain dies");
    for die in &dies {
        assert_eq!(die.defects.len(), 1, "every die carries its one defect");
        let (cx, cy) = {
            let pos = fx
                .grid
                .positions
                .iter()
                .find(|p| p.row == die.row && p.col == die.col)
                .expect("selected die exists in the grid");
            (
                pos.canvas_x + fx.grid.die_px_w / 2.0,
                pos.canvas_y + fx.grid.die_px_h / 2.0,
            )
        };
        assert!(
            (300.0..=500.0).contains(&cx) && (300.0..=500.0).contains(&cy),
            "die ({}, {}) center ({cx}, {cy}) outside the band",
            die.row,
            die.col
        );
    }
    assert!(ctl.selection_rect().is_none(), "band cleared after release");
}

#[test]
fn test_selection_disabled_blocks_the_gesture() {
    let fx = Fixture::new();
    let options = RenderOptions {
        enable_selection: false,
        ..RenderOptions::default()
    };
    let mut ctl = InteractionController::new(options);

    ctl.pointer_down(300.0, 300.0, PointerButton::Primary);
    assert!(ctl.selection_rect().is_none());
    assert!(ctl.pointer_up(500.0, 500.0, CANVAS, fx.scene()).is_none());
}

#[test]
fn test_hover_emits_only_on_change() {
    let fx = Fixture::new();
    let mut ctl = InteractionController::new(RenderOptions::default());
    let (cx, cy) = fx.die_center(fx.grid.positions.len() / 2);

    let first = ctl.pointer_move(cx, cy, CANVAS, fx.scene());
    let Some(InteractionEvent::DieHover(Some(info))) = first else {
        panic!("hovering a die center must report it");
    };
    assert_eq!(info.defects.len(), 1);

    // Wiggle within the same die: no event.
    let again = ctl.pointer_move(cx + 1.0, cy + 1.0, CANVAS, fx.scene());
    assert!(again.is_none(), "same die must not re-emit");

    // Off the wafer: hover clears once.
    let off = ctl.pointer_move(1.0, 1.0, CANVAS, fx.scene());
    assert!(matches!(off, Some(InteractionEvent::DieHover(None))));
    let off_again = ctl.pointer_move(2.0, 2.0, CANVAS, fx.scene());
    assert!(off_again.is_none());
}

#[test]
fn test_click_resolves_to_die_info() {
    let fx = Fixture::new();
    let mut ctl = InteractionController::new(RenderOptions::default());
    let (cx, cy) = fx.die_center(0);

    let event = ctl
        .click(cx, cy, CANVAS, fx.scene())
        .expect("clicking a die must emit");
    let InteractionEvent::DieClick(info) = event else {
        panic!("expected DieClick");
    };
    let die = fx.grid.positions[0];
    assert_eq!((info.row, info.col), (die.row, die.col));
    assert_eq!(info.physical_x, die.physical_x);
    assert_eq!(info.defects.len(), 1);

    assert!(
        ctl.click(1.0, 1.0, CANVAS, fx.scene()).is_none(),
        "clicking empty canvas emits nothing"
    );
}

#[test]
fn test_pan_accumulates_deltas() {
    let fx = Fixture::new();
    let mut ctl = InteractionController::new(RenderOptions::default());

    ctl.pointer_down(400.0, 400.0, PointerButton::Secondary);
    assert!(ctl.is_panning());

    let first = ctl.pointer_move(410.0, 395.0, CANVAS, fx.scene());
    assert!(matches!(first, Some(InteractionEvent::Pan(_, _))));
    let second = ctl.pointer_move(430.0, 390.0, CANVAS, fx.scene());
    let Some(InteractionEvent::Pan(px, py)) = second else {
        panic!("expected Pan");
    };
    assert!((px - 30.0).abs() < 1e-3);
    assert!((py + 10.0).abs() < 1e-3);

    assert!(ctl.pointer_up(430.0, 390.0, CANVAS, fx.scene()).is_none());
    assert!(!ctl.is_panning());
    assert_eq!(ctl.pan(), (30.0, -10.0));
}

#[test]
fn test_wheel_zoom_clamps_to_range() {
    let mut ctl = InteractionController::new(RenderOptions::default());

    // Zoom all the way in.
    for _ in 0..100 {
        ctl.wheel(1.0);
    }
    assert!((ctl.zoom() - MAX_ZOOM).abs() < 1e-6);
    assert!(ctl.wheel(1.0).is_none(), "at max zoom, no further event");

    // And all the way out.
    for _ in 0..200 {
        ctl.wheel(-1.0);
    }
    assert!((ctl.zoom() - MIN_ZOOM).abs() < 1e-6);
    assert!(ctl.wheel(-1.0).is_none());
}

#[test]
fn test_zoom_disabled_blocks_wheel() {
    let options = RenderOptions {
        enable_zoom: false,
        ..RenderOptions::default()
    };
    let mut ctl = InteractionController::new(options);
    assert!(ctl.wheel(1.0).is_none());
    assert_eq!(ctl.zoom(), 1.0);
}

#[test]
fn test_reset_view_restores_identity() {
    let fx = Fixture::new();
    let mut ctl = InteractionController::new(RenderOptions::default());
    ctl.wheel(1.0);
    ctl.pointer_down(400.0, 400.0, PointerButton::Secondary);
    ctl.pointer_move(420.0, 420.0, CANVAS, fx.scene());

    ctl.reset_view();
    assert_eq!(ctl.zoom(), 1.0);
    assert_eq!(ctl.pan(), (0.0, 0.0));
    assert!(!ctl.is_panning());
}

#[test]
fn test_selection_respects_the_view_transform() {
    let fx = Fixture::new();
    let mut ctl = InteractionController::new(RenderOptions::default());

    // Zoom in 2x about the center, then select the same screen band; the
    // world-space rect shrinks, so fewer dies are covered.
    let mut full = InteractionController::new(RenderOptions::default());
    full.pointer_down(300.0, 300.0, PointerButton::Primary);
    let full_event = full.pointer_up(500.0, 500.0, CANVAS, fx.scene());
    let Some(InteractionEvent::Selection(full_dies)) = full_event else {
        panic!("expected Selection");
    };

    for _ in 0..8 {
        ctl.wheel(1.0);
    }
    ctl.pointer_down(300.0, 300.0, PointerButton::Primary);
    let zoomed_event = ctl.pointer_up(500.0, 500.0, CANVAS, fx.scene());
    let Some(InteractionEvent::Selection(zoomed_dies)) = zoomed_event else {
        panic!("expected Selection");
    };

    assert!(
        zoomed_dies.len() < full_dies.len(),
        "zoomed selection ({}) must cover fewer dies than unzoomed ({})",
        zoomed_dies.len(),
        full_dies.len()
    );
}
