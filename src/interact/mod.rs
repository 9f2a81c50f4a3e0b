// SPDX-License-Identifier: MIT

//! Pointer interaction: rubber-band selection, panning, zoom, hover
//! hit-testing.
//!
//! The controller is a small state machine over screen-space pointer input:
//!
//! ```text
//! Idle --primary down--> Selecting --up--> Idle   (Selection event if big enough)
//! Idle --secondary down--> Panning --up--> Idle   (Pan events on each move)
//! Idle --move, no button--> hover hit-test        (DieHover on change)
//! ```
//!
//! Wheel input adjusts zoom multiplicatively, clamped, independent of the
//! pointer states.

use log::debug;

use crate::defect::{Defect, DefectIndex};
use crate::pipeline::ViewTransform;
use crate::render::overlay::SelectionRect;
use crate::wafer::{DieGrid, RenderOptions, MAX_ZOOM, MIN_SELECTION_SIZE, MIN_ZOOM};

pub mod labels;

/// A die as reported to the embedding application: grid coordinate,
/// physical center, and the defects on it.
#[derive(Debug, Clone, PartialEq)]
pub struct DieInfo {
    pub row: i32,
    pub col: i32,
    pub physical_x: f64,
    pub physical_y: f64,
    pub defects: Vec<Defect>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
}

/// Events produced by the controller for the embedding application.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionEvent {
    DieClick(DieInfo),
    DieHover(Option<DieInfo>),
    Selection(Vec<DieInfo>),
    Zoom(f32),
    Pan(f32, f32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    Idle,
    Selecting { start: (f32, f32), current: (f32, f32) },
    Panning { last: (f32, f32) },
}

/// Everything hit-testing needs to resolve a pointer position to a die.
#[derive(Clone, Copy)]
pub struct Scene<'a> {
    pub grid: &'a DieGrid,
    pub index: &'a DefectIndex,
    pub defects: &'a [Defect],
}

impl Scene<'_> {
    fn die_info_at(&self, world_x: f32, world_y: f32) -> Option<DieInfo> {
        let die = self.grid.die_at(world_x, world_y)?;
        Some(self.die_info(die.row, die.col, die.physical_x, die.physical_y))
    }

    fn die_info(&self, row: i32, col: i32, physical_x: f64, physical_y: f64) -> DieInfo {
        let defects = self
            .index
            .defects_on_die(row, col)
            .iter()
            .filter_map(|&i| self.defects.get(i as usize))
            .copied()
            .collect();
        DieInfo {
            row,
            col,
            physical_x,
            physical_y,
            defects,
        }
    }
}

pub struct InteractionController {
    mode: Mode,
    zoom: f32,
    pan_x: f32,
    pan_y: f32,
    hovered: Option<(i32, i32)>,
    options: RenderOptions,
}

impl InteractionController {
    pub fn new(options: RenderOptions) -> Self {
        Self {
            mode: Mode::Idle,
            zoom: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
            hovered: None,
            options,
        }
    }

    pub fn set_options(&mut self, options: RenderOptions) {
        self.options = options;
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn pan(&self) -> (f32, f32) {
        (self.pan_x, self.pan_y)
    }

    pub fn transform(&self, canvas_size: f32) -> ViewTransform {
        ViewTransform {
            zoom: self.zoom,
            pan_x: self.pan_x,
            pan_y: self.pan_y,
            center_x: canvas_size / 2.0,
            center_y: canvas_size / 2.0,
        }
    }

    /// The in-progress rubber-band rectangle, normalized, if selecting.
    pub fn selection_rect(&self) -> Option<SelectionRect> {
        match self.mode {
            Mode::Selecting { start, current } => {
                let min_x = start.0.min(current.0);
                let min_y = start.1.min(current.1);
                Some(SelectionRect {
                    x: min_x,
                    y: min_y,
                    width: (start.0 - current.0).abs(),
                    height: (start.1 - current.1).abs(),
                })
            }
            _ => None,
        }
    }

    pub fn is_panning(&self) -> bool {
        matches!(self.mode, Mode::Panning { .. })
    }

    pub fn pointer_down(&mut self, x: f32, y: f32, button: PointerButton) {
        match button {
            PointerButton::Primary if self.options.enable_selection => {
                self.mode = Mode::Selecting {
                    start: (x, y),
                    current: (x, y),
                };
                self.hovered = None;
            }
            PointerButton::Secondary if self.options.enable_pan => {
                self.mode = Mode::Panning { last: (x, y) };
                self.hovered = None;
            }
            _ => {}
        }
    }

    /// Pointer motion. While selecting this only grows the rubber band;
    /// while panning it emits cumulative `Pan` deltas; when idle it
    /// hit-tests for hover and reports changes.
    pub fn pointer_move(
        &mut self,
        x: f32,
        y: f32,
        canvas_size: f32,
        scene: Scene<'_>,
    ) -> Option<InteractionEvent> {
        match &mut self.mode {
            Mode::Selecting { current, .. } => {
                *current = (x, y);
                None
            }
            Mode::Panning { last } => {
                let dx = x - last.0;
                let dy = y - last.1;
                *last = (x, y);
                self.pan_x += dx;
                self.pan_y += dy;
                Some(InteractionEvent::Pan(self.pan_x, self.pan_y))
            }
            Mode::Idle => {
                if !self.options.enable_tooltip {
                    return None;
                }
                let (wx, wy) = self.transform(canvas_size).to_world(x, y);
                let info = scene.die_info_at(wx, wy);
                let key = info.as_ref().map(|d| (d.row, d.col));
                if key == self.hovered {
                    return None;
                }
                self.hovered = key;
                Some(InteractionEvent::DieHover(info))
            }
        }
    }

    /// Pointer release. A selection rectangle must exceed the minimum size
    /// on both axes to emit an event; anything smaller is discarded
    /// silently as a click-cancel.
    pub fn pointer_up(
        &mut self,
        x: f32,
        y: f32,
        canvas_size: f32,
        scene: Scene<'_>,
    ) -> Option<InteractionEvent> {
        match self.mode {
            Mode::Selecting { start, .. } => {
                self.mode = Mode::Idle;
                let rect = SelectionRect {
                    x: start.0.min(x),
                    y: start.1.min(y),
                    width: (start.0 - x).abs(),
                    height: (start.1 - y).abs(),
                };
                if rect.width <= MIN_SELECTION_SIZE || rect.height <= MIN_SELECTION_SIZE {
                    debug!(
                        "selection {}x{} below threshold, discarded",
                        rect.width, rect.height
                    );
                    return None;
                }

                // Screen rect corners to world space for the center test.
                let transform = self.transform(canvas_size);
                let (min_x, min_y) = transform.to_world(rect.x, rect.y);
                let (max_x, max_y) = transform.to_world(rect.x + rect.width, rect.y + rect.height);

                let dies: Vec<DieInfo> = scene
                    .grid
                    .dies_in_rect(min_x, min_y, max_x, max_y)
                    .into_iter()
                    .map(|die| scene.die_info(die.row, die.col, die.physical_x, die.physical_y))
                    .collect();
                debug!("selection of {} dies", dies.len());
                Some(InteractionEvent::Selection(dies))
            }
            Mode::Panning { .. } => {
                self.mode = Mode::Idle;
                None
            }
            Mode::Idle => None,
        }
    }

    /// Pointer left the canvas: abandon any in-progress gesture.
    pub fn pointer_leave(&mut self) {
        self.mode = Mode::Idle;
        self.hovered = None;
    }

    /// A discrete click (press and release without drag).
    pub fn click(&mut self, x: f32, y: f32, canvas_size: f32, scene: Scene<'_>) -> Option<InteractionEvent> {
        if !self.options.enable_click {
            return None;
        }
        let (wx, wy) = self.transform(canvas_size).to_world(x, y);
        scene.die_info_at(wx, wy).map(InteractionEvent::DieClick)
    }

    /// Wheel zoom: multiplicative step, clamped to the configured range.
    pub fn wheel(&mut self, scroll_delta: f32) -> Option<InteractionEvent> {
        if !self.options.enable_zoom || scroll_delta == 0.0 {
            return None;
        }
        let factor = if scroll_delta > 0.0 { 1.1 } else { 0.9 };
        let new_zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        if new_zoom == self.zoom {
            return None;
        }
        self.zoom = new_zoom;
        Some(InteractionEvent::Zoom(self.zoom))
    }

    pub fn reset_view(&mut self) {
        self.mode = Mode::Idle;
        self.zoom = 1.0;
        self.pan_x = 0.0;
        self.pan_y = 0.0;
        self.hovered = None;
    }
}
