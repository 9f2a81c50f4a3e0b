// SPDX-License-Identifier: MIT

//! Die-grid generation.
//!
//! Computes the set of die positions whose four corners lie inside the
//! wafer's effective (edge-exclusion-adjusted) radius, together with the
//! canvas scale factor and wafer center. Regenerated whenever the wafer
//! config or the canvas size changes.

use std::collections::HashSet;

use log::debug;

use crate::error::ConfigError;
use crate::wafer::{WaferConfig, XDirection, YDirection, CANVAS_SCALE_FACTOR};

/// One accepted die: integer grid coordinate, canvas-space top-left and
/// physical-space center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiePosition {
    pub row: i32,
    pub col: i32,
    /// Top-left corner in base canvas space (pixels, zoom 1).
    pub canvas_x: f32,
    pub canvas_y: f32,
    /// Die center in physical space (mm).
    pub physical_x: f64,
    pub physical_y: f64,
}

/// One reticle shot boundary, expressed as a canvas-space rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReticleTile {
    pub reticle_row: i32,
    pub reticle_col: i32,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// The generated grid plus the draw parameters derived with it.
#[derive(Debug, Clone)]
pub struct DieGrid {
    /// Accepted dies in row-major order. The order is significant only for
    /// deterministic iteration.
    pub positions: Vec<DiePosition>,
    /// Canvas pixels per physical mm.
    pub scale: f32,
    pub center_x: f32,
    pub center_y: f32,
    pub outer_radius: f32,
    pub inner_radius: f32,
    /// Die footprint in pixels at zoom 1.
    pub die_px_w: f32,
    pub die_px_h: f32,
}

impl DieGrid {
    /// Generate the grid for a validated config and a square canvas size in
    /// pixels. Validation runs first; a config that fails never produces a
    /// grid.
    pub fn generate(config: &WaferConfig, canvas_size: f32) -> Result<Self, ConfigError> {
        config.validate()?;
        if !(canvas_size > 0.0) {
            return Err(ConfigError::new("canvas_size", canvas_size, "must be positive"));
        }

        let scale = (canvas_size as f64 * CANVAS_SCALE_FACTOR / config.diameter) as f32;
        let center = canvas_size / 2.0;

        let wafer_radius = config.diameter / 2.0;
        let outer_radius = (wafer_radius * scale as f64) as f32;
        let inner_radius = ((wafer_radius - config.edge_exclusion) * scale as f64) as f32;

        let pitch_x = config.pitch_x();
        let pitch_y = config.pitch_y();

        // Generous bound: every die whose center could possibly fall on the
        // wafer is inside +-(radius / pitch + 1) grid steps.
        let max_rows = (wafer_radius / pitch_y).ceil() as i32 + 1;
        let max_cols = (wafer_radius / pitch_x).ceil() as i32 + 1;

        let die_px_w = (config.die_width * scale as f64) as f32;
        let die_px_h = (config.die_height * scale as f64) as f32;

        // Small tolerance keeps floating-point edge dies stable.
        let tolerance = 0.01 * scale;

        let x_sign = match config.x_positive {
            XDirection::Right => 1.0f64,
            XDirection::Left => -1.0,
        };
        let y_sign = match config.y_positive {
            YDirection::Up => 1.0f64,
            YDirection::Down => -1.0,
        };

        let mut positions = Vec::new();

        for row in -max_rows..=max_rows {
            for col in -max_cols..=max_cols {
                let center_x_mm = col as f64 * pitch_x + config.die_offset_x;
                let center_y_mm = row as f64 * pitch_y + config.die_offset_y;

                // Canvas-space top-left of the die.
                let canvas_x = center as f64
                    + (center_x_mm - config.die_width / 2.0) * scale as f64 * x_sign;
                let canvas_y = center as f64
                    - (center_y_mm + config.die_height / 2.0) * scale as f64 * y_sign;

                let corners = [
                    (canvas_x, canvas_y),
                    (canvas_x + die_px_w as f64, canvas_y),
                    (canvas_x, canvas_y + die_px_h as f64),
                    (canvas_x + die_px_w as f64, canvas_y + die_px_h as f64),
                ];

                let all_inside = corners.iter().all(|&(cx, cy)| {
                    let dx = cx - center as f64;
                    let dy = cy - center as f64;
                    (dx * dx + dy * dy).sqrt() <= (inner_radius + tolerance) as f64
                });

                if all_inside {
                    positions.push(DiePosition {
                        row,
                        col,
                        canvas_x: canvas_x as f32,
                        canvas_y: canvas_y as f32,
                        physical_x: center_x_mm,
                        physical_y: center_y_mm,
                    });
                }
            }
        }

        debug!(
            "die grid generated: {} dies, scale {:.3} px/mm, inner radius {:.1} px",
            positions.len(),
            scale,
            inner_radius
        );

        Ok(Self {
            positions,
            scale,
            center_x: center,
            center_y: center,
            outer_radius,
            inner_radius,
            die_px_w,
            die_px_h,
        })
    }

    /// Bucket the accepted dies into reticle shots and return one boundary
    /// rectangle per shot. Each reticle is emitted exactly once.
    pub fn reticle_tiles(&self, config: &WaferConfig) -> Vec<ReticleTile> {
        if self.positions.is_empty() {
            return Vec::new();
        }

        // Anchor at die (0,0), or the die closest to the origin if the
        // center falls on a scribe line.
        let anchor = self
            .positions
            .iter()
            .find(|d| d.row == 0 && d.col == 0)
            .or_else(|| {
                self.positions
                    .iter()
                    .min_by_key(|d| d.row.abs() + d.col.abs())
            })
            .copied()
            .expect("non-empty grid has an anchor die");

        let reticle_x = config.reticle_x as i32;
        let reticle_y = config.reticle_y as i32;
        let pitch_px_x = (config.pitch_x() * self.scale as f64) as f32;
        let pitch_px_y = (config.pitch_y() * self.scale as f64) as f32;

        let mut seen = HashSet::new();
        let mut tiles = Vec::new();

        for die in &self.positions {
            let reticle_row = die.row.div_euclid(reticle_y);
            let reticle_col = die.col.div_euclid(reticle_x);
            if !seen.insert((reticle_row, reticle_col)) {
                continue;
            }

            let start_row = reticle_row * reticle_y;
            let start_col = reticle_col * reticle_x;

            let first_die_x = anchor.canvas_x + (start_col - anchor.col) as f32 * pitch_px_x;
            let first_die_y = anchor.canvas_y + (start_row - anchor.row) as f32 * pitch_px_y;

            tiles.push(ReticleTile {
                reticle_row,
                reticle_col,
                x: first_die_x - (config.scribe_line_x / 2.0 * self.scale as f64) as f32,
                y: first_die_y - (config.scribe_line_y / 2.0 * self.scale as f64) as f32,
                width: reticle_x as f32 * pitch_px_x,
                height: reticle_y as f32 * pitch_px_y,
            });
        }

        tiles
    }

    /// First die (in storage order) whose bounding box contains the given
    /// base-canvas-space point.
    pub fn die_at(&self, canvas_x: f32, canvas_y: f32) -> Option<&DiePosition> {
        self.positions.iter().find(|die| {
            canvas_x >= die.canvas_x
                && canvas_x <= die.canvas_x + self.die_px_w
                && canvas_y >= die.canvas_y
                && canvas_y <= die.canvas_y + self.die_px_h
        })
    }

    /// All dies whose centers fall inside the given base-canvas-space
    /// rectangle.
    pub fn dies_in_rect(&self, min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Vec<&DiePosition> {
        self.positions
            .iter()
            .filter(|die| {
                let cx = die.canvas_x + self.die_px_w / 2.0;
                let cy = die.canvas_y + self.die_px_h / 2.0;
                cx >= min_x && cx <= max_x && cy >= min_y && cy <= max_y
            })
            .collect()
    }
}
