// SPDX-License-Identifier: MIT

//! Wafer physical description and render options.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub mod grid;

pub use grid::{DieGrid, DiePosition, ReticleTile};

/// Orientation of the wafer notch, one of the four compass directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotchPosition {
    Up,
    Down,
    Left,
    Right,
}

/// Direction of increasing physical X.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum XDirection {
    Left,
    Right,
}

/// Direction of increasing physical Y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum YDirection {
    Up,
    Down,
}

/// Immutable physical description of a wafer and its die grid.
///
/// All lengths are millimeters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaferConfig {
    pub diameter: f64,
    pub edge_exclusion: f64,
    pub notch: NotchPosition,

    pub die_width: f64,
    pub die_height: f64,
    pub die_offset_x: f64,
    pub die_offset_y: f64,

    pub scribe_line_x: f64,
    pub scribe_line_y: f64,

    /// Dies per reticle shot in X / Y.
    pub reticle_x: u32,
    pub reticle_y: u32,
    pub show_reticle_border: bool,

    pub x_positive: XDirection,
    pub y_positive: YDirection,
}

impl WaferConfig {
    /// Structural validation. Must pass before any grid generation or
    /// rendering is attempted; out-of-range values are rejected, not clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.diameter <= 0.0 {
            return Err(ConfigError::new("diameter", self.diameter, "must be positive"));
        }
        if self.edge_exclusion < 0.0 || self.edge_exclusion >= self.diameter / 2.0 {
            return Err(ConfigError::new(
                "edge_exclusion",
                self.edge_exclusion,
                format!("must be in [0, {})", self.diameter / 2.0),
            ));
        }
        if self.die_width <= 0.0 {
            return Err(ConfigError::new("die_width", self.die_width, "must be positive"));
        }
        if self.die_height <= 0.0 {
            return Err(ConfigError::new("die_height", self.die_height, "must be positive"));
        }
        if self.scribe_line_x < 0.0 {
            return Err(ConfigError::new(
                "scribe_line_x",
                self.scribe_line_x,
                "cannot be negative",
            ));
        }
        if self.scribe_line_y < 0.0 {
            return Err(ConfigError::new(
                "scribe_line_y",
                self.scribe_line_y,
                "cannot be negative",
            ));
        }
        if self.reticle_x == 0 {
            return Err(ConfigError::new("reticle_x", self.reticle_x, "must be at least 1"));
        }
        if self.reticle_y == 0 {
            return Err(ConfigError::new("reticle_y", self.reticle_y, "must be at least 1"));
        }

        // A die larger than half the wafer can never fit inside the effective area.
        let max_die = self.diameter / 2.0;
        if self.die_width > max_die || self.die_height > max_die {
            return Err(ConfigError::new(
                "die_size",
                format!("{}x{}", self.die_width, self.die_height),
                format!("too large for wafer diameter {}", self.diameter),
            ));
        }

        Ok(())
    }

    /// Die pitch (die + scribe line) in X, mm.
    pub fn pitch_x(&self) -> f64 {
        self.die_width + self.scribe_line_x
    }

    /// Die pitch (die + scribe line) in Y, mm.
    pub fn pitch_y(&self) -> f64 {
        self.die_height + self.scribe_line_y
    }
}

/// Feature toggles and limits for the rendering pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderOptions {
    pub show_defects: bool,
    /// Base defect radius in mm, scaled to pixels at draw time.
    pub defect_size: f64,

    pub enable_viewport_culling: bool,
    pub enable_data_decimation: bool,
    pub max_defects_to_render: usize,

    pub enable_zoom: bool,
    pub enable_pan: bool,
    pub enable_selection: bool,
    pub enable_tooltip: bool,
    pub enable_click: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            show_defects: true,
            defect_size: 0.5,
            enable_viewport_culling: true,
            enable_data_decimation: true,
            max_defects_to_render: 30_000,
            enable_zoom: true,
            enable_pan: true,
            enable_selection: true,
            enable_tooltip: true,
            enable_click: true,
        }
    }
}

/// Fraction of the canvas occupied by the wafer disc.
pub const CANVAS_SCALE_FACTOR: f64 = 0.75;

/// Fixed pixel margin used by viewport culling.
pub const VIEWPORT_MARGIN: f32 = 50.0;

/// Rubber-band rectangles smaller than this (either side) do not select.
pub const MIN_SELECTION_SIZE: f32 = 20.0;

pub const MIN_ZOOM: f32 = 0.5;
pub const MAX_ZOOM: f32 = 10.0;

/// Standard 300 mm production wafer.
pub fn preset_300mm() -> WaferConfig {
    WaferConfig {
        diameter: 300.0,
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

/// Standard 200 mm wafer.
pub fn preset_200mm() -> WaferConfig {
    WaferConfig {
        diameter: 200.0,
        edge_exclusion: 2.0,
        die_width: 8.0,
        die_height: 8.0,
        scribe_line_x: 0.15,
        scribe_line_y: 0.15,
        ..preset_300mm()
    }
}

/// Standard 150 mm wafer.
pub fn preset_150mm() -> WaferConfig {
    WaferConfig {
        diameter: 150.0,
        edge_exclusion: 1.5,
        die_width: 6.0,
        die_height: 6.0,
        scribe_line_x: 0.1,
        scribe_line_y: 0.1,
        reticle_x: 1,
        reticle_y: 1,
        ..preset_300mm()
    }
}
