// SPDX-License-Identifier: MIT

//! Per-frame defect processing: view transform, viewport culling, decimation
//! and color grouping.

pub mod decimate;
pub mod process;

pub use decimate::DecimationPlan;
pub use process::{DefectProcessor, ProcessJob, ProcessOptions, ProcessedFrame};

use crate::wafer::VIEWPORT_MARGIN;

/// Mapping from base canvas space (the space die positions are generated in)
/// to screen space: `screen = center + pan + (world - center) * zoom`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub zoom: f32,
    pub pan_x: f32,
    pub pan_y: f32,
    pub center_x: f32,
    pub center_y: f32,
}

impl ViewTransform {
    pub fn identity(center_x: f32, center_y: f32) -> Self {
        Self {
            zoom: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
            center_x,
            center_y,
        }
    }

    pub fn to_screen(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.center_x + self.pan_x + (x - self.center_x) * self.zoom,
            self.center_y + self.pan_y + (y - self.center_y) * self.zoom,
        )
    }

    pub fn to_world(&self, sx: f32, sy: f32) -> (f32, f32) {
        (
            self.center_x + (sx - self.center_x - self.pan_x) / self.zoom,
            self.center_y + (sy - self.center_y - self.pan_y) / self.zoom,
        )
    }

    /// The world-space rectangle visible on a canvas of the given size.
    pub fn visible(&self, canvas_w: f32, canvas_h: f32) -> Viewport {
        let (min_x, min_y) = self.to_world(0.0, 0.0);
        let (max_x, max_y) = self.to_world(canvas_w, canvas_h);
        Viewport {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }
}

/// Transient per-frame view bounds in base canvas space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Viewport {
    pub fn new(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Closed-interval inclusion test with a pixel margin. Purely geometric
    /// and stateless, hence idempotent when composed with itself.
    pub fn contains(&self, x: f32, y: f32, margin: f32) -> bool {
        x >= self.min_x - margin
            && x <= self.max_x + margin
            && y >= self.min_y - margin
            && y <= self.max_y + margin
    }

    /// Inclusion with the default 50 px culling margin.
    pub fn contains_with_default_margin(&self, x: f32, y: f32) -> bool {
        self.contains(x, y, VIEWPORT_MARGIN)
    }

    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }
}

/// Observability counters for one processing pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameStats {
    pub total: usize,
    pub rendered: usize,
    pub skipped: usize,
    /// Pre-sampling stride chosen by the decimation plan (1 = keep all).
    pub stride: usize,
    /// Theoretical distinguishable-point capacity of the visible dies.
    pub pixel_capacity: usize,
    /// Hard cap actually applied to this pass.
    pub budget: usize,
    pub processing_ms: f64,
}
