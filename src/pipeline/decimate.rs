// SPDX-License-Identifier: MIT

//! Pixel-capacity decimation.
//!
//! The sampling rate is tied to actual visual resolution: the theoretical
//! maximum number of distinguishable points is the number of visible dies
//! times the per-die pixel area. When the defect count exceeds that
//! capacity, a fixed-stride pre-sample brings the working set down to ~80%
//! of capacity and a per-pixel dedup keeps one defect per occupied pixel.
//! The whole plan is deterministic, so a single render pass never re-rolls
//! its sampling mid-frame.

use log::debug;

/// Pre-sample to this fraction of the pixel capacity before dedup.
const PRESAMPLE_FRACTION: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecimationPlan {
    /// Keep every `stride`-th defect, starting at index 0.
    pub stride: usize,
    /// Round positions to whole pixels and keep one defect per pixel.
    pub pixel_dedup: bool,
    /// Hard cap on the number of defects handed to the renderer.
    pub budget: usize,
    /// Theoretical distinguishable-point capacity of the visible dies.
    pub capacity: usize,
}

impl DecimationPlan {
    /// No decimation: everything is kept, bounded only by `budget`.
    pub fn keep_all(budget: usize) -> Self {
        Self {
            stride: 1,
            pixel_dedup: false,
            budget: budget.max(1),
            capacity: budget.max(1),
        }
    }

    /// Choose a plan for `total` defects spread over `visible_dies` dies of
    /// `die_px_w` x `die_px_h` on-screen pixels each, capped at
    /// `max_render` points.
    pub fn compute(
        total: usize,
        visible_dies: usize,
        die_px_w: f32,
        die_px_h: f32,
        max_render: usize,
    ) -> Self {
        let per_die_pixels = (die_px_w.max(1.0) * die_px_h.max(1.0)) as usize;
        let capacity = (visible_dies.max(1) * per_die_pixels.max(1)).max(1);
        let budget = max_render.max(1).min(capacity);

        if total <= budget {
            return Self {
                stride: 1,
                pixel_dedup: false,
                budget,
                capacity,
            };
        }

        let target = (capacity as f64 * PRESAMPLE_FRACTION).max(1.0);
        let stride = ((total as f64 / target).ceil() as usize).max(1);

        let plan = Self {
            stride,
            pixel_dedup: true,
            budget,
            capacity,
        };
        debug!(
            "decimation plan: total={total}, capacity={capacity}, budget={budget}, stride={stride}"
        );
        plan
    }

    /// Whether the defect at this position in the input survives the
    /// pre-sampling stride.
    pub fn keeps(&self, position: usize) -> bool {
        position % self.stride == 0
    }
}
