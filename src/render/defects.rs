// SPDX-License-Identifier: MIT

//! Defect layer: color-batched point drawing.
//!
//! All defects sharing a color are submitted as a single batch to minimize
//! draw calls. Dots with an on-screen radius of a pixel or less are drawn
//! as filled squares, which is several times faster than circular arcs at a
//! size where the difference is invisible.

use crate::error::RenderError;
use crate::pipeline::ProcessedFrame;
use crate::render::{Dot, DotShape, Rgba, Surface};

const DOT_STROKE: Rgba = Rgba::new(255, 255, 255, 204);
const DOT_STROKE_WIDTH: f32 = 0.5;

/// Radius at or below which dots become squares.
const SQUARE_CUTOFF: f32 = 1.0;

pub fn render_defects<S: Surface>(
    surface: &mut S,
    frame: &ProcessedFrame,
) -> Result<(), RenderError> {
    surface.clear();

    for (color, dots) in &frame.groups {
        let (squares, circles): (Vec<Dot>, Vec<Dot>) =
            dots.iter().partition(|d| d.radius <= SQUARE_CUTOFF);

        if !squares.is_empty() {
            surface.fill_dots(&squares, DotShape::Square, *color, None);
        }
        if !circles.is_empty() {
            surface.fill_dots(
                &circles,
                DotShape::Circle,
                *color,
                Some((DOT_STROKE_WIDTH, DOT_STROKE)),
            );
        }
    }

    Ok(())
}
