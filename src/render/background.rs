// SPDX-License-Identifier: MIT

//! Background layer: wafer discs, notch, dies, reticle borders.
//!
//! Repainted only when the wafer config, canvas size, or zoom/pan changes;
//! the owner tracks that dirtiness.

use crate::error::RenderError;
use crate::pipeline::ViewTransform;
use crate::render::{Rgba, Surface};
use crate::wafer::{DieGrid, NotchPosition, WaferConfig};

const WAFER_OUTER_FILL: Rgba = Rgba::new(224, 224, 224, 255);
const WAFER_OUTER_STROKE: Rgba = Rgba::new(153, 153, 153, 255);
const WAFER_INNER_FILL: Rgba = Rgba::new(245, 245, 245, 255);
const WAFER_INNER_STROKE: Rgba = Rgba::new(102, 102, 102, 255);
const DIE_FILL: Rgba = Rgba::new(64, 158, 255, 255);
const NOTCH_FILL: Rgba = Rgba::new(255, 255, 255, 255);
const NOTCH_STROKE: Rgba = Rgba::new(102, 102, 102, 255);
const RETICLE_STROKE: Rgba = Rgba::new(255, 107, 107, 255);

const NOTCH_SIZE: f32 = 10.0;

pub fn render_background<S: Surface>(
    surface: &mut S,
    config: &WaferConfig,
    grid: &DieGrid,
    transform: &ViewTransform,
) -> Result<(), RenderError> {
    if !transform.zoom.is_finite() || transform.zoom <= 0.0 {
        return Err(RenderError::new(
            "background",
            format!("non-positive zoom {}", transform.zoom),
        ));
    }

    surface.clear();

    let zoom = transform.zoom;
    let (cx, cy) = transform.to_screen(grid.center_x, grid.center_y);
    let outer = grid.outer_radius * zoom;
    let inner = grid.inner_radius * zoom;

    // Outer disc is the full wafer, inner disc the effective area after edge
    // exclusion.
    surface.fill_circle(cx, cy, outer, WAFER_OUTER_FILL);
    surface.stroke_circle(cx, cy, outer, 2.0, WAFER_OUTER_STROKE);
    surface.fill_circle(cx, cy, inner, WAFER_INNER_FILL);
    surface.stroke_circle(cx, cy, inner, 1.5, WAFER_INNER_STROKE);

    draw_notch(surface, config.notch, cx, cy, outer);

    let die_w = grid.die_px_w * zoom;
    let die_h = grid.die_px_h * zoom;
    for die in &grid.positions {
        let (x, y) = transform.to_screen(die.canvas_x, die.canvas_y);
        surface.fill_rect(x, y, die_w, die_h, DIE_FILL);
    }

    if config.show_reticle_border {
        let stroke_width =
            (config.scribe_line_x.max(config.scribe_line_y) * grid.scale as f64) as f32 * zoom;
        for tile in grid.reticle_tiles(config) {
            let (x, y) = transform.to_screen(tile.x, tile.y);
            surface.stroke_rect(
                x,
                y,
                tile.width * zoom,
                tile.height * zoom,
                stroke_width.max(0.5),
                RETICLE_STROKE,
                false,
            );
        }
    }

    Ok(())
}

fn draw_notch<S: Surface>(surface: &mut S, notch: NotchPosition, cx: f32, cy: f32, radius: f32) {
    let n = NOTCH_SIZE;
    let points = match notch {
        NotchPosition::Up => [
            (cx - n, cy - radius),
            (cx, cy - radius - n),
            (cx + n, cy - radius),
        ],
        NotchPosition::Down => [
            (cx - n, cy + radius),
            (cx, cy + radius + n),
            (cx + n, cy + radius),
        ],
        NotchPosition::Left => [
            (cx - radius, cy - n),
            (cx - radius - n, cy),
            (cx - radius, cy + n),
        ],
        NotchPosition::Right => [
            (cx + radius, cy - n),
            (cx + radius + n, cy),
            (cx + radius, cy + n),
        ],
    };
    surface.fill_triangle(points, NOTCH_FILL, 2.0, NOTCH_STROKE);
}
