// SPDX-License-Identifier: MIT

//! Interaction layer: rubber-band selection rectangle and selected-defect
//! labels with connector lines. Never draws die or defect geometry.

use crate::error::RenderError;
use crate::interact::labels::{LabelBox, LabelLayoutParams};
use crate::render::{Rgba, Surface};

const SELECTION_FILL: Rgba = Rgba::new(173, 216, 230, 77);
const SELECTION_STROKE: Rgba = Rgba::new(64, 158, 255, 255);
const SELECTION_STROKE_WIDTH: f32 = 2.0;

const LABEL_FILL: Rgba = Rgba::new(255, 255, 255, 255);
const LABEL_STROKE: Rgba = Rgba::new(0, 0, 0, 255);
const LABEL_TEXT: Rgba = Rgba::new(0, 0, 0, 255);
const LABEL_PADDING: f32 = 8.0;
const LABEL_LINE_HEIGHT: f32 = 14.0;
const LABEL_FONT_SIZE: f32 = 10.0;

/// Screen-space selection rectangle, normalized (min corner + size).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

pub fn render_overlay<S: Surface>(
    surface: &mut S,
    selection: Option<SelectionRect>,
    labels: &[LabelBox],
    params: &LabelLayoutParams,
) -> Result<(), RenderError> {
    surface.clear();

    if let Some(rect) = selection {
        surface.fill_rect(rect.x, rect.y, rect.width, rect.height, SELECTION_FILL);
        surface.stroke_rect(
            rect.x,
            rect.y,
            rect.width,
            rect.height,
            SELECTION_STROKE_WIDTH,
            SELECTION_STROKE,
            true,
        );
    }

    for label in labels {
        // Connector from the defect to the left-edge midpoint of the box.
        surface.line(
            label.anchor_x,
            label.anchor_y,
            label.x,
            label.y + params.height / 2.0,
            1.0,
            LABEL_STROKE,
        );

        surface.fill_rect(label.x, label.y, params.width, params.height, LABEL_FILL);
        surface.stroke_rect(
            label.x,
            label.y,
            params.width,
            params.height,
            1.0,
            LABEL_STROKE,
            false,
        );

        let text_x = label.x + LABEL_PADDING;
        let mut text_y = label.y + LABEL_PADDING;
        for line in &label.lines {
            surface.text(text_x, text_y, line, LABEL_FONT_SIZE, LABEL_TEXT);
            text_y += LABEL_LINE_HEIGHT;
        }
    }

    Ok(())
}
