// SPDX-License-Identifier: MIT

//! A surface that records draw calls instead of painting. Used by the
//! integration tests and handy for headless debugging.

use crate::render::{Dot, DotShape, Rgba, Surface};

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Clear,
    FillCircle {
        cx: f32,
        cy: f32,
        radius: f32,
        fill: Rgba,
    },
    StrokeCircle {
        cx: f32,
        cy: f32,
        radius: f32,
        width: f32,
        color: Rgba,
    },
    FillRect {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        fill: Rgba,
    },
    StrokeRect {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        width: f32,
        color: Rgba,
        dashed: bool,
    },
    FillTriangle {
        points: [(f32, f32); 3],
        fill: Rgba,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        width: f32,
        color: Rgba,
    },
    Text {
        x: f32,
        y: f32,
        text: String,
        color: Rgba,
    },
    Dots {
        count: usize,
        shape: DotShape,
        fill: Rgba,
    },
}

#[derive(Debug, Clone)]
pub struct RecordingSurface {
    width: f32,
    height: f32,
    pub ops: Vec<DrawOp>,
    /// Flattened copy of every dot batch, for geometry assertions.
    pub dots: Vec<(Dot, Rgba, DotShape)>,
}

impl RecordingSurface {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            ops: Vec::new(),
            dots: Vec::new(),
        }
    }

    pub fn op_count(&self) -> usize {
        self.ops.len()
    }

    pub fn dot_count(&self) -> usize {
        self.dots.len()
    }
}

impl Surface for RecordingSurface {
    fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    fn clear(&mut self) {
        self.ops.push(DrawOp::Clear);
        self.dots.clear();
    }

    fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32, fill: Rgba) {
        self.ops.push(DrawOp::FillCircle { cx, cy, radius, fill });
    }

    fn stroke_circle(&mut self, cx: f32, cy: f32, radius: f32, width: f32, color: Rgba) {
        self.ops.push(DrawOp::StrokeCircle {
            cx,
            cy,
            radius,
            width,
            color,
        });
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, fill: Rgba) {
        self.ops.push(DrawOp::FillRect { x, y, w, h, fill });
    }

    fn stroke_rect(
        &mut self,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        width: f32,
        color: Rgba,
        dashed: bool,
    ) {
        self.ops.push(DrawOp::StrokeRect {
            x,
            y,
            w,
            h,
            width,
            color,
            dashed,
        });
    }

    fn fill_triangle(&mut self, points: [(f32, f32); 3], fill: Rgba, _stroke_width: f32, _stroke: Rgba) {
        self.ops.push(DrawOp::FillTriangle { points, fill });
    }

    fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, width: f32, color: Rgba) {
        self.ops.push(DrawOp::Line {
            x1,
            y1,
            x2,
            y2,
            width,
            color,
        });
    }

    fn text(&mut self, x: f32, y: f32, text: &str, _size: f32, color: Rgba) {
        self.ops.push(DrawOp::Text {
            x,
            y,
            text: text.to_string(),
            color,
        });
    }

    fn fill_dots(&mut self, dots: &[Dot], shape: DotShape, fill: Rgba, _stroke: Option<(f32, Rgba)>) {
        self.ops.push(DrawOp::Dots {
            count: dots.len(),
            shape,
            fill,
        });
        self.dots.extend(dots.iter().map(|&d| (d, fill, shape)));
    }
}
