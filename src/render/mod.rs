// SPDX-License-Identifier: MIT

//! Layered rendering over an abstract drawing surface.
//!
//! The engine never touches a concrete backend; the GUI supplies an egui
//! painter adapter and the tests supply a recording surface. Three surfaces
//! back the three layers: background (wafer, dies, reticle), defects, and
//! interaction overlays, each cleared independently.

use serde::{Deserialize, Serialize};

use crate::error::SurfaceInitError;

pub mod background;
pub mod defects;
pub mod overlay;
pub mod recording;

pub use recording::{DrawOp, RecordingSurface};

/// Straight-alpha RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const WHITE: Rgba = Rgba::new(255, 255, 255, 255);
    pub const BLACK: Rgba = Rgba::new(0, 0, 0, 255);
}

/// One rendered defect point in screen space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dot {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

/// How a dot batch is filled. Sub-pixel dots are drawn as squares; circular
/// arcs at that size cost several times more for no visible difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DotShape {
    Circle,
    Square,
}

/// Minimal 2D drawing surface. One instance per layer, all sized identically
/// to the canvas.
pub trait Surface {
    fn size(&self) -> (f32, f32);
    fn clear(&mut self);

    fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32, fill: Rgba);
    fn stroke_circle(&mut self, cx: f32, cy: f32, radius: f32, width: f32, color: Rgba);
    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, fill: Rgba);
    fn stroke_rect(&mut self, x: f32, y: f32, w: f32, h: f32, width: f32, color: Rgba, dashed: bool);
    fn fill_triangle(&mut self, points: [(f32, f32); 3], fill: Rgba, stroke_width: f32, stroke: Rgba);
    fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, width: f32, color: Rgba);
    fn text(&mut self, x: f32, y: f32, text: &str, size: f32, color: Rgba);

    /// Batched dot drawing; one call per color group.
    fn fill_dots(&mut self, dots: &[Dot], shape: DotShape, fill: Rgba, stroke: Option<(f32, Rgba)>);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    Background,
    Defects,
    Interaction,
}

impl Layer {
    pub const ALL: [Layer; 3] = [Layer::Background, Layer::Defects, Layer::Interaction];

    pub fn name(&self) -> &'static str {
        match self {
            Layer::Background => "background",
            Layer::Defects => "defects",
            Layer::Interaction => "interaction",
        }
    }
}

/// The three drawing surfaces of one rendering session. Resizing recreates
/// all surfaces at once; cached geometry must be invalidated by the owner.
#[derive(Debug)]
pub struct LayerStack<S: Surface> {
    background: S,
    defects: S,
    interaction: S,
}

impl<S: Surface> LayerStack<S> {
    /// Build all three surfaces through a factory. Any single failure fails
    /// the whole stack.
    pub fn init<F>(mut make: F) -> Result<Self, SurfaceInitError>
    where
        F: FnMut(Layer) -> Result<S, SurfaceInitError>,
    {
        Ok(Self {
            background: make(Layer::Background)?,
            defects: make(Layer::Defects)?,
            interaction: make(Layer::Interaction)?,
        })
    }

    pub fn get_mut(&mut self, layer: Layer) -> &mut S {
        match layer {
            Layer::Background => &mut self.background,
            Layer::Defects => &mut self.defects,
            Layer::Interaction => &mut self.interaction,
        }
    }

    pub fn get(&self, layer: Layer) -> &S {
        match layer {
            Layer::Background => &self.background,
            Layer::Defects => &self.defects,
            Layer::Interaction => &self.interaction,
        }
    }

    pub fn clear_all(&mut self) {
        for layer in Layer::ALL {
            self.get_mut(layer).clear();
        }
    }
}
