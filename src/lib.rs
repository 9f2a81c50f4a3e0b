//! Wafer Map Viewer Library
//!
//! This library renders semiconductor wafer maps with die grids and defect
//! overlays: grid generation from physical wafer parameters, O(1) defect
//! indexing, decimation and viewport culling for large defect sets, layered
//! rendering behind a surface abstraction, and interaction handling for
//! zoom, pan, selection, and hover.

pub mod defect;
pub mod error;
pub mod export;
pub mod interact;
pub mod klarf;
pub mod pipeline;
pub mod render;
pub mod wafer;

// Re-export commonly used types
pub use defect::{Defect, DefectClass, DefectIndex, DefectSet};
pub use error::{ConfigError, DataError, RenderError, SurfaceInitError};
pub use interact::{DieInfo, InteractionController, InteractionEvent};
pub use pipeline::{DefectProcessor, ProcessedFrame, ViewTransform, Viewport};
pub use render::{Layer, LayerStack, Rgba, Surface};
pub use wafer::{DieGrid, RenderOptions, WaferConfig};
