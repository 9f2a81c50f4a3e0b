// SPDX-License-Identifier: MIT

//! Error taxonomy for the wafer map core.
//!
//! Every error carries enough structured context (field, value, reason) to
//! reconstruct the failing input without re-running the operation.

use thiserror::Error;

/// Structural validation failure in a [`WaferConfig`](crate::wafer::WaferConfig)
/// or a defect record. Fatal to the operation that raised it; values are never
/// silently clamped.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("invalid configuration: {field} = {value} ({reason})")]
pub struct ConfigError {
    pub field: String,
    pub value: String,
    pub reason: String,
}

impl ConfigError {
    pub fn new(
        field: impl Into<String>,
        value: impl std::fmt::Display,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// A drawing surface could not be acquired or sized. Fatal, no retry.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("failed to initialize {layer} surface: {reason}")]
pub struct SurfaceInitError {
    pub layer: String,
    pub reason: String,
}

impl SurfaceInitError {
    pub fn new(layer: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            layer: layer.into(),
            reason: reason.into(),
        }
    }
}

/// A single layer failed to draw. Recovered at the frame boundary: the layer
/// is skipped for that frame, other layers still paint.
#[derive(Debug, Error)]
#[error("failed to render layer {layer}: {cause}")]
pub struct RenderError {
    pub layer: String,
    pub cause: String,
}

impl RenderError {
    pub fn new(layer: impl Into<String>, cause: impl Into<String>) -> Self {
        Self {
            layer: layer.into(),
            cause: cause.into(),
        }
    }
}

/// Failure inside index building, decimation, file parsing, or frame
/// processing. Builds are all-or-nothing: no partially built index is ever
/// left in place.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("defect processing failed during {operation}: {reason}")]
    Processing { operation: String, reason: String },

    #[error("defect data invalid at record {index}: {source}")]
    Record {
        index: usize,
        #[source]
        source: ConfigError,
    },

    #[error("parallel-array defect data mismatched: logicx has {x_len} entries, logicy has {y_len}")]
    ArrayLengthMismatch { x_len: usize, y_len: usize },

    #[error("failed to parse {path} at line {line}: {reason}")]
    Parse {
        path: String,
        line: usize,
        reason: String,
    },

    #[error("i/o error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl DataError {
    pub fn processing(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Processing {
            operation: operation.into(),
            reason: reason.into(),
        }
    }
}
