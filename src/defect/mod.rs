// SPDX-License-Identifier: MIT

//! Defect data model.
//!
//! Defects are immutable inputs to the rendering pipeline: an integer die
//! coordinate, a fractional position inside that die, a classification, and
//! an optional physical size. Extra per-defect columns from file imports are
//! kept in a side table on [`DefectSet`] so the core struct stays closed.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, DataError};
use crate::render::Rgba;

pub mod index;
pub mod loader;
pub mod spatial;

pub use index::{DefectIndex, IndexStats};
pub use spatial::SpatialGrid;

/// Die grid coordinate, `(row, col)`.
pub type DieKey = (i32, i32);

/// Closed defect classification. Unknown labels and codes map to
/// [`DefectClass::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefectClass {
    Scratch,
    Particle,
    Void,
    Crack,
    Contamination,
    Other,
}

impl DefectClass {
    /// Parse a textual label. Empty labels are rejected; unknown non-empty
    /// labels fall back to `Other`.
    pub fn from_label(label: &str) -> Result<Self, ConfigError> {
        let trimmed = label.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::new("defect.class", label, "cannot be empty"));
        }
        Ok(match trimmed.to_ascii_lowercase().as_str() {
            "scratch" => Self::Scratch,
            "particle" => Self::Particle,
            "void" => Self::Void,
            "crack" => Self::Crack,
            "contamination" => Self::Contamination,
            _ => Self::Other,
        })
    }

    /// Numeric class code as used by KLARF-style defect records.
    pub fn from_code(code: u32) -> Self {
        match code {
            1 => Self::Scratch,
            2 => Self::Particle,
            3 => Self::Void,
            4 => Self::Crack,
            5 => Self::Contamination,
            _ => Self::Other,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Scratch => "scratch",
            Self::Particle => "particle",
            Self::Void => "void",
            Self::Crack => "crack",
            Self::Contamination => "contamination",
            Self::Other => "other",
        }
    }

    /// Display color for this class.
    pub fn color(&self) -> Rgba {
        match self {
            Self::Scratch => Rgba::new(255, 68, 68, 255),
            Self::Particle => Rgba::new(255, 165, 0, 255),
            Self::Void => Rgba::new(147, 112, 219, 255),
            Self::Crack => Rgba::new(220, 20, 60, 255),
            Self::Contamination => Rgba::new(255, 215, 0, 255),
            Self::Other => Rgba::new(255, 0, 0, 255),
        }
    }

    pub const ALL: [DefectClass; 6] = [
        Self::Scratch,
        Self::Particle,
        Self::Void,
        Self::Crack,
        Self::Contamination,
        Self::Other,
    ];
}

/// A single point defect. Never mutated by the rendering pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Defect {
    pub die_row: i32,
    pub die_col: i32,
    /// Position inside the die, `0..=1` of the die width.
    pub x: f32,
    /// Position inside the die, `0..=1` of the die height.
    pub y: f32,
    pub class: DefectClass,
    /// Physical size in mm.
    pub size: Option<f32>,
}

impl Defect {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.x) {
            return Err(ConfigError::new("defect.x", self.x, "must be between 0 and 1"));
        }
        if !(0.0..=1.0).contains(&self.y) {
            return Err(ConfigError::new("defect.y", self.y, "must be between 0 and 1"));
        }
        if let Some(size) = self.size {
            if size <= 0.0 {
                return Err(ConfigError::new("defect.size", size, "must be positive"));
            }
        }
        Ok(())
    }

    pub fn die_key(&self) -> DieKey {
        (self.die_row, self.die_col)
    }
}

/// A value in the extras side table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtraValue {
    Number(f64),
    Text(String),
}

/// An owned defect collection plus extra columns carried through file
/// conversion. Column vectors are index-aligned with `defects`.
#[derive(Debug, Clone, Default)]
pub struct DefectSet {
    defects: Vec<Defect>,
    extras: HashMap<String, Vec<ExtraValue>>,
}

impl DefectSet {
    /// Build from validated defects. Every record is checked; the first
    /// failure aborts the whole construction.
    pub fn new(defects: Vec<Defect>) -> Result<Self, DataError> {
        for (index, defect) in defects.iter().enumerate() {
            defect
                .validate()
                .map_err(|source| DataError::Record { index, source })?;
        }
        Ok(Self {
            defects,
            extras: HashMap::new(),
        })
    }

    /// Lossless adapter from the parallel-array wire format: `logicx[i]` /
    /// `logicy[i]` are absolute wafer coordinates in mm, converted to a die
    /// coordinate plus in-die fraction using the die pitch. Columns beyond
    /// the recognized ones travel in `extras`, index-aligned with the
    /// coordinate arrays, and come out through [`DefectSet::extra`].
    pub fn from_arrays(
        logicx: &[f64],
        logicy: &[f64],
        classes: Option<&[String]>,
        extras: Vec<(String, Vec<ExtraValue>)>,
        pitch_x: f64,
        pitch_y: f64,
    ) -> Result<Self, DataError> {
        if logicx.len() != logicy.len() {
            return Err(DataError::ArrayLengthMismatch {
                x_len: logicx.len(),
                y_len: logicy.len(),
            });
        }
        if pitch_x <= 0.0 || pitch_y <= 0.0 {
            return Err(DataError::processing(
                "array conversion",
                format!("die pitch must be positive, got {pitch_x} x {pitch_y}"),
            ));
        }

        let mut defects = Vec::with_capacity(logicx.len());
        for (index, (&lx, &ly)) in logicx.iter().zip(logicy).enumerate() {
            let (die_col, x) = split_logical(lx, pitch_x);
            let (die_row, y) = split_logical(ly, pitch_y);

            let class = match classes.and_then(|c| c.get(index)) {
                Some(label) => DefectClass::from_label(label)
                    .map_err(|source| DataError::Record { index, source })?,
                None => DefectClass::Other,
            };

            defects.push(Defect {
                die_row,
                die_col,
                x,
                y,
                class,
                size: None,
            });
        }

        let mut set = Self::new(defects)?;
        for (name, values) in extras {
            set.add_extra_column(name, values)?;
        }
        Ok(set)
    }

    /// Attach an extra column. The column must be index-aligned with the
    /// defect list.
    pub fn add_extra_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<ExtraValue>,
    ) -> Result<(), DataError> {
        let name = name.into();
        if values.len() != self.defects.len() {
            return Err(DataError::processing(
                "extras",
                format!(
                    "column {name} has {} entries for {} defects",
                    values.len(),
                    self.defects.len()
                ),
            ));
        }
        self.extras.insert(name, values);
        Ok(())
    }

    pub fn defects(&self) -> &[Defect] {
        &self.defects
    }

    pub fn len(&self) -> usize {
        self.defects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defects.is_empty()
    }

    pub fn extra(&self, column: &str, index: usize) -> Option<&ExtraValue> {
        self.extras.get(column)?.get(index)
    }

    pub fn extra_columns(&self) -> impl Iterator<Item = &str> {
        self.extras.keys().map(String::as_str)
    }

    pub fn into_defects(self) -> Vec<Defect> {
        self.defects
    }
}

/// Split an absolute wafer coordinate into a die index and in-die fraction.
/// Uses euclidean division so negative coordinates land in negative dies
/// with the fraction still in `[0, 1)`.
fn split_logical(coord: f64, pitch: f64) -> (i32, f32) {
    let die = (coord / pitch).floor();
    let rel = (coord - die * pitch) / pitch;
    (die as i32, rel as f32)
}
