// SPDX-License-Identifier: MIT

//! KLARF-style defect file support.
//!
//! Supports the record subset needed to place defects on a wafer map:
//! `FileVersion`, `SampleSize`, `DiePitch`, `DefectRecordSpec`,
//! `DefectList`, `EndOfFile`. Unknown records are skipped. `XINDEX` /
//! `YINDEX` give the die coordinate; `XREL` / `YREL` are micrometers from
//! the die origin and are normalized by the die pitch into the 0..=1 in-die
//! position the renderer works with.

use serde::{Deserialize, Serialize};

use crate::defect::{Defect, DefectClass};
use crate::error::DataError;

pub mod parser;
pub mod reader;

pub use parser::parse_klarf;
pub use reader::KlarfReader;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KlarfFile {
    pub file_version: String,
    /// Wafer diameter in mm, from `SampleSize`.
    pub sample_size_mm: Option<f64>,
    /// Die pitch in micrometers, from `DiePitch`.
    pub die_pitch_um: Option<(f64, f64)>,
    /// Column names from `DefectRecordSpec`, in file order.
    pub columns: Vec<String>,
    /// One row per defect, index-aligned with `columns`.
    pub records: Vec<Vec<f64>>,
}

impl KlarfFile {
    fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }

    /// Convert raw records into validated defects. Fails on the first bad
    /// row; no partial list is returned.
    pub fn to_defects(&self) -> Result<Vec<Defect>, DataError> {
        let (pitch_x, pitch_y) = self.die_pitch_um.ok_or_else(|| {
            DataError::processing("klarf conversion", "DiePitch record is missing")
        })?;
        if pitch_x <= 0.0 || pitch_y <= 0.0 {
            return Err(DataError::processing(
                "klarf conversion",
                format!("non-positive die pitch {pitch_x} x {pitch_y}"),
            ));
        }

        let xrel = self.require_column("XREL")?;
        let yrel = self.require_column("YREL")?;
        let xindex = self.require_column("XINDEX")?;
        let yindex = self.require_column("YINDEX")?;
        let class_col = self.column("CLASSNUMBER");
        let size_col = self.column("DEFECTAREA");

        let mut defects = Vec::with_capacity(self.records.len());
        for (index, row) in self.records.iter().enumerate() {
            let get = |col: usize| -> Result<f64, DataError> {
                row.get(col).copied().ok_or_else(|| {
                    DataError::processing(
                        "klarf conversion",
                        format!("row {index} has {} fields, need {}", row.len(), col + 1),
                    )
                })
            };

            let defect = Defect {
                die_col: get(xindex)? as i32,
                die_row: get(yindex)? as i32,
                x: (get(xrel)? / pitch_x) as f32,
                y: (get(yrel)? / pitch_y) as f32,
                class: match class_col {
                    Some(col) => DefectClass::from_code(get(col)? as u32),
                    None => DefectClass::Other,
                },
                // DEFECTAREA is um^2; treat its square root as a diameter
                // and store mm.
                size: match size_col {
                    Some(col) => {
                        let area = get(col)?;
                        (area > 0.0).then(|| (area.sqrt() / 1000.0) as f32)
                    }
                    None => None,
                },
            };

            defect
                .validate()
                .map_err(|source| DataError::Record { index, source })?;
            defects.push(defect);
        }

        Ok(defects)
    }

    fn require_column(&self, name: &str) -> Result<usize, DataError> {
        self.column(name).ok_or_else(|| {
            DataError::processing(
                "klarf conversion",
                format!("DefectRecordSpec lacks required column {name}"),
            )
        })
    }
}
