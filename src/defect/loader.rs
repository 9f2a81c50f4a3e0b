// SPDX-License-Identifier: MIT

//! CSV defect ingest.
//!
//! Expected header: `die_row,die_col,x,y,class[,size]` with `x`/`y` as
//! fractions of the die footprint.

use std::path::Path;

use log::info;
use serde::Deserialize;

use crate::defect::{Defect, DefectClass, DefectSet};
use crate::error::DataError;

#[derive(Debug, Deserialize)]
struct CsvDefectRecord {
    die_row: i32,
    die_col: i32,
    x: f32,
    y: f32,
    class: String,
    size: Option<f32>,
}

pub fn load_defects_csv<P: AsRef<Path>>(path: P) -> Result<DefectSet, DataError> {
    let path_str = path.as_ref().display().to_string();
    let mut reader = csv::Reader::from_path(path.as_ref()).map_err(|e| match e.kind() {
        csv::ErrorKind::Io(_) => DataError::Io {
            path: path_str.clone(),
            source: std::io::Error::other(e.to_string()),
        },
        _ => DataError::Parse {
            path: path_str.clone(),
            line: 0,
            reason: e.to_string(),
        },
    })?;

    let mut defects = Vec::new();
    for (index, result) in reader.deserialize().enumerate() {
        // Header occupies line 1.
        let record: CsvDefectRecord = result.map_err(|e| DataError::Parse {
            path: path_str.clone(),
            line: index + 2,
            reason: e.to_string(),
        })?;

        let class = DefectClass::from_label(&record.class).map_err(|source| DataError::Record {
            index,
            source,
        })?;

        defects.push(Defect {
            die_row: record.die_row,
            die_col: record.die_col,
            x: record.x,
            y: record.y,
            class,
            size: record.size,
        });
    }

    info!("loaded {} defects from {}", defects.len(), path_str);
    DefectSet::new(defects)
}
