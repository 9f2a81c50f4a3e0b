// SPDX-License-Identifier: MIT

use csv::Writer;
use serde::Serialize;
use std::fs::File;
use std::path::Path;

use crate::defect::DefectClass;
use crate::error::DataError;
use crate::interact::DieInfo;

#[derive(Debug, Serialize)]
pub struct DieCsvRecord {
    #[serde(rename = "Row")]
    pub row: i32,
    #[serde(rename = "Col")]
    pub col: i32,
    #[serde(rename = "X (mm)")]
    pub physical_x: f64,
    #[serde(rename = "Y (mm)")]
    pub physical_y: f64,
    #[serde(rename = "Defects")]
    pub defects: usize,
    #[serde(rename = "Classes")]
    pub classes: String,
}

/// Format the defect class mix of a die as "scratch:3,particle:1".
fn format_classes(die: &DieInfo) -> String {
    DefectClass::ALL
        .iter()
        .filter_map(|class| {
            let count = die.defects.iter().filter(|d| d.class == *class).count();
            (count > 0).then(|| format!("{}:{count}", class.label()))
        })
        .collect::<Vec<String>>()
        .join(",")
}

fn die_to_csv_record(die: &DieInfo) -> DieCsvRecord {
    DieCsvRecord {
        row: die.row,
        col: die.col,
        physical_x: die.physical_x,
        physical_y: die.physical_y,
        defects: die.defects.len(),
        classes: format_classes(die),
    }
}

/// Export a die selection to a CSV file, one record per die.
pub fn export_selection_to_csv<P: AsRef<Path>>(
    selection: &[DieInfo],
    file_path: P,
) -> Result<(), DataError> {
    let path_str = file_path.as_ref().display().to_string();
    let file = File::create(&file_path).map_err(|source| DataError::Io {
        path: path_str.clone(),
        source,
    })?;
    let mut writer = Writer::from_writer(file);

    for die in selection {
        writer
            .serialize(die_to_csv_record(die))
            .map_err(|e| DataError::processing("selection export", e.to_string()))?;
    }

    writer
        .flush()
        .map_err(|source| DataError::Io {
            path: path_str.clone(),
            source,
        })?;
    log::info!("exported {} selected dies to {path_str}", selection.len());
    Ok(())
}

/// Serialize a die selection into CSV text without touching the filesystem.
pub fn selection_to_csv_string(selection: &[DieInfo]) -> Result<String, DataError> {
    let mut writer = Writer::from_writer(Vec::new());
    for die in selection {
        writer
            .serialize(die_to_csv_record(die))
            .map_err(|e| DataError::processing("selection export", e.to_string()))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| DataError::processing("selection export", e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| DataError::processing("selection export", e.to_string()))
}
