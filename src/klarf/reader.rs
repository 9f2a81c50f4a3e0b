// SPDX-License-Identifier: MIT

use std::fs;
use std::path::Path;

use super::KlarfFile;
use crate::error::DataError;

pub struct KlarfReader;

impl KlarfReader {
    pub fn new() -> Self {
        Self
    }

    pub fn read<P: AsRef<Path>>(&self, path: P) -> Result<KlarfFile, DataError> {
        let path_str = path.as_ref().display().to_string();
        log::info!("loading defect file {path_str}");

        let content = fs::read_to_string(&path).map_err(|source| DataError::Io {
            path: path_str.clone(),
            source,
        })?;
        log::debug!("file size {} bytes", content.len());

        match super::parser::parse_klarf(&content) {
            Ok((_, file)) => {
                log::info!(
                    "parsed version {} with {} defect records, {} columns",
                    file.file_version,
                    file.records.len(),
                    file.columns.len()
                );
                Ok(file)
            }
            Err(e) => {
                let line = error_line(&content, &e);
                Err(DataError::Parse {
                    path: path_str,
                    line,
                    reason: format!("{e:?}"),
                })
            }
        }
    }
}

impl Default for KlarfReader {
    fn default() -> Self {
        Self::new()
    }
}

/// 1-based line of the unconsumed input where parsing stopped.
fn error_line(content: &str, err: &nom::Err<nom::error::Error<&str>>) -> usize {
    let remaining = match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => e.input,
        nom::Err::Incomplete(_) => return content.lines().count(),
    };
    let consumed = content.len().saturating_sub(remaining.len());
    content[..consumed].lines().count().max(1)
}
