// SPDX-License-Identifier: MIT

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{alpha1, alphanumeric1, char, multispace0},
    combinator::recognize,
    multi::many0,
    number::complete::double,
    sequence::pair,
    IResult, Parser,
};

use super::KlarfFile;

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))
    .parse(input)
}

/// Consume everything up to and including the next `;`. Used to skip
/// records this reader does not interpret.
fn skip_record(input: &str) -> IResult<&str, ()> {
    let (input, _) = take_while(|c| c != ';')(input)?;
    let (input, _) = tag(";")(input)?;
    Ok((input, ()))
}

/// All whitespace-separated numbers up to the terminating `;`.
fn number_list(input: &str) -> IResult<&str, Vec<f64>> {
    let mut values = Vec::new();
    let mut remaining = input;

    loop {
        let (rest, _) = multispace0(remaining)?;

        if rest.starts_with(';') {
            let (rest, _) = tag(";")(rest)?;
            return Ok((rest, values));
        }

        if let Ok((rest, value)) = double::<&str, nom::error::Error<&str>>(rest) {
            values.push(value);
            remaining = rest;
            continue;
        }

        break;
    }

    Err(nom::Err::Error(nom::error::Error::new(
        input,
        nom::error::ErrorKind::Float,
    )))
}

/// `DefectRecordSpec <count> NAME NAME ... ;`
fn record_spec(input: &str) -> IResult<&str, Vec<String>> {
    let (input, _) = multispace0(input)?;
    let (input, declared) = double(input)?;
    let mut columns = Vec::new();
    let mut remaining = input;

    loop {
        let (rest, _) = multispace0(remaining)?;

        if rest.starts_with(';') {
            let (rest, _) = tag(";")(rest)?;
            // Trust the names over the declared count; a mismatch is common
            // in hand-edited files and the names are what matter.
            if columns.len() != declared as usize {
                log::warn!(
                    "DefectRecordSpec declares {} columns, found {}",
                    declared as usize,
                    columns.len()
                );
            }
            return Ok((rest, columns));
        }

        if let Ok((rest, name)) = identifier(rest) {
            columns.push(name.to_string());
            remaining = rest;
            continue;
        }

        break;
    }

    Err(nom::Err::Error(nom::error::Error::new(
        input,
        nom::error::ErrorKind::Tag,
    )))
}

/// Parse a complete KLARF-style file. Records may appear in any order;
/// `DefectList` rows are sliced by the `DefectRecordSpec` column count, so
/// the spec record must precede the list.
pub fn parse_klarf(input: &str) -> IResult<&str, KlarfFile> {
    let mut file = KlarfFile::default();
    let mut remaining = input;

    loop {
        let (rest, _) = multispace0(remaining)?;
        if rest.is_empty() {
            break;
        }

        let (rest, keyword) = identifier(rest)?;
        match keyword.to_ascii_uppercase().as_str() {
            "FILEVERSION" => {
                let (rest, parts) = number_list(rest)?;
                file.file_version = parts
                    .iter()
                    .map(|v| format!("{}", *v as i64))
                    .collect::<Vec<_>>()
                    .join(".");
                remaining = rest;
            }
            "SAMPLESIZE" => {
                // First value is a unit selector, second the diameter in mm.
                let (rest, values) = number_list(rest)?;
                file.sample_size_mm = values.get(1).or_else(|| values.first()).copied();
                remaining = rest;
            }
            "DIEPITCH" => {
                let (rest, values) = number_list(rest)?;
                if values.len() == 2 {
                    file.die_pitch_um = Some((values[0], values[1]));
                }
                remaining = rest;
            }
            "DEFECTRECORDSPEC" => {
                let (rest, columns) = record_spec(rest)?;
                file.columns = columns;
                remaining = rest;
            }
            "DEFECTLIST" => {
                let (rest, values) = number_list(rest)?;
                if file.columns.is_empty() || values.len() % file.columns.len() != 0 {
                    return Err(nom::Err::Failure(nom::error::Error::new(
                        remaining,
                        nom::error::ErrorKind::Count,
                    )));
                }
                file.records = values
                    .chunks(file.columns.len())
                    .map(<[f64]>::to_vec)
                    .collect();
                remaining = rest;
            }
            "ENDOFFILE" => {
                let (rest, _) = multispace0(rest)?;
                let (rest, _) = nom::combinator::opt(char(';')).parse(rest)?;
                remaining = rest;
                break;
            }
            _ => {
                let (rest, ()) = skip_record(rest)?;
                remaining = rest;
            }
        }
    }

    Ok((remaining, file))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
FileVersion 1 2;
FileTimestamp 08-30-26 10:14:02;
SampleSize 1 300;
DiePitch 10000.0 8000.0;
DefectRecordSpec 5 DEFECTID XREL YREL XINDEX YINDEX ;
DefectList
 1 2500.0 4000.0 3 -2
 2 9999.0 0.0 -1 5
;
EndOfFile;
";

    #[test]
    fn parses_sample_file() {
        let (rest, file) = parse_klarf(SAMPLE).expect("parse should succeed");
        assert!(rest.trim().is_empty());
        assert_eq!(file.file_version, "1.2");
        assert_eq!(file.sample_size_mm, Some(300.0));
        assert_eq!(file.die_pitch_um, Some((10000.0, 8000.0)));
        assert_eq!(file.columns.len(), 5);
        assert_eq!(file.records.len(), 2);
        assert_eq!(file.records[0], vec![1.0, 2500.0, 4000.0, 3.0, -2.0]);
    }

    #[test]
    fn skips_unknown_records() {
        let input = "InspectionStationID \"X\" \"Y\";\nDiePitch 100.0 100.0;\nEndOfFile;";
        let (_, file) = parse_klarf(input).expect("parse should succeed");
        assert_eq!(file.die_pitch_um, Some((100.0, 100.0)));
    }

    #[test]
    fn rejects_misaligned_defect_list() {
        let input = "DefectRecordSpec 2 XREL YREL ;\nDefectList 1.0 2.0 3.0;\nEndOfFile;";
        assert!(parse_klarf(input).is_err());
    }
}
