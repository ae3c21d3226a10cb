use crate::core::models::observation::RawObservation;
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Deserialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContactFileError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Parse error on line {line}: {message}")]
    Parse { line: u64, message: String },
    #[error("Cannot infer layout: {rows} data rows with {columns} columns")]
    UnknownLayout { rows: usize, columns: usize },
    #[error("Matrix row on line {line} has {found} columns, expected {expected}")]
    RaggedMatrix {
        line: u64,
        expected: usize,
        found: usize,
    },
    #[error("Input contains no contact records")]
    Empty,
}

/// Layout of a contact file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactFormat {
    /// One `pos1 pos2 frequency` triple per line.
    List,
    /// Dense square matrix; row and column indices are the positions.
    Matrix,
}

impl ContactFormat {
    /// A file whose rows all have as many columns as there are rows is a
    /// matrix, except for the 3x3 case which is read as a three-line list.
    fn detect(rows: &[(u64, StringRecord)]) -> Result<Self, ContactFileError> {
        let Some((_, first)) = rows.first() else {
            return Err(ContactFileError::Empty);
        };
        let columns = first.len();
        if columns == 3 {
            return Ok(ContactFormat::List);
        }
        if columns == rows.len() {
            return Ok(ContactFormat::Matrix);
        }
        Err(ContactFileError::UnknownLayout {
            rows: rows.len(),
            columns,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ContactRecord(u64, u64, f64);

/// Reads contacts, inferring the layout from the data.
pub fn read_contacts(reader: impl Read) -> Result<Vec<RawObservation>, ContactFileError> {
    let rows = read_rows(reader)?;
    let format = ContactFormat::detect(&rows)?;
    convert_rows(rows, format)
}

/// Reads contacts in a known layout.
pub fn read_contacts_as(
    reader: impl Read,
    format: ContactFormat,
) -> Result<Vec<RawObservation>, ContactFileError> {
    let rows = read_rows(reader)?;
    if rows.is_empty() {
        return Err(ContactFileError::Empty);
    }
    convert_rows(rows, format)
}

pub fn read_contacts_from_path<P: AsRef<Path>>(
    path: P,
    format: Option<ContactFormat>,
) -> Result<Vec<RawObservation>, ContactFileError> {
    let file = BufReader::new(File::open(path)?);
    match format {
        Some(format) => read_contacts_as(file, format),
        None => read_contacts(file),
    }
}

fn convert_rows(
    rows: Vec<(u64, StringRecord)>,
    format: ContactFormat,
) -> Result<Vec<RawObservation>, ContactFileError> {
    match format {
        ContactFormat::List => rows_to_list(rows),
        ContactFormat::Matrix => rows_to_matrix(rows),
    }
}

/// Splits the input into non-empty records, tagging each with its line number.
/// The delimiter is taken from the first data line: tab, then comma, else spaces.
fn read_rows(mut reader: impl Read) -> Result<Vec<(u64, StringRecord)>, ContactFileError> {
    let mut content = Vec::new();
    reader.read_to_end(&mut content)?;

    let delimiter = content
        .as_slice()
        .lines()
        .map_while(Result::ok)
        .find(|line| !line.trim().is_empty() && !line.trim_start().starts_with('#'))
        .map(|line| {
            if line.contains('\t') {
                b'\t'
            } else if line.contains(',') {
                b','
            } else {
                b' '
            }
        })
        .unwrap_or(b'\t');

    let mut csv_reader = ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .comment(Some(b'#'))
        .flexible(true)
        .trim(Trim::All)
        .from_reader(content.as_slice());

    let mut rows = Vec::new();
    for result in csv_reader.records() {
        let record = result?;
        let line = record.position().map_or(0, |p| p.line());
        let fields: StringRecord = record.iter().filter(|f| !f.is_empty()).collect();
        if !fields.is_empty() {
            rows.push((line, fields));
        }
    }
    Ok(rows)
}

fn rows_to_list(rows: Vec<(u64, StringRecord)>) -> Result<Vec<RawObservation>, ContactFileError> {
    rows.into_iter()
        .map(|(line, record)| {
            if record.len() != 3 {
                return Err(ContactFileError::Parse {
                    line,
                    message: format!("expected 3 fields, found {}", record.len()),
                });
            }
            let ContactRecord(pos1, pos2, frequency) =
                record
                    .deserialize(None)
                    .map_err(|e: csv::Error| ContactFileError::Parse {
                        line,
                        message: e.to_string(),
                    })?;
            Ok(RawObservation::new(pos1, pos2, frequency))
        })
        .collect()
}

fn rows_to_matrix(rows: Vec<(u64, StringRecord)>) -> Result<Vec<RawObservation>, ContactFileError> {
    let size = rows.len();
    let mut observations = Vec::new();
    for (i, (line, record)) in rows.into_iter().enumerate() {
        if record.len() != size {
            return Err(ContactFileError::RaggedMatrix {
                line,
                expected: size,
                found: record.len(),
            });
        }
        for (j, field) in record.iter().enumerate().skip(i + 1) {
            let value: f64 = field.parse().map_err(|_| ContactFileError::Parse {
                line,
                message: format!("invalid number '{}' in column {}", field, j + 1),
            })?;
            if value > 0.0 {
                observations.push(RawObservation::new(i as u64, j as u64, value));
            }
        }
    }
    Ok(observations)
}
