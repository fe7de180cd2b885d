//! Turns raw sheet rows into typed result rows.
//!
//! Parsing is all-or-nothing: a batch with even one malformed row is
//! rejected outright, since a partially applied external import is worse
//! than none. Duplicate student keys are deliberately left in place; whether
//! a duplicate is an error is the importer's call, not the parser's.

use thiserror::Error;
use tracing::debug;

use crate::client::RawRow;
use crate::types::{Points, StudentKey};

/// One parsed result row. Transient; it only becomes a persisted result once
/// the importer has validated it against the enrollment of the exam's course.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImportedRow {
    student_key: StudentKey,
    score: Points,
}

impl ImportedRow {
    pub fn new(student_key: StudentKey, score: Points) -> Self {
        Self { student_key, score }
    }

    pub fn student_key(&self) -> StudentKey {
        self.student_key
    }

    pub fn score(&self) -> Points {
        self.score
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("row key `{key}` is not a non-negative integer student key")]
    BadKey { key: String },
    #[error("row value `{value}` for key `{key}` is not a non-negative finite score")]
    BadScore { key: String, value: String },
}

/// Parses every raw row, failing the whole batch on the first bad one.
pub fn parse_rows(rows: &[RawRow]) -> Result<Vec<ImportedRow>, ParseError> {
    let parsed = rows.iter().map(parse_row).collect::<Result<Vec<_>, _>>()?;
    debug!(rows = parsed.len(), "parsed result rows");
    Ok(parsed)
}

fn parse_row((key, value): &RawRow) -> Result<ImportedRow, ParseError> {
    let student_key = key
        .trim()
        .parse::<u32>()
        .map(StudentKey::new)
        .map_err(|_| ParseError::BadKey { key: key.clone() })?;

    let score = value
        .trim()
        .parse::<f64>()
        .map_err(anyhow::Error::from)
        .and_then(Points::new)
        .map_err(|_| ParseError::BadScore {
            key: key.clone(),
            value: value.clone(),
        })?;

    Ok(ImportedRow::new(student_key, score))
}
