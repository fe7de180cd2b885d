//! Newtypes shared across the sheet-ingestion pipeline. They mostly exist so
//! that a student key, a point value, and a sheet identifier cannot be mixed
//! up once they leave the raw-string stage.

use std::fmt;
use std::num::FpCategory;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Opaque identifier the external sheet service uses to locate a spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SheetId {
    id: String,
}

impl SheetId {
    pub fn new(id: String) -> Self {
        Self { id }
    }

    pub fn as_str(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for SheetId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.id.fmt(f)
    }
}

/// Key under which a student appears in an external result sheet. Distinct
/// from any internal student id; the importer resolves one to the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentKey {
    key: u32,
}

impl StudentKey {
    pub fn new(key: u32) -> Self {
        Self { key }
    }

    pub fn as_u32(self) -> u32 {
        self.key
    }
}

impl fmt::Display for StudentKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.key.fmt(f)
    }
}

/// A point value: scored points, activity totals, thresholds. Always finite
/// and non-negative.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Points {
    points: f64,
}

impl Points {
    pub fn new(points: f64) -> Result<Self> {
        match points.classify() {
            FpCategory::Zero | FpCategory::Normal | FpCategory::Subnormal if points >= 0.0 => {
                Ok(Self { points })
            }
            _ => bail!("attempted to construct points with invalid value `{points}`"),
        }
    }

    pub const fn zero() -> Self {
        Self { points: 0.0 }
    }

    pub fn as_f64(self) -> f64 {
        self.points
    }
}

impl fmt::Display for Points {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.points.fmt(f)
    }
}
