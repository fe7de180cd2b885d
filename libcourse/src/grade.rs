//! Maps an aggregate point total to a discrete course grade.

use std::fmt;

use serde::{Deserialize, Serialize};
use sheets_api::types::Points;

/// Discrete course grade: 6 through 10, or 0 for not passing. A 0 by itself
/// does not say whether the student failed or simply has no qualifying
/// activity yet; see `enrollment::StandingStatus` for that distinction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Grade {
    grade: u8,
}

impl Grade {
    pub const FAIL: Grade = Grade { grade: 0 };

    pub fn as_u8(self) -> u8 {
        self.grade
    }

    pub fn passed(self) -> bool {
        self.grade >= 6
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.grade.fmt(f)
    }
}

/// Inclusive lower bounds, highest band first.
const GRADE_BANDS: [(f64, u8); 5] = [(95.0, 10), (85.0, 9), (75.0, 8), (65.0, 7), (55.0, 6)];

/// Pure grade banding. Exactly one band applies to any total.
pub fn evaluate(points: Points) -> Grade {
    let total = points.as_f64();
    GRADE_BANDS
        .iter()
        .find(|(threshold, _)| total >= *threshold)
        .map(|&(_, grade)| Grade { grade })
        .unwrap_or(Grade::FAIL)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grade_of(total: f64) -> u8 {
        evaluate(Points::new(total).unwrap()).as_u8()
    }

    #[test]
    fn thresholds_are_inclusive_lower_bounds() {
        assert_eq!(grade_of(95.0), 10);
        assert_eq!(grade_of(94.9), 9);
        assert_eq!(grade_of(85.0), 9);
        assert_eq!(grade_of(75.0), 8);
        assert_eq!(grade_of(65.0), 7);
        assert_eq!(grade_of(55.0), 6);
        assert_eq!(grade_of(54.9), 0);
        assert_eq!(grade_of(0.0), 0);
    }

    #[test]
    fn totals_above_the_scale_still_band_to_ten() {
        assert_eq!(grade_of(120.0), 10);
    }

    #[test]
    fn passing_starts_at_six() {
        assert!(evaluate(Points::new(55.0).unwrap()).passed());
        assert!(!evaluate(Points::new(54.0).unwrap()).passed());
        assert!(!Grade::FAIL.passed());
    }
}
