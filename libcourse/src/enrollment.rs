//! Enrollments and the results hanging off them.
//!
//! A course enrollment anchors everything graded about one student in one
//! course. Its total points and grade are always derived from the result
//! rows; neither is stored independently, so they cannot go stale.

use serde::{Deserialize, Serialize};
use sheets_api::types::{Points, StudentKey};

use crate::activity::ActivityRef;
use crate::types::{CourseId, StudentId, StudentName};

/// One student registered in one course. The student key is the key under
/// which the student appears in external result sheets for this course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseEnrollment {
    student: StudentId,
    student_name: StudentName,
    student_key: StudentKey,
    course: CourseId,
}

impl CourseEnrollment {
    pub fn new(
        student: StudentId,
        student_name: StudentName,
        student_key: StudentKey,
        course: CourseId,
    ) -> Self {
        Self {
            student,
            student_name,
            student_key,
            course,
        }
    }

    pub fn student(&self) -> &StudentId {
        &self.student
    }

    pub fn student_name(&self) -> &StudentName {
        &self.student_name
    }

    pub fn student_key(&self) -> StudentKey {
        self.student_key
    }

    pub fn course(&self) -> &CourseId {
        &self.course
    }
}

/// Points one student scored on one graded activity. Created only by the
/// import and manual-entry paths; never mutated by the student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentActivityResult {
    student: StudentId,
    course: CourseId,
    activity: ActivityRef,
    points_scored: Points,
    passed: bool,
}

impl StudentActivityResult {
    pub fn new(
        student: StudentId,
        course: CourseId,
        activity: ActivityRef,
        points_scored: Points,
        passed: bool,
    ) -> Self {
        Self {
            student,
            course,
            activity,
            points_scored,
            passed,
        }
    }

    pub fn student(&self) -> &StudentId {
        &self.student
    }

    pub fn course(&self) -> &CourseId {
        &self.course
    }

    pub fn activity(&self) -> &ActivityRef {
        &self.activity
    }

    pub fn points_scored(&self) -> Points {
        self.points_scored
    }

    pub fn passed(&self) -> bool {
        self.passed
    }
}

/// Where an enrollment stands, independent of the numeric grade. A grade of
/// 0 alone cannot distinguish "failed" from "never attempted anything"; this
/// carries that distinction explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StandingStatus {
    /// No graded activity taken yet.
    NotStarted,
    /// Some activities taken, others still outstanding.
    InProgress,
    /// A result exists for every graded activity of the course.
    Completed,
}

impl StandingStatus {
    pub fn from_counts(results: usize, activities: usize) -> Self {
        if results == 0 {
            StandingStatus::NotStarted
        } else if results < activities {
            StandingStatus::InProgress
        } else {
            StandingStatus::Completed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_follows_result_counts() {
        assert_eq!(
            StandingStatus::from_counts(0, 4),
            StandingStatus::NotStarted
        );
        assert_eq!(
            StandingStatus::from_counts(2, 4),
            StandingStatus::InProgress
        );
        assert_eq!(StandingStatus::from_counts(4, 4), StandingStatus::Completed);
    }

    #[test]
    fn course_with_no_activities_counts_as_not_started() {
        assert_eq!(
            StandingStatus::from_counts(0, 0),
            StandingStatus::NotStarted
        );
    }
}
