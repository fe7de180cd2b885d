//! Persistence collaborator boundary.
//!
//! The pipeline never talks to a database directly; it talks to a
//! [`ResultStore`]. Implementations must make [`ResultStore::commit_results`]
//! atomic and must re-check the one-result-per-(student, activity) invariant
//! inside the commit, so that no interleaving of callers can double-record a
//! result. [`MemoryStore`] is the in-process reference implementation; the
//! SQLite adapter lives in its own crate.

use std::future::Future;

use sheets_api::types::{Points, StudentKey};
use thiserror::Error;

use crate::activity::{ActivityRef, ExamRecord};
use crate::enrollment::{CourseEnrollment, StudentActivityResult};
use crate::types::{CourseId, ExamId, StudentId};

mod memory;

pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("a result is already recorded for student {student} on {activity}")]
    Duplicate {
        student: StudentId,
        activity: ActivityRef,
    },
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub trait ResultStore: Sync {
    fn find_exam(
        &self,
        exam: &ExamId,
    ) -> impl Future<Output = Result<Option<ExamRecord>, StoreError>> + Send;

    /// Resolves an external sheet key to the enrolled student it belongs to,
    /// within one course.
    fn enrolled_student(
        &self,
        course: &CourseId,
        key: StudentKey,
    ) -> impl Future<Output = Result<Option<StudentId>, StoreError>> + Send;

    fn has_result(
        &self,
        student: &StudentId,
        activity: &ActivityRef,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Persists a validated batch, all rows or none. Returns the number of
    /// rows written. Fails with [`StoreError::Duplicate`] if any row would
    /// violate the one-result-per-(student, activity) invariant.
    fn commit_results(
        &self,
        pending: &[StudentActivityResult],
    ) -> impl Future<Output = Result<usize, StoreError>> + Send;

    fn student_results(
        &self,
        student: &StudentId,
        course: &CourseId,
    ) -> impl Future<Output = Result<Vec<StudentActivityResult>, StoreError>> + Send;

    /// Sum of points the student scored across all graded activities of the
    /// course. Zero when the student has no results.
    fn sum_points_for_student(
        &self,
        student: &StudentId,
        course: &CourseId,
    ) -> impl Future<Output = Result<Points, StoreError>> + Send;

    /// Sum of the points declared by every graded activity of the course.
    fn sum_max_points(
        &self,
        course: &CourseId,
    ) -> impl Future<Output = Result<Points, StoreError>> + Send;

    fn enrollments(
        &self,
        course: &CourseId,
    ) -> impl Future<Output = Result<Vec<CourseEnrollment>, StoreError>> + Send;

    /// Number of graded activities (exams and homeworks) in the course.
    fn activity_count(
        &self,
        course: &CourseId,
    ) -> impl Future<Output = Result<usize, StoreError>> + Send;
}
