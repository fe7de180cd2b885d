//! Aggregates scored points across all graded activities of a course.
//!
//! Totals are recomputed from the underlying result rows on every call
//! rather than cached on the enrollment, so they can never drift from their
//! components. Absence of data is not an error; an empty result set sums to
//! zero.

use sheets_api::types::Points;

use crate::store::{ResultStore, StoreError};
use crate::types::{CourseId, StudentId};

pub struct PointsAggregator<'a, Store> {
    store: &'a Store,
}

impl<'a, Store: ResultStore> PointsAggregator<'a, Store> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Points the student has scored across every exam and homework of the
    /// course. Zero when the student has no results yet.
    pub async fn total_points(
        &self,
        student: &StudentId,
        course: &CourseId,
    ) -> Result<Points, StoreError> {
        self.store.sum_points_for_student(student, course).await
    }

    /// Points the course's graded activities declare in total, independent
    /// of any student. Useful to express a total as an achieved fraction.
    pub async fn maximum_points(&self, course: &CourseId) -> Result<Points, StoreError> {
        self.store.sum_max_points(course).await
    }
}
