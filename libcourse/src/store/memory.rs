//! In-process [`ResultStore`]. Used by tests as the deterministic store and
//! by adapters as the reference for commit semantics: every mutation takes
//! the single write lock, so a batch commit is observed fully or not at all.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::anyhow;
use sheets_api::types::{Points, StudentKey};

use crate::activity::{ActivityRef, ExamRecord, GradedActivity, HomeworkRecord};
use crate::enrollment::{CourseEnrollment, StudentActivityResult};
use crate::store::{ResultStore, StoreError};
use crate::types::{CourseId, ExamId, HomeworkId, StudentId};

#[derive(Debug, Default)]
struct Inner {
    exams: HashMap<ExamId, ExamRecord>,
    homeworks: HashMap<HomeworkId, HomeworkRecord>,
    enrollments: Vec<CourseEnrollment>,
    results: Vec<StudentActivityResult>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_exam(&self, exam: ExamRecord) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        inner.exams.insert(exam.id().clone(), exam);
        Ok(())
    }

    pub fn add_homework(&self, homework: HomeworkRecord) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        inner.homeworks.insert(homework.id().clone(), homework);
        Ok(())
    }

    pub fn enroll(&self, enrollment: CourseEnrollment) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        inner.enrollments.push(enrollment);
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<Inner>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Backend(anyhow!("store lock poisoned")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<Inner>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Backend(anyhow!("store lock poisoned")))
    }
}

impl Inner {
    fn has_result(&self, student: &StudentId, activity: &ActivityRef) -> bool {
        self.results
            .iter()
            .any(|result| result.student() == student && result.activity() == activity)
    }
}

impl ResultStore for MemoryStore {
    async fn find_exam(&self, exam: &ExamId) -> Result<Option<ExamRecord>, StoreError> {
        Ok(self.read()?.exams.get(exam).cloned())
    }

    async fn enrolled_student(
        &self,
        course: &CourseId,
        key: StudentKey,
    ) -> Result<Option<StudentId>, StoreError> {
        Ok(self
            .read()?
            .enrollments
            .iter()
            .find(|enrollment| enrollment.course() == course && enrollment.student_key() == key)
            .map(|enrollment| enrollment.student().clone()))
    }

    async fn has_result(
        &self,
        student: &StudentId,
        activity: &ActivityRef,
    ) -> Result<bool, StoreError> {
        Ok(self.read()?.has_result(student, activity))
    }

    async fn commit_results(
        &self,
        pending: &[StudentActivityResult],
    ) -> Result<usize, StoreError> {
        let mut inner = self.write()?;

        for (index, result) in pending.iter().enumerate() {
            let duplicate_in_batch = pending[..index]
                .iter()
                .any(|earlier| {
                    earlier.student() == result.student() && earlier.activity() == result.activity()
                });
            if duplicate_in_batch || inner.has_result(result.student(), result.activity()) {
                return Err(StoreError::Duplicate {
                    student: result.student().clone(),
                    activity: result.activity().clone(),
                });
            }
        }

        inner.results.extend_from_slice(pending);
        Ok(pending.len())
    }

    async fn student_results(
        &self,
        student: &StudentId,
        course: &CourseId,
    ) -> Result<Vec<StudentActivityResult>, StoreError> {
        Ok(self
            .read()?
            .results
            .iter()
            .filter(|result| result.student() == student && result.course() == course)
            .cloned()
            .collect())
    }

    async fn sum_points_for_student(
        &self,
        student: &StudentId,
        course: &CourseId,
    ) -> Result<Points, StoreError> {
        let total = self
            .read()?
            .results
            .iter()
            .filter(|result| result.student() == student && result.course() == course)
            .map(|result| result.points_scored().as_f64())
            .sum();
        Points::new(total).map_err(StoreError::Backend)
    }

    async fn sum_max_points(&self, course: &CourseId) -> Result<Points, StoreError> {
        let inner = self.read()?;
        let exams = inner
            .exams
            .values()
            .filter(|exam| exam.course() == course)
            .map(|exam| exam.total_points().as_f64());
        let homeworks = inner
            .homeworks
            .values()
            .filter(|homework| homework.course() == course)
            .map(|homework| homework.total_points().as_f64());
        Points::new(exams.chain(homeworks).sum()).map_err(StoreError::Backend)
    }

    async fn enrollments(&self, course: &CourseId) -> Result<Vec<CourseEnrollment>, StoreError> {
        Ok(self
            .read()?
            .enrollments
            .iter()
            .filter(|enrollment| enrollment.course() == course)
            .cloned()
            .collect())
    }

    async fn activity_count(&self, course: &CourseId) -> Result<usize, StoreError> {
        let inner = self.read()?;
        let exams = inner.exams.values().filter(|e| e.course() == course).count();
        let homeworks = inner
            .homeworks
            .values()
            .filter(|h| h.course() == course)
            .count();
        Ok(exams + homeworks)
    }
}
