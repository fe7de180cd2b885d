//! Imports externally hosted exam results into per-student records.
//!
//! The import is one-shot per exam and all-or-nothing per batch: every row
//! must parse, resolve to an enrolled student, and not collide with an
//! existing result before anything is written. Validation produces a list of
//! pending rows; only a fully validated list reaches the store, in a single
//! atomic commit.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::anyhow;
use sheets_api::client::{FetchError, SheetsService};
use sheets_api::link::{extract_sheet_id, LinkError};
use sheets_api::resultset::{parse_rows, ImportedRow, ParseError};
use sheets_api::types::{Points, StudentKey};
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};

use crate::activity::{ActivityRef, ExamRecord, GradedActivity};
use crate::enrollment::StudentActivityResult;
use crate::store::{ResultStore, StoreError};
use crate::types::{ExamId, StudentId};

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("exam {0} does not exist")]
    ExamNotFound(ExamId),
    #[error("invalid result sheet link")]
    InvalidLink(#[from] LinkError),
    #[error("could not retrieve results from the sheet service")]
    Fetch(#[from] FetchError),
    #[error("result sheet contains malformed rows")]
    MalformedData(#[from] ParseError),
    #[error("student key {0} does not map to a student enrolled in the exam's course")]
    UnknownStudentKey(StudentKey),
    #[error("a result is already recorded for student {student} on exam {exam}")]
    DuplicateResult { student: StudentId, exam: ExamId },
    #[error("storage backend failure")]
    Store(#[source] anyhow::Error),
}

impl From<StoreError> for ImportError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate {
                student,
                activity: ActivityRef::Exam(exam),
            } => ImportError::DuplicateResult { student, exam },
            StoreError::Duplicate { student, activity } => {
                ImportError::Store(anyhow!("duplicate result for student {student} on {activity}"))
            }
            StoreError::Backend(err) => ImportError::Store(err),
        }
    }
}

/// Per-exam mutual exclusion. Two imports for the same exam serialize here,
/// so both can never pass the duplicate check and then both commit.
#[derive(Debug, Default)]
struct ExamLocks {
    locks: Mutex<HashMap<ExamId, Arc<Mutex<()>>>>,
}

impl ExamLocks {
    async fn acquire(&self, exam: &ExamId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(exam.clone()).or_default())
        };
        lock.lock_owned().await
    }
}

pub struct ExamResultImporter<'a, Sheets, Store> {
    sheets: &'a Sheets,
    store: &'a Store,
    locks: ExamLocks,
}

impl<'a, Sheets, Store> ExamResultImporter<'a, Sheets, Store>
where
    Sheets: SheetsService + Sync,
    Store: ResultStore,
{
    pub fn new(sheets: &'a Sheets, store: &'a Store) -> Self {
        Self {
            sheets,
            store,
            locks: ExamLocks::default(),
        }
    }

    /// Runs the whole pipeline for one exam, from sharing link to committed
    /// results, and returns how many results were applied. A failure anywhere
    /// leaves the store untouched.
    #[tracing::instrument(level = "info", skip_all, fields(exam = %exam))]
    pub async fn import_results(&self, exam: &ExamId, link: &str) -> Result<usize, ImportError> {
        let _guard = self.locks.acquire(exam).await;

        let exam_record = self
            .store
            .find_exam(exam)
            .await?
            .ok_or_else(|| ImportError::ExamNotFound(exam.clone()))?;

        let sheet = extract_sheet_id(link)?;
        let rows = self.sheets.fetch_rows(&sheet).await?;
        let parsed = parse_rows(&rows)?;
        debug!(rows = parsed.len(), %sheet, "validating result batch");

        let pending = self.validate(&exam_record, &parsed).await?;
        let applied = self.store.commit_results(&pending).await?;

        info!(applied, %exam, "imported exam results");
        Ok(applied)
    }

    /// Pure validation phase: resolves and checks every row, building the
    /// list of pending writes without mutating anything.
    async fn validate(
        &self,
        exam: &ExamRecord,
        rows: &[ImportedRow],
    ) -> Result<Vec<StudentActivityResult>, ImportError> {
        let course = exam.course();
        let mut seen = HashSet::new();
        let mut pending = Vec::with_capacity(rows.len());

        for row in rows {
            let student = self
                .store
                .enrolled_student(course, row.student_key())
                .await?
                .ok_or(ImportError::UnknownStudentKey(row.student_key()))?;

            let activity = ActivityRef::Exam(exam.id().clone());
            let duplicate =
                !seen.insert(student.clone()) || self.store.has_result(&student, &activity).await?;
            if duplicate {
                return Err(ImportError::DuplicateResult {
                    student,
                    exam: exam.id().clone(),
                });
            }

            let passed = row.score() >= exam.minimum_points();
            pending.push(StudentActivityResult::new(
                student,
                course.clone(),
                activity,
                row.score(),
                passed,
            ));
        }

        Ok(pending)
    }
}

/// Manual entry of a single exam result, the by-hand counterpart of the bulk
/// import. Subject to the same duplicate invariant and pass rule.
pub async fn record_exam_result<Store: ResultStore>(
    store: &Store,
    exam: &ExamId,
    student: &StudentId,
    score: Points,
) -> Result<(), ImportError> {
    let exam_record = store
        .find_exam(exam)
        .await?
        .ok_or_else(|| ImportError::ExamNotFound(exam.clone()))?;

    let passed = score >= exam_record.minimum_points();
    let result = StudentActivityResult::new(
        student.clone(),
        exam_record.course().clone(),
        ActivityRef::Exam(exam.clone()),
        score,
        passed,
    );

    store.commit_results(&[result]).await?;
    info!(%exam, %student, %score, passed, "recorded manual exam result");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::ExamKind;
    use crate::enrollment::CourseEnrollment;
    use crate::store::MemoryStore;
    use crate::types::{CourseId, StudentName};
    use sheets_api::client::FixedSheets;
    use sheets_api::types::SheetId;

    const LINK: &str = "https://sheets.example.com/spreadsheets/results-1/edit";

    fn points(value: f64) -> Points {
        Points::new(value).unwrap()
    }

    fn course() -> CourseId {
        CourseId::new("ooad")
    }

    fn exam_id() -> ExamId {
        ExamId::new("midterm-1")
    }

    /// Course with one 100-point exam (pass at 50) and two enrolled students,
    /// keys 17 and 21.
    fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .add_exam(
                ExamRecord::new(
                    exam_id(),
                    course(),
                    ExamKind::Midterm,
                    points(100.0),
                    points(50.0),
                )
                .unwrap(),
            )
            .unwrap();
        store
            .enroll(CourseEnrollment::new(
                StudentId::new("s-17"),
                StudentName::new("Amila Hodzic"),
                StudentKey::new(17),
                course(),
            ))
            .unwrap();
        store
            .enroll(CourseEnrollment::new(
                StudentId::new("s-21"),
                StudentName::new("Tarik Begic"),
                StudentKey::new(21),
                course(),
            ))
            .unwrap();
        store
    }

    fn sheets(rows: &[(&str, &str)]) -> FixedSheets {
        FixedSheets::new().with_sheet(
            SheetId::new("results-1".to_owned()),
            rows.iter().copied(),
        )
    }

    #[tokio::test]
    async fn applies_every_validated_row() {
        let store = seeded_store();
        let sheets = sheets(&[("17", "72.5"), ("21", "40")]);
        let importer = ExamResultImporter::new(&sheets, &store);

        let applied = importer.import_results(&exam_id(), LINK).await.unwrap();
        assert_eq!(applied, 2);

        let passed = store
            .student_results(&StudentId::new("s-17"), &course())
            .await
            .unwrap();
        assert_eq!(passed.len(), 1);
        assert_eq!(passed[0].points_scored(), points(72.5));
        assert!(passed[0].passed());

        let failed = store
            .student_results(&StudentId::new("s-21"), &course())
            .await
            .unwrap();
        assert!(!failed[0].passed());
    }

    #[tokio::test]
    async fn passing_threshold_is_inclusive() {
        let store = seeded_store();
        let sheets = sheets(&[("17", "50")]);
        let importer = ExamResultImporter::new(&sheets, &store);
        importer.import_results(&exam_id(), LINK).await.unwrap();

        let results = store
            .student_results(&StudentId::new("s-17"), &course())
            .await
            .unwrap();
        assert!(results[0].passed());
    }

    #[tokio::test]
    async fn second_import_fails_and_changes_nothing() {
        let store = seeded_store();
        let sheets = sheets(&[("17", "72.5"), ("21", "40")]);
        let importer = ExamResultImporter::new(&sheets, &store);

        importer.import_results(&exam_id(), LINK).await.unwrap();
        let err = importer.import_results(&exam_id(), LINK).await.unwrap_err();
        assert!(matches!(err, ImportError::DuplicateResult { .. }));

        let results = store
            .student_results(&StudentId::new("s-17"), &course())
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].points_scored(), points(72.5));
    }

    #[tokio::test]
    async fn unknown_student_key_rejects_the_whole_batch() {
        let store = seeded_store();
        let sheets = sheets(&[("17", "72.5"), ("99", "40")]);
        let importer = ExamResultImporter::new(&sheets, &store);

        let err = importer.import_results(&exam_id(), LINK).await.unwrap_err();
        assert!(matches!(
            err,
            ImportError::UnknownStudentKey(key) if key == StudentKey::new(99)
        ));

        // rows before the bad one were not persisted
        let results = store
            .student_results(&StudentId::new("s-17"), &course())
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn duplicate_key_within_one_batch_rejects_the_whole_batch() {
        let store = seeded_store();
        let sheets = sheets(&[("17", "72.5"), ("17", "80")]);
        let importer = ExamResultImporter::new(&sheets, &store);

        let err = importer.import_results(&exam_id(), LINK).await.unwrap_err();
        assert!(matches!(err, ImportError::DuplicateResult { .. }));

        let results = store
            .student_results(&StudentId::new("s-17"), &course())
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn malformed_rows_reject_the_whole_batch() {
        let store = seeded_store();
        let sheets = sheets(&[("17", "seventy")]);
        let importer = ExamResultImporter::new(&sheets, &store);

        let err = importer.import_results(&exam_id(), LINK).await.unwrap_err();
        assert!(matches!(err, ImportError::MalformedData(_)));
    }

    #[tokio::test]
    async fn unknown_exam_is_reported_before_fetching() {
        let store = seeded_store();
        let sheets = FixedSheets::new();
        let importer = ExamResultImporter::new(&sheets, &store);

        let err = importer
            .import_results(&ExamId::new("nope"), LINK)
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::ExamNotFound(_)));
    }

    #[tokio::test]
    async fn bad_link_is_reported_as_invalid() {
        let store = seeded_store();
        let sheets = FixedSheets::new();
        let importer = ExamResultImporter::new(&sheets, &store);

        let err = importer
            .import_results(&exam_id(), "not a link")
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::InvalidLink(_)));
    }

    #[tokio::test]
    async fn unreachable_and_empty_sheets_propagate_as_fetch_errors() {
        let store = seeded_store();
        let sheets = FixedSheets::new(); // knows no sheet at all
        let importer = ExamResultImporter::new(&sheets, &store);

        let err = importer.import_results(&exam_id(), LINK).await.unwrap_err();
        assert!(matches!(err, ImportError::Fetch(FetchError::Unreachable { .. })));

        let sheets = FixedSheets::new()
            .with_sheet(SheetId::new("results-1".to_owned()), Vec::<(&str, &str)>::new());
        let importer = ExamResultImporter::new(&sheets, &store);
        let err = importer.import_results(&exam_id(), LINK).await.unwrap_err();
        assert!(matches!(err, ImportError::Fetch(FetchError::Empty { .. })));
    }

    #[tokio::test]
    async fn concurrent_imports_for_one_exam_commit_exactly_once() {
        let store = seeded_store();
        let sheets = sheets(&[("17", "72.5"), ("21", "40")]);
        let importer = ExamResultImporter::new(&sheets, &store);

        let exam = exam_id();
        let (first, second) = tokio::join!(
            importer.import_results(&exam, LINK),
            importer.import_results(&exam, LINK),
        );

        let outcomes = [first, second];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(outcomes
            .iter()
            .any(|r| matches!(r, Err(ImportError::DuplicateResult { .. }))));

        for student in ["s-17", "s-21"] {
            let results = store
                .student_results(&StudentId::new(student), &course())
                .await
                .unwrap();
            assert_eq!(results.len(), 1);
        }
    }

    #[tokio::test]
    async fn manual_entry_respects_the_duplicate_invariant() {
        let store = seeded_store();
        record_exam_result(&store, &exam_id(), &StudentId::new("s-17"), points(60.0))
            .await
            .unwrap();

        let err = record_exam_result(&store, &exam_id(), &StudentId::new("s-17"), points(80.0))
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::DuplicateResult { .. }));
    }
}
