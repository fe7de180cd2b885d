//! SQLite-backed [`ResultStore`].
//!
//! Queries are runtime-checked so the crate builds without a database at
//! hand. Batch commits run inside one transaction, and the
//! `UNIQUE (student_id, activity_id)` constraint re-enforces the
//! one-result-per-activity invariant at the storage layer, independent of
//! the importer's own serialization.

use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use libcourse::activity::{ActivityRef, ExamKind, ExamRecord, GradedActivity, HomeworkRecord};
use libcourse::enrollment::{CourseEnrollment, StudentActivityResult};
use libcourse::store::{ResultStore, StoreError};
use libcourse::types::{CourseId, ExamId, HomeworkId, StudentId, StudentName};
use sheets_api::types::{Points, StudentKey};
use sqlx::error::ErrorKind;
use sqlx::sqlite::{SqliteConnectOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::info;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS activity (
    id             TEXT PRIMARY KEY,
    course_id      TEXT NOT NULL,
    kind           TEXT NOT NULL,
    exam_kind      TEXT,
    total_points   REAL NOT NULL,
    minimum_points REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS enrollment (
    student_id   TEXT NOT NULL,
    student_name TEXT NOT NULL,
    student_key  INTEGER NOT NULL,
    course_id    TEXT NOT NULL,
    PRIMARY KEY (student_id, course_id),
    UNIQUE (course_id, student_key)
);

CREATE TABLE IF NOT EXISTS result (
    student_id    TEXT NOT NULL,
    course_id     TEXT NOT NULL,
    activity_id   TEXT NOT NULL,
    activity_kind TEXT NOT NULL,
    points_scored REAL NOT NULL,
    passed        INTEGER NOT NULL,
    UNIQUE (student_id, activity_id)
);
";

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn connect(db_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(db_url)
            .with_context(|| format!("invalid results database url `{db_url}`"))?
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options)
            .await
            .with_context(|| format!("could not open results database at `{db_url}`"))?;
        Ok(Self::new(pool))
    }

    pub async fn init_schema(&self) -> Result<()> {
        // one statement per table; plain query() only prepares a single one
        for statement in SCHEMA.split(';').filter(|s| !s.trim().is_empty()) {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("results schema ready");
        Ok(())
    }

    pub async fn add_exam(&self, exam: &ExamRecord) -> Result<()> {
        sqlx::query(
            "
            INSERT OR IGNORE INTO activity (id, course_id, kind, exam_kind, total_points, minimum_points)
            VALUES (?, ?, 'exam', ?, ?, ?)
            ",
        )
        .bind(exam.id().as_str())
        .bind(exam.course().as_str())
        .bind(exam_kind_to_str(exam.kind()))
        .bind(exam.total_points().as_f64())
        .bind(exam.minimum_points().as_f64())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn add_homework(&self, homework: &HomeworkRecord) -> Result<()> {
        sqlx::query(
            "
            INSERT OR IGNORE INTO activity (id, course_id, kind, exam_kind, total_points, minimum_points)
            VALUES (?, ?, 'homework', NULL, ?, ?)
            ",
        )
        .bind(homework.id().as_str())
        .bind(homework.course().as_str())
        .bind(homework.total_points().as_f64())
        .bind(homework.minimum_points().as_f64())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn enroll(&self, enrollment: &CourseEnrollment) -> Result<()> {
        sqlx::query(
            "
            INSERT OR IGNORE INTO enrollment (student_id, student_name, student_key, course_id)
            VALUES (?, ?, ?, ?)
            ",
        )
        .bind(enrollment.student().as_str())
        .bind(enrollment.student_name().as_str())
        .bind(i64::from(enrollment.student_key().as_u32()))
        .bind(enrollment.course().as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn backend(err: impl Into<anyhow::Error>) -> StoreError {
    StoreError::Backend(err.into())
}

fn exam_kind_to_str(kind: ExamKind) -> &'static str {
    match kind {
        ExamKind::Midterm => "midterm",
        ExamKind::Final => "final",
        ExamKind::Makeup => "makeup",
    }
}

fn exam_kind_from_str(kind: &str) -> Result<ExamKind> {
    match kind {
        "midterm" => Ok(ExamKind::Midterm),
        "final" => Ok(ExamKind::Final),
        "makeup" => Ok(ExamKind::Makeup),
        other => Err(anyhow!("unknown exam kind `{other}` in activity table")),
    }
}

fn result_from_row(row: &SqliteRow) -> Result<StudentActivityResult> {
    let activity_id: String = row.try_get("activity_id")?;
    let activity = match row.try_get::<String, _>("activity_kind")?.as_str() {
        "exam" => ActivityRef::Exam(ExamId::new(activity_id)),
        "homework" => ActivityRef::Homework(HomeworkId::new(activity_id)),
        other => return Err(anyhow!("unknown activity kind `{other}` in result table")),
    };

    Ok(StudentActivityResult::new(
        StudentId::new(row.try_get::<String, _>("student_id")?),
        CourseId::new(row.try_get::<String, _>("course_id")?),
        activity,
        Points::new(row.try_get("points_scored")?)?,
        row.try_get("passed")?,
    ))
}

fn activity_ref_parts(activity: &ActivityRef) -> (&str, &str) {
    match activity {
        ActivityRef::Exam(id) => (id.as_str(), "exam"),
        ActivityRef::Homework(id) => (id.as_str(), "homework"),
    }
}

impl ResultStore for SqliteStore {
    async fn find_exam(&self, exam: &ExamId) -> Result<Option<ExamRecord>, StoreError> {
        let row = sqlx::query(
            "
            SELECT course_id, exam_kind, total_points, minimum_points
            FROM activity
            WHERE id = ? AND kind = 'exam'
            ",
        )
        .bind(exam.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(|row| {
            let kind = exam_kind_from_str(&row.try_get::<String, _>("exam_kind")?)?;
            ExamRecord::new(
                exam.clone(),
                CourseId::new(row.try_get::<String, _>("course_id")?),
                kind,
                Points::new(row.try_get("total_points")?)?,
                Points::new(row.try_get("minimum_points")?)?,
            )
        })
        .transpose()
        .map_err(backend)
    }

    async fn enrolled_student(
        &self,
        course: &CourseId,
        key: StudentKey,
    ) -> Result<Option<StudentId>, StoreError> {
        let row = sqlx::query(
            "SELECT student_id FROM enrollment WHERE course_id = ? AND student_key = ?",
        )
        .bind(course.as_str())
        .bind(i64::from(key.as_u32()))
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(|row| {
            Ok::<_, anyhow::Error>(StudentId::new(row.try_get::<String, _>("student_id")?))
        })
        .transpose()
        .map_err(backend)
    }

    async fn has_result(
        &self,
        student: &StudentId,
        activity: &ActivityRef,
    ) -> Result<bool, StoreError> {
        let (activity_id, _) = activity_ref_parts(activity);
        let row = sqlx::query("SELECT 1 FROM result WHERE student_id = ? AND activity_id = ?")
            .bind(student.as_str())
            .bind(activity_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        Ok(row.is_some())
    }

    async fn commit_results(
        &self,
        pending: &[StudentActivityResult],
    ) -> Result<usize, StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        for result in pending {
            let (activity_id, activity_kind) = activity_ref_parts(result.activity());
            let insert = sqlx::query(
                "
                INSERT INTO result (student_id, course_id, activity_id, activity_kind, points_scored, passed)
                VALUES (?, ?, ?, ?, ?, ?)
                ",
            )
            .bind(result.student().as_str())
            .bind(result.course().as_str())
            .bind(activity_id)
            .bind(activity_kind)
            .bind(result.points_scored().as_f64())
            .bind(result.passed())
            .execute(&mut *tx)
            .await;

            if let Err(err) = insert {
                let unique_violation = matches!(
                    &err,
                    sqlx::Error::Database(db) if matches!(db.kind(), ErrorKind::UniqueViolation)
                );
                return Err(if unique_violation {
                    StoreError::Duplicate {
                        student: result.student().clone(),
                        activity: result.activity().clone(),
                    }
                } else {
                    backend(err)
                });
            }
        }

        tx.commit().await.map_err(backend)?;
        Ok(pending.len())
    }

    async fn student_results(
        &self,
        student: &StudentId,
        course: &CourseId,
    ) -> Result<Vec<StudentActivityResult>, StoreError> {
        let rows = sqlx::query(
            "
            SELECT student_id, course_id, activity_id, activity_kind, points_scored, passed
            FROM result
            WHERE student_id = ? AND course_id = ?
            ",
        )
        .bind(student.as_str())
        .bind(course.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.iter()
            .map(result_from_row)
            .collect::<Result<_>>()
            .map_err(backend)
    }

    async fn sum_points_for_student(
        &self,
        student: &StudentId,
        course: &CourseId,
    ) -> Result<Points, StoreError> {
        let row = sqlx::query(
            "
            SELECT COALESCE(SUM(points_scored), 0) AS total
            FROM result
            WHERE student_id = ? AND course_id = ?
            ",
        )
        .bind(student.as_str())
        .bind(course.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;

        let total: f64 = row.try_get("total").map_err(backend)?;
        Points::new(total).map_err(StoreError::Backend)
    }

    async fn sum_max_points(&self, course: &CourseId) -> Result<Points, StoreError> {
        let row = sqlx::query(
            "SELECT COALESCE(SUM(total_points), 0) AS total FROM activity WHERE course_id = ?",
        )
        .bind(course.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;

        let total: f64 = row.try_get("total").map_err(backend)?;
        Points::new(total).map_err(StoreError::Backend)
    }

    async fn enrollments(&self, course: &CourseId) -> Result<Vec<CourseEnrollment>, StoreError> {
        let rows = sqlx::query(
            "
            SELECT student_id, student_name, student_key, course_id
            FROM enrollment
            WHERE course_id = ?
            ORDER BY student_key
            ",
        )
        .bind(course.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.iter()
            .map(|row| {
                let key = u32::try_from(row.try_get::<i64, _>("student_key")?)
                    .context("student key out of range")?;
                Ok(CourseEnrollment::new(
                    StudentId::new(row.try_get::<String, _>("student_id")?),
                    StudentName::new(row.try_get::<String, _>("student_name")?),
                    StudentKey::new(key),
                    CourseId::new(row.try_get::<String, _>("course_id")?),
                ))
            })
            .collect::<Result<_>>()
            .map_err(backend)
    }

    async fn activity_count(&self, course: &CourseId) -> Result<usize, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM activity WHERE course_id = ?")
            .bind(course.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(backend)?;
        let count: i64 = row.try_get("n").map_err(backend)?;
        Ok(count as usize)
    }
}
