//! Per-course standing: every enrolled student's total, grade, and status,
//! plus the course-level pass count and grade average.

use std::fmt;

use futures::{stream, StreamExt, TryStreamExt};
use itertools::Itertools;
use serde::Serialize;
use sheets_api::types::Points;

use crate::aggregate::PointsAggregator;
use crate::enrollment::{CourseEnrollment, StandingStatus};
use crate::grade::{self, Grade};
use crate::store::{ResultStore, StoreError};
use crate::types::CourseId;

#[derive(Debug, Clone, Serialize)]
pub struct StudentStanding {
    enrollment: CourseEnrollment,
    total_points: Points,
    grade: Grade,
    status: StandingStatus,
}

impl StudentStanding {
    pub fn enrollment(&self) -> &CourseEnrollment {
        &self.enrollment
    }

    pub fn total_points(&self) -> Points {
        self.total_points
    }

    pub fn grade(&self) -> Grade {
        self.grade
    }

    pub fn status(&self) -> StandingStatus {
        self.status
    }
}

impl fmt::Display for StudentStanding {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} (key {}): {} points, grade {}",
            self.enrollment.student_name(),
            self.enrollment.student_key(),
            self.total_points,
            self.grade,
        )?;
        match self.status {
            StandingStatus::NotStarted => write!(f, " (no activity yet)"),
            StandingStatus::InProgress => write!(f, " (in progress)"),
            StandingStatus::Completed => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseStandingReport {
    course: CourseId,
    standings: Vec<StudentStanding>,
}

impl CourseStandingReport {
    pub fn course(&self) -> &CourseId {
        &self.course
    }

    pub fn standings(&self) -> &[StudentStanding] {
        &self.standings
    }

    /// Students whose current total already bands to a passing grade.
    pub fn passed_count(&self) -> usize {
        self.standings
            .iter()
            .filter(|standing| standing.grade.passed())
            .count()
    }

    /// Average grade across students with a positive grade. Students at 0,
    /// whether failing or without qualifying activity, are excluded per the
    /// existing domain convention; `None` when nobody has a positive grade.
    pub fn average_grade(&self) -> Option<f64> {
        let grades: Vec<u8> = self
            .standings
            .iter()
            .map(|standing| standing.grade.as_u8())
            .filter(|&grade| grade > 0)
            .collect();

        if grades.is_empty() {
            return None;
        }
        Some(grades.iter().map(|&g| f64::from(g)).sum::<f64>() / grades.len() as f64)
    }
}

impl fmt::Display for CourseStandingReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Standing for course {}", self.course)?;
        writeln!(f, "{}", self.standings.iter().format("\n"))?;
        write!(
            f,
            "{} of {} passed",
            self.passed_count(),
            self.standings.len()
        )?;
        match self.average_grade() {
            Some(average) => write!(f, ", average grade {average:.2}"),
            None => write!(f, ", no grades yet"),
        }
    }
}

/// Assembles the standing of every enrolled student in the course from
/// committed results only.
pub async fn course_standing<Store: ResultStore>(
    store: &Store,
    course: &CourseId,
) -> Result<CourseStandingReport, StoreError> {
    let enrollments = store.enrollments(course).await?;
    let activity_count = store.activity_count(course).await?;
    let aggregator = PointsAggregator::new(store);

    let standings = stream::iter(enrollments)
        .then(|enrollment| {
            let aggregator = &aggregator;
            async move {
                let results = store.student_results(enrollment.student(), course).await?;
                let total_points = aggregator
                    .total_points(enrollment.student(), course)
                    .await?;
                Ok::<_, StoreError>(StudentStanding {
                    status: StandingStatus::from_counts(results.len(), activity_count),
                    grade: grade::evaluate(total_points),
                    total_points,
                    enrollment,
                })
            }
        })
        .try_collect()
        .await?;

    Ok(CourseStandingReport {
        course: course.clone(),
        standings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::{ActivityRef, ExamKind, ExamRecord, HomeworkRecord};
    use crate::enrollment::StudentActivityResult;
    use crate::store::MemoryStore;
    use crate::types::{ExamId, HomeworkId, StudentId, StudentName};
    use sheets_api::types::StudentKey;

    fn points(value: f64) -> Points {
        Points::new(value).unwrap()
    }

    fn exam_result(student: &str, exam: &str, scored: f64) -> StudentActivityResult {
        StudentActivityResult::new(
            StudentId::new(student),
            CourseId::new("ooad"),
            ActivityRef::Exam(ExamId::new(exam)),
            points(scored),
            true,
        )
    }

    fn homework_result(student: &str, homework: &str, scored: f64) -> StudentActivityResult {
        StudentActivityResult::new(
            StudentId::new(student),
            CourseId::new("ooad"),
            ActivityRef::Homework(HomeworkId::new(homework)),
            points(scored),
            true,
        )
    }

    /// Course with two exams and one homework; three enrolled students.
    async fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        let course = CourseId::new("ooad");

        for (exam, total) in [("e1", 50.0), ("e2", 30.0)] {
            store
                .add_exam(
                    ExamRecord::new(
                        ExamId::new(exam),
                        course.clone(),
                        ExamKind::Midterm,
                        points(total),
                        points(total / 2.0),
                    )
                    .unwrap(),
                )
                .unwrap();
        }
        store
            .add_homework(
                HomeworkRecord::new(
                    HomeworkId::new("h1"),
                    course.clone(),
                    points(20.0),
                    points(0.0),
                )
                .unwrap(),
            )
            .unwrap();

        for (student, name, key) in [
            ("s-1", "Amila Hodzic", 17),
            ("s-2", "Tarik Begic", 21),
            ("s-3", "Lejla Saric", 34),
        ] {
            store
                .enroll(CourseEnrollment::new(
                    StudentId::new(student),
                    StudentName::new(name),
                    StudentKey::new(key),
                    course.clone(),
                ))
                .unwrap();
        }

        // s-1 completed everything with 40 + 20 + 15 = 75 points; s-2 only
        // took one exam and is far from passing; s-3 took nothing.
        store
            .commit_results(&[
                exam_result("s-1", "e1", 40.0),
                exam_result("s-1", "e2", 20.0),
                homework_result("s-1", "h1", 15.0),
                exam_result("s-2", "e1", 10.0),
            ])
            .await
            .unwrap();

        store
    }

    #[tokio::test]
    async fn standings_combine_totals_grades_and_status() {
        let store = seeded_store().await;
        let report = course_standing(&store, &CourseId::new("ooad"))
            .await
            .unwrap();

        let by_student = |id: &str| {
            report
                .standings()
                .iter()
                .find(|s| s.enrollment().student() == &StudentId::new(id))
                .unwrap()
                .clone()
        };

        let completed = by_student("s-1");
        assert_eq!(completed.total_points(), points(75.0));
        assert_eq!(completed.grade().as_u8(), 8);
        assert_eq!(completed.status(), StandingStatus::Completed);

        let in_progress = by_student("s-2");
        assert_eq!(in_progress.total_points(), points(10.0));
        assert_eq!(in_progress.grade(), Grade::FAIL);
        assert_eq!(in_progress.status(), StandingStatus::InProgress);

        let not_started = by_student("s-3");
        assert_eq!(not_started.total_points(), Points::zero());
        assert_eq!(not_started.grade(), Grade::FAIL);
        assert_eq!(not_started.status(), StandingStatus::NotStarted);
    }

    #[tokio::test]
    async fn passed_count_and_average_follow_the_convention() {
        let store = seeded_store().await;
        let report = course_standing(&store, &CourseId::new("ooad"))
            .await
            .unwrap();

        assert_eq!(report.passed_count(), 1);
        // only s-1's grade 8 is positive; zeros are excluded from the average
        assert_eq!(report.average_grade(), Some(8.0));
    }

    #[tokio::test]
    async fn empty_course_reports_no_average() {
        let store = MemoryStore::new();
        let report = course_standing(&store, &CourseId::new("empty"))
            .await
            .unwrap();
        assert!(report.standings().is_empty());
        assert_eq!(report.passed_count(), 0);
        assert_eq!(report.average_grade(), None);
    }
}
