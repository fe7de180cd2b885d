//! Graded activities: the units that grant points toward a course total.
//!
//! An exam and a homework are structurally near-identical; what the rest of
//! the pipeline cares about is captured by [`GradedActivity`]. Results refer
//! to activities through [`ActivityRef`] so an exam result and a homework
//! result live in the same table.

use serde::{Deserialize, Serialize};
use sheets_api::types::Points;

use crate::types::{CourseId, ExamId, HomeworkId};

/// Anything that grants points toward a course total.
pub trait GradedActivity {
    fn course(&self) -> &CourseId;

    /// Maximum points the activity can grant. Always positive.
    fn total_points(&self) -> Points;

    /// Threshold at or above which a result counts as passed.
    fn minimum_points(&self) -> Points;
}

/// Exam category. The original system derived its display list from an enum
/// via reflection; here the association is a declared table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExamKind {
    Midterm,
    Final,
    Makeup,
}

impl ExamKind {
    pub const ALL: [ExamKind; 3] = [ExamKind::Midterm, ExamKind::Final, ExamKind::Makeup];

    pub fn label(self) -> &'static str {
        match self {
            ExamKind::Midterm => "Midterm exam",
            ExamKind::Final => "Final exam",
            ExamKind::Makeup => "Make-up exam",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamRecord {
    id: ExamId,
    course: CourseId,
    kind: ExamKind,
    total_points: Points,
    minimum_points: Points,
}

impl ExamRecord {
    pub fn new(
        id: ExamId,
        course: CourseId,
        kind: ExamKind,
        total_points: Points,
        minimum_points: Points,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(
            total_points > Points::zero(),
            "exam {id} must grant a positive number of points"
        );
        anyhow::ensure!(
            minimum_points <= total_points,
            "exam {id} passing threshold exceeds its total points"
        );
        Ok(Self {
            id,
            course,
            kind,
            total_points,
            minimum_points,
        })
    }

    pub fn id(&self) -> &ExamId {
        &self.id
    }

    pub fn kind(&self) -> ExamKind {
        self.kind
    }
}

impl GradedActivity for ExamRecord {
    fn course(&self) -> &CourseId {
        &self.course
    }

    fn total_points(&self) -> Points {
        self.total_points
    }

    fn minimum_points(&self) -> Points {
        self.minimum_points
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomeworkRecord {
    id: HomeworkId,
    course: CourseId,
    total_points: Points,
    minimum_points: Points,
}

impl HomeworkRecord {
    pub fn new(
        id: HomeworkId,
        course: CourseId,
        total_points: Points,
        minimum_points: Points,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(
            total_points > Points::zero(),
            "homework {id} must grant a positive number of points"
        );
        anyhow::ensure!(
            minimum_points <= total_points,
            "homework {id} passing threshold exceeds its total points"
        );
        Ok(Self {
            id,
            course,
            total_points,
            minimum_points,
        })
    }

    pub fn id(&self) -> &HomeworkId {
        &self.id
    }
}

impl GradedActivity for HomeworkRecord {
    fn course(&self) -> &CourseId {
        &self.course
    }

    fn total_points(&self) -> Points {
        self.total_points
    }

    fn minimum_points(&self) -> Points {
        self.minimum_points
    }
}

/// Reference from a result row to the activity that granted it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ActivityRef {
    Exam(ExamId),
    Homework(HomeworkId),
}

impl std::fmt::Display for ActivityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ActivityRef::Exam(id) => write!(f, "exam {id}"),
            ActivityRef::Homework(id) => write!(f, "homework {id}"),
        }
    }
}
