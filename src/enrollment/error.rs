//! Consistency faults of the enrollment index.

use thiserror::Error;

use crate::model::{CourseCode, StudentId};

/// Which side of the bidirectional index held an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexSide {
    CourseToStudents,
    StudentToCourses,
}

/// Internal-consistency fault in [`EnrollmentIndex`](super::EnrollmentIndex).
///
/// These are bugs, never ordinary "not enrolled" outcomes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndexError {
    #[error("edge {student} -> {course} was only present in the {found_in:?} map")]
    Inconsistent {
        student: StudentId,
        course: CourseCode,
        found_in: IndexSide,
    },

    #[error("transfer of {student} out of {from} could not be rolled back")]
    RollbackFailed { student: StudentId, from: CourseCode },
}
