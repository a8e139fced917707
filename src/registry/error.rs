//! Error types for registry commands.

use thiserror::Error;

use crate::enrollment::IndexError;
use crate::guard::ValidationCode;
use crate::ids::IdError;
use crate::model::{CourseCode, KeyError, StudentId};

/// Top-level error returned by [`Registry::apply`](super::Registry::apply).
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("{0}")]
    Key(#[from] KeyError),

    #[error("{0}")]
    Id(#[from] IdError),

    #[error("consistency fault: {0}")]
    Index(#[from] IndexError),

    #[error("course {0} already exists")]
    DuplicateCourse(CourseCode),

    #[error("course {0} not found")]
    UnknownCourse(CourseCode),

    #[error("student id {0} is invalid or already taken")]
    StudentIdUnavailable(StudentId),

    #[error("registration rejected ({code}): {message}")]
    Rejected {
        code: ValidationCode,
        message: String,
    },

    #[error("waitlist for {0} does not accept student {1}")]
    WaitlistRejected(CourseCode, StudentId),

    #[error("student {0} is not registered for {1}")]
    NotRegistered(StudentId, CourseCode),

    #[error("student {0} is already enrolled in {1}")]
    AlreadyEnrolled(StudentId, CourseCode),

    #[error("course {0} has no available spots")]
    CourseFull(CourseCode),

    #[error("transfer of student {student} from {from} to {to} declined")]
    TransferDeclined {
        student: StudentId,
        from: CourseCode,
        to: CourseCode,
    },
}

impl RegistryError {
    /// Whether the error signals broken cross-store consistency rather than a
    /// rejected command.
    pub fn is_fault(&self) -> bool {
        matches!(self, RegistryError::Index(_))
    }
}
