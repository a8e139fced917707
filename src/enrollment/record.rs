use std::fmt;

use chrono::Utc;

use crate::model::{CourseCode, StudentId, Timestamp};

/// Status of an enrollment detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentStatus {
    Active,
    Dropped,
}

/// Action recorded in a course's enrollment history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentAction {
    Enrolled,
    Dropped,
    TransferredIn,
    TransferredOut,
}

impl fmt::Display for EnrollmentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EnrollmentAction::Enrolled => "ENROLLED",
            EnrollmentAction::Dropped => "DROPPED",
            EnrollmentAction::TransferredIn => "TRANSFERRED_IN",
            EnrollmentAction::TransferredOut => "TRANSFERRED_OUT",
        };
        f.write_str(name)
    }
}

/// Metadata of one (student, course) enrollment.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrollmentDetail {
    pub student: StudentId,
    pub course: CourseCode,
    pub enrolled_at: Timestamp,
    pub status: EnrollmentStatus,
    pub grade: Option<String>,
}

impl EnrollmentDetail {
    /// Create a new detail in the `Active` status.
    pub fn new(student: StudentId, course: CourseCode) -> Self {
        Self {
            student,
            course,
            enrolled_at: Utc::now(),
            status: EnrollmentStatus::Active,
            grade: None,
        }
    }
}

/// One entry of a course's append-only history.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrollmentRecord {
    pub student: StudentId,
    pub action: EnrollmentAction,
    pub timestamp: Timestamp,
    pub note: Option<String>,
}

impl EnrollmentRecord {
    pub fn new(student: StudentId, action: EnrollmentAction) -> Self {
        Self {
            student,
            action,
            timestamp: Utc::now(),
            note: None,
        }
    }

    pub fn with_note(mut self, note: String) -> Self {
        self.note = Some(note);
        self
    }
}

/// Aggregate view over every course with at least one enrolled student.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrollmentStatistics {
    pub total_courses: usize,
    pub total_enrollments: usize,
    pub average_per_course: f64,
    /// Ties go to the smallest course code
    pub most_popular: Option<CourseCode>,
    /// Ties go to the smallest course code
    pub least_popular: Option<CourseCode>,
}
