use chrono::Utc;

use crate::model::{CourseCode, StudentId, Timestamp};

/// Priority assigned to entries added without one.
pub const DEFAULT_PRIORITY: u32 = 1;

/// Lifecycle of a waitlist entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitlistStatus {
    /// Still queued.
    #[default]
    Waiting,
    /// Left the queue from the head.
    Processed,
    /// Taken out of the queue before reaching the head.
    Removed,
}

/// Log entry for one waitlist request.
#[derive(Debug, Clone, PartialEq)]
pub struct WaitlistEntry {
    pub student: StudentId,
    pub course: CourseCode,
    pub added_at: Timestamp,
    pub priority: u32,
    pub status: WaitlistStatus,
}

impl WaitlistEntry {
    pub fn new(student: StudentId, course: CourseCode, priority: u32) -> Self {
        Self {
            student,
            course,
            added_at: Utc::now(),
            priority,
            status: WaitlistStatus::Waiting,
        }
    }
}

/// Aggregate view over every non-empty waitlist.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaitlistStatistics {
    pub total_waitlisted: usize,
    pub courses_with_waitlists: usize,
    pub average_length: f64,
    pub longest: Option<CourseCode>,
    pub shortest: Option<CourseCode>,
}
