use std::fmt;

use crate::model::{CourseCode, StudentId};
use crate::waitlist::Lane;

/// A request to change registry state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    AddCourse {
        code: String,
        name: String,
        capacity: u32,
    },
    /// Add a student. Without an id one is generated.
    AddStudent {
        id: Option<StudentId>,
        first_name: String,
        last_name: String,
    },
    Register {
        student: StudentId,
        course: String,
    },
    Drop {
        student: StudentId,
        course: String,
    },
    Transfer {
        student: StudentId,
        from: String,
        to: String,
    },
    /// Queue a registration in the dispatcher instead of applying it.
    Request {
        student: StudentId,
        course: String,
        priority: u32,
    },
    /// Register every queued request in dispatch order.
    Dispatch,
}

impl Command {
    pub fn kind(&self) -> &'static str {
        match self {
            Command::AddCourse { .. } => "add course",
            Command::AddStudent { .. } => "add student",
            Command::Register { .. } => "register",
            Command::Drop { .. } => "drop",
            Command::Transfer { .. } => "transfer",
            Command::Request { .. } => "request",
            Command::Dispatch => "dispatch",
        }
    }
}

/// What an applied [`Command`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    CourseAdded(CourseCode),
    StudentAdded(StudentId),
    Enrolled,
    /// Course was full; 1-based waitlist position.
    Waitlisted { position: usize },
    /// Seat released; `promoted` is the waitlisted student who took it.
    Dropped { promoted: Option<StudentId> },
    /// Student left the waitlist before getting a seat.
    LeftWaitlist,
    Transferred { promoted: Option<StudentId> },
    Queued(Lane),
    Dispatched {
        enrolled: usize,
        waitlisted: usize,
        rejected: usize,
    },
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::CourseAdded(code) => write!(f, "course {code} added"),
            Outcome::StudentAdded(id) => write!(f, "student {id} added"),
            Outcome::Enrolled => f.write_str("enrolled"),
            Outcome::Waitlisted { position } => write!(f, "waitlisted at position {position}"),
            Outcome::Dropped { promoted: None } | Outcome::Transferred { promoted: None } => {
                f.write_str("seat released")
            }
            Outcome::Dropped {
                promoted: Some(id),
            }
            | Outcome::Transferred {
                promoted: Some(id),
            } => write!(f, "seat released to {id}"),
            Outcome::LeftWaitlist => f.write_str("left waitlist"),
            Outcome::Queued(lane) => write!(f, "queued in {lane:?} lane"),
            Outcome::Dispatched {
                enrolled,
                waitlisted,
                rejected,
            } => write!(
                f,
                "{enrolled} enrolled, {waitlisted} waitlisted, {rejected} rejected"
            ),
        }
    }
}

/// Payload carried through the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatRequest {
    pub student: StudentId,
    pub course: CourseCode,
}
