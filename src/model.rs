//! Core domain types for the registration core.

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Student identifier.
pub type StudentId = u32;

/// Wall-clock instant attached to history records and waitlist entries.
pub type Timestamp = DateTime<Utc>;

/// Smallest student id a registration key accepts.
pub const MIN_STUDENT_ID: StudentId = 1000;

/// Errors raised while building identity values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("course code is empty")]
    EmptyCourseCode,
    #[error("student id {0} is below 1000")]
    InvalidStudentId(StudentId),
}

/// A course code, trimmed and uppercased.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CourseCode(String);

impl CourseCode {
    /// Normalize `raw` into a course code. Blank input is rejected.
    pub fn new(raw: &str) -> Result<Self, KeyError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(KeyError::EmptyCourseCode);
        }
        Ok(CourseCode(trimmed.to_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CourseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of one registration fact: a student in a course.
///
/// Equality, ordering and hashing are field-wise, so a course code containing
/// a separator character can never alias another key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegistrationKey {
    student: StudentId,
    course: CourseCode,
}

impl RegistrationKey {
    pub fn new(student: StudentId, course: &str) -> Result<Self, KeyError> {
        if student < MIN_STUDENT_ID {
            return Err(KeyError::InvalidStudentId(student));
        }
        Ok(Self {
            student,
            course: CourseCode::new(course)?,
        })
    }

    pub fn student(&self) -> StudentId {
        self.student
    }

    pub fn course(&self) -> &CourseCode {
        &self.course
    }
}

impl fmt::Display for RegistrationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.student, self.course)
    }
}

/// Workflow state of a registration key.
///
/// A key that was never requested has no state at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationState {
    /// Waiting for a seat (waitlisted).
    Pending,
    /// Holding a seat.
    Active,
    /// Left the course after being pending or active.
    Dropped,
    /// Finished the course. Terminal.
    Completed,
}

/// What the core needs to know about a course.
pub trait CourseRecord {
    fn code(&self) -> &CourseCode;
    fn has_available_spots(&self) -> bool;
}

/// What the core needs to know about a student.
pub trait StudentRecord {
    fn id(&self) -> StudentId;
}

/// A course offering with a seat capacity.
#[derive(Debug, Clone)]
pub struct Course {
    code: CourseCode,
    pub name: String,
    pub instructor: String,
    max_capacity: u32,
    enrolled: u32,
}

impl Course {
    pub fn new(code: CourseCode, name: &str, max_capacity: u32) -> Self {
        Self {
            code,
            name: name.trim().to_string(),
            instructor: String::new(),
            max_capacity,
            enrolled: 0,
        }
    }

    pub fn max_capacity(&self) -> u32 {
        self.max_capacity
    }

    pub fn enrolled(&self) -> u32 {
        self.enrolled
    }

    pub fn available_spots(&self) -> u32 {
        self.max_capacity.saturating_sub(self.enrolled)
    }

    /// Take one seat. Fails when the course is full.
    pub fn increment_enrollment(&mut self) -> bool {
        if !self.has_available_spots() {
            return false;
        }
        self.enrolled += 1;
        true
    }

    /// Release one seat. Fails when no seat is taken.
    pub fn decrement_enrollment(&mut self) -> bool {
        if self.enrolled == 0 {
            return false;
        }
        self.enrolled -= 1;
        true
    }
}

impl CourseRecord for Course {
    fn code(&self) -> &CourseCode {
        &self.code
    }

    fn has_available_spots(&self) -> bool {
        self.enrolled < self.max_capacity
    }
}

/// A registered student.
#[derive(Debug, Clone)]
pub struct Student {
    id: StudentId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub program: String,
}

impl Student {
    pub fn new(id: StudentId, first_name: &str, last_name: &str) -> Self {
        Self {
            id,
            first_name: first_name.trim().to_string(),
            last_name: last_name.trim().to_string(),
            email: String::new(),
            program: String::new(),
        }
    }

    /// Set the contact email, normalized to lowercase.
    pub fn with_email(mut self, email: &str) -> Self {
        self.email = email.trim().to_lowercase();
        self
    }
}

impl StudentRecord for Student {
    fn id(&self) -> StudentId {
        self.id
    }
}
