//! Duplicate registration guard.
//!
//! Tracks the workflow state of every (student, course) key in four sets.
//! Legal transitions:
//! - absent -> Pending -> Active -> Dropped
//! - absent -> Active
//! - Pending -> Dropped
//! - Active -> Completed
//!
//! A key is never Active and Pending at the same time.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use crate::model::{
    CourseCode, CourseRecord, RegistrationKey, RegistrationState, StudentId, StudentRecord,
};

/// Outcome category of [`DuplicateGuard::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationCode {
    InvalidInput,
    NotFound,
    DuplicateRegistration,
    CourseFull,
    Valid,
}

impl fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            ValidationCode::InvalidInput => "INVALID_INPUT",
            ValidationCode::NotFound => "NOT_FOUND",
            ValidationCode::DuplicateRegistration => "DUPLICATE_REGISTRATION",
            ValidationCode::CourseFull => "COURSE_FULL",
            ValidationCode::Valid => "VALID",
        };
        f.write_str(code)
    }
}

/// Result of validating a registration request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub ok: bool,
    pub message: String,
    pub code: ValidationCode,
}

impl ValidationResult {
    fn rejected(code: ValidationCode, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
            code,
        }
    }

    fn valid(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
            code: ValidationCode::Valid,
        }
    }
}

/// Set-based registration state machine.
#[derive(Debug, Default)]
pub struct DuplicateGuard {
    active: HashSet<RegistrationKey>,
    pending: HashSet<RegistrationKey>,
    completed: HashSet<RegistrationKey>,
    dropped: HashSet<RegistrationKey>,
}

impl DuplicateGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the key holds or awaits a seat.
    pub fn is_already_registered(&self, key: &RegistrationKey) -> bool {
        self.active.contains(key) || self.pending.contains(key)
    }

    /// Move a key to Active, promoting it out of Pending if needed.
    ///
    /// Fails without mutation when the key is already Active.
    pub fn record_registration(&mut self, key: &RegistrationKey) -> bool {
        if !self.active.insert(key.clone()) {
            return false;
        }
        self.pending.remove(key);
        true
    }

    /// Move an Active or Pending key to Dropped.
    ///
    /// Returns `false` when the key was in neither set.
    pub fn record_drop(&mut self, key: &RegistrationKey) -> bool {
        let removed_active = self.active.remove(key);
        let removed_pending = self.pending.remove(key);
        if removed_active || removed_pending {
            self.dropped.insert(key.clone());
            return true;
        }
        false
    }

    /// Put a key on the pending list (waitlisted).
    pub fn add_pending(&mut self, key: &RegistrationKey) -> bool {
        if self.active.contains(key) {
            return false;
        }
        self.pending.insert(key.clone())
    }

    /// Move an Active key to Completed.
    pub fn record_completion(&mut self, key: &RegistrationKey) -> bool {
        if !self.active.remove(key) {
            return false;
        }
        self.completed.insert(key.clone());
        true
    }

    /// Current workflow state of a key, `None` if never requested.
    pub fn state(&self, key: &RegistrationKey) -> Option<RegistrationState> {
        if self.active.contains(key) {
            Some(RegistrationState::Active)
        } else if self.pending.contains(key) {
            Some(RegistrationState::Pending)
        } else if self.completed.contains(key) {
            Some(RegistrationState::Completed)
        } else if self.dropped.contains(key) {
            Some(RegistrationState::Dropped)
        } else {
            None
        }
    }

    /// Check whether `student_id` may register for `course_code`.
    ///
    /// Checks run in a fixed order and the first failure wins:
    /// input, records present, duplicate, capacity.
    pub fn validate<C, S>(
        &self,
        student_id: StudentId,
        course_code: &str,
        course: Option<&C>,
        student: Option<&S>,
    ) -> ValidationResult
    where
        C: CourseRecord,
        S: StudentRecord,
    {
        let Ok(key) = RegistrationKey::new(student_id, course_code) else {
            return ValidationResult::rejected(
                ValidationCode::InvalidInput,
                "Invalid student ID or course code",
            );
        };

        let (Some(course), Some(_)) = (course, student) else {
            return ValidationResult::rejected(
                ValidationCode::NotFound,
                "Course or student information not found",
            );
        };

        if self.is_already_registered(&key) {
            return ValidationResult::rejected(
                ValidationCode::DuplicateRegistration,
                "Student is already registered or pending for this course",
            );
        }

        if !course.has_available_spots() {
            return ValidationResult::rejected(
                ValidationCode::CourseFull,
                "Course is full - no available spots",
            );
        }

        ValidationResult::valid("Registration validation successful")
    }

    /// Duplicate-only validation of one student against several courses.
    pub fn validate_many<'a>(
        &self,
        student_id: StudentId,
        course_codes: impl IntoIterator<Item = &'a str>,
    ) -> BTreeMap<String, ValidationResult> {
        course_codes
            .into_iter()
            .map(|code| {
                let result = match RegistrationKey::new(student_id, code) {
                    Err(_) => ValidationResult::rejected(
                        ValidationCode::InvalidInput,
                        format!("Invalid input for {code}"),
                    ),
                    Ok(key) if self.is_already_registered(&key) => ValidationResult::rejected(
                        ValidationCode::DuplicateRegistration,
                        format!("Already registered for {code}"),
                    ),
                    Ok(_) => ValidationResult::valid(format!("Validation passed for {code}")),
                };
                (code.to_string(), result)
            })
            .collect()
    }

    /// Courses the student is actively registered for. Scans the active set.
    pub fn student_courses(&self, student_id: StudentId) -> BTreeSet<CourseCode> {
        self.active
            .iter()
            .filter(|key| key.student() == student_id)
            .map(|key| key.course().clone())
            .collect()
    }

    /// Students actively registered for the course. Scans the active set.
    pub fn course_students(&self, course_code: &str) -> BTreeSet<StudentId> {
        let Ok(code) = CourseCode::new(course_code) else {
            return BTreeSet::new();
        };
        self.active
            .iter()
            .filter(|key| *key.course() == code)
            .map(|key| key.student())
            .collect()
    }

    /// Courses both students are actively registered for.
    pub fn common_registrations(&self, first: StudentId, second: StudentId) -> BTreeSet<CourseCode> {
        let first_courses = self.student_courses(first);
        let second_courses = self.student_courses(second);
        first_courses
            .intersection(&second_courses)
            .cloned()
            .collect()
    }

    pub fn active_registrations(&self) -> HashSet<RegistrationKey> {
        self.active.clone()
    }

    pub fn pending_registrations(&self) -> HashSet<RegistrationKey> {
        self.pending.clone()
    }

    pub fn completed_registrations(&self) -> HashSet<RegistrationKey> {
        self.completed.clone()
    }

    pub fn dropped_registrations(&self) -> HashSet<RegistrationKey> {
        self.dropped.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Course, Student};

    fn key(student: StudentId, course: &str) -> RegistrationKey {
        RegistrationKey::new(student, course).unwrap()
    }

    fn course(code: &str, capacity: u32) -> Course {
        Course::new(CourseCode::new(code).unwrap(), "Test course", capacity)
    }

    fn never_active_and_pending(guard: &DuplicateGuard) {
        let active = guard.active_registrations();
        let pending = guard.pending_registrations();
        assert!(active.is_disjoint(&pending));
    }

    #[test]
    fn new_guard_has_no_registrations() {
        let guard = DuplicateGuard::new();
        assert!(!guard.is_already_registered(&key(1001, "CS101")));
        assert_eq!(guard.state(&key(1001, "CS101")), None);
    }

    #[test]
    fn record_registration_once() {
        let mut guard = DuplicateGuard::new();
        assert!(guard.record_registration(&key(1001, "CS101")));
        assert!(!guard.record_registration(&key(1001, "cs101")));
        assert!(guard.is_already_registered(&key(1001, "CS101")));
        assert_eq!(guard.active_registrations().len(), 1);
    }

    #[test]
    fn pending_then_registration_promotes() {
        let mut guard = DuplicateGuard::new();
        let k = key(1001, "CS101");
        assert!(guard.add_pending(&k));
        assert!(!guard.add_pending(&k));
        assert_eq!(guard.state(&k), Some(RegistrationState::Pending));
        assert!(guard.is_already_registered(&k));

        assert!(guard.record_registration(&k));
        assert_eq!(guard.state(&k), Some(RegistrationState::Active));
        assert!(guard.pending_registrations().is_empty());
        never_active_and_pending(&guard);
    }

    #[test]
    fn add_pending_rejects_active_key() {
        let mut guard = DuplicateGuard::new();
        let k = key(1001, "CS101");
        guard.record_registration(&k);
        assert!(!guard.add_pending(&k));
        never_active_and_pending(&guard);
    }

    #[test]
    fn record_drop_from_active_and_pending() {
        let mut guard = DuplicateGuard::new();
        let active = key(1001, "CS101");
        let pending = key(1002, "CS101");
        guard.record_registration(&active);
        guard.add_pending(&pending);

        assert!(guard.record_drop(&active));
        assert!(guard.record_drop(&pending));
        assert_eq!(guard.state(&active), Some(RegistrationState::Dropped));
        assert_eq!(guard.state(&pending), Some(RegistrationState::Dropped));
        assert_eq!(guard.dropped_registrations().len(), 2);
    }

    #[test]
    fn record_drop_unknown_key_is_noop() {
        let mut guard = DuplicateGuard::new();
        assert!(!guard.record_drop(&key(1001, "CS101")));
        assert!(guard.dropped_registrations().is_empty());
    }

    #[test]
    fn dropped_key_can_register_again() {
        let mut guard = DuplicateGuard::new();
        let k = key(1001, "CS101");
        guard.record_registration(&k);
        guard.record_drop(&k);
        assert!(!guard.is_already_registered(&k));
        assert!(guard.record_registration(&k));
        assert_eq!(guard.state(&k), Some(RegistrationState::Active));
    }

    #[test]
    fn completion_only_from_active() {
        let mut guard = DuplicateGuard::new();
        let k = key(1001, "CS101");
        assert!(!guard.record_completion(&k));
        guard.add_pending(&k);
        assert!(!guard.record_completion(&k));
        guard.record_registration(&k);
        assert!(guard.record_completion(&k));
        assert_eq!(guard.state(&k), Some(RegistrationState::Completed));
        assert!(!guard.is_already_registered(&k));
    }

    #[test]
    fn validate_checks_in_order() {
        let mut guard = DuplicateGuard::new();
        let open = course("CS101", 1);
        let full = course("CS102", 0);
        let student = Student::new(1001, "Ada", "Lovelace");

        let result = guard.validate(1001, "  ", Some(&open), Some(&student));
        assert_eq!(result.code, ValidationCode::InvalidInput);
        assert!(!result.ok);

        let result = guard.validate::<Course, Student>(1001, "CS101", Some(&open), None);
        assert_eq!(result.code, ValidationCode::NotFound);

        guard.record_registration(&key(1001, "CS102"));
        // duplicate wins over capacity
        let result = guard.validate(1001, "CS102", Some(&full), Some(&student));
        assert_eq!(result.code, ValidationCode::DuplicateRegistration);

        let result = guard.validate(1002, "CS102", Some(&full), Some(&student));
        assert_eq!(result.code, ValidationCode::CourseFull);

        let result = guard.validate(1002, "CS101", Some(&open), Some(&student));
        assert!(result.ok);
        assert_eq!(result.code, ValidationCode::Valid);
        assert_eq!(result.code.to_string(), "VALID");
    }

    #[test]
    fn validate_rejects_low_student_id() {
        let guard = DuplicateGuard::new();
        let open = course("CS101", 1);
        let student = Student::new(12, "Ada", "Lovelace");
        let result = guard.validate(12, "CS101", Some(&open), Some(&student));
        assert_eq!(result.code, ValidationCode::InvalidInput);
    }

    #[test]
    fn validate_many_reports_per_course() {
        let mut guard = DuplicateGuard::new();
        guard.record_registration(&key(1001, "CS101"));

        let results = guard.validate_many(1001, ["CS101", "MATH201", ""]);
        assert_eq!(results["CS101"].code, ValidationCode::DuplicateRegistration);
        assert_eq!(results["MATH201"].code, ValidationCode::Valid);
        assert_eq!(results[""].code, ValidationCode::InvalidInput);
    }

    #[test]
    fn derived_queries_scan_active_set() {
        let mut guard = DuplicateGuard::new();
        guard.record_registration(&key(1001, "CS101"));
        guard.record_registration(&key(1001, "MATH201"));
        guard.record_registration(&key(1002, "CS101"));
        guard.add_pending(&key(1003, "CS101"));

        let courses: Vec<_> = guard
            .student_courses(1001)
            .into_iter()
            .map(|c| c.to_string())
            .collect();
        assert_eq!(courses, vec!["CS101", "MATH201"]);
        assert_eq!(
            guard.course_students("cs101"),
            BTreeSet::from([1001, 1002])
        );
        assert!(guard.course_students("").is_empty());
    }

    #[test]
    fn common_registrations_intersects() {
        let mut guard = DuplicateGuard::new();
        guard.record_registration(&key(1001, "CS101"));
        guard.record_registration(&key(1001, "MATH201"));
        guard.record_registration(&key(1002, "MATH201"));
        guard.record_registration(&key(1002, "HIST100"));

        let common = guard.common_registrations(1001, 1002);
        assert_eq!(common, BTreeSet::from([CourseCode::new("MATH201").unwrap()]));
        assert!(guard.common_registrations(1001, 1003).is_empty());
    }

    #[test]
    fn accessors_return_copies() {
        let mut guard = DuplicateGuard::new();
        guard.record_registration(&key(1001, "CS101"));
        let mut copy = guard.active_registrations();
        copy.clear();
        assert_eq!(guard.active_registrations().len(), 1);
    }
}
