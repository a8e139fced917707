//! Bidirectional enrollment index.
//!
//! Every edge "student enrolled in course" is stored twice, once in the
//! course -> students map and once in the student -> courses map. An edge is
//! present in one map iff it is present in the other. Each course also keeps
//! an append-only history, and each (student, course) pair a detail record
//! that outlives the edge.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::{error, warn};

use crate::model::{CourseCode, RegistrationKey, StudentId};

mod record;
pub use record::{
    EnrollmentAction, EnrollmentDetail, EnrollmentRecord, EnrollmentStatistics, EnrollmentStatus,
};

mod error;
pub use error::{IndexError, IndexSide};

/// Course <-> student index with history.
#[derive(Debug, Default)]
pub struct EnrollmentIndex {
    /// Ordered so statistics ties resolve to the smallest course code
    course_students: BTreeMap<CourseCode, BTreeSet<StudentId>>,
    student_courses: HashMap<StudentId, BTreeSet<CourseCode>>,
    history: HashMap<CourseCode, Vec<EnrollmentRecord>>,
    details: HashMap<RegistrationKey, EnrollmentDetail>,
}

/// Public API
impl EnrollmentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enroll `student` in `course`.
    ///
    /// Fails on invalid input or when the edge already exists. A failed call
    /// leaves no trace in either map.
    pub fn enroll(&mut self, student: StudentId, course: &str) -> bool {
        match RegistrationKey::new(student, course) {
            Ok(key) => self.enroll_key(&key),
            Err(_) => false,
        }
    }

    /// Remove the edge from both maps.
    ///
    /// Returns `Ok(false)` when the edge did not exist. An edge found in only
    /// one of the two maps is reported as [`IndexError::Inconsistent`].
    pub fn unenroll(&mut self, student: StudentId, course: &str) -> Result<bool, IndexError> {
        let Ok(key) = RegistrationKey::new(student, course) else {
            return Ok(false);
        };
        self.unenroll_key(&key)
    }

    /// Move `student` from `from` to `to`.
    ///
    /// Declined (`Ok(false)`) when the student is not in `from` or already in
    /// `to`. If joining `to` fails after leaving `from`, the student is put
    /// back into `from` and the call is declined; if that compensating enroll
    /// fails too, [`IndexError::RollbackFailed`] is returned.
    pub fn transfer(
        &mut self,
        student: StudentId,
        from: &str,
        to: &str,
    ) -> Result<bool, IndexError> {
        let Ok(from_key) = RegistrationKey::new(student, from) else {
            return Ok(false);
        };
        let to_key = RegistrationKey::new(student, to).ok();

        let Some(courses) = self.student_courses.get(&student) else {
            return Ok(false);
        };
        if !courses.contains(from_key.course()) {
            return Ok(false);
        }
        if let Some(to_key) = &to_key {
            if courses.contains(to_key.course()) {
                return Ok(false);
            }
        }

        let saved_detail = self.details.get(&from_key).cloned();
        if !self.unenroll_key(&from_key)? {
            return Ok(false);
        }

        let to_key = match to_key {
            Some(key) if self.enroll_key(&key) => key,
            _ => return self.roll_back_transfer(&from_key, saved_detail),
        };

        self.append(
            from_key.course(),
            EnrollmentRecord::new(student, EnrollmentAction::TransferredOut)
                .with_note(format!("Transferred to {}", to_key.course())),
        );
        self.append(
            to_key.course(),
            EnrollmentRecord::new(student, EnrollmentAction::TransferredIn)
                .with_note(format!("Transferred from {}", from_key.course())),
        );

        Ok(true)
    }

    /// Enroll several students independently, reporting each outcome.
    pub fn enroll_many(
        &mut self,
        students: impl IntoIterator<Item = StudentId>,
        course: &str,
    ) -> BTreeMap<StudentId, bool> {
        let mut results = BTreeMap::new();
        for student in students {
            let enrolled = self.enroll(student, course);
            results.insert(student, enrolled);
        }
        results
    }

    pub fn is_enrolled(&self, student: StudentId, course: &str) -> bool {
        CourseCode::new(course).is_ok_and(|code| {
            self.course_students
                .get(&code)
                .is_some_and(|students| students.contains(&student))
        })
    }

    /// Students enrolled in `course`; empty when unknown.
    pub fn enrolled_students(&self, course: &str) -> BTreeSet<StudentId> {
        CourseCode::new(course)
            .ok()
            .and_then(|code| self.course_students.get(&code))
            .cloned()
            .unwrap_or_default()
    }

    /// Courses `student` is enrolled in; empty when unknown.
    pub fn student_courses(&self, student: StudentId) -> BTreeSet<CourseCode> {
        self.student_courses
            .get(&student)
            .cloned()
            .unwrap_or_default()
    }

    pub fn course_enrollment_count(&self, course: &str) -> usize {
        CourseCode::new(course)
            .ok()
            .and_then(|code| self.course_students.get(&code))
            .map_or(0, BTreeSet::len)
    }

    pub fn student_course_count(&self, student: StudentId) -> usize {
        self.student_courses.get(&student).map_or(0, BTreeSet::len)
    }

    /// Students enrolled in every one of `courses`.
    pub fn find_in_all<'a>(
        &self,
        courses: impl IntoIterator<Item = &'a str>,
    ) -> BTreeSet<StudentId> {
        let mut result: Option<BTreeSet<StudentId>> = None;
        for course in courses {
            let students = self.enrolled_students(course);
            let next = match result {
                None => students,
                Some(acc) => acc.intersection(&students).copied().collect(),
            };
            if next.is_empty() {
                return next;
            }
            result = Some(next);
        }
        result.unwrap_or_default()
    }

    /// Students enrolled in at least one of `courses`.
    pub fn find_in_any<'a>(
        &self,
        courses: impl IntoIterator<Item = &'a str>,
    ) -> BTreeSet<StudentId> {
        courses
            .into_iter()
            .flat_map(|course| self.enrolled_students(course))
            .collect()
    }

    /// Single pass over the course map.
    pub fn statistics(&self) -> EnrollmentStatistics {
        if self.course_students.is_empty() {
            return EnrollmentStatistics::default();
        }

        let mut total_enrollments = 0;
        let mut most: Option<(&CourseCode, usize)> = None;
        let mut least: Option<(&CourseCode, usize)> = None;

        for (code, students) in &self.course_students {
            let count = students.len();
            total_enrollments += count;

            if most.is_none_or(|(_, max)| count > max) {
                most = Some((code, count));
            }
            if least.is_none_or(|(_, min)| count < min) {
                least = Some((code, count));
            }
        }

        let total_courses = self.course_students.len();
        EnrollmentStatistics {
            total_courses,
            total_enrollments,
            average_per_course: total_enrollments as f64 / total_courses as f64,
            most_popular: most.map(|(code, _)| code.clone()),
            least_popular: least.map(|(code, _)| code.clone()),
        }
    }

    pub fn detail(&self, student: StudentId, course: &str) -> Option<EnrollmentDetail> {
        let key = RegistrationKey::new(student, course).ok()?;
        self.details.get(&key).cloned()
    }

    /// Attach a grade to an existing enrollment detail.
    pub fn set_grade(&mut self, student: StudentId, course: &str, grade: &str) -> bool {
        let Ok(key) = RegistrationKey::new(student, course) else {
            return false;
        };
        match self.details.get_mut(&key) {
            Some(detail) => {
                detail.grade = Some(grade.trim().to_string());
                true
            }
            None => false,
        }
    }

    /// Full history of `course`, oldest first.
    pub fn history(&self, course: &str) -> Vec<EnrollmentRecord> {
        CourseCode::new(course)
            .ok()
            .and_then(|code| self.history.get(&code))
            .cloned()
            .unwrap_or_default()
    }

    /// Deep copy of the course -> students map.
    pub fn course_map(&self) -> BTreeMap<CourseCode, BTreeSet<StudentId>> {
        self.course_students.clone()
    }

    /// Deep copy of the student -> courses map.
    pub fn student_map(&self) -> HashMap<StudentId, BTreeSet<CourseCode>> {
        self.student_courses.clone()
    }
}

/// Private API
impl EnrollmentIndex {
    fn enroll_key(&mut self, key: &RegistrationKey) -> bool {
        let course = key.course();
        let student = key.student();

        let already = self
            .course_students
            .get(course)
            .is_some_and(|students| students.contains(&student));
        if already {
            return false;
        }

        self.course_students
            .entry(course.clone())
            .or_default()
            .insert(student);
        self.student_courses
            .entry(student)
            .or_default()
            .insert(course.clone());

        self.details
            .insert(key.clone(), EnrollmentDetail::new(student, course.clone()));
        self.append(
            course,
            EnrollmentRecord::new(student, EnrollmentAction::Enrolled),
        );

        true
    }

    fn unenroll_key(&mut self, key: &RegistrationKey) -> Result<bool, IndexError> {
        let course = key.course();
        let student = key.student();

        let mut removed_from_course = false;
        if let Some(students) = self.course_students.get_mut(course) {
            removed_from_course = students.remove(&student);
            if students.is_empty() {
                self.course_students.remove(course);
            }
        }

        let mut removed_from_student = false;
        if let Some(courses) = self.student_courses.get_mut(&student) {
            removed_from_student = courses.remove(course);
            if courses.is_empty() {
                self.student_courses.remove(&student);
            }
        }

        match (removed_from_course, removed_from_student) {
            (true, true) => {
                if let Some(detail) = self.details.get_mut(key) {
                    detail.status = EnrollmentStatus::Dropped;
                }
                self.append(
                    course,
                    EnrollmentRecord::new(student, EnrollmentAction::Dropped),
                );
                Ok(true)
            }
            (false, false) => Ok(false),
            (in_course_map, _) => {
                let found_in = if in_course_map {
                    IndexSide::CourseToStudents
                } else {
                    IndexSide::StudentToCourses
                };
                error!(
                    student = %student,
                    course = %course,
                    found_in = ?found_in,
                    "enrollment index out of sync"
                );
                Err(IndexError::Inconsistent {
                    student,
                    course: course.clone(),
                    found_in,
                })
            }
        }
    }

    /// Compensate a transfer whose second step failed.
    fn roll_back_transfer(
        &mut self,
        from_key: &RegistrationKey,
        saved_detail: Option<EnrollmentDetail>,
    ) -> Result<bool, IndexError> {
        if !self.enroll_key(from_key) {
            error!(
                student = %from_key.student(),
                course = %from_key.course(),
                "transfer rollback failed"
            );
            return Err(IndexError::RollbackFailed {
                student: from_key.student(),
                from: from_key.course().clone(),
            });
        }

        // the original enrollment metadata survives the round trip
        if let Some(detail) = saved_detail {
            self.details.insert(from_key.clone(), detail);
        }

        warn!(
            student = %from_key.student(),
            course = %from_key.course(),
            "transfer rolled back"
        );
        Ok(false)
    }

    fn append(&mut self, course: &CourseCode, record: EnrollmentRecord) {
        self.history.entry(course.clone()).or_default().push(record);
    }
}
