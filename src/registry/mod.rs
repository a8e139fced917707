//! Registration coordinator.
//!
//! The registry owns the duplicate guard, the enrollment index, the waitlist
//! and the dispatcher, plus the course and student records they are checked
//! against. The stores never talk to each other: every command goes through
//! the registry, which updates them in a fixed order (guard check, index
//! commit, course seat count, waitlist) so they stay mutually consistent.
//! Also supports an async stream of commands.

use std::collections::{BTreeMap, HashMap};

use tokio_stream::{Stream, StreamExt};
use tracing::{error, info, warn};

use crate::config::RegistryConfig;
use crate::enrollment::EnrollmentIndex;
use crate::guard::{DuplicateGuard, ValidationCode};
use crate::ids::StudentIdPool;
use crate::model::{
    Course, CourseCode, CourseRecord, RegistrationKey, RegistrationState, Student, StudentId,
};
use crate::waitlist::{Dispatched, Dispatcher, Request, WaitlistQueue};

mod command;
pub use command::{Command, Outcome, SeatRequest};

mod error;
pub use error::RegistryError;

/// Seat usage of one course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseSummary {
    pub code: CourseCode,
    pub capacity: u32,
    pub enrolled: u32,
    pub waitlisted: usize,
}

/// The registration coordinator.
#[derive(Debug)]
pub struct Registry {
    courses: BTreeMap<CourseCode, Course>,
    students: HashMap<StudentId, Student>,
    ids: StudentIdPool,
    guard: DuplicateGuard,
    index: EnrollmentIndex,
    waitlist: WaitlistQueue,
    /// Registrations queued for the next `Dispatch`
    dispatcher: Dispatcher<SeatRequest>,
}

/// Public API
impl Registry {
    pub fn new() -> Self {
        Self::with_config(&RegistryConfig::default())
    }

    pub fn with_config(config: &RegistryConfig) -> Self {
        Self {
            courses: BTreeMap::new(),
            students: HashMap::new(),
            ids: StudentIdPool::new(),
            guard: DuplicateGuard::new(),
            index: EnrollmentIndex::new(),
            waitlist: WaitlistQueue::with_max_size(config.max_waitlist_size),
            dispatcher: Dispatcher::with_urgent_cutoff(config.urgent_priority_cutoff),
        }
    }

    /// Run the registry with the given command stream
    pub async fn run(&mut self, mut stream: impl Stream<Item = Command> + Unpin) {
        while let Some(command) = stream.next().await {
            // a rejected command must not stop the registry; apply already logged it
            let _ = self.apply(command);
        }
    }

    /// Apply a single command on top of the current registry state
    pub fn apply(&mut self, command: Command) -> Result<Outcome, RegistryError> {
        let result = match &command {
            Command::AddCourse {
                code,
                name,
                capacity,
            } => self.apply_add_course(code, name, *capacity),
            Command::AddStudent {
                id,
                first_name,
                last_name,
            } => self.apply_add_student(*id, first_name, last_name),
            Command::Register { student, course } => self.apply_register(*student, course),
            Command::Drop { student, course } => self.apply_drop(*student, course),
            Command::Transfer { student, from, to } => self.apply_transfer(*student, from, to),
            Command::Request {
                student,
                course,
                priority,
            } => self.apply_request(*student, course, *priority),
            Command::Dispatch => self.apply_dispatch(),
        };
        Self::log_result(&command, &result);
        result
    }

    pub fn course(&self, code: &str) -> Option<&Course> {
        let code = CourseCode::new(code).ok()?;
        self.courses.get(&code)
    }

    /// Courses ordered by code.
    pub fn courses(&self) -> impl Iterator<Item = &Course> + '_ {
        self.courses.values()
    }

    pub fn student(&self, id: StudentId) -> Option<&Student> {
        self.students.get(&id)
    }

    /// Seat usage of every course, ordered by code.
    pub fn summaries(&self) -> impl Iterator<Item = CourseSummary> + '_ {
        self.courses.iter().map(|(code, course)| CourseSummary {
            code: code.clone(),
            capacity: course.max_capacity(),
            enrolled: course.enrolled(),
            waitlisted: self.waitlist.len(code.as_str()),
        })
    }

    pub fn guard(&self) -> &DuplicateGuard {
        &self.guard
    }

    pub fn index(&self) -> &EnrollmentIndex {
        &self.index
    }

    pub fn waitlist(&self) -> &WaitlistQueue {
        &self.waitlist
    }

    pub fn ids(&self) -> &StudentIdPool {
        &self.ids
    }

    /// Number of requests waiting for the next `Dispatch`.
    pub fn queued_requests(&self) -> usize {
        self.dispatcher.len()
    }
}

/// Private API
impl Registry {
    /// Small helper to log `apply` results
    fn log_result(command: &Command, result: &Result<Outcome, RegistryError>) {
        let kind = command.kind();
        match result {
            Ok(outcome) => info!(outcome = %outcome, "{kind} applied"),
            Err(e) if e.is_fault() => error!(reason = %e, "{kind} failed"),
            Err(e) => info!(reason = %e, "{kind} skipped"),
        }
    }

    fn apply_add_course(
        &mut self,
        code: &str,
        name: &str,
        capacity: u32,
    ) -> Result<Outcome, RegistryError> {
        let code = CourseCode::new(code)?;
        if self.courses.contains_key(&code) {
            return Err(RegistryError::DuplicateCourse(code));
        }
        self.courses
            .insert(code.clone(), Course::new(code.clone(), name, capacity));
        Ok(Outcome::CourseAdded(code))
    }

    fn apply_add_student(
        &mut self,
        id: Option<StudentId>,
        first_name: &str,
        last_name: &str,
    ) -> Result<Outcome, RegistryError> {
        let id = match id {
            Some(id) if self.ids.reserve(id) => id,
            Some(id) => return Err(RegistryError::StudentIdUnavailable(id)),
            None => self.ids.generate()?,
        };
        self.students
            .insert(id, Student::new(id, first_name, last_name));
        Ok(Outcome::StudentAdded(id))
    }

    /// Apply a `Command::Register`:
    /// - Validate against the guard and the course/student records
    /// - Seat the student when the course has room
    /// - Waitlist the student when it is full
    fn apply_register(
        &mut self,
        student: StudentId,
        course: &str,
    ) -> Result<Outcome, RegistryError> {
        let record = CourseCode::new(course)
            .ok()
            .and_then(|code| self.courses.get(&code));
        let validation =
            self.guard
                .validate(student, course, record, self.students.get(&student));

        match validation.code {
            ValidationCode::Valid => {
                let key = RegistrationKey::new(student, course)?;
                self.seat(&key)?;
                Ok(Outcome::Enrolled)
            }
            ValidationCode::CourseFull => {
                let key = RegistrationKey::new(student, course)?;
                self.enqueue(&key)
            }
            code => Err(RegistryError::Rejected {
                code,
                message: validation.message,
            }),
        }
    }

    /// Apply a `Command::Drop`:
    /// - A pending student leaves the waitlist
    /// - An active student is unenrolled and the seat goes to the waitlist head
    fn apply_drop(&mut self, student: StudentId, course: &str) -> Result<Outcome, RegistryError> {
        let key = RegistrationKey::new(student, course)?;
        match self.guard.state(&key) {
            Some(RegistrationState::Pending) => {
                self.waitlist.remove(student, key.course().as_str());
                self.guard.record_drop(&key);
                Ok(Outcome::LeftWaitlist)
            }
            Some(RegistrationState::Active) => {
                if !self.index.unenroll(student, key.course().as_str())? {
                    return Err(RegistryError::NotRegistered(student, key.course().clone()));
                }
                self.guard.record_drop(&key);
                self.release_seat(key.course());
                let promoted = self.promote(key.course())?;
                Ok(Outcome::Dropped { promoted })
            }
            _ => Err(RegistryError::NotRegistered(student, key.course().clone())),
        }
    }

    /// Apply a `Command::Transfer`:
    /// - Ensure the target course exists, has room and does not already hold
    ///   the student
    /// - Move the index edge (rolled back by the index on failure)
    /// - Move the guard state and both seat counts
    /// - Hand the freed seat to the source waitlist head
    fn apply_transfer(
        &mut self,
        student: StudentId,
        from: &str,
        to: &str,
    ) -> Result<Outcome, RegistryError> {
        let from_key = RegistrationKey::new(student, from)?;
        let to_key = RegistrationKey::new(student, to)?;

        let target = self
            .courses
            .get(to_key.course())
            .ok_or_else(|| RegistryError::UnknownCourse(to_key.course().clone()))?;
        if !target.has_available_spots() {
            return Err(RegistryError::CourseFull(to_key.course().clone()));
        }

        let declined = || RegistryError::TransferDeclined {
            student,
            from: from_key.course().clone(),
            to: to_key.course().clone(),
        };
        if self.guard.is_already_registered(&to_key) {
            return Err(declined());
        }
        if !self
            .index
            .transfer(student, from_key.course().as_str(), to_key.course().as_str())?
        {
            return Err(declined());
        }

        self.guard.record_drop(&from_key);
        self.guard.record_registration(&to_key);
        self.release_seat(from_key.course());
        if let Some(course) = self.courses.get_mut(to_key.course()) {
            course.increment_enrollment();
        }

        let promoted = self.promote(from_key.course())?;
        Ok(Outcome::Transferred { promoted })
    }

    fn apply_request(
        &mut self,
        student: StudentId,
        course: &str,
        priority: u32,
    ) -> Result<Outcome, RegistryError> {
        let key = RegistrationKey::new(student, course)?;
        let request = SeatRequest {
            student,
            course: key.course().clone(),
        };
        let lane = self.dispatcher.submit(Request::new(request, priority));
        Ok(Outcome::Queued(lane))
    }

    /// Apply a `Command::Dispatch`: register every queued request in
    /// interleaved lane order. Failed registrations are counted, not fatal.
    fn apply_dispatch(&mut self) -> Result<Outcome, RegistryError> {
        let batch: Vec<_> = self.dispatcher.drain().collect();
        let (mut enrolled, mut waitlisted, mut rejected) = (0, 0, 0);

        for Dispatched { lane, request } in batch {
            let SeatRequest { student, course } = request.item;
            match self.apply_register(student, course.as_str()) {
                Ok(Outcome::Waitlisted { .. }) => waitlisted += 1,
                Ok(_) => enrolled += 1,
                Err(e) => {
                    rejected += 1;
                    if e.is_fault() {
                        error!(
                            student = %student,
                            course = %course,
                            lane = ?lane,
                            reason = %e,
                            "dispatched registration failed"
                        );
                    } else {
                        warn!(
                            student = %student,
                            course = %course,
                            lane = ?lane,
                            reason = %e,
                            "dispatched registration failed"
                        );
                    }
                }
            }
        }

        Ok(Outcome::Dispatched {
            enrolled,
            waitlisted,
            rejected,
        })
    }

    /// Give `key` a seat: index edge, then guard state, then seat count.
    fn seat(&mut self, key: &RegistrationKey) -> Result<(), RegistryError> {
        let course = self
            .courses
            .get_mut(key.course())
            .ok_or_else(|| RegistryError::UnknownCourse(key.course().clone()))?;
        if !course.has_available_spots() {
            return Err(RegistryError::CourseFull(key.course().clone()));
        }
        if !self.index.enroll(key.student(), key.course().as_str()) {
            return Err(RegistryError::AlreadyEnrolled(
                key.student(),
                key.course().clone(),
            ));
        }
        course.increment_enrollment();
        self.guard.record_registration(key);
        Ok(())
    }

    /// Put `key` on its course waitlist as pending.
    fn enqueue(&mut self, key: &RegistrationKey) -> Result<Outcome, RegistryError> {
        let (student, course) = (key.student(), key.course());
        if !self.waitlist.add(student, course.as_str()) {
            return Err(RegistryError::WaitlistRejected(course.clone(), student));
        }
        self.guard.add_pending(key);
        let position = self.waitlist.position(student, course.as_str());
        Ok(Outcome::Waitlisted {
            position: usize::try_from(position).unwrap_or_default(),
        })
    }

    fn release_seat(&mut self, code: &CourseCode) {
        if let Some(course) = self.courses.get_mut(code) {
            if !course.decrement_enrollment() {
                warn!(course = %code, "seat count already at zero");
            }
        }
    }

    /// Seat the head of `code`'s waitlist, if any. A head that cannot be
    /// seated is dropped from the guard and the seat stays free.
    fn promote(&mut self, code: &CourseCode) -> Result<Option<StudentId>, RegistryError> {
        let Some(student) = self.waitlist.poll_next(code.as_str()) else {
            return Ok(None);
        };
        let key = RegistrationKey::new(student, code.as_str())?;
        match self.seat(&key) {
            Ok(()) => {
                info!(student = %student, course = %code, "promoted from waitlist");
                Ok(Some(student))
            }
            Err(e) if e.is_fault() => Err(e),
            Err(e) => {
                warn!(student = %student, course = %code, reason = %e, "waitlist head not seated");
                self.guard.record_drop(&key);
                Ok(None)
            }
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
