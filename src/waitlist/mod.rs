//! Per-course waitlists.
//!
//! Each course has a FIFO queue of students, a position index derived from
//! the queue order, and an entry log. Positions are 1-based and recomputed on
//! every mutation, so they always match queue order.

use std::collections::{BTreeMap, HashMap, VecDeque};

use crate::model::{CourseCode, RegistrationKey, StudentId};

mod dispatch;
pub use dispatch::{DEFAULT_URGENT_CUTOFF, Dispatched, Dispatcher, Lane, Request};

mod entry;
pub use entry::{DEFAULT_PRIORITY, WaitlistEntry, WaitlistStatistics, WaitlistStatus};

/// Default bound on a single course's waitlist.
pub const DEFAULT_MAX_WAITLIST_SIZE: usize = 50;

#[derive(Debug, Default)]
struct CourseWaitlist {
    queue: VecDeque<StudentId>,
    positions: HashMap<StudentId, usize>,
    entries: Vec<WaitlistEntry>,
}

impl CourseWaitlist {
    fn recompute_positions(&mut self) {
        self.positions.clear();
        for (idx, student) in self.queue.iter().enumerate() {
            self.positions.insert(*student, idx + 1);
        }
    }

    /// Flip the oldest waiting entry of `student`.
    fn mark(&mut self, student: StudentId, status: WaitlistStatus) {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.student == student && e.status == WaitlistStatus::Waiting)
        {
            entry.status = status;
        }
    }
}

/// Bounded FIFO waitlists keyed by course.
#[derive(Debug)]
pub struct WaitlistQueue {
    max_size: usize,
    courses: BTreeMap<CourseCode, CourseWaitlist>,
}

impl WaitlistQueue {
    pub fn new() -> Self {
        Self::with_max_size(DEFAULT_MAX_WAITLIST_SIZE)
    }

    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            max_size,
            courses: BTreeMap::new(),
        }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn set_max_size(&mut self, max_size: usize) {
        self.max_size = max_size;
    }

    /// Append `student` to the tail of `course`'s waitlist.
    ///
    /// Fails on invalid input, when the student is already queued, or when
    /// the waitlist is full.
    pub fn add(&mut self, student: StudentId, course: &str) -> bool {
        self.add_with_priority(student, course, DEFAULT_PRIORITY)
    }

    /// Like [`add`](Self::add), recording `priority` on the entry.
    pub fn add_with_priority(&mut self, student: StudentId, course: &str, priority: u32) -> bool {
        let Ok(key) = RegistrationKey::new(student, course) else {
            return false;
        };
        let max_size = self.max_size;
        let waitlist = self.courses.entry(key.course().clone()).or_default();

        if waitlist.positions.contains_key(&student) || waitlist.queue.len() >= max_size {
            return false;
        }

        waitlist.queue.push_back(student);
        waitlist.positions.insert(student, waitlist.queue.len());
        waitlist
            .entries
            .push(WaitlistEntry::new(student, key.course().clone(), priority));
        true
    }

    /// Dequeue the head of `course`'s waitlist.
    pub fn poll_next(&mut self, course: &str) -> Option<StudentId> {
        let waitlist = self.waitlist_mut(course)?;
        let student = waitlist.queue.pop_front()?;
        waitlist.recompute_positions();
        waitlist.mark(student, WaitlistStatus::Processed);
        Some(student)
    }

    pub fn peek_next(&self, course: &str) -> Option<StudentId> {
        self.waitlist(course)?.queue.front().copied()
    }

    /// Take `student` out of `course`'s waitlist wherever they stand.
    pub fn remove(&mut self, student: StudentId, course: &str) -> bool {
        let Some(waitlist) = self.waitlist_mut(course) else {
            return false;
        };
        let Some(position) = waitlist.positions.get(&student).copied() else {
            return false;
        };

        waitlist.queue.remove(position - 1);
        waitlist.recompute_positions();
        waitlist.mark(student, WaitlistStatus::Removed);
        true
    }

    /// 1-based position from the head, or -1 when not queued.
    pub fn position(&self, student: StudentId, course: &str) -> i32 {
        self.waitlist(course)
            .and_then(|waitlist| waitlist.positions.get(&student))
            .map_or(-1, |position| *position as i32)
    }

    /// Poll up to `n` students, in queue order.
    pub fn drain_many(&mut self, course: &str, n: usize) -> Vec<StudentId> {
        let mut drained = Vec::with_capacity(n.min(self.len(course)));
        for _ in 0..n {
            match self.poll_next(course) {
                Some(student) => drained.push(student),
                None => break,
            }
        }
        drained
    }

    /// Empty `course`'s waitlist, returning who was on it.
    pub fn clear(&mut self, course: &str) -> Vec<StudentId> {
        let Some(waitlist) = self.waitlist_mut(course) else {
            return Vec::new();
        };
        let cleared: Vec<StudentId> = waitlist.queue.drain(..).collect();
        waitlist.positions.clear();
        for entry in &mut waitlist.entries {
            if entry.status == WaitlistStatus::Waiting {
                entry.status = WaitlistStatus::Removed;
            }
        }
        cleared
    }

    pub fn len(&self, course: &str) -> usize {
        self.waitlist(course).map_or(0, |waitlist| waitlist.queue.len())
    }

    pub fn is_empty(&self, course: &str) -> bool {
        self.len(course) == 0
    }

    /// Queued students in order, head first.
    pub fn students(&self, course: &str) -> Vec<StudentId> {
        self.waitlist(course)
            .map(|waitlist| waitlist.queue.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Most recent entry logged for `student` on `course`.
    pub fn entry(&self, student: StudentId, course: &str) -> Option<WaitlistEntry> {
        self.waitlist(course)?
            .entries
            .iter()
            .rev()
            .find(|entry| entry.student == student)
            .cloned()
    }

    /// Course codes with a non-empty waitlist, sorted.
    pub fn courses(&self) -> Vec<CourseCode> {
        self.courses
            .iter()
            .filter(|(_, waitlist)| !waitlist.queue.is_empty())
            .map(|(code, _)| code.clone())
            .collect()
    }

    /// Fold over the non-empty waitlists; ties go to the smallest code.
    pub fn statistics(&self) -> WaitlistStatistics {
        let mut stats = WaitlistStatistics::default();
        let mut longest: Option<(&CourseCode, usize)> = None;
        let mut shortest: Option<(&CourseCode, usize)> = None;

        for (code, waitlist) in &self.courses {
            let len = waitlist.queue.len();
            if len == 0 {
                continue;
            }
            stats.total_waitlisted += len;
            stats.courses_with_waitlists += 1;

            if longest.is_none_or(|(_, max)| len > max) {
                longest = Some((code, len));
            }
            if shortest.is_none_or(|(_, min)| len < min) {
                shortest = Some((code, len));
            }
        }

        if stats.courses_with_waitlists > 0 {
            stats.average_length =
                stats.total_waitlisted as f64 / stats.courses_with_waitlists as f64;
        }
        stats.longest = longest.map(|(code, _)| code.clone());
        stats.shortest = shortest.map(|(code, _)| code.clone());
        stats
    }

    fn waitlist(&self, course: &str) -> Option<&CourseWaitlist> {
        let code = CourseCode::new(course).ok()?;
        self.courses.get(&code)
    }

    fn waitlist_mut(&mut self, course: &str) -> Option<&mut CourseWaitlist> {
        let code = CourseCode::new(course).ok()?;
        self.courses.get_mut(&code)
    }
}

impl Default for WaitlistQueue {
    fn default() -> Self {
        Self::new()
    }
}
