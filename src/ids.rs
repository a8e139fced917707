//! Student id allocation.

use std::collections::{HashSet, VecDeque};

use thiserror::Error;

use crate::model::{MIN_STUDENT_ID, StudentId};

/// Largest id the pool hands out.
pub const MAX_STUDENT_ID: StudentId = 999_999;

const RECENT_CAPACITY: usize = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdError {
    #[error("no student ids left below {0}")]
    Exhausted(StudentId),
}

/// Tracks which student ids are in use and hands out new ones.
#[derive(Debug)]
pub struct StudentIdPool {
    used: HashSet<StudentId>,
    /// Last reservations, oldest first
    recent: VecDeque<StudentId>,
    next_available: StudentId,
}

impl StudentIdPool {
    pub fn new() -> Self {
        Self {
            used: HashSet::new(),
            recent: VecDeque::with_capacity(RECENT_CAPACITY + 1),
            next_available: MIN_STUDENT_ID,
        }
    }

    /// A pool with `ids` already taken. Invalid ids are ignored.
    pub fn with_reserved(ids: impl IntoIterator<Item = StudentId>) -> Self {
        let mut pool = Self::new();
        for id in ids {
            pool.reserve(id);
        }
        pool
    }

    /// An id is valid when in range and not a round `...0000` value.
    pub fn validate(id: StudentId) -> bool {
        (MIN_STUDENT_ID..=MAX_STUDENT_ID).contains(&id) && id % 10_000 != 0
    }

    /// Allocate the first unused valid id at or after the cursor.
    pub fn generate(&mut self) -> Result<StudentId, IdError> {
        let candidate = (self.next_available..=MAX_STUDENT_ID)
            .find(|id| Self::validate(*id) && !self.used.contains(id))
            .ok_or(IdError::Exhausted(MAX_STUDENT_ID))?;

        self.reserve(candidate);
        self.next_available = candidate + 1;
        Ok(candidate)
    }

    /// Mark `id` as used. Fails when invalid or already taken.
    pub fn reserve(&mut self, id: StudentId) -> bool {
        if !Self::validate(id) || !self.used.insert(id) {
            return false;
        }

        self.recent.push_back(id);
        if self.recent.len() > RECENT_CAPACITY {
            self.recent.pop_front();
        }

        if id == self.next_available {
            self.next_available += 1;
        }
        true
    }

    /// Return `id` to the pool. Fails when invalid or unknown.
    pub fn release(&mut self, id: StudentId) -> bool {
        if !Self::validate(id) || !self.used.remove(&id) {
            return false;
        }
        // recent assignments are history and keep the released id
        if id < self.next_available {
            self.next_available = id;
        }
        true
    }

    pub fn is_used(&self, id: StudentId) -> bool {
        self.used.contains(&id)
    }

    pub fn next_available(&self) -> StudentId {
        self.next_available
    }

    pub fn recently_assigned(&self) -> Vec<StudentId> {
        self.recent.iter().copied().collect()
    }

    /// Render an id as `STU001234`.
    pub fn format(id: StudentId) -> String {
        if Self::validate(id) {
            format!("STU{id:06}")
        } else {
            format!("INVALID_ID_{id}")
        }
    }

    /// Parse `STU001234` or plain digits back into a valid id.
    pub fn parse(raw: &str) -> Option<StudentId> {
        let clean = raw.trim().to_uppercase();
        if clean.is_empty() {
            return None;
        }
        let digits = clean.strip_prefix("STU").unwrap_or(&clean);
        let id = digits.parse::<StudentId>().ok()?;
        Self::validate(id).then_some(id)
    }
}

impl Default for StudentIdPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_reserved_marks_ids_used() {
        let pool = StudentIdPool::with_reserved([1001, 1002, 7]);
        assert!(pool.is_used(1001));
        assert!(pool.is_used(1002));
        assert!(!pool.is_used(7));
        assert_eq!(pool.recently_assigned(), vec![1001, 1002]);
    }

    #[test]
    fn generate_skips_used_ids() {
        let mut pool = StudentIdPool::with_reserved([1001, 1002]);
        assert_eq!(pool.generate(), Ok(1000));
        // 1001 and 1002 are seeded
        assert_eq!(pool.generate(), Ok(1003));
        assert_eq!(pool.next_available(), 1004);
    }

    #[test]
    fn validate_bounds() {
        assert!(!StudentIdPool::validate(999));
        assert!(!StudentIdPool::validate(1_000_000));
        assert!(!StudentIdPool::validate(20_000));
        assert!(StudentIdPool::validate(1234));
        assert!(StudentIdPool::validate(MAX_STUDENT_ID));
    }

    #[test]
    fn reserve_twice_fails() {
        let mut pool = StudentIdPool::new();
        assert!(pool.reserve(5000));
        assert!(!pool.reserve(5000));
        assert!(!pool.reserve(10_000));
    }

    #[test]
    fn release_rewinds_cursor() {
        let mut pool = StudentIdPool::with_reserved([1001, 1002]);
        let id = pool.generate().unwrap();
        pool.generate().unwrap();
        assert!(pool.release(id));
        assert_eq!(pool.next_available(), id);
        assert_eq!(pool.generate(), Ok(id));
        assert!(!pool.release(4242));
    }

    #[test]
    fn recent_list_is_bounded() {
        let mut pool = StudentIdPool::with_reserved([1001, 1002]);
        for _ in 0..20 {
            pool.generate().unwrap();
        }
        let recent = pool.recently_assigned();
        assert_eq!(recent.len(), 10);
        assert_eq!(recent.last(), Some(&1021));
    }

    #[test]
    fn format_and_parse() {
        assert_eq!(StudentIdPool::format(1234), "STU001234");
        assert_eq!(StudentIdPool::format(42), "INVALID_ID_42");
        assert_eq!(StudentIdPool::parse(" stu001234 "), Some(1234));
        assert_eq!(StudentIdPool::parse("1234"), Some(1234));
        assert_eq!(StudentIdPool::parse("STUabc"), None);
        assert_eq!(StudentIdPool::parse("  "), None);
        assert_eq!(StudentIdPool::parse("999"), None);
    }
}
