//! Two-lane request dispatcher.
//!
//! Requests are split on intake into an urgent lane, ordered by ascending
//! priority then submission time, and a plain FIFO normal lane. Draining
//! alternates strictly between the lanes, one request at a time, skipping a
//! lane while it is empty, until both are empty.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, VecDeque};

use chrono::Utc;

use crate::model::Timestamp;

/// Highest priority value routed to the urgent lane by default.
pub const DEFAULT_URGENT_CUTOFF: u32 = 2;

/// Dispatcher lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lane {
    Urgent,
    Normal,
}

impl Lane {
    fn other(self) -> Self {
        match self {
            Lane::Urgent => Lane::Normal,
            Lane::Normal => Lane::Urgent,
        }
    }
}

/// A waiting request. Lower `priority` values are more urgent.
#[derive(Debug, Clone, PartialEq)]
pub struct Request<T> {
    pub item: T,
    pub priority: u32,
    pub submitted_at: Timestamp,
}

impl<T> Request<T> {
    pub fn new(item: T, priority: u32) -> Self {
        Self::at(item, priority, Utc::now())
    }

    pub fn at(item: T, priority: u32, submitted_at: Timestamp) -> Self {
        Self {
            item,
            priority,
            submitted_at,
        }
    }
}

/// A request leaving the dispatcher, tagged with its lane.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatched<T> {
    pub lane: Lane,
    pub request: Request<T>,
}

/// Urgent-lane slot. Ordered by (priority, submitted_at, seq) only, so the
/// payload needs no ordering of its own.
#[derive(Debug)]
struct Ranked<T> {
    seq: u64,
    request: Request<T>,
}

impl<T> Ranked<T> {
    fn rank(&self) -> (u32, Timestamp, u64) {
        (self.request.priority, self.request.submitted_at, self.seq)
    }
}

impl<T> PartialEq for Ranked<T> {
    fn eq(&self, other: &Self) -> bool {
        self.rank() == other.rank()
    }
}

impl<T> Eq for Ranked<T> {}

impl<T> PartialOrd for Ranked<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Ranked<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

/// Interleaving dispatcher over an urgent and a normal lane.
#[derive(Debug)]
pub struct Dispatcher<T> {
    urgent: BinaryHeap<Reverse<Ranked<T>>>,
    normal: VecDeque<Request<T>>,
    urgent_cutoff: u32,
    /// Intake counter, breaks exact timestamp ties
    next_seq: u64,
    turn: Lane,
}

impl<T> Dispatcher<T> {
    pub fn new() -> Self {
        Self::with_urgent_cutoff(DEFAULT_URGENT_CUTOFF)
    }

    /// Requests with `priority <= urgent_cutoff` go to the urgent lane.
    pub fn with_urgent_cutoff(urgent_cutoff: u32) -> Self {
        Self {
            urgent: BinaryHeap::new(),
            normal: VecDeque::new(),
            urgent_cutoff,
            next_seq: 0,
            turn: Lane::Urgent,
        }
    }

    /// Route a request by its priority. Returns the lane it joined.
    pub fn submit(&mut self, request: Request<T>) -> Lane {
        if request.priority <= self.urgent_cutoff {
            self.submit_urgent(request);
            Lane::Urgent
        } else {
            self.submit_normal(request);
            Lane::Normal
        }
    }

    pub fn submit_urgent(&mut self, request: Request<T>) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.urgent.push(Reverse(Ranked { seq, request }));
    }

    pub fn submit_normal(&mut self, request: Request<T>) {
        self.normal.push_back(request);
    }

    /// Next request under the alternating policy. Once both lanes are empty
    /// the turn goes back to the urgent lane, so every batch starts urgent.
    pub fn pop_next(&mut self) -> Option<Dispatched<T>> {
        for _ in 0..2 {
            let lane = self.turn;
            self.turn = lane.other();
            if let Some(request) = self.pop_lane(lane) {
                return Some(Dispatched { lane, request });
            }
        }
        self.turn = Lane::Urgent;
        None
    }

    /// Pop everything, in dispatch order.
    pub fn drain(&mut self) -> impl Iterator<Item = Dispatched<T>> + '_ {
        std::iter::from_fn(move || self.pop_next())
    }

    pub fn urgent_len(&self) -> usize {
        self.urgent.len()
    }

    pub fn normal_len(&self) -> usize {
        self.normal.len()
    }

    pub fn len(&self) -> usize {
        self.urgent_len() + self.normal_len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn pop_lane(&mut self, lane: Lane) -> Option<Request<T>> {
        match lane {
            Lane::Urgent => self.urgent.pop().map(|Reverse(ranked)| ranked.request),
            Lane::Normal => self.normal.pop_front(),
        }
    }
}

impl<T> Default for Dispatcher<T> {
    fn default() -> Self {
        Self::new()
    }
}
