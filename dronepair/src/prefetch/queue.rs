//! Bounded queue of prefetched locations.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::location::ResolvedLocation;

/// Bounded FIFO of resolved locations shared by producer and consumer.
///
/// `push` refuses to grow past capacity; the queue never holds more than
/// `capacity` entries.
#[derive(Debug)]
pub struct LocationQueue {
    entries: Mutex<VecDeque<ResolvedLocation>>,
    capacity: usize,
}

impl LocationQueue {
    /// Creates an empty queue holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
        }
    }

    /// Appends `location`, handing it back when the queue is full.
    pub fn push(&self, location: ResolvedLocation) -> Result<(), ResolvedLocation> {
        let mut entries = self.entries.lock();
        if entries.len() >= self.capacity {
            return Err(location);
        }
        entries.push_back(location);
        Ok(())
    }

    /// Removes the oldest entry.
    pub fn pop_front(&self) -> Option<ResolvedLocation> {
        self.entries.lock().pop_front()
    }

    /// Removes the entry at `index` (0 = head).
    pub fn remove_at(&self, index: usize) -> Option<ResolvedLocation> {
        self.entries.lock().remove(index)
    }

    /// Removes one entry chosen by `pick`, given the current length.
    ///
    /// `pick` runs under the queue lock so the length it sees is the length
    /// the removal applies to. Returns `None` on an empty queue.
    pub fn take_with(&self, pick: impl FnOnce(usize) -> usize) -> Option<ResolvedLocation> {
        let mut entries = self.entries.lock();
        if entries.is_empty() {
            return None;
        }
        let index = pick(entries.len()).min(entries.len() - 1);
        entries.remove(index)
    }

    /// Drops every entry older than `max_age`, returning how many were removed.
    pub fn purge_older_than(&self, max_age: Duration, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|loc| !loc.is_older_than(max_age, now));
        before - entries.len()
    }

    /// Copy of the queued entries, head first.
    pub fn snapshot(&self) -> Vec<ResolvedLocation> {
        self.entries.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}
