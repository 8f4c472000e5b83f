//! FIFO lane for one priority class.

use std::collections::VecDeque;

use crate::models::WaitingRequest;

/// A first-in-first-out sequence of requests sharing one priority class.
///
/// Order is insertion order; nothing reorders entries inside a lane.
#[derive(Debug, Clone)]
pub struct PriorityLane<T = WaitingRequest> {
    entries: VecDeque<T>,
}

impl<T> PriorityLane<T> {
    /// Creates an empty lane.
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    /// Appends a request at the tail.
    pub fn push(&mut self, entry: T) {
        self.entries.push_back(entry);
    }

    /// Removes and returns the head, or `None` when empty.
    pub fn pop(&mut self) -> Option<T> {
        self.entries.pop_front()
    }

    /// Returns the head without removing it.
    pub fn peek(&self) -> Option<&T> {
        self.entries.front()
    }

    /// Number of queued entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the lane is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries head to tail.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }
}

impl<T> Default for PriorityLane<T> {
    fn default() -> Self {
        Self::new()
    }
}
