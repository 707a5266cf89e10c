//! Bounded, ordered event logs.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// An append-only log that evicts its oldest entry once full.
///
/// Iteration order is oldest → newest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventLog<T> {
    capacity: usize,
    events: VecDeque<T>,
}

impl<T> EventLog<T> {
    /// Create an empty log holding at most `capacity` events (minimum 1).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            events: VecDeque::with_capacity(capacity),
        }
    }

    /// Append an event, returning the evicted one if the log was full.
    pub fn push(&mut self, event: T) -> Option<T> {
        let evicted = if self.events.len() >= self.capacity {
            self.events.pop_front()
        } else {
            None
        };
        self.events.push_back(event);
        evicted
    }

    /// Maximum number of retained events.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of retained events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Iterate oldest → newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.events.iter()
    }

    /// The `n` newest events, oldest first.
    pub fn latest(&self, n: usize) -> impl Iterator<Item = &T> {
        self.events.iter().skip(self.events.len().saturating_sub(n))
    }

    /// The newest event.
    #[must_use]
    pub fn last(&self) -> Option<&T> {
        self.events.back()
    }
}

impl<'a, T> IntoIterator for &'a EventLog<T> {
    type Item = &'a T;
    type IntoIter = std::collections::vec_deque::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}
