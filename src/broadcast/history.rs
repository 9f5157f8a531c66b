//! Replay history for late-joiner support
//!
//! When a subscriber joins a broadcaster that has already emitted values,
//! it first receives the most recent values held here, oldest first, and
//! only then the live emissions.

use std::collections::VecDeque;

/// Fixed-capacity FIFO of the most recently emitted values
#[derive(Debug, Clone)]
pub struct HistoryBuffer<T> {
    /// Maximum number of retained values
    capacity: usize,
    /// Retained values in emission order
    values: VecDeque<T>,
}

impl<T> HistoryBuffer<T> {
    /// Create an empty buffer retaining at most `capacity` values
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            values: VecDeque::new(),
        }
    }

    /// Append a value, evicting the oldest one when full
    ///
    /// Returns the evicted value. With capacity 0 the pushed value itself
    /// is returned, since nothing is ever retained.
    pub fn push(&mut self, value: T) -> Option<T> {
        if self.capacity == 0 {
            return Some(value);
        }

        let evicted = if self.values.len() == self.capacity {
            self.values.pop_front()
        } else {
            None
        };

        self.values.push_back(value);
        evicted
    }

    /// Drop all retained values
    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Iterate oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.values.iter()
    }

    /// The most recently pushed value still retained
    pub fn latest(&self) -> Option<&T> {
        self.values.back()
    }

    /// Number of retained values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Maximum number of retained values
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T: Clone> HistoryBuffer<T> {
    /// Snapshot of the retained values, oldest first
    pub fn to_vec(&self) -> Vec<T> {
        self.values.iter().cloned().collect()
    }
}
