//! Append-only sequence with an optional capacity.

use std::collections::VecDeque;

/// Ordered history that drops its oldest entry once `capacity` is reached.
/// `None` keeps everything.
#[derive(Debug, Clone, PartialEq)]
pub struct History<T> {
    items: VecDeque<T>,
    capacity: Option<usize>,
}

impl<T> History<T> {
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            items: VecDeque::new(),
            capacity,
        }
    }

    pub fn push(&mut self, item: T) {
        if let Some(cap) = self.capacity {
            if cap == 0 {
                return;
            }
            while self.items.len() >= cap {
                self.items.pop_front();
            }
        }
        self.items.push_back(item);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.items.iter()
    }

    pub fn last(&self) -> Option<&T> {
        self.items.back()
    }
}

impl<T: Clone> History<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}
