//! Ordered queue of pending actions
//!
//! One owner drives consumption from the front. Producers either append
//! behind the pending work or splice ahead of it. The queue has no interior
//! locking; shared use goes through a [`crate::ThreadSafe`] wrapper.

use std::collections::VecDeque;

/// FIFO of pending actions with front-splicing support
#[derive(Debug, Clone)]
pub struct PendingQueue<T> {
    items: VecDeque<T>,
}

impl<T> PendingQueue<T> {
    /// Create an empty queue
    pub fn new() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }

    /// Append one item behind all pending items
    pub fn append(&mut self, item: T) {
        self.items.push_back(item);
    }

    /// Append items in order behind all pending items
    pub fn extend<I: IntoIterator<Item = T>>(&mut self, items: I) {
        self.items.extend(items);
    }

    /// Insert items ahead of all pending items, keeping their relative order
    ///
    /// After `splice_front([a, b])` on a queue holding `[x, y]` the queue
    /// holds `[a, b, x, y]`.
    pub fn splice_front<I>(&mut self, items: I)
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: DoubleEndedIterator,
    {
        for item in items.into_iter().rev() {
            self.items.push_front(item);
        }
    }

    /// Remove and return the front item
    pub fn pop_front(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    /// Peek at the front item
    pub fn front(&self) -> Option<&T> {
        self.items.front()
    }

    /// Peek at the back item
    pub fn back(&self) -> Option<&T> {
        self.items.back()
    }

    /// Remove up to `count` items from the front, in order
    pub fn take_front(&mut self, count: usize) -> Vec<T> {
        let count = count.min(self.items.len());
        self.items.drain(..count).collect()
    }

    /// Discard everything, returning how many items were dropped
    pub fn clear(&mut self) -> usize {
        let dropped = self.items.len();
        self.items.clear();
        dropped
    }

    /// Number of pending items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing is pending
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate pending items front to back
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

impl<T> Default for PendingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<T> for PendingQueue<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}
