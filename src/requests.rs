//! Pending GetData requests.

use crate::modes::DataKind;

use std::collections::VecDeque;

/// FIFO of GetData requests waiting for a read.
///
/// Each read serves exactly one request, oldest first.
#[derive(Debug, Clone, Default)]
pub struct ReadRequestQueue {
    pending: VecDeque<DataKind>,
}

impl ReadRequestQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a request.
    pub fn enqueue(&mut self, kind: DataKind) {
        self.pending.push_back(kind);
    }

    /// Remove and return the oldest request, or `None` if nothing is pending.
    pub fn dequeue(&mut self) -> Option<DataKind> {
        self.pending.pop_front()
    }

    /// Number of pending requests.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether no request is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop every pending request.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut queue = ReadRequestQueue::new();
        queue.enqueue(DataKind::Length);
        queue.enqueue(DataKind::ModeSettings);
        queue.enqueue(DataKind::PixelData);
        assert_eq!(queue.len(), 3);

        assert_eq!(queue.dequeue(), Some(DataKind::Length));
        assert_eq!(queue.dequeue(), Some(DataKind::ModeSettings));
        assert_eq!(queue.dequeue(), Some(DataKind::PixelData));
        assert_eq!(queue.dequeue(), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_duplicates_are_kept() {
        let mut queue = ReadRequestQueue::new();
        queue.enqueue(DataKind::Length);
        queue.enqueue(DataKind::Length);
        assert_eq!(queue.len(), 2);

        queue.clear();
        assert_eq!(queue.dequeue(), None);
    }
}
