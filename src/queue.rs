//! The bounded outbound queue.
//!
//! A single process-wide FIFO shared by every destination. Per-destination
//! order is preserved because entries are appended in call order and the
//! queue is always walked front-to-back, but a destination whose channel
//! is not ready does not block delivery to other destinations: the walk
//! skips entries it cannot send yet and leaves them in place.

use std::collections::VecDeque;

/// A single pending frame awaiting delivery.
pub struct QueueEntry {
    /// Destination the frame is addressed to.
    pub dst: String,
    /// The encoded frame bytes.
    pub frame: Vec<u8>,
}

/// What happened when the drain walk tried to deliver one entry.
pub enum DrainAction {
    /// The frame was handed off to a channel; remove it from the queue.
    Sent,
    /// No ready channel for this entry right now; leave it queued.
    Skip,
}

/// Bounded FIFO of frames waiting for their destination channel to become
/// ready.
pub struct OutboundQueue {
    capacity: usize,
    entries: VecDeque<QueueEntry>,
}

impl OutboundQueue {
    /// Create a queue with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self { capacity, entries: VecDeque::new() }
    }

    /// Append an entry. Returns `false` without modifying the queue if it
    /// is already at capacity.
    pub fn enqueue(&mut self, dst: String, frame: Vec<u8>) -> bool {
        if self.entries.len() >= self.capacity {
            return false;
        }
        self.entries.push_back(QueueEntry { dst, frame });
        true
    }

    /// Number of entries currently queued.
    #[must_use]
    pub fn len(&self) -> usize { self.entries.len() }

    /// `true` if no entries are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Walk the queue front-to-back, offering each entry to `try_send`.
    /// Entries `try_send` accepts are removed; entries it skips keep their
    /// relative order for the next drain.
    pub fn drain_with<F>(&mut self, mut try_send: F)
    where
        F: FnMut(&str, &[u8]) -> DrainAction,
    {
        let mut remaining = VecDeque::with_capacity(self.entries.len());
        while let Some(entry) = self.entries.pop_front() {
            match try_send(&entry.dst, &entry.frame) {
                DrainAction::Sent => {}
                DrainAction::Skip => remaining.push_back(entry),
            }
        }
        self.entries = remaining;
    }
}
