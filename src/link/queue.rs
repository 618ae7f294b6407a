//! Transmit queue.
//!
//! Holds I-frame payloads in two FIFOs: `pending` (waiting for the window to
//! open) and `unacked` (sent, waiting for the peer's N(R)).

use std::collections::VecDeque;

use bytes::Bytes;

/// Outbound I-frame payloads of one link.
#[derive(Debug, Default, Clone)]
pub struct TransmitQueue {
    pending: VecDeque<Bytes>,
    unacked: VecDeque<Bytes>,
}

impl TransmitQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a payload for transmission.
    pub fn push(&mut self, payload: Bytes) {
        self.pending.push_back(payload);
    }

    /// Take the next payload to send and remember it as unacknowledged.
    ///
    /// Returns a handle to the payload; `Bytes` clones share the buffer.
    pub fn next_unsent(&mut self) -> Option<Bytes> {
        let payload = self.pending.pop_front()?;
        self.unacked.push_back(payload.clone());
        Some(payload)
    }

    /// Drop the `count` oldest sent frames now covered by the peer's N(R).
    ///
    /// Frames moved back by [`requeue_unacked`](Self::requeue_unacked) but
    /// not yet resent sit at the front of `pending` and are released from
    /// there once `unacked` is exhausted. Returns the number released.
    pub fn release(&mut self, count: usize) -> usize {
        let from_unacked = count.min(self.unacked.len());
        self.unacked.drain(..from_unacked);

        let from_pending = (count - from_unacked).min(self.pending.len());
        self.pending.drain(..from_pending);

        from_unacked + from_pending
    }

    /// Move every unacknowledged frame back to the head of `pending`,
    /// preserving order, so they are retransmitted next.
    pub fn requeue_unacked(&mut self) {
        while let Some(payload) = self.unacked.pop_back() {
            self.pending.push_front(payload);
        }
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.unacked.clear();
    }

    /// Number of frames waiting to be sent.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Number of frames sent and not yet acknowledged.
    pub fn unacked_len(&self) -> usize {
        self.unacked.len()
    }

    /// Check if frames are waiting to be sent.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Check if sent frames await acknowledgement.
    pub fn has_unacked(&self) -> bool {
        !self.unacked.is_empty()
    }

    /// Check if both queues are empty.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty() && self.unacked.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(tag: &'static str) -> Bytes {
        Bytes::from_static(tag.as_bytes())
    }

    #[test]
    fn test_send_moves_to_unacked() {
        let mut queue = TransmitQueue::new();
        queue.push(payload("a"));
        queue.push(payload("b"));

        assert_eq!(queue.next_unsent(), Some(payload("a")));
        assert_eq!(queue.pending_len(), 1);
        assert_eq!(queue.unacked_len(), 1);
    }

    #[test]
    fn test_release() {
        let mut queue = TransmitQueue::new();
        for tag in ["a", "b", "c"] {
            queue.push(payload(tag));
            queue.next_unsent();
        }

        assert_eq!(queue.release(2), 2);
        assert_eq!(queue.unacked_len(), 1);
        assert_eq!(queue.release(0), 0);
        assert_eq!(queue.unacked_len(), 1);
    }

    #[test]
    fn test_requeue_preserves_order() {
        let mut queue = TransmitQueue::new();
        for tag in ["a", "b", "c"] {
            queue.push(payload(tag));
        }
        queue.next_unsent();
        queue.next_unsent();

        queue.requeue_unacked();
        assert!(!queue.has_unacked());
        assert_eq!(queue.next_unsent(), Some(payload("a")));
        assert_eq!(queue.next_unsent(), Some(payload("b")));
        assert_eq!(queue.next_unsent(), Some(payload("c")));
    }

    #[test]
    fn test_release_after_requeue() {
        let mut queue = TransmitQueue::new();
        for tag in ["a", "b", "c"] {
            queue.push(payload(tag));
            queue.next_unsent();
        }
        queue.requeue_unacked();

        // Peer had received the first two before we requeued
        assert_eq!(queue.release(2), 2);
        assert_eq!(queue.next_unsent(), Some(payload("c")));
    }

    #[test]
    fn test_clear() {
        let mut queue = TransmitQueue::new();
        queue.push(payload("a"));
        queue.push(payload("b"));
        queue.next_unsent();

        queue.clear();
        assert!(queue.is_empty());
    }
}
