//! Bounded FIFO of tag reads awaiting retrieval.
//!
//! The hardware callback path pushes, application calls pop/clear/query.
//! All access goes through one lock, so a concurrent push and pop never see
//! a half-updated queue. Duplicate EPCs are kept; deduplication is the
//! filtered session's concern.
//!
//! On overflow the buffer follows its [`OverflowPolicy`]: by default the
//! oldest read is evicted so the freshest reads survive a dense burst.

use crate::config::OverflowPolicy;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tracing::warn;
use uhf_core::TagRecord;

/// Result of a [`InventoryBuffer::push`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// The record was appended with room to spare.
    Accepted,

    /// The record was appended and the returned oldest record was dropped.
    Evicted(TagRecord),

    /// The buffer was full and the incoming record was dropped.
    Rejected,
}

/// Point-in-time buffer counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferStats {
    pub len: usize,
    pub capacity: usize,
    /// Reads lost to overflow since the last `clear`.
    pub dropped: u64,
    /// Reads offered to `push` since creation.
    pub total_pushed: u64,
}

#[derive(Debug)]
struct BufferState {
    records: VecDeque<TagRecord>,
    dropped: u64,
    total_pushed: u64,
}

/// Thread-safe bounded queue of [`TagRecord`].
#[derive(Debug)]
pub struct InventoryBuffer {
    capacity: usize,
    policy: OverflowPolicy,
    state: Mutex<BufferState>,
}

impl InventoryBuffer {
    /// Create a buffer. A zero capacity is raised to one.
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            policy,
            state: Mutex::new(BufferState {
                records: VecDeque::with_capacity(capacity.min(4096)),
                dropped: 0,
                total_pushed: 0,
            }),
        }
    }

    /// Append a record. Never blocks on anything but the buffer lock, never fails.
    pub fn push(&self, record: TagRecord) -> PushOutcome {
        let mut state = self.state.lock();
        state.total_pushed += 1;

        if state.records.len() < self.capacity {
            state.records.push_back(record);
            return PushOutcome::Accepted;
        }

        state.dropped += 1;
        match self.policy {
            OverflowPolicy::EvictOldest => {
                let evicted = state.records.pop_front();
                state.records.push_back(record);
                match evicted {
                    Some(evicted) => {
                        warn!(
                            epc = %evicted.epc,
                            capacity = self.capacity,
                            "inventory buffer full, evicted oldest read"
                        );
                        PushOutcome::Evicted(evicted)
                    }
                    None => PushOutcome::Accepted,
                }
            }
            OverflowPolicy::RejectNew => {
                warn!(
                    epc = %record.epc,
                    capacity = self.capacity,
                    "inventory buffer full, rejected incoming read"
                );
                PushOutcome::Rejected
            }
        }
    }

    /// Remove and return the oldest record, or `None` when empty.
    pub fn pop(&self) -> Option<TagRecord> {
        self.state.lock().records.pop_front()
    }

    /// Return a copy of the oldest record without removing it.
    pub fn peek(&self) -> Option<TagRecord> {
        self.state.lock().records.front().cloned()
    }

    /// Empty the buffer and return how many records were discarded.
    ///
    /// Also resets the overflow drop counter.
    pub fn clear(&self) -> usize {
        let mut state = self.state.lock();
        let cleared = state.records.len();
        state.records.clear();
        state.dropped = 0;
        cleared
    }

    /// Remove and return every buffered record in arrival order.
    pub fn drain(&self) -> Vec<TagRecord> {
        self.state.lock().records.drain(..).collect()
    }

    pub fn size(&self) -> usize {
        self.state.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    pub fn stats(&self) -> BufferStats {
        let state = self.state.lock();
        BufferStats {
            len: state.records.len(),
            capacity: self.capacity,
            dropped: state.dropped,
            total_pushed: state.total_pushed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use uhf_core::{Epc, Rssi};

    fn record(epc: &str) -> TagRecord {
        TagRecord::new(Epc::parse(epc).unwrap(), Rssi::new(-60))
    }

    fn epcs(records: &[TagRecord]) -> Vec<String> {
        records.iter().map(|r| r.epc.to_string()).collect()
    }

    #[test]
    fn test_fifo_order() {
        let buffer = InventoryBuffer::new(8, OverflowPolicy::EvictOldest);
        for epc in ["01", "02", "03"] {
            assert_eq!(buffer.push(record(epc)), PushOutcome::Accepted);
        }

        assert_eq!(buffer.pop().unwrap().epc.as_str(), "01");
        assert_eq!(buffer.pop().unwrap().epc.as_str(), "02");
        assert_eq!(buffer.pop().unwrap().epc.as_str(), "03");
        assert!(buffer.pop().is_none());
    }

    #[test]
    fn test_duplicates_are_kept() {
        let buffer = InventoryBuffer::new(8, OverflowPolicy::EvictOldest);
        buffer.push(record("AABB"));
        buffer.push(record("aabb"));
        assert_eq!(buffer.size(), 2);
    }

    #[test]
    fn test_evict_oldest_on_overflow() {
        let buffer = InventoryBuffer::new(2, OverflowPolicy::EvictOldest);
        buffer.push(record("01"));
        buffer.push(record("02"));

        match buffer.push(record("03")) {
            PushOutcome::Evicted(evicted) => assert_eq!(evicted.epc.as_str(), "01"),
            other => panic!("expected eviction, got {other:?}"),
        }

        assert_eq!(buffer.size(), 2);
        assert_eq!(epcs(&buffer.drain()), vec!["02", "03"]);
        assert_eq!(buffer.stats().dropped, 1);
    }

    #[test]
    fn test_reject_new_on_overflow() {
        let buffer = InventoryBuffer::new(2, OverflowPolicy::RejectNew);
        buffer.push(record("01"));
        buffer.push(record("02"));

        assert_eq!(buffer.push(record("03")), PushOutcome::Rejected);
        assert_eq!(epcs(&buffer.drain()), vec!["01", "02"]);
    }

    #[test]
    fn test_clear_returns_prior_size_and_resets_drops() {
        let buffer = InventoryBuffer::new(2, OverflowPolicy::EvictOldest);
        for epc in ["01", "02", "03"] {
            buffer.push(record(epc));
        }
        assert_eq!(buffer.stats().dropped, 1);

        let before = buffer.size();
        assert_eq!(buffer.clear(), before);
        assert_eq!(buffer.size(), 0);
        assert!(buffer.is_empty());

        let stats = buffer.stats();
        assert_eq!(stats.dropped, 0);
        assert_eq!(stats.total_pushed, 3);
    }

    #[test]
    fn test_peek_does_not_remove() {
        let buffer = InventoryBuffer::new(4, OverflowPolicy::EvictOldest);
        assert!(buffer.peek().is_none());

        buffer.push(record("AABB"));
        assert_eq!(buffer.peek().unwrap().epc.as_str(), "AABB");
        assert_eq!(buffer.size(), 1);
    }

    #[test]
    fn test_zero_capacity_is_raised() {
        let buffer = InventoryBuffer::new(0, OverflowPolicy::EvictOldest);
        assert_eq!(buffer.capacity(), 1);
    }

    #[test]
    fn test_concurrent_push_and_pop_never_exceed_capacity() {
        let buffer = Arc::new(InventoryBuffer::new(64, OverflowPolicy::EvictOldest));

        let producer = {
            let buffer = Arc::clone(&buffer);
            std::thread::spawn(move || {
                for i in 0..10_000u32 {
                    buffer.push(record(&format!("{i:08X}")));
                }
            })
        };

        let mut popped = 0usize;
        while !producer.is_finished() {
            if buffer.pop().is_some() {
                popped += 1;
            }
            assert!(buffer.size() <= 64);
        }
        producer.join().unwrap();

        let stats = buffer.stats();
        assert!(stats.len <= 64);
        assert_eq!(stats.total_pushed, 10_000);
        assert_eq!(popped as u64 + stats.len as u64 + stats.dropped, 10_000);
    }
}
