//! One complete snapshot of sampled entities.

use crate::pool::{EntityPool, RecordId};
use crate::system::CpuTimes;

/// Initial slot count in process granularity.
pub const INIT_SLOTS: usize = 50;
/// Slot multiplier in thread granularity.
pub const THREAD_MULT: usize = 8;

/// Growable array of record slots plus the global CPU counters read with it.
///
/// Slots past `len` are always `None`. When a push would overflow, the slot
/// array doubles and the new half starts out empty.
#[derive(Debug)]
pub struct Generation {
    slots: Vec<Option<RecordId>>,
    len: usize,
    cpu: CpuTimes,
}

impl Generation {
    pub fn with_capacity(capacity: usize, cpu: CpuTimes) -> Self {
        let capacity = capacity.max(1);
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self { slots, len: 0, cpu }
    }

    pub fn push(&mut self, handle: RecordId) {
        if self.len >= self.slots.len() {
            let doubled = self.slots.len() * 2;
            self.slots.resize_with(doubled, || None);
        }
        self.slots[self.len] = Some(handle);
        self.len += 1;
    }

    /// Number of filled slots.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots, filled or not.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn cpu(&self) -> &CpuTimes {
        &self.cpu
    }

    pub fn slots(&self) -> &[Option<RecordId>] {
        &self.slots
    }

    pub fn slots_mut(&mut self) -> &mut [Option<RecordId>] {
        &mut self.slots
    }

    /// Handles of all filled slots, in slot order.
    pub fn handles(&self) -> impl Iterator<Item = &RecordId> {
        self.slots.iter().flatten()
    }

    /// Returns every record to the pool, consuming the generation.
    pub fn release_into(self, pool: &mut EntityPool) {
        for handle in self.slots.into_iter().flatten() {
            pool.release(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Identity;

    #[test]
    fn test_push_doubles_capacity() {
        let mut pool = EntityPool::new();
        let mut gen = Generation::with_capacity(2, CpuTimes::default());

        for pid in 0..5 {
            gen.push(pool.acquire(Identity::process(pid)));
        }

        assert_eq!(gen.len(), 5);
        assert_eq!(gen.capacity(), 8);
        assert!(gen.slots()[5..].iter().all(Option::is_none));
        assert_eq!(gen.handles().count(), 5);
    }

    #[test]
    fn test_release_into_returns_all_records() {
        let mut pool = EntityPool::new();
        let mut gen = Generation::with_capacity(INIT_SLOTS, CpuTimes::default());
        for pid in 0..3 {
            gen.push(pool.acquire(Identity::process(pid)));
        }
        assert_eq!(pool.in_use(), 3);

        gen.release_into(&mut pool);
        assert_eq!(pool.in_use(), 0);
        assert_eq!(pool.free_count(), 3);
    }
}
