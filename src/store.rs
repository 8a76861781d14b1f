//! Two-generation snapshot store.

use ahash::AHashMap as HashMap;

use crate::entity::{EntityRecord, Identity};
use crate::generation::Generation;
use crate::pool::EntityPool;

/// Holds the current and the previous generation.
///
/// Lookups by identity go through a slot index over the previous
/// generation, rebuilt on every rotation. The previous generation is never
/// reordered, so slot positions stay valid until the next rotation.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: Option<Generation>,
    previous: Option<Generation>,
    index: HashMap<Identity, usize>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `generation` current. The old current becomes previous and the
    /// old previous is released to `pool`.
    pub fn rotate_in(&mut self, generation: Generation, pool: &mut EntityPool) {
        if let Some(retired) = self.previous.take() {
            retired.release_into(pool);
        }
        self.previous = self.current.replace(generation);

        self.index.clear();
        if let Some(prev) = &self.previous {
            for (slot, handle) in prev.slots().iter().enumerate() {
                if let Some(h) = handle {
                    self.index.insert(pool.get(h).id, slot);
                }
            }
        }
    }

    /// Releases the previous generation once its deltas have been consumed,
    /// so that only the current generation is live while the next is read.
    pub fn retire_previous(&mut self, pool: &mut EntityPool) {
        self.index.clear();
        if let Some(retired) = self.previous.take() {
            retired.release_into(pool);
        }
    }

    pub fn current(&self) -> Option<&Generation> {
        self.current.as_ref()
    }

    pub fn current_mut(&mut self) -> Option<&mut Generation> {
        self.current.as_mut()
    }

    pub fn previous(&self) -> Option<&Generation> {
        self.previous.as_ref()
    }

    /// Finds `id` in the previous generation.
    pub fn match_previous<'a>(
        &self,
        id: Identity,
        pool: &'a EntityPool,
    ) -> Option<&'a EntityRecord> {
        let slot = *self.index.get(&id)?;
        let handle = self.previous.as_ref()?.slots().get(slot)?.as_ref()?;
        Some(pool.get(handle))
    }

    /// Number of records held across both generations.
    pub fn live_records(&self) -> usize {
        self.current.as_ref().map_or(0, Generation::len)
            + self.previous.as_ref().map_or(0, Generation::len)
    }

    /// Releases both generations.
    pub fn clear(&mut self, pool: &mut EntityPool) {
        self.index.clear();
        if let Some(gen) = self.previous.take() {
            gen.release_into(pool);
        }
        if let Some(gen) = self.current.take() {
            gen.release_into(pool);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::CpuTimes;

    fn generation_of(pool: &mut EntityPool, pids: &[i32], utime: u64) -> Generation {
        let mut gen = Generation::with_capacity(4, CpuTimes::default());
        for &pid in pids {
            let h = pool.acquire(Identity::process(pid));
            pool.get_mut(&h).utime = utime;
            gen.push(h);
        }
        gen
    }

    #[test]
    fn test_rotate_in_releases_old_previous() {
        let mut pool = EntityPool::new();
        let mut store = SnapshotStore::new();

        let g1 = generation_of(&mut pool, &[1, 2], 10);
        store.rotate_in(g1, &mut pool);
        assert!(store.previous().is_none());
        assert_eq!(store.live_records(), 2);

        let g2 = generation_of(&mut pool, &[1, 2, 3], 20);
        store.rotate_in(g2, &mut pool);
        assert_eq!(store.live_records(), 5);
        assert_eq!(pool.free_count(), 0);

        let g3 = generation_of(&mut pool, &[1], 30);
        store.rotate_in(g3, &mut pool);
        // g3 was built before g1 was retired, so the pool had to grow once.
        assert_eq!(store.live_records(), 4);
        assert_eq!(pool.in_use(), 4);
        assert_eq!(pool.capacity(), 6);
        assert_eq!(pool.free_count(), 2);
    }

    #[test]
    fn test_match_previous_only_looks_at_previous() {
        let mut pool = EntityPool::new();
        let mut store = SnapshotStore::new();

        store.rotate_in(generation_of(&mut pool, &[1], 10), &mut pool);
        assert!(store.match_previous(Identity::process(1), &pool).is_none());

        store.rotate_in(generation_of(&mut pool, &[2], 20), &mut pool);
        let found = store.match_previous(Identity::process(1), &pool).unwrap();
        assert_eq!(found.utime, 10);
        assert!(store.match_previous(Identity::process(2), &pool).is_none());
        assert!(store.match_previous(Identity::thread(1, 5), &pool).is_none());
    }

    #[test]
    fn test_retire_previous_before_next_read() {
        let mut pool = EntityPool::new();
        let mut store = SnapshotStore::new();
        store.rotate_in(generation_of(&mut pool, &[1, 2], 0), &mut pool);
        store.rotate_in(generation_of(&mut pool, &[1, 2], 0), &mut pool);
        store.retire_previous(&mut pool);
        assert!(store.previous().is_none());
        assert_eq!(pool.free_count(), 2);

        // The next generation is served entirely from the free list.
        store.rotate_in(generation_of(&mut pool, &[1, 2], 0), &mut pool);
        assert_eq!(pool.capacity(), 4);
        assert_eq!(pool.free_count(), 0);
    }

    #[test]
    fn test_clear_returns_everything() {
        let mut pool = EntityPool::new();
        let mut store = SnapshotStore::new();
        store.rotate_in(generation_of(&mut pool, &[1, 2], 0), &mut pool);
        store.rotate_in(generation_of(&mut pool, &[3], 0), &mut pool);

        store.clear(&mut pool);
        assert_eq!(store.live_records(), 0);
        assert_eq!(pool.in_use(), 0);
    }
}
