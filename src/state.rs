//! Sampling state carried through the update loop.
//!
//! [`TopState`] owns the entity pool, the two-generation store and the
//! process source, so nothing about a run lives in globals.

use anyhow::Result;
use std::time::Instant;
use tracing::debug;

use crate::delta::{compute_deltas, CpuUsage};
use crate::generation::Generation;
use crate::pool::EntityPool;
use crate::process::{read_generation, Granularity, ProcessEnumerator};
use crate::rank::{sort_generation, SortKey};
use crate::stats::ScanStats;
use crate::store::SnapshotStore;

pub struct TopState<E> {
    source: E,
    pool: EntityPool,
    store: SnapshotStore,
    stats: ScanStats,
    granularity: Granularity,
    sort_key: SortKey,
}

impl<E: ProcessEnumerator> TopState<E> {
    pub fn new(source: E, granularity: Granularity, sort_key: SortKey) -> Self {
        Self {
            source,
            pool: EntityPool::new(),
            store: SnapshotStore::new(),
            stats: ScanStats::new(),
            granularity,
            sort_key,
        }
    }

    /// Reads a new generation and makes it current.
    pub fn sample(&mut self) -> Result<()> {
        let start = Instant::now();
        let outcome = read_generation(&mut self.source, &mut self.pool, self.granularity)?;
        self.stats.record_scan(
            outcome.generation.len(),
            outcome.skipped,
            start.elapsed().as_secs_f64(),
        );
        self.store.rotate_in(outcome.generation, &mut self.pool);
        Ok(())
    }

    /// Fills deltas against the previous generation, sorts the current one
    /// and returns the global CPU breakdown for the interval.
    pub fn compute(&mut self) -> CpuUsage {
        compute_deltas(&self.store, &mut self.pool);

        let usage = match (self.store.previous(), self.store.current()) {
            (Some(prev), Some(cur)) => CpuUsage::between(prev.cpu(), cur.cpu()),
            _ => CpuUsage::default(),
        };

        if let Some(current) = self.store.current_mut() {
            sort_generation(current, &self.pool, self.sort_key);
        }
        usage
    }

    /// Releases the previous generation once the frame has been drawn.
    pub fn finish_cycle(&mut self) {
        self.store.retire_previous(&mut self.pool);
        debug!(
            in_use = self.pool.in_use(),
            free = self.pool.free_count(),
            "Cycle finished"
        );
    }

    /// Returns every record to the pool.
    pub fn shutdown(&mut self) {
        self.store.clear(&mut self.pool);
    }

    pub fn current(&self) -> Option<&Generation> {
        self.store.current()
    }

    pub fn pool(&self) -> &EntityPool {
        &self.pool
    }

    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Records referenced by the live generations.
    pub fn live_records(&self) -> usize {
        self.store.live_records()
    }
}
