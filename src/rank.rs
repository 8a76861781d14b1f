//! Ordering of the current generation.

use clap::ValueEnum;
use std::cmp::Ordering;

use crate::entity::EntityRecord;
use crate::generation::Generation;
use crate::pool::{EntityPool, RecordId};

/// Column to sort by; every key sorts descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortKey {
    /// CPU time spent during the last interval
    Cpu,
    /// Virtual set size
    Vss,
    /// Resident set size
    Rss,
    /// Thread count (process granularity only)
    Thr,
}

impl SortKey {
    fn value(self, rec: &EntityRecord) -> u64 {
        match self {
            SortKey::Cpu => rec.delta_time,
            SortKey::Vss => rec.vss,
            SortKey::Rss => rec.rss,
            SortKey::Thr => u64::from(rec.num_threads),
        }
    }
}

/// Compares two slots: larger values first, empty slots last.
pub fn compare_slots(
    a: &Option<RecordId>,
    b: &Option<RecordId>,
    pool: &EntityPool,
    key: SortKey,
) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => key.value(pool.get(b)).cmp(&key.value(pool.get(a))),
    }
}

/// Sorts the generation's slots in place.
pub fn sort_generation(generation: &mut Generation, pool: &EntityPool, key: SortKey) {
    generation
        .slots_mut()
        .sort_by(|a, b| compare_slots(a, b, pool, key));
}
