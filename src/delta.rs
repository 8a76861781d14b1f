//! Per-entity CPU deltas and the global utilization breakdown.

use crate::entity::EntityRecord;
use crate::pool::EntityPool;
use crate::store::SnapshotStore;
use crate::system::CpuTimes;

/// Fills the delta fields of every entity in the current generation.
///
/// Entities without a previous counterpart get zero deltas. So do entities
/// whose counters went backwards, which happens when a pid or tid was
/// reused between the two snapshots.
pub fn compute_deltas(store: &SnapshotStore, pool: &mut EntityPool) {
    let current = match store.current() {
        Some(gen) => gen,
        None => return,
    };

    for handle in current.handles() {
        let id = pool.get(handle).id;
        let previous = store
            .match_previous(id, pool)
            .map(|prev| (prev.utime, prev.stime));
        apply_delta(pool.get_mut(handle), previous);
    }
}

fn apply_delta(rec: &mut EntityRecord, previous: Option<(u64, u64)>) {
    match previous {
        Some((utime, stime)) if rec.utime >= utime && rec.stime >= stime => {
            rec.delta_utime = rec.utime - utime;
            rec.delta_stime = rec.stime - stime;
            rec.delta_time = rec.delta_utime.saturating_add(rec.delta_stime);
        }
        _ => rec.clear_deltas(),
    }
}

/// System-wide CPU time spent between two generations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuUsage {
    pub delta: CpuTimes,
    pub total_delta: u64,
}

impl CpuUsage {
    /// Counters that went backwards contribute nothing, so the categories
    /// always add up to `total_delta`.
    pub fn between(previous: &CpuTimes, current: &CpuTimes) -> Self {
        let delta = current.saturating_delta(previous);
        Self {
            delta,
            total_delta: delta.total(),
        }
    }

    /// `ticks` as an integer percentage of the interval; 0 when the clock
    /// did not advance.
    pub fn percent(&self, ticks: u64) -> u64 {
        if self.total_delta == 0 {
            0
        } else {
            ticks.saturating_mul(100) / self.total_delta
        }
    }

    /// User plus nice.
    pub fn user_percent(&self) -> u64 {
        self.percent(self.delta.user.saturating_add(self.delta.nice))
    }

    pub fn system_percent(&self) -> u64 {
        self.percent(self.delta.system)
    }

    pub fn iowait_percent(&self) -> u64 {
        self.percent(self.delta.iowait)
    }

    /// Hard plus soft interrupts.
    pub fn irq_percent(&self) -> u64 {
        self.percent(self.delta.irq.saturating_add(self.delta.softirq))
    }

    pub fn entity_percent(&self, rec: &EntityRecord) -> u64 {
        self.percent(rec.delta_time)
    }
}
