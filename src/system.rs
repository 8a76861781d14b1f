//! System-wide CPU counters from the /proc filesystem.
//!
//! Only the aggregate `cpu` line of /proc/stat is used; per-core lines and
//! the steal/guest columns are ignored.

use once_cell::sync::Lazy;

/// Cumulative system-wide CPU time in clock ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
}

impl CpuTimes {
    /// Sum of all seven counters, saturating at `u64::MAX`.
    pub fn total(&self) -> u64 {
        [
            self.nice,
            self.system,
            self.idle,
            self.iowait,
            self.irq,
            self.softirq,
        ]
        .iter()
        .fold(self.user, |acc, v| acc.saturating_add(*v))
    }

    /// Per-counter difference `self - earlier`, clamped at zero.
    pub fn saturating_delta(&self, earlier: &CpuTimes) -> CpuTimes {
        CpuTimes {
            user: self.user.saturating_sub(earlier.user),
            nice: self.nice.saturating_sub(earlier.nice),
            system: self.system.saturating_sub(earlier.system),
            idle: self.idle.saturating_sub(earlier.idle),
            iowait: self.iowait.saturating_sub(earlier.iowait),
            irq: self.irq.saturating_sub(earlier.irq),
            softirq: self.softirq.saturating_sub(earlier.softirq),
        }
    }
}

/// Parses the aggregate line of /proc/stat.
///
/// Format: "cpu  4705 356 584 3699 23 23 0 0 0 0"
pub fn parse_cpu_line(content: &str) -> Result<CpuTimes, String> {
    let line = content
        .lines()
        .find(|l| l.starts_with("cpu ") || l.starts_with("cpu\t"))
        .ok_or_else(|| "No aggregate cpu line found in /proc/stat".to_string())?;

    let parts: Vec<&str> = line.split_whitespace().skip(1).collect();
    if parts.len() < 7 {
        return Err(format!(
            "Invalid /proc/stat cpu line: expected at least 7 fields, got {}",
            parts.len()
        ));
    }

    let mut values = [0u64; 7];
    for (slot, raw) in values.iter_mut().zip(&parts) {
        *slot = raw
            .parse::<u64>()
            .map_err(|e| format!("Failed to parse cpu counter '{}': {}", raw, e))?;
    }

    Ok(CpuTimes {
        user: values[0],
        nice: values[1],
        system: values[2],
        idle: values[3],
        iowait: values[4],
        irq: values[5],
        softirq: values[6],
    })
}

/// Memory page size in bytes, queried once.
pub static PAGE_SIZE: Lazy<u64> = Lazy::new(|| {
    // SAFETY: sysconf has no memory-safety preconditions.
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 {
        size as u64
    } else {
        4096
    }
});
