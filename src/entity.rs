//! Per-entity records observed in one generation.
//!
//! An entity is a process, or a single thread when sampling at thread
//! granularity. Records live in the [`EntityPool`](crate::pool::EntityPool)
//! and are overwritten in place on reuse.

/// Maximum stored length of a command line (first argument only).
pub const PROC_NAME_LEN: usize = 63;
/// Maximum stored length of the kernel-reported short name.
pub const THREAD_NAME_LEN: usize = 31;

/// Identity of an entity within one generation.
///
/// In process mode `tid == pid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity {
    pub pid: i32,
    pub tid: i32,
}

impl Identity {
    pub fn process(pid: i32) -> Self {
        Self { pid, tid: pid }
    }

    pub fn thread(pid: i32, tid: i32) -> Self {
        Self { pid, tid }
    }
}

/// One process or thread as seen in a single snapshot.
#[derive(Debug, Clone)]
pub struct EntityRecord {
    pub id: Identity,
    pub uid: u32,
    pub gid: u32,
    /// Command line (first argument); empty when the kernel gave none.
    pub name: String,
    /// Short name from the stat line.
    pub thread_name: String,
    pub state: char,
    /// Cumulative user-mode ticks.
    pub utime: u64,
    /// Cumulative kernel-mode ticks.
    pub stime: u64,
    pub delta_utime: u64,
    pub delta_stime: u64,
    pub delta_time: u64,
    /// Virtual size in bytes.
    pub vss: u64,
    /// Resident size in pages.
    pub rss: u64,
    /// Last CPU core the entity ran on.
    pub last_cpu: i32,
    /// Thread count, process granularity only.
    pub num_threads: u32,
}

impl Default for EntityRecord {
    fn default() -> Self {
        Self {
            id: Identity::process(0),
            uid: 0,
            gid: 0,
            name: String::new(),
            thread_name: String::new(),
            state: '?',
            utime: 0,
            stime: 0,
            delta_utime: 0,
            delta_stime: 0,
            delta_time: 0,
            vss: 0,
            rss: 0,
            last_cpu: 0,
            num_threads: 0,
        }
    }
}

impl EntityRecord {
    /// Clears every field while keeping the string allocations.
    pub fn reset(&mut self, id: Identity) {
        self.id = id;
        self.uid = 0;
        self.gid = 0;
        self.name.clear();
        self.thread_name.clear();
        self.state = '?';
        self.utime = 0;
        self.stime = 0;
        self.clear_deltas();
        self.vss = 0;
        self.rss = 0;
        self.last_cpu = 0;
        self.num_threads = 0;
    }

    pub fn clear_deltas(&mut self) {
        self.delta_utime = 0;
        self.delta_stime = 0;
        self.delta_time = 0;
    }

    /// Name shown in the COMMAND column: the command line, or the short
    /// name when the command line is empty (kernel threads, zombies).
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.thread_name
        } else {
            &self.name
        }
    }
}

/// Copies at most `max` characters of `src` into `dst`.
pub(crate) fn set_truncated(dst: &mut String, src: &str, max: usize) {
    dst.clear();
    dst.extend(src.chars().take(max));
}
