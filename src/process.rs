//! Snapshot reader: turns one pass over the process table into a generation.
//!
//! The raw text comes from a [`ProcessEnumerator`]; [`ProcFs`] serves it from
//! a mounted procfs, [`RecordedSnapshots`](crate::testdata::RecordedSnapshots)
//! from a recorded file. Entities whose details vanish or fail to parse are
//! skipped; only failing to list the table or to read the global counters
//! aborts the read.

use anyhow::{Context, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, instrument};

use crate::entity::{set_truncated, EntityRecord, Identity, PROC_NAME_LEN, THREAD_NAME_LEN};
use crate::generation::{Generation, INIT_SLOTS, THREAD_MULT};
use crate::pool::EntityPool;
use crate::system::{parse_cpu_line, CpuTimes};

/// Sampling unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Process,
    Thread,
}

impl Granularity {
    /// Slot count a fresh generation starts with.
    pub fn initial_slots(self) -> usize {
        match self {
            Granularity::Process => INIT_SLOTS,
            Granularity::Thread => INIT_SLOTS * THREAD_MULT,
        }
    }
}

/// Source of raw process-table text.
pub trait ProcessEnumerator {
    /// Contents of the system-wide statistics file (/proc/stat).
    fn read_system_stat(&mut self) -> io::Result<String>;
    /// Numeric ids of all processes.
    fn list_pids(&mut self) -> io::Result<Vec<i32>>;
    /// Numeric ids of all threads of `pid`.
    fn list_tids(&mut self, pid: i32) -> io::Result<Vec<i32>>;
    /// Single-line stat record of a process, or of one of its threads.
    fn read_stat(&mut self, pid: i32, tid: Option<i32>) -> io::Result<String>;
    /// Raw NUL-separated command line.
    fn read_cmdline(&mut self, pid: i32) -> io::Result<Vec<u8>>;
    /// Key/value status text.
    fn read_status(&mut self, pid: i32) -> io::Result<String>;
}

/// Enumerator backed by a procfs mount.
#[derive(Debug, Clone)]
pub struct ProcFs {
    root: PathBuf,
}

impl ProcFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn pid_path(&self, pid: i32) -> PathBuf {
        self.root.join(pid.to_string())
    }
}

impl Default for ProcFs {
    fn default() -> Self {
        Self::new("/proc")
    }
}

/// Lists directory entries whose names are entirely numeric.
fn numeric_entries(dir: &Path) -> io::Result<Vec<i32>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir)?.flatten() {
        let name = entry.file_name();
        let name = match name.to_str() {
            Some(v) => v,
            None => continue,
        };
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        if let Ok(id) = name.parse() {
            out.push(id);
        }
    }
    Ok(out)
}

impl ProcessEnumerator for ProcFs {
    fn read_system_stat(&mut self) -> io::Result<String> {
        fs::read_to_string(self.root.join("stat"))
    }

    fn list_pids(&mut self) -> io::Result<Vec<i32>> {
        numeric_entries(&self.root)
    }

    fn list_tids(&mut self, pid: i32) -> io::Result<Vec<i32>> {
        numeric_entries(&self.pid_path(pid).join("task"))
    }

    fn read_stat(&mut self, pid: i32, tid: Option<i32>) -> io::Result<String> {
        let path = match tid {
            Some(tid) => self
                .pid_path(pid)
                .join("task")
                .join(tid.to_string())
                .join("stat"),
            None => self.pid_path(pid).join("stat"),
        };
        fs::read_to_string(path)
    }

    fn read_cmdline(&mut self, pid: i32) -> io::Result<Vec<u8>> {
        fs::read(self.pid_path(pid).join("cmdline"))
    }

    fn read_status(&mut self, pid: i32) -> io::Result<String> {
        fs::read_to_string(self.pid_path(pid).join("status"))
    }
}

/// Fields taken from a stat line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatFields<'a> {
    pub name: &'a str,
    pub state: char,
    pub utime: u64,
    pub stime: u64,
    pub vss: u64,
    pub rss: u64,
    pub last_cpu: i32,
}

// Offsets counted from the state field, which follows the closing paren.
const STAT_UTIME: usize = 11;
const STAT_STIME: usize = 12;
const STAT_VSIZE: usize = 20;
const STAT_RSS: usize = 21;
const STAT_PROCESSOR: usize = 36;

/// Parses a stat line.
///
/// The name is whatever sits between the first '(' and the last ')', so
/// names containing spaces or parens survive.
pub fn parse_stat_line(content: &str) -> Result<StatFields<'_>, String> {
    let line = content.lines().next().unwrap_or("");
    let open = line.find('(').ok_or("Missing '(' in stat line")?;
    let close = line.rfind(')').ok_or("Missing ')' in stat line")?;
    if close < open {
        return Err("Unbalanced parens in stat line".to_string());
    }

    let name = &line[open + 1..close];
    let fields: Vec<&str> = line[close + 1..].split_whitespace().collect();
    if fields.len() <= STAT_PROCESSOR {
        return Err(format!(
            "Invalid stat format: expected at least {} fields after name, got {}",
            STAT_PROCESSOR + 1,
            fields.len()
        ));
    }

    let mut state_chars = fields[0].chars();
    let state = match (state_chars.next(), state_chars.next()) {
        (Some(c), None) => c,
        _ => return Err(format!("Invalid state field '{}'", fields[0])),
    };

    let num = |idx: usize| -> Result<u64, String> {
        fields[idx]
            .parse::<u64>()
            .map_err(|e| format!("Failed to parse stat field {}: {}", idx, e))
    };

    Ok(StatFields {
        name,
        state,
        utime: num(STAT_UTIME)?,
        stime: num(STAT_STIME)?,
        vss: num(STAT_VSIZE)?,
        rss: num(STAT_RSS)?,
        last_cpu: fields[STAT_PROCESSOR]
            .parse::<i32>()
            .map_err(|e| format!("Failed to parse processor field: {}", e))?,
    })
}

/// Returns the first argument of a raw command line.
pub fn parse_cmdline(raw: &[u8]) -> String {
    let first = raw.split(|&b| b == 0u8).next().unwrap_or(&[]);
    String::from_utf8_lossy(first).into_owned()
}

/// Extracts the real uid and gid from status text.
pub fn parse_status_ids(content: &str) -> Result<(u32, u32), String> {
    let mut uid: Option<u32> = None;
    let mut gid: Option<u32> = None;

    for line in content.lines() {
        if let Some(v) = line.strip_prefix("Uid:") {
            uid = v.split_whitespace().next().and_then(|s| s.parse().ok());
        } else if let Some(v) = line.strip_prefix("Gid:") {
            gid = v.split_whitespace().next().and_then(|s| s.parse().ok());
        }

        if uid.is_some() && gid.is_some() {
            break;
        }
    }

    match (uid, gid) {
        (Some(uid), Some(gid)) => Ok((uid, gid)),
        _ => Err("Failed to parse Uid or Gid from status".to_string()),
    }
}

fn invalid(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

fn apply_stat(rec: &mut EntityRecord, content: &str) -> io::Result<()> {
    let stat = parse_stat_line(content).map_err(invalid)?;
    set_truncated(&mut rec.thread_name, stat.name, THREAD_NAME_LEN);
    rec.state = stat.state;
    rec.utime = stat.utime;
    rec.stime = stat.stime;
    rec.vss = stat.vss;
    rec.rss = stat.rss;
    rec.last_cpu = stat.last_cpu;
    Ok(())
}

/// Details shared by every thread of a process.
#[derive(Debug, Default)]
struct ProcessDetails {
    name: String,
    uid: u32,
    gid: u32,
}

fn read_process_details<E: ProcessEnumerator + ?Sized>(
    source: &mut E,
    pid: i32,
) -> io::Result<ProcessDetails> {
    let mut name = match source.read_cmdline(pid) {
        Ok(raw) => {
            let mut name = String::new();
            set_truncated(&mut name, &parse_cmdline(&raw), PROC_NAME_LEN);
            name
        }
        Err(e) => {
            debug!("No command line for pid {}: {}", pid, e);
            String::new()
        }
    };
    // Kernel threads and zombies have no command line; use the short name.
    if name.is_empty() {
        match source.read_stat(pid, None) {
            Ok(stat) => {
                if let Ok(fields) = parse_stat_line(&stat) {
                    set_truncated(&mut name, fields.name, THREAD_NAME_LEN);
                }
            }
            Err(e) => debug!("No short name for pid {}: {}", pid, e),
        }
    }
    let (uid, gid) = parse_status_ids(&source.read_status(pid)?).map_err(invalid)?;
    Ok(ProcessDetails { name, uid, gid })
}

fn fill_process<E: ProcessEnumerator + ?Sized>(
    source: &mut E,
    rec: &mut EntityRecord,
    pid: i32,
) -> io::Result<()> {
    apply_stat(rec, &source.read_stat(pid, None)?)?;
    let details = read_process_details(source, pid)?;
    rec.name.push_str(&details.name);
    rec.uid = details.uid;
    rec.gid = details.gid;
    rec.num_threads = source.list_tids(pid)?.len() as u32;
    Ok(())
}

/// Result of one pass over the process table.
#[derive(Debug)]
pub struct ReadOutcome {
    pub generation: Generation,
    /// Entities dropped because their details vanished or were malformed.
    pub skipped: usize,
}

/// Reads a complete generation.
#[instrument(skip(source, pool))]
pub fn read_generation<E: ProcessEnumerator + ?Sized>(
    source: &mut E,
    pool: &mut EntityPool,
    granularity: Granularity,
) -> Result<ReadOutcome> {
    let start = Instant::now();

    let stat = source
        .read_system_stat()
        .context("Could not read system CPU statistics")?;
    let cpu: CpuTimes = parse_cpu_line(&stat)
        .map_err(anyhow::Error::msg)
        .context("Could not parse system CPU statistics")?;

    let pids = source
        .list_pids()
        .context("Could not enumerate the process table")?;

    let mut generation = Generation::with_capacity(granularity.initial_slots(), cpu);
    let mut skipped = 0usize;

    for pid in pids {
        match granularity {
            Granularity::Process => {
                let handle = pool.acquire(Identity::process(pid));
                match fill_process(source, pool.get_mut(&handle), pid) {
                    Ok(()) => generation.push(handle),
                    Err(e) => {
                        debug!("Skipping pid {}: {}", pid, e);
                        pool.release(handle);
                        skipped += 1;
                    }
                }
            }
            Granularity::Thread => {
                let details = match read_process_details(source, pid) {
                    Ok(d) => d,
                    Err(e) => {
                        debug!("Skipping pid {} and its threads: {}", pid, e);
                        skipped += 1;
                        continue;
                    }
                };
                let tids = match source.list_tids(pid) {
                    Ok(t) => t,
                    Err(e) => {
                        debug!("Skipping pid {}: cannot list threads: {}", pid, e);
                        skipped += 1;
                        continue;
                    }
                };

                for tid in tids {
                    let handle = pool.acquire(Identity::thread(pid, tid));
                    let rec = pool.get_mut(&handle);
                    match source
                        .read_stat(pid, Some(tid))
                        .and_then(|content| apply_stat(rec, &content))
                    {
                        Ok(()) => {
                            rec.name.push_str(&details.name);
                            rec.uid = details.uid;
                            rec.gid = details.gid;
                            generation.push(handle);
                        }
                        Err(e) => {
                            debug!("Skipping tid {} of pid {}: {}", tid, pid, e);
                            pool.release(handle);
                            skipped += 1;
                        }
                    }
                }
            }
        }
    }

    debug!(
        "Read generation: {} entities, {} skipped, {:.2}ms",
        generation.len(),
        skipped,
        start.elapsed().as_secs_f64() * 1000.0
    );

    Ok(ReadOutcome {
        generation,
        skipped,
    })
}
