//! Frame rendering for interactive terminals and plain streams.
//!
//! Interactive frames are drawn in place with VT100 sequences: every line
//! is padded or cut to the terminal width and the frame ends without a
//! newline so the cursor stays on the last row. Plain frames are appended
//! to the output, separated by a blank line, and omit the CPU summary.

use std::io::{self, Write};

use crate::delta::CpuUsage;
use crate::entity::EntityRecord;
use crate::generation::Generation;
use crate::pool::EntityPool;
use crate::process::Granularity;
use crate::users::UserNames;

const CLEAR_ABOVE: &str = "\x1b[1J";
const CURSOR_HOME: &str = "\x1b[1;1H";
const HIDE_CURSOR: &str = "\x1b[?25l";
const CLEAR_LINE: &str = "\x1b[2K";
const HEADER_ON: &str = "\x1b[30;47m";
const HEADER_OFF: &str = "\x1b[39;49m";
/// Restores the cursor hidden at the start of each interactive frame.
pub const SHOW_CURSOR: &str = "\x1b[?25h";

/// Lines an interactive frame needs besides the data rows.
const CHROME_ROWS: usize = 3;

/// Where a frame goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    /// Fixed-size terminal, redrawn in place.
    Interactive { width: usize, height: usize },
    /// Append-only stream.
    Plain,
}

/// Number of data rows a frame may show; `None` means no limit.
///
/// Interactive frames never exceed the terminal height minus the summary
/// and header lines, whatever was configured.
pub fn row_cap(max_rows: Option<usize>, mode: DisplayMode) -> Option<usize> {
    match mode {
        DisplayMode::Plain => max_rows,
        DisplayMode::Interactive { height, .. } => {
            let fit = height.saturating_sub(CHROME_ROWS);
            Some(max_rows.map_or(fit, |m| m.min(fit)))
        }
    }
}

/// Everything one frame shows.
pub struct Frame<'a> {
    pub generation: &'a Generation,
    pub pool: &'a EntityPool,
    pub usage: &'a CpuUsage,
    pub granularity: Granularity,
    pub mode: DisplayMode,
    pub max_rows: Option<usize>,
}

/// Formats frames, keeping the user-name cache between them.
pub struct Renderer {
    users: UserNames,
    page_size: u64,
}

impl Renderer {
    pub fn new(users: UserNames, page_size: u64) -> Self {
        Self { users, page_size }
    }

    /// Writes one frame and flushes; returns the number of data rows.
    pub fn render<W: Write>(&mut self, out: &mut W, frame: &Frame<'_>) -> io::Result<usize> {
        let width = match frame.mode {
            DisplayMode::Interactive { width, .. } => Some(width),
            DisplayMode::Plain => None,
        };

        if width.is_some() {
            write!(out, "{CLEAR_ABOVE}{CURSOR_HOME}{HIDE_CURSOR}{CLEAR_LINE}")?;
            put_line(out, width, &summary_line(frame.usage))?;
            writeln!(out)?;
            put_line(out, width, &totals_line(frame.usage))?;
            writeln!(out)?;
            write!(out, "{HEADER_ON}")?;
            put_line(out, width, header_line(frame.granularity))?;
            write!(out, "{HEADER_OFF}")?;
        } else {
            writeln!(out)?;
            put_line(out, width, header_line(frame.granularity))?;
        }

        let cap = row_cap(frame.max_rows, frame.mode);
        let mut rows = 0usize;
        for (i, slot) in frame.generation.slots().iter().enumerate() {
            let handle = match slot {
                Some(h) => h,
                None => break,
            };
            if cap.is_some_and(|c| i >= c) {
                break;
            }
            let rec = frame.pool.get(handle);
            let line = self.row_line(rec, frame.usage, frame.granularity);
            writeln!(out)?;
            put_line(out, width, &line)?;
            rows += 1;
        }

        if width.is_none() {
            writeln!(out)?;
        }
        out.flush()?;
        Ok(rows)
    }

    fn row_line(&mut self, rec: &EntityRecord, usage: &CpuUsage, granularity: Granularity) -> String {
        let cpu = usage.entity_percent(rec);
        let vss_kib = rec.vss / 1024;
        let rss_kib = rec.rss.saturating_mul(self.page_size) / 1024;
        let user = self.users.name(rec.uid);

        match granularity {
            Granularity::Process => format!(
                "{:>5} {:>2} {:>3}% {} {:>5} {:>7}Ki {:>7}Ki {:<8.8} {}",
                rec.id.pid,
                rec.last_cpu,
                cpu,
                rec.state,
                rec.num_threads,
                vss_kib,
                rss_kib,
                user,
                rec.display_name()
            ),
            Granularity::Thread => format!(
                "{:>5} {:>5} {:>2} {:>3}% {} {:>7}Ki {:>7}Ki {:<8.8} {:<15} {}",
                rec.id.pid,
                rec.id.tid,
                rec.last_cpu,
                cpu,
                rec.state,
                vss_kib,
                rss_kib,
                user,
                rec.thread_name,
                rec.name
            ),
        }
    }
}

/// Writes `text`, padded or cut to `width` when drawing on a terminal.
fn put_line<W: Write>(out: &mut W, width: Option<usize>, text: &str) -> io::Result<()> {
    match width {
        Some(w) => write!(out, "{:<w$.w$}", text, w = w),
        None => write!(out, "{text}"),
    }
}

pub fn summary_line(usage: &CpuUsage) -> String {
    format!(
        "User {}%, System {}%, IOW {}%, IRQ {}%",
        usage.user_percent(),
        usage.system_percent(),
        usage.iowait_percent(),
        usage.irq_percent()
    )
}

pub fn totals_line(usage: &CpuUsage) -> String {
    let d = &usage.delta;
    format!(
        "User {} + Nice {} + Sys {} + Idle {} + IOW {} + IRQ {} + SIRQ {} = {}",
        d.user, d.nice, d.system, d.idle, d.iowait, d.irq, d.softirq, usage.total_delta
    )
}

pub fn header_line(granularity: Granularity) -> &'static str {
    match granularity {
        Granularity::Process => "  PID PR CPU% S  #THR       VSS       RSS USER     COMMAND",
        Granularity::Thread => {
            "  PID   TID PR CPU% S       VSS       RSS USER     Thread          Proc"
        }
    }
}
