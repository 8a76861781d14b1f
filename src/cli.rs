//! Command-line arguments for proc-top.
//!
//! The short flags follow the classic `top` surface; logging and data
//! source selection are long-only.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::rank::SortKey;

/// Log level options for CLI parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "proc-top",
    about = "Live per-process and per-thread CPU and memory ranking",
    long_about = "Live per-process and per-thread CPU and memory ranking.\n\n\
                  Samples the process table at a fixed interval, computes per-entity CPU \
                  time deltas against the previous sample and shows the busiest entries. \
                  Redraws in place on a terminal; appends plain frames otherwise.",
    version,
    after_help = "Press 'q' to quit an interactive session."
)]
pub struct Args {
    /// Batch mode: plain output even on a terminal
    #[arg(short = 'b', long = "batch")]
    pub batch: bool,

    /// Maximum number of rows to show (default: fit the terminal)
    #[arg(short = 'm', long = "max-procs", value_name = "N")]
    pub max_procs: Option<usize>,

    /// Number of updates before exiting (default: run until quit)
    #[arg(short = 'n', long, value_name = "N")]
    pub iterations: Option<u64>,

    /// Seconds between updates
    #[arg(short = 'd', long, value_name = "N", default_value_t = 3)]
    pub delay: u64,

    /// Sort column
    #[arg(short = 's', long = "sort", value_enum, default_value = "cpu")]
    pub sort: SortKey,

    /// Show threads instead of processes
    #[arg(short = 't', long)]
    pub threads: bool,

    /// Log level (written to stderr)
    #[arg(long, value_enum, default_value = "warn")]
    pub log_level: LogLevel,

    /// Replay recorded snapshots (JSON/YAML/TOML) instead of reading /proc
    #[arg(long, value_name = "PATH", conflicts_with = "proc_root")]
    pub test_data_file: Option<PathBuf>,

    /// procfs mount point
    #[arg(long, value_name = "PATH", default_value = "/proc")]
    pub proc_root: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["proc-top"]).unwrap();
        assert!(!args.batch);
        assert!(!args.threads);
        assert_eq!(args.max_procs, None);
        assert_eq!(args.iterations, None);
        assert_eq!(args.delay, 3);
        assert_eq!(args.sort, SortKey::Cpu);
        assert_eq!(args.log_level, LogLevel::Warn);
        assert_eq!(args.proc_root, PathBuf::from("/proc"));
    }

    #[test]
    fn test_short_flags() {
        let args =
            Args::try_parse_from(["proc-top", "-b", "-m", "5", "-n", "2", "-d", "1", "-s", "rss", "-t"])
                .unwrap();
        assert!(args.batch);
        assert!(args.threads);
        assert_eq!(args.max_procs, Some(5));
        assert_eq!(args.iterations, Some(2));
        assert_eq!(args.delay, 1);
        assert_eq!(args.sort, SortKey::Rss);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = Args::try_parse_from(["proc-top", "-s", "mem"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);

        let err = Args::try_parse_from(["proc-top", "-d"]).unwrap_err();
        assert_eq!(err.exit_code(), 2);

        let err = Args::try_parse_from(["proc-top", "-n", "many"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn test_help_is_not_an_error_exit() {
        let err = Args::try_parse_from(["proc-top", "-h"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        assert_eq!(err.exit_code(), 0);
    }

    #[test]
    fn test_recorded_source_conflicts_with_proc_root() {
        let err = Args::try_parse_from([
            "proc-top",
            "--test-data-file",
            "frames.json",
            "--proc-root",
            "/host/proc",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }
}
