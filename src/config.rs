//! Effective run configuration, resolved from the command line.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::cli::Args;
use crate::process::Granularity;
use crate::rank::SortKey;

const DEFAULT_DELAY_SECS: u64 = 3;
const DEFAULT_PROC_ROOT: &str = "/proc";

/// How frames are presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayPreference {
    /// Interactive when both stdin and stdout are terminals.
    Auto,
    /// Always plain, append-only output.
    Plain,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub display: DisplayPreference,
    /// Row limit; `None` fits the terminal (or is unlimited in plain mode).
    pub max_rows: Option<usize>,
    /// Number of update cycles; `None` runs until quit.
    pub iterations: Option<u64>,
    pub delay: Duration,
    pub sort_key: SortKey,
    pub granularity: Granularity,
    pub test_data_file: Option<PathBuf>,
    pub proc_root: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            display: DisplayPreference::Auto,
            max_rows: None,
            iterations: None,
            delay: Duration::from_secs(DEFAULT_DELAY_SECS),
            sort_key: SortKey::Cpu,
            granularity: Granularity::Process,
            test_data_file: None,
            proc_root: PathBuf::from(DEFAULT_PROC_ROOT),
        }
    }
}

/// Rejected option combinations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `-s thr` together with `-t`.
    ThreadSortPerThread,
    TestDataNotFound(PathBuf),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ThreadSortPerThread => {
                write!(f, "Sorting by threads per thread makes no sense")
            }
            ConfigError::TestDataNotFound(path) => {
                write!(f, "Test data file not found: {}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Builds the effective configuration from parsed arguments.
pub fn resolve_config(args: &Args) -> Config {
    Config {
        display: if args.batch {
            DisplayPreference::Plain
        } else {
            DisplayPreference::Auto
        },
        max_rows: args.max_procs,
        iterations: args.iterations,
        delay: Duration::from_secs(args.delay),
        sort_key: args.sort,
        granularity: if args.threads {
            Granularity::Thread
        } else {
            Granularity::Process
        },
        test_data_file: args.test_data_file.clone(),
        proc_root: args.proc_root.clone(),
    }
}

/// Validate effective config before any sampling starts.
pub fn validate_effective_config(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.granularity == Granularity::Thread && cfg.sort_key == SortKey::Thr {
        return Err(ConfigError::ThreadSortPerThread);
    }

    if let Some(path) = &cfg.test_data_file {
        if !path.is_file() {
            return Err(ConfigError::TestDataNotFound(path.clone()));
        }
    }

    Ok(())
}
