//! proc-top: a sampling process monitor over /proc.
//!
//! Each cycle reads the process (or thread) table into a new generation of
//! pooled records, diffs it against the previous generation, ranks it and
//! renders a frame. The binary in `main.rs` only parses flags, sets up
//! logging and maps errors to exit codes.

pub mod app;
pub mod cli;
pub mod config;
pub mod delta;
pub mod entity;
pub mod generation;
pub mod pool;
pub mod process;
pub mod rank;
pub mod render;
pub mod state;
pub mod stats;
pub mod store;
pub mod system;
pub mod terminal;
pub mod testdata;
pub mod users;

pub use app::{run, Termination};
pub use cli::Args;
pub use config::{resolve_config, validate_effective_config, Config, ConfigError};
