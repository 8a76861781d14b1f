use clap::{CommandFactory, Parser};
use std::process::ExitCode;
use tracing::{error, info, Level};

use proc_top::cli::{Args, LogLevel};
use proc_top::{resolve_config, run, validate_effective_config};

/// Initializes tracing on stderr; `off` installs nothing.
fn setup_logging(args: &Args) {
    let log_level = match args.log_level {
        LogLevel::Off => return,
        LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    info!("Logging initialized with level: {:?}", args.log_level);
}

fn main() -> ExitCode {
    let args = Args::parse();
    setup_logging(&args);

    let config = resolve_config(&args);
    if let Err(e) = validate_effective_config(&config) {
        error!("Configuration invalid: {}", e);
        eprintln!("proc-top: {}", e);
        eprintln!("{}", Args::command().render_usage());
        return ExitCode::FAILURE;
    }

    info!("Starting proc-top");

    match run(&config) {
        Ok(termination) => {
            info!(?termination, "proc-top finished");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Fatal: {:#}", e);
            eprintln!("proc-top: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
