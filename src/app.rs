//! The update loop: read, compute, render, wait.
//!
//! `run` picks the process source and display mode, then drives
//! [`update_loop`]. In interactive mode a [`TerminalSession`] is held for
//! the whole loop, so the terminal is restored however the loop ends.

use anyhow::{Context, Result};
use std::io::{self, Write};
use tracing::{debug, info};

use crate::config::{Config, DisplayPreference};
use crate::process::{ProcFs, ProcessEnumerator};
use crate::render::{DisplayMode, Frame, Renderer};
use crate::state::TopState;
use crate::system::PAGE_SIZE;
use crate::terminal::{self, Key, TerminalSession, Wake};
use crate::testdata::RecordedSnapshots;
use crate::users::UserNames;

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    IterationsDone,
    Quit,
    Interrupted,
}

/// Runs proc-top with the given configuration until it terminates.
pub fn run(config: &Config) -> Result<Termination> {
    match &config.test_data_file {
        Some(path) => {
            let source = RecordedSnapshots::load(path)
                .with_context(|| format!("Could not load recorded snapshots from {}", path.display()))?;
            run_with(source, config)
        }
        None => run_with(ProcFs::new(config.proc_root.clone()), config),
    }
}

fn run_with<E: ProcessEnumerator>(source: E, config: &Config) -> Result<Termination> {
    let interactive = match config.display {
        DisplayPreference::Plain => false,
        DisplayPreference::Auto => terminal::is_interactive(),
    };
    info!(
        interactive,
        granularity = ?config.granularity,
        sort = ?config.sort_key,
        "Starting update loop"
    );

    let mut state = TopState::new(source, config.granularity, config.sort_key);
    let mut renderer = Renderer::new(UserNames::system(), *PAGE_SIZE);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let result = if interactive {
        terminal::window_size().context("Could not get terminal window size")?;
        let _session = TerminalSession::start().context("Could not configure terminal input")?;
        update_loop(&mut state, &mut renderer, &mut out, config, true)
    } else {
        update_loop(&mut state, &mut renderer, &mut out, config, false)
    };

    debug!("Scan statistics:\n{}", state.stats().render_table());
    result
}

/// Drives cycles until the iteration count is reached, the user quits or
/// an interrupt arrives.
///
/// One sample is taken up front so the first rendered frame already has an
/// interval to report on. Every cycle then waits, samples, computes and
/// renders. With `interactive` unset the wait ignores stdin.
pub fn update_loop<E, W>(
    state: &mut TopState<E>,
    renderer: &mut Renderer,
    out: &mut W,
    config: &Config,
    interactive: bool,
) -> Result<Termination>
where
    E: ProcessEnumerator,
    W: Write,
{
    state.sample()?;

    let mut remaining = config.iterations;
    let termination = loop {
        if let Some(n) = remaining.as_mut() {
            if *n == 0 {
                break Termination::IterationsDone;
            }
            *n -= 1;
        }

        match terminal::wait(config.delay, interactive).context("Could not wait for input")? {
            Wake::Interrupted => break Termination::Interrupted,
            Wake::InputReady => {
                if terminal::read_key().context("Could not read input")? == Key::Quit {
                    break Termination::Quit;
                }
            }
            Wake::Timeout => {}
        }

        state.sample()?;
        let usage = state.compute();

        let mode = if interactive {
            let (width, height) =
                terminal::window_size().context("Could not get terminal window size")?;
            DisplayMode::Interactive { width, height }
        } else {
            DisplayMode::Plain
        };

        if let Some(generation) = state.current() {
            let frame = Frame {
                generation,
                pool: state.pool(),
                usage: &usage,
                granularity: state.granularity(),
                mode,
                max_rows: config.max_rows,
            };
            let rows = renderer.render(out, &frame).context("Could not write frame")?;
            debug!(rows, entities = generation.len(), "Frame rendered");
        }

        state.finish_cycle();

        if terminal::interrupted() {
            break Termination::Interrupted;
        }
    };

    state.shutdown();
    info!(?termination, "Update loop finished");
    Ok(termination)
}
