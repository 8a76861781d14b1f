//! Terminal driver: tty probing, window size, input mode and the wait.
//!
//! The SIGINT handler only raises an atomic flag. Restoring the terminal
//! happens in [`TerminalSession`]'s `Drop`, on the normal flow, after the
//! wait has woken up and the loop has unwound.

use std::io::{self, Write};
use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::debug;

use crate::render::SHOW_CURSOR;

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_interrupt(_signal: libc::c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Whether an interrupt was requested since start-up.
pub fn interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// True when both stdin and stdout are terminals.
pub fn is_interactive() -> bool {
    // SAFETY: isatty only inspects the descriptor.
    unsafe { libc::isatty(libc::STDIN_FILENO) == 1 && libc::isatty(libc::STDOUT_FILENO) == 1 }
}

/// Current terminal size as (columns, rows).
pub fn window_size() -> io::Result<(usize, usize)> {
    // SAFETY: winsize is plain old data.
    let mut ws: libc::winsize = unsafe { mem::zeroed() };
    // SAFETY: TIOCGWINSZ writes a winsize into the pointer we pass.
    let rc = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &mut ws) };
    if rc == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok((usize::from(ws.ws_col), usize::from(ws.ws_row)))
}

/// Interactive terminal state held for the duration of a run.
///
/// Starting a session turns off canonical input and echo on stdin and
/// installs the SIGINT flag handler. Dropping it shows the cursor again and
/// puts both back the way they were.
pub struct TerminalSession {
    original: libc::termios,
    previous_action: Option<libc::sigaction>,
}

impl TerminalSession {
    pub fn start() -> io::Result<Self> {
        // SAFETY: termios is plain old data; tcgetattr fills it in.
        let mut original: libc::termios = unsafe { mem::zeroed() };
        // SAFETY: valid descriptor and pointer.
        if unsafe { libc::tcgetattr(libc::STDIN_FILENO, &mut original) } != 0 {
            return Err(io::Error::last_os_error());
        }

        let mut raw = original;
        raw.c_lflag &= !(libc::ICANON | libc::ECHO);
        // SAFETY: valid descriptor and pointer.
        if unsafe { libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, &raw) } != 0 {
            return Err(io::Error::last_os_error());
        }

        let mut session = Self {
            original,
            previous_action: None,
        };
        session.previous_action = Some(install_interrupt_handler()?);
        debug!("Terminal input switched to non-canonical mode");
        Ok(session)
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let mut stdout = io::stdout();
        let _ = writeln!(stdout, "{SHOW_CURSOR}");
        let _ = stdout.flush();

        // SAFETY: restores the attributes captured in `start`.
        unsafe {
            libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, &self.original);
        }
        if let Some(previous) = self.previous_action.take() {
            // SAFETY: reinstalls the action returned by the earlier sigaction.
            unsafe {
                libc::sigaction(libc::SIGINT, &previous, std::ptr::null_mut());
            }
        }
        debug!("Terminal restored");
    }
}

fn install_interrupt_handler() -> io::Result<libc::sigaction> {
    // SAFETY: sigaction is plain old data; the handler only touches an atomic.
    unsafe {
        let mut action: libc::sigaction = mem::zeroed();
        action.sa_sigaction = on_interrupt as extern "C" fn(libc::c_int) as libc::sighandler_t;
        // No SA_RESTART: the wait must return EINTR.
        action.sa_flags = 0;
        libc::sigemptyset(&mut action.sa_mask);

        let mut previous: libc::sigaction = mem::zeroed();
        if libc::sigaction(libc::SIGINT, &action, &mut previous) != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(previous)
    }
}

/// Why a wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    Timeout,
    InputReady,
    Interrupted,
}

/// Blocks for up to `timeout`, waking early when stdin becomes readable
/// (only if `watch_input`) or when an interrupt arrives.
pub fn wait(timeout: Duration, watch_input: bool) -> io::Result<Wake> {
    if interrupted() {
        return Ok(Wake::Interrupted);
    }

    let mut fds = [libc::pollfd {
        fd: libc::STDIN_FILENO,
        events: libc::POLLIN,
        revents: 0,
    }];
    let nfds: libc::nfds_t = if watch_input { 1 } else { 0 };
    let millis = libc::c_int::try_from(timeout.as_millis()).unwrap_or(libc::c_int::MAX);

    // SAFETY: `fds` outlives the call and `nfds` never exceeds its length.
    let rc = unsafe { libc::poll(fds.as_mut_ptr(), nfds, millis) };
    if rc == -1 {
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::Interrupted {
            return Ok(if interrupted() {
                Wake::Interrupted
            } else {
                Wake::Timeout
            });
        }
        return Err(err);
    }

    if interrupted() {
        Ok(Wake::Interrupted)
    } else if rc > 0 && fds[0].revents != 0 {
        Ok(Wake::InputReady)
    } else {
        Ok(Wake::Timeout)
    }
}

/// Keys the loop reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// 'q' or end of input.
    Quit,
    Other,
}

pub fn classify_key(byte: Option<u8>) -> Key {
    match byte {
        None | Some(b'q') => Key::Quit,
        Some(_) => Key::Other,
    }
}

/// Reads one byte from stdin.
pub fn read_key() -> io::Result<Key> {
    let mut byte = 0u8;
    // SAFETY: reads at most one byte into a live local.
    let n = unsafe { libc::read(libc::STDIN_FILENO, (&mut byte as *mut u8).cast(), 1) };
    match n {
        -1 => Err(io::Error::last_os_error()),
        0 => Ok(classify_key(None)),
        _ => Ok(classify_key(Some(byte))),
    }
}
