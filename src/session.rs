use nix::sys::signal::{Signal, killpg};
use nix::sys::termios::{Termios, tcgetattr};
use nix::unistd::{Pid, getpgrp, getpid, tcgetpgrp, tcsetpgrp};
use std::io::{self, IsTerminal};
use tracing::{debug, warn};

/// Process-wide shell settings, decided once at startup.
///
/// The shell's terminal is always its standard input.
#[derive(Debug)]
pub struct Session {
    interactive: bool,
    shell_pgid: Option<Pid>,
    /// Terminal modes as found at startup. Nothing restores them yet.
    saved_modes: Option<Termios>,
    line_num: usize,
}

impl Session {
    /// Inspects standard input and, when it is a terminal, waits until the
    /// shell is in the foreground and takes control of the terminal.
    pub fn init() -> Self {
        let stdin = io::stdin();
        let mut session = Self::detached();
        session.interactive = stdin.is_terminal();
        if session.interactive {
            session.acquire_terminal(&stdin);
        }
        debug!(interactive = session.interactive, "session initialized");
        session
    }

    /// A non-interactive session: no terminal handling and no prompts.
    pub fn detached() -> Self {
        Self {
            interactive: false,
            shell_pgid: None,
            saved_modes: None,
            line_num: 0,
        }
    }

    fn acquire_terminal(&mut self, terminal: &io::Stdin) {
        // Stop ourselves with SIGTTIN until whoever runs us hands over the terminal.
        loop {
            let pgrp = getpgrp();
            match tcgetpgrp(terminal) {
                Ok(foreground) if foreground == pgrp => break,
                Ok(_) => {
                    if let Err(errno) = killpg(pgrp, Signal::SIGTTIN) {
                        warn!(%errno, "could not stop process group");
                        break;
                    }
                }
                Err(errno) => {
                    warn!(%errno, "could not query terminal foreground group");
                    break;
                }
            }
        }

        let pgid = getpid();
        self.shell_pgid = Some(pgid);
        if let Err(errno) = tcsetpgrp(terminal, pgid) {
            warn!(%errno, "could not take control of the terminal");
        }
        match tcgetattr(terminal) {
            Ok(modes) => self.saved_modes = Some(modes),
            Err(errno) => warn!(%errno, "could not save terminal modes"),
        }
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn shell_pgid(&self) -> Option<Pid> {
        self.shell_pgid
    }

    pub fn saved_modes(&self) -> Option<&Termios> {
        self.saved_modes.as_ref()
    }

    pub fn line_num(&self) -> usize {
        self.line_num
    }

    /// The prompt to show before the next read, `"<n>: "`; `None` unless interactive.
    pub fn prompt(&self) -> Option<String> {
        self.interactive.then(|| format!("{}: ", self.line_num))
    }

    /// Called once per processed line.
    pub fn advance(&mut self) {
        self.line_num += 1;
    }
}
