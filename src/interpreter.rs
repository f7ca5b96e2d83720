use crate::builtin::lookup;
use crate::command::ExitCode;
use crate::env::Environment;
use crate::external::{ExternalCommand, is_direct_path};
use crate::lexer;
use crate::resolver::search_path;
use crate::session::Session;
use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::{debug, warn};

/// What happened to one input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A built-in ran in the shell process with this exit code.
    Builtin(ExitCode),
    /// An external program ran in a child and terminated with this code.
    Exited(ExitCode),
    /// The line had no tokens.
    Empty,
    /// Nothing matched the first token; "command not found" was reported.
    NotFound,
    /// The child could not be started; the reason was reported.
    SpawnFailed,
    /// The line could not be tokenized; the reason was reported.
    Invalid,
}

/// A minimal shell that runs built-in and external commands one line at a time.
///
/// The interpreter owns the [`Environment`] and borrows the [`Session`] that
/// `main` builds once at startup.
///
/// Example
/// ```no_run
/// use forksh::{Interpreter, Session};
/// let mut session = Session::init();
/// let mut sh = Interpreter::new(&mut session);
/// sh.repl().unwrap();
/// ```
pub struct Interpreter<'s> {
    session: &'s mut Session,
    env: Environment,
}

impl<'s> Interpreter<'s> {
    pub fn new(session: &'s mut Session) -> Self {
        Self {
            session,
            env: Environment::new(),
        }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    /// True once `exit` has run.
    pub fn should_exit(&self) -> bool {
        self.env.should_exit
    }

    /// Tokenizes and executes one line. The tokens are dropped on return.
    pub fn run_line(
        &mut self,
        line: &str,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
    ) -> Result<Outcome> {
        match lexer::split_into_tokens(line) {
            Ok(tokens) => self.execute(&tokens, stdout, stderr),
            Err(e) => {
                writeln!(stderr, "forksh: {e}")?;
                Ok(Outcome::Invalid)
            }
        }
    }

    /// Executes one token sequence.
    ///
    /// In order: a built-in named by the first token; the first token as a
    /// literal path; the first token resolved through `PATH`; nothing for an
    /// empty line; otherwise a "command not found" report.
    pub fn execute(
        &mut self,
        tokens: &[String],
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
    ) -> Result<Outcome> {
        let first = tokens.first().map(String::as_str);

        if let Some(builtin) = lookup(first) {
            let code = (builtin.handler)(tokens, &mut self.env, stdout, stderr)?;
            return Ok(Outcome::Builtin(code));
        }

        let Some(name) = first else {
            return Ok(Outcome::Empty);
        };

        let program = if is_direct_path(name) {
            PathBuf::from(name)
        } else if let Some(resolved) = search_path(&self.env, name) {
            resolved
        } else {
            debug!(command = name, "no built-in, path or PATH match");
            writeln!(stderr, "{name}: command not found")?;
            return Ok(Outcome::NotFound);
        };

        // The child inherits our stdout buffer otherwise.
        stdout.flush()?;
        match ExternalCommand::new(program, tokens.to_vec()).execute(&self.env) {
            Ok(code) => Ok(Outcome::Exited(code)),
            Err(e) => {
                writeln!(stderr, "{e:#}")?;
                Ok(Outcome::SpawnFailed)
            }
        }
    }

    /// Runs one line for the read loop. Failures to write the command's
    /// output are reported on `stderr` and never end the loop.
    fn process_line(&mut self, line: &str, stdout: &mut dyn Write, stderr: &mut dyn Write) {
        if let Err(e) = self.run_line(line, stdout, stderr) {
            report(stderr, &format!("forksh: {e:#}"));
        }
    }

    /// Reads lines until end of input or `exit`, executing each one.
    ///
    /// Prompts are written to `stdout` only when the session is interactive.
    /// Lines of any length are read whole; a line that is not valid UTF-8 is
    /// reported and skipped.
    pub fn run_reader<R: BufRead>(
        &mut self,
        mut reader: R,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
    ) -> Result<()> {
        let mut buf = Vec::new();
        loop {
            if let Some(prompt) = self.session.prompt() {
                let written = stdout
                    .write_all(prompt.as_bytes())
                    .and_then(|()| stdout.flush());
                if let Err(e) = written {
                    warn!(error = %e, "could not write prompt");
                }
            }

            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                return Ok(());
            }

            match std::str::from_utf8(&buf) {
                Ok(line) => self.process_line(line, stdout, stderr),
                Err(_) => report(stderr, "forksh: invalid UTF-8"),
            }
            if self.should_exit() {
                return Ok(());
            }
            self.session.advance();
        }
    }

    /// The shell's read loop over the real standard streams.
    ///
    /// Interactive sessions read through a line editor; anything else is read
    /// as plain buffered input without prompts.
    pub fn repl(&mut self) -> Result<()> {
        if !self.session.is_interactive() {
            let stdin = io::stdin();
            return self.run_reader(stdin.lock(), &mut io::stdout(), &mut io::stderr());
        }

        let mut rl = DefaultEditor::new()?;
        loop {
            let prompt = self.session.prompt().unwrap_or_default();
            match rl.readline(&prompt) {
                Ok(line) => {
                    if let Err(e) = rl.add_history_entry(line.as_str()) {
                        warn!(error = %e, "could not record history");
                    }
                    self.process_line(&line, &mut io::stdout(), &mut io::stderr());
                    if self.should_exit() {
                        return Ok(());
                    }
                    self.session.advance();
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => return Ok(()),
                Err(err) => return Err(err.into()),
            }
        }
    }
}

/// Last-resort error report; if stderr itself is gone there is nowhere left to say it.
fn report(stderr: &mut dyn Write, message: &str) {
    if let Err(e) = writeln!(stderr, "{message}") {
        warn!(error = %e, report = message, "could not report error");
    }
}
