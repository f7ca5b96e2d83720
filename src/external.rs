use crate::command::ExitCode;
use crate::env::Environment;
use anyhow::{Context, Result, anyhow};
use nix::sys::wait::{WaitStatus, waitpid};
use nix::sys::signal::{SigHandler, Signal, signal};
use nix::unistd::{ForkResult, Pid, execve, fork};
use std::ffi::CString;
use std::io::Write;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Command that is not a builtin: a program image run in a forked child.
pub struct ExternalCommand {
    program: PathBuf,
    args: Vec<String>,
}

impl ExternalCommand {
    /// `args` is the full argument vector; `args[0]` is passed to the program as typed.
    pub fn new(program: PathBuf, args: Vec<String>) -> Self {
        Self { program, args }
    }

    /// Forks, replaces the child's image with the program and waits for it.
    ///
    /// Everything the child needs is converted before the fork. The child
    /// restores the default `SIGPIPE` action, calls `execve` and, on failure,
    /// writes a message and leaves through `libc::_exit(1)` so no exit
    /// handlers or stdio flushes run in the copy of the shell.
    pub fn execute(self, env: &Environment) -> Result<ExitCode> {
        let program = c_string(self.program.as_os_str().as_bytes())
            .with_context(|| self.program.display().to_string())?;
        let argv = self
            .args
            .iter()
            .map(|arg| c_string(arg.as_bytes()))
            .collect::<Result<Vec<_>>>()
            .with_context(|| self.program.display().to_string())?;
        let envp = env.envp();
        let failure = format!("{}: ", self.program.display());

        // SAFETY: the child only performs exec and raw writes before exiting.
        match unsafe { fork() }
            .map_err(|errno| anyhow!("{}: {}", self.program.display(), errno.desc()))?
        {
            ForkResult::Child => {
                // The Rust runtime ignores SIGPIPE; programs expect the default.
                let _ = unsafe { signal(Signal::SIGPIPE, SigHandler::SigDfl) };
                let errno = match execve(&program, &argv, &envp) {
                    Ok(never) => match never {},
                    Err(errno) => errno,
                };
                let mut stderr = std::io::stderr();
                let _ = stderr.write_all(failure.as_bytes());
                let _ = stderr.write_all(errno.desc().as_bytes());
                let _ = stderr.write_all(b"\n");
                unsafe { nix::libc::_exit(1) }
            }
            ForkResult::Parent { child } => {
                debug!(pid = %child, program = %self.program.display(), "spawned child");
                let code = wait_for(child)?;
                debug!(pid = %child, code, "child terminated");
                Ok(code)
            }
        }
    }
}

fn c_string(bytes: &[u8]) -> Result<CString> {
    CString::new(bytes).map_err(|_| anyhow!("argument contains a NUL byte"))
}

/// Blocks until `child` terminates and converts its status to an exit code.
fn wait_for(child: Pid) -> Result<ExitCode> {
    loop {
        match waitpid(child, None) {
            Ok(WaitStatus::Exited(_, code)) => return Ok(code),
            Ok(WaitStatus::Signaled(_, signal, _)) => return Ok(terminated_by_signal(signal)),
            Ok(_) => continue,
            Err(nix::errno::Errno::EINTR) => continue,
            Err(errno) => return Err(anyhow!("waitpid: {}", errno.desc())),
        }
    }
}

fn terminated_by_signal(signal: nix::sys::signal::Signal) -> ExitCode {
    128 + signal as i32
}

/// Whether `token`, taken literally as a path, names something `stat` can see.
pub fn is_direct_path(token: &str) -> bool {
    crate::resolver::find_by_path(Path::new(token)).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn run(program: &str, args: &[&str]) -> Result<ExitCode> {
        ExternalCommand::new(
            PathBuf::from(program),
            args.iter().map(|s| s.to_string()).collect(),
        )
        .execute(&Environment::new())
    }

    #[test]
    fn exit_status_is_reported() {
        assert_eq!(run("/bin/sh", &["sh", "-c", "exit 0"]).unwrap(), 0);
        assert_eq!(run("/bin/sh", &["sh", "-c", "exit 3"]).unwrap(), 3);
    }

    #[test]
    fn signal_death_maps_to_128_plus_signal() {
        assert_eq!(run("/bin/sh", &["sh", "-c", "kill -9 $$"]).unwrap(), 128 + 9);
    }

    #[test]
    fn overrides_reach_the_child() {
        let mut env = Environment::new();
        env.set_var("FORKSH_TEST_VALUE", "forty-two");
        let cmd = ExternalCommand::new(
            PathBuf::from("/bin/sh"),
            vec![
                "sh".into(),
                "-c".into(),
                "test \"$FORKSH_TEST_VALUE\" = forty-two".into(),
            ],
        );
        assert_eq!(cmd.execute(&env).unwrap(), 0);
    }

    #[test]
    fn failed_exec_exits_child_with_one() {
        let dir = tempfile::tempdir().unwrap();
        let not_executable = dir.path().join("plain.txt");
        fs::write(&not_executable, "just text").unwrap();

        let code = run(not_executable.to_str().unwrap(), &["plain.txt"]).unwrap();
        assert_eq!(code, 1);
    }

    #[test]
    fn nul_byte_in_argument_spawns_nothing() {
        let err = run("/bin/sh", &["sh", "a\0b"]).unwrap_err();
        assert!(format!("{err:#}").contains("NUL"));
    }

    #[test]
    fn direct_path_checks_stat() {
        let dir = tempfile::tempdir().unwrap();
        assert!(is_direct_path(dir.path().to_str().unwrap()));
        assert!(!is_direct_path(
            dir.path().join("missing").to_str().unwrap()
        ));
    }
}
