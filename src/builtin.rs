use crate::command::{ExitCode, Handler};
use crate::env::Environment;
use anyhow::{Context, Result, anyhow, bail};
use argh::{EarlyExit, FromArgs};
use nix::unistd::{chdir, getcwd};
use std::io::Write;
use tracing::debug;

/// Descriptor of a command implemented inside the shell process.
pub struct Builtin {
    /// Name the command is invoked by; matched exactly and case-sensitively.
    pub name: &'static str,
    /// Entry point, see [`Handler`].
    pub handler: Handler,
    /// One-line description printed by `?`.
    pub doc: &'static str,
}

/// The dispatch table, in the order `?` lists it.
pub static BUILTINS: &[Builtin] = &[
    Builtin {
        name: "?",
        handler: run::<Help>,
        doc: "show this help menu",
    },
    Builtin {
        name: "exit",
        handler: run::<Exit>,
        doc: "exit the command shell",
    },
    Builtin {
        name: "pwd",
        handler: run::<Pwd>,
        doc: "print working directory",
    },
    Builtin {
        name: "cd",
        handler: run::<Cd>,
        doc: "change working directory",
    },
];

/// Looks up the built-in registered under `name`, if any.
pub fn lookup(name: Option<&str>) -> Option<&'static Builtin> {
    let name = name?;
    BUILTINS.iter().find(|builtin| builtin.name == name)
}

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process without spawning a child process.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Executes the command.
    ///
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    /// Errors are printed to the shell's standard error by [`run`].
    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode>;
}

/// Parses `tokens` into `T` and runs it; this is the [`Handler`] stored in the table.
fn run<T: BuiltinCommand>(
    tokens: &[String],
    env: &mut Environment,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> Result<ExitCode> {
    let (name, args) = tokens
        .split_first()
        .context("built-in invoked without a command name")?;
    // Built-ins take no options: everything after the name is positional,
    // so `cd -dir` and `exit -1` reach the command untouched.
    let args: Vec<&str> = std::iter::once("--")
        .chain(args.iter().map(String::as_str))
        .collect();

    let cmd = match T::from_args(&[name.as_str()], &args) {
        Ok(cmd) => cmd,
        Err(EarlyExit { output, status }) => {
            let out: &mut dyn Write = if status.is_ok() { stdout } else { stderr };
            out.write_all(output.as_bytes())?;
            if !output.ends_with('\n') {
                out.write_all(b"\n")?;
            }
            return Ok(if status.is_ok() { 0 } else { 1 });
        }
    };

    debug!(builtin = %name, "running built-in");
    match cmd.execute(stdout, env) {
        Ok(code) => Ok(code),
        Err(e) => {
            writeln!(stderr, "{e:#}")?;
            Ok(1)
        }
    }
}

#[derive(FromArgs)]
/// Show this help menu.
pub struct Help {
    #[argh(positional, greedy)]
    /// ignored
    pub _args: Vec<String>,
}

impl BuiltinCommand for Help {
    fn execute(self, stdout: &mut dyn Write, _env: &mut Environment) -> Result<ExitCode> {
        for builtin in BUILTINS {
            writeln!(stdout, "{} - {}", builtin.name, builtin.doc)?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Exit the command shell.
pub struct Exit {
    #[argh(positional, greedy)]
    /// ignored; the shell always exits with status 0
    pub _args: Vec<String>,
}

impl BuiltinCommand for Exit {
    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        // The read loop drops the current line before the process goes away.
        env.should_exit = true;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Print the current working directory to standard output.
pub struct Pwd {
    #[argh(positional, greedy)]
    /// ignored
    pub _args: Vec<String>,
}

impl BuiltinCommand for Pwd {
    fn execute(self, stdout: &mut dyn Write, _env: &mut Environment) -> Result<ExitCode> {
        let cwd = getcwd().map_err(|errno| anyhow!("pwd: {}", errno.desc()))?;
        writeln!(stdout, "{}", cwd.display())?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Change the current working directory, to $HOME when no target is given.
pub struct Cd {
    #[argh(positional, greedy)]
    /// directory to switch to
    pub targets: Vec<String>,
}

impl BuiltinCommand for Cd {
    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let target = match self.targets.as_slice() {
            [] => env.get_var("HOME").context("cd: HOME not set")?,
            [dir] => dir.into(),
            _ => bail!("cd: too many arguments"),
        };

        chdir(target.as_os_str()).map_err(|errno| anyhow!("cd: {}", errno.desc()))?;
        Ok(0)
    }
}
