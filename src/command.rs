use crate::env::Environment;
use anyhow::Result;
use std::io::Write;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// Children killed by a signal are reported as `128 + signal`, as POSIX shells do.
pub type ExitCode = i32;

/// Signature shared by every built-in handler.
///
/// Handlers receive the whole token sequence (token 0 is the command name),
/// the shell environment, and the streams to write normal and error output to.
/// They run inside the shell process. An `Err` is reserved for failures to
/// write to those streams; command failures are reported on `stderr` and
/// turned into a non-zero exit code.
pub type Handler = fn(
    tokens: &[String],
    env: &mut Environment,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> Result<ExitCode>;
