//! A rudimentary fork/exec command shell.
//!
//! Each input line is split into tokens, then either handled by one of four
//! built-in commands running inside the shell process, or executed as an
//! external program in a forked child that the shell waits for before
//! reading the next line. There are no pipelines, redirections or jobs.
//!
//! The main entry point is [`Interpreter`], which owns the shell's
//! [`Environment`](env::Environment) and borrows the [`Session`] built once at
//! startup.

mod builtin;
pub mod command;
pub mod env;
mod external;
mod interpreter;
pub mod lexer;
pub mod resolver;
mod session;

pub use builtin::{Builtin, BUILTINS, lookup};
pub use interpreter::{Interpreter, Outcome};
pub use session::Session;
