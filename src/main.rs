use forksh::{Interpreter, Session};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Silent unless RUST_LOG is set.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("off")),
        )
        .init();

    let mut session = Session::init();
    Interpreter::new(&mut session).repl()
}
