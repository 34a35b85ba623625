use anyhow::Context;
use argh::FromArgs;
use smallsh::Interpreter;
use smallsh::config::{LOG_ENV, ShellConfig};
use smallsh::signals;
use tracing_subscriber::EnvFilter;

#[derive(FromArgs)]
/// A small shell with redirection and background jobs.
struct Args {
    #[argh(option)]
    /// text printed before each command line (default ": ")
    prompt: Option<String>,

    #[argh(switch, short = 'v')]
    /// log at debug level unless SMALLSH_LOG says otherwise
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args: Args = argh::from_env();

    let mut config = ShellConfig::default();
    if let Some(prompt) = args.prompt {
        config = config.with_prompt(prompt);
    }
    if args.verbose {
        config = config.verbose();
    }

    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(&config.default_log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    signals::ignore_interrupt().context("setting up interrupt handling")?;

    Interpreter::with_config(config).repl()
}
