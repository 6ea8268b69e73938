use std::io::{IsTerminal, Read};
use std::path::PathBuf;

use clap::Parser;

use qualgate::dispatch::{self, DispatchOptions};
use qualgate::{Error, config};

#[derive(Parser)]
#[command(
    name = "qualgate",
    version,
    about = "Quality-check dispatcher for AI-assistant post-edit hooks"
)]
struct Cli {
    /// Configured command to dispatch (e.g. lint, test, typecheck)
    #[arg(required_unless_present = "check")]
    command: Option<String>,

    /// Path to the configuration file (overrides discovery)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Cancel remaining commands after the first non-zero exit
    #[arg(long)]
    fail_fast: bool,

    /// Confirm passing groups on stderr and raise log verbosity
    #[arg(short, long)]
    verbose: bool,

    /// Invocation-wide default timeout in milliseconds
    #[arg(long, value_name = "MS")]
    timeout: Option<u64>,

    /// Number of commands to run concurrently (default: CPUs, capped at 8)
    #[arg(long, value_name = "N")]
    parallel: Option<usize>,

    /// Validate the configuration and exit without reading an event
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let code = run(cli).await;
    std::process::exit(code);
}

async fn run(cli: Cli) -> i32 {
    let config = match config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => return report_error(&e),
    };

    if cli.check {
        eprintln!(
            "[qualgate] configuration OK ({} commands, {} path scopes)",
            config.commands.len(),
            config.paths.len()
        );
        return qualgate_common::EXIT_OK;
    }

    // clap guarantees the positional is present when --check is absent.
    let Some(command) = cli.command else {
        return report_error(&Error::Internal("missing command argument".into()));
    };

    let mut event_bytes = Vec::new();
    if std::io::stdin().is_terminal() {
        return report_error(&Error::Event("no event payload on stdin".into()));
    }
    if let Err(e) = std::io::stdin().read_to_end(&mut event_bytes) {
        return report_error(&Error::Event(format!("cannot read event from stdin: {e}")));
    }
    if event_bytes.is_empty() {
        return report_error(&Error::Event("empty event payload on stdin".into()));
    }

    let opts = DispatchOptions {
        fail_fast: cli.fail_fast,
        verbose: cli.verbose,
        timeout_ms: cli.timeout,
        parallel: cli.parallel,
    };
    match dispatch::dispatch(&command, &event_bytes, &config, &opts).await {
        Ok(code) => code,
        Err(e) => report_error(&e),
    }
}

fn report_error(e: &Error) -> i32 {
    eprintln!("[qualgate] {e}");
    e.exit_code()
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "qualgate=debug" } else { "qualgate=warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_env("QUALGATE_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
