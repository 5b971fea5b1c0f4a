//! apid - CLI entry point.
//!
//! Parses the positional `COMMAND PORT [CONFIG_DIR]` surface, reads the
//! optional wallet password from the environment, and hands off to the
//! dispatcher with the local pidfile-based controller.
//!
//! Exit codes: 0 on success, 1 for operation failure, invalid arguments, or
//! an unrecognized command. clap's own parse failures (missing arguments)
//! are remapped from its default exit code 2 to 1 to match that contract;
//! `--help` and `--version` still exit 0.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::Parser;

use apid::{dispatch, Invocation, LocalController, USAGE, WALLET_PASSWORD_ENV};

/// Lifecycle controller for a local background API endpoint daemon
#[derive(Parser)]
#[command(name = "apid")]
#[command(version, about = "Lifecycle controller for a local background API endpoint daemon")]
struct Cli {
    /// Lifecycle command: start, start-foreground, status, stop, restart
    #[arg(value_name = "COMMAND")]
    command: String,

    /// Port the endpoint serves on
    ///
    /// Kept as a raw string so a non-integer value takes the usage/diagnostic
    /// path with exit code 1 instead of clap's exit code 2.
    #[arg(value_name = "PORT")]
    port: String,

    /// Optional config directory override
    #[arg(value_name = "CONFIG_DIR")]
    config_dir: Option<PathBuf>,
}

fn main() -> ExitCode {
    // Parse CLI arguments BEFORE any fork operations, so argument errors are
    // always reported in the invoking terminal.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => return handle_clap_error(e),
    };

    let invocation = match Invocation::parse(&cli.command, &cli.port, cli.config_dir) {
        Ok(invocation) => invocation,
        Err(e) => {
            eprintln!("apid: {e}");
            eprintln!("{USAGE}");
            return ExitCode::FAILURE;
        }
    };

    // Maybe-inherited wallet password; forwarded opaquely, never logged.
    let password = std::env::var(WALLET_PASSWORD_ENV).ok();

    ExitCode::from(dispatch::run(&invocation, &LocalController, password))
}

/// Print clap's diagnostic (its message already carries a usage line) and map
/// it onto the exit-code contract.
fn handle_clap_error(e: clap::Error) -> ExitCode {
    match e.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            // Help and version go to stdout and are not failures.
            let _ = e.print();
            ExitCode::SUCCESS
        }
        _ => {
            let _ = e.print();
            ExitCode::FAILURE
        }
    }
}
