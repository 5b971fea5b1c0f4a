//! Logging initialization for the endpoint process.
//!
//! Configures the `tracing` subscriber with level filtering via the `APID_LOG`
//! environment variable, falling back to the directive from the config file
//! (`[endpoint] log`, default `info`) when the variable is unset.
//!
//! The CLI side of the binary stays silent on purpose: its observable output
//! is the usage/diagnostic contract on stderr, not log lines. Only the
//! endpoint process installs a subscriber.
//!
//! # Usage
//!
//! ```bash
//! # Default (info level)
//! apid start-foreground 16268
//!
//! # Debug level
//! APID_LOG=debug apid start-foreground 16268
//!
//! # Module-specific filtering
//! APID_LOG=apid=debug,warn apid start-foreground 16268
//! ```

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable consulted for filter directives.
pub const LOG_ENV: &str = "APID_LOG";

/// Where the endpoint writes its log output.
#[derive(Debug, Clone)]
pub enum LogTarget {
    /// Foreground mode: log to the inherited stderr.
    Stderr,
    /// Background mode: stdio is detached, log to a file instead.
    File(PathBuf),
}

/// Initialize the tracing subscriber for the endpoint process.
///
/// Reads `APID_LOG` for filter directives, falling back to `directive`.
/// Returns an error if a file target cannot be opened.
///
/// # Panics
///
/// Panics if a global subscriber has already been set (should only be
/// called once, at endpoint startup).
pub fn init(directive: &str, target: &LogTarget) -> std::io::Result<()> {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info")));

    match target {
        LogTarget::Stderr => {
            fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogTarget::File(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
    }
    Ok(())
}
