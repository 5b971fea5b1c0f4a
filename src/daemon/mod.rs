//! Endpoint process shell for apid.
//!
//! The endpoint is the long-running side of the binary: it records its pid,
//! initializes logging, and waits for a shutdown signal. The RPC surface the
//! daemon would expose is out of scope here; this module owns only the
//! process lifecycle the controller supervises.

pub mod logging;
pub mod pidfile;

pub use logging::LogTarget;
pub use pidfile::{PidfileError, PidfileGuard};

use std::fs::{File, OpenOptions};
use std::path::PathBuf;

use thiserror::Error;
use tokio::runtime::Runtime;
use tokio::signal;
use tokio::signal::unix::{signal as unix_signal, SignalKind};
use tracing::{error, info, warn};

use crate::config::paths::{ensure_dir, Paths};
use crate::config::schema::Settings;

/// Filename of the background endpoint log inside the config directory.
pub const LOG_FILE_NAME: &str = "endpoint.log";

/// Errors raised while bringing up or tearing down the endpoint process.
#[derive(Error, Debug)]
pub enum EndpointError {
    /// The config directory could not be created.
    #[error("failed to create config directory {}", .path.display())]
    ConfigDir {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Logging could not be initialized (background log file unopenable).
    #[error("failed to initialize endpoint logging")]
    Logging(#[source] std::io::Error),

    /// Pidfile could not be written or removed.
    #[error(transparent)]
    Pidfile(#[from] PidfileError),

    /// The Tokio runtime could not be created.
    #[error("failed to create Tokio runtime")]
    Runtime(#[source] std::io::Error),
}

/// Returns the background endpoint log path for the given configuration.
pub fn log_path(paths: &Paths) -> PathBuf {
    paths.config_dir.join(LOG_FILE_NAME)
}

/// Block until SIGINT or SIGTERM arrives.
///
/// SIGTERM is what `stop` delivers to a background endpoint; SIGINT covers a
/// foreground run interrupted from the terminal. Should the SIGTERM handler
/// fail to register, the endpoint still honors Ctrl+C.
async fn wait_for_shutdown() {
    match unix_signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("received SIGTERM, endpoint shutting down");
                },
                _ = signal::ctrl_c() => {
                    info!("received SIGINT, endpoint shutting down");
                },
            }
        }
        Err(e) => {
            warn!(error = %e, "could not register SIGTERM handler, falling back to SIGINT");
            match signal::ctrl_c().await {
                Ok(()) => info!("received SIGINT, endpoint shutting down"),
                Err(e) => error!(error = %e, "failed waiting for SIGINT"),
            }
        }
    }
}

/// Detach the standard streams of a forked endpoint child.
///
/// Closes fds 0-2 and reopens them on `/dev/null` so a stray write can never
/// land on an fd inherited from the invoking terminal or test harness. The
/// replacement handles are intentionally leaked; they must live as long as
/// the process.
pub fn detach_stdio() -> std::io::Result<()> {
    fork::close_fd()?;
    let stdin = File::open("/dev/null")?;
    let stdout = OpenOptions::new().write(true).open("/dev/null")?;
    let stderr = OpenOptions::new().write(true).open("/dev/null")?;
    std::mem::forget(stdin);
    std::mem::forget(stdout);
    std::mem::forget(stderr);
    Ok(())
}

/// Run the endpoint until a shutdown signal arrives.
///
/// This is the body of both `start-foreground` (called in-process, logging to
/// stderr) and a forked background `start` child (stdio detached, logging to
/// the endpoint log file). It writes the pidfile on entry and removes it on
/// return via an RAII guard.
///
/// The wallet password is carried opaquely for the RPC surface; only its
/// presence is ever logged.
pub fn run_endpoint(
    port: u16,
    paths: &Paths,
    password: Option<&str>,
    settings: &Settings,
    target: &LogTarget,
) -> Result<(), EndpointError> {
    // A first run starts into a config directory that does not exist yet; the
    // log file and pidfile both live inside it.
    ensure_dir(&paths.config_dir).map_err(|source| EndpointError::ConfigDir {
        path: paths.config_dir.clone(),
        source,
    })?;

    logging::init(&settings.endpoint.log, target).map_err(EndpointError::Logging)?;

    let _pidfile = PidfileGuard::acquire(paths)?;

    info!(
        port,
        pid = std::process::id(),
        config_dir = %paths.config_dir.display(),
        wallet_password = password.is_some(),
        "local API endpoint starting"
    );

    // Runtime creation is deferred to here so a background child only builds
    // it after the fork (forking a live Tokio runtime corrupts its
    // signal-handling state).
    let runtime = Runtime::new().map_err(EndpointError::Runtime)?;

    info!("endpoint running, send SIGTERM or press Ctrl+C to stop");
    runtime.block_on(wait_for_shutdown());

    info!("endpoint stopped");
    Ok(())
}
