//! Lifecycle control of the local API endpoint.
//!
//! `Controller` is the seam between the command dispatcher and whatever
//! actually manages the daemon; the dispatcher only ever sees `Result`s.
//! `LocalController` is the concrete implementation: it supervises the
//! endpoint through its pidfile. `start` forks and detaches, `stop` delivers
//! SIGTERM and waits for exit, `status` probes pid liveness.
//!
//! Failures carry their cause (`AlreadyRunning`, `NotRunning`, timeouts)
//! instead of collapsing to a bare boolean; the dispatcher maps them all to
//! exit code 1 but prints the reason.

use std::thread;
use std::time::{Duration, Instant};

use fork::{fork, Fork};
use sysinfo::{Pid, ProcessesToUpdate, Signal, System};
use thiserror::Error;

use crate::config::error::ConfigError;
use crate::config::loader::SettingsLoader;
use crate::config::paths::Paths;
use crate::daemon::pidfile::{self, PidfileError};
use crate::daemon::{self, EndpointError, LogTarget};

/// Interval between liveness probes while waiting for a start or stop.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Outcome of a status probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// A recorded endpoint pid maps to a running process.
    Alive,
    /// No pidfile, or the recorded pid is stale.
    Dead,
}

/// Everything a start operation needs, gathered by the dispatcher.
#[derive(Debug, Clone)]
pub struct StartRequest {
    /// TCP port the endpoint should serve on.
    pub port: u16,
    /// Resolved configuration locations.
    pub paths: Paths,
    /// Wallet password inherited from the environment, passed through
    /// opaquely. `restart` deliberately starts without one.
    pub password: Option<String>,
    /// Run the endpoint in-process instead of forking a background child.
    pub foreground: bool,
}

/// Errors from lifecycle operations.
#[derive(Error, Debug)]
pub enum ControlError {
    /// A live endpoint is already recorded for this config directory.
    #[error("endpoint already running (pid {0})")]
    AlreadyRunning(u32),

    /// No live endpoint is recorded for this config directory.
    #[error("endpoint is not running")]
    NotRunning,

    /// The forked endpoint never produced a live pidfile.
    #[error("endpoint did not come up within {}", humantime::format_duration(*.0))]
    StartTimeout(Duration),

    /// The endpoint ignored SIGTERM past the configured deadline.
    #[error("endpoint (pid {pid}) did not exit within {}", humantime::format_duration(*.timeout))]
    StopTimeout {
        /// Pid that was signalled.
        pid: u32,
        /// Deadline that elapsed.
        timeout: Duration,
    },

    /// SIGTERM could not be delivered.
    #[error("could not deliver SIGTERM to endpoint (pid {0})")]
    Signal(u32),

    /// fork(2) failed.
    #[error("fork failed")]
    Fork(#[source] std::io::Error),

    /// A timeout string in the config file is not a valid duration.
    #[error("invalid duration for {field}: {value:?}")]
    BadDuration {
        /// Config field name, e.g. `control.start_timeout`.
        field: &'static str,
        /// Offending value.
        value: String,
        /// Parse failure detail.
        #[source]
        source: humantime::DurationError,
    },

    /// Pidfile I/O failure.
    #[error(transparent)]
    Pidfile(#[from] PidfileError),

    /// Configuration file failure.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Foreground endpoint failure.
    #[error(transparent)]
    Endpoint(#[from] EndpointError),
}

/// Lifecycle operations the dispatcher invokes.
///
/// Implemented by `LocalController` for real supervision and by scripted
/// mocks in dispatcher tests.
pub trait Controller {
    /// Start the endpoint, in the background unless `request.foreground`.
    fn start(&self, request: StartRequest) -> Result<(), ControlError>;

    /// Stop the endpoint recorded under `paths`.
    fn stop(&self, paths: &Paths) -> Result<(), ControlError>;

    /// Probe whether an endpoint is running under `paths`.
    fn status(&self, paths: &Paths) -> Result<Liveness, ControlError>;
}

/// Pidfile-based supervision of an endpoint on the local machine.
pub struct LocalController;

impl LocalController {
    fn parse_timeout(field: &'static str, value: &str) -> Result<Duration, ControlError> {
        humantime::parse_duration(value).map_err(|source| ControlError::BadDuration {
            field,
            value: value.to_string(),
            source,
        })
    }

    /// Poll until the pidfile names a live process, or the deadline passes.
    fn wait_for_live_pidfile(paths: &Paths, timeout: Duration) -> Result<(), ControlError> {
        let deadline = Instant::now() + timeout;
        loop {
            if pidfile::live_pid(paths)?.is_some() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(ControlError::StartTimeout(timeout));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Deliver SIGTERM to `pid`. A process that exited between the liveness
    /// probe and the signal counts as stopped.
    fn terminate(pid: u32) -> Result<(), ControlError> {
        let sys_pid = Pid::from_u32(pid);
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::Some(&[sys_pid]), true);
        let Some(proc_info) = sys.process(sys_pid) else {
            return Ok(());
        };
        let delivered = proc_info
            .kill_with(Signal::Term)
            .unwrap_or_else(|| proc_info.kill());
        if delivered {
            Ok(())
        } else {
            Err(ControlError::Signal(pid))
        }
    }
}

impl Controller for LocalController {
    fn start(&self, request: StartRequest) -> Result<(), ControlError> {
        let settings = SettingsLoader::load_or_default(&request.paths)?;

        if let Some(pid) = pidfile::live_pid(&request.paths)? {
            return Err(ControlError::AlreadyRunning(pid));
        }
        // Anything left in the pidfile at this point is stale.
        pidfile::remove(&request.paths)?;

        if request.foreground {
            daemon::run_endpoint(
                request.port,
                &request.paths,
                request.password.as_deref(),
                &settings,
                &LogTarget::Stderr,
            )?;
            return Ok(());
        }

        let timeout =
            Self::parse_timeout("control.start_timeout", &settings.control.start_timeout)?;

        // CRITICAL: fork before any Tokio runtime exists in this process.
        match fork() {
            Ok(Fork::Parent(_child)) => Self::wait_for_live_pidfile(&request.paths, timeout),
            Ok(Fork::Child) => {
                // New session, stdio to /dev/null, then the endpoint loop.
                // Nothing here may touch the inherited stdout/stderr.
                let _ = fork::setsid();
                let ok = daemon::detach_stdio().is_ok()
                    && daemon::run_endpoint(
                        request.port,
                        &request.paths,
                        request.password.as_deref(),
                        &settings,
                        &LogTarget::File(daemon::log_path(&request.paths)),
                    )
                    .is_ok();
                std::process::exit(if ok { 0 } else { 1 });
            }
            Err(err) => Err(ControlError::Fork(err)),
        }
    }

    fn stop(&self, paths: &Paths) -> Result<(), ControlError> {
        let settings = SettingsLoader::load_or_default(paths)?;
        let timeout = Self::parse_timeout("control.stop_timeout", &settings.control.stop_timeout)?;

        let pid = pidfile::live_pid(paths)?.ok_or(ControlError::NotRunning)?;
        Self::terminate(pid)?;

        let deadline = Instant::now() + timeout;
        while pidfile::process_alive(pid) {
            if Instant::now() >= deadline {
                return Err(ControlError::StopTimeout { pid, timeout });
            }
            thread::sleep(POLL_INTERVAL);
        }

        // The endpoint removes its own pidfile on clean shutdown; clear any
        // leftover from a less graceful exit.
        pidfile::remove(paths)?;
        Ok(())
    }

    fn status(&self, paths: &Paths) -> Result<Liveness, ControlError> {
        // An unreadable pidfile carries no claim of a live endpoint, so any
        // failure to confirm liveness reads as Dead.
        let alive = matches!(pidfile::live_pid(paths), Ok(Some(_)));
        Ok(if alive { Liveness::Alive } else { Liveness::Dead })
    }
}
