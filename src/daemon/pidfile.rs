//! Pidfile management for the endpoint process.
//!
//! The endpoint records its pid in `CONFIG_DIR/apid.pid`. The controller uses
//! that record for liveness checks and SIGTERM delivery. A pidfile whose pid
//! no longer maps to a running process is stale and treated as "not running";
//! unparseable content is treated the same way rather than as an error.
//!
//! PID reuse is not detected: a recycled pid would read as alive.

use std::fs;
use std::path::PathBuf;

use sysinfo::{Pid, ProcessStatus, ProcessesToUpdate, System};
use thiserror::Error;
use tracing::debug;

use crate::config::paths::{ensure_dir, Paths};

/// Filename of the pidfile inside the config directory.
pub const PIDFILE_NAME: &str = "apid.pid";

/// Errors raised by pidfile operations.
#[derive(Error, Debug)]
pub enum PidfileError {
    /// Failed to read the pidfile.
    #[error("failed to read pidfile: {path}")]
    Read {
        /// Pidfile path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to create or write the pidfile.
    #[error("failed to write pidfile: {path}")]
    Write {
        /// Pidfile path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to remove the pidfile.
    #[error("failed to remove pidfile: {path}")]
    Remove {
        /// Pidfile path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Returns the pidfile path for the given configuration locations.
pub fn pidfile_path(paths: &Paths) -> PathBuf {
    paths.config_dir.join(PIDFILE_NAME)
}

/// Writes `pid` to the pidfile, creating the config directory if needed.
pub fn write(paths: &Paths, pid: u32) -> Result<(), PidfileError> {
    let path = pidfile_path(paths);
    ensure_dir(&paths.config_dir).map_err(|e| PidfileError::Write {
        path: path.clone(),
        source: e,
    })?;
    fs::write(&path, format!("{pid}\n")).map_err(|e| PidfileError::Write { path, source: e })
}

/// Reads the recorded pid, if any.
///
/// A missing pidfile yields `None`. Unparseable content also yields `None`:
/// a corrupt pidfile carries no usable claim about a running endpoint.
pub fn read(paths: &Paths) -> Result<Option<u32>, PidfileError> {
    let path = pidfile_path(paths);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(PidfileError::Read { path, source: e }),
    };
    match content.trim().parse::<u32>() {
        Ok(pid) => Ok(Some(pid)),
        Err(_) => {
            debug!(path = %path.display(), "pidfile content is not a pid, treating as stale");
            Ok(None)
        }
    }
}

/// Removes the pidfile. A pidfile that is already gone is not an error.
pub fn remove(paths: &Paths) -> Result<(), PidfileError> {
    let path = pidfile_path(paths);
    match fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(PidfileError::Remove { path, source: e }),
    }
}

/// Returns `true` if `pid` maps to a live (non-zombie) process.
pub fn process_alive(pid: u32) -> bool {
    let pid = Pid::from_u32(pid);
    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    sys.process(pid)
        .map(|proc_info| proc_info.status() != ProcessStatus::Zombie)
        .unwrap_or(false)
}

/// Reads the recorded pid and confirms the process is alive.
///
/// Returns `None` for a missing, corrupt, or stale pidfile.
pub fn live_pid(paths: &Paths) -> Result<Option<u32>, PidfileError> {
    match read(paths)? {
        Some(pid) if process_alive(pid) => Ok(Some(pid)),
        Some(pid) => {
            debug!(pid, "pidfile references a dead process, treating as stale");
            Ok(None)
        }
        None => Ok(None),
    }
}

/// RAII guard that records the current process in the pidfile and removes
/// it on drop, so a clean endpoint shutdown never leaves a stale record.
pub struct PidfileGuard {
    paths: Paths,
}

impl PidfileGuard {
    /// Writes the current process id to the pidfile.
    pub fn acquire(paths: &Paths) -> Result<Self, PidfileError> {
        write(paths, std::process::id())?;
        Ok(Self {
            paths: paths.clone(),
        })
    }
}

impl Drop for PidfileGuard {
    fn drop(&mut self) {
        if let Err(e) = remove(&self.paths) {
            debug!(error = %e, "could not remove pidfile on shutdown");
        }
    }
}
