//! apid: lifecycle controller for a local background API endpoint daemon.
//!
//! One binary, two roles. Invoked as a CLI it parses
//! `COMMAND PORT [CONFIG_DIR]` and dispatches one lifecycle operation
//! (`start`, `start-foreground`, `status`, `stop`, `restart`) against the
//! endpoint recorded in the config directory, mapping the outcome to exit
//! code 0 or 1. A background `start` forks, and the detached child becomes
//! the endpoint process itself: pidfile, logging, and a signal-driven
//! shutdown loop.
//!
//! # Platform Support
//!
//! This crate currently supports **Unix-like systems only** (Linux, macOS).
//!
//! Unix-specific features used:
//! - `fork()`/`setsid()` for background endpoint creation
//! - Unix signal handling (SIGTERM, SIGINT)

/// Configuration: path resolution, TOML schema, loader, errors.
pub mod config;

/// Lifecycle control: the `Controller` seam and the pidfile-based
/// local implementation.
pub mod control;

/// The endpoint process shell: pidfile, logging, shutdown loop.
pub mod daemon;

/// Command dispatcher implementing the CLI contract.
pub mod dispatch;

pub use config::{ConfigError, Paths, Settings, SettingsLoader};
pub use control::{ControlError, Controller, Liveness, LocalController, StartRequest};
pub use dispatch::{Invocation, LifecycleCommand, UsageError, USAGE, WALLET_PASSWORD_ENV};
