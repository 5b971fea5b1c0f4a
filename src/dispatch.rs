//! Command dispatcher: the CLI contract of apid.
//!
//! Parses `COMMAND PORT [CONFIG_DIR]`, resolves configuration paths, and
//! invokes one lifecycle operation (two for `restart`) on a [`Controller`],
//! mapping the result to a process exit code. One invocation, one dispatch,
//! one exit. No retries live at this layer.
//!
//! All diagnostics, usage text, and the `status` verdict words go to stderr;
//! stdout stays clean for scripting.

use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use crate::config::paths::Paths;
use crate::control::{ControlError, Controller, Liveness, StartRequest};

/// Environment variable holding an optional wallet password, forwarded
/// verbatim to the start operation and never parsed or logged.
pub const WALLET_PASSWORD_ENV: &str = "BLOCKSTACK_CLIENT_WALLET_PASSWORD";

/// Usage text printed on argument errors.
pub const USAGE: &str = "\
Usage: apid COMMAND PORT [CONFIG_DIR]

Commands:
  start             start the endpoint daemon in the background
  start-foreground  start the endpoint daemon and block in the foreground
  status            report Alive or Dead for the recorded endpoint
  stop              stop the endpoint daemon
  restart           stop the endpoint daemon, then start it again";

/// Exit code for success.
const EXIT_OK: u8 = 0;
/// Exit code for operation failure, invalid arguments, unknown command.
const EXIT_FAIL: u8 = 1;

/// The five lifecycle commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleCommand {
    /// Start the endpoint in the background.
    Start,
    /// Start the endpoint in the foreground (blocking).
    StartForeground,
    /// Probe endpoint liveness.
    Status,
    /// Stop the endpoint.
    Stop,
    /// Stop, then start again in the background.
    Restart,
}

impl FromStr for LifecycleCommand {
    type Err = UsageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(Self::Start),
            "start-foreground" => Ok(Self::StartForeground),
            "status" => Ok(Self::Status),
            "stop" => Ok(Self::Stop),
            "restart" => Ok(Self::Restart),
            other => Err(UsageError::UnknownCommand(other.to_string())),
        }
    }
}

impl std::fmt::Display for LifecycleCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Start => "start",
            Self::StartForeground => "start-foreground",
            Self::Status => "status",
            Self::Stop => "stop",
            Self::Restart => "restart",
        };
        write!(f, "{}", s)
    }
}

/// Argument errors: the command token or port did not parse.
#[derive(Error, Debug)]
pub enum UsageError {
    /// The first argument is not a lifecycle command.
    #[error("unrecognized command: {0:?}")]
    UnknownCommand(String),

    /// The second argument is not a valid port number.
    #[error("invalid port {value:?}: {source}")]
    InvalidPort {
        /// Offending argument value.
        value: String,
        /// Parse failure detail.
        #[source]
        source: std::num::ParseIntError,
    },
}

/// One parsed CLI invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Which lifecycle operation to run.
    pub command: LifecycleCommand,
    /// Port forwarded to the start operation.
    pub port: u16,
    /// Optional config directory override.
    pub config_dir: Option<PathBuf>,
}

impl Invocation {
    /// Validates the raw positional arguments.
    pub fn parse(
        command: &str,
        port: &str,
        config_dir: Option<PathBuf>,
    ) -> Result<Self, UsageError> {
        let command = command.parse::<LifecycleCommand>()?;
        let port = port.parse::<u16>().map_err(|source| UsageError::InvalidPort {
            value: port.to_string(),
            source,
        })?;
        Ok(Self {
            command,
            port,
            config_dir,
        })
    }
}

/// Dispatch one invocation and return the process exit code.
///
/// `password` is the value of [`WALLET_PASSWORD_ENV`], if set. It is only
/// forwarded by `start` and `start-foreground`; `restart` starts without one.
pub fn run<C: Controller>(
    invocation: &Invocation,
    controller: &C,
    password: Option<String>,
) -> u8 {
    let paths = Paths::resolve(invocation.config_dir.as_deref());

    match invocation.command {
        LifecycleCommand::Start => exit_from(controller.start(StartRequest {
            port: invocation.port,
            paths,
            password,
            foreground: false,
        })),
        LifecycleCommand::StartForeground => exit_from(controller.start(StartRequest {
            port: invocation.port,
            paths,
            password,
            foreground: true,
        })),
        LifecycleCommand::Status => match controller.status(&paths) {
            Ok(Liveness::Alive) => {
                eprintln!("Alive");
                EXIT_OK
            }
            Ok(Liveness::Dead) => {
                eprintln!("Dead");
                EXIT_FAIL
            }
            Err(e) => {
                report(&e);
                EXIT_FAIL
            }
        },
        LifecycleCommand::Stop => exit_from(controller.stop(&paths)),
        LifecycleCommand::Restart => {
            if let Err(e) = controller.stop(&paths) {
                // A failed stop aborts the restart; start is never attempted.
                report(&e);
                return EXIT_FAIL;
            }
            exit_from(controller.start(StartRequest {
                port: invocation.port,
                paths,
                password: None,
                foreground: false,
            }))
        }
    }
}

fn exit_from(result: Result<(), ControlError>) -> u8 {
    match result {
        Ok(()) => EXIT_OK,
        Err(e) => {
            report(&e);
            EXIT_FAIL
        }
    }
}

fn report(error: &ControlError) {
    eprintln!("apid: {error}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::path::Path;
    use std::time::Duration;

    /// Record of one controller call, captured by the scripted mock.
    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Start {
            port: u16,
            config_dir: PathBuf,
            password: Option<String>,
            foreground: bool,
        },
        Stop,
        Status,
    }

    /// Scripted controller: fixed outcomes, records every call.
    struct ScriptedController {
        fail_start: bool,
        fail_stop: bool,
        liveness: Liveness,
        calls: RefCell<Vec<Call>>,
    }

    impl ScriptedController {
        fn new() -> Self {
            Self {
                fail_start: false,
                fail_stop: false,
                liveness: Liveness::Dead,
                calls: RefCell::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.borrow().clone()
        }
    }

    impl Controller for ScriptedController {
        fn start(&self, request: StartRequest) -> Result<(), ControlError> {
            self.calls.borrow_mut().push(Call::Start {
                port: request.port,
                config_dir: request.paths.config_dir.clone(),
                password: request.password.clone(),
                foreground: request.foreground,
            });
            if self.fail_start {
                Err(ControlError::StartTimeout(Duration::from_secs(3)))
            } else {
                Ok(())
            }
        }

        fn stop(&self, _paths: &Paths) -> Result<(), ControlError> {
            self.calls.borrow_mut().push(Call::Stop);
            if self.fail_stop {
                Err(ControlError::NotRunning)
            } else {
                Ok(())
            }
        }

        fn status(&self, _paths: &Paths) -> Result<Liveness, ControlError> {
            self.calls.borrow_mut().push(Call::Status);
            Ok(self.liveness)
        }
    }

    fn invocation(command: LifecycleCommand) -> Invocation {
        Invocation {
            command,
            port: 16268,
            config_dir: Some(PathBuf::from("/tmp/cfg")),
        }
    }

    // -------------------------------------------------------------------
    // Invocation parsing
    // -------------------------------------------------------------------

    #[test]
    fn parse_accepts_all_five_commands() {
        for (token, expected) in [
            ("start", LifecycleCommand::Start),
            ("start-foreground", LifecycleCommand::StartForeground),
            ("status", LifecycleCommand::Status),
            ("stop", LifecycleCommand::Stop),
            ("restart", LifecycleCommand::Restart),
        ] {
            let inv = Invocation::parse(token, "16268", None).expect("valid invocation");
            assert_eq!(inv.command, expected);
            assert_eq!(inv.port, 16268);
        }
    }

    #[test]
    fn parse_rejects_unknown_command() {
        let err = Invocation::parse("frobnicate", "16268", None).expect_err("unknown command");
        assert!(matches!(err, UsageError::UnknownCommand(ref c) if c == "frobnicate"));
    }

    #[test]
    fn parse_rejects_non_integer_port() {
        let err = Invocation::parse("start", "http", None).expect_err("bad port");
        match err {
            UsageError::InvalidPort { value, .. } => assert_eq!(value, "http"),
            other => panic!("expected InvalidPort, got {other:?}"),
        }
    }

    #[test]
    fn parse_rejects_out_of_range_port() {
        assert!(Invocation::parse("start", "65536", None).is_err());
        assert!(Invocation::parse("start", "-1", None).is_err());
    }

    #[test]
    fn command_display_round_trips() {
        for token in ["start", "start-foreground", "status", "stop", "restart"] {
            let cmd = token.parse::<LifecycleCommand>().expect("valid command");
            assert_eq!(cmd.to_string(), token);
        }
    }

    // -------------------------------------------------------------------
    // Dispatch table
    // -------------------------------------------------------------------

    #[test]
    fn start_success_exits_zero_with_password_and_background() {
        let controller = ScriptedController::new();
        let code = run(
            &invocation(LifecycleCommand::Start),
            &controller,
            Some("hunter2".to_string()),
        );
        assert_eq!(code, 0);
        assert_eq!(
            controller.calls(),
            vec![Call::Start {
                port: 16268,
                config_dir: PathBuf::from("/tmp/cfg"),
                password: Some("hunter2".to_string()),
                foreground: false,
            }]
        );
    }

    #[test]
    fn start_without_env_password_forwards_none() {
        let controller = ScriptedController::new();
        let code = run(&invocation(LifecycleCommand::Start), &controller, None);
        assert_eq!(code, 0);
        assert!(matches!(
            controller.calls()[0],
            Call::Start { password: None, foreground: false, .. }
        ));
    }

    #[test]
    fn start_failure_exits_one() {
        let mut controller = ScriptedController::new();
        controller.fail_start = true;
        let code = run(&invocation(LifecycleCommand::Start), &controller, None);
        assert_eq!(code, 1);
    }

    #[test]
    fn start_foreground_requests_blocking_mode() {
        let controller = ScriptedController::new();
        let code = run(
            &invocation(LifecycleCommand::StartForeground),
            &controller,
            Some("hunter2".to_string()),
        );
        assert_eq!(code, 0);
        assert!(matches!(
            controller.calls()[0],
            Call::Start { foreground: true, password: Some(_), .. }
        ));
    }

    #[test]
    fn status_alive_exits_zero() {
        let mut controller = ScriptedController::new();
        controller.liveness = Liveness::Alive;
        let code = run(&invocation(LifecycleCommand::Status), &controller, None);
        assert_eq!(code, 0);
        assert_eq!(controller.calls(), vec![Call::Status]);
    }

    #[test]
    fn status_dead_exits_one() {
        let controller = ScriptedController::new();
        let code = run(&invocation(LifecycleCommand::Status), &controller, None);
        assert_eq!(code, 1);
    }

    #[test]
    fn stop_maps_result_to_exit_code() {
        let controller = ScriptedController::new();
        assert_eq!(run(&invocation(LifecycleCommand::Stop), &controller, None), 0);

        let mut failing = ScriptedController::new();
        failing.fail_stop = true;
        assert_eq!(run(&invocation(LifecycleCommand::Stop), &failing, None), 1);
    }

    #[test]
    fn restart_aborts_when_stop_fails() {
        let mut controller = ScriptedController::new();
        controller.fail_stop = true;
        let code = run(
            &invocation(LifecycleCommand::Restart),
            &controller,
            Some("hunter2".to_string()),
        );
        assert_eq!(code, 1);
        assert_eq!(
            controller.calls(),
            vec![Call::Stop],
            "start must never run after a failed stop"
        );
    }

    #[test]
    fn restart_runs_stop_then_start_without_password() {
        let controller = ScriptedController::new();
        let code = run(
            &invocation(LifecycleCommand::Restart),
            &controller,
            Some("hunter2".to_string()),
        );
        assert_eq!(code, 0);
        assert_eq!(
            controller.calls(),
            vec![
                Call::Stop,
                Call::Start {
                    port: 16268,
                    config_dir: PathBuf::from("/tmp/cfg"),
                    password: None,
                    foreground: false,
                }
            ]
        );
    }

    #[test]
    fn restart_propagates_start_failure() {
        let mut controller = ScriptedController::new();
        controller.fail_start = true;
        let code = run(&invocation(LifecycleCommand::Restart), &controller, None);
        assert_eq!(code, 1);
        assert_eq!(controller.calls().len(), 2, "stop then start");
    }

    #[test]
    fn config_dir_override_reaches_the_controller() {
        let controller = ScriptedController::new();
        let inv = Invocation {
            command: LifecycleCommand::Start,
            port: 16268,
            config_dir: Some(PathBuf::from("/tmp/other")),
        };
        run(&inv, &controller, None);
        assert!(matches!(
            &controller.calls()[0],
            Call::Start { config_dir, .. } if config_dir == Path::new("/tmp/other")
        ));
    }
}
