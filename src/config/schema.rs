//! TOML configuration schema for the apid controller and endpoint.
//!
//! All structs derive `Deserialize` and `Serialize` with sensible defaults via
//! `#[serde(default)]`, so a missing file or a partial file both work.
//!
//! Duration fields use human-readable strings (e.g. `"3s"`, `"500ms"`) parsed
//! by the `humantime` crate at the call site.

use serde::{Deserialize, Serialize};

/// Root configuration encompassing all sections.
///
/// Corresponds to the full TOML file structure:
/// ```toml
/// [control]
/// start_timeout = "3s"
/// stop_timeout = "5s"
///
/// [endpoint]
/// log = "info"
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Lifecycle control timeouts.
    pub control: ControlSettings,
    /// Endpoint process settings.
    pub endpoint: EndpointSettings,
}

/// Timeouts applied by the local controller when supervising the endpoint.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ControlSettings {
    /// How long `start` waits for the forked endpoint to come up before
    /// reporting failure. Human-readable duration string.
    pub start_timeout: String,
    /// How long `stop` waits for the endpoint to exit after SIGTERM before
    /// reporting failure. Human-readable duration string.
    pub stop_timeout: String,
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            start_timeout: "3s".to_string(),
            stop_timeout: "5s".to_string(),
        }
    }
}

/// Settings consumed by the endpoint process itself.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct EndpointSettings {
    /// Default tracing filter directive for the endpoint log.
    /// Overridden at runtime by the `APID_LOG` environment variable.
    pub log: String,
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            log: "info".to_string(),
        }
    }
}
