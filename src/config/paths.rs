//! Platform-aware configuration path resolution for apid.
//!
//! On **Linux**, follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/apid` or `~/.config/apid`
//!
//! On **macOS**, uses Apple conventions with XDG env var overrides:
//! - Config: `$XDG_CONFIG_HOME/apid` or `~/Library/Application Support/apid`
//!
//! The CLI accepts an explicit config directory override; in that case the
//! config file path is recomputed as the override directory joined with the
//! base filename of the default config path.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "apid";

/// Base filename of the configuration file, used both for the default path
/// and when recomputing the path under an override directory.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Returns the default configuration directory for apid.
///
/// Resolution order:
/// 1. `$XDG_CONFIG_HOME/apid` (if env var set, any platform)
/// 2. Platform default:
///    - Linux: `~/.config/apid`
///    - macOS: `~/Library/Application Support/apid`
pub fn default_config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join(APP_NAME);
    }
    platform_config_dir().join(APP_NAME)
}

/// Platform-native config base directory (without XDG override).
fn platform_config_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        // ~/Library/Application Support
        dirs::config_dir().expect("could not determine config directory")
    }
    #[cfg(not(target_os = "macos"))]
    {
        // ~/.config (XDG default on Linux)
        dirs::home_dir()
            .expect("could not determine home directory")
            .join(".config")
    }
}

/// Returns the default path to the configuration file.
///
/// Resolves to `default_config_dir()/config.toml`.
pub fn default_config_path() -> PathBuf {
    default_config_dir().join(CONFIG_FILE_NAME)
}

/// Resolved configuration locations for one invocation.
///
/// Built once at dispatch time and passed explicitly to the controller and
/// the endpoint process; nothing in the crate reads these from globals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    /// Directory holding the config file, pidfile, and endpoint log.
    pub config_dir: PathBuf,
    /// Path to the configuration file itself.
    pub config_path: PathBuf,
}

impl Paths {
    /// Resolves paths from an optional config directory override.
    ///
    /// With an override, the config file path becomes the override directory
    /// joined with the base filename of the default config path. Without one,
    /// both fall back to the platform defaults.
    pub fn resolve(override_dir: Option<&Path>) -> Self {
        match override_dir {
            Some(dir) => {
                let file_name = default_config_path()
                    .file_name()
                    .map(OsString::from)
                    .unwrap_or_else(|| OsString::from(CONFIG_FILE_NAME));
                Self {
                    config_dir: dir.to_path_buf(),
                    config_path: dir.join(file_name),
                }
            }
            None => Self {
                config_dir: default_config_dir(),
                config_path: default_config_path(),
            },
        }
    }
}

/// Creates a directory and all parent directories, the leaf with mode 0700.
///
/// Equivalent to `mkdir -p` with restricted permissions. A directory that
/// already exists keeps whatever permissions its owner gave it; only a leaf
/// this call creates gets the restricted mode.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if path.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o700))?;
    }
    Ok(())
}
