//! Configuration file loader with position-aware error reporting.
//!
//! Loads TOML settings from the resolved config path. When no file exists at
//! that path, returns `Settings::default()`; an absent config file is the
//! normal case for a freshly created config directory.

use std::fs;
use std::path::Path;

use crate::config::error::ConfigError;
use crate::config::paths::Paths;
use crate::config::schema::Settings;

/// Stateless configuration loader.
pub struct SettingsLoader;

impl SettingsLoader {
    /// Load settings from a specific path.
    ///
    /// Returns `ConfigError::NotFound` if the file does not exist, or
    /// `ConfigError::ReadError` for other I/O failures.
    pub fn load_from_path(path: &Path) -> Result<Settings, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                ConfigError::ReadError {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;
        Self::parse_toml(&content, path)
    }

    /// Load settings from the resolved config path, falling back to defaults
    /// when no file exists there.
    pub fn load_or_default(paths: &Paths) -> Result<Settings, ConfigError> {
        if paths.config_path.exists() {
            Self::load_from_path(&paths.config_path)
        } else {
            tracing::debug!("no config file at {:?}, using defaults", paths.config_path);
            Ok(Settings::default())
        }
    }

    /// Parse a TOML string into `Settings` with position-aware error reporting.
    fn parse_toml(content: &str, path: &Path) -> Result<Settings, ConfigError> {
        toml::from_str(content).map_err(|e| {
            let (line, column) = e
                .span()
                .map(|span| {
                    let line = content[..span.start].matches('\n').count() + 1;
                    let last_newline = content[..span.start]
                        .rfind('\n')
                        .map(|p| p + 1)
                        .unwrap_or(0);
                    let column = span.start - last_newline + 1;
                    (line, column)
                })
                .unwrap_or((0, 0));
            ConfigError::ParseError {
                path: path.to_path_buf(),
                line,
                column,
                message: e.message().to_string(),
            }
        })
    }
}
