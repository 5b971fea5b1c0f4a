/// Configuration error types.
pub mod error;

/// Configuration file loader.
pub mod loader;

/// Platform-aware path resolution utilities.
pub mod paths;

/// TOML configuration schema types.
pub mod schema;

pub use error::ConfigError;
pub use loader::SettingsLoader;
pub use paths::Paths;
pub use schema::Settings;
