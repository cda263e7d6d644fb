//! plbridge Configuration System
//!
//! Provides configuration for the plbridge engine:
//! - Engine configuration (plbridge.toml)
//! - Platform → library table
//! - Extra type aliases and symbol prototypes
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded and merged in the following order (later overrides earlier):
//! 1. Built-in defaults
//! 2. Engine config (./plbridge.toml, searched upwards)
//! 3. Environment variables (PLBRIDGE_*)
//!
//! # Example
//!
//! ```no_run
//! use plbridge_config::ConfigLoader;
//! use std::path::Path;
//!
//! let loader = ConfigLoader::new();
//! let config = loader.load_from_directory(Path::new(".")).unwrap();
//! println!("verbose: {}", config.verbose());
//! ```

pub mod engine;
pub mod loader;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

// Re-export main types
pub use engine::{EngineConfig, EngineSection, LibraryEntry};
pub use loader::{Config, ConfigLoader, CONFIG_FILE_NAME};
