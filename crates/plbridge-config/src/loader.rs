//! Configuration Loader
//!
//! Handles loading configuration and applying environment overrides.

use crate::engine::EngineConfig;
use crate::ConfigResult;
use std::env;
use std::path::{Path, PathBuf};

/// Name of the configuration file searched for by [`ConfigLoader`]
pub const CONFIG_FILE_NAME: &str = "plbridge.toml";

/// Configuration loader
///
/// Loads configuration and merges it with proper precedence:
/// 1. Built-in defaults - lowest priority
/// 2. plbridge.toml - overrides defaults
/// 3. Environment variables (PLBRIDGE_*) - overrides the file
pub struct ConfigLoader {
    file_name: String,
}

/// Merged configuration result
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Engine configuration
    pub engine: EngineConfig,

    /// Directory holding the configuration file, if one was found
    pub config_root: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            file_name: CONFIG_FILE_NAME.to_string(),
        }
    }

    /// Use a different file name than `plbridge.toml`
    pub fn with_file_name(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find the configuration file. Falls back
    /// to defaults when none exists.
    pub fn load_from_directory(&self, start_dir: &Path) -> ConfigResult<Config> {
        let (config_root, engine) = self.find_config(start_dir)?;
        let engine = self.apply_env_overrides(engine)?;

        Ok(Config {
            engine,
            config_root,
        })
    }

    /// Load configuration from a specific file
    pub fn load_from_file(&self, config_path: &Path) -> ConfigResult<Config> {
        let engine = EngineConfig::load_from_file(config_path)?;
        let engine = self.apply_env_overrides(engine)?;

        Ok(Config {
            engine,
            config_root: config_path.parent().map(|p| p.to_path_buf()),
        })
    }

    /// Find the configuration file by walking up the directory tree
    fn find_config(&self, start_dir: &Path) -> ConfigResult<(Option<PathBuf>, EngineConfig)> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(&self.file_name);

            if config_path.exists() {
                let config = EngineConfig::load_from_file(&config_path)?;
                return Ok((Some(current), config));
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return Ok((None, EngineConfig::default())),
            }
        }
    }

    /// Apply environment variable overrides
    ///
    /// - `PLBRIDGE_LIBRARY`: explicit library path
    /// - `PLBRIDGE_VERBOSE`: `true`, `1` or `yes` enables verbose mode
    /// - `PLBRIDGE_ARGS`: whitespace separated bootstrap arguments
    fn apply_env_overrides(&self, mut config: EngineConfig) -> ConfigResult<EngineConfig> {
        if let Ok(library) = env::var("PLBRIDGE_LIBRARY") {
            if !library.is_empty() {
                config.engine_mut().library = Some(PathBuf::from(library));
            }
        }

        if let Ok(verbose) = env::var("PLBRIDGE_VERBOSE") {
            let verbose = matches!(verbose.to_lowercase().as_str(), "true" | "1" | "yes");
            config.engine_mut().verbose = Some(verbose);
        }

        if let Ok(args) = env::var("PLBRIDGE_ARGS") {
            config.engine_mut().args = args.split_whitespace().map(str::to_string).collect();
        }

        config.validate()?;
        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Wrap an engine configuration that did not come from a file
    pub fn from_engine(engine: EngineConfig) -> Self {
        Self {
            engine,
            config_root: None,
        }
    }

    /// Whether a configuration file was found
    pub fn is_file_backed(&self) -> bool {
        self.config_root.is_some()
    }

    /// Directory holding the configuration file
    pub fn config_root(&self) -> Option<&Path> {
        self.config_root.as_deref()
    }

    pub fn verbose(&self) -> bool {
        self.engine.verbose()
    }
}
