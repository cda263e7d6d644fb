//! Engine Configuration (plbridge.toml)
//!
//! Handles the engine-level configuration: which runtime library to load,
//! extra bootstrap arguments, verbosity, and additional marshalling tables.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Engine configuration from plbridge.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Engine bootstrap settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine: Option<EngineSection>,

    /// Ordered platform → library file table (default entry first)
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub library_table: Vec<LibraryEntry>,

    /// Extra type names, each aliasing an already known type name
    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub types: BTreeMap<String, String>,

    /// Extra symbol prototypes (`symbol = "arg,arg->ret"`)
    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub prototypes: BTreeMap<String, String>,
}

/// `[engine]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct EngineSection {
    /// Explicit library path; bypasses the platform table
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library: Option<PathBuf>,

    /// Extra arguments appended after `-q` in the bootstrap vector
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// Warn about calls made without a prototype
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verbose: Option<bool>,

    /// Directories searched before the system loader
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub search_paths: Vec<PathBuf>,
}

/// One `(platform, file)` row of the library table.
///
/// An empty `platform` is the wildcard default and must come first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LibraryEntry {
    #[serde(default)]
    pub platform: String,
    pub file: String,
}

impl LibraryEntry {
    pub fn new(platform: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            file: file.into(),
        }
    }

    /// Built-in table used when the configuration does not provide one
    pub fn default_table() -> Vec<LibraryEntry> {
        vec![
            LibraryEntry::new("", "libswipl.so"),
            LibraryEntry::new("WIN", "libswipl.dll"),
            LibraryEntry::new("MACOS", "libswipl.dylib"),
            LibraryEntry::new("FREEBSD", "libswipl.so"),
            LibraryEntry::new("LINUX", "libswipl.so"),
        ]
    }

    /// Whether this row is the wildcard default
    pub fn is_default(&self) -> bool {
        self.platform.is_empty()
    }
}

impl EngineConfig {
    /// Load engine configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the engine configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(first) = self.library_table.first() {
            if !first.is_default() {
                return Err(ConfigError::ValidationError(format!(
                    "library_table must start with the default entry (empty platform), found '{}'",
                    first.platform
                )));
            }
        }

        for (index, entry) in self.library_table.iter().enumerate() {
            if index > 0 && entry.is_default() {
                return Err(ConfigError::ValidationError(format!(
                    "library_table entry {} has an empty platform; only the first entry may",
                    index
                )));
            }
            if entry.file.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: format!("library_table[{}].file", index),
                    reason: "file name cannot be empty".to_string(),
                });
            }
        }

        if let Some(engine) = &self.engine {
            if let Some(library) = &engine.library {
                if library.as_os_str().is_empty() {
                    return Err(ConfigError::InvalidValue {
                        field: "engine.library".to_string(),
                        reason: "library path cannot be empty".to_string(),
                    });
                }
            }
        }

        for (name, target) in &self.types {
            if target.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: format!("types.{}", name),
                    reason: "alias target cannot be empty".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Effective library table (configured, or the built-in one)
    pub fn library_table(&self) -> Vec<LibraryEntry> {
        if self.library_table.is_empty() {
            LibraryEntry::default_table()
        } else {
            self.library_table.clone()
        }
    }

    /// Explicit library override, if any
    pub fn library(&self) -> Option<&Path> {
        self.engine.as_ref().and_then(|e| e.library.as_deref())
    }

    /// Extra bootstrap arguments
    pub fn args(&self) -> &[String] {
        self.engine.as_ref().map(|e| e.args.as_slice()).unwrap_or(&[])
    }

    /// Verbose mode (default: off)
    pub fn verbose(&self) -> bool {
        self.engine.as_ref().and_then(|e| e.verbose).unwrap_or(false)
    }

    /// Extra library search paths
    pub fn search_paths(&self) -> &[PathBuf] {
        self.engine
            .as_ref()
            .map(|e| e.search_paths.as_slice())
            .unwrap_or(&[])
    }

    /// Mutable access to the `[engine]` section, creating it if missing
    pub fn engine_mut(&mut self) -> &mut EngineSection {
        self.engine.get_or_insert_with(EngineSection::default)
    }
}
