//! Dynamic library loading and symbol sources
//!
//! Provides cross-platform dynamic library loading using `libloading`, plus the
//! [`SymbolSource`] seam the dispatcher resolves symbols through. A
//! [`SymbolTable`] serves symbols that are linked into the host process
//! (statically linked runtimes, Rust `extern "C"` functions).

use libloading::Library;
use std::collections::HashMap;
use std::ffi::c_void;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Library loading errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    /// Library file could not be located or opened
    #[error("Library '{library}' not found: {reason}")]
    LibraryNotFound { library: String, reason: String },
}

/// Anything foreign symbols can be resolved from
pub trait SymbolSource {
    /// Name used in diagnostics
    fn name(&self) -> &str;

    /// Address of `symbol`, or `None` if it is not exported
    fn lookup(&self, symbol: &str) -> Option<*const c_void>;
}

/// A shared library opened with `libloading`
///
/// # Safety
///
/// Loading a dynamic library runs its initialization code in this process.
/// The library stays loaded until this value drops.
pub struct NativeLibrary {
    path: PathBuf,
    name: String,
    library: Library,
}

impl NativeLibrary {
    /// Path the library was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SymbolSource for NativeLibrary {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookup(&self, symbol: &str) -> Option<*const c_void> {
        // the symbol's address is the value we want, not a function to call
        let sym = unsafe { self.library.get::<*mut c_void>(symbol.as_bytes()) }.ok()?;
        Some(*sym as *const c_void)
    }
}

impl std::fmt::Debug for NativeLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeLibrary")
            .field("path", &self.path)
            .finish()
    }
}

/// In-process symbol table
///
/// # Example
///
/// ```
/// # use plbridge_runtime::ffi::{SymbolSource, SymbolTable};
/// extern "C" fn answer() -> i32 {
///     42
/// }
///
/// let table = SymbolTable::new("host").with("answer", answer as *const ());
/// assert!(table.lookup("answer").is_some());
/// assert!(table.lookup("question").is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    name: String,
    symbols: HashMap<String, *const c_void>,
}

impl SymbolTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            symbols: HashMap::new(),
        }
    }

    /// Register a symbol address
    pub fn insert<T>(&mut self, symbol: impl Into<String>, address: *const T) {
        self.symbols.insert(symbol.into(), address as *const c_void);
    }

    /// Builder form of [`SymbolTable::insert`]
    pub fn with<T>(mut self, symbol: impl Into<String>, address: *const T) -> Self {
        self.insert(symbol, address);
        self
    }

    pub fn remove(&mut self, symbol: &str) {
        self.symbols.remove(symbol);
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl SymbolSource for SymbolTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookup(&self, symbol: &str) -> Option<*const c_void> {
        self.symbols.get(symbol).copied()
    }
}

/// Dynamic library loader with platform-specific path resolution
pub struct LibraryLoader {
    /// Library search paths, highest priority first
    search_paths: Vec<PathBuf>,
}

impl LibraryLoader {
    /// Create a new library loader with default search paths
    pub fn new() -> Self {
        Self {
            search_paths: Self::default_search_paths(),
        }
    }

    /// Get platform-specific default library search paths
    ///
    /// - Linux: /usr/lib, /usr/local/lib, /lib (+ lib64 variants)
    /// - macOS: /usr/lib, /usr/local/lib, /opt/homebrew/lib
    /// - Windows: C:\Windows\System32
    /// - All platforms: current working directory first
    fn default_search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        #[cfg(target_os = "linux")]
        {
            paths.push(PathBuf::from("/usr/lib"));
            paths.push(PathBuf::from("/usr/local/lib"));
            paths.push(PathBuf::from("/lib"));

            if cfg!(target_pointer_width = "64") {
                paths.push(PathBuf::from("/usr/lib64"));
                paths.push(PathBuf::from("/lib64"));
            }
        }

        #[cfg(target_os = "macos")]
        {
            paths.push(PathBuf::from("/usr/lib"));
            paths.push(PathBuf::from("/usr/local/lib"));
            paths.push(PathBuf::from("/opt/homebrew/lib"));
        }

        #[cfg(target_os = "windows")]
        {
            paths.push(PathBuf::from("C:\\Windows\\System32"));
            if let Ok(system_root) = std::env::var("SystemRoot") {
                paths.push(PathBuf::from(format!("{}\\System32", system_root)));
            }
        }

        if let Ok(cwd) = std::env::current_dir() {
            paths.insert(0, cwd);
        }

        paths
    }

    /// Resolve a library name to an existing file
    ///
    /// Names with an extension (`libswipl.so`) are looked up as-is in every
    /// search path; bare names (`swipl`) also try the platform prefix and
    /// extensions.
    pub fn resolve_library_path(&self, name: &str) -> Option<PathBuf> {
        let path = Path::new(name);
        if path.is_absolute() {
            return path.exists().then(|| path.to_path_buf());
        }

        let mut candidates = vec![name.to_string()];
        if path.extension().is_none() {
            let extensions: &[&str] = if cfg!(target_os = "windows") {
                &["dll"]
            } else if cfg!(target_os = "macos") {
                &["dylib", "so"]
            } else {
                &["so"]
            };
            let prefixes: &[&str] = if cfg!(target_os = "windows") {
                &["", "lib"]
            } else {
                &["lib", ""]
            };
            for prefix in prefixes {
                for ext in extensions {
                    candidates.push(format!("{}{}.{}", prefix, name, ext));
                }
            }
        }

        self.search_paths.iter().find_map(|dir| {
            candidates
                .iter()
                .map(|file| dir.join(file))
                .find(|full| full.exists())
        })
    }

    /// Open a library by name or path
    ///
    /// Falls back to the system loader's own search (`LD_LIBRARY_PATH`,
    /// `PATH`, ...) when no search path holds the file.
    pub fn load(&self, name: &str) -> Result<NativeLibrary, LoadError> {
        let path = self
            .resolve_library_path(name)
            .unwrap_or_else(|| PathBuf::from(name));
        debug!(library = name, path = %path.display(), "opening runtime library");

        let library = unsafe { Library::new(&path) }.map_err(|e| LoadError::LibraryNotFound {
            library: name.to_string(),
            reason: e.to_string(),
        })?;

        Ok(NativeLibrary {
            name: name.to_string(),
            path,
            library,
        })
    }

    /// Add a custom search path (prepended to search list)
    pub fn add_search_path(&mut self, path: PathBuf) {
        self.search_paths.insert(0, path);
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }
}

impl Default for LibraryLoader {
    fn default() -> Self {
        Self::new()
    }
}
