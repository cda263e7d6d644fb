//! Engine lifecycle
//!
//! `Unstarted → LibraryLoaded → Ready → Shutdown`. The engine owns the
//! runtime library and the bootstrap argument vector; every handle borrows
//! the engine, so all handles are gone before it halts the runtime.

use crate::error::{PlError, PlResult};
use crate::ffi::{LibraryLoader, LoadError, MarshalError, SymbolSource};
use crate::prolog::{Atom, Functor, FunctorName, PlApi, Term};
use crate::value::Value;
use plbridge_config::{Config, ConfigLoader, EngineConfig, LibraryEntry};
use std::ffi::{c_void, CString};
use std::fmt;
use std::os::raw::c_char;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Set once the native runtime has been handed to an engine
static RUNTIME_CLAIMED: AtomicBool = AtomicBool::new(false);

/// Flag passed after the library path in the bootstrap vector
const QUIET_FLAG: &str = "-q";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Unstarted,
    LibraryLoaded,
    Ready,
    Shutdown,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineState::Unstarted => "unstarted",
            EngineState::LibraryLoaded => "library loaded",
            EngineState::Ready => "ready",
            EngineState::Shutdown => "shut down",
        };
        write!(f, "{}", name)
    }
}

/// Pick the library file for `os`
///
/// The first non-default row whose platform occurs in `os` (ignoring case)
/// wins; otherwise the first row is used.
pub fn select_library<'t>(table: &'t [LibraryEntry], os: &str) -> Option<&'t LibraryEntry> {
    let os = os.to_uppercase();
    table
        .iter()
        .find(|entry| !entry.is_default() && os.contains(&entry.platform.to_uppercase()))
        .or_else(|| table.first())
}

/// A running Prolog runtime
pub struct Engine {
    state: EngineState,
    library: String,
    api: PlApi,
    argv: Vec<CString>,
    argv_ptrs: Vec<*mut c_char>,
}

impl Engine {
    /// Start the native runtime
    ///
    /// Configuration is discovered from `plbridge.toml` upwards of the
    /// current directory plus `PLBRIDGE_*` overrides.
    pub fn start<S: AsRef<str>>(args: &[S]) -> PlResult<Self> {
        let cwd = std::env::current_dir().map_err(plbridge_config::ConfigError::from)?;
        let config = ConfigLoader::new().load_from_directory(&cwd)?;
        Self::from_config(&config, args)
    }

    /// Start the native runtime with an explicit configuration
    ///
    /// Only one engine per process may own the native runtime; later calls
    /// fail with [`PlError::RuntimeAlreadyStarted`].
    pub fn from_config<S: AsRef<str>>(config: &Config, args: &[S]) -> PlResult<Self> {
        RUNTIME_CLAIMED
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| PlError::RuntimeAlreadyStarted)?;

        let prepared = Self::load(config).and_then(|mut engine| {
            engine.prepare(&config.engine, args)?;
            Ok(engine)
        });
        match prepared {
            Ok(engine) => engine.initialise(),
            Err(e) => {
                // PL_initialise was never issued
                RUNTIME_CLAIMED.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    /// Boot against an arbitrary symbol source (statically linked runtime,
    /// test doubles); does not claim the native runtime
    pub fn with_symbols<S: AsRef<str>>(
        source: Box<dyn SymbolSource>,
        config: &EngineConfig,
        args: &[S],
    ) -> PlResult<Self> {
        let library = source.name().to_string();
        let api = PlApi::with_config(source, config)?;
        let mut engine = Self::loaded(library, api);
        engine.prepare(config, args)?;
        engine.initialise()
    }

    fn loaded(library: String, api: PlApi) -> Self {
        Self {
            state: EngineState::LibraryLoaded,
            library,
            api,
            argv: Vec::new(),
            argv_ptrs: Vec::new(),
        }
    }

    fn load(config: &Config) -> PlResult<Self> {
        let engine = &config.engine;
        let library = match engine.library() {
            Some(path) => path.to_path_buf(),
            None => {
                let table = engine.library_table();
                let entry = select_library(&table, std::env::consts::OS).ok_or_else(|| {
                    LoadError::LibraryNotFound {
                        library: String::new(),
                        reason: "library table is empty".to_string(),
                    }
                })?;
                PathBuf::from(&entry.file)
            }
        };
        debug!(library = %library.display(), os = std::env::consts::OS, "selected runtime library");

        let mut loader = LibraryLoader::new();
        for path in engine.search_paths().iter().rev() {
            let path = match config.config_root() {
                Some(root) if path.is_relative() => root.join(path),
                _ => path.clone(),
            };
            loader.add_search_path(path);
        }

        let name = library.to_string_lossy().into_owned();
        let native = loader.load(&name)?;
        let api = PlApi::with_config(Box::new(native), engine)?;
        Ok(Self::loaded(name, api))
    }

    /// Build `[library, "-q", args..., NULL]` and check `PL_initialise` is exported
    ///
    /// Nothing here touches the runtime.
    fn prepare<S: AsRef<str>>(&mut self, config: &EngineConfig, args: &[S]) -> PlResult<()> {
        let words = [self.library.as_str(), QUIET_FLAG]
            .into_iter()
            .chain(config.args().iter().map(String::as_str))
            .chain(args.iter().map(AsRef::as_ref));
        self.argv = words
            .map(|word| {
                CString::new(word).map_err(|_| MarshalError::InvalidString(word.to_string()))
            })
            .collect::<Result<_, _>>()?;
        self.argv_ptrs = self
            .argv
            .iter()
            .map(|arg| arg.as_ptr() as *mut c_char)
            .chain(std::iter::once(std::ptr::null_mut()))
            .collect();

        self.api.dispatcher().symbol("PL_initialise")?;
        Ok(())
    }

    /// `PL_initialise(argc, argv)` over the prepared vector
    fn initialise(mut self) -> PlResult<Self> {
        let argc = self.argv.len();
        let argv = self.argv_ptrs.as_mut_ptr() as *mut c_void;
        let api = &self.api;

        if !api.test("PL_initialise", &[Value::Int(argc as i64), Value::Ptr(argv)])? {
            if let Err(e) = api.call("PL_halt", &[Value::Int(0)]) {
                warn!(error = %e, "halt after failed initialisation failed");
            }
            self.state = EngineState::Shutdown;
            return Err(PlError::EngineInit {
                library: self.library.clone(),
            });
        }

        self.state = EngineState::Ready;
        info!(library = %self.library, argc, "Prolog engine started");
        Ok(self)
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == EngineState::Ready
    }

    /// Library the engine was booted from
    pub fn library(&self) -> &str {
        &self.library
    }

    /// Bootstrap argument vector, without the terminating NULL
    pub fn argv(&self) -> Vec<String> {
        self.argv
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }

    /// Foreign interface of a ready engine
    pub fn api(&self) -> PlResult<&PlApi> {
        match self.state {
            EngineState::Ready => Ok(&self.api),
            state => Err(PlError::EngineNotReady {
                state: state.to_string(),
            }),
        }
    }

    /// Call any runtime function by name or `name:prototype`
    pub fn call(&self, spec: &str, args: &[Value]) -> PlResult<Value> {
        self.api()?.call(spec, args)
    }

    pub fn term(&self) -> PlResult<Term<'_>> {
        Term::new(self.api()?)
    }

    /// Vector of `num` term references; see [`Term::with_count`]
    pub fn terms(&self, num: i64) -> PlResult<Term<'_>> {
        Term::with_count(self.api()?, num)
    }

    pub fn atom(&self, text: &str) -> PlResult<Atom<'_>> {
        Atom::new(self.api()?, text)
    }

    pub fn functor<'e>(
        &'e self,
        name: impl Into<FunctorName<'e>>,
        arity: usize,
    ) -> PlResult<Functor<'e>> {
        Functor::new(self.api()?, name, arity)
    }

    /// Halt the runtime; later calls are no-ops
    pub fn halt(&mut self) -> PlResult<()> {
        if self.state != EngineState::Ready {
            return Ok(());
        }
        self.state = EngineState::Shutdown;

        self.api.call("PL_halt", &[Value::Int(0)])?;
        info!(library = %self.library, "Prolog engine halted");
        Ok(())
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if let Err(e) = self.halt() {
            warn!(library = %self.library, error = %e, "failed to halt Prolog engine");
        }
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("state", &self.state)
            .field("library", &self.library)
            .field("argv", &self.argv)
            .finish()
    }
}
