//! plbridge Runtime - dynamic bridge to the SWI-Prolog runtime library
//!
//! This library provides:
//! - A generic symbol caller driven by prototype strings (`ffi`)
//! - Handles over term references, atoms and functors (`prolog`)
//! - The engine bootstrap and shutdown sequence (`engine`)
//!
//! # Example
//!
//! ```no_run
//! use plbridge_runtime::Engine;
//!
//! let engine = Engine::start(&["--stack-limit=1g"]).unwrap();
//! let term = engine.term().unwrap();
//! term.put_atom_chars("hello").unwrap();
//! assert!(term.is_atom().unwrap());
//! ```

/// plbridge runtime version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod engine;
pub mod error;
pub mod ffi;
pub mod prolog;
pub mod value;

// Re-export commonly used types
pub use engine::{select_library, Engine, EngineState};
pub use error::{PlError, PlResult};
pub use ffi::{CallError, Dispatcher, PrototypeRegistry, SymbolTable, TypeDescriptor, TypeRegistry};
pub use prolog::{Atom, Functor, ModuleScope, PlApi, PutValue, Term, TermType};
pub use value::Value;
