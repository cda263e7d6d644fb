//! Foreign Function Interface (FFI) infrastructure
//!
//! Calls into a native library whose symbols are only known by name at run
//! time:
//! - Type names and descriptors (`types`)
//! - Prototype strings and the prototype table (`prototype`)
//! - Value marshaling (host `Value` ↔ C)
//! - Dynamic library loading and in-process symbol tables (`loader`)
//! - The generic symbol caller (`dispatcher`)
//!
//! # Safety
//!
//! FFI operations involve `unsafe` code and careful memory management.
//! All unsafe code is isolated in this module with safe wrappers. Calling a
//! symbol with a prototype that does not match its real C signature is
//! undefined behavior; prototypes are trusted input.

pub mod dispatcher;
pub mod loader;
pub mod marshal;
pub mod prototype;
pub mod types;

pub use dispatcher::{BoundSymbol, CallError, Dispatcher, Signature};
pub use loader::{LibraryLoader, LoadError, NativeLibrary, SymbolSource, SymbolTable};
pub use marshal::{encode_wide, CType, MarshalContext, MarshalError};
pub use prototype::{split_symbol_spec, Prototype, PrototypeError, PrototypeRegistry, ResolvedPrototype};
pub use types::{ScalarKind, TypeDescriptor, TypeRegistry, WChar};
