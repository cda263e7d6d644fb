//! Error taxonomy for the bridge

use crate::ffi::{CallError, LoadError, MarshalError};
use plbridge_config::ConfigError;
use thiserror::Error;

/// Result alias used across the handle model and engine
pub type PlResult<T> = Result<T, PlError>;

/// Errors surfaced by handles and the engine
#[derive(Error, Debug)]
pub enum PlError {
    /// Runtime library could not be loaded
    #[error(transparent)]
    Load(#[from] LoadError),

    /// A foreign call failed before or after reaching the runtime
    #[error(transparent)]
    Call(#[from] CallError),

    /// A value could not be converted outside of a call
    #[error(transparent)]
    Marshal(#[from] MarshalError),

    /// Configuration could not be loaded or validated
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Value has no term representation
    #[error("Type error: {0}")]
    TypeError(String),

    /// Term vector index out of range
    #[error("Index {index} out of range for term vector of length {len}")]
    IndexError { index: usize, len: usize },

    /// Invalid argument value (negative vector size, arity mismatch, ...)
    #[error("Value error: {0}")]
    ValueError(String),

    /// Operation on a term with no reference bound
    #[error("Term is not initialized: {operation}")]
    Uninitialized { operation: &'static str },

    /// The runtime reported failure
    #[error("{function} failed")]
    CallFailed { function: String },

    /// `PL_initialise` returned zero
    #[error("Could not initialise the Prolog engine from '{library}'")]
    EngineInit { library: String },

    /// Handle constructor used on an engine that is not ready
    #[error("Engine is not ready (state: {state})")]
    EngineNotReady { state: String },

    /// The native runtime can only be started once per process
    #[error("The Prolog runtime has already been started in this process")]
    RuntimeAlreadyStarted,

    /// A configured type alias points at an unknown type name
    #[error("Type alias '{alias}' refers to unknown type '{target}'")]
    UnknownTypeAlias { alias: String, target: String },
}

impl PlError {
    /// Check whether the error comes from the foreign side being absent
    /// (missing library or symbol) rather than from misuse
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            PlError::Load(_) | PlError::Call(CallError::SymbolNotFound { .. })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = PlError::IndexError { index: 3, len: 2 };
        assert_eq!(
            err.to_string(),
            "Index 3 out of range for term vector of length 2"
        );

        let err = PlError::CallFailed {
            function: "PL_put_atom_chars".to_string(),
        };
        assert_eq!(err.to_string(), "PL_put_atom_chars failed");
    }

    #[test]
    fn test_transparent_call_error() {
        let err: PlError = CallError::SymbolNotFound {
            library: "libswipl.so".to_string(),
            symbol: "PL_nope".to_string(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Symbol 'PL_nope' not found in 'libswipl.so'"
        );
        assert!(err.is_unavailable());
        assert!(!PlError::RuntimeAlreadyStarted.is_unavailable());
    }
}
