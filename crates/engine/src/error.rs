use herald_storage::StorageError;

use crate::jit::JitError;

/// Errors surfaced by the engine to its host.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Persisted state could not be read or written.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A campaign set definition could not be decoded.
    #[error("invalid campaign definition: {message}")]
    Definition { message: String },

    /// Engine configuration is malformed.
    #[error("invalid configuration: {message}")]
    Config { message: String },

    /// A JIT sync failed.
    #[error(transparent)]
    Jit(#[from] JitError),
}

impl EngineError {
    pub(crate) fn definition(message: impl Into<String>) -> Self {
        EngineError::Definition {
            message: message.into(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        EngineError::Config {
            message: message.into(),
        }
    }
}
