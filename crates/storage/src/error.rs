/// All errors that can be returned by a KeyValueStore implementation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("storage i/o error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A stored value could not be encoded or decoded.
    #[error("storage serialization error for key '{key}': {message}")]
    Serialization { key: String, message: String },

    /// A backend-specific storage error (lock poisoning, corrupt file, etc.).
    #[error("storage backend error: {0}")]
    Backend(String),
}
