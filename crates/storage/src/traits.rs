use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StorageError;

/// Persistent key/value store for engine state that must survive restarts.
///
/// Values are JSON documents addressed by string keys. Implementations
/// use interior mutability so a single store can be shared by the view
/// tracker and the JIT client.
///
/// ## Durability
///
/// A successful `put` or `remove` must be visible to every later `get`
/// on the same store. File-backed implementations must also make it
/// visible to a store reopened on the same path.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    fn put(&self, key: &str, value: serde_json::Value) -> Result<(), StorageError>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// All keys currently stored, in ascending order.
    fn keys(&self) -> Result<Vec<String>, StorageError>;
}

/// Read and decode a typed value.
pub fn load<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    match store.get(key)? {
        None => Ok(None),
        Some(json) => serde_json::from_value(json)
            .map(Some)
            .map_err(|e| StorageError::Serialization {
                key: key.to_string(),
                message: e.to_string(),
            }),
    }
}

/// Encode and store a typed value.
pub fn save<T: Serialize>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let json = serde_json::to_value(value).map_err(|e| StorageError::Serialization {
        key: key.to_string(),
        message: e.to_string(),
    })?;
    store.put(key, json)
}
