//! Key/value storage port backing the cache layer.
//!
//! The cache manager layers a typed envelope (map vs scalar, TTL) on top of
//! this raw string store; the storage medium itself is an adapter concern.

/// Raw string key/value storage.
pub trait KeyValueStore: Send + Sync {
    /// Reads the value stored under `key`, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying medium cannot be read.
    fn read(&self, key: &str) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>>;

    /// Writes `value` under `key`, creating or overwriting it.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails (permissions, disk full, etc.).
    fn write(
        &self,
        key: &str,
        value: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Removes the entry under `key`. Removing an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying medium cannot be modified.
    fn remove(&self, key: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Lists every stored key.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying medium cannot be enumerated.
    fn keys(&self) -> Result<Vec<String>, Box<dyn std::error::Error + Send + Sync>>;
}
