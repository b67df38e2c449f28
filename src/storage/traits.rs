//! Core trait definitions for the object storage layer

use async_trait::async_trait;

use super::error::StorageResult;

/// Flat key/value object storage, the subset of S3 the pipeline needs.
///
/// Keys are `/`-separated paths relative to the bucket root, without a leading
/// slash.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write an object, replacing any existing object with the same key
    async fn put(&self, key: &str, body: Vec<u8>) -> StorageResult<()>;

    /// Read an object; `None` when the key does not exist
    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Check whether an object exists
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Delete an object; deleting a missing key is not an error
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// List keys starting with `prefix`, sorted
    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Human readable location of this store, for logs
    fn describe(&self) -> String;
}

/// Reject keys that could escape the store root or that S3 would mangle
pub fn validate_key(key: &str) -> StorageResult<()> {
    use super::error::StorageError;

    if key.is_empty() {
        return Err(StorageError::invalid_key("empty key"));
    }
    if key.starts_with('/') {
        return Err(StorageError::invalid_key(format!("{key} starts with '/'")));
    }
    if key.split('/').any(|segment| segment.is_empty() || segment == "." || segment == "..") {
        return Err(StorageError::invalid_key(format!(
            "{key} contains an empty or relative segment"
        )));
    }
    Ok(())
}
