//! The abstraction over the remote object store (C1's GET/PUT/DELETE/COPY/LIST/HEAD primitives).
//!
//! Modeled on `libunftp`'s `storage_backend::StorageBackend`: a single async trait that
//! every higher layer (namespace view, upload/download pipelines, auth registry) depends on
//! instead of talking to a concrete client directly.

mod memory;
mod s3;

pub use memory::MemoryStore;
pub use s3::{S3Config, S3Store};

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Errors a concrete [`ObjectStore`] implementation can produce.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key not found: {0}")]
    NotFound(String),

    #[error("object store request failed with status {status}: {body}")]
    Http { status: u16, body: String },

    #[error("object store is unreachable: {0}")]
    Transport(String),

    #[error("object store returned malformed data: {0}")]
    Decode(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_)) || matches!(self, StoreError::Http { status: 404, .. })
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// One entry returned by [`ObjectStore::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    /// Full key, relative to the bucket root.
    pub key: String,
    pub size: u64,
    /// Milliseconds since the epoch, as reported by the store.
    pub last_modified_ms: i64,
    pub etag: Option<String>,
}

/// The object-store primitives the engine needs. A bucket is flat; any hierarchy seen by
/// an SFTP client is synthesized by the namespace view from key prefixes.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetches the full body of `key`.
    async fn get(&self, key: &str) -> StoreResult<Bytes>;

    /// Fetches a byte range `[offset, offset+len)` of `key`. Implementations that can't do
    /// a ranged request fall back to fetching the whole object and slicing it.
    async fn get_range(&self, key: &str, offset: u64, len: u64) -> StoreResult<Bytes>;

    /// Writes `body` to `key` with a generic content type, replacing any existing object.
    async fn put(&self, key: &str, body: Bytes) -> StoreResult<()> {
        self.put_with_content_type(key, body, "application/octet-stream").await
    }

    /// Writes `body` to `key`, replacing any existing object, tagging it with `content_type`.
    async fn put_with_content_type(&self, key: &str, body: Bytes, content_type: &str) -> StoreResult<()>;

    /// Deletes `key`. Deleting a key that doesn't exist is not an error.
    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// Copies `src` to `dst` without a round trip through the client.
    async fn copy(&self, src: &str, dst: &str) -> StoreResult<()>;

    /// Lists every key with the given prefix, non-recursively filtered by the caller.
    async fn list(&self, prefix: &str) -> StoreResult<Vec<ObjectMeta>>;

    /// Cheap existence + metadata check, without fetching the body.
    async fn head(&self, key: &str) -> StoreResult<Option<ObjectMeta>>;
}
