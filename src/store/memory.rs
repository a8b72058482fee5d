//! An in-memory [`ObjectStore`], used by the integration tests in place of a real bucket.
//!
//! Mirrors the role `unftp-sbe-fs` plays for FTP: something fully local, so tests
//! exercise the translation engine without a network dependency.

use super::{ObjectMeta, ObjectStore, StoreError, StoreResult};
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};

struct Entry {
    body: Bytes,
    last_modified_ms: i64,
    content_type: String,
}

/// A flat in-process key/value bucket.
pub struct MemoryStore {
    objects: DashMap<String, Entry>,
    clock: AtomicI64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            objects: DashMap::new(),
            clock: AtomicI64::new(1),
        }
    }

    /// Seeds an object directly, bypassing `put`, for test setup.
    pub fn seed(&self, key: impl Into<String>, body: impl Into<Bytes>) {
        let ts = self.clock.fetch_add(1, Ordering::SeqCst);
        self.objects.insert(
            key.into(),
            Entry {
                body: body.into(),
                last_modified_ms: ts,
                content_type: "application/octet-stream".to_string(),
            },
        );
    }

    /// Returns the content type stored alongside `key`, if present.
    pub fn content_type_of(&self, key: &str) -> Option<String> {
        self.objects.get(key).map(|e| e.content_type.clone())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Bytes> {
        self.objects
            .get(key)
            .map(|e| e.body.clone())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn get_range(&self, key: &str, offset: u64, len: u64) -> StoreResult<Bytes> {
        let body = self.get(key).await?;
        let start = (offset as usize).min(body.len());
        let end = start.saturating_add(len as usize).min(body.len());
        Ok(body.slice(start..end))
    }

    async fn put_with_content_type(&self, key: &str, body: Bytes, content_type: &str) -> StoreResult<()> {
        let ts = self.clock.fetch_add(1, Ordering::SeqCst);
        self.objects.insert(
            key.to_string(),
            Entry {
                body,
                last_modified_ms: ts,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.objects.remove(key);
        Ok(())
    }

    async fn copy(&self, src: &str, dst: &str) -> StoreResult<()> {
        let body = self.get(src).await?;
        self.put(dst, body).await
    }

    async fn list(&self, prefix: &str) -> StoreResult<Vec<ObjectMeta>> {
        Ok(self
            .objects
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| ObjectMeta {
                key: entry.key().clone(),
                size: entry.value().body.len() as u64,
                last_modified_ms: entry.value().last_modified_ms,
                etag: None,
            })
            .collect())
    }

    async fn head(&self, key: &str) -> StoreResult<Option<ObjectMeta>> {
        Ok(self.objects.get(key).map(|e| ObjectMeta {
            key: key.to_string(),
            size: e.body.len() as u64,
            last_modified_ms: e.last_modified_ms,
            etag: None,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_roundtrips() {
        let store = MemoryStore::new();
        store.put("a/b.txt", Bytes::from_static(b"hello")).await.unwrap();
        assert_eq!(store.get("a/b.txt").await.unwrap(), Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn get_missing_key_is_not_found() {
        let store = MemoryStore::new();
        assert!(store.get("nope").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn delete_missing_key_is_not_an_error() {
        let store = MemoryStore::new();
        store.delete("nope").await.unwrap();
    }

    #[tokio::test]
    async fn list_filters_by_prefix() {
        let store = MemoryStore::new();
        store.seed("a/1.txt", "x");
        store.seed("a/2.txt", "y");
        store.seed("b/1.txt", "z");
        let mut keys: Vec<_> = store.list("a/").await.unwrap().into_iter().map(|e| e.key).collect();
        keys.sort();
        assert_eq!(keys, vec!["a/1.txt".to_string(), "a/2.txt".to_string()]);
    }

    #[tokio::test]
    async fn get_range_clamps_to_body_length() {
        let store = MemoryStore::new();
        store.put("f", Bytes::from_static(b"0123456789")).await.unwrap();
        assert_eq!(store.get_range("f", 5, 1000).await.unwrap(), Bytes::from_static(b"56789"));
    }
}
