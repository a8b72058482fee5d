//! Upload Pipeline: buffers incremental WRITEs and issues a single PUT at CLOSE,
//! coordinating with the client-visible commit point via a oneshot completion signal
//! instead of polling.

use crate::auth::User;
use crate::events::{Event, EventBus};
use crate::handles::{UploadState, WriteHandle};
use crate::policy;
use crate::store::ObjectStore;
use bytes::Bytes;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::warn;

/// Tracks the last successful upload time, visible to every session's OPENDIR as a single
/// monotonically-updated clock shared across the whole server.
#[derive(Default)]
pub struct UploadClock {
    last_upload_ms: AtomicI64,
}

impl UploadClock {
    pub fn new() -> Self {
        UploadClock {
            last_upload_ms: AtomicI64::new(0),
        }
    }

    pub fn mark(&self, now_ms: i64) {
        self.last_upload_ms.store(now_ms, Ordering::SeqCst);
    }

    /// Whether a PUT completed within `window_ms` of `now_ms`.
    pub fn is_recent(&self, now_ms: i64, window_ms: i64) -> bool {
        now_ms.saturating_sub(self.last_upload_ms.load(Ordering::SeqCst)) < window_ms
    }
}

/// Appends `data` to the handle's buffer. A non-monotonic offset is logged and treated
/// as an append rather than rejected.
pub fn append(handle: &mut WriteHandle, offset: u64, data: &[u8]) {
    if offset != handle.next_expected_offset {
        warn!(
            offset,
            expected = handle.next_expected_offset,
            path = %handle.virtual_path,
            "non-monotonic WRITE offset, treating as append"
        );
    }
    handle.buffer.extend_from_slice(data);
    handle.next_expected_offset = handle.buffer.len() as u64;
}

/// Validates and commits the buffered write. Returns the number of bytes written.
pub async fn finalize(
    mut handle: WriteHandle,
    store: Arc<dyn ObjectStore>,
    user: &User,
    events: &EventBus,
    clock: &UploadClock,
    now_ms: i64,
) -> Result<u64, crate::error::EngineError> {
    if handle.buffer.is_empty() {
        events.emit(Event::UploadError {
            username: user.username.clone(),
            virtual_path: handle.virtual_path.clone(),
            reason: "empty files not allowed".to_string(),
        });
        return Err(crate::error::EngineError::UploadFailed("empty files not allowed".to_string()));
    }
    if !policy::file_type_allowed(&user.username, &handle.virtual_path) {
        events.emit(Event::UploadError {
            username: user.username.clone(),
            virtual_path: handle.virtual_path.clone(),
            reason: "only .pdf uploads are allowed under ledgers/invoices".to_string(),
        });
        return Err(crate::error::EngineError::UploadFailed(
            "only .pdf uploads are allowed under ledgers/invoices".to_string(),
        ));
    }

    let (tx, rx) = oneshot::channel();
    let key = handle.object_key.clone();
    let body = Bytes::from(std::mem::take(&mut handle.buffer));
    let bytes_written = body.len() as u64;
    let store_task = store.clone();
    tokio::spawn(async move {
        let result = store_task.put(&key, body).await.map_err(|e| e.to_string());
        let _ = tx.send(result);
    });
    handle.state = UploadState::Pending;

    match rx.await {
        Ok(Ok(())) => {
            handle.state = UploadState::Complete;
            clock.mark(now_ms);
            events.emit(Event::FileUploaded {
                username: user.username.clone(),
                virtual_path: handle.virtual_path.clone(),
                bytes: bytes_written,
            });
            events.emit(Event::DirectoryChanged {
                username: user.username.clone(),
                virtual_path: parent_dir(&handle.virtual_path),
            });
            Ok(bytes_written)
        }
        Ok(Err(reason)) => {
            handle.state = UploadState::Failed(reason.clone());
            events.emit(Event::UploadError {
                username: user.username.clone(),
                virtual_path: handle.virtual_path.clone(),
                reason: reason.clone(),
            });
            Err(crate::error::EngineError::UploadFailed(reason))
        }
        Err(_) => {
            let reason = "upload task terminated without a result".to_string();
            handle.state = UploadState::Failed(reason.clone());
            Err(crate::error::EngineError::UploadFailed(reason))
        }
    }
}

fn parent_dir(virtual_path: &str) -> String {
    match virtual_path.rfind('/') {
        Some(0) => "/".to_string(),
        Some(idx) => virtual_path[..idx].to_string(),
        None => "/".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handles::UploadState;
    use crate::store::MemoryStore;

    fn write_handle(path: &str, key: &str) -> WriteHandle {
        WriteHandle {
            virtual_path: path.to_string(),
            object_key: key.to_string(),
            buffer: Vec::new(),
            next_expected_offset: 0,
            state: UploadState::Pending,
            completion: None,
        }
    }

    #[test]
    fn append_tracks_monotonic_offsets() {
        let mut h = write_handle("/a.txt", "k");
        append(&mut h, 0, b"hello");
        append(&mut h, 5, b" world");
        assert_eq!(h.buffer, b"hello world");
    }

    #[test]
    fn append_accepts_non_monotonic_offset_as_append() {
        let mut h = write_handle("/a.txt", "k");
        append(&mut h, 0, b"abc");
        append(&mut h, 0, b"def");
        assert_eq!(h.buffer, b"abcdef");
    }

    #[tokio::test]
    async fn finalize_rejects_empty_buffer() {
        let store: Arc<dyn ObjectStore> = Arc::new(MemoryStore::new());
        let user = User::new("alice", "users");
        let events = EventBus::new();
        let clock = UploadClock::new();
        let h = write_handle("/alice/photo.jpg", "users/alice/photo.jpg");
        let err = finalize(h, store, &user, &events, &clock, 1).await.unwrap_err();
        assert!(matches!(err, crate::error::EngineError::UploadFailed(_)));
    }

    #[tokio::test]
    async fn finalize_rejects_non_pdf_under_ledgers() {
        let store: Arc<dyn ObjectStore> = Arc::new(MemoryStore::new());
        let user = User::new("alice", "users");
        let events = EventBus::new();
        let clock = UploadClock::new();
        let mut h = write_handle("/ledgers/report.txt", "users/alice/ledgers/report.txt");
        h.buffer = b"data".to_vec();
        let err = finalize(h, store, &user, &events, &clock, 1).await.unwrap_err();
        assert!(matches!(err, crate::error::EngineError::UploadFailed(_)));
    }

    #[tokio::test]
    async fn finalize_puts_full_buffer_and_marks_clock() {
        let store = Arc::new(MemoryStore::new());
        let user = User::new("alice", "users");
        let events = EventBus::new();
        let clock = UploadClock::new();
        let mut h = write_handle("/photo.jpg", "users/alice/photo.jpg");
        h.buffer = b"binarydata".to_vec();
        let bytes = finalize(h, store.clone() as Arc<dyn ObjectStore>, &user, &events, &clock, 42)
            .await
            .unwrap();
        assert_eq!(bytes, 10);
        assert_eq!(store.get("users/alice/photo.jpg").await.unwrap(), Bytes::from_static(b"binarydata"));
        assert!(clock.is_recent(42, 10_000));
    }
}
