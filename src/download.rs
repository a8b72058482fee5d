//! Download Pipeline: serves ranged reads from the store with EOF accounting.

use crate::error::EngineError;
use crate::handles::ReadHandle;
use crate::store::{ObjectMeta, ObjectStore};
use bytes::Bytes;

/// Resolves `object_key` to a read handle, rejecting keys that don't exist or that are
/// actually directories (a `.directory` marker or nested keys under the same prefix).
pub async fn open_for_read(store: &dyn ObjectStore, virtual_path: &str, object_key: &str) -> Result<ReadHandle, EngineError> {
    let siblings = store.list(object_key).await?;
    classify_open(virtual_path, object_key, &siblings)
}

fn classify_open(virtual_path: &str, object_key: &str, siblings: &[ObjectMeta]) -> Result<ReadHandle, EngineError> {
    let exact = siblings.iter().find(|o| o.key == object_key);
    let looks_like_dir = siblings
        .iter()
        .any(|o| o.key != object_key && (o.key == format!("{}/.directory", object_key) || o.key.starts_with(&format!("{}/", object_key))));

    if looks_like_dir {
        return Err(EngineError::NotFound(virtual_path.to_string()));
    }
    let meta = exact.ok_or_else(|| EngineError::NotFound(virtual_path.to_string()))?;
    Ok(ReadHandle {
        virtual_path: virtual_path.to_string(),
        object_key: object_key.to_string(),
        size: meta.size,
        read_at_eof: false,
    })
}

/// Outcome of a READ request: either a chunk of bytes, or EOF.
pub enum ReadOutcome {
    Data(Bytes),
    Eof,
}

pub async fn read(store: &dyn ObjectStore, handle: &mut ReadHandle, offset: u64, length: u64) -> Result<ReadOutcome, EngineError> {
    if handle.read_at_eof || offset >= handle.size {
        handle.read_at_eof = true;
        return Ok(ReadOutcome::Eof);
    }
    let clamped = length.min(handle.size - offset);
    if clamped == 0 {
        handle.read_at_eof = true;
        return Ok(ReadOutcome::Eof);
    }
    let bytes = store.get_range(&handle.object_key, offset, clamped).await?;
    if offset + clamped >= handle.size {
        handle.read_at_eof = true;
    }
    Ok(ReadOutcome::Data(bytes))
}
