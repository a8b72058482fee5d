//! Handle Table: per-session map from opaque handles to open-file/open-directory state.
//!
//! `russh_sftp` represents a wire handle as a `String`; we encode our 32-bit monotonic
//! counter as 8 hex characters, a stable opaque value without needing unchecked UTF-8
//! conversion of raw bytes.

use crate::namespace::Entry;
use std::collections::HashMap;
use tokio::sync::oneshot;

#[derive(Debug)]
pub enum UploadState {
    Pending,
    Complete,
    Failed(String),
}

/// State for a handle opened with the WRITE flag.
pub struct WriteHandle {
    pub virtual_path: String,
    pub object_key: String,
    pub buffer: Vec<u8>,
    pub next_expected_offset: u64,
    pub state: UploadState,
    /// Resolved by the upload task once the PUT completes, so CLOSE can await it instead
    /// of polling.
    pub completion: Option<oneshot::Receiver<Result<(), String>>>,
}

/// State for a handle opened with the READ flag.
pub struct ReadHandle {
    pub virtual_path: String,
    pub object_key: String,
    pub size: u64,
    pub read_at_eof: bool,
}

/// State for a handle opened via OPENDIR.
pub struct DirHandle {
    pub object_prefix: String,
    pub entries: Vec<Entry>,
    pub emitted: bool,
}

pub enum Handle {
    Read(ReadHandle),
    Write(WriteHandle),
    Dir(DirHandle),
}

/// Per-session table, owned exclusively by that session's task — no locking required.
#[derive(Default)]
pub struct HandleTable {
    next_id: u32,
    handles: HashMap<u32, Handle>,
}

impl HandleTable {
    pub fn new() -> Self {
        HandleTable {
            next_id: 0,
            handles: HashMap::new(),
        }
    }

    pub fn insert(&mut self, handle: Handle) -> String {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        self.handles.insert(id, handle);
        encode(id)
    }

    pub fn get(&self, wire_handle: &str) -> Option<&Handle> {
        let id = decode(wire_handle)?;
        self.handles.get(&id)
    }

    pub fn get_mut(&mut self, wire_handle: &str) -> Option<&mut Handle> {
        let id = decode(wire_handle)?;
        self.handles.get_mut(&id)
    }

    pub fn remove(&mut self, wire_handle: &str) -> Option<Handle> {
        let id = decode(wire_handle)?;
        self.handles.remove(&id)
    }
}

fn encode(id: u32) -> String {
    format!("{:08x}", id)
}

fn decode(wire_handle: &str) -> Option<u32> {
    u32::from_str_radix(wire_handle, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_issued_handle_is_unique() {
        let mut table = HandleTable::new();
        let a = table.insert(Handle::Dir(DirHandle {
            object_prefix: "p".into(),
            entries: vec![],
            emitted: false,
        }));
        let b = table.insert(Handle::Dir(DirHandle {
            object_prefix: "p".into(),
            entries: vec![],
            emitted: false,
        }));
        assert_ne!(a, b);
    }

    #[test]
    fn unknown_handle_resolves_to_none() {
        let table = HandleTable::new();
        assert!(table.get("ffffffff").is_none());
    }

    #[test]
    fn removed_handle_is_gone() {
        let mut table = HandleTable::new();
        let h = table.insert(Handle::Dir(DirHandle {
            object_prefix: "p".into(),
            entries: vec![],
            emitted: false,
        }));
        assert!(table.remove(&h).is_some());
        assert!(table.get(&h).is_none());
    }
}
