//! SFTP Request Router: per-verb contracts wired onto `russh_sftp`'s wire types, built on
//! path mapping, access policy, the namespace view, the handle table, and the upload/download
//! pipelines. Grounded on the per-verb `ControlCommandHandler`/`CommandContext` split used
//! throughout `server/controlchan/commands`, generalized from one `execute` per FTP verb to
//! one function per SFTP verb sharing a `RequestContext`.

use crate::auth::User;
use crate::download;
use crate::error::EngineError;
use crate::events::{Event, EventBus};
use crate::handles::{DirHandle, Handle, HandleTable, ReadHandle, UploadState, WriteHandle};
use crate::namespace::{self, Entry, EntryKind};
use crate::path;
use crate::policy;
use crate::session::SessionManager;
use crate::store::ObjectStore;
use crate::time::now_ms;
use crate::upload::{self, UploadClock};
use russh_sftp::protocol::OpenFlags;
use std::sync::Arc;
use std::time::Duration;

/// Shared, immutable-per-request state. The handle table is owned by the caller (one per
/// SSH channel) since it must not be shared across sessions.
pub struct RequestContext {
    pub store: Arc<dyn ObjectStore>,
    pub events: EventBus,
    pub upload_clock: Arc<UploadClock>,
    pub sessions: Arc<SessionManager>,
    pub user: User,
}

/// Cancels and rearms the caller's idle timer. Every SFTP verb calls this once so an
/// active session never fires a spurious idle event.
pub fn touch(ctx: &RequestContext) {
    ctx.sessions.record_activity(&ctx.user.username, now_ms());
}

/// Which verb triggered a protected-path rejection, so the right blocked event fires.
#[derive(Clone, Copy)]
pub enum ProtectedAction {
    Remove,
    Rename,
    Mkdir,
    Rmdir,
}

pub enum PathKind {
    File { size: u64 },
    Directory,
}

fn normalize_and_check(ctx: &RequestContext, raw_path: &str) -> Result<String, EngineError> {
    let normalized = path::normalize(raw_path).map_err(|_| EngineError::PermissionDenied(raw_path.to_string()))?;
    if !ctx.user.allow_list.admits(&ctx.user.username, &normalized) {
        return Err(EngineError::PermissionDenied(normalized));
    }
    Ok(normalized)
}

fn check_protected(ctx: &RequestContext, virtual_path: &str, action: ProtectedAction) -> Result<(), EngineError> {
    let always_blocked = matches!(action, ProtectedAction::Mkdir | ProtectedAction::Rmdir);
    let protected = always_blocked || policy::is_protected_path(&ctx.user.username, virtual_path);
    if !protected {
        return Ok(());
    }
    let event = match action {
        ProtectedAction::Remove => Event::ProtectedDirectoryDeletionBlocked {
            username: ctx.user.username.clone(),
            virtual_path: virtual_path.to_string(),
        },
        ProtectedAction::Rename => Event::ProtectedDirectoryRenameBlocked {
            username: ctx.user.username.clone(),
            virtual_path: virtual_path.to_string(),
        },
        ProtectedAction::Mkdir => Event::DirectoryCreationBlocked {
            username: ctx.user.username.clone(),
            virtual_path: virtual_path.to_string(),
        },
        ProtectedAction::Rmdir => Event::DirectoryDeletionBlocked {
            username: ctx.user.username.clone(),
            virtual_path: virtual_path.to_string(),
        },
    };
    ctx.events.emit(event);
    Err(EngineError::PermissionDenied(virtual_path.to_string()))
}

/// LIST-based classification of a single object key: file, directory (marker or inferred
/// from nested keys), or not found.
pub fn classify_path(key: &str, siblings: &[crate::store::ObjectMeta]) -> Result<PathKind, EngineError> {
    let marker = format!("{}/.directory", key);
    let has_marker = siblings.iter().any(|o| o.key == marker);
    let has_nested = siblings.iter().any(|o| o.key != key && o.key.starts_with(&format!("{}/", key)));
    if has_marker || has_nested {
        return Ok(PathKind::Directory);
    }
    match siblings.iter().find(|o| o.key == key) {
        Some(meta) => Ok(PathKind::File { size: meta.size }),
        None => Err(EngineError::NotFound(key.to_string())),
    }
}

// ---- OPEN / READ / WRITE / CLOSE (files) -------------------------------------------------

pub async fn open(ctx: &RequestContext, handles: &mut HandleTable, raw_path: &str, flags: OpenFlags) -> Result<String, EngineError> {
    let virtual_path = normalize_and_check(ctx, raw_path)?;
    let key = path::map_to_key(&ctx.user.home_prefix, &virtual_path);

    if flags.contains(OpenFlags::WRITE) {
        if !policy::file_type_allowed(&ctx.user.username, &virtual_path) {
            return Err(EngineError::PermissionDenied(virtual_path));
        }
        let wire_handle = handles.insert(Handle::Write(WriteHandle {
            virtual_path,
            object_key: key,
            buffer: Vec::new(),
            next_expected_offset: 0,
            state: UploadState::Pending,
            completion: None,
        }));
        return Ok(wire_handle);
    }

    let read_handle = download::open_for_read(ctx.store.as_ref(), &virtual_path, &key).await?;
    Ok(handles.insert(Handle::Read(read_handle)))
}

pub enum ReadResult {
    Data(bytes::Bytes),
    Eof,
}

pub async fn read(ctx: &RequestContext, handles: &mut HandleTable, wire_handle: &str, offset: u64, len: u64) -> Result<ReadResult, EngineError> {
    let Some(Handle::Read(read_handle)) = handles.get_mut(wire_handle) else {
        return Err(EngineError::BadHandle);
    };
    match download::read(ctx.store.as_ref(), read_handle, offset, len).await? {
        download::ReadOutcome::Data(bytes) => {
            ctx.events.emit(Event::FileDownloaded {
                username: ctx.user.username.clone(),
                virtual_path: read_handle.virtual_path.clone(),
                bytes: bytes.len() as u64,
            });
            Ok(ReadResult::Data(bytes))
        }
        download::ReadOutcome::Eof => Ok(ReadResult::Eof),
    }
}

pub fn write(handles: &mut HandleTable, wire_handle: &str, offset: u64, data: &[u8]) -> Result<(), EngineError> {
    let Some(Handle::Write(write_handle)) = handles.get_mut(wire_handle) else {
        return Err(EngineError::BadHandle);
    };
    upload::append(write_handle, offset, data);
    Ok(())
}

pub async fn close(ctx: &RequestContext, handles: &mut HandleTable, wire_handle: &str) -> Result<(), EngineError> {
    let Some(handle) = handles.remove(wire_handle) else {
        return Err(EngineError::BadHandle);
    };
    match handle {
        Handle::Write(write_handle) => {
            upload::finalize(write_handle, ctx.store.clone(), &ctx.user, &ctx.events, &ctx.upload_clock, now_ms()).await?;
            Ok(())
        }
        Handle::Read(_) | Handle::Dir(_) => Ok(()),
    }
}

// ---- OPENDIR / READDIR -------------------------------------------------------------------

pub async fn opendir(ctx: &RequestContext, handles: &mut HandleTable, raw_path: &str) -> Result<String, EngineError> {
    let virtual_path = normalize_and_check(ctx, raw_path)?;

    let entries = if virtual_path == "/" {
        namespace::synthesize_root(&ctx.user.username, now_ms())
    } else {
        let key = path::map_to_key(&ctx.user.home_prefix, &virtual_path);
        if ctx.upload_clock.is_recent(now_ms(), 10_000) {
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        let objects = ctx.store.list(&key).await?;
        namespace::list_entries(&key, &objects)
    };

    let wire_handle = handles.insert(Handle::Dir(DirHandle {
        object_prefix: virtual_path,
        entries,
        emitted: false,
    }));
    Ok(wire_handle)
}

/// Returns `Ok(None)` on the second and subsequent calls, signaling EOF.
pub fn readdir<'a>(handles: &'a mut HandleTable, wire_handle: &str) -> Result<Option<&'a [Entry]>, EngineError> {
    let Some(Handle::Dir(dir)) = handles.get_mut(wire_handle) else {
        return Err(EngineError::BadHandle);
    };
    if dir.emitted {
        return Ok(None);
    }
    dir.emitted = true;
    Ok(Some(&dir.entries))
}

// ---- REMOVE / RENAME ----------------------------------------------------------------------

pub async fn remove(ctx: &RequestContext, raw_path: &str) -> Result<(), EngineError> {
    let virtual_path = normalize_and_check(ctx, raw_path)?;
    check_protected(ctx, &virtual_path, ProtectedAction::Remove)?;
    let key = path::map_to_key(&ctx.user.home_prefix, &virtual_path);
    ctx.store.delete(&key).await?;
    ctx.events.emit(Event::FileDeleted {
        username: ctx.user.username.clone(),
        virtual_path,
    });
    Ok(())
}

pub async fn rename(ctx: &RequestContext, raw_old: &str, raw_new: &str) -> Result<(), EngineError> {
    let old_path = normalize_and_check(ctx, raw_old)?;
    let new_path = normalize_and_check(ctx, raw_new)?;
    check_protected(ctx, &old_path, ProtectedAction::Rename)?;
    check_protected(ctx, &new_path, ProtectedAction::Rename)?;

    let old_key = path::map_to_key(&ctx.user.home_prefix, &old_path);
    let new_key = path::map_to_key(&ctx.user.home_prefix, &new_path);
    ctx.store.copy(&old_key, &new_key).await?;
    ctx.store.delete(&old_key).await?;
    ctx.events.emit(Event::FileRenamed {
        username: ctx.user.username.clone(),
        from: old_path,
        to: new_path,
    });
    Ok(())
}

// ---- STAT / LSTAT / REALPATH ---------------------------------------------------------------

pub async fn stat(ctx: &RequestContext, raw_path: &str) -> Result<PathKind, EngineError> {
    let virtual_path = normalize_and_check(ctx, raw_path)?;
    if virtual_path == "/" {
        return Ok(PathKind::Directory);
    }
    let key = path::map_to_key(&ctx.user.home_prefix, &virtual_path);
    let siblings = ctx.store.list(&key).await?;
    classify_path(&key, &siblings)
}

pub async fn realpath(ctx: &RequestContext, raw_path: &str) -> Result<String, EngineError> {
    let virtual_path = normalize_and_check(ctx, raw_path)?;
    if virtual_path == "/" {
        return Ok(virtual_path);
    }
    let key = path::map_to_key(&ctx.user.home_prefix, &virtual_path);
    let siblings = ctx.store.list(&key).await?;
    classify_path(&key, &siblings)?;
    Ok(virtual_path)
}

// ---- MKDIR / RMDIR: unconditionally rejected ------------------------------------------------

pub fn mkdir(ctx: &RequestContext, raw_path: &str) -> EngineError {
    let virtual_path = path::normalize(raw_path).unwrap_or_else(|_| raw_path.to_string());
    check_protected(ctx, &virtual_path, ProtectedAction::Mkdir).unwrap_err()
}

pub fn rmdir(ctx: &RequestContext, raw_path: &str) -> EngineError {
    let virtual_path = path::normalize(raw_path).unwrap_or_else(|_| raw_path.to_string());
    check_protected(ctx, &virtual_path, ProtectedAction::Rmdir).unwrap_err()
}

/// Builds the fixed-format long name used in READDIR entries. UI-only, not meant to be
/// parsed by clients.
pub fn format_longname(entry: &Entry) -> String {
    let kind = if entry.kind == EntryKind::Directory { 'd' } else { '-' };
    let datetime = chrono::DateTime::from_timestamp_millis(entry.modified_ms).unwrap_or_default();
    format!(
        "{kind}rw-rw-rw-    1 user user {size:>10} {date} {time} {name}",
        size = entry.size,
        date = datetime.format("%m/%d/%Y"),
        time = datetime.format("%H:%M:%S"),
        name = entry.name,
    )
}
