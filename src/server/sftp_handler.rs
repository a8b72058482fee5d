//! The `russh_sftp::server::Handler` implementation: translates wire requests into calls
//! on the [`router`](super::router) module and wire responses/status codes back.
//!
//! Every verb not listed in C7's table (`setstat`, `symlink`, `readlink`, …) falls back to
//! the trait's default `unimplemented()` → `OP_UNSUPPORTED`, same as the grounding example
//! that only overrides the verbs it actually supports.

use super::router::{self, touch, PathKind, ReadResult, RequestContext};
use crate::error::EngineError;
use crate::handles::HandleTable;
use crate::namespace::EntryKind;
use async_trait::async_trait;
use russh_sftp::protocol::{Attrs, Data, File as SftpFile, FileAttributes, Handle as SftpHandle, Name, OpenFlags, Status, StatusCode};
use std::collections::HashMap;

pub struct SftpConnectionHandler {
    ctx: RequestContext,
    handles: HandleTable,
}

impl SftpConnectionHandler {
    pub fn new(ctx: RequestContext) -> Self {
        SftpConnectionHandler {
            ctx,
            handles: HandleTable::new(),
        }
    }
}

fn ok_status(id: u32) -> Status {
    Status {
        id,
        status_code: StatusCode::Ok,
        error_message: "ok".to_string(),
        language_tag: "en-US".to_string(),
    }
}

fn attrs_for_directory() -> FileAttributes {
    FileAttributes {
        size: Some(0),
        permissions: Some(0o040755),
        ..Default::default()
    }
}

fn attrs_for_file(size: u64) -> FileAttributes {
    FileAttributes {
        size: Some(size),
        permissions: Some(0o100644),
        ..Default::default()
    }
}

fn path_kind_to_attrs(kind: &PathKind) -> FileAttributes {
    match kind {
        PathKind::Directory => attrs_for_directory(),
        PathKind::File { size } => attrs_for_file(*size),
    }
}

#[async_trait]
impl russh_sftp::server::Handler for SftpConnectionHandler {
    type Error = StatusCode;

    fn unimplemented(&self) -> StatusCode {
        StatusCode::OpUnsupported
    }

    async fn init(&mut self, _client_version: u32, _extensions: HashMap<String, String>) -> Result<russh_sftp::protocol::Version, Self::Error> {
        Ok(russh_sftp::protocol::Version::new())
    }

    async fn open(&mut self, id: u32, filename: String, pflags: OpenFlags, _attrs: FileAttributes) -> Result<SftpHandle, Self::Error> {
        touch(&self.ctx);
        let handle = router::open(&self.ctx, &mut self.handles, &filename, pflags).await.map_err(|e| e.wire_status())?;
        Ok(SftpHandle { id, handle })
    }

    async fn read(&mut self, id: u32, handle: String, offset: u64, len: u32) -> Result<Data, Self::Error> {
        touch(&self.ctx);
        match router::read(&self.ctx, &mut self.handles, &handle, offset, len as u64)
            .await
            .map_err(|e| e.wire_status())?
        {
            ReadResult::Data(bytes) => Ok(Data { id, data: bytes.to_vec() }),
            ReadResult::Eof => Err(StatusCode::Eof),
        }
    }

    async fn write(&mut self, id: u32, handle: String, offset: u64, data: Vec<u8>) -> Result<Status, Self::Error> {
        touch(&self.ctx);
        router::write(&mut self.handles, &handle, offset, &data).map_err(|e| e.wire_status())?;
        Ok(ok_status(id))
    }

    async fn close(&mut self, id: u32, handle: String) -> Result<Status, Self::Error> {
        touch(&self.ctx);
        router::close(&self.ctx, &mut self.handles, &handle).await.map_err(|e| e.wire_status())?;
        Ok(ok_status(id))
    }

    async fn opendir(&mut self, id: u32, path: String) -> Result<SftpHandle, Self::Error> {
        touch(&self.ctx);
        let handle = router::opendir(&self.ctx, &mut self.handles, &path).await.map_err(|e| e.wire_status())?;
        Ok(SftpHandle { id, handle })
    }

    async fn readdir(&mut self, id: u32, handle: String) -> Result<Name, Self::Error> {
        touch(&self.ctx);
        let entries = router::readdir(&mut self.handles, &handle).map_err(|e| e.wire_status())?;
        let Some(entries) = entries else {
            return Err(StatusCode::Eof);
        };
        let files = entries
            .iter()
            .map(|entry| SftpFile {
                filename: entry.name.clone(),
                longname: router::format_longname(entry),
                attrs: if entry.kind == EntryKind::Directory {
                    attrs_for_directory()
                } else {
                    attrs_for_file(entry.size)
                },
            })
            .collect();
        Ok(Name { id, files })
    }

    async fn remove(&mut self, id: u32, filename: String) -> Result<Status, Self::Error> {
        touch(&self.ctx);
        router::remove(&self.ctx, &filename).await.map_err(|e| e.wire_status())?;
        Ok(ok_status(id))
    }

    async fn rename(&mut self, id: u32, oldpath: String, newpath: String) -> Result<Status, Self::Error> {
        touch(&self.ctx);
        router::rename(&self.ctx, &oldpath, &newpath).await.map_err(|e| e.wire_status())?;
        Ok(ok_status(id))
    }

    async fn mkdir(&mut self, _id: u32, path: String, _attrs: FileAttributes) -> Result<Status, Self::Error> {
        touch(&self.ctx);
        Err(router::mkdir(&self.ctx, &path).wire_status())
    }

    async fn rmdir(&mut self, _id: u32, path: String) -> Result<Status, Self::Error> {
        touch(&self.ctx);
        Err(router::rmdir(&self.ctx, &path).wire_status())
    }

    async fn stat(&mut self, id: u32, path: String) -> Result<Attrs, Self::Error> {
        touch(&self.ctx);
        let kind = router::stat(&self.ctx, &path).await.map_err(|e: EngineError| e.wire_status())?;
        Ok(Attrs {
            id,
            attrs: path_kind_to_attrs(&kind),
        })
    }

    async fn lstat(&mut self, id: u32, path: String) -> Result<Attrs, Self::Error> {
        self.stat(id, path).await
    }

    async fn realpath(&mut self, id: u32, path: String) -> Result<Name, Self::Error> {
        touch(&self.ctx);
        let canonical = router::realpath(&self.ctx, &path).await.map_err(|e| e.wire_status())?;
        Ok(Name {
            id,
            files: vec![SftpFile {
                filename: canonical,
                longname: String::new(),
                attrs: FileAttributes::default(),
            }],
        })
    }
}
