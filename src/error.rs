//! The error taxonomy shared by every component, and its mapping onto SFTP wire status codes.

use russh_sftp::protocol::StatusCode;
use thiserror::Error;

/// Errors produced by the translation engine.
///
/// Every component returns one of these; [`EngineError::wire_status`] is the only
/// place that knows how to turn them into an SFTP [`StatusCode`].
#[derive(Debug, Error)]
pub enum EngineError {
    /// The requesting user's policy does not admit the path or operation.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The object (or a directory standing in for one) does not exist.
    #[error("no such file: {0}")]
    NotFound(String),

    /// An upload failed validation (empty body, wrong extension) or the underlying PUT failed.
    #[error("upload failed: {0}")]
    UploadFailed(String),

    /// A handle was unknown, or was the wrong kind (e.g. READ on a directory handle).
    #[error("bad handle")]
    BadHandle,

    /// The requested operation is never supported (MKDIR/RMDIR, unsupported flag combos).
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// The object store returned a failure that isn't one of the above, or a READ/READDIR
    /// ran past the end of available data.
    #[error("store error: {0}")]
    Store(#[from] crate::store::StoreError),
}

impl EngineError {
    /// Maps this error onto the SFTP v3 status code the client should see.
    pub fn wire_status(&self) -> StatusCode {
        match self {
            EngineError::PermissionDenied(_) => StatusCode::PermissionDenied,
            EngineError::NotFound(_) => StatusCode::NoSuchFile,
            EngineError::UploadFailed(_) => StatusCode::Failure,
            EngineError::BadHandle => StatusCode::Failure,
            EngineError::Unsupported(_) => StatusCode::OpUnsupported,
            EngineError::Store(e) if e.is_not_found() => StatusCode::NoSuchFile,
            EngineError::Store(_) => StatusCode::Failure,
        }
    }
}

/// Convenience alias used throughout the engine.
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_handle_maps_to_failure_not_bad_message() {
        assert_eq!(EngineError::BadHandle.wire_status(), StatusCode::Failure);
    }
}
