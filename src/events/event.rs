//! The closed set of observable events this system emits, per the external-interfaces
//! contract: every verb that can succeed, fail, or be blocked has a distinct variant so
//! subscribers never have to string-match a message.

#[derive(Debug, Clone)]
pub enum Event {
    Login {
        username: String,
    },
    ClientError {
        username: Option<String>,
        message: String,
    },
    ClientDisconnected {
        username: String,
        cause: String,
    },
    FileUploaded {
        username: String,
        virtual_path: String,
        bytes: u64,
    },
    UploadError {
        username: String,
        virtual_path: String,
        reason: String,
    },
    FileDownloaded {
        username: String,
        virtual_path: String,
        bytes: u64,
    },
    FileDeleted {
        username: String,
        virtual_path: String,
    },
    FileRenamed {
        username: String,
        from: String,
        to: String,
    },
    DirectoryCreated {
        username: String,
        virtual_path: String,
    },
    DirectoryDeleted {
        username: String,
        virtual_path: String,
    },
    DirectoryChanged {
        username: String,
        virtual_path: String,
    },
    DirectoryCreationBlocked {
        username: String,
        virtual_path: String,
    },
    DirectoryDeletionBlocked {
        username: String,
        virtual_path: String,
    },
    ProtectedDirectoryDeletionBlocked {
        username: String,
        virtual_path: String,
    },
    ProtectedDirectoryRenameBlocked {
        username: String,
        virtual_path: String,
    },
    UserIdle {
        username: String,
        since_ms: i64,
    },
}

impl Event {
    /// A short, stable label for metrics and log lines — never the `Debug` form, which
    /// includes the (potentially large) path payload.
    pub fn label(&self) -> &'static str {
        match self {
            Event::Login { .. } => "login",
            Event::ClientError { .. } => "client-error",
            Event::ClientDisconnected { .. } => "client-disconnected",
            Event::FileUploaded { .. } => "file-uploaded",
            Event::UploadError { .. } => "upload-error",
            Event::FileDownloaded { .. } => "file-downloaded",
            Event::FileDeleted { .. } => "file-deleted",
            Event::FileRenamed { .. } => "file-renamed",
            Event::DirectoryCreated { .. } => "directory-created",
            Event::DirectoryDeleted { .. } => "directory-deleted",
            Event::DirectoryChanged { .. } => "directory-changed",
            Event::DirectoryCreationBlocked { .. } => "directory-creation-blocked",
            Event::DirectoryDeletionBlocked { .. } => "directory-deletion-blocked",
            Event::ProtectedDirectoryDeletionBlocked { .. } => "protected-directory-deletion-blocked",
            Event::ProtectedDirectoryRenameBlocked { .. } => "protected-directory-rename-blocked",
            Event::UserIdle { .. } => "user-idle",
        }
    }
}

/// The built-in event-bus subscriber that logs every event as a `tracing` span.
#[derive(Debug, Default)]
pub struct TracingListener;

#[async_trait::async_trait]
impl super::EventListener for TracingListener {
    async fn handle(&self, event: std::sync::Arc<Event>) {
        match &*event {
            Event::ClientError { username, message } => {
                tracing::warn!(username = ?username, message, "client error")
            }
            Event::UploadError { username, virtual_path, reason } => {
                tracing::warn!(username, virtual_path, reason, "upload failed")
            }
            Event::DirectoryCreationBlocked { username, virtual_path }
            | Event::DirectoryDeletionBlocked { username, virtual_path }
            | Event::ProtectedDirectoryDeletionBlocked { username, virtual_path }
            | Event::ProtectedDirectoryRenameBlocked { username, virtual_path } => {
                tracing::warn!(username, virtual_path, label = event.label(), "blocked action")
            }
            other => tracing::info!(label = other.label(), "event"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_is_stable_for_every_variant() {
        let event = Event::FileUploaded {
            username: "alice".into(),
            virtual_path: "/ledgers/q1.pdf".into(),
            bytes: 42,
        };
        assert_eq!(event.label(), "file-uploaded");
    }
}
