//! Shared scaffolding for the integration tests, mirroring the role of `libunftp`'s own
//! `tests/common.rs`: one place to build a ready-to-use engine instance instead of
//! repeating setup in every test file.

use std::sync::Arc;
use std::time::Duration;

use vaultfs_sftp::auth::User;
use vaultfs_sftp::events::EventBus;
use vaultfs_sftp::server::router::RequestContext;
use vaultfs_sftp::session::SessionManager;
use vaultfs_sftp::store::{MemoryStore, ObjectStore};
use vaultfs_sftp::upload::UploadClock;

const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Builds a [`RequestContext`] for `username` backed by a fresh, empty in-memory store.
#[allow(dead_code)]
pub fn context_for(username: &str) -> RequestContext {
    let events = EventBus::new();
    let sessions = Arc::new(SessionManager::new(IDLE_TIMEOUT, events.clone()));
    sessions.register(username, 0);
    RequestContext {
        store: Arc::new(MemoryStore::new()) as Arc<dyn ObjectStore>,
        sessions,
        events,
        upload_clock: Arc::new(UploadClock::new()),
        user: User::new(username, "users"),
    }
}

/// Builds a [`RequestContext`] sharing the given store, for tests that need to seed data
/// or inspect it after the fact.
#[allow(dead_code)]
pub fn context_with_store(username: &str, store: Arc<dyn ObjectStore>) -> RequestContext {
    let events = EventBus::new();
    let sessions = Arc::new(SessionManager::new(IDLE_TIMEOUT, events.clone()));
    sessions.register(username, 0);
    RequestContext {
        store,
        sessions,
        events,
        upload_clock: Arc::new(UploadClock::new()),
        user: User::new(username, "users"),
    }
}
