//! Virtual-root synthesis shadows any real objects at that level, READDIR is idempotent
//! (entries once, then EOF), and idle sessions fire exactly one `UserIdle` event per idle
//! window.

pub mod common;

use std::time::Duration;

use vaultfs_sftp::auth::User;
use vaultfs_sftp::events::{Event, EventBus, EventListener};
use vaultfs_sftp::handles::HandleTable;
use vaultfs_sftp::server::router::{self, RequestContext};
use vaultfs_sftp::server::sftp_handler::SftpConnectionHandler;
use vaultfs_sftp::session::SessionManager;
use vaultfs_sftp::store::{MemoryStore, ObjectStore};
use vaultfs_sftp::upload::UploadClock;
use russh_sftp::server::Handler as SftpHandlerTrait;
use std::sync::{Arc, Mutex};

#[tokio::test]
async fn root_listing_always_synthesizes_the_three_fixed_entries() {
    let ctx = common::context_for("alice");
    // Seed an object that, if taken literally, would suggest a different root listing.
    ctx.store.put("users/alice/decoy/.directory", "marker".into()).await.unwrap();

    let mut handles = HandleTable::new();
    let dh = router::opendir(&ctx, &mut handles, "/").await.unwrap();
    let entries = router::readdir(&mut handles, &dh).unwrap().expect("entries on first call");
    let mut names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    names.sort();
    assert_eq!(names, vec!["alice", "invoices", "ledgers"]);
}

#[tokio::test]
async fn readdir_is_idempotent_entries_then_eof() {
    let ctx = common::context_for("alice");
    let mut handles = HandleTable::new();
    let dh = router::opendir(&ctx, &mut handles, "/").await.unwrap();

    assert!(router::readdir(&mut handles, &dh).unwrap().is_some());
    assert!(router::readdir(&mut handles, &dh).unwrap().is_none());
    assert!(router::readdir(&mut handles, &dh).unwrap().is_none());
}

#[derive(Debug, Default)]
struct RecordingListener {
    idle_events: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl EventListener for RecordingListener {
    async fn handle(&self, event: Arc<Event>) {
        if let Event::UserIdle { username, .. } = event.as_ref() {
            self.idle_events.lock().unwrap().push(username.clone());
        }
    }
}

#[tokio::test(start_paused = true)]
async fn idle_session_fires_exactly_one_event_per_window() {
    let events = EventBus::new();
    let listener = Arc::new(RecordingListener::default());
    events.subscribe(listener.clone());

    let manager = SessionManager::new(Duration::from_millis(50), events);
    manager.register("alice", 0);
    tokio::task::yield_now().await;

    tokio::time::advance(Duration::from_millis(200)).await;
    tokio::task::yield_now().await;

    let fired = listener.idle_events.lock().unwrap().clone();
    assert_eq!(fired, vec!["alice".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn repeated_requests_keep_an_idle_session_alive() {
    let events = EventBus::new();
    let listener = Arc::new(RecordingListener::default());
    events.subscribe(listener.clone());

    let sessions = Arc::new(SessionManager::new(Duration::from_millis(100), events.clone()));
    sessions.register("alice", 0);

    let ctx = RequestContext {
        store: Arc::new(MemoryStore::new()),
        events,
        upload_clock: Arc::new(UploadClock::new()),
        sessions,
        user: User::new("alice", "users"),
    };
    let mut handler = SftpConnectionHandler::new(ctx);

    for _ in 0..5 {
        tokio::time::advance(Duration::from_millis(60)).await;
        tokio::task::yield_now().await;
        handler.stat(1, "/".to_string()).await.unwrap();
    }

    // Total elapsed (300ms) exceeds the 100ms idle window, but every STAT rearmed the
    // timer within the window, so no UserIdle event should have fired yet.
    assert!(listener.idle_events.lock().unwrap().is_empty());

    tokio::time::advance(Duration::from_millis(150)).await;
    tokio::task::yield_now().await;
    assert_eq!(listener.idle_events.lock().unwrap().clone(), vec!["alice".to_string()]);
}
