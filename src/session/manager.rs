//! Session & Idle Manager. The registry and idle-timer map are shared across the
//! acceptor and every session task — `dashmap` gives concurrent access without a single
//! coarse lock, the same reason `libunftp`'s proxy-protocol connection table uses it —
//! while each session's own handle table stays private to its task.

use crate::events::{Event, EventBus};
use crate::metrics;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::debug;

struct SessionEntry {
    last_activity_ms: i64,
    idle_timer: Option<JoinHandle<()>>,
    /// Signaled by `force_disconnect`/`disconnect_all`; the connection task selects on
    /// this to know when to tear down.
    disconnect: Arc<Notify>,
}

/// Tracks every authenticated session by username, enforcing at most one idle timer per
/// user at any time.
pub struct SessionManager {
    sessions: DashMap<String, SessionEntry>,
    idle_timeout: Duration,
    events: EventBus,
}

impl SessionManager {
    pub fn new(idle_timeout: Duration, events: EventBus) -> Self {
        SessionManager {
            sessions: DashMap::new(),
            idle_timeout,
            events,
        }
    }

    /// Registers a freshly authenticated user and returns the `Notify` the connection
    /// task should select on to detect a forced disconnect.
    pub fn register(&self, username: &str, now_ms: i64) -> Arc<Notify> {
        let disconnect = Arc::new(Notify::new());
        self.sessions.insert(
            username.to_string(),
            SessionEntry {
                last_activity_ms: now_ms,
                idle_timer: None,
                disconnect: disconnect.clone(),
            },
        );
        metrics::inc_session();
        self.events.emit(Event::Login {
            username: username.to_string(),
        });
        self.record_activity(username, now_ms);
        disconnect
    }

    /// Cancels any existing idle timer, arms a fresh one, and bumps `last_activity_ms`.
    pub fn record_activity(&self, username: &str, now_ms: i64) {
        let Some(mut entry) = self.sessions.get_mut(username) else {
            return;
        };
        if let Some(old) = entry.idle_timer.take() {
            old.abort();
        }
        entry.last_activity_ms = now_ms;

        let events = self.events.clone();
        let timeout = self.idle_timeout;
        let username = username.to_string();
        entry.idle_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            events.emit(Event::UserIdle {
                username,
                since_ms: now_ms,
            });
        }));
    }

    /// Ends the session: clears the idle timer, removes tracking, emits the disconnect event.
    pub fn end_session(&self, username: &str, cause: &str) {
        if let Some((_, entry)) = self.sessions.remove(username) {
            if let Some(timer) = entry.idle_timer {
                timer.abort();
            }
            metrics::dec_session();
            self.events.emit(Event::ClientDisconnected {
                username: username.to_string(),
                cause: cause.to_string(),
            });
            debug!(username, cause, "session ended");
        }
    }

    /// Signals the matching session's connection task to close, then cleans up tracking.
    pub fn force_disconnect(&self, username: &str) {
        if let Some(entry) = self.sessions.get(username) {
            entry.disconnect.notify_waiters();
        }
        self.end_session(username, "forced");
    }

    /// Signals and cleans up every currently tracked session.
    pub fn disconnect_all(&self) {
        let usernames: Vec<String> = self.sessions.iter().map(|e| e.key().clone()).collect();
        for username in usernames {
            self.force_disconnect(&username);
        }
    }

    pub fn is_active(&self, username: &str) -> bool {
        self.sessions.contains_key(username)
    }
}
