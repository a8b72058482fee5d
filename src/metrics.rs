//! Prometheus counters and gauges, scoped to the SFTP verbs and object-store operations this
//! system has. Follows the shape of `libunftp`'s own `metrics.rs`: a `lazy_static!`
//! registration block plus a handful of `add_*`/`inc_*` functions the rest of the crate calls.

use crate::events::{Event, EventListener};
use async_trait::async_trait;
use lazy_static::lazy_static;
use prometheus::{opts, register_int_counter, register_int_counter_vec, register_int_gauge, IntCounter, IntCounterVec, IntGauge};
use std::sync::Arc;

lazy_static! {
    static ref SFTP_SESSIONS: IntGauge = register_int_gauge!(opts!("sftp_sessions_total", "Currently connected SFTP sessions.")).unwrap();
    static ref SFTP_AUTH_FAILURES: IntCounter =
        register_int_counter!(opts!("sftp_auth_failures_total", "Total authentication failures.")).unwrap();
    static ref SFTP_BACKEND_WRITE_BYTES: IntCounter =
        register_int_counter!(opts!("sftp_backend_write_bytes_total", "Total bytes PUT to the object store.")).unwrap();
    static ref SFTP_BACKEND_READ_BYTES: IntCounter =
        register_int_counter!(opts!("sftp_backend_read_bytes_total", "Total bytes GET from the object store.")).unwrap();
    static ref SFTP_BACKEND_UPLOADS: IntCounter = register_int_counter!(opts!("sftp_backend_uploads_total", "Total completed uploads.")).unwrap();
    static ref SFTP_BACKEND_DOWNLOADS: IntCounter =
        register_int_counter!(opts!("sftp_backend_downloads_total", "Total completed downloads.")).unwrap();
    static ref SFTP_EVENT_TOTAL: IntCounterVec = register_int_counter_vec!("sftp_event_total", "Total events emitted, by label.", &["event"]).unwrap();
    static ref SFTP_COMMAND_TOTAL: IntCounterVec = register_int_counter_vec!("sftp_command_total", "Total SFTP verbs received.", &["verb"]).unwrap();
}

/// Call once per successful authentication.
pub fn inc_session() {
    SFTP_SESSIONS.inc();
}

/// Call once per session teardown.
pub fn dec_session() {
    SFTP_SESSIONS.dec();
}

pub fn inc_auth_failure() {
    SFTP_AUTH_FAILURES.inc();
}

pub fn add_command_metric(verb: &str) {
    SFTP_COMMAND_TOTAL.with_label_values(&[verb]).inc();
}

/// Updates the byte/object counters implied by `event`, and bumps the per-label total.
pub fn add_event_metric(event: &Event) {
    SFTP_EVENT_TOTAL.with_label_values(&[event.label()]).inc();
    match event {
        Event::FileUploaded { bytes, .. } => {
            SFTP_BACKEND_WRITE_BYTES.inc_by(*bytes);
            SFTP_BACKEND_UPLOADS.inc();
        }
        Event::FileDownloaded { bytes, .. } => {
            SFTP_BACKEND_READ_BYTES.inc_by(*bytes);
            SFTP_BACKEND_DOWNLOADS.inc();
        }
        _ => {}
    }
}

/// The built-in event-bus subscriber that keeps the counters above up to date.
#[derive(Debug, Default)]
pub struct MetricsListener;

#[async_trait]
impl EventListener for MetricsListener {
    async fn handle(&self, event: Arc<Event>) {
        add_event_metric(&event);
    }
}

