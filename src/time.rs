//! Wall-clock helper shared by the upload clock, idle timers, and directory-listing
//! timestamps — one spot so nothing reaches for `SystemTime` ad hoc.

use std::time::{SystemTime, UNIX_EPOCH};

pub fn now_ms() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or(0)
}
