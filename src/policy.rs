//! Access Policy: path allow-list, file-type policy, and protected-path policy.
//!
//! All three checks are pure functions of `(username, path)` plus configuration, grounded
//! on the same "check everything before touching the backend" shape as `libunftp`'s
//! `StoragePermissions` bitflags (`auth/user.rs`), generalized from a static bitmask to the
//! path-sensitive rules this system needs.

use crate::path::ALIASED_DIRS;

/// The per-user path allow-list. Defaults to `['/', '/ledgers', '/invoices']`.
#[derive(Debug, Clone)]
pub struct PathAllowList {
    prefixes: Vec<String>,
}

impl Default for PathAllowList {
    fn default() -> Self {
        PathAllowList {
            prefixes: vec!["/".to_string(), "/ledgers".to_string(), "/invoices".to_string()],
        }
    }
}

impl PathAllowList {
    pub fn new(prefixes: Vec<String>) -> Self {
        PathAllowList { prefixes }
    }

    /// Whether `path` (already normalized) is within this user's scope.
    pub fn admits(&self, username: &str, path: &str) -> bool {
        let own_home = format!("/{}", username);
        for prefix in &self.prefixes {
            if path == prefix || path.starts_with(&format!("{}/", prefix)) {
                return true;
            }
        }
        if path == own_home || path.starts_with(&format!("{}/", own_home)) {
            return true;
        }
        // Root-level single-segment path, e.g. "/photo.jpg" or "/archive" — dropped straight
        // into the user's home by the path mapper's fallback join.
        if path != "/" {
            let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
            if segments.len() == 1 {
                return true;
            }
        }
        false
    }
}

/// Whether `virtual_path` names a file inside a protected (`ledgers`/`invoices`) subtree,
/// at either top level or under the caller's own home.
fn is_under_protected_dir(username: &str, virtual_path: &str) -> bool {
    for alias in ALIASED_DIRS {
        let top = format!("/{}", alias);
        let home = format!("/{}/{}", username, alias);
        if virtual_path == top || virtual_path.starts_with(&format!("{}/", top)) {
            return true;
        }
        if virtual_path == home || virtual_path.starts_with(&format!("{}/", home)) {
            return true;
        }
    }
    false
}

/// An OPEN-for-write under `/ledgers` or `/invoices` is only permitted for `.pdf` files;
/// writing straight to the directory itself (no filename) is always rejected.
pub fn file_type_allowed(username: &str, virtual_path: &str) -> bool {
    if !is_under_protected_dir(username, virtual_path) {
        return true;
    }
    match virtual_path.rsplit('/').next() {
        Some(name) if !name.is_empty() => name.to_lowercase().ends_with(".pdf"),
        _ => false,
    }
}

/// REMOVE/RENAME/MKDIR/RMDIR targeting a protected path (or its `.directory` marker) must
/// always be rejected. MKDIR/RMDIR are unconditionally protected regardless of path.
pub fn is_protected_path(username: &str, virtual_path: &str) -> bool {
    let trimmed = virtual_path.strip_suffix("/.directory").unwrap_or(virtual_path);
    is_under_protected_dir(username, trimmed) && is_exactly_protected_root(username, trimmed)
}

fn is_exactly_protected_root(username: &str, virtual_path: &str) -> bool {
    for alias in ALIASED_DIRS {
        let top = format!("/{}", alias);
        let home = format!("/{}/{}", username, alias);
        if virtual_path == top || virtual_path == home {
            return true;
        }
    }
    false
}
