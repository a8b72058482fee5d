//! Path Mapper: bidirectional mapping between SFTP virtual paths and object-store keys.

/// The two virtual top-level names that transparently redirect into a user's home subtree.
pub const ALIASED_DIRS: [&str; 2] = ["ledgers", "invoices"];

/// Normalizes a client-supplied path: backslashes become slashes, repeated slashes collapse,
/// `.` segments are dropped, and the result always starts with `/`.
///
/// `..` segments that would climb above the root are rejected, since the caller has no
/// directory above `/` to climb into.
pub fn normalize(raw: &str) -> Result<String, PathError> {
    let raw = raw.replace('\\', "/");
    let mut stack: Vec<&str> = Vec::new();
    for segment in raw.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                if stack.pop().is_none() {
                    return Err(PathError::EscapesRoot);
                }
            }
            s => stack.push(s),
        }
    }
    if stack.is_empty() {
        Ok("/".to_string())
    } else {
        Ok(format!("/{}", stack.join("/")))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("path escapes the root")]
    EscapesRoot,
}

/// Maps a normalized virtual path onto an object-store key, applying the `ledgers`/`invoices`
/// virtual-alias rule before falling back to a straight prefix join.
pub fn map_to_key(home_prefix: &str, virtual_path: &str) -> String {
    for alias in ALIASED_DIRS {
        let marker = format!("/{}", alias);
        if virtual_path == marker || virtual_path.starts_with(&format!("{}/", marker)) {
            return format!("{}{}", home_prefix, virtual_path);
        }
    }
    format!("{}{}", home_prefix, virtual_path)
}

/// Strips `under` from the front of `key` and returns the remainder, for display purposes.
/// Returns `None` if `key` does not actually live under `under`.
pub fn relative_to<'a>(key: &'a str, under: &str) -> Option<&'a str> {
    key.strip_prefix(under)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_backslashes() {
        assert_eq!(normalize(r"a\b\c").unwrap(), "/a/b/c");
    }

    #[test]
    fn collapses_repeated_slashes_and_dot_segments() {
        assert_eq!(normalize("//a//./b/").unwrap(), "/a/b");
    }

    #[test]
    fn empty_input_is_root() {
        assert_eq!(normalize("").unwrap(), "/");
        assert_eq!(normalize("/").unwrap(), "/");
    }

    #[test]
    fn dot_dot_above_root_is_rejected() {
        assert!(normalize("/a/../..").is_err());
    }

    #[test]
    fn dot_dot_within_path_resolves() {
        assert_eq!(normalize("/a/b/../c").unwrap(), "/a/c");
    }

    #[test]
    fn alias_redirects_into_home_prefix() {
        assert_eq!(map_to_key("users/alice", "/ledgers/q1.pdf"), "users/alice/ledgers/q1.pdf");
        assert_eq!(map_to_key("users/alice", "/invoices"), "users/alice/invoices");
    }

    #[test]
    fn non_alias_path_joins_directly() {
        assert_eq!(map_to_key("users/alice", "/photo.jpg"), "users/alice/photo.jpg");
    }

    #[test]
    fn alias_prefix_without_slash_does_not_match() {
        // "/ledgersx" must not be treated as the "ledgers" alias.
        assert_eq!(map_to_key("users/alice", "/ledgersx"), "users/alice/ledgersx");
    }
}
