//! Namespace View: materializes a hierarchical directory listing out of a flat LIST
//! result. Kept as a pure function with no I/O so the listing rules are exhaustively
//! unit-testable.

use crate::store::ObjectMeta;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub kind: EntryKind,
    pub size: u64,
    pub modified_ms: i64,
}

/// Produces the set of entries visible immediately under `prefix`, given every object key
/// sharing that prefix. `prefix` must not have a trailing slash (use `""` for the store root).
pub fn list_entries(prefix: &str, objects: &[ObjectMeta]) -> Vec<Entry> {
    let mut entries: HashMap<String, Entry> = HashMap::new();

    for obj in objects {
        let Some(rel) = obj.key.strip_prefix(prefix) else {
            continue;
        };
        if rel == "/.dir" {
            continue;
        }
        let Some(after_slash) = rel.strip_prefix('/') else {
            continue;
        };
        if after_slash.is_empty() {
            continue;
        }

        let segments: Vec<&str> = after_slash.split('/').collect();

        if after_slash.ends_with("/.directory") {
            upsert(&mut entries, segments[0], EntryKind::Directory, obj);
        } else if segments.len() == 1 {
            upsert(&mut entries, segments[0], EntryKind::File, obj);
        } else {
            let child = segments[0];
            let nested_prefix = format!("{}/{}/", prefix, child);
            let inferred = objects.iter().any(|o| o.key.starts_with(&nested_prefix));
            if inferred {
                upsert(&mut entries, child, EntryKind::Directory, obj);
            }
        }
    }

    let mut out: Vec<Entry> = entries.into_values().collect();
    out.sort_by(|a, b| a.name.cmp(&b.name));
    out
}

fn upsert(entries: &mut HashMap<String, Entry>, name: &str, kind: EntryKind, obj: &ObjectMeta) {
    entries
        .entry(name.to_string())
        .and_modify(|existing| match kind {
            EntryKind::Directory => {
                existing.kind = EntryKind::Directory;
                existing.size = 0;
                existing.modified_ms = existing.modified_ms.max(obj.last_modified_ms);
            }
            EntryKind::File => {
                if existing.kind == EntryKind::File {
                    existing.size = obj.size;
                    existing.modified_ms = obj.last_modified_ms;
                }
            }
        })
        .or_insert_with(|| Entry {
            name: name.to_string(),
            kind,
            size: if kind == EntryKind::File { obj.size } else { 0 },
            modified_ms: obj.last_modified_ms,
        });
}

/// The three synthetic entries shown at the root of a user's view, shadowing whatever a
/// real LIST at that prefix would have returned.
pub fn synthesize_root(username: &str, now_ms: i64) -> Vec<Entry> {
    vec![
        Entry {
            name: username.to_string(),
            kind: EntryKind::Directory,
            size: 0,
            modified_ms: now_ms,
        },
        Entry {
            name: "ledgers".to_string(),
            kind: EntryKind::Directory,
            size: 0,
            modified_ms: now_ms,
        },
        Entry {
            name: "invoices".to_string(),
            kind: EntryKind::Directory,
            size: 0,
            modified_ms: now_ms,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(key: &str, size: u64) -> ObjectMeta {
        ObjectMeta {
            key: key.to_string(),
            size,
            last_modified_ms: 1,
            etag: None,
        }
    }

    #[test]
    fn plain_files_are_listed() {
        let objs = vec![meta("home/a.txt", 10), meta("home/b.txt", 20)];
        let entries = list_entries("home", &objs);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "a.txt");
        assert_eq!(entries[0].kind, EntryKind::File);
        assert_eq!(entries[0].size, 10);
    }

    #[test]
    fn legacy_dir_marker_is_ignored() {
        let objs = vec![meta("home/.dir", 0), meta("home/a.txt", 5)];
        let entries = list_entries("home", &objs);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "a.txt");
    }

    #[test]
    fn directory_marker_surfaces_parent_as_directory() {
        let objs = vec![meta("home/sub/.directory", 0)];
        let entries = list_entries("home", &objs);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "sub");
        assert_eq!(entries[0].kind, EntryKind::Directory);
    }

    #[test]
    fn inferred_directory_from_nested_key_without_marker() {
        let objs = vec![meta("home/sub/file.txt", 5)];
        let entries = list_entries("home", &objs);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "sub");
        assert_eq!(entries[0].kind, EntryKind::Directory);
    }

    #[test]
    fn directory_marker_wins_over_same_named_file_regardless_of_order() {
        let objs = vec![meta("home/sub", 3), meta("home/sub/.directory", 0)];
        let entries = list_entries("home", &objs);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, EntryKind::Directory);

        let objs_reversed = vec![meta("home/sub/.directory", 0), meta("home/sub", 3)];
        let entries_reversed = list_entries("home", &objs_reversed);
        assert_eq!(entries_reversed.len(), 1);
        assert_eq!(entries_reversed[0].kind, EntryKind::Directory);
    }

    #[test]
    fn mixed_real_and_inferred_directories_deduplicate_by_name() {
        let objs = vec![
            meta("home/sub/a.txt", 1),
            meta("home/sub/b.txt", 2),
            meta("home/sub/.directory", 0),
            meta("home/other.txt", 3),
        ];
        let entries = list_entries("home", &objs);
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["other.txt", "sub"]);
        assert_eq!(entries.iter().find(|e| e.name == "sub").unwrap().kind, EntryKind::Directory);
    }

    #[test]
    fn deeply_nested_marker_still_surfaces_top_level_child() {
        let objs = vec![meta("home/a/b/.directory", 0), meta("home/a/b/c.txt", 1)];
        let entries = list_entries("home", &objs);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "a");
        assert_eq!(entries[0].kind, EntryKind::Directory);
    }

    #[test]
    fn keys_outside_prefix_are_ignored() {
        let objs = vec![meta("other/a.txt", 1)];
        let entries = list_entries("home", &objs);
        assert!(entries.is_empty());
    }

    #[test]
    fn exact_prefix_match_with_no_remainder_is_ignored() {
        let objs = vec![meta("home", 0)];
        let entries = list_entries("home", &objs);
        assert!(entries.is_empty());
    }

    #[test]
    fn root_synthesis_returns_three_fixed_entries() {
        let entries = synthesize_root("alice", 1000);
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["alice", "ledgers", "invoices"]);
        assert!(entries.iter().all(|e| e.kind == EntryKind::Directory));
    }
}
