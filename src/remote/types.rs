use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Object kind as exposed to admin clients. `Dir` orders before `File`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Dir,
    File,
}

/// One object from a recursive tree snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeItem {
    pub path: String,
    pub kind: EntryKind,
}

impl TreeItem {
    pub fn file(path: impl Into<String>) -> Self { Self { path: path.into(), kind: EntryKind::File } }
    pub fn dir(path: impl Into<String>) -> Self { Self { path: path.into(), kind: EntryKind::Dir } }
}

/// Immediate child of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Version token required to overwrite or delete this object.
    pub sha: String,
    #[serde(default)]
    pub download_url: Option<String>,
    /// Public proxy URL; only image files carry one.
    #[serde(default)]
    pub url: Option<String>,
}

/// Locale-style name order: letters compare case-insensitively first, then lowercase sorts
/// before uppercase at the first case difference, then raw code points break any remaining tie.
pub fn collate_names(a: &str, b: &str) -> Ordering {
    let folded = |s: &str| s.chars().flat_map(char::to_lowercase).collect::<Vec<char>>();
    folded(a)
        .cmp(&folded(b))
        .then_with(|| a.chars().map(char::is_uppercase).cmp(b.chars().map(char::is_uppercase)))
        .then_with(|| a.cmp(b))
}

/// Directories first, then by name in locale-style order (`collate_names`).
pub fn sort_entries(entries: &mut [DirectoryEntry]) {
    entries.sort_by(|a, b| a.kind.cmp(&b.kind).then_with(|| collate_names(&a.name, &b.name)));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, kind: EntryKind) -> DirectoryEntry {
        DirectoryEntry { name: name.into(), path: name.into(), kind, sha: "s".into(), download_url: None, url: None }
    }

    #[test]
    fn dirs_precede_files_then_names_ascend() {
        let mut v = vec![
            entry("b.png", EntryKind::File),
            entry("A", EntryKind::Dir),
            entry("a.png", EntryKind::File),
            entry("Z", EntryKind::Dir),
        ];
        sort_entries(&mut v);
        let names: Vec<&str> = v.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["A", "Z", "a.png", "b.png"]);
    }

    #[test]
    fn names_ignore_case_before_breaking_ties_lowercase_first() {
        let mut v = vec![
            entry("c.png", EntryKind::File),
            entry("B.png", EntryKind::File),
            entry("a.png", EntryKind::File),
            entry("photos", EntryKind::Dir),
            entry("Archive", EntryKind::Dir),
            entry("A.png", EntryKind::File),
        ];
        sort_entries(&mut v);
        let names: Vec<&str> = v.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Archive", "photos", "a.png", "A.png", "B.png", "c.png"]);
    }

    #[test]
    fn collation_ties_and_prefixes() {
        assert_eq!(collate_names("a", "a"), Ordering::Equal);
        assert_eq!(collate_names("ab", "B"), Ordering::Less);
        assert_eq!(collate_names("img", "IMG2"), Ordering::Less);
        assert_eq!(collate_names("Zoo", "apple"), Ordering::Greater);
    }

    #[test]
    fn kind_serializes_as_type_field() {
        let v = serde_json::to_value(entry("x", EntryKind::Dir)).unwrap();
        assert_eq!(v["type"], "dir");
        assert!(v.get("kind").is_none());
        assert!(v["url"].is_null());
    }
}
