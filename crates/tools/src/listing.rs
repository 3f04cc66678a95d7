//! Directory listing: the tree behind `FILE list`.
//!
//! A listing is built in three passes:
//! 1. a depth-first walk that records kind and size for every entry (and
//!    file content when requested), descending only in recursive mode;
//! 2. a recursive strip of every field the caller disabled;
//! 3. replacement of empty child maps by a sentinel when content is on.
//!
//! The walk never follows symlinked directories and stops descending after
//! [`MAX_DEPTH`] levels, so cyclic or very deep trees cannot run away. A
//! link whose target lies outside the sandbox root is reported like a
//! broken one: no size, no content.

use std::collections::BTreeMap;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;

/// Deepest directory level the walk will descend into.
pub const MAX_DEPTH: usize = 64;

/// Reported instead of `{}` for an empty directory when content is listed.
pub const EMPTY_DIRECTORY: &str = "Directory is empty.";

/// Reported for a nested directory that could not be read.
pub const UNLISTABLE_DIRECTORY: &str = "Cannot list directory.";

/// Placeholder for file content that is not valid UTF-8 or cannot be read.
pub const UNREADABLE_CONTENT: &str = "Non readable content";

/// Appended to content cut at the length limit.
pub const TRUNCATION_MARKER: &str = "...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListMode {
    /// `ls`: immediate children only
    Shallow,
    /// `lsc`: the whole subtree
    Recursive,
}

impl FromStr for ListMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "ls" => Ok(ListMode::Shallow),
            "lsc" => Ok(ListMode::Recursive),
            other => Err(other.to_string()),
        }
    }
}

/// Which fields a listing reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListFields {
    pub include_size: bool,
    pub include_type: bool,
    pub include_content: bool,
    /// Maximum content length in characters; 0 means unlimited
    pub max_len: usize,
}

impl ListFields {
    /// Parse the model's 4-tuple, e.g. `[True, False, True, 100]`.
    ///
    /// Booleans accept `true`/`false`/`1`/`0` in any case; brackets and
    /// surrounding quotes are optional.
    pub fn parse(input: &str) -> Result<Self, String> {
        let inner = input
            .trim()
            .trim_start_matches('[')
            .trim_end_matches(']')
            .trim();
        let items: Vec<&str> = inner.split(',').map(|s| s.trim().trim_matches('"')).collect();

        if items.len() != 4 {
            return Err(format!("expected 4 comma-separated values, got {}", items.len()));
        }

        Ok(Self {
            include_size: parse_flag(items[0])?,
            include_type: parse_flag(items[1])?,
            include_content: parse_flag(items[2])?,
            max_len: items[3]
                .parse()
                .map_err(|_| format!("'{}' is not a non-negative length", items[3]))?,
        })
    }
}

fn parse_flag(s: &str) -> Result<bool, String> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(format!("'{s}' is not a boolean")),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

/// The children of a directory: either entries by name, or a note.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Children {
    Entries(BTreeMap<String, DirectoryEntry>),
    Note(String),
}

/// One file or directory in a listing.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DirectoryEntry {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<EntryKind>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Children>,
}

/// A complete listing document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing {
    pub listed_path: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    pub children: Children,
}

/// List `dir` (which must be an existing directory below `root`).
pub fn build_listing(
    root: &Path,
    dir: &Path,
    listed_path: &str,
    mode: ListMode,
    fields: ListFields,
) -> std::io::Result<Listing> {
    let walker = Walker {
        root: root.canonicalize()?,
        mode,
        fields,
    };
    let (entries, total) = walker.walk(dir, 0)?;

    let mut listing = Listing {
        listed_path: listed_path.to_string(),
        size: Some(total),
        children: Children::Entries(entries),
    };
    strip_disabled(&mut listing, &fields);
    mark_empty(&mut listing.children, fields.include_content);
    Ok(listing)
}

struct Walker {
    /// Canonical sandbox root; links resolving elsewhere are not followed
    root: PathBuf,
    mode: ListMode,
    fields: ListFields,
}

impl Walker {
    fn walk(&self, dir: &Path, depth: usize) -> std::io::Result<(BTreeMap<String, DirectoryEntry>, u64)> {
        let mut entries = BTreeMap::new();
        let mut total = 0u64;

        for item in std::fs::read_dir(dir)? {
            let item = item?;
            let name = item.file_name().to_string_lossy().into_owned();
            let path = item.path();
            let link_meta = std::fs::symlink_metadata(&path)?;
            let is_link = link_meta.file_type().is_symlink();
            // Broken or escaping links are reported as unreadable files
            let meta = if is_link {
                self.link_target(&path)
            } else {
                Some(link_meta)
            };

            let entry = match meta {
                Some(m) if m.is_dir() => {
                    let (children, size) = if is_link {
                        (None, 0)
                    } else {
                        self.directory(&path, depth + 1)
                    };
                    total += size;
                    DirectoryEntry {
                        kind: Some(EntryKind::Directory),
                        size: Some(size),
                        content: None,
                        children,
                    }
                }
                Some(m) => {
                    total += m.len();
                    DirectoryEntry {
                        kind: Some(EntryKind::File),
                        size: Some(m.len()),
                        content: self.fields.include_content.then(|| self.read_content(&path)),
                        children: None,
                    }
                }
                None => DirectoryEntry {
                    kind: Some(EntryKind::File),
                    size: Some(0),
                    content: self
                        .fields
                        .include_content
                        .then(|| UNREADABLE_CONTENT.to_string()),
                    children: None,
                },
            };
            entries.insert(name, entry);
        }

        Ok((entries, total))
    }

    /// Children (when descending) and aggregate size of a subdirectory.
    fn directory(&self, path: &Path, depth: usize) -> (Option<Children>, u64) {
        if depth > MAX_DEPTH {
            tracing::warn!(path = %path.display(), "Listing depth limit reached");
            return (None, 0);
        }
        match self.mode {
            ListMode::Recursive => match self.walk(path, depth) {
                Ok((children, size)) => (Some(Children::Entries(children)), size),
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "Unlistable directory");
                    (Some(Children::Note(UNLISTABLE_DIRECTORY.into())), 0)
                }
            },
            ListMode::Shallow => (None, aggregate_size(path, depth)),
        }
    }

    /// Metadata of a link's target, if it exists and stays below the root.
    fn link_target(&self, link: &Path) -> Option<Metadata> {
        let target = std::fs::canonicalize(link).ok()?;
        if !target.starts_with(&self.root) {
            tracing::debug!(link = %link.display(), target = %target.display(), "Link leaves the sandbox, not followed");
            return None;
        }
        std::fs::metadata(&target).ok()
    }

    fn read_content(&self, path: &Path) -> String {
        match std::fs::read_to_string(path) {
            Ok(text) => truncate(text, self.fields.max_len),
            Err(_) => UNREADABLE_CONTENT.to_string(),
        }
    }
}

/// Sum of all file sizes below `dir`, skipping symlinks and unreadable parts.
fn aggregate_size(dir: &Path, depth: usize) -> u64 {
    if depth > MAX_DEPTH {
        return 0;
    }
    let Ok(read) = std::fs::read_dir(dir) else {
        return 0;
    };
    read.filter_map(Result::ok)
        .filter_map(|item| {
            let meta = std::fs::symlink_metadata(item.path()).ok()?;
            Some(if meta.is_dir() {
                aggregate_size(&item.path(), depth + 1)
            } else if meta.is_file() {
                meta.len()
            } else {
                0
            })
        })
        .sum()
}

fn truncate(text: String, max_len: usize) -> String {
    if max_len == 0 || text.chars().count() <= max_len {
        return text;
    }
    let mut cut: String = text.chars().take(max_len).collect();
    cut.push_str(TRUNCATION_MARKER);
    cut
}

/// Remove every disabled field, at every depth.
pub fn strip_disabled(listing: &mut Listing, fields: &ListFields) {
    if !fields.include_size {
        listing.size = None;
    }
    if let Children::Entries(entries) = &mut listing.children {
        for entry in entries.values_mut() {
            strip_entry(entry, fields);
        }
    }
}

fn strip_entry(entry: &mut DirectoryEntry, fields: &ListFields) {
    if !fields.include_size {
        entry.size = None;
    }
    if !fields.include_type {
        entry.kind = None;
    }
    if !fields.include_content {
        entry.content = None;
    }
    if let Some(Children::Entries(children)) = &mut entry.children {
        for child in children.values_mut() {
            strip_entry(child, fields);
        }
    }
}

fn mark_empty(children: &mut Children, include_content: bool) {
    if let Children::Entries(entries) = children {
        if entries.is_empty() {
            if include_content {
                *children = Children::Note(EMPTY_DIRECTORY.into());
            }
            return;
        }
        for entry in entries.values_mut() {
            if let Some(nested) = &mut entry.children {
                mark_empty(nested, include_content);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn all_fields() -> ListFields {
        ListFields {
            include_size: true,
            include_type: true,
            include_content: true,
            max_len: 0,
        }
    }

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "hello").unwrap();
        fs::create_dir_all(dir.path().join("sub/deep")).unwrap();
        fs::write(dir.path().join("sub/b.txt"), "0123456789").unwrap();
        fs::write(dir.path().join("sub/deep/c.txt"), "xyz").unwrap();
        dir
    }

    fn entries(children: &Children) -> &BTreeMap<String, DirectoryEntry> {
        match children {
            Children::Entries(e) => e,
            Children::Note(n) => panic!("expected entries, got note {n}"),
        }
    }

    #[test]
    fn mode_parsing() {
        assert_eq!("ls".parse::<ListMode>(), Ok(ListMode::Shallow));
        assert_eq!(" lsc ".parse::<ListMode>(), Ok(ListMode::Recursive));
        assert!("tree".parse::<ListMode>().is_err());
    }

    #[test]
    fn fields_parsing() {
        let f = ListFields::parse("[True, False, true, 100]").unwrap();
        assert!(f.include_size && !f.include_type && f.include_content);
        assert_eq!(f.max_len, 100);
        assert_eq!(ListFields::parse("0,1,0,0").unwrap().include_type, true);
        assert!(ListFields::parse("[True, False]").is_err());
        assert!(ListFields::parse("[yes, no, maybe, 1]").is_err());
        assert!(ListFields::parse("[True, True, True, -1]").is_err());
    }

    #[test]
    fn recursive_sizes_aggregate() {
        let dir = fixture();
        let listing = build_listing(dir.path(), dir.path(), ".", ListMode::Recursive, all_fields()).unwrap();
        assert_eq!(listing.size, Some(18));

        let top = entries(&listing.children);
        let sub = &top["sub"];
        assert_eq!(sub.kind, Some(EntryKind::Directory));
        assert_eq!(sub.size, Some(13));
        let deep = &entries(sub.children.as_ref().unwrap())["deep"];
        assert_eq!(deep.size, Some(3));
        assert_eq!(
            entries(deep.children.as_ref().unwrap())["c.txt"].content.as_deref(),
            Some("xyz")
        );
    }

    #[test]
    fn shallow_does_not_descend() {
        let dir = fixture();
        let listing = build_listing(dir.path(), dir.path(), ".", ListMode::Shallow, all_fields()).unwrap();
        let top = entries(&listing.children);
        assert_eq!(top.len(), 2);
        let sub = &top["sub"];
        assert_eq!(sub.kind, Some(EntryKind::Directory));
        assert_eq!(sub.size, Some(13));
        assert!(sub.children.is_none());
        assert_eq!(top["a.txt"].content.as_deref(), Some("hello"));
    }

    #[test]
    fn content_truncated_with_marker() {
        let dir = fixture();
        let fields = ListFields {
            max_len: 4,
            ..all_fields()
        };
        let listing = build_listing(dir.path(), &dir.path().join("sub"), "sub", ListMode::Shallow, fields).unwrap();
        assert_eq!(
            entries(&listing.children)["b.txt"].content.as_deref(),
            Some("0123...")
        );
    }

    #[test]
    fn unreadable_content_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bin.dat"), [0xff, 0xfe, 0x00, 0x80]).unwrap();
        let listing = build_listing(dir.path(), dir.path(), ".", ListMode::Shallow, all_fields()).unwrap();
        assert_eq!(
            entries(&listing.children)["bin.dat"].content.as_deref(),
            Some(UNREADABLE_CONTENT)
        );
    }

    #[test]
    fn disabled_fields_absent_at_every_depth() {
        let dir = fixture();
        let listing =
            build_listing(dir.path(), dir.path(), ".", ListMode::Recursive, ListFields::default()).unwrap();
        let json = serde_json::to_value(&listing).unwrap();

        fn check(value: &serde_json::Value) {
            if let Some(map) = value.as_object() {
                for key in ["size", "type", "content"] {
                    assert!(!map.contains_key(key), "found '{key}' in {map:?}");
                }
                for v in map.values() {
                    check(v);
                }
            }
        }
        check(&json);
        // structure is still there
        assert!(json["children"]["sub"]["children"]["deep"]["children"]["c.txt"].is_object());
    }

    #[test]
    fn empty_directory_sentinel_with_content() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("empty")).unwrap();

        let top_level = build_listing(dir.path(), &dir.path().join("empty"), "empty", ListMode::Shallow, all_fields()).unwrap();
        assert_eq!(top_level.children, Children::Note(EMPTY_DIRECTORY.into()));

        let nested = build_listing(dir.path(), dir.path(), ".", ListMode::Recursive, all_fields()).unwrap();
        assert_eq!(
            entries(&nested.children)["empty"].children,
            Some(Children::Note(EMPTY_DIRECTORY.into()))
        );
    }

    #[test]
    fn empty_directory_without_content_is_empty_map() {
        let dir = tempfile::tempdir().unwrap();
        let listing = build_listing(dir.path(), dir.path(), ".", ListMode::Shallow, ListFields::default()).unwrap();
        let json = serde_json::to_value(&listing).unwrap();
        assert_eq!(json["children"], serde_json::json!({}));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_cycle_not_followed() {
        let dir = fixture();
        std::os::unix::fs::symlink(dir.path(), dir.path().join("sub/loop")).unwrap();
        let listing = build_listing(dir.path(), dir.path(), ".", ListMode::Recursive, all_fields()).unwrap();
        let sub = &entries(&listing.children)["sub"];
        let link = &entries(sub.children.as_ref().unwrap())["loop"];
        assert_eq!(link.kind, Some(EntryKind::Directory));
        assert!(link.children.is_none());
    }
}
