//! Hierarchical key-value store: a write-once tree in one JSON document.
//!
//! The document root is a JSON object. Strings are leaves, objects are
//! containers, and a `/`-separated path walks from the root. Nothing is ever
//! overwritten: writing to an existing name fails.
//!
//! Each operation loads the whole document, works on it, and (for writes)
//! saves it back pretty-printed. A mutex serializes those cycles so one
//! `Arc<KvStore>` can be shared by several agents in a process.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// One node of the stored tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoreNode {
    Leaf(String),
    Container(BTreeMap<String, StoreNode>),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Path not found.")]
    NotFound,

    #[error("Path already exists. Cannot overwrite.")]
    AlreadyExists,

    #[error("Path conflicts with existing content. Cannot create nested structure.")]
    Conflict,

    #[error("Path points to content, not a container.")]
    NotAContainer,

    #[error("Path points directly to content, not a listable container.")]
    NotListable,

    #[error("Invalid path '{0}': segments must not be empty.")]
    InvalidPath(String),

    #[error("The database file '{path}' is not a valid JSON object: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("Database I/O error on '{path}': {reason}")]
    Io { path: PathBuf, reason: String },
}

/// Split a store path into segments. The empty path (or `/`) is the root.
pub fn split_path(path: &str) -> Result<Vec<&str>, StoreError> {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    let segments: Vec<&str> = trimmed.split('/').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    Ok(segments)
}

type Document = BTreeMap<String, StoreNode>;

/// The write-once store backed by one JSON file.
#[derive(Debug)]
pub struct KvStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl KvStore {
    /// Open the store at `path`, creating an empty document if missing.
    ///
    /// A document that cannot be read or is not a JSON object is fatal.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        match std::fs::read_to_string(&path) {
            Ok(text) => {
                let doc = parse_document(&path, &text)?;
                debug!(path = %path.display(), entries = doc.len(), "Database loaded");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent).map_err(|e| io_error(&path, e))?;
                }
                std::fs::write(&path, "{}").map_err(|e| io_error(&path, e))?;
                info!(path = %path.display(), "Created empty database");
            }
            Err(e) => {
                return Err(StoreError::Corrupt {
                    path,
                    reason: e.to_string(),
                });
            }
        }

        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Store `content` at `path`. Intermediate containers are created.
    pub async fn write(&self, path: &str, content: &str) -> Result<String, StoreError> {
        let segments = split_path(path)?;
        let Some((name, parents)) = segments.split_last() else {
            return Err(StoreError::InvalidPath(path.to_string()));
        };

        let _guard = self.lock.lock().await;
        let mut doc = self.load().await?;

        let mut level = &mut doc;
        for segment in parents {
            let node = level
                .entry(segment.to_string())
                .or_insert_with(|| StoreNode::Container(BTreeMap::new()));
            level = match node {
                StoreNode::Container(children) => children,
                StoreNode::Leaf(_) => return Err(StoreError::Conflict),
            };
        }
        if level.contains_key(*name) {
            return Err(StoreError::AlreadyExists);
        }
        level.insert(name.to_string(), StoreNode::Leaf(content.to_string()));

        self.save(&doc).await?;
        debug!(path = %path, "Data written");
        Ok("Data successfully written.".into())
    }

    /// Content of a leaf, or the pretty JSON of a container.
    pub async fn read(&self, path: &str) -> Result<String, StoreError> {
        let segments = split_path(path)?;
        let _guard = self.lock.lock().await;
        let doc = self.load().await?;

        match resolve(&doc, &segments)? {
            Resolved::Root(children) | Resolved::Node(StoreNode::Container(children)) => {
                Ok(pretty(children))
            }
            Resolved::Node(StoreNode::Leaf(content)) => Ok(content.clone()),
        }
    }

    /// Sorted child names of a container, as a JSON array.
    pub async fn list(&self, path: &str) -> Result<String, StoreError> {
        let segments = split_path(path)?;
        let _guard = self.lock.lock().await;
        let doc = self.load().await?;

        match resolve(&doc, &segments)? {
            Resolved::Root(children) | Resolved::Node(StoreNode::Container(children)) => {
                let names: Vec<&String> = children.keys().collect();
                Ok(serde_json::to_string(&names).unwrap_or_else(|_| "[]".into()))
            }
            Resolved::Node(StoreNode::Leaf(_)) => Err(StoreError::NotListable),
        }
    }

    async fn load(&self) -> Result<Document, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => parse_document(&self.path, &text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Document::new()),
            Err(e) => Err(io_error(&self.path, e)),
        }
    }

    /// Write the whole document to a sibling temp file, then rename it over
    /// the original so a crash never leaves a half-written store.
    async fn save(&self, doc: &Document) -> Result<(), StoreError> {
        let text = serde_json::to_string_pretty(doc).map_err(|e| StoreError::Io {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        let tmp = self.temp_path();
        tokio::fs::write(&tmp, text)
            .await
            .map_err(|e| io_error(&tmp, e))?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(io_error(&self.path, e));
        }
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "database.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

enum Resolved<'a> {
    Root(&'a Document),
    Node(&'a StoreNode),
}

fn resolve<'a>(doc: &'a Document, segments: &[&str]) -> Result<Resolved<'a>, StoreError> {
    let Some((last, parents)) = segments.split_last() else {
        return Ok(Resolved::Root(doc));
    };

    let mut level = doc;
    for segment in parents {
        level = match level.get(*segment) {
            Some(StoreNode::Container(children)) => children,
            Some(StoreNode::Leaf(_)) => return Err(StoreError::NotAContainer),
            None => return Err(StoreError::NotFound),
        };
    }
    level.get(*last).map(Resolved::Node).ok_or(StoreError::NotFound)
}

fn parse_document(path: &Path, text: &str) -> Result<Document, StoreError> {
    serde_json::from_str(text).map_err(|e| StoreError::Corrupt {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn pretty(children: &Document) -> String {
    serde_json::to_string_pretty(children).unwrap_or_else(|_| "{}".into())
}

fn io_error(path: &Path, e: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}
