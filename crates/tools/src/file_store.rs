//! Sandboxed file store: read, write, append and list below one base dir.
//!
//! Every path goes through [`Sandbox::resolve`] or [`Sandbox::resolve_file`],
//! which confine it lexically and refuse symlinks leading out of the base.
//! The listing walk applies the same rule to links it meets. Messages echo
//! the path as the model wrote it.

use std::path::PathBuf;

use anvil_security::{PathError, Sandbox};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::escape::unescape_content;
use crate::listing::{self, ListFields, ListMode, Listing};

#[derive(Debug, thiserror::Error)]
pub enum FileStoreError {
    #[error("File not found at '{path}'.")]
    NotFound { path: String },

    #[error("Directory not found or is not a directory at '{path}'.")]
    DirectoryNotFound { path: String },

    #[error("Invalid mode '{0}'. Use 'ls' or 'lsc'.")]
    InvalidMode(String),

    #[error("Invalid fields '{input}': {reason}. Expected [include_size, include_type, include_content, max_len].")]
    InvalidFields { input: String, reason: String },

    #[error(transparent)]
    Path(#[from] PathError),

    #[error("Error {op} '{path}': {reason}")]
    Io {
        op: &'static str,
        path: String,
        reason: String,
    },

    #[error("An unexpected error occurred while listing '{path}': {reason}")]
    ListFailed { path: String, reason: String },
}

impl FileStoreError {
    fn io(op: &'static str, path: &str, err: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.to_string(),
            reason: err.to_string(),
        }
    }
}

/// Files below a sandbox base directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    sandbox: Sandbox,
}

impl FileStore {
    pub fn new(sandbox: Sandbox) -> Self {
        Self { sandbox }
    }

    pub async fn read(&self, path: &str) -> Result<String, FileStoreError> {
        let target = self.sandbox.resolve_file(path)?;
        debug!(path = %target.display(), "Reading file");

        match tokio::fs::read_to_string(&target).await {
            Ok(content) => Ok(format!("Content of file at {path} is:\n{content}")),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(FileStoreError::NotFound {
                path: path.to_string(),
            }),
            Err(e) => Err(FileStoreError::io("reading file", path, e)),
        }
    }

    /// Overwrite `path` with the unescaped `content`.
    pub async fn write(&self, path: &str, content: &str) -> Result<String, FileStoreError> {
        let target = self.prepare_parent(path).await?;
        let content = unescape_content(content);
        debug!(path = %target.display(), bytes = content.len(), "Writing file");

        tokio::fs::write(&target, content)
            .await
            .map_err(|e| FileStoreError::io("writing to file", path, e))?;
        Ok(format!("Successfully wrote to '{path}'."))
    }

    /// Append the unescaped `content` to `path`, creating it if missing.
    pub async fn append(&self, path: &str, content: &str) -> Result<String, FileStoreError> {
        let target = self.prepare_parent(path).await?;
        let content = unescape_content(content);
        debug!(path = %target.display(), bytes = content.len(), "Appending to file");

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&target)
            .await
            .map_err(|e| FileStoreError::io("appending to file", path, e))?;
        file.write_all(content.as_bytes())
            .await
            .map_err(|e| FileStoreError::io("appending to file", path, e))?;
        file.flush()
            .await
            .map_err(|e| FileStoreError::io("appending to file", path, e))?;
        Ok(format!("Successfully appended to '{path}'."))
    }

    /// Build a listing of the directory at `path`.
    ///
    /// `mode` and `fields` are the raw model arguments; `None` selects `ls`
    /// and all-disabled fields respectively.
    pub async fn list(
        &self,
        path: &str,
        mode: Option<&str>,
        fields: Option<&str>,
    ) -> Result<Listing, FileStoreError> {
        let mode = match mode {
            Some(m) => m
                .parse::<ListMode>()
                .map_err(FileStoreError::InvalidMode)?,
            None => ListMode::Shallow,
        };
        let fields = match fields {
            Some(f) => ListFields::parse(f).map_err(|reason| FileStoreError::InvalidFields {
                input: f.to_string(),
                reason,
            })?,
            None => ListFields::default(),
        };

        let target = self.sandbox.resolve(path)?;
        if !tokio::fs::metadata(&target)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            return Err(FileStoreError::DirectoryNotFound {
                path: path.to_string(),
            });
        }

        debug!(path = %target.display(), ?mode, ?fields, "Listing directory");
        let listed_path = path.to_string();
        let walk_path = listed_path.clone();
        let root = self.sandbox.base().to_path_buf();
        tokio::task::spawn_blocking(move || {
            listing::build_listing(&root, &target, &walk_path, mode, fields)
        })
            .await
            .map_err(|e| FileStoreError::ListFailed {
                path: listed_path.clone(),
                reason: e.to_string(),
            })?
            .map_err(|e| FileStoreError::ListFailed {
                path: listed_path,
                reason: e.to_string(),
            })
    }

    /// Resolve a file path and create its parent directories.
    async fn prepare_parent(&self, path: &str) -> Result<PathBuf, FileStoreError> {
        let target = self.sandbox.resolve_file(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| FileStoreError::io("creating directories for", path, e))?;
        }
        Ok(target)
    }
}
