//! Path confinement — filesystem sandboxing to the agent's base directory.
//!
//! Model-supplied paths are never rejected for containing `..` or looking
//! absolute; they are rewritten so they land inside the base directory.
//! Normalization is purely lexical. [`Sandbox`] then checks the part of the
//! result that exists on disk, so a symlink inside the base cannot lead out
//! of it.

use std::path::{Component, Path, PathBuf};

/// Error returned when a sandbox cannot be set up or a path is unusable.
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("Sandbox base directory '{path}' could not be created: {reason}")]
    BaseUnavailable { path: PathBuf, reason: String },

    #[error("Path '{path}' does not name anything inside the sandbox")]
    EmptyPath { path: String },

    #[error("Path '{path}' leads outside the sandbox")]
    Escapes { path: String },
}

/// Lexically normalize `path` into a relative path with no `.`/`..`.
///
/// - root and drive prefixes are dropped (`/etc` → `etc`)
/// - `.` segments are dropped
/// - `..` pops the previous segment, and is discarded when there is none
/// - backslashes count as separators, whatever the platform
pub fn normalize_relative(path: &str) -> PathBuf {
    let unified = path.replace('\\', "/");
    let mut parts: Vec<&std::ffi::OsStr> = Vec::new();

    for component in Path::new(&unified).components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::ParentDir => {
                parts.pop();
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }

    parts.iter().collect()
}

/// Join the normalized form of `path` onto `base`.
///
/// The result is always `base` or a descendant of it.
pub fn confine(base: &Path, path: &str) -> PathBuf {
    base.join(normalize_relative(path))
}

/// A sandbox rooted at one base directory.
#[derive(Debug, Clone)]
pub struct Sandbox {
    base: PathBuf,
}

impl Sandbox {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// The sandbox root.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Create the base directory if it does not exist yet.
    pub fn ensure_base(&self) -> Result<(), PathError> {
        std::fs::create_dir_all(&self.base).map_err(|e| PathError::BaseUnavailable {
            path: self.base.clone(),
            reason: e.to_string(),
        })
    }

    /// Resolve a model-supplied path inside the sandbox.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, PathError> {
        let resolved = confine(&self.base, path);
        tracing::trace!(input = %path, resolved = %resolved.display(), "Confined path");
        self.verify_contained(path, &resolved)?;
        Ok(resolved)
    }

    /// Resolve a path that must name something below the base (a file).
    pub fn resolve_file(&self, path: &str) -> Result<PathBuf, PathError> {
        let relative = normalize_relative(path);
        if relative.as_os_str().is_empty() {
            return Err(PathError::EmptyPath { path: path.into() });
        }
        let resolved = self.base.join(relative);
        self.verify_contained(path, &resolved)?;
        Ok(resolved)
    }

    /// Check that `resolved` does not leave the base through a symlink.
    ///
    /// The deepest existing ancestor of `resolved` (itself included) must
    /// canonicalize to somewhere below the canonical base. Components that
    /// do not exist yet cannot be links. An existing entry that cannot be
    /// canonicalized (a dangling link) is refused.
    pub fn verify_contained(&self, input: &str, resolved: &Path) -> Result<(), PathError> {
        let Some(existing) = resolved
            .ancestors()
            .take_while(|p| p.starts_with(&self.base))
            .find(|p| p.symlink_metadata().is_ok())
        else {
            return Ok(());
        };

        let escapes = || PathError::Escapes { path: input.into() };
        let base = self.base.canonicalize().map_err(|_| escapes())?;
        let real = existing.canonicalize().map_err(|_| escapes())?;
        if real.starts_with(&base) {
            Ok(())
        } else {
            tracing::warn!(input = %input, real = %real.display(), "Path leaves the sandbox through a symlink");
            Err(escapes())
        }
    }
}
