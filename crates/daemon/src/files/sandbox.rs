//! Path confinement for caller-supplied relative paths.
//!
//! Every path that reaches the filesystem goes through [`Sandbox::resolve`]
//! first. Resolution is purely lexical: `.` and `..` segments are folded
//! without touching the disk, so a path is accepted or rejected the same
//! way whether or not it exists yet, and resolution itself can never block
//! or fail on I/O.
//!
//! The containment check is component-wise, not a string comparison: with
//! a root of `/data`, the path `/data2/x` shares a string prefix but is
//! rejected, while `/data/x` is accepted.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// Errors produced by path confinement.
#[derive(Debug, Error)]
pub enum SandboxError {
    /// The path resolved outside the confined root.
    #[error("path escapes the allowed directory: {0}")]
    Escape(String),

    /// A bare filename was expected but the value carries path components.
    #[error("invalid file name: {0}")]
    InvalidFileName(String),
}

/// A directory boundary for caller-supplied paths.
///
/// One sandbox guards one root. Operations that take two paths (rename)
/// resolve each independently; nothing is cached between calls.
#[derive(Debug, Clone)]
pub struct Sandbox {
    root: PathBuf,
}

impl Sandbox {
    /// Create a sandbox rooted at `root`. The root is normalized lexically
    /// and does not need to exist yet.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: normalize(root.as_ref()),
        }
    }

    /// The confined root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a caller-supplied path against the root.
    ///
    /// An empty path denotes the root itself. `.` and `..` segments are
    /// folded before the containment check, so `a/../../b` is rejected just
    /// like a leading `..`. An absolute input replaces the root during the
    /// join (standard path-resolution semantics) and therefore only passes
    /// if it already points inside the root.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, SandboxError> {
        let resolved = normalize(&self.root.join(relative));
        if resolved.starts_with(&self.root) {
            Ok(resolved)
        } else {
            Err(SandboxError::Escape(relative.to_string()))
        }
    }
}

/// Validate that `name` is a bare filename: non-empty, no separators, and
/// not a dot-navigation literal. Used by operations that accept a filename
/// argument rather than a path.
pub fn require_bare_filename(name: &str) -> Result<(), SandboxError> {
    if name.is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name == "."
        || name == ".."
    {
        return Err(SandboxError::InvalidFileName(name.to_string()));
    }
    Ok(())
}

/// Fold `.` and `..` components without touching the disk.
///
/// Popping past the filesystem root is a no-op (`/..` stays `/`), matching
/// how the OS resolves such paths; the containment check is what rejects
/// them.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::RootDir => out.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}
