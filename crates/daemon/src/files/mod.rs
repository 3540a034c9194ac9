//! Sandboxed file management.
//!
//! This module exposes a confined subtree of the host filesystem to remote
//! requests. Every caller-supplied path is validated by the [`Sandbox`]
//! before any filesystem call; the [`FileTree`] implements the operations
//! on top of it. The mod directory is a separate confined subtree managed
//! by [`crate::mods`].

use std::fs::Metadata;
use std::time::UNIX_EPOCH;

pub mod sandbox;
pub mod tree;

pub use sandbox::{require_bare_filename, Sandbox, SandboxError};
pub use tree::{FileContent, FileTree, TreeEntry, TreeError, MAX_READ_BYTES};

/// Modification time as milliseconds since the Unix epoch, 0 when the
/// platform cannot report one.
pub(crate) fn modified_millis(metadata: &Metadata) -> u64 {
    metadata
        .modified()
        .ok()
        .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
        .map(|duration| duration.as_millis() as u64)
        .unwrap_or(0)
}
