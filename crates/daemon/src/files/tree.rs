//! Sandboxed file-tree operations.
//!
//! [`FileTree`] exposes a general-purpose subtree of the host filesystem
//! to remote requests: listing, inline read/write, create, rename, delete
//! and bulk upload. Every caller-supplied path passes through the
//! [`Sandbox`] on every call; nothing is cached between operations.
//!
//! Overwrite semantics are deliberately asymmetric: `write` replaces
//! content unconditionally (edit-save), while `create_file`, `create_dir`
//! and `rename` refuse to clobber an existing target (explicit-create).
//!
//! Mutations are not serialized in-process; concurrent requests race at
//! the filesystem level, and the loser of a create-race surfaces
//! [`TreeError::AlreadyExists`].

use std::cmp::Ordering;
use std::fs;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use super::sandbox::{require_bare_filename, Sandbox, SandboxError};

/// Files at or over this size are refused by [`FileTree::read`]; content is
/// returned inline as text, not streamed.
pub const MAX_READ_BYTES: u64 = 512 * 1024;

/// Errors that can occur during file-tree operations.
#[derive(Debug, Error)]
pub enum TreeError {
    /// The path failed confinement or is otherwise malformed.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// The target does not exist.
    #[error("path does not exist: {0}")]
    NotFound(String),

    /// A create or rename target already exists.
    #[error("path already exists: {0}")]
    AlreadyExists(String),

    /// The operation needs a regular file and the target is not one.
    #[error("not a file: {0}")]
    NotAFile(String),

    /// The operation needs a directory and the target is not one.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// The file is too large to return inline.
    #[error("file too large: {size} bytes (limit: {limit})")]
    TooLarge { size: u64, limit: u64 },

    /// The file content is not text.
    #[error("file is not valid UTF-8 text: {0}")]
    NotText(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<SandboxError> for TreeError {
    fn from(err: SandboxError) -> Self {
        TreeError::InvalidPath(err.to_string())
    }
}

/// One file or directory within the confined subtree.
#[derive(Debug, Clone, Serialize)]
pub struct TreeEntry {
    /// Entry name (not full path).
    pub name: String,
    /// Whether the entry is a directory.
    #[serde(rename = "isDirectory")]
    pub is_directory: bool,
    /// Size in bytes (0 for directories).
    pub size: u64,
    /// Last modification time, milliseconds since the Unix epoch.
    pub modified: u64,
}

/// An inline file read: the decoded content plus the file's name.
#[derive(Debug, Clone, Serialize)]
pub struct FileContent {
    /// Decoded UTF-8 content.
    pub content: String,
    /// Filename component of the requested path.
    pub name: String,
}

/// Sandboxed manager for a general-purpose directory subtree.
#[derive(Debug, Clone)]
pub struct FileTree {
    sandbox: Sandbox,
}

impl FileTree {
    /// Create a manager confined to `root`.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            sandbox: Sandbox::new(root),
        }
    }

    /// The confined root.
    pub fn root(&self) -> &Path {
        self.sandbox.root()
    }

    /// List the immediate children of a directory, directories first, each
    /// group in case-sensitive name order. Children whose metadata cannot
    /// be read are skipped.
    pub fn list(&self, relative: &str) -> Result<Vec<TreeEntry>, TreeError> {
        let dir = self.sandbox.resolve(relative)?;
        if !dir.exists() {
            return Err(TreeError::NotFound(relative.to_string()));
        }
        if !dir.is_dir() {
            return Err(TreeError::NotADirectory(relative.to_string()));
        }

        let mut entries = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(_) => continue,
            };
            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(_) => continue,
            };
            entries.push(TreeEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_directory: metadata.is_dir(),
                size: if metadata.is_file() { metadata.len() } else { 0 },
                modified: super::modified_millis(&metadata),
            });
        }

        entries.sort_by(|a, b| match (a.is_directory, b.is_directory) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => a.name.cmp(&b.name),
        });
        Ok(entries)
    }

    /// Read a file's content inline as UTF-8 text.
    pub fn read(&self, relative: &str) -> Result<FileContent, TreeError> {
        let path = self.sandbox.resolve(relative)?;
        let metadata = match fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(TreeError::NotAFile(relative.to_string()));
            }
            Err(err) => return Err(err.into()),
        };
        if !metadata.is_file() {
            return Err(TreeError::NotAFile(relative.to_string()));
        }
        if metadata.len() >= MAX_READ_BYTES {
            return Err(TreeError::TooLarge {
                size: metadata.len(),
                limit: MAX_READ_BYTES,
            });
        }

        let bytes = fs::read(&path)?;
        let content = String::from_utf8(bytes)
            .map_err(|_| TreeError::NotText(relative.to_string()))?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(FileContent { content, name })
    }

    /// Write `content` to a file, creating parent directories as needed and
    /// overwriting any existing content.
    pub fn write(&self, relative: &str, content: &str) -> Result<(), TreeError> {
        let path = self.sandbox.resolve(relative)?;
        if path.is_dir() {
            return Err(TreeError::NotAFile(relative.to_string()));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        Ok(())
    }

    /// Create an empty file, creating parent directories as needed. The
    /// final create is atomic, so the loser of a concurrent create on the
    /// same path receives `AlreadyExists`.
    pub fn create_file(&self, relative: &str) -> Result<(), TreeError> {
        let path = self.sandbox.resolve(relative)?;
        if path.exists() {
            return Err(TreeError::AlreadyExists(relative.to_string()));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        match fs::OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(TreeError::AlreadyExists(relative.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Create a directory and any missing ancestors.
    pub fn create_dir(&self, relative: &str) -> Result<(), TreeError> {
        let path = self.sandbox.resolve(relative)?;
        if path.exists() {
            return Err(TreeError::AlreadyExists(relative.to_string()));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        match fs::create_dir(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(TreeError::AlreadyExists(relative.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Rename `old` to `new`. Both paths pass confinement independently.
    /// Refuses to overwrite an existing target.
    pub fn rename(&self, old: &str, new: &str) -> Result<(), TreeError> {
        let source = self.sandbox.resolve(old)?;
        let target = self.sandbox.resolve(new)?;
        if !source.exists() {
            return Err(TreeError::NotFound(old.to_string()));
        }
        if target.exists() {
            return Err(TreeError::AlreadyExists(new.to_string()));
        }
        fs::rename(&source, &target)?;
        Ok(())
    }

    /// Delete a file or, recursively, a directory. The confined root
    /// itself may never be deleted.
    pub fn delete(&self, relative: &str) -> Result<(), TreeError> {
        let path = self.sandbox.resolve(relative)?;
        if path == self.sandbox.root() {
            return Err(TreeError::InvalidPath(
                "the root directory cannot be deleted".to_string(),
            ));
        }
        if !path.exists() {
            return Err(TreeError::NotFound(relative.to_string()));
        }
        if path.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
        Ok(())
    }

    /// Write a batch of named payloads into a directory, creating the
    /// directory if absent and overwriting name collisions. Declared
    /// filenames must be bare names, not paths.
    pub fn upload<B: AsRef<[u8]>>(
        &self,
        relative: &str,
        files: &[(String, B)],
    ) -> Result<usize, TreeError> {
        let dir = self.sandbox.resolve(relative)?;
        for (name, _) in files {
            require_bare_filename(name)?;
        }
        fs::create_dir_all(&dir)?;
        for (name, data) in files {
            fs::write(dir.join(name), data)?;
        }
        Ok(files.len())
    }
}
