//! Mod archive management.
//!
//! A mod's enabled/disabled state is encoded in its filename, not in any
//! metadata store: `coolmod.jar` is enabled, `coolmod.jar.disabled` is
//! not. Toggling is an in-place rename that appends or strips the
//! suffix, so external tooling (and the game server itself) sees the same
//! convention it already expects. Every listing re-reads the directory;
//! nothing is cached.
//!
//! Concurrent toggles of the same name are not serialized; the filesystem
//! decides the winner. This race is inherited behavior, documented rather
//! than patched over.
//!
//! Suffix matching is ASCII-case-insensitive throughout, so `MOD.JAR`
//! uploads, lists and toggles like `mod.jar`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::files::sandbox::{require_bare_filename, SandboxError};

/// Archive extension a file must carry to count as a mod.
pub const MOD_EXTENSION: &str = ".jar";

/// Suffix appended to a mod's filename to mark it disabled.
pub const DISABLED_SUFFIX: &str = ".disabled";

/// Errors that can occur during mod-store operations.
#[derive(Debug, Error)]
pub enum ModError {
    /// No file with the given name exists in the mod directory.
    #[error("mod not found: {0}")]
    NotFound(String),

    /// The name is neither `*.jar` nor `*.jar.disabled`.
    #[error("not a mod file: {0}")]
    NotAModFile(String),

    /// An uploaded file does not carry the archive extension.
    #[error("unsupported file type (only {MOD_EXTENSION} files are accepted): {0}")]
    UnsupportedFileType(String),

    /// The name carries path components and cannot be a mod filename.
    #[error("invalid mod name: {0}")]
    InvalidName(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<SandboxError> for ModError {
    fn from(err: SandboxError) -> Self {
        ModError::InvalidName(err.to_string())
    }
}

/// One mod archive, enabled state derived from its filename.
#[derive(Debug, Clone, Serialize)]
pub struct ModEntry {
    /// Filename as it appears on disk (including a `.disabled` suffix).
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// Whether the mod is active.
    pub enabled: bool,
    /// Last modification time, milliseconds since the Unix epoch.
    pub modified: u64,
}

/// Result of a toggle: the filename after the rename and the new state.
#[derive(Debug, Clone)]
pub struct ToggleOutcome {
    /// Filename after the rename.
    pub name: String,
    /// Enabled state after the rename.
    pub enabled: bool,
}

/// Manager for the mod directory.
#[derive(Debug, Clone)]
pub struct ModStore {
    root: PathBuf,
}

impl ModStore {
    /// Create a store over `root`. The directory is created lazily on the
    /// first upload.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The mod directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// List all mod archives, sorted by name. Files that are neither
    /// `*.jar` nor `*.jar.disabled` are ignored, as are subdirectories.
    /// A missing mod directory yields an empty list.
    pub fn list(&self) -> Result<Vec<ModEntry>, ModError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Vec::new());
            }
            Err(err) => return Err(err.into()),
        };

        let mut mods = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(_) => continue,
            };
            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(_) => continue,
            };
            if !metadata.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let Some(enabled) = mod_state(&name) else {
                continue;
            };
            mods.push(ModEntry {
                name,
                size: metadata.len(),
                enabled,
                modified: crate::files::modified_millis(&metadata),
            });
        }

        mods.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(mods)
    }

    /// Write a batch of uploaded archives into the mod directory.
    ///
    /// Every name is validated before anything is written, so a batch
    /// containing one bad file writes nothing. Same-named files are
    /// overwritten, and a stale `.disabled` twin of an uploaded archive is
    /// removed so only one form of each base name survives.
    pub fn upload<B: AsRef<[u8]>>(&self, files: &[(String, B)]) -> Result<usize, ModError> {
        for (name, _) in files {
            require_bare_filename(name)?;
            if !has_suffix_ignore_ascii_case(name, MOD_EXTENSION) {
                return Err(ModError::UnsupportedFileType(name.clone()));
            }
        }

        fs::create_dir_all(&self.root)?;
        for (name, data) in files {
            let disabled_twin = self.root.join(format!("{name}{DISABLED_SUFFIX}"));
            if disabled_twin.exists() {
                fs::remove_file(&disabled_twin)?;
            }
            fs::write(self.root.join(name), data)?;
            tracing::debug!("stored mod archive {}", name);
        }
        Ok(files.len())
    }

    /// Delete the named archive. The name is an exact filename, so a
    /// disabled mod is deleted under its `.disabled` name.
    pub fn delete(&self, name: &str) -> Result<(), ModError> {
        require_bare_filename(name)?;
        let path = self.root.join(name);
        if !path.exists() {
            return Err(ModError::NotFound(name.to_string()));
        }
        fs::remove_file(&path)?;
        Ok(())
    }

    /// Flip the named archive between enabled and disabled by renaming it.
    /// Toggling twice restores the original name.
    pub fn toggle(&self, name: &str) -> Result<ToggleOutcome, ModError> {
        require_bare_filename(name)?;

        let (target, enabled) = if has_suffix_ignore_ascii_case(name, DISABLED_SUFFIX)
            && mod_state(name).is_some()
        {
            (name[..name.len() - DISABLED_SUFFIX.len()].to_string(), true)
        } else if has_suffix_ignore_ascii_case(name, MOD_EXTENSION) {
            (format!("{name}{DISABLED_SUFFIX}"), false)
        } else {
            return Err(ModError::NotAModFile(name.to_string()));
        };

        let source = self.root.join(name);
        if !source.exists() {
            return Err(ModError::NotFound(name.to_string()));
        }
        fs::rename(&source, self.root.join(&target))?;
        tracing::debug!(
            "mod {} is now {}",
            target,
            if enabled { "enabled" } else { "disabled" }
        );
        Ok(ToggleOutcome {
            name: target,
            enabled,
        })
    }
}

/// `Some(true)` for an enabled mod, `Some(false)` for a disabled one,
/// `None` for a file that is not a mod archive at all.
fn mod_state(name: &str) -> Option<bool> {
    if has_suffix_ignore_ascii_case(name, MOD_EXTENSION) {
        return Some(true);
    }
    if has_suffix_ignore_ascii_case(name, DISABLED_SUFFIX) {
        // The suffix is ASCII, so the slice boundary is safe.
        let base = &name[..name.len() - DISABLED_SUFFIX.len()];
        if has_suffix_ignore_ascii_case(base, MOD_EXTENSION) {
            return Some(false);
        }
    }
    None
}

/// Byte-wise ASCII-case-insensitive suffix check; never panics on
/// multibyte content because it avoids string slicing.
fn has_suffix_ignore_ascii_case(name: &str, suffix: &str) -> bool {
    let name = name.as_bytes();
    let suffix = suffix.as_bytes();
    name.len() >= suffix.len() && name[name.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
}
