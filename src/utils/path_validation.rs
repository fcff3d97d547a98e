//! Path containment checks for archive extraction.
//!
//! Archive entry names are untrusted. Before anything is written, each name is
//! resolved lexically against the install root and rejected if the result is
//! not strictly inside it (zip-slip).

use anyhow::{Context, Result};
use std::path::{Component, Path, PathBuf};

use crate::core::PatchError;

/// Canonicalize the install root, creating it first if it does not exist.
pub fn canonical_root(root: &Path) -> Result<PathBuf> {
    if !root.exists() {
        std::fs::create_dir_all(root)
            .with_context(|| format!("Failed to create install directory {}", root.display()))?;
    }
    root.canonicalize()
        .with_context(|| format!("Failed to canonicalize install directory {}", root.display()))
}

/// Resolve `entry_name` under `root` without touching the filesystem.
///
/// `root` must already be canonical. `.` segments are dropped and `..`
/// segments pop a level; the entry is rejected if it is absolute, carries a
/// drive prefix, climbs above `root` at any point, or resolves to `root`
/// itself.
pub fn contained_path(root: &Path, entry_name: &str) -> Result<PathBuf, PatchError> {
    let escape = || PatchError::PathEscape {
        entry: entry_name.to_string(),
        root: root.display().to_string(),
    };

    let mut resolved = root.to_path_buf();
    for component in Path::new(entry_name).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !resolved.pop() || !resolved.starts_with(root) {
                    return Err(escape());
                }
            }
            Component::RootDir | Component::Prefix(_) => return Err(escape()),
        }
    }

    if resolved == root || !resolved.starts_with(root) {
        return Err(escape());
    }
    Ok(resolved)
}

/// Whether `path` resolves inside `boundary`; both must exist.
pub fn ensure_within_directory(path: &Path, boundary: &Path) -> Result<bool> {
    let canonical_path = path
        .canonicalize()
        .with_context(|| format!("Failed to canonicalize path: {}", path.display()))?;
    let canonical_boundary = boundary
        .canonicalize()
        .with_context(|| format!("Failed to canonicalize path: {}", boundary.display()))?;

    Ok(canonical_path.starts_with(&canonical_boundary))
}

/// Create `dir` and its missing parents, but only if it stays inside `boundary`.
///
/// The nearest existing ancestor is resolved first, so a symlink pointing out
/// of `boundary` is caught before anything is created through it. Returns
/// `false`, having created nothing, when `dir` would land outside.
pub fn create_dir_within(dir: &Path, boundary: &Path) -> Result<bool> {
    let existing = dir
        .ancestors()
        .find(|ancestor| ancestor.exists())
        .with_context(|| format!("No existing ancestor of {}", dir.display()))?;
    if !ensure_within_directory(existing, boundary)? {
        return Ok(false);
    }
    if existing == dir {
        return Ok(true);
    }

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    ensure_within_directory(dir, boundary)
}
