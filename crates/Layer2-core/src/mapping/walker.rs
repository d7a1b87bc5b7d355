//! Workspace walking and path canonicalization

use ignore::WalkBuilder;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use vai_foundation::MappingConfiguration;

/// Recursively collect tracked files under `dir`, sorted.
///
/// Ignored directory names are pruned (never descended into) and only
/// whitelisted extensions are returned. `.gitignore` files are not
/// consulted; the ignore list is the only filter.
pub fn collect_tracked_files(dir: &Path, config: &MappingConfiguration) -> Vec<PathBuf> {
    let filter = config.clone();

    let walker = WalkBuilder::new(dir)
        .standard_filters(false)
        .follow_links(false)
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if !is_dir || entry.depth() == 0 {
                return true;
            }
            entry
                .file_name()
                .to_str()
                .map(|name| !filter.is_ignored_dir(name))
                .unwrap_or(true)
        })
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                debug!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        if is_file && config.has_tracked_extension(entry.path()) {
            files.push(entry.into_path());
        }
    }

    files.sort();
    files
}

/// Absolute, symlink-resolved form of `path` used as the entry key.
///
/// Paths that no longer exist cannot be resolved by the filesystem; for
/// those the nearest existing parent is resolved and the rest is appended,
/// so a deleted file still maps onto the key it was tracked under.
pub fn canonical_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = std::fs::canonicalize(path) {
        return canonical;
    }

    let absolute = absolute_lexical(path);
    let mut existing = absolute.as_path();
    let mut tail = Vec::new();
    while let Some(parent) = existing.parent() {
        if let Some(name) = existing.file_name() {
            tail.push(name.to_os_string());
        }
        existing = parent;
        if let Ok(mut resolved) = std::fs::canonicalize(existing) {
            for name in tail.iter().rev() {
                resolved.push(name);
            }
            return resolved;
        }
    }
    absolute
}

/// Join onto the current directory and fold `.`/`..` without touching disk
fn absolute_lexical(path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
