//! Which files the mapping cache tracks
//!
//! These are constants of the product, not user settings: a directory walk
//! skips version-control, build-output, IDE and dependency-cache directories
//! and only picks up recognized source extensions.

use std::collections::BTreeSet;
use std::path::Path;

/// Directory names never descended into
const IGNORED_DIR_NAMES: &[&str] = &[
    ".git",
    ".svn",
    ".hg",
    ".idea",
    ".vscode",
    ".vs",
    ".gradle",
    ".venv",
    "venv",
    "target",
    "build",
    "dist",
    "out",
    "bin",
    "obj",
    "node_modules",
    "__pycache__",
    "vendor",
];

/// Recognized source extensions (lowercase, no dot)
const TRACKED_EXTENSIONS: &[&str] = &[
    "java", "cs", "ts", "tsx", "js", "jsx", "rs", "py", "go", "kt", "c", "h", "cpp", "hpp",
];

/// Ignore list and extension whitelist as one value object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingConfiguration {
    pub ignored_dir_names: BTreeSet<String>,
    pub tracked_extensions: BTreeSet<String>,
}

impl Default for MappingConfiguration {
    fn default() -> Self {
        Self {
            ignored_dir_names: IGNORED_DIR_NAMES.iter().map(|s| s.to_string()).collect(),
            tracked_extensions: TRACKED_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl MappingConfiguration {
    /// Build from explicit lists. Extensions may be given with or without
    /// the leading dot and in any case.
    pub fn new<D, E>(ignored_dir_names: D, tracked_extensions: E) -> Self
    where
        D: IntoIterator,
        D::Item: Into<String>,
        E: IntoIterator,
        E::Item: Into<String>,
    {
        Self {
            ignored_dir_names: ignored_dir_names.into_iter().map(Into::into).collect(),
            tracked_extensions: tracked_extensions
                .into_iter()
                .map(|e| e.into().trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    /// 확장자 화이트리스트 확인 (대소문자 무시)
    pub fn has_tracked_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.tracked_extensions.contains(&e.to_lowercase()))
            .unwrap_or(false)
    }

    /// 무시할 디렉토리 이름인지 확인
    pub fn is_ignored_dir(&self, name: &str) -> bool {
        self.ignored_dir_names.contains(name)
    }
}
