//! Digest rendering - 모델 컨텍스트용 매핑 텍스트

use super::types::MappingEntry;
use std::fmt::Write;
use std::path::Path;

/// Header prefix of each block
pub const PATH_HEADER: &str = "PATH: ";

/// Concatenate synopses into one context string.
///
/// Each entry with a synopsis becomes a `PATH: <path>` line, the synopsis,
/// and a blank line. Paths under `root` are shown relative to it, others
/// absolute. Entries without a synopsis contribute nothing.
pub fn render_entries<'a>(
    entries: impl IntoIterator<Item = &'a MappingEntry>,
    root: Option<&Path>,
) -> String {
    let mut out = String::new();
    for entry in entries {
        if entry.synopsis.is_empty() {
            continue;
        }
        let shown = root
            .and_then(|root| entry.path.strip_prefix(root).ok())
            .unwrap_or(&entry.path);
        let _ = writeln!(out, "{}{}", PATH_HEADER, shown.display());
        out.push_str(entry.synopsis.trim_end());
        out.push_str("\n\n");
    }
    out
}
