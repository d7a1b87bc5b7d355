//! Mapping Store - 매핑 테이블 + JSON 영속화
//!
//! The table is the only shared mutable state of the mapping cache. Every
//! mutation runs under one mutex and rewrites the JSON file before the lock
//! is released, so the file always mirrors the table and concurrent writers
//! can never persist out of order.

use super::types::MappingEntry;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use vai_foundation::{ContentHash, JsonStore, Result};

/// 매핑 파일명
pub const MAPPINGS_FILE: &str = "class_mappings.json";

/// Authoritative `path -> MappingEntry` table
#[derive(Debug)]
pub struct MappingStore {
    entries: Mutex<BTreeMap<PathBuf, MappingEntry>>,
    storage: JsonStore,
    file_name: String,
}

impl MappingStore {
    /// Empty store persisting into `storage/file_name`
    pub fn new(storage: JsonStore, file_name: impl Into<String>) -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
            storage,
            file_name: file_name.into(),
        }
    }

    /// Load the persisted table.
    ///
    /// Entries whose file still exists get their fingerprint recomputed, so
    /// edits made while the cache was closed show up as stale immediately.
    /// Entries whose file is gone keep their persisted fingerprint until
    /// [`cull`](Self::cull) drops them. An unreadable file starts empty.
    pub fn open(storage: JsonStore, file_name: impl Into<String>) -> Self {
        let store = Self::new(storage, file_name);

        let persisted = match store
            .storage
            .load_optional::<Vec<MappingEntry>>(&store.file_name)
        {
            Ok(entries) => entries.unwrap_or_default(),
            Err(e) => {
                warn!("Ignoring unreadable mapping file: {}", e);
                Vec::new()
            }
        };

        let mut rehashed = 0usize;
        {
            let mut entries = store.entries.lock();
            for mut entry in persisted {
                if entry.path.is_file() {
                    match ContentHash::of_file(&entry.path) {
                        Ok(hash) if hash != entry.content_hash => {
                            entry.content_hash = hash;
                            rehashed += 1;
                        }
                        Ok(_) => {}
                        Err(e) => warn!("Keeping persisted hash: {}", e),
                    }
                }
                entries.insert(entry.path.clone(), entry);
            }

            debug!(
                "Loaded {} mappings from {} ({} changed on disk)",
                entries.len(),
                store.storage.file_path(&store.file_name).display(),
                rehashed
            );

            if rehashed > 0 {
                store.persist(&entries);
            }
        }

        store
    }

    /// Path of the JSON file backing this store
    pub fn file_path(&self) -> PathBuf {
        self.storage.file_path(&self.file_name)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn get(&self, path: &Path) -> Option<MappingEntry> {
        self.entries.lock().get(path).cloned()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.lock().contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Point-in-time copy of all entries, in table order
    pub fn snapshot(&self) -> Vec<MappingEntry> {
        self.entries.lock().values().cloned().collect()
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Start tracking `path` or record its latest fingerprint.
    ///
    /// The synopsis and the fingerprint it was produced from are left alone.
    /// The table is persisted even when nothing changed, so a write that
    /// failed earlier is repaired by the next upsert. Returns the entry as
    /// it stands afterwards.
    pub fn upsert_tracking(&self, path: &Path, hash: ContentHash) -> MappingEntry {
        let mut entries = self.entries.lock();
        self.upsert_locked(&mut entries, path, hash)
    }

    /// Hash the file and upsert it in one critical section.
    ///
    /// Racing callers are serialized on the table lock, so the fingerprint
    /// left in the table is the one read last, never an older read that
    /// happened to be written late.
    pub fn track_file(&self, path: &Path) -> Result<MappingEntry> {
        let mut entries = self.entries.lock();
        let hash = ContentHash::of_file(path)?;
        Ok(self.upsert_locked(&mut entries, path, hash))
    }

    fn upsert_locked(
        &self,
        entries: &mut BTreeMap<PathBuf, MappingEntry>,
        path: &Path,
        hash: ContentHash,
    ) -> MappingEntry {
        let entry = entries
            .entry(path.to_path_buf())
            .or_insert_with(|| MappingEntry::new(path, ContentHash::empty()));
        entry.content_hash = hash;
        let entry = entry.clone();

        self.persist(entries);
        entry
    }

    /// Drop the entry for exactly `path`
    pub fn remove(&self, path: &Path) -> bool {
        let mut entries = self.entries.lock();
        let removed = entries.remove(path).is_some();
        if removed {
            self.persist(&entries);
        }
        removed
    }

    /// Drop every entry located under `dir` (component-wise prefix match)
    pub fn remove_under_directory(&self, dir: &Path) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|path, _| !path.starts_with(dir));
        let removed = before - entries.len();
        if removed > 0 {
            self.persist(&entries);
        }
        removed
    }

    /// Write `synopsis` only if the entry still carries `expected_hash`.
    ///
    /// The read, the comparison and the write happen under the table lock,
    /// which is what makes a result computed for an older fingerprint
    /// impossible to commit. Returns whether the commit took effect.
    pub fn commit_if_current(&self, path: &Path, expected_hash: &ContentHash, synopsis: String) -> bool {
        let mut entries = self.entries.lock();
        let entry = match entries.get_mut(path) {
            Some(entry) => entry,
            None => {
                debug!("Discarding synopsis for untracked {}", path.display());
                return false;
            }
        };

        if &entry.content_hash != expected_hash {
            debug!(
                "Discarding stale synopsis for {} (computed for {}, now {})",
                path.display(),
                expected_hash,
                entry.content_hash
            );
            return false;
        }

        entry.synopsis = synopsis;
        entry.summarized_hash = expected_hash.clone();
        self.persist(&entries);
        true
    }

    /// Remove entries whose backing file no longer exists
    pub fn cull(&self) -> Vec<PathBuf> {
        let mut entries = self.entries.lock();
        let ghosts: Vec<PathBuf> = entries
            .keys()
            .filter(|path| !path.is_file())
            .cloned()
            .collect();

        for path in &ghosts {
            info!("Mapping '{}' does not exist anymore", path.display());
            entries.remove(path);
        }

        if !ghosts.is_empty() {
            self.persist(&entries);
        }
        ghosts
    }

    /// Rewrite the JSON file. Callers hold the table lock.
    ///
    /// A failed write is logged only; the in-memory table stays
    /// authoritative for the rest of the session.
    fn persist(&self, entries: &BTreeMap<PathBuf, MappingEntry>) {
        let rows: Vec<&MappingEntry> = entries.values().collect();
        if let Err(e) = self.storage.save(&self.file_name, &rows) {
            warn!("Failed to persist mappings: {}", e);
        }
    }
}
