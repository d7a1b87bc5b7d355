//! Workspace Mapping Cache - 공개 API
//!
//! One cache per opened workspace, constructed explicitly and handed to
//! whoever needs it. Mutations (add/remove/hash updates) run synchronously
//! on the caller's thread; regeneration is delegated to the
//! [`RefreshScheduler`].

use super::digest::render_entries;
use super::scheduler::{MappingBatch, RefreshScheduler};
use super::store::{MappingStore, MAPPINGS_FILE};
use super::summarizer::Summarizer;
use super::types::{JobOutcome, MappingEntry, MappingEvent, MappingStats, MappingStatus};
use super::walker::{canonical_path, collect_tracked_files};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use vai_foundation::{
    Error, JsonStore, MapperSettings, MappingConfiguration, Result,
    DEFAULT_MAX_CONCURRENT_JOBS,
};

/// Synopsis cache for every tracked file of one workspace
#[derive(Debug)]
pub struct WorkspaceMappingCache {
    root: PathBuf,
    configuration: MappingConfiguration,
    store: Arc<MappingStore>,
    scheduler: RefreshScheduler,
}

impl WorkspaceMappingCache {
    pub fn builder(root: impl Into<PathBuf>) -> WorkspaceMappingCacheBuilder {
        WorkspaceMappingCacheBuilder::new(root)
    }

    /// Workspace root (canonical)
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn configuration(&self) -> &MappingConfiguration {
        &self.configuration
    }

    /// Path of the persisted mappings file
    pub fn mappings_file(&self) -> PathBuf {
        self.store.file_path()
    }

    // ========================================================================
    // Tracking
    // ========================================================================

    /// Track a file or refresh its fingerprint. Does not regenerate.
    ///
    /// Returns `false` when the path is not an existing regular file or
    /// cannot be read.
    pub fn add_file(&self, file: impl AsRef<Path>) -> bool {
        self.track(file.as_ref()).is_some()
    }

    /// Track every matching file under `dir`. Returns how many were tracked.
    pub fn add_directory(&self, dir: impl AsRef<Path>) -> usize {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return 0;
        }
        let files = collect_tracked_files(dir, &self.configuration);
        let added = files.iter().filter(|file| self.add_file(file)).count();
        debug!("Tracked {} files under {}", added, dir.display());
        added
    }

    pub fn remove_file(&self, file: impl AsRef<Path>) -> bool {
        self.store.remove(&canonical_path(file.as_ref()))
    }

    /// Untrack every entry under `dir`. Returns how many were removed.
    pub fn remove_directory(&self, dir: impl AsRef<Path>) -> usize {
        self.store
            .remove_under_directory(&canonical_path(dir.as_ref()))
    }

    // ========================================================================
    // Mapping
    // ========================================================================

    /// Make sure the file's synopsis reflects its current content.
    ///
    /// Tracks the file if needed and records its fingerprint synchronously.
    /// Returns the handle of the regeneration job, or `None` when the
    /// synopsis is already current (or the file is unusable). Safe to call
    /// repeatedly and concurrently.
    pub fn map_file(&self, file: impl AsRef<Path>) -> Option<JoinHandle<JobOutcome>> {
        let entry = self.track(file.as_ref())?;
        if entry.is_up_to_date() {
            return None;
        }
        self.scheduler.enqueue(&entry.path)
    }

    /// [`map_file`](Self::map_file) for every matching file under `dir`
    pub fn map_directory(&self, dir: impl AsRef<Path>) -> MappingBatch {
        let dir = dir.as_ref();
        let mut batch = MappingBatch::new();
        if !dir.is_dir() {
            return batch;
        }
        for file in collect_tracked_files(dir, &self.configuration) {
            let handle = self.map_file(&file);
            batch.push(file, handle);
        }
        batch
    }

    /// Map a mix of files and directories
    pub fn map_paths<P: AsRef<Path>>(&self, paths: &[P]) -> MappingBatch {
        let mut batch = MappingBatch::new();
        for path in paths {
            let path = path.as_ref();
            if path.is_dir() {
                for file in collect_tracked_files(path, &self.configuration) {
                    let handle = self.map_file(&file);
                    batch.push(file, handle);
                }
            } else {
                let handle = self.map_file(path);
                batch.push(path.to_path_buf(), handle);
            }
        }
        batch
    }

    /// Regenerate every outdated entry; entries whose file is gone are
    /// removed instead.
    pub fn map_all_outdated(&self) -> MappingBatch {
        let mut batch = MappingBatch::new();
        for entry in self.store.snapshot() {
            if entry.is_up_to_date() {
                continue;
            }
            if entry.path.is_file() {
                let handle = self.map_file(&entry.path);
                batch.push(entry.path, handle);
            } else {
                info!("Mapping '{}' does not exist anymore", entry.path.display());
                self.store.remove(&entry.path);
            }
        }
        info!("Refreshing {} outdated mappings", batch.len());
        batch
    }

    /// Resolve once no regeneration job is pending
    pub async fn wait_idle(&self) {
        self.scheduler.wait_idle().await
    }

    /// Progress events of regeneration jobs
    pub fn subscribe(&self) -> broadcast::Receiver<MappingEvent> {
        self.scheduler.subscribe()
    }

    /// Regeneration jobs not yet finished
    pub fn pending_jobs(&self) -> usize {
        self.scheduler.pending()
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Snapshot of all entries, in table order
    pub fn entries(&self) -> Vec<MappingEntry> {
        self.store.snapshot()
    }

    pub fn entry(&self, file: impl AsRef<Path>) -> Option<MappingEntry> {
        self.store.get(&canonical_path(file.as_ref()))
    }

    pub fn status(&self, file: impl AsRef<Path>) -> Option<MappingStatus> {
        self.entry(file).map(|entry| entry.status())
    }

    pub fn stats(&self) -> MappingStats {
        MappingStats::from_entries(&self.store.snapshot())
    }

    /// Digest of synopses with paths relative to the workspace root.
    ///
    /// `None` renders every entry; otherwise only the given paths (files,
    /// or directories meaning everything under them).
    pub fn render(&self, paths: Option<&[PathBuf]>) -> String {
        self.render_relative_to(&self.root, paths)
    }

    /// Same as [`render`](Self::render) with an explicit reference root
    pub fn render_relative_to(&self, root: &Path, paths: Option<&[PathBuf]>) -> String {
        let entries = self.store.snapshot();
        let root = canonical_path(root);
        match paths {
            None => render_entries(&entries, Some(&root)),
            Some(paths) => {
                let selected: Vec<PathBuf> = paths.iter().map(|path| canonical_path(path)).collect();
                render_entries(
                    entries
                        .iter()
                        .filter(|entry| selected.iter().any(|sel| entry.path.starts_with(sel))),
                    Some(&root),
                )
            }
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Hash a regular file and upsert it. `None` when unusable.
    fn track(&self, file: &Path) -> Option<MappingEntry> {
        if !file.is_file() {
            return None;
        }
        let path = canonical_path(file);
        match self.store.track_file(&path) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Not tracking {}: {}", path.display(), e);
                None
            }
        }
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`WorkspaceMappingCache`]
pub struct WorkspaceMappingCacheBuilder {
    root: PathBuf,
    summarizer: Option<Arc<dyn Summarizer>>,
    configuration: MappingConfiguration,
    max_concurrent_jobs: usize,
    metadata_dir: Option<PathBuf>,
    runtime: Option<Handle>,
}

impl WorkspaceMappingCacheBuilder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            summarizer: None,
            configuration: MappingConfiguration::default(),
            max_concurrent_jobs: DEFAULT_MAX_CONCURRENT_JOBS,
            metadata_dir: None,
            runtime: None,
        }
    }

    pub fn summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    pub fn configuration(mut self, configuration: MappingConfiguration) -> Self {
        self.configuration = configuration;
        self
    }

    pub fn max_concurrent_jobs(mut self, max: usize) -> Self {
        self.max_concurrent_jobs = max;
        self
    }

    /// Apply `maxConcurrentJobs` from loaded settings
    pub fn settings(self, settings: &MapperSettings) -> Self {
        self.max_concurrent_jobs(settings.max_concurrent_jobs())
    }

    /// Directory holding `class_mappings.json` (default `<root>/.vai`)
    pub fn metadata_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.metadata_dir = Some(dir.into());
        self
    }

    /// Runtime for regeneration jobs (default: the current one)
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Load the persisted table, cull ghosts and start the scheduler
    pub fn build(self) -> Result<WorkspaceMappingCache> {
        if !self.root.is_dir() {
            return Err(Error::InvalidInput(format!(
                "Workspace is not a directory: {}",
                self.root.display()
            )));
        }
        let root = canonical_path(&self.root);

        let summarizer = self
            .summarizer
            .ok_or_else(|| Error::Config("No summarizer configured".to_string()))?;

        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current()
                .map_err(|e| Error::Runtime(format!("No tokio runtime available: {}", e)))?,
        };

        let storage = match self.metadata_dir {
            Some(dir) => JsonStore::new(dir),
            None => JsonStore::project(&root),
        };

        let store = Arc::new(MappingStore::open(storage, MAPPINGS_FILE));
        let culled = store.cull();
        if !culled.is_empty() {
            info!("Culled {} mappings for deleted files", culled.len());
        }

        let scheduler = RefreshScheduler::with_runtime(
            Arc::clone(&store),
            summarizer,
            self.max_concurrent_jobs,
            runtime,
        );

        info!(
            "Opened mapping cache for {} ({} entries)",
            root.display(),
            store.len()
        );

        Ok(WorkspaceMappingCache {
            root,
            configuration: self.configuration,
            store,
            scheduler,
        })
    }
}
