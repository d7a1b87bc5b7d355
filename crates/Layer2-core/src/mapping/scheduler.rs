//! Refresh Scheduler - 비동기 매핑 재생성
//!
//! Regeneration jobs run as tokio tasks gated by a semaphore, so a bulk
//! refresh never has more than `max_concurrent` summarizer calls open.
//!
//! ## Staleness checks
//!
//! 1. enqueue: an up-to-date entry (or an identical pending job) creates no job
//! 2. job start: the file is re-read and re-hashed; if it no longer matches
//!    the enqueued fingerprint the job gives up
//! 3. commit: [`MappingStore::commit_if_current`] decides, atomically
//!
//! Only (3) matters for correctness; (1) and (2) avoid wasted summarizer
//! calls. Superseded jobs are never cancelled, they just fail to commit.

use super::store::MappingStore;
use super::summarizer::Summarizer;
use super::types::{BatchReport, JobOutcome, MappingEvent, RefreshJob};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use vai_foundation::{ContentHash, Error, Result};

/// Capacity of the progress event channel
const EVENT_CAPACITY: usize = 256;

/// Bounded pool running regeneration jobs
pub struct RefreshScheduler {
    store: Arc<MappingStore>,
    summarizer: Arc<dyn Summarizer>,
    runtime: Handle,
    /// Semaphore for limiting concurrency
    semaphore: Arc<Semaphore>,
    max_concurrent: usize,
    /// Jobs enqueued but not finished, keyed by (path, fingerprint)
    in_flight: Arc<Mutex<HashSet<RefreshJob>>>,
    /// Number of unfinished jobs
    pending: Arc<watch::Sender<usize>>,
    events: broadcast::Sender<MappingEvent>,
}

impl RefreshScheduler {
    /// Scheduler spawning onto the ambient tokio runtime
    pub fn new(
        store: Arc<MappingStore>,
        summarizer: Arc<dyn Summarizer>,
        max_concurrent: usize,
    ) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| Error::Runtime(format!("No tokio runtime available: {}", e)))?;
        Ok(Self::with_runtime(store, summarizer, max_concurrent, runtime))
    }

    /// Scheduler spawning onto an explicit runtime
    pub fn with_runtime(
        store: Arc<MappingStore>,
        summarizer: Arc<dyn Summarizer>,
        max_concurrent: usize,
        runtime: Handle,
    ) -> Self {
        let max_concurrent = max_concurrent.max(1);
        let (pending, _) = watch::channel(0usize);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store,
            summarizer,
            runtime,
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            pending: Arc::new(pending),
            events,
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Jobs enqueued and not yet finished
    pub fn pending(&self) -> usize {
        *self.pending.borrow()
    }

    /// Receive [`MappingEvent`]s for every job started from now on
    pub fn subscribe(&self) -> broadcast::Receiver<MappingEvent> {
        self.events.subscribe()
    }

    /// Resolve once no job is pending
    pub async fn wait_idle(&self) {
        let mut rx = self.pending.subscribe();
        let _ = rx.wait_for(|pending| *pending == 0).await;
    }

    /// Schedule regeneration of a tracked file.
    ///
    /// Returns `None` when no job was created: the path is untracked, its
    /// synopsis is already current, or a job for the same fingerprint is
    /// still pending.
    pub fn enqueue(&self, path: &Path) -> Option<JoinHandle<JobOutcome>> {
        let entry = self.store.get(path)?;
        if entry.is_up_to_date() {
            debug!("Mapping for {} is up to date", path.display());
            return None;
        }

        let job = RefreshJob {
            path: path.to_path_buf(),
            expected_hash: entry.content_hash,
        };

        if !self.in_flight.lock().insert(job.clone()) {
            debug!("Mapping job for {} already pending", path.display());
            return None;
        }
        self.pending.send_modify(|n| *n += 1);

        let guard = JobGuard {
            job: job.clone(),
            in_flight: Arc::clone(&self.in_flight),
            pending: Arc::clone(&self.pending),
        };
        let worker = Worker {
            store: Arc::clone(&self.store),
            summarizer: Arc::clone(&self.summarizer),
            semaphore: Arc::clone(&self.semaphore),
            events: self.events.clone(),
        };

        debug!("Enqueued mapping job for {} ({})", path.display(), job.expected_hash);
        Some(self.runtime.spawn(async move {
            let _guard = guard;
            worker.run(job).await
        }))
    }
}

impl std::fmt::Debug for RefreshScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshScheduler")
            .field("max_concurrent", &self.max_concurrent)
            .field("pending", &self.pending())
            .finish()
    }
}

// ============================================================================
// Worker
// ============================================================================

/// What a spawned job needs, detached from the scheduler
struct Worker {
    store: Arc<MappingStore>,
    summarizer: Arc<dyn Summarizer>,
    semaphore: Arc<Semaphore>,
    events: broadcast::Sender<MappingEvent>,
}

impl Worker {
    async fn run(self, job: RefreshJob) -> JobOutcome {
        let _permit = match Arc::clone(&self.semaphore).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return JobOutcome::Failed("scheduler closed".to_string()),
        };

        let _ = self.events.send(MappingEvent::Started {
            path: job.path.clone(),
        });

        let outcome = self.regenerate(&job).await;
        match &outcome {
            JobOutcome::Committed => info!("Mapped {}", job.path.display()),
            JobOutcome::Failed(reason) => {
                warn!("Mapping {} failed: {}", job.path.display(), reason)
            }
            other => debug!("Mapping job for {} ended: {}", job.path.display(), other),
        }

        let _ = self.events.send(MappingEvent::Completed {
            path: job.path.clone(),
            outcome: outcome.clone(),
        });
        outcome
    }

    async fn regenerate(&self, job: &RefreshJob) -> JobOutcome {
        if !self.store.contains(&job.path) {
            return JobOutcome::Removed;
        }

        // 내용을 한 번만 읽어서 해시 확인과 요약 입력에 같이 사용
        let bytes = match tokio::fs::read(&job.path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!("Cannot read {}: {}", job.path.display(), e);
                return JobOutcome::Superseded;
            }
        };
        if ContentHash::of_bytes(&bytes) != job.expected_hash {
            return JobOutcome::Superseded;
        }

        let contents = String::from_utf8_lossy(&bytes);
        let synopsis = match self.summarizer.summarize(&contents).await {
            Ok(synopsis) if synopsis.trim().is_empty() => {
                return JobOutcome::Failed("empty synopsis".to_string());
            }
            Ok(synopsis) => synopsis,
            Err(e) => return JobOutcome::Failed(e.to_string()),
        };

        if self
            .store
            .commit_if_current(&job.path, &job.expected_hash, synopsis)
        {
            JobOutcome::Committed
        } else {
            JobOutcome::Discarded
        }
    }
}

/// Releases the in-flight slot when the job ends, however it ends
struct JobGuard {
    job: RefreshJob,
    in_flight: Arc<Mutex<HashSet<RefreshJob>>>,
    pending: Arc<watch::Sender<usize>>,
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.job);
        self.pending.send_modify(|n| *n = n.saturating_sub(1));
    }
}

// ============================================================================
// MappingBatch
// ============================================================================

/// Jobs started together by one bulk operation
#[derive(Debug, Default)]
pub struct MappingBatch {
    handles: Vec<(PathBuf, JoinHandle<JobOutcome>)>,
    skipped: usize,
}

impl MappingBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the result of one enqueue attempt
    pub fn push(&mut self, path: PathBuf, handle: Option<JoinHandle<JobOutcome>>) {
        match handle {
            Some(handle) => self.handles.push((path, handle)),
            None => self.skipped += 1,
        }
    }

    /// Number of jobs started
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every job of the batch and tally the outcomes
    pub async fn join(self) -> BatchReport {
        let mut report = BatchReport {
            skipped: self.skipped,
            ..BatchReport::default()
        };

        for (path, handle) in self.handles {
            match handle.await {
                Ok(outcome) => report.record(&outcome),
                Err(e) => {
                    warn!("Mapping task for {} panicked: {}", path.display(), e);
                    report.record(&JobOutcome::Failed(e.to_string()));
                }
            }
        }

        report
    }
}
