//! 워크스페이스 매핑 캐시 통합 테스트
//!
//! `cargo test -p vai-core --test mapping_cache_test`

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::{Notify, Semaphore};
use vai_core::{
    ContentHash, Error, JobOutcome, MappingEntry, MappingStatus, Result, Summarizer,
    WorkspaceMappingCache,
};

// ============================================================================
// Summarizers
// ============================================================================

/// Always answers with the same synopsis, counting calls
struct Fixed {
    synopsis: String,
    calls: AtomicUsize,
}

impl Fixed {
    fn new(synopsis: &str) -> Arc<Self> {
        Arc::new(Self {
            synopsis: synopsis.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Summarizer for Fixed {
    async fn summarize(&self, _file_contents: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.synopsis.clone())
    }
}

/// Holds each version's summarization until the test opens its gate
struct Gated {
    v1_entered: Notify,
    v1_gate: Semaphore,
    v2_gate: Semaphore,
}

impl Gated {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            v1_entered: Notify::new(),
            v1_gate: Semaphore::new(0),
            v2_gate: Semaphore::new(0),
        })
    }
}

#[async_trait]
impl Summarizer for Gated {
    async fn summarize(&self, file_contents: &str) -> Result<String> {
        if file_contents.contains("v1") {
            self.v1_entered.notify_one();
            let _permit = self.v1_gate.acquire().await.unwrap();
            Ok("synopsis-v1".to_string())
        } else {
            let _permit = self.v2_gate.acquire().await.unwrap();
            Ok("synopsis-v2".to_string())
        }
    }
}

struct Failing;

#[async_trait]
impl Summarizer for Failing {
    async fn summarize(&self, _file_contents: &str) -> Result<String> {
        Err(Error::summarizer("model unavailable"))
    }
}

/// Records the highest number of overlapping calls
struct Concurrency {
    active: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl Summarizer for Concurrency {
    async fn summarize(&self, _file_contents: &str) -> Result<String> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30)).await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok("outline".to_string())
    }
}

// ============================================================================
// Helpers
// ============================================================================

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.root().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    fn open(&self, summarizer: Arc<dyn Summarizer>) -> WorkspaceMappingCache {
        WorkspaceMappingCache::builder(self.root())
            .summarizer(summarizer)
            .build()
            .unwrap()
    }

    fn persisted(&self, cache: &WorkspaceMappingCache) -> Vec<MappingEntry> {
        let raw = std::fs::read_to_string(cache.mappings_file()).unwrap();
        serde_json::from_str(&raw).unwrap()
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_add_file_tracks_without_synopsis() {
    let ws = Workspace::new();
    let file = ws.write("A.java", "0123456789");
    let summarizer = Fixed::new("synopsis-1");
    let cache = ws.open(summarizer.clone());

    assert!(cache.add_file(&file));

    let entry = cache.entry(&file).unwrap();
    assert_eq!(entry.synopsis, "");
    assert_eq!(entry.content_hash, ContentHash::of_bytes(b"0123456789"));
    assert_eq!(entry.status(), MappingStatus::Unmapped);
    assert_eq!(cache.render(None), "");
    assert_eq!(summarizer.calls(), 0);
}

#[tokio::test]
async fn test_map_file_commits_and_renders_relative_path() {
    let ws = Workspace::new();
    let file = ws.write("A.java", "0123456789");
    let cache = ws.open(Fixed::new("synopsis-1"));

    let outcome = cache.map_file(&file).unwrap().await.unwrap();
    assert_eq!(outcome, JobOutcome::Committed);

    let entry = cache.entry(&file).unwrap();
    assert_eq!(entry.synopsis, "synopsis-1");
    assert_eq!(entry.summarized_hash, entry.content_hash);
    assert_eq!(cache.render(None), "PATH: A.java\nsynopsis-1\n\n");
}

#[tokio::test]
async fn test_content_change_updates_hash_synchronously() {
    let ws = Workspace::new();
    let file = ws.write("A.java", "class A {}");
    let cache = ws.open(Arc::new(Failing));

    cache.add_file(&file);
    let before = cache.entry(&file).unwrap().content_hash;

    ws.write("A.java", "class A { int changed; }");
    let job = cache.map_file(&file);

    // 작업 완료 전에도 해시는 이미 갱신됨
    let entry = cache.entry(&file).unwrap();
    assert_ne!(entry.content_hash, before);
    assert_eq!(entry.content_hash, ContentHash::of_file(&file).unwrap());
    assert!(!entry.is_up_to_date());

    assert!(matches!(job.unwrap().await.unwrap(), JobOutcome::Failed(_)));
}

#[tokio::test]
async fn test_remove_file_drops_from_render_and_disk() {
    let ws = Workspace::new();
    let a = ws.write("A.java", "class A {}");
    let b = ws.write("B.java", "class B {}");
    let cache = ws.open(Fixed::new("outline"));

    cache.map_paths(&[&a, &b]).join().await;
    assert!(cache.render(None).contains("PATH: A.java"));

    assert!(cache.remove_file(&a));

    let digest = cache.render(None);
    assert!(!digest.contains("A.java"));
    assert!(digest.contains("PATH: B.java"));
    let persisted = ws.persisted(&cache);
    assert_eq!(persisted.len(), 1);
    assert!(persisted.iter().all(|e| !e.path.ends_with("A.java")));
}

// ============================================================================
// Properties
// ============================================================================

#[tokio::test]
async fn test_repeated_map_file_enqueues_once() {
    let ws = Workspace::new();
    let file = ws.write("A.java", "class A {}");
    let summarizer = Fixed::new("outline");
    let cache = ws.open(summarizer.clone());

    let first = cache.map_file(&file);
    let second = cache.map_file(&file);
    assert!(first.is_some());
    assert!(second.is_none());

    first.unwrap().await.unwrap();
    assert!(cache.map_file(&file).is_none());
    assert_eq!(summarizer.calls(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_late_result_for_old_content_is_discarded() {
    let ws = Workspace::new();
    let file = ws.write("A.java", "class A { v1 }");
    let summarizer = Gated::new();
    let cache = ws.open(summarizer.clone());

    let job_v1 = cache.map_file(&file).unwrap();
    summarizer.v1_entered.notified().await;

    ws.write("A.java", "class A { v2 }");
    let job_v2 = cache.map_file(&file).unwrap();
    let h2 = ContentHash::of_file(&file).unwrap();

    summarizer.v2_gate.add_permits(1);
    assert_eq!(job_v2.await.unwrap(), JobOutcome::Committed);

    // v2 커밋 이후에 도착한 v1 결과
    summarizer.v1_gate.add_permits(1);
    assert_eq!(job_v1.await.unwrap(), JobOutcome::Discarded);

    let entry = cache.entry(&file).unwrap();
    assert_eq!(entry.synopsis, "synopsis-v2");
    assert_eq!(entry.summarized_hash, h2);
    assert!(entry.is_up_to_date());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_old_result_arriving_first_is_discarded() {
    let ws = Workspace::new();
    let file = ws.write("A.java", "class A { v1 }");
    let summarizer = Gated::new();
    let cache = ws.open(summarizer.clone());

    let job_v1 = cache.map_file(&file).unwrap();
    summarizer.v1_entered.notified().await;

    ws.write("A.java", "class A { v2 }");
    let job_v2 = cache.map_file(&file).unwrap();

    summarizer.v1_gate.add_permits(1);
    assert_eq!(job_v1.await.unwrap(), JobOutcome::Discarded);
    let entry = cache.entry(&file).unwrap();
    assert_eq!(entry.synopsis, "");
    assert!(entry.summarized_hash.is_empty());

    summarizer.v2_gate.add_permits(1);
    assert_eq!(job_v2.await.unwrap(), JobOutcome::Committed);
    assert_eq!(cache.entry(&file).unwrap().synopsis, "synopsis-v2");
}

#[tokio::test]
async fn test_remove_directory_only_touches_entries_under_it() {
    let ws = Workspace::new();
    let cache = ws.open(Fixed::new("outline"));
    ws.write("src/a/A.java", "a");
    ws.write("src/a/deep/B.java", "b");
    ws.write("src/ab/C.java", "c");
    ws.write("D.java", "d");

    assert_eq!(cache.add_directory(ws.root()), 4);
    assert_eq!(cache.remove_directory(ws.root().join("src/a")), 2);

    let mut remaining: Vec<String> = cache
        .entries()
        .iter()
        .map(|e| e.path.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    remaining.sort();
    assert_eq!(remaining, vec!["C.java", "D.java"]);
}

#[tokio::test]
async fn test_render_skips_empty_and_is_stable() {
    let ws = Workspace::new();
    let mapped = ws.write("Mapped.java", "class Mapped {}");
    let unmapped = ws.write("Unmapped.java", "class Unmapped {}");
    let cache = ws.open(Fixed::new("outline"));

    cache.add_file(&unmapped);
    cache.map_file(&mapped).unwrap().await.unwrap();

    let digest = cache.render(None);
    assert_eq!(digest, "PATH: Mapped.java\noutline\n\n");
    assert_eq!(cache.render(None), digest);

    assert_eq!(cache.render(Some(std::slice::from_ref(&unmapped))), "");
    assert_eq!(cache.render(Some(std::slice::from_ref(&mapped))), digest);
}

#[tokio::test]
async fn test_render_relative_to_other_root_falls_back_to_absolute() {
    let ws = Workspace::new();
    let file = ws.write("src/A.java", "class A {}");
    let cache = ws.open(Fixed::new("outline"));
    cache.map_file(&file).unwrap().await.unwrap();

    let under_src = cache.render_relative_to(&ws.root().join("src"), None);
    assert_eq!(under_src, "PATH: A.java\noutline\n\n");

    let elsewhere = tempfile::tempdir().unwrap();
    let absolute = cache.render_relative_to(elsewhere.path(), None);
    let canonical = cache.entry(&file).unwrap().path;
    assert_eq!(absolute, format!("PATH: {}\noutline\n\n", canonical.display()));
}

#[tokio::test]
async fn test_reopen_culls_deleted_files() {
    let ws = Workspace::new();
    let kept = ws.write("Kept.java", "class Kept {}");
    let ghost = ws.write("Ghost.java", "class Ghost {}");
    {
        let cache = ws.open(Fixed::new("outline"));
        cache.map_paths(&[&kept, &ghost]).join().await;
        assert_eq!(cache.stats().fresh, 2);
    }

    std::fs::remove_file(&ghost).unwrap();

    let cache = ws.open(Fixed::new("outline"));
    assert!(cache.entry(&ghost).is_none());
    assert!(cache.entry(&kept).unwrap().is_up_to_date());
    assert_eq!(ws.persisted(&cache).len(), 1);
}

#[tokio::test]
async fn test_reopen_after_external_edit_reports_stale() {
    let ws = Workspace::new();
    let file = ws.write("A.java", "class A {}");
    {
        let cache = ws.open(Fixed::new("outline"));
        cache.map_file(&file).unwrap().await.unwrap();
    }

    ws.write("A.java", "class A { edited }");

    let cache = ws.open(Fixed::new("outline 2"));
    assert_eq!(cache.status(&file), Some(MappingStatus::Stale));
    // 요약은 유지되어 계속 렌더링됨
    assert_eq!(cache.render(None), "PATH: A.java\noutline\n\n");

    let report = cache.map_all_outdated().join().await;
    assert_eq!(report.committed, 1);
    assert_eq!(cache.render(None), "PATH: A.java\noutline 2\n\n");
}

// ============================================================================
// Bulk refresh and failures
// ============================================================================

#[tokio::test]
async fn test_map_all_outdated_removes_missing_and_skips_fresh() {
    let ws = Workspace::new();
    let fresh = ws.write("Fresh.java", "class Fresh {}");
    let stale = ws.write("Stale.java", "class Stale {}");
    let gone = ws.write("Gone.java", "class Gone {}");
    let summarizer = Fixed::new("outline");
    let cache = ws.open(summarizer.clone());

    cache.map_file(&fresh).unwrap().await.unwrap();
    cache.add_file(&stale);
    cache.add_file(&gone);
    std::fs::remove_file(&gone).unwrap();

    let batch = cache.map_all_outdated();
    assert_eq!(batch.len(), 1);
    let report = batch.join().await;

    assert_eq!(report.committed, 1);
    assert!(cache.entry(&gone).is_none());
    assert_eq!(cache.stats().fresh, 2);
    assert_eq!(summarizer.calls(), 2);
}

#[tokio::test]
async fn test_failure_keeps_previous_synopsis() {
    let ws = Workspace::new();
    let file = ws.write("A.java", "class A {}");
    {
        let cache = ws.open(Fixed::new("outline"));
        cache.map_file(&file).unwrap().await.unwrap();
    }
    ws.write("A.java", "class A { edited }");

    let cache = ws.open(Arc::new(Failing));
    let mut events = cache.subscribe();
    let outcome = cache.map_file(&file).unwrap().await.unwrap();

    assert!(matches!(outcome, JobOutcome::Failed(ref msg) if msg.contains("model unavailable")));
    let entry = cache.entry(&file).unwrap();
    assert_eq!(entry.synopsis, "outline");
    assert_eq!(entry.status(), MappingStatus::Stale);

    // 다음 호출에서 다시 시도됨
    assert!(cache.map_file(&file).is_some());
    cache.wait_idle().await;
    assert_eq!(cache.pending_jobs(), 0);

    let mut completed = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(event, vai_core::MappingEvent::Completed { .. }) {
            completed += 1;
        }
    }
    assert_eq!(completed, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrency_is_bounded() {
    let ws = Workspace::new();
    let files: Vec<PathBuf> = (0..8)
        .map(|i| ws.write(&format!("src/F{}.java", i), &format!("class F{} {{}}", i)))
        .collect();
    let summarizer = Arc::new(Concurrency {
        active: AtomicUsize::new(0),
        peak: AtomicUsize::new(0),
    });
    let cache = WorkspaceMappingCache::builder(ws.root())
        .summarizer(summarizer.clone())
        .max_concurrent_jobs(2)
        .build()
        .unwrap();

    let report = cache.map_directory(ws.root().join("src")).join().await;

    assert_eq!(report.committed, files.len());
    assert!(summarizer.peak.load(Ordering::SeqCst) <= 2);
    assert_eq!(cache.stats().fresh, files.len());
}

#[tokio::test]
async fn test_add_directory_respects_configuration() {
    let ws = Workspace::new();
    ws.write("src/A.java", "a");
    ws.write("src/notes.txt", "n");
    ws.write("node_modules/x/index.ts", "x");
    ws.write(".git/hooks/H.java", "h");
    let cache = ws.open(Fixed::new("outline"));

    assert_eq!(cache.add_directory(ws.root()), 1);
    assert_eq!(cache.add_directory(ws.root().join("missing")), 0);
    // 메타데이터 디렉토리(.vai)의 JSON은 추적 대상 아님
    assert_eq!(cache.add_directory(ws.root()), 1);
    assert_eq!(cache.stats().total, 1);
}

// ============================================================================
// Persistence
// ============================================================================

#[tokio::test]
async fn test_failed_persist_keeps_in_memory_entry() {
    let ws = Workspace::new();
    let file = ws.write("A.java", "class A {}");
    let blocker = ws.root().join("not-a-dir");
    std::fs::write(&blocker, "regular file").unwrap();

    let cache = WorkspaceMappingCache::builder(ws.root())
        .summarizer(Fixed::new("outline"))
        .metadata_dir(&blocker)
        .build()
        .unwrap();

    assert!(cache.add_file(&file));
    assert_eq!(cache.entries().len(), 1);
    assert!(!cache.mappings_file().exists());

    // 저장 실패와 무관하게 매핑도 계속 동작
    let outcome = cache.map_file(&file).unwrap().await.unwrap();
    assert_eq!(outcome, JobOutcome::Committed);
    assert_eq!(cache.render(None), "PATH: A.java\noutline\n\n");
}

#[tokio::test]
async fn test_metadata_dir_override_is_reopened() {
    let ws = Workspace::new();
    let file = ws.write("A.java", "class A {}");
    let meta = tempfile::tempdir().unwrap();

    let open = |synopsis: &str| {
        WorkspaceMappingCache::builder(ws.root())
            .summarizer(Fixed::new(synopsis))
            .metadata_dir(meta.path())
            .build()
            .unwrap()
    };

    {
        let cache = open("outline");
        cache.map_file(&file).unwrap().await.unwrap();
        assert_eq!(cache.mappings_file(), meta.path().join(vai_core::MAPPINGS_FILE));
    }
    assert!(!ws.root().join(".vai").exists());

    let cache = open("unused");
    assert_eq!(cache.status(&file), Some(MappingStatus::Fresh));
    assert_eq!(cache.render(None), "PATH: A.java\noutline\n\n");
}
