//! Workspace Mapping - 파일별 개요(synopsis) 캐시
//!
//! 작업 공간의 소스 파일마다 짧은 개요를 유지하고, 내용이 바뀐 파일만
//! 다시 요약합니다. 요약은 비동기로 실행되며, 오래된 결과가 최신 결과를
//! 덮어쓰지 않도록 커밋 시점에 내용 지문을 비교합니다.
//!
//! ## 구성
//! - [`MappingStore`]: `path -> MappingEntry` 테이블 + JSON 영속화
//! - [`RefreshScheduler`]: 동시 실행 수가 제한된 재생성 작업 풀
//! - [`Summarizer`]: 파일 내용 → 개요 (외부 서비스 seam)
//! - [`WorkspaceMappingCache`]: 공개 API (추가/삭제/매핑/렌더링)
//!
//! ```ignore
//! let cache = WorkspaceMappingCache::builder("/path/to/workspace")
//!     .summarizer(Arc::new(CommandSummarizer::new("llm -s \"$VAI_MAPPING_PROMPT\"")))
//!     .build()?;
//!
//! cache.add_directory("/path/to/workspace/src");
//! let report = cache.map_all_outdated().join().await;
//! let context = cache.render(None);
//! ```

mod cache;
mod digest;
mod scheduler;
mod store;
mod summarizer;
mod types;
mod walker;

pub use cache::{WorkspaceMappingCache, WorkspaceMappingCacheBuilder};
pub use digest::{render_entries, PATH_HEADER};
pub use scheduler::{MappingBatch, RefreshScheduler};
pub use store::{MappingStore, MAPPINGS_FILE};
pub use summarizer::{CommandSummarizer, Summarizer, MAPPING_PROMPT, PROMPT_ENV_VAR};
pub use types::{
    BatchReport, JobOutcome, MappingEntry, MappingEvent, MappingStats, MappingStatus, RefreshJob,
};
pub use walker::{canonical_path, collect_tracked_files};
