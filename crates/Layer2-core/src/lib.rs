//! vai-core: Core Runtime for vai
//!
//! Layer2 - 워크스페이스 매핑 캐시
//!
//! # 주요 모듈
//!
//! - `mapping`: 파일별 개요 캐시 (저장소, 재생성 스케줄러, 공개 API)
//!
//! # 사용 예시
//!
//! ```ignore
//! use vai_core::{CommandSummarizer, WorkspaceMappingCache};
//!
//! let cache = WorkspaceMappingCache::builder(workspace)
//!     .summarizer(Arc::new(CommandSummarizer::new("my-llm --stdin")))
//!     .build()?;
//!
//! // 파일 추가 후 매핑
//! cache.add_file("src/Main.java");
//! if let Some(job) = cache.map_file("src/Main.java") {
//!     job.await?;
//! }
//!
//! // 모델 컨텍스트
//! let digest = cache.render(None);
//! ```

pub mod mapping;

// Re-exports: Mapping
pub use mapping::{
    // Types
    BatchReport,
    JobOutcome,
    MappingEntry,
    MappingEvent,
    MappingStats,
    MappingStatus,
    RefreshJob,
    // Store
    MappingStore,
    MAPPINGS_FILE,
    // Scheduler
    MappingBatch,
    RefreshScheduler,
    // Summarizer
    CommandSummarizer,
    Summarizer,
    MAPPING_PROMPT,
    // Facade
    WorkspaceMappingCache,
    WorkspaceMappingCacheBuilder,
};

// Re-exports: Foundation
pub use vai_foundation::{ContentHash, Error, MappingConfiguration, Result};
