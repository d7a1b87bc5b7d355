//! # vai-foundation
//!
//! Foundation layer for vai:
//! - Error: 공통 에러 타입
//! - Config: 런타임 설정 (VaiConfig), 추적 규칙 (MappingConfiguration)
//! - Storage: JsonStore (범용 JSON 저장소)
//! - Hash: 파일 내용 지문 (ContentHash)

pub mod config;
pub mod error;
pub mod hash;
pub mod storage;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::{
    MapperSettings, MappingConfiguration, VaiConfig, DEFAULT_MAX_CONCURRENT_JOBS, VAI_CONFIG_FILE,
};

// ============================================================================
// Storage (저장소)
// ============================================================================
pub use storage::JsonStore;

// ============================================================================
// Hash (내용 지문)
// ============================================================================
pub use hash::ContentHash;
