//! Config - 통합 설정 관리
//!
//! - `mapping.rs` - 추적 대상 파일 규칙 (무시 디렉토리, 확장자)
//! - `vai.rs` - VaiConfig 런타임 설정 (글로벌 + 프로젝트 병합)

mod mapping;
mod vai;

pub use mapping::MappingConfiguration;
pub use vai::{MapperSettings, VaiConfig, DEFAULT_MAX_CONCURRENT_JOBS, VAI_CONFIG_FILE};
