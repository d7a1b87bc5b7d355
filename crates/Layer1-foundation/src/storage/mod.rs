//! Storage module for vai
//!
//! - `json`: JSON - 범용 파일 저장/로드 (설정, 매핑 캐시)

mod json;

pub use json::JsonStore;
