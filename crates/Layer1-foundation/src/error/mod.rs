//! Error types for vai
//!
//! 모든 에러를 중앙에서 관리

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// vai 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 설정 관련
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // 저장소 관련
    // ========================================================================
    #[error("Storage error: {0}")]
    Storage(String),

    // ========================================================================
    // Summarizer 관련
    // ========================================================================
    #[error("Summarizer error: {0}")]
    Summarizer(String),

    // ========================================================================
    // 실행 관련
    // ========================================================================
    #[error("Runtime error: {0}")]
    Runtime(String),

    // ========================================================================
    // 일반
    // ========================================================================
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ========================================================================
    // 기타
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// 재시도 가능한 에러인지 확인
    ///
    /// A failed regeneration is simply retried on the next map call, so
    /// this only tells callers whether retrying sooner could help.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Summarizer(_) | Error::Io(_))
    }

    /// Summarizer 에러 생성 헬퍼
    pub fn summarizer(message: impl Into<String>) -> Self {
        Error::Summarizer(message.into())
    }

    /// Storage 에러 생성 헬퍼
    pub fn storage(message: impl Into<String>) -> Self {
        Error::Storage(message.into())
    }
}

// ============================================================================
// From 구현 (추가 변환)
// ============================================================================

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}
