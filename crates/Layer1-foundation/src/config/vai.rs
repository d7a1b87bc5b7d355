//! Vai Config - 통합 설정
//!
//! 글로벌(~/.config/vai/config.json) 위에 프로젝트(<root>/.vai/config.json)를
//! 덮어써서 사용

use crate::storage::JsonStore;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// 설정 파일명
pub const VAI_CONFIG_FILE: &str = "config.json";

/// Regeneration jobs allowed at once when not configured
pub const DEFAULT_MAX_CONCURRENT_JOBS: usize = 30;

// ============================================================================
// Vai Config (통합)
// ============================================================================

/// vai 런타임 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaiConfig {
    /// 버전 (마이그레이션용)
    #[serde(default = "default_version")]
    pub version: u32,

    /// 로그 레벨 (RUST_LOG가 우선)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// 매핑 캐시 설정
    #[serde(default)]
    pub mapper: MapperSettings,
}

impl VaiConfig {
    pub fn new() -> Self {
        Self {
            version: default_version(),
            ..Self::default()
        }
    }

    // ========================================================================
    // Load / Save
    // ========================================================================

    /// 글로벌 + 프로젝트 병합 로드
    pub fn load(workspace: &Path) -> Result<Self> {
        let mut config = Self::new();

        // 1. 글로벌 설정
        if let Ok(global) = JsonStore::global() {
            if let Some(global_config) = global.load_optional::<VaiConfig>(VAI_CONFIG_FILE)? {
                debug!("Loaded global config from {}", global.base_dir().display());
                config.merge(global_config);
            }
        }

        // 2. 프로젝트 설정
        let project = JsonStore::project(workspace);
        if let Some(project_config) = project.load_optional::<VaiConfig>(VAI_CONFIG_FILE)? {
            debug!("Loaded project config from {}", project.base_dir().display());
            config.merge(project_config);
        }

        Ok(config)
    }

    /// 프로젝트 설정 저장
    pub fn save_project(&self, workspace: &Path) -> Result<()> {
        JsonStore::project(workspace).save(VAI_CONFIG_FILE, self)
    }

    // ========================================================================
    // Merge
    // ========================================================================

    /// 다른 설정과 병합 (other가 우선)
    pub fn merge(&mut self, other: VaiConfig) {
        if other.log_level.is_some() {
            self.log_level = other.log_level;
        }
        self.mapper.merge(other.mapper);
    }

    // ========================================================================
    // Builder
    // ========================================================================

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    pub fn summarizer_command(mut self, command: impl Into<String>) -> Self {
        self.mapper.summarizer_command = Some(command.into());
        self
    }
}

// ============================================================================
// Mapper Settings
// ============================================================================

/// 매핑 캐시 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapperSettings {
    /// 동시에 실행되는 재생성 작업 수 (없으면 30)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrent_jobs: Option<usize>,

    /// 파일 내용을 stdin으로 받아 요약을 stdout으로 내는 셸 명령
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summarizer_command: Option<String>,
}

impl MapperSettings {
    /// Effective job limit, at least 1
    pub fn max_concurrent_jobs(&self) -> usize {
        self.max_concurrent_jobs
            .unwrap_or(DEFAULT_MAX_CONCURRENT_JOBS)
            .max(1)
    }

    fn merge(&mut self, other: MapperSettings) {
        if other.max_concurrent_jobs.is_some() {
            self.max_concurrent_jobs = other.max_concurrent_jobs;
        }
        if other.summarizer_command.is_some() {
            self.summarizer_command = other.summarizer_command;
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn default_version() -> u32 {
    1
}
