//! Summarizer - 파일 내용을 개요(synopsis)로 변환하는 외부 서비스
//!
//! The cache only knows the [`Summarizer`] trait. Any model transport plugs
//! in behind it; [`CommandSummarizer`] is the one shipped here and delegates
//! to an arbitrary shell command.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;
use vai_foundation::{Error, Result};

/// Instruction sent along with every file
pub const MAPPING_PROMPT: &str = "Goal: Reduce class length for overview.
Take classes and reduce them to as primitive of an outline as possible, for the purpose of quick overview by developers looking to identify which classes may be relevant to reference for a certain task.

Format:
<namespace/package>
class <classname> : <any inheritances>
    fields:
        field1: int;
        field2: string;
        field3: Object;
    methods:
        methodOne(): string; <description of methodOne>
        methodTwo(obj: Object); <description of methodTwo>

If no fields, don't include fields block. If no methods, don't include methods block. Modifiers are not relevant (i.e. final/readonly public private etc).";

/// Environment variable carrying [`MAPPING_PROMPT`] to command summarizers
pub const PROMPT_ENV_VAR: &str = "VAI_MAPPING_PROMPT";

/// Turns file contents into a synopsis
///
/// Implementations may block for seconds. The cache enforces no timeout of
/// its own, so implementations that talk to a network should.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, file_contents: &str) -> Result<String>;
}

// ============================================================================
// CommandSummarizer
// ============================================================================

/// Runs a shell command per file: contents on stdin, synopsis on stdout
#[derive(Debug, Clone)]
pub struct CommandSummarizer {
    command: String,
    timeout: Duration,
}

impl CommandSummarizer {
    const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    fn shell(&self) -> Command {
        #[cfg(target_os = "windows")]
        {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C").arg(&self.command);
            cmd
        }
        #[cfg(not(target_os = "windows"))]
        {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(&self.command);
            cmd
        }
    }

    async fn run(&self, file_contents: &str) -> Result<String> {
        let mut child = self
            .shell()
            .env(PROMPT_ENV_VAR, MAPPING_PROMPT)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::summarizer(format!("Failed to spawn '{}': {}", self.command, e)))?;

        // stdin은 별도 태스크에서 써야 출력 파이프가 가득 차도 교착되지 않음
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::summarizer("Summarizer stdin unavailable"))?;
        let input = file_contents.to_owned();
        let writer = tokio::spawn(async move {
            let result = stdin.write_all(input.as_bytes()).await;
            drop(stdin);
            result
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| Error::summarizer(format!("Summarizer command failed: {}", e)))?;

        if let Ok(Err(e)) = writer.await {
            // 명령이 입력을 다 읽지 않고 끝난 경우. 출력이 있으면 사용
            debug!("Summarizer closed stdin early: {}", e);
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::summarizer(format!(
                "'{}' exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl Summarizer for CommandSummarizer {
    async fn summarize(&self, file_contents: &str) -> Result<String> {
        match tokio::time::timeout(self.timeout, self.run(file_contents)).await {
            Ok(result) => result,
            Err(_) => Err(Error::summarizer(format!(
                "'{}' timed out after {}s",
                self.command,
                self.timeout.as_secs()
            ))),
        }
    }
}
