//! Subcommand handlers

use anyhow::Context;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use vai_core::{
    BatchReport, CommandSummarizer, Error, MappingBatch, Result, Summarizer,
    WorkspaceMappingCache,
};
use vai_foundation::VaiConfig;

/// Stand-in for commands that never regenerate
struct Unconfigured;

#[async_trait]
impl Summarizer for Unconfigured {
    async fn summarize(&self, _file_contents: &str) -> Result<String> {
        Err(Error::Config(
            "No summarizer command configured (use --summarizer-cmd or mapper.summarizerCommand)"
                .to_string(),
        ))
    }
}

pub fn open_cache(workspace: &Path, config: &VaiConfig) -> anyhow::Result<WorkspaceMappingCache> {
    let summarizer: Arc<dyn Summarizer> = match &config.mapper.summarizer_command {
        Some(command) => Arc::new(CommandSummarizer::new(command.clone())),
        None => Arc::new(Unconfigured),
    };

    WorkspaceMappingCache::builder(workspace)
        .summarizer(summarizer)
        .settings(&config.mapper)
        .build()
        .with_context(|| format!("Failed to open workspace {}", workspace.display()))
}

pub fn require_summarizer(config: &VaiConfig) -> anyhow::Result<()> {
    if config.mapper.summarizer_command.is_none() {
        anyhow::bail!(
            "No summarizer command configured (use --summarizer-cmd or mapper.summarizerCommand)"
        );
    }
    Ok(())
}

pub fn add(cache: &WorkspaceMappingCache, paths: &[PathBuf]) -> anyhow::Result<()> {
    let mut added = 0;
    for path in paths {
        if path.is_dir() {
            added += cache.add_directory(path);
        } else if cache.add_file(path) {
            added += 1;
        } else {
            eprintln!("Skipping {}: not a readable file", path.display());
        }
    }
    println!("Tracked {} files", added);
    Ok(())
}

pub fn remove(cache: &WorkspaceMappingCache, paths: &[PathBuf]) -> anyhow::Result<()> {
    let mut removed = 0;
    for path in paths {
        if cache.remove_file(path) {
            removed += 1;
        } else {
            removed += cache.remove_directory(path);
        }
    }
    println!("Untracked {} files", removed);
    Ok(())
}

pub async fn map(cache: &WorkspaceMappingCache, paths: &[PathBuf]) -> anyhow::Result<()> {
    if paths.is_empty() {
        return report(cache.map_directory(cache.root())).await;
    }
    report(cache.map_paths(paths)).await
}

pub async fn refresh(cache: &WorkspaceMappingCache) -> anyhow::Result<()> {
    report(cache.map_all_outdated()).await
}

async fn report(batch: MappingBatch) -> anyhow::Result<()> {
    let report: BatchReport = batch.join().await;
    println!("{}", report);
    if report.failed > 0 {
        anyhow::bail!("{} synopses could not be generated", report.failed);
    }
    Ok(())
}

pub fn status(cache: &WorkspaceMappingCache, json: bool) -> anyhow::Result<()> {
    let entries = cache.entries();

    if json {
        let rows: Vec<serde_json::Value> = entries
            .iter()
            .map(|entry| {
                serde_json::json!({
                    "path": entry.path,
                    "status": entry.status().as_str(),
                    "md5sum": entry.content_hash,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    for entry in &entries {
        let shown = entry
            .path
            .strip_prefix(cache.root())
            .unwrap_or(&entry.path);
        println!("{:<8} {}", entry.status(), shown.display());
    }
    println!("{}", cache.stats());
    Ok(())
}

pub fn render(cache: &WorkspaceMappingCache, paths: &[PathBuf]) -> anyhow::Result<()> {
    let selection = if paths.is_empty() { None } else { Some(paths) };
    print!("{}", cache.render(selection));
    Ok(())
}
