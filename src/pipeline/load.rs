// src/pipeline/load.rs

//! Loader orchestrator: runs every enabled changelog through its adapter.

use std::path::PathBuf;

use serde::Serialize;

use crate::config::save_loader_config;
use crate::error::Result;
use crate::models::{LoaderConfig, ProviderConfig};
use crate::pipeline::sync::SyncReport;
use crate::providers::markdown::watch_path;
use crate::providers::{ProviderRegistry, SyncContext};

/// Aggregated result of a [`Loader::run`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadSummary {
    pub reports: Vec<SyncReport>,
    /// Changelogs skipped because they are disabled
    pub skipped: usize,
}

impl LoadSummary {
    pub fn inserted(&self) -> usize {
        self.reports.iter().map(|r| r.inserted).sum()
    }

    pub fn updated(&self) -> usize {
        self.reports.iter().map(|r| r.updated).sum()
    }

    pub fn deleted(&self) -> usize {
        self.reports.iter().map(|r| r.deleted).sum()
    }

    pub fn unchanged(&self) -> usize {
        self.reports.iter().map(|r| r.unchanged).sum()
    }

    pub fn change_count(&self) -> usize {
        self.reports.iter().map(SyncReport::change_count).sum()
    }

    pub fn has_changes(&self) -> bool {
        self.change_count() > 0
    }
}

/// Drives a validated [`LoaderConfig`] through the provider registry.
#[derive(Clone)]
pub struct Loader {
    config: LoaderConfig,
    registry: ProviderRegistry,
    ctx: SyncContext,
    config_file: Option<PathBuf>,
}

impl Loader {
    pub fn new(config: LoaderConfig, ctx: SyncContext) -> Self {
        Self {
            config,
            registry: ProviderRegistry::default(),
            ctx,
            config_file: None,
        }
    }

    pub fn with_registry(mut self, registry: ProviderRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Persist the serialized configuration to `path` at the start of every run.
    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn context(&self) -> &SyncContext {
        &self.ctx
    }

    /// Save the configuration, then load every enabled changelog in order.
    ///
    /// The first failing changelog aborts the run.
    pub async fn run(&self) -> Result<LoadSummary> {
        if let Some(path) = &self.config_file {
            save_loader_config(path, &self.config).await?;
        }

        let mut summary = LoadSummary::default();
        for changelog in self.config.changelogs() {
            if !changelog.base().enabled {
                log::debug!("Skipping disabled changelog '{}'", changelog.base().base);
                summary.skipped += 1;
                continue;
            }
            summary.reports.push(self.load_one(changelog).await?);
        }

        log::info!(
            "Loaded {} changelogs: {} inserted, {} updated, {} deleted, {} unchanged",
            summary.reports.len(),
            summary.inserted(),
            summary.updated(),
            summary.deleted(),
            summary.unchanged()
        );
        Ok(summary)
    }

    /// Load a single changelog. Also the reload path of the watch loop.
    pub async fn load_one(&self, changelog: &ProviderConfig) -> Result<SyncReport> {
        let base = &changelog.base().base;
        log::info!("Loading {} changelog '{}'", changelog.kind(), base);

        let report = self.registry.load(changelog, &self.ctx).await?;

        if report.not_modified {
            log::info!("'{base}' unchanged since the last run");
        } else {
            log::info!(
                "'{base}': {} inserted, {} updated, {} deleted, {} unchanged",
                report.inserted,
                report.updated,
                report.deleted,
                report.unchanged
            );
        }
        Ok(report)
    }

    /// Local files of enabled Markdown changelogs, with the index of their config.
    pub fn watch_targets(&self) -> Vec<(PathBuf, usize)> {
        self.config
            .changelogs()
            .iter()
            .enumerate()
            .filter(|(_, changelog)| changelog.base().enabled)
            .filter_map(|(index, changelog)| {
                let markdown = changelog.as_markdown()?;
                Some((watch_path(markdown, self.ctx.root())?, index))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use reqwest::Client;
    use tempfile::TempDir;

    use super::*;
    use crate::error::AppError;
    use crate::models::{BaseConfig, GitHubConfig, MarkdownConfig};
    use crate::providers::markdown::{MarkdownFlavor, MarkdownProvider};
    use crate::storage::ContentStore;

    fn changeset(base: &str, changelog: &str, enabled: bool) -> ProviderConfig {
        let mut config = BaseConfig::new(base);
        config.enabled = enabled;
        ProviderConfig::Changeset(MarkdownConfig {
            base: config,
            changelog: changelog.to_string(),
        })
    }

    #[tokio::test]
    async fn test_run_skips_disabled_and_persists_config() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("a.md"), "## 1.0.0\n\n- a\n")
            .await
            .unwrap();

        let config = LoaderConfig::resolve(vec![
            changeset("a", "a.md", true),
            // Never read: the file does not exist.
            changeset("b", "missing.md", false),
        ])
        .unwrap();
        let ctx = SyncContext::in_memory(Client::new()).with_root(tmp.path());
        let config_file = tmp.path().join("cache/changelogs.json");
        let loader = Loader::new(config, ctx).with_config_file(&config_file);

        let summary = loader.run().await.unwrap();
        assert_eq!(summary.reports.len(), 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.inserted(), 1);
        assert!(config_file.exists());
    }

    #[tokio::test]
    async fn test_failure_aborts_but_config_is_saved() {
        let tmp = TempDir::new().unwrap();
        let config = LoaderConfig::resolve(vec![changeset("docs", "missing.md", true)]).unwrap();
        let ctx = SyncContext::in_memory(Client::new()).with_root(tmp.path());
        let config_file = tmp.path().join("changelogs.json");

        let result = Loader::new(config, ctx)
            .with_config_file(&config_file)
            .run()
            .await;

        assert!(result.is_err());
        assert!(config_file.exists());
    }

    #[tokio::test]
    async fn test_custom_registry_limits_dispatch() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("a.md"), "## 1.0.0\n\n- a\n")
            .await
            .unwrap();

        let config = LoaderConfig::resolve(vec![
            changeset("a", "a.md", true),
            ProviderConfig::Github(GitHubConfig {
                base: BaseConfig::new("gh"),
                owner: "o".into(),
                repo: "r".into(),
                token: None,
                api: "http://127.0.0.1:9".into(),
            }),
        ])
        .unwrap();
        let mut registry = ProviderRegistry::empty();
        registry.register(Arc::new(MarkdownProvider::new(MarkdownFlavor::Changeset)));
        let ctx = SyncContext::in_memory(Client::new()).with_root(tmp.path());
        let loader = Loader::new(config, ctx).with_registry(registry);

        let error = loader.run().await.unwrap_err();
        assert!(matches!(error, AppError::Provider(_)));
        assert_eq!(loader.context().store().lock().await.keys(), vec!["a/version/1-0-0"]);
    }

    #[test]
    fn test_watch_targets() {
        let config = LoaderConfig::resolve(vec![
            changeset("a", "a.md", true),
            changeset("b", "https://example.com/CHANGELOG.md", true),
            changeset("c", "c.md", false),
            ProviderConfig::Github(GitHubConfig {
                base: BaseConfig::new("gh"),
                owner: "o".into(),
                repo: "r".into(),
                token: None,
                api: "https://api.github.com".into(),
            }),
        ])
        .unwrap();
        let ctx = SyncContext::in_memory(Client::new()).with_root("/project");

        let targets = Loader::new(config, ctx).watch_targets();
        assert_eq!(targets, vec![(PathBuf::from("/project/a.md"), 0)]);
    }
}
