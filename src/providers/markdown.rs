// src/providers/markdown.rs

//! Markdown changelog adapter.
//!
//! Handles both the free-form changesets format and Keep a Changelog. A
//! changelog is either a local file (resolved against the project root and
//! watchable) or a raw `http(s)://` URL fetched with conditional requests.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::HeaderMap;
use url::Url;

use crate::error::{AppError, Result};
use crate::markdown::segment;
use crate::models::{BaseConfig, MarkdownConfig, ProviderConfig, ProviderInfo, ProviderKind, VersionEntry};
use crate::pipeline::sync::{SyncPolicy, SyncReport};
use crate::providers::{Provider, SyncContext, mismatch};
use crate::utils::http::{FetchOutcome, conditional_get};
use crate::utils::is_remote;

/// Trailing ` - YYYY-MM-DD` of a Keep a Changelog heading.
static DATED_HEADING: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(.*?)\s-\s?\d{4}-\d{2}-\d{2}\s*$").ok());

/// Conventions of a Markdown changelog format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkdownFlavor {
    Changeset,
    KeepAChangelog,
}

impl MarkdownFlavor {
    pub fn kind(self) -> ProviderKind {
        match self {
            MarkdownFlavor::Changeset => ProviderKind::Changeset,
            MarkdownFlavor::KeepAChangelog => ProviderKind::KeepAChangelog,
        }
    }

    pub fn provider_info(self) -> ProviderInfo {
        match self {
            MarkdownFlavor::Changeset => ProviderInfo::new("changeset", "Changeset"),
            MarkdownFlavor::KeepAChangelog => ProviderInfo::new("keep-a-changelog", "Keep a Changelog"),
        }
    }

    fn ignores(self, heading: &str) -> bool {
        match self {
            MarkdownFlavor::Changeset => false,
            MarkdownFlavor::KeepAChangelog => heading == "Unreleased",
        }
    }

    /// Built-in title normalization, applied before the user hook.
    fn transform(self, heading: &str) -> String {
        match (self, DATED_HEADING.as_ref()) {
            (MarkdownFlavor::KeepAChangelog, Some(re)) => re.replace(heading, "$1").into_owned(),
            _ => heading.to_string(),
        }
    }
}

/// Where a Markdown changelog is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangelogSource {
    Local(PathBuf),
    Remote(Url),
}

impl ChangelogSource {
    /// Classify `location`, resolving local paths against `root`.
    pub fn resolve(location: &str, root: &Path) -> Result<Self> {
        if is_remote(location) {
            let url = Url::parse(location).map_err(|e| AppError::parse(location, e))?;
            return Ok(ChangelogSource::Remote(url));
        }
        Ok(ChangelogSource::Local(root.join(location)))
    }
}

impl fmt::Display for ChangelogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangelogSource::Local(path) => write!(f, "{}", path.display()),
            ChangelogSource::Remote(url) => write!(f, "{url}"),
        }
    }
}

/// Path to watch for a Markdown changelog, if it is a local file.
pub fn watch_path(config: &MarkdownConfig, root: &Path) -> Option<PathBuf> {
    match ChangelogSource::resolve(&config.changelog, root).ok()? {
        ChangelogSource::Local(path) => Some(path),
        ChangelogSource::Remote(_) => None,
    }
}

/// Turn a Markdown document into version entries for `base`.
pub fn parse_changelog(flavor: MarkdownFlavor, base: &BaseConfig, content: &str) -> Vec<VersionEntry> {
    let provider = flavor.provider_info();

    segment(content)
        .into_iter()
        .filter(|section| !flavor.ignores(&section.heading))
        .filter_map(|section| {
            let title = flavor.transform(&section.heading);
            if title.trim().is_empty() {
                log::debug!("{}: skipping a version heading without text", base.base);
                return None;
            }
            let title = base.process_title(title)?;
            let entry = VersionEntry::new(&base.base, title, section.body, provider.clone());
            if entry.slug.is_empty() {
                log::debug!("{}: skipping '{}', it has no characters to build a slug from", base.base, entry.title);
                return None;
            }
            Some(entry)
        })
        .collect()
}

/// Adapter for `changeset` and `keep-a-changelog` changelogs.
#[derive(Debug, Clone, Copy)]
pub struct MarkdownProvider {
    flavor: MarkdownFlavor,
}

impl MarkdownProvider {
    pub fn new(flavor: MarkdownFlavor) -> Self {
        Self { flavor }
    }

    async fn sync_source(
        &self,
        source: &ChangelogSource,
        config: &BaseConfig,
        ctx: &SyncContext,
    ) -> Result<SyncReport> {
        let base = config.base.as_str();

        let (content, validators) = match source {
            ChangelogSource::Local(path) => (read_local(path).await?, None),
            ChangelogSource::Remote(url) => {
                let previous = ctx.validators(base).await;
                match conditional_get(ctx.client(), url, HeaderMap::new(), previous.as_ref(), ctx.mode())
                    .await?
                {
                    FetchOutcome::NotModified => {
                        log::info!("{base}: {url} not modified");
                        return Ok(SyncReport::not_modified(base));
                    }
                    FetchOutcome::Unavailable => return Ok(SyncReport::not_modified(base)),
                    FetchOutcome::Modified(page) => (page.body, Some(page.validators)),
                }
            }
        };

        let entries = parse_changelog(self.flavor, config, &content);
        log::debug!("{base}: parsed {} versions from {source}", entries.len());

        let report = ctx.sync(base, entries, SyncPolicy::Additive).await;
        if let Some(validators) = validators {
            ctx.store_validators(base, validators).await;
        }
        Ok(report)
    }
}

#[async_trait]
impl Provider for MarkdownProvider {
    fn kind(&self) -> ProviderKind {
        self.flavor.kind()
    }

    async fn load(&self, config: &ProviderConfig, ctx: &SyncContext) -> Result<SyncReport> {
        let markdown = config
            .as_markdown()
            .filter(|_| config.kind() == self.kind())
            .ok_or_else(|| mismatch(self.kind(), config))?;

        let source = ChangelogSource::resolve(&markdown.changelog, ctx.root())
            .map_err(|e| AppError::changelog(markdown.changelog.as_str(), e))?;

        self.sync_source(&source, &markdown.base, ctx)
            .await
            .map_err(|e| AppError::changelog(source.to_string(), e))
    }
}

async fn read_local(path: &Path) -> Result<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(AppError::SourceNotFound(path.to_path_buf())),
        Err(e) if e.kind() == ErrorKind::InvalidData => Err(AppError::parse(path.display().to_string(), e)),
        Err(e) => Err(AppError::Io(e)),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use reqwest::Client;
    use tempfile::TempDir;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::models::{LoadMode, ProcessHook};
    use crate::storage::ContentStore;

    const KEEP_A_CHANGELOG: &str = "# Changelog\n\n## [Unreleased]\n\n- Pending\n\n## [1.1.0] - 2019-02-15\n\n### Added\n\n- Translations\n\n## [1.0.0] - 2017-06-20\n\n- First release\n\n[unreleased]: https://example.com/compare/v1.1.0...HEAD\n[1.1.0]: https://example.com/compare/v1.0.0...v1.1.0\n[1.0.0]: https://example.com/releases/tag/v1.0.0\n";

    fn markdown_config(kind: ProviderKind, base: &str, changelog: &str) -> ProviderConfig {
        let config = MarkdownConfig {
            base: BaseConfig::new(base),
            changelog: changelog.to_string(),
        };
        match kind {
            ProviderKind::KeepAChangelog => ProviderConfig::KeepAChangelog(config),
            _ => ProviderConfig::Changeset(config),
        }
    }

    fn changeset() -> MarkdownProvider {
        MarkdownProvider::new(MarkdownFlavor::Changeset)
    }

    fn keep_a_changelog() -> MarkdownProvider {
        MarkdownProvider::new(MarkdownFlavor::KeepAChangelog)
    }

    #[test]
    fn test_keep_a_changelog_titles() {
        let entries = parse_changelog(
            MarkdownFlavor::KeepAChangelog,
            &BaseConfig::new("kac"),
            KEEP_A_CHANGELOG,
        );

        let titles: Vec<_> = entries.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["1.1.0", "1.0.0"]);
        assert_eq!(entries[0].id, "kac/version/1-1-0");
        assert_eq!(entries[0].body, "### Added\n\n- Translations\n");
        assert_eq!(entries[0].provider.label, "Keep a Changelog");
    }

    #[test]
    fn test_changeset_keeps_raw_titles() {
        let entries = parse_changelog(
            MarkdownFlavor::Changeset,
            &BaseConfig::new("docs"),
            KEEP_A_CHANGELOG,
        );

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].title, "Unreleased");
        assert_eq!(entries[0].provider, ProviderInfo::new("changeset", "Changeset"));
        assert_eq!(entries[1].title, "1.1.0 - 2019-02-15");
        assert!(entries[1].date.is_none());
        assert!(entries[1].link.is_none());
    }

    #[test]
    fn test_skips_headings_without_slug_characters() {
        let doc = "## 🎉\n\n- Party\n\n## ---\n\n- Dashes\n\n## 1.0.0\n\n- First\n";
        let entries = parse_changelog(MarkdownFlavor::Changeset, &BaseConfig::new("docs"), doc);

        let ids: Vec<_> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["docs/version/1-0-0"]);
    }

    #[test]
    fn test_process_hook_renames_and_drops() {
        let mut base = BaseConfig::new("docs");
        base.process = Some(ProcessHook::new(|title| {
            title.strip_prefix("pkg@").map(|version| format!("v{version}"))
        }));

        let doc = "## pkg@2.0.0\n\n- b\n\n## other@1.0.0\n\n- x\n\n## pkg@1.0.0\n\n- a\n";
        let entries = parse_changelog(MarkdownFlavor::Changeset, &base, doc);

        let ids: Vec<_> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["docs/version/v2-0-0", "docs/version/v1-0-0"]);
        assert_eq!(entries[0].title, "v2.0.0");
    }

    #[tokio::test]
    async fn test_local_changelog_relative_to_root() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("CHANGELOG.md"), KEEP_A_CHANGELOG)
            .await
            .unwrap();
        let ctx = SyncContext::in_memory(Client::new()).with_root(tmp.path());
        let config = markdown_config(ProviderKind::KeepAChangelog, "kac", "CHANGELOG.md");

        let report = keep_a_changelog().load(&config, &ctx).await.unwrap();
        assert_eq!(report.inserted, 2);

        let again = keep_a_changelog().load(&config, &ctx).await.unwrap();
        assert_eq!(again.unchanged, 2);
        assert!(!again.has_changes());
        assert_eq!(ctx.store().lock().await.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_local_file() {
        let tmp = TempDir::new().unwrap();
        let ctx = SyncContext::in_memory(Client::new()).with_root(tmp.path());
        let config = markdown_config(ProviderKind::Changeset, "docs", "missing.md");

        let error = changeset().load(&config, &ctx).await.unwrap_err();
        match error {
            AppError::Source { origin, source } => {
                assert!(origin.ends_with("missing.md"));
                assert!(matches!(*source, AppError::SourceNotFound(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_rejects_mismatched_config() {
        let ctx = SyncContext::in_memory(Client::new());
        let config = markdown_config(ProviderKind::KeepAChangelog, "kac", "CHANGELOG.md");

        let error = changeset().load(&config, &ctx).await.unwrap_err();
        assert!(matches!(error, AppError::Provider(_)));
    }

    #[tokio::test]
    async fn test_remote_changelog_uses_conditional_requests() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/CHANGELOG.md"))
            .and(header("if-none-match", "\"v1\""))
            .respond_with(ResponseTemplate::new(304))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/CHANGELOG.md"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(KEEP_A_CHANGELOG)
                    .insert_header("etag", "\"v1\""),
            )
            .expect(1)
            .mount(&server)
            .await;

        let ctx = SyncContext::in_memory(Client::new());
        let url = format!("{}/CHANGELOG.md", server.uri());
        let config = markdown_config(ProviderKind::KeepAChangelog, "kac", &url);

        let first = keep_a_changelog().load(&config, &ctx).await.unwrap();
        assert_eq!(first.inserted, 2);
        assert_eq!(
            ctx.validators("kac").await.and_then(|v| v.etag).as_deref(),
            Some("\"v1\"")
        );

        let second = keep_a_changelog().load(&config, &ctx).await.unwrap();
        assert!(second.not_modified);
        assert_eq!(ctx.store().lock().await.len(), 2);
    }

    #[tokio::test]
    async fn test_remote_failure_in_dev_keeps_store() {
        let ctx = SyncContext::in_memory(Client::new()).with_mode(LoadMode::Dev);
        let config = markdown_config(ProviderKind::Changeset, "docs", "http://127.0.0.1:9/CHANGELOG.md");

        let report = changeset().load(&config, &ctx).await.unwrap();
        assert!(report.not_modified);
        assert!(ctx.store().lock().await.is_empty());

        let build = SyncContext::new(Client::new(), Arc::clone(ctx.store()));
        let error = changeset().load(&config, &build).await.unwrap_err();
        assert!(matches!(error, AppError::Source { .. }));
    }

    #[test]
    fn test_watch_path_only_for_local_files() {
        let root = Path::new("/project");
        let local = MarkdownConfig {
            base: BaseConfig::new("docs"),
            changelog: "CHANGELOG.md".into(),
        };
        let remote = MarkdownConfig {
            base: BaseConfig::new("docs"),
            changelog: "https://example.com/CHANGELOG.md".into(),
        };

        assert_eq!(watch_path(&local, root), Some(PathBuf::from("/project/CHANGELOG.md")));
        assert_eq!(watch_path(&remote, root), None);
    }
}
