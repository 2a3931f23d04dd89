//! Application and provider configuration structures.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};
use crate::utils::{is_remote, strip_leading_and_trailing_slash, strip_trailing_slash};

/// Root application configuration, as read from `changelogs.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// HTTP and runtime settings
    #[serde(default)]
    pub settings: Settings,

    /// Changelogs to ingest, in load order
    #[serde(default)]
    pub changelogs: Vec<ProviderConfig>,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| AppError::config(format!("{}: {}", path.display(), e.message())))
    }
}

/// HTTP client and runtime settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Directory holding the store, fetch metadata, and persisted config
    #[serde(default = "defaults::cache_dir")]
    pub cache_dir: PathBuf,

    /// Interactive/development mode
    #[serde(default)]
    pub dev: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            cache_dir: defaults::cache_dir(),
            dev: false,
        }
    }
}

impl Settings {
    /// Validate settings values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        let mut issues = Vec::new();
        if self.user_agent.trim().is_empty() {
            issues.push("settings.user_agent is empty".to_string());
        }
        if self.timeout_secs == 0 {
            issues.push("settings.timeout_secs must be > 0".to_string());
        }
        if issues.is_empty() {
            Ok(())
        } else {
            Err(AppError::invalid_config(issues))
        }
    }

    pub fn mode(&self) -> LoadMode {
        if self.dev { LoadMode::Dev } else { LoadMode::Build }
    }
}

/// Whether a load runs as a one-shot build or inside an interactive session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadMode {
    /// Every failure aborts the load
    #[default]
    Build,
    /// Network failures on remote sources are logged and skipped
    Dev,
}

impl LoadMode {
    pub fn is_dev(self) -> bool {
        matches!(self, LoadMode::Dev)
    }
}

/// Closed set of supported changelog sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    Changeset,
    KeepAChangelog,
    Github,
    Gitea,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::Changeset,
        ProviderKind::KeepAChangelog,
        ProviderKind::Github,
        ProviderKind::Gitea,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::Changeset => "changeset",
            ProviderKind::KeepAChangelog => "keep-a-changelog",
            ProviderKind::Github => "github",
            ProviderKind::Gitea => "gitea",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Changelog title, either one string or one per locale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Title {
    Single(String),
    Localized(BTreeMap<String, String>),
}

impl Default for Title {
    fn default() -> Self {
        Title::Single("Changelog".to_string())
    }
}

impl Title {
    fn is_blank(&self) -> bool {
        match self {
            Title::Single(title) => title.trim().is_empty(),
            Title::Localized(titles) => {
                titles.is_empty() || titles.values().any(|t| t.trim().is_empty())
            }
        }
    }
}

/// User callback that renames a version or drops it by returning `None`.
///
/// Lives only in-process: it is never serialized or persisted.
#[derive(Clone)]
pub struct ProcessHook(Arc<dyn Fn(&str) -> Option<String> + Send + Sync>);

impl ProcessHook {
    pub fn new(hook: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
        Self(Arc::new(hook))
    }

    /// Apply the hook. An empty replacement drops the version too.
    pub fn apply(&self, title: &str) -> Option<String> {
        (self.0)(title).filter(|title| !title.is_empty())
    }
}

impl fmt::Debug for ProcessHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ProcessHook(..)")
    }
}

/// Fields shared by every provider.
#[derive(Debug, Clone, Deserialize)]
pub struct BaseConfig {
    /// Namespace key for this changelog
    pub base: String,

    /// Disabled changelogs are never fetched or stored
    #[serde(default = "defaults::enabled")]
    pub enabled: bool,

    /// Whether changelog pages are indexed for site search
    #[serde(default = "defaults::pagefind")]
    pub pagefind: bool,

    /// Number of versions per list page
    #[serde(default = "defaults::page_size", alias = "pageSize")]
    pub page_size: usize,

    /// Display title of the changelog
    #[serde(default)]
    pub title: Title,

    #[serde(skip)]
    pub process: Option<ProcessHook>,
}

impl BaseConfig {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            enabled: defaults::enabled(),
            pagefind: defaults::pagefind(),
            page_size: defaults::page_size(),
            title: Title::default(),
            process: None,
        }
    }

    /// Run a title through the user hook, if any.
    pub fn process_title(&self, title: String) -> Option<String> {
        match &self.process {
            Some(hook) => hook.apply(&title),
            None => Some(title),
        }
    }
}

/// Markdown changelog (file path or raw URL).
#[derive(Debug, Clone, Deserialize)]
pub struct MarkdownConfig {
    #[serde(flatten)]
    pub base: BaseConfig,

    /// Path relative to the project root, or an `http(s)://` URL
    pub changelog: String,
}

/// GitHub Releases source.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubConfig {
    #[serde(flatten)]
    pub base: BaseConfig,

    pub owner: String,

    pub repo: String,

    /// Personal access token sent as a bearer token
    #[serde(default)]
    pub token: Option<String>,

    /// REST API endpoint
    #[serde(default = "defaults::github_api")]
    pub api: String,
}

/// Gitea-compatible Releases source (Gitea, Forgejo, Codeberg).
#[derive(Debug, Clone, Deserialize)]
pub struct GiteaConfig {
    #[serde(flatten)]
    pub base: BaseConfig,

    pub owner: String,

    pub repo: String,

    /// API token with read access to the repository
    #[serde(default)]
    pub token: Option<String>,

    /// REST API endpoint
    #[serde(default = "defaults::gitea_api")]
    pub api: String,

    /// Label shown for the provider
    #[serde(default = "defaults::gitea_label", alias = "providerLabel")]
    pub provider_label: String,
}

/// One configured changelog, tagged by its `provider` field.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "provider", rename_all = "kebab-case")]
pub enum ProviderConfig {
    Changeset(MarkdownConfig),
    KeepAChangelog(MarkdownConfig),
    Github(GitHubConfig),
    Gitea(GiteaConfig),
}

impl ProviderConfig {
    pub fn kind(&self) -> ProviderKind {
        match self {
            ProviderConfig::Changeset(_) => ProviderKind::Changeset,
            ProviderConfig::KeepAChangelog(_) => ProviderKind::KeepAChangelog,
            ProviderConfig::Github(_) => ProviderKind::Github,
            ProviderConfig::Gitea(_) => ProviderKind::Gitea,
        }
    }

    pub fn base(&self) -> &BaseConfig {
        match self {
            ProviderConfig::Changeset(c) | ProviderConfig::KeepAChangelog(c) => &c.base,
            ProviderConfig::Github(c) => &c.base,
            ProviderConfig::Gitea(c) => &c.base,
        }
    }

    fn base_mut(&mut self) -> &mut BaseConfig {
        match self {
            ProviderConfig::Changeset(c) | ProviderConfig::KeepAChangelog(c) => &mut c.base,
            ProviderConfig::Github(c) => &mut c.base,
            ProviderConfig::Gitea(c) => &mut c.base,
        }
    }

    /// Markdown settings, for the Markdown-backed kinds.
    pub fn as_markdown(&self) -> Option<&MarkdownConfig> {
        match self {
            ProviderConfig::Changeset(c) | ProviderConfig::KeepAChangelog(c) => Some(c),
            _ => None,
        }
    }

    /// Attach an in-process title hook.
    pub fn with_process(mut self, hook: ProcessHook) -> Self {
        self.base_mut().process = Some(hook);
        self
    }

    /// Secret-free projection for downstream consumers.
    pub fn serialized(&self) -> SerializedConfig {
        let base = self.base();
        SerializedConfig {
            provider: self.kind(),
            base: base.base.clone(),
            enabled: base.enabled,
            pagefind: base.pagefind,
            page_size: base.page_size,
            title: base.title.clone(),
        }
    }

    fn normalize(&mut self) {
        let base = self.base_mut();
        base.base = strip_leading_and_trailing_slash(&base.base).to_string();

        match self {
            ProviderConfig::Changeset(c) | ProviderConfig::KeepAChangelog(c) => {
                c.changelog = c.changelog.trim().to_string();
            }
            ProviderConfig::Github(c) => {
                c.api = strip_trailing_slash(c.api.trim()).to_string();
                c.token = c.token.take().filter(|t| !t.trim().is_empty());
            }
            ProviderConfig::Gitea(c) => {
                c.api = strip_trailing_slash(c.api.trim()).to_string();
                c.token = c.token.take().filter(|t| !t.trim().is_empty());
            }
        }
    }

    fn collect_issues(&self, index: usize, issues: &mut Vec<String>) {
        let label = format!("changelogs[{}] ({})", index, self.kind());
        let base = self.base();

        if base.page_size == 0 {
            issues.push(format!("{label}: page_size must be > 0"));
        }
        if base.title.is_blank() {
            issues.push(format!("{label}: title must not be empty"));
        }

        match self {
            ProviderConfig::Changeset(c) | ProviderConfig::KeepAChangelog(c) => {
                if c.changelog.is_empty() {
                    issues.push(format!("{label}: changelog must not be empty"));
                } else if is_remote(&c.changelog) && Url::parse(&c.changelog).is_err() {
                    issues.push(format!("{label}: changelog '{}' is not a valid URL", c.changelog));
                }
            }
            ProviderConfig::Github(c) => {
                check_repository(&label, &c.owner, &c.repo, &c.api, issues);
            }
            ProviderConfig::Gitea(c) => {
                check_repository(&label, &c.owner, &c.repo, &c.api, issues);
                if c.provider_label.trim().is_empty() {
                    issues.push(format!("{label}: provider_label must not be empty"));
                }
            }
        }
    }
}

fn check_repository(label: &str, owner: &str, repo: &str, api: &str, issues: &mut Vec<String>) {
    if owner.trim().is_empty() {
        issues.push(format!("{label}: owner must not be empty"));
    }
    if repo.trim().is_empty() {
        issues.push(format!("{label}: repo must not be empty"));
    }
    if !is_remote(api) || Url::parse(api).is_err() {
        issues.push(format!("{label}: api '{api}' is not a valid http(s) URL"));
    }
}

/// Plain-data view of a changelog configuration, safe to hand to other processes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedConfig {
    pub provider: ProviderKind,
    pub base: String,
    pub enabled: bool,
    pub pagefind: bool,
    pub page_size: usize,
    pub title: Title,
}

/// Validated, immutable list of changelog configurations.
#[derive(Debug, Clone, Default)]
pub struct LoaderConfig {
    changelogs: Vec<ProviderConfig>,
}

impl LoaderConfig {
    /// Normalize and validate every changelog, reporting all issues at once.
    pub fn resolve(changelogs: Vec<ProviderConfig>) -> Result<Self> {
        let mut changelogs = changelogs;
        let mut issues = Vec::new();
        let mut bases = HashSet::new();

        for (index, changelog) in changelogs.iter_mut().enumerate() {
            changelog.normalize();
            changelog.collect_issues(index, &mut issues);

            let base = &changelog.base().base;
            if !bases.insert(base.clone()) {
                issues.push(format!(
                    "changelogs[{index}] ({}): base '{base}' is already used by another changelog",
                    changelog.kind()
                ));
            }
        }

        if issues.is_empty() {
            Ok(Self { changelogs })
        } else {
            Err(AppError::invalid_config(issues))
        }
    }

    pub fn changelogs(&self) -> &[ProviderConfig] {
        &self.changelogs
    }

    /// Changelogs with `enabled = true`, in configured order.
    pub fn enabled(&self) -> impl Iterator<Item = &ProviderConfig> {
        self.changelogs.iter().filter(|c| c.base().enabled)
    }

    pub fn serialized(&self) -> Vec<SerializedConfig> {
        self.changelogs.iter().map(ProviderConfig::serialized).collect()
    }
}

mod defaults {
    use std::path::PathBuf;

    pub fn user_agent() -> String {
        concat!("changelog-sync/", env!("CARGO_PKG_VERSION")).into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn cache_dir() -> PathBuf {
        PathBuf::from(".changelogs")
    }

    pub fn enabled() -> bool {
        true
    }
    pub fn pagefind() -> bool {
        true
    }
    pub fn page_size() -> usize {
        10
    }

    pub fn github_api() -> String {
        "https://api.github.com".into()
    }
    pub fn gitea_api() -> String {
        "https://gitea.com/api/v1".into()
    }
    pub fn gitea_label() -> String {
        "Gitea".into()
    }
}
