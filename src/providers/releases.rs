// src/providers/releases.rs

//! Paginated release listing shared by the GitHub and Gitea adapters.

use chrono::{DateTime, Utc};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{BaseConfig, ProviderInfo, VersionEntry};
use crate::pipeline::sync::{SyncPolicy, SyncReport};
use crate::providers::SyncContext;
use crate::utils::http::{FetchOutcome, conditional_get, next_page};

/// One element of a `GET /repos/{owner}/{repo}/releases` response.
///
/// GitHub and Gitea share these field names.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiRelease {
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

/// A releases endpoint and how to page through it.
pub(crate) struct ReleaseApi<'a> {
    pub config: &'a BaseConfig,
    pub endpoint: Url,
    /// Query parameter carrying the page size
    pub size_param: &'static str,
    pub page_size: u32,
    pub headers: HeaderMap,
    pub provider: ProviderInfo,
}

impl ReleaseApi<'_> {
    /// Normalize a release, or `None` when it must not be published.
    fn entry(&self, release: ApiRelease) -> Option<VersionEntry> {
        if release.draft || release.prerelease {
            return None;
        }

        let title = release
            .name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(release.tag_name);
        let title = self.config.process_title(title)?;

        let entry = VersionEntry::new(
            &self.config.base,
            title,
            release.body.unwrap_or_default(),
            self.provider.clone(),
        )
        .with_date(release.published_at);
        if entry.slug.is_empty() {
            log::debug!("{}: skipping release '{}' without a usable slug", self.config.base, entry.title);
            return None;
        }

        Some(match release.html_url {
            Some(link) => entry.with_link(link),
            None => entry,
        })
    }

    fn page_url(&self, page: u32) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair(self.size_param, &self.page_size.to_string());
        url
    }
}

/// `{api}/repos/{owner}/{repo}/releases`
pub(crate) fn releases_url(api: &str, owner: &str, repo: &str) -> Result<Url> {
    let mut url = Url::parse(api).map_err(|e| AppError::parse(api, e))?;
    url.path_segments_mut()
        .map_err(|_| AppError::config(format!("api '{api}' cannot be used as a base URL")))?
        .pop_if_empty()
        .extend(["repos", owner, repo, "releases"]);
    Ok(url)
}

/// Build an `Authorization` header value that is never logged.
pub(crate) fn authorization(headers: &mut HeaderMap, value: String) -> Result<()> {
    let mut value = HeaderValue::from_str(&value)
        .map_err(|_| AppError::config("token contains characters not allowed in a header"))?;
    value.set_sensitive(true);
    headers.insert(AUTHORIZATION, value);
    Ok(())
}

/// Fetch every page of releases and replace the stored entries of the base.
///
/// Stored validators go on the first request only. A `304` there means the
/// whole listing is unchanged and the store is left alone. Validators of the
/// first page are persisted once the traversal and the sync have completed.
pub(crate) async fn load_releases(api: &ReleaseApi<'_>, ctx: &SyncContext) -> Result<SyncReport> {
    let base = api.config.base.as_str();
    let previous = ctx.validators(base).await;

    let mut entries = Vec::new();
    let mut first_validators = None;
    let mut page = 1;

    loop {
        let url = api.page_url(page);
        let validators = if page == 1 { previous.as_ref() } else { None };

        let fetched =
            match conditional_get(ctx.client(), &url, api.headers.clone(), validators, ctx.mode()).await? {
                FetchOutcome::Modified(fetched) => fetched,
                FetchOutcome::NotModified if page == 1 => {
                    log::info!("{base}: {} releases not modified", api.provider.label);
                    return Ok(SyncReport::not_modified(base));
                }
                FetchOutcome::NotModified => {
                    return Err(AppError::Upstream {
                        url: url.to_string(),
                        status: 304,
                        reason: "Not Modified".to_string(),
                    });
                }
                FetchOutcome::Unavailable => return Ok(SyncReport::not_modified(base)),
            };

        let releases: Vec<ApiRelease> = serde_json::from_str(&fetched.body)
            .map_err(|e| AppError::parse(url.as_str(), e))?;
        log::debug!("{base}: page {page} returned {} releases", releases.len());
        entries.extend(releases.into_iter().filter_map(|release| api.entry(release)));

        if page == 1 {
            first_validators = Some(fetched.validators);
        }

        match fetched.link.as_deref().and_then(next_page) {
            Some(next) if next > page => page = next,
            _ => break,
        }
    }

    let report = ctx.sync(base, entries, SyncPolicy::FullReplace).await;
    if let Some(validators) = first_validators {
        ctx.store_validators(base, validators).await;
    }
    Ok(report)
}
