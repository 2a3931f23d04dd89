// src/providers/github.rs

//! GitHub Releases adapter.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};

use crate::error::Result;
use crate::models::{GitHubConfig, ProviderConfig, ProviderInfo, ProviderKind};
use crate::pipeline::sync::SyncReport;
use crate::providers::releases::{ReleaseApi, authorization, load_releases, releases_url};
use crate::providers::{Provider, SyncContext, mismatch};

/// Releases requested per page (the API maximum).
const PER_PAGE: u32 = 100;
const API_VERSION: &str = "2022-11-28";

/// Adapter for `GET {api}/repos/{owner}/{repo}/releases` on GitHub.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitHubProvider;

impl GitHubProvider {
    pub fn provider_info() -> ProviderInfo {
        ProviderInfo::new("github", "GitHub")
    }

    fn headers(config: &GitHubConfig) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(
            HeaderName::from_static("x-github-api-version"),
            HeaderValue::from_static(API_VERSION),
        );
        if let Some(token) = &config.token {
            authorization(&mut headers, format!("Bearer {token}"))?;
        }
        Ok(headers)
    }
}

#[async_trait]
impl Provider for GitHubProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Github
    }

    async fn load(&self, config: &ProviderConfig, ctx: &SyncContext) -> Result<SyncReport> {
        let ProviderConfig::Github(config) = config else {
            return Err(mismatch(self.kind(), config));
        };

        let api = ReleaseApi {
            config: &config.base,
            endpoint: releases_url(&config.api, &config.owner, &config.repo)?,
            size_param: "per_page",
            page_size: PER_PAGE,
            headers: Self::headers(config)?,
            provider: Self::provider_info(),
        };

        load_releases(&api, ctx).await
    }
}
