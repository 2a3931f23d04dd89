// src/providers/gitea.rs

//! Gitea-compatible Releases adapter (Gitea, Forgejo, Codeberg).

use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};

use crate::error::Result;
use crate::models::{GiteaConfig, ProviderConfig, ProviderInfo, ProviderKind};
use crate::pipeline::sync::SyncReport;
use crate::providers::releases::{ReleaseApi, authorization, load_releases, releases_url};
use crate::providers::{Provider, SyncContext, mismatch};

/// Releases requested per page.
const LIMIT: u32 = 50;

#[derive(Debug, Clone, Copy, Default)]
pub struct GiteaProvider;

impl GiteaProvider {
    fn headers(config: &GiteaConfig) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = &config.token {
            authorization(&mut headers, format!("token {token}"))?;
        }
        Ok(headers)
    }
}

#[async_trait]
impl Provider for GiteaProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gitea
    }

    async fn load(&self, config: &ProviderConfig, ctx: &SyncContext) -> Result<SyncReport> {
        let ProviderConfig::Gitea(config) = config else {
            return Err(mismatch(self.kind(), config));
        };

        let api = ReleaseApi {
            config: &config.base,
            endpoint: releases_url(&config.api, &config.owner, &config.repo)?,
            size_param: "limit",
            page_size: LIMIT,
            headers: Self::headers(config)?,
            provider: ProviderInfo::new("gitea", config.provider_label.as_str()),
        };

        load_releases(&api, ctx).await
    }
}
