// src/utils/http.rs

//! HTTP client utilities.
//!
//! Every remote fetch goes through [`conditional_get`], which attaches stored
//! `ETag`/`Last-Modified` validators and maps the response onto
//! [`FetchOutcome`].

use std::time::Duration;

use reqwest::header::{
    ETAG, HeaderMap, HeaderName, HeaderValue, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED, LINK,
};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{LoadMode, Settings};

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(settings: &Settings) -> Result<Client> {
    let client = Client::builder()
        .user_agent(&settings.user_agent)
        .timeout(Duration::from_secs(settings.timeout_secs))
        .build()?;
    Ok(client)
}

/// Cache validators returned by a previous successful fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheValidators {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

impl CacheValidators {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let read = |name: HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned)
        };
        Self {
            etag: read(ETAG),
            last_modified: read(LAST_MODIFIED),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.etag.is_none() && self.last_modified.is_none()
    }

    /// Add `If-None-Match` / `If-Modified-Since` to a header map.
    fn apply(&self, headers: &mut HeaderMap) {
        if let Some(value) = self.etag.as_deref().and_then(|v| HeaderValue::from_str(v).ok()) {
            headers.insert(IF_NONE_MATCH, value);
        }
        if let Some(value) = self
            .last_modified
            .as_deref()
            .and_then(|v| HeaderValue::from_str(v).ok())
        {
            headers.insert(IF_MODIFIED_SINCE, value);
        }
    }
}

/// A `2xx` response body with the headers callers care about.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: Url,
    pub body: String,
    pub validators: CacheValidators,
    pub link: Option<String>,
}

/// Result of a conditional GET.
#[derive(Debug)]
pub enum FetchOutcome {
    /// `304`: nothing changed since the stored validators
    NotModified,
    /// `2xx`: fresh body
    Modified(FetchedPage),
    /// Transport failure tolerated in dev mode
    Unavailable,
}

/// Perform a GET, attaching `validators` when present.
///
/// Transport failures are fatal in [`LoadMode::Build`] and degrade to
/// [`FetchOutcome::Unavailable`] in [`LoadMode::Dev`]. Any status other than
/// `2xx` or `304` is an [`AppError::Upstream`].
pub async fn conditional_get(
    client: &Client,
    url: &Url,
    mut headers: HeaderMap,
    validators: Option<&CacheValidators>,
    mode: LoadMode,
) -> Result<FetchOutcome> {
    if let Some(validators) = validators {
        validators.apply(&mut headers);
    }

    log::debug!("GET {url}");
    let response = match client.get(url.clone()).headers(headers).send().await {
        Ok(response) => response,
        Err(error) => return transport_failure(url, error, mode),
    };

    let status = response.status();
    if status == StatusCode::NOT_MODIFIED {
        return Ok(FetchOutcome::NotModified);
    }
    if !status.is_success() {
        return Err(AppError::Upstream {
            url: url.to_string(),
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
        });
    }

    let validators = CacheValidators::from_headers(response.headers());
    let link = response
        .headers()
        .get(LINK)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let body = match response.text().await {
        Ok(body) => body,
        Err(error) => return transport_failure(url, error, mode),
    };

    Ok(FetchOutcome::Modified(FetchedPage {
        url: url.clone(),
        body,
        validators,
        link,
    }))
}

/// A transport failure: degrade in dev mode, fail otherwise.
fn transport_failure(url: &Url, error: reqwest::Error, mode: LoadMode) -> Result<FetchOutcome> {
    if !mode.is_dev() {
        return Err(AppError::Network {
            url: url.to_string(),
            source: error,
        });
    }

    log::error!("Failed to fetch data from {url} with the following error:");
    log::error!("{error}");
    log::error!("Continuing without changelog data for now, but make sure the URL is correct and accessible.");
    Ok(FetchOutcome::Unavailable)
}

/// Extract the `page` query parameter of the `rel="next"` target in a `Link` header.
pub fn next_page(link: &str) -> Option<u32> {
    link.split(',').find_map(|part| {
        let (target, params) = part.split_once(';')?;
        let is_next = params
            .split(';')
            .any(|p| p.trim().eq_ignore_ascii_case("rel=\"next\""));
        if !is_next {
            return None;
        }

        let target = target.trim().strip_prefix('<')?.strip_suffix('>')?;
        let url = Url::parse(target).ok()?;
        url.query_pairs()
            .find(|(key, _)| key == "page")
            .and_then(|(_, value)| value.parse().ok())
    })
}
