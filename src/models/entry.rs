//! Version entry data structure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::slugify_version;

/// The adapter that produced an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    /// Stable provider name (e.g., `github`)
    pub name: String,

    /// Display label, overridable for white-labeled forks
    pub label: String,
}

impl ProviderInfo {
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
        }
    }
}

/// One normalized release/version record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEntry {
    /// Store key derived from `(base, slug)`
    pub id: String,

    /// Changelog this entry belongs to
    pub base: String,

    /// URL-safe form of the title, unique within `base`
    pub slug: String,

    /// Human-readable version label
    pub title: String,

    /// Adapter that produced this entry
    pub provider: ProviderInfo,

    /// Release page on the origin
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,

    /// Publish date, when the origin exposes one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,

    /// Markdown content of the version section
    pub body: String,
}

impl VersionEntry {
    /// Create an entry, deriving `id` and `slug` from `base` and `title`.
    pub fn new(
        base: &str,
        title: impl Into<String>,
        body: impl Into<String>,
        provider: ProviderInfo,
    ) -> Self {
        let title = title.into();
        let (id, slug) = slugify_version(base, &title);

        Self {
            id,
            base: base.to_string(),
            slug,
            title,
            provider,
            link: None,
            date: None,
            body: body.into(),
        }
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn with_date(mut self, date: Option<DateTime<Utc>>) -> Self {
        self.date = date;
        self
    }
}
