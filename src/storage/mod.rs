//! Content store abstractions for synchronized version entries.
//!
//! The ingestion core only talks to [`ContentStore`]; it never decides how
//! entries are kept. Two backends ship with the crate:
//!
//! - [`MemoryStore`]: insertion-ordered map, for tests and embedding
//! - [`FileStore`]: the same map persisted as JSON between runs
//!
//! ## Cache Directory Layout
//!
//! ```text
//! {cache_dir}/
//! ├── changelogs.json       # Secret-free changelog configuration
//! ├── store.json            # Synchronized entries (FileStore)
//! └── meta.json             # Conditional-fetch validators per base
//! ```

pub mod local;
pub mod memory;

use std::collections::BTreeMap;
use std::sync::Arc;

use pulldown_cmark::{Parser, html};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::markdown::parser_options;
use crate::models::VersionEntry;
use crate::utils::http::CacheValidators;

// Re-export for convenience
pub use local::FileStore;
pub use memory::MemoryStore;

/// Rendered form of an entry body. Opaque to the ingestion core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rendered {
    pub html: String,
}

/// A persisted version entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub data: VersionEntry,
    pub digest: String,
    pub rendered: Rendered,
}

impl StoredEntry {
    pub fn id(&self) -> &str {
        &self.data.id
    }
}

/// Keyed storage for synchronized entries.
pub trait ContentStore: Send + Sync {
    fn get(&self, id: &str) -> Option<&StoredEntry>;

    /// Insert or replace the entry with the same id.
    fn set(&mut self, entry: StoredEntry);

    fn delete(&mut self, id: &str) -> Option<StoredEntry>;

    fn values(&self) -> Vec<&StoredEntry>;

    fn keys(&self) -> Vec<&str> {
        self.values().into_iter().map(StoredEntry::id).collect()
    }

    fn entries(&self) -> Vec<(&str, &StoredEntry)> {
        self.values().into_iter().map(|e| (e.id(), e)).collect()
    }

    fn clear(&mut self);

    fn len(&self) -> usize {
        self.values().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Store handle shared by the loader and the watch loop.
///
/// Holding the lock is the single-writer discipline: a sync run takes it
/// once and commits all of its mutations before releasing it.
pub type SharedStore = Arc<Mutex<dyn ContentStore>>;

/// Content hash used to detect stale entries.
pub trait Digester: Send + Sync {
    fn digest(&self, id: &str, content: &str) -> String;
}

/// SHA-256 over the id and content, hex encoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Digester;

impl Digester for Sha256Digester {
    fn digest(&self, id: &str, content: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(id.as_bytes());
        hasher.update([0u8]);
        hasher.update(content.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Markdown render hook, invoked once per inserted or updated entry.
pub trait Renderer: Send + Sync {
    fn render(&self, body: &str) -> Rendered;
}

/// Renders Markdown to HTML.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRenderer;

impl Renderer for HtmlRenderer {
    fn render(&self, body: &str) -> Rendered {
        let mut output = String::with_capacity(body.len() * 3 / 2);
        html::push_html(&mut output, Parser::new_ext(body, parser_options()));
        Rendered { html: output }
    }
}

/// Conditional-fetch validators, keyed per changelog base.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaStore {
    #[serde(default)]
    validators: BTreeMap<String, CacheValidators>,
}

impl MetaStore {
    pub fn get(&self, base: &str) -> Option<&CacheValidators> {
        self.validators.get(base)
    }

    /// Remember validators for `base`. Empty validators clear the slot.
    pub fn set(&mut self, base: &str, validators: CacheValidators) {
        if validators.is_empty() {
            self.validators.remove(base);
        } else {
            self.validators.insert(base.to_string(), validators);
        }
    }

    pub fn remove(&mut self, base: &str) -> Option<CacheValidators> {
        self.validators.remove(base)
    }
}
