// src/providers/mod.rs

//! Provider adapters and the context they sync through.
//!
//! Every adapter turns one [`ProviderConfig`] into a list of
//! [`VersionEntry`] values and hands them to the sync engine through a
//! [`SyncContext`]. Adapters are looked up by [`ProviderKind`] in a
//! [`ProviderRegistry`].

pub mod gitea;
pub mod github;
pub mod markdown;
mod releases;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::{LoadMode, ProviderConfig, ProviderKind, VersionEntry};
use crate::pipeline::sync::{SyncEngine, SyncPolicy, SyncReport};
use crate::storage::{
    Digester, HtmlRenderer, MemoryStore, MetaStore, Renderer, Sha256Digester, SharedStore,
};
use crate::utils::http::CacheValidators;

pub use gitea::GiteaProvider;
pub use github::GitHubProvider;
pub use markdown::{MarkdownFlavor, MarkdownProvider};

/// Everything an adapter needs to fetch and persist entries.
///
/// Cloning is cheap: all shared state sits behind `Arc`s.
#[derive(Clone)]
pub struct SyncContext {
    client: Client,
    store: SharedStore,
    meta: Arc<Mutex<MetaStore>>,
    digester: Arc<dyn Digester>,
    renderer: Arc<dyn Renderer>,
    mode: LoadMode,
    root: PathBuf,
}

impl SyncContext {
    /// Context with the default digest and render hooks, rooted at the working directory.
    pub fn new(client: Client, store: SharedStore) -> Self {
        Self {
            client,
            store,
            meta: Arc::new(Mutex::new(MetaStore::default())),
            digester: Arc::new(Sha256Digester),
            renderer: Arc::new(HtmlRenderer),
            mode: LoadMode::Build,
            root: PathBuf::from("."),
        }
    }

    /// Context over a fresh in-memory store.
    pub fn in_memory(client: Client) -> Self {
        Self::new(client, Arc::new(Mutex::new(MemoryStore::new())))
    }

    pub fn with_meta(mut self, meta: Arc<Mutex<MetaStore>>) -> Self {
        self.meta = meta;
        self
    }

    pub fn with_digester(mut self, digester: Arc<dyn Digester>) -> Self {
        self.digester = digester;
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_mode(mut self, mode: LoadMode) -> Self {
        self.mode = mode;
        self
    }

    /// Directory local changelog paths are resolved against.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn meta(&self) -> &Arc<Mutex<MetaStore>> {
        &self.meta
    }

    pub fn mode(&self) -> LoadMode {
        self.mode
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validators stored by the last complete fetch of `base`.
    pub async fn validators(&self, base: &str) -> Option<CacheValidators> {
        self.meta.lock().await.get(base).cloned()
    }

    pub async fn store_validators(&self, base: &str, validators: CacheValidators) {
        self.meta.lock().await.set(base, validators);
    }

    /// Reconcile `entries` into the store while holding the store lock.
    pub async fn sync(
        &self,
        base: &str,
        entries: Vec<VersionEntry>,
        policy: SyncPolicy,
    ) -> SyncReport {
        let mut store = self.store.lock().await;
        SyncEngine::new(self.digester.as_ref(), self.renderer.as_ref()).apply(
            &mut *store,
            base,
            entries,
            policy,
        )
    }
}

/// A changelog source adapter.
#[async_trait]
pub trait Provider: Send + Sync {
    /// The configuration kind this adapter handles.
    fn kind(&self) -> ProviderKind;

    /// Fetch the source described by `config` and sync it into the store.
    async fn load(&self, config: &ProviderConfig, ctx: &SyncContext) -> Result<SyncReport>;
}

/// Maps each [`ProviderKind`] to its adapter.
#[derive(Clone)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderKind, Arc<dyn Provider>>,
}

impl Default for ProviderRegistry {
    /// Registry with every built-in adapter.
    fn default() -> Self {
        let mut registry = Self::empty();
        for kind in ProviderKind::ALL {
            let provider: Arc<dyn Provider> = match kind {
                ProviderKind::Changeset => Arc::new(MarkdownProvider::new(MarkdownFlavor::Changeset)),
                ProviderKind::KeepAChangelog => {
                    Arc::new(MarkdownProvider::new(MarkdownFlavor::KeepAChangelog))
                }
                ProviderKind::Github => Arc::new(GitHubProvider),
                ProviderKind::Gitea => Arc::new(GiteaProvider),
            };
            registry.register(provider);
        }
        registry
    }
}

impl ProviderRegistry {
    pub fn empty() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    /// Register an adapter, replacing any previous one for the same kind.
    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        self.providers.insert(provider.kind(), provider);
    }

    pub fn get(&self, kind: ProviderKind) -> Result<&Arc<dyn Provider>> {
        self.providers
            .get(&kind)
            .ok_or_else(|| AppError::provider(format!("no adapter registered for '{kind}'")))
    }

    /// Dispatch `config` to its adapter.
    pub async fn load(&self, config: &ProviderConfig, ctx: &SyncContext) -> Result<SyncReport> {
        self.get(config.kind())?.load(config, ctx).await
    }
}

fn mismatch(expected: ProviderKind, config: &ProviderConfig) -> AppError {
    AppError::provider(format!(
        "'{expected}' adapter cannot load a '{}' changelog",
        config.kind()
    ))
}
