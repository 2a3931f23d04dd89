//! changelog-sync CLI
//!
//! Local execution entry point: loads every configured changelog into the
//! file store under the cache directory.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use changelog_sync::{
    config::{self, Project},
    error::Result,
    models::LoadMode,
    pipeline::{self, Loader},
    providers::SyncContext,
    storage::{ContentStore, FileStore, MetaStore},
    utils::http,
};
use clap::{Parser, Subcommand};
use tokio::sync::Mutex;

/// Multi-provider changelog ingestion
#[derive(Parser, Debug)]
#[command(
    name = "changelog-sync",
    version,
    about = "Sync changelogs and release notes into a local content store"
)]
struct Cli {
    /// Path to the changelog configuration file
    #[arg(short, long, default_value = "changelogs.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load every enabled changelog into the store
    Sync {
        /// Keep going when a remote source is unreachable
        #[arg(long)]
        dev: bool,
    },

    /// Sync in dev mode, then reload local changelogs on change until Ctrl-C
    Watch,

    /// Validate the configuration file
    Validate,

    /// Show the current store contents per changelog
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Sync { dev } => {
            let project = config::load_all(&cli.config)?;
            let mode = if dev { LoadMode::Dev } else { project.settings.mode() };
            let session = Session::open(&project, mode).await?;

            session.loader.run().await?;
            session.persist().await?;
            log::info!("Sync complete!");
        }

        Command::Watch => {
            let project = config::load_all(&cli.config)?;
            let session = Session::open(&project, LoadMode::Dev).await?;

            session.loader.run().await?;
            session.persist().await?;

            log::info!("Watching for changes... (press Ctrl+C to stop)");
            pipeline::watch(&session.loader, async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await?;
            session.persist().await?;
        }

        Command::Validate => {
            log::info!("Validating {}...", cli.config.display());

            let project = match config::load_all(&cli.config) {
                Ok(project) => project,
                Err(e) => {
                    log::error!("Config validation failed: {}", e);
                    return Err(e);
                }
            };
            for changelog in project.loader.changelogs() {
                let base = changelog.base();
                log::info!(
                    "✓ {} '{}'{}",
                    changelog.kind(),
                    base.base,
                    if base.enabled { "" } else { " (disabled)" }
                );
            }
            log::info!("All validations passed!");
        }

        Command::Info => {
            let project = config::load_all(&cli.config)?;
            let cache_dir = &project.settings.cache_dir;
            log::info!("Cache directory: {}", cache_dir.display());

            let store = FileStore::in_dir(cache_dir).await?;
            let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
            for entry in store.values() {
                *counts.entry(entry.data.base.as_str()).or_default() += 1;
            }

            let saved = config::read_loader_config(&config::loader_config_path(cache_dir)).await?;
            if saved.is_empty() {
                log::info!("No changelogs synced yet. Run 'sync' first.");
            }
            for changelog in &saved {
                log::info!(
                    "  {} '{}': {} versions",
                    changelog.provider,
                    changelog.base,
                    counts.get(changelog.base.as_str()).copied().unwrap_or(0)
                );
            }
            log::info!("Total: {} versions", store.len());
        }
    }

    Ok(())
}

/// Stores and loader for one CLI run.
struct Session {
    cache_dir: PathBuf,
    store: Arc<Mutex<FileStore>>,
    meta: Arc<Mutex<MetaStore>>,
    loader: Loader,
}

impl Session {
    async fn open(project: &Project, mode: LoadMode) -> Result<Self> {
        let cache_dir = project.settings.cache_dir.clone();
        let client = http::create_async_client(&project.settings)?;

        let store = Arc::new(Mutex::new(FileStore::in_dir(&cache_dir).await?));
        let meta = Arc::new(Mutex::new(MetaStore::load(&cache_dir).await?));

        let ctx = SyncContext::new(client, store.clone())
            .with_meta(Arc::clone(&meta))
            .with_mode(mode)
            .with_root(&project.root);
        let loader = Loader::new(project.loader.clone(), ctx)
            .with_config_file(config::loader_config_path(&cache_dir));

        Ok(Self {
            cache_dir,
            store,
            meta,
            loader,
        })
    }

    async fn persist(&self) -> Result<()> {
        let store = self.store.lock().await;
        store.persist().await?;
        self.meta.lock().await.save(&self.cache_dir).await?;
        log::info!("Saved {} versions to {}", store.len(), store.path().display());
        Ok(())
    }
}
