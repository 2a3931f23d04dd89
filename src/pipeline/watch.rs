// src/pipeline/watch.rs

//! Re-syncs local Markdown changelogs when they change on disk.
//!
//! Filesystem notifications are forwarded over a channel and fed into
//! [`Loader::load_one`], the same routine the initial load uses.

use std::collections::BTreeSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Event, EventKind, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::error::Result;
use crate::pipeline::load::Loader;

/// Quiet period that closes a burst of change events.
pub const DEBOUNCE: Duration = Duration::from_millis(200);

/// Watch every enabled local changelog of `loader` until `shutdown` resolves.
///
/// Parent directories are watched rather than the files themselves so that
/// editors replacing a file on save are still picked up. Reload failures are
/// logged and watching continues.
pub async fn watch(loader: &Loader, shutdown: impl Future<Output = ()>) -> Result<()> {
    let mut targets = Vec::new();
    for (path, index) in loader.watch_targets() {
        targets.push((normalize(path).await, index));
    }
    if targets.is_empty() {
        log::info!("No local changelogs to watch");
        return Ok(());
    }

    let (tx, mut rx) = mpsc::unbounded_channel::<PathBuf>();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        if let Ok(event) = res {
            if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                for path in event.paths {
                    let _ = tx.send(path);
                }
            }
        }
    })?;

    let dirs: BTreeSet<&Path> = targets.iter().filter_map(|(path, _)| path.parent()).collect();
    for dir in dirs {
        watcher.watch(dir, RecursiveMode::NonRecursive)?;
        log::info!("Watching {} for changes", dir.display());
    }

    tokio::pin!(shutdown);
    loop {
        let first = tokio::select! {
            _ = &mut shutdown => break,
            path = rx.recv() => match path {
                Some(path) => path,
                None => break,
            },
        };

        let mut changed = BTreeSet::from([normalize(first).await]);
        while let Ok(Some(path)) = tokio::time::timeout(DEBOUNCE, rx.recv()).await {
            changed.insert(normalize(path).await);
        }

        for (path, index) in affected(&targets, &changed) {
            let Some(changelog) = loader.config().changelogs().get(index) else {
                continue;
            };
            log::info!("Reloading data from {}", path.display());
            if let Err(e) = loader.load_one(changelog).await {
                log::error!("Failed to reload '{}': {e}", changelog.base().base);
            }
        }
    }

    log::info!("Stopped watching");
    Ok(())
}

/// Targets touched by a batch of changed paths, in config order.
fn affected<'a>(targets: &'a [(PathBuf, usize)], changed: &BTreeSet<PathBuf>) -> Vec<(&'a Path, usize)> {
    targets
        .iter()
        .filter(|(path, _)| changed.contains(path))
        .map(|(path, index)| (path.as_path(), *index))
        .collect()
}

async fn normalize(path: PathBuf) -> PathBuf {
    tokio::fs::canonicalize(&path).await.unwrap_or(path)
}
