//! Reconciles freshly produced entries with the content store.
//!
//! Markdown sources only ever add or modify, so they use the additive policy
//! and skip entries whose digest is unchanged. Release APIs enumerate the whole
//! upstream set every time, so they replace everything under their base.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::models::VersionEntry;
use crate::storage::{ContentStore, Digester, Renderer, StoredEntry};

/// How a batch of entries is merged into the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPolicy {
    /// Upsert changed entries, leave everything else alone
    Additive,
    /// Delete every entry of the base, then insert the batch
    FullReplace,
}

/// Outcome of one provider load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub base: String,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub deleted: usize,
    /// The origin answered `304` (or was unreachable in dev mode)
    pub not_modified: bool,
}

impl SyncReport {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            ..Self::default()
        }
    }

    /// Report for a run that never touched the store.
    pub fn not_modified(base: impl Into<String>) -> Self {
        Self {
            not_modified: true,
            ..Self::new(base)
        }
    }

    /// Check if there are any changes.
    pub fn has_changes(&self) -> bool {
        self.change_count() > 0
    }

    /// Get the total number of changes.
    pub fn change_count(&self) -> usize {
        self.inserted + self.updated + self.deleted
    }
}

/// Applies a batch of entries to a store under a [`SyncPolicy`].
pub struct SyncEngine<'a> {
    digester: &'a dyn Digester,
    renderer: &'a dyn Renderer,
}

impl<'a> SyncEngine<'a> {
    pub fn new(digester: &'a dyn Digester, renderer: &'a dyn Renderer) -> Self {
        Self { digester, renderer }
    }

    /// Reconcile `entries` for `base` into `store`.
    ///
    /// Entries sharing an id collapse to the last one, kept at the position
    /// of the first.
    pub fn apply(
        &self,
        store: &mut dyn ContentStore,
        base: &str,
        entries: Vec<VersionEntry>,
        policy: SyncPolicy,
    ) -> SyncReport {
        let entries = dedupe(entries);
        match policy {
            SyncPolicy::Additive => self.upsert(store, base, entries),
            SyncPolicy::FullReplace => self.replace(store, base, entries),
        }
    }

    fn upsert(
        &self,
        store: &mut dyn ContentStore,
        base: &str,
        entries: Vec<VersionEntry>,
    ) -> SyncReport {
        let mut report = SyncReport::new(base);

        for entry in entries {
            let digest = self.digester.digest(&entry.id, &entry.body);
            match store.get(&entry.id) {
                Some(existing) if existing.digest == digest => {
                    report.unchanged += 1;
                    continue;
                }
                Some(_) => report.updated += 1,
                None => report.inserted += 1,
            }
            store.set(self.stored(entry, digest));
        }

        report
    }

    fn replace(
        &self,
        store: &mut dyn ContentStore,
        base: &str,
        entries: Vec<VersionEntry>,
    ) -> SyncReport {
        let mut report = SyncReport::new(base);

        let previous: HashMap<String, String> = store
            .values()
            .into_iter()
            .filter(|stored| stored.data.base == base)
            .map(|stored| (stored.id().to_string(), stored.digest.clone()))
            .collect();
        for id in previous.keys() {
            store.delete(id);
        }

        let mut current = HashSet::new();
        for entry in entries {
            let digest = self.digester.digest(&entry.id, &entry.body);
            match previous.get(&entry.id) {
                Some(old) if *old == digest => report.unchanged += 1,
                Some(_) => report.updated += 1,
                None => report.inserted += 1,
            }
            current.insert(entry.id.clone());
            store.set(self.stored(entry, digest));
        }

        report.deleted = previous.keys().filter(|id| !current.contains(*id)).count();
        report
    }

    fn stored(&self, entry: VersionEntry, digest: String) -> StoredEntry {
        let rendered = self.renderer.render(&entry.body);
        StoredEntry {
            data: entry,
            digest,
            rendered,
        }
    }
}

fn dedupe(entries: Vec<VersionEntry>) -> Vec<VersionEntry> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<VersionEntry> = Vec::with_capacity(entries.len());

    for entry in entries {
        match positions.get(&entry.id) {
            Some(&index) => {
                log::debug!("Duplicate version id {}, keeping the later entry", entry.id);
                unique[index] = entry;
            }
            None => {
                positions.insert(entry.id.clone(), unique.len());
                unique.push(entry);
            }
        }
    }

    unique
}
