//! In-memory content store.

use std::collections::{BTreeMap, HashMap};

use super::{ContentStore, StoredEntry};

/// Insertion-ordered in-memory store.
///
/// Replacing an existing id keeps its original position. Each id holds the
/// sequence number it was first inserted under, so deletes stay logarithmic.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    order: BTreeMap<u64, String>,
    entries: HashMap<String, Slot>,
    next_seq: u64,
}

#[derive(Debug, Clone)]
struct Slot {
    seq: u64,
    entry: StoredEntry,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_entries(entries: Vec<StoredEntry>) -> Self {
        let mut store = Self::new();
        for entry in entries {
            store.set(entry);
        }
        store
    }

    pub(crate) fn to_entries(&self) -> Vec<StoredEntry> {
        self.values().into_iter().cloned().collect()
    }
}

impl ContentStore for MemoryStore {
    fn get(&self, id: &str) -> Option<&StoredEntry> {
        self.entries.get(id).map(|slot| &slot.entry)
    }

    fn set(&mut self, entry: StoredEntry) {
        if let Some(slot) = self.entries.get_mut(entry.id()) {
            slot.entry = entry;
            return;
        }

        let id = entry.id().to_string();
        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert(seq, id.clone());
        self.entries.insert(id, Slot { seq, entry });
    }

    fn delete(&mut self, id: &str) -> Option<StoredEntry> {
        let slot = self.entries.remove(id)?;
        self.order.remove(&slot.seq);
        Some(slot.entry)
    }

    fn values(&self) -> Vec<&StoredEntry> {
        self.order
            .values()
            .filter_map(|id| self.get(id))
            .collect()
    }

    fn keys(&self) -> Vec<&str> {
        self.order.values().map(String::as_str).collect()
    }

    fn clear(&mut self) {
        self.order.clear();
        self.entries.clear();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProviderInfo, VersionEntry};
    use crate::storage::Rendered;

    fn make_entry(base: &str, title: &str, body: &str) -> StoredEntry {
        StoredEntry {
            data: VersionEntry::new(base, title, body, ProviderInfo::new("changeset", "Changeset")),
            digest: format!("digest-{body}"),
            rendered: Rendered {
                html: body.to_string(),
            },
        }
    }

    #[test]
    fn test_preserves_insertion_order() {
        let mut store = MemoryStore::new();
        store.set(make_entry("docs", "2.0.0", "b"));
        store.set(make_entry("docs", "1.0.0", "a"));

        assert_eq!(store.keys(), vec!["docs/version/2-0-0", "docs/version/1-0-0"]);
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut store = MemoryStore::new();
        store.set(make_entry("docs", "2.0.0", "old"));
        store.set(make_entry("docs", "1.0.0", "a"));
        store.set(make_entry("docs", "2.0.0", "new"));

        assert_eq!(store.len(), 2);
        assert_eq!(store.values()[0].data.body, "new");
    }

    #[test]
    fn test_delete_and_clear() {
        let mut store = MemoryStore::new();
        store.set(make_entry("docs", "2.0.0", "b"));
        store.set(make_entry("docs", "1.0.0", "a"));

        assert!(store.delete("docs/version/2-0-0").is_some());
        assert!(store.delete("docs/version/2-0-0").is_none());
        assert_eq!(store.keys(), vec!["docs/version/1-0-0"]);
        assert_eq!(store.entries()[0].0, "docs/version/1-0-0");

        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn test_bulk_delete_keeps_survivor_order() {
        let mut store = MemoryStore::new();
        for minor in 0..500 {
            store.set(make_entry("gh", &format!("1.{minor}.0"), "x"));
        }
        store.set(make_entry("kac", "1.0.0", "x"));

        for minor in (0..500).filter(|minor| minor % 3 != 0) {
            assert!(store.delete(&format!("gh/version/1-{minor}-0")).is_some());
        }
        store.set(make_entry("gh", "1.3.0", "replaced"));
        store.set(make_entry("gh", "2.0.0", "x"));

        let keys = store.keys();
        assert_eq!(store.len(), keys.len());
        assert_eq!(keys.len(), 167 + 2);
        assert_eq!(&keys[..3], ["gh/version/1-0-0", "gh/version/1-3-0", "gh/version/1-6-0"]);
        assert_eq!(&keys[keys.len() - 2..], ["kac/version/1-0-0", "gh/version/2-0-0"]);
        assert_eq!(store.get("gh/version/1-3-0").unwrap().data.body, "replaced");
    }
}
