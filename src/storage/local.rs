//! Local filesystem storage implementation.
//!
//! Keeps the content store and fetch metadata as JSON files in the cache
//! directory so that repeated runs only re-render what changed.

use std::path::{Path, PathBuf};

use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::storage::{ContentStore, MemoryStore, MetaStore, StoredEntry};

pub const STORE_FILE: &str = "store.json";
pub const META_FILE: &str = "meta.json";

/// Content store persisted to a JSON file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl FileStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries: Vec<StoredEntry> = read_json(&path).await?.unwrap_or_default();
        log::debug!("Opened store {} with {} entries", path.display(), entries.len());

        Ok(Self {
            path,
            inner: MemoryStore::from_entries(entries),
        })
    }

    /// Open `{cache_dir}/store.json`.
    pub async fn in_dir(cache_dir: &Path) -> Result<Self> {
        Self::open(cache_dir.join(STORE_FILE)).await
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write all entries back to disk.
    pub async fn persist(&self) -> Result<()> {
        write_json(&self.path, &self.inner.to_entries()).await
    }
}

impl ContentStore for FileStore {
    fn get(&self, id: &str) -> Option<&StoredEntry> {
        self.inner.get(id)
    }

    fn set(&mut self, entry: StoredEntry) {
        self.inner.set(entry);
    }

    fn delete(&mut self, id: &str) -> Option<StoredEntry> {
        self.inner.delete(id)
    }

    fn values(&self) -> Vec<&StoredEntry> {
        self.inner.values()
    }

    fn keys(&self) -> Vec<&str> {
        self.inner.keys()
    }

    fn clear(&mut self) {
        self.inner.clear();
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl MetaStore {
    /// Load `{cache_dir}/meta.json`, or an empty store.
    pub async fn load(cache_dir: &Path) -> Result<Self> {
        Ok(read_json(&cache_dir.join(META_FILE))
            .await?
            .unwrap_or_default())
    }

    pub async fn save(&self, cache_dir: &Path) -> Result<()> {
        write_json(&cache_dir.join(META_FILE), self).await
    }
}

/// Ensure parent directory exists.
async fn ensure_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(())
}

/// Write bytes atomically (write to temp, then rename).
pub(crate) async fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    ensure_dir(path).await?;

    let tmp = path.with_extension("tmp");
    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    drop(file);

    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// Read bytes, returning None if file doesn't exist.
pub(crate) async fn read_bytes(path: &Path) -> Result<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(AppError::Io(e)),
    }
}

async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    write_bytes(path, &bytes).await
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match read_bytes(path).await? {
        Some(bytes) => serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| AppError::parse(path.display().to_string(), e)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProviderInfo, VersionEntry};
    use crate::storage::Rendered;
    use crate::utils::http::CacheValidators;
    use tempfile::TempDir;

    fn make_entry(title: &str) -> StoredEntry {
        StoredEntry {
            data: VersionEntry::new("docs", title, "- Fix", ProviderInfo::new("github", "GitHub"))
                .with_link("https://example.com/release"),
            digest: "digest".to_string(),
            rendered: Rendered {
                html: "<ul><li>Fix</li></ul>".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested/test.txt");

        write_bytes(&path, b"hello").await.unwrap();
        let data = read_bytes(&path).await.unwrap();
        assert_eq!(data, Some(b"hello".to_vec()));
    }

    #[tokio::test]
    async fn test_read_nonexistent() {
        let tmp = TempDir::new().unwrap();
        let data = read_bytes(&tmp.path().join("nope.txt")).await.unwrap();
        assert!(data.is_none());
    }

    #[tokio::test]
    async fn test_file_store_round_trip_keeps_order() {
        let tmp = TempDir::new().unwrap();

        let mut store = FileStore::in_dir(tmp.path()).await.unwrap();
        assert!(store.is_empty());
        store.set(make_entry("2.0.0"));
        store.set(make_entry("1.0.0"));
        store.persist().await.unwrap();

        let reopened = FileStore::in_dir(tmp.path()).await.unwrap();
        assert_eq!(
            reopened.keys(),
            vec!["docs/version/2-0-0", "docs/version/1-0-0"]
        );
        assert_eq!(reopened.get("docs/version/1-0-0"), store.get("docs/version/1-0-0"));
    }

    #[tokio::test]
    async fn test_corrupt_store_is_parse_error() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join(STORE_FILE), b"{not json")
            .await
            .unwrap();

        let error = FileStore::in_dir(tmp.path()).await.unwrap_err();
        assert!(matches!(error, AppError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_meta_store_save_load() {
        let tmp = TempDir::new().unwrap();
        let mut meta = MetaStore::default();
        meta.set(
            "docs",
            CacheValidators {
                etag: Some("\"v1\"".into()),
                last_modified: Some("Sun, 03 Jul 2025 12:30:00 GMT".into()),
            },
        );
        meta.save(tmp.path()).await.unwrap();

        let loaded = MetaStore::load(tmp.path()).await.unwrap();
        assert_eq!(loaded, meta);
    }
}
