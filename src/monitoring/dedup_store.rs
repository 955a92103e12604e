use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::core::StoreError;

/// Persistent record of listings that were already announced.
///
/// `save` always receives the full accumulated set and replaces what was
/// stored before.
#[async_trait]
pub trait DedupStore: Send + Sync {
    async fn load(&self) -> Result<HashSet<String>, StoreError>;
    async fn save(&self, token_ids: &HashSet<String>) -> Result<(), StoreError>;
}

/// JSON list of token ids on disk.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Opens the cache file, creating it (and its directory) as an empty
    /// list on first run.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::io(parent, e))?;
        }

        let store = Self { path };
        if !fs::try_exists(&store.path)
            .await
            .map_err(|e| StoreError::io(&store.path, e))?
        {
            store.save(&HashSet::new()).await?;
            tracing::info!(path = %store.path.display(), "Initialized empty listing cache");
        }

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl DedupStore for JsonFileStore {
    async fn load(&self) -> Result<HashSet<String>, StoreError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashSet::new()),
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };

        let token_ids: Vec<String> =
            serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt {
                path: self.path.clone(),
                source: e,
            })?;

        Ok(token_ids.into_iter().collect())
    }

    async fn save(&self, token_ids: &HashSet<String>) -> Result<(), StoreError> {
        let mut sorted: Vec<&String> = token_ids.iter().collect();
        sorted.sort();

        let json = serde_json::to_vec_pretty(&sorted).map_err(|e| StoreError::Corrupt {
            path: self.path.clone(),
            source: e,
        })?;

        // Write to a sibling file and rename over the cache so a crash
        // leaves either the old or the new list, never a torn one.
        let temp_path = self.temp_path();
        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| StoreError::io(&temp_path, e))?;
        file.write_all(&json)
            .await
            .map_err(|e| StoreError::io(&temp_path, e))?;
        file.sync_all()
            .await
            .map_err(|e| StoreError::io(&temp_path, e))?;
        drop(file);

        fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| StoreError::io(&self.path, e))?;

        tracing::debug!(count = token_ids.len(), path = %self.path.display(), "Saved listing cache");
        Ok(())
    }
}

/// In-memory store for tests and dry runs.
#[derive(Default)]
pub struct MemoryStore {
    token_ids: Mutex<HashSet<String>>,
    saves: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            token_ids: Mutex::new(ids.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// Makes every following `save` fail until reset.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub async fn snapshot(&self) -> HashSet<String> {
        self.token_ids.lock().await.clone()
    }
}

#[async_trait]
impl DedupStore for MemoryStore {
    async fn load(&self) -> Result<HashSet<String>, StoreError> {
        Ok(self.token_ids.lock().await.clone())
    }

    async fn save(&self, token_ids: &HashSet<String>) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::io(
                "memory",
                std::io::Error::new(std::io::ErrorKind::Other, "store unavailable"),
            ));
        }

        *self.token_ids.lock().await = token_ids.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn ids(values: &[&str]) -> HashSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[tokio::test]
    async fn test_first_open_creates_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("listings_cache.json");

        let store = JsonFileStore::open(&path).await.unwrap();

        assert!(path.exists());
        assert_eq!(std::fs::read_to_string(&path).unwrap().trim(), "[]");
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("listings_cache.json");

        let store = JsonFileStore::open(&path).await.unwrap();
        store.save(&ids(&["42", "7"])).await.unwrap();
        drop(store);

        let reopened = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(reopened.load().await.unwrap(), ids(&["42", "7"]));
        assert!(!dir.path().join("listings_cache.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_reads_plain_json_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, r#"["1", "2", "2"]"#).unwrap();

        let store = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(store.load().await.unwrap(), ids(&["1", "2"]));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = JsonFileStore::open(&path).await.unwrap();
        assert!(matches!(
            store.load().await,
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[tokio::test]
    async fn test_memory_store_failure_toggle() {
        let store = MemoryStore::with_ids(["1"]);

        store.set_failing(true);
        assert_err!(store.save(&ids(&["1", "2"])).await);
        assert_eq!(store.snapshot().await, ids(&["1"]));

        store.set_failing(false);
        assert_ok!(store.save(&ids(&["1", "2"])).await);
        assert_eq!(store.save_count(), 1);
        assert_eq!(store.load().await.unwrap(), ids(&["1", "2"]));
    }
}
