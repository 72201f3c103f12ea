//! Remote configuration stores for desktop hosts

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::{RemoteConfig, RemoteConfigId, RemoteConfigStore},
};
use core_async::sync::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info};

const CONFIG_FILE_NAME: &str = "remotes.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct RemotesFile {
    #[serde(default)]
    remotes: Vec<RemoteConfig>,
}

/// Remote configurations persisted as a single JSON document.
///
/// Writes go to a sibling temporary file that is then renamed over the
/// original, so a crash never leaves a truncated document behind.
pub struct JsonRemoteConfigStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonRemoteConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Store at `remotes.json` inside `data_dir`.
    pub fn in_directory(data_dir: &Path) -> Self {
        Self::new(data_dir.join(CONFIG_FILE_NAME))
    }

    /// Store inside the platform data directory (`~/.local/share/zimsync` on
    /// Linux).
    pub fn with_default_location() -> Self {
        Self::in_directory(&default_data_dir())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<RemotesFile> {
        match fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                BridgeError::OperationFailed(format!(
                    "Corrupt remote config file {}: {}",
                    self.path.display(),
                    e
                ))
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(RemotesFile::default()),
            Err(e) => Err(BridgeError::Io(e)),
        }
    }

    async fn store(&self, file: &RemotesFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(file).map_err(|e| {
            BridgeError::OperationFailed(format!("Failed to serialize remote configs: {}", e))
        })?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).await?;
        fs::rename(&tmp, &self.path).await?;
        debug!(path = ?self.path, count = file.remotes.len(), "Wrote remote configs");
        Ok(())
    }
}

/// Platform data directory for zimsync state.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".local")
                .join("share")
        })
        .join("zimsync")
}

#[async_trait]
impl RemoteConfigStore for JsonRemoteConfigStore {
    async fn get(&self, id: RemoteConfigId) -> Result<Option<RemoteConfig>> {
        let file = self.load().await?;
        Ok(file.remotes.into_iter().find(|r| r.id == id))
    }

    async fn list(&self) -> Result<Vec<RemoteConfig>> {
        Ok(self.load().await?.remotes)
    }

    async fn save(&self, config: &RemoteConfig) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut file = self.load().await?;
        match file.remotes.iter_mut().find(|r| r.id == config.id) {
            Some(existing) => *existing = config.clone(),
            None => file.remotes.push(config.clone()),
        }
        self.store(&file).await?;
        info!(remote_id = %config.id, name = %config.name, "Saved remote config");
        Ok(())
    }

    async fn delete(&self, id: RemoteConfigId) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut file = self.load().await?;
        let before = file.remotes.len();
        file.remotes.retain(|r| r.id != id);
        if file.remotes.len() != before {
            self.store(&file).await?;
            info!(remote_id = %id, "Deleted remote config");
        }
        Ok(())
    }
}

/// In-memory store for tests and ephemeral hosts.
#[derive(Default)]
pub struct MemoryRemoteConfigStore {
    remotes: RwLock<Vec<RemoteConfig>>,
}

impl MemoryRemoteConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_remotes(remotes: Vec<RemoteConfig>) -> Self {
        Self {
            remotes: RwLock::new(remotes),
        }
    }
}

#[async_trait]
impl RemoteConfigStore for MemoryRemoteConfigStore {
    async fn get(&self, id: RemoteConfigId) -> Result<Option<RemoteConfig>> {
        Ok(self.remotes.read().await.iter().find(|r| r.id == id).cloned())
    }

    async fn list(&self) -> Result<Vec<RemoteConfig>> {
        Ok(self.remotes.read().await.clone())
    }

    async fn save(&self, config: &RemoteConfig) -> Result<()> {
        let mut remotes = self.remotes.write().await;
        match remotes.iter_mut().find(|r| r.id == config.id) {
            Some(existing) => *existing = config.clone(),
            None => remotes.push(config.clone()),
        }
        Ok(())
    }

    async fn delete(&self, id: RemoteConfigId) -> Result<()> {
        self.remotes.write().await.retain(|r| r.id != id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(name: &str) -> RemoteConfig {
        RemoteConfig::new(name, "http://localhost:9000", "photos", "minio", "minio123")
    }

    #[tokio::test]
    async fn test_json_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRemoteConfigStore::in_directory(dir.path());

        assert!(store.list().await.unwrap().is_empty());
        assert!(store.get(RemoteConfigId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_json_store_save_get_update_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRemoteConfigStore::in_directory(&dir.path().join("nested"));

        let first = remote("nas");
        let second = remote("cloud").with_prefix("phone/");
        store.save(&first).await.unwrap();
        store.save(&second).await.unwrap();

        let renamed = RemoteConfig {
            name: "nas-renamed".to_string(),
            ..first.clone()
        };
        store.save(&renamed).await.unwrap();

        let all = store.list().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "nas-renamed");
        assert_eq!(all[1].prefix.as_deref(), Some("phone/"));

        // A fresh instance sees the persisted document.
        let reopened = JsonRemoteConfigStore::new(store.path());
        assert_eq!(reopened.get(second.id).await.unwrap(), Some(second.clone()));

        store.delete(first.id).await.unwrap();
        store.delete(first.id).await.unwrap();
        assert_eq!(store.list().await.unwrap(), vec![second]);
    }

    #[tokio::test]
    async fn test_json_store_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRemoteConfigStore::in_directory(dir.path());
        std::fs::write(store.path(), b"{not json").unwrap();

        let err = store.list().await.unwrap_err();
        assert!(matches!(err, BridgeError::OperationFailed(_)));
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryRemoteConfigStore::new();
        let config = remote("nas");

        store.save(&config).await.unwrap();
        assert_eq!(store.get(config.id).await.unwrap(), Some(config.clone()));

        store.delete(config.id).await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }
}
