//! Hand-written bridges shared by the integration suites.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    media::{DynAsyncRead, LocalItem, LocalMediaSource},
    object_store::{ObjectStoreFactory, RemoteObject, RemoteObjectStore},
    storage::{RemoteConfig, RemoteConfigId, RemoteConfigStore},
};
use core_async::io::{AsyncRead, AsyncReadExt, ReadBuf};
use core_async::sync::{Mutex, Semaphore};
use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

// ============================================================================
// Local media
// ============================================================================

/// Stream that counts how often it was dropped.
struct TrackedStream {
    inner: Cursor<Vec<u8>>,
    closed: Arc<AtomicUsize>,
}

impl AsyncRead for TrackedStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl Drop for TrackedStream {
    fn drop(&mut self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct MockMediaSource {
    items: Mutex<Vec<LocalItem>>,
    contents: Mutex<HashMap<String, Vec<u8>>>,
    fail_enumeration: bool,
    pub opened: Arc<AtomicUsize>,
    pub closed: Arc<AtomicUsize>,
}

impl MockMediaSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_enumeration: true,
            ..Self::default()
        }
    }

    /// Adds an item whose content matches its declared size.
    pub async fn add(&self, name: &str, size: usize) {
        self.add_with_content(name, size as u64, vec![7u8; size]).await;
    }

    /// Adds an item with arbitrary content, which may disagree with `size`.
    pub async fn add_with_content(&self, name: &str, size: u64, content: Vec<u8>) {
        let locator = format!("/library/{}", name);
        self.items
            .lock()
            .await
            .push(LocalItem::new(name, size, "image/png", locator.clone()));
        self.contents.lock().await.insert(locator, content);
    }

    /// Adds an item whose stream cannot be opened.
    pub async fn add_unreadable(&self, name: &str, size: u64) {
        self.items.lock().await.push(LocalItem::new(
            name,
            size,
            "image/png",
            format!("/gone/{}", name),
        ));
    }
}

#[async_trait]
impl LocalMediaSource for MockMediaSource {
    async fn enumerate_items(&self) -> Result<Vec<LocalItem>> {
        if self.fail_enumeration {
            return Err(BridgeError::NotAvailable("media permission denied".to_string()));
        }
        Ok(self.items.lock().await.clone())
    }

    async fn open_stream(&self, item: &LocalItem) -> Result<Box<DynAsyncRead>> {
        let content = self
            .contents
            .lock()
            .await
            .get(&item.locator)
            .cloned()
            .ok_or_else(|| BridgeError::NotFound(item.locator.clone()))?;

        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(TrackedStream {
            inner: Cursor::new(content),
            closed: Arc::clone(&self.closed),
        }))
    }
}

// ============================================================================
// Object store
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub name: String,
    pub content_type: String,
    pub bytes: usize,
}

#[derive(Default)]
pub struct MockObjectStore {
    objects: Mutex<Vec<RemoteObject>>,
    uploads: Mutex<Vec<Upload>>,
    reject: Mutex<HashSet<String>>,
    crash: Mutex<HashSet<String>>,
    fail_listing: bool,
    gate: Option<Arc<Semaphore>>,
    pub attempts: AtomicUsize,
}

impl MockObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_objects(names: &[&str]) -> Self {
        Self {
            objects: Mutex::new(
                names
                    .iter()
                    .map(|name| RemoteObject::new(*name, Some(1)))
                    .collect(),
            ),
            ..Self::default()
        }
    }

    pub fn failing_listing() -> Self {
        Self {
            fail_listing: true,
            ..Self::default()
        }
    }

    /// Every upload waits for a permit on `gate` before it is accepted.
    pub fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    /// Uploads of `name` are refused after part of the body was read.
    pub async fn reject(&self, name: &str) {
        self.reject.lock().await.insert(name.to_string());
    }

    /// Uploads of `name` panic inside the store.
    pub async fn crash_on(&self, name: &str) {
        self.crash.lock().await.insert(name.to_string());
    }

    pub async fn uploads(&self) -> Vec<Upload> {
        self.uploads.lock().await.clone()
    }

    pub async fn object_names(&self) -> Vec<String> {
        self.objects
            .lock()
            .await
            .iter()
            .map(|o| o.name.clone())
            .collect()
    }
}

#[async_trait]
impl RemoteObjectStore for MockObjectStore {
    async fn list_objects(&self) -> Result<Vec<RemoteObject>> {
        if self.fail_listing {
            return Err(BridgeError::OperationFailed(
                "NoSuchBucket: bucket 'photos' does not exist".to_string(),
            ));
        }
        Ok(self.objects.lock().await.clone())
    }

    async fn put_object(
        &self,
        mut stream: Box<DynAsyncRead>,
        name: &str,
        content_type: &str,
        size: u64,
    ) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| BridgeError::OperationFailed(e.to_string()))?
                .forget();
        }

        if self.crash.lock().await.contains(name) {
            panic!("storage driver crashed while writing '{}'", name);
        }

        if self.reject.lock().await.contains(name) {
            let mut head = [0u8; 4];
            stream.read_exact(&mut head).await?;
            return Err(BridgeError::OperationFailed(format!(
                "AccessDenied: cannot write '{}'",
                name
            )));
        }

        let mut body = Vec::new();
        stream.read_to_end(&mut body).await?;
        assert_eq!(body.len() as u64, size);

        self.uploads.lock().await.push(Upload {
            name: name.to_string(),
            content_type: content_type.to_string(),
            bytes: body.len(),
        });
        self.objects
            .lock()
            .await
            .push(RemoteObject::new(name, Some(size)));
        Ok(())
    }
}

// ============================================================================
// Remote configuration
// ============================================================================

pub struct StaticStoreFactory {
    store: Arc<MockObjectStore>,
    pub connects: AtomicUsize,
}

impl StaticStoreFactory {
    pub fn new(store: Arc<MockObjectStore>) -> Self {
        Self {
            store,
            connects: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ObjectStoreFactory for StaticStoreFactory {
    async fn connect(&self, config: &RemoteConfig) -> Result<Arc<dyn RemoteObjectStore>> {
        if config.bucket.is_empty() {
            return Err(BridgeError::OperationFailed("bucket name is empty".to_string()));
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::clone(&self.store) as Arc<dyn RemoteObjectStore>)
    }
}

#[derive(Default)]
pub struct MemoryConfigs {
    remotes: Mutex<HashMap<RemoteConfigId, RemoteConfig>>,
}

impl MemoryConfigs {
    pub async fn with_remote(remote: RemoteConfig) -> Self {
        let configs = Self::default();
        configs.save(&remote).await.unwrap();
        configs
    }
}

#[async_trait]
impl RemoteConfigStore for MemoryConfigs {
    async fn get(&self, id: RemoteConfigId) -> Result<Option<RemoteConfig>> {
        Ok(self.remotes.lock().await.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<RemoteConfig>> {
        Ok(self.remotes.lock().await.values().cloned().collect())
    }

    async fn save(&self, config: &RemoteConfig) -> Result<()> {
        self.remotes.lock().await.insert(config.id, config.clone());
        Ok(())
    }

    async fn delete(&self, id: RemoteConfigId) -> Result<()> {
        self.remotes.lock().await.remove(&id);
        Ok(())
    }
}

pub fn remote() -> RemoteConfig {
    RemoteConfig::new("nas", "http://minio:9000", "photos", "minioadmin", "minioadmin")
}
