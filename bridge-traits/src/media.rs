//! Local Media Source Abstraction
//!
//! The device's media library as seen by the sync engine: a flat list of
//! uploadable items and a way to open each one as a byte stream.

use async_trait::async_trait;
use core_async::io::AsyncRead;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Byte stream handed from a media source to an object store.
///
/// Streams are single-use: whoever receives the box reads it once and drops it.
pub type DynAsyncRead = dyn AsyncRead + Send + Unpin;

/// A local media item eligible for upload.
///
/// `name` is the matching key against remote object names. Two items with the
/// same name are treated independently by the diff; the remote side decides
/// which one wins on upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalItem {
    /// Display name, also the object key below the remote prefix
    pub name: String,
    /// Declared size in bytes
    pub size: u64,
    /// MIME type sent with the upload
    pub content_type: String,
    /// Opaque handle the source uses to reopen the content (a path, a
    /// content URI, a database row id)
    pub locator: String,
}

impl LocalItem {
    pub fn new(
        name: impl Into<String>,
        size: u64,
        content_type: impl Into<String>,
        locator: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            size,
            content_type: content_type.into(),
            locator: locator.into(),
        }
    }
}

/// Local media source trait
///
/// Implementations enumerate the photos and videos the host wants mirrored:
/// - **Desktop**: a directory walker over configured roots
/// - **Android**: MediaStore queries over images and video collections
/// - **iOS**: PHAsset fetches
///
/// # Example
///
/// ```ignore
/// use bridge_traits::media::LocalMediaSource;
///
/// async fn total_bytes(source: &dyn LocalMediaSource) -> Result<u64> {
///     let items = source.enumerate_items().await?;
///     Ok(items.iter().map(|item| item.size).sum())
/// }
/// ```
#[async_trait]
pub trait LocalMediaSource: Send + Sync {
    /// Enumerate every item currently eligible for upload.
    ///
    /// Ordering must be stable across calls when the library is unchanged,
    /// since it becomes the upload order.
    async fn enumerate_items(&self) -> Result<Vec<LocalItem>>;

    /// Open a fresh stream over the item's content.
    ///
    /// Fails when the item disappeared or is not readable anymore.
    async fn open_stream(&self, item: &LocalItem) -> Result<Box<DynAsyncRead>>;
}
