//! # Diff Engine
//!
//! Works out which local items are not yet present at a remote.
//!
//! The diff is one-way and name-based: a local item is missing when no remote
//! object has exactly the same name. Sizes and content are not compared, so a
//! changed file that kept its name is considered synced.
//!
//! ```rust
//! use bridge_traits::{LocalItem, RemoteObject};
//! use core_sync::Diff;
//!
//! let remote = vec![RemoteObject::new("a.png", Some(100))];
//! let local = vec![
//!     LocalItem::new("a.png", 100, "image/png", "/pics/a.png"),
//!     LocalItem::new("b.png", 50, "image/png", "/pics/b.png"),
//! ];
//!
//! let diff = Diff::compute(remote, local);
//! assert_eq!(diff.missing_count(), 1);
//! assert_eq!(diff.missing()[0].name, "b.png");
//! assert_eq!(diff.missing_bytes(), 50);
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use bridge_traits::{LocalItem, LocalMediaSource, RemoteObject, RemoteObjectStore};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::{Result, SyncError};

// ============================================================================
// Diff
// ============================================================================

/// Snapshot of both sides and the local items absent remotely.
///
/// Built in one go and never mutated; compute a new one for every cycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Diff {
    remote_items: Vec<RemoteObject>,
    local_items: Vec<LocalItem>,
    missing: Vec<LocalItem>,
    missing_bytes: u64,
}

impl Diff {
    /// Projects a remote listing and a local enumeration into a diff.
    ///
    /// Names compare byte for byte. Duplicate local names are kept as
    /// separate entries, and `missing` keeps the order of `local`.
    pub fn compute(remote: Vec<RemoteObject>, local: Vec<LocalItem>) -> Self {
        let remote_names: HashSet<&str> = remote.iter().map(|o| o.name.as_str()).collect();

        let missing: Vec<LocalItem> = local
            .iter()
            .filter(|item| !remote_names.contains(item.name.as_str()))
            .cloned()
            .collect();
        let missing_bytes = missing
            .iter()
            .fold(0u64, |total, item| total.saturating_add(item.size));

        Self {
            remote_items: remote,
            local_items: local,
            missing,
            missing_bytes,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn remote_items(&self) -> &[RemoteObject] {
        &self.remote_items
    }

    pub fn local_items(&self) -> &[LocalItem] {
        &self.local_items
    }

    /// Local items to upload, in enumeration order.
    pub fn missing(&self) -> &[LocalItem] {
        &self.missing
    }

    pub fn missing_count(&self) -> u64 {
        self.missing.len() as u64
    }

    /// Sum of the declared sizes of [`Diff::missing`].
    pub fn missing_bytes(&self) -> u64 {
        self.missing_bytes
    }

    pub fn is_up_to_date(&self) -> bool {
        self.missing.is_empty()
    }

    pub fn summary(&self) -> DiffSummary {
        DiffSummary {
            remote_count: self.remote_items.len() as u64,
            local_count: self.local_items.len() as u64,
            missing_count: self.missing_count(),
            missing_bytes: self.missing_bytes,
        }
    }
}

/// The four numbers a UI shows for a diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DiffSummary {
    pub remote_count: u64,
    pub local_count: u64,
    pub missing_count: u64,
    pub missing_bytes: u64,
}

// ============================================================================
// Diff Engine
// ============================================================================

/// Queries a remote and the local library and diffs them.
#[derive(Clone)]
pub struct DiffEngine {
    object_store: Arc<dyn RemoteObjectStore>,
    media_source: Arc<dyn LocalMediaSource>,
}

impl DiffEngine {
    pub fn new(
        object_store: Arc<dyn RemoteObjectStore>,
        media_source: Arc<dyn LocalMediaSource>,
    ) -> Self {
        Self {
            object_store,
            media_source,
        }
    }

    /// Lists the remote, enumerates local media and returns their diff.
    ///
    /// Read-only on both sides. The two queries are not atomic with respect
    /// to each other; an item added in between shows up on the next cycle.
    ///
    /// # Errors
    ///
    /// - [`SyncError::Listing`] when the remote listing fails
    /// - [`SyncError::Enumeration`] when local enumeration fails
    #[instrument(skip(self))]
    pub async fn compute_diff(&self) -> Result<Diff> {
        let remote = self
            .object_store
            .list_objects()
            .await
            .map_err(|e| SyncError::Listing(e.to_string()))?;
        debug!(count = remote.len(), "Listed remote objects");

        let local = self
            .media_source
            .enumerate_items()
            .await
            .map_err(|e| SyncError::Enumeration(e.to_string()))?;
        debug!(count = local.len(), "Enumerated local items");

        let diff = Diff::compute(remote, local);
        info!(
            missing = diff.missing_count(),
            missing_bytes = diff.missing_bytes(),
            "Computed diff"
        );
        Ok(diff)
    }
}
