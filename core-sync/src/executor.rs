//! # Sync Executor
//!
//! Uploads the missing items of a [`Diff`] one after another.
//!
//! ## Failure policy
//!
//! The first failing item ends the run. Nothing is retried and nothing that
//! was already uploaded is rolled back; the next run's diff simply no longer
//! contains those items. Only fully uploaded items count towards progress.
//!
//! ## Cancellation
//!
//! The token is checked before each item. An upload in flight is allowed to
//! finish, so a run reports `Canceled` at most one item after the request.

use std::sync::Arc;

use bridge_traits::{LocalItem, LocalMediaSource, RemoteObjectStore};
use core_async::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::diff::Diff;
use crate::progress::{SyncOutcome, SyncProgress};
use crate::reader::SizeCheckedReader;
use crate::{Result, SyncError};

/// Streams local items to a remote object store.
#[derive(Clone)]
pub struct SyncExecutor {
    object_store: Arc<dyn RemoteObjectStore>,
    media_source: Arc<dyn LocalMediaSource>,
}

impl SyncExecutor {
    pub fn new(
        object_store: Arc<dyn RemoteObjectStore>,
        media_source: Arc<dyn LocalMediaSource>,
    ) -> Self {
        Self {
            object_store,
            media_source,
        }
    }

    /// Uploads every item in `diff.missing()` in order.
    ///
    /// `on_progress` is called once per uploaded item, from the executing
    /// task, with cumulative counters. An empty diff succeeds immediately
    /// without calling it.
    #[instrument(skip_all, fields(items = diff.missing_count(), bytes = diff.missing_bytes()))]
    pub async fn execute<F>(
        &self,
        diff: &Diff,
        cancel_token: &CancellationToken,
        mut on_progress: F,
    ) -> SyncOutcome
    where
        F: FnMut(&SyncProgress),
    {
        let mut progress = SyncProgress::new(diff.missing_count(), diff.missing_bytes());

        for item in diff.missing() {
            if cancel_token.is_cancelled() {
                info!(
                    items_transferred = progress.items_transferred,
                    "Sync cancelled before next item"
                );
                return SyncOutcome::Canceled {
                    partial_progress: progress,
                };
            }

            if let Err(e) = self.transfer(item).await {
                warn!(item = %item.name, error = %e, "Upload failed, stopping run");
                return SyncOutcome::Failure {
                    message: e.to_string(),
                    partial_progress: progress,
                };
            }

            progress.record(item.size);
            on_progress(&progress);
        }

        info!(
            items_transferred = progress.items_transferred,
            bytes_transferred = progress.bytes_transferred,
            "Sync run finished"
        );
        SyncOutcome::Success {
            final_progress: progress,
        }
    }

    /// Opens one item and hands its stream to the store, which drops it when
    /// the upload returns.
    async fn transfer(&self, item: &LocalItem) -> Result<()> {
        let stream = self
            .media_source
            .open_stream(item)
            .await
            .map_err(|e| SyncError::Stream {
                name: item.name.clone(),
                message: e.to_string(),
            })?;

        let checked = SizeCheckedReader::new(stream, item.size);
        self.object_store
            .put_object(Box::new(checked), &item.name, &item.content_type, item.size)
            .await
            .map_err(|e| SyncError::Upload {
                name: item.name.clone(),
                message: e.to_string(),
            })?;

        debug!(item = %item.name, bytes = item.size, "Uploaded item");
        Ok(())
    }
}
