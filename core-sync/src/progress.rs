//! Progress snapshots and run outcomes.

use serde::{Deserialize, Serialize};

/// Cumulative transfer state of one sync run.
///
/// A new snapshot is published after every item that finished uploading.
/// Counters never decrease within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SyncProgress {
    pub items_transferred: u64,
    pub bytes_transferred: u64,
    /// Items the run set out to upload
    pub total_items: u64,
    /// Bytes the run set out to upload (the diff's missing bytes)
    pub total_bytes: u64,
}

impl SyncProgress {
    pub fn new(total_items: u64, total_bytes: u64) -> Self {
        Self {
            total_items,
            total_bytes,
            ..Self::default()
        }
    }

    /// Credits one fully uploaded item.
    pub(crate) fn record(&mut self, size: u64) {
        self.items_transferred += 1;
        self.bytes_transferred = self.bytes_transferred.saturating_add(size);
    }

    /// Share of bytes uploaded, in `[0, 1]`. Zero when there is nothing to upload.
    pub fn fraction_complete(&self) -> f64 {
        if self.total_bytes == 0 {
            0.0
        } else {
            (self.bytes_transferred as f64 / self.total_bytes as f64).min(1.0)
        }
    }

    /// [`fraction_complete`](Self::fraction_complete) as a whole percentage.
    pub fn percent(&self) -> u8 {
        (self.fraction_complete() * 100.0) as u8
    }
}

/// How a sync run ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// Every missing item was uploaded.
    Success { final_progress: SyncProgress },
    /// An item failed; the run stopped there.
    Failure {
        message: String,
        partial_progress: SyncProgress,
    },
    /// Cancellation was observed before the next item.
    Canceled { partial_progress: SyncProgress },
}

impl SyncOutcome {
    /// Progress at the moment the run ended.
    pub fn progress(&self) -> &SyncProgress {
        match self {
            SyncOutcome::Success { final_progress } => final_progress,
            SyncOutcome::Failure {
                partial_progress, ..
            }
            | SyncOutcome::Canceled { partial_progress } => partial_progress,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SyncOutcome::Success { .. })
    }
}
