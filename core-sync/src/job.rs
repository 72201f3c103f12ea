//! # Sync Job State Machine
//!
//! Tracks one sync run against one remote, with validated state transitions.
//!
//! ## State Machine
//!
//! ```text
//! Pending → Running → Completed
//!     ↓         ↓
//!     └──────→ Failed
//!     └──────→ Cancelled
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use bridge_traits::RemoteConfigId;
//! use core_sync::{DiffSummary, SyncJob, SyncProgress, SyncStatus};
//!
//! let job = SyncJob::new(RemoteConfigId::new());
//! let mut job = job.start()?;
//!
//! job.set_diff(DiffSummary { remote_count: 1, local_count: 3, missing_count: 2, missing_bytes: 150 })?;
//! job.update_progress(SyncProgress { items_transferred: 1, bytes_transferred: 100, total_items: 2, total_bytes: 150 })?;
//! assert_eq!(job.progress_percentage(), 66);
//!
//! let job = job.complete()?;
//! assert_eq!(job.status, SyncStatus::Completed);
//! # Ok::<(), core_sync::SyncError>(())
//! ```

use crate::diff::DiffSummary;
use crate::progress::SyncProgress;
use crate::{Result, SyncError};
use bridge_traits::RemoteConfigId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// ID Types
// ============================================================================

/// Unique identifier for a sync job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncJobId(Uuid);

impl SyncJobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a sync job ID from a string
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid UUID
    pub fn from_string(s: &str) -> Result<Self> {
        Ok(Self(
            Uuid::parse_str(s).map_err(|e| SyncError::InvalidJobId(e.to_string()))?,
        ))
    }

    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for SyncJobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SyncJobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for SyncJobId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

// ============================================================================
// Status
// ============================================================================

/// The current status of a sync job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Created, constraints checked, task not yet running
    Pending,
    /// Diffing or uploading
    Running,
    Completed,
    Failed,
    /// Cancelled by the host
    Cancelled,
}

impl SyncStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SyncStatus::Completed | SyncStatus::Failed | SyncStatus::Cancelled
        )
    }

    pub fn is_active(&self) -> bool {
        matches!(self, SyncStatus::Pending | SyncStatus::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Pending => "pending",
            SyncStatus::Running => "running",
            SyncStatus::Completed => "completed",
            SyncStatus::Failed => "failed",
            SyncStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for SyncStatus {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(SyncStatus::Pending),
            "running" => Ok(SyncStatus::Running),
            "completed" => Ok(SyncStatus::Completed),
            "failed" => Ok(SyncStatus::Failed),
            "cancelled" => Ok(SyncStatus::Cancelled),
            _ => Err(SyncError::InvalidStatus(s.to_string())),
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Sync Job Entity
// ============================================================================

/// Record of one sync run.
///
/// The transition methods consume the job and hand back the updated one, so a
/// rejected transition leaves the caller with an error and no half-updated
/// state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncJob {
    pub id: SyncJobId,
    /// Remote this run uploads to
    pub remote_id: RemoteConfigId,
    pub status: SyncStatus,
    /// Diff the run executes, once computed
    pub diff: Option<DiffSummary>,
    /// Latest progress snapshot
    pub progress: SyncProgress,
    /// Set when the run failed
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl SyncJob {
    /// Create a new sync job in pending state
    pub fn new(remote_id: RemoteConfigId) -> Self {
        Self {
            id: SyncJobId::new(),
            remote_id,
            status: SyncStatus::Pending,
            diff: None,
            progress: SyncProgress::default(),
            error_message: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Start the sync job
    ///
    /// # Errors
    ///
    /// Returns an error if the job is not in `Pending` state
    pub fn start(mut self) -> Result<Self> {
        self.validate_transition(SyncStatus::Running)?;
        self.status = SyncStatus::Running;
        self.started_at = Some(Utc::now());
        Ok(self)
    }

    /// Record the diff this run is about to execute.
    pub fn set_diff(&mut self, summary: DiffSummary) -> Result<()> {
        self.ensure_running("set_diff")?;
        self.diff = Some(summary);
        self.progress = SyncProgress::new(summary.missing_count, summary.missing_bytes);
        Ok(())
    }

    /// Replace the progress snapshot.
    pub fn update_progress(&mut self, progress: SyncProgress) -> Result<()> {
        self.ensure_running("update_progress")?;
        self.progress = progress;
        Ok(())
    }

    /// Mark the job as completed
    ///
    /// # Errors
    ///
    /// Returns an error if the job is not in `Running` state
    pub fn complete(mut self) -> Result<Self> {
        self.validate_transition(SyncStatus::Completed)?;
        self.status = SyncStatus::Completed;
        self.completed_at = Some(Utc::now());
        Ok(self)
    }

    /// Mark the job as failed with an error message
    pub fn fail(mut self, error_message: impl Into<String>) -> Result<Self> {
        self.validate_transition(SyncStatus::Failed)?;
        self.status = SyncStatus::Failed;
        self.completed_at = Some(Utc::now());
        self.error_message = Some(error_message.into());
        Ok(self)
    }

    /// Cancel the job
    ///
    /// # Errors
    ///
    /// Returns an error if the job is already in a terminal state
    pub fn cancel(mut self) -> Result<Self> {
        self.validate_transition(SyncStatus::Cancelled)?;
        self.status = SyncStatus::Cancelled;
        self.completed_at = Some(Utc::now());
        Ok(self)
    }

    /// Returns None if the job hasn't started or completed yet
    pub fn duration_secs(&self) -> Option<u64> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some((end - start).num_seconds().max(0) as u64),
            _ => None,
        }
    }

    // ------------------------------------------------------------------------
    // Worker outputs
    // ------------------------------------------------------------------------

    /// Items uploaded so far.
    pub fn progress_count(&self) -> u64 {
        self.progress.items_transferred
    }

    /// Byte-based progress (0-100).
    pub fn progress_percentage(&self) -> u8 {
        self.progress.percent()
    }

    /// Bytes uploaded so far.
    pub fn progress_bytes(&self) -> u64 {
        self.progress.bytes_transferred
    }

    /// Bytes the run set out to upload; 0 before the diff is known.
    pub fn diff_bytes(&self) -> u64 {
        self.diff.map_or(0, |d| d.missing_bytes)
    }

    /// Items the run set out to upload; 0 before the diff is known.
    pub fn diff_count(&self) -> u64 {
        self.diff.map_or(0, |d| d.missing_count)
    }

    pub fn error(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    fn ensure_running(&self, operation: &str) -> Result<()> {
        if self.status != SyncStatus::Running {
            return Err(SyncError::InvalidStateTransition {
                from: self.status.as_str().to_string(),
                to: operation.to_string(),
                reason: format!("Job must be running to {}", operation.replace('_', " ")),
            });
        }
        Ok(())
    }

    fn validate_transition(&self, to: SyncStatus) -> Result<()> {
        let valid = matches!(
            (self.status, to),
            (SyncStatus::Pending, SyncStatus::Running)
                | (SyncStatus::Pending, SyncStatus::Cancelled)
                | (SyncStatus::Pending, SyncStatus::Failed)
                | (SyncStatus::Running, SyncStatus::Completed)
                | (SyncStatus::Running, SyncStatus::Failed)
                | (SyncStatus::Running, SyncStatus::Cancelled)
        );

        if !valid {
            return Err(SyncError::InvalidStateTransition {
                from: self.status.as_str().to_string(),
                to: to.as_str().to_string(),
                reason: format!(
                    "Cannot transition from {} to {}",
                    self.status.as_str(),
                    to.as_str()
                ),
            });
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
