//! # Sync Module
//!
//! Mirrors a local photo/video library to an S3-compatible remote.
//!
//! ## Overview
//!
//! A sync cycle has two halves:
//! - **Diff** (`diff`): list the remote, enumerate the local library, and keep
//!   the local items whose name is absent remotely
//! - **Execute** (`executor`): upload those items one by one, reporting
//!   progress after each, and stop at the first failure
//!
//! ## Components
//!
//! - **Diff Engine** (`diff`): `Diff`, `DiffSummary` and `DiffEngine`
//! - **Sync Executor** (`executor`): sequential, fail-fast, cancellable uploads
//! - **Progress** (`progress`): `SyncProgress` snapshots and the `SyncOutcome` of a run
//! - **Size-checked reader** (`reader`): rejects streams that disagree with the declared size
//! - **Sync Job State Machine** (`job`): per-run record with validated transitions
//! - **Sync Coordinator** (`coordinator`): one active run per remote, task
//!   constraints, timeout, events

pub mod coordinator;
pub mod diff;
pub mod error;
pub mod executor;
pub mod job;
pub mod progress;
pub mod reader;

pub use coordinator::{SyncConfig, SyncCoordinator, DEFAULT_JOB_HISTORY_LIMIT};
pub use diff::{Diff, DiffEngine, DiffSummary};
pub use error::{Result, SyncError};
pub use executor::SyncExecutor;
pub use job::{SyncJob, SyncJobId, SyncStatus};
pub use progress::{SyncOutcome, SyncProgress};
pub use reader::SizeCheckedReader;
