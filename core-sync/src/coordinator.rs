//! # Sync Coordinator
//!
//! Runs sync jobs in the background, at most one per remote.
//!
//! ## Overview
//!
//! `start_sync` is the entry point a host calls from a button, a schedule or
//! a "new photo" trigger. It:
//! 1. Rejects the request when a run for the same remote is still active
//! 2. Checks the task constraints (network connected, unmetered, battery)
//! 3. Loads the `RemoteConfig` and connects an object store client
//! 4. Spawns a task that computes a fresh diff and executes it under the
//!    configured timeout
//!
//! Every step is published on the `EventBus`, and each job's latest
//! [`SyncJob`] snapshot is available through a `watch` channel.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let job_id = coordinator.start_sync(remote_id).await?;
//!
//! let mut updates = coordinator.subscribe(job_id).await?;
//! while updates.changed().await.is_ok() {
//!     let job = updates.borrow().clone();
//!     println!("{}% ({} bytes)", job.progress_percentage(), job.progress_bytes());
//!     if job.status.is_terminal() {
//!         break;
//!     }
//! }
//! ```

use crate::{
    diff::{Diff, DiffEngine},
    executor::SyncExecutor,
    job::{SyncJob, SyncJobId, SyncStatus},
    progress::SyncOutcome,
    Result, SyncError,
};
use bridge_traits::{
    background::{PowerMonitor, TaskConstraints},
    media::LocalMediaSource,
    network::{NetworkMonitor, NetworkStatus},
    object_store::{ObjectStoreFactory, RemoteObjectStore},
    storage::{RemoteConfig, RemoteConfigId, RemoteConfigStore},
};
use core_async::sync::{watch, CancellationToken, Mutex, RwLock};
use core_async::time::{timeout, Duration};
use core_runtime::events::{CoreEvent, DiffEvent, EventBus, SyncEvent};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Finished jobs kept per remote by default
pub const DEFAULT_JOB_HISTORY_LIMIT: usize = 20;

/// Sync coordinator configuration
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Upper bound for one run, diff included
    pub sync_timeout: Duration,
    /// Conditions checked by `start_sync`
    pub constraints: TaskConstraints,
    /// Finished jobs kept per remote; older ones are dropped when a new run
    /// starts
    pub job_history_limit: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            sync_timeout: Duration::from_secs(3600),
            constraints: TaskConstraints::default(),
            job_history_limit: DEFAULT_JOB_HISTORY_LIMIT,
        }
    }
}

/// Active sync job tracking
#[derive(Clone)]
struct ActiveSync {
    job_id: SyncJobId,
    cancellation_token: CancellationToken,
}

type JobSender = Arc<watch::Sender<SyncJob>>;

/// Background runner for sync jobs.
///
/// Cheap to clone; clones share jobs and active runs.
#[derive(Clone)]
pub struct SyncCoordinator {
    config: SyncConfig,
    event_bus: Arc<EventBus>,
    media_source: Arc<dyn LocalMediaSource>,
    remote_configs: Arc<dyn RemoteConfigStore>,
    store_factory: Arc<dyn ObjectStoreFactory>,
    network_monitor: Option<Arc<dyn NetworkMonitor>>,
    power_monitor: Option<Arc<dyn PowerMonitor>>,

    /// Running jobs plus the most recent finished ones per remote
    jobs: Arc<RwLock<HashMap<SyncJobId, JobSender>>>,

    /// Active runs by remote
    active_syncs: Arc<Mutex<HashMap<RemoteConfigId, ActiveSync>>>,
}

impl SyncCoordinator {
    pub fn new(
        config: SyncConfig,
        event_bus: Arc<EventBus>,
        media_source: Arc<dyn LocalMediaSource>,
        remote_configs: Arc<dyn RemoteConfigStore>,
        store_factory: Arc<dyn ObjectStoreFactory>,
    ) -> Self {
        Self {
            config,
            event_bus,
            media_source,
            remote_configs,
            store_factory,
            network_monitor: None,
            power_monitor: None,
            jobs: Arc::new(RwLock::new(HashMap::new())),
            active_syncs: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Without a monitor the network constraints are treated as satisfied.
    pub fn with_network_monitor(mut self, monitor: Arc<dyn NetworkMonitor>) -> Self {
        self.network_monitor = Some(monitor);
        self
    }

    /// Without a monitor the battery constraint is treated as satisfied.
    pub fn with_power_monitor(mut self, monitor: Arc<dyn PowerMonitor>) -> Self {
        self.power_monitor = Some(monitor);
        self
    }

    // ========================================================================
    // Starting runs
    // ========================================================================

    /// Start a sync run for a remote.
    ///
    /// Returns as soon as the run is spawned; follow it with
    /// [`subscribe`](Self::subscribe) or [`wait_for_completion`](Self::wait_for_completion).
    ///
    /// # Errors
    ///
    /// - `SyncInProgress` if a run for this remote is still active; the
    ///   existing run is kept
    /// - `ConstraintsNotMet` if the network or battery conditions fail
    /// - `RemoteNotFound` if no configuration is stored under `remote_id`
    /// - `Connection` if the object store client cannot be built
    #[instrument(skip(self), fields(remote_id = %remote_id))]
    pub async fn start_sync(&self, remote_id: RemoteConfigId) -> Result<SyncJobId> {
        if self.is_sync_active(remote_id).await {
            return Err(SyncError::SyncInProgress {
                remote_id: remote_id.to_string(),
            });
        }

        self.check_constraints().await?;

        let remote = self.load_remote(remote_id).await?;
        let store = self.connect(&remote).await?;

        let job = SyncJob::new(remote_id);
        let job_id = job.id;
        let cancellation_token = CancellationToken::new();

        {
            let mut active_syncs = self.active_syncs.lock().await;
            // Another start_sync may have won the race while we were connecting.
            if active_syncs.contains_key(&remote_id) {
                return Err(SyncError::SyncInProgress {
                    remote_id: remote_id.to_string(),
                });
            }
            active_syncs.insert(
                remote_id,
                ActiveSync {
                    job_id,
                    cancellation_token: cancellation_token.clone(),
                },
            );
        }

        let (sender, _) = watch::channel(job);
        let sender = Arc::new(sender);
        self.register_job(remote_id, job_id, Arc::clone(&sender)).await;

        self.event_bus
            .emit(CoreEvent::Sync(SyncEvent::Started {
                job_id: job_id.to_string(),
                remote_id: remote_id.to_string(),
            }))
            .ok();

        let coordinator = self.clone();
        let run_sender = Arc::clone(&sender);
        let run = core_async::task::spawn(async move {
            coordinator
                .run_sync_task(job_id, remote_id, run_sender, store, cancellation_token)
                .await;
        });

        // A panicking bridge must not leave the remote locked.
        let supervisor = self.clone();
        core_async::task::spawn(async move {
            if let Err(e) = run.await {
                error!("Sync job {} aborted: {}", job_id, e);
                let message = format!("Sync task aborted: {}", e);
                supervisor
                    .finish_failed(job_id, remote_id, &sender, message)
                    .await;
            }
        });

        info!(job_id = %job_id, remote = %remote.name, "Started sync");
        Ok(job_id)
    }

    /// Compute a diff for a remote without uploading anything.
    #[instrument(skip(self), fields(remote_id = %remote_id))]
    pub async fn compute_diff(&self, remote_id: RemoteConfigId) -> Result<Diff> {
        let remote = self.load_remote(remote_id).await?;
        let store = self.connect(&remote).await?;

        self.diff_with(remote_id, store).await
    }

    async fn check_constraints(&self) -> Result<()> {
        let constraints = &self.config.constraints;

        if constraints.requires_network || constraints.requires_unmetered {
            if let Some(monitor) = &self.network_monitor {
                let info = monitor.get_network_info().await.map_err(|e| {
                    SyncError::ConstraintsNotMet(format!("Failed to check network: {}", e))
                })?;

                if info.status != NetworkStatus::Connected {
                    return Err(SyncError::ConstraintsNotMet(
                        "Network not available".to_string(),
                    ));
                }
                if constraints.requires_unmetered && info.is_metered {
                    return Err(SyncError::ConstraintsNotMet(
                        "Unmetered network required but network is metered".to_string(),
                    ));
                }
            }
        }

        if constraints.requires_battery_not_low {
            if let Some(monitor) = &self.power_monitor {
                let battery_low = monitor.is_battery_low().await.map_err(|e| {
                    SyncError::ConstraintsNotMet(format!("Failed to check battery: {}", e))
                })?;
                if battery_low {
                    return Err(SyncError::ConstraintsNotMet("Battery is low".to_string()));
                }
            }
        }

        Ok(())
    }

    /// Adds a job and drops the oldest finished jobs of the same remote
    /// beyond `job_history_limit`.
    async fn register_job(&self, remote_id: RemoteConfigId, job_id: SyncJobId, sender: JobSender) {
        let mut jobs = self.jobs.write().await;
        jobs.insert(job_id, sender);

        let mut finished: Vec<_> = jobs
            .iter()
            .filter_map(|(id, sender)| {
                let job = sender.borrow();
                (job.remote_id == remote_id && job.status.is_terminal())
                    .then_some((*id, job.created_at))
            })
            .collect();
        if finished.len() <= self.config.job_history_limit {
            return;
        }

        finished.sort_by(|a, b| b.1.cmp(&a.1));
        for (id, _) in finished.into_iter().skip(self.config.job_history_limit) {
            jobs.remove(&id);
        }
        debug!(remote_id = %remote_id, kept = self.config.job_history_limit, "Pruned job history");
    }

    async fn load_remote(&self, remote_id: RemoteConfigId) -> Result<RemoteConfig> {
        self.remote_configs
            .get(remote_id)
            .await?
            .ok_or_else(|| SyncError::RemoteNotFound {
                remote_id: remote_id.to_string(),
            })
    }

    async fn connect(&self, remote: &RemoteConfig) -> Result<Arc<dyn RemoteObjectStore>> {
        self.store_factory
            .connect(remote)
            .await
            .map_err(|e| SyncError::Connection(e.to_string()))
    }

    async fn diff_with(
        &self,
        remote_id: RemoteConfigId,
        store: Arc<dyn RemoteObjectStore>,
    ) -> Result<Diff> {
        let engine = DiffEngine::new(store, Arc::clone(&self.media_source));

        match engine.compute_diff().await {
            Ok(diff) => {
                let summary = diff.summary();
                self.event_bus
                    .emit(CoreEvent::Diff(DiffEvent::Computed {
                        remote_id: remote_id.to_string(),
                        remote_count: summary.remote_count,
                        local_count: summary.local_count,
                        missing_count: summary.missing_count,
                        missing_bytes: summary.missing_bytes,
                    }))
                    .ok();
                Ok(diff)
            }
            Err(e) => {
                self.event_bus
                    .emit(CoreEvent::Diff(DiffEvent::Failed {
                        remote_id: remote_id.to_string(),
                        message: e.to_string(),
                    }))
                    .ok();
                Err(e)
            }
        }
    }

    // ========================================================================
    // Background run
    // ========================================================================

    #[instrument(skip(self, sender, store, cancellation_token), fields(job_id = %job_id))]
    async fn run_sync_task(
        &self,
        job_id: SyncJobId,
        remote_id: RemoteConfigId,
        sender: JobSender,
        store: Arc<dyn RemoteObjectStore>,
        cancellation_token: CancellationToken,
    ) {
        let run = self.execute_sync(job_id, remote_id, &sender, store, &cancellation_token);

        match timeout(self.config.sync_timeout, run).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!("Sync job {} failed: {}", job_id, e);
                self.finish_failed(job_id, remote_id, &sender, e.to_string())
                    .await;
            }
            Err(_) => {
                let e = SyncError::Timeout(self.config.sync_timeout.as_secs());
                error!("Sync job {} timed out", job_id);
                self.finish_failed(job_id, remote_id, &sender, e.to_string())
                    .await;
            }
        }
    }

    async fn execute_sync(
        &self,
        job_id: SyncJobId,
        remote_id: RemoteConfigId,
        sender: &JobSender,
        store: Arc<dyn RemoteObjectStore>,
        cancellation_token: &CancellationToken,
    ) -> Result<()> {
        transition(sender, SyncJob::start)?;

        let diff = match self.diff_with(remote_id, Arc::clone(&store)).await {
            Ok(diff) => diff,
            Err(e) => {
                warn!("Diff for sync job {} failed: {}", job_id, e);
                let message = format!("Failed to create diff: {}", e);
                self.finish_failed(job_id, remote_id, sender, message).await;
                return Ok(());
            }
        };

        let summary = diff.summary();
        sender.send_modify(|job| {
            if let Err(e) = job.set_diff(summary) {
                warn!("Could not record diff: {}", e);
            }
        });

        let executor = SyncExecutor::new(store, Arc::clone(&self.media_source));
        let job_id_str = job_id.to_string();
        let outcome = executor
            .execute(&diff, cancellation_token, |progress| {
                sender.send_modify(|job| {
                    if let Err(e) = job.update_progress(*progress) {
                        warn!("Could not record progress: {}", e);
                    }
                });
                self.event_bus
                    .emit(CoreEvent::Sync(SyncEvent::Progress {
                        job_id: job_id_str.clone(),
                        items_transferred: progress.items_transferred,
                        bytes_transferred: progress.bytes_transferred,
                        total_items: progress.total_items,
                        total_bytes: progress.total_bytes,
                        percent: progress.percent(),
                    }))
                    .ok();
            })
            .await;

        match outcome {
            SyncOutcome::Success { final_progress } => {
                self.release(remote_id, job_id).await;
                let job = transition(sender, SyncJob::complete)?;
                self.event_bus
                    .emit(CoreEvent::Sync(SyncEvent::Completed {
                        job_id: job_id_str,
                        items_transferred: final_progress.items_transferred,
                        bytes_transferred: final_progress.bytes_transferred,
                        duration_secs: job.duration_secs().unwrap_or(0),
                    }))
                    .ok();
                info!("Sync job {} completed", job_id);
            }
            SyncOutcome::Failure { message, .. } => {
                let message = format!("Failed to sync files: {}", message);
                self.finish_failed(job_id, remote_id, sender, message).await;
            }
            SyncOutcome::Canceled { partial_progress } => {
                self.release(remote_id, job_id).await;
                transition(sender, SyncJob::cancel)?;
                self.event_bus
                    .emit(CoreEvent::Sync(SyncEvent::Cancelled {
                        job_id: job_id_str,
                        items_transferred: partial_progress.items_transferred,
                        bytes_transferred: partial_progress.bytes_transferred,
                    }))
                    .ok();
                info!("Sync job {} cancelled", job_id);
            }
        }

        Ok(())
    }

    /// Frees the remote for the next run. Called before the terminal state is
    /// published, so a host reacting to it can start again right away.
    async fn release(&self, remote_id: RemoteConfigId, job_id: SyncJobId) {
        let mut active_syncs = self.active_syncs.lock().await;
        if active_syncs.get(&remote_id).map(|a| a.job_id) == Some(job_id) {
            active_syncs.remove(&remote_id);
        }
    }

    async fn finish_failed(
        &self,
        job_id: SyncJobId,
        remote_id: RemoteConfigId,
        sender: &JobSender,
        message: String,
    ) {
        self.release(remote_id, job_id).await;
        match transition(sender, |job| job.fail(message.clone())) {
            Ok(job) => {
                self.event_bus
                    .emit(CoreEvent::Sync(SyncEvent::Failed {
                        job_id: job_id.to_string(),
                        message,
                        items_transferred: job.progress_count(),
                        bytes_transferred: job.progress_bytes(),
                    }))
                    .ok();
            }
            Err(e) => warn!("Could not mark job {} failed: {}", job_id, e),
        }
    }

    // ========================================================================
    // Queries and control
    // ========================================================================

    /// Request cancellation of a running job.
    ///
    /// The run stops before its next item and ends in `Cancelled`; wait for
    /// that with [`wait_for_completion`](Self::wait_for_completion).
    ///
    /// # Errors
    ///
    /// - `JobNotFound` if the job is unknown
    /// - `InvalidStateTransition` if the job already finished
    #[instrument(skip(self), fields(job_id = %job_id))]
    pub async fn cancel_sync(&self, job_id: SyncJobId) -> Result<()> {
        let active_sync = {
            let active_syncs = self.active_syncs.lock().await;
            active_syncs
                .values()
                .find(|sync| sync.job_id == job_id)
                .cloned()
        };

        if let Some(sync) = active_sync {
            sync.cancellation_token.cancel();
            info!("Cancellation requested for sync job {}", job_id);
            return Ok(());
        }

        let job = self.get_status(job_id).await?;
        Err(SyncError::InvalidStateTransition {
            from: job.status.as_str().to_string(),
            to: SyncStatus::Cancelled.as_str().to_string(),
            reason: "Job already finished".to_string(),
        })
    }

    /// Latest snapshot of a job.
    pub async fn get_status(&self, job_id: SyncJobId) -> Result<SyncJob> {
        let sender = self.sender(job_id).await?;
        let job = sender.borrow().clone();
        Ok(job)
    }

    /// Receiver of a job's snapshots, updated on every state or progress change.
    pub async fn subscribe(&self, job_id: SyncJobId) -> Result<watch::Receiver<SyncJob>> {
        Ok(self.sender(job_id).await?.subscribe())
    }

    /// Wait until the job reaches a terminal state and return it.
    pub async fn wait_for_completion(&self, job_id: SyncJobId) -> Result<SyncJob> {
        let mut receiver = self.subscribe(job_id).await?;
        let job = receiver
            .wait_for(|job| job.status.is_terminal())
            .await
            .map_err(|_| SyncError::JobNotFound {
                job_id: job_id.to_string(),
            })?
            .clone();
        debug!(job_id = %job_id, status = %job.status, "Job finished");
        Ok(job)
    }

    pub async fn is_sync_active(&self, remote_id: RemoteConfigId) -> bool {
        let active_syncs = self.active_syncs.lock().await;
        active_syncs.contains_key(&remote_id)
    }

    /// Jobs run against a remote, most recent first.
    pub async fn list_jobs(&self, remote_id: RemoteConfigId) -> Vec<SyncJob> {
        let jobs = self.jobs.read().await;
        let mut matching: Vec<SyncJob> = jobs
            .values()
            .map(|sender| sender.borrow().clone())
            .filter(|job| job.remote_id == remote_id)
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matching
    }

    async fn sender(&self, job_id: SyncJobId) -> Result<JobSender> {
        self.jobs
            .read()
            .await
            .get(&job_id)
            .cloned()
            .ok_or_else(|| SyncError::JobNotFound {
                job_id: job_id.to_string(),
            })
    }
}

/// Apply a consuming state transition to the published snapshot.
fn transition<F>(sender: &watch::Sender<SyncJob>, apply: F) -> Result<SyncJob>
where
    F: FnOnce(SyncJob) -> Result<SyncJob>,
{
    let current = sender.borrow().clone();
    let next = apply(current)?;
    sender.send_replace(next.clone());
    Ok(next)
}
