use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Failed to list remote objects: {0}")]
    Listing(String),

    #[error("Failed to enumerate local media: {0}")]
    Enumeration(String),

    #[error("Failed to open '{name}': {message}")]
    Stream { name: String, message: String },

    #[error("Failed to upload '{name}': {message}")]
    Upload { name: String, message: String },

    #[error("Failed to connect to remote: {0}")]
    Connection(String),

    #[error("Remote {remote_id} not found")]
    RemoteNotFound { remote_id: String },

    #[error("Sync already in progress for remote {remote_id}")]
    SyncInProgress { remote_id: String },

    #[error("Sync constraints not met: {0}")]
    ConstraintsNotMet(String),

    #[error("Sync job {job_id} not found")]
    JobNotFound { job_id: String },

    #[error("Sync timeout after {0} seconds")]
    Timeout(u64),

    #[error("Sync cancelled")]
    Cancelled,

    #[error("Invalid job ID: {0}")]
    InvalidJobId(String),

    #[error("Invalid sync status: {0}")]
    InvalidStatus(String),

    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidStateTransition {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),
}

pub type Result<T> = std::result::Result<T, SyncError>;
