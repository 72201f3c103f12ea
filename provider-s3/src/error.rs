//! Error types for the S3 provider

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// S3 provider errors
#[derive(Error, Debug)]
pub enum S3Error {
    /// Remote configuration is unusable
    #[error("Invalid remote configuration: {0}")]
    InvalidConfig(String),

    /// ListObjectsV2 failed
    #[error("Failed to list objects in bucket '{bucket}': {message}")]
    ListFailed { bucket: String, message: String },

    /// PutObject failed
    #[error("Failed to upload '{key}': {message}")]
    PutFailed { key: String, message: String },

    /// Reading the local stream failed before the request was sent
    #[error("Failed to read content for '{key}': {source}")]
    StreamRead {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// The stream yielded a different number of bytes than declared
    #[error("Size mismatch for '{key}': expected {expected} bytes, read {actual}")]
    SizeMismatch {
        key: String,
        expected: u64,
        actual: u64,
    },

    /// The stream had data left after the declared size
    #[error("Size mismatch for '{key}': stream is longer than the declared {expected} bytes")]
    StreamOverrun { key: String, expected: u64 },
}

/// Result type for S3 operations
pub type Result<T> = std::result::Result<T, S3Error>;

impl From<S3Error> for BridgeError {
    fn from(error: S3Error) -> Self {
        match error {
            S3Error::StreamRead { source, .. } => BridgeError::Io(source),
            other => BridgeError::OperationFailed(other.to_string()),
        }
    }
}
