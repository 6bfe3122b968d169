//! Input channel trait
//!
//! Defines the lifecycle shared by input sources (trackpad today, keyboard hooks later)
//! and the error type they report.

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while acquiring or driving an input source
#[derive(Error, Debug)]
pub enum GestureError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Platform error: {0}")]
    PlatformError(String),

    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Result type for gesture engine operations
pub type GestureResult<T> = Result<T, GestureError>;

/// Trait for input channels
///
/// `start` and `stop` must both be safe to call any number of times.
#[async_trait]
pub trait InputChannel: Send + Sync {
    /// Get the channel identifier (e.g., "trackpad")
    fn id(&self) -> &str;

    /// Acquire the underlying source and begin delivering events
    async fn start(&mut self) -> GestureResult<()>;

    /// Release the source; in-flight events are allowed to finish
    async fn stop(&mut self) -> GestureResult<()>;

    /// Check if the channel is currently running
    fn is_running(&self) -> bool;
}
