use thiserror::Error;

/// Errors that can occur during simulator setup and stepping.
#[derive(Debug, Error)]
pub enum RldError {
    #[error("GPU adapter not found: {0}")]
    AdapterNotFound(String),

    #[error("failed to request GPU device: {0}")]
    DeviceRequestFailed(String),

    #[error("device limits insufficient: {0}")]
    LimitsTooSmall(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("buffer readback failed: {0}")]
    ReadbackFailed(String),

    #[error("step() called before set()")]
    NotConfigured,
}
