use thiserror::Error;

/// Errors from container registry and per-container lock operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("container name already taken: {0}")]
    NameConflict(String),

    #[error("container not found: {0}")]
    NotFound(String),

    #[error("lock expired: {0}")]
    LockExpired(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),
}
