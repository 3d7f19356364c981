use thiserror::Error;

use lockbox_registry::RegistryError;

/// Errors surfaced by gateway operations.
///
/// Storage *delete* failures never appear here under the default expiry
/// policy: they are logged and swallowed so metadata operations always
/// complete. Only the strict [`ExpiryPolicy::RequireBlobDeletes`] surfaces
/// them.
///
/// [`ExpiryPolicy::RequireBlobDeletes`]: crate::config::ExpiryPolicy::RequireBlobDeletes
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No such container (or it has already self-destructed), or no such
    /// file within a container.
    #[error("not found: {0}")]
    NotFound(String),

    /// The supplied secret matches neither configured hash.
    #[error("secret does not match any configured hash")]
    InvalidSecret,

    /// A read-only role attempted a write.
    #[error("role lacks write access: {0}")]
    Forbidden(String),

    /// A live container already claims this name (case-insensitive).
    #[error("container name already taken: {0}")]
    NameConflict(String),

    /// A chunk declared a different `total_chunks` than the session it
    /// belongs to.
    #[error(
        "upload session {upload_id} declares {expected} chunks, request declared {declared}"
    )]
    SessionMismatch {
        upload_id: String,
        expected: u32,
        declared: u32,
    },

    /// Chunk index or count outside the accepted range.
    #[error("invalid chunk: {0}")]
    InvalidChunk(String),

    /// Creation-time validation failure (empty name, mode/secret mismatch).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Committing blob bytes failed. The upload session survives so the
    /// client can retry the chunk.
    #[error("blob write failed: {0}")]
    StorageWrite(String),

    /// Blob deletion failed under the strict expiry policy.
    #[error("blob delete failed: {0}")]
    StorageDelete(String),

    /// Opening a committed blob for download failed.
    #[error("blob read failed: {0}")]
    StorageRead(String),

    /// Secret hashing or verification failed internally.
    #[error("secret handling failed: {0}")]
    Secret(String),

    /// Registry backend failure.
    #[error("registry error: {0}")]
    Registry(RegistryError),

    /// Gateway construction failure (missing required collaborator).
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl From<RegistryError> for GatewayError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NameConflict(name) => Self::NameConflict(name),
            RegistryError::NotFound(id) => Self::NotFound(id),
            other => Self::Registry(other),
        }
    }
}

impl From<lockbox_core::SecretError> for GatewayError {
    fn from(err: lockbox_core::SecretError) -> Self {
        Self::Secret(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_conflicts_map_to_gateway_variants() {
        let err: GatewayError = RegistryError::NameConflict("Trip".into()).into();
        assert!(matches!(err, GatewayError::NameConflict(_)));

        let err: GatewayError = RegistryError::NotFound("abc".into()).into();
        assert!(matches!(err, GatewayError::NotFound(_)));

        let err: GatewayError = RegistryError::Backend("down".into()).into();
        assert!(matches!(err, GatewayError::Registry(_)));
    }
}
