use thiserror::Error;

/// Errors that can occur during blob storage operations.
#[derive(Debug, Error)]
pub enum BlobError {
    /// The referenced blob does not exist.
    #[error("blob not found: {0}")]
    NotFound(String),

    /// The reference string was issued by a different backend or is corrupt.
    #[error("unintelligible blob ref: {0}")]
    InvalidRef(String),

    /// Committing blob bytes failed. Callers surface this so the client can
    /// retry the write.
    #[error("blob write failed: {0}")]
    Write(String),

    /// Reading blob bytes failed mid-stream.
    #[error("blob read failed: {0}")]
    Read(String),

    /// Deleting a blob failed. Non-fatal to callers: logged and swallowed
    /// by lifecycle code, never a reason to keep a dead record alive.
    #[error("blob delete failed: {0}")]
    Delete(String),
}
