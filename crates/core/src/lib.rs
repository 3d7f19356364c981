pub mod container;
pub mod secret;
pub mod types;

pub use container::{AccessMode, Container, ContainerSummary, FileEntry, Role};
pub use secret::{SecretError, hash_secret, match_secret, verify_secret};
pub use types::{ContainerId, FileId, UploadId};
