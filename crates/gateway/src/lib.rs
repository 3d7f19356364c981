//! The lockbox ephemeral container store.
//!
//! A container is a named, secret-gated bundle of files with no user
//! accounts behind it: one visitor secret (optionally split from an admin
//! secret), an optional view limit that destroys the container on its last
//! unlock, and files uploaded as out-of-order chunk sequences that are
//! reassembled into blobs.
//!
//! The [`Gateway`] orchestrates everything over pluggable backends: a
//! [`ContainerRegistry`](lockbox_registry::ContainerRegistry) for records,
//! a [`ContainerLock`](lockbox_registry::ContainerLock) for per-container
//! serialization, and a [`BlobStore`](lockbox_blob::BlobStore) for bytes.

pub mod background;
pub mod builder;
pub mod config;
pub mod error;
pub mod gateway;
pub mod metrics;
pub mod notify;
pub mod session;

pub use background::{Reaper, ReaperConfig, ReaperHandle};
pub use builder::GatewayBuilder;
pub use config::{ExpiryPolicy, GatewayConfig};
pub use error::GatewayError;
pub use gateway::{ChunkOutcome, CreateContainer, Gateway, Verified};
pub use metrics::{GatewayMetrics, MetricsSnapshot};
pub use notify::{FileAddedEvent, FileEventNotifier, NotifyError};
pub use session::{ChunkMeta, ChunkSession, SessionMap};
