pub mod error;
pub mod memory;
pub mod store;
pub mod types;

pub use error::BlobError;
pub use memory::MemoryBlobStore;
pub use store::{BlobStore, ByteStream, read_to_bytes};
pub use types::{BlobHint, BlobRef, ResourceClass};
