pub mod error;
pub mod lock;
pub mod store;
pub mod testing;

pub use error::RegistryError;
pub use lock::{ContainerLock, LockGuard};
pub use store::ContainerRegistry;
