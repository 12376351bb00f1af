pub mod error;
pub mod memory;
pub mod realtime;
pub mod storage;
pub mod store;
pub mod subscription;

pub use error::{BlobError, StoreError};
pub use memory::MemoryStore;
pub use realtime::RealtimeDbClient;
pub use storage::{BlobRef, BlobStore, MemoryBlobStore, StorageClient};
pub use store::{generate_push_key, join_path, HierarchicalStore};
pub use subscription::Subscription;
