//! Object storage for crawled data and charts
//!
//! The pipeline only needs put/get/list on a single bucket, so the layer is a
//! small [`ObjectStore`] trait with an S3 (MinIO) backend for deployments, a
//! local directory backend for development and an in-memory backend for tests.

pub mod backends;
pub mod bucket;
pub mod error;
pub mod factory;
pub mod lock;
pub mod traits;


pub use backends::{FileBackend, MemoryBackend};
pub use bucket::BucketResource;
pub use error::{StorageError, StorageResult};
pub use factory::StorageFactory;
pub use lock::{FileLock, LockInfo};
pub use traits::ObjectStore;
