//! Shared plumbing for the Quadflow workspace: the storage trait seam, the
//! collaborator traits for federation and HTTP, cancellation, hashing and
//! buffer pooling.

mod cancel;
mod error;
mod hash;
mod http;
mod pool;
mod service;
mod store;

pub use cancel::CancellationToken;
pub use error::{CorruptionError, StorageError};
pub use hash::{fnv1a_32, fnv1a_64};
pub use http::{HttpFetcher, HttpResponse};
pub use pool::{BufferPool, PooledBuffer};
pub use service::{ServiceExecutor, ServiceRow};
pub use store::{QuadBatch, QuadSnapshot, QuadStore};
