pub mod s3_object_storage;

pub use s3_object_storage::S3ObjectStorage;

use crate::error::AppResult;
use async_trait::async_trait;
use bytes::Bytes;

/// Object-storage primitives the narration store is built on.
///
/// Blobs are never mutated in place: a new narration always lands at a new
/// path, and the old blob is deleted explicitly rather than overwritten.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Upload `bytes` under `path`, labeling the object with `content_type`,
    /// and return a durable fetchable URL for it.
    async fn put_object(&self, path: &str, bytes: Bytes, content_type: &str)
        -> AppResult<String>;

    /// Delete the object at `path`. Deleting a missing object is not an
    /// error.
    async fn delete_object(&self, path: &str) -> AppResult<()>;
}
