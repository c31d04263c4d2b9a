use super::ObjectStorage;
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use aws_sdk_s3::{primitives::ByteStream, Client as S3Client};
use bytes::Bytes;
use std::sync::Arc;

/// S3 implementation of the object-storage primitives
pub struct S3ObjectStorage {
    s3_client: Arc<S3Client>,
    bucket: String,
    region: String,
}

impl S3ObjectStorage {
    pub fn new(s3_client: Arc<S3Client>, bucket: String, region: String) -> Self {
        Self {
            s3_client,
            bucket,
            region,
        }
    }

    fn url_for(&self, path: &str) -> String {
        format!(
            "https://{}.s3.{}.amazonaws.com/{}",
            self.bucket, self.region, path
        )
    }
}

#[async_trait]
impl ObjectStorage for S3ObjectStorage {
    async fn put_object(
        &self,
        path: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> AppResult<String> {
        let size = bytes.len();

        self.s3_client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = ?e,
                    bucket = %self.bucket,
                    path = path,
                    "S3 put_object failed"
                );
                AppError::ExternalService(format!("object upload failed: {}", e))
            })?;

        let url = self.url_for(path);
        tracing::info!(
            bucket = %self.bucket,
            path = path,
            size_bytes = size,
            content_type = content_type,
            "Object uploaded"
        );

        Ok(url)
    }

    async fn delete_object(&self, path: &str) -> AppResult<()> {
        self.s3_client
            .delete_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = ?e,
                    bucket = %self.bucket,
                    path = path,
                    "S3 delete_object failed"
                );
                AppError::ExternalService(format!("object delete failed: {}", e))
            })?;

        tracing::info!(bucket = %self.bucket, path = path, "Object deleted");
        Ok(())
    }
}
