//! S3-compatible storage backend using AWS SDK.

use crate::error::{StorageError, StorageResult};
use crate::traits::{ObjectStore, PUBLIC_READ_ACL, PutOptions};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{ObjectCannedAcl, StorageClass};
use s3share_core::config::DEFAULT_REGION;
use std::path::Path;
use tracing::instrument;

fn map_s3_operation_error<E>(err: aws_sdk_s3::error::SdkError<E>) -> StorageError
where
    E: std::error::Error + Send + Sync + 'static,
{
    StorageError::S3(Box::new(err))
}

/// S3-compatible object store using AWS SDK.
pub struct S3Backend {
    client: Client,
    bucket: String,
    region: String,
}

impl std::fmt::Debug for S3Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Backend")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl S3Backend {
    /// Create a new S3 backend.
    ///
    /// Explicit credentials take precedence; otherwise the AWS default
    /// credential chain (environment, profile, instance role) is used.
    ///
    /// # Arguments
    /// * `force_path_style` - Use path-style URLs (`endpoint/bucket/key`) instead of
    ///   virtual-hosted style (`bucket.endpoint/key`). Required for MinIO and some
    ///   S3-compatible services.
    pub async fn new(
        bucket: &str,
        endpoint: Option<String>,
        region: Option<String>,
        access_key_id: Option<String>,
        secret_access_key: Option<String>,
        force_path_style: bool,
    ) -> StorageResult<Self> {
        let resolved_region = region.unwrap_or_else(|| DEFAULT_REGION.to_string());

        let mut s3_config_builder = match (access_key_id, secret_access_key) {
            (Some(key_id), Some(secret)) => {
                let credentials = aws_sdk_s3::config::Credentials::new(
                    key_id,
                    secret,
                    None, // session token
                    None, // expiration
                    "s3share-config",
                );
                aws_sdk_s3::config::Builder::new()
                    .behavior_version(BehaviorVersion::latest())
                    .region(Region::new(resolved_region.clone()))
                    .credentials_provider(credentials)
            }
            (None, None) => {
                let shared = aws_config::defaults(BehaviorVersion::latest())
                    .region(Region::new(resolved_region.clone()))
                    .load()
                    .await;
                aws_sdk_s3::config::Builder::from(&shared)
            }
            _ => {
                return Err(StorageError::Config(
                    "s3 config requires both access_key_id and secret_access_key when either is set"
                        .to_string(),
                ));
            }
        };

        if let Some(endpoint_url) = endpoint {
            // Handle bare host:port endpoints (e.g., "minio:9000") by prepending http://
            let endpoint_lower = endpoint_url.to_lowercase();
            let endpoint_url =
                if endpoint_lower.starts_with("http://") || endpoint_lower.starts_with("https://") {
                    endpoint_url
                } else {
                    format!("http://{endpoint_url}")
                };
            s3_config_builder = s3_config_builder.endpoint_url(endpoint_url);
        }

        if force_path_style {
            s3_config_builder = s3_config_builder.force_path_style(true);
        }

        Ok(Self {
            client: Client::from_conf(s3_config_builder.build()),
            bucket: bucket.to_string(),
            region: resolved_region,
        })
    }
}

#[async_trait]
impl ObjectStore for S3Backend {
    #[instrument(skip(self, source, options), fields(backend = "s3"))]
    async fn put_file(&self, key: &str, source: &Path, options: &PutOptions) -> StorageResult<u64> {
        let size = tokio::fs::metadata(source).await?.len();
        // Reads the file in chunks as the request goes out; retries reopen it.
        let body = ByteStream::from_path(source)
            .await
            .map_err(|e| StorageError::S3(Box::new(e)))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_length(size as i64)
            .content_type(&options.content_type)
            .acl(ObjectCannedAcl::from(PUBLIC_READ_ACL))
            .storage_class(StorageClass::from(options.storage_class.as_str()))
            .send()
            .await
            .map_err(map_s3_operation_error)?;
        tracing::debug!(bucket = %self.bucket, key, size, "object uploaded");
        Ok(size)
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) => {
                if let aws_sdk_s3::error::SdkError::ServiceError(ref service_err) = err
                    && service_err.raw().status().as_u16() == 404
                {
                    return Ok(false);
                }
                Err(map_s3_operation_error(err))
            }
        }
    }

    fn backend_name(&self) -> &'static str {
        "s3"
    }

    async fn health_check(&self) -> StorageResult<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(map_s3_operation_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn new_with_explicit_credentials() {
        let backend = S3Backend::new(
            "shared",
            Some("localhost:9000".to_string()),
            Some("eu-west-1".to_string()),
            Some("access".to_string()),
            Some("secret".to_string()),
            true,
        )
        .await
        .unwrap();
        assert_eq!(backend.backend_name(), "s3");
        let debug = format!("{backend:?}");
        assert!(debug.contains("shared"));
        assert!(debug.contains("eu-west-1"));
    }

    #[tokio::test]
    async fn new_rejects_partial_credentials() {
        let result = S3Backend::new(
            "shared",
            None,
            None,
            None,
            Some("secret".to_string()),
            false,
        )
        .await;
        assert!(matches!(result, Err(StorageError::Config(_))));
    }
}
