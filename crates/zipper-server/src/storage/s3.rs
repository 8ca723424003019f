use async_trait::async_trait;
use aws_credential_types::Credentials as AwsCredentials;
use aws_sdk_s3::{
    config::Region,
    error::DisplayErrorContext,
    primitives::ByteStream,
    types::{ObjectCannedAcl, StorageClass},
    Client,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use zipper_common::types::{Credentials, Destination, ObjectRef};

use super::{config::StorageConfig, ObjectMetadata, ObjectReader, ObjectStore, ObjectStoreFactory, StorageError};

/// Content type set on every uploaded archive.
const ARCHIVE_CONTENT_TYPE: &str = "application/zip";

/// S3 client bound to one set of job credentials.
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    region: String,
    endpoint: Option<String>,
}

impl S3Storage {
    pub fn new(config: &StorageConfig, credentials: &Credentials) -> Self {
        debug!(
            region = %credentials.region,
            access_key_id = %credentials.masked_access_key_id(),
            endpoint = ?config.endpoint,
            "Initializing job storage client"
        );

        let aws_credentials = AwsCredentials::new(
            &credentials.access_key_id,
            &credentials.secret_access_key,
            None,
            None,
            "zipper-job",
        );

        let mut builder = aws_sdk_s3::Config::builder()
            .credentials_provider(aws_credentials)
            .region(Region::new(credentials.region.clone()))
            .force_path_style(config.path_style);

        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        Self {
            client: Client::from_conf(builder.build()),
            region: credentials.region.clone(),
            endpoint: config.endpoint.clone(),
        }
    }

    /// Public location of an object, as reported to notification targets.
    pub fn location_for(&self, bucket: &str, key: &str) -> String {
        match &self.endpoint {
            Some(endpoint) => format!("{}/{}/{}", endpoint.trim_end_matches('/'), bucket, key),
            None => format!("https://{}.s3.{}.amazonaws.com/{}", bucket, self.region, key),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Storage {
    #[instrument(skip(self), fields(object = %object))]
    async fn head(&self, object: &ObjectRef) -> Result<ObjectMetadata, StorageError> {
        let response = self
            .client
            .head_object()
            .bucket(&object.container)
            .key(&object.key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_not_found()) {
                    StorageError::NotFound(object.to_string())
                } else {
                    StorageError::request(object.to_string(), DisplayErrorContext(&e).to_string())
                }
            })?;

        Ok(ObjectMetadata {
            size: response.content_length().unwrap_or(0).max(0) as u64,
        })
    }

    #[instrument(skip(self), fields(object = %object))]
    async fn open_read(&self, object: &ObjectRef) -> Result<ObjectReader, StorageError> {
        let response = self
            .client
            .get_object()
            .bucket(&object.container)
            .key(&object.key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    StorageError::NotFound(object.to_string())
                } else {
                    StorageError::request(object.to_string(), DisplayErrorContext(&e).to_string())
                }
            })?;

        Ok(Box::pin(response.body.into_async_read()))
    }

    #[instrument(skip(self, path), fields(destination = %destination.object))]
    async fn put_file(
        &self,
        destination: &Destination,
        path: &Path,
        size: u64,
    ) -> Result<String, StorageError> {
        let target = &destination.object;

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::request(target.to_string(), e.to_string()))?;

        debug!(
            bytes = size,
            acl = %destination.acl,
            storage_class = %destination.storage_class,
            "Uploading archive"
        );

        self.client
            .put_object()
            .bucket(&target.container)
            .key(&target.key)
            .acl(ObjectCannedAcl::from(destination.acl.as_str()))
            .storage_class(StorageClass::from(destination.storage_class.as_str()))
            .content_type(ARCHIVE_CONTENT_TYPE)
            .content_length(size as i64)
            .body(body)
            .send()
            .await
            .map_err(|e| StorageError::request(target.to_string(), DisplayErrorContext(&e).to_string()))?;

        let location = self.location_for(&target.container, &target.key);
        info!(location = %location, bytes = size, "Archive uploaded");

        Ok(location)
    }
}

/// Creates an [`S3Storage`] per job from the shared [`StorageConfig`].
#[derive(Debug, Clone, Default)]
pub struct S3StoreFactory {
    config: StorageConfig,
}

impl S3StoreFactory {
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }
}

impl ObjectStoreFactory for S3StoreFactory {
    fn connect(&self, credentials: &Credentials) -> Arc<dyn ObjectStore> {
        Arc::new(S3Storage::new(&self.config, credentials))
    }
}
