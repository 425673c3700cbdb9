// src/s3_client.rs
//
// Copyright, 2025.  Signal65 / Futurum Group.
//
//! AWS S3 implementation of the storage capability set.
//!
//! One `aws_sdk_s3::Client` per region. Clients are built lazily the first
//! time a region is used and cached by `S3BackendProvider`; the region is
//! baked into each client's config, so concurrent transfers to different
//! regions never race on a shared endpoint setting.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::BehaviorVersion;
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    BucketLocationConstraint, CompletedMultipartUpload, CompletedPart, CreateBucketConfiguration,
};
use aws_sdk_s3::{config::Region, Client};
use bytes::Bytes;
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::ClientConfig;
use crate::constants::DEFAULT_REGION;
use crate::region::EndpointConfig;
use crate::storage::{BackendProvider, CompletedPartRef, StorageBackend, UploadPartRequest};

// -----------------------------------------------------------------------------
// Client factory
// -----------------------------------------------------------------------------

/// Build an S3 client pinned to `endpoint.region`, with finite timeouts and
/// the SDK's standard retry/backoff.
pub async fn build_regional_client(endpoint: &EndpointConfig, cfg: &ClientConfig) -> Client {
    let timeout_config = TimeoutConfig::builder()
        .connect_timeout(cfg.connect_timeout)
        .operation_timeout(cfg.operation_timeout)
        .build();
    let retry_config = RetryConfig::standard().with_max_attempts(cfg.max_attempts);

    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(endpoint.region.clone()))
        .timeout_config(timeout_config)
        .retry_config(retry_config);
    if let Some(url) = &endpoint.endpoint_url {
        loader = loader.endpoint_url(url);
    }
    let sdk_config = loader.load().await;

    let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
        .force_path_style(endpoint.force_path_style)
        .build();

    debug!(
        "Built S3 client for region {} (endpoint {:?}, path-style {})",
        endpoint.region, endpoint.endpoint_url, endpoint.force_path_style
    );
    Client::from_conf(s3_config)
}

// -----------------------------------------------------------------------------
// Regional backend
// -----------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct S3Backend {
    client: Client,
    region: String,
}

impl S3Backend {
    pub fn new(client: Client, region: impl Into<String>) -> Self {
        Self {
            client,
            region: region.into(),
        }
    }
}

#[async_trait]
impl StorageBackend for S3Backend {
    async fn initiate_multipart(&self, bucket: &str, key: &str) -> Result<String> {
        debug!("CreateMultipartUpload {}/{} in {}", bucket, key, self.region);
        let resp = self
            .client
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .context("CreateMultipartUpload failed")?;
        let upload_id = resp.upload_id().unwrap_or_default().to_string();
        if upload_id.is_empty() {
            bail!("CreateMultipartUpload returned empty upload_id");
        }
        Ok(upload_id)
    }

    async fn upload_part(&self, req: UploadPartRequest) -> Result<String> {
        debug!(
            "UploadPart {} of {}/{} (offset {}, {} bytes, last={})",
            req.part_number, req.bucket, req.key, req.offset, req.length, req.is_last
        );
        let resp = self
            .client
            .upload_part()
            .bucket(&req.bucket)
            .key(&req.key)
            .upload_id(&req.upload_id)
            .part_number(req.part_number)
            .content_length(req.length as i64)
            .body(ByteStream::from(req.body))
            .send()
            .await
            .with_context(|| format!("UploadPart {} failed", req.part_number))?;
        let etag = resp.e_tag().unwrap_or_default().to_string();
        if etag.is_empty() {
            bail!("UploadPart {} returned empty ETag", req.part_number);
        }
        Ok(etag)
    }

    async fn complete_multipart(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPartRef],
    ) -> Result<Option<String>> {
        let completed_parts: Vec<CompletedPart> = parts
            .iter()
            .map(|p| {
                CompletedPart::builder()
                    .e_tag(&p.e_tag)
                    .part_number(p.part_number)
                    .build()
            })
            .collect();
        let cmu = CompletedMultipartUpload::builder()
            .set_parts(Some(completed_parts))
            .build();

        debug!("CompleteMultipartUpload {}/{} with {} parts", bucket, key, parts.len());
        let resp = self
            .client
            .complete_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(cmu)
            .send()
            .await
            .context("CompleteMultipartUpload failed")?;
        Ok(resp.e_tag().map(str::to_string))
    }

    async fn abort_multipart(&self, bucket: &str, key: &str, upload_id: &str) -> Result<()> {
        debug!("AbortMultipartUpload {}/{} ({})", bucket, key, upload_id);
        self.client
            .abort_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
            .context("AbortMultipartUpload failed")?;
        Ok(())
    }

    async fn put_object(&self, bucket: &str, key: &str, data: Bytes) -> Result<()> {
        debug!("PUT object to S3 bucket: {} ({} bytes)", bucket, data.len());
        let len = data.len() as i64;
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_length(len)
            .body(ByteStream::from(data))
            .send()
            .await
            .context("PutObject failed")?;
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Option<Bytes>> {
        debug!("GET object from S3 bucket: {}", bucket);
        let output = match self.client.get_object().bucket(bucket).key(key).send().await {
            Ok(output) => output,
            Err(e) => {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    return Ok(None);
                }
                return Err(e).context("GetObject failed");
            }
        };
        // collect() either yields the whole body or an error; nothing partial escapes
        let body = output
            .body
            .collect()
            .await
            .context("reading GetObject body failed")?
            .into_bytes();
        Ok(Some(body))
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        debug!("DELETE object from S3 bucket: {}", bucket);
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .context("DeleteObject failed")?;
        Ok(())
    }

    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                if e.as_service_error().is_some_and(|se| se.is_not_found()) {
                    Ok(false)
                } else {
                    Err(e).context("HeadBucket failed")
                }
            }
        }
    }

    async fn create_bucket(&self, bucket: &str, region: &str) -> Result<()> {
        let mut req = self.client.create_bucket().bucket(bucket);
        // us-east-1 rejects an explicit location constraint
        if region != DEFAULT_REGION {
            let cfg = CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(region))
                .build();
            req = req.create_bucket_configuration(cfg);
        }
        match req.send().await {
            Ok(_) => {
                debug!("Created bucket {} in region {}", bucket, region);
                Ok(())
            }
            Err(e) if e.code() == Some("BucketAlreadyOwnedByYou") => {
                debug!("Bucket {} in region {} already exists", bucket, region);
                Ok(())
            }
            Err(e) => Err(e).context("CreateBucket failed"),
        }
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        debug!("Deleting bucket {}", bucket);
        self.client
            .delete_bucket()
            .bucket(bucket)
            .send()
            .await
            .context("DeleteBucket failed")?;
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Provider: one cached client per region
// -----------------------------------------------------------------------------

#[derive(Debug)]
pub struct S3BackendProvider {
    cfg: ClientConfig,
    clients: Mutex<HashMap<EndpointConfig, Arc<S3Backend>>>,
}

impl S3BackendProvider {
    pub fn new(cfg: ClientConfig) -> Self {
        Self {
            cfg,
            clients: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl BackendProvider for S3BackendProvider {
    async fn backend_for(&self, endpoint: &EndpointConfig) -> Result<Arc<dyn StorageBackend>> {
        let cached = self.clients.lock().await.get(endpoint).cloned();
        if let Some(backend) = cached {
            return Ok(backend);
        }
        // Built without holding the lock; the first insert for an endpoint wins.
        let client = build_regional_client(endpoint, &self.cfg).await;
        let backend = self
            .clients
            .lock()
            .await
            .entry(endpoint.clone())
            .or_insert_with(|| Arc::new(S3Backend::new(client, endpoint.region.clone())))
            .clone();
        Ok(backend)
    }
}
