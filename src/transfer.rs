// src/transfer.rs
//
// Copyright, 2025.  Signal65 / Futurum Group.
//
//! Put / get / delete entry points.
//!
//! Every call resolves its region first, fetches the backend bound to that
//! region, and fails closed: backend errors are logged and classified into
//! `TransferError`, and a multipart put always ends completed or aborted.

use std::sync::Arc;
use std::time::SystemTime;

use bytes::Bytes;
use tracing::{debug, error, info};

use crate::config::{BucketNaming, ClientConfig};
use crate::error::{ErrorKind, TransferError, chain_to_string};
use crate::multipart::MultipartUploader;
use crate::policy::{self, TransferPlan};
use crate::region::{EndpointConfig, RegionContext};
use crate::s3_client::S3BackendProvider;
use crate::s3_logger::{LogEntry, OpLogger};
use crate::storage::{BackendProvider, StorageBackend};

/// One put, as requested by the caller.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub region: String,
    pub bucket: String,
    pub key: String,
    pub payload: Bytes,
    pub multipart: bool,
}

impl TransferRequest {
    pub fn new(
        region: impl Into<String>,
        bucket: impl Into<String>,
        key: impl Into<String>,
        payload: impl Into<Bytes>,
        multipart: bool,
    ) -> Self {
        Self {
            region: region.into(),
            bucket: bucket.into(),
            key: key.into(),
            payload: payload.into(),
            multipart,
        }
    }

    pub fn content_length(&self) -> u64 {
        self.payload.len() as u64
    }
}

/// Outcome of a put; produced once and never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferResult {
    pub success: bool,
    pub error_kind: Option<ErrorKind>,
}

impl TransferResult {
    pub fn ok() -> Self {
        Self { success: true, error_kind: None }
    }

    pub fn failed(kind: ErrorKind) -> Self {
        Self { success: false, error_kind: Some(kind) }
    }
}

impl<T> From<&Result<T, TransferError>> for TransferResult {
    fn from(r: &Result<T, TransferError>) -> Self {
        match r {
            Ok(_) => TransferResult::ok(),
            Err(e) => TransferResult::failed(e.kind()),
        }
    }
}

pub struct TransferFacade {
    regions: RegionContext,
    provider: Arc<dyn BackendProvider>,
    naming: BucketNaming,
    part_size: usize,
    op_log: Option<OpLogger>,
}

impl TransferFacade {
    pub fn new(
        cfg: &ClientConfig,
        naming: BucketNaming,
        provider: Arc<dyn BackendProvider>,
    ) -> Result<Self, TransferError> {
        cfg.validate()?;
        Ok(Self {
            regions: RegionContext::new(cfg),
            provider,
            naming,
            part_size: cfg.part_size,
            op_log: None,
        })
    }

    /// Facade over real S3, one SDK client per region.
    pub fn s3(cfg: ClientConfig, naming: BucketNaming) -> Result<Self, TransferError> {
        let provider = Arc::new(S3BackendProvider::new(cfg.clone()));
        Self::new(&cfg, naming, provider)
    }

    pub fn with_regions(mut self, regions: RegionContext) -> Self {
        self.regions = regions;
        self
    }

    pub fn with_op_log(mut self, op_log: OpLogger) -> Self {
        self.op_log = Some(op_log);
        self
    }

    pub fn regions(&self) -> &RegionContext {
        &self.regions
    }

    pub fn part_size(&self) -> usize {
        self.part_size
    }

    /// Benchmark bucket name for `region` under the configured naming convention.
    pub fn bucket_for(&self, region: &str) -> Result<String, TransferError> {
        let endpoint = self.regions.resolve(region)?;
        Ok(self.naming.bucket_for(&endpoint.region))
    }

    async fn backend(
        &self,
        region: &str,
    ) -> Result<(EndpointConfig, Arc<dyn StorageBackend>), TransferError> {
        let endpoint = self.regions.resolve(region)?;
        let backend = self.provider.backend_for(&endpoint).await.map_err(|e| {
            TransferError::InvalidConfig(format!(
                "no client for region {}: {}",
                endpoint.region,
                chain_to_string(&e)
            ))
        })?;
        Ok((endpoint, backend))
    }

    /// `backend` for a logged object operation: a region or client failure is
    /// logged and recorded against the caller's region string before it is returned.
    async fn backend_for_op(
        &self,
        operation: &'static str,
        region: &str,
        bucket: &str,
        key: &str,
        start_time: SystemTime,
    ) -> Result<(EndpointConfig, Arc<dyn StorageBackend>), TransferError> {
        match self.backend(region).await {
            Ok(b) => Ok(b),
            Err(e) => {
                error!("Error on {} {}/{}: {}", operation, bucket, key, e);
                self.record(operation, region, bucket, key, 0, Some(&e), start_time);
                Err(e)
            }
        }
    }

    fn record(
        &self,
        operation: &'static str,
        region: &str,
        bucket: &str,
        key: &str,
        bytes: u64,
        error: Option<&TransferError>,
        start_time: SystemTime,
    ) {
        if let Some(log) = &self.op_log {
            log.log(LogEntry {
                operation,
                region: region.to_string(),
                bucket: bucket.to_string(),
                key: key.to_string(),
                bytes,
                error: error.map(|e| e.to_string()),
                start_time,
                end_time: SystemTime::now(),
            });
        }
    }

    /// Upload and report success or the classified failure.
    pub async fn put(&self, req: TransferRequest) -> TransferResult {
        TransferResult::from(&self.try_put(req).await)
    }

    /// Boolean form of `put`, for callers that only care whether it worked.
    pub async fn put_bytes(
        &self,
        region: &str,
        bucket: &str,
        key: &str,
        bytes: impl Into<Bytes>,
        multipart: bool,
    ) -> bool {
        self.put(TransferRequest::new(region, bucket, key, bytes, multipart))
            .await
            .success
    }

    /// Upload, returning the typed error on failure.
    pub async fn try_put(&self, req: TransferRequest) -> Result<(), TransferError> {
        let start = SystemTime::now();
        let op = if req.multipart { "MPU_PUT" } else { "PUT" };
        let (endpoint, backend) = self
            .backend_for_op(op, &req.region, &req.bucket, &req.key, start)
            .await?;
        let len = req.content_length();
        let plan = policy::choose(len, req.multipart, self.part_size);
        debug!("PUT {}/{} in {} ({} bytes) as {:?}", req.bucket, req.key, endpoint.region, len, plan);

        let result = match plan {
            TransferPlan::SingleShot => backend
                .put_object(&req.bucket, &req.key, req.payload)
                .await
                .map_err(|e| TransferError::SingleShotFailed {
                    op: "PutObject",
                    bucket: req.bucket.clone(),
                    key: req.key.clone(),
                    reason: chain_to_string(&e),
                }),
            TransferPlan::Multipart { part_size, .. } => {
                MultipartUploader::new(backend.as_ref(), part_size)
                    .upload(&req.bucket, &req.key, req.payload)
                    .await
                    .map(|_| ())
            }
        };

        if let Err(e) = &result {
            error!("Error putting object {}/{}: {}", req.bucket, req.key, e);
        }
        self.record(op, &endpoint.region, &req.bucket, &req.key, len, result.as_ref().err(), start);
        result
    }

    /// Whole object body. A missing key is `NotFound`; a failed or truncated
    /// read never yields bytes.
    pub async fn get(&self, region: &str, bucket: &str, key: &str) -> Result<Bytes, TransferError> {
        let start = SystemTime::now();
        let (endpoint, backend) = self.backend_for_op("GET", region, bucket, key, start).await?;
        debug!("GET {}/{} in {}", bucket, key, endpoint.region);

        let result = match backend.get_object(bucket, key).await {
            Ok(Some(body)) => Ok(body),
            Ok(None) => Err(TransferError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            Err(e) => Err(TransferError::SingleShotFailed {
                op: "GetObject",
                bucket: bucket.to_string(),
                key: key.to_string(),
                reason: chain_to_string(&e),
            }),
        };

        if let Err(e) = &result {
            error!("Error getting object: {}", e);
        }
        let bytes = result.as_ref().map(|b| b.len() as u64).unwrap_or(0);
        self.record("GET", &endpoint.region, bucket, key, bytes, result.as_ref().err(), start);
        result
    }

    pub async fn delete(&self, region: &str, bucket: &str, key: &str) -> Result<(), TransferError> {
        let start = SystemTime::now();
        let (endpoint, backend) = self.backend_for_op("DELETE", region, bucket, key, start).await?;
        debug!("DELETE {}/{} in {}", bucket, key, endpoint.region);

        let result = backend
            .delete_object(bucket, key)
            .await
            .map_err(|e| TransferError::SingleShotFailed {
                op: "DeleteObject",
                bucket: bucket.to_string(),
                key: key.to_string(),
                reason: chain_to_string(&e),
            });

        if let Err(e) = &result {
            error!("Error deleting object: {}", e);
        }
        self.record("DELETE", &endpoint.region, bucket, key, 0, result.as_ref().err(), start);
        result
    }

    /// Create `bucket` in `region` unless it already exists. Returns whether it was created.
    pub async fn ensure_bucket(&self, region: &str, bucket: &str) -> Result<bool, TransferError> {
        let (endpoint, backend) = self.backend(region).await?;
        let bucket_err = |op: &'static str, e: anyhow::Error| TransferError::SingleShotFailed {
            op,
            bucket: bucket.to_string(),
            key: String::new(),
            reason: chain_to_string(&e),
        };

        if backend.bucket_exists(bucket).await.map_err(|e| bucket_err("HeadBucket", e))? {
            debug!("Skipping: Bucket {} in region {} already exists.", bucket, endpoint.region);
            return Ok(false);
        }
        backend
            .create_bucket(bucket, &endpoint.region)
            .await
            .map_err(|e| bucket_err("CreateBucket", e))?;
        info!("Created bucket {} in region {}", bucket, endpoint.region);
        Ok(true)
    }

    pub async fn remove_bucket(&self, region: &str, bucket: &str) -> Result<(), TransferError> {
        let (endpoint, backend) = self.backend(region).await?;
        backend.delete_bucket(bucket).await.map_err(|e| TransferError::SingleShotFailed {
            op: "DeleteBucket",
            bucket: bucket.to_string(),
            key: String::new(),
            reason: chain_to_string(&e),
        })?;
        info!("Deleted bucket {} in region {}", bucket, endpoint.region);
        Ok(())
    }
}
