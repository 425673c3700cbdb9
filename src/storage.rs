// src/storage.rs
//
// Copyright, 2025.  Signal65 / Futurum Group.
//
//! Storage capability set consumed by the transfer layer.
//!
//! A `StorageBackend` is bound to exactly one region; a `BackendProvider`
//! hands out the backend for a resolved endpoint. Errors are plain
//! `anyhow::Error`; classification happens in `multipart` and `transfer`.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

use crate::region::EndpointConfig;

/// One UploadPart request. `body` holds exactly `length` bytes starting at
/// `offset` of the source payload.
#[derive(Debug, Clone)]
pub struct UploadPartRequest {
    pub bucket: String,
    pub key: String,
    pub upload_id: String,
    pub part_number: i32,
    pub offset: u64,
    pub length: u64,
    pub is_last: bool,
    pub body: Bytes,
}

/// A part acknowledged by the backend, as listed in CompleteMultipartUpload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedPartRef {
    pub part_number: i32,
    pub e_tag: String,
}

#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Start a multipart upload; returns the upload id.
    async fn initiate_multipart(&self, bucket: &str, key: &str) -> Result<String>;

    /// Upload one part; returns its ETag.
    async fn upload_part(&self, req: UploadPartRequest) -> Result<String>;

    /// Assemble the object from `parts`, which must be in ascending part order.
    /// Returns the ETag of the assembled object when the backend reports one.
    async fn complete_multipart(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPartRef],
    ) -> Result<Option<String>>;

    async fn abort_multipart(&self, bucket: &str, key: &str, upload_id: &str) -> Result<()>;

    async fn put_object(&self, bucket: &str, key: &str, data: Bytes) -> Result<()>;

    /// Whole object body, or `None` if the key does not exist.
    /// Never returns a partially read body.
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Option<Bytes>>;

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()>;

    async fn bucket_exists(&self, bucket: &str) -> Result<bool>;

    async fn create_bucket(&self, bucket: &str, region: &str) -> Result<()>;

    async fn delete_bucket(&self, bucket: &str) -> Result<()>;
}

/// Hands out the backend bound to a resolved endpoint.
#[async_trait]
pub trait BackendProvider: Send + Sync {
    async fn backend_for(&self, endpoint: &EndpointConfig) -> Result<Arc<dyn StorageBackend>>;
}
