// src/lib.rs
//
// Copyright, 2025.  Signal65 / Futurum Group.
//
// Crate root — public re-exports.

pub mod constants;
pub mod config;
pub mod error;
pub mod region;
pub mod policy;
pub mod storage;
pub mod s3_client;
pub mod multipart;
pub mod transfer;
pub mod s3_logger;
pub mod data_gen;
pub mod bench;

// ===== Re-exports used by src/bin/cli.rs and the tests =====
pub use crate::config::{BucketNaming, ClientConfig};
pub use crate::error::{AbortOutcome, ErrorKind, TransferError};
pub use crate::region::{EndpointConfig, RegionContext, KNOWN_REGIONS};
pub use crate::policy::{choose, PartLayout, PartSpec, TransferPlan};
pub use crate::storage::{BackendProvider, CompletedPartRef, StorageBackend, UploadPartRequest};
pub use crate::s3_client::{S3Backend, S3BackendProvider};
pub use crate::multipart::{
    MultipartCompleteInfo, MultipartTransaction, MultipartUploader, PartRecord, UploadState,
};
pub use crate::transfer::{TransferFacade, TransferRequest, TransferResult};
pub use crate::s3_logger::{LogEntry, OpLogger};
