// src/constants.rs
//
// Centralized constants for s3speed to avoid hardcoded values throughout the codebase

/// Multipart part size used when none is configured (5 MiB)
pub const DEFAULT_PART_SIZE: usize = 5 * 1024 * 1024;

/// Minimum S3 multipart upload part size (5 MiB - AWS requirement for all but the last part)
pub const MIN_S3_MULTIPART_PART_SIZE: usize = 5 * 1024 * 1024;

/// Maximum number of parts in a multipart upload
pub const MAX_MULTIPART_PARTS: usize = 10000;

/// Region used when the caller supplies the legacy "US Standard" identifier
pub const DEFAULT_REGION: &str = "us-east-1";

/// Connection establishment timeout (seconds)
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Whole-operation timeout (seconds). Generous so large parts are not cut off,
/// but finite so a stalled connection cannot hang a benchmark forever.
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 600;

/// Attempts per storage call, including the first one (SDK standard backoff between them)
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default object size for the benchmark driver (20 MiB)
pub const DEFAULT_OBJECT_SIZE: usize = 20 * 1024 * 1024;

/// Environment variable names
pub const ENV_PART_SIZE: &str = "S3SPEED_PART_SIZE";
pub const ENV_CONNECT_TIMEOUT_SECS: &str = "S3SPEED_CONNECT_TIMEOUT_SECS";
pub const ENV_OPERATION_TIMEOUT_SECS: &str = "S3SPEED_OPERATION_TIMEOUT_SECS";
pub const ENV_MAX_ATTEMPTS: &str = "S3SPEED_MAX_ATTEMPTS";
pub const ENV_ENDPOINT_URL: &str = "AWS_ENDPOINT_URL";
pub const ENV_BUCKET_PREFIX: &str = "S3SPEED_BUCKET_PREFIX";
pub const ENV_BUCKET_SUFFIX: &str = "S3SPEED_BUCKET_SUFFIX";
pub const ENV_OPLOG_BUF: &str = "S3SPEED_OPLOG_BUF";
pub const ENV_OPLOG_LEVEL: &str = "S3SPEED_OPLOG_LEVEL";
