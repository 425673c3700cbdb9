// src/error.rs
//
// Error taxonomy for region-aware transfers.
//
// Backend calls speak `anyhow::Result`; everything that crosses the
// transfer boundary is classified into `TransferError` so callers never see
// a raw SDK error or a half-finished multipart upload.

use thiserror::Error;

use crate::multipart::UploadState;

/// What happened to the best-effort abort issued after a multipart failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortOutcome {
    /// AbortMultipartUpload succeeded; server-side parts are released.
    Aborted,
    /// AbortMultipartUpload itself failed. The upload may linger on the server.
    Failed(String),
}

impl std::fmt::Display for AbortOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AbortOutcome::Aborted => write!(f, "upload aborted"),
            AbortOutcome::Failed(reason) => write!(f, "abort also failed: {reason}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("no endpoint is mapped for region '{0}'")]
    UnresolvableRegion(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("CreateMultipartUpload failed for {bucket}/{key}: {reason}")]
    InitiateFailed {
        bucket: String,
        key: String,
        reason: String,
    },

    #[error("UploadPart {part_number} failed for {bucket}/{key}: {reason} ({abort})")]
    PartUploadFailed {
        bucket: String,
        key: String,
        part_number: i32,
        reason: String,
        abort: AbortOutcome,
    },

    #[error("CompleteMultipartUpload failed for {bucket}/{key}: {reason} ({abort})")]
    CompleteFailed {
        bucket: String,
        key: String,
        reason: String,
        abort: AbortOutcome,
    },

    /// Only produced by an explicit abort request; after a part or complete
    /// failure the abort result rides along inside that error instead.
    #[error("AbortMultipartUpload failed for {bucket}/{key}: {reason}")]
    AbortFailed {
        bucket: String,
        key: String,
        reason: String,
    },

    /// A step was requested that the transaction's current state does not allow,
    /// e.g. uploading a part after the upload was completed or aborted.
    #[error("multipart upload {upload_id}: cannot go from {from:?} to {to:?}")]
    InvalidTransition {
        upload_id: String,
        from: UploadState,
        to: UploadState,
    },

    #[error("{op} failed for {bucket}/{key}: {reason}")]
    SingleShotFailed {
        op: &'static str,
        bucket: String,
        key: String,
        reason: String,
    },

    #[error("object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },
}

/// Flat classification of a `TransferError`, carried by `TransferResult`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnresolvableRegion,
    InvalidConfig,
    InitiateFailed,
    PartUploadFailed,
    CompleteFailed,
    AbortFailed,
    InvalidTransition,
    SingleShotFailed,
    NotFound,
}

impl TransferError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransferError::UnresolvableRegion(_) => ErrorKind::UnresolvableRegion,
            TransferError::InvalidConfig(_) => ErrorKind::InvalidConfig,
            TransferError::InitiateFailed { .. } => ErrorKind::InitiateFailed,
            TransferError::PartUploadFailed { .. } => ErrorKind::PartUploadFailed,
            TransferError::CompleteFailed { .. } => ErrorKind::CompleteFailed,
            TransferError::AbortFailed { .. } => ErrorKind::AbortFailed,
            TransferError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            TransferError::SingleShotFailed { .. } => ErrorKind::SingleShotFailed,
            TransferError::NotFound { .. } => ErrorKind::NotFound,
        }
    }

    /// Abort result attached to a failed multipart sequence, if any.
    pub fn abort_outcome(&self) -> Option<&AbortOutcome> {
        match self {
            TransferError::PartUploadFailed { abort, .. }
            | TransferError::CompleteFailed { abort, .. } => Some(abort),
            _ => None,
        }
    }
}

/// Render an anyhow error with its full context chain on one line.
pub(crate) fn chain_to_string(err: &anyhow::Error) -> String {
    format!("{err:#}")
}
