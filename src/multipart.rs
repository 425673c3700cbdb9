// src/multipart.rs
//
// Copyright, 2025.  Signal65 / Futurum Group.
//
// Sequential Multipart Upload (MPU) orchestration.
//
// Design:
// - MultipartTransaction is the state machine for one upload id:
//     Idle -> Initiated -> UploadingParts -> Completing -> Completed
//   with Aborted reachable from Initiated, UploadingParts and Completing.
//   Terminal states accept no further steps.
// - MultipartUploader drives a transaction against one regional backend:
//     initiate() issues CreateMultipartUpload
//     upload_parts() sends parts strictly in order, one at a time
//     complete() issues CompleteMultipartUpload with the ordered part list
//     abort() is the explicit, caller-requested abort
//   Any failure after initiate triggers exactly one best-effort abort, whose
//   outcome is attached to the returned error rather than discarded.

use std::time::SystemTime;

use bytes::Bytes;
use tracing::{debug, error, info, warn};

use crate::constants::MAX_MULTIPART_PARTS;
use crate::error::{AbortOutcome, TransferError, chain_to_string};
use crate::policy::{PartLayout, PartSpec, part_count};
use crate::storage::{CompletedPartRef, StorageBackend, UploadPartRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    Idle,
    Initiated,
    UploadingParts,
    Completing,
    Completed,
    Aborted,
}

impl UploadState {
    pub fn is_terminal(self) -> bool {
        matches!(self, UploadState::Completed | UploadState::Aborted)
    }

    fn can_advance_to(self, to: UploadState) -> bool {
        use UploadState::*;
        matches!(
            (self, to),
            (Idle, Initiated)
                | (Initiated, UploadingParts)
                | (UploadingParts, Completing)
                | (Completing, Completed)
                | (Initiated | UploadingParts | Completing, Aborted)
        )
    }
}

/// A part the backend acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartRecord {
    pub part_number: i32,
    pub offset: u64,
    pub length: u64,
    pub e_tag: String,
}

/// One multipart upload and everything acknowledged so far.
#[derive(Debug, Clone)]
pub struct MultipartTransaction {
    bucket: String,
    key: String,
    upload_id: Option<String>,
    state: UploadState,
    parts: Vec<PartRecord>,
}

impl MultipartTransaction {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            upload_id: None,
            state: UploadState::Idle,
            parts: Vec::new(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn upload_id(&self) -> Option<&str> {
        self.upload_id.as_deref()
    }

    pub fn state(&self) -> UploadState {
        self.state
    }

    /// Acknowledged parts, ascending by part number.
    pub fn parts(&self) -> &[PartRecord] {
        &self.parts
    }

    pub fn total_bytes(&self) -> u64 {
        self.parts.iter().map(|p| p.length).sum()
    }

    /// Manifest for CompleteMultipartUpload. Parts are only ever appended in
    /// order, so this is already sorted and gap-free.
    pub fn completed_parts(&self) -> Vec<CompletedPartRef> {
        self.parts
            .iter()
            .map(|p| CompletedPartRef {
                part_number: p.part_number,
                e_tag: p.e_tag.clone(),
            })
            .collect()
    }

    fn advance(&mut self, to: UploadState) -> Result<(), TransferError> {
        if !self.state.can_advance_to(to) {
            return Err(TransferError::InvalidTransition {
                upload_id: self.upload_id.clone().unwrap_or_default(),
                from: self.state,
                to,
            });
        }
        debug!("MPU {}/{}: {:?} -> {:?}", self.bucket, self.key, self.state, to);
        self.state = to;
        Ok(())
    }

    fn record_part(&mut self, part: &PartSpec, e_tag: String) {
        debug_assert_eq!(part.part_number as usize, self.parts.len() + 1);
        self.parts.push(PartRecord {
            part_number: part.part_number,
            offset: part.offset,
            length: part.length,
            e_tag,
        });
    }
}

/// Result info returned by a successful upload.
#[derive(Clone, Debug)]
pub struct MultipartCompleteInfo {
    pub upload_id: String,
    pub e_tag: Option<String>,
    pub total_bytes: u64,
    pub parts: usize,
    pub started_at: SystemTime,
    pub completed_at: SystemTime,
}

/// Drives multipart transactions against a single regional backend.
pub struct MultipartUploader<'a> {
    backend: &'a dyn StorageBackend,
    part_size: usize,
}

impl<'a> MultipartUploader<'a> {
    pub fn new(backend: &'a dyn StorageBackend, part_size: usize) -> Self {
        Self {
            backend,
            part_size: part_size.max(1),
        }
    }

    pub fn part_size(&self) -> usize {
        self.part_size
    }

    /// Upload `payload` as `bucket/key` through a full multipart sequence.
    ///
    /// On success the object is assembled; on any failure after initiate the
    /// upload has been aborted (or an abort was at least attempted and its
    /// outcome is part of the error).
    pub async fn upload(
        &self,
        bucket: &str,
        key: &str,
        payload: Bytes,
    ) -> Result<MultipartCompleteInfo, TransferError> {
        let needed = part_count(payload.len() as u64, self.part_size);
        if needed > MAX_MULTIPART_PARTS {
            return Err(TransferError::InvalidConfig(format!(
                "{} bytes at part size {} needs {} parts, more than the {} allowed",
                payload.len(),
                self.part_size,
                needed,
                MAX_MULTIPART_PARTS
            )));
        }

        let started_at = SystemTime::now();
        let mut txn = MultipartTransaction::new(bucket, key);
        self.initiate(&mut txn).await?;
        self.upload_parts(&mut txn, &payload).await?;
        let e_tag = self.complete(&mut txn).await?;

        let info = MultipartCompleteInfo {
            upload_id: txn.upload_id().unwrap_or_default().to_string(),
            e_tag,
            total_bytes: txn.total_bytes(),
            parts: txn.parts().len(),
            started_at,
            completed_at: SystemTime::now(),
        };
        info!(
            "Multipart upload of {}/{} complete: {} parts, {} bytes",
            bucket, key, info.parts, info.total_bytes
        );
        Ok(info)
    }

    /// Idle -> Initiated. Nothing exists server-side on failure, so nothing is aborted.
    pub async fn initiate(&self, txn: &mut MultipartTransaction) -> Result<(), TransferError> {
        if txn.state != UploadState::Idle {
            return Err(TransferError::InvalidTransition {
                upload_id: txn.upload_id.clone().unwrap_or_default(),
                from: txn.state,
                to: UploadState::Initiated,
            });
        }
        match self.backend.initiate_multipart(&txn.bucket, &txn.key).await {
            Ok(upload_id) => {
                debug!("Initiated MPU {} for {}/{}", upload_id, txn.bucket, txn.key);
                txn.upload_id = Some(upload_id);
                txn.advance(UploadState::Initiated)
            }
            Err(e) => {
                error!("Error initiating multipart upload of {}/{}: {:#}", txn.bucket, txn.key, e);
                Err(TransferError::InitiateFailed {
                    bucket: txn.bucket.clone(),
                    key: txn.key.clone(),
                    reason: chain_to_string(&e),
                })
            }
        }
    }

    /// Initiated -> UploadingParts. Sends every part of `payload` in order;
    /// the first failure stops the loop and aborts the upload.
    pub async fn upload_parts(
        &self,
        txn: &mut MultipartTransaction,
        payload: &Bytes,
    ) -> Result<(), TransferError> {
        txn.advance(UploadState::UploadingParts)?;
        let upload_id = txn.upload_id.clone().unwrap_or_default();

        for part in PartLayout::new(payload.len() as u64, self.part_size) {
            let start = part.offset as usize;
            let end = start + part.length as usize;
            let req = UploadPartRequest {
                bucket: txn.bucket.clone(),
                key: txn.key.clone(),
                upload_id: upload_id.clone(),
                part_number: part.part_number,
                offset: part.offset,
                length: part.length,
                is_last: part.is_last,
                body: payload.slice(start..end),
            };

            match self.backend.upload_part(req).await {
                Ok(e_tag) => txn.record_part(&part, e_tag),
                Err(e) => {
                    error!(
                        "Error uploading part {} of {}/{}: {:#}",
                        part.part_number, txn.bucket, txn.key, e
                    );
                    let abort = self.abort_after_failure(txn).await;
                    return Err(TransferError::PartUploadFailed {
                        bucket: txn.bucket.clone(),
                        key: txn.key.clone(),
                        part_number: part.part_number,
                        reason: chain_to_string(&e),
                        abort,
                    });
                }
            }
        }
        Ok(())
    }

    /// UploadingParts -> Completing -> Completed, or Aborted if the backend
    /// rejects the manifest.
    pub async fn complete(
        &self,
        txn: &mut MultipartTransaction,
    ) -> Result<Option<String>, TransferError> {
        txn.advance(UploadState::Completing)?;
        let upload_id = txn.upload_id.clone().unwrap_or_default();
        let manifest = txn.completed_parts();

        match self
            .backend
            .complete_multipart(&txn.bucket, &txn.key, &upload_id, &manifest)
            .await
        {
            Ok(e_tag) => {
                txn.advance(UploadState::Completed)?;
                Ok(e_tag)
            }
            Err(e) => {
                error!("Error completing multipart upload of {}/{}: {:#}", txn.bucket, txn.key, e);
                let abort = self.abort_after_failure(txn).await;
                Err(TransferError::CompleteFailed {
                    bucket: txn.bucket.clone(),
                    key: txn.key.clone(),
                    reason: chain_to_string(&e),
                    abort,
                })
            }
        }
    }

    /// Caller-requested abort. Aborting an already aborted transaction is a
    /// no-op; a completed one cannot be aborted.
    pub async fn abort(&self, txn: &mut MultipartTransaction) -> Result<(), TransferError> {
        if txn.state == UploadState::Aborted {
            return Ok(());
        }
        txn.advance(UploadState::Aborted)?;
        let upload_id = txn.upload_id.clone().unwrap_or_default();
        self.backend
            .abort_multipart(&txn.bucket, &txn.key, &upload_id)
            .await
            .map_err(|e| TransferError::AbortFailed {
                bucket: txn.bucket.clone(),
                key: txn.key.clone(),
                reason: chain_to_string(&e),
            })
    }

    // Best-effort cleanup: never escalates, only reports.
    async fn abort_after_failure(&self, txn: &mut MultipartTransaction) -> AbortOutcome {
        match self.abort(txn).await {
            Ok(()) => {
                warn!("Aborted multipart upload of {}/{}", txn.bucket, txn.key);
                AbortOutcome::Aborted
            }
            Err(e) => {
                error!("{}", e);
                AbortOutcome::Failed(match e {
                    TransferError::AbortFailed { reason, .. } => reason,
                    other => other.to_string(),
                })
            }
        }
    }
}
