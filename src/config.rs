// src/config.rs
//
// Copyright, 2025.  Signal65 / Futurum Group.
//
//! Client and naming configuration.
//!
//! Everything here is an explicit value handed to the facade at construction;
//! there is no process-wide mutable naming or endpoint state.

use std::env;
use std::time::Duration;

use tracing::{debug, warn};

use crate::constants::{
    DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_MAX_ATTEMPTS, DEFAULT_OPERATION_TIMEOUT_SECS,
    DEFAULT_PART_SIZE, ENV_BUCKET_PREFIX, ENV_BUCKET_SUFFIX, ENV_CONNECT_TIMEOUT_SECS,
    ENV_ENDPOINT_URL, ENV_MAX_ATTEMPTS, ENV_OPERATION_TIMEOUT_SECS, ENV_PART_SIZE,
    MIN_S3_MULTIPART_PART_SIZE,
};
use crate::error::TransferError;

/// Runtime parameters for the regional S3 clients and the multipart policy.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Size of every multipart part except possibly the last one.
    pub part_size: usize,
    /// Time allowed to establish a connection.
    pub connect_timeout: Duration,
    /// Time allowed for a whole operation, retries included.
    pub operation_timeout: Duration,
    /// Attempts per call (1 disables retries).
    pub max_attempts: u32,
    /// Custom endpoint (MinIO, Ceph, ...). Applied to every region.
    pub endpoint_url: Option<String>,
    /// Path-style addressing, required by most S3-compatible services.
    pub force_path_style: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            part_size: DEFAULT_PART_SIZE,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            operation_timeout: Duration::from_secs(DEFAULT_OPERATION_TIMEOUT_SECS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            endpoint_url: None,
            force_path_style: false,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

impl ClientConfig {
    /// Build a config from the environment (and `.env`), falling back to defaults.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let endpoint_url = env::var(ENV_ENDPOINT_URL).ok().filter(|s| !s.is_empty());
        let cfg = Self {
            part_size: env_parse(ENV_PART_SIZE).unwrap_or(defaults.part_size),
            connect_timeout: env_parse(ENV_CONNECT_TIMEOUT_SECS)
                .map(Duration::from_secs)
                .unwrap_or(defaults.connect_timeout),
            operation_timeout: env_parse(ENV_OPERATION_TIMEOUT_SECS)
                .map(Duration::from_secs)
                .unwrap_or(defaults.operation_timeout),
            max_attempts: env_parse(ENV_MAX_ATTEMPTS).unwrap_or(defaults.max_attempts),
            // custom endpoints almost never support virtual-hosted buckets
            force_path_style: endpoint_url.is_some(),
            endpoint_url,
        };
        debug!("Client config from environment: {:?}", cfg);
        cfg
    }

    pub fn with_part_size(mut self, part_size: usize) -> Self {
        self.part_size = part_size;
        self
    }

    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self.force_path_style = true;
        self
    }

    /// Reject values that would make transfers impossible.
    pub fn validate(&self) -> Result<(), TransferError> {
        if self.part_size == 0 {
            return Err(TransferError::InvalidConfig("part_size must be >= 1".into()));
        }
        if self.max_attempts == 0 {
            return Err(TransferError::InvalidConfig("max_attempts must be >= 1".into()));
        }
        if self.connect_timeout.is_zero() || self.operation_timeout.is_zero() {
            return Err(TransferError::InvalidConfig("timeouts must be non-zero".into()));
        }
        if self.part_size < MIN_S3_MULTIPART_PART_SIZE {
            warn!(
                "part_size {} is below the S3 minimum of {} bytes; only S3-compatible stores will accept it",
                self.part_size, MIN_S3_MULTIPART_PART_SIZE
            );
        }
        Ok(())
    }
}

/// Naming convention for per-region benchmark buckets: `prefix + region + suffix`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketNaming {
    pub prefix: String,
    pub suffix: String,
}

impl BucketNaming {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self {
            prefix: env::var(ENV_BUCKET_PREFIX).unwrap_or_default(),
            suffix: env::var(ENV_BUCKET_SUFFIX).unwrap_or_default(),
        }
    }

    /// Bucket names must be lowercase, so the whole name is folded.
    pub fn bucket_for(&self, region: &str) -> String {
        format!("{}{}{}", self.prefix, region, self.suffix).to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_name_is_lowercased() {
        let naming = BucketNaming::new("Speed-Test-", "-05-MAR-2013");
        assert_eq!(
            naming.bucket_for("eu-central-1"),
            "speed-test-eu-central-1-05-mar-2013"
        );
    }

    #[test]
    fn defaults_are_finite_and_valid() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.part_size, 5 * 1024 * 1024);
        assert!(cfg.operation_timeout > Duration::ZERO);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_part_size_is_rejected() {
        let cfg = ClientConfig::default().with_part_size(0);
        assert!(matches!(cfg.validate(), Err(TransferError::InvalidConfig(_))));
    }
}
