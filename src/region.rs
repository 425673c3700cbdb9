// src/region.rs
//
// Copyright, 2025.  Signal65 / Futurum Group.
//
//! Region → endpoint resolution.
//!
//! Resolution is a pure lookup. The resulting `EndpointConfig` is handed to
//! the backend provider, which keeps one client per region, so two transfers
//! aimed at different regions never share a mutable endpoint setting.

use std::collections::BTreeSet;

use crate::config::ClientConfig;
use crate::constants::DEFAULT_REGION;
use crate::error::TransferError;

/// Regions the benchmark knows how to target out of the box.
pub const KNOWN_REGIONS: &[&str] = &[
    "us-east-1",
    "us-west-1",
    "us-west-2",
    "eu-west-1",
    "eu-central-1",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-northeast-1",
    "sa-east-1",
    "us-gov-west-1",
    "cn-north-1",
];

// Legacy identifiers mapped to their current region names. "US Standard" has
// no name of its own and falls back to the default region.
const REGION_ALIASES: &[(&str, &str)] = &[
    ("", DEFAULT_REGION),
    ("us", DEFAULT_REGION),
    ("us-standard", DEFAULT_REGION),
    ("eu", "eu-west-1"),
    ("s3-us-gov-west-1", "us-gov-west-1"),
];

/// Everything a regional client needs to know about where to send requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EndpointConfig {
    pub region: String,
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
}

#[derive(Debug, Clone)]
pub struct RegionContext {
    regions: BTreeSet<String>,
    endpoint_url: Option<String>,
    force_path_style: bool,
}

impl Default for RegionContext {
    fn default() -> Self {
        Self {
            regions: KNOWN_REGIONS.iter().map(|r| r.to_string()).collect(),
            endpoint_url: None,
            force_path_style: false,
        }
    }
}

impl RegionContext {
    /// Region table with the endpoint override (if any) taken from `cfg`.
    pub fn new(cfg: &ClientConfig) -> Self {
        Self {
            endpoint_url: cfg.endpoint_url.clone(),
            force_path_style: cfg.force_path_style,
            ..Self::default()
        }
    }

    /// Register an additional region identifier (e.g. a newer AWS region or
    /// a MinIO site name).
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.regions.insert(region.into().trim().to_ascii_lowercase());
        self
    }

    pub fn regions(&self) -> impl Iterator<Item = &str> {
        self.regions.iter().map(String::as_str)
    }

    pub fn resolve(&self, region: &str) -> Result<EndpointConfig, TransferError> {
        let normalized = region.trim().to_ascii_lowercase();
        let name = REGION_ALIASES
            .iter()
            .find(|(alias, _)| *alias == normalized)
            .map_or(normalized.clone(), |(_, canonical)| canonical.to_string());

        if !self.regions.contains(&name) {
            return Err(TransferError::UnresolvableRegion(region.to_string()));
        }

        Ok(EndpointConfig {
            region: name,
            endpoint_url: self.endpoint_url.clone(),
            force_path_style: self.force_path_style,
        })
    }
}
