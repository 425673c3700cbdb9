// src/bench.rs
//
// Copyright, 2025.  Signal65 / Futurum Group.
//
//! Per-region upload / download / delete throughput runs.
//!
//! Regions run concurrently; within a region every object goes through
//! put, then get (with content verification), then delete, one phase at a time.

use std::time::{Duration, Instant};

use bytes::Bytes;
use futures::future::join_all;
use tracing::{info, warn};

use crate::constants::DEFAULT_OBJECT_SIZE;
use crate::data_gen::generate_random_data;
use crate::error::TransferError;
use crate::transfer::{TransferFacade, TransferRequest};

#[derive(Debug, Clone)]
pub struct BenchOptions {
    pub regions: Vec<String>,
    /// Bytes per object.
    pub size: usize,
    /// Objects per region.
    pub count: usize,
    pub multipart: bool,
    pub key_prefix: String,
    /// Create each region's bucket first if it is missing.
    pub create_buckets: bool,
}

impl Default for BenchOptions {
    fn default() -> Self {
        Self {
            regions: Vec::new(),
            size: DEFAULT_OBJECT_SIZE,
            count: 1,
            multipart: false,
            key_prefix: "s3speed".to_string(),
            create_buckets: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PhaseStats {
    pub ops: usize,
    pub failures: usize,
    pub bytes: u64,
    pub elapsed: Duration,
}

impl PhaseStats {
    pub fn throughput_mib_s(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.bytes as f64 / (1024.0 * 1024.0) / secs
    }
}

#[derive(Debug, Clone)]
pub struct RegionReport {
    pub region: String,
    pub bucket: String,
    pub put: PhaseStats,
    pub get: PhaseStats,
    pub delete: PhaseStats,
}

/// Object key for the `i`-th benchmark object.
pub fn object_key(prefix: &str, i: usize, count: usize) -> String {
    format!("{prefix}/object_{i}_of_{count}.dat")
}

/// Run every region concurrently; results come back in the order of `opts.regions`.
pub async fn run_benchmark(
    facade: &TransferFacade,
    opts: &BenchOptions,
) -> Vec<(String, Result<RegionReport, TransferError>)> {
    let runs = opts.regions.iter().map(|region| async move {
        (region.clone(), run_region(facade, region, opts).await)
    });
    join_all(runs).await
}

pub async fn run_region(
    facade: &TransferFacade,
    region: &str,
    opts: &BenchOptions,
) -> Result<RegionReport, TransferError> {
    let bucket = facade.bucket_for(region)?;
    if opts.create_buckets {
        facade.ensure_bucket(region, &bucket).await?;
    }

    let payload = Bytes::from(generate_random_data(opts.size));
    let keys: Vec<String> = (0..opts.count)
        .map(|i| object_key(&opts.key_prefix, i, opts.count))
        .collect();
    info!(
        "Region {}: {} objects of {} bytes into {} (multipart={})",
        region, opts.count, opts.size, bucket, opts.multipart
    );

    let mut put = PhaseStats::default();
    let t = Instant::now();
    for key in &keys {
        let req = TransferRequest::new(region, &bucket, key, payload.clone(), opts.multipart);
        put.ops += 1;
        if facade.put(req).await.success {
            put.bytes += payload.len() as u64;
        } else {
            put.failures += 1;
        }
    }
    put.elapsed = t.elapsed();

    let mut get = PhaseStats::default();
    let t = Instant::now();
    for key in &keys {
        get.ops += 1;
        match facade.get(region, &bucket, key).await {
            Ok(body) if body == payload => get.bytes += body.len() as u64,
            Ok(body) => {
                warn!("GET {}/{} returned {} bytes that do not match the upload", bucket, key, body.len());
                get.failures += 1;
            }
            Err(_) => get.failures += 1,
        }
    }
    get.elapsed = t.elapsed();

    let mut delete = PhaseStats::default();
    let t = Instant::now();
    for key in &keys {
        delete.ops += 1;
        if facade.delete(region, &bucket, key).await.is_err() {
            delete.failures += 1;
        }
    }
    delete.elapsed = t.elapsed();

    Ok(RegionReport {
        region: region.to_string(),
        bucket,
        put,
        get,
        delete,
    })
}
