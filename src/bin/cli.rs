//
// Copyright, 2025.  Signal65 / Futurum Group.
//
//! CLI supporting `put`, `get`, `delete`, `bench`, and `bucket-name`.
//!
//! Examples:
//! ```bash
//! s3speed put    eu-central-1 my-bucket key.bin --size 12582912 --multipart
//! s3speed put    us-west-2    my-bucket key.bin --file ./local.bin
//! s3speed get    us-west-2    my-bucket key.bin -o ./copy.bin
//! s3speed delete us-west-2    my-bucket key.bin
//! s3speed bench  -r us-east-1 -r eu-west-1 -s 20971520 -n 10 --multipart
//! s3speed bucket-name ap-southeast-2
//! ```

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use clap::{ArgAction, Parser, Subcommand};
use std::io::{self, Write, ErrorKind};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use s3speed::bench::{run_benchmark, BenchOptions, PhaseStats};
use s3speed::constants::DEFAULT_OBJECT_SIZE;
use s3speed::data_gen::generate_random_data;
use s3speed::{BucketNaming, ClientConfig, OpLogger, TransferFacade, TransferRequest};

/// Macro to safely print with broken pipe handling
macro_rules! safe_println {
    ($($arg:tt)*) => {
        match writeln!(io::stdout(), $($arg)*) {
            Ok(_) => {},
            Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                // Gracefully exit on broken pipe (e.g., when piped to head/tail)
                std::process::exit(0);
            }
            Err(e) => return Err(e.into())
        }
    };
}

// Regions we are not authorized for by default.
const SKIPPED_REGIONS: &[&str] = &["us-gov-west-1", "cn-north-1"];

// -- Commands

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[arg(short = 'v',
        long,
        action = ArgAction::Count,
        help = "Increase log verbosity: -v = Info, -vv = Debug",
    )]
    verbose: u8,

    /// Write a zstd-compressed TSV op-log of every storage call. Disabled if not provided.
    #[arg(long = "op-log", value_name = "FILE")]
    op_log: Option<PathBuf>,

    /// Bucket name prefix (overrides S3SPEED_BUCKET_PREFIX).
    #[arg(long = "bucket-prefix", global = true)]
    bucket_prefix: Option<String>,

    /// Bucket name suffix (overrides S3SPEED_BUCKET_SUFFIX).
    #[arg(long = "bucket-suffix", global = true)]
    bucket_suffix: Option<String>,

    /// Multipart part size in bytes (overrides S3SPEED_PART_SIZE).
    #[arg(long = "part-size", global = true)]
    part_size: Option<usize>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload one object, from a local file or generated random data.
    Put {
        region: String,
        bucket: String,
        key: String,

        /// Local file to upload.
        #[arg(short = 'f', long = "file", conflicts_with = "size")]
        file: Option<PathBuf>,

        /// Size of the generated object in bytes.
        #[arg(short = 's', long = "size")]
        size: Option<usize>,

        /// Use a multipart upload.
        #[arg(short = 'm', long = "multipart")]
        multipart: bool,
    },
    /// Download one object.
    Get {
        region: String,
        bucket: String,
        key: String,

        /// Write the object here instead of reporting its size.
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },
    /// Delete one object.
    Delete {
        region: String,
        bucket: String,
        key: String,
    },
    /// Upload, download and delete objects in each region and report throughput.
    Bench {
        /// Region to test; repeat for several. Defaults to every authorized known region.
        #[arg(short = 'r', long = "region")]
        regions: Vec<String>,

        /// Object size in bytes (default 20 MiB).
        #[arg(short = 's', long = "size", default_value_t = DEFAULT_OBJECT_SIZE)]
        size: usize,

        /// Number of objects per region.
        #[arg(short = 'n', long = "num", default_value_t = 1)]
        num: usize,

        /// Use multipart uploads.
        #[arg(short = 'm', long = "multipart")]
        multipart: bool,

        /// Key prefix for benchmark objects.
        #[arg(short = 'p', long = "prefix", default_value = "s3speed")]
        prefix: String,

        /// Create each region's bucket if it does not exist.
        #[arg(short = 'c', long = "create-bucket")]
        create_bucket: bool,
    },
    /// Print the benchmark bucket name for a region.
    BucketName {
        region: String,
    },
}

// -----------------------------------------------------------------------------
// Command implementations
// -----------------------------------------------------------------------------

async fn put_cmd(
    facade: &TransferFacade,
    region: &str,
    bucket: &str,
    key: &str,
    file: Option<PathBuf>,
    size: Option<usize>,
    multipart: bool,
) -> Result<()> {
    let payload = match file {
        Some(path) => Bytes::from(
            tokio::fs::read(&path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?,
        ),
        None => Bytes::from(generate_random_data(size.unwrap_or(DEFAULT_OBJECT_SIZE))),
    };
    let len = payload.len();

    let t0 = std::time::Instant::now();
    facade
        .try_put(TransferRequest::new(region, bucket, key, payload, multipart))
        .await?;
    let elapsed = t0.elapsed();
    safe_println!(
        "Uploaded {} bytes to {}/{} in {:?} ({:.2} MiB/s)",
        len, bucket, key, elapsed, mib_per_sec(len as u64, elapsed)
    );
    Ok(())
}

async fn get_cmd(
    facade: &TransferFacade,
    region: &str,
    bucket: &str,
    key: &str,
    output: Option<PathBuf>,
) -> Result<()> {
    let t0 = std::time::Instant::now();
    let body = facade.get(region, bucket, key).await?;
    let elapsed = t0.elapsed();
    if let Some(path) = output {
        tokio::fs::write(&path, &body)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    safe_println!(
        "Downloaded {} bytes from {}/{} in {:?} ({:.2} MiB/s)",
        body.len(), bucket, key, elapsed, mib_per_sec(body.len() as u64, elapsed)
    );
    Ok(())
}

async fn bench_cmd(facade: &TransferFacade, opts: BenchOptions) -> Result<()> {
    let mut failed = false;
    safe_println!(
        "{:<16} {:<8} {:>12} {:>12} {:>12} {:>9}",
        "Region", "Phase", "Ops", "Failures", "MiB/s", "Secs"
    );
    safe_println!("{}", "-".repeat(74));
    for (region, result) in run_benchmark(facade, &opts).await {
        match result {
            Ok(report) => {
                for (phase, stats) in [("put", report.put), ("get", report.get), ("delete", report.delete)] {
                    failed |= stats.failures > 0;
                    print_phase(&region, phase, &stats)?;
                }
            }
            Err(e) => {
                failed = true;
                safe_println!("{:<16} error: {}", region, e);
            }
        }
    }
    if failed {
        bail!("benchmark finished with failures");
    }
    Ok(())
}

fn print_phase(region: &str, phase: &str, s: &PhaseStats) -> Result<()> {
    safe_println!(
        "{:<16} {:<8} {:>12} {:>12} {:>12.2} {:>9.3}",
        region, phase, s.ops, s.failures, s.throughput_mib_s(), s.elapsed.as_secs_f64()
    );
    Ok(())
}

fn mib_per_sec(bytes: u64, elapsed: std::time::Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs == 0.0 { 0.0 } else { bytes as f64 / (1024.0 * 1024.0) / secs }
}

/// Main CLI function
#[tokio::main]
async fn main() -> Result<()> {
    // Loads any variables from .env file that are not already set
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbosity
    let filter = match cli.verbose {
        0 => "warn",        // no -v: WARN level
        1 => "info",        // -v: INFO level
        _ => "debug",       // -vv or more: DEBUG level
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    // Capture `log` records from the AWS SDK
    tracing_log::LogTracer::init().ok();

    let mut cfg = ClientConfig::from_env();
    if let Some(part_size) = cli.part_size {
        cfg = cfg.with_part_size(part_size);
    }
    let mut naming = BucketNaming::from_env();
    if let Some(prefix) = cli.bucket_prefix {
        naming.prefix = prefix;
    }
    if let Some(suffix) = cli.bucket_suffix {
        naming.suffix = suffix;
    }

    let mut facade = TransferFacade::s3(cfg, naming)?;

    // If set, start the op-logger *before* the first S3 call
    let op_log = match cli.op_log {
        Some(ref path) => Some(
            OpLogger::new(path)
                .with_context(|| format!("failed to start op-logger `{}`", path.display()))?,
        ),
        None => None,
    };
    if let Some(log) = &op_log {
        facade = facade.with_op_log(log.clone());
    }

    let result = match cli.cmd {
        Command::Put { region, bucket, key, file, size, multipart } => {
            put_cmd(&facade, &region, &bucket, &key, file, size, multipart).await
        }
        Command::Get { region, bucket, key, output } => {
            get_cmd(&facade, &region, &bucket, &key, output).await
        }
        Command::Delete { region, bucket, key } => {
            facade.delete(&region, &bucket, &key).await.map_err(Into::into)
        }
        Command::Bench { regions, size, num, multipart, prefix, create_bucket } => {
            let regions = if regions.is_empty() {
                facade
                    .regions()
                    .regions()
                    .filter(|r| !SKIPPED_REGIONS.contains(r))
                    .map(str::to_string)
                    .collect()
            } else {
                regions
            };
            info!("Benchmarking {} region(s)", regions.len());
            let opts = BenchOptions {
                regions,
                size,
                count: num,
                multipart,
                key_prefix: prefix,
                create_buckets: create_bucket,
            };
            bench_cmd(&facade, opts).await
        }
        Command::BucketName { region } => {
            let name = facade.bucket_for(&region)?;
            safe_println!("{}", name);
            Ok(())
        }
    };

    if let Some(log) = &op_log {
        log.finalize();
    }
    result
}
