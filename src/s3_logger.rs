// src/s3_logger.rs
//
// Copyright, 2025. Signal65 / Futurum Group.
//
//! Operation log for benchmark runs.
//!
//! Creates a zstd-compressed, tab-separated log file with one line per
//! storage operation issued through the transfer facade.

use std::collections::hash_map::DefaultHasher;
use std::fs::File;
use std::hash::{Hash, Hasher};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::mpsc::{Receiver, SyncSender, channel, sync_channel};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::SystemTime;

use tracing::{info, warn};
use zstd::stream::write::Encoder;

use crate::constants::{ENV_OPLOG_BUF, ENV_OPLOG_LEVEL};

const HEADER: &str = "idx\tthread\top\tregion\tbucket\tkey\tbytes\terror\tstart\tend\tduration_ns\n";

/// A record of one storage operation (PUT, MPU_PUT, GET, DELETE).
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub operation: &'static str,
    pub region: String,
    pub bucket: String,
    pub key: String,
    pub bytes: u64,
    pub error: Option<String>,
    pub start_time: SystemTime,
    pub end_time: SystemTime,
}

enum Msg {
    Entry(usize, LogEntry),
    Shutdown,
}

fn current_thread_id() -> usize {
    let mut hasher = DefaultHasher::new();
    thread::current().id().hash(&mut hasher);
    hasher.finish() as usize
}

fn to_log_line(idx: u64, thread_id: usize, e: &LogEntry) -> String {
    let duration_ns = e
        .end_time
        .duration_since(e.start_time)
        .unwrap_or_default()
        .as_nanos();
    format!(
        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\n",
        idx,
        thread_id,
        e.operation,
        e.region,
        e.bucket,
        e.key,
        e.bytes,
        e.error.as_deref().unwrap_or_default(),
        humantime::format_rfc3339_nanos(e.start_time),
        humantime::format_rfc3339_nanos(e.end_time),
        duration_ns
    )
}

/// Handle for sending log entries; clones share one writer thread.
#[derive(Debug, Clone)]
pub struct OpLogger {
    sender: SyncSender<Msg>,
    done_rx: Arc<Mutex<Option<Receiver<()>>>>,
}

impl OpLogger {
    /// Create the log file and spawn the background writer thread.
    pub fn new(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let cap: usize = std::env::var(ENV_OPLOG_BUF).ok()
            .and_then(|s| s.parse().ok()).unwrap_or(256);
        let level: i32 = std::env::var(ENV_OPLOG_LEVEL).ok()
            .and_then(|s| s.parse().ok()).unwrap_or(1);

        let (sender, receiver) = sync_channel::<Msg>(cap);
        let (done_tx, done_rx) = channel::<()>();

        let file = File::create(path.as_ref())?;
        let writer = BufWriter::with_capacity(256 * 1024, file);
        let mut encoder = Encoder::new(writer, level)?.auto_finish();

        // header first so even empty logs are well-formed
        encoder.write_all(HEADER.as_bytes())?;
        encoder.flush()?;

        thread::Builder::new()
            .name("s3speed-oplog".to_string())
            .spawn(move || {
                let mut idx: u64 = 0;
                for msg in receiver {
                    let (thread_id, entry) = match msg {
                        Msg::Entry(t, e) => (t, e),
                        Msg::Shutdown => break,
                    };
                    let line = to_log_line(idx, thread_id, &entry);
                    if let Err(e) = encoder.write_all(line.as_bytes()) {
                        eprintln!("Error writing to op-log: {e}");
                        break;
                    }
                    idx += 1;
                }
                // dropping the encoder finishes the zstd frame
                drop(encoder);
                let _ = done_tx.send(());
            })?;

        info!("Initialized operation logging to file: {}", path.as_ref().display());
        Ok(Self {
            sender,
            done_rx: Arc::new(Mutex::new(Some(done_rx))),
        })
    }

    /// Submit an entry. Blocks if the writer falls behind; benchmark numbers
    /// are only meaningful with a complete log.
    pub fn log(&self, entry: LogEntry) {
        if self.sender.send(Msg::Entry(current_thread_id(), entry)).is_err() {
            warn!("op-log writer has stopped; dropping entry");
        }
    }

    /// Flush and close the log. Later `log` calls are dropped.
    pub fn finalize(&self) {
        let _ = self.sender.send(Msg::Shutdown);
        let done_rx = match self.done_rx.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };
        if let Some(rx) = done_rx {
            let _ = rx.recv();
            info!("Shut down operation logging");
        }
    }
}
