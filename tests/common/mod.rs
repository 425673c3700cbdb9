// tests/common/mod.rs
//
// In-memory storage backend that records every call and can be told to fail
// specific operations.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};

use s3speed::{
    BackendProvider, BucketNaming, ClientConfig, CompletedPartRef, EndpointConfig,
    StorageBackend, TransferFacade, UploadPartRequest,
};

pub const MIB: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Initiate { bucket: String, key: String },
    UploadPart { upload_id: String, part_number: i32, offset: u64, length: u64, is_last: bool },
    Complete { upload_id: String, parts: Vec<i32> },
    Abort { upload_id: String },
    Put { key: String, len: usize },
    Get { key: String },
    Delete { key: String },
    BucketExists { bucket: String },
    CreateBucket { bucket: String, region: String },
    DeleteBucket { bucket: String },
}

/// Which operations should fail.
#[derive(Debug, Default, Clone)]
pub struct Failures {
    pub initiate: bool,
    pub part: Option<i32>,
    pub complete: bool,
    pub abort: bool,
    pub put: bool,
    pub get: bool,
    pub delete: bool,
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    objects: HashMap<(String, String), Bytes>,
    uploads: HashMap<String, (String, String, Vec<(i32, Bytes)>)>,
    buckets: HashSet<String>,
    next_upload: u32,
}

#[derive(Default)]
pub struct MockBackend {
    state: Mutex<State>,
    failures: Mutex<Failures>,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing(failures: Failures) -> Arc<Self> {
        let backend = Self::default();
        *backend.failures.lock().unwrap() = failures;
        Arc::new(backend)
    }

    pub fn set_failures(&self, failures: Failures) {
        *self.failures.lock().unwrap() = failures;
    }

    fn fails(&self) -> Failures {
        self.failures.lock().unwrap().clone()
    }

    fn push(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    pub fn part_calls(&self) -> Vec<(i32, u64, u64, bool)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::UploadPart { part_number, offset, length, is_last, .. } => {
                    Some((part_number, offset, length, is_last))
                }
                _ => None,
            })
            .collect()
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.state
            .lock()
            .unwrap()
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// Multipart uploads neither completed nor aborted.
    pub fn open_uploads(&self) -> usize {
        self.state.lock().unwrap().uploads.len()
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    async fn initiate_multipart(&self, bucket: &str, key: &str) -> Result<String> {
        self.push(Call::Initiate { bucket: bucket.into(), key: key.into() });
        if self.fails().initiate {
            bail!("injected initiate failure");
        }
        let mut st = self.state.lock().unwrap();
        st.next_upload += 1;
        let id = format!("upload-{}", st.next_upload);
        st.uploads.insert(id.clone(), (bucket.into(), key.into(), Vec::new()));
        Ok(id)
    }

    async fn upload_part(&self, req: UploadPartRequest) -> Result<String> {
        self.push(Call::UploadPart {
            upload_id: req.upload_id.clone(),
            part_number: req.part_number,
            offset: req.offset,
            length: req.length,
            is_last: req.is_last,
        });
        if self.fails().part == Some(req.part_number) {
            bail!("injected failure on part {}", req.part_number);
        }
        assert_eq!(req.body.len() as u64, req.length, "body length must match requested length");
        let mut st = self.state.lock().unwrap();
        let Some(upload) = st.uploads.get_mut(&req.upload_id) else {
            bail!("NoSuchUpload: {}", req.upload_id);
        };
        upload.2.push((req.part_number, req.body));
        Ok(format!("etag-{}-{}", req.upload_id, req.part_number))
    }

    async fn complete_multipart(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPartRef],
    ) -> Result<Option<String>> {
        self.push(Call::Complete {
            upload_id: upload_id.into(),
            parts: parts.iter().map(|p| p.part_number).collect(),
        });
        if self.fails().complete {
            bail!("injected complete failure");
        }
        let mut st = self.state.lock().unwrap();
        let Some((_, _, uploaded)) = st.uploads.remove(upload_id) else {
            bail!("NoSuchUpload: {upload_id}");
        };
        // S3 rejects gapped or out-of-order manifests
        for (i, p) in parts.iter().enumerate() {
            if p.part_number != i as i32 + 1 {
                bail!("InvalidPartOrder");
            }
            if p.e_tag != format!("etag-{}-{}", upload_id, p.part_number) {
                bail!("InvalidPart");
            }
        }
        let mut body = BytesMut::new();
        for part in parts {
            let Some((_, data)) = uploaded.iter().find(|(n, _)| *n == part.part_number) else {
                bail!("InvalidPart");
            };
            body.extend_from_slice(data);
        }
        st.objects.insert((bucket.into(), key.into()), body.freeze());
        Ok(Some(format!("etag-{upload_id}-{}", parts.len())))
    }

    async fn abort_multipart(&self, _bucket: &str, _key: &str, upload_id: &str) -> Result<()> {
        self.push(Call::Abort { upload_id: upload_id.into() });
        if self.fails().abort {
            bail!("injected abort failure");
        }
        self.state.lock().unwrap().uploads.remove(upload_id);
        Ok(())
    }

    async fn put_object(&self, bucket: &str, key: &str, data: Bytes) -> Result<()> {
        self.push(Call::Put { key: key.into(), len: data.len() });
        if self.fails().put {
            bail!("injected put failure");
        }
        self.state
            .lock()
            .unwrap()
            .objects
            .insert((bucket.into(), key.into()), data);
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Option<Bytes>> {
        self.push(Call::Get { key: key.into() });
        if self.fails().get {
            bail!("injected get failure");
        }
        Ok(self.object(bucket, key))
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.push(Call::Delete { key: key.into() });
        if self.fails().delete {
            bail!("injected delete failure");
        }
        self.state
            .lock()
            .unwrap()
            .objects
            .remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }

    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        self.push(Call::BucketExists { bucket: bucket.into() });
        Ok(self.state.lock().unwrap().buckets.contains(bucket))
    }

    async fn create_bucket(&self, bucket: &str, region: &str) -> Result<()> {
        self.push(Call::CreateBucket { bucket: bucket.into(), region: region.into() });
        self.state.lock().unwrap().buckets.insert(bucket.into());
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        self.push(Call::DeleteBucket { bucket: bucket.into() });
        self.state.lock().unwrap().buckets.remove(bucket);
        Ok(())
    }
}

/// Hands every region the same mock backend and remembers what was asked for.
pub struct MockProvider {
    pub backend: Arc<MockBackend>,
    pub endpoints: Mutex<Vec<EndpointConfig>>,
}

impl MockProvider {
    pub fn new(backend: Arc<MockBackend>) -> Arc<Self> {
        Arc::new(Self {
            backend,
            endpoints: Mutex::new(Vec::new()),
        })
    }

    pub fn regions_requested(&self) -> Vec<String> {
        self.endpoints
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.region.clone())
            .collect()
    }
}

#[async_trait]
impl BackendProvider for MockProvider {
    async fn backend_for(&self, endpoint: &EndpointConfig) -> Result<Arc<dyn StorageBackend>> {
        self.endpoints.lock().unwrap().push(endpoint.clone());
        Ok(self.backend.clone())
    }
}

/// Facade over a fresh mock backend with the given part size.
pub fn facade_with(backend: Arc<MockBackend>, part_size: usize) -> (TransferFacade, Arc<MockProvider>) {
    let provider = MockProvider::new(backend);
    let cfg = ClientConfig::default().with_part_size(part_size);
    let facade = TransferFacade::new(&cfg, BucketNaming::new("speed-test-", "-bench"), provider.clone())
        .expect("valid config");
    (facade, provider)
}

/// Deterministic payload where every byte depends on its offset.
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}
