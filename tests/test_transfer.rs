// tests/test_transfer.rs
//
// put / get / delete through the facade, region routing, and the benchmark driver.

mod common;

use std::io::Read;

use anyhow::Result;
use bytes::Bytes;

use common::{Call, Failures, MockBackend, MIB, facade_with, pattern};
use s3speed::bench::{run_benchmark, BenchOptions};
use s3speed::{ErrorKind, OpLogger, RegionContext, TransferError, TransferRequest};

#[tokio::test]
async fn round_trip_single_shot_and_multipart() -> Result<()> {
    let backend = MockBackend::new();
    let (facade, _) = facade_with(backend.clone(), 5 * MIB);

    for (len, multipart) in [(0, false), (0, true), (3 * MIB, false), (12 * MIB, true), (1, true)] {
        let data = pattern(len);
        let key = format!("obj-{len}-{multipart}");
        assert!(facade.put_bytes("us-west-2", "bkt", &key, data.clone(), multipart).await);
        let got = facade.get("us-west-2", "bkt", &key).await?;
        assert_eq!(got, Bytes::from(data), "len={len} multipart={multipart}");
    }
    Ok(())
}

#[tokio::test]
async fn plain_put_never_initiates_multipart() -> Result<()> {
    let backend = MockBackend::new();
    let (facade, _) = facade_with(backend.clone(), 5 * MIB);

    let result = facade
        .put(TransferRequest::new("eu-west-1", "bkt", "k", vec![7u8; 50 * MIB], false))
        .await;

    assert!(result.success);
    assert_eq!(result.error_kind, None);
    assert_eq!(backend.calls(), vec![Call::Put { key: "k".into(), len: 50 * MIB }]);
    Ok(())
}

#[tokio::test]
async fn failed_part_reports_failure_kind() -> Result<()> {
    let backend = MockBackend::failing(Failures { part: Some(2), ..Default::default() });
    let (facade, _) = facade_with(backend.clone(), 5 * MIB);

    let result = facade
        .put(TransferRequest::new("us-east-1", "bkt", "k", pattern(12 * MIB), true))
        .await;

    assert!(!result.success);
    assert_eq!(result.error_kind, Some(ErrorKind::PartUploadFailed));
    assert_eq!(backend.count(|c| matches!(c, Call::Abort { .. })), 1);
    assert_eq!(backend.open_uploads(), 0, "no dangling multipart upload");
    Ok(())
}

#[tokio::test]
async fn failed_complete_reports_failure() -> Result<()> {
    let backend = MockBackend::failing(Failures { complete: true, ..Default::default() });
    let (facade, _) = facade_with(backend.clone(), 5 * MIB);

    let ok = facade.put_bytes("us-east-1", "bkt", "k", pattern(10), true).await;

    assert!(!ok);
    assert_eq!(backend.count(|c| matches!(c, Call::Abort { .. })), 1);
    Ok(())
}

#[tokio::test]
async fn single_shot_failure_is_classified() -> Result<()> {
    let backend = MockBackend::failing(Failures { put: true, ..Default::default() });
    let (facade, _) = facade_with(backend, 5 * MIB);

    let err = facade
        .try_put(TransferRequest::new("us-east-1", "bkt", "k", pattern(10), false))
        .await
        .unwrap_err();

    assert!(matches!(err, TransferError::SingleShotFailed { op: "PutObject", .. }));
    Ok(())
}

#[tokio::test]
async fn unknown_region_fails_before_any_call() -> Result<()> {
    let backend = MockBackend::new();
    let (facade, provider) = facade_with(backend.clone(), 5 * MIB);

    let result = facade
        .put(TransferRequest::new("atlantis-1", "bkt", "k", pattern(10), true))
        .await;
    assert_eq!(result.error_kind, Some(ErrorKind::UnresolvableRegion));

    let err = facade.get("atlantis-1", "bkt", "k").await.unwrap_err();
    assert!(matches!(err, TransferError::UnresolvableRegion(_)));
    assert!(facade.delete("atlantis-1", "bkt", "k").await.is_err());

    assert!(backend.calls().is_empty());
    assert!(provider.regions_requested().is_empty());
    Ok(())
}

#[tokio::test]
async fn custom_region_table_replaces_the_default() -> Result<()> {
    let backend = MockBackend::new();
    let (facade, provider) = facade_with(backend.clone(), 4);
    let facade = facade.with_regions(RegionContext::default().with_region("minio-site-a"));
    assert_eq!(facade.part_size(), 4);

    assert!(facade.put_bytes("MINIO-SITE-A", "bkt", "k", pattern(9), true).await);
    assert_eq!(backend.part_calls().len(), 3);
    assert_eq!(provider.regions_requested(), vec!["minio-site-a"]);
    assert_eq!(facade.bucket_for("minio-site-a")?, "speed-test-minio-site-a-bench");
    Ok(())
}

#[tokio::test]
async fn legacy_region_names_route_to_current_regions() -> Result<()> {
    let (facade, provider) = facade_with(MockBackend::new(), 5 * MIB);

    facade.delete("EU", "bkt", "k").await?;
    facade.delete("s3-us-gov-west-1", "bkt", "k").await?;

    assert_eq!(provider.regions_requested(), vec!["eu-west-1", "us-gov-west-1"]);
    Ok(())
}

#[tokio::test]
async fn every_call_resolves_its_own_region() -> Result<()> {
    let backend = MockBackend::new();
    let (facade, provider) = facade_with(backend, 5 * MIB);

    facade.put_bytes("eu-central-1", "b1", "k", pattern(4), false).await;
    facade.get("ap-southeast-2", "b2", "k").await.ok();
    facade.delete("", "b3", "k").await?;

    assert_eq!(
        provider.regions_requested(),
        vec!["eu-central-1", "ap-southeast-2", "us-east-1"]
    );
    Ok(())
}

#[tokio::test]
async fn missing_object_is_not_found() -> Result<()> {
    let (facade, _) = facade_with(MockBackend::new(), 5 * MIB);

    let err = facade.get("us-west-1", "bkt", "nope").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    Ok(())
}

#[tokio::test]
async fn read_failure_returns_no_bytes() -> Result<()> {
    let backend = MockBackend::new();
    let (facade, _) = facade_with(backend.clone(), 5 * MIB);
    assert!(facade.put_bytes("us-west-1", "bkt", "k", pattern(100), false).await);

    backend.set_failures(Failures { get: true, ..Default::default() });
    let err = facade.get("us-west-1", "bkt", "k").await.unwrap_err();

    assert!(matches!(err, TransferError::SingleShotFailed { op: "GetObject", .. }));
    Ok(())
}

#[tokio::test]
async fn delete_removes_object_and_reports_failures() -> Result<()> {
    let backend = MockBackend::new();
    let (facade, _) = facade_with(backend.clone(), 5 * MIB);
    assert!(facade.put_bytes("sa-east-1", "bkt", "k", pattern(100), false).await);

    facade.delete("sa-east-1", "bkt", "k").await?;
    assert_eq!(backend.object("bkt", "k"), None);

    backend.set_failures(Failures { delete: true, ..Default::default() });
    let err = facade.delete("sa-east-1", "bkt", "k").await.unwrap_err();
    assert!(matches!(err, TransferError::SingleShotFailed { op: "DeleteObject", .. }));
    Ok(())
}

#[tokio::test]
async fn ensure_bucket_creates_only_when_missing() -> Result<()> {
    let backend = MockBackend::new();
    let (facade, _) = facade_with(backend.clone(), 5 * MIB);
    let bucket = facade.bucket_for("EU-West-1")?;
    assert_eq!(bucket, "speed-test-eu-west-1-bench");

    assert!(facade.ensure_bucket("eu-west-1", &bucket).await?);
    assert!(!facade.ensure_bucket("eu-west-1", &bucket).await?);
    assert_eq!(
        backend.count(|c| matches!(c, Call::CreateBucket { region, .. } if region == "eu-west-1")),
        1
    );

    facade.remove_bucket("eu-west-1", &bucket).await?;
    assert!(facade.ensure_bucket("eu-west-1", &bucket).await?);
    Ok(())
}

#[tokio::test]
async fn benchmark_runs_all_phases_per_region() -> Result<()> {
    let backend = MockBackend::new();
    let (facade, _) = facade_with(backend.clone(), 1024);
    let opts = BenchOptions {
        regions: vec!["us-east-1".into(), "eu-west-1".into(), "nowhere".into()],
        size: 3000,
        count: 2,
        multipart: true,
        key_prefix: "run".into(),
        create_buckets: true,
    };

    let results = run_benchmark(&facade, &opts).await;

    assert_eq!(results.len(), 3);
    for (region, result) in &results[..2] {
        let report = result.as_ref().expect("known region");
        assert_eq!(&report.region, region);
        for stats in [report.put, report.get, report.delete] {
            assert_eq!(stats.ops, 2);
            assert_eq!(stats.failures, 0);
        }
        assert_eq!(report.put.bytes, 6000);
        assert_eq!(report.get.bytes, 6000);
    }
    assert!(matches!(results[2].1, Err(TransferError::UnresolvableRegion(_))));
    // 2 regions x 2 objects x 3 parts
    assert_eq!(backend.count(|c| matches!(c, Call::UploadPart { .. })), 12);
    assert_eq!(backend.object("speed-test-us-east-1-bench", "run/object_0_of_2.dat"), None);
    Ok(())
}

#[tokio::test]
async fn benchmark_counts_put_failures() -> Result<()> {
    let backend = MockBackend::failing(Failures { put: true, ..Default::default() });
    let (facade, _) = facade_with(backend, 1024);
    let opts = BenchOptions {
        regions: vec!["us-west-2".into()],
        size: 10,
        count: 3,
        ..Default::default()
    };

    let results = run_benchmark(&facade, &opts).await;
    let report = results[0].1.as_ref().expect("known region");

    assert_eq!(report.put.failures, 3);
    assert_eq!(report.put.bytes, 0);
    // nothing was stored, so every get is a not-found failure
    assert_eq!(report.get.failures, 3);
    Ok(())
}

#[tokio::test]
async fn op_log_records_each_facade_call() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("ops.tsv.zst");
    let log = OpLogger::new(&path)?;
    let (facade, _) = facade_with(MockBackend::new(), 4);
    let facade = facade.with_op_log(log.clone());

    assert!(facade.put_bytes("us-west-2", "bkt", "a", pattern(10), true).await);
    assert!(facade.put_bytes("us-west-2", "bkt", "b", pattern(10), false).await);
    facade.get("us-west-2", "bkt", "a").await?;
    facade.get("us-west-2", "bkt", "missing").await.ok();
    facade.delete("us-west-2", "bkt", "a").await?;
    log.finalize();

    let mut text = String::new();
    zstd::stream::read::Decoder::new(std::fs::File::open(&path)?)?.read_to_string(&mut text)?;
    let ops: Vec<&str> = text.lines().skip(1).map(|l| l.split('\t').nth(2).unwrap_or("")).collect();
    assert_eq!(ops, vec!["MPU_PUT", "PUT", "GET", "GET", "DELETE"]);
    assert!(text.lines().nth(4).is_some_and(|l| l.contains("object not found")));
    Ok(())
}

#[tokio::test]
async fn op_log_records_calls_that_fail_region_resolution() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("ops.tsv.zst");
    let log = OpLogger::new(&path)?;
    let (facade, _) = facade_with(MockBackend::new(), 4);
    let facade = facade.with_op_log(log.clone());

    assert!(!facade.put_bytes("atlantis-1", "bkt", "a", pattern(10), true).await);
    assert!(!facade.put_bytes("atlantis-1", "bkt", "b", pattern(10), false).await);
    assert!(facade.get("atlantis-1", "bkt", "a").await.is_err());
    assert!(facade.delete("atlantis-1", "bkt", "a").await.is_err());
    log.finalize();

    let mut text = String::new();
    zstd::stream::read::Decoder::new(std::fs::File::open(&path)?)?.read_to_string(&mut text)?;
    let rows: Vec<Vec<&str>> = text.lines().skip(1).map(|l| l.split('\t').collect()).collect();
    let ops: Vec<&str> = rows.iter().map(|r| r[2]).collect();
    assert_eq!(ops, vec!["MPU_PUT", "PUT", "GET", "DELETE"]);
    for row in &rows {
        assert_eq!(row[3], "atlantis-1");
        assert!(row[7].contains("atlantis-1"), "error column: {}", row[7]);
    }
    Ok(())
}
