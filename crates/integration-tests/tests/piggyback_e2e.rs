//! End-to-end tests over the filesystem adapter
//!
//! Every test runs the service against a fresh temp directory with the real
//! system clock. Ages are forged by moving file mtimes into the past.

use filetime::FileTime;
use piggyback_core::application::{CleanupStats, PiggybackService};
use piggyback_core::domain::{CacheAgeSetting, HostName, Outcome, DEFAULT_MAX_CACHE_AGE};
use piggyback_core::port::time_provider::SystemTimeProvider;
use piggyback_infra_fs::{FsLayout, FsPiggybackRepository};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

struct Env {
    _dir: TempDir,
    layout: FsLayout,
    service: PiggybackService,
}

fn setup() -> Env {
    let dir = TempDir::new().unwrap();
    let layout = FsLayout::under(dir.path());
    let repo = Arc::new(FsPiggybackRepository::new(layout.clone()));
    let service = PiggybackService::new(repo, Arc::new(SystemTimeProvider), DEFAULT_MAX_CACHE_AGE);
    Env {
        _dir: dir,
        layout,
        service,
    }
}

fn set_mtime(path: &Path, secs_ago: i64) {
    let now = FileTime::now();
    let past = FileTime::from_unix_time(now.unix_seconds() - secs_ago, 0);
    filetime::set_file_mtime(path, past).unwrap();
}

fn pairs(items: &[(&str, &str)]) -> BTreeSet<(HostName, HostName)> {
    items
        .iter()
        .map(|(s, t)| (s.to_string(), t.to_string()))
        .collect()
}

#[tokio::test]
async fn test_store_then_read_host_a() {
    let env = setup();

    env.service
        .store("source1", [("host-a", ["<<<check_mk>>>", "data"])])
        .await
        .unwrap();

    let infos = env
        .service
        .get_raw_data("host-a", CacheAgeSetting::UseDefault)
        .await
        .unwrap();

    assert_eq!(infos.len(), 1);
    let info = &infos[0];
    assert_eq!(info.source_hostname, "source1");
    assert!(info.successfully_processed);
    assert_eq!(info.outcome, Outcome::Processed);
    assert_eq!(info.raw_data, "<<<check_mk>>>\ndata\n");
    assert_eq!(info.file_path, env.layout.payload_path("host-a", "source1"));
    assert!(env.service.has_raw_data("host-a").await.unwrap());
}

#[tokio::test]
async fn test_no_data_for_unknown_host() {
    let env = setup();

    let infos = env
        .service
        .get_raw_data("unknown", CacheAgeSetting::UseDefault)
        .await
        .unwrap();

    assert!(infos.is_empty());
    assert!(!env.service.has_raw_data("unknown").await.unwrap());
    assert!(env.service.get_source_hostnames("unknown").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_two_sources_two_targets() {
    let env = setup();

    env.service
        .store(
            "source1",
            [("test-host", ["<<<s1_th>>>"]), ("test-host2", ["<<<s1_th2>>>"])],
        )
        .await
        .unwrap();
    env.service
        .store("source2", [("test-host", ["<<<s2_th>>>"])])
        .await
        .unwrap();

    let infos = env
        .service
        .get_raw_data("test-host", CacheAgeSetting::UseDefault)
        .await
        .unwrap();
    let sources: Vec<_> = infos.iter().map(|i| i.source_hostname.as_str()).collect();
    assert_eq!(sources, vec!["source1", "source2"]);
    assert!(infos.iter().all(|i| i.successfully_processed));
    assert_eq!(infos[1].raw_data, "<<<s2_th>>>\n");

    let infos = env
        .service
        .get_raw_data("test-host2", CacheAgeSetting::UseDefault)
        .await
        .unwrap();
    assert_eq!(infos.len(), 1);
    assert_eq!(infos[0].raw_data, "<<<s1_th2>>>\n");

    assert_eq!(
        env.service
            .get_source_and_target_hosts(CacheAgeSetting::UseDefault)
            .await
            .unwrap(),
        pairs(&[
            ("source1", "test-host"),
            ("source1", "test-host2"),
            ("source2", "test-host"),
        ])
    );
}

#[tokio::test]
async fn test_source_ran_again_without_target_is_not_updated() {
    let env = setup();

    env.service
        .store("source1", [("host-a", ["old"]), ("host-b", ["old"])])
        .await
        .unwrap();
    set_mtime(&env.layout.payload_path("host-a", "source1"), 30);
    set_mtime(&env.layout.payload_path("host-b", "source1"), 30);
    set_mtime(&env.layout.source_status_path("source1"), 30);

    // next run only has data for host-b
    env.service
        .store("source1", [("host-b", ["new"])])
        .await
        .unwrap();

    let a = env
        .service
        .get_raw_data("host-a", CacheAgeSetting::UseDefault)
        .await
        .unwrap();
    assert_eq!(a[0].outcome, Outcome::NotUpdated);
    assert!(!a[0].successfully_processed);
    assert_eq!(a[0].reason, "Piggyback file not updated by source 'source1'");
    assert_eq!(a[0].raw_data, "old\n");

    let b = env
        .service
        .get_raw_data("host-b", CacheAgeSetting::UseDefault)
        .await
        .unwrap();
    assert_eq!(b[0].outcome, Outcome::Processed);
    assert_eq!(b[0].raw_data, "new\n");
}

#[tokio::test]
async fn test_remove_source_status_reclassifies_as_not_sending() {
    let env = setup();

    assert!(!env.service.remove_source_status_file("source1").await.unwrap());

    env.service
        .store("source1", [("host-a", ["x"]), ("host-b", ["y"])])
        .await
        .unwrap();
    assert!(env.service.remove_source_status_file("source1").await.unwrap());
    assert!(!env.layout.source_status_path("source1").exists());

    for target in ["host-a", "host-b"] {
        let infos = env
            .service
            .get_raw_data(target, CacheAgeSetting::UseDefault)
            .await
            .unwrap();
        assert_eq!(infos[0].outcome, Outcome::NotSending);
        assert_eq!(infos[0].reason, "Source 'source1' not sending piggyback data");
        // payload untouched
        assert!(env.layout.payload_path(target, "source1").exists());
    }

    assert!(env
        .service
        .get_source_and_target_hosts(CacheAgeSetting::UseDefault)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_scanner_keeps_stale_links_and_drops_silent_sources() {
    let env = setup();

    // fresh
    env.service
        .store("fresh", [("host-a", ["x"])])
        .await
        .unwrap();

    // too old: stamp and payload share an old mtime
    env.service
        .store("stale", [("host-b", ["x"])])
        .await
        .unwrap();
    set_mtime(&env.layout.payload_path("host-b", "stale"), 7200);
    set_mtime(&env.layout.source_status_path("stale"), 7200);

    // not updated
    env.service
        .store("partial", [("host-c", ["x"])])
        .await
        .unwrap();
    set_mtime(&env.layout.payload_path("host-c", "partial"), 60);

    // not sending
    env.service
        .store("silent", [("host-d", ["x"])])
        .await
        .unwrap();
    env.service.remove_source_status_file("silent").await.unwrap();

    let stale = env
        .service
        .get_raw_data("host-b", CacheAgeSetting::UseDefault)
        .await
        .unwrap();
    assert_eq!(stale[0].outcome, Outcome::TooOld);

    assert_eq!(
        env.service
            .get_source_and_target_hosts(CacheAgeSetting::UseDefault)
            .await
            .unwrap(),
        pairs(&[("fresh", "host-a"), ("partial", "host-c"), ("stale", "host-b")])
    );
}

#[tokio::test]
async fn test_store_is_idempotent() {
    let env = setup();

    for _ in 0..2 {
        env.service
            .store("source1", [("host-a", ["same"])])
            .await
            .unwrap();
    }

    let infos = env
        .service
        .get_raw_data("host-a", CacheAgeSetting::UseDefault)
        .await
        .unwrap();
    assert_eq!(infos.len(), 1);
    assert_eq!(infos[0].outcome, Outcome::Processed);
    assert_eq!(infos[0].raw_data, "same\n");
}

#[tokio::test]
async fn test_cleanup_removes_outdated_files() {
    let env = setup();

    env.service
        .store("fresh", [("host-a", ["x"])])
        .await
        .unwrap();

    env.service
        .store("old", [("host-b", ["x"])])
        .await
        .unwrap();
    set_mtime(&env.layout.payload_path("host-b", "old"), 7200);
    set_mtime(&env.layout.source_status_path("old"), 7200);

    let stats = env
        .service
        .cleanup_piggyback_files(CacheAgeSetting::UseDefault)
        .await
        .unwrap();

    assert_eq!(
        stats,
        CleanupStats {
            removed_source_statuses: 1,
            removed_payload_files: 1,
            removed_target_dirs: 1,
        }
    );
    assert!(!env.layout.target_dir("host-b").exists());
    assert!(!env.layout.source_status_path("old").exists());
    assert!(env.layout.payload_path("host-a", "fresh").exists());
    assert!(env.service.has_raw_data("host-a").await.unwrap());
    assert!(!env.service.has_raw_data("host-b").await.unwrap());
}

#[tokio::test]
async fn test_payload_file_is_plain_text() {
    let env = setup();

    env.service
        .store("source1", [("host-a", ["<<<section>>>", "1 2 3"])])
        .await
        .unwrap();

    let content =
        std::fs::read_to_string(env.layout.payload_path("host-a", "source1")).unwrap();
    assert_eq!(content, "<<<section>>>\n1 2 3\n");

    let stamp = std::fs::metadata(env.layout.source_status_path("source1")).unwrap();
    assert_eq!(stamp.len(), 0);
}
