//! Worker startup against dependencies that come up late or never.

#![cfg(unix)]

mod common;

use std::path::{Path, PathBuf};
use std::time::Duration;

use common::{fake_ffmpeg, TestEnv};
use tokio_util::sync::CancellationToken;
use vf_core::Error;
use vodforge::app;

/// Put a regular file where a directory is expected.
fn block_dir(path: &Path) {
    std::fs::write(path, b"not mounted yet").unwrap();
}

/// Swap the blocking file for a real directory after `delay`.
fn unblock_after(path: PathBuf, delay: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();
    })
}

fn env_with_fast_readiness() -> TestEnv {
    let mut env = TestEnv::new();
    let bin = env.root.path().join("bin");
    std::fs::create_dir_all(&bin).unwrap();
    env.config.tools.ffmpeg_path = Some(fake_ffmpeg(&bin, &[]));
    env.config.readiness.interval_ms = 100;
    env.config.readiness.timeout_secs = 5;
    env
}

#[tokio::test]
async fn worker_waits_for_database_to_become_openable() {
    let mut env = env_with_fast_readiness();
    let mount = env.root.path().join("dbvol");
    block_dir(&mount);
    env.config.database.path = mount.join("jobs.db");

    let unblock = unblock_after(mount.clone(), Duration::from_millis(500));
    let started = std::time::Instant::now();

    app::run_worker(env.config.clone(), true, CancellationToken::new())
        .await
        .unwrap();

    unblock.await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(500));
    assert!(mount.join("jobs.db").is_file());
}

#[tokio::test]
async fn worker_waits_for_storage_to_become_writable() {
    let mut env = env_with_fast_readiness();
    let mount = env.root.path().join("mediavol");
    block_dir(&mount);
    env.config.storage.media_root = mount.clone();

    let unblock = unblock_after(mount.clone(), Duration::from_millis(300));

    app::run_worker(env.config.clone(), true, CancellationToken::new())
        .await
        .unwrap();

    unblock.await.unwrap();
    assert!(env.public_dir().is_dir());
}

#[tokio::test]
async fn worker_times_out_when_database_never_opens() {
    let mut env = env_with_fast_readiness();
    let mount = env.root.path().join("dbvol");
    block_dir(&mount);
    env.config.database.path = mount.join("jobs.db");
    env.config.readiness.timeout_secs = 1;

    let err = app::run_worker(env.config.clone(), true, CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        Error::ReadinessTimeout { pending, .. } => assert_eq!(pending, ["database"]),
        other => panic!("unexpected error: {other}"),
    }
    assert!(mount.is_file());
}
