// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;

use serial_test::serial;

use super::*;
use crate::env::ClientIdSource;

fn test_config(state_dir: &Path) -> Config {
    Config {
        state_dir: state_dir.to_path_buf(),
        sysconf_dir: state_dir.to_path_buf(),
        socket_path: None,
        worker_dir: state_dir.join("workers"),
        log_level: "error".to_string(),
        log_path: state_dir.join("daemon.log"),
        ca_roots: None,
        cert_file: None,
        key_file: None,
        transport: TransportKind::Broker,
        broker_url: None,
        topic_prefix: "ygg".to_string(),
        control_url: None,
        data_url: None,
        client_id_source: ClientIdSource::MachineId,
        tags_path: state_dir.join("tags.toml"),
        client_id_path: state_dir.join("client-id"),
    }
}

#[tokio::test]
#[serial]
async fn startup_and_shutdown_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("workers")).unwrap();
    let config = test_config(dir.path());

    let daemon = startup(config).await.expect("startup should succeed with no workers present");
    assert!(!daemon.client_id().is_empty());
    assert!(daemon.socket_addr.exists());

    daemon.shutdown().await;
}

#[tokio::test]
#[serial]
async fn startup_launches_one_supervisor_per_worker_file() {
    let dir = tempfile::tempdir().unwrap();
    let worker_dir = dir.path().join("workers");
    std::fs::create_dir_all(&worker_dir).unwrap();

    let fixture = worker_dir.join("echo-worker");
    std::fs::write(&fixture, b"#!/bin/sh\nexit 0\n").unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&fixture, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    let config = test_config(dir.path());
    let daemon = startup(config).await.expect("startup should succeed");

    assert_eq!(daemon.supervisors.lock().await.len(), 1);

    daemon.shutdown().await;
}

#[test]
fn reap_orphans_is_a_no_op_when_worker_dir_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    reap_orphans(dir.path());
}

#[test]
fn reap_orphans_is_a_no_op_when_worker_dir_is_missing() {
    let dir = tempfile::tempdir().unwrap();
    reap_orphans(&dir.path().join("does-not-exist"));
}

#[test]
fn label_for_uses_the_file_stem() {
    let path = Path::new("/opt/ygg/workers/echo-worker");
    assert_eq!(label_for(path), Handler::new("echo-worker"));
}

#[test]
fn label_for_falls_back_when_there_is_no_stem() {
    let path = Path::new("/");
    assert_eq!(label_for(path), Handler::new("worker"));
}

#[test]
fn spawn_spec_carries_the_worker_environment() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let addr = SocketSpec::Path(dir.path().join("daemon.sock"));
    let label = Handler::new("echo-worker");
    let path = Path::new("/opt/ygg/workers/echo-worker");

    let spec = spawn_spec(path, &label, &addr, &config, "device-123");

    assert_eq!(spec.handler, label);
    assert_eq!(spec.executable, path.to_path_buf());
    assert!(spec.envs.contains(&("YGG_SOCKET_ADDR".to_string(), addr.env_value())));
    assert!(spec.envs.contains(&("BASE_CONFIG_DIR".to_string(), config.sysconf_dir.display().to_string())));
    assert!(spec.envs.contains(&("LOG_LEVEL".to_string(), "error".to_string())));
    assert!(spec.envs.contains(&("DEVICE_ID".to_string(), "device-123".to_string())));
    assert!(spec.envs.iter().any(|(k, _)| k == "PATH"));
}
