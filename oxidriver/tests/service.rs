//! Supervisor tests against stand-in driver processes: readiness polling,
//! exit detection, and idempotent shutdown.

#![cfg(unix)]

mod support;

use std::path::PathBuf;

use oxidriver::service::{DriverFlavor, DriverService};
use oxidriver::WebDriverError;
use support::{spawn_remote, Response};

/// Writes an executable shell script standing in for a driver binary.
fn stub_driver(name: &str, contents: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = std::env::temp_dir().join(format!(
        "oxidriver-stub-{}-{}",
        name,
        std::process::id()
    ));
    std::fs::write(&path, format!("#!/bin/sh\n{contents}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[tokio::test]
async fn start_waits_for_readiness_and_stop_kills() {
    // The stub ignores its argv and just stays alive; readiness comes from
    // a status endpoint listening on the configured port.
    let remote = spawn_remote(|req| {
        assert_eq!(req.path, "/status");
        Response::json(200, r#"{"value":{"ready":true}}"#)
    })
    .await;
    let script = stub_driver("ready", "exec sleep 30");

    let mut service = DriverService::builder(&script, DriverFlavor::Generic)
        .port(remote.addr.port())
        .start()
        .await
        .unwrap();

    assert_eq!(service.port(), remote.addr.port());
    assert!(service.is_running());
    assert!(service.url().starts_with("http://localhost:"));

    service.stop().await.unwrap();
    assert!(!service.is_running());

    // Stop is idempotent.
    service.stop().await.unwrap();

    let _ = std::fs::remove_file(script);
}

#[tokio::test]
async fn legacy_status_codes_count_as_ready() {
    let remote = spawn_remote(|_| Response::json(403, r#"{"value":{}}"#)).await;
    let script = stub_driver("legacy", "exec sleep 30");

    let mut service = DriverService::builder(&script, DriverFlavor::Generic)
        .port(remote.addr.port())
        .start()
        .await
        .unwrap();
    service.stop().await.unwrap();

    let _ = std::fs::remove_file(script);
}

#[tokio::test]
async fn early_exit_is_reported_with_the_status() {
    let script = stub_driver("exits", "exit 3");

    let err = DriverService::builder(&script, DriverFlavor::Generic)
        .port(0)
        .start()
        .await
        .unwrap_err();
    match err {
        WebDriverError::DriverExited(code) => assert_eq!(code, Some(3)),
        other => panic!("expected DriverExited, got {other:?}"),
    }

    let _ = std::fs::remove_file(script);
}

#[tokio::test]
async fn missing_executable_fails_to_spawn() {
    let err = DriverService::builder("/nonexistent/driver-binary", DriverFlavor::Geckodriver)
        .port(0)
        .start()
        .await
        .unwrap_err();
    assert!(matches!(err, WebDriverError::Io(_)));
}
