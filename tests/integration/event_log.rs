use serde_json::json;

use dweb_core::config::EventLogConfig;
use dweb_services::EventLog;

use crate::*;

#[tokio::test]
async fn test_log_endpoint_appends_records() {
    let d = start_daemon("log", SelectionConfig::default()).await.unwrap();

    let resp = reqwest::Client::new()
        .post(format!("{}/log", d.base))
        .body("node 7f3a joined storage")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let events = d.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["level"], "info");
    assert_eq!(events[0]["message"], "node 7f3a joined storage");
    assert_eq!(events[0]["msg"], "");
    assert!(events[0]["time"].is_string());
}

#[tokio::test]
async fn test_log_endpoint_rejects_empty_and_non_post() {
    let d = start_daemon("log-reject", SelectionConfig::default()).await.unwrap();

    let resp = reqwest::Client::new()
        .post(format!("{}/log", d.base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    let (code, _) = d.get("/log").await.unwrap();
    assert_eq!(code, 404);

    let (code, _) = d.put("/log", &json!("x")).await.unwrap();
    assert_eq!(code, 404);

    assert!(d.events().is_empty());
}

#[tokio::test]
async fn test_root_log_route_accepts_records() {
    let d = start_daemon("log-root", SelectionConfig::default()).await.unwrap();
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/log", d.origin))
        .body("relay 19cc went offline")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let resp = client.post(format!("{}/log", d.origin)).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    let resp = client.get(format!("{}/log", d.origin)).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 404);

    let events = d.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["message"], "relay 19cc went offline");
}

#[tokio::test(flavor = "current_thread")]
async fn test_log_endpoint_rotates_without_stalling_server() {
    let d = start_daemon_with_log(
        "log-rotate-http",
        SelectionConfig::default(),
        EventLogConfig {
            max_size_mb: 1,
            max_backups: 2,
            max_age_days: 0,
            compress: true,
            ..EventLogConfig::default()
        },
    )
    .await
    .unwrap();
    let client = reqwest::Client::new();

    // Each body is a bit over half a megabyte, so every write after the
    // first rotates and gzips a backup. The single runtime thread must keep
    // serving while that happens.
    let big = "y".repeat(600 * 1024);
    for _ in 0..4 {
        let resp = client
            .post(format!("{}/log", d.base))
            .body(big.clone())
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 200);
        let (code, _) = d.get("/status").await.unwrap();
        assert_eq!(code, 200);
    }

    let backups = d.event_log.backups();
    assert_eq!(backups.len(), 2);
    assert!(backups.iter().all(|b| b.compressed));
    assert_eq!(d.events().len(), 1);
}

#[test]
fn test_rotation_compresses_and_prunes_backups() {
    let dir = scratch_dir("rotate");
    let log = EventLog::open(EventLogConfig {
        path: dir.join("events.log"),
        max_size_mb: 1,
        max_backups: 2,
        max_age_days: 0,
        compress: true,
    })
    .unwrap();

    // Each record is a bit over half a megabyte, so every write rotates.
    let big = "x".repeat(600 * 1024);
    for _ in 0..5 {
        log.record(&big).unwrap();
    }
    log.shutdown().unwrap();

    let backups = log.backups();
    assert_eq!(backups.len(), 2, "only the newest backups are kept");
    assert!(backups.iter().all(|b| b.compressed));
    assert!(backups[0].rotated_at > backups[1].rotated_at);

    let active = std::fs::read_to_string(dir.join("events.log")).unwrap();
    assert_eq!(active.lines().count(), 1);

    let _ = std::fs::remove_dir_all(&dir);
}
