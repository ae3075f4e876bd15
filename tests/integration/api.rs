use serde_json::json;

use crate::*;

#[tokio::test]
async fn test_status_reports_topology_and_strategies() {
    let d = start_daemon("status", SelectionConfig::default()).await.unwrap();

    let (code, _) = d.post("/services", &json!({ "service": "storage" })).await.unwrap();
    assert_eq!(code, 200);
    d.register("storage", "a", None, status(10, 0, 1.0, 0)).await.unwrap();

    let (code, body) = d.get("/status").await.unwrap();
    assert_eq!(code, 200);
    assert_eq!(body["services"], 1);
    assert_eq!(body["nodes"], 2, "root plus one provider");
    assert_eq!(body["default_strategy"], "cheapest");
    let strategies: Vec<&str> = body["strategies"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s.as_str().unwrap())
        .collect();
    assert!(strategies.contains(&"lowest-latency"));
    assert!(strategies.contains(&"composite"));
}

#[tokio::test]
async fn test_services_listing_and_duplicate_root() {
    let d = start_daemon("services", SelectionConfig::default()).await.unwrap();

    d.post("/services", &json!({ "service": "storage" })).await.unwrap();
    d.post("/services", &json!({ "service": "compute" })).await.unwrap();
    d.register("storage", "a", None, status(1, 0, 1.0, 0)).await.unwrap();
    d.register("storage", "b", None, status(1, 0, 1.0, 0)).await.unwrap();

    let (code, body) = d.get("/services").await.unwrap();
    assert_eq!(code, 200);
    assert_eq!(
        body["services"],
        json!([
            { "service": "compute", "providers": 0 },
            { "service": "storage", "providers": 2 },
        ])
    );

    let (code, body) = d.post("/services", &json!({ "service": "storage" })).await.unwrap();
    assert_eq!(code, 409);
    assert_eq!(body["error"], "root_exists");

    let (code, _) = d.post("/services", &json!({ "service": "  " })).await.unwrap();
    assert_eq!(code, 400);
}

#[tokio::test]
async fn test_register_under_unknown_service() {
    let d = start_daemon("register-unknown", SelectionConfig::default()).await.unwrap();

    let (code, body) = d
        .post(
            "/nodes",
            &json!({ "name": "a", "service": "nope", "endpoint": "https://a" }),
        )
        .await
        .unwrap();
    assert_eq!(code, 404);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_node_lifecycle() {
    let d = start_daemon("lifecycle", SelectionConfig::default()).await.unwrap();
    d.post("/services", &json!({ "service": "storage" })).await.unwrap();

    let a = d.register("storage", "a", None, status(5, 0, 2.0, 0)).await.unwrap();
    let b = d.register("storage", "b", Some(&a), status(5, 0, 1.0, 0)).await.unwrap();

    let (code, info) = d.get(&format!("/nodes/{a}")).await.unwrap();
    assert_eq!(code, 200);
    assert_eq!(info["name"], "a");
    assert_eq!(info["children"], json!([b.clone()]));

    let (code, info) = d
        .put(&format!("/nodes/{b}/endpoint"), &json!({ "endpoint": "https://b2" }))
        .await
        .unwrap();
    assert_eq!(code, 200);
    assert_eq!(info["endpoint"], "https://b2");

    let (code, body) = d
        .put(&format!("/nodes/{b}/status"), &status(9, 3, 4.5, 10))
        .await
        .unwrap();
    assert_eq!(code, 200);
    assert_eq!(body["disconnect_count"], 3);
    let node = d.topology.get(&dweb_core::NodeId::from(b.as_str())).unwrap();
    assert_eq!(node.status().pledge, 10);

    let (code, body) = d
        .put(&format!("/nodes/{b}/status"), &status(9, 3, -1.0, 10))
        .await
        .unwrap();
    assert_eq!(code, 400, "negative fee rejected: {body}");

    let (code, body) = d.delete(&format!("/nodes/{b}")).await.unwrap();
    assert_eq!(code, 200);
    assert_eq!(body["service"], "storage");

    let (code, body) = d.get(&format!("/nodes/{b}")).await.unwrap();
    assert_eq!(code, 404);
    assert_eq!(body["error"], "unknown_node");

    let (_, info) = d.get(&format!("/nodes/{a}")).await.unwrap();
    assert_eq!(info["children"], json!([]), "edge to removed node pruned");
}

#[tokio::test]
async fn test_register_rejects_invalid_fee() {
    let d = start_daemon("register-fee", SelectionConfig::default()).await.unwrap();
    d.post("/services", &json!({ "service": "storage" })).await.unwrap();
    d.register("storage", "ok", None, status(5, 0, 2.0, 0)).await.unwrap();

    let (code, body) = d
        .post(
            "/nodes",
            &json!({
                "name": "cheat",
                "service": "storage",
                "endpoint": "https://cheat",
                "status": status(5, 0, -1.0, 0),
            }),
        )
        .await
        .unwrap();
    assert_eq!(code, 400);
    assert_eq!(body["error"], "invalid_fee");

    let (code, body) = d.get("/select/storage?strategy=cheapest").await.unwrap();
    assert_eq!(code, 200, "selection still works: {body}");
    assert_eq!(body["node"]["name"], "ok");

    let (_, body) = d.get("/services").await.unwrap();
    assert_eq!(body["services"], json!([{ "service": "storage", "providers": 1 }]));
}

#[tokio::test]
async fn test_removing_parent_deregisters_orphans() {
    let d = start_daemon("remove-orphans", SelectionConfig::default()).await.unwrap();
    d.post("/services", &json!({ "service": "storage" })).await.unwrap();

    let a = d.register("storage", "a", None, status(1, 0, 1.0, 0)).await.unwrap();
    let b = d.register("storage", "b", Some(&a), status(1, 0, 1.0, 0)).await.unwrap();
    let c = d.register("storage", "c", None, status(1, 0, 1.0, 0)).await.unwrap();

    let (code, _) = d.delete(&format!("/nodes/{a}")).await.unwrap();
    assert_eq!(code, 200);

    let (code, _) = d.get(&format!("/nodes/{b}")).await.unwrap();
    assert_eq!(code, 404, "only parent gone, child goes too");
    let (code, _) = d.get(&format!("/nodes/{c}")).await.unwrap();
    assert_eq!(code, 200);

    let (_, body) = d.get("/services").await.unwrap();
    assert_eq!(body["services"], json!([{ "service": "storage", "providers": 1 }]));
}

#[tokio::test]
async fn test_link_rejects_cross_service_edges() {
    let d = start_daemon("link", SelectionConfig::default()).await.unwrap();
    d.post("/services", &json!({ "service": "storage" })).await.unwrap();
    d.post("/services", &json!({ "service": "compute" })).await.unwrap();

    let a = d.register("storage", "a", None, status(1, 0, 1.0, 0)).await.unwrap();
    let b = d.register("storage", "b", None, status(1, 0, 1.0, 0)).await.unwrap();
    let c = d.register("compute", "c", None, status(1, 0, 1.0, 0)).await.unwrap();

    let (code, info) = d
        .post(&format!("/nodes/{a}/link"), &json!({ "child": b }))
        .await
        .unwrap();
    assert_eq!(code, 200);
    assert_eq!(info["children"], json!([b]));

    let (code, body) = d
        .post(&format!("/nodes/{a}/link"), &json!({ "child": c }))
        .await
        .unwrap();
    assert_eq!(code, 400);
    assert_eq!(body["error"], "service_mismatch");
}

#[tokio::test]
async fn test_non_hex_node_id_rejected() {
    let d = start_daemon("bad-id", SelectionConfig::default()).await.unwrap();
    let (code, _) = d.get("/nodes/not-an-id").await.unwrap();
    assert_eq!(code, 400);
}

#[tokio::test]
async fn test_shutdown_stops_server() {
    let d = start_daemon("shutdown", SelectionConfig::default()).await.unwrap();

    let (code, body) = d.post("/daemon/shutdown", &json!({})).await.unwrap();
    assert_eq!(code, 200);
    assert_eq!(body["status"], "shutting_down");

    let TestDaemon { server, .. } = &d;
    let joined = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        while !server.is_finished() {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(joined.is_ok(), "server did not stop after shutdown");
}
