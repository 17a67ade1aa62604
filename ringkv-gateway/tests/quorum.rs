use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use ringkv_base::config::{ClusterParams, GatewayConfig, NodeConfig};
use ringkv_gateway::{build_router, AppState};
use ringkv_membership::{MembershipSnapshot, NodeState};
use ringkv_store::memory::MemoryStore;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower::ServiceExt;

/// Starts a real `ringkv-node` HTTP server on an ephemeral port, already
/// marked `ready`, so the gateway's `reqwest`-based fan-out has a genuine
/// peer to talk to.
async fn spawn_node(replication_factor: usize, num_vnodes: usize) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let node_addr = format!("http://{addr}");

    let config = NodeConfig {
        node_addr: node_addr.clone(),
        listen_addr: addr,
        seed_node: None,
        db_file: "/dev/null".into(),
        max_in_flight: 16,
        dead_timeout: Duration::from_secs(30),
        cluster: ClusterParams { replication_factor, num_vnodes },
    };
    let store = Arc::new(MemoryStore::new());
    let state = Arc::new(ringkv_node::AppState::new(store, config));
    state.membership.mark_ready(&node_addr);

    let app = ringkv_node::build_router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    node_addr
}

fn gateway_config(seed_node: &str, replication_factor: usize, num_vnodes: usize) -> GatewayConfig {
    GatewayConfig {
        listen_addr: "0.0.0.0:0".parse().unwrap(),
        seed_node: seed_node.to_string(),
        in_flight_limit: 100,
        ring_update_interval: Duration::from_secs(2),
        ring_stable_period: Duration::from_secs(5),
        cluster: ClusterParams { replication_factor, num_vnodes },
    }
}

fn ready_snapshot(addrs: &[String]) -> MembershipSnapshot {
    let mut snap = MembershipSnapshot::default();
    for addr in addrs {
        snap.nodes.insert(addr.clone());
        snap.states.insert(addr.clone(), NodeState::Ready);
    }
    snap
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn set_then_get_reaches_quorum_across_three_nodes() {
    let nodes = vec![spawn_node(3, 16).await, spawn_node(3, 16).await, spawn_node(3, 16).await];
    let state = Arc::new(AppState::new(gateway_config(&nodes[0], 3, 16)));
    state.membership.replace_snapshot(ready_snapshot(&nodes));
    let app = build_router(state);

    let set_req = Request::builder()
        .method("POST")
        .uri("/set")
        .header("content-type", "application/json")
        .body(Body::from(json!({"key":"k","value":"v1"}).to_string()))
        .unwrap();
    let response = app.clone().oneshot(set_req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["result"], "ok");
    assert!(body["successes"].as_u64().unwrap() >= 2);

    let get_req = Request::builder().uri("/get?key=k").body(Body::empty()).unwrap();
    let response = app.oneshot(get_req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["value"], "v1");
}

#[tokio::test]
async fn write_still_succeeds_with_a_shrunk_owner_set() {
    // Replication factor of 3 configured, but only one node is actually
    // ready: owners(key) returns just that node, quorum degrades to 1.
    let nodes = vec![spawn_node(3, 16).await];
    let state = Arc::new(AppState::new(gateway_config(&nodes[0], 3, 16)));
    state.membership.replace_snapshot(ready_snapshot(&nodes));
    let app = build_router(state);

    let set_req = Request::builder()
        .method("POST")
        .uri("/set")
        .header("content-type", "application/json")
        .body(Body::from(json!({"key":"k","value":"v1"}).to_string()))
        .unwrap();
    let response = app.oneshot(set_req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["successes"], 1);
}

#[tokio::test]
async fn an_unstable_ring_is_rejected_with_503() {
    let state = Arc::new(AppState::new(gateway_config("http://127.0.0.1:1", 3, 16)));
    let app = build_router(state);

    let req = Request::builder()
        .method("POST")
        .uri("/set")
        .header("content-type", "application/json")
        .body(Body::from(json!({"key":"k","value":"v1"}).to_string()))
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn get_on_an_unknown_key_is_not_found() {
    let nodes = vec![spawn_node(3, 16).await];
    let state = Arc::new(AppState::new(gateway_config(&nodes[0], 3, 16)));
    state.membership.replace_snapshot(ready_snapshot(&nodes));
    let app = build_router(state);

    let req = Request::builder().uri("/get?key=missing").body(Body::empty()).unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn ring_endpoint_reports_vnodes_and_node_refs() {
    let nodes = vec![spawn_node(3, 16).await, spawn_node(3, 16).await];
    let state = Arc::new(AppState::new(gateway_config(&nodes[0], 3, 16)));
    state.membership.replace_snapshot(ready_snapshot(&nodes));
    let app = build_router(state);

    let req = Request::builder().uri("/ring").body(Body::empty()).unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["ring"].as_array().unwrap().len(), 32);
    assert_eq!(body["node_refs"].as_array().unwrap().len(), 2);
}
