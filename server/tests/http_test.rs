use gnn::{Architecture, GnnClassifier, LayerWeights, ModelWeights};
use graphclass_core::config::{LimitsConfig, ModelConfig};
use graphclass_core::metrics::MetricsCollector;
use pipeline::{ModelHandle, Predictor};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tempfile::tempdir;
use tokio::net::TcpListener;

fn weights() -> ModelWeights {
    let arch = Architecture::default();
    let layer = |out: usize, inp: usize, seed: f32| {
        LayerWeights::new(
            out as u32,
            inp as u32,
            (0..out * inp)
                .map(|i| ((i as f32 + seed) * 0.53).sin() * 0.5)
                .collect(),
            vec![0.0; out],
        )
    };
    ModelWeights::new(
        layer(arch.hidden_dim, arch.input_dim, 0.5),
        layer(arch.hidden_dim, arch.hidden_dim, 1.5),
        layer(arch.output_dim, arch.hidden_dim, 2.5),
    )
}

async fn spawn_server(handle: ModelHandle) -> SocketAddr {
    let predictor = Predictor::new(handle, LimitsConfig::default(), MetricsCollector::new(32));
    let app = server::router(Arc::new(predictor), 1024 * 1024);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn spawn_with_weights_file() -> (SocketAddr, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("model.rkyv");
    weights().save(&path).unwrap();

    let config = ModelConfig {
        weights_path: path,
        input_dim: 1,
        hidden_dim: 64,
        output_dim: 3,
        preload: true,
    };
    let model = GnnClassifier::from_config(&config).unwrap();
    let addr = spawn_server(ModelHandle::new(Arc::new(model))).await;
    (addr, dir)
}

#[tokio::test]
async fn test_health_check() {
    let (addr, _dir) = spawn_with_weights_file().await;

    let response = reqwest::get(format!("http://{addr}/")).await.unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "health_check": "OK" }));
}

#[tokio::test]
async fn test_predict_valid_graph() {
    let (addr, _dir) = spawn_with_weights_file().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("http://{addr}/predict"))
        .json(&json!({ "edges": [[0, 1], [1, 2], [2, 0]] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    let label = body["graph_class"].as_str().unwrap();
    assert!(["tree", "dag", "cyclic"].contains(&label), "got {label}");
}

#[tokio::test]
async fn test_predict_rejects_bad_input() {
    let (addr, _dir) = spawn_with_weights_file().await;
    let client = reqwest::Client::new();

    for body in [r#"{}"#, r#"{"edges": []}"#, r#"{"edges": [[0]]}"#, "not json"] {
        let response = client
            .post(format!("http://{addr}/predict"))
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400, "body {body}");

        let error: Value = response.json().await.unwrap();
        assert_eq!(error["error_code"], "INVALID_ARGUMENT");
        assert!(error["detail"].as_str().unwrap().starts_with("invalid input"));
    }
}

#[tokio::test]
async fn test_missing_weights_is_unavailable() {
    let dir = tempdir().unwrap();
    let handle = ModelHandle::lazy(ModelConfig {
        weights_path: dir.path().join("absent.rkyv"),
        input_dim: 1,
        hidden_dim: 64,
        output_dim: 3,
        preload: false,
    });
    let addr = spawn_server(handle).await;

    let health = reqwest::get(format!("http://{addr}/")).await.unwrap();
    assert_eq!(health.status(), 200);

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/predict"))
        .json(&json!({ "edges": [[0, 1]] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 503);
    let error: Value = response.json().await.unwrap();
    assert_eq!(error["error_code"], "UNAVAILABLE");
}

#[tokio::test]
async fn test_metrics_reflect_requests() {
    let (addr, _dir) = spawn_with_weights_file().await;
    let client = reqwest::Client::new();

    for edges in [json!([[0, 1]]), json!([[0, 1], [1, 0]]), json!([])] {
        client
            .post(format!("http://{addr}/predict"))
            .json(&json!({ "edges": edges }))
            .send()
            .await
            .unwrap();
    }

    let metrics: Value = reqwest::get(format!("http://{addr}/metrics"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(metrics["total_predictions"], 3);
    assert_eq!(metrics["failures"], 1);
    assert_eq!(metrics["history_count"], 3);
}
