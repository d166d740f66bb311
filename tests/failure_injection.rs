//! Failure injection tests: upstream misbehaviour must map to stable error codes.

use std::time::{Duration, Instant};

use serde_json::{json, Value};

mod common;

use common::{closed_port, gateway_config, http_client, start_fixed_upstream, start_gateway, start_stub_upstream};

async fn search(gateway: std::net::SocketAddr) -> (u16, Value) {
    let res = http_client()
        .post(format!("http://{}/product/search", gateway))
        .json(&json!({"productCode": "PRD00003"}))
        .send()
        .await
        .expect("Gateway unreachable");
    let status = res.status().as_u16();
    (status, res.json().await.unwrap())
}

#[tokio::test]
async fn test_upstream_timeout_is_gateway_timeout() {
    let (upstream, _) = start_stub_upstream(|_| async {
        tokio::time::sleep(Duration::from_secs(3)).await;
        (200, "{}".to_string())
    })
    .await;
    let mut config = gateway_config(upstream);
    config.upstream.timeout_secs = 1;
    let (gateway, _shutdown) = start_gateway(config).await;

    let started = Instant::now();
    let (status, body) = search(gateway).await;

    assert_eq!(status, 504);
    assert_eq!(body["code"], "OMIE_API_ERROR");
    assert!(started.elapsed() < Duration::from_secs(3), "Timeout was not enforced");
}

#[tokio::test]
async fn test_connection_refused_is_service_unavailable() {
    let upstream = closed_port().await;
    let (gateway, _shutdown) = start_gateway(gateway_config(upstream)).await;

    let (status, body) = search(gateway).await;

    assert_eq!(status, 503);
    assert_eq!(body["code"], "OMIE_API_ERROR");
    assert!(!body["error"].as_str().unwrap().contains("127.0.0.1"));
}

#[tokio::test]
async fn test_html_error_page_is_bad_gateway() {
    let (upstream, _) =
        start_fixed_upstream(500, "<html><body><h1>Internal Server Error</h1></body></html>").await;
    let (gateway, _shutdown) = start_gateway(gateway_config(upstream)).await;

    let (status, body) = search(gateway).await;

    assert_eq!(status, 502);
    assert_eq!(body["code"], "OMIE_API_ERROR");
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("non-JSON error response (HTTP 500)"));
}

#[tokio::test]
async fn test_empty_success_body_is_bad_gateway() {
    let (upstream, _) = start_fixed_upstream(200, "").await;
    let (gateway, _shutdown) = start_gateway(gateway_config(upstream)).await;

    let (status, body) = search(gateway).await;

    assert_eq!(status, 502);
    assert_eq!(body["code"], "OMIE_API_ERROR");
}

#[tokio::test]
async fn test_non_object_payload_is_bad_gateway() {
    let (upstream, _) = start_fixed_upstream(200, "[]").await;
    let (gateway, _shutdown) = start_gateway(gateway_config(upstream)).await;

    let (status, body) = search(gateway).await;

    assert_eq!(status, 502);
    assert_eq!(body["code"], "OMIE_API_ERROR");
}

#[tokio::test]
async fn test_error_status_without_fault_is_bad_gateway() {
    let (upstream, _) = start_fixed_upstream(503, "{}").await;
    let (gateway, _shutdown) = start_gateway(gateway_config(upstream)).await;

    let (status, body) = search(gateway).await;

    assert_eq!(status, 502);
    assert_eq!(body["error"], "Inventory API returned HTTP 503");
}

#[tokio::test]
async fn test_test_connection_reports_unreachable_upstream() {
    let upstream = closed_port().await;
    let (gateway, _shutdown) = start_gateway(gateway_config(upstream)).await;

    let res = http_client()
        .get(format!("http://{}/product/test-connection", gateway))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["connected"], false);
}

#[tokio::test]
async fn test_gateway_stops_on_shutdown() {
    let (upstream, _) = start_fixed_upstream(200, "{}").await;
    let (gateway, shutdown) = start_gateway(gateway_config(upstream)).await;
    let client = reqwest::Client::builder()
        .no_proxy()
        .pool_max_idle_per_host(0)
        .build()
        .unwrap();

    let res = client.get(format!("http://{}/health", gateway)).send().await.unwrap();
    assert_eq!(res.status(), 200);

    shutdown.trigger();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let res = client.get(format!("http://{}/health", gateway)).send().await;
    assert!(res.is_err(), "Gateway still accepting after shutdown");
}

#[tokio::test]
async fn test_error_field_on_success_status_is_not_found() {
    let (upstream, _) = start_fixed_upstream(200, r#"{"error": "Produto não encontrado"}"#).await;
    let (gateway, _shutdown) = start_gateway(gateway_config(upstream)).await;

    let (status, body) = search(gateway).await;

    assert_eq!(status, 404);
    assert_eq!(body["code"], "PRODUCT_NOT_FOUND");
}
