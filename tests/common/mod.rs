//! Shared utilities for integration tests.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{body::Bytes, http::StatusCode, routing::post, Router};
use product_gateway::config::{GatewayConfig, UpstreamConfig};
use product_gateway::http::HttpServer;
use product_gateway::lifecycle::Shutdown;
use product_gateway::upstream::OmieClient;
use serde_json::Value;
use tokio::net::TcpListener;

/// Path the stub upstream serves, mirroring the real stock endpoint.
pub const UPSTREAM_PATH: &str = "/api/v1/estoque/consulta/";

/// Requests received by a stub upstream, as parsed JSON.
pub type Recorded = Arc<Mutex<Vec<Value>>>;

/// Start a programmable stub upstream on an ephemeral port.
///
/// `f` receives the decoded request envelope and returns `(status, body)`.
#[allow(dead_code)]
pub async fn start_stub_upstream<F, Fut>(f: F) -> (SocketAddr, Recorded)
where
    F: Fn(Value) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let recorded: Recorded = Arc::new(Mutex::new(Vec::new()));
    let log = recorded.clone();

    let app = Router::new().route(
        UPSTREAM_PATH,
        post(move |body: Bytes| {
            let f = f.clone();
            let log = log.clone();
            async move {
                let request: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
                log.lock().unwrap().push(request.clone());
                let (status, body) = f(request).await;
                (StatusCode::from_u16(status).unwrap(), body)
            }
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (addr, recorded)
}

/// Stub upstream that always answers with the same status and body.
#[allow(dead_code)]
pub async fn start_fixed_upstream(status: u16, body: &'static str) -> (SocketAddr, Recorded) {
    start_stub_upstream(move |_| async move { (status, body.to_string()) }).await
}

/// An address nothing is listening on.
#[allow(dead_code)]
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Gateway config pointed at `upstream`.
pub fn gateway_config(upstream: SocketAddr) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.upstream = UpstreamConfig {
        base_url: format!("http://{}{}", upstream, UPSTREAM_PATH),
        app_key: "test-key".into(),
        app_secret: "test-secret".into(),
        timeout_secs: 5,
    };
    config
}

/// Start the gateway on an ephemeral port.
///
/// The server stops when the returned `Shutdown` is triggered or dropped, so keep it bound.
pub async fn start_gateway(config: GatewayConfig) -> (SocketAddr, Shutdown) {
    let client = Arc::new(OmieClient::new(&config.upstream).unwrap());
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let server = HttpServer::new(config, client);
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

/// HTTP client that never goes through a proxy.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
