//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with all handlers
//! - Wire up middleware (request ID, tracing, security headers, guards)
//! - Run the rate-limit sweeper alongside the server
//! - Serve until the shutdown signal fires

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;

use crate::config::GatewayConfig;
use crate::http::product;
use crate::http::request::with_request_id;
use crate::lifecycle::ShutdownSignal;
use crate::security::headers::with_security_headers;
use crate::security::limits::{body_size_guard, content_type_guard};
use crate::security::rate_limit::rate_limit_middleware;
use crate::security::{RateLimiter, RequestGuards};
use crate::upstream::OmieClient;
use crate::validation::ValidationPipeline;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub client: Arc<OmieClient>,
    pub pipeline: Arc<ValidationPipeline>,
    pub guards: Arc<RequestGuards>,
}

/// HTTP server for the product gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    rate_limiter: Arc<RateLimiter>,
}

impl HttpServer {
    /// Create a new HTTP server around an already constructed upstream client.
    pub fn new(config: GatewayConfig, client: Arc<OmieClient>) -> Self {
        let rate_limiter = Arc::new(RateLimiter::from_config(&config.rate_limit));
        let state = AppState {
            client,
            pipeline: Arc::new(ValidationPipeline::product_search()),
            guards: Arc::new(RequestGuards::from_config(&config.limits)),
        };

        let router = Self::build_router(&config, state, rate_limiter.clone());
        Self {
            router,
            config,
            rate_limiter,
        }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Product routes run rate limit, content type, then size guard, in that order.
    fn build_router(config: &GatewayConfig, state: AppState, limiter: Arc<RateLimiter>) -> Router {
        let guards = state.guards.clone();

        let mut product_routes = Router::new()
            .route("/product/search", post(product::search_product))
            .route("/product/test-connection", get(product::test_connection))
            .route("/product/stats", get(product::stats))
            .route_layer(middleware::from_fn_with_state(guards.clone(), body_size_guard))
            .route_layer(middleware::from_fn_with_state(guards, content_type_guard));

        if config.rate_limit.enabled {
            product_routes = product_routes
                .route_layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));
        } else {
            tracing::warn!("Rate limiting is disabled");
        }

        let router = Router::new()
            .route("/health", get(product::health))
            .merge(product_routes)
            .with_state(state);

        with_request_id(with_security_headers(router))
    }

    /// A clone of the fully layered router, for in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn rate_limiter(&self) -> Arc<RateLimiter> {
        self.rate_limiter.clone()
    }

    /// Run the server on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: ShutdownSignal,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let sweeper = self.config.rate_limit.enabled.then(|| {
            let interval = Duration::from_secs(self.config.rate_limit.sweep_interval_secs);
            tokio::spawn(
                self.rate_limiter
                    .clone()
                    .run_sweeper(interval, shutdown.clone()),
            )
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.wait().await;
                tracing::info!("HTTP server received shutdown signal, draining connections");
            })
            .await?;

        if let Some(handle) = sweeper {
            handle.abort();
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
