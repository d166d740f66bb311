//! Sliding-window rate limiting per client identity.
//!
//! Each client owns an ordered list of request timestamps. On every request,
//! timestamps at or before `now - window` are dropped; the request is allowed
//! if fewer than `max_requests` remain.
//!
//! Memory is bounded two ways: a background sweep drops windows with no
//! recent requests, and a new client arriving at capacity evicts the least
//! recently active window.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;

use crate::config::RateLimitConfig;
use crate::error::ServiceError;
use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics;

/// Identity used when the peer address is unavailable.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Blocked { retry_after_secs: u64 },
}

/// Request timestamps of one client inside the current window.
#[derive(Debug, Default)]
struct RateWindow {
    timestamps: VecDeque<Instant>,
}

impl RateWindow {
    fn prune(&mut self, window_start: Option<Instant>) {
        let Some(start) = window_start else { return };
        while self.timestamps.front().is_some_and(|t| *t <= start) {
            self.timestamps.pop_front();
        }
    }

    fn last_seen(&self) -> Option<Instant> {
        self.timestamps.back().copied()
    }
}

/// In-memory sliding-window limiter.
#[derive(Debug)]
pub struct RateLimiter {
    windows: DashMap<String, RateWindow>,
    window: Duration,
    max_requests: usize,
    max_clients: usize,
}

impl RateLimiter {
    /// Create a limiter. Zero values are raised to the smallest usable value.
    pub fn new(window: Duration, max_requests: usize, max_clients: usize) -> Self {
        Self {
            windows: DashMap::new(),
            window: window.max(Duration::from_millis(1)),
            max_requests: max_requests.max(1),
            max_clients: max_clients.max(1),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(
            Duration::from_millis(config.window_ms),
            config.max_requests,
            config.max_clients,
        )
    }

    /// Check and record a request from `client` at the current time.
    pub fn check(&self, client: &str) -> RateDecision {
        self.check_at(client, Instant::now())
    }

    /// Check and record a request from `client` at `now`.
    pub fn check_at(&self, client: &str, now: Instant) -> RateDecision {
        if !self.windows.contains_key(client) && self.windows.len() >= self.max_clients {
            self.make_room(now);
        }

        let window_start = now.checked_sub(self.window);
        let mut window = self.windows.entry(client.to_string()).or_default();
        window.prune(window_start);

        if window.timestamps.len() >= self.max_requests {
            return RateDecision::Blocked {
                retry_after_secs: self.retry_after_secs(),
            };
        }

        window.timestamps.push_back(now);
        RateDecision::Allowed
    }

    /// Always the full window, rounded up to whole seconds.
    pub fn retry_after_secs(&self) -> u64 {
        let millis = u64::try_from(self.window.as_millis()).unwrap_or(u64::MAX);
        millis.div_ceil(1000)
    }

    /// Drop every window with no request inside the current window.
    ///
    /// Returns the number of client entries removed.
    pub fn sweep(&self, now: Instant) -> usize {
        let window_start = now.checked_sub(self.window);
        let before = self.windows.len();
        self.windows.retain(|_, window| {
            window.prune(window_start);
            !window.timestamps.is_empty()
        });
        before.saturating_sub(self.windows.len())
    }

    fn make_room(&self, now: Instant) {
        let swept = self.sweep(now);
        if self.windows.len() < self.max_clients {
            tracing::debug!(swept, "Rate limiter swept idle clients at capacity");
            return;
        }

        let oldest = self
            .windows
            .iter()
            .min_by_key(|entry| entry.value().last_seen())
            .map(|entry| entry.key().clone());

        if let Some(key) = oldest {
            self.windows.remove(&key);
            tracing::debug!(client = %key, "Rate limiter evicted least recently active client");
        }
    }

    /// Number of tracked client identities.
    pub fn client_count(&self) -> usize {
        self.windows.len()
    }

    /// Forget all clients.
    pub fn clear(&self) {
        self.windows.clear();
    }

    /// Periodically sweep idle windows until shutdown.
    pub async fn run_sweeper(
        self: Arc<Self>,
        interval: Duration,
        mut shutdown: ShutdownSignal,
    ) {
        let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = self.sweep(Instant::now());
                    if removed > 0 {
                        tracing::debug!(removed, remaining = self.client_count(), "Swept idle rate-limit windows");
                    }
                    metrics::record_rate_limit_clients(self.client_count());
                }
                _ = shutdown.wait() => {
                    tracing::info!("Rate-limit sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

/// Client identity of a request: the peer IP, or [`UNKNOWN_CLIENT`].
pub fn client_identity<B>(request: &Request<B>) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Middleware function for per-client rate limiting.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let client = client_identity(&request);

    match limiter.check(&client) {
        RateDecision::Allowed => next.run(request).await,
        RateDecision::Blocked { retry_after_secs } => {
            tracing::warn!(client = %client, retry_after_secs, "Rate limit exceeded");
            metrics::record_rate_limited();
            ServiceError::rate_limited(retry_after_secs).into_response()
        }
    }
}
