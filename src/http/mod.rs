//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, layers, graceful shutdown)
//!     → request.rs (request ID, per-request span)
//!     → security guards (rate limit, content type, size)
//!     → product.rs (handlers)
//!     → response.rs (envelopes)
//!     → Send to client
//! ```

pub mod product;
pub mod request;
pub mod response;
pub mod server;

pub use request::{with_request_id, RequestIdExt, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
