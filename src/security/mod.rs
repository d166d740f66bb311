//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (sliding window per client IP)
//!     → limits.rs (content type, declared body size)
//!     → sanitize.rs (strip unsafe substrings from top-level body strings)
//!     → Pass to validation
//!
//! Outgoing response:
//!     → headers.rs (nosniff, frame and referrer policy)
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any guard failure, before the upstream is touched
//! - No trust in client input
//! - Rate-limit state is in-process only and bounded in size

pub mod headers;
pub mod limits;
pub mod rate_limit;
pub mod sanitize;

pub use limits::RequestGuards;
pub use rate_limit::{RateDecision, RateLimiter};
pub use sanitize::{sanitize, sanitize_body, sanitize_value};
