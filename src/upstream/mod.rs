//! Upstream inventory API subsystem.
//!
//! # Data Flow
//! ```text
//! (code, date?)
//!     → client.rs (envelope, POST with timeout)
//!     → classify_response (empty / non-JSON / fault / status)
//!     → normalize.rs (lenient field lookups)
//!     → ProductData or UpstreamError
//!     → ServiceError (at the module boundary)
//! ```

pub mod client;
pub mod normalize;
pub mod types;

pub use client::{classify_response, OmieClient};
pub use normalize::normalize;
pub use types::{ProductData, UpstreamError};
