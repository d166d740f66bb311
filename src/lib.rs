//! Product lookup gateway library.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;
pub mod upstream;
pub mod validation;

pub use config::schema::GatewayConfig;
pub use error::{ErrorCode, ServiceError, ServiceResult};
pub use http::HttpServer;
pub use lifecycle::{Shutdown, ShutdownSignal};
pub use upstream::OmieClient;
