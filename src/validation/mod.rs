//! Request validation subsystem.
//!
//! # Data Flow
//! ```text
//! JSON body (already shallow-sanitized)
//!     → pipeline.rs (run every rule, collect every failure)
//!     → rules.rs (pattern → semantic check → normalize, per field)
//!     → ValidatedFields | ServiceError{VALIDATION_ERROR, details}
//! ```
//!
//! # Design Decisions
//! - Collect-all, not fail-fast: one response lists every input problem
//! - Rules are plain data + fn pointers, built once per pipeline
//! - Validation errors never propagate past the pipeline as anything but
//!   one aggregated `ServiceError`

pub mod pipeline;
pub mod rules;

pub use crate::error::ValidationError;
pub use pipeline::{ValidatedFields, ValidationPipeline};
pub use rules::{FieldValue, ValidationRule};
