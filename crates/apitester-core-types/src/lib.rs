//! Core types shared across apitester facilities
//!
//! This crate provides foundational types used by the error, logging and
//! snapshot facilities:
//!
//! - **Correlation types**: RequestId for tagging a snapshot cycle
//! - **Sensitive data**: Sensitive<T> marker for automatic redaction
//! - **Schema constants**: Canonical field keys and event names

pub mod correlation;
pub mod schema;
pub mod sensitive;

pub use correlation::RequestId;
pub use sensitive::Sensitive;
