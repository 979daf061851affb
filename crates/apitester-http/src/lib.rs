//! HTTP collaborators for the apitester engine
//!
//! - [`HttpEntityStateFetcher`]: entity-state lookups against the API under test
//! - [`RequestExecutor`]: sends the request under test
//! - [`HttpConfig`]: connection settings from TOML and `APITESTER_*` variables

pub mod config;
pub mod executor;
pub mod fetcher;

pub use config::HttpConfig;
pub use executor::{parse_body_arg, ExecutedResponse, RequestExecutor};
pub use fetcher::{unwrap_entity_payload, HttpEntityStateFetcher};
