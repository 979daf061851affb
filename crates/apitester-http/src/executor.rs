//! Fires the request under test between the two snapshots.
//!
//! Single attempt, no retry. Any HTTP status is a successful execution; the
//! caller decides what a 4xx or 5xx means for the probe.

use crate::config::HttpConfig;
use crate::fetcher::transport_error;
use apitester_core::errors::{ApiTesterError, ExError, ExErrorKind};
use apitester_core::{log_op_end, log_op_error, log_op_start, RequestDescriptor};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;

const OP_EXECUTE: &str = "execute_request";

/// Status and decoded body of the executed request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutedResponse {
    pub status: u16,
    /// JSON body, or the raw text as a JSON string; `None` when empty
    pub body: Option<Value>,
}

impl ExecutedResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub struct RequestExecutor {
    client: reqwest::Client,
    config: HttpConfig,
}

impl RequestExecutor {
    /// # Errors
    ///
    /// `InvalidConfig` when the HTTP client cannot be built.
    pub fn new(config: HttpConfig) -> Result<Self, ExError> {
        let client = config.build_client()?;
        Ok(Self { client, config })
    }

    /// Send `request` to `{api_root}{path}`.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for a missing path or unknown method, `Timeout` or
    /// `ExternalService` when the request never completes.
    pub async fn execute(&self, request: &RequestDescriptor) -> Result<ExecutedResponse, ExError> {
        let started = Instant::now();
        let method = parse_method(request.method.as_deref())?;
        let url = request_url(&self.config, request)?;
        log_op_start!(OP_EXECUTE, method = %method, url = %url);

        let result = self.send(method, &url, request.body.as_ref()).await;
        let duration_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(response) => {
                log_op_end!(OP_EXECUTE, duration_ms = duration_ms, status = response.status);
            }
            Err(err) => {
                log_op_error!(OP_EXECUTE, err.clone(), duration_ms = duration_ms);
            }
        }
        result
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<ExecutedResponse, ExError> {
        let mut builder = self.client.request(method, url);
        if let Some(token) = &self.config.auth_token {
            builder = builder.bearer_auth(token.expose());
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ExError::from(transport_error(e, url)).with_op(OP_EXECUTE))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| ExError::from(transport_error(e, url)).with_op(OP_EXECUTE))?;

        Ok(ExecutedResponse {
            status,
            body: decode_body(&text),
        })
    }
}

fn parse_method(method: Option<&str>) -> Result<Method, ExError> {
    let Some(raw) = method.map(str::trim).filter(|m| !m.is_empty()) else {
        return Ok(Method::GET);
    };
    Method::from_bytes(raw.to_ascii_uppercase().as_bytes()).map_err(|_| {
        ExError::new(ExErrorKind::InvalidInput)
            .with_op(OP_EXECUTE)
            .with_message(format!("unsupported HTTP method `{}`", raw))
    })
}

fn request_url(config: &HttpConfig, request: &RequestDescriptor) -> Result<String, ExError> {
    let path = request
        .path
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| {
            ExError::new(ExErrorKind::InvalidInput)
                .with_op(OP_EXECUTE)
                .with_message("request has no path")
        })?;

    if path.starts_with('/') {
        Ok(format!("{}{}", config.api_root(), path))
    } else {
        Ok(format!("{}/{}", config.api_root(), path))
    }
}

fn decode_body(text: &str) -> Option<Value> {
    if text.trim().is_empty() {
        return None;
    }
    match serde_json::from_str(text) {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::debug!(len = text.len(), "response body is not JSON, keeping text");
            Some(Value::String(text.to_string()))
        }
    }
}

/// Parse a `--body` argument.
///
/// # Errors
///
/// `Serialization` when `raw` is not JSON.
pub fn parse_body_arg(raw: &str) -> Result<Value, ExError> {
    serde_json::from_str(raw).map_err(|e| {
        ExError::from(ApiTesterError::InvalidPayload {
            reason: format!("request body is not JSON: {}", e),
        })
        .with_op(OP_EXECUTE)
    })
}
