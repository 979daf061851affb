//! Entity-state fetcher backed by the API under test.
//!
//! `GET {api_root}/entity-state?type=<type>&id=<id>`
//!
//! | status        | result                     |
//! |---------------|----------------------------|
//! | 2xx           | `Some(payload)`            |
//! | 404           | `None`                     |
//! | 401 / 403     | `Unauthorised` / `Forbidden` |
//! | anything else | `ExternalService`          |

use crate::config::HttpConfig;
use apitester_core::errors::{ApiTesterError, ExError};
use apitester_core::EntityStateFetcher;
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde_json::Value;

const OP_FETCH: &str = "fetch_entity_state";

pub struct HttpEntityStateFetcher {
    client: reqwest::Client,
    config: HttpConfig,
}

impl HttpEntityStateFetcher {
    /// # Errors
    ///
    /// `InvalidConfig` when the HTTP client cannot be built.
    pub fn new(config: HttpConfig) -> Result<Self, ExError> {
        let client = config.build_client()?;
        Ok(Self { client, config })
    }

    /// Endpoint for one entity, with query parameters encoded.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` when the configured base URL is not a URL.
    pub fn entity_state_url(&self, entity_type: &str, entity_id: &str) -> Result<Url, ExError> {
        entity_state_url(&self.config, entity_type, entity_id)
    }
}

pub(crate) fn entity_state_url(
    config: &HttpConfig,
    entity_type: &str,
    entity_id: &str,
) -> Result<Url, ExError> {
    Url::parse_with_params(
        &format!("{}/entity-state", config.api_root()),
        &[("type", entity_type), ("id", entity_id)],
    )
    .map_err(|e| {
        ExError::from(ApiTesterError::InvalidConfig {
            reason: format!("invalid base URL `{}`: {}", config.base_url, e),
        })
    })
}

/// Error for a status the fetcher does not turn into a value.
pub(crate) fn status_error(status: StatusCode, url: &str) -> Option<ApiTesterError> {
    if status.is_success() || status == StatusCode::NOT_FOUND {
        return None;
    }
    let url = url.to_string();
    Some(match status {
        StatusCode::UNAUTHORIZED => ApiTesterError::Unauthorised { url },
        StatusCode::FORBIDDEN => ApiTesterError::Forbidden { url },
        _ => ApiTesterError::UnexpectedStatus {
            status: status.as_u16(),
            url,
        },
    })
}

/// Unwrap an `{"entity": ...}` envelope; other payloads pass through.
pub fn unwrap_entity_payload(payload: Value) -> Value {
    match payload {
        Value::Object(mut map) if map.contains_key("entity") => {
            map.remove("entity").unwrap_or(Value::Null)
        }
        other => other,
    }
}

pub(crate) fn transport_error(err: reqwest::Error, url: &str) -> ApiTesterError {
    if err.is_timeout() {
        ApiTesterError::Timeout {
            url: url.to_string(),
        }
    } else {
        ApiTesterError::Transport {
            reason: err.to_string(),
        }
    }
}

#[async_trait]
impl EntityStateFetcher for HttpEntityStateFetcher {
    async fn fetch(&self, entity_type: &str, entity_id: &str) -> Result<Option<Value>, ExError> {
        let context = |err: ExError| {
            err.with_op(OP_FETCH)
                .with_entity_type(entity_type)
                .with_entity_id(entity_id)
        };

        let url = self.entity_state_url(entity_type, entity_id).map_err(context)?;

        let mut request = self.client.get(url.clone());
        if let Some(token) = &self.config.auth_token {
            request = request.bearer_auth(token.expose());
        }

        let response = request
            .send()
            .await
            .map_err(|e| context(transport_error(e, url.as_str()).into()))?;

        let status = response.status();
        tracing::debug!(entity_type, entity_id, status = status.as_u16(), "entity-state response");

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if let Some(err) = status_error(status, url.as_str()) {
            return Err(context(err.into()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| context(transport_error(e, url.as_str()).into()))?;
        let payload: Value = serde_json::from_slice(&bytes).map_err(|e| {
            context(
                ApiTesterError::InvalidPayload {
                    reason: format!("entity-state body is not JSON: {}", e),
                }
                .into(),
            )
        })?;

        Ok(Some(unwrap_entity_payload(payload)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_url_encodes_query_parameters() {
        let config = HttpConfig::default();
        let url = entity_state_url(&config, "focusArea", "a b&c").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:3000/api/entity-state?type=focusArea&id=a+b%26c"
        );
    }

    #[test]
    fn test_url_rejects_bad_base() {
        let config = HttpConfig {
            base_url: "not a url".to_string(),
            ..HttpConfig::default()
        };
        assert!(entity_state_url(&config, "user", "u1").is_err());
    }

    #[test]
    fn test_entity_envelope_is_unwrapped() {
        let payload = json!({"entity": {"name": "Al"}, "meta": {"v": 1}});
        assert_eq!(unwrap_entity_payload(payload), json!({"name": "Al"}));
    }

    #[test]
    fn test_bare_payload_passes_through() {
        let payload = json!({"name": "Al"});
        assert_eq!(unwrap_entity_payload(payload.clone()), payload);
        assert_eq!(unwrap_entity_payload(json!([1, 2])), json!([1, 2]));
    }

    #[test]
    fn test_null_envelope_reads_as_null() {
        assert_eq!(unwrap_entity_payload(json!({"entity": null})), Value::Null);
    }

    #[test]
    fn test_status_mapping() {
        let url = "http://x/api/entity-state";
        assert!(status_error(StatusCode::OK, url).is_none());
        assert!(status_error(StatusCode::NOT_FOUND, url).is_none());
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, url),
            Some(ApiTesterError::Unauthorised { .. })
        ));
        assert!(matches!(
            status_error(StatusCode::FORBIDDEN, url),
            Some(ApiTesterError::Forbidden { .. })
        ));
        assert_eq!(
            status_error(StatusCode::BAD_GATEWAY, url),
            Some(ApiTesterError::UnexpectedStatus {
                status: 502,
                url: url.to_string()
            })
        );
    }
}
