//! HTTP fetcher and executor against a canned-response server.

mod common;

use apitester_core::errors::ExErrorKind;
use apitester_core::{
    DomainStateManager, EntityStateFetcher, NoopEventPublisher, RequestDescriptor,
};
use apitester_core_types::Sensitive;
use apitester_http::{HttpEntityStateFetcher, RequestExecutor};
use common::{config_for, StubServer};
use axum::http::Method;
use serde_json::{json, Value};
use std::sync::Arc;

#[tokio::test]
async fn test_fetch_unwraps_entity_envelope() {
    let (addr, server) = StubServer::new()
        .route("/api/entity-state?type=user&id=u1", &[(200, r#"{"entity":{"name":"Al"}}"#)])
        .start()
        .await;

    let fetcher = HttpEntityStateFetcher::new(config_for(addr)).unwrap();
    let state = fetcher.fetch("user", "u1").await.unwrap();

    assert_eq!(state, Some(json!({"name": "Al"})));
    let seen = &server.requests()[0];
    assert_eq!(seen.method, Method::GET);
    assert_eq!(seen.target, "/api/entity-state?type=user&id=u1");
    assert_eq!(seen.authorization, None);
}

#[tokio::test]
async fn test_fetch_sends_bearer_token() {
    let (addr, server) = StubServer::new()
        .route("/api/entity-state", &[(200, r#"{"name":"Al"}"#)])
        .start()
        .await;

    let mut config = config_for(addr);
    config.auth_token = Some(Sensitive::new("tok-123".to_string()));
    let fetcher = HttpEntityStateFetcher::new(config).unwrap();
    fetcher.fetch("user", "u1").await.unwrap();

    assert_eq!(
        server.requests()[0].authorization.as_deref(),
        Some("Bearer tok-123")
    );
}

#[tokio::test]
async fn test_not_found_is_none() {
    let (addr, _server) = StubServer::new()
        .route("/api/entity-state", &[(404, r#"{"error":"missing"}"#)])
        .start()
        .await;

    let fetcher = HttpEntityStateFetcher::new(config_for(addr)).unwrap();
    assert_eq!(fetcher.fetch("challenge", "c1").await.unwrap(), None);
}

#[tokio::test]
async fn test_server_error_is_external_service() {
    let (addr, _server) = StubServer::new()
        .route("/api/entity-state", &[(500, r#"{"error":"boom"}"#)])
        .start()
        .await;

    let fetcher = HttpEntityStateFetcher::new(config_for(addr)).unwrap();
    let err = fetcher.fetch("progress", "p1").await.unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::ExternalService);
    assert_eq!(err.entity_type(), Some("progress"));
    assert_eq!(err.entity_id(), Some("p1"));
}

#[tokio::test]
async fn test_rejected_credentials() {
    let (addr, _server) = StubServer::new()
        .route("/api/entity-state?type=user", &[(401, "{}")])
        .route("/api/entity-state?type=evaluation", &[(403, "{}")])
        .start()
        .await;

    let fetcher = HttpEntityStateFetcher::new(config_for(addr)).unwrap();
    let err = fetcher.fetch("user", "u1").await.unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::Unauthorised);
    let err = fetcher.fetch("evaluation", "e1").await.unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::Forbidden);
}

#[tokio::test]
async fn test_non_json_body_is_serialization_error() {
    let (addr, _server) = StubServer::new()
        .route("/api/entity-state", &[(200, "<html>oops</html>")])
        .start()
        .await;

    let fetcher = HttpEntityStateFetcher::new(config_for(addr)).unwrap();
    let err = fetcher.fetch("user", "u1").await.unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::Serialization);
}

#[tokio::test]
async fn test_unreachable_backend_is_external_service() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let fetcher = HttpEntityStateFetcher::new(config_for(addr)).unwrap();
    let err = fetcher.fetch("user", "u1").await.unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::ExternalService);
    assert_eq!(err.op(), Some("fetch_entity_state"));
}

#[tokio::test]
async fn test_executor_sends_method_path_and_body() {
    let (addr, server) = StubServer::new()
        .route("/api/users/u1", &[(201, r#"{"id":"u1"}"#)])
        .start()
        .await;

    let executor = RequestExecutor::new(config_for(addr)).unwrap();
    let request = RequestDescriptor::new("/users/u1")
        .with_method("post")
        .with_body(json!({"name": "Alice"}));
    let response = executor.execute(&request).await.unwrap();

    assert_eq!(response.status, 201);
    assert!(response.is_success());
    assert_eq!(response.body, Some(json!({"id": "u1"})));

    let seen = &server.requests()[0];
    assert_eq!(seen.method, Method::POST);
    assert_eq!(seen.target, "/api/users/u1");
    assert_eq!(seen.content_type.as_deref(), Some("application/json"));
    let sent: Value = serde_json::from_str(&seen.body).unwrap();
    assert_eq!(sent, json!({"name": "Alice"}));
}

#[tokio::test]
async fn test_executor_reports_error_statuses_as_responses() {
    let (addr, _server) = StubServer::new()
        .route("/api/challenges", &[(422, r#"{"error":"invalid"}"#)])
        .start()
        .await;

    let executor = RequestExecutor::new(config_for(addr)).unwrap();
    let response = executor
        .execute(&RequestDescriptor::new("/challenges").with_method("PUT"))
        .await
        .unwrap();
    assert_eq!(response.status, 422);
    assert!(!response.is_success());
}

#[tokio::test]
async fn test_probe_cycle_over_http() {
    let (addr, _server) = StubServer::new()
        .route(
            "/api/entity-state?type=user&id=u1",
            &[(200, r#"{"entity":{"name":"Al"}}"#), (200, r#"{"entity":{"name":"Alice"}}"#)],
        )
        .route("/api/users/u1", &[(200, "{}")])
        .start()
        .await;

    let config = config_for(addr);
    let fetcher = Arc::new(HttpEntityStateFetcher::new(config.clone()).unwrap());
    let executor = RequestExecutor::new(config).unwrap();
    let mut manager = DomainStateManager::new(fetcher, Arc::new(NoopEventPublisher));

    let request = RequestDescriptor::new("/users/u1").with_method("PATCH");
    manager
        .take_before_snapshot(&request, Some(vec!["user".to_string()]))
        .await;
    executor.execute(&request).await.unwrap();
    manager.take_after_snapshot(None).await;

    assert_eq!(
        serde_json::to_value(manager.calculate_diff()).unwrap(),
        json!({"user": {"name": {"_diff_type": "changed_value", "before": "Al", "after": "Alice"}}})
    );
}
