//! Canned-response HTTP server for exercising the real client.

use apitester_http::HttpConfig;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::Router;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

struct Route {
    prefix: String,
    responses: VecDeque<(u16, String)>,
}

/// What the stub saw for one request
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: Method,
    /// Path plus query string
    pub target: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

#[derive(Clone, Default)]
pub struct StubServer {
    routes: Arc<Mutex<Vec<Route>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

#[allow(dead_code)]
impl StubServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer requests whose target starts with `prefix`, in order; the last
    /// response repeats.
    pub fn route(self, prefix: &str, responses: &[(u16, &str)]) -> Self {
        self.routes.lock().unwrap().push(Route {
            prefix: prefix.to_string(),
            responses: responses
                .iter()
                .map(|(status, body)| (*status, body.to_string()))
                .collect(),
        });
        self
    }

    /// Every request received so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub async fn start(self) -> (SocketAddr, Self) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = Router::new().fallback(answer).with_state(self.clone());
        tokio::spawn(async move {
            axum::serve(listener, router).await.ok();
        });
        (addr, self)
    }

    fn next_response(&self, target: &str) -> (u16, String) {
        let mut routes = self.routes.lock().unwrap();
        let Some(route) = routes.iter_mut().find(|r| target.starts_with(&r.prefix)) else {
            return (404, String::new());
        };
        if route.responses.len() > 1 {
            route.responses.pop_front().unwrap()
        } else {
            route.responses.front().cloned().unwrap_or((404, String::new()))
        }
    }
}

fn header_text(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn answer(
    State(server): State<StubServer>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    let target = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());
    server.requests.lock().unwrap().push(RecordedRequest {
        method,
        target: target.clone(),
        authorization: header_text(&headers, header::AUTHORIZATION),
        content_type: header_text(&headers, header::CONTENT_TYPE),
        body,
    });

    let (status, body) = server.next_response(&target);
    (
        StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
}

/// Config pointing at a started stub
#[allow(dead_code)]
pub fn config_for(addr: SocketAddr) -> HttpConfig {
    HttpConfig {
        base_url: format!("http://{}", addr),
        timeout_secs: 5,
        ..HttpConfig::default()
    }
}
