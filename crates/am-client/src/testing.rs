//! In-memory transport for tests and offline runs.
//!
//! [`ScriptedTransport`] answers requests from a routing table keyed by method
//! and path, and records every request it receives.
//!
//! ```
//! use am_client::testing::ScriptedTransport;
//! use am_client::Method;
//! use serde_json::json;
//!
//! let transport = ScriptedTransport::new();
//! transport.respond(Method::Get, "/health", 200, json!({"status": "healthy"}));
//! assert_eq!(transport.requests().len(), 0);
//! ```

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::transport::{HttpRequest, HttpResponse, Method, Transport, TransportError};

#[derive(Debug, Clone)]
struct Reply {
    result: Result<HttpResponse, TransportError>,
    delay: Option<Duration>,
}

#[derive(Debug, Default)]
struct Route {
    queued: VecDeque<Reply>,
    sticky: Option<Reply>,
}

#[derive(Debug, Default)]
struct State {
    routes: FxHashMap<(Method, String), Route>,
    requests: Vec<HttpRequest>,
}

/// A transport that replays configured responses.
///
/// One-shot replies are consumed in order before the repeating reply is
/// used. Unknown routes answer 404 with a FastAPI-style body.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    state: Arc<Mutex<State>>,
}

impl ScriptedTransport {
    /// Creates a transport with no routes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_route(&self, method: Method, path: &str, f: impl FnOnce(&mut Route)) {
        let mut state = self.state.lock();
        f(state.routes.entry((method, path.to_owned())).or_default());
    }

    /// Answers every matching request with `status` and `body`.
    pub fn respond(&self, method: Method, path: &str, status: u16, body: serde_json::Value) {
        let reply = Reply { result: Ok(HttpResponse::json(status, &body)), delay: None };
        self.with_route(method, path, |route| route.sticky = Some(reply));
    }

    /// Answers the next matching request only.
    pub fn respond_once(&self, method: Method, path: &str, status: u16, body: serde_json::Value) {
        let reply = Reply { result: Ok(HttpResponse::json(status, &body)), delay: None };
        self.with_route(method, path, |route| route.queued.push_back(reply));
    }

    /// Answers the next matching request after `delay`.
    pub fn respond_after(
        &self,
        method: Method,
        path: &str,
        delay: Duration,
        status: u16,
        body: serde_json::Value,
    ) {
        let reply = Reply { result: Ok(HttpResponse::json(status, &body)), delay: Some(delay) };
        self.with_route(method, path, |route| route.queued.push_back(reply));
    }

    /// Answers every matching request with a raw response.
    pub fn respond_raw(&self, method: Method, path: &str, response: HttpResponse) {
        let reply = Reply { result: Ok(response), delay: None };
        self.with_route(method, path, |route| route.sticky = Some(reply));
    }

    /// Fails every matching request below the HTTP layer.
    pub fn fail(&self, method: Method, path: &str, error: TransportError) {
        let reply = Reply { result: Err(error), delay: None };
        self.with_route(method, path, |route| route.sticky = Some(reply));
    }

    /// Fails the next matching request below the HTTP layer.
    pub fn fail_once(&self, method: Method, path: &str, error: TransportError) {
        let reply = Reply { result: Err(error), delay: None };
        self.with_route(method, path, |route| route.queued.push_back(reply));
    }

    /// Returns every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.state.lock().requests.clone()
    }

    /// Returns the most recent request.
    #[must_use]
    pub fn last_request(&self) -> Option<HttpRequest> {
        self.state.lock().requests.last().cloned()
    }

    /// Counts requests for one route.
    #[must_use]
    pub fn count(&self, method: Method, path: &str) -> usize {
        self.state
            .lock()
            .requests
            .iter()
            .filter(|r| r.method == method && r.path() == path)
            .count()
    }

    fn next_reply(&self, request: &HttpRequest) -> Reply {
        let mut state = self.state.lock();
        state.requests.push(request.clone());
        let key = (request.method, request.path().to_owned());
        let reply = state
            .routes
            .get_mut(&key)
            .and_then(|route| route.queued.pop_front().or_else(|| route.sticky.clone()));
        reply.unwrap_or_else(|| Reply {
            result: Ok(HttpResponse::json(404, &serde_json::json!({"detail": "Not Found"}))),
            delay: None,
        })
    }
}

impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let reply = self.next_reply(&request);
        if let Some(delay) = reply.delay {
            tokio::time::sleep(delay).await;
        }
        reply.result
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::transport::RequestBody;

    fn get(path: &str) -> HttpRequest {
        HttpRequest {
            method: Method::Get,
            url: format!("http://localhost:8000{path}"),
            headers: Vec::new(),
            body: RequestBody::Empty,
            timeout: None,
        }
    }

    #[tokio::test]
    async fn test_queued_replies_before_sticky() {
        let transport = ScriptedTransport::new();
        transport.respond(Method::Get, "/x", 200, json!(1));
        transport.respond_once(Method::Get, "/x", 500, json!(null));

        assert_eq!(transport.send(get("/x?a=1")).await.map(|r| r.status), Ok(500));
        assert_eq!(transport.send(get("/x")).await.map(|r| r.status), Ok(200));
        assert_eq!(transport.send(get("/x")).await.map(|r| r.status), Ok(200));
        assert_eq!(transport.count(Method::Get, "/x"), 3);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let transport = ScriptedTransport::new();
        let response = transport.send(get("/nope")).await;
        assert_eq!(response.map(|r| r.status), Ok(404));
    }

    #[tokio::test]
    async fn test_failures_are_replayed() {
        let transport = ScriptedTransport::new();
        transport.fail_once(Method::Get, "/x", TransportError::Timeout);
        assert_eq!(transport.send(get("/x")).await, Err(TransportError::Timeout));
        assert!(transport.last_request().is_some());
    }
}
