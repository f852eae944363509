//! Scripted transport for tests.

use crate::{HttpRequest, HttpResponse, Method, Transport, TransportError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

struct Route {
    method: Method,
    path: String,
    replies: VecDeque<Result<HttpResponse, TransportError>>,
}

/// Transport answering from per-route queues.
///
/// Replies queued for a route are consumed in order; the last one sticks
/// and answers every further request. Requests to unscripted routes fail
/// with [`TransportError::Other`].
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, method: Method, path: &str, reply: Result<HttpResponse, TransportError>) {
        let mut routes = self.routes.lock();
        match routes.iter_mut().find(|r| r.method == method && r.path == path) {
            Some(route) => route.replies.push_back(reply),
            None => routes.push(Route {
                method,
                path: path.to_string(),
                replies: VecDeque::from([reply]),
            }),
        }
    }

    /// Queue a response for `method path` (path relative to the base URL).
    pub fn respond(&self, method: Method, path: &str, response: HttpResponse) -> &Self {
        self.push(method, path, Ok(response));
        self
    }

    /// Queue a connectivity failure for `method path`.
    pub fn fail_offline(&self, method: Method, path: &str) -> &Self {
        self.push(
            method,
            path,
            Err(TransportError::Connectivity("network is unreachable".to_string())),
        );
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    /// Requests sent to `method path`, oldest first.
    pub fn requests_to(&self, method: Method, path: &str) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.method == method && r.url.path().ends_with(&format!("/{}", path)))
            .cloned()
            .collect()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        self.requests_to(method, path).len()
    }

    pub fn total_requests(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn clear_requests(&self) {
        self.requests.lock().clear();
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url_path = request.url.path().to_string();
        let method = request.method;
        self.requests.lock().push(request);

        let mut routes = self.routes.lock();
        let route = routes
            .iter_mut()
            .find(|r| r.method == method && url_path.ends_with(&format!("/{}", r.path)));

        match route {
            Some(route) if route.replies.len() > 1 => route
                .replies
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::Other("empty script".to_string()))),
            Some(route) => route
                .replies
                .front()
                .cloned()
                .unwrap_or_else(|| Err(TransportError::Other("empty script".to_string()))),
            None => Err(TransportError::Other(format!(
                "no scripted response for {} {}",
                method, url_path
            ))),
        }
    }
}
