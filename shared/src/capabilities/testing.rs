//! Scripted capability doubles for tests.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::Notify;

use super::{
    Capabilities, FileError, FileSource, HttpError, HttpHeaders, HttpMethod, HttpRequest,
    HttpResponse, HttpResult, HttpTransport,
};
use crate::model::FileRef;

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: HttpMethod,
    pub path: String,
    pub url: String,
    pub headers: HttpHeaders,
    pub body: Option<Vec<u8>>,
}

impl RecordedCall {
    pub fn json_body(&self) -> Option<serde_json::Value> {
        self.body
            .as_deref()
            .and_then(|b| serde_json::from_slice(b).ok())
    }
}

struct Scripted {
    result: HttpResult,
    gate: Option<Arc<Notify>>,
}

/// Answers requests from per-route queues keyed by method and path.
///
/// The last scripted answer for a route repeats; unscripted routes get a 404.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<(HttpMethod, String), VecDeque<Scripted>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, method: HttpMethod, path: &str, scripted: Scripted) {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry((method, path.to_string()))
            .or_default()
            .push_back(scripted);
    }

    pub fn respond(&self, method: HttpMethod, path: &str, status: u16, body: &str) {
        let response = HttpResponse::new(status, HttpHeaders::new(), body.as_bytes().to_vec(), "mock");
        self.push(
            method,
            path,
            Scripted {
                result: Ok(response),
                gate: None,
            },
        );
    }

    pub fn respond_json(&self, method: HttpMethod, path: &str, status: u16, body: &serde_json::Value) {
        self.respond(method, path, status, &body.to_string());
    }

    /// Like `respond_json`, but the answer is held until the returned gate is notified.
    pub fn respond_json_gated(
        &self,
        method: HttpMethod,
        path: &str,
        status: u16,
        body: &serde_json::Value,
    ) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        let response = HttpResponse::new(status, HttpHeaders::new(), body.to_string().into_bytes(), "mock");
        self.push(
            method,
            path,
            Scripted {
                result: Ok(response),
                gate: Some(gate.clone()),
            },
        );
        gate
    }

    pub fn respond_error(&self, method: HttpMethod, path: &str, error: HttpError) {
        self.push(
            method,
            path,
            Scripted {
                result: Err(error),
                gate: None,
            },
        );
    }

    pub fn respond_network_error(&self, method: HttpMethod, path: &str) {
        self.respond_error(
            method,
            path,
            HttpError::ConnectionError {
                host: "localhost".into(),
                message: "connection refused".into(),
            },
        );
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn count(&self, method: HttpMethod, path: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.method == method && c.path == path)
            .count()
    }

    fn next(&self, method: HttpMethod, path: &str) -> Option<(HttpResult, Option<Arc<Notify>>)> {
        let mut routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
        let queue = routes.get_mut(&(method, path.to_string()))?;
        let scripted = if queue.len() > 1 {
            queue.pop_front()?
        } else {
            // a gate only ever holds the first answer
            let last = queue.front_mut()?;
            Scripted {
                result: last.result.clone(),
                gate: last.gate.take(),
            }
        };
        Some((scripted.result, scripted.gate))
    }
}

#[async_trait::async_trait]
impl HttpTransport for MockTransport {
    async fn execute(&self, request: HttpRequest) -> HttpResult {
        let path = request.url().path();
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedCall {
                method: request.method(),
                path: path.clone(),
                url: request.url().as_str().to_string(),
                headers: request.headers().clone(),
                body: request.body().map(<[u8]>::to_vec),
            });

        let Some((result, gate)) = self.next(request.method(), &path) else {
            return Ok(HttpResponse::new(
                404,
                HttpHeaders::new(),
                br#"{"message":"no route scripted"}"#.to_vec(),
                request.request_id(),
            ));
        };

        if let Some(gate) = gate {
            gate.notified().await;
        }
        result
    }
}

/// In-memory `FileSource` keyed by path.
#[derive(Default)]
pub struct MemoryFileSource {
    files: Mutex<HashMap<PathBuf, Vec<u8>>>,
}

impl MemoryFileSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl AsRef<Path>, data: Vec<u8>) {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.as_ref().to_path_buf(), data);
    }
}

#[async_trait::async_trait]
impl FileSource for MemoryFileSource {
    async fn read(&self, file: &FileRef) -> Result<Vec<u8>, FileError> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(file.path())
            .cloned()
            .ok_or_else(|| FileError::NotFound {
                path: file.path().display().to_string(),
            })
    }
}

pub fn mock_capabilities(http: Arc<MockTransport>, files: Arc<MemoryFileSource>) -> Capabilities {
    Capabilities::new(http, files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::ValidatedUrl;

    fn get(path: &str) -> HttpRequest {
        HttpRequest::get(ValidatedUrl::new(format!("http://localhost:3001{path}")).unwrap())
    }

    #[tokio::test]
    async fn test_queue_then_sticky_last() {
        let mock = MockTransport::new();
        mock.respond(HttpMethod::Get, "/items", 200, "[]");
        mock.respond(HttpMethod::Get, "/items", 500, "");

        assert_eq!(mock.execute(get("/items")).await.unwrap().status(), 200);
        assert_eq!(mock.execute(get("/items")).await.unwrap().status(), 500);
        assert_eq!(mock.execute(get("/items")).await.unwrap().status(), 500);
        assert_eq!(mock.count(HttpMethod::Get, "/items"), 3);
    }

    #[tokio::test]
    async fn test_unscripted_route_is_404() {
        let mock = MockTransport::new();
        assert_eq!(mock.execute(get("/nope")).await.unwrap().status(), 404);
    }

    #[tokio::test]
    async fn test_memory_file_source() {
        let files = MemoryFileSource::new();
        files.insert("/a.png", vec![7]);
        assert_eq!(files.read(&FileRef::new("/a.png")).await.unwrap(), vec![7]);
        assert!(files.read(&FileRef::new("/b.png")).await.is_err());
    }
}
