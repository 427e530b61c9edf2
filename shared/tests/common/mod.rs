#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use catalog_shared::capabilities::{
    Capabilities, FileSource, HttpError, HttpHeaders, HttpMethod, HttpRequest, HttpResponse,
    HttpResult, HttpTransport, TokioFileSource,
};
use catalog_shared::{ItemStore, StoreConfig};
use serde_json::Value;
use tokio::sync::Notify;

/// One answer per request, in order, per route. Unscripted routes fail the test.
#[derive(Default)]
pub struct Backend {
    routes: Mutex<HashMap<(HttpMethod, String), VecDeque<(HttpResult, Option<Arc<Notify>>)>>>,
    log: Mutex<Vec<(HttpMethod, String, Option<Value>)>>,
}

impl Backend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn enqueue(&self, method: HttpMethod, path: &str, result: HttpResult, gate: Option<Arc<Notify>>) {
        self.routes
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back((result, gate));
    }

    pub fn json(&self, method: HttpMethod, path: &str, status: u16, body: Value) {
        let response = HttpResponse::new(status, HttpHeaders::new(), body.to_string().into_bytes(), "it");
        self.enqueue(method, path, Ok(response), None);
    }

    pub fn json_after(&self, method: HttpMethod, path: &str, status: u16, body: Value) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        let response = HttpResponse::new(status, HttpHeaders::new(), body.to_string().into_bytes(), "it");
        self.enqueue(method, path, Ok(response), Some(gate.clone()));
        gate
    }

    pub fn empty(&self, method: HttpMethod, path: &str, status: u16) {
        let response = HttpResponse::new(status, HttpHeaders::new(), Vec::new(), "it");
        self.enqueue(method, path, Ok(response), None);
    }

    pub fn offline(&self, method: HttpMethod, path: &str) {
        let err = HttpError::ConnectionError {
            host: "localhost".into(),
            message: "connection refused".into(),
        };
        self.enqueue(method, path, Err(err), None);
    }

    pub fn requests(&self) -> Vec<(HttpMethod, String, Option<Value>)> {
        self.log.lock().unwrap().clone()
    }

    pub fn count(&self, method: HttpMethod, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|(m, p, _)| *m == method && p == path)
            .count()
    }
}

#[async_trait::async_trait]
impl HttpTransport for Backend {
    async fn execute(&self, request: HttpRequest) -> HttpResult {
        let path = request.url().path();
        let body = request.body().and_then(|b| serde_json::from_slice(b).ok());
        self.log
            .lock()
            .unwrap()
            .push((request.method(), path.clone(), body));

        let next = self
            .routes
            .lock()
            .unwrap()
            .get_mut(&(request.method(), path.clone()))
            .and_then(VecDeque::pop_front);
        let (result, gate) = next.unwrap_or_else(|| panic!("unscripted request {} {path}", request.method()));

        if let Some(gate) = gate {
            gate.notified().await;
        }
        result
    }
}

pub fn store(backend: &Arc<Backend>) -> ItemStore {
    store_with_files(backend, Arc::new(TokioFileSource::new()))
}

pub fn store_with_files(backend: &Arc<Backend>, files: Arc<dyn FileSource>) -> ItemStore {
    let caps = Capabilities::new(backend.clone(), files);
    ItemStore::new(StoreConfig::default(), caps)
}

pub fn item(id: &str, name: &str) -> Value {
    serde_json::json!({
        "id": id,
        "type": "furniture",
        "itemName": name,
        "image": catalog_shared::PLACEHOLDER_IMAGE_URL,
        "location": "Lobby",
        "description": ""
    })
}
