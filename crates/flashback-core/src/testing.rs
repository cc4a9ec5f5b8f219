//! Test doubles shared across module tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::api::{ApiError, HttpRequest, HttpResponse, Transport};

/// A transport answering from a fixed table of URL -> response.
/// While `offline` is set, or for unknown URLs, every request fails.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, HttpResponse>>,
    offline: Mutex<bool>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(&self, url: &str, status: u16, body: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), HttpResponse::new(status, body.as_bytes().to_vec()));
    }

    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock().unwrap() = offline;
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn fetch(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        self.requests.lock().unwrap().push(request.clone());
        if *self.offline.lock().unwrap() {
            return Err(ApiError::Unreachable("offline".into()));
        }
        self.routes
            .lock()
            .unwrap()
            .get(&request.url)
            .cloned()
            .ok_or_else(|| ApiError::Unreachable(format!("no route for {}", request.url)))
    }
}
