//! The request/response seam between the deck client and the network.
//!
//! `HttpTransport` talks to the network with reqwest. Anything else that
//! implements `Transport` (the offline proxy, test doubles) can stand in
//! for it without the client noticing.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ApiError;

/// An outgoing request as seen by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
        }
    }

    /// Read-only requests are the only ones worth caching.
    pub fn is_read_only(&self) -> bool {
        self.method == Method::GET || self.method == Method::HEAD
    }

    /// Identity used to key cached responses.
    pub fn cache_key(&self) -> String {
        format!("{} {}", self.method.as_str(), self.url)
    }
}

/// A fully buffered response. Cloneable and serializable so it can be
/// handed to the page and written to a cache at the same time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpResponse {
    pub status: u16,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    #[serde(default)]
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Resolve a request. Non-success statuses are returned as responses;
    /// only failures to get any response at all are errors.
    async fn fetch(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn fetch(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        (**self).fetch(request).await
    }
}

/// Network transport backed by reqwest.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport whose requests fail after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        debug!(method = %request.method, url = %request.url, "Sending request");

        let response = self
            .client
            .request(request.method.clone(), &request.url)
            .send()
            .await?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::GET;
    use httpmock::MockServer;

    #[test]
    fn test_cache_key_includes_method() {
        let req = HttpRequest::get("https://example.com/deck");
        assert_eq!(req.cache_key(), "GET https://example.com/deck");
        assert!(req.is_read_only());

        let post = HttpRequest {
            method: Method::POST,
            url: "https://example.com/deck".into(),
        };
        assert!(!post.is_read_only());
    }

    #[tokio::test]
    async fn test_http_transport_buffers_response() {
        let server = MockServer::start();
        let _mock = server.mock(|when, then| {
            when.method(GET).path("/deck");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"[{"front":"a","back":"b"}]"#);
        });

        let transport = HttpTransport::new(Duration::from_secs(5)).unwrap();
        let response = transport
            .fetch(&HttpRequest::get(server.url("/deck")))
            .await
            .unwrap();

        assert!(response.is_success());
        assert_eq!(response.text(), r#"[{"front":"a","back":"b"}]"#);
        assert!(response
            .headers
            .iter()
            .any(|(k, v)| k == "content-type" && v == "application/json"));
    }

    #[tokio::test]
    async fn test_http_transport_returns_error_statuses_as_responses() {
        let server = MockServer::start();
        let _mock = server.mock(|when, then| {
            when.method(GET).path("/missing");
            then.status(404).body("gone");
        });

        let transport = HttpTransport::new(Duration::from_secs(5)).unwrap();
        let response = transport
            .fetch(&HttpRequest::get(server.url("/missing")))
            .await
            .unwrap();
        assert_eq!(response.status, 404);
        assert!(!response.is_success());
    }

    #[tokio::test]
    async fn test_http_transport_unreachable_host_is_error() {
        let transport = HttpTransport::new(Duration::from_secs(2)).unwrap();
        let result = transport
            .fetch(&HttpRequest::get("http://127.0.0.1:9/deck"))
            .await;
        assert!(matches!(result, Err(ApiError::NetworkError(_))));
    }
}
