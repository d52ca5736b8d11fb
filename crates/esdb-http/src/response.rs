//! HTTP response types

use crate::codec;
use crate::error::{HttpError, HttpResult};
use crate::transport::WireResponse;
use esdb_common::http::HttpStatus;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Fully received HTTP response.
///
/// Any status code, 4xx and 5xx included, is delivered as a response; the
/// status helpers below are for callers that want to interpret it.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code
    pub status_code: u16,

    /// Canonical reason phrase for the status code
    pub status_description: String,

    /// Response headers, names lower-cased
    pub headers: HashMap<String, String>,

    /// Decoded response body
    pub body: String,

    /// Request latency in milliseconds
    pub latency_ms: u64,

    /// Request URL
    pub url: String,
}

impl HttpResponse {
    /// Drain the wire body and build the response
    pub(crate) async fn from_wire(
        wire: WireResponse,
        url: String,
        started: Instant,
    ) -> HttpResult<Self> {
        let status_code = wire.status.as_u16();
        let status_description = wire
            .status
            .canonical_reason()
            .unwrap_or_default()
            .to_string();

        let mut headers: HashMap<String, String> = HashMap::new();
        for (name, value) in wire.headers.iter() {
            let v = String::from_utf8_lossy(value.as_bytes());
            headers
                .entry(name.as_str().to_string())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(&v);
                })
                .or_insert_with(|| v.to_string());
        }

        let body = codec::decode(wire.body).await?;
        let latency_ms = started.elapsed().as_millis() as u64;

        Ok(Self {
            status_code,
            status_description,
            headers,
            body,
            latency_ms,
            url,
        })
    }

    pub fn status(&self) -> HttpStatus {
        HttpStatus(self.status_code)
    }

    /// Check if status is success (2xx)
    pub fn is_success(&self) -> bool {
        self.status().is_success()
    }

    /// Check if status is client error (4xx)
    pub fn is_client_error(&self) -> bool {
        self.status().is_client_error()
    }

    /// Check if status is server error (5xx)
    pub fn is_server_error(&self) -> bool {
        self.status().is_server_error()
    }

    /// Get body as JSON
    pub fn json(&self) -> HttpResult<serde_json::Value> {
        serde_json::from_str(&self.body).map_err(|e| {
            HttpError::transport_with(format!("Failed to parse JSON body: {}", e), e)
        })
    }

    /// Get body as JSON and deserialize to type
    pub fn json_as<T: serde::de::DeserializeOwned>(&self) -> HttpResult<T> {
        serde_json::from_str(&self.body).map_err(|e| {
            HttpError::transport_with(format!("Failed to deserialize JSON body: {}", e), e)
        })
    }

    /// Get latency as Duration
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }

    /// Get a header value
    pub fn header(&self, name: &str) -> Option<&str> {
        let name_lower = name.to_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| k.to_lowercase() == name_lower)
            .map(|(_, v)| v.as_str())
    }

    /// Get content type
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

/// Builder for creating HttpResponse in tests and fake transports
#[derive(Debug)]
pub struct HttpResponseBuilder {
    status_code: u16,
    headers: HashMap<String, String>,
    body: String,
    latency_ms: u64,
    url: String,
}

impl HttpResponseBuilder {
    pub fn new() -> Self {
        Self {
            status_code: 200,
            headers: HashMap::new(),
            body: String::new(),
            latency_ms: 0,
            url: String::new(),
        }
    }

    pub fn status_code(mut self, code: u16) -> Self {
        self.status_code = code;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn build(self) -> HttpResponse {
        let status_description = http::StatusCode::from_u16(self.status_code)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or_default()
            .to_string();

        HttpResponse {
            status_code: self.status_code,
            status_description,
            headers: self.headers,
            body: self.body,
            latency_ms: self.latency_ms,
            url: self.url,
        }
    }
}

impl Default for HttpResponseBuilder {
    fn default() -> Self {
        Self::new()
    }
}
