//! Logical request types and wire request construction

use crate::auth::{basic_auth_header, UserCredentials};
use crate::codec;
use crate::error::{HttpError, HttpResult};
use crate::transport::WireRequest;
use http::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, HOST};
use url::Url;

pub use esdb_common::http::HttpMethod;

/// A single logical request, built per call and consumed by dispatch.
///
/// POST and PUT require `body` and `content_type`; GET and DELETE must not
/// carry either. [`OutboundRequest::validate`] enforces this.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: HttpMethod,
    pub url: String,
    pub body: Option<String>,
    pub content_type: Option<String>,
    pub credentials: Option<UserCredentials>,
    pub host_header: Option<String>,
}

impl OutboundRequest {
    fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            body: None,
            content_type: None,
            credentials: None,
            host_header: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, url)
    }

    pub fn post(
        url: impl Into<String>,
        body: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self::new(HttpMethod::Post, url).with_body(body, content_type)
    }

    pub fn put(
        url: impl Into<String>,
        body: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self::new(HttpMethod::Put, url).with_body(body, content_type)
    }

    fn with_body(mut self, body: impl Into<String>, content_type: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self.content_type = Some(content_type.into());
        self
    }

    /// Attach Basic credentials
    pub fn credentials(mut self, credentials: Option<UserCredentials>) -> Self {
        self.credentials = credentials;
        self
    }

    /// Override the `Host` header. Blank values are ignored at build time.
    pub fn host_header(mut self, host: impl Into<String>) -> Self {
        self.host_header = Some(host.into());
        self
    }

    /// Check the request invariants without touching the network
    pub fn validate(&self) -> HttpResult<Url> {
        if self.url.trim().is_empty() {
            return Err(HttpError::invalid_argument("url", "must not be empty"));
        }

        let url = Url::parse(&self.url)
            .map_err(|e| HttpError::invalid_argument("url", format!("{}: {}", e, self.url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(HttpError::invalid_argument(
                "url",
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }

        if self.method.carries_body() {
            if self.body.is_none() {
                return Err(HttpError::invalid_argument(
                    "body",
                    format!("required for {}", self.method),
                ));
            }
            if self.content_type.is_none() {
                return Err(HttpError::invalid_argument(
                    "content_type",
                    format!("required for {}", self.method),
                ));
            }
        } else {
            if self.body.is_some() {
                return Err(HttpError::invalid_argument(
                    "body",
                    format!("not allowed for {}", self.method),
                ));
            }
            if self.content_type.is_some() {
                return Err(HttpError::invalid_argument(
                    "content_type",
                    format!("not allowed for {}", self.method),
                ));
            }
        }

        Ok(url)
    }

    /// Validate and build the wire request
    pub fn into_wire(self) -> HttpResult<WireRequest> {
        let url = self.validate()?;
        let mut headers = HeaderMap::new();

        if let Some(credentials) = &self.credentials {
            let mut value = HeaderValue::from_str(&basic_auth_header(credentials))
                .map_err(|e| HttpError::invalid_argument("credentials", e.to_string()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        if let Some(host) = non_blank(self.host_header.as_deref()) {
            let value = HeaderValue::from_str(host)
                .map_err(|e| HttpError::invalid_argument("host_header", e.to_string()))?;
            headers.insert(HOST, value);
        }

        if let Some(content_type) = non_blank(self.content_type.as_deref()) {
            let value = HeaderValue::from_str(content_type)
                .map_err(|e| HttpError::invalid_argument("content_type", e.to_string()))?;
            headers.insert(CONTENT_TYPE, value);
        }

        let body = self.body.as_deref().map(codec::encode);

        Ok(WireRequest {
            method: self.method,
            url,
            headers,
            body,
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
