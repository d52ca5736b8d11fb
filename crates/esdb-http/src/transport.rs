//! Underlying HTTP stack.
//!
//! [`HttpTransport`] is the seam the dispatcher sends through. Connection
//! management, pooling and TLS all live behind it; [`ReqwestTransport`] is the
//! production implementation.

use crate::codec::BodyStream;
use crate::config::HttpClientConfig;
use crate::error::{HttpError, HttpResult};
use async_trait::async_trait;
use bytes::Bytes;
use esdb_common::http::HttpMethod;
use futures::TryStreamExt;
use http::{HeaderMap, StatusCode};
use std::time::Duration;
use url::Url;

/// Fully built request, ready to go on the wire
#[derive(Debug)]
pub struct WireRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

/// Response head plus the not-yet-read body
pub struct WireResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: BodyStream,
}

impl std::fmt::Debug for WireResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WireResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// An HTTP stack able to send one request and hand back the response.
///
/// Implementations must be safe to share between concurrent requests.
#[async_trait]
pub trait HttpTransport: Send + Sync + 'static {
    async fn send(&self, request: WireRequest) -> HttpResult<WireResponse>;
}

/// Convert HttpMethod to reqwest Method
fn to_reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

/// [`HttpTransport`] backed by a pooled `reqwest::Client`
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    connect_timeout: Duration,
}

impl ReqwestTransport {
    pub fn new(config: &HttpClientConfig) -> HttpResult<Self> {
        let redirect = if config.follow_redirects {
            reqwest::redirect::Policy::limited(config.max_redirects)
        } else {
            reqwest::redirect::Policy::none()
        };

        // The total bound is enforced by the dispatcher around send + drain.
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(config.pool_idle_timeout)
            .user_agent(&config.user_agent)
            .redirect(redirect)
            .build()
            .map_err(|e| HttpError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            connect_timeout: config.connect_timeout,
        })
    }

    fn map_error(connect_timeout: Duration, err: reqwest::Error) -> HttpError {
        if err.is_timeout() {
            HttpError::Timeout(connect_timeout)
        } else {
            err.into()
        }
    }
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: WireRequest) -> HttpResult<WireResponse> {
        let connect_timeout = self.connect_timeout;

        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), request.url)
            .headers(request.headers);

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Self::map_error(connect_timeout, e))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes_stream()
            .map_err(move |e| Self::map_error(connect_timeout, e));

        Ok(WireResponse {
            status,
            headers,
            body: Box::pin(body),
        })
    }
}
