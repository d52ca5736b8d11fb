//! Asynchronous request dispatcher with callback completion

use crate::auth::UserCredentials;
use crate::config::HttpClientConfig;
use crate::error::{sanitize_error_message, HttpError, HttpResult};
use crate::request::OutboundRequest;
use crate::response::HttpResponse;
use crate::transport::{HttpTransport, ReqwestTransport, WireRequest};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;

/// Async HTTP client that reports completion through callbacks.
///
/// Every call validates its arguments synchronously and returns
/// `Err(HttpError::InvalidArgument)` on a bad one, without touching the
/// network. Once a call returns `Ok(())` exactly one of `on_success` or
/// `on_failure` runs, once, on the runtime. Any received response is a
/// success, whatever its status code. If the runtime shuts down first,
/// `on_failure` still runs with a transport error.
///
/// # Example
///
/// ```ignore
/// use esdb_http::{HttpAsyncClient, HttpClientConfig, UserCredentials};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = HttpAsyncClient::new(HttpClientConfig::new().timeout_secs(5.0))?;
///     let admin = UserCredentials::new("admin", "changeit");
///
///     client.get(
///         "http://localhost:2113/streams/orders",
///         Some(&admin),
///         |response| println!("{} {}", response.status_code, response.body),
///         |error| eprintln!("request failed: {}", error),
///         None,
///     )?;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct HttpAsyncClient {
    inner: Arc<HttpAsyncClientInner>,
}

struct HttpAsyncClientInner {
    transport: Arc<dyn HttpTransport>,
    timeout: Duration,
    runtime: Handle,
}

impl HttpAsyncClient {
    /// Create a client over reqwest. Must be called inside a tokio runtime.
    pub fn new(config: HttpClientConfig) -> HttpResult<Self> {
        let transport = ReqwestTransport::new(&config)?;
        Self::with_transport(Arc::new(transport), config.timeout)
    }

    /// Create a client over any transport, on the current tokio runtime
    pub fn with_transport(transport: Arc<dyn HttpTransport>, timeout: Duration) -> HttpResult<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| HttpError::Config(format!("no tokio runtime available: {}", e)))?;
        Ok(Self::with_runtime(transport, timeout, runtime))
    }

    /// Create a client that spawns its work on the given runtime
    pub fn with_runtime(transport: Arc<dyn HttpTransport>, timeout: Duration, runtime: Handle) -> Self {
        Self {
            inner: Arc::new(HttpAsyncClientInner {
                transport,
                timeout,
                runtime,
            }),
        }
    }

    /// Per-request timeout
    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    /// Send a GET request
    pub fn get<S, F>(
        &self,
        url: &str,
        credentials: Option<&UserCredentials>,
        on_success: S,
        on_failure: F,
        host_header: Option<&str>,
    ) -> HttpResult<()>
    where
        S: FnOnce(HttpResponse) + Send + 'static,
        F: FnOnce(HttpError) + Send + 'static,
    {
        let mut request = OutboundRequest::get(url).credentials(credentials.cloned());
        if let Some(host) = host_header {
            request = request.host_header(host);
        }
        self.dispatch(request, on_success, on_failure)
    }

    /// Send a POST request
    pub fn post<S, F>(
        &self,
        url: &str,
        body: &str,
        content_type: &str,
        credentials: Option<&UserCredentials>,
        on_success: S,
        on_failure: F,
    ) -> HttpResult<()>
    where
        S: FnOnce(HttpResponse) + Send + 'static,
        F: FnOnce(HttpError) + Send + 'static,
    {
        let request =
            OutboundRequest::post(url, body, content_type).credentials(credentials.cloned());
        self.dispatch(request, on_success, on_failure)
    }

    /// Send a PUT request
    pub fn put<S, F>(
        &self,
        url: &str,
        body: &str,
        content_type: &str,
        credentials: Option<&UserCredentials>,
        on_success: S,
        on_failure: F,
    ) -> HttpResult<()>
    where
        S: FnOnce(HttpResponse) + Send + 'static,
        F: FnOnce(HttpError) + Send + 'static,
    {
        let request =
            OutboundRequest::put(url, body, content_type).credentials(credentials.cloned());
        self.dispatch(request, on_success, on_failure)
    }

    /// Send a DELETE request
    pub fn delete<S, F>(
        &self,
        url: &str,
        credentials: Option<&UserCredentials>,
        on_success: S,
        on_failure: F,
    ) -> HttpResult<()>
    where
        S: FnOnce(HttpResponse) + Send + 'static,
        F: FnOnce(HttpError) + Send + 'static,
    {
        let request = OutboundRequest::delete(url).credentials(credentials.cloned());
        self.dispatch(request, on_success, on_failure)
    }

    /// Validate `request`, then send it in the background.
    pub fn dispatch<S, F>(&self, request: OutboundRequest, on_success: S, on_failure: F) -> HttpResult<()>
    where
        S: FnOnce(HttpResponse) + Send + 'static,
        F: FnOnce(HttpError) + Send + 'static,
    {
        let wire = request.into_wire()?;
        let client = self.clone();
        let completion = Completion::new(on_success, on_failure);

        // If the runtime is gone the task is dropped unpolled, and the
        // completion's drop reports the failure.
        self.inner.runtime.spawn(async move {
            let outcome = AssertUnwindSafe(client.exchange(wire))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    Err(HttpError::transport(format!(
                        "transport panicked: {}",
                        panic_message(panic.as_ref())
                    )))
                });

            completion.finish(outcome);
        });

        Ok(())
    }

    /// Send a request and await its outcome
    pub async fn execute(&self, request: OutboundRequest) -> HttpResult<HttpResponse> {
        let wire = request.into_wire()?;
        self.exchange(wire).await
    }

    async fn exchange(&self, wire: WireRequest) -> HttpResult<HttpResponse> {
        let started = Instant::now();
        let method = wire.method;
        let url = wire.url.to_string();
        let timeout = self.inner.timeout;

        tracing::trace!(
            method = %method,
            url = %sanitize_error_message(&url),
            "Sending request"
        );

        let transport = self.inner.transport.clone();
        let response_url = url.clone();
        let roundtrip = async move {
            let response = transport.send(wire).await?;
            HttpResponse::from_wire(response, response_url, started).await
        };

        let outcome = match tokio::time::timeout(timeout, roundtrip).await {
            Ok(outcome) => outcome,
            Err(_) => Err(HttpError::Timeout(timeout)),
        };

        if let Err(error) = &outcome {
            tracing::debug!(
                method = %method,
                url = %sanitize_error_message(&url),
                elapsed_ms = started.elapsed().as_millis() as u64,
                error = %error.sanitized_message(),
                "HTTP request failed"
            );
        }

        outcome
    }
}

/// Owns the callbacks of one dispatched request.
///
/// Dropped without `finish` (task cancelled by a runtime shutdown, or dropped
/// before it was ever polled), it calls `on_failure`.
struct Completion<S, F>
where
    S: FnOnce(HttpResponse),
    F: FnOnce(HttpError),
{
    callbacks: Option<(S, F)>,
}

impl<S, F> Completion<S, F>
where
    S: FnOnce(HttpResponse),
    F: FnOnce(HttpError),
{
    fn new(on_success: S, on_failure: F) -> Self {
        Self {
            callbacks: Some((on_success, on_failure)),
        }
    }

    fn finish(mut self, outcome: HttpResult<HttpResponse>) {
        if let Some((on_success, on_failure)) = self.callbacks.take() {
            match outcome {
                Ok(response) => on_success(response),
                Err(error) => on_failure(error),
            }
        }
    }
}

impl<S, F> Drop for Completion<S, F>
where
    S: FnOnce(HttpResponse),
    F: FnOnce(HttpError),
{
    fn drop(&mut self) {
        if let Some((_, on_failure)) = self.callbacks.take() {
            tracing::debug!("Request abandoned before completion, runtime shut down");
            on_failure(HttpError::transport("dispatcher runtime shut down"));
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        *message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

impl std::fmt::Debug for HttpAsyncClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpAsyncClient")
            .field("timeout", &self.inner.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;
    use crate::transport::WireResponse;
    use async_trait::async_trait;
    use bytes::Bytes;
    use futures::stream;
    use http::{HeaderMap, StatusCode};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    enum Outcome {
        Success(HttpResponse),
        Failure(HttpError),
    }

    /// Transport double that records requests and replays a fixed behaviour
    struct FakeTransport {
        calls: AtomicUsize,
        behaviour: Behaviour,
    }

    enum Behaviour {
        Respond(u16, &'static str),
        Refuse,
        Panic,
        BrokenBody,
        Hang,
    }

    impl FakeTransport {
        fn new(behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                behaviour,
            })
        }
    }

    #[async_trait]
    impl HttpTransport for FakeTransport {
        async fn send(&self, _request: WireRequest) -> HttpResult<WireResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behaviour {
                Behaviour::Respond(status, body) => Ok(WireResponse {
                    status: StatusCode::from_u16(status).unwrap(),
                    headers: HeaderMap::new(),
                    body: codec::single_chunk(body),
                }),
                Behaviour::Refuse => Err(HttpError::connection(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "connection refused",
                ))),
                Behaviour::Panic => panic!("stack exploded"),
                Behaviour::BrokenBody => {
                    let chunks: Vec<HttpResult<Bytes>> = vec![
                        Ok(Bytes::from_static(b"half")),
                        Err(HttpError::transport("connection reset by peer")),
                    ];
                    Ok(WireResponse {
                        status: StatusCode::OK,
                        headers: HeaderMap::new(),
                        body: Box::pin(stream::iter(chunks)),
                    })
                }
                Behaviour::Hang => {
                    futures::future::pending::<()>().await;
                    unreachable!()
                }
            }
        }
    }

    fn callbacks() -> (
        impl FnOnce(HttpResponse) + Send + 'static,
        impl FnOnce(HttpError) + Send + 'static,
        mpsc::UnboundedReceiver<Outcome>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let failure_tx = tx.clone();
        (
            move |response| {
                let _ = tx.send(Outcome::Success(response));
            },
            move |error| {
                let _ = failure_tx.send(Outcome::Failure(error));
            },
            rx,
        )
    }

    /// Wait for the single outcome and check nothing else arrives
    async fn single_outcome(mut rx: mpsc::UnboundedReceiver<Outcome>) -> Outcome {
        let outcome = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no callback fired")
            .expect("callbacks dropped without firing");
        // Both senders are consumed by now, so the channel must be closed and empty.
        assert!(rx.recv().await.is_none());
        outcome
    }

    fn client(transport: Arc<FakeTransport>, timeout: Duration) -> HttpAsyncClient {
        HttpAsyncClient::with_transport(transport, timeout).unwrap()
    }

    #[tokio::test]
    async fn test_success_fires_once() {
        let transport = FakeTransport::new(Behaviour::Respond(200, "hello"));
        let client = client(transport.clone(), Duration::from_secs(5));
        let (ok, err, rx) = callbacks();

        client.get("http://svc/x", None, ok, err, None).unwrap();

        match single_outcome(rx).await {
            Outcome::Success(response) => {
                assert_eq!(response.status_code, 200);
                assert_eq!(response.body, "hello");
            }
            Outcome::Failure(e) => panic!("unexpected failure: {}", e),
        }
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_error_status_is_success() {
        let transport = FakeTransport::new(Behaviour::Respond(500, "boom"));
        let client = client(transport, Duration::from_secs(5));
        let (ok, err, rx) = callbacks();

        client.delete("http://svc/x", None, ok, err).unwrap();

        match single_outcome(rx).await {
            Outcome::Success(response) => {
                assert_eq!(response.status_code, 500);
                assert!(response.is_server_error());
            }
            Outcome::Failure(e) => panic!("unexpected failure: {}", e),
        }
    }

    #[tokio::test]
    async fn test_transport_failure_fires_on_failure() {
        let transport = FakeTransport::new(Behaviour::Refuse);
        let client = client(transport, Duration::from_secs(5));
        let (ok, err, rx) = callbacks();

        client
            .post("http://svc/x", "{}", "application/json", None, ok, err)
            .unwrap();

        match single_outcome(rx).await {
            Outcome::Failure(e) => assert!(e.is_transport()),
            Outcome::Success(_) => panic!("success after refused connection"),
        }
    }

    #[tokio::test]
    async fn test_broken_body_fires_on_failure() {
        let transport = FakeTransport::new(Behaviour::BrokenBody);
        let client = client(transport, Duration::from_secs(5));
        let (ok, err, rx) = callbacks();

        client.get("http://svc/x", None, ok, err, None).unwrap();

        match single_outcome(rx).await {
            Outcome::Failure(e) => assert!(e.is_transport()),
            Outcome::Success(_) => panic!("success with truncated body"),
        }
    }

    #[tokio::test]
    async fn test_panicking_transport_still_completes() {
        let transport = FakeTransport::new(Behaviour::Panic);
        let client = client(transport, Duration::from_secs(5));
        let (ok, err, rx) = callbacks();

        client.get("http://svc/x", None, ok, err, None).unwrap();

        match single_outcome(rx).await {
            Outcome::Failure(e) => assert!(e.to_string().contains("stack exploded")),
            Outcome::Success(_) => panic!("success from panicking transport"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_transport_times_out() {
        let transport = FakeTransport::new(Behaviour::Hang);
        let client = client(transport, Duration::from_millis(250));
        let (ok, err, rx) = callbacks();

        client.get("http://svc/x", None, ok, err, None).unwrap();

        match single_outcome(rx).await {
            Outcome::Failure(HttpError::Timeout(d)) => assert_eq!(d, Duration::from_millis(250)),
            Outcome::Failure(e) => panic!("expected timeout, got {}", e),
            Outcome::Success(_) => panic!("success from hanging transport"),
        }
    }

    #[tokio::test]
    async fn test_invalid_argument_is_synchronous() {
        let transport = FakeTransport::new(Behaviour::Respond(200, ""));
        let client = client(transport.clone(), Duration::from_secs(5));
        let (ok, err, mut rx) = callbacks();

        let mut request = OutboundRequest::post("http://svc/x", "", "text/plain");
        request.body = None;
        let result = client.dispatch(request, ok, err);

        assert_eq!(result.unwrap_err().invalid_param(), Some("body"));
        // Callbacks were dropped without running.
        assert!(rx.recv().await.is_none());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_execute_returns_response() {
        let transport = FakeTransport::new(Behaviour::Respond(404, "missing"));
        let client = client(transport, Duration::from_secs(5));

        let response = client
            .execute(OutboundRequest::get("http://svc/streams/none"))
            .await
            .unwrap();
        assert_eq!(response.status_code, 404);
        assert_eq!(response.body, "missing");
    }

    #[test]
    fn test_with_transport_requires_runtime() {
        let transport = FakeTransport::new(Behaviour::Refuse);
        let err = HttpAsyncClient::with_transport(transport, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, HttpError::Config(_)));
    }

    #[test]
    fn test_with_runtime_dispatches_from_plain_thread() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let transport = FakeTransport::new(Behaviour::Respond(204, ""));
        let client = HttpAsyncClient::with_runtime(
            transport,
            Duration::from_secs(5),
            runtime.handle().clone(),
        );
        let (ok, err, rx) = callbacks();

        client.delete("http://svc/x", None, ok, err).unwrap();

        match runtime.block_on(single_outcome(rx)) {
            Outcome::Success(response) => assert_eq!(response.status_code, 204),
            Outcome::Failure(e) => panic!("unexpected failure: {}", e),
        }
    }

    /// Callbacks that report through a std channel, usable with no runtime
    fn blocking_callbacks() -> (
        impl FnOnce(HttpResponse) + Send + 'static,
        impl FnOnce(HttpError) + Send + 'static,
        std::sync::mpsc::Receiver<Outcome>,
    ) {
        let (tx, rx) = std::sync::mpsc::channel();
        let failure_tx = tx.clone();
        (
            move |response| {
                let _ = tx.send(Outcome::Success(response));
            },
            move |error| {
                let _ = failure_tx.send(Outcome::Failure(error));
            },
            rx,
        )
    }

    fn blocking_outcome(rx: std::sync::mpsc::Receiver<Outcome>) -> Outcome {
        let outcome = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("no callback fired");
        // Both senders are gone once a callback has run.
        assert!(rx.recv_timeout(Duration::from_secs(1)).is_err());
        outcome
    }

    #[test]
    fn test_dispatch_on_shut_down_runtime_fires_on_failure() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let transport = FakeTransport::new(Behaviour::Respond(200, "hello"));
        let client = HttpAsyncClient::with_runtime(
            transport.clone(),
            Duration::from_secs(5),
            runtime.handle().clone(),
        );
        runtime.shutdown_background();

        let (ok, err, rx) = blocking_callbacks();
        client.get("http://svc/x", None, ok, err, None).unwrap();

        match blocking_outcome(rx) {
            Outcome::Failure(e) => {
                assert!(e.is_transport());
                assert!(e.to_string().contains("runtime shut down"));
            }
            Outcome::Success(_) => panic!("success on a shut down runtime"),
        }
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_in_flight_request_fires_on_failure_at_shutdown() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let transport = FakeTransport::new(Behaviour::Hang);
        let client = HttpAsyncClient::with_runtime(
            transport.clone(),
            Duration::from_secs(60),
            runtime.handle().clone(),
        );

        let (ok, err, rx) = blocking_callbacks();
        client.get("http://svc/x", None, ok, err, None).unwrap();

        // Let the request reach the transport before pulling the runtime.
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while transport.calls.load(Ordering::SeqCst) == 0 && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
        runtime.shutdown_timeout(Duration::from_secs(1));

        match blocking_outcome(rx) {
            Outcome::Failure(e) => assert!(e.to_string().contains("runtime shut down")),
            Outcome::Success(_) => panic!("success from abandoned request"),
        }
    }
}
