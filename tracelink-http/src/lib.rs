//! HTTP plumbing for tracelink: header carriers for the propagators and a
//! minimal client trait for outbound calls.
//!
//! ```
//! use tracelink::propagation::TextMapPropagator;
//! use tracelink::Context;
//! use tracelink_http::{HeaderExtractor, HeaderInjector};
//! use tracelink_sdk::propagation::TraceContextPropagator;
//! use tracelink_sdk::trace::SdkTracerProvider;
//!
//! let provider = SdkTracerProvider::builder().build();
//! let (cx, _span) = provider
//!     .tracer("client")
//!     .start_span(&Context::new(), "call", vec![]);
//!
//! let propagator = TraceContextPropagator::new();
//! let mut headers = http::HeaderMap::new();
//! propagator.inject(&cx, &mut HeaderInjector(&mut headers));
//! assert!(headers.contains_key("traceparent"));
//!
//! let extracted = propagator.extract(&HeaderExtractor(&headers));
//! # use tracelink::trace::TraceContextExt;
//! assert_eq!(extracted.span_context().trace_id(), cx.span_context().trace_id());
//! ```
#![warn(
    future_incompatible,
    missing_debug_implementations,
    missing_docs,
    nonstandard_style,
    rust_2018_idioms,
    unreachable_pub,
    unused
)]

use async_trait::async_trait;
use std::fmt::Debug;
use std::time::Duration;

#[doc(no_inline)]
pub use bytes::Bytes;
#[doc(no_inline)]
pub use http::{Request, Response, StatusCode};
use tracelink::propagation::{Extractor, Injector};
use tracelink::tl_debug;

/// Writes propagation fields into an [`http::HeaderMap`].
///
/// Keys or values that are not valid header names or values are skipped.
#[derive(Debug)]
pub struct HeaderInjector<'a>(pub &'a mut http::HeaderMap);

impl Injector for HeaderInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        let Ok(name) = http::header::HeaderName::from_bytes(key.as_bytes()) else {
            tl_debug!(name: "HeaderInjector.InvalidName", key = key.to_string());
            return;
        };
        match http::header::HeaderValue::from_str(&value) {
            Ok(val) => {
                self.0.insert(name, val);
            }
            Err(_) => {
                tl_debug!(name: "HeaderInjector.InvalidValue", key = key.to_string());
            }
        }
    }

    fn reserve(&mut self, additional: usize) {
        self.0.reserve(additional);
    }
}

/// Reads propagation fields from an [`http::HeaderMap`].
///
/// Lookups are case-insensitive. Values that are not visible ASCII read as
/// absent.
#[derive(Debug)]
pub struct HeaderExtractor<'a>(pub &'a http::HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|value| value.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|name| name.as_str()).collect()
    }
}

/// Boxed error returned by [`HttpClient`] implementations.
///
/// Failures the client itself detects are a [`ClientError`] inside the box
/// and can be recovered with `downcast_ref`.
pub type HttpError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures detected by the client rather than the transport.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ClientError {
    /// No complete response arrived within the configured timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The server answered with a status outside 200-299.
    #[error("request failed with status {0}")]
    Status(StatusCode),
}

/// The outbound side of a service: send a request, get the full response.
///
/// Implementations decide how connections are pooled and which runtime they
/// run on. The caller is expected to have injected the propagation headers
/// before calling [`send_bytes`](Self::send_bytes).
#[async_trait]
pub trait HttpClient: Debug + Send + Sync {
    /// Send `request` and buffer the whole response body.
    ///
    /// Returns an error when the server cannot be reached, the exchange
    /// does not finish in time or the status is not a success.
    async fn send_bytes(&self, request: Request<Bytes>) -> Result<Response<Bytes>, HttpError>;
}

#[cfg(feature = "hyper")]
pub mod hyper {
    //! [`HttpClient`](crate::HttpClient) on top of the hyper connection pool.
    use super::{async_trait, Bytes, ClientError, HttpClient, HttpError, Request, Response};
    use crate::ResponseExt;
    use http_body_util::{BodyExt, Full};
    use hyper_util::client::legacy::{
        connect::{Connect, HttpConnector},
        Client,
    };
    use std::fmt;
    use std::time::Duration;
    use tokio::time;
    use tracelink::tl_debug;

    /// Pooled HTTP/1 client with a per-request timeout covering the
    /// connection, the response head and the body.
    #[derive(Clone)]
    pub struct HyperClient<C = HttpConnector>
    where
        C: Connect + Clone + Send + Sync + 'static,
    {
        inner: Client<C, Full<Bytes>>,
        timeout: Duration,
    }

    impl<C> fmt::Debug for HyperClient<C>
    where
        C: Connect + Clone + Send + Sync + 'static,
    {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("HyperClient")
                .field("timeout", &self.timeout)
                .finish_non_exhaustive()
        }
    }

    impl<C> HyperClient<C>
    where
        C: Connect + Clone + Send + Sync + 'static,
    {
        /// Client over `connector`, giving up on requests that take longer
        /// than `timeout`.
        pub fn new(connector: C, timeout: Duration) -> Self {
            let inner = Client::builder(hyper_util::rt::TokioExecutor::new()).build(connector);
            HyperClient { inner, timeout }
        }

        /// The per-request timeout.
        pub fn timeout(&self) -> Duration {
            self.timeout
        }
    }

    impl HyperClient<HttpConnector> {
        /// Client over a plain TCP connector.
        pub fn with_default_connector(timeout: Duration) -> Self {
            Self::new(HttpConnector::new(), timeout)
        }
    }

    impl<C> HyperClient<C>
    where
        C: Connect + Clone + Send + Sync + 'static,
    {
        async fn exchange(&self, request: Request<Bytes>) -> Result<Response<Bytes>, HttpError> {
            let (parts, body) = request.into_parts();
            let request = Request::from_parts(parts, Full::new(body));
            let response = self.inner.request(request).await?;
            let (parts, body) = response.into_parts();
            let body = body.collect().await?.to_bytes();
            Ok(Response::from_parts(parts, body))
        }
    }

    #[async_trait]
    impl<C> HttpClient for HyperClient<C>
    where
        C: Connect + Clone + Send + Sync + 'static,
    {
        async fn send_bytes(&self, request: Request<Bytes>) -> Result<Response<Bytes>, HttpError> {
            tl_debug!(name: "HyperClient.Send", uri = request.uri().to_string());
            let response = match time::timeout(self.timeout, self.exchange(request)).await {
                Ok(response) => response?,
                Err(_) => {
                    tl_debug!(
                        name: "HyperClient.Timeout",
                        timeout_ms = self.timeout.as_millis() as u64
                    );
                    return Err(ClientError::Timeout(self.timeout).into());
                }
            };
            response.error_for_status()
        }
    }
}

/// Helpers for responses returned by an [`HttpClient`].
pub trait ResponseExt: Sized {
    /// Turn a response whose status is not 200-299 into
    /// [`ClientError::Status`].
    fn error_for_status(self) -> Result<Self, HttpError>;
}

impl<T> ResponseExt for Response<T> {
    fn error_for_status(self) -> Result<Self, HttpError> {
        if self.status().is_success() {
            Ok(self)
        } else {
            Err(ClientError::Status(self.status()).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tracelink::propagation::TextMapPropagator;
    use tracelink::trace::TraceContextExt;
    use tracelink_sdk::propagation::{BaggagePropagator, TraceContextPropagator};

    #[test]
    fn http_headers_get() {
        let mut carrier = http::HeaderMap::new();
        HeaderInjector(&mut carrier).set("headerName", "value".to_string());

        assert_eq!(
            HeaderExtractor(&carrier).get("HEADERNAME"),
            Some("value"),
            "case insensitive extraction"
        )
    }

    #[test]
    fn http_headers_keys() {
        let mut carrier = http::HeaderMap::new();
        HeaderInjector(&mut carrier).set("headerName1", "value1".to_string());
        HeaderInjector(&mut carrier).set("headerName2", "value2".to_string());

        let extractor = HeaderExtractor(&carrier);
        let got = extractor.keys();
        assert_eq!(got.len(), 2);
        assert!(got.contains(&"headername1"));
        assert!(got.contains(&"headername2"));
    }

    #[test]
    fn invalid_names_and_values_are_skipped() {
        let mut carrier = http::HeaderMap::new();
        HeaderInjector(&mut carrier).set("bad name", "value".to_string());
        HeaderInjector(&mut carrier).set("good", "line\nbreak".to_string());
        assert!(carrier.is_empty());
    }

    #[test]
    fn non_ascii_value_reads_as_absent() {
        let mut carrier = http::HeaderMap::new();
        carrier.insert(
            "baggage",
            http::HeaderValue::from_bytes(b"k=\xff").unwrap(),
        );
        assert_eq!(HeaderExtractor(&carrier).get("baggage"), None);
    }

    #[test]
    fn header_map_carries_trace_context_and_baggage() {
        let mut inbound: HashMap<String, String> = HashMap::new();
        inbound.insert(
            "traceparent".into(),
            "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01".into(),
        );
        inbound.insert("tracestate".into(), "vendor=abc".into());
        inbound.insert("baggage".into(), "user_id=42".into());
        let cx = BaggagePropagator::new()
            .extract_with_context(&TraceContextPropagator::new().extract(&inbound), &inbound);

        let mut headers = http::HeaderMap::new();
        TraceContextPropagator::new().inject(&cx, &mut HeaderInjector(&mut headers));
        BaggagePropagator::new().inject(&cx, &mut HeaderInjector(&mut headers));
        assert_eq!(
            headers["traceparent"],
            "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01"
        );
        assert_eq!(headers["tracestate"], "vendor=abc");
        assert_eq!(headers["baggage"], "user_id=42");

        let roundtrip = TraceContextPropagator::new().extract(&HeaderExtractor(&headers));
        assert_eq!(
            roundtrip.span_context().span_id(),
            cx.span_context().span_id()
        );
        assert!(roundtrip.span_context().is_remote());
    }

    #[test]
    fn error_for_status() {
        let ok = Response::builder().status(204).body(()).unwrap();
        assert!(ok.error_for_status().is_ok());

        let not_found = Response::builder().status(404).body(()).unwrap();
        let err = not_found.error_for_status().unwrap_err();
        assert_eq!(
            err.downcast_ref::<ClientError>(),
            Some(&ClientError::Status(StatusCode::NOT_FOUND))
        );
        assert_eq!(err.to_string(), "request failed with status 404 Not Found");
    }

    #[cfg(feature = "hyper")]
    mod hyper_client {
        use super::super::hyper::HyperClient;
        use super::super::*;
        use ::hyper::server::conn::http1;
        use ::hyper::service::service_fn;
        use hyper_util::rt::TokioIo;
        use std::convert::Infallible;
        use std::net::SocketAddr;
        use tokio::net::TcpListener;

        type ServerBody = http_body_util::Full<Bytes>;

        // Answers every request with `status`, echoing the traceparent header.
        async fn serve(status: u16) -> SocketAddr {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                loop {
                    let (stream, _) = listener.accept().await.unwrap();
                    tokio::spawn(async move {
                        let service = service_fn(move |req: ::hyper::Request<::hyper::body::Incoming>| async move {
                            let echoed = req
                                .headers()
                                .get("traceparent")
                                .and_then(|v| v.to_str().ok())
                                .unwrap_or("none")
                                .to_string();
                            Ok::<_, Infallible>(
                                ::hyper::Response::builder()
                                    .status(status)
                                    .body(ServerBody::new(Bytes::from(echoed)))
                                    .unwrap(),
                            )
                        });
                        let _ = http1::Builder::new()
                            .serve_connection(TokioIo::new(stream), service)
                            .await;
                    });
                }
            });
            addr
        }

        fn request(addr: SocketAddr, traceparent: &str) -> Request<Bytes> {
            Request::get(format!("http://{addr}/"))
                .header("traceparent", traceparent)
                .body(Bytes::new())
                .unwrap()
        }

        #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
        async fn sends_headers_and_buffers_body() {
            let addr = serve(200).await;
            let client = HyperClient::with_default_connector(Duration::from_secs(5));
            let traceparent = "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01";
            let response = client.send_bytes(request(addr, traceparent)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.body(), &Bytes::from(traceparent));
        }

        #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
        async fn non_success_status_is_an_error() {
            let addr = serve(500).await;
            let client = HyperClient::with_default_connector(Duration::from_secs(5));
            let err = client.send_bytes(request(addr, "x")).await.unwrap_err();
            assert_eq!(
                err.downcast_ref::<ClientError>(),
                Some(&ClientError::Status(StatusCode::INTERNAL_SERVER_ERROR))
            );
        }

        #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
        async fn silent_server_times_out() {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let holder = tokio::spawn(async move {
                let (stream, _) = listener.accept().await.unwrap();
                tokio::time::sleep(Duration::from_secs(5)).await;
                drop(stream);
            });

            let timeout = Duration::from_millis(100);
            let client = HyperClient::with_default_connector(timeout);
            let err = client.send_bytes(request(addr, "x")).await.unwrap_err();
            assert_eq!(
                err.downcast_ref::<ClientError>(),
                Some(&ClientError::Timeout(timeout))
            );
            holder.abort();
        }

        #[tokio::test]
        async fn usable_as_shared_client_object() {
            let client: std::sync::Arc<dyn HttpClient> = std::sync::Arc::new(
                HyperClient::with_default_connector(Duration::from_millis(250)),
            );
            let printed = format!("{client:?}");
            assert!(printed.starts_with("HyperClient"));
            assert!(printed.contains("250ms"));
        }

        #[tokio::test]
        async fn unreachable_server_is_an_error() {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            drop(listener);

            let client = HyperClient::with_default_connector(Duration::from_secs(5));
            let err = client.send_bytes(request(addr, "x")).await.unwrap_err();
            assert!(err.downcast_ref::<ClientError>().is_none());
        }
    }
}
