//! serviceA: greets the caller and relays serviceB's answer.
use crate::error::HandlerError;
use crate::server::{not_found, text_response, Handler, ResponseBody};
use crate::telemetry::{log_headers, Telemetry};
use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response, StatusCode};
use std::net::SocketAddr;
use std::sync::Arc;
use tracelink::trace::Status;
use tracelink::{Context, KeyValue};
use tracelink_http::HttpClient;
use tracelink_sdk::logs::Logger;
use tracelink_sdk::metrics::Counter;

/// Path serviceA answers on.
pub const ROUTE: &str = "/serviceA";
/// Counter incremented once per call to [`ROUTE`], tagged with
/// `handler_name` and `req_size`.
pub const CALL_COUNTER: &str = "service_a_called_counter";
/// `handler_name` attribute value.
pub const HANDLER_NAME: &str = "serviceA_HttpHandler";

/// The serviceA handler.
#[derive(Debug)]
pub struct ServiceA {
    telemetry: Telemetry,
    client: Arc<dyn HttpClient>,
    downstream_url: String,
    calls: Counter,
}

impl ServiceA {
    /// Handler calling serviceB at `service_b_addr` through `client`.
    pub fn new(telemetry: Telemetry, client: Arc<dyn HttpClient>, service_b_addr: SocketAddr) -> Self {
        let calls = telemetry.counter(
            CALL_COUNTER,
            "how many times the serviceA handler has been called",
        );
        ServiceA {
            telemetry,
            client,
            downstream_url: format!("http://{service_b_addr}{}", crate::service_b::ROUTE),
            calls,
        }
    }

    async fn call_service_b(
        &self,
        cx: &Context,
        logger: &Logger,
        request: &Request<Bytes>,
    ) -> Result<String, HandlerError> {
        self.calls.add(
            cx,
            1,
            &[
                KeyValue::new("handler_name", HANDLER_NAME),
                KeyValue::new("req_size", request.body().len()),
            ],
        );
        logger.info().msg("serviceA handler called");

        let mut outbound = Request::get(self.downstream_url.as_str()).body(Bytes::new())?;
        self.telemetry.inject(cx, outbound.headers_mut());
        let response = self.client.send_bytes(outbound).await?;
        logger
            .info()
            .attr("status_code", i64::from(response.status().as_u16()))
            .msg("serviceA called serviceB");

        Ok(String::from_utf8(response.into_body().to_vec())?)
    }
}

#[async_trait]
impl Handler for ServiceA {
    async fn handle(&self, request: Request<Bytes>) -> Response<ResponseBody> {
        let (cx, mut span) = self.telemetry.start_server_span("serviceA", &request);
        let logger = self.telemetry.logger(&cx);
        log_headers(&logger, "request.headers serviceA", request.headers());

        let response = if request.uri().path() == ROUTE {
            match self.call_service_b(&cx, &logger, &request).await {
                Ok(downstream) => text_response(
                    StatusCode::OK,
                    format!("hello from serviceA\n{downstream}"),
                ),
                Err(err) => {
                    span.record_error(&err, false);
                    span.set_status(Status::error(err.to_string()));
                    if let HandlerError::DownstreamStatus(status) = &err {
                        logger
                            .warn()
                            .attr("status_code", i64::from(status.as_u16()))
                            .msg("serviceB answered with an error");
                    }
                    logger
                        .error()
                        .attr("error", err.to_string())
                        .msg("serviceA could not call serviceB");
                    text_response(err.status(), format!("{err}\n"))
                }
            }
        } else {
            not_found()
        };

        log_headers(&logger, "response.headers serviceA", response.headers());
        span.set_attribute(KeyValue::new(
            "http.response.status_code",
            i64::from(response.status().as_u16()),
        ));
        span.end();
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use std::sync::Mutex;
    use std::time::Duration;
    use tracelink::logs::Severity;
    use tracelink::propagation::TextMapPropagator;
    use tracelink::trace::{SpanId, TraceContextExt};
    use tracelink_http::{ClientError, HeaderExtractor, HttpError};
    use tracelink_sdk::logs::InMemoryLogExporter;
    use tracelink_sdk::propagation::TraceContextPropagator;
    use tracelink_sdk::trace::InMemorySpanExporter;

    /// Records outbound requests and answers with a canned result.
    #[derive(Debug)]
    struct StubClient {
        answer: fn() -> Result<Response<Bytes>, HttpError>,
        seen: Mutex<Vec<http::HeaderMap>>,
    }

    impl StubClient {
        fn new(answer: fn() -> Result<Response<Bytes>, HttpError>) -> Arc<Self> {
            Arc::new(StubClient {
                answer,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl HttpClient for StubClient {
        async fn send_bytes(&self, request: Request<Bytes>) -> Result<Response<Bytes>, HttpError> {
            self.seen.lock().unwrap().push(request.headers().clone());
            (self.answer)()
        }
    }

    fn answer_ok() -> Result<Response<Bytes>, HttpError> {
        Ok(Response::new(Bytes::from_static(
            b"hello from serviceB: Answer is: 1855",
        )))
    }

    fn answer_timeout() -> Result<Response<Bytes>, HttpError> {
        Err(ClientError::Timeout(Duration::from_millis(50)).into())
    }

    fn answer_status() -> Result<Response<Bytes>, HttpError> {
        Err(ClientError::Status(StatusCode::SERVICE_UNAVAILABLE).into())
    }

    struct Fixture {
        service: ServiceA,
        client: Arc<StubClient>,
        spans: InMemorySpanExporter,
        logs: InMemoryLogExporter,
    }

    fn fixture(answer: fn() -> Result<Response<Bytes>, HttpError>) -> Fixture {
        let spans = InMemorySpanExporter::default();
        let logs = InMemoryLogExporter::default();
        let telemetry = Telemetry::builder("serviceA")
            .with_simple_span_exporter(spans.clone())
            .with_log_exporter(logs.clone())
            .build();
        let client = StubClient::new(answer);
        let service = ServiceA::new(telemetry, client.clone(), "127.0.0.1:8082".parse().unwrap());
        Fixture {
            service,
            client,
            spans,
            logs,
        }
    }

    fn request(path: &str, body: &'static [u8]) -> Request<Bytes> {
        Request::get(path).body(Bytes::from_static(body)).unwrap()
    }

    async fn body_text(response: Response<ResponseBody>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn relays_downstream_answer_with_injected_context() {
        let f = fixture(answer_ok);
        let response = f.service.handle(request(ROUTE, b"abc")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_text(response).await,
            "hello from serviceA\nhello from serviceB: Answer is: 1855"
        );

        let finished = f.spans.get_finished_spans().unwrap();
        assert_eq!(finished.len(), 1);
        let root = &finished[0];
        assert_eq!(root.parent_span_id, SpanId::INVALID);
        assert_eq!(root.status, Status::Unset);

        // the outbound call carries the server span as parent
        let seen = f.client.seen.lock().unwrap();
        let outbound_cx = TraceContextPropagator::new()
            .extract(&HeaderExtractor(&seen[0]));
        assert_eq!(outbound_cx.span_context().trace_id(), root.span_context.trace_id());
        assert_eq!(outbound_cx.span_context().span_id(), root.span_context.span_id());

        assert_eq!(
            f.service.calls.value(&[
                KeyValue::new("req_size", 3),
                KeyValue::new("handler_name", HANDLER_NAME),
            ]),
            1
        );

        let records = f.logs.get_emitted_logs().unwrap();
        let status_log = records
            .iter()
            .find(|r| r.body == "serviceA called serviceB")
            .unwrap();
        assert_eq!(status_log.attribute("status_code"), Some(&200i64.into()));
        assert_eq!(
            status_log.trace_context.unwrap().trace_id,
            root.span_context.trace_id()
        );
    }

    #[tokio::test]
    async fn downstream_timeout_is_a_bad_gateway() {
        let f = fixture(answer_timeout);
        let response = f.service.handle(request(ROUTE, b"")).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(body_text(response).await.contains("timed out"));

        let finished = f.spans.get_finished_spans().unwrap();
        let span = &finished[0];
        assert!(matches!(span.status, Status::Error { .. }));
        assert_eq!(span.events[0].name, "exception");
        assert_eq!(
            span.attribute("http.response.status_code"),
            Some(&502i64.into())
        );

        let errors: Vec<_> = f
            .logs
            .get_emitted_logs()
            .unwrap()
            .into_iter()
            .filter(|r| r.severity == Severity::Error)
            .collect();
        assert_eq!(errors.len(), 1);
    }

    #[tokio::test]
    async fn downstream_error_status_is_logged() {
        let f = fixture(answer_status);
        let response = f.service.handle(request(ROUTE, b"")).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let records = f.logs.get_emitted_logs().unwrap();
        let warn = records
            .iter()
            .find(|r| r.severity == Severity::Warn)
            .unwrap();
        assert_eq!(warn.attribute("status_code"), Some(&503i64.into()));
    }

    #[tokio::test]
    async fn unknown_path_skips_downstream() {
        let f = fixture(answer_ok);
        let response = f.service.handle(request("/", b"")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(f.client.seen.lock().unwrap().is_empty());
        assert_eq!(f.service.calls.value(&[]), 0);
    }
}
