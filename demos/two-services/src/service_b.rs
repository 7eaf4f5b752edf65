//! serviceB: adds two numbers under the caller's trace.
use crate::compute;
use crate::server::{not_found, text_response, Handler, ResponseBody};
use crate::telemetry::{log_headers, Telemetry};
use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response, StatusCode};
use tracelink::KeyValue;
use tracelink_sdk::metrics::Counter;

/// Path serviceB answers on.
pub const ROUTE: &str = "/serviceB";
/// Counter incremented once per call to [`ROUTE`].
pub const CALL_COUNTER: &str = "serviceB_call_counter";

/// The serviceB handler.
#[derive(Debug)]
pub struct ServiceB {
    telemetry: Telemetry,
    calls: Counter,
}

impl ServiceB {
    /// Handler reporting through `telemetry`.
    pub fn new(telemetry: Telemetry) -> Self {
        let calls = telemetry.counter(
            CALL_COUNTER,
            "how many times the serviceB handler has been called",
        );
        ServiceB { telemetry, calls }
    }
}

#[async_trait]
impl Handler for ServiceB {
    async fn handle(&self, request: Request<Bytes>) -> Response<ResponseBody> {
        let (cx, mut span) = self.telemetry.start_server_span("serviceB", &request);
        let logger = self.telemetry.logger(&cx);
        log_headers(&logger, "request.headers serviceB", request.headers());

        let response = if request.uri().path() == ROUTE {
            self.calls.add(&cx, 1, &[]);
            logger.info().msg("serviceB handler called");
            let answer = compute::add(&self.telemetry, &cx, 42, 1813);
            text_response(
                StatusCode::OK,
                format!("hello from serviceB: Answer is: {answer}"),
            )
        } else {
            not_found()
        };

        log_headers(&logger, "response.headers serviceB", response.headers());
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
    use tracelink::logs::Severity;
    use tracelink::trace::SpanId;
    use tracelink_sdk::logs::InMemoryLogExporter;
    use tracelink_sdk::trace::InMemorySpanExporter;

    const TRACEPARENT: &str = "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01";

    fn service() -> (ServiceB, InMemorySpanExporter, InMemoryLogExporter) {
        let spans = InMemorySpanExporter::default();
        let logs = InMemoryLogExporter::default();
        let telemetry = Telemetry::builder("serviceB")
            .with_simple_span_exporter(spans.clone())
            .with_log_exporter(logs.clone())
            .build();
        (ServiceB::new(telemetry), spans, logs)
    }

    fn request(path: &str) -> Request<Bytes> {
        Request::get(path)
            .header("traceparent", TRACEPARENT)
            .body(Bytes::new())
            .unwrap()
    }

    #[tokio::test]
    async fn answers_and_joins_the_callers_trace() {
        let (service, spans, logs) = service();
        let response = service.handle(request(ROUTE)).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(service.calls.value(&[]), 1);

        let finished = spans.get_finished_spans().unwrap();
        assert_eq!(finished.len(), 2);
        let server = finished.iter().find(|s| s.name == "serviceB").unwrap();
        let add = finished.iter().find(|s| s.name == "add").unwrap();
        assert_eq!(
            server.span_context.trace_id().to_string(),
            "4bf92f3577b34da6a3ce929d0e0e4736"
        );
        assert_eq!(server.parent_span_id.to_string(), "00f067aa0ba902b7");
        assert_eq!(add.parent_span_id, server.span_context.span_id());
        assert_eq!(
            server.attribute("http.response.status_code"),
            Some(&200i64.into())
        );

        let records = logs.get_emitted_logs().unwrap();
        assert!(records.iter().all(|r| r
            .trace_context
            .map(|tc| tc.trace_id == server.span_context.trace_id())
            .unwrap_or(false)));
        let headers_dump = records
            .iter()
            .filter(|r| r.severity == Severity::Debug)
            .count();
        assert_eq!(headers_dump, 2);
    }

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let (service, spans, _) = service();
        let response = service.handle(request("/elsewhere")).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(service.calls.value(&[]), 0);
        let finished = spans.get_finished_spans().unwrap();
        assert_eq!(finished.len(), 1);
        assert_eq!(
            finished[0].attribute("http.response.status_code"),
            Some(&404i64.into())
        );
        assert_ne!(finished[0].parent_span_id, SpanId::INVALID);
    }
}
