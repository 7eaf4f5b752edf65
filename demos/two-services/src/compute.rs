//! The arithmetic serviceB performs.
use crate::telemetry::Telemetry;
use tracelink::trace::{SpanKind, TraceContextExt};
use tracelink::{Context, KeyValue};
use tracelink_sdk::trace::SpanBuilder;

/// Recorded on every `add` span without failing the operation.
#[derive(thiserror::Error, Debug)]
#[error("oops, 99 problems")]
pub struct NinetyNineProblems;

/// `x + y`, computed inside an `add` span that is a child of `cx`.
///
/// The span carries both operands and the result, and a
/// [`NinetyNineProblems`] exception event with a captured stack trace. The
/// status stays unset since the error is not fatal.
pub fn add(telemetry: &Telemetry, cx: &Context, x: i64, y: i64) -> i64 {
    let mut span = SpanBuilder::from_name("add")
        .with_kind(SpanKind::Internal)
        .with_attributes(vec![KeyValue::new("x", x), KeyValue::new("y", y)])
        .start_with_context(telemetry.tracer(), cx);
    let cx = cx.with_span_context(span.span_context().clone());

    span.record_error(&NinetyNineProblems, true);
    telemetry.logger(&cx).info().attr("x", x).attr("y", y).msg("add called");

    let sum = x.saturating_add(y);
    span.set_attribute(KeyValue::new("result", sum));
    span.end();
    sum
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracelink::trace::Status;
    use tracelink_sdk::logs::InMemoryLogExporter;
    use tracelink_sdk::trace::InMemorySpanExporter;

    #[test]
    fn add_records_a_child_span_and_a_correlated_log() {
        let spans = InMemorySpanExporter::default();
        let logs = InMemoryLogExporter::default();
        let telemetry = Telemetry::builder("serviceB")
            .with_simple_span_exporter(spans.clone())
            .with_log_exporter(logs.clone())
            .build();

        let (cx, mut parent) = telemetry
            .tracer()
            .start_span(&Context::new(), "serviceB", vec![]);
        assert_eq!(add(&telemetry, &cx, 42, 1813), 1855);
        parent.end();

        let finished = spans.get_finished_spans().unwrap();
        let add_span = finished.iter().find(|s| s.name == "add").unwrap();
        assert_eq!(add_span.parent_span_id, cx.span_context().span_id());
        assert_eq!(add_span.span_context.trace_id(), cx.span_context().trace_id());
        assert_eq!(add_span.span_kind, SpanKind::Internal);
        assert_eq!(add_span.attribute("result"), Some(&1855i64.into()));
        assert_eq!(add_span.status, Status::Unset);

        let exception = &add_span.events[0];
        assert_eq!(exception.name, "exception");
        let message = exception
            .attributes
            .iter()
            .find(|kv| kv.key.as_str() == "exception.message")
            .unwrap();
        assert_eq!(message.value.as_str(), "oops, 99 problems");
        assert!(exception
            .attributes
            .iter()
            .any(|kv| kv.key.as_str() == "exception.stacktrace"));

        let records = logs.get_emitted_logs().unwrap();
        let record = records.iter().find(|r| r.body == "add called").unwrap();
        let trace_context = record.trace_context.unwrap();
        assert_eq!(trace_context.trace_id, cx.span_context().trace_id());
        assert_eq!(trace_context.span_id, add_span.span_context.span_id());
    }
}
