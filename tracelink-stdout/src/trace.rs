use crate::common::{format_time, Output, Writer};
use futures_util::future::BoxFuture;
use std::fmt::{self, Write as _};
use tracelink::trace::SpanId;
use tracelink_sdk::error::SdkResult;
use tracelink_sdk::trace::SpanData;
use tracelink_sdk::Resource;

/// Writes finished spans to stdout, one block per span.
///
/// The resource is printed once, ahead of the first batch.
#[derive(Debug)]
pub struct SpanExporter {
    output: Output,
}

impl Default for SpanExporter {
    fn default() -> Self {
        SpanExporter {
            output: Output::stdout(),
        }
    }
}

impl SpanExporter {
    /// Write to `writer` instead of stdout.
    pub fn with_writer<W: std::io::Write + Send + 'static>(writer: W) -> Self {
        SpanExporter {
            output: Output::new(Box::new(writer) as Writer),
        }
    }
}

impl tracelink_sdk::trace::SpanExporter for SpanExporter {
    fn export(&mut self, batch: Vec<SpanData>) -> BoxFuture<'static, SdkResult> {
        let result = self
            .output
            .emit("Spans", |text| print_spans(text, &batch));
        Box::pin(futures_util::future::ready(result))
    }

    fn shutdown(&mut self) -> SdkResult {
        self.output.shutdown()
    }

    fn set_resource(&mut self, resource: &Resource) {
        self.output.set_resource(resource);
    }
}

fn print_spans(text: &mut String, batch: &[SpanData]) -> fmt::Result {
    for (i, span) in batch.iter().enumerate() {
        writeln!(text, "Span #{i}")?;
        writeln!(text, "\t Instrumentation Scope")?;
        writeln!(text, "\t\t Name: {:?}", span.instrumentation_scope.name())?;
        if let Some(version) = span.instrumentation_scope.version() {
            writeln!(text, "\t\t Version: {version:?}")?;
        }
        writeln!(text)?;
        writeln!(text, "\t Name: {:?}", span.name)?;
        writeln!(text, "\t TraceId: {}", span.span_context.trace_id())?;
        writeln!(text, "\t SpanId: {}", span.span_context.span_id())?;
        if span.parent_span_id != SpanId::INVALID {
            writeln!(text, "\t ParentSpanId: {}", span.parent_span_id)?;
        }
        writeln!(text, "\t Kind: {:?}", span.span_kind)?;
        writeln!(text, "\t Start time: {}", format_time(span.start_time))?;
        writeln!(text, "\t End time: {}", format_time(span.end_time))?;
        writeln!(text, "\t Status: {:?}", span.status)?;

        if !span.attributes.is_empty() {
            writeln!(text, "\t Attributes:")?;
            if span.dropped_attributes_count > 0 {
                writeln!(
                    text,
                    "\t Dropped attributes count: {}",
                    span.dropped_attributes_count
                )?;
            }
            for kv in &span.attributes {
                writeln!(text, "\t\t ->  {}: {}", kv.key, kv.value)?;
            }
        }

        if !span.events.is_empty() {
            writeln!(text, "\t Events:")?;
        }
        for event in span.events.iter() {
            writeln!(text, "\t\t Name: {:?}", event.name)?;
            writeln!(text, "\t\t Timestamp: {}", format_time(event.timestamp))?;
            for kv in &event.attributes {
                writeln!(text, "\t\t\t ->  {}: {}", kv.key, kv.value)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::test_writer::Captured;
    use tracelink::trace::{SpanKind, Status};
    use tracelink::{Context, KeyValue};
    use tracelink_sdk::error::SdkError;
    use tracelink_sdk::trace::{SdkTracerProvider, SpanBuilder, SpanExporter as _};

    #[test]
    fn prints_parent_linkage_attributes_and_events() {
        let captured = Captured::default();
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(SpanExporter::with_writer(captured.clone()))
            .with_resource(Resource::builder().with_service_name("serviceB").build())
            .build();
        let tracer = provider.tracer("serviceB");

        let (cx, mut parent) = tracer.start_span(&Context::new(), "serviceB", vec![]);
        let mut child = SpanBuilder::from_name("add")
            .with_kind(SpanKind::Internal)
            .with_attributes(vec![KeyValue::new("x", 42), KeyValue::new("y", 1813)])
            .start_with_context(&tracer, &cx);
        child.add_event("computed", vec![KeyValue::new("result", 1855)]);
        child.set_status(Status::Ok);
        child.end();
        parent.end();
        provider.shutdown().unwrap();

        let text = captured.contents();
        assert_eq!(text.matches("Resource\n").count(), 1);
        assert!(text.contains("service.name=serviceB"));
        assert!(text.contains("\t Name: \"add\""));
        assert!(text.contains(&format!("\t ParentSpanId: {}", parent.span_context().span_id())));
        assert!(text.contains(&format!("\t TraceId: {}", parent.span_context().trace_id())));
        assert!(text.contains("\t\t ->  x: 42"));
        assert!(text.contains("\t\t Name: \"computed\""));
        assert!(text.contains("\t\t\t ->  result: 1855"));
        // root span prints no parent
        assert_eq!(text.matches("ParentSpanId").count(), 1);
    }

    #[test]
    fn export_after_shutdown_fails() {
        let mut exporter = SpanExporter::with_writer(Captured::default());
        exporter.shutdown().unwrap();
        let result = futures_executor::block_on(exporter.export(vec![]));
        assert_eq!(result, Err(SdkError::AlreadyShutdown));
    }
}
