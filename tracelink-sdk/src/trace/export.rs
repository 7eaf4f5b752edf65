//! Span sinks and the record they receive.
use crate::error::SdkResult;
use crate::Resource;
use futures_util::future::BoxFuture;
use std::borrow::Cow;
use std::fmt::Debug;
use std::ops::Deref;
use std::time::SystemTime;
use tracelink::trace::{Event, SpanContext, SpanId, SpanKind, Status};
use tracelink::{InstrumentationScope, KeyValue};

/// Destination for finished spans.
///
/// Processors call `export` with batches of ended spans and never call it
/// concurrently on the same exporter. An exporter is expected to be
/// responsive after `shutdown` only to the extent of returning errors.
pub trait SpanExporter: Send + Sync + Debug {
    /// Deliver a batch. The future must not borrow `self`.
    fn export(&mut self, batch: Vec<SpanData>) -> BoxFuture<'static, SdkResult>;

    /// Release resources. Called once by the owning processor.
    fn shutdown(&mut self) -> SdkResult {
        Ok(())
    }

    /// Flush anything buffered inside the exporter.
    fn force_flush(&mut self) -> SdkResult {
        Ok(())
    }

    /// Receive the provider's resource before the first export.
    fn set_resource(&mut self, _resource: &Resource) {}
}

/// Events recorded on a span and how many were refused by limits.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpanEvents {
    /// Events in recording order.
    pub events: Vec<Event>,
    /// Events dropped because the span's event limit was reached.
    pub dropped_count: u32,
}

impl SpanEvents {
    pub(crate) fn push(&mut self, event: Event, limit: u32) {
        if self.events.len() < limit as usize {
            self.events.push(event);
        } else {
            self.dropped_count = self.dropped_count.saturating_add(1);
        }
    }
}

impl Deref for SpanEvents {
    type Target = [Event];

    fn deref(&self) -> &[Event] {
        &self.events
    }
}

/// An ended span, as handed to processors and exporters.
#[derive(Clone, Debug, PartialEq)]
pub struct SpanData {
    /// Identity of the span.
    pub span_context: SpanContext,
    /// Id of the parent, [`SpanId::INVALID`] for roots.
    pub parent_span_id: SpanId,
    /// Span kind.
    pub span_kind: SpanKind,
    /// Span name.
    pub name: Cow<'static, str>,
    /// Start time.
    pub start_time: SystemTime,
    /// End time.
    pub end_time: SystemTime,
    /// Attributes in first-insertion order.
    pub attributes: Vec<KeyValue>,
    /// New keys refused by the attribute limit.
    pub dropped_attributes_count: u32,
    /// Events.
    pub events: SpanEvents,
    /// Final status.
    pub status: Status,
    /// Scope of the tracer that created the span.
    pub instrumentation_scope: InstrumentationScope,
}

impl SpanData {
    /// Value of attribute `key`.
    pub fn attribute(&self, key: &str) -> Option<&tracelink::Value> {
        self.attributes
            .iter()
            .find(|kv| kv.key.as_str() == key)
            .map(|kv| &kv.value)
    }
}
