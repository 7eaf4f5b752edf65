//! The mutable span record.
//!
//! A [`Span`] is owned by the code path that started it. It is ended exactly
//! once, either explicitly with [`Span::end`] or implicitly when dropped, and
//! ending it hands the finished [`SpanData`] to the provider's processor
//! pipeline on the calling thread.
//!
//! Spans the sampler dropped are non-recording: every mutation is ignored,
//! but their [`SpanContext`] is still valid so it can be propagated.
use crate::trace::pipeline::SpanProcessorPipeline;
use crate::trace::{SpanData, SpanLimits};
use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::error::Error;
use std::sync::Arc;
use std::time::SystemTime;
use tracelink::trace::{Event, SpanContext, Status};
use tracelink::{tl_warn, KeyValue};

/// A span being recorded.
#[derive(Debug)]
pub struct Span {
    span_context: SpanContext,
    data: Option<SpanData>,
    ended: bool,
    pipeline: Option<Arc<SpanProcessorPipeline>>,
    span_limits: SpanLimits,
}

impl Span {
    pub(crate) fn new(
        span_context: SpanContext,
        data: Option<SpanData>,
        pipeline: Option<Arc<SpanProcessorPipeline>>,
        span_limits: SpanLimits,
    ) -> Self {
        Span {
            span_context,
            data,
            ended: false,
            pipeline,
            span_limits,
        }
    }

    /// A span that records nothing, carrying `span_context` for propagation.
    pub fn non_recording(span_context: SpanContext) -> Self {
        Span::new(span_context, None, None, SpanLimits::default())
    }

    /// Identity of this span. Available before and after the span ends.
    pub fn span_context(&self) -> &SpanContext {
        &self.span_context
    }

    /// Whether mutations are being recorded. `false` once ended.
    pub fn is_recording(&self) -> bool {
        self.data.is_some()
    }

    /// Whether [`end`](Self::end) has been called or the span was dropped.
    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Set an attribute.
    ///
    /// An existing key keeps its position and takes the new value. A new key
    /// is appended unless the span already holds the maximum number of
    /// attributes, in which case it is counted as dropped.
    pub fn set_attribute(&mut self, attribute: KeyValue) {
        let limit = self.span_limits.max_attributes_per_span as usize;
        if let Some(data) = self.data.as_mut() {
            data_set_attribute(data, attribute, limit);
        }
    }

    /// Set several attributes in order.
    pub fn set_attributes(&mut self, attributes: impl IntoIterator<Item = KeyValue>) {
        for attribute in attributes {
            self.set_attribute(attribute);
        }
    }

    /// Record an event stamped now.
    pub fn add_event<T>(&mut self, name: T, attributes: Vec<KeyValue>)
    where
        T: Into<Cow<'static, str>>,
    {
        self.add_event_with_timestamp(name, tracelink::time::now(), attributes)
    }

    /// Record an event with an explicit timestamp.
    pub fn add_event_with_timestamp<T>(
        &mut self,
        name: T,
        timestamp: SystemTime,
        mut attributes: Vec<KeyValue>,
    ) where
        T: Into<Cow<'static, str>>,
    {
        let limits = self.span_limits;
        if let Some(data) = self.data.as_mut() {
            let max_attributes = limits.max_attributes_per_event as usize;
            let dropped = attributes.len().saturating_sub(max_attributes);
            attributes.truncate(max_attributes);
            data.events.push(
                Event::new(name, timestamp, attributes, dropped as u32),
                limits.max_events_per_span,
            );
        }
    }

    /// Record `err` as an `exception` event.
    ///
    /// The event carries `exception.type` and `exception.message`, plus
    /// `exception.stacktrace` when `capture_stack` is set. The span status is
    /// left alone; call [`set_status`](Self::set_status) to mark a failure.
    pub fn record_error<E>(&mut self, err: &E, capture_stack: bool)
    where
        E: Error + ?Sized,
    {
        if !self.is_recording() {
            return;
        }
        let mut attributes = vec![
            KeyValue::new("exception.type", std::any::type_name::<E>()),
            KeyValue::new("exception.message", err.to_string()),
        ];
        if capture_stack {
            attributes.push(KeyValue::new(
                "exception.stacktrace",
                Backtrace::force_capture().to_string(),
            ));
        }
        self.add_event("exception", attributes);
    }

    /// Update the status. `Unset` never replaces a status and `Ok` is final.
    pub fn set_status(&mut self, status: Status) {
        if let Some(data) = self.data.as_mut() {
            match (&data.status, &status) {
                (Status::Ok, _) | (_, Status::Unset) => {}
                _ => data.status = status,
            }
        }
    }

    /// Rename the span.
    pub fn update_name<T>(&mut self, new_name: T)
    where
        T: Into<Cow<'static, str>>,
    {
        if let Some(data) = self.data.as_mut() {
            data.name = new_name.into();
        }
    }

    /// End the span now.
    pub fn end(&mut self) {
        self.end_with_timestamp(tracelink::time::now())
    }

    /// End the span at `timestamp`. Ending twice is a no-op with a warning.
    pub fn end_with_timestamp(&mut self, timestamp: SystemTime) {
        if self.ended {
            tl_warn!(
                name: "Span.End.AlreadyEnded",
                trace_id = self.span_context.trace_id().to_string(),
                span_id = self.span_context.span_id().to_string()
            );
            return;
        }
        self.ended = true;
        self.finish(timestamp);
    }

    /// A copy of what would be exported if the span ended now.
    pub fn exported_data(&self) -> Option<SpanData> {
        self.data.clone()
    }

    fn finish(&mut self, timestamp: SystemTime) {
        let Some(mut data) = self.data.take() else {
            return;
        };
        data.end_time = timestamp.max(data.start_time);
        if let Some(pipeline) = self.pipeline.take() {
            pipeline.on_end(data);
        }
    }
}

impl Drop for Span {
    fn drop(&mut self) {
        if !self.ended {
            self.ended = true;
            self.finish(tracelink::time::now());
        }
    }
}

fn data_set_attribute(data: &mut SpanData, attribute: KeyValue, limit: usize) {
    if let Some(existing) = data
        .attributes
        .iter_mut()
        .find(|kv| kv.key == attribute.key)
    {
        existing.value = attribute.value;
    } else if data.attributes.len() < limit {
        data.attributes.push(attribute);
    } else {
        data.dropped_attributes_count = data.dropped_attributes_count.saturating_add(1);
    }
}
