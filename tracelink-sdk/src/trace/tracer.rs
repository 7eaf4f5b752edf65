//! # Tracer
//!
//! A tracer creates spans on behalf of one instrumentation scope. Every span
//! is started from an explicit parent [`Context`]: when that context carries
//! a valid span context the new span joins its trace, otherwise it starts a
//! new one.
use crate::trace::provider::SdkTracerProvider;
use crate::trace::{SamplingDecision, Span, SpanData, SpanEvents};
use std::borrow::Cow;
use std::time::SystemTime;
use tracelink::trace::{SpanContext, SpanId, SpanKind, Status, TraceContextExt, TraceFlags};
use tracelink::{tl_debug, Context, InstrumentationScope, KeyValue};

/// Creates spans. Cheap to clone.
#[derive(Clone, Debug)]
pub struct SdkTracer {
    scope: InstrumentationScope,
    provider: SdkTracerProvider,
}

impl SdkTracer {
    pub(crate) fn new(scope: InstrumentationScope, provider: SdkTracerProvider) -> Self {
        SdkTracer { scope, provider }
    }

    /// Scope stamped on every span of this tracer.
    pub fn instrumentation_scope(&self) -> &InstrumentationScope {
        &self.scope
    }

    /// Start a span named `name`.
    pub fn start_with_context<T>(&self, name: T, parent_cx: &Context) -> Span
    where
        T: Into<Cow<'static, str>>,
    {
        self.build_with_context(SpanBuilder::from_name(name), parent_cx)
    }

    /// Start a span and return it together with a child of `parent_cx` that
    /// carries the new span's context, ready to be passed down or injected.
    pub fn start_span<T>(
        &self,
        parent_cx: &Context,
        name: T,
        attributes: Vec<KeyValue>,
    ) -> (Context, Span)
    where
        T: Into<Cow<'static, str>>,
    {
        let span = self.build_with_context(
            SpanBuilder::from_name(name).with_attributes(attributes),
            parent_cx,
        );
        let cx = parent_cx.with_span_context(span.span_context().clone());
        (cx, span)
    }

    /// Start a span described by `builder`.
    pub fn build_with_context(&self, builder: SpanBuilder, parent_cx: &Context) -> Span {
        let provider = &self.provider;
        let config = provider.config();
        let parent = parent_cx.span_context();

        let (trace_id, parent_span_id, parent_flags) = if parent.is_valid() {
            (parent.trace_id(), parent.span_id(), parent.trace_flags())
        } else {
            (
                config.id_generator.new_trace_id(),
                SpanId::INVALID,
                TraceFlags::default(),
            )
        };
        let span_id = config.id_generator.new_span_id();

        let SpanBuilder {
            name,
            span_kind,
            attributes,
            start_time,
        } = builder;

        let sampling =
            config
                .sampler
                .should_sample(parent_cx, trace_id, &name, span_kind, &attributes);
        let sampled = sampling.decision == SamplingDecision::RecordAndSample;
        let span_context = SpanContext::new(
            trace_id,
            span_id,
            parent_flags.with_sampled(sampled),
            false,
            sampling.trace_state,
        );

        if sampling.decision == SamplingDecision::Drop {
            return Span::non_recording(span_context);
        }

        let pipeline = provider.pipeline();
        if !pipeline.admit() {
            tl_debug!(
                name: "Tracer.StartSpan.ProviderShutdown",
                span_name = name.to_string(),
                message = "span is not recorded because the tracer provider is shut down"
            );
            return Span::non_recording(span_context);
        }

        let start_time = start_time.unwrap_or_else(tracelink::time::now);
        let data = SpanData {
            span_context: span_context.clone(),
            parent_span_id,
            span_kind,
            name,
            start_time,
            end_time: start_time,
            attributes: Vec::new(),
            dropped_attributes_count: 0,
            events: SpanEvents::default(),
            status: Status::Unset,
            instrumentation_scope: self.scope.clone(),
        };
        let mut span = Span::new(
            span_context,
            Some(data),
            Some(pipeline.clone()),
            config.span_limits,
        );
        span.set_attributes(attributes.into_iter().chain(sampling.attributes));
        pipeline.on_start(&mut span, parent_cx);
        span
    }
}

/// Everything known about a span before it starts.
#[derive(Clone, Debug)]
pub struct SpanBuilder {
    /// Span name.
    pub name: Cow<'static, str>,
    /// Span kind.
    pub span_kind: SpanKind,
    /// Attributes visible to the sampler and set on the span.
    pub attributes: Vec<KeyValue>,
    /// Explicit start time; now when absent.
    pub start_time: Option<SystemTime>,
}

impl SpanBuilder {
    /// A builder with just a name.
    pub fn from_name<T: Into<Cow<'static, str>>>(name: T) -> Self {
        SpanBuilder {
            name: name.into(),
            span_kind: SpanKind::Internal,
            attributes: Vec::new(),
            start_time: None,
        }
    }

    /// Set the span kind.
    pub fn with_kind(self, span_kind: SpanKind) -> Self {
        SpanBuilder { span_kind, ..self }
    }

    /// Set the initial attributes.
    pub fn with_attributes<I>(self, attributes: I) -> Self
    where
        I: IntoIterator<Item = KeyValue>,
    {
        SpanBuilder {
            attributes: attributes.into_iter().collect(),
            ..self
        }
    }

    /// Set an explicit start time.
    pub fn with_start_time<T: Into<SystemTime>>(self, start_time: T) -> Self {
        SpanBuilder {
            start_time: Some(start_time.into()),
            ..self
        }
    }

    /// Start the span with `tracer`.
    pub fn start_with_context(self, tracer: &SdkTracer, parent_cx: &Context) -> Span {
        tracer.build_with_context(self, parent_cx)
    }
}
