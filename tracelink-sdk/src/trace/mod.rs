//! # Tracing SDK
//!
//! Span creation, sampling, and the processor pipeline that carries ended
//! spans to exporters.
//!
//! * [`SdkTracerProvider`] holds the [`Config`] and the
//!   [`SpanProcessorPipeline`] and hands out [`SdkTracer`]s.
//! * [`SdkTracer`] starts [`Span`]s from an explicit parent
//!   [`Context`](tracelink::Context).
//! * [`SpanProcessor`] implementations observe spans; the built-in ones feed
//!   a [`SpanExporter`].
mod config;
mod export;
mod id_generator;
mod in_memory_exporter;
mod pipeline;
mod provider;
mod sampler;
mod span;
mod span_processor;
mod tracer;

pub use config::{Config, SpanLimits};
pub use export::{SpanData, SpanEvents, SpanExporter};
pub use id_generator::{IdGenerator, IncrementIdGenerator, RandomIdGenerator};
pub use in_memory_exporter::InMemorySpanExporter;
pub use pipeline::SpanProcessorPipeline;
pub use provider::{SdkTracerProvider, TracerProviderBuilder};
pub use sampler::{Sampler, SamplingDecision, SamplingResult, ShouldSample};
pub use span::Span;
pub use span_processor::{
    BatchConfig, BatchConfigBuilder, BatchSpanProcessor, BatchSpanProcessorBuilder,
    SimpleSpanProcessor, SpanProcessor, DEFAULT_PROCESSOR_TIMEOUT,
};
pub use tracer::{SdkTracer, SpanBuilder};
