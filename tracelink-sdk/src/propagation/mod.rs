//! W3C propagators.
//!
//! [`TraceContextPropagator`] carries the active span context in the
//! `traceparent` and `tracestate` headers; [`BaggagePropagator`] carries
//! baggage in the `baggage` header. Combine them with
//! [`TextMapCompositePropagator`](tracelink::propagation::TextMapCompositePropagator)
//! to propagate both.
mod baggage;
mod trace_context;

pub use baggage::BaggagePropagator;
pub use trace_context::TraceContextPropagator;
