use tracelink::trace::{SpanKind, TraceContextExt, TraceId, TraceState};
use tracelink::{Context, KeyValue};

/// Decides whether a new span is recorded and whether it is exported.
///
/// The tracer calls the sampler once per span, before the span exists, with
/// the parent context the span is being started from.
pub trait ShouldSample: Send + Sync + std::fmt::Debug {
    /// Sample a span that would belong to `trace_id`.
    fn should_sample(
        &self,
        parent_context: &Context,
        trace_id: TraceId,
        name: &str,
        span_kind: SpanKind,
        attributes: &[KeyValue],
    ) -> SamplingResult;
}

/// What to do with a span.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SamplingDecision {
    /// Not recorded, not exported. The span still gets a valid context so
    /// that propagation keeps working.
    Drop,
    /// Recorded and passed to processors, but the `sampled` flag stays off.
    RecordOnly,
    /// Recorded, exported, and the `sampled` flag is set.
    RecordAndSample,
}

/// Outcome of [`ShouldSample::should_sample`].
#[derive(Clone, Debug, PartialEq)]
pub struct SamplingResult {
    /// The decision.
    pub decision: SamplingDecision,
    /// Extra attributes to put on the span.
    pub attributes: Vec<KeyValue>,
    /// Trace state for the new span.
    pub trace_state: TraceState,
}

/// Built-in samplers.
#[derive(Clone, Debug, PartialEq)]
pub enum Sampler {
    /// Sample every span.
    AlwaysOn,
    /// Sample nothing.
    AlwaysOff,
    /// Follow a valid parent's `sampled` flag; use the inner sampler for roots.
    ParentBased(Box<Sampler>),
    /// Sample a fixed fraction of traces, decided from the trace id so every
    /// service makes the same call for the same trace.
    TraceIdRatioBased(f64),
}

impl ShouldSample for Sampler {
    fn should_sample(
        &self,
        parent_context: &Context,
        trace_id: TraceId,
        name: &str,
        span_kind: SpanKind,
        attributes: &[KeyValue],
    ) -> SamplingResult {
        let parent = parent_context.span_context();
        let decision = match self {
            Sampler::AlwaysOn => SamplingDecision::RecordAndSample,
            Sampler::AlwaysOff => SamplingDecision::Drop,
            Sampler::ParentBased(_) if parent.is_valid() => {
                if parent.is_sampled() {
                    SamplingDecision::RecordAndSample
                } else {
                    SamplingDecision::Drop
                }
            }
            Sampler::ParentBased(root) => {
                root.should_sample(parent_context, trace_id, name, span_kind, attributes)
                    .decision
            }
            Sampler::TraceIdRatioBased(ratio) => sample_based_on_probability(*ratio, trace_id),
        };

        SamplingResult {
            decision,
            attributes: Vec::new(),
            trace_state: parent.trace_state().clone(),
        }
    }
}

/// Compares the low 63 bits of the trace id against `ratio * 2^63`.
pub(crate) fn sample_based_on_probability(ratio: f64, trace_id: TraceId) -> SamplingDecision {
    if ratio >= 1.0 {
        return SamplingDecision::RecordAndSample;
    }
    let upper_bound = (ratio.max(0.0) * (1u64 << 63) as f64) as u64;
    let bytes = trace_id.to_bytes();
    let mut low = [0u8; 8];
    low.copy_from_slice(&bytes[8..]);
    if u64::from_be_bytes(low) >> 1 < upper_bound {
        SamplingDecision::RecordAndSample
    } else {
        SamplingDecision::Drop
    }
}
