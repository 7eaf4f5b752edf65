//! Tracer provider configuration.
//!
//! Defaults come from the environment:
//!
//! | variable | effect | default |
//! |---|---|---|
//! | `OTEL_TRACES_SAMPLER` | sampler kind | `parentbased_always_on` |
//! | `OTEL_TRACES_SAMPLER_ARG` | ratio for the `*traceidratio` kinds | `1.0` |
//! | `OTEL_SPAN_ATTRIBUTE_COUNT_LIMIT` | attributes per span | 128 |
//! | `OTEL_SPAN_EVENT_COUNT_LIMIT` | events per span | 128 |
//!
//! Values set through the provider builder replace these.
use crate::trace::{IdGenerator, RandomIdGenerator, Sampler, ShouldSample};
use crate::Resource;
use std::env;
use tracelink::tl_warn;

const OTEL_TRACES_SAMPLER: &str = "OTEL_TRACES_SAMPLER";
const OTEL_TRACES_SAMPLER_ARG: &str = "OTEL_TRACES_SAMPLER_ARG";
const OTEL_SPAN_ATTRIBUTE_COUNT_LIMIT: &str = "OTEL_SPAN_ATTRIBUTE_COUNT_LIMIT";
const OTEL_SPAN_EVENT_COUNT_LIMIT: &str = "OTEL_SPAN_EVENT_COUNT_LIMIT";

pub(crate) const DEFAULT_MAX_ATTRIBUTES_PER_SPAN: u32 = 128;
pub(crate) const DEFAULT_MAX_EVENTS_PER_SPAN: u32 = 128;
pub(crate) const DEFAULT_MAX_ATTRIBUTES_PER_EVENT: u32 = 128;

/// Caps on how much a single span may hold.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SpanLimits {
    /// Distinct attribute keys per span.
    pub max_attributes_per_span: u32,
    /// Events per span.
    pub max_events_per_span: u32,
    /// Attributes per event.
    pub max_attributes_per_event: u32,
}

impl Default for SpanLimits {
    fn default() -> Self {
        SpanLimits {
            max_attributes_per_span: DEFAULT_MAX_ATTRIBUTES_PER_SPAN,
            max_events_per_span: DEFAULT_MAX_EVENTS_PER_SPAN,
            max_attributes_per_event: DEFAULT_MAX_ATTRIBUTES_PER_EVENT,
        }
    }
}

/// Everything a tracer consults when starting a span.
#[derive(Debug)]
#[non_exhaustive]
pub struct Config {
    /// Sampling strategy.
    pub sampler: Box<dyn ShouldSample>,
    /// Id source.
    pub id_generator: Box<dyn IdGenerator>,
    /// Per-span limits.
    pub span_limits: SpanLimits,
    /// Service attributes handed to processors.
    pub resource: Resource,
}

impl Default for Config {
    fn default() -> Self {
        let mut span_limits = SpanLimits::default();
        if let Some(limit) = env_u32(OTEL_SPAN_ATTRIBUTE_COUNT_LIMIT) {
            span_limits.max_attributes_per_span = limit;
        }
        if let Some(limit) = env_u32(OTEL_SPAN_EVENT_COUNT_LIMIT) {
            span_limits.max_events_per_span = limit;
        }

        Config {
            sampler: Box::new(sampler_from_env()),
            id_generator: Box::<RandomIdGenerator>::default(),
            span_limits,
            resource: Resource::builder().build(),
        }
    }
}

fn env_u32(name: &str) -> Option<u32> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn sampler_from_env() -> Sampler {
    let parent_based_on = || Sampler::ParentBased(Box::new(Sampler::AlwaysOn));
    let Ok(kind) = env::var(OTEL_TRACES_SAMPLER) else {
        return parent_based_on();
    };

    match kind.trim() {
        "always_on" => Sampler::AlwaysOn,
        "always_off" => Sampler::AlwaysOff,
        "traceidratio" => Sampler::TraceIdRatioBased(ratio_from_env(&kind)),
        "parentbased_always_on" => parent_based_on(),
        "parentbased_always_off" => Sampler::ParentBased(Box::new(Sampler::AlwaysOff)),
        "parentbased_traceidratio" => {
            Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(ratio_from_env(&kind))))
        }
        other => {
            tl_warn!(
                name: "TracerProvider.Config.InvalidSamplerType",
                sampler = other.to_string(),
                message = "unrecognized OTEL_TRACES_SAMPLER, using parentbased_always_on"
            );
            parent_based_on()
        }
    }
}

fn ratio_from_env(kind: &str) -> f64 {
    let arg = env::var(OTEL_TRACES_SAMPLER_ARG).ok();
    match arg.as_deref().and_then(|r| r.trim().parse::<f64>().ok()) {
        Some(ratio) if (0.0..=1.0).contains(&ratio) => ratio,
        _ => {
            tl_warn!(
                name: "TracerProvider.Config.InvalidSamplerArgument",
                sampler = kind.to_string(),
                sampler_arg = format!("{:?}", arg),
                message = "OTEL_TRACES_SAMPLER_ARG must be a ratio between 0.0 and 1.0, using 1.0"
            );
            1.0
        }
    }
}
