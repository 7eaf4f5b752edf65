//! # W3C Trace Context Propagator
//!
use std::str::FromStr;
use std::sync::OnceLock;
use tracelink::propagation::{Extractor, Injector, TextMapPropagator};
use tracelink::trace::{SpanContext, SpanId, TraceContextExt, TraceFlags, TraceId, TraceState};
use tracelink::{tl_debug, Context};

const SUPPORTED_VERSION: u8 = 0;
const MAX_VERSION: u8 = 254;
const TRACEPARENT_HEADER: &str = "traceparent";
const TRACESTATE_HEADER: &str = "tracestate";

static TRACE_CONTEXT_HEADER_FIELDS: OnceLock<[String; 2]> = OnceLock::new();

fn trace_context_header_fields() -> &'static [String; 2] {
    TRACE_CONTEXT_HEADER_FIELDS
        .get_or_init(|| [TRACEPARENT_HEADER.to_owned(), TRACESTATE_HEADER.to_owned()])
}

/// Propagates span contexts in the [W3C Trace Context] format.
///
/// `traceparent` identifies the calling span:
///
/// `traceparent: 00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01`
///
/// with version, trace id, parent span id and flags separated by dashes.
/// `tracestate` carries vendor entries such as
/// `tracestate: vendorname1=opaqueValue1,vendorname2=opaqueValue2`.
///
/// A `traceparent` that does not parse leaves the context as it was, so the
/// next span becomes a root. A `tracestate` that does not parse is replaced
/// by an empty one.
///
/// [W3C Trace Context]: https://www.w3.org/TR/trace-context/
#[derive(Clone, Debug, Default)]
pub struct TraceContextPropagator {
    _private: (),
}

impl TraceContextPropagator {
    /// Create a new `TraceContextPropagator`.
    pub fn new() -> Self {
        TraceContextPropagator { _private: () }
    }

    fn extract_span_context(&self, extractor: &dyn Extractor) -> Result<SpanContext, &'static str> {
        let header_value = extractor.get(TRACEPARENT_HEADER).unwrap_or("").trim();
        let parts = header_value.split('-').collect::<Vec<&str>>();
        if parts.len() < 4 {
            return Err("too few fields");
        }

        if parts[0].len() != 2 || !is_lower_hex(parts[0]) {
            return Err("malformed version");
        }
        let version = u8::from_str_radix(parts[0], 16).map_err(|_| "malformed version")?;
        if version > MAX_VERSION {
            return Err("unsupported version");
        }
        if version == 0 && parts.len() != 4 {
            return Err("version 00 must have exactly four fields");
        }

        if parts[1].len() != 32 || !is_lower_hex(parts[1]) {
            return Err("malformed trace id");
        }
        let trace_id = TraceId::from_hex(parts[1]).map_err(|_| "malformed trace id")?;

        if parts[2].len() != 16 || !is_lower_hex(parts[2]) {
            return Err("malformed span id");
        }
        let span_id = SpanId::from_hex(parts[2]).map_err(|_| "malformed span id")?;

        if parts[3].len() != 2 || !is_lower_hex(parts[3]) {
            return Err("malformed flags");
        }
        let opts = u8::from_str_radix(parts[3], 16).map_err(|_| "malformed flags")?;
        if version == 0 && opts > 2 {
            return Err("unknown flags for version 00");
        }

        // only the sampled bit is understood
        let trace_flags = TraceFlags::new(opts) & TraceFlags::SAMPLED;

        let trace_state = match extractor.get(TRACESTATE_HEADER) {
            Some(trace_state_str) => TraceState::from_str(trace_state_str).unwrap_or_else(|err| {
                tl_debug!(
                    name: "TraceContextPropagator.Extract.InvalidTraceState",
                    error = err.to_string()
                );
                TraceState::NONE
            }),
            None => TraceState::NONE,
        };

        let span_context = SpanContext::new(trace_id, span_id, trace_flags, true, trace_state);
        if !span_context.is_valid() {
            return Err("zero trace id or span id");
        }

        Ok(span_context)
    }
}

fn is_lower_hex(s: &str) -> bool {
    s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

impl TextMapPropagator for TraceContextPropagator {
    /// Writes `traceparent`, and `tracestate` when non-empty, for a valid
    /// span context. Writes nothing otherwise.
    fn inject_context(&self, cx: &Context, injector: &mut dyn Injector) {
        let span_context = cx.span_context();
        if span_context.is_valid() {
            let header_value = format!(
                "{:02x}-{:032x}-{:016x}-{:02x}",
                SUPPORTED_VERSION,
                span_context.trace_id(),
                span_context.span_id(),
                span_context.trace_flags() & TraceFlags::SAMPLED
            );
            injector.set(TRACEPARENT_HEADER, header_value);
            if !span_context.trace_state().is_empty() {
                injector.set(TRACESTATE_HEADER, span_context.trace_state().header());
            }
        }
    }

    fn extract_with_context(&self, cx: &Context, extractor: &dyn Extractor) -> Context {
        match self.extract_span_context(extractor) {
            Ok(span_context) => cx.with_remote_span_context(span_context),
            Err(reason) => {
                if let Some(header) = extractor.get(TRACEPARENT_HEADER) {
                    tl_debug!(
                        name: "TraceContextPropagator.Extract.InvalidTraceParent",
                        traceparent = header.to_string(),
                        reason = reason
                    );
                }
                cx.clone()
            }
        }
    }

    fn fields(&self) -> &[String] {
        trace_context_header_fields()
    }
}
