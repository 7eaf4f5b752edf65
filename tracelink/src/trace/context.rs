use crate::trace::SpanContext;
use crate::Context;

static NO_SPAN: SpanContext = SpanContext::NONE;

/// Span-context accessors for [`Context`].
pub trait TraceContextExt {
    /// A copy of this context whose active span is `span_context`.
    ///
    /// Tracers use this to hand back the context of a span they just
    /// started; the result is what child spans and outbound calls should
    /// be given.
    fn with_span_context(&self, span_context: SpanContext) -> Self;

    /// A copy of this context whose active span is a remote parent, as
    /// produced by a propagator's extract step.
    fn with_remote_span_context(&self, span_context: SpanContext) -> Self;

    /// The active span context, or [`SpanContext::NONE`].
    fn span_context(&self) -> &SpanContext;

    /// Whether a span context has been set, valid or not.
    fn has_active_span(&self) -> bool;
}

impl TraceContextExt for Context {
    fn with_span_context(&self, span_context: SpanContext) -> Self {
        self.replace_span(span_context)
    }

    fn with_remote_span_context(&self, span_context: SpanContext) -> Self {
        self.replace_span(span_context)
    }

    fn span_context(&self) -> &SpanContext {
        self.span.as_deref().unwrap_or(&NO_SPAN)
    }

    fn has_active_span(&self) -> bool {
        self.span.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::{SpanId, TraceFlags, TraceId, TraceState};

    #[test]
    fn empty_context_has_no_span() {
        let cx = Context::new();
        assert!(!cx.has_active_span());
        assert_eq!(cx.span_context(), &SpanContext::NONE);
    }

    #[test]
    fn derived_context_leaves_parent_untouched() {
        let parent = Context::new();
        let sc = SpanContext::new(
            TraceId::from(11),
            SpanId::from(12),
            TraceFlags::SAMPLED,
            false,
            TraceState::NONE,
        );
        let child = parent.with_span_context(sc.clone());
        assert_eq!(child.span_context(), &sc);
        assert!(!parent.has_active_span());
    }
}
