use crate::propagation::{Extractor, Injector, TextMapPropagator};
use crate::Context;

/// Runs several propagators as one.
///
/// Injection and extraction visit the propagators in construction order;
/// each extraction step receives the context produced by the previous one.
#[derive(Debug)]
pub struct TextMapCompositePropagator {
    propagators: Vec<Box<dyn TextMapPropagator + Send + Sync>>,
    fields: Vec<String>,
}

impl TextMapCompositePropagator {
    /// Combine `propagators`. Their fields are merged without duplicates,
    /// in first-seen order.
    pub fn new(propagators: Vec<Box<dyn TextMapPropagator + Send + Sync>>) -> Self {
        let mut fields: Vec<String> = Vec::new();
        for field in propagators.iter().flat_map(|p| p.fields()) {
            if !fields.contains(field) {
                fields.push(field.clone());
            }
        }

        TextMapCompositePropagator {
            propagators,
            fields,
        }
    }
}

impl TextMapPropagator for TextMapCompositePropagator {
    fn inject_context(&self, cx: &Context, injector: &mut dyn Injector) {
        for propagator in &self.propagators {
            propagator.inject_context(cx, injector);
        }
    }

    fn extract_with_context(&self, cx: &Context, extractor: &dyn Extractor) -> Context {
        self.propagators
            .iter()
            .fold(cx.clone(), |cx, propagator| {
                propagator.extract_with_context(&cx, extractor)
            })
    }

    fn fields(&self) -> &[String] {
        &self.fields
    }
}
