//! Moving a [`Context`] across process boundaries.
//!
//! A [`TextMapPropagator`] writes the parts of a context it understands into
//! an [`Injector`] (outbound request headers) and reads them back from an
//! [`Extractor`] (inbound request headers). Propagators for the W3C
//! `traceparent`/`tracestate` and `baggage` headers live in
//! `tracelink_sdk::propagation`; [`TextMapCompositePropagator`] runs several
//! of them as one.
//!
//! Carriers treat keys case-insensitively. The `HashMap<String, String>`
//! implementations below store and look up lower-cased keys.
use crate::Context;
use std::collections::HashMap;
use std::hash::BuildHasher;

mod composite;

pub use composite::TextMapCompositePropagator;

/// Write side of a carrier.
pub trait Injector {
    /// Store `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: String);

    /// Hint that `additional` keys are about to be set.
    #[allow(unused_variables)]
    fn reserve(&mut self, additional: usize) {}
}

/// Read side of a carrier.
pub trait Extractor {
    /// Value stored under `key`, matched case-insensitively.
    fn get(&self, key: &str) -> Option<&str>;

    /// All keys present in the carrier.
    fn keys(&self) -> Vec<&str>;
}

impl<S: BuildHasher> Injector for HashMap<String, String, S> {
    fn set(&mut self, key: &str, value: String) {
        self.insert(key.to_ascii_lowercase(), value);
    }

    fn reserve(&mut self, additional: usize) {
        HashMap::reserve(self, additional);
    }
}

impl<S: BuildHasher> Extractor for HashMap<String, String, S> {
    fn get(&self, key: &str) -> Option<&str> {
        HashMap::get(self, &key.to_ascii_lowercase()).map(String::as_str)
    }

    fn keys(&self) -> Vec<&str> {
        HashMap::keys(self).map(String::as_str).collect()
    }
}

/// Serializes a concern of a [`Context`] to and from string key-value carriers.
pub trait TextMapPropagator: std::fmt::Debug {
    /// Write the relevant parts of `cx` into `injector`.
    fn inject_context(&self, cx: &Context, injector: &mut dyn Injector);

    /// Read from `extractor` and return `cx` extended with what was found.
    ///
    /// When the carrier holds nothing usable the result is `cx` unchanged.
    fn extract_with_context(&self, cx: &Context, extractor: &dyn Extractor) -> Context;

    /// Header names this propagator reads and writes.
    fn fields(&self) -> &[String];

    /// Same as [`inject_context`](Self::inject_context), reserving carrier
    /// space for [`fields`](Self::fields) first.
    fn inject(&self, cx: &Context, injector: &mut dyn Injector) {
        injector.reserve(self.fields().len());
        self.inject_context(cx, injector)
    }

    /// Extract into a fresh, empty context.
    fn extract(&self, extractor: &dyn Extractor) -> Context {
        self.extract_with_context(&Context::new(), extractor)
    }
}
