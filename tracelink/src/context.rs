use crate::trace::SpanContext;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::hash::{BuildHasherDefault, Hasher};
use std::sync::Arc;

type EntryMap = HashMap<TypeId, Arc<dyn Any + Sync + Send>, BuildHasherDefault<IdHasher>>;

/// An immutable bag of request-scoped values.
///
/// A `Context` holds the active [`SpanContext`] (if any) and any number of
/// typed entries, at most one per type. [`Baggage`](crate::baggage::Baggage)
/// is stored as such an entry.
///
/// Contexts are never mutated: `with_*` methods return a new context that
/// shares unchanged parts with the original, so cloning and deriving are
/// cheap. There is no thread-local "current" context; code that needs one
/// receives it as a `&Context` argument.
///
/// ```
/// use tracelink::Context;
///
/// #[derive(Debug, PartialEq)]
/// struct RequestPath(&'static str);
///
/// let root = Context::new();
/// let cx = root.with_value(RequestPath("/serviceA"));
///
/// assert_eq!(cx.get::<RequestPath>(), Some(&RequestPath("/serviceA")));
/// assert_eq!(root.get::<RequestPath>(), None);
/// ```
#[derive(Clone, Default)]
pub struct Context {
    pub(crate) span: Option<Arc<SpanContext>>,
    entries: Option<Arc<EntryMap>>,
}

impl Context {
    /// An empty context: no span, no entries.
    pub fn new() -> Self {
        Context::default()
    }

    /// The entry of type `T`, if present.
    pub fn get<T: 'static>(&self) -> Option<&T> {
        self.entries
            .as_ref()?
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref())
    }

    /// A copy of this context with `value` stored, replacing any previous
    /// entry of the same type.
    pub fn with_value<T: 'static + Send + Sync>(&self, value: T) -> Self {
        let mut entries = self
            .entries
            .as_ref()
            .map(|entries| EntryMap::clone(entries))
            .unwrap_or_default();
        entries.insert(TypeId::of::<T>(), Arc::new(value));

        Context {
            span: self.span.clone(),
            entries: Some(Arc::new(entries)),
        }
    }

    pub(crate) fn replace_span(&self, span_context: SpanContext) -> Self {
        Context {
            span: Some(Arc::new(span_context)),
            entries: self.entries.clone(),
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("Context");
        match &self.span {
            Some(span) => dbg.field("span", span.as_ref()),
            None => dbg.field("span", &"None"),
        };
        dbg.field("entries", &self.entries.as_ref().map_or(0, |e| e.len()))
            .finish()
    }
}

/// `TypeId` is already a hash, so the map only needs to pass it through.
#[derive(Clone, Default, Debug)]
struct IdHasher(u64);

impl Hasher for IdHasher {
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 = self.0.rotate_left(8) ^ u64::from(b);
        }
    }

    #[inline]
    fn write_u64(&mut self, id: u64) {
        self.0 = id;
    }

    #[inline]
    fn finish(&self) -> u64 {
        self.0
    }
}
