use crate::trace::{SpanId, TraceError, TraceFlags, TraceId};
use std::str::FromStr;

const MAX_TRACE_STATE_MEMBERS: usize = 32;
const MAX_VALUE_LEN: usize = 256;

/// Vendor-specific key-value list carried in the W3C `tracestate` header.
///
/// Entries keep their order; [`TraceState::insert`] moves the updated key to
/// the front as the W3C mutation rules require. The value is immutable, every
/// mutation returns a new state.
///
/// ```
/// use tracelink::trace::TraceState;
///
/// let state: TraceState = "congo=t61rcWkgMzE,rojo=00f067aa0ba902b7".parse().unwrap();
/// let state = state.insert("rojo", "0123").unwrap();
/// assert_eq!(state.header(), "rojo=0123,congo=t61rcWkgMzE");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct TraceState(Vec<(String, String)>);

impl TraceState {
    /// The empty trace state.
    pub const NONE: TraceState = TraceState(Vec::new());

    fn valid_key(key: &str) -> bool {
        fn allowed(b: u8) -> bool {
            b.is_ascii_lowercase() || b.is_ascii_digit() || matches!(b, b'_' | b'-' | b'*' | b'/')
        }

        match key.split_once('@') {
            None => {
                let bytes = key.as_bytes();
                !bytes.is_empty()
                    && bytes.len() <= 256
                    && bytes[0].is_ascii_lowercase()
                    && bytes.iter().all(|&b| allowed(b))
            }
            Some((tenant, system)) => {
                let (tenant, system) = (tenant.as_bytes(), system.as_bytes());
                !tenant.is_empty()
                    && tenant.len() <= 241
                    && (tenant[0].is_ascii_lowercase() || tenant[0].is_ascii_digit())
                    && tenant.iter().all(|&b| allowed(b))
                    && !system.is_empty()
                    && system.len() <= 14
                    && system[0].is_ascii_lowercase()
                    && system.iter().all(|&b| allowed(b))
            }
        }
    }

    fn valid_value(value: &str) -> bool {
        value.len() <= MAX_VALUE_LEN
            && value
                .bytes()
                .all(|b| (0x20..=0x7e).contains(&b) && b != b',' && b != b'=')
            && !value.ends_with(' ')
    }

    fn check(key: &str, value: &str) -> Result<(), TraceError> {
        if !TraceState::valid_key(key) {
            return Err(TraceError::InvalidTraceStateKey(key.to_string()));
        }
        if !TraceState::valid_value(value) {
            return Err(TraceError::InvalidTraceStateValue(value.to_string()));
        }
        Ok(())
    }

    /// Build a state from ordered pairs, validating every key and value.
    pub fn from_key_value<T, K, V>(pairs: T) -> Result<Self, TraceError>
    where
        T: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut entries = Vec::new();
        for (key, value) in pairs {
            let (key, value) = (key.into(), value.into());
            TraceState::check(&key, &value)?;
            if entries.iter().any(|(k, _)| *k == key) {
                return Err(TraceError::InvalidTraceStateList(key));
            }
            entries.push((key, value));
        }
        if entries.len() > MAX_TRACE_STATE_MEMBERS {
            return Err(TraceError::InvalidTraceStateList(format!(
                "{} members exceeds the limit of {}",
                entries.len(),
                MAX_TRACE_STATE_MEMBERS
            )));
        }
        Ok(TraceState(entries))
    }

    /// Value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// New state with `key` set to `value`, moved to the front of the list.
    pub fn insert<K, V>(&self, key: K, value: V) -> Result<TraceState, TraceError>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let (key, value) = (key.into(), value.into());
        TraceState::check(&key, &value)?;
        let mut entries = Vec::with_capacity(self.0.len() + 1);
        entries.extend(self.0.iter().filter(|(k, _)| *k != key).cloned());
        entries.insert(0, (key, value));
        entries.truncate(MAX_TRACE_STATE_MEMBERS);
        Ok(TraceState(entries))
    }

    /// New state without `key`.
    pub fn delete(&self, key: &str) -> Result<TraceState, TraceError> {
        if !TraceState::valid_key(key) {
            return Err(TraceError::InvalidTraceStateKey(key.to_string()));
        }
        Ok(TraceState(
            self.0.iter().filter(|(k, _)| k != key).cloned().collect(),
        ))
    }

    /// Whether the state has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Serialize as a `tracestate` header value.
    pub fn header(&self) -> String {
        self.header_delimited("=", ",")
    }

    /// Serialize with custom delimiters.
    pub fn header_delimited(&self, entry_delimiter: &str, list_delimiter: &str) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{}{}{}", k, entry_delimiter, v))
            .collect::<Vec<_>>()
            .join(list_delimiter)
    }
}

impl FromStr for TraceState {
    type Err = TraceError;

    /// Parse a `tracestate` header value. Empty list members are ignored, as
    /// is optional whitespace around members.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut pairs = Vec::new();
        for member in s.split(',').map(str::trim).filter(|m| !m.is_empty()) {
            let (key, value) = member
                .split_once('=')
                .ok_or_else(|| TraceError::InvalidTraceStateList(member.to_string()))?;
            pairs.push((key.to_string(), value.to_string()));
        }
        TraceState::from_key_value(pairs)
    }
}

/// The propagated, immutable identity of a span.
///
/// A span context is what crosses process boundaries. Spans started from a
/// context holding one become its children.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SpanContext {
    trace_id: TraceId,
    span_id: SpanId,
    trace_flags: TraceFlags,
    is_remote: bool,
    trace_state: TraceState,
}

impl SpanContext {
    /// An invalid span context.
    pub const NONE: SpanContext = SpanContext {
        trace_id: TraceId::INVALID,
        span_id: SpanId::INVALID,
        trace_flags: TraceFlags::NOT_SAMPLED,
        is_remote: false,
        trace_state: TraceState::NONE,
    };

    /// Construct a span context.
    pub fn new(
        trace_id: TraceId,
        span_id: SpanId,
        trace_flags: TraceFlags,
        is_remote: bool,
        trace_state: TraceState,
    ) -> Self {
        SpanContext {
            trace_id,
            span_id,
            trace_flags,
            is_remote,
            trace_state,
        }
    }

    /// Same as [`SpanContext::NONE`].
    pub fn empty_context() -> Self {
        SpanContext::NONE
    }

    /// Trace id.
    pub fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    /// Span id.
    pub fn span_id(&self) -> SpanId {
        self.span_id
    }

    /// Trace flags.
    pub fn trace_flags(&self) -> TraceFlags {
        self.trace_flags
    }

    /// Whether both ids are non-zero.
    pub fn is_valid(&self) -> bool {
        self.trace_id.is_valid() && self.span_id.is_valid()
    }

    /// Whether this context was extracted from a carrier.
    pub fn is_remote(&self) -> bool {
        self.is_remote
    }

    /// Whether the `sampled` flag is set.
    pub fn is_sampled(&self) -> bool {
        self.trace_flags.is_sampled()
    }

    /// Vendor trace state.
    pub fn trace_state(&self) -> &TraceState {
        &self.trace_state
    }
}
