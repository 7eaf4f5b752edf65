//! User-defined name/value pairs that travel with a request.
//!
//! Baggage rides alongside the span context through every hop but is not
//! part of any span: a service reads it from its [`Context`] and decides
//! itself whether to copy an entry onto a span, a log record or a counter.
//!
//! Entries are kept sorted by key, so serialization is deterministic.
//!
//! ```
//! use tracelink::baggage::{Baggage, BaggageExt};
//! use tracelink::Context;
//!
//! let mut baggage = Baggage::new();
//! baggage.insert("user_id", "42").unwrap();
//!
//! let cx = Context::new().with_baggage(baggage);
//! assert_eq!(cx.baggage().get("user_id").map(|v| v.as_str()), Some("42"));
//! assert!(Context::new().baggage().is_empty());
//! ```
use crate::{Context, Key, KeyValue, StringValue};
use std::collections::{btree_map, BTreeMap};
use std::fmt;
use thiserror::Error;

/// Upper bound on the number of entries.
pub const MAX_ENTRIES: usize = 180;
/// Upper bound on the summed byte length of keys, values and metadata.
pub const MAX_BYTES: usize = 8192;

// RFC 7230 token delimiters, which may not appear in a key.
const INVALID_KEY_CHARS: &[u8] = b"()<>@,;:\\\"/[]?={}";

static EMPTY: Baggage = Baggage {
    inner: BTreeMap::new(),
    content_len: 0,
};

/// Reasons an entry was refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BaggageError {
    /// Keys must be non-empty RFC 7230 tokens.
    #[error("invalid baggage key: {0:?}")]
    InvalidKey(String),
    /// The entry count limit was reached.
    #[error("baggage already holds the maximum of 180 entries")]
    TooManyEntries,
    /// The entry would push the total size over the byte limit.
    #[error("baggage would exceed 8192 bytes")]
    TooLarge,
}

/// Properties attached to a baggage entry after its value (`k=v;prop`).
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct BaggageMetadata(String);

impl BaggageMetadata {
    /// The raw metadata text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for BaggageMetadata {
    fn from(s: String) -> Self {
        BaggageMetadata(s.trim().to_string())
    }
}

impl From<&str> for BaggageMetadata {
    fn from(s: &str) -> Self {
        BaggageMetadata(s.trim().to_string())
    }
}

impl fmt::Display for BaggageMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A bounded, key-ordered set of baggage entries.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Baggage {
    inner: BTreeMap<Key, (StringValue, BaggageMetadata)>,
    content_len: usize,
}

impl Baggage {
    /// An empty baggage.
    pub fn new() -> Self {
        Baggage::default()
    }

    /// Value stored under `key`.
    pub fn get<K: AsRef<str>>(&self, key: K) -> Option<&StringValue> {
        self.inner.get(key.as_ref()).map(|(value, _)| value)
    }

    /// Value and metadata stored under `key`.
    pub fn get_with_metadata<K: AsRef<str>>(
        &self,
        key: K,
    ) -> Option<&(StringValue, BaggageMetadata)> {
        self.inner.get(key.as_ref())
    }

    /// Insert an entry without metadata.
    pub fn insert<K, V>(&mut self, key: K, value: V) -> Result<(), BaggageError>
    where
        K: Into<Key>,
        V: Into<StringValue>,
    {
        self.insert_with_metadata(key, value, BaggageMetadata::default())
    }

    /// Insert an entry, replacing any existing one with the same key.
    ///
    /// The baggage is left unchanged when the key is invalid or a limit
    /// would be exceeded.
    pub fn insert_with_metadata<K, V, M>(
        &mut self,
        key: K,
        value: V,
        metadata: M,
    ) -> Result<(), BaggageError>
    where
        K: Into<Key>,
        V: Into<StringValue>,
        M: Into<BaggageMetadata>,
    {
        let (key, value, metadata) = (key.into(), value.into(), metadata.into());
        if !valid_key(key.as_str()) {
            return Err(BaggageError::InvalidKey(key.into()));
        }

        let added = entry_len(key.as_str(), &value, &metadata);
        let replaced = match self.inner.get(key.as_str()) {
            Some((old_value, old_metadata)) => entry_len(key.as_str(), old_value, old_metadata),
            None if self.inner.len() >= MAX_ENTRIES => return Err(BaggageError::TooManyEntries),
            None => 0,
        };
        let content_len = self.content_len - replaced + added;
        if content_len > MAX_BYTES {
            return Err(BaggageError::TooLarge);
        }

        self.content_len = content_len;
        self.inner.insert(key, (value, metadata));
        Ok(())
    }

    /// Remove the entry under `key`.
    pub fn remove<K: AsRef<str>>(&mut self, key: K) -> Option<(StringValue, BaggageMetadata)> {
        let removed = self.inner.remove(key.as_ref())?;
        self.content_len -= entry_len(key.as_ref(), &removed.0, &removed.1);
        Some(removed)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Entries in key order.
    pub fn iter(&self) -> Iter<'_> {
        Iter(self.inner.iter())
    }
}

fn valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_graphic() && !INVALID_KEY_CHARS.contains(&b))
}

fn entry_len(key: &str, value: &StringValue, metadata: &BaggageMetadata) -> usize {
    key.len() + value.as_str().len() + metadata.as_str().len()
}

/// Iterator over baggage entries in key order.
#[derive(Debug)]
pub struct Iter<'a>(btree_map::Iter<'a, Key, (StringValue, BaggageMetadata)>);

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a Key, &'a (StringValue, BaggageMetadata));

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next()
    }
}

impl<'a> IntoIterator for &'a Baggage {
    type Item = (&'a Key, &'a (StringValue, BaggageMetadata));
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Entries that violate a limit are skipped.
impl FromIterator<KeyValue> for Baggage {
    fn from_iter<I: IntoIterator<Item = KeyValue>>(iter: I) -> Self {
        let mut baggage = Baggage::new();
        for kv in iter {
            let _ = baggage.insert(kv.key, kv.value.as_str().into_owned());
        }
        baggage
    }
}

/// Baggage accessors for [`Context`].
pub trait BaggageExt {
    /// A copy of this context carrying `baggage`, replacing any previous baggage.
    fn with_baggage<T: Into<Baggage>>(&self, baggage: T) -> Self;

    /// A copy of this context with empty baggage.
    fn with_cleared_baggage(&self) -> Self;

    /// The context's baggage, empty when none was set.
    fn baggage(&self) -> &Baggage;
}

#[derive(Debug)]
struct BaggageEntry(Baggage);

impl BaggageExt for Context {
    fn with_baggage<T: Into<Baggage>>(&self, baggage: T) -> Self {
        self.with_value(BaggageEntry(baggage.into()))
    }

    fn with_cleared_baggage(&self) -> Self {
        self.with_baggage(Baggage::new())
    }

    fn baggage(&self) -> &Baggage {
        self.get::<BaggageEntry>().map_or(&EMPTY, |entry| &entry.0)
    }
}
