use std::borrow::{Borrow, Cow};
use std::fmt;

/// Name half of a [`KeyValue`] attribute.
///
/// Keys compare and hash by their string content, whatever their backing
/// storage. Static keys cost nothing to create:
///
/// ```
/// use tracelink::Key;
///
/// const HANDLER: Key = Key::from_static_str("handler_name");
/// assert_eq!(HANDLER, Key::new(String::from("handler_name")));
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(Cow<'static, str>);

impl Key {
    /// Create a key from anything string-like.
    pub fn new(value: impl Into<Key>) -> Self {
        value.into()
    }

    /// Create a key in const context.
    pub const fn from_static_str(value: &'static str) -> Self {
        Key(Cow::Borrowed(value))
    }

    /// The key text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Pair this key with a value.
    pub fn value(self, value: impl Into<Value>) -> KeyValue {
        KeyValue {
            key: self,
            value: value.into(),
        }
    }
}

impl From<&'static str> for Key {
    fn from(key: &'static str) -> Self {
        Key(Cow::Borrowed(key))
    }
}

impl From<String> for Key {
    fn from(key: String) -> Self {
        Key(Cow::Owned(key))
    }
}

impl From<Cow<'static, str>> for Key {
    fn from(key: Cow<'static, str>) -> Self {
        Key(key)
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.0.into_owned()
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Borrow<str> for Key {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl AsRef<str> for Key {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// String payload of a [`Value`].
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StringValue(Cow<'static, str>);

impl StringValue {
    /// The string content.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for StringValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl fmt::Display for StringValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for StringValue {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl From<&'static str> for StringValue {
    fn from(s: &'static str) -> Self {
        StringValue(Cow::Borrowed(s))
    }
}

impl From<String> for StringValue {
    fn from(s: String) -> Self {
        StringValue(Cow::Owned(s))
    }
}

impl From<Cow<'static, str>> for StringValue {
    fn from(s: Cow<'static, str>) -> Self {
        StringValue(s)
    }
}

impl From<StringValue> for String {
    fn from(s: StringValue) -> Self {
        s.0.into_owned()
    }
}

/// Value half of a [`KeyValue`] attribute.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Boolean value
    Bool(bool),
    /// Signed integer value
    I64(i64),
    /// Floating point value
    F64(f64),
    /// String value
    String(StringValue),
}

impl Value {
    /// Borrow the string form of this value, formatting non-string variants.
    pub fn as_str(&self) -> Cow<'_, str> {
        match self {
            Value::String(s) => Cow::Borrowed(s.as_str()),
            other => Cow::Owned(other.to_string()),
        }
    }
}

macro_rules! from_values {
    ($(($t:ty, $variant:expr);)+) => {
        $(
            impl From<$t> for Value {
                fn from(t: $t) -> Self {
                    $variant(t.into())
                }
            }
        )+
    };
}

from_values!(
    (bool, Value::Bool);
    (i64, Value::I64);
    (i32, Value::I64);
    (u32, Value::I64);
    (f64, Value::F64);
    (&'static str, Value::String);
    (String, Value::String);
    (Cow<'static, str>, Value::String);
    (StringValue, Value::String);
);

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::I64(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => v.fmt(f),
            Value::I64(v) => v.fmt(f),
            Value::F64(v) => v.fmt(f),
            Value::String(v) => f.write_str(v.as_str()),
        }
    }
}

/// A key-value attribute attached to spans, events, log records and counter
/// increments.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyValue {
    /// The attribute name
    pub key: Key,
    /// The attribute value
    pub value: Value,
}

impl KeyValue {
    /// Create a new attribute.
    pub fn new<K, V>(key: K, value: V) -> Self
    where
        K: Into<Key>,
        V: Into<Value>,
    {
        KeyValue {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Identifies the library or component that produced telemetry.
///
/// Tracers carry a scope, and every span they create inherits it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct InstrumentationScope {
    name: Cow<'static, str>,
    version: Option<Cow<'static, str>>,
}

impl InstrumentationScope {
    /// Create a scope with the given name and no version.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        InstrumentationScope {
            name: name.into(),
            version: None,
        }
    }

    /// Attach a version to this scope.
    pub fn with_version(mut self, version: impl Into<Cow<'static, str>>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Scope name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Scope version, if one was set.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}
