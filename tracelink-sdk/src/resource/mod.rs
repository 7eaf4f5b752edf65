//! The entity producing telemetry.
//!
//! A [`Resource`] is a set of attributes describing the service itself:
//! its name and version, the deployment environment and anything else an
//! operator wants stamped on every exported span. Providers hand their
//! resource to processors and exporters through `set_resource`.
//!
//! [`Resource::builder`] starts from the environment: `OTEL_SERVICE_NAME`,
//! then `service.name` from `OTEL_RESOURCE_ATTRIBUTES`, then
//! `unknown_service`. Attributes set on the builder win over detected ones.
mod env;

use std::collections::{btree_map, BTreeMap};
use std::sync::Arc;
use tracelink::{Key, KeyValue, Value};

/// `service.name`
pub const SERVICE_NAME: &str = "service.name";
/// `service.version`
pub const SERVICE_VERSION: &str = "service.version";
/// `deployment.environment`
pub const DEPLOYMENT_ENVIRONMENT: &str = "deployment.environment";

/// Immutable, cheaply clonable service attributes.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Resource {
    attrs: Arc<BTreeMap<Key, Value>>,
}

impl Resource {
    /// A builder seeded from the environment.
    pub fn builder() -> ResourceBuilder {
        ResourceBuilder {
            attrs: env::detect(),
        }
    }

    /// A builder with no attributes at all.
    pub fn builder_empty() -> ResourceBuilder {
        ResourceBuilder {
            attrs: BTreeMap::new(),
        }
    }

    /// Resource with no attributes.
    pub fn empty() -> Self {
        Resource::default()
    }

    /// Value for `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attrs.get(key)
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    /// Whether there are no attributes.
    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    /// Attributes in key order.
    pub fn iter(&self) -> btree_map::Iter<'_, Key, Value> {
        self.attrs.iter()
    }
}

impl<'a> IntoIterator for &'a Resource {
    type Item = (&'a Key, &'a Value);
    type IntoIter = btree_map::Iter<'a, Key, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.attrs.iter()
    }
}

/// Builder for [`Resource`].
#[derive(Debug)]
pub struct ResourceBuilder {
    attrs: BTreeMap<Key, Value>,
}

impl ResourceBuilder {
    /// Set `service.name`.
    pub fn with_service_name(self, name: impl Into<Value>) -> Self {
        self.with_attribute(KeyValue::new(SERVICE_NAME, name))
    }

    /// Set one attribute, replacing a previous value for the key.
    pub fn with_attribute(mut self, kv: KeyValue) -> Self {
        self.attrs.insert(kv.key, kv.value);
        self
    }

    /// Set several attributes; later duplicates win.
    pub fn with_attributes<T: IntoIterator<Item = KeyValue>>(mut self, kvs: T) -> Self {
        for kv in kvs {
            self.attrs.insert(kv.key, kv.value);
        }
        self
    }

    /// Finish the resource.
    pub fn build(self) -> Resource {
        Resource {
            attrs: Arc::new(self.attrs),
        }
    }
}
