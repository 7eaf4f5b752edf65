use crate::metrics::attribute_set::AttributeSet;
use crate::metrics::{CounterData, CounterDataPoint};
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tracelink::{Context, KeyValue};

#[derive(Debug)]
pub(crate) struct CounterInner {
    pub(crate) name: Cow<'static, str>,
    pub(crate) description: Cow<'static, str>,
    series: RwLock<HashMap<AttributeSet, Arc<AtomicU64>>>,
}

impl CounterInner {
    pub(crate) fn new(name: Cow<'static, str>, description: Cow<'static, str>) -> Self {
        CounterInner {
            name,
            description,
            series: RwLock::new(HashMap::new()),
        }
    }

    fn add(&self, delta: u64, attributes: &[KeyValue]) {
        let attributes = AttributeSet::from(attributes);
        {
            let series = self.series.read().unwrap_or_else(|e| e.into_inner());
            if let Some(value) = series.get(&attributes) {
                value.fetch_add(delta, Ordering::Relaxed);
                return;
            }
        }
        let mut series = self.series.write().unwrap_or_else(|e| e.into_inner());
        series
            .entry(attributes)
            .or_insert_with(|| Arc::new(AtomicU64::new(0)))
            .fetch_add(delta, Ordering::Relaxed);
    }

    fn value(&self, attributes: &[KeyValue]) -> u64 {
        let series = self.series.read().unwrap_or_else(|e| e.into_inner());
        series
            .get(&AttributeSet::from(attributes))
            .map_or(0, |value| value.load(Ordering::Relaxed))
    }

    pub(crate) fn snapshot(&self) -> CounterData {
        let series = self.series.read().unwrap_or_else(|e| e.into_inner());
        let mut data_points: Vec<CounterDataPoint> = series
            .iter()
            .map(|(attributes, value)| CounterDataPoint {
                attributes: attributes.to_vec(),
                value: value.load(Ordering::Relaxed),
            })
            .collect();
        data_points.sort_by(|a, b| {
            let key = |dp: &CounterDataPoint| {
                dp.attributes
                    .iter()
                    .map(|kv| format!("{}={}", kv.key, kv.value))
                    .collect::<Vec<_>>()
            };
            key(a).cmp(&key(b))
        });
        CounterData {
            name: self.name.clone(),
            description: self.description.clone(),
            data_points,
        }
    }
}

/// A monotonic `u64` counter.
///
/// Each distinct attribute set is its own series. Increments to an existing
/// series take a shared lock and one atomic add; the first increment of a
/// new series takes the write lock once.
///
/// Counters with an invalid name are no-ops: increments are discarded and
/// every read is zero.
#[derive(Clone, Debug)]
pub struct Counter {
    inner: Option<Arc<CounterInner>>,
}

impl Counter {
    pub(crate) fn new(inner: Arc<CounterInner>) -> Self {
        Counter { inner: Some(inner) }
    }

    pub(crate) fn noop() -> Self {
        Counter { inner: None }
    }

    /// Add `delta` to the series identified by `attributes`.
    ///
    /// `_cx` is the request context the increment happens under; it does not
    /// select the series.
    pub fn add(&self, _cx: &Context, delta: u64, attributes: &[KeyValue]) {
        if let Some(inner) = &self.inner {
            inner.add(delta, attributes);
        }
    }

    /// Current value of the series identified by `attributes`; zero when the
    /// series was never incremented.
    pub fn value(&self, attributes: &[KeyValue]) -> u64 {
        self.inner
            .as_ref()
            .map_or(0, |inner| inner.value(attributes))
    }

    /// Counter name, empty for a no-op counter.
    pub fn name(&self) -> &str {
        self.inner.as_ref().map_or("", |inner| &inner.name)
    }

    /// Whether increments are recorded.
    pub fn is_noop(&self) -> bool {
        self.inner.is_none()
    }
}
