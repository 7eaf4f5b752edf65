use crate::metrics::attribute_set::AttributeSet;
use std::borrow::Cow;
use tracelink::KeyValue;

/// Snapshot of one counter.
#[derive(Clone, Debug, PartialEq)]
pub struct CounterData {
    /// Counter name.
    pub name: Cow<'static, str>,
    /// Description given at first registration.
    pub description: Cow<'static, str>,
    /// One entry per distinct attribute set.
    pub data_points: Vec<CounterDataPoint>,
}

impl CounterData {
    /// Value of the series whose attributes equal `attributes`, compared as
    /// sets.
    pub fn value(&self, attributes: &[KeyValue]) -> Option<u64> {
        let wanted = AttributeSet::from(attributes);
        self.data_points
            .iter()
            .find(|dp| AttributeSet::from(&dp.attributes[..]) == wanted)
            .map(|dp| dp.value)
    }

    /// Sum over every series.
    pub fn total(&self) -> u64 {
        self.data_points.iter().map(|dp| dp.value).sum()
    }
}

/// Cumulative value of one series.
#[derive(Clone, Debug, PartialEq)]
pub struct CounterDataPoint {
    /// Attributes, sorted by key.
    pub attributes: Vec<KeyValue>,
    /// Sum of every increment since the counter was registered.
    pub value: u64,
}
