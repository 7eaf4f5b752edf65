use std::hash::{Hash, Hasher};
use tracelink::{KeyValue, Value};

/// Attributes identifying one series of a counter.
///
/// Sorted by key with duplicates removed, so two slices holding the same
/// pairs in any order map to the same series. When a key repeats, its last
/// value wins.
#[derive(Clone, Debug, Default)]
pub(crate) struct AttributeSet(Vec<KeyValue>);

impl From<&[KeyValue]> for AttributeSet {
    fn from(values: &[KeyValue]) -> Self {
        let mut vec = values.to_vec();
        // stable, so repeated keys keep their call order
        vec.sort_by(|a, b| a.key.as_str().cmp(b.key.as_str()));

        let mut deduped: Vec<KeyValue> = Vec::with_capacity(vec.len());
        for kv in vec {
            match deduped.last_mut() {
                Some(last) if last.key == kv.key => *last = kv,
                _ => deduped.push(kv),
            }
        }
        AttributeSet(deduped)
    }
}

impl AttributeSet {
    pub(crate) fn to_vec(&self) -> Vec<KeyValue> {
        self.0.clone()
    }
}

impl PartialEq for AttributeSet {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len()
            && self
                .0
                .iter()
                .zip(&other.0)
                .all(|(a, b)| a.key == b.key && value_eq(&a.value, &b.value))
    }
}

impl Eq for AttributeSet {}

impl Hash for AttributeSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.0.len());
        for kv in &self.0 {
            kv.key.as_str().hash(state);
            hash_value(&kv.value, state);
        }
    }
}

// floats compare by bit pattern so that Eq stays reflexive
fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::F64(a), Value::F64(b)) => a.to_bits() == b.to_bits(),
        _ => a == b,
    }
}

fn hash_value<H: Hasher>(value: &Value, state: &mut H) {
    match value {
        Value::Bool(b) => {
            state.write_u8(0);
            b.hash(state);
        }
        Value::I64(i) => {
            state.write_u8(1);
            i.hash(state);
        }
        Value::F64(f) => {
            state.write_u8(2);
            f.to_bits().hash(state);
        }
        Value::String(s) => {
            state.write_u8(3);
            s.as_str().hash(state);
        }
    }
}
