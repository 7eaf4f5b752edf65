use super::SERVICE_NAME;
use std::collections::BTreeMap;
use std::env;
use tracelink::{Key, Value};

const OTEL_RESOURCE_ATTRIBUTES: &str = "OTEL_RESOURCE_ATTRIBUTES";
const OTEL_SERVICE_NAME: &str = "OTEL_SERVICE_NAME";
const UNKNOWN_SERVICE: &str = "unknown_service";

/// Attributes from `OTEL_RESOURCE_ATTRIBUTES` plus a `service.name` that is
/// always present.
pub(super) fn detect() -> BTreeMap<Key, Value> {
    let mut attrs = env::var(OTEL_RESOURCE_ATTRIBUTES)
        .map(|s| parse_attributes(&s))
        .unwrap_or_default();

    match env::var(OTEL_SERVICE_NAME) {
        Ok(name) if !name.is_empty() => {
            attrs.insert(Key::from_static_str(SERVICE_NAME), Value::from(name));
        }
        _ => {
            attrs
                .entry(Key::from_static_str(SERVICE_NAME))
                .or_insert_with(|| Value::from(UNKNOWN_SERVICE));
        }
    }
    attrs
}

/// `k=v,k=v`; members without `=` are skipped, keys and values are trimmed.
fn parse_attributes(s: &str) -> BTreeMap<Key, Value> {
    s.split_terminator(',')
        .filter_map(|member| member.split_once('='))
        .map(|(k, v)| (k.trim(), v.trim()))
        .filter(|(k, _)| !k.is_empty())
        .map(|(k, v)| (Key::new(k.to_owned()), Value::from(v.to_owned())))
        .collect()
}
