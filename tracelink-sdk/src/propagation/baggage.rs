use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use std::iter;
use std::sync::OnceLock;
use tracelink::baggage::{Baggage, BaggageExt};
use tracelink::propagation::{Extractor, Injector, TextMapPropagator};
use tracelink::{tl_warn, Context};

static BAGGAGE_HEADER: &str = "baggage";
const FRAGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'%')
    .add(b',')
    .add(b';')
    .add(b'=');
// `;` separates properties and `=` splits a property, both stay literal
const METADATA: &AsciiSet = &CONTROLS.add(b' ').add(b'"').add(b'%').add(b',');

static BAGGAGE_FIELDS: OnceLock<[String; 1]> = OnceLock::new();

fn baggage_fields() -> &'static [String; 1] {
    BAGGAGE_FIELDS.get_or_init(|| [BAGGAGE_HEADER.to_owned()])
}

/// Propagates baggage in the [W3C Baggage] format.
///
/// Each entry travels as a percent-encoded `name=value` list member,
/// optionally followed by `;`-separated properties kept as the entry's
/// metadata.
///
/// ```
/// use std::collections::HashMap;
/// use tracelink::baggage::{Baggage, BaggageExt};
/// use tracelink::propagation::TextMapPropagator;
/// use tracelink_sdk::propagation::BaggagePropagator;
///
/// let mut headers = HashMap::new();
/// headers.insert("baggage".to_string(), "user_id=1".to_string());
///
/// let propagator = BaggagePropagator::new();
/// let cx = propagator.extract(&headers);
/// assert_eq!(cx.baggage().get("user_id").map(|v| v.as_str()), Some("1"));
///
/// let mut baggage = Baggage::new();
/// baggage.insert("server_id", "42").unwrap();
/// let mut outbound: HashMap<String, String> = HashMap::new();
/// propagator.inject_context(&cx.with_baggage(baggage), &mut outbound);
/// assert_eq!(outbound.get("baggage").map(String::as_str), Some("server_id=42"));
/// ```
///
/// Members that do not parse are skipped with a warning; the rest of the
/// header is still used.
///
/// [W3C Baggage]: https://w3c.github.io/baggage
#[derive(Debug, Default)]
pub struct BaggagePropagator {
    _private: (),
}

impl BaggagePropagator {
    /// Construct a new baggage propagator.
    pub fn new() -> Self {
        BaggagePropagator { _private: () }
    }
}

impl TextMapPropagator for BaggagePropagator {
    fn inject_context(&self, cx: &Context, injector: &mut dyn Injector) {
        let baggage = cx.baggage();
        if baggage.is_empty() {
            return;
        }
        let header_value = baggage
            .iter()
            .map(|(name, (value, metadata))| {
                let metadata_str = metadata.as_str();
                let metadata_prefix = if metadata_str.is_empty() { "" } else { ";" };
                utf8_percent_encode(name.as_str(), FRAGMENT)
                    .chain(iter::once("="))
                    .chain(utf8_percent_encode(value.as_str(), FRAGMENT))
                    .chain(iter::once(metadata_prefix))
                    .chain(utf8_percent_encode(metadata_str, METADATA))
                    .collect()
            })
            .collect::<Vec<String>>()
            .join(",");
        injector.set(BAGGAGE_HEADER, header_value);
    }

    fn extract_with_context(&self, cx: &Context, extractor: &dyn Extractor) -> Context {
        let Some(header_value) = extractor.get(BAGGAGE_HEADER) else {
            return cx.clone();
        };

        let mut baggage = Baggage::new();
        for member in header_value.split(',').filter(|m| !m.trim().is_empty()) {
            let mut props = member.split(';');
            let name_and_value = props.next().unwrap_or_default();
            let Some((name, value)) = name_and_value.split_once('=') else {
                tl_warn!(
                    name: "BaggagePropagator.Extract.InvalidKeyValueFormat",
                    member = member.to_string()
                );
                continue;
            };

            // optional whitespace is trimmed before decoding, so encoded
            // spaces survive
            let (name, value) = match (
                percent_decode_str(name.trim()).decode_utf8(),
                percent_decode_str(value.trim()).decode_utf8(),
            ) {
                (Ok(name), Ok(value)) => (name.into_owned(), value.into_owned()),
                _ => {
                    tl_warn!(
                        name: "BaggagePropagator.Extract.InvalidUTF8",
                        member = member.to_string()
                    );
                    continue;
                }
            };

            // the leading `;` is a separator, not part of the metadata
            let metadata = props
                .flat_map(|prop| percent_decode_str(prop.trim()).decode_utf8())
                .map(|prop| prop.into_owned())
                .collect::<Vec<String>>()
                .join(";");

            if let Err(err) = baggage.insert_with_metadata(name, value, metadata.as_str()) {
                tl_warn!(
                    name: "BaggagePropagator.Extract.EntryRejected",
                    member = member.to_string(),
                    error = err.to_string()
                );
            }
        }

        cx.with_baggage(baggage)
    }

    fn fields(&self) -> &[String] {
        baggage_fields()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn carrier(header: &str) -> HashMap<String, String> {
        let mut carrier = HashMap::new();
        carrier.insert(BAGGAGE_HEADER.to_string(), header.to_string());
        carrier
    }

    #[rstest]
    #[case("key1=val1,key2=val2", vec![("key1", "val1", ""), ("key2", "val2", "")])]
    #[case("key1 = val1,  key2 =val2   ", vec![("key1", "val1", ""), ("key2", "val2", "")])]
    #[case("key1=val1;prop=1,key2=val2", vec![("key1", "val1", "prop=1"), ("key2", "val2", "")])]
    #[case("key1=val1%2Cval2,key2=val3%3D4", vec![("key1", "val1,val2", ""), ("key2", "val3=4", "")])]
    #[case("key1=val1,broken,key2=val2", vec![("key1", "val1", ""), ("key2", "val2", "")])]
    #[case("key1=val1,,", vec![("key1", "val1", "")])]
    #[case("bad key=1,key2=val2", vec![("key2", "val2", "")])]
    #[case("", vec![])]
    fn extract(#[case] header: &str, #[case] entries: Vec<(&str, &str, &str)>) {
        let cx = BaggagePropagator::new().extract(&carrier(header));
        let baggage = cx.baggage();
        assert_eq!(baggage.len(), entries.len());
        for (key, value, metadata) in entries {
            let (v, m) = baggage.get_with_metadata(key).unwrap();
            assert_eq!(v.as_str(), value);
            assert_eq!(m.as_str(), metadata);
        }
    }

    #[test]
    fn inject_encodes_reserved_characters() {
        let mut baggage = Baggage::new();
        baggage.insert("key1", "val1,val2").unwrap();
        baggage
            .insert_with_metadata("key2", "val 3", "prop=1")
            .unwrap();
        let cx = Context::new().with_baggage(baggage);

        let mut carrier: HashMap<String, String> = HashMap::new();
        BaggagePropagator::new().inject_context(&cx, &mut carrier);
        assert_eq!(
            carrier.get(BAGGAGE_HEADER).map(String::as_str),
            Some("key1=val1%2Cval2,key2=val%203;prop=1")
        );
    }

    #[test]
    fn inject_skips_empty_baggage() {
        let mut carrier: HashMap<String, String> = HashMap::new();
        BaggagePropagator::new().inject_context(&Context::new(), &mut carrier);
        assert!(carrier.is_empty());
    }

    #[rstest]
    #[case("user_id", "alice smith", "")]
    #[case("tenant", "acme", "ttl=60")]
    #[case("discount", "100%25", "")]
    #[case("discount", "100%", "")]
    #[case("k", "v", "a,b=c")]
    #[case("k", "v", "ttl=60;secure")]
    #[case("k", " v ", "")]
    #[case("k", "v", " padded ")]
    #[case("k", "a=b;c,d", "")]
    fn round_trip(#[case] name: &str, #[case] value: &str, #[case] metadata: &str) {
        let mut baggage = Baggage::new();
        baggage
            .insert_with_metadata(name.to_string(), value.to_string(), metadata)
            .unwrap();
        baggage.insert("other", "x").unwrap();
        let cx = Context::new().with_baggage(baggage.clone());

        let propagator = BaggagePropagator::new();
        let mut carrier: HashMap<String, String> = HashMap::new();
        propagator.inject(&cx, &mut carrier);
        let extracted = propagator.extract(&carrier);
        assert_eq!(extracted.baggage(), &baggage);
    }

    #[test]
    fn inject_encodes_percent_and_metadata_separators() {
        let mut baggage = Baggage::new();
        baggage
            .insert_with_metadata("discount", "100%", "a,b=c")
            .unwrap();
        let cx = Context::new().with_baggage(baggage);

        let mut carrier: HashMap<String, String> = HashMap::new();
        BaggagePropagator::new().inject_context(&cx, &mut carrier);
        assert_eq!(
            carrier.get(BAGGAGE_HEADER).map(String::as_str),
            Some("discount=100%25;a%2Cb=c")
        );
    }

    #[test]
    fn missing_header_keeps_context() {
        let cx = Context::new().with_value(7u8);
        let empty: HashMap<String, String> = HashMap::new();
        let extracted = BaggagePropagator::new().extract_with_context(&cx, &empty);
        assert_eq!(extracted.get::<u8>(), Some(&7));
        assert!(extracted.baggage().is_empty());
    }
}
