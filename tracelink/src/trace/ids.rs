use std::fmt;
use std::num::ParseIntError;
use std::ops::{BitAnd, BitOr, Not};

/// W3C `trace-flags`: an 8-bit field of which only the `sampled` bit is
/// defined.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TraceFlags(u8);

impl TraceFlags {
    /// No flags set.
    pub const NOT_SAMPLED: TraceFlags = TraceFlags(0x00);

    /// The `sampled` bit: the caller may have recorded trace data.
    pub const SAMPLED: TraceFlags = TraceFlags(0x01);

    /// Wrap a raw flags byte.
    pub const fn new(flags: u8) -> Self {
        TraceFlags(flags)
    }

    /// Whether the `sampled` bit is set.
    pub fn is_sampled(&self) -> bool {
        *self & TraceFlags::SAMPLED == TraceFlags::SAMPLED
    }

    /// A copy with the `sampled` bit set or cleared.
    pub fn with_sampled(&self, sampled: bool) -> Self {
        if sampled {
            *self | TraceFlags::SAMPLED
        } else {
            *self & !TraceFlags::SAMPLED
        }
    }

    /// The raw flags byte.
    pub fn to_u8(self) -> u8 {
        self.0
    }
}

impl BitAnd for TraceFlags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        TraceFlags(self.0 & rhs.0)
    }
}

impl BitOr for TraceFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        TraceFlags(self.0 | rhs.0)
    }
}

impl Not for TraceFlags {
    type Output = Self;

    fn not(self) -> Self {
        TraceFlags(!self.0)
    }
}

impl fmt::LowerHex for TraceFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// 128-bit identifier shared by every span of one trace. Zero is invalid.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraceId(u128);

impl TraceId {
    /// The all-zero, invalid trace id.
    pub const INVALID: TraceId = TraceId(0);

    /// Build from big-endian bytes.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        TraceId(u128::from_be_bytes(bytes))
    }

    /// Big-endian byte representation.
    pub const fn to_bytes(self) -> [u8; 16] {
        self.0.to_be_bytes()
    }

    /// Parse a base-16 string. Leading zeros may be omitted.
    ///
    /// ```
    /// use tracelink::trace::TraceId;
    ///
    /// assert_eq!(TraceId::from_hex("2a").unwrap(), TraceId::from(42));
    /// assert!(TraceId::from_hex("zz").is_err());
    /// ```
    pub fn from_hex(hex: &str) -> Result<Self, ParseIntError> {
        u128::from_str_radix(hex, 16).map(TraceId)
    }

    /// Whether this id is non-zero.
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl From<u128> for TraceId {
    fn from(value: u128) -> Self {
        TraceId(value)
    }
}

impl fmt::Debug for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

impl fmt::LowerHex for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// 64-bit identifier of one span within a trace. Zero is invalid.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpanId(u64);

impl SpanId {
    /// The all-zero, invalid span id. Root spans record it as their parent.
    pub const INVALID: SpanId = SpanId(0);

    /// Build from big-endian bytes.
    pub const fn from_bytes(bytes: [u8; 8]) -> Self {
        SpanId(u64::from_be_bytes(bytes))
    }

    /// Big-endian byte representation.
    pub const fn to_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    /// Parse a base-16 string. Leading zeros may be omitted.
    pub fn from_hex(hex: &str) -> Result<Self, ParseIntError> {
        u64::from_str_radix(hex, 16).map(SpanId)
    }

    /// Whether this id is non-zero.
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl From<u64> for SpanId {
    fn from(value: u64) -> Self {
        SpanId(value)
    }
}

impl fmt::Debug for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl fmt::LowerHex for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(TraceId::from(0), "00000000000000000000000000000000")]
    #[case(TraceId::from(42), "0000000000000000000000000000002a")]
    #[case(
        TraceId::from(0x4bf92f3577b34da6a3ce929d0e0e4736),
        "4bf92f3577b34da6a3ce929d0e0e4736"
    )]
    fn trace_id_hex(#[case] id: TraceId, #[case] hex: &str) {
        assert_eq!(id.to_string(), hex);
        assert_eq!(format!("{:032x}", id), hex);
        assert_eq!(TraceId::from_hex(hex).unwrap(), id);
        assert_eq!(TraceId::from_bytes(id.to_bytes()), id);
    }

    #[rstest]
    #[case(SpanId::from(0), "0000000000000000")]
    #[case(SpanId::from(0xff), "00000000000000ff")]
    #[case(SpanId::from(0x00f067aa0ba902b7), "00f067aa0ba902b7")]
    fn span_id_hex(#[case] id: SpanId, #[case] hex: &str) {
        assert_eq!(id.to_string(), hex);
        assert_eq!(SpanId::from_hex(hex).unwrap(), id);
        assert_eq!(SpanId::from_bytes(id.to_bytes()), id);
    }

    #[test]
    fn zero_ids_are_invalid() {
        assert!(!TraceId::INVALID.is_valid());
        assert!(!SpanId::INVALID.is_valid());
        assert!(TraceId::from(1).is_valid());
        assert!(SpanId::from(1).is_valid());
    }

    #[test]
    fn sampled_flag() {
        assert!(TraceFlags::SAMPLED.is_sampled());
        assert!(!TraceFlags::default().is_sampled());
        assert_eq!(TraceFlags::new(0x03).with_sampled(false), TraceFlags::new(0x02));
        assert_eq!(format!("{:02x}", TraceFlags::SAMPLED), "01");
    }
}
