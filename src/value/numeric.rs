//! Canonicalization of heterogeneous numeric encodings
//!
//! Model modules emit integers in several shapes: native numbers, decimal
//! strings, little-endian byte arrays (arbitrary precision), and single-field
//! wrapper objects such as `{"Number": 7}`. Every encoding of the same
//! mathematical integer must normalize to the same canonical decimal string
//! and the same big-endian hex dump, so renderers can compare and print values
//! without knowing which module produced them.
//!
//! No bignum dependency: the little-endian byte decomposition is itself the
//! wire format, so the magnitude arithmetic operates on those bytes directly.

use serde_json::Value;

/// Wrapper-object field recognized by one level of unwrapping.
const WRAPPER_FIELD: &str = "Number";

/// Sign + little-endian magnitude integer of arbitrary precision.
///
/// The magnitude is minimal (no trailing zero bytes); zero is the empty
/// magnitude with a positive sign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalInt {
    negative: bool,
    magnitude: Vec<u8>,
}

impl CanonicalInt {
    fn from_parts(negative: bool, mut magnitude: Vec<u8>) -> Self {
        while magnitude.last() == Some(&0) {
            magnitude.pop();
        }
        if magnitude.is_empty() {
            return Self {
                negative: false,
                magnitude,
            };
        }
        Self {
            negative,
            magnitude,
        }
    }

    /// Build from a signed 64-bit integer.
    pub fn from_i64(value: i64) -> Self {
        let mut magnitude = Vec::new();
        let mut rest = value.unsigned_abs();
        while rest > 0 {
            magnitude.push((rest & 0xff) as u8);
            rest >>= 8;
        }
        Self::from_parts(value < 0, magnitude)
    }

    /// Build from an unsigned 64-bit integer.
    pub fn from_u64(value: u64) -> Self {
        let mut magnitude = Vec::new();
        let mut rest = value;
        while rest > 0 {
            magnitude.push((rest & 0xff) as u8);
            rest >>= 8;
        }
        Self::from_parts(false, magnitude)
    }

    /// Build from a finite float, truncating toward zero.
    ///
    /// Returns `None` for NaN and infinities. Floor division by 256 is exact
    /// for binary floats, so magnitudes beyond the u64 range decompose
    /// correctly byte by byte.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let negative = value < 0.0;
        let mut rest = value.trunc().abs();
        let mut magnitude = Vec::new();
        while rest >= 1.0 {
            magnitude.push((rest % 256.0) as u8);
            rest = (rest / 256.0).trunc();
        }
        Some(Self::from_parts(negative, magnitude))
    }

    /// Build from a little-endian byte sequence (non-negative).
    pub fn from_le_bytes(bytes: &[u8]) -> Self {
        Self::from_parts(false, bytes.to_vec())
    }

    /// Parse a decimal string with an optional sign, at arbitrary precision.
    pub fn parse_decimal(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        let (negative, digits) = match trimmed.as_bytes()[0] {
            b'-' => (true, &trimmed[1..]),
            b'+' => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };
        if digits.is_empty() {
            return None;
        }
        let mut magnitude: Vec<u8> = Vec::new();
        for ch in digits.chars() {
            let digit = ch.to_digit(10)?;
            // magnitude = magnitude * 10 + digit, little-endian
            let mut carry = digit;
            for byte in magnitude.iter_mut() {
                let cur = *byte as u32 * 10 + carry;
                *byte = (cur & 0xff) as u8;
                carry = cur >> 8;
            }
            while carry > 0 {
                magnitude.push((carry & 0xff) as u8);
                carry >>= 8;
            }
        }
        Some(Self::from_parts(negative, magnitude))
    }

    /// Whether this integer is zero.
    pub fn is_zero(&self) -> bool {
        self.magnitude.is_empty()
    }

    /// Whether this integer is negative.
    pub fn is_negative(&self) -> bool {
        self.negative
    }

    /// Canonical base-10 text.
    pub fn to_decimal(&self) -> String {
        if self.is_zero() {
            return "0".to_string();
        }
        let mut digits: Vec<u8> = Vec::new();
        let mut mag = self.magnitude.clone();
        while !mag.is_empty() {
            // long division of the magnitude by 10, most-significant byte first
            let mut rem: u32 = 0;
            for byte in mag.iter_mut().rev() {
                let cur = rem * 256 + *byte as u32;
                *byte = (cur / 10) as u8;
                rem = cur % 10;
            }
            digits.push(b'0' + rem as u8);
            while mag.last() == Some(&0) {
                mag.pop();
            }
        }
        let mut out = String::with_capacity(digits.len() + 1);
        if self.negative {
            out.push('-');
        }
        for digit in digits.iter().rev() {
            out.push(*digit as char);
        }
        out
    }

    /// Minimal little-endian byte decomposition.
    ///
    /// Zero yields the single byte `[0]`; negative values have no byte form.
    pub fn to_le_bytes(&self) -> Option<Vec<u8>> {
        if self.negative {
            return None;
        }
        if self.is_zero() {
            return Some(vec![0]);
        }
        Some(self.magnitude.clone())
    }

    /// Value as u64 if it fits (non-negative, at most 8 magnitude bytes).
    fn as_u64(&self) -> Option<u64> {
        if self.negative || self.magnitude.len() > 8 {
            return None;
        }
        let mut acc: u64 = 0;
        for byte in self.magnitude.iter().rev() {
            acc = (acc << 8) | *byte as u64;
        }
        Some(acc)
    }
}

fn value_as_byte(value: &Value) -> Option<u8> {
    let num = value.as_u64()?;
    u8::try_from(num).ok()
}

fn bytes_of(value: &Value) -> Option<Vec<u8>> {
    let items = value.as_array()?;
    if items.is_empty() {
        return None;
    }
    items.iter().map(value_as_byte).collect()
}

fn canonical_inner(raw: &Value, allow_wrapper: bool) -> Option<CanonicalInt> {
    match raw {
        Value::Number(num) => {
            if let Some(v) = num.as_i64() {
                return Some(CanonicalInt::from_i64(v));
            }
            if let Some(v) = num.as_u64() {
                return Some(CanonicalInt::from_u64(v));
            }
            CanonicalInt::from_f64(num.as_f64()?)
        }
        Value::String(text) => CanonicalInt::parse_decimal(text),
        Value::Array(_) => bytes_of(raw).map(|bytes| CanonicalInt::from_le_bytes(&bytes)),
        Value::Object(map) if allow_wrapper => {
            // wrapper unwrapping recurses exactly one level
            let nested = map.get(WRAPPER_FIELD)?;
            canonical_inner(nested, false)
        }
        _ => None,
    }
}

/// Normalize any recognized numeric encoding into a [`CanonicalInt`].
///
/// Accepts finite native numbers (fractional part truncates toward zero),
/// non-empty decimal strings (invalid text is `None`, not an error), byte
/// arrays interpreted little-endian, and `{"Number": <nested>}` wrappers
/// unwrapped exactly one level. Every other shape is `None`.
pub fn to_canonical_integer(raw: &Value) -> Option<CanonicalInt> {
    canonical_inner(raw, true)
}

/// Canonical base-10 text of `raw`, or `fallback` when non-numeric.
pub fn to_decimal_string(raw: &Value, fallback: &str) -> String {
    match to_canonical_integer(raw) {
        Some(canonical) => canonical.to_decimal(),
        None => fallback.to_string(),
    }
}

/// Byte decomposition of `raw`.
///
/// An array of valid bytes passes through unchanged (also behind one wrapper
/// level); anything else derives little-endian bytes from the canonical
/// integer. Zero is the single byte `[0]`.
pub fn to_byte_array(raw: &Value) -> Option<Vec<u8>> {
    if let Some(bytes) = bytes_of(raw) {
        return Some(bytes);
    }
    if let Value::Object(map) = raw {
        if let Some(nested) = map.get(WRAPPER_FIELD) {
            if let Some(bytes) = bytes_of(nested) {
                return Some(bytes);
            }
        }
    }
    to_canonical_integer(raw)?.to_le_bytes()
}

/// Big-endian hex dump: `"0x"` then each byte as two uppercase digits,
/// most-significant first. Empty input renders as `"0x00"`.
pub fn to_hex(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return "0x00".to_string();
    }
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("0x");
    for byte in bytes.iter().rev() {
        out.push_str(&format!("{byte:02X}"));
    }
    out
}

/// Interpret `raw` as a slice boundary clamped into `[0, len]`.
///
/// Negative values clamp to 0 and values past the end clamp to `len`;
/// non-numeric input is `None`, meaning "do not slice".
pub fn to_bounded_index(raw: &Value, len: usize) -> Option<usize> {
    let canonical = to_canonical_integer(raw)?;
    if canonical.is_negative() {
        return Some(0);
    }
    match canonical.as_u64() {
        Some(v) if v < len as u64 => Some(v as usize),
        _ => Some(len),
    }
}

/// Interpret `raw` as a strict member index: `Some` only when `0 <= v < len`.
///
/// Used for "is this row the current one" highlighting; deliberately not the
/// same policy as [`to_bounded_index`].
pub fn to_member_index(raw: &Value, len: usize) -> Option<usize> {
    let canonical = to_canonical_integer(raw)?;
    if canonical.is_negative() {
        return None;
    }
    match canonical.as_u64() {
        Some(v) if v < len as u64 => Some(v as usize),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn decimal_agrees_across_encodings() {
        assert_eq!(to_decimal_string(&json!(255), "?"), "255");
        assert_eq!(to_decimal_string(&json!("255"), "?"), "255");
        assert_eq!(to_decimal_string(&json!([255, 0]), "?"), "255");
        assert_eq!(to_decimal_string(&json!({ "Number": 255 }), "?"), "255");
    }

    #[test]
    fn fractional_numbers_truncate_toward_zero() {
        assert_eq!(to_decimal_string(&json!(3.9), "?"), "3");
        assert_eq!(to_decimal_string(&json!(-3.9), "?"), "-3");
    }

    #[test]
    fn invalid_strings_fall_back() {
        assert_eq!(to_decimal_string(&json!("ten"), "?"), "?");
        assert_eq!(to_decimal_string(&json!(""), "?"), "?");
        assert_eq!(to_decimal_string(&json!(null), "-"), "-");
    }

    #[test]
    fn wrapper_unwraps_exactly_one_level() {
        assert_eq!(to_decimal_string(&json!({ "Number": "42" }), "?"), "42");
        // a wrapper inside a wrapper is out of contract
        assert_eq!(
            to_decimal_string(&json!({ "Number": { "Number": 42 } }), "?"),
            "?"
        );
    }

    #[test]
    fn byte_arrays_pass_through_and_derive() {
        assert_eq!(to_byte_array(&json!([255, 0])), Some(vec![255, 0]));
        assert_eq!(to_byte_array(&json!(256)), Some(vec![0, 1]));
        assert_eq!(to_byte_array(&json!(0)), Some(vec![0]));
        assert_eq!(to_byte_array(&json!(-5)), None);
        assert_eq!(to_byte_array(&json!("oops")), None);
    }

    #[test]
    fn hex_is_big_endian_uppercase() {
        assert_eq!(to_hex(&[255, 0]), "0x00FF");
        assert_eq!(to_hex(&[0x0a]), "0x0A");
        assert_eq!(to_hex(&[]), "0x00");
    }

    #[test]
    fn bounded_index_clamps() {
        assert_eq!(to_bounded_index(&json!(3), 10), Some(3));
        assert_eq!(to_bounded_index(&json!(-2), 10), Some(0));
        assert_eq!(to_bounded_index(&json!(99), 10), Some(10));
        assert_eq!(to_bounded_index(&json!("nope"), 10), None);
    }

    #[test]
    fn member_index_is_strict() {
        assert_eq!(to_member_index(&json!(9), 10), Some(9));
        assert_eq!(to_member_index(&json!(10), 10), None);
        assert_eq!(to_member_index(&json!(-1), 10), None);
        assert_eq!(to_member_index(&json!(null), 10), None);
    }

    #[test]
    fn large_magnitudes_round_trip_decimal() {
        let text = "340282366920938463463374607431768211456"; // 2^128
        let canonical = CanonicalInt::parse_decimal(text).unwrap();
        assert_eq!(canonical.to_decimal(), text);
        let bytes = canonical.to_le_bytes().unwrap();
        assert_eq!(bytes.len(), 17);
        assert_eq!(
            to_decimal_string(&serde_json::to_value(&bytes).unwrap(), "?"),
            text
        );
    }

    proptest! {
        #[test]
        fn encodings_of_the_same_value_agree(value: u64) {
            let expected = value.to_string();
            let canonical = CanonicalInt::from_u64(value);
            prop_assert_eq!(canonical.to_decimal(), expected.clone());

            let as_string = json!(expected.clone());
            prop_assert_eq!(to_decimal_string(&as_string, "?"), expected.clone());

            let bytes = canonical.to_le_bytes().unwrap();
            let as_bytes = serde_json::to_value(&bytes).unwrap();
            prop_assert_eq!(to_decimal_string(&as_bytes, "?"), expected);
        }
    }
}
