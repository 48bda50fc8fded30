//! Wire-value utilities shared by renderers and the orchestration core
//!
//! Module states and outputs cross the module boundary as JSON-shaped values.
//! The helpers here normalize the encodings models actually emit: numbers that
//! may arrive as native floats, decimal strings, little-endian byte arrays, or
//! wrapper objects, and state fragments shaped as single-key tagged unions.

pub mod numeric;
pub mod variant;

pub use numeric::{
    CanonicalInt, to_bounded_index, to_byte_array, to_canonical_integer, to_decimal_string,
    to_hex, to_member_index,
};
pub use variant::{Variant, as_tuple, extract, extract_or_string};
