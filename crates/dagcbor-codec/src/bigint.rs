//! Arbitrary-precision integers as magnitude byte strings.
//!
//! The wire form is the big-endian magnitude with no sign and no leading
//! zeros; zero is the empty byte string. Use as a serde `with` module:
//!
//! ```
//! use num_bigint::BigUint;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Supply {
//!     #[serde(with = "dagcbor_codec::bigint")]
//!     total: BigUint,
//! }
//! ```

use std::fmt;

use num_bigint::BigUint;
use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserializer, Serializer};

/// Big-endian magnitude, empty for zero.
pub fn magnitude(n: &BigUint) -> Vec<u8> {
    if n.bits() == 0 {
        Vec::new()
    } else {
        n.to_bytes_be()
    }
}

/// Inverse of [`magnitude`]; the empty slice is zero.
pub fn from_magnitude(bytes: &[u8]) -> BigUint {
    BigUint::from_bytes_be(bytes)
}

/// Write `n` as its big-endian magnitude bytes.
pub fn serialize<S: Serializer>(n: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_bytes(&magnitude(n))
}

/// Read a big-endian magnitude back into an unsigned integer.
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
    deserializer.deserialize_bytes(MagnitudeVisitor)
}

struct MagnitudeVisitor;

impl<'de> Visitor<'de> for MagnitudeVisitor {
    type Value = BigUint;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a big-endian magnitude byte string")
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<BigUint, E> {
        Ok(from_magnitude(v))
    }

    fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<BigUint, E> {
        Ok(from_magnitude(&v))
    }

    // Formats without a byte-string type hand the bytes over as a sequence.
    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<BigUint, A::Error> {
        let mut bytes = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(b) = seq.next_element::<u8>()? {
            bytes.push(b);
        }
        Ok(from_magnitude(&bytes))
    }
}
