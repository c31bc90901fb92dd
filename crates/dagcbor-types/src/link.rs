//! Typed links and their wire payload.
//!
//! On the wire a link is CBOR tag 42 wrapping a byte string. The byte string
//! is the binary identifier prefixed with a single `0x00`, the multibase code
//! for "raw binary".

use std::fmt;
use std::str::FromStr;

use cid::Cid;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::LinkError;

/// CBOR tag number reserved for links.
pub const CBOR_TAG_LINK: u64 = 42;

/// Key marking a link in the JSON representation: `{"/": "<cid>"}`.
pub const LINK_MARKER: &str = "/";

/// Newtype name a binary serializer sees when a [`Link`] is serialized.
///
/// The codec's serializer recognizes it and turns the carried identifier
/// bytes into a link node instead of a plain byte string.
pub const LINK_NEWTYPE: &str = "$dagcbor::private::Link";

const MULTIBASE_IDENTITY: u8 = 0x00;

/// Encode an identifier as a tag-42 payload.
pub fn encode_link_payload(cid: &Cid) -> Vec<u8> {
    let raw = cid.to_bytes();
    let mut out = Vec::with_capacity(raw.len() + 1);
    out.push(MULTIBASE_IDENTITY);
    out.extend_from_slice(&raw);
    out
}

/// Decode a tag-42 payload back into an identifier.
pub fn decode_link_payload(payload: &[u8]) -> Result<Cid, LinkError> {
    let (&first, rest) = payload.split_first().ok_or(LinkError::Empty)?;
    if first != MULTIBASE_IDENTITY {
        return Err(LinkError::MissingMultibase(first));
    }
    Cid::try_from(rest).map_err(|e| LinkError::InvalidCid(e.to_string()))
}

/// A reference to another object, embeddable in host structures.
///
/// Serializes as a real link through the DAG-CBOR codec and as
/// `{"/": "<cid>"}` through human-readable formats such as JSON.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Link(pub Cid);

impl Link {
    /// Create a new link to `cid`.
    pub fn new(cid: Cid) -> Self {
        Self(cid)
    }

    /// The target identifier.
    pub fn cid(&self) -> &Cid {
        &self.0
    }

    /// Short hex of the identifier bytes, for logs.
    pub fn short_hex(&self) -> String {
        let raw = self.0.to_bytes();
        let tail = raw.len().saturating_sub(4);
        hex::encode(&raw[tail..])
    }
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Link({})", self.0)
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Cid> for Link {
    fn from(cid: Cid) -> Self {
        Self(cid)
    }
}

impl From<Link> for Cid {
    fn from(link: Link) -> Self {
        link.0
    }
}

impl FromStr for Link {
    type Err = LinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Cid::try_from(s)
            .map(Self)
            .map_err(|e| LinkError::InvalidCid(e.to_string()))
    }
}

struct RawBytes<'a>(&'a [u8]);

impl Serialize for RawBytes<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(self.0)
    }
}

impl Serialize for Link {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            let mut map = serializer.serialize_map(Some(1))?;
            map.serialize_entry(LINK_MARKER, &self.0.to_string())?;
            map.end()
        } else {
            serializer.serialize_newtype_struct(LINK_NEWTYPE, &RawBytes(&self.0.to_bytes()))
        }
    }
}

struct LinkVisitor;

impl<'de> Visitor<'de> for LinkVisitor {
    type Value = Link;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a link: identifier bytes, an identifier string, or {\"/\": <cid>}")
    }

    fn visit_newtype_struct<D: Deserializer<'de>>(self, d: D) -> Result<Link, D::Error> {
        d.deserialize_any(self)
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Link, E> {
        Cid::try_from(v).map(Link).map_err(E::custom)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Link, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Link, A::Error> {
        let key: String = map
            .next_key()?
            .ok_or_else(|| de::Error::invalid_length(0, &self))?;
        if key != LINK_MARKER {
            return Err(de::Error::unknown_field(&key, &[LINK_MARKER]));
        }
        let value: String = map.next_value()?;
        if map.next_key::<String>()?.is_some() {
            return Err(de::Error::invalid_length(2, &self));
        }
        value.parse().map_err(de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for Link {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_newtype_struct(LINK_NEWTYPE, LinkVisitor)
    }
}
