use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use cid::Cid;
use num_bigint::BigUint;

/// The decoded form of a DAG-CBOR object.
///
/// Every value that can cross the codec is one of these variants. Maps only
/// ever carry string keys; a non-string key is rejected at decode time, so
/// there is no representation for it here.
///
/// `BigInt` only exists on the way in: the wire form of a big integer is its
/// magnitude as a byte string, so a decoded tree reports it as `Bytes`.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Null,
    Bool(bool),
    /// CBOR integers span `-2^64 ..= 2^64 - 1`, which only `i128` covers.
    Integer(i128),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    BigInt(BigUint),
    List(Vec<Node>),
    Map(BTreeMap<String, Node>),
    Link(Cid),
}

/// Discriminant of a [`Node`], for error messages and dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    Null,
    Bool,
    Integer,
    Float,
    Text,
    Bytes,
    BigInt,
    List,
    Map,
    Link,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Text => "text",
            Self::Bytes => "bytes",
            Self::BigInt => "bigint",
            Self::List => "list",
            Self::Map => "map",
            Self::Link => "link",
        };
        f.write_str(name)
    }
}

impl Node {
    /// An empty map.
    pub fn map() -> Self {
        Self::Map(BTreeMap::new())
    }

    /// An empty list.
    pub fn list() -> Self {
        Self::List(Vec::new())
    }

    /// The kind of value held.
    pub fn kind(&self) -> Kind {
        match self {
            Self::Null => Kind::Null,
            Self::Bool(_) => Kind::Bool,
            Self::Integer(_) => Kind::Integer,
            Self::Float(_) => Kind::Float,
            Self::Text(_) => Kind::Text,
            Self::Bytes(_) => Kind::Bytes,
            Self::BigInt(_) => Kind::BigInt,
            Self::List(_) => Kind::List,
            Self::Map(_) => Kind::Map,
            Self::Link(_) => Kind::Link,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_link(&self) -> bool {
        matches!(self, Self::Link(_))
    }

    /// The boolean, if this is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The integer, if this is one. Floats are not converted.
    pub fn as_integer(&self) -> Option<i128> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// The float, if this is one.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// The text, if this is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The byte string, if this is one.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// The link target, if this is a link.
    pub fn as_link(&self) -> Option<&Cid> {
        match self {
            Self::Link(c) => Some(c),
            _ => None,
        }
    }

    /// The elements, if this is a list.
    pub fn as_list(&self) -> Option<&[Node]> {
        match self {
            Self::List(l) => Some(l),
            _ => None,
        }
    }

    /// The entries, if this is a map.
    pub fn as_map(&self) -> Option<&BTreeMap<String, Node>> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Look up a key if this node is a map.
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.as_map().and_then(|m| m.get(key))
    }

    /// Look up a position if this node is a list.
    pub fn get_index(&self, index: usize) -> Option<&Node> {
        self.as_list().and_then(|l| l.get(index))
    }
}

/// Canonical map key order: shorter keys first, equal lengths bytewise.
///
/// This is the RFC 7049 canonical ordering restricted to text keys, whose
/// encoded header grows with the key length.
pub fn canonical_key_cmp(a: &str, b: &str) -> Ordering {
    a.len()
        .cmp(&b.len())
        .then_with(|| a.as_bytes().cmp(b.as_bytes()))
}

macro_rules! integer_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Node {
                fn from(v: $t) -> Self {
                    Self::Integer(i128::from(v))
                }
            }
        )*
    };
}

integer_from!(i8, i16, i32, i64, i128, u8, u16, u32, u64);

impl From<bool> for Node {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<f32> for Node {
    fn from(v: f32) -> Self {
        Self::Float(f64::from(v))
    }
}

impl From<f64> for Node {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Node {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for Node {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&[u8]> for Node {
    fn from(v: &[u8]) -> Self {
        Self::Bytes(v.to_vec())
    }
}

impl From<Vec<u8>> for Node {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<BigUint> for Node {
    fn from(v: BigUint) -> Self {
        Self::BigInt(v)
    }
}

impl From<Cid> for Node {
    fn from(v: Cid) -> Self {
        Self::Link(v)
    }
}

impl From<Vec<Node>> for Node {
    fn from(v: Vec<Node>) -> Self {
        Self::List(v)
    }
}

impl From<BTreeMap<String, Node>> for Node {
    fn from(v: BTreeMap<String, Node>) -> Self {
        Self::Map(v)
    }
}

impl<T: Into<Node>> From<Option<T>> for Node {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

impl FromIterator<Node> for Node {
    fn from_iter<I: IntoIterator<Item = Node>>(iter: I) -> Self {
        Self::List(iter.into_iter().collect())
    }
}

impl<K: Into<String>> FromIterator<(K, Node)> for Node {
    fn from_iter<I: IntoIterator<Item = (K, Node)>>(iter: I) -> Self {
        Self::Map(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cid::multihash::Multihash;
    use sha2::{Digest, Sha256};

    fn test_cid(data: &[u8]) -> Cid {
        let digest = Sha256::digest(data);
        Cid::new_v1(0x71, Multihash::wrap(0x12, &digest).unwrap())
    }

    #[test]
    fn key_order_is_length_first() {
        let mut keys = vec!["zebra", "cats", "dog", "cat", "whale", "a"];
        keys.sort_by(|a, b| canonical_key_cmp(a, b));
        assert_eq!(keys, vec!["a", "cat", "dog", "cats", "whale", "zebra"]);
    }

    #[test]
    fn key_order_equal_length_is_bytewise() {
        assert_eq!(canonical_key_cmp("B", "a"), Ordering::Less);
        assert_eq!(canonical_key_cmp("ab", "ab"), Ordering::Equal);
    }

    #[test]
    fn kind_matches_variant() {
        assert_eq!(Node::Null.kind(), Kind::Null);
        assert_eq!(Node::from(3u8).kind(), Kind::Integer);
        assert_eq!(Node::from("x").kind(), Kind::Text);
        assert_eq!(Node::from(vec![1u8, 2]).kind(), Kind::Bytes);
        assert_eq!(Node::map().kind(), Kind::Map);
        assert_eq!(Node::list().kind(), Kind::List);
        assert_eq!(Node::from(test_cid(b"x")).kind(), Kind::Link);
        assert_eq!(format!("{}", Kind::BigInt), "bigint");
    }

    #[test]
    fn map_from_iter_and_lookup() {
        let node: Node = [("b", Node::from(2u8)), ("a", Node::from(1u8))]
            .into_iter()
            .collect();
        assert_eq!(node.get("a").and_then(Node::as_integer), Some(1));
        assert!(node.get("missing").is_none());
        assert!(Node::from("a").get("a").is_none());
    }

    #[test]
    fn list_lookup_by_index() {
        let node: Node = vec![Node::from(true), Node::Null].into_iter().collect();
        assert_eq!(node.get_index(0).and_then(Node::as_bool), Some(true));
        assert!(node.get_index(1).is_some_and(Node::is_null));
        assert!(node.get_index(2).is_none());
    }

    #[test]
    fn option_maps_to_null() {
        assert_eq!(Node::from(None::<u8>), Node::Null);
        assert_eq!(Node::from(Some("x")), Node::Text("x".into()));
    }

    #[test]
    fn link_accessor() {
        let cid = test_cid(b"link");
        let node = Node::from(cid);
        assert!(node.is_link());
        assert_eq!(node.as_link(), Some(&cid));
        assert!(Node::Null.as_link().is_none());
    }
}
