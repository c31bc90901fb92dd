//! Serde deserializer reading object trees.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::iter;
use std::vec;

use dagcbor_types::{Node, LINK_MARKER, LINK_NEWTYPE};
use serde::de::value::{MapDeserializer, StringDeserializer};
use serde::de::{
    self, DeserializeOwned, DeserializeSeed, EnumAccess, IntoDeserializer, MapAccess, SeqAccess,
    VariantAccess, Visitor,
};
use serde::forward_to_deserialize_any;

use crate::bigint::magnitude;
use crate::error::{CodecError, CodecResult};

/// Deserialize a host value out of an object tree.
///
/// The inverse of [`to_node`](crate::to_node). A link met by a field that
/// is not a [`Link`](dagcbor_types::Link) is presented as `{"/": "<cid>"}`.
pub fn from_node<T: DeserializeOwned>(node: Node) -> CodecResult<T> {
    T::deserialize(NodeDeserializer::new(node))
}

/// Feeds an object tree to a host `Deserialize` implementation.
pub struct NodeDeserializer {
    node: Node,
}

impl NodeDeserializer {
    /// Create a new deserializer over `node`.
    pub fn new(node: Node) -> Self {
        Self { node }
    }
}

impl<'de> de::Deserializer<'de> for NodeDeserializer {
    type Error = CodecError;

    fn is_human_readable(&self) -> bool {
        false
    }

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> CodecResult<V::Value> {
        match self.node {
            Node::Null => visitor.visit_unit(),
            Node::Bool(b) => visitor.visit_bool(b),
            Node::Integer(i) => visit_integer(i, visitor),
            Node::Float(f) => visitor.visit_f64(f),
            Node::Text(s) => visitor.visit_string(s),
            Node::Bytes(b) => visitor.visit_byte_buf(b),
            Node::BigInt(n) => visitor.visit_byte_buf(magnitude(&n)),
            Node::List(items) => visit_list(items, visitor),
            Node::Map(map) => visit_map(map, visitor),
            Node::Link(cid) => visitor.visit_map(MapDeserializer::new(iter::once((
                LINK_MARKER,
                cid.to_string(),
            )))),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> CodecResult<V::Value> {
        match self.node {
            Node::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        visitor: V,
    ) -> CodecResult<V::Value> {
        if name == LINK_NEWTYPE {
            if let Node::Link(cid) = &self.node {
                return visitor.visit_bytes(&cid.to_bytes());
            }
        }
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> CodecResult<V::Value> {
        match self.node {
            Node::Text(variant) => {
                let access: StringDeserializer<CodecError> = variant.into_deserializer();
                visitor.visit_enum(access)
            }
            Node::Map(map) if map.len() == 1 => {
                let (variant, value) = map
                    .into_iter()
                    .next()
                    .ok_or_else(|| CodecError::Custom("empty enum map".into()))?;
                visitor.visit_enum(EnumAccessor { variant, value })
            }
            other => Err(CodecError::UnexpectedKind {
                expected: "enum (text or single-entry map)",
                found: other.kind(),
            }),
        }
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple tuple_struct map struct
        identifier ignored_any
    }
}

fn visit_integer<'de, V: Visitor<'de>>(i: i128, visitor: V) -> CodecResult<V::Value> {
    if let Ok(u) = u64::try_from(i) {
        visitor.visit_u64(u)
    } else if let Ok(s) = i64::try_from(i) {
        visitor.visit_i64(s)
    } else {
        visitor.visit_i128(i)
    }
}

fn visit_list<'de, V: Visitor<'de>>(items: Vec<Node>, visitor: V) -> CodecResult<V::Value> {
    let len = items.len();
    let mut access = SeqAccessor {
        iter: items.into_iter(),
    };
    let value = visitor.visit_seq(&mut access)?;
    if access.iter.len() == 0 {
        Ok(value)
    } else {
        Err(de::Error::invalid_length(len, &"fewer elements in list"))
    }
}

fn visit_map<'de, V: Visitor<'de>>(
    map: BTreeMap<String, Node>,
    visitor: V,
) -> CodecResult<V::Value> {
    visitor.visit_map(MapAccessor {
        iter: map.into_iter(),
        value: None,
    })
}

struct SeqAccessor {
    iter: vec::IntoIter<Node>,
}

impl<'de> SeqAccess<'de> for SeqAccessor {
    type Error = CodecError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> CodecResult<Option<T::Value>> {
        match self.iter.next() {
            Some(node) => seed.deserialize(NodeDeserializer::new(node)).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct MapAccessor {
    iter: btree_map::IntoIter<String, Node>,
    value: Option<Node>,
}

impl<'de> MapAccess<'de> for MapAccessor {
    type Error = CodecError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> CodecResult<Option<K::Value>> {
        match self.iter.next() {
            Some((key, value)) => {
                self.value = Some(value);
                let key: StringDeserializer<CodecError> = key.into_deserializer();
                seed.deserialize(key).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> CodecResult<T::Value> {
        let value = self
            .value
            .take()
            .ok_or_else(|| CodecError::Custom("map value requested before its key".into()))?;
        seed.deserialize(NodeDeserializer::new(value))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct EnumAccessor {
    variant: String,
    value: Node,
}

impl<'de> EnumAccess<'de> for EnumAccessor {
    type Error = CodecError;
    type Variant = VariantAccessor;

    fn variant_seed<V: DeserializeSeed<'de>>(
        self,
        seed: V,
    ) -> CodecResult<(V::Value, VariantAccessor)> {
        let key: StringDeserializer<CodecError> = self.variant.into_deserializer();
        let variant = seed.deserialize(key)?;
        Ok((variant, VariantAccessor { value: self.value }))
    }
}

struct VariantAccessor {
    value: Node,
}

impl<'de> VariantAccess<'de> for VariantAccessor {
    type Error = CodecError;

    fn unit_variant(self) -> CodecResult<()> {
        match self.value {
            Node::Null => Ok(()),
            other => Err(CodecError::UnexpectedKind {
                expected: "null",
                found: other.kind(),
            }),
        }
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, seed: T) -> CodecResult<T::Value> {
        seed.deserialize(NodeDeserializer::new(self.value))
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> CodecResult<V::Value> {
        match self.value {
            Node::List(items) => visit_list(items, visitor),
            other => Err(CodecError::UnexpectedKind {
                expected: "list",
                found: other.kind(),
            }),
        }
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> CodecResult<V::Value> {
        match self.value {
            Node::Map(map) => visit_map(map, visitor),
            other => Err(CodecError::UnexpectedKind {
                expected: "map",
                found: other.kind(),
            }),
        }
    }
}
