//! Serde serializer producing object trees.

use std::collections::BTreeMap;

use dagcbor_types::{Cid, LinkError, Node, LINK_NEWTYPE};
use serde::ser::{self, Serialize};

use crate::error::{CodecError, CodecResult};

/// Serialize any host value into an object tree.
///
/// Structs become maps keyed by field name, enums are externally tagged,
/// `None` and `()` become null, and [`Link`](dagcbor_types::Link) fields
/// become links.
pub fn to_node<T: ?Sized + Serialize>(value: &T) -> CodecResult<Node> {
    value.serialize(NodeSerializer)
}

/// The serializer behind [`to_node`]. Reports itself as a binary format.
pub struct NodeSerializer;

impl ser::Serializer for NodeSerializer {
    type Ok = Node;
    type Error = CodecError;
    type SerializeSeq = SeqBuilder;
    type SerializeTuple = SeqBuilder;
    type SerializeTupleStruct = SeqBuilder;
    type SerializeTupleVariant = VariantSeqBuilder;
    type SerializeMap = MapBuilder;
    type SerializeStruct = MapBuilder;
    type SerializeStructVariant = VariantMapBuilder;

    fn is_human_readable(&self) -> bool {
        false
    }

    fn serialize_bool(self, v: bool) -> CodecResult<Node> {
        Ok(Node::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> CodecResult<Node> {
        Ok(Node::from(v))
    }

    fn serialize_i16(self, v: i16) -> CodecResult<Node> {
        Ok(Node::from(v))
    }

    fn serialize_i32(self, v: i32) -> CodecResult<Node> {
        Ok(Node::from(v))
    }

    fn serialize_i64(self, v: i64) -> CodecResult<Node> {
        Ok(Node::from(v))
    }

    fn serialize_i128(self, v: i128) -> CodecResult<Node> {
        Ok(Node::Integer(v))
    }

    fn serialize_u8(self, v: u8) -> CodecResult<Node> {
        Ok(Node::from(v))
    }

    fn serialize_u16(self, v: u16) -> CodecResult<Node> {
        Ok(Node::from(v))
    }

    fn serialize_u32(self, v: u32) -> CodecResult<Node> {
        Ok(Node::from(v))
    }

    fn serialize_u64(self, v: u64) -> CodecResult<Node> {
        Ok(Node::from(v))
    }

    fn serialize_u128(self, v: u128) -> CodecResult<Node> {
        i128::try_from(v)
            .map(Node::Integer)
            .map_err(|_| CodecError::Encode(format!("integer {v} exceeds the cbor range")))
    }

    fn serialize_f32(self, v: f32) -> CodecResult<Node> {
        Ok(Node::from(v))
    }

    fn serialize_f64(self, v: f64) -> CodecResult<Node> {
        Ok(Node::Float(v))
    }

    fn serialize_char(self, v: char) -> CodecResult<Node> {
        Ok(Node::Text(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> CodecResult<Node> {
        Ok(Node::from(v))
    }

    fn serialize_bytes(self, v: &[u8]) -> CodecResult<Node> {
        Ok(Node::from(v))
    }

    fn serialize_none(self) -> CodecResult<Node> {
        Ok(Node::Null)
    }

    fn serialize_some<T>(self, value: &T) -> CodecResult<Node>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> CodecResult<Node> {
        Ok(Node::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> CodecResult<Node> {
        Ok(Node::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
    ) -> CodecResult<Node> {
        Ok(Node::from(variant))
    }

    fn serialize_newtype_struct<T>(self, name: &'static str, value: &T) -> CodecResult<Node>
    where
        T: ?Sized + Serialize,
    {
        if name != LINK_NEWTYPE {
            return value.serialize(self);
        }
        match value.serialize(self)? {
            Node::Bytes(raw) => Cid::try_from(raw.as_slice())
                .map(Node::Link)
                .map_err(|e| LinkError::InvalidCid(e.to_string()).into()),
            other => Err(CodecError::UnexpectedKind {
                expected: "link bytes",
                found: other.kind(),
            }),
        }
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        value: &T,
    ) -> CodecResult<Node>
    where
        T: ?Sized + Serialize,
    {
        Ok(Node::Map(BTreeMap::from([(
            variant.to_owned(),
            to_node(value)?,
        )])))
    }

    fn serialize_seq(self, len: Option<usize>) -> CodecResult<SeqBuilder> {
        Ok(SeqBuilder {
            items: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> CodecResult<SeqBuilder> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(self, _name: &'static str, len: usize) -> CodecResult<SeqBuilder> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        len: usize,
    ) -> CodecResult<VariantSeqBuilder> {
        Ok(VariantSeqBuilder {
            variant,
            items: Vec::with_capacity(len),
        })
    }

    fn serialize_map(self, _len: Option<usize>) -> CodecResult<MapBuilder> {
        Ok(MapBuilder::default())
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> CodecResult<MapBuilder> {
        Ok(MapBuilder::default())
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        variant: &'static str,
        _len: usize,
    ) -> CodecResult<VariantMapBuilder> {
        Ok(VariantMapBuilder {
            variant,
            map: BTreeMap::new(),
        })
    }
}

fn insert_unique(map: &mut BTreeMap<String, Node>, key: String, value: Node) -> CodecResult<()> {
    if map.contains_key(&key) {
        return Err(CodecError::DuplicateKey(key));
    }
    map.insert(key, value);
    Ok(())
}

/// Collects the elements of a sequence or tuple.
pub struct SeqBuilder {
    items: Vec<Node>,
}

impl ser::SerializeSeq for SeqBuilder {
    type Ok = Node;
    type Error = CodecError;

    fn serialize_element<T>(&mut self, value: &T) -> CodecResult<()>
    where
        T: ?Sized + Serialize,
    {
        self.items.push(to_node(value)?);
        Ok(())
    }

    fn end(self) -> CodecResult<Node> {
        Ok(Node::List(self.items))
    }
}

impl ser::SerializeTuple for SeqBuilder {
    type Ok = Node;
    type Error = CodecError;

    fn serialize_element<T>(&mut self, value: &T) -> CodecResult<()>
    where
        T: ?Sized + Serialize,
    {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> CodecResult<Node> {
        ser::SerializeSeq::end(self)
    }
}

impl ser::SerializeTupleStruct for SeqBuilder {
    type Ok = Node;
    type Error = CodecError;

    fn serialize_field<T>(&mut self, value: &T) -> CodecResult<()>
    where
        T: ?Sized + Serialize,
    {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> CodecResult<Node> {
        ser::SerializeSeq::end(self)
    }
}

/// Collects the fields of a tuple variant.
pub struct VariantSeqBuilder {
    variant: &'static str,
    items: Vec<Node>,
}

impl ser::SerializeTupleVariant for VariantSeqBuilder {
    type Ok = Node;
    type Error = CodecError;

    fn serialize_field<T>(&mut self, value: &T) -> CodecResult<()>
    where
        T: ?Sized + Serialize,
    {
        self.items.push(to_node(value)?);
        Ok(())
    }

    fn end(self) -> CodecResult<Node> {
        Ok(Node::Map(BTreeMap::from([(
            self.variant.to_owned(),
            Node::List(self.items),
        )])))
    }
}

/// Collects the entries of a map or struct.
#[derive(Default)]
pub struct MapBuilder {
    map: BTreeMap<String, Node>,
    next_key: Option<String>,
}

impl ser::SerializeMap for MapBuilder {
    type Ok = Node;
    type Error = CodecError;

    fn serialize_key<T>(&mut self, key: &T) -> CodecResult<()>
    where
        T: ?Sized + Serialize,
    {
        match to_node(key)? {
            Node::Text(s) => {
                self.next_key = Some(s);
                Ok(())
            }
            other => Err(CodecError::NonStringKey(other.kind().to_string())),
        }
    }

    fn serialize_value<T>(&mut self, value: &T) -> CodecResult<()>
    where
        T: ?Sized + Serialize,
    {
        let key = self
            .next_key
            .take()
            .ok_or_else(|| CodecError::Encode("map value without a key".into()))?;
        insert_unique(&mut self.map, key, to_node(value)?)
    }

    fn end(self) -> CodecResult<Node> {
        Ok(Node::Map(self.map))
    }
}

impl ser::SerializeStruct for MapBuilder {
    type Ok = Node;
    type Error = CodecError;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> CodecResult<()>
    where
        T: ?Sized + Serialize,
    {
        insert_unique(&mut self.map, key.to_owned(), to_node(value)?)
    }

    fn end(self) -> CodecResult<Node> {
        Ok(Node::Map(self.map))
    }
}

/// Collects the fields of a struct variant.
pub struct VariantMapBuilder {
    variant: &'static str,
    map: BTreeMap<String, Node>,
}

impl ser::SerializeStructVariant for VariantMapBuilder {
    type Ok = Node;
    type Error = CodecError;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> CodecResult<()>
    where
        T: ?Sized + Serialize,
    {
        insert_unique(&mut self.map, key.to_owned(), to_node(value)?)
    }

    fn end(self) -> CodecResult<Node> {
        Ok(Node::Map(BTreeMap::from([(
            self.variant.to_owned(),
            Node::Map(self.map),
        )])))
    }
}
