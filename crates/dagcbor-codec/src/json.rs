//! Object trees to and from JSON.
//!
//! Links appear as `{"/": "<cid>"}`. Byte strings and big integers become
//! standard base64 text, which does not round-trip: JSON has no byte type.
//! Every JSON number is read as a 64-bit float, and floats holding a whole
//! number are written back without a fraction, so `1` stays `1`.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use dagcbor_types::{Cid, LinkError, Node, LINK_MARKER};
use serde_json::{Map, Number, Value};

use crate::bigint::magnitude;
use crate::error::{CodecError, CodecResult};

/// Convert an object tree to a JSON value.
///
/// Fails on NaN, infinities and integers outside the 64-bit range.
pub fn node_to_json(node: &Node) -> CodecResult<Value> {
    Ok(match node {
        Node::Null => Value::Null,
        Node::Bool(b) => Value::Bool(*b),
        Node::Integer(i) => integer_to_json(*i)?,
        Node::Float(f) => float_to_json(*f)?,
        Node::Text(s) => Value::String(s.clone()),
        Node::Bytes(b) => Value::String(STANDARD.encode(b)),
        Node::BigInt(n) => Value::String(STANDARD.encode(magnitude(n))),
        Node::List(items) => Value::Array(
            items
                .iter()
                .map(node_to_json)
                .collect::<CodecResult<_>>()?,
        ),
        Node::Map(map) => map_to_json(map)?,
        Node::Link(cid) => link_json(cid),
    })
}

fn map_to_json(map: &BTreeMap<String, Node>) -> CodecResult<Value> {
    if map.len() == 1 {
        if let Some(target) = map.get(LINK_MARKER) {
            return match target {
                Node::Link(cid) => Ok(link_json(cid)),
                Node::Bytes(raw) => Cid::try_from(raw.as_slice())
                    .map(|cid| link_json(&cid))
                    .map_err(|e| LinkError::InvalidCid(e.to_string()).into()),
                other => Err(CodecError::Json(format!(
                    "link value should have been bytes, found {}",
                    other.kind()
                ))),
            };
        }
    }
    let mut out = Map::new();
    for (key, value) in map {
        out.insert(key.clone(), node_to_json(value)?);
    }
    Ok(Value::Object(out))
}

fn link_json(cid: &Cid) -> Value {
    let mut out = Map::new();
    out.insert(LINK_MARKER.to_owned(), Value::String(cid.to_string()));
    Value::Object(out)
}

fn integer_to_json(i: i128) -> CodecResult<Value> {
    if let Ok(u) = u64::try_from(i) {
        Ok(Value::from(u))
    } else if let Ok(s) = i64::try_from(i) {
        Ok(Value::from(s))
    } else {
        Err(CodecError::Json(format!("integer {i} does not fit a json number")))
    }
}

/// Convert a JSON value to an object tree.
///
/// A single-entry object whose key is `/` must hold a CID string and
/// becomes a link.
pub fn json_to_node(value: Value) -> CodecResult<Node> {
    Ok(match value {
        Value::Null => Node::Null,
        Value::Bool(b) => Node::Bool(b),
        Value::Number(n) => number_to_node(&n)?,
        Value::String(s) => Node::Text(s),
        Value::Array(items) => Node::List(
            items
                .into_iter()
                .map(json_to_node)
                .collect::<CodecResult<_>>()?,
        ),
        Value::Object(map) => object_to_node(map)?,
    })
}

fn number_to_node(n: &Number) -> CodecResult<Node> {
    n.as_f64()
        .map(Node::Float)
        .ok_or_else(|| CodecError::Json(format!("unrepresentable number {n}")))
}

/// 2^64 as a float; whole floats below it fit a `u64` exactly.
const TWO_POW_64: f64 = 18_446_744_073_709_551_616.0;

fn float_to_json(f: f64) -> CodecResult<Value> {
    if f.fract() == 0.0 && !(f == 0.0 && f.is_sign_negative()) {
        if (0.0..TWO_POW_64).contains(&f) {
            return Ok(Value::from(f as u64));
        }
        if (i64::MIN as f64..0.0).contains(&f) {
            return Ok(Value::from(f as i64));
        }
    }
    Number::from_f64(f)
        .map(Value::Number)
        .ok_or_else(|| CodecError::Json(format!("{f} has no json representation")))
}

fn object_to_node(map: Map<String, Value>) -> CodecResult<Node> {
    if map.len() == 1 {
        if let Some(target) = map.get(LINK_MARKER) {
            return match target {
                Value::String(s) => Cid::try_from(s.as_str())
                    .map(Node::Link)
                    .map_err(|e| LinkError::InvalidCid(e.to_string()).into()),
                _ => Err(CodecError::Json("link should have been a string".into())),
            };
        }
    }
    map.into_iter()
        .map(|(key, value)| Ok((key, json_to_node(value)?)))
        .collect::<CodecResult<BTreeMap<_, _>>>()
        .map(Node::Map)
}

/// Parse JSON text into an object tree.
pub fn from_json_str(text: &str) -> CodecResult<Node> {
    json_to_node(serde_json::from_str(text)?)
}

/// Compact JSON text with object keys sorted.
pub fn to_json_string(node: &Node) -> CodecResult<String> {
    Ok(serde_json::to_string(&node_to_json(node)?)?)
}
