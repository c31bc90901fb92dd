//! Canonical bytes for object trees.
//!
//! Items are written and read header by header through `ciborium-ll`, so
//! nothing about the wire form is left to a higher layer: map entries are
//! sorted here, and every float goes out as an 8-byte `0xfb` item. Decoding
//! is strict: one top-level item, definite lengths, string keys, no
//! duplicate keys, no tags other than 42.

use std::any::Any;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::io;
use std::panic::{self, AssertUnwindSafe};

use ciborium_io::Write as _;
use ciborium_ll::{simple, Decoder, Encoder, Header};
use dagcbor_types::{
    canonical_key_cmp, decode_link_payload, encode_link_payload, Node, CBOR_TAG_LINK,
};

use crate::bigint::magnitude;
use crate::error::{CodecError, CodecResult};

/// Deepest list/map nesting the decoder follows.
const MAX_DEPTH: usize = 256;

/// Initial byte of a 64-bit float item.
const FLOAT64: u8 = 0xfb;

/// Append the canonical encoding of `node` to `out`.
pub(crate) fn encode_into(node: &Node, out: &mut Vec<u8>) -> CodecResult<()> {
    let mut enc = Encoder::from(out);
    catch_fault(|| write_node(&mut enc, node))?
}

/// Decode exactly one item from `bytes`, reading strings through `scratch`.
pub(crate) fn decode_from(bytes: &[u8], scratch: &mut [u8]) -> CodecResult<Node> {
    let mut local = [0u8; 64];
    let scratch = if scratch.is_empty() { &mut local[..] } else { scratch };
    let mut dec = Decoder::from(bytes);
    let node = catch_fault(|| {
        let mut reader = Reader {
            dec: &mut dec,
            scratch,
            total: bytes.len(),
        };
        reader.node(0)
    })??;
    let used = dec.offset();
    if used < bytes.len() {
        return Err(CodecError::TrailingBytes(bytes.len() - used));
    }
    Ok(node)
}

fn write_node(enc: &mut Encoder<&mut Vec<u8>>, node: &Node) -> CodecResult<()> {
    let written = match node {
        Node::Null => enc.push(Header::Simple(simple::NULL)),
        Node::Bool(false) => enc.push(Header::Simple(simple::FALSE)),
        Node::Bool(true) => enc.push(Header::Simple(simple::TRUE)),
        Node::Integer(i) => enc.push(integer_header(*i)?),
        Node::Float(f) => write_float(enc, *f),
        Node::Text(s) => write_string(enc, Header::Text(Some(s.len())), s.as_bytes()),
        Node::Bytes(b) => write_string(enc, Header::Bytes(Some(b.len())), b),
        Node::BigInt(n) => {
            let mag = magnitude(n);
            write_string(enc, Header::Bytes(Some(mag.len())), &mag)
        }
        Node::List(items) => {
            enc.push(Header::Array(Some(items.len()))).map_err(encode_err)?;
            return items.iter().try_for_each(|item| write_node(enc, item));
        }
        Node::Map(map) => {
            let mut entries: Vec<(&String, &Node)> = map.iter().collect();
            entries.sort_by(|a, b| canonical_key_cmp(a.0, b.0));
            enc.push(Header::Map(Some(entries.len()))).map_err(encode_err)?;
            for (key, value) in entries {
                write_string(enc, Header::Text(Some(key.len())), key.as_bytes())
                    .map_err(encode_err)?;
                write_node(enc, value)?;
            }
            return Ok(());
        }
        Node::Link(cid) => {
            let payload = encode_link_payload(cid);
            enc.push(Header::Tag(CBOR_TAG_LINK)).and_then(|()| {
                write_string(enc, Header::Bytes(Some(payload.len())), &payload)
            })
        }
    };
    written.map_err(encode_err)
}

/// Floats are always 64-bit; `Header::Float` would narrow them.
fn write_float(enc: &mut Encoder<&mut Vec<u8>>, f: f64) -> io::Result<()> {
    enc.write_all(&[FLOAT64])?;
    enc.write_all(&f.to_be_bytes())
}

fn write_string(enc: &mut Encoder<&mut Vec<u8>>, header: Header, body: &[u8]) -> io::Result<()> {
    enc.push(header)?;
    enc.write_all(body)
}

fn integer_header(i: i128) -> CodecResult<Header> {
    if let Ok(u) = u64::try_from(i) {
        return Ok(Header::Positive(u));
    }
    u64::try_from(-1 - i)
        .map(Header::Negative)
        .map_err(|_| CodecError::IntegerOutOfRange(i))
}

fn encode_err(e: io::Error) -> CodecError {
    CodecError::Encode(e.to_string())
}

fn decode_err(e: ciborium_ll::Error<io::Error>) -> CodecError {
    match e {
        ciborium_ll::Error::Io(e) => CodecError::Decode(e.to_string()),
        ciborium_ll::Error::Syntax(offset) => {
            CodecError::Decode(format!("invalid cbor at offset {offset}"))
        }
    }
}

struct Reader<'a, 'b> {
    dec: &'a mut Decoder<&'b [u8]>,
    scratch: &'a mut [u8],
    total: usize,
}

impl Reader<'_, '_> {
    fn pull(&mut self) -> CodecResult<Header> {
        self.dec.pull().map_err(decode_err)
    }

    /// Bytes not yet consumed; a cap for declared lengths.
    fn remaining(&mut self) -> usize {
        self.total.saturating_sub(self.dec.offset())
    }

    fn node(&mut self, depth: usize) -> CodecResult<Node> {
        if depth > MAX_DEPTH {
            return Err(CodecError::Decode(format!(
                "nesting deeper than {MAX_DEPTH} levels"
            )));
        }
        match self.pull()? {
            Header::Positive(u) => Ok(Node::Integer(i128::from(u))),
            Header::Negative(n) => Ok(Node::Integer(-1 - i128::from(n))),
            Header::Float(f) => Ok(Node::Float(f)),
            Header::Simple(simple::NULL) => Ok(Node::Null),
            Header::Simple(simple::FALSE) => Ok(Node::Bool(false)),
            Header::Simple(simple::TRUE) => Ok(Node::Bool(true)),
            Header::Simple(other) => Err(CodecError::Decode(format!(
                "unsupported simple value {other}"
            ))),
            Header::Bytes(len) => self.bytes(len).map(Node::Bytes),
            Header::Text(len) => self.text(len).map(Node::Text),
            Header::Array(len) => {
                let len = definite(len, "array")?;
                let mut items = Vec::with_capacity(len.min(self.remaining()));
                for _ in 0..len {
                    items.push(self.node(depth + 1)?);
                }
                Ok(Node::List(items))
            }
            Header::Map(len) => {
                let len = definite(len, "map")?;
                let mut map = BTreeMap::new();
                for _ in 0..len {
                    let key = match self.pull()? {
                        Header::Text(len) => self.text(len)?,
                        other => return Err(CodecError::NonStringKey(header_kind(&other).into())),
                    };
                    match map.entry(key) {
                        Entry::Vacant(slot) => {
                            slot.insert(self.node(depth + 1)?);
                        }
                        Entry::Occupied(slot) => {
                            return Err(CodecError::DuplicateKey(slot.key().clone()));
                        }
                    }
                }
                Ok(Node::Map(map))
            }
            Header::Tag(CBOR_TAG_LINK) => match self.pull()? {
                Header::Bytes(len) => {
                    let payload = self.bytes(len)?;
                    Ok(Node::Link(decode_link_payload(&payload)?))
                }
                other => Err(CodecError::Decode(format!(
                    "link payload must be a byte string, found {}",
                    header_kind(&other)
                ))),
            },
            Header::Tag(tag) => Err(CodecError::UnsupportedTag(tag)),
            Header::Break => Err(CodecError::Decode("unexpected break".into())),
        }
    }

    fn bytes(&mut self, len: Option<usize>) -> CodecResult<Vec<u8>> {
        let len = definite(len, "byte string")?;
        let mut out = Vec::with_capacity(len.min(self.remaining()));
        let mut segments = self.dec.bytes(Some(len));
        while let Some(mut segment) = segments.pull().map_err(decode_err)? {
            while let Some(chunk) = segment.pull(self.scratch).map_err(decode_err)? {
                out.extend_from_slice(chunk);
            }
        }
        Ok(out)
    }

    fn text(&mut self, len: Option<usize>) -> CodecResult<String> {
        let len = definite(len, "text string")?;
        let mut out = String::with_capacity(len.min(self.remaining()));
        let mut segments = self.dec.text(Some(len));
        while let Some(mut segment) = segments.pull().map_err(decode_err)? {
            while let Some(chunk) = segment.pull(self.scratch).map_err(decode_err)? {
                out.push_str(chunk);
            }
        }
        Ok(out)
    }
}

fn definite(len: Option<usize>, what: &str) -> CodecResult<usize> {
    len.ok_or_else(|| CodecError::Decode(format!("indefinite-length {what}")))
}

fn header_kind(header: &Header) -> &'static str {
    match header {
        Header::Positive(_) | Header::Negative(_) => "integer",
        Header::Float(_) => "float",
        Header::Simple(simple::NULL) => "null",
        Header::Simple(simple::FALSE | simple::TRUE) => "bool",
        Header::Simple(_) => "simple",
        Header::Bytes(_) => "bytes",
        Header::Text(_) => "text",
        Header::Array(_) => "array",
        Header::Map(_) => "map",
        Header::Tag(_) => "tag",
        Header::Break => "break",
    }
}

/// Run engine code, turning a panic into [`CodecError::Fault`].
fn catch_fault<T>(f: impl FnOnce() -> T) -> CodecResult<T> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        let message = panic_message(&*payload);
        tracing::warn!(%message, "cbor engine panicked");
        CodecError::Fault(message)
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dagcbor_hash::CidPrefix;
    use num_bigint::BigUint;

    fn encode(node: &Node) -> Vec<u8> {
        let mut out = Vec::new();
        encode_into(node, &mut out).unwrap();
        out
    }

    fn decode(bytes: &[u8]) -> CodecResult<Node> {
        decode_from(bytes, &mut [0u8; 64])
    }

    #[test]
    fn scalars() {
        assert_eq!(encode(&Node::Null), vec![0xf6]);
        assert_eq!(encode(&Node::Bool(true)), vec![0xf5]);
        assert_eq!(encode(&Node::from(1u8)), vec![0x01]);
        assert_eq!(encode(&Node::from(-1i8)), vec![0x20]);
        assert_eq!(encode(&Node::from("")), vec![0x60]);
        assert_eq!(encode(&Node::list()), vec![0x80]);
        assert_eq!(encode(&Node::map()), vec![0xa0]);
    }

    #[test]
    fn map_keys_are_length_first() {
        let node: Node = [
            ("zebra", Node::from(1u8)),
            ("cats", Node::from(2u8)),
            ("a", Node::from(3u8)),
        ]
        .into_iter()
        .collect();
        let bytes = encode(&node);
        let expected = [
            0xa3, 0x61, b'a', 0x03, 0x64, b'c', b'a', b't', b's', 0x02, 0x65, b'z', b'e', b'b',
            b'r', b'a', 0x01,
        ];
        assert_eq!(bytes, expected);
    }

    #[test]
    fn non_canonical_key_order_is_normalized() {
        // {"bb": 1, "a": 2} written longest key first.
        let input = [0xa2, 0x62, b'b', b'b', 0x01, 0x61, b'a', 0x02];
        let node = decode(&input).unwrap();
        assert_eq!(
            encode(&node),
            vec![0xa2, 0x61, b'a', 0x02, 0x62, b'b', b'b', 0x01]
        );
    }

    #[test]
    fn links_use_tag_42_with_multibase_byte() {
        let cid = CidPrefix::default().sum(b"target").unwrap();
        let bytes = encode(&Node::Link(cid));
        assert_eq!(&bytes[..2], &[0xd8, 0x2a]);
        let raw = cid.to_bytes();
        // Byte string header then the 0x00 prefix.
        assert_eq!(bytes[2], 0x58);
        assert_eq!(usize::from(bytes[3]), raw.len() + 1);
        assert_eq!(bytes[4], 0x00);
        assert_eq!(&bytes[5..], raw.as_slice());
        assert_eq!(decode(&bytes).unwrap(), Node::Link(cid));
    }

    #[test]
    fn big_integers_are_magnitude_bytes() {
        assert_eq!(encode(&Node::BigInt(BigUint::from(0u8))), vec![0x40]);
        assert_eq!(
            encode(&Node::BigInt(BigUint::from(0x0102u16))),
            vec![0x42, 0x01, 0x02]
        );
    }

    #[test]
    fn integer_extremes() {
        let max = Node::Integer(i128::from(u64::MAX));
        assert_eq!(decode(&encode(&max)).unwrap(), max);
        let min = Node::Integer(-(i128::from(u64::MAX)) - 1);
        assert_eq!(decode(&encode(&min)).unwrap(), min);

        let mut out = Vec::new();
        let err = encode_into(&Node::Integer(i128::from(u64::MAX) + 1), &mut out).unwrap_err();
        assert!(matches!(err, CodecError::IntegerOutOfRange(_)));
    }

    #[test]
    fn floats_roundtrip() {
        let node = Node::Float(1.519);
        let bytes = encode(&node);
        assert_eq!(bytes[0], 0xfb);
        assert_eq!(decode(&bytes).unwrap(), node);
    }

    #[test]
    fn floats_are_always_eight_bytes() {
        assert_eq!(encode(&Node::Float(1.0)), hex::decode("fb3ff0000000000000").unwrap());
        assert_eq!(encode(&Node::Float(0.0)), hex::decode("fb0000000000000000").unwrap());
        assert_eq!(encode(&Node::Float(-0.0)), hex::decode("fb8000000000000000").unwrap());
    }

    #[test]
    fn float64_map_is_stable() {
        // {"a": 1.5}
        let bytes = hex::decode("a16161fb3ff8000000000000").unwrap();
        let node = decode(&bytes).unwrap();
        assert_eq!(node.get("a"), Some(&Node::Float(1.5)));
        assert_eq!(encode(&node), bytes);
    }

    #[test]
    fn narrow_floats_widen() {
        // 1.5 as a half and as a single.
        for input in ["f93e00", "fa3fc00000"] {
            let node = decode(&hex::decode(input).unwrap()).unwrap();
            assert_eq!(node, Node::Float(1.5));
            assert_eq!(encode(&node), hex::decode("fb3ff8000000000000").unwrap());
        }
    }

    #[test]
    fn long_strings_cross_scratch_chunks() {
        let text = "é".repeat(100);
        let node = Node::Text(text.clone());
        let bytes = encode(&node);
        assert_eq!(decode_from(&bytes, &mut [0u8; 7]).unwrap(), node);
        let blob = Node::Bytes(vec![7; 300]);
        assert_eq!(decode_from(&encode(&blob), &mut [0u8; 16]).unwrap(), blob);
    }

    // -----------------------------------------------------------------------
    // Rejections
    // -----------------------------------------------------------------------

    #[test]
    fn trailing_bytes_are_rejected() {
        assert!(matches!(
            decode(&[0xf6, 0xf6]),
            Err(CodecError::TrailingBytes(1))
        ));
    }

    #[test]
    fn truncated_input_is_rejected() {
        // Text of length 5 with only two bytes present.
        assert!(matches!(
            decode(&[0x65, b'a', b'b']),
            Err(CodecError::Decode(_))
        ));
        assert!(matches!(decode(&[]), Err(CodecError::Decode(_))));
    }

    #[test]
    fn non_string_keys_are_rejected() {
        // {1: 2}
        assert!(matches!(
            decode(&[0xa1, 0x01, 0x02]),
            Err(CodecError::NonStringKey(_))
        ));
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        // {"a": 1, "a": 2}
        let err = decode(&[0xa2, 0x61, b'a', 0x01, 0x61, b'a', 0x02]).unwrap_err();
        assert!(matches!(err, CodecError::DuplicateKey(k) if k == "a"));
    }

    #[test]
    fn foreign_tags_are_rejected() {
        // Tag 1 (epoch time) over 0.
        assert!(matches!(
            decode(&[0xc1, 0x00]),
            Err(CodecError::UnsupportedTag(1))
        ));
    }

    #[test]
    fn bignum_tags_are_rejected() {
        // Tag 2 (positive bignum) over h'05', tag 3 (negative bignum) over h'05'.
        assert!(matches!(
            decode(&[0xc2, 0x41, 0x05]),
            Err(CodecError::UnsupportedTag(2))
        ));
        assert!(matches!(
            decode(&[0xc3, 0x41, 0x05]),
            Err(CodecError::UnsupportedTag(3))
        ));
        // Nested inside a list.
        assert!(matches!(
            decode(&[0x81, 0xc2, 0x41, 0x05]),
            Err(CodecError::UnsupportedTag(2))
        ));
    }

    #[test]
    fn indefinite_lengths_are_rejected() {
        // [_ ], {_ }, (_ h'01'), (_ "a")
        for input in [
            &[0x9f, 0xff][..],
            &[0xbf, 0xff],
            &[0x5f, 0x41, 0x01, 0xff],
            &[0x7f, 0x61, b'a', 0xff],
        ] {
            assert!(matches!(decode(input), Err(CodecError::Decode(_))), "{input:02x?}");
        }
    }

    #[test]
    fn undefined_and_stray_break_are_rejected() {
        assert!(matches!(decode(&[0xf7]), Err(CodecError::Decode(_))));
        assert!(matches!(decode(&[0xff]), Err(CodecError::Decode(_))));
    }

    #[test]
    fn deep_nesting_is_rejected() {
        let mut input = vec![0x81; MAX_DEPTH + 2];
        input.push(0xf6);
        assert!(matches!(decode(&input), Err(CodecError::Decode(_))));

        let mut input = vec![0x81; MAX_DEPTH];
        input.push(0xf6);
        assert!(decode(&input).is_ok());
    }

    #[test]
    fn huge_declared_lengths_fail_cleanly() {
        // Array and byte string claiming u32::MAX entries with nothing behind them.
        assert!(matches!(
            decode(&[0x9a, 0xff, 0xff, 0xff, 0xff]),
            Err(CodecError::Decode(_))
        ));
        assert!(matches!(
            decode(&[0x5a, 0xff, 0xff, 0xff, 0xff]),
            Err(CodecError::Decode(_))
        ));
    }

    #[test]
    fn link_over_text_is_rejected() {
        // Tag 42 over "a".
        assert!(matches!(
            decode(&[0xd8, 0x2a, 0x61, b'a']),
            Err(CodecError::Decode(_))
        ));
    }

    #[test]
    fn link_without_multibase_byte_is_rejected() {
        let cid = CidPrefix::default().sum(b"x").unwrap();
        let raw = cid.to_bytes();
        let mut bytes = vec![0xd8, 0x2a, 0x58, raw.len() as u8];
        bytes.extend_from_slice(&raw);
        assert!(matches!(decode(&bytes), Err(CodecError::Link(_))));
    }

    #[test]
    fn panics_become_faults() {
        let err = catch_fault::<()>(|| panic!("boom")).unwrap_err();
        assert!(matches!(err, CodecError::Fault(m) if m == "boom"));
    }
}
