//! Wrapped objects: a decoded tree with its canonical bytes and identifier.
//!
//! A [`DagNode`] is only ever built from canonical bytes. Wrapping a value
//! encodes it and decodes the result again, so the tree a node carries is
//! the round-tripped form, never the caller's original. The one exception is
//! [`DagNode::decode_block`], which trusts bytes that already came out of a
//! store under their identifier.

use std::any::Any;
use std::fmt;
use std::io::Read;
use std::sync::OnceLock;

use bytes::Bytes;
use dagcbor_codec::{json, Transcoder};
use dagcbor_hash::CidPrefix;
use dagcbor_types::{Block, Cid, Node};
use serde_json::json;
use tracing::{debug, trace};

use crate::error::NodeResult;
use crate::path::{self, Resolved};
use crate::tree;

/// A content-addressed DAG-CBOR object.
///
/// Immutable once built. The path index and link list are computed on
/// first use and cached.
#[derive(Clone)]
pub struct DagNode {
    obj: Node,
    raw: Bytes,
    cid: Cid,
    index: OnceLock<(Vec<String>, Vec<Cid>)>,
}

impl DagNode {
    fn from_parts(obj: Node, raw: Bytes, cid: Cid) -> Self {
        Self {
            obj,
            raw,
            cid,
            index: OnceLock::new(),
        }
    }

    // ---------------------------------------------------------------
    // Construction
    // ---------------------------------------------------------------

    /// Wrap an object tree using the shared transcoder.
    pub fn wrap(node: &Node, prefix: CidPrefix) -> NodeResult<Self> {
        Self::wrap_with(Transcoder::shared(), node, prefix)
    }

    /// Like [`DagNode::wrap`], encoding through `transcoder`.
    pub fn wrap_with(transcoder: &Transcoder, node: &Node, prefix: CidPrefix) -> NodeResult<Self> {
        let raw = transcoder.encode(node)?;
        Self::from_encoded(transcoder, raw, prefix)
    }

    /// Wrap any host value the transcoder has a rule for.
    pub fn wrap_object(
        transcoder: &Transcoder,
        value: &dyn Any,
        prefix: CidPrefix,
    ) -> NodeResult<Self> {
        let raw = transcoder.encode_value(value)?;
        Self::from_encoded(transcoder, raw, prefix)
    }

    fn from_encoded(transcoder: &Transcoder, raw: Vec<u8>, prefix: CidPrefix) -> NodeResult<Self> {
        let obj = transcoder.decode(&raw)?;
        let cid = prefix.sum(&raw)?;
        debug!(cid = %cid, size = raw.len(), "wrapped object");
        Ok(Self::from_parts(obj, Bytes::from(raw), cid))
    }

    /// Decode possibly non-canonical bytes and derive a fresh identifier
    /// from their canonical form.
    pub fn decode(bytes: &[u8], prefix: CidPrefix) -> NodeResult<Self> {
        Self::decode_with(Transcoder::shared(), bytes, prefix)
    }

    /// Like [`DagNode::decode`], decoding through `transcoder`.
    pub fn decode_with(transcoder: &Transcoder, bytes: &[u8], prefix: CidPrefix) -> NodeResult<Self> {
        let obj = transcoder.decode(bytes)?;
        Self::wrap_with(transcoder, &obj, prefix)
    }

    /// Decode a block, keeping its bytes and identifier as they are.
    ///
    /// Neither canonical form nor the identifier is checked; use
    /// [`verify`](Self::verify) when that matters.
    pub fn decode_block(block: &Block) -> NodeResult<Self> {
        Self::decode_block_with(Transcoder::shared(), block)
    }

    /// Like [`DagNode::decode_block`], decoding through `transcoder`.
    pub fn decode_block_with(transcoder: &Transcoder, block: &Block) -> NodeResult<Self> {
        let obj = transcoder.decode(block.data())?;
        trace!(cid = %block.cid(), "decoded block");
        Ok(Self::from_parts(obj, block.data().clone(), *block.cid()))
    }

    /// Parse JSON text, turning `{"/": "<cid>"}` objects into links.
    pub fn from_json(text: &str, prefix: CidPrefix) -> NodeResult<Self> {
        let obj = json::from_json_str(text)?;
        Self::wrap(&obj, prefix)
    }

    /// Read JSON text from `reader` and wrap it.
    pub fn from_json_reader<R: Read>(mut reader: R, prefix: CidPrefix) -> NodeResult<Self> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Self::from_json(&text, prefix)
    }

    // ---------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------

    /// The identifier of the canonical bytes.
    pub fn cid(&self) -> &Cid {
        &self.cid
    }

    /// The canonical bytes. Shared, not copied.
    pub fn raw_data(&self) -> &Bytes {
        &self.raw
    }

    /// The decoded object tree.
    pub fn object(&self) -> &Node {
        &self.obj
    }

    /// Length of the canonical bytes.
    pub fn size(&self) -> usize {
        self.raw.len()
    }

    fn index(&self) -> &(Vec<String>, Vec<Cid>) {
        self.index.get_or_init(|| tree::index(&self.obj))
    }

    /// Every link in the object, in traversal order.
    pub fn links(&self) -> &[Cid] {
        &self.index().1
    }

    /// Paths under `prefix`, relative to it, at most `depth` segments deep
    /// (any depth when negative).
    pub fn tree(&self, prefix: &str, depth: i32) -> Vec<String> {
        tree::select(&self.index().0, prefix, depth)
    }

    /// Walk `path` through the object, stopping at the first link.
    pub fn resolve<S: AsRef<str>>(&self, path: &[S]) -> NodeResult<Resolved> {
        path::resolve(&self.obj, path)
    }

    /// Like [`DagNode::resolve`], but the walk must reach a link.
    pub fn resolve_link<S: AsRef<str>>(&self, path: &[S]) -> NodeResult<(Cid, Vec<String>)> {
        path::resolve_link(&self.obj, path)
    }

    /// The object as a JSON value.
    pub fn to_json(&self) -> NodeResult<serde_json::Value> {
        Ok(json::node_to_json(&self.obj)?)
    }

    /// Compact JSON text with object keys sorted.
    pub fn marshal_json(&self) -> NodeResult<String> {
        Ok(json::to_json_string(&self.obj)?)
    }

    /// Convert into any host type the transcoder has a rule for.
    pub fn decode_into<T: Any>(&self, transcoder: &Transcoder) -> NodeResult<T> {
        Ok(transcoder.unmarshal(self.obj.clone())?)
    }

    /// An independent deep copy, bytes included.
    pub fn copy(&self) -> Self {
        Self {
            obj: self.obj.clone(),
            raw: Bytes::copy_from_slice(&self.raw),
            cid: self.cid,
            index: self.index.clone(),
        }
    }

    /// The identifier and canonical bytes as a block.
    pub fn to_block(&self) -> Block {
        Block::new(self.cid, self.raw.clone())
    }

    /// Whether the bytes actually hash to the identifier.
    pub fn verify(&self) -> NodeResult<bool> {
        Ok(dagcbor_hash::verify(&self.cid, &self.raw)?)
    }

    /// Structured summary for logs.
    pub fn loggable(&self) -> serde_json::Value {
        json!({
            "node_type": "cbor",
            "cid": self.cid.to_string(),
        })
    }
}

impl PartialEq for DagNode {
    fn eq(&self, other: &Self) -> bool {
        self.cid == other.cid && self.raw == other.raw
    }
}

impl fmt::Display for DagNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cid)
    }
}

impl fmt::Debug for DagNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DagNode")
            .field("cid", &self.cid.to_string())
            .field("size", &self.raw.len())
            .finish()
    }
}

impl From<DagNode> for Block {
    fn from(node: DagNode) -> Self {
        Block::new(node.cid, node.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NodeError;
    use dagcbor_codec::{CodecConfig, CodecError, Registry};
    use dagcbor_hash::HashFunction;
    use dagcbor_types::Link;
    use num_bigint::BigUint;
    use serde::{Deserialize, Serialize};
    use std::collections::BTreeMap;

    fn sha256() -> CidPrefix {
        CidPrefix::default()
    }

    fn v0(seed: &[u8]) -> Cid {
        let mut raw = vec![0x12, 0x20];
        raw.extend(HashFunction::Sha2_256.digest(seed));
        Cid::try_from(raw.as_slice()).unwrap()
    }

    fn sorted(mut v: Vec<String>) -> Vec<String> {
        v.sort();
        v
    }

    // ---------------------------------------------------------------
    // Wrapping and decoding
    // ---------------------------------------------------------------

    #[test]
    fn non_object_roundtrip() {
        let nd = DagNode::wrap(&Node::from(""), sha256()).unwrap();
        assert_eq!(
            nd.cid().to_string(),
            "bafyreiengp2sbi6ez34a2jctv34bwyjl7yoliteleaswgcwtqzrhmpyt2m"
        );
        let back = DagNode::decode(nd.copy().raw_data(), sha256()).unwrap();
        assert_eq!(back.cid(), nd.cid());
    }

    #[test]
    fn basic_marshal() {
        let c = v0(b"something");
        let obj: Node = [("name", Node::from("foo")), ("bar", Node::Link(c))]
            .into_iter()
            .collect();
        let nd = DagNode::wrap(&obj, sha256()).unwrap();
        assert_eq!(
            nd.cid().to_string(),
            "bafyreib4hmpkwa7zyzoxmpwykof6k7akxnvmsn23oiubsey4e2tf6gqlui"
        );
        assert_eq!(
            hex::encode(nd.raw_data()),
            "a263626172d82a58230012203fc9b689459d738f8c88a3a48aa9e33542016b7a4052e001aaa536fca74813cb646e616d6563666f6f"
        );

        let back = DagNode::decode(nd.raw_data(), sha256()).unwrap();
        assert_eq!(back.cid(), nd.cid());
        let (lnk, rest) = back.resolve_link(&["bar"]).unwrap();
        assert_eq!(lnk, c);
        assert!(rest.is_empty());
    }

    #[test]
    fn marshal_roundtrip_with_links() {
        let (c1, c2, c3) = (v0(b"something1"), v0(b"something2"), v0(b"something3"));
        let obj: Node = [
            ("foo", Node::from("bar")),
            ("hello", Node::Link(c1)),
            ("baz", vec![Node::Link(c1), Node::Link(c2)].into_iter().collect()),
            ("cats", [("qux", Node::Link(c3))].into_iter().collect()),
        ]
        .into_iter()
        .collect();

        let nd1 = DagNode::wrap(&obj, sha256()).unwrap();
        assert_eq!(
            nd1.cid().to_string(),
            "bafyreibgx4rjaqolj7c32c7ibxc5tedhisc4d23ihx5t4tgamuvy2hvwjm"
        );
        assert_eq!(nd1.links().len(), 4);

        let nd2 = DagNode::decode(nd1.raw_data(), sha256()).unwrap();
        assert_eq!(nd2.cid(), nd1.cid());

        let (lnk, rest) = nd2.resolve_link(&["baz", "1", "bop"]).unwrap();
        assert_eq!(lnk, c2);
        assert_eq!(rest, vec!["bop".to_owned()]);
    }

    #[test]
    fn tree_paths() {
        let (c1, c2, c3, c4) = (
            v0(b"something1"),
            v0(b"something2"),
            v0(b"something3"),
            v0(b"something4"),
        );
        let buu: Node = [("coat", Node::from("rain"))].into_iter().collect();
        let qux: Node = [
            ("boo", Node::from(1)),
            ("baa", Node::Link(c4)),
            ("bee", Node::from(3)),
            ("bii", Node::from(4)),
            ("buu", buu),
        ]
        .into_iter()
        .collect();
        let obj: Node = [
            ("foo", Node::Link(c1)),
            (
                "baz",
                vec![Node::Link(c2), Node::Link(c3), Node::from("c")]
                    .into_iter()
                    .collect(),
            ),
            ("cats", [("qux", qux)].into_iter().collect()),
        ]
        .into_iter()
        .collect();

        let nd = DagNode::wrap(&obj, sha256()).unwrap();
        assert_eq!(
            nd.cid().to_string(),
            "bafyreicp66zmx7grdrnweetu23anx3e5zguda7646iwyothju6nhgqykgq"
        );

        let full = sorted(
            [
                "foo",
                "baz",
                "baz/0",
                "baz/1",
                "baz/2",
                "cats",
                "cats/qux",
                "cats/qux/boo",
                "cats/qux/baa",
                "cats/qux/bee",
                "cats/qux/bii",
                "cats/qux/buu",
                "cats/qux/buu/coat",
            ]
            .map(String::from)
            .to_vec(),
        );
        assert_eq!(sorted(nd.tree("", -1)), full);

        let cats = sorted(
            [
                "qux",
                "qux/boo",
                "qux/baa",
                "qux/bee",
                "qux/bii",
                "qux/buu",
                "qux/buu/coat",
            ]
            .map(String::from)
            .to_vec(),
        );
        assert_eq!(sorted(nd.tree("cats", -1)), cats);
        assert_eq!(sorted(nd.tree("", 1)), vec!["baz", "cats", "foo"]);
        assert!(nd.tree("", 0).is_empty());
        assert_eq!(nd.links().len(), 4);
    }

    #[test]
    fn hash_parameters_change_only_the_identifier() {
        let obj: Node = [("a", Node::from(1))].into_iter().collect();
        let a = DagNode::wrap(&obj, sha256()).unwrap();
        let b = DagNode::wrap(&obj, CidPrefix::dag_cbor(HashFunction::Sha2_512)).unwrap();
        assert_eq!(a.raw_data(), b.raw_data());
        assert_ne!(a.cid(), b.cid());
        assert_eq!(b.cid().hash().code(), 0x13);
    }

    #[test]
    fn decode_canonicalizes() {
        // {"bb": 1, "a": 2} with the longer key first.
        let input = [0xa2, 0x62, b'b', b'b', 0x01, 0x61, b'a', 0x02];
        let nd = DagNode::decode(&input, sha256()).unwrap();
        assert_ne!(nd.raw_data().as_ref(), &input);
        assert!(nd.verify().unwrap());

        let again = DagNode::decode(nd.raw_data(), sha256()).unwrap();
        assert_eq!(again, nd);
    }

    #[test]
    fn decode_block_trusts_its_identifier() {
        let input = [0xa2, 0x62, b'b', b'b', 0x01, 0x61, b'a', 0x02];
        let cid = sha256().sum(&input).unwrap();
        let block = Block::new(cid, input.to_vec());
        let nd = DagNode::decode_block(&block).unwrap();
        assert_eq!(nd.cid(), &cid);
        assert_eq!(nd.raw_data().as_ref(), &input);

        let forged = Block::new(sha256().sum(b"other").unwrap(), input.to_vec());
        let nd = DagNode::decode_block(&forged).unwrap();
        assert!(!nd.verify().unwrap());
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            DagNode::decode(&[0xf6, 0x00], sha256()),
            Err(NodeError::Codec(CodecError::TrailingBytes(1)))
        ));
    }

    // ---------------------------------------------------------------
    // Host values
    // ---------------------------------------------------------------

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Entry {
        name: String,
        target: Option<Link>,
        #[serde(with = "dagcbor_codec::bigint")]
        weight: BigUint,
    }

    fn transcoder() -> Transcoder {
        let mut builder = Registry::builder();
        builder
            .register_type::<Entry>()
            .unwrap()
            .register_type::<BTreeMap<String, String>>()
            .unwrap()
            .register_type::<String>()
            .unwrap();
        Transcoder::new(builder.build(), CodecConfig::with_workers(2))
    }

    #[test]
    fn wrap_object_and_decode_into() {
        let t = transcoder();
        let target = DagNode::wrap(&Node::from(""), sha256()).unwrap();
        let entry = Entry {
            name: "foo".into(),
            target: Some(Link(*target.cid())),
            weight: BigUint::from(1u8),
        };
        let nd = DagNode::wrap_object(&t, &entry, sha256()).unwrap();
        assert_eq!(nd.links(), &[*target.cid()]);
        assert_eq!(nd.decode_into::<Entry>(&t).unwrap(), entry);
    }

    #[test]
    fn decode_into_maps_and_scalars() {
        let t = transcoder();
        let map = BTreeMap::from([("name".to_owned(), "foo".to_owned())]);
        let nd = DagNode::wrap_object(&t, &map, sha256()).unwrap();
        let back: BTreeMap<String, String> = t.decode_into(nd.raw_data()).unwrap();
        assert_eq!(back, map);

        let nd = DagNode::wrap_object(&t, &"foobar".to_owned(), sha256()).unwrap();
        assert_eq!(t.decode_into::<String>(nd.raw_data()).unwrap(), "foobar");
    }

    // ---------------------------------------------------------------
    // JSON and misc
    // ---------------------------------------------------------------

    #[test]
    fn resolved_values_are_json() {
        let nd = DagNode::from_json(r#"{"foo": {"bar": 1, "baz": 2}}"#, sha256()).unwrap();
        assert_eq!(
            nd.cid().to_string(),
            "bafyreiahcy6ewqmabbh7lcjhxrillpf72zlu3vqcovckanvj2fwdtenvbe"
        );
        let value = nd.resolve(&["foo"]).unwrap().into_value().unwrap();
        assert_eq!(serde_json::to_string(&value).unwrap(), r#"{"bar":1,"baz":2}"#);
    }

    #[test]
    fn copy_is_independent_and_equal() {
        let nd = DagNode::from_json(r#"{"a":[1,2]}"#, sha256()).unwrap();
        let copy = nd.copy();
        assert_eq!(copy, nd);
        assert_eq!(copy.object(), nd.object());
        assert_ne!(copy.raw_data().as_ptr(), nd.raw_data().as_ptr());
    }

    #[test]
    fn block_and_display() {
        let nd = DagNode::from_json("[null]", sha256()).unwrap();
        let block = nd.to_block();
        assert_eq!(block.cid(), nd.cid());
        assert_eq!(block.data(), nd.raw_data());
        assert_eq!(nd.size(), 2);
        assert_eq!(nd.to_string(), nd.cid().to_string());
        assert_eq!(
            nd.loggable(),
            json!({ "node_type": "cbor", "cid": nd.cid().to_string() })
        );
        assert!(format!("{nd:?}").contains("size: 2"));
        assert_eq!(Block::from(nd.clone()), block);
    }

    #[test]
    fn json_reader() {
        let nd = DagNode::from_json_reader(&b"{\"a\":\"IPFS\"}"[..], sha256()).unwrap();
        assert_eq!(nd.marshal_json().unwrap(), r#"{"a":"IPFS"}"#);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn decode_of_wrapped_bytes_is_a_fixpoint(
                entries in proptest::collection::btree_map("[a-z]{1,6}", any::<i64>(), 0..8)
            ) {
                let obj: Node = entries.iter().map(|(k, v)| (k.as_str(), Node::from(*v))).collect();
                let nd = DagNode::wrap(&obj, sha256()).unwrap();
                let back = DagNode::decode(nd.raw_data(), sha256()).unwrap();
                prop_assert_eq!(&back, &nd);
                prop_assert_eq!(nd.tree("", -1).len(), entries.len());
                prop_assert!(nd.links().is_empty());
            }
        }
    }
}
