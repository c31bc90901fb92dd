//! Canonical DAG-CBOR transcoding.
//!
//! A [`Transcoder`] turns object trees ([`Node`](dagcbor_types::Node)) into
//! canonical bytes and back, and converts registered host types through a
//! frozen [`Registry`] of [`TypeRule`]s. Host types join either with an
//! explicit rule or with a rule derived from their serde implementation.
//!
//! ```
//! use dagcbor_codec::{Transcoder, json};
//!
//! let node = json::from_json_str(r#"{"a":"IPFS"}"#).unwrap();
//! let bytes = Transcoder::shared().encode(&node).unwrap();
//! assert_eq!(Transcoder::shared().decode(&bytes).unwrap(), node);
//! ```

pub mod bigint;
mod canonical;
pub mod config;
mod de;
pub mod error;
pub mod json;
pub mod pool;
pub mod registry;
mod ser;
pub mod transcoder;

pub use config::CodecConfig;
pub use de::{from_node, NodeDeserializer};
pub use error::{CodecError, CodecResult, RegistryError};
pub use json::{json_to_node, node_to_json};
pub use pool::Pool;
pub use registry::{Registry, RegistryBuilder, TypeRule};
pub use ser::{to_node, NodeSerializer};
pub use transcoder::Transcoder;

use dagcbor_types::Node;

/// Canonical bytes of `node` through the shared transcoder.
pub fn encode(node: &Node) -> CodecResult<Vec<u8>> {
    Transcoder::shared().encode(node)
}

/// Decode one object tree through the shared transcoder.
pub fn decode(bytes: &[u8]) -> CodecResult<Node> {
    Transcoder::shared().decode(bytes)
}

/// Canonical bytes of a host value with a built-in rule, without wrapping
/// it in an object.
pub fn dump_object(value: &dyn std::any::Any) -> CodecResult<Vec<u8>> {
    Transcoder::shared().encode_value(value)
}
