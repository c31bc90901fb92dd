//! Foundation types for DAG-CBOR objects.
//!
//! Every other crate in the workspace depends on `dagcbor-types`.
//!
//! # Key Types
//!
//! - [`Node`] -- The decoded object tree, a closed sum over every CBOR shape the codec accepts
//! - [`Link`] -- A typed reference to another object, embeddable in host structures
//! - [`Block`] -- Encoded bytes paired with the identifier that names them
//! - [`LinkError`] -- Malformed tag-42 payloads

pub mod block;
pub mod error;
pub mod link;
pub mod node;

pub use block::Block;
pub use cid::Cid;
pub use error::LinkError;
pub use link::{
    decode_link_payload, encode_link_payload, Link, CBOR_TAG_LINK, LINK_MARKER, LINK_NEWTYPE,
};
pub use node::{canonical_key_cmp, Kind, Node};
