//! Content-addressed DAG-CBOR objects.
//!
//! A [`DagNode`] pairs a decoded object tree with its canonical bytes and
//! the identifier derived from them. Nodes answer path queries: resolving a
//! path down to a value or to the first link on the way, listing every
//! link, and listing every path.
//!
//! ```
//! use dagcbor_hash::CidPrefix;
//! use dagcbor_node::DagNode;
//!
//! let nd = DagNode::from_json(r#"{"a":[1,2]}"#, CidPrefix::default()).unwrap();
//! assert_eq!(nd.tree("", -1), vec!["a", "a/0", "a/1"]);
//! ```

pub mod error;
pub mod node;
pub mod path;
mod tree;

pub use error::{NodeError, NodeResult};
pub use node::DagNode;
pub use path::{resolve, resolve_link, Resolved};
