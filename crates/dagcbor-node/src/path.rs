//! Walking object trees by path segments.

use dagcbor_codec::node_to_json;
use dagcbor_types::{Cid, Node};

use crate::error::{NodeError, NodeResult};

/// Where a path walk stopped.
#[derive(Clone, Debug, PartialEq)]
pub enum Resolved {
    /// A link was reached. `rest` holds the segments not yet consumed,
    /// which belong to the linked object.
    Link { cid: Cid, rest: Vec<String> },
    /// The path ended on a plain value, given in its JSON form.
    Value(serde_json::Value),
}

impl Resolved {
    /// The link and the unconsumed segments, if a link was reached.
    pub fn as_link(&self) -> Option<(&Cid, &[String])> {
        match self {
            Self::Link { cid, rest } => Some((cid, rest)),
            Self::Value(_) => None,
        }
    }

    /// The JSON value, if the path ended on one.
    pub fn into_value(self) -> Option<serde_json::Value> {
        match self {
            Self::Value(v) => Some(v),
            Self::Link { .. } => None,
        }
    }
}

/// Walk `root` one segment at a time.
///
/// Map segments are key lookups and list segments are decimal indexes. A
/// link stops the walk wherever it is met, even with segments left.
pub fn resolve<S: AsRef<str>>(root: &Node, path: &[S]) -> NodeResult<Resolved> {
    let mut cur = root;
    for (i, segment) in path.iter().enumerate() {
        let segment = segment.as_ref();
        cur = match cur {
            Node::Map(map) => map
                .get(segment)
                .ok_or_else(|| NodeError::NoSuchLink(segment.to_owned()))?,
            Node::List(items) => {
                let index: i64 = segment
                    .parse()
                    .map_err(|_| NodeError::InvalidIndex(segment.to_owned()))?;
                usize::try_from(index)
                    .ok()
                    .and_then(|i| items.get(i))
                    .ok_or(NodeError::IndexOutOfRange {
                        index,
                        len: items.len(),
                    })?
            }
            Node::Link(cid) => {
                return Ok(Resolved::Link {
                    cid: *cid,
                    rest: path[i..].iter().map(|s| s.as_ref().to_owned()).collect(),
                })
            }
            other => {
                return Err(NodeError::NotTraversable {
                    segment: segment.to_owned(),
                    kind: other.kind(),
                })
            }
        };
    }
    match cur {
        Node::Link(cid) => Ok(Resolved::Link {
            cid: *cid,
            rest: Vec::new(),
        }),
        other => Ok(Resolved::Value(node_to_json(other)?)),
    }
}

/// Like [`resolve`], but the walk must end on a link.
pub fn resolve_link<S: AsRef<str>>(root: &Node, path: &[S]) -> NodeResult<(Cid, Vec<String>)> {
    match resolve(root, path)? {
        Resolved::Link { cid, rest } => Ok((cid, rest)),
        Resolved::Value(_) => Err(NodeError::NonLink),
    }
}
