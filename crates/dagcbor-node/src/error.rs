//! Error types for wrapped objects and path resolution.

use dagcbor_codec::CodecError;
use dagcbor_hash::HashError;
use dagcbor_types::Kind;

/// Errors from building, decoding, or walking a [`DagNode`](crate::DagNode).
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    /// A path segment named a key the map does not have.
    #[error("no such link found: {0:?}")]
    NoSuchLink(String),

    /// A list was indexed by a segment that is not an integer.
    #[error("invalid list index {0:?}")]
    InvalidIndex(String),

    #[error("list index {index} out of range for length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    /// Path segments remain but the value reached is a scalar.
    #[error("tried to resolve {segment:?} through a {kind}, which has no links")]
    NotTraversable { segment: String, kind: Kind },

    /// `resolve_link` ended on something other than a link.
    #[error("found non-link at given path")]
    NonLink,

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Hash(#[from] HashError),

    #[error("read error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for node results.
pub type NodeResult<T> = Result<T, NodeError>;
