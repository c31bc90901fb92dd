use dagcbor_codec::CodecError;
use dagcbor_hash::HashError;
use dagcbor_node::NodeError;
use dagcbor_types::Cid;

/// Boxed error raised by a value's own serializer.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No block under this identifier.
    #[error("block not found: {0}")]
    NotFound(Cid),

    /// A self-describing value failed to serialize or deserialize itself.
    #[error("serialization error: {0}")]
    Serialization(#[source] BoxError),

    /// The value's bytes do not hash to the identifier it claims.
    #[error("object is not serialized the way it expects: claims {expected}, hashes to {actual}")]
    CidMismatch { expected: Cid, actual: Cid },

    #[error("got {cids} identifiers but {outs} output slots")]
    LengthMismatch { cids: usize, outs: usize },

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Node(#[from] NodeError),

    #[error(transparent)]
    Hash(#[from] HashError),

    /// Failure reported by the backing blockstore.
    #[error("blockstore error: {0}")]
    Backend(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
