/// Errors from identifier derivation.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum HashError {
    /// The multihash code names a function this crate does not implement.
    #[error("unsupported multihash function: {0:#x}")]
    UnsupportedFunction(u64),

    /// Truncation was asked for more bytes than the function produces.
    #[error("requested digest length {requested} exceeds the {available} bytes produced")]
    LengthTooLong { requested: usize, available: usize },

    /// An identity digest is the input itself and cannot be cut short or
    /// padded.
    #[error("identity digest length {requested} does not match the {actual} input bytes")]
    IdentityLength { requested: usize, actual: usize },

    #[error("invalid multihash: {0}")]
    Multihash(String),

    #[error("invalid cid: {0}")]
    Cid(String),
}

/// Result alias for hashing operations.
pub type HashResult<T> = Result<T, HashError>;
