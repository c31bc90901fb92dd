use std::fmt::Display;

use dagcbor_types::{Kind, LinkError};

/// Errors from encoding, decoding, and converting object trees.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The bytes are not a well-formed CBOR item.
    #[error("failed to unmarshal: {0}")]
    Decode(String),

    /// A complete item was read but bytes remain after it.
    #[error("failed to unmarshal: {0} trailing bytes after the top-level item")]
    TrailingBytes(usize),

    #[error("map keys must be strings, found {0}")]
    NonStringKey(String),

    #[error("duplicate map key {0:?}")]
    DuplicateKey(String),

    /// Only tag 42 (links) is part of the data model.
    #[error("unsupported cbor tag {0}")]
    UnsupportedTag(u64),

    /// The engine panicked; the panic was caught and reported here.
    #[error("cbor panic: {0}")]
    Fault(String),

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error("failed to marshal: {0}")]
    Encode(String),

    #[error("integer {0} is outside the cbor integer range")]
    IntegerOutOfRange(i128),

    /// No rule in the active rule set covers the host type.
    #[error("no cbor rule registered for type {0}")]
    Unregistered(String),

    /// A rule was handed a value of a type other than its own.
    #[error("cbor rule for {expected} applied to a value of another type")]
    TypeMismatch { expected: &'static str },

    #[error("expected {expected}, found {found}")]
    UnexpectedKind { expected: &'static str, found: Kind },

    #[error("json: {0}")]
    Json(String),

    /// Raised by host `Serialize`/`Deserialize` implementations.
    #[error("{0}")]
    Custom(String),
}

impl serde::ser::Error for CodecError {
    fn custom<T: Display>(msg: T) -> Self {
        Self::Custom(msg.to_string())
    }
}

impl serde::de::Error for CodecError {
    fn custom<T: Display>(msg: T) -> Self {
        Self::Custom(msg.to_string())
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e.to_string())
    }
}

/// Errors from building a rule set.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The host type already has a rule; the earlier rule stays in effect.
    #[error("a cbor rule for {0} is already registered")]
    Conflict(&'static str),
}

/// Result alias for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
