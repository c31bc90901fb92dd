use thiserror::Error;

/// Errors produced while reading a link payload off the wire.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LinkError {
    #[error("link value was empty")]
    Empty,

    #[error("invalid multibase prefix on link: expected 0x00, got {0:#04x}")]
    MissingMultibase(u8),

    #[error("invalid link: {0}")]
    InvalidCid(String),
}
