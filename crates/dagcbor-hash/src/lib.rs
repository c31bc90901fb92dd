//! Content identifier derivation for DAG-CBOR objects.
//!
//! Turns canonical bytes into a version-1 CID: a multihash digest under one
//! of the supported [`HashFunction`]s, optionally truncated, tagged with the
//! DAG-CBOR codec. Identifiers are a pure function of the bytes and the
//! [`CidPrefix`].
//!
//! All hashing wraps established libraries; there is no custom cryptography.

pub mod error;
pub mod hasher;
pub mod prefix;

pub use error::{HashError, HashResult};
pub use hasher::HashFunction;
pub use prefix::{verify, CidPrefix, DAG_CBOR, DEFAULT_STORE_HASH};
