use dagcbor_hash::{CidPrefix, HashFunction, DEFAULT_STORE_HASH};
use serde::{Deserialize, Serialize};

/// Store-wide identifier and batching settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Hash function for values that do not carry their own identifier.
    pub default_hash: HashFunction,
    /// Digest truncation; `None` keeps the full digest.
    pub hash_length: Option<usize>,
    /// Results `get_many` may queue ahead of the consumer.
    pub cursor_buffer: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_hash: DEFAULT_STORE_HASH,
            hash_length: None,
            cursor_buffer: 1,
        }
    }
}

impl StoreConfig {
    /// The prefix applied to values without an identifier of their own.
    pub fn prefix(&self) -> CidPrefix {
        CidPrefix {
            length: self.hash_length,
            ..CidPrefix::dag_cbor(self.default_hash)
        }
    }
}
