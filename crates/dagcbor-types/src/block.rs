use std::fmt;

use bytes::Bytes;
use cid::Cid;

/// Encoded bytes together with the identifier that names them.
///
/// A block never checks that `cid` actually hashes `data`; whoever builds one
/// vouches for it. Cloning is cheap since the payload is shared.
#[derive(Clone, PartialEq, Eq)]
pub struct Block {
    cid: Cid,
    data: Bytes,
}

impl Block {
    /// Create a new block. The identifier is trusted, not recomputed.
    pub fn new(cid: Cid, data: impl Into<Bytes>) -> Self {
        Self {
            cid,
            data: data.into(),
        }
    }

    /// The identifier the block is stored under.
    pub fn cid(&self) -> &Cid {
        &self.cid
    }

    /// The raw bytes.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Length of the payload in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Split into identifier and bytes.
    pub fn into_parts(self) -> (Cid, Bytes) {
        (self.cid, self.data)
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("cid", &self.cid.to_string())
            .field("size", &self.data.len())
            .finish()
    }
}
