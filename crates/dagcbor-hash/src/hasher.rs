use blake2::digest::consts::U32;
use blake2::Blake2b;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};

use crate::error::{HashError, HashResult};

/// A multihash function the codec can derive identifiers with.
///
/// Serializes by its multicodec table name so configuration files read
/// `default_hash = "blake2b-256"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashFunction {
    /// The data itself, unhashed. Only sensible for tiny blocks.
    #[serde(rename = "identity")]
    Identity,
    #[serde(rename = "sha2-256")]
    Sha2_256,
    #[serde(rename = "sha2-512")]
    Sha2_512,
    #[serde(rename = "blake3")]
    Blake3,
    #[serde(rename = "blake2b-256")]
    Blake2b256,
}

impl HashFunction {
    /// Look up a function by multihash code.
    pub fn from_code(code: u64) -> HashResult<Self> {
        match code {
            0x00 => Ok(Self::Identity),
            0x12 => Ok(Self::Sha2_256),
            0x13 => Ok(Self::Sha2_512),
            0x1e => Ok(Self::Blake3),
            0xb220 => Ok(Self::Blake2b256),
            other => Err(HashError::UnsupportedFunction(other)),
        }
    }

    /// The multihash code.
    pub const fn code(&self) -> u64 {
        match self {
            Self::Identity => 0x00,
            Self::Sha2_256 => 0x12,
            Self::Sha2_512 => 0x13,
            Self::Blake3 => 0x1e,
            Self::Blake2b256 => 0xb220,
        }
    }

    /// Multicodec table name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Sha2_256 => "sha2-256",
            Self::Sha2_512 => "sha2-512",
            Self::Blake3 => "blake3",
            Self::Blake2b256 => "blake2b-256",
        }
    }

    /// Full-length digest of `data`.
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Identity => data.to_vec(),
            Self::Sha2_256 => Sha256::digest(data).to_vec(),
            Self::Sha2_512 => Sha512::digest(data).to_vec(),
            Self::Blake3 => blake3::hash(data).as_bytes().to_vec(),
            Self::Blake2b256 => Blake2b::<U32>::digest(data).to_vec(),
        }
    }

    /// Digest of `data` truncated to `length` bytes, or full length for `None`.
    pub fn digest_truncated(&self, data: &[u8], length: Option<usize>) -> HashResult<Vec<u8>> {
        if let (Self::Identity, Some(requested)) = (self, length) {
            if requested != data.len() {
                return Err(HashError::IdentityLength {
                    requested,
                    actual: data.len(),
                });
            }
        }
        let mut digest = self.digest(data);
        if let Some(requested) = length {
            if requested > digest.len() {
                return Err(HashError::LengthTooLong {
                    requested,
                    available: digest.len(),
                });
            }
            digest.truncate(requested);
        }
        Ok(digest)
    }
}

impl std::fmt::Display for HashFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
