use cid::multihash::Multihash;
use cid::{Cid, Version};

use crate::error::{HashError, HashResult};
use crate::hasher::HashFunction;

/// Multicodec code for DAG-CBOR content.
pub const DAG_CBOR: u64 = 0x71;

/// Hash function stores fall back to when nothing else is configured.
pub const DEFAULT_STORE_HASH: HashFunction = HashFunction::Blake2b256;

/// Everything needed to turn bytes into an identifier except the bytes.
///
/// Two prefixes that compare equal always produce the same identifier for
/// the same input; changing any field changes the identifier without
/// touching the bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CidPrefix {
    pub version: Version,
    pub codec: u64,
    pub hash: HashFunction,
    /// Digest truncation; `None` keeps the function's full output.
    pub length: Option<usize>,
}

impl CidPrefix {
    /// Version 1, DAG-CBOR codec, full-length digest.
    pub const fn dag_cbor(hash: HashFunction) -> Self {
        Self {
            version: Version::V1,
            codec: DAG_CBOR,
            hash,
            length: None,
        }
    }

    /// Truncate digests to `length` bytes.
    pub const fn with_length(mut self, length: usize) -> Self {
        self.length = Some(length);
        self
    }

    /// The prefix an existing identifier was built with.
    pub fn from_cid(cid: &Cid) -> HashResult<Self> {
        let mh = cid.hash();
        Ok(Self {
            version: cid.version(),
            codec: cid.codec(),
            hash: HashFunction::from_code(mh.code())?,
            length: Some(usize::from(mh.size())),
        })
    }

    /// Hash `data` and assemble the identifier.
    pub fn sum(&self, data: &[u8]) -> HashResult<Cid> {
        let digest = self.hash.digest_truncated(data, self.length)?;
        let mh = Multihash::<64>::wrap(self.hash.code(), &digest)
            .map_err(|e| HashError::Multihash(e.to_string()))?;
        Cid::new(self.version, self.codec, mh).map_err(|e| HashError::Cid(e.to_string()))
    }
}

impl Default for CidPrefix {
    fn default() -> Self {
        Self::dag_cbor(HashFunction::Sha2_256)
    }
}

/// Whether `data` hashes to `cid` under the cid's own prefix.
///
/// An identity cid only matches data of exactly its digest length.
pub fn verify(cid: &Cid, data: &[u8]) -> HashResult<bool> {
    match CidPrefix::from_cid(cid)?.sum(data) {
        Ok(actual) => Ok(actual == *cid),
        Err(HashError::IdentityLength { .. }) => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // CBOR `null`.
    const NULL: &[u8] = &[0xf6];

    #[test]
    fn default_prefix_is_sha256_dag_cbor_v1() {
        let cid = CidPrefix::default().sum(NULL).unwrap();
        assert_eq!(
            cid.to_string(),
            "bafyreifqwkmiw256ojf2zws6tzjeonw6bpd5vza4i22ccpcq4hjv2ts7cm"
        );
        assert_eq!(cid.codec(), DAG_CBOR);
        assert_eq!(cid.version(), Version::V1);
    }

    #[test]
    fn empty_string_golden() {
        let cid = CidPrefix::default().sum(&[0x60]).unwrap();
        assert_eq!(
            cid.to_string(),
            "bafyreiengp2sbi6ez34a2jctv34bwyjl7yoliteleaswgcwtqzrhmpyt2m"
        );
    }

    #[test]
    fn other_functions_golden() {
        let sha512 = CidPrefix::dag_cbor(HashFunction::Sha2_512).sum(NULL).unwrap();
        assert_eq!(
            sha512.to_string(),
            "bafyrgqeqf4mapvcb2evjvr4f2g4cruwjwxeta5372wz3izzycxzwtl2cyckdui6z33qv6ubm74ph6nmda3z2nfbhyrdneudeobqrixizjgisa"
        );

        let blake2b = CidPrefix::dag_cbor(DEFAULT_STORE_HASH).sum(NULL).unwrap();
        assert_eq!(
            blake2b.to_string(),
            "bafy2bzaceaa7jn4ile6u64g6fjc4fypiocel7pp2fflxvynwfk5gbyev4ovvg"
        );

        let identity = CidPrefix::dag_cbor(HashFunction::Identity).sum(NULL).unwrap();
        assert_eq!(identity.to_string(), "bafyqaapw");
    }

    #[test]
    fn truncated_digest_golden() {
        let cid = CidPrefix::default().with_length(20).sum(NULL).unwrap();
        assert_eq!(cid.to_string(), "bafyreffqwkmiw256ojf2zws6tzjeonw6bpd5vza");
        assert_eq!(cid.hash().size(), 20);
    }

    #[test]
    fn changing_the_hash_changes_the_identifier() {
        let a = CidPrefix::dag_cbor(HashFunction::Sha2_256).sum(NULL).unwrap();
        let b = CidPrefix::dag_cbor(HashFunction::Blake3).sum(NULL).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn prefix_of_cid_reproduces_it() {
        for hash in [
            HashFunction::Sha2_256,
            HashFunction::Sha2_512,
            HashFunction::Blake3,
            HashFunction::Blake2b256,
        ] {
            let cid = CidPrefix::dag_cbor(hash).sum(b"abc").unwrap();
            let prefix = CidPrefix::from_cid(&cid).unwrap();
            assert_eq!(prefix.hash, hash);
            assert_eq!(prefix.sum(b"abc").unwrap(), cid);
        }
    }

    #[test]
    fn verify_detects_tampering() {
        let cid = CidPrefix::default().sum(b"original").unwrap();
        assert!(verify(&cid, b"original").unwrap());
        assert!(!verify(&cid, b"tampered").unwrap());
    }

    #[test]
    fn prefix_with_unknown_hash_fails() {
        let mh = Multihash::<64>::wrap(0x1b, &[0u8; 32]).unwrap();
        let cid = Cid::new_v1(DAG_CBOR, mh);
        assert_eq!(
            CidPrefix::from_cid(&cid),
            Err(HashError::UnsupportedFunction(0x1b))
        );
    }

    #[test]
    fn identity_digest_must_cover_the_whole_input() {
        let prefix = CidPrefix::dag_cbor(HashFunction::Identity);
        let cid = prefix.sum(b"ab").unwrap();
        assert!(verify(&cid, b"ab").unwrap());
        assert!(!verify(&cid, b"abc").unwrap());
        assert!(!verify(&cid, b"a").unwrap());

        let err = CidPrefix::from_cid(&cid).unwrap().sum(b"abc").unwrap_err();
        assert_eq!(err, HashError::IdentityLength { requested: 2, actual: 3 });
        assert!(prefix.with_length(3).sum(b"ab").is_err());
    }

    #[test]
    fn overlong_truncation_fails() {
        let err = CidPrefix::default().with_length(64).sum(NULL).unwrap_err();
        assert!(matches!(err, HashError::LengthTooLong { .. }));
    }
}
