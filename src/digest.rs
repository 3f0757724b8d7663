//! Canonical fingerprint for "which quorum of signers" a script belongs to.

use serde::Serialize;

use crate::bitcoin::hashes::{sha256d, Hash};

/// Identity of a multisig quorum: the required signature count plus the set
/// of cosigner master-key fingerprints, independent of key ordering.
///
/// Two scripts with equal digests are defined to belong to the same wallet
/// quorum. This is a comparison primitive only and is never shown to users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct QuorumDigest(String);

impl QuorumDigest {
    /// Compute the digest for `quorum_m` required signatures over the given
    /// root fingerprints (lowercase hex strings).
    ///
    /// The fingerprints are sorted lexicographically before hashing so the
    /// digest does not depend on the order keys appear on chain (that order
    /// is BIP67-sorted separately).
    pub fn new(quorum_m: u32, root_fingerprints: &[String]) -> Self {
        let mut sorted = root_fingerprints.to_vec();
        sorted.sort();
        let preimage = format!("{}:{}", quorum_m, sorted.join("-"));
        let hash = sha256d::Hash::hash(preimage.as_bytes());
        QuorumDigest(hex::encode(hash.to_byte_array()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for QuorumDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
