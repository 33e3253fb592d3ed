//! Message digests.

use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::algorithm::HashAlgorithm;

/// Computes the digest of `data` with the given algorithm.
#[must_use]
pub fn digest(algorithm: HashAlgorithm, data: &[u8]) -> Vec<u8> {
    match algorithm {
        HashAlgorithm::Sha1 => Sha1::digest(data).to_vec(),
        HashAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
        HashAlgorithm::Sha384 => Sha384::digest(data).to_vec(),
        HashAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_lengths_match_algorithm() {
        for alg in [
            HashAlgorithm::Sha1,
            HashAlgorithm::Sha256,
            HashAlgorithm::Sha384,
            HashAlgorithm::Sha512,
        ] {
            assert_eq!(digest(alg, b"test").len(), alg.output_len());
        }
    }

    #[test]
    fn sha1_known_answer() {
        let out = digest(HashAlgorithm::Sha1, b"abc");
        let hex: String = out.iter().map(|b| format!("{b:02x}")).collect();
        assert_eq!(hex, "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[test]
    fn different_inputs_produce_different_hashes() {
        assert_ne!(
            digest(HashAlgorithm::Sha256, b"hello"),
            digest(HashAlgorithm::Sha256, b"world")
        );
    }
}
