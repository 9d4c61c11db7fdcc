//! Digest computation for content hashes and OCSP CertID matching.

use crate::fields::DigestAlgorithm;
use digest::Digest;

/// Compute a digest of `data` with the given algorithm.
pub fn compute_digest(data: &[u8], algorithm: DigestAlgorithm) -> Vec<u8> {
    match algorithm {
        DigestAlgorithm::Sha256 => sha2::Sha256::digest(data).to_vec(),
        DigestAlgorithm::Sha384 => sha2::Sha384::digest(data).to_vec(),
        DigestAlgorithm::Sha512 => sha2::Sha512::digest(data).to_vec(),
        DigestAlgorithm::Sha1 => sha1::Sha1::digest(data).to_vec(),
    }
}

/// Stable identifier for a certificate: lowercase hex SHA-256 of its DER.
pub fn content_hash(der_bytes: &[u8]) -> String {
    hex::encode(compute_digest(der_bytes, DigestAlgorithm::Sha256))
}
