//! Content digests in the `sha256:<hex>` format used by ZBRS manifests.

use sha2::{Digest, Sha256};

/// Prefix of every digest string.
pub const CHECKSUM_PREFIX: &str = "sha256:";

/// Compute the `sha256:<lowercase hex>` digest of `bytes`.
pub fn calculate_checksum(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    format!("{CHECKSUM_PREFIX}{}", hex::encode(digest))
}

/// Whether `value` is a well-formed `sha256:` digest (64 lowercase hex digits).
pub fn is_sha256_digest(value: &str) -> bool {
    value
        .strip_prefix(CHECKSUM_PREFIX)
        .is_some_and(|hex| {
            hex.len() == 64 && hex.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digest() {
        assert_eq!(
            calculate_checksum(b""),
            "sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_digest_format() {
        let checksum = calculate_checksum(b"In the beginning");
        assert!(is_sha256_digest(&checksum));
        assert_eq!(checksum.len(), CHECKSUM_PREFIX.len() + 64);
    }

    #[test]
    fn test_rejects_malformed_digests() {
        assert!(!is_sha256_digest("md5:d41d8cd98f00b204e9800998ecf8427e"));
        assert!(!is_sha256_digest("sha256:abc"));
        let upper = calculate_checksum(b"x").to_uppercase().replace("SHA256", "sha256");
        assert!(!is_sha256_digest(&upper));
    }
}
