//! Content digests recorded in run manifests.

use sha2::{Digest, Sha256};

/// Hex SHA-256 of the raw case file bytes.
pub fn input_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_stable() {
        assert_eq!(input_digest(b"version: 1\n"), input_digest(b"version: 1\n"));
        assert_eq!(input_digest(b"").len(), 64);
    }

    #[test]
    fn digest_differs_for_different_inputs() {
        assert_ne!(input_digest(b"name: a\n"), input_digest(b"name: b\n"));
    }

    #[test]
    fn digest_of_empty_input() {
        assert_eq!(
            input_digest(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
