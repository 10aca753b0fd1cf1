//! Query text parsing
//!
//! Normalization and fingerprinting of raw SQL text.

pub mod normalizer;

pub use normalizer::{mask_literals, normalize};

use sha2::{Digest, Sha256};

/// Width of a fingerprint in hex characters
pub const FINGERPRINT_LEN: usize = 32;

/// Stable grouping key for a normalized query.
///
/// First 16 bytes of SHA-256, hex encoded. Collisions are treated as a
/// match; this is never used as a security token.
pub fn fingerprint(normalized_text: &str) -> String {
    let digest = Sha256::digest(normalized_text.as_bytes());
    digest[..FINGERPRINT_LEN / 2]
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_fixed_width() {
        assert_eq!(fingerprint("").len(), FINGERPRINT_LEN);
        assert_eq!(fingerprint("SELECT * FROM users WHERE id = ?").len(), FINGERPRINT_LEN);
    }

    #[test]
    fn test_fingerprint_stable_across_literals() {
        let a = fingerprint(&normalize("SELECT * FROM users WHERE id = 1"));
        let b = fingerprint(&normalize("select *   from users where id = 999"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_fingerprint_deterministic() {
        // Pinned value guards against accidental algorithm changes between runs
        let text = "SELECT * FROM users WHERE id = ?";
        assert_eq!(fingerprint(text), fingerprint(text));
        assert_eq!(fingerprint("abc"), "ba7816bf8f01cfea414140de5dae2223");
    }

    #[test]
    fn test_fingerprint_distinguishes_shapes() {
        assert_ne!(
            fingerprint(&normalize("SELECT * FROM users WHERE id = 1")),
            fingerprint(&normalize("SELECT * FROM orders WHERE id = 1"))
        );
    }
}
