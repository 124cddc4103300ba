use sha2::{Digest, Sha256};

/// Joins parts with a byte that never shows up in URLs or decimal ids, so
/// `["a", "b"]` and `["b", "a"]` always hash differently.
const FINGERPRINT_SEPARATOR: &str = "\u{1f}";

pub fn sha256_hex(s: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    let digest = hasher.finalize();
    format!("{:x}", digest)
}

/// Stable lowercase-hex identifier for an ordered list of strings.
pub fn fingerprint(parts: &[&str]) -> String {
    sha256_hex(&parts.join(FINGERPRINT_SEPARATOR))
}
