//! Identity keys for collector entries.

/// Written after every field. 0xFF never occurs in UTF-8, so field boundaries
/// cannot be forged by ordinary values.
pub const FIELD_SEPARATOR: u8 = 0xFF;

/// Hashes an ordered identity vector into a 64-bit key.
///
/// Deterministic across processes and sensitive to field order.
pub fn identity_hash<'a, I>(fields: I) -> u64
where
    I: IntoIterator<Item = &'a str>,
{
    let mut hasher = blake3::Hasher::new();
    for field in fields {
        hasher.update(field.as_bytes());
        hasher.update(&[FIELD_SEPARATOR]);
    }
    let digest = hasher.finalize();
    let mut key = [0u8; 8];
    key.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_le_bytes(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_for_equal_input() {
        assert_eq!(
            identity_hash(["v1", "Pod", "default", "web"]),
            identity_hash(["v1", "Pod", "default", "web"])
        );
    }

    #[test]
    fn order_sensitive() {
        assert_ne!(identity_hash(["a", "b"]), identity_hash(["b", "a"]));
    }

    #[test]
    fn separator_keeps_field_boundaries() {
        assert_ne!(identity_hash(["ab", "c"]), identity_hash(["a", "bc"]));
        assert_ne!(identity_hash(["", "x"]), identity_hash(["x", ""]));
        assert_ne!(identity_hash(std::iter::empty()), identity_hash([""]));
    }
}
