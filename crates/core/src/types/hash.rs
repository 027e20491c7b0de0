//! FNV-1a fingerprints for type names
//!
//! Type identities are keyed by the 64-bit FNV-1a hash of their decayed
//! name.

/// FNV-1a 64-bit hash (compile-time capable)
pub const fn fnv1a_64(data: &[u8]) -> u64 {
    const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x00000100000001B3;

    let mut hash = FNV_OFFSET_BASIS;
    let mut i = 0;
    while i < data.len() {
        hash ^= data[i] as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
        i += 1;
    }
    hash
}

/// Fingerprint of a type name
#[inline]
pub const fn type_hash(name: &str) -> u64 {
    fnv1a_64(name.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fnv1a_64_empty() {
        assert_eq!(fnv1a_64(b""), 0xcbf29ce484222325);
    }

    #[test]
    fn test_fnv1a_known_vectors() {
        assert_eq!(fnv1a_64(b"foobar"), 0x85944171f73967e8);
        assert_eq!(fnv1a_64(b"a"), 0xaf63dc4c8601ec8c);
    }

    #[test]
    fn test_type_hash_distinguishes_names() {
        assert_ne!(type_hash("i32"), type_hash("i64"));
        assert_eq!(type_hash("Point"), type_hash("Point"));
    }

    #[test]
    fn test_const_evaluation() {
        const HASH: u64 = type_hash("test");
        assert!(HASH != 0);
    }
}
