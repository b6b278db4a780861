//! Deterministic hashing primitives.
//!
//! Repair timing, response grouping and bloom filter bit positions all
//! depend on hashes that every participant of a channel must compute
//! bit-for-bit identically. Nothing here is used for security.

/// Hashes identifiers to unsigned 64-bit integers.
pub trait IdHasher {
    /// Hash a single string.
    fn hash_str(&self, s: &str) -> u64;

    /// Hash two strings together, in order.
    fn combined_hash(&self, a: &str, b: &str) -> u64;
}

/// Produces the `n`-th hash of an item, reduced into `[0, max_value)`.
pub trait BloomHasher {
    fn hash_n(&self, item: &[u8], n: u32, max_value: u64) -> u64;
}

/// [`IdHasher`] taking the first 8 bytes (big-endian) of a BLAKE3 digest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Blake3IdHasher;

impl IdHasher for Blake3IdHasher {
    fn hash_str(&self, s: &str) -> u64 {
        let digest = blake3::hash(s.as_bytes());
        read_u64_be(&digest.as_bytes()[..8])
    }

    fn combined_hash(&self, a: &str, b: &str) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(a.as_bytes());
        hasher.update(b.as_bytes());
        read_u64_be(&hasher.finalize().as_bytes()[..8])
    }
}

/// Double hashing over a single BLAKE3 digest: `(h1 + n * h2) mod max`.
///
/// `h1` and `h2` are the first and second 64-bit little-endian words of the
/// digest. `h2` is forced odd so successive indices never collapse onto one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DoubleHasher;

impl DoubleHasher {
    fn base_hashes(item: &[u8]) -> (u64, u64) {
        let digest = blake3::hash(item);
        let bytes = digest.as_bytes();
        let h1 = read_u64_le(&bytes[..8]);
        let h2 = read_u64_le(&bytes[8..16]) | 1;
        (h1, h2)
    }
}

impl BloomHasher for DoubleHasher {
    fn hash_n(&self, item: &[u8], n: u32, max_value: u64) -> u64 {
        if max_value == 0 {
            return 0;
        }
        let (h1, h2) = Self::base_hashes(item);
        h1.wrapping_add((n as u64).wrapping_mul(h2)) % max_value
    }
}

fn read_u64_be(bytes: &[u8]) -> u64 {
    let mut arr = [0u8; 8];
    arr.copy_from_slice(bytes);
    u64::from_be_bytes(arr)
}

fn read_u64_le(bytes: &[u8]) -> u64 {
    let mut arr = [0u8; 8];
    arr.copy_from_slice(bytes);
    u64::from_le_bytes(arr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_hash_deterministic() {
        let h = Blake3IdHasher;
        assert_eq!(h.hash_str("msg1"), h.hash_str("msg1"));
        assert_ne!(h.hash_str("msg1"), h.hash_str("msg2"));
    }

    #[test]
    fn test_combined_hash_is_concatenation() {
        let h = Blake3IdHasher;
        assert_eq!(h.combined_hash("alice", "msg1"), h.hash_str("alicemsg1"));
        assert_ne!(h.combined_hash("alice", "msg1"), h.combined_hash("msg1", "alice"));
    }

    #[test]
    fn test_hash_n_in_range() {
        let h = DoubleHasher;
        for n in 0..16 {
            assert!(h.hash_n(b"item", n, 97) < 97);
        }
        assert_eq!(h.hash_n(b"item", 3, 0), 0);
    }

    #[test]
    fn test_hash_n_varies_with_n() {
        let h = DoubleHasher;
        let first = h.hash_n(b"item", 0, u64::MAX);
        let second = h.hash_n(b"item", 1, u64::MAX);
        assert_ne!(first, second);
    }
}
