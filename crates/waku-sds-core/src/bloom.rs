//! Fixed-size bloom filter used for optimistic acknowledgement.
//!
//! Each participant advertises the ids it has seen in a bloom filter carried
//! on outgoing messages. Receivers treat a hit as "possibly acknowledged".
//!
//! ## Wire layout
//!
//! The filter serializes as packed little-endian 64-bit words. Bit `i` lives
//! in word `i / 64` at position `i % 64`. Peers can only read each other's
//! filters if they derive the same `k` and bit count from the same options
//! and use the same [`BloomHasher`].

use serde::{Deserialize, Serialize};

use crate::error::BloomError;
use crate::hash::{BloomHasher, DoubleHasher};
use crate::probabilities::{get_m_over_n_bits_for_k, MAX_K};

/// Options a bloom filter is sized from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BloomFilterOptions {
    /// Expected number of inserted elements.
    pub capacity: usize,
    /// Target false-positive rate, in `(0, 1)`.
    pub error_rate: f64,
    /// Number of hash functions. Derived from `error_rate` when unset.
    pub k_hashes: Option<u32>,
    /// Bits per element, overriding the table lookup when `k_hashes` is set.
    pub force_n_bits_per_elem: Option<u32>,
}

/// Options used by SDS channels unless configured otherwise.
pub const DEFAULT_BLOOM_FILTER_OPTIONS: BloomFilterOptions = BloomFilterOptions {
    capacity: 10_000,
    error_rate: 0.001,
    k_hashes: None,
    force_n_bits_per_elem: None,
};

impl Default for BloomFilterOptions {
    fn default() -> Self {
        DEFAULT_BLOOM_FILTER_OPTIONS
    }
}

impl BloomFilterOptions {
    /// Options with the given capacity and error rate, everything else derived.
    pub fn new(capacity: usize, error_rate: f64) -> Self {
        Self {
            capacity,
            error_rate,
            k_hashes: None,
            force_n_bits_per_elem: None,
        }
    }

    /// Fix the number of hash functions.
    pub fn with_k_hashes(mut self, k: u32) -> Self {
        self.k_hashes = Some(k);
        self
    }

    /// Force the number of bits per element.
    pub fn with_bits_per_elem(mut self, bits: u32) -> Self {
        self.force_n_bits_per_elem = Some(bits);
        self
    }

    /// Resolve `(k, bits_per_element)` for these options.
    pub fn sizing(&self) -> Result<(u32, u32), BloomError> {
        if !(self.error_rate > 0.0 && self.error_rate < 1.0) {
            return Err(BloomError::InvalidErrorRate(self.error_rate));
        }
        if self.capacity == 0 {
            return Err(BloomError::ZeroCapacity);
        }

        match self.k_hashes {
            Some(k) => {
                if k > MAX_K {
                    return Err(BloomError::HashCountOutOfRange(k));
                }
                // No hash functions means every lookup matches.
                if k == 0 {
                    return Err(BloomError::Unachievable {
                        k,
                        error_rate: self.error_rate,
                    });
                }
                let bits = match self.force_n_bits_per_elem {
                    Some(0) => {
                        return Err(BloomError::Unachievable {
                            k,
                            error_rate: self.error_rate,
                        })
                    }
                    Some(bits) => bits,
                    None => get_m_over_n_bits_for_k(k, self.error_rate)?,
                };
                Ok((k, bits))
            }
            None => {
                let ln2 = std::f64::consts::LN_2;
                let bits = (-self.error_rate.ln() / (ln2 * ln2)).ceil() as u32;
                let k = (ln2 * bits as f64).round() as u32;
                Ok((k, bits))
            }
        }
    }
}

/// A bloom filter over byte strings.
///
/// Never reports a false negative: once `insert(x)` has been called,
/// `lookup(x)` returns `true` for the lifetime of the filter.
#[derive(Debug, Clone, PartialEq)]
pub struct BloomFilter<H = DoubleHasher> {
    options: BloomFilterOptions,
    k_hashes: u32,
    total_bits: u64,
    data: Vec<u64>,
    hasher: H,
}

impl BloomFilter<DoubleHasher> {
    /// Create an empty filter with the default hasher.
    pub fn new(options: BloomFilterOptions) -> Result<Self, BloomError> {
        Self::with_hasher(options, DoubleHasher)
    }

    /// Rebuild a filter received from a peer.
    pub fn from_bytes(bytes: &[u8], options: BloomFilterOptions) -> Result<Self, BloomError> {
        Self::from_bytes_with_hasher(bytes, options, DoubleHasher)
    }
}

impl<H: BloomHasher> BloomFilter<H> {
    /// Create an empty filter using `hasher` for bit positions.
    pub fn with_hasher(options: BloomFilterOptions, hasher: H) -> Result<Self, BloomError> {
        let (k_hashes, bits_per_elem) = options.sizing()?;
        let too_large = || BloomError::TooLarge {
            capacity: options.capacity,
            bits_per_elem,
        };
        let total_bits = u64::try_from(options.capacity)
            .ok()
            .and_then(|capacity| capacity.checked_mul(u64::from(bits_per_elem)))
            .ok_or_else(too_large)?;
        let words = usize::try_from(total_bits.div_ceil(64)).map_err(|_| too_large())?;

        Ok(Self {
            options,
            k_hashes,
            total_bits,
            data: vec![0u64; words],
            hasher,
        })
    }

    /// Rebuild a filter from its packed little-endian words.
    pub fn from_bytes_with_hasher(
        bytes: &[u8],
        options: BloomFilterOptions,
        hasher: H,
    ) -> Result<Self, BloomError> {
        let mut filter = Self::with_hasher(options, hasher)?;
        let expected = filter.data.len() * 8;
        if bytes.len() != expected {
            return Err(BloomError::InvalidLength {
                expected,
                got: bytes.len(),
            });
        }

        for (word, chunk) in filter.data.iter_mut().zip(bytes.chunks_exact(8)) {
            let mut arr = [0u8; 8];
            arr.copy_from_slice(chunk);
            *word = u64::from_le_bytes(arr);
        }
        Ok(filter)
    }

    /// Add an item to the set.
    pub fn insert(&mut self, item: impl AsRef<[u8]>) {
        let item = item.as_ref();
        for n in 0..self.k_hashes {
            let index = self.hasher.hash_n(item, n, self.total_bits);
            self.data[(index / 64) as usize] |= 1u64 << (index % 64);
        }
    }

    /// Whether the item may have been inserted.
    ///
    /// `false` is definitive; `true` may be a false positive.
    pub fn lookup(&self, item: impl AsRef<[u8]>) -> bool {
        let item = item.as_ref();
        (0..self.k_hashes).all(|n| {
            let index = self.hasher.hash_n(item, n, self.total_bits);
            self.data[(index / 64) as usize] & (1u64 << (index % 64)) != 0
        })
    }

    /// Serialize as packed little-endian 64-bit words.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.data.iter().flat_map(|word| word.to_le_bytes()).collect()
    }

    /// Number of hash functions.
    pub fn k_hashes(&self) -> u32 {
        self.k_hashes
    }

    /// Total number of bits in the filter.
    pub fn total_bits(&self) -> u64 {
        self.total_bits
    }

    /// Configured false-positive rate.
    pub fn error_rate(&self) -> f64 {
        self.options.error_rate
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.options.capacity
    }

    /// Options that rebuild a filter of identical shape.
    pub fn options(&self) -> BloomFilterOptions {
        self.options
    }

    /// Number of bits currently set.
    pub fn count_ones(&self) -> u64 {
        self.data.iter().map(|w| w.count_ones() as u64).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn filled(options: BloomFilterOptions, n: usize) -> (BloomFilter, Vec<String>) {
        let mut filter = BloomFilter::new(options).unwrap();
        let items: Vec<String> = (0..n).map(|i| format!("item-{}", i)).collect();
        for item in &items {
            filter.insert(item);
        }
        (filter, items)
    }

    #[test]
    fn test_default_parameters() {
        let filter = BloomFilter::new(BloomFilterOptions::new(10_000, 0.001)).unwrap();
        assert_eq!(filter.k_hashes(), 10);
        assert_eq!(filter.total_bits() / 10_000, 15);
    }

    #[test]
    fn test_forced_bits_per_element() {
        let options = BloomFilterOptions::new(10_000, 0.001)
            .with_k_hashes(4)
            .with_bits_per_elem(20);
        let filter = BloomFilter::new(options).unwrap();
        assert_eq!(filter.k_hashes(), 4);
        assert_eq!(filter.total_bits(), 200_000);
    }

    #[test]
    fn test_table_lookup_for_explicit_k() {
        let options = BloomFilterOptions::new(100, 0.01).with_k_hashes(3);
        let filter = BloomFilter::new(options).unwrap();
        assert_eq!(filter.total_bits(), 1_300);
    }

    #[test]
    fn test_invalid_configurations() {
        let too_many = BloomFilterOptions::new(100, 0.01).with_k_hashes(13);
        assert_eq!(
            BloomFilter::new(too_many).unwrap_err(),
            BloomError::HashCountOutOfRange(13)
        );

        let unreachable = BloomFilterOptions::new(100, 0.000_001).with_k_hashes(2);
        assert!(matches!(
            BloomFilter::new(unreachable).unwrap_err(),
            BloomError::Unachievable { k: 2, .. }
        ));

        assert_eq!(
            BloomFilter::new(BloomFilterOptions::new(100, 1.5)).unwrap_err(),
            BloomError::InvalidErrorRate(1.5)
        );
        assert_eq!(
            BloomFilter::new(BloomFilterOptions::new(0, 0.01)).unwrap_err(),
            BloomError::ZeroCapacity
        );
    }

    #[test]
    fn test_zero_hashes_rejected_even_with_forced_bits() {
        let options = BloomFilterOptions::new(100, 0.01)
            .with_k_hashes(0)
            .with_bits_per_elem(10);
        assert!(matches!(
            BloomFilter::new(options).unwrap_err(),
            BloomError::Unachievable { k: 0, .. }
        ));
        assert!(matches!(
            BloomFilter::new(BloomFilterOptions::new(100, 0.01).with_k_hashes(0)).unwrap_err(),
            BloomError::Unachievable { k: 0, .. }
        ));
    }

    #[test]
    fn test_oversized_capacity_rejected() {
        let options = BloomFilterOptions::new(usize::MAX, 0.01)
            .with_k_hashes(4)
            .with_bits_per_elem(u32::MAX);
        assert!(matches!(
            BloomFilter::new(options).unwrap_err(),
            BloomError::TooLarge { capacity: usize::MAX, .. }
        ));
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut filter = BloomFilter::new(DEFAULT_BLOOM_FILTER_OPTIONS).unwrap();
        assert!(!filter.lookup("test string"));
        filter.insert("test string");
        assert!(filter.lookup("test string"));
        assert!(!filter.lookup("different string"));
    }

    #[test]
    fn test_no_false_negatives() {
        let (filter, items) = filled(BloomFilterOptions::new(10_000, 0.001), 10_000);
        for item in &items {
            assert!(filter.lookup(item));
        }
    }

    #[test]
    fn test_false_positive_rate() {
        let (filter, _) = filled(BloomFilterOptions::new(1_000, 0.01), 1_000);

        let trials = 20_000;
        let false_positives = (0..trials)
            .filter(|i| filter.lookup(format!("absent-{}", i)))
            .count();

        let rate = false_positives as f64 / trials as f64;
        assert!(rate < filter.error_rate() * 1.5, "observed rate {}", rate);
    }

    #[test]
    fn test_special_patterns() {
        let mut filter = BloomFilter::new(DEFAULT_BLOOM_FILTER_OPTIONS).unwrap();
        let patterns = [
            "shortstr".to_string(),
            "a".repeat(1000),
            "special@#$%^&*()".to_string(),
            "unicode→★∑≈".to_string(),
            "pattern".repeat(10),
        ];
        for pattern in &patterns {
            filter.insert(pattern);
            assert!(filter.lookup(pattern));
        }
    }

    #[test]
    fn test_bytes_roundtrip_preserves_membership() {
        let (filter, items) = filled(DEFAULT_BLOOM_FILTER_OPTIONS, 500);
        let bytes = filter.to_bytes();
        assert_eq!(bytes.len() as u64, filter.total_bits().div_ceil(64) * 8);

        let restored = BloomFilter::from_bytes(&bytes, filter.options()).unwrap();
        assert_eq!(restored, filter);
        for item in &items {
            assert!(restored.lookup(item));
        }
    }

    #[test]
    fn test_bit_layout_is_little_endian_words() {
        let options = BloomFilterOptions::new(10, 0.01).with_k_hashes(1).with_bits_per_elem(16);
        let mut bytes = vec![0u8; 24];
        // Bit 65: word 1, bit 1 -> byte 8, mask 0b10.
        bytes[8] = 0b10;
        let filter = BloomFilter::from_bytes(&bytes, options).unwrap();
        assert_eq!(filter.count_ones(), 1);
        assert_eq!(filter.to_bytes(), bytes);
    }

    #[test]
    fn test_from_bytes_rejects_wrong_length() {
        let err = BloomFilter::from_bytes(&[0u8; 3], DEFAULT_BLOOM_FILTER_OPTIONS).unwrap_err();
        assert!(matches!(err, BloomError::InvalidLength { got: 3, .. }));
    }

    proptest! {
        #[test]
        fn prop_no_false_negatives(
            items in prop::collection::vec(".{0,24}", 1..200),
            k in 1u32..=12,
            bits in 4u32..=32,
        ) {
            let options = BloomFilterOptions::new(items.len(), 0.01)
                .with_k_hashes(k)
                .with_bits_per_elem(bits);
            let mut filter = BloomFilter::new(options).unwrap();
            for item in &items {
                filter.insert(item);
            }
            for item in &items {
                prop_assert!(filter.lookup(item));
            }
        }
    }
}
