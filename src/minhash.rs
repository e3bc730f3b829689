//! ## MinHash sketch
//! Bottom-k sketch retaining the `k` smallest *distinct* hash values observed.
//!
//! Retained values are kept in an ordered set, so the current maximum (the
//! boundary a new hash has to beat once the sketch is full) and membership
//! checks are both `O(log k)`. A fresh sketch behaves as if it were filled with
//! `k` copies of [`MAX_HASH`]: every hash below the boundary is accepted until
//! `k` distinct values are held.
//!
//! Estimates:
//! - cardinality: `(MAX_HASH / h_max) * k` where `h_max` is the k-th smallest
//!   hash, i.e. the expected spacing of `k` uniform order statistics. A sketch
//!   holding fewer than `k` values has seen every distinct hash and returns
//!   the exact count.
//! - Jaccard: `|A ∩ B| / |A ∪ B|` computed directly over the two retained sets.

use std::collections::BTreeSet;
use std::fmt::{Debug, Formatter};
use std::hash::Hash;
use std::mem::size_of;

use tracing::trace;

use crate::error::SketchError;
use crate::hash::HashOracle;

/// Largest representable hash value, also the sentinel of empty slots
pub const MAX_HASH: u64 = u64::MAX;
/// Divisor substituted for a zero k-th smallest hash
pub const ZERO_MAX_FALLBACK: u64 = 1_000_000;

#[derive(Clone, PartialEq, Eq)]
pub struct MinHash {
    /// Number of hashes to keep
    k: usize,
    /// Smallest distinct hashes seen so far, at most `k`
    values: BTreeSet<u64>,
}

impl MinHash {
    /// Create new empty `MinHash` keeping `k` smallest hashes
    pub fn new(k: usize) -> Result<Self, SketchError> {
        if k == 0 {
            return Err(SketchError::InvalidParameter("k must be greater than zero"));
        }
        Ok(Self {
            k,
            values: BTreeSet::new(),
        })
    }

    /// Return number of hashes the sketch keeps
    #[inline]
    pub fn capacity(&self) -> usize {
        self.k
    }

    /// Return number of hashes currently retained
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Return whether no hash has been observed
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Return whether `k` distinct hashes are retained
    #[inline]
    pub fn is_full(&self) -> bool {
        self.values.len() >= self.k
    }

    /// Return retained hashes in ascending order
    pub fn values(&self) -> impl Iterator<Item = u64> + '_ {
        self.values.iter().copied()
    }

    /// Return largest retained hash, or [`MAX_HASH`] while the sketch is not full
    #[inline]
    pub fn max_value(&self) -> u64 {
        if self.is_full() {
            self.values.last().copied().unwrap_or(MAX_HASH)
        } else {
            MAX_HASH
        }
    }

    /// Insert a hashable item
    #[inline]
    pub fn insert<T: Hash + ?Sized>(&mut self, item: &T) {
        self.update(HashOracle::hash_item(item));
    }

    /// Update sketch with a hash value
    pub fn update(&mut self, hash: u64) {
        if self.values.contains(&hash) {
            return;
        }
        if !self.is_full() {
            self.values.insert(hash);
            return;
        }
        if hash < self.max_value() {
            self.values.pop_last();
            self.values.insert(hash);
        }
    }

    /// Return cardinality estimate
    pub fn cardinality(&self) -> u64 {
        if !self.is_full() {
            return self.values.len() as u64;
        }

        let mut h_max = self.max_value();
        if h_max == 0 {
            trace!(k = self.k, "k-th smallest hash is zero, using fallback divisor");
            h_max = ZERO_MAX_FALLBACK;
        }
        let estimate = (MAX_HASH as f64 / h_max as f64) * self.k as f64;
        // float to int casts saturate
        estimate as u64
    }

    /// Return union of two sketches without modifying either of them
    pub fn merge(&self, rhs: &MinHash) -> Result<MinHash, SketchError> {
        self.check_compatible(rhs)?;
        let mut union = MinHash::new(self.k)?;
        self.values().chain(rhs.values()).for_each(|h| union.update(h));
        Ok(union)
    }

    /// Return Jaccard similarity of the two retained sets
    pub fn jaccard(lhs: &MinHash, rhs: &MinHash) -> Result<f64, SketchError> {
        lhs.check_compatible(rhs)?;
        let intersection = lhs.values.intersection(&rhs.values).count();
        let union = lhs.values.len() + rhs.values.len() - intersection;
        if union == 0 {
            // two empty sketches describe the same (empty) set
            return Ok(1.0);
        }
        Ok(intersection as f64 / union as f64)
    }

    #[inline]
    fn check_compatible(&self, rhs: &MinHash) -> Result<(), SketchError> {
        if self.k != rhs.k {
            return Err(SketchError::IncompatibleSketches {
                lhs: format!("MinHash(k = {})", self.k),
                rhs: format!("MinHash(k = {})", rhs.k),
            });
        }
        Ok(())
    }

    /// Return approximate memory size of `MinHash`
    pub fn size_of(&self) -> usize {
        size_of::<Self>() + self.values.len() * size_of::<u64>()
    }
}

impl Debug for MinHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ k: {}, retained: {}, estimate: {} }}",
            self.k,
            self.values.len(),
            self.cardinality()
        )
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use test_case::test_case;

    fn random_minhash(k: usize, n: usize, seed: u64) -> MinHash {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut sketch = MinHash::new(k).unwrap();
        for _ in 0..n {
            sketch.update(rng.gen());
        }
        sketch
    }

    #[test]
    fn test_new_validates_k() {
        assert_eq!(
            MinHash::new(0),
            Err(SketchError::InvalidParameter("k must be greater than zero"))
        );
        assert!(MinHash::new(1).is_ok());
    }

    #[test]
    fn test_keeps_k_smallest() {
        let mut sketch = MinHash::new(3).unwrap();
        for h in [50, 10, 40, 30, 20, 60] {
            sketch.update(h);
        }
        assert_eq!(sketch.values().collect::<Vec<_>>(), vec![10, 20, 30]);
        assert_eq!(sketch.max_value(), 30);
    }

    #[test]
    fn test_repeated_hash_takes_one_slot() {
        let k = 5;
        let mut sketch = MinHash::new(k).unwrap();
        sketch.update(7);
        let after_first = sketch.clone();
        for _ in 0..k {
            sketch.update(7);
        }
        assert_eq!(sketch, after_first);
        assert_eq!(sketch.len(), 1);
    }

    #[test]
    fn test_duplicates_below_boundary_are_ignored() {
        let mut sketch = MinHash::new(2).unwrap();
        sketch.update(5);
        sketch.update(9);
        sketch.update(5);
        assert_eq!(sketch.values().collect::<Vec<_>>(), vec![5, 9]);
    }

    #[test]
    fn test_larger_values_rejected_when_full() {
        let mut sketch = MinHash::new(2).unwrap();
        sketch.update(1);
        sketch.update(2);
        sketch.update(3);
        sketch.update(MAX_HASH);
        assert_eq!(sketch.values().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test_case(0 => 0; "empty")]
    #[test_case(1 => 1; "single")]
    #[test_case(99 => 99; "below capacity is exact")]
    fn test_cardinality_below_capacity(n: usize) -> u64 {
        random_minhash(100, n, 1).cardinality()
    }

    #[test_case(100, 5_000; "k100 five thousand")]
    #[test_case(200, 10_000; "k200 ten thousand")]
    #[test_case(1_000, 100_000; "k1000 hundred thousand")]
    fn test_cardinality_within_error_bound(k: usize, n: usize) {
        let estimate = random_minhash(k, n, 42).cardinality() as f64;
        let relative_error = (estimate - n as f64).abs() / n as f64;
        // four standard errors of the k-th order statistic
        let tolerance = 4.0 / (k as f64).sqrt();
        assert!(relative_error < tolerance, "estimate = {estimate}, n = {n}");
    }

    #[test]
    fn test_cardinality_k100_averages_near_truth() {
        let n = 5_000;
        let estimates: Vec<f64> = (0..10)
            .map(|seed| random_minhash(100, n, seed).cardinality() as f64)
            .collect();
        let mean = estimates.iter().sum::<f64>() / estimates.len() as f64;
        assert!((mean - n as f64).abs() / (n as f64) < 0.2, "mean = {mean}");
    }

    #[test]
    fn test_zero_boundary_uses_fallback() {
        let mut sketch = MinHash::new(1).unwrap();
        sketch.update(0);
        assert_eq!(sketch.cardinality(), MAX_HASH / ZERO_MAX_FALLBACK);
    }

    #[test]
    fn test_merge_keeps_k_smallest_of_both() {
        let lhs = random_minhash(64, 2_000, 1);
        let rhs = random_minhash(64, 2_000, 2);
        let union = lhs.merge(&rhs).unwrap();

        let mut expected: Vec<u64> = lhs.values().chain(rhs.values()).collect();
        expected.sort_unstable();
        expected.dedup();
        expected.truncate(64);
        assert_eq!(union.values().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn test_merge_leaves_inputs_untouched() {
        let lhs = random_minhash(32, 500, 3);
        let rhs = random_minhash(32, 500, 4);
        let (lhs_before, rhs_before) = (lhs.clone(), rhs.clone());
        let _ = lhs.merge(&rhs).unwrap();
        assert_eq!(lhs, lhs_before);
        assert_eq!(rhs, rhs_before);
    }

    #[test]
    fn test_merge_with_self() {
        let sketch = random_minhash(32, 500, 5);
        assert_eq!(sketch.merge(&sketch).unwrap(), sketch);
    }

    #[test]
    fn test_merge_rejects_different_k() {
        let lhs = MinHash::new(10).unwrap();
        let rhs = MinHash::new(20).unwrap();
        assert!(matches!(
            lhs.merge(&rhs),
            Err(SketchError::IncompatibleSketches { .. })
        ));
        assert!(MinHash::jaccard(&lhs, &rhs).is_err());
    }

    #[test]
    fn test_jaccard_identical_is_one() {
        let sketch = random_minhash(128, 10_000, 6);
        assert_eq!(MinHash::jaccard(&sketch, &sketch.clone()).unwrap(), 1.0);
    }

    #[test]
    fn test_jaccard_empty() {
        let empty = MinHash::new(16).unwrap();
        let full = random_minhash(16, 100, 7);
        assert_eq!(MinHash::jaccard(&empty, &empty).unwrap(), 1.0);
        assert_eq!(MinHash::jaccard(&empty, &full).unwrap(), 0.0);
    }

    #[test]
    fn test_jaccard_disjoint_is_zero() {
        let mut lhs = MinHash::new(4).unwrap();
        let mut rhs = MinHash::new(4).unwrap();
        (0..4).for_each(|h| lhs.update(h));
        (4..8).for_each(|h| rhs.update(h));
        assert_eq!(MinHash::jaccard(&lhs, &rhs).unwrap(), 0.0);
    }

    #[test]
    fn test_jaccard_counts_set_overlap() {
        let mut lhs = MinHash::new(4).unwrap();
        let mut rhs = MinHash::new(4).unwrap();
        [1, 2, 3, 4].into_iter().for_each(|h| lhs.update(h));
        [3, 4, 5, 6].into_iter().for_each(|h| rhs.update(h));
        assert_eq!(MinHash::jaccard(&lhs, &rhs).unwrap(), 2.0 / 6.0);
    }

    #[test]
    fn test_jaccard_bounds() {
        for seed in 0..20 {
            let lhs = random_minhash(50, 200 + seed as usize * 10, seed);
            let rhs = random_minhash(50, 300, seed + 100);
            let j = MinHash::jaccard(&lhs, &rhs).unwrap();
            assert!((0.0..=1.0).contains(&j), "j = {j}");
        }
    }

    #[test]
    fn test_jaccard_of_overlapping_items() {
        let mut lhs = MinHash::new(256).unwrap();
        let mut rhs = MinHash::new(256).unwrap();
        for value in 0_u64..10_000 {
            lhs.insert(&value);
        }
        for value in 5_000_u64..15_000 {
            rhs.insert(&value);
        }
        // exact similarity is 1/3
        let j = MinHash::jaccard(&lhs, &rhs).unwrap();
        assert!(j > 0.2 && j < 0.45, "j = {j}");
    }
}
