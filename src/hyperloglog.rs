//! ## HyperLogLog sketch
//! Estimates cardinality of large streams with `M = 2^P` registers of
//! `W = ceil(log2(64)) = 6` bits each, packed into a [`RegisterStore`].
//!
//! [HyperLogLog paper](http://algo.inria.fr/flajolet/Publications/FlFuGaMe07.pdf)
//!
//! Hash split for `P` prefix bits:
//! - 0..P bits     - (most significant) register index.
//! - P..64 bits    - rank source: 1 + number of leading zeros, saturating at `64 - P + 1`.
//!
//! Estimate:
//! - raw `E = alpha(M) * M^2 / sum(2^-register)`.
//! - small range: `E <= 2.5 * M` with `V > 0` zero registers gives linear counting `M * ln(M / V)`.
//! - large range: `E > 2^32 / 30` gives `-2^32 * ln(1 - E / 2^32)`, which grows
//!   without bound as `E` approaches `2^32`; `E >= 2^32` saturates to `u64::MAX`.
//!
//! Expected error is `1.04 / sqrt(M)`, e.g. P = 14: 0.81%.

use std::fmt::{Debug, Formatter};
use std::hash::Hash;
use std::mem::size_of;

use tracing::trace;

use crate::error::SketchError;
use crate::hash::HashOracle;
use crate::registers::RegisterStore;

/// Number of bits in hash values
const HASH_BITS: u32 = u64::BITS;
/// Register width able to hold any rank of a 64-bit hash
pub const REGISTER_WIDTH: usize = 6;
/// Smallest supported number of prefix bits (largest rank `64 - 2 + 1` still fits in 6 bits)
pub const MIN_PREFIX_BITS: u8 = 2;
/// Largest supported number of prefix bits
pub const MAX_PREFIX_BITS: u8 = 24;
/// `2^32`, the range boundary of the large-range correction
const TWO_POW_32: f64 = 4_294_967_296.0;

#[derive(Clone, PartialEq, Eq)]
pub struct HyperLogLog {
    /// Number of hash bits used to pick a register
    prefix_bits: u8,
    /// Packed 6-bit registers
    registers: RegisterStore<REGISTER_WIDTH>,
}

impl HyperLogLog {
    /// Create new empty `HyperLogLog` with `2^prefix_bits` registers
    pub fn new(prefix_bits: u8) -> Result<Self, SketchError> {
        if !(MIN_PREFIX_BITS..=MAX_PREFIX_BITS).contains(&prefix_bits) {
            return Err(SketchError::InvalidParameter(
                "prefix_bits must be in [2..24] range",
            ));
        }
        Ok(Self {
            prefix_bits,
            registers: RegisterStore::new(1 << prefix_bits),
        })
    }

    /// Return number of prefix bits
    #[inline]
    pub fn prefix_bits(&self) -> u8 {
        self.prefix_bits
    }

    /// Return number of registers
    #[inline]
    pub fn register_count(&self) -> usize {
        self.registers.len()
    }

    /// Return value of `idx` register
    #[inline]
    pub fn register(&self, idx: usize) -> u8 {
        self.registers.get(idx)
    }

    /// Return number of registers still set to zero
    pub fn zero_registers(&self) -> usize {
        self.registers.iter().filter(|&r| r == 0).count()
    }

    /// Return whether no hash has been observed
    pub fn is_empty(&self) -> bool {
        self.registers.as_bytes().iter().all(|&b| b == 0)
    }

    /// Insert a hashable item
    #[inline]
    pub fn insert<T: Hash + ?Sized>(&mut self, item: &T) {
        self.update(HashOracle::hash_item(item));
    }

    /// Update sketch with a hash value
    #[inline]
    pub fn update(&mut self, hash: u64) {
        let (idx, rank) = self.decode_hash(hash);
        if rank > self.registers.get(idx) {
            self.registers.replace(idx, rank);
        }
    }

    /// Return register index and rank of `hash`
    #[inline]
    fn decode_hash(&self, hash: u64) -> (usize, u8) {
        let p = u32::from(self.prefix_bits);
        let idx = (hash >> (HASH_BITS - p)) as usize;
        let remaining = hash << p;
        let max_rank = HASH_BITS - p + 1;
        let rank = (remaining.leading_zeros() + 1).min(max_rank);
        // `max_rank <= 63` for supported prefix bits
        (idx, rank as u8)
    }

    /// Return cardinality estimate
    ///
    /// Both range corrections use the natural logarithm; a base-2 logarithm
    /// overestimates small cardinalities by `1 / ln 2`. Raw estimates at or
    /// above `2^32` saturate to `u64::MAX`, the limit of the large-range
    /// correction, so the estimate does not drop past that boundary.
    pub fn cardinality(&self) -> u64 {
        let m = self.register_count() as f64;
        let mut z = 0.0;
        let mut zeros = 0usize;
        for rank in self.registers.iter() {
            if rank == 0 {
                zeros += 1;
            }
            z += 0.5f64.powi(i32::from(rank));
        }

        let mut estimate = alpha(self.register_count()) * m * m / z;

        if estimate <= 2.5 * m && zeros > 0 {
            estimate = m * (m / zeros as f64).ln();
        }
        if estimate >= TWO_POW_32 {
            trace!(estimate, "raw estimate beyond 32-bit range, saturating");
            return u64::MAX;
        }
        if estimate > TWO_POW_32 / 30.0 {
            estimate = -TWO_POW_32 * (1.0 - estimate / TWO_POW_32).ln();
        }

        if !estimate.is_finite() || estimate < 0.0 {
            trace!(estimate, "degenerate estimate floored to zero");
            return 0;
        }
        estimate as u64
    }

    /// Return union of two sketches: register-wise maximum
    pub fn merge(&self, rhs: &HyperLogLog) -> Result<HyperLogLog, SketchError> {
        if self.prefix_bits != rhs.prefix_bits {
            return Err(SketchError::IncompatibleSketches {
                lhs: format!("HyperLogLog(prefix_bits = {})", self.prefix_bits),
                rhs: format!("HyperLogLog(prefix_bits = {})", rhs.prefix_bits),
            });
        }

        let mut union = HyperLogLog::new(self.prefix_bits)?;
        for idx in 0..self.register_count() {
            let rank = self.registers.get(idx).max(rhs.registers.get(idx));
            if rank > 0 {
                union.registers.set(idx, rank);
            }
        }
        Ok(union)
    }

    /// Return memory size of `HyperLogLog`
    pub fn size_of(&self) -> usize {
        size_of::<u8>() + self.registers.size_of()
    }
}

impl Debug for HyperLogLog {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ prefix_bits: {}, estimate: {}, size: {} }}",
            self.prefix_bits,
            self.cardinality(),
            self.size_of()
        )
    }
}

/// Parameter for bias correction
#[inline]
fn alpha(m: usize) -> f64 {
    match m {
        0..=16 => 0.673,
        32 => 0.697,
        64 => 0.709,
        _ => 0.7213 / (1.0 + 1.079 / (m as f64)),
    }
}
