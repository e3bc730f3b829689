//! ## Similarity estimation
//! Jaccard similarity `|A ∩ B| / |A ∪ B|` of two streams from their sketches.
//!
//! - HyperLogLog: inclusion-exclusion over estimated cardinalities,
//!   `J = max(|A| + |B| - |A ∪ B|, 0) / |A ∪ B|` with `|A ∪ B|` taken from the
//!   merged sketch. Estimator noise pushing `|A ∪ B|` above `|A| + |B|` gives 0.
//! - MinHash: overlap of the two retained hash sets, more stable at small
//!   cardinalities.
//!
//! Two empty sketches are considered identical.

use std::fmt::{Display, Formatter};

use crate::error::SketchError;
use crate::hyperloglog::HyperLogLog;
use crate::minhash::MinHash;
use crate::sketch::{Sketch, SketchKind, SketchTrait};

/// Sketches able to estimate Jaccard similarity against a sketch of the same type.
pub trait JaccardIndex {
    /// Returns the estimated Jaccard index in `[0, 1]`.
    fn jaccard_index(&self, other: &Self) -> Result<f64, SketchError>;
}

impl JaccardIndex for HyperLogLog {
    fn jaccard_index(&self, other: &Self) -> Result<f64, SketchError> {
        hll_jaccard(self, other)
    }
}

impl JaccardIndex for MinHash {
    fn jaccard_index(&self, other: &Self) -> Result<f64, SketchError> {
        minhash_jaccard(self, other)
    }
}

impl JaccardIndex for Sketch {
    fn jaccard_index(&self, other: &Self) -> Result<f64, SketchError> {
        self.jaccard(other)
    }
}

/// Return Jaccard estimate of two HyperLogLog sketches via inclusion-exclusion
pub fn hll_jaccard(lhs: &HyperLogLog, rhs: &HyperLogLog) -> Result<f64, SketchError> {
    let union = lhs.merge(rhs)?.cardinality();
    Ok(inclusion_exclusion(lhs.cardinality(), rhs.cardinality(), union))
}

/// Return Jaccard estimate of two MinHash sketches from their retained sets
#[inline]
pub fn minhash_jaccard(lhs: &MinHash, rhs: &MinHash) -> Result<f64, SketchError> {
    MinHash::jaccard(lhs, rhs)
}

/// Inclusion-exclusion Jaccard from cardinalities of `A`, `B` and `A ∪ B`
pub fn inclusion_exclusion(a: u64, b: u64, union: u64) -> f64 {
    if union == 0 {
        return 1.0;
    }
    let sum = a.saturating_add(b);
    if union > sum {
        return 0.0;
    }
    ((sum - union) as f64 / union as f64).clamp(0.0, 1.0)
}

/// Pairwise comparison of two sketches
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Comparison {
    pub kind: SketchKind,
    pub cardinality_a: u64,
    pub cardinality_b: u64,
    pub cardinality_union: u64,
    pub jaccard: f64,
}

/// Compare two sketches of the same kind and configuration
pub fn compare(a: &Sketch, b: &Sketch) -> Result<Comparison, SketchError> {
    let union = a.merge(b)?;
    Ok(Comparison {
        kind: a.kind(),
        cardinality_a: a.estimate(),
        cardinality_b: b.estimate(),
        cardinality_union: union.estimate(),
        jaccard: a.jaccard(b)?,
    })
}

impl Display for Comparison {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Estimated values based on {} sketches ...", self.kind)?;
        writeln!(
            f,
            "{:>10}{:>10}{:>15}{:>10}",
            "|SET(A)|", "|SET(B)|", "|SET(AUB)|", "J(A,B)"
        )?;
        write!(
            f,
            "{:>10}{:>10}{:>15}{:>10.4}",
            self.cardinality_a, self.cardinality_b, self.cardinality_union, self.jaccard
        )
    }
}
