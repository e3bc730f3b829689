//! ## Sketch dispatch
//! Common interface over the two sketch kinds, so windows and references can be
//! built from one [`SketchConfig`] and compared without caring which kind backs
//! them. Combining sketches of different kinds or parameters fails fast with
//! [`SketchError::IncompatibleSketches`].

use std::fmt::{Display, Formatter};
use std::hash::Hash;

use enum_dispatch::enum_dispatch;

use crate::error::SketchError;
use crate::hash::HashOracle;
use crate::hyperloglog::HyperLogLog;
use crate::minhash::MinHash;
use crate::similarity::hll_jaccard;

/// Sketch types supported by the harness
#[derive(Debug, Clone, PartialEq, Eq)]
#[enum_dispatch]
pub enum Sketch {
    HyperLogLog(HyperLogLog),
    MinHash(MinHash),
}

/// Operations shared by all sketch types.
#[enum_dispatch(Sketch)]
pub trait SketchTrait {
    fn insert_hash(&mut self, hash: u64);
    fn estimate(&self) -> u64;
    fn is_empty(&self) -> bool;
    fn size_of(&self) -> usize;
}

impl SketchTrait for HyperLogLog {
    #[inline]
    fn insert_hash(&mut self, hash: u64) {
        self.update(hash);
    }

    #[inline]
    fn estimate(&self) -> u64 {
        self.cardinality()
    }

    fn is_empty(&self) -> bool {
        HyperLogLog::is_empty(self)
    }

    fn size_of(&self) -> usize {
        HyperLogLog::size_of(self)
    }
}

impl SketchTrait for MinHash {
    #[inline]
    fn insert_hash(&mut self, hash: u64) {
        self.update(hash);
    }

    #[inline]
    fn estimate(&self) -> u64 {
        self.cardinality()
    }

    fn is_empty(&self) -> bool {
        MinHash::is_empty(self)
    }

    fn size_of(&self) -> usize {
        MinHash::size_of(self)
    }
}

/// Kind of a [`Sketch`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SketchKind {
    HyperLogLog,
    MinHash,
}

impl Display for SketchKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SketchKind::HyperLogLog => f.write_str("HyperLogLog"),
            SketchKind::MinHash => f.write_str("MinHash"),
        }
    }
}

impl Sketch {
    /// Return kind of the sketch
    pub fn kind(&self) -> SketchKind {
        match self {
            Sketch::HyperLogLog(_) => SketchKind::HyperLogLog,
            Sketch::MinHash(_) => SketchKind::MinHash,
        }
    }

    /// Return configuration the sketch was created with
    pub fn config(&self) -> SketchConfig {
        match self {
            Sketch::HyperLogLog(hll) => SketchConfig::HyperLogLog {
                prefix_bits: hll.prefix_bits(),
            },
            Sketch::MinHash(mh) => SketchConfig::MinHash { k: mh.capacity() },
        }
    }

    /// Insert a hashable item
    #[inline]
    pub fn insert<T: Hash + ?Sized>(&mut self, item: &T) {
        self.insert_hash(HashOracle::hash_item(item));
    }

    /// Return union of two sketches of the same kind and configuration
    pub fn merge(&self, rhs: &Sketch) -> Result<Sketch, SketchError> {
        match (self, rhs) {
            (Sketch::HyperLogLog(lhs), Sketch::HyperLogLog(rhs)) => Ok(lhs.merge(rhs)?.into()),
            (Sketch::MinHash(lhs), Sketch::MinHash(rhs)) => Ok(lhs.merge(rhs)?.into()),
            _ => Err(self.incompatible(rhs)),
        }
    }

    /// Return estimated Jaccard similarity of two sketches of the same kind
    ///
    /// HyperLogLog uses inclusion-exclusion over estimated cardinalities,
    /// MinHash the overlap of the retained hash sets.
    pub fn jaccard(&self, rhs: &Sketch) -> Result<f64, SketchError> {
        match (self, rhs) {
            (Sketch::HyperLogLog(lhs), Sketch::HyperLogLog(rhs)) => hll_jaccard(lhs, rhs),
            (Sketch::MinHash(lhs), Sketch::MinHash(rhs)) => MinHash::jaccard(lhs, rhs),
            _ => Err(self.incompatible(rhs)),
        }
    }

    fn incompatible(&self, rhs: &Sketch) -> SketchError {
        SketchError::IncompatibleSketches {
            lhs: self.config().to_string(),
            rhs: rhs.config().to_string(),
        }
    }
}

/// Sketch kind and size used to build new sketches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SketchConfig {
    HyperLogLog { prefix_bits: u8 },
    MinHash { k: usize },
}

impl Default for SketchConfig {
    fn default() -> Self {
        SketchConfig::MinHash { k: 200 }
    }
}

impl SketchConfig {
    /// Return kind of sketches built from this configuration
    pub fn kind(&self) -> SketchKind {
        match self {
            SketchConfig::HyperLogLog { .. } => SketchKind::HyperLogLog,
            SketchConfig::MinHash { .. } => SketchKind::MinHash,
        }
    }

    /// Create new empty sketch
    pub fn build(&self) -> Result<Sketch, SketchError> {
        Ok(match *self {
            SketchConfig::HyperLogLog { prefix_bits } => HyperLogLog::new(prefix_bits)?.into(),
            SketchConfig::MinHash { k } => MinHash::new(k)?.into(),
        })
    }

    /// Create new sketch over raw records, each record hashed as a whole
    pub fn build_from_records<I, T>(&self, records: I) -> Result<Sketch, SketchError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let mut sketch = self.build()?;
        for record in records {
            sketch.insert(record.as_ref());
        }
        Ok(sketch)
    }

    /// Create new sketch over pre-encoded tokens
    pub fn build_from_tokens<I>(&self, tokens: I) -> Result<Sketch, SketchError>
    where
        I: IntoIterator<Item = u64>,
    {
        let mut sketch = self.build()?;
        for token in tokens {
            sketch.insert_hash(HashOracle::hash(token));
        }
        Ok(sketch)
    }
}

impl Display for SketchConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SketchConfig::HyperLogLog { prefix_bits } => {
                write!(f, "HyperLogLog(prefix_bits = {prefix_bits})")
            }
            SketchConfig::MinHash { k } => write!(f, "MinHash(k = {k})"),
        }
    }
}
