//! ## Hash oracle
//! Turns 64-bit tokens into well-distributed 64-bit hash values.
//!
//! Tokens are produced outside of the sketches, either by an external extractor
//! (e.g. 2-bit encoded k-mers) or by [`HashOracle::token_of`], which hashes any
//! `Hash` item with `WyHash`. Every token then goes through the MurmurHash3
//! 64-bit finalizer before reaching a sketch, so both sketch kinds observe the
//! same hash for the same token.

use std::hash::{BuildHasher, BuildHasherDefault, Hash};

use wyhash::WyHash;

/// Deterministic, stateless token mixer shared by all sketches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HashOracle;

impl HashOracle {
    /// Return hash value of encoded `token`
    #[inline]
    pub fn hash(token: u64) -> u64 {
        murmur3_fmix64(token)
    }

    /// Return token of a hashable item (zero-seeded `WyHash`)
    #[inline]
    pub fn token_of<T: Hash + ?Sized>(item: &T) -> u64 {
        BuildHasherDefault::<WyHash>::default().hash_one(item)
    }

    /// Return hash value of a hashable item, i.e. `hash(token_of(item))`
    #[inline]
    pub fn hash_item<T: Hash + ?Sized>(item: &T) -> u64 {
        Self::hash(Self::token_of(item))
    }
}

/// MurmurHash3 64-bit finalizer (`fmix64`).
#[inline]
pub fn murmur3_fmix64(mut k: u64) -> u64 {
    k ^= k >> 33;
    k = k.wrapping_mul(0xff51_afd7_ed55_8ccd);
    k ^= k >> 33;
    k = k.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    k ^= k >> 33;
    k
}
