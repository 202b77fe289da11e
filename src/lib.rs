//! Cardinality sketches for estimating the number of distinct strings in a
//! stream using bounded memory.
//!
//! HyperLogLog is a probabilistic algorithm for estimating the number of
//! *distinct* elements (*cardinality*) of a multiset, described by
//! P. Flajolet et al. in *HyperLogLog: the analysis of a near-optimal
//! cardinality estimation algorithm*. This crate provides the dense register
//! array variant and a hybrid variant in the spirit of HyperLogLog++ that
//! starts out with a sparse register map and switches to the dense array once
//! the map stops being the more compact representation.
//!
//! Every sketch owns a [`MulHash`], a multiplicative string hash whose
//! coefficients are drawn once at construction. Two sketches therefore never
//! agree on where an item lands and cannot be meaningfully combined; no merge
//! operation is provided. Hashes are 32 bits wide, which keeps the sketches
//! faithful to their correction thresholds but caps the usable range: as the
//! distinct count approaches 2<sup>32</sup> the saturation correction
//! dominates and accuracy degrades.
//!
//! All sketch variants implement the [`CardinalitySketch`] trait.
//!
//! Current implementations:
//!
//! * [`HyperLogLog`]
//! * [`HyperLogLogPlus`]
//!
//! ```
//! use streamcount::{CardinalitySketch, HyperLogLog, MulHash};
//!
//! let mut hll: HyperLogLog<str> = HyperLogLog::new(12, MulHash::new()).unwrap();
//!
//! hll.add("amaranth");
//! hll.add("amaranth");
//!
//! assert_eq!(hll.estimate().trunc() as u32, 1);
//! ```
//!
//! Sketches cannot be merged; the following does not compile:
//!
//! ```compile_fail
//! use streamcount::{CardinalitySketch, HyperLogLog, MulHash};
//!
//! let mut a: HyperLogLog<str> = HyperLogLog::new(12, MulHash::new()).unwrap();
//! let b: HyperLogLog<str> = HyperLogLog::new(12, MulHash::new()).unwrap();
//!
//! a.merge(&b);
//! ```

#![cfg_attr(feature = "bench-units", feature(test))]

use std::fmt;

mod common;
mod hashing;
mod hyperloglog;
mod hyperloglogplus;

pub use crate::hashing::MulHash;
pub use crate::hyperloglog::HyperLogLog;
pub use crate::hyperloglogplus::HyperLogLogPlus;

/// A trait implemented by all cardinality sketch variants.
///
/// Items only need to be viewable as bytes, so `str`, `String`, `[u8]` and
/// friends all work.
pub trait CardinalitySketch<V: AsRef<[u8]> + ?Sized> {
    /// Adds a new value to the multiset.
    fn add(&mut self, value: &V);
    /// Estimates the cardinality of the multiset.
    fn estimate(&self) -> f64;
    /// Returns the sketch's current size in abstract memory units.
    fn memory_used(&self) -> usize;
    /// Clears accumulated statistics, keeping the hash function.
    fn reset(&mut self);
}

#[derive(Debug, PartialEq)]
pub enum SketchError {
    InvalidPrecision,
}

impl fmt::Display for SketchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SketchError::InvalidPrecision => {
                "precision is out of bounds.".fmt(f)
            },
        }
    }
}
