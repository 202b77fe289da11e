use core::marker::PhantomData;

use crate::common::*;
use crate::CardinalitySketch;
use crate::MulHash;
use crate::SketchError;

/// Implements the original HyperLogLog algorithm for cardinality estimation.
///
/// This implementation is based on the original paper of P. Flajolet et al:
///
/// *HyperLogLog: the analysis of a near-optimal cardinality estimation
/// algorithm.*
///
/// - Uses 6-bit registers, packed in a 32-bit unsigned integer.
/// - Owns a [`MulHash`] instance, fixed at construction; the hash is 32 bits
///   wide, so estimates saturate as the distinct count approaches
///   2<sup>32</sup>.
/// - Supports in-place reuse through [`CardinalitySketch::reset`], which
///   keeps the hash function so repeated experiments hash consistently.
///
/// # Examples
///
/// ```
/// use streamcount::{CardinalitySketch, HyperLogLog, MulHash};
///
/// let mut hll: HyperLogLog<str> = HyperLogLog::new(10, MulHash::new()).unwrap();
///
/// hll.add("first");
/// hll.add("first");
///
/// assert_eq!(hll.estimate().trunc() as u32, 1);
/// assert_eq!(hll.memory_used(), 1024);
/// ```
///
/// # References
///
/// - ["HyperLogLog: the analysis of a near-optimal cardinality estimation
///   algorithm", Philippe Flajolet, Éric Fusy, Olivier Gandouet and Frédéric
///   Meunier.](http://algo.inria.fr/flajolet/Publications/FlFuGaMe07.pdf)
///
#[derive(Clone, Debug)]
pub struct HyperLogLog<V>
where
    V: AsRef<[u8]> + ?Sized,
{
    hasher:    MulHash,
    count:     usize,
    precision: u8,
    registers: Registers,
    phantom:   PhantomData<V>,
}

impl<V> HyperLogLog<V>
where
    V: AsRef<[u8]> + ?Sized,
{
    // Minimum precision allowed.
    const MIN_PRECISION: u8 = 4;
    // Maximum precision allowed.
    const MAX_PRECISION: u8 = 16;

    /// Creates a new HyperLogLog instance.
    pub fn new(precision: u8, hasher: MulHash) -> Result<Self, SketchError> {
        // Ensure the specified precision is within bounds.
        if precision < Self::MIN_PRECISION || precision > Self::MAX_PRECISION {
            return Err(SketchError::InvalidPrecision);
        }

        // Calculate register count based on given precision.
        let count = Self::register_count(precision);

        Ok(HyperLogLog {
            hasher:    hasher,
            count:     count,
            precision: precision,
            registers: Registers::with_count(count),
            phantom:   PhantomData,
        })
    }

    #[cfg(test)] // Returns the number of registers still at zero.
    fn zeros(&self) -> usize {
        self.registers.zeros()
    }
}

impl<V> SketchCommon for HyperLogLog<V> where V: AsRef<[u8]> + ?Sized {
}

impl<V> CardinalitySketch<V> for HyperLogLog<V>
where
    V: AsRef<[u8]> + ?Sized,
{
    /// Adds a new value to the multiset.
    fn add(&mut self, value: &V) {
        // Calculate the hash.
        let hash = self.hasher.hash(value);

        // Calculate the register's index and the rank of the remaining bits.
        let (index, rank) = Self::split_hash(hash, self.precision);

        // Update the register with the max rank.
        self.registers.set_greater(index, rank);
    }

    /// Estimates the cardinality of the multiset.
    fn estimate(&self) -> f64 {
        // Calculate the raw estimate.
        let raw = Self::raw_estimate(self.registers.iter(), self.count);

        // Apply corrections if required.
        Self::correct_estimate(raw, self.count, self.registers.zeros())
    }

    /// Returns the sketch's size, one abstract unit per register.
    fn memory_used(&self) -> usize {
        self.count
    }

    /// Zeroes all registers; the hash function is retained unchanged.
    fn reset(&mut self) {
        self.registers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Recomputes a sketch's register target for `value`, from the public
    // hash alone.
    fn placement(hasher: &MulHash, precision: u8, value: &str) -> (usize, u32) {
        struct Probe;

        impl SketchCommon for Probe {
        }

        Probe::split_hash(hasher.hash(value), precision)
    }

    #[test]
    fn test_invalid_precision() {
        for precision in &[0u8, 1, 2, 3, 17, 32, 255] {
            let result: Result<HyperLogLog<str>, _> =
                HyperLogLog::new(*precision, MulHash::with_seed(1));

            assert_eq!(result.err(), Some(SketchError::InvalidPrecision));
        }

        for precision in 4u8..=16 {
            assert!(
                HyperLogLog::<str>::new(precision, MulHash::with_seed(1))
                    .is_ok()
            );
        }
    }

    #[test]
    fn test_add() {
        let hasher = MulHash::with_seed(42);

        let mut hll: HyperLogLog<str> =
            HyperLogLog::new(10, hasher.clone()).unwrap();

        for value in &["a", "b", "c", "stream", ""] {
            hll.add(value);

            let (index, rank) = placement(&hasher, 10, value);

            assert!(index < 1024);
            assert!(rank >= 1 && rank <= 32);
            assert!(hll.registers.get(index) >= rank);
        }
    }

    #[test]
    fn test_add_idempotent() {
        let mut hll: HyperLogLog<str> =
            HyperLogLog::new(8, MulHash::with_seed(3)).unwrap();

        hll.add("larkspur");
        hll.add("verbena");

        let estimate = hll.estimate();

        for _ in 0..100 {
            hll.add("larkspur");
            hll.add("verbena");
        }

        assert_eq!(hll.estimate(), estimate);
    }

    #[test]
    fn test_empty_estimate() {
        let hll: HyperLogLog<str> =
            HyperLogLog::new(12, MulHash::with_seed(17)).unwrap();

        assert_eq!(hll.estimate(), 0.0);
    }

    #[test]
    fn test_linear_counting_closed_form() {
        // Five distinct items at b = 4 keep the raw estimate below 2.5 * m,
        // so the result must match linear counting exactly.
        let hasher = MulHash::with_seed(1234);

        let mut hll: HyperLogLog<str> =
            HyperLogLog::new(4, hasher.clone()).unwrap();

        let values = ["a", "b", "c", "d", "e"];

        for value in &values {
            hll.add(value);
        }

        let zeros = hll.zeros();

        assert!(zeros > 0);

        let expected = 16.0 * (16.0 / zeros as f64).ln();

        assert!((hll.estimate() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_reset() {
        let mut hll: HyperLogLog<str> =
            HyperLogLog::new(6, MulHash::with_seed(8)).unwrap();

        assert_eq!(hll.memory_used(), 64);

        for i in 0..100 {
            hll.add(&format!("item-{}", i));
        }

        assert!(hll.estimate() > 0.0);

        hll.reset();

        assert_eq!(hll.estimate(), 0.0);
        assert_eq!(hll.memory_used(), 64);
        assert_eq!(hll.zeros(), 64);

        // The hash function survives a reset, so refilling with the same
        // stream rebuilds the same registers.
        hll.add("wisteria");

        let estimate = hll.estimate();

        hll.reset();
        hll.add("wisteria");

        assert_eq!(hll.estimate(), estimate);
    }

    #[test]
    fn test_estimate_accuracy() {
        // With m = 1024 the theoretical standard error is about 3.25%;
        // allow a generous multiple of it per independent seed.
        let distinct = 10_000usize;

        let mut errors = Vec::new();

        for seed in 0u64..8 {
            let mut hll: HyperLogLog<str> =
                HyperLogLog::new(10, MulHash::with_seed(seed)).unwrap();

            for i in 0..distinct {
                // Feed every item twice, duplicates must not matter.
                let value = format!("{:08x}-{}", i * 2654435761, i);

                hll.add(&value);
                hll.add(&value);
            }

            let error =
                (hll.estimate() - distinct as f64).abs() / distinct as f64;

            assert!(error < 0.2, "seed {} relative error {}", seed, error);

            errors.push(error);
        }

        let mean = errors.iter().sum::<f64>() / errors.len() as f64;

        assert!(mean < 0.1, "mean relative error {}", mean);
    }

    #[cfg(feature = "bench-units")]
    mod benches {
        extern crate test;

        use super::*;
        use test::{black_box, Bencher};

        #[bench]
        fn bench_add(b: &mut Bencher) {
            let mut hll: HyperLogLog<String> =
                HyperLogLog::new(16, MulHash::with_seed(1)).unwrap();

            let workload: Vec<String> =
                (0..1000).map(|i| format!("item-{}", i)).collect();

            b.iter(|| {
                for val in &workload {
                    hll.add(val);
                }
            })
        }

        #[bench]
        fn bench_estimate(b: &mut Bencher) {
            let mut hll: HyperLogLog<String> =
                HyperLogLog::new(16, MulHash::with_seed(1)).unwrap();

            for i in 0..10000 {
                hll.add(&format!("item-{}", i));
            }

            b.iter(|| {
                let estimate = hll.estimate();
                black_box(estimate);
            })
        }
    }
}
