use std::collections::BTreeMap;
use std::marker::PhantomData;

use crate::common::*;
use crate::CardinalitySketch;
use crate::MulHash;
use crate::SketchError;

// Bytes-per-entry proxy for the sparse map: a packed index plus rank.
const SPARSE_ENTRY_UNITS: usize = 3;

/// Implements a hybrid sparse/dense HyperLogLog for cardinality estimation.
///
/// This implementation follows the storage strategy of the paper:
///
/// *HyperLogLog in Practice: Algorithmic Engineering of a State of The Art
/// Cardinality Estimation Algorithm.*
///
/// The sketch starts in a sparse representation, a map holding only the
/// registers touched so far. Once the map grows past a quarter of the
/// register count it is promoted, irreversibly, into the dense register
/// array of [`HyperLogLog`], whose estimation math the dense phase shares.
/// While sparse, estimation prefers linear counting over a wider range
/// (`5 * m`) and skips the large range correction, which cannot be relevant
/// at sparse cardinalities.
///
/// [`HyperLogLog`]: crate::HyperLogLog
///
/// # Examples
///
/// ```
/// use streamcount::{CardinalitySketch, HyperLogLogPlus, MulHash};
///
/// let mut hllp: HyperLogLogPlus<str> =
///     HyperLogLogPlus::new(14, MulHash::new()).unwrap();
///
/// hllp.add("first");
/// hllp.add("first");
///
/// // One touched register, three abstract units per sparse entry.
/// assert_eq!(hllp.memory_used(), 3);
///
/// hllp.reset();
///
/// assert_eq!(hllp.estimate(), 0.0);
/// ```
///
#[derive(Clone, Debug)]
pub struct HyperLogLogPlus<V>
where
    V: AsRef<[u8]> + ?Sized,
{
    hasher:    MulHash,
    count:     usize,
    precision: u8,
    storage:   Storage,
    phantom:   PhantomData<V>,
}

// The two representations of the register set.
//
// The variant makes the one-way sparse-to-dense transition explicit: there
// is no state where both a map and a register array are live.
#[derive(Clone, Debug)]
enum Storage {
    // Touched registers only, index to rank.
    Sparse(BTreeMap<u16, u8>),
    // The full register array.
    Dense(Registers),
}

impl<V> HyperLogLogPlus<V>
where
    V: AsRef<[u8]> + ?Sized,
{
    // Minimum precision allowed.
    const MIN_PRECISION: u8 = 4;
    // Maximum precision allowed.
    const MAX_PRECISION: u8 = 16;

    /// Creates a new HyperLogLogPlus instance.
    pub fn new(precision: u8, hasher: MulHash) -> Result<Self, SketchError> {
        // Ensure the specified precision is within bounds.
        if precision < Self::MIN_PRECISION || precision > Self::MAX_PRECISION {
            return Err(SketchError::InvalidPrecision);
        }

        let count = Self::register_count(precision);

        Ok(HyperLogLogPlus {
            hasher:    hasher,
            count:     count,
            precision: precision,
            storage:   Storage::Sparse(BTreeMap::new()),
            phantom:   PhantomData,
        })
    }

    /// Returns true while the sketch holds the sparse representation.
    pub fn is_sparse(&self) -> bool {
        match self.storage {
            Storage::Sparse(_) => true,
            Storage::Dense(_) => false,
        }
    }

    // Builds the dense register array from the sparse map and swaps it in.
    //
    // Only ever called while sparse; the transition never runs backwards
    // outside of `reset`.
    fn promote(&mut self) {
        if let Storage::Sparse(map) = &mut self.storage {
            let entries = std::mem::take(map);

            let mut registers = Registers::with_count(self.count);

            for (index, rank) in entries {
                registers.set_greater(index as usize, u32::from(rank));
            }

            self.storage = Storage::Dense(registers);
        }
    }
}

impl<V> SketchCommon for HyperLogLogPlus<V> where V: AsRef<[u8]> + ?Sized {
}

impl<V> CardinalitySketch<V> for HyperLogLogPlus<V>
where
    V: AsRef<[u8]> + ?Sized,
{
    /// Adds a new value to the multiset.
    fn add(&mut self, value: &V) {
        // Calculate the hash.
        let hash = self.hasher.hash(value);

        // Calculate the register's index and the rank of the remaining bits.
        let (index, rank) = Self::split_hash(hash, self.precision);

        let promote = match &mut self.storage {
            Storage::Sparse(map) => {
                // Upsert the register's rank into the map.
                let entry = map.entry(index as u16).or_insert(0);

                if rank as u8 > *entry {
                    *entry = rank as u8;
                }

                // Past a quarter of the register count the map is no longer
                // the more compact representation.
                map.len() * 4 > self.count
            },
            Storage::Dense(registers) => {
                // Update the register with the max rank.
                registers.set_greater(index, rank);

                false
            },
        };

        if promote {
            self.promote();
        }
    }

    /// Estimates the cardinality of the multiset.
    fn estimate(&self) -> f64 {
        match &self.storage {
            Storage::Sparse(map) => {
                if map.is_empty() {
                    return 0.0;
                }

                // Calculate the raw estimate over the touched registers.
                let raw = Self::raw_estimate(
                    map.values().map(|&rank| u32::from(rank)),
                    self.count,
                );

                let zeros = self.count - map.len();

                // Sparse cardinalities sit well inside the linear counting
                // regime, so prefer it over a wider range; the large range
                // correction cannot be relevant here.
                if raw <= 5.0 * self.count as f64 && zeros != 0 {
                    Self::linear_count(self.count, zeros)
                } else {
                    raw
                }
            },
            Storage::Dense(registers) => {
                // Calculate the raw estimate.
                let raw = Self::raw_estimate(registers.iter(), self.count);

                // Apply corrections if required.
                Self::correct_estimate(raw, self.count, registers.zeros())
            },
        }
    }

    /// Returns the sketch's size in abstract units: three per sparse entry,
    /// or one per register once dense.
    fn memory_used(&self) -> usize {
        match &self.storage {
            Storage::Sparse(map) => SPARSE_ENTRY_UNITS * map.len(),
            Storage::Dense(_) => self.count,
        }
    }

    /// Returns to an empty sparse representation regardless of the current
    /// mode; the hash function is retained unchanged.
    fn reset(&mut self) {
        self.storage = Storage::Sparse(BTreeMap::new());
    }
}
