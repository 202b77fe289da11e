use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A multiplicative hash over byte strings with randomly drawn coefficients.
///
/// The coefficients are drawn once, at construction, and are immutable for
/// the hasher's lifetime: a `MulHash` instance is pure and deterministic,
/// while two different instances almost surely disagree on every input.
/// Hashing folds each input byte into a 64-bit accumulator Horner-style with
/// wrapping arithmetic and returns the low 32 bits.
///
/// This is a speed-oriented heuristic hash, not a cryptographic one; the
/// sketches built on top of it assume reasonable mixing but never verify it.
///
/// # Examples
///
/// ```
/// use streamcount::MulHash;
///
/// let hasher = MulHash::with_seed(7);
///
/// assert_eq!(hasher.hash("daffodil"), hasher.hash("daffodil"));
/// ```
#[derive(Clone, Debug)]
pub struct MulHash {
    multiplier: u64,
    additive:   u64,
}

impl MulHash {
    /// Creates a new MulHash with coefficients drawn from the process
    /// entropy source.
    pub fn new() -> MulHash {
        Self::from_rng(&mut rand::thread_rng())
    }

    /// Creates a new MulHash with coefficients drawn from a seeded
    /// generator, for reproducible runs.
    pub fn with_seed(seed: u64) -> MulHash {
        Self::from_rng(&mut StdRng::seed_from_u64(seed))
    }

    fn from_rng<R: Rng>(rng: &mut R) -> MulHash {
        MulHash {
            // An even multiplier would throw away low hash bits on every
            // step; force it odd (and thus nonzero).
            multiplier: rng.gen::<u64>() | 1,
            additive:   rng.gen::<u64>(),
        }
    }

    /// Hashes `value` into a 32-bit integer.
    ///
    /// The empty string hashes to the low 32 bits of the additive
    /// coefficient.
    #[inline]
    pub fn hash<V>(&self, value: &V) -> u32
    where
        V: AsRef<[u8]> + ?Sized,
    {
        let mut acc = self.additive;

        for &byte in value.as_ref() {
            acc = acc
                .wrapping_mul(self.multiplier)
                .wrapping_add(u64::from(byte));
        }

        acc as u32
    }
}

impl Default for MulHash {
    fn default() -> Self {
        Self::new()
    }
}
