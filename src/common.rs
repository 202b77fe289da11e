// A register array backing the dense representation.
//
// Contains a `count` of fixed size 6-bit registers packed into `u32`
// integers. Six bits fit the largest storable rank (32, from the all-zero
// remainder tie-break).
#[derive(Clone, Debug)]
pub struct Registers {
    // A buffer containing registers.
    buf:   Vec<u32>,
    // The number of registers stored in buf.
    count: usize,
    // The number of registers set to zero.
    zeros: usize,
}

impl Registers {
    // The register's size (in bits).
    pub const SIZE: usize = 6;
    // The number of registers that fit in a 32-bit integer.
    const COUNT_PER_WORD: usize = 32 / Self::SIZE;
    // A mask to get the lower register (from LSB).
    const MASK: u32 = (1 << Self::SIZE) - 1;

    // Creates a new Registers struct with capacity `count` registers.
    pub fn with_count(count: usize) -> Registers {
        Registers {
            buf:   vec![0; ceil(count, Self::COUNT_PER_WORD)],
            count: count,
            zeros: count,
        }
    }

    #[inline] // Returns an iterator that emits Register values.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.buf
            .iter()
            .flat_map(|val| {
                (0..Self::COUNT_PER_WORD)
                    .map(move |i| (val >> (i * Self::SIZE)) & Self::MASK)
            })
            .take(self.count)
    }

    #[inline] // Returns the value of the Register at `index`.
    pub fn get(&self, index: usize) -> u32 {
        let (qu, rm) = (
            index / Self::COUNT_PER_WORD,
            index % Self::COUNT_PER_WORD,
        );

        (self.buf[qu] >> (rm * Self::SIZE)) & Self::MASK
    }

    #[inline] // Sets the value of the Register at `index` to `value`,
              // if `value` is greater than its current value.
    pub fn set_greater(&mut self, index: usize, value: u32) {
        let (qu, rm) = (
            index / Self::COUNT_PER_WORD,
            index % Self::COUNT_PER_WORD,
        );

        let cur = (self.buf[qu] >> (rm * Self::SIZE)) & Self::MASK;

        if value > cur {
            if cur == 0 {
                self.zeros -= 1;
                self.buf[qu] |= value << (rm * Self::SIZE);
            } else {
                let mask = Self::MASK << (rm * Self::SIZE);

                self.buf[qu] =
                    (self.buf[qu] & !mask) | (value << (rm * Self::SIZE));
            }
        }
    }

    #[inline]
    pub fn zeros(&self) -> usize {
        self.zeros
    }

    // Zeroes all registers, keeping the capacity.
    pub fn clear(&mut self) {
        for word in self.buf.iter_mut() {
            *word = 0;
        }

        self.zeros = self.count;
    }
}

// A trait for sharing hash splitting and estimation math between the
// sketch variants.
pub trait SketchCommon {
    #[inline] // Splits a 32-bit hash into a register index (top `precision`
              // bits) and the rank of the remaining bits.
              //
              // An all-zero remainder is substituted with 1, so the rank is
              // always in [1, 32].
    fn split_hash(hash: u32, precision: u8) -> (usize, u32) {
        let index = (hash >> (32 - precision)) as usize;

        let mut remainder = hash << precision;

        if remainder == 0 {
            remainder = 1;
        }

        (index, 1 + remainder.leading_zeros())
    }

    #[inline] // Returns the "raw" HyperLogLog estimate as defined by
              // P. Flajolet et al. for `count` registers.
    fn raw_estimate<I>(registers: I, count: usize) -> f64
    where
        I: Iterator<Item = u32>,
    {
        let sum: f64 = registers.map(|val| 1.0 / (1u64 << val) as f64).sum();

        Self::alpha(count) * (count * count) as f64 / sum
    }

    #[inline] // Applies the small and large range corrections to a raw
              // estimate, for the dense representation.
    fn correct_estimate(mut raw: f64, count: usize, zeros: usize) -> f64 {
        if raw <= 2.5 * count as f64 && zeros != 0 {
            // Apply small range correction.
            raw = Self::linear_count(count, zeros);
        }

        let two32 = (1u64 << 32) as f64;

        if raw > two32 / 30.0 {
            // Apply large range correction.
            raw = -1.0 * two32 * (1.0 - raw / two32).ln();
        }

        raw
    }

    #[inline] // Estimates the count of distinct elements using linear
              // counting.
    fn linear_count(count: usize, zeros: usize) -> f64 {
        count as f64 * (count as f64 / zeros as f64).ln()
    }

    #[inline] // Returns the alpha constant based on the register count.
    fn alpha(count: usize) -> f64 {
        match count {
            2 => 0.3512,
            4 => 0.5324,
            16 => 0.673,
            32 => 0.697,
            64 => 0.709,
            _ => 0.7213 / (1.0 + 1.079 / count as f64),
        }
    }

    #[inline] // Returns the number of registers based on precision.
    fn register_count(precision: u8) -> usize {
        1 << precision
    }
}

#[inline] // Returns the int ceil of num, denom.
pub fn ceil(num: usize, denom: usize) -> usize {
    (num + denom - 1) / denom
}
