//! # Bloom Filter
//!
//! A space-efficient probabilistic data structure for set membership testing.
//!
//! A bloom filter can tell you with certainty that a key is **not** in the set
//! (no false negatives), but may occasionally report that a key **is** in the
//! set when it isn't (false positives). The false positive rate depends on the
//! number of bits and hash functions used.
//!
//! Each SSTable persists a filter built from its keys. During point lookups
//! the engine checks the filter first. If it says "not present", the table
//! is skipped entirely, avoiding summary/index/data file I/O.
//!
//! ## Hashing
//!
//! The filter carries `k` random 32-bit seeds. Each seed keys a
//! MurmurHash3-32 evaluation of the key, and the hash modulo the bit count
//! selects one bit to probe. The seeds are persisted alongside the bitmap so
//! a reloaded filter probes the same bits.
//!
//! ## File format
//!
//! One line of ASCII `'0'`/`'1'` characters (the bitmap, length `m`), a
//! newline, then the seeds as space-separated decimal integers.
//!
//! ## Example
//!
//! ```rust,no_run
//! use bloom::BloomFilter;
//!
//! let mut bf = BloomFilter::new(1000, 0.01);
//! bf.insert(b"hello");
//! assert!(bf.may_contain(b"hello"));
//! ```

use murmur3::murmur3_32;
use rand::Rng;
use std::fs::{self, OpenOptions};
use std::io::{self, Cursor, Write};
use std::path::Path;

/// Filters are sized as if at least this many elements will be inserted.
const MIN_EXPECTED_ITEMS: usize = 100;

/// A bloom filter backed by a bit vector and `k` seeded hash functions.
pub struct BloomFilter {
    /// The bit vector storing the filter state, packed 8 bits per byte.
    bits: Vec<u8>,
    /// Number of bits in the filter (`m`).
    num_bits: u64,
    /// One MurmurHash3-32 seed per hash function (`k` of them).
    seeds: Vec<u32>,
}

impl BloomFilter {
    /// Creates a filter sized for `expected_items` at the target
    /// `false_positive_rate`, with freshly drawn hash seeds.
    ///
    /// `expected_items` is floored at 100 so tiny tables still get a usable
    /// filter.
    ///
    /// # Panics
    ///
    /// Panics if `false_positive_rate` is not in `(0, 1)`.
    pub fn new(expected_items: usize, false_positive_rate: f64) -> Self {
        assert!(
            false_positive_rate > 0.0 && false_positive_rate < 1.0,
            "false_positive_rate must be in (0, 1)"
        );

        let n = expected_items.max(MIN_EXPECTED_ITEMS) as f64;

        // m = ceil(n * |ln p| / ln(2)^2)
        let m = (n * false_positive_rate.ln().abs() / std::f64::consts::LN_2.powi(2)).ceil() as u64;
        // k = ceil((m / n) * ln 2)
        let k = ((m as f64 / n) * std::f64::consts::LN_2).ceil().max(1.0) as usize;

        let mut rng = rand::thread_rng();
        let seeds = (0..k).map(|_| rng.gen::<u32>()).collect();

        Self {
            bits: vec![0u8; ((m + 7) / 8) as usize],
            num_bits: m,
            seeds,
        }
    }

    fn from_raw(bits: Vec<u8>, num_bits: u64, seeds: Vec<u32>) -> Self {
        Self {
            bits,
            num_bits,
            seeds,
        }
    }

    /// Inserts a key: sets one bit per seed.
    pub fn insert(&mut self, key: &[u8]) {
        for i in 0..self.seeds.len() {
            let idx = self.bit_index(key, self.seeds[i]);
            self.set_bit(idx);
        }
    }

    /// Returns `true` if the key **might** be in the set, `false` if it is
    /// **definitely not** in the set.
    #[must_use]
    pub fn may_contain(&self, key: &[u8]) -> bool {
        self.seeds
            .iter()
            .all(|&seed| self.get_bit(self.bit_index(key, seed)))
    }

    /// Returns the number of bits in the filter (`m`).
    #[must_use]
    pub fn num_bits(&self) -> u64 {
        self.num_bits
    }

    /// Returns the number of hash functions (`k`).
    #[must_use]
    pub fn num_hashes(&self) -> usize {
        self.seeds.len()
    }

    /// Returns the persisted hash seeds.
    #[must_use]
    pub fn seeds(&self) -> &[u32] {
        &self.seeds
    }

    /// Writes the filter to `path`, truncating any previous content.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut line = String::with_capacity(self.num_bits as usize + 1);
        for idx in 0..self.num_bits {
            line.push(if self.get_bit(idx) { '1' } else { '0' });
        }
        line.push('\n');
        file.write_all(line.as_bytes())?;

        let mut seed_line = String::new();
        for (i, seed) in self.seeds.iter().enumerate() {
            if i > 0 {
                seed_line.push(' ');
            }
            seed_line.push_str(&seed.to_string());
        }
        file.write_all(seed_line.as_bytes())?;
        Ok(())
    }

    /// Reads a filter back from `path`, reconstructing the hash functions
    /// from the persisted seeds.
    pub fn load<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let text = fs::read_to_string(path)?;
        let (bitmap, seed_text) = text.split_once('\n').ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, "filter file missing seed line")
        })?;

        let num_bits = bitmap.len() as u64;
        let mut bits = vec![0u8; ((num_bits + 7) / 8) as usize];
        for (idx, ch) in bitmap.bytes().enumerate() {
            match ch {
                b'1' => bits[idx / 8] |= 1 << (idx % 8),
                b'0' => {}
                _ => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "filter bitmap contains a byte other than '0'/'1'",
                    ))
                }
            }
        }

        let seeds = seed_text
            .split_whitespace()
            .map(|s| {
                s.parse::<u32>().map_err(|_| {
                    io::Error::new(io::ErrorKind::InvalidData, "unparsable filter seed")
                })
            })
            .collect::<io::Result<Vec<u32>>>()?;

        if seeds.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "filter file carries no seeds",
            ));
        }

        Ok(Self::from_raw(bits, num_bits, seeds))
    }

    // ---- Internal helpers ----

    /// One probed bit per seed: murmur3_32(key, seed) mod m.
    fn bit_index(&self, key: &[u8], seed: u32) -> u64 {
        // hashing an in-memory cursor cannot fail
        let h = murmur3_32(&mut Cursor::new(key), seed).unwrap_or(0);
        u64::from(h) % self.num_bits
    }

    fn set_bit(&mut self, idx: u64) {
        self.bits[(idx / 8) as usize] |= 1 << (idx % 8);
    }

    fn get_bit(&self, idx: u64) -> bool {
        (self.bits[(idx / 8) as usize] >> (idx % 8)) & 1 == 1
    }
}

impl std::fmt::Debug for BloomFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BloomFilter")
            .field("num_bits", &self.num_bits)
            .field("num_hashes", &self.seeds.len())
            .finish()
    }
}
