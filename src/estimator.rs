//! HyperLogLog estimator of the number of distinct items in a stream.
//!
//! The estimator is defined by a precision parameter `p` in [4..18] range,
//! which gives `m = 2^p` registers of `REGISTER_WIDTH` bits each.
//!
//! # Data-structure design rationale
//!
//! ## Low memory footprint
//! Registers are bit-packed into a `u32` vector, 6 bits per register:
//! - p = 10: 768 bytes of registers
//! - p = 14: 12288 bytes of registers
//! - p = 18: 196608 bytes of registers
//!
//! One extra `u32` element is kept at the end of the vector so that
//! reading or writing any register always touches two consecutive elements.
//!
//! ## Low latency
//! - Number of zero registers and registers' harmonic sum are
//!   updated as items are inserted, so `estimate` is constant time.
//! - The harmonic sum is kept as an exact 64.64 fixed-point integer:
//!   `2^-rank` is stored as `2^(64 - rank)`, so the sum only depends on
//!   register contents and never on the order of insertions or merges.
//!
//! ## Accuracy
//! Expected relative standard error is `1.04 / sqrt(m)`:
//!   p = 10: 3.25%
//!   p = 12: 1.62%
//!   p = 14: 0.81%
//!   p = 18: 0.20%
//!
//! Original HyperLogLog paper:
//! https://algo.inria.fr/flajolet/Publications/FlFuGaMe07.pdf

use std::fmt::{Debug, Formatter};
use std::hash::{BuildHasher, BuildHasherDefault, Hash, Hasher};
use std::mem::{size_of, size_of_val};

use wyhash::WyHash;

use crate::error::{Error, Result};

/// Smallest supported precision
pub const MIN_PRECISION: u8 = 4;
/// Largest supported precision
pub const MAX_PRECISION: u8 = 18;
/// Number of bits used by a single register
pub const REGISTER_WIDTH: usize = 6;
/// Size of the fixed header preceding packed registers in the serialized form
pub const HEADER_SIZE: usize = 16;
/// Width of hashes fed into the estimator
const HASH_BITS: i32 = 64;
/// Fixed-point representation of `1.0` in the harmonic sum
const SUM_ONE: u128 = 1 << 64;

pub struct HyperLogLog<H: Hasher + Default = WyHash> {
    /// Log2 of the number of registers
    precision: u8,
    /// Number of registers still set to 0
    zeros: u32,
    /// Harmonic sum `Σ 2^-register` in 64.64 fixed point
    sum: u128,
    /// Registers packed with `REGISTER_WIDTH` bits each
    registers: Vec<u32>,
    /// Zero-sized build hasher
    build_hasher: BuildHasherDefault<H>,
}

impl<H: Hasher + Default> HyperLogLog<H> {
    /// Creates new empty estimator with `2^precision` registers
    pub fn new(precision: u8) -> Result<Self> {
        if !(MIN_PRECISION..=MAX_PRECISION).contains(&precision) {
            return Err(Error::InvalidPrecision { precision });
        }
        let m = 1usize << precision;

        Ok(Self {
            precision,
            zeros: m as u32,
            sum: (m as u128) * SUM_ONE,
            registers: vec![0; m * REGISTER_WIDTH / 32 + 1],
            build_hasher: BuildHasherDefault::default(),
        })
    }

    /// Return precision of the estimator
    #[inline]
    pub fn precision(&self) -> u8 {
        self.precision
    }

    /// Return number of registers
    #[inline]
    pub fn num_registers(&self) -> usize {
        1 << self.precision
    }

    /// Return number of registers which are still zero
    #[inline]
    pub fn zero_registers(&self) -> u32 {
        self.zeros
    }

    /// Return whether nothing has been inserted yet
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.zeros as usize == self.num_registers()
    }

    /// Return value of register `idx`
    ///
    /// # Panics
    /// Panics if `idx` is not below `num_registers()`.
    pub fn register(&self, idx: usize) -> u8 {
        assert!(idx < self.num_registers(), "register index out of range");
        get_register(&self.registers, idx as u32) as u8
    }

    /// Return iterator over all register values
    pub fn registers(&self) -> impl Iterator<Item = u8> + '_ {
        (0..self.num_registers() as u32).map(|idx| get_register(&self.registers, idx) as u8)
    }

    /// Insert a hashable item into the estimator
    #[inline]
    pub fn insert<T: Hash + ?Sized>(&mut self, item: &T) {
        let mut hasher = self.build_hasher.build_hasher();
        item.hash(&mut hasher);
        self.insert_hash(hasher.finish());
    }

    /// Insert an already computed 64-bit hash into the estimator
    #[inline]
    pub fn insert_hash(&mut self, hash: u64) {
        let (idx, rank) = split_hash(hash, self.precision);
        self.update_register(idx, rank);
    }

    /// Raise register `idx` to `new_rank` if it is currently lower
    #[inline]
    fn update_register(&mut self, idx: u32, new_rank: u32) {
        let old_rank = get_register(&self.registers, idx);
        if new_rank > old_rank {
            set_register(&mut self.registers, idx, new_rank);
            self.zeros -= u32::from(old_rank == 0);
            self.sum -= SUM_ONE >> old_rank;
            self.sum += SUM_ONE >> new_rank;
        }
    }

    /// Return cardinality estimate
    pub fn estimate(&self) -> f64 {
        let m = self.num_registers() as f64;
        let sum = self.sum as f64 / SUM_ONE as f64;
        let raw = alpha(self.num_registers()) * m * m / sum;

        if raw <= 2.5 * m {
            if self.zeros > 0 {
                // linear counting
                return m * (m / f64::from(self.zeros)).ln();
            }
            return raw;
        }

        large_range_correction(raw, HASH_BITS)
    }

    /// Return cardinality estimate rounded to the nearest integer
    #[inline]
    pub fn count(&self) -> u64 {
        self.estimate().round() as u64
    }

    /// Merge `rhs` into `self`, so that `self` estimates the union of both streams
    pub fn merge(&mut self, rhs: &Self) -> Result<()> {
        if self.precision != rhs.precision {
            return Err(Error::PrecisionMismatch {
                lhs: self.precision,
                rhs: rhs.precision,
            });
        }

        for idx in 0..self.num_registers() as u32 {
            let rhs_rank = get_register(&rhs.registers, idx);
            self.update_register(idx, rhs_rank);
        }

        Ok(())
    }

    /// Reset all registers to zero
    pub fn clear(&mut self) {
        self.registers.fill(0);
        self.zeros = self.num_registers() as u32;
        self.sum = (self.num_registers() as u128) * SUM_ONE;
    }

    /// Return number of bytes the estimator occupies when persisted:
    /// fixed header followed by registers packed at `REGISTER_WIDTH` bits.
    ///
    /// Depends only on the precision, never on inserted items.
    #[inline]
    pub fn serialized_size(&self) -> usize {
        HEADER_SIZE + (self.num_registers() * REGISTER_WIDTH).div_ceil(8)
    }

    /// Return memory size of the estimator
    pub fn size_of(&self) -> usize {
        size_of::<Self>() + size_of_val(self.registers.as_slice())
    }
}

impl<H: Hasher + Default> Clone for HyperLogLog<H> {
    fn clone(&self) -> Self {
        Self {
            precision: self.precision,
            zeros: self.zeros,
            sum: self.sum,
            registers: self.registers.clone(),
            build_hasher: BuildHasherDefault::default(),
        }
    }
}

impl<H: Hasher + Default> PartialEq for HyperLogLog<H> {
    /// Estimators are equal when their registers are equal;
    /// zero count and harmonic sum are derived from the registers.
    fn eq(&self, rhs: &Self) -> bool {
        self.precision == rhs.precision && self.registers == rhs.registers
    }
}

impl<H: Hasher + Default> Eq for HyperLogLog<H> {}

impl<H: Hasher + Default> Debug for HyperLogLog<H> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ precision: {}, estimate: {}, size: {} }}",
            self.precision,
            self.count(),
            self.serialized_size()
        )
    }
}

/// Split hash into register index (top `precision` bits) and rank
/// (leading zeros of the remaining bits plus one).
#[inline]
fn split_hash(hash: u64, precision: u8) -> (u32, u32) {
    let p = u32::from(precision);
    let idx = (hash >> (64 - p)) as u32;
    // sentinel bit caps rank at `65 - p` when all remaining bits are zero
    let rank = ((hash << p) | (1 << (p - 1))).leading_zeros() + 1;
    (idx, rank)
}

/// Parameter for bias correction
#[inline]
fn alpha(m: usize) -> f64 {
    match m {
        16 => 0.673,
        32 => 0.697,
        64 => 0.709,
        _ => 0.7213 / (1.0 + 1.079 / (m as f64)),
    }
}

/// Correct for hash collisions once the estimate approaches the size of
/// the `2^hash_bits` hash space.
#[inline]
fn large_range_correction(estimate: f64, hash_bits: i32) -> f64 {
    let space = 2f64.powi(hash_bits);
    if estimate > space / 30.0 {
        -space * (1.0 - estimate / space).ln()
    } else {
        estimate
    }
}

/// Get `idx` register
#[inline]
fn get_register(data: &[u32], idx: u32) -> u32 {
    let bit_idx = (idx as usize) * REGISTER_WIDTH;
    let u32_idx = bit_idx / 32;
    let bit_pos = bit_idx % 32;
    let bits = &data[u32_idx..u32_idx + 2];
    let bits_1 = REGISTER_WIDTH.min(32 - bit_pos);
    let bits_2 = REGISTER_WIDTH - bits_1;
    let mask_1 = (1 << bits_1) - 1;
    let mask_2 = (1 << bits_2) - 1;

    ((bits[0] >> bit_pos) & mask_1) | ((bits[1] & mask_2) << bits_1)
}

/// Set `idx` register to new value `rank`
#[inline]
fn set_register(data: &mut [u32], idx: u32, rank: u32) {
    let bit_idx = (idx as usize) * REGISTER_WIDTH;
    let u32_idx = bit_idx / 32;
    let bit_pos = bit_idx % 32;
    let bits = &mut data[u32_idx..u32_idx + 2];
    let bits_1 = REGISTER_WIDTH.min(32 - bit_pos);
    let bits_2 = REGISTER_WIDTH - bits_1;
    let mask_1 = (1 << bits_1) - 1;
    let mask_2 = (1 << bits_2) - 1;

    // Unconditionally update two `u32` elements based on `rank` bits and masks
    bits[0] &= !(mask_1 << bit_pos);
    bits[0] |= (rank & mask_1) << bit_pos;
    bits[1] &= !mask_2;
    bits[1] |= (rank >> bits_1) & mask_2;
}
