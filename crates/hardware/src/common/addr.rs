//! Address ranges and address predicates.
//!
//! This module defines the two value types every routing decision is made from. It provides:
//! 1. **AddressRange:** An immutable `[base, base + size)` interval with checked construction.
//! 2. **AddressPredicate:** A range, optionally narrowed by a bit-field match (interleaving).
//! 3. **Mask arithmetic:** Exact "smallest matching address" search used for overlap and
//!    coverage reasoning without enumerating address space.

use std::fmt;

use super::error::{Result, TopologyError};

/// A half-open interval of physical addresses, `[base, base + size)`.
///
/// Construction guarantees `size > 0` and that `base + size` fits in 64 bits, so `end()`
/// never overflows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AddressRange {
    base: u64,
    size: u64,
}

impl AddressRange {
    /// Creates a range of `size` bytes starting at `base`.
    ///
    /// # Arguments
    ///
    /// * `base` - First address in the range.
    /// * `size` - Length in bytes; must be non-zero.
    ///
    /// # Returns
    ///
    /// The range, or `EmptyRange` / `AddressOverflow` if the bounds are not representable.
    pub fn new(base: u64, size: u64) -> Result<Self> {
        if size == 0 {
            return Err(TopologyError::EmptyRange { base });
        }
        if base.checked_add(size).is_none() {
            return Err(TopologyError::AddressOverflow { base, size });
        }
        Ok(Self { base, size })
    }

    /// Creates a range from an inclusive start and exclusive end.
    pub fn from_bounds(start: u64, end: u64) -> Result<Self> {
        if end <= start {
            return Err(TopologyError::EmptyRange { base: start });
        }
        Self::new(start, end - start)
    }

    /// First address in the range.
    #[inline]
    pub const fn base(&self) -> u64 {
        self.base
    }

    /// Length of the range in bytes.
    #[inline]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// One past the last address in the range.
    #[inline]
    pub const fn end(&self) -> u64 {
        self.base + self.size
    }

    /// Last address in the range (inclusive).
    #[inline]
    pub const fn last(&self) -> u64 {
        self.base + (self.size - 1)
    }

    /// Returns `true` if `addr` lies inside the range.
    #[inline]
    pub const fn contains(&self, addr: u64) -> bool {
        addr >= self.base && addr < self.end()
    }

    /// Returns `true` if `other` lies entirely inside this range.
    pub const fn contains_range(&self, other: &Self) -> bool {
        other.base >= self.base && other.end() <= self.end()
    }

    /// Returns `true` if the two ranges share at least one address.
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.base < other.end() && other.base < self.end()
    }

    /// Returns the addresses common to both ranges, if any.
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        if !self.overlaps(other) {
            return None;
        }
        let start = self.base.max(other.base);
        let end = self.end().min(other.end());
        Some(Self {
            base: start,
            size: end - start,
        })
    }

    /// Byte offset of `addr` from the start of the range.
    ///
    /// # Returns
    ///
    /// The offset, or `OutOfRange` if the range does not contain `addr`.
    pub fn offset_of(&self, addr: u64) -> Result<u64> {
        if self.contains(addr) {
            Ok(addr - self.base)
        } else {
            Err(TopologyError::OutOfRange { range: *self, addr })
        }
    }

    /// Splits the range into `parts` contiguous, equal-sized slices in address order.
    ///
    /// # Arguments
    ///
    /// * `parts` - Number of slices; must be non-zero and divide `size`.
    ///
    /// # Returns
    ///
    /// The slices, or `InvalidPartition` if the range cannot be divided evenly.
    pub fn split_flat(&self, parts: u64) -> Result<Vec<Self>> {
        if parts == 0 || self.size % parts != 0 {
            return Err(TopologyError::InvalidPartition {
                range: *self,
                parts,
            });
        }
        let slice = self.size / parts;
        Ok((0..parts)
            .map(|i| Self {
                base: self.base + i * slice,
                size: slice,
            })
            .collect())
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:#x}, {:#x})", self.base, self.end())
    }
}

/// Address-acceptance predicate owned by bridges and memory controllers.
///
/// A `Range` predicate accepts every address of its range. An `Interleaved` predicate
/// accepts an address of its nominal range only when the `bits`-wide field whose top bit
/// is `high_bit` equals `match_value`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AddressPredicate {
    /// Every address in the range.
    Range(AddressRange),
    /// Addresses in the range whose interleave field equals `match_value`.
    Interleaved {
        /// Nominal range (usually the whole interleaved window).
        range: AddressRange,
        /// Width of the interleave field.
        bits: u32,
        /// Most significant bit of the interleave field.
        high_bit: u32,
        /// Field value selecting this predicate.
        match_value: u32,
    },
}

impl AddressPredicate {
    /// Creates a bit-interleaved predicate, checking the field fits in the address.
    pub fn interleaved(
        range: AddressRange,
        bits: u32,
        high_bit: u32,
        match_value: u32,
    ) -> Result<Self> {
        if high_bit >= u64::BITS || bits > high_bit + 1 {
            return Err(TopologyError::InterleaveBitsOutOfRange { high_bit });
        }
        if bits < u32::BITS && u64::from(match_value) >> bits != 0 {
            return Err(TopologyError::InvalidConfig(format!(
                "interleave match value {match_value} does not fit in {bits} bits"
            )));
        }
        Ok(Self::Interleaved {
            range,
            bits,
            high_bit,
            match_value,
        })
    }

    /// Nominal range of the predicate.
    pub const fn range(&self) -> AddressRange {
        match self {
            Self::Range(range) | Self::Interleaved { range, .. } => *range,
        }
    }

    /// Returns `true` for bit-interleaved predicates.
    pub const fn is_interleaved(&self) -> bool {
        matches!(self, Self::Interleaved { .. })
    }

    /// Address bits constrained by the predicate (zero for plain ranges).
    pub const fn mask(&self) -> u64 {
        match *self {
            Self::Range(_) => 0,
            Self::Interleaved { bits, high_bit, .. } => field_mask(bits, high_bit),
        }
    }

    /// Required value of the constrained bits.
    pub const fn value(&self) -> u64 {
        match *self {
            Self::Range(_) => 0,
            Self::Interleaved {
                bits,
                high_bit,
                match_value,
                ..
            } => {
                if bits == 0 {
                    0
                } else {
                    let low = (high_bit + 1).saturating_sub(bits);
                    ((match_value as u64) << low) & field_mask(bits, high_bit)
                }
            }
        }
    }

    /// Returns `true` if the predicate accepts `addr`.
    #[inline]
    pub const fn matches(&self, addr: u64) -> bool {
        self.range().contains(addr) && addr & self.mask() == self.value()
    }

    /// Smallest accepted address that is `>= from`, if any.
    pub fn first_match_from(&self, from: u64) -> Option<u64> {
        let range = self.range();
        let start = from.max(range.base());
        if start >= range.end() {
            return None;
        }
        next_masked_match(start, self.mask(), self.value()).filter(|&addr| addr < range.end())
    }

    /// Smallest address accepted by both predicates, if any.
    pub fn overlap_witness(&self, other: &Self) -> Option<u64> {
        let common = self.range().intersection(&other.range())?;
        let (m1, v1) = (self.mask(), self.value());
        let (m2, v2) = (other.mask(), other.value());
        if (v1 ^ v2) & m1 & m2 != 0 {
            return None;
        }
        next_masked_match(common.base(), m1 | m2, v1 | v2).filter(|&addr| addr < common.end())
    }
}

impl fmt::Display for AddressPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Range(range) => write!(f, "{range}"),
            Self::Interleaved {
                range,
                bits,
                high_bit,
                match_value,
            } => write!(
                f,
                "{range} bits[{}:{}]=={match_value}",
                high_bit,
                (high_bit + 1).saturating_sub(*bits)
            ),
        }
    }
}

/// Mask covering the `bits`-wide field whose most significant bit is `high_bit`.
pub const fn field_mask(bits: u32, high_bit: u32) -> u64 {
    if bits == 0 {
        return 0;
    }
    let low = (high_bit + 1).saturating_sub(bits);
    let width_mask = if bits >= u64::BITS {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    };
    width_mask << low
}

/// Returns the smallest `x >= from` with `x & mask == value & mask`.
///
/// Walks from the top bit down. While every constrained bit agrees with `from`, the result
/// tracks `from`. The first disagreement either lets the result jump above `from` (the
/// constrained bit wants a 1 where `from` has a 0) or forces an increment of the
/// unconstrained prefix above that bit.
pub fn next_masked_match(from: u64, mask: u64, value: u64) -> Option<u64> {
    let value = value & mask;
    for i in (0..u64::BITS).rev() {
        let bit = 1u64 << i;
        if mask & bit == 0 {
            continue;
        }
        let want = value & bit;
        let have = from & bit;
        if want == have {
            continue;
        }
        if want != 0 {
            let above = from & !low_bits_through(i);
            return Some((above & !mask) | value);
        }
        return increment_free_prefix(from, mask, value, i);
    }
    Some(from)
}

/// Mask of bits `0..=i`.
const fn low_bits_through(i: u32) -> u64 {
    if i + 1 >= u64::BITS {
        u64::MAX
    } else {
        (1u64 << (i + 1)) - 1
    }
}

fn increment_free_prefix(from: u64, mask: u64, value: u64, below: u32) -> Option<u64> {
    ((below + 1)..u64::BITS)
        .map(|j| 1u64 << j)
        .find(|&bit| mask & bit == 0 && from & bit == 0)
        .map(|bit| {
            let above = from & !(bit | (bit - 1));
            (above & !mask) | bit | value
        })
}
