//! Global constants.
//!
//! This module defines constants shared across the crate. It includes:
//! 1. **Size units:** Binary multiples used by size parsing and defaults.
//! 2. **Interleaving:** Default line granularity and the widest supported interleave field.
//! 3. **Validation:** Bounds on the exhaustive checks performed by the validator.

/// One kibibyte.
pub const KIB: u64 = 1 << 10;

/// One mebibyte.
pub const MIB: u64 = 1 << 20;

/// One gibibyte.
pub const GIB: u64 = 1 << 30;

/// One tebibyte.
pub const TIB: u64 = 1 << 40;

/// Default interleave granularity (one cache line).
pub const LINE_SIZE: u64 = 64;

/// Widest interleave field the calculator will produce (1024 channels).
pub const MAX_INTERLEAVE_BITS: u32 = 10;

/// Widest combined constrained-bit set the coverage check enumerates per segment.
pub const MAX_COVERAGE_BITS: u32 = 20;
