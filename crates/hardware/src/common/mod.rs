//! Common types shared by every part of the topology builder.
//!
//! This module provides the leaf building blocks. It includes:
//! 1. **Address Types:** Address ranges and bit-field address predicates.
//! 2. **Constants:** Size units and interleaving limits.
//! 3. **Sizes:** Unit-suffixed byte sizes and latencies for configuration.
//! 4. **Error Handling:** The crate-wide `TopologyError` and `Result` alias.

/// Address ranges and address predicates.
pub mod addr;

/// Common constants used throughout the crate.
pub mod constants;

/// Error type for topology construction.
pub mod error;

/// Byte sizes and latencies with unit suffixes.
pub mod size;

pub use addr::{AddressPredicate, AddressRange};
pub use constants::LINE_SIZE;
pub use error::{Result, TopologyError};
pub use size::{ByteSize, Latency};
