//! Memory endpoints and window partitioning.
//!
//! This module groups everything that sits at the bottom of a route. It provides:
//! 1. **Controllers:** Terminal sinks owning one address predicate each.
//! 2. **Interleaving:** Flat and bit-interleaved partitioning of a window among channels.

/// Memory controller endpoints and bank construction.
pub mod controller;

/// Channel partitioning (flat and bit-interleaved).
pub mod interleave;

pub use controller::{MemoryController, channel_output_dir, controller_bank, single_output_dir};
pub use interleave::{ChannelAssignment, InterleaveCalculator, InterleaveMode, InterleavePlan};
