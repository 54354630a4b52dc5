//! Address-space routing topology builder.
//!
//! This crate describes how memory requests travel through a simulated multi-core machine:
//! 1. **Addresses:** Ranges, bit-field predicates, and unit-suffixed sizes.
//! 2. **Interleaving:** Flat or bit-interleaved partitioning of the MMIO window across channels.
//! 3. **Topology:** Requestors, crossbars, bridges, caches, and memory controllers joined by
//!    port edges, with a deterministic router.
//! 4. **Builder:** Per-core wiring with a dual data path (cached main memory vs. uncached MMIO
//!    bypass) and optional walker and interrupt ports.
//! 5. **Validation:** Disjointness, coverage, and reachability checks on the finished graph.
//! 6. **Workloads:** Per-thread program replicas with OpenMP placement.

/// Common types and constants (address ranges, predicates, sizes, errors).
pub mod common;
/// Topology configuration (defaults and hierarchical config structures).
pub mod config;
/// Workloads attached to cores.
pub mod sim;
/// Topology components (nodes, routing graph, memory, builder, validator).
pub mod soc;

/// Root configuration type; use `Config::default()` or deserialize from JSON.
pub use crate::config::Config;
/// Crate-wide error and result types.
pub use crate::common::error::{Result, TopologyError};
/// Validated topology; construct with `TopologyBuilder::new(&config).build()`.
pub use crate::soc::{Topology, TopologyBuilder};
