//! Workloads bound to the simulated cores.
//!
//! Provides the per-thread program description that the builder attaches to each core.

/// Workload description, OpenMP placement, and replication.
pub mod workload;

pub use workload::Workload;
