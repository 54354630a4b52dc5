//! Machine topology components.
//!
//! This module organizes the components that make up the routing topology, including the
//! node vocabulary, the routing graph, memory controllers, the builder that wires a whole
//! machine, and the validator that checks it.

/// Topology builder and the validated `Topology` type.
pub mod builder;

/// Routing graph, port connection, and address routing.
pub mod interconnect;

/// Memory controllers and channel partitioning.
pub mod memory;

/// Node kinds, ports, and endpoints.
pub mod node;

/// Address-sink and core-model trait definitions.
pub mod traits;

/// Whole-topology invariant checks.
pub mod validate;

pub use builder::{CoreBinding, Topology, TopologyBuilder};
pub use interconnect::{Route, TopologyGraph};
pub use validate::TopologyValidator;
