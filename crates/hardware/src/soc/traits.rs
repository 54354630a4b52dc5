//! Trait definitions at the seams of the topology.
//!
//! This module defines the two capability interfaces the builder relies on. It provides:
//! 1. **AddressSink:** The acceptance predicate every downstream node exposes to routing.
//! 2. **CoreModel:** An opaque CPU model that declares which optional ports it has.
//!
//! Cores are external collaborators; the builder never inspects them for attributes. It asks
//! `CoreModel::supports` about each member of the fixed `CoreCapability` set instead.

use serde::Deserialize;

/// A node that may receive requests on its cpu-side port.
pub trait AddressSink {
    /// Returns `true` if a request for `addr` may be forwarded to this node.
    fn accepts(&self, addr: u64) -> bool;
}

/// Optional ports a core model may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoreCapability {
    /// Instruction-side page-table walker port.
    InstructionWalker,
    /// Data-side page-table walker port.
    DataWalker,
    /// Interrupt controller requestor port.
    InterruptController,
}

impl CoreCapability {
    /// Every capability, in wiring order.
    pub const ALL: [Self; 3] = [
        Self::InstructionWalker,
        Self::DataWalker,
        Self::InterruptController,
    ];
}

/// An opaque CPU model attached to the topology.
pub trait CoreModel {
    /// Model name (e.g., `"DerivO3CPU"`).
    fn name(&self) -> &str;

    /// Returns `true` if the model exposes the given optional port.
    fn supports(&self, capability: CoreCapability) -> bool;
}

/// A core model described entirely by configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfiguredCore {
    name: String,
    capabilities: Vec<CoreCapability>,
}

impl ConfiguredCore {
    /// Creates a model with the given name and capability list.
    pub fn new(name: impl Into<String>, capabilities: &[CoreCapability]) -> Self {
        let mut capabilities = capabilities.to_vec();
        capabilities.sort_unstable();
        capabilities.dedup();
        Self {
            name: name.into(),
            capabilities,
        }
    }
}

impl CoreModel for ConfiguredCore {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports(&self, capability: CoreCapability) -> bool {
        self.capabilities.binary_search(&capability).is_ok()
    }
}
