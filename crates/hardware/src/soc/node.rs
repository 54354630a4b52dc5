//! Topology nodes and port endpoints.
//!
//! This module defines the vocabulary of the routing graph. It provides:
//! 1. **Identifiers:** `NodeId`, port `Side`, and `Endpoint` (node, side, vector index).
//! 2. **Node kinds:** Requestors, crossbars, bridges, caches, and memory controllers.
//! 3. **Port shape:** Which sides a kind exposes and whether they are vector ports.
//! 4. **Acceptance:** The address predicate each kind presents to an upstream crossbar.
//!
//! Only crossbars have vector ports; every other node has at most one port per side.

use std::fmt;

use crate::common::addr::{AddressPredicate, AddressRange};
use crate::common::size::Latency;
use crate::config::CacheConfig;
use crate::soc::memory::controller::MemoryController;
use crate::soc::traits::AddressSink;

/// Index of a node in its graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Position of the node in insertion order.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Direction of a port.
///
/// Requests leave a node through its `MemSide` and enter a node through its `CpuSide`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Side {
    /// Upstream-facing port that receives requests.
    CpuSide,
    /// Downstream-facing port that issues requests.
    MemSide,
}

impl Side {
    /// The side an edge must join this one to.
    pub const fn opposite(self) -> Self {
        match self {
            Self::CpuSide => Self::MemSide,
            Self::MemSide => Self::CpuSide,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CpuSide => "cpu_side",
            Self::MemSide => "mem_side",
        })
    }
}

/// One port of one node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Endpoint {
    /// Owning node.
    pub node: NodeId,
    /// Port direction.
    pub side: Side,
    /// Vector index; always 0 for non-crossbar nodes.
    pub index: u32,
}

impl Endpoint {
    /// The single cpu-side port of a non-crossbar node.
    pub const fn cpu_side(node: NodeId) -> Self {
        Self {
            node,
            side: Side::CpuSide,
            index: 0,
        }
    }

    /// The single mem-side port of a non-crossbar node.
    pub const fn mem_side(node: NodeId) -> Self {
        Self {
            node,
            side: Side::MemSide,
            index: 0,
        }
    }
}

/// Role of a requestor port.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RequestorKind {
    /// Core instruction fetch port.
    InstructionPort,
    /// Core data port.
    DataPort,
    /// Instruction-side page-table walker.
    InstructionWalker,
    /// Data-side page-table walker.
    DataWalker,
    /// Interrupt controller requestor.
    InterruptRequestor,
    /// Host access port used for loading and functional accesses.
    SystemPort,
}

/// A port that originates requests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Requestor {
    kind: RequestorKind,
    core: Option<usize>,
    operating_ranges: Vec<AddressRange>,
}

impl Requestor {
    /// Creates a requestor that may issue addresses inside `operating_ranges`.
    pub const fn new(
        kind: RequestorKind,
        core: Option<usize>,
        operating_ranges: Vec<AddressRange>,
    ) -> Self {
        Self {
            kind,
            core,
            operating_ranges,
        }
    }

    /// Role of the port.
    pub const fn kind(&self) -> RequestorKind {
        self.kind
    }

    /// Owning core, or `None` for system-wide ports.
    pub const fn core(&self) -> Option<usize> {
        self.core
    }

    /// Address windows this requestor may issue; every address in them must be routable.
    pub fn operating_ranges(&self) -> &[AddressRange] {
        &self.operating_ranges
    }
}

/// A crossbar with vector ports on both sides.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bus {
    width_bytes: u64,
}

impl Bus {
    /// Creates a crossbar of the given width.
    pub const fn new(width_bytes: u64) -> Self {
        Self { width_bytes }
    }

    /// Transfer width in bytes.
    pub const fn width_bytes(&self) -> u64 {
        self.width_bytes
    }
}

/// A fixed-delay forwarder with an address allow-list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bridge {
    allow: Vec<AddressPredicate>,
    latency: Latency,
}

impl Bridge {
    /// Creates a bridge forwarding only addresses accepted by `allow`.
    pub const fn new(allow: Vec<AddressPredicate>, latency: Latency) -> Self {
        Self { allow, latency }
    }

    /// Address allow-list.
    pub fn allow(&self) -> &[AddressPredicate] {
        &self.allow
    }

    /// Forwarding delay.
    pub const fn latency(&self) -> Latency {
        self.latency
    }
}

impl AddressSink for Bridge {
    fn accepts(&self, addr: u64) -> bool {
        self.allow.iter().any(|p| p.matches(addr))
    }
}

/// Position of a cache in the hierarchy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CacheLevel {
    /// Private L1 instruction cache.
    L1Instruction,
    /// Private L1 data cache.
    L1Data,
    /// Shared L2 cache.
    L2,
}

/// A cache; forwards misses unchanged to its single mem-side peer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cache {
    level: CacheLevel,
    params: CacheConfig,
}

impl Cache {
    /// Creates a cache at `level` with the given parameters.
    pub const fn new(level: CacheLevel, params: CacheConfig) -> Self {
        Self { level, params }
    }

    /// Hierarchy level.
    pub const fn level(&self) -> CacheLevel {
        self.level
    }

    /// Size, associativity, and timing parameters.
    pub const fn params(&self) -> &CacheConfig {
        &self.params
    }
}

/// The role of a node and its role-specific data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// Originates requests.
    Requestor(Requestor),
    /// Crossbar.
    Bus(Bus),
    /// Fixed-delay filter.
    Bridge(Bridge),
    /// Cache.
    Cache(Cache),
    /// Terminal sink.
    MemoryController(MemoryController),
}

/// A named vertex of the routing graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    name: String,
    kind: NodeKind,
}

impl Node {
    /// Creates a node.
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Hierarchical name (e.g., `"core0.dsplit"`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Role and role-specific data.
    pub const fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Returns `true` if the node exposes a port on `side`.
    pub const fn has_side(&self, side: Side) -> bool {
        !matches!(
            (&self.kind, side),
            (NodeKind::Requestor(_), Side::CpuSide) | (NodeKind::MemoryController(_), Side::MemSide)
        )
    }

    /// Returns `true` if the ports on `side` are vector ports.
    pub const fn is_vector(&self, side: Side) -> bool {
        matches!(self.kind, NodeKind::Bus(_)) && self.has_side(side)
    }

    /// Allow-list this node presents to an upstream crossbar, if it filters addresses.
    pub fn predicates(&self) -> Option<Vec<AddressPredicate>> {
        match &self.kind {
            NodeKind::Bridge(bridge) => Some(bridge.allow().to_vec()),
            NodeKind::MemoryController(mc) => Some(vec![*mc.predicate()]),
            NodeKind::Requestor(_) | NodeKind::Bus(_) | NodeKind::Cache(_) => None,
        }
    }
}

impl AddressSink for Node {
    /// Requestors accept nothing; crossbars and caches accept every address.
    fn accepts(&self, addr: u64) -> bool {
        match &self.kind {
            NodeKind::Requestor(_) => false,
            NodeKind::Bus(_) | NodeKind::Cache(_) => true,
            NodeKind::Bridge(bridge) => bridge.accepts(addr),
            NodeKind::MemoryController(mc) => mc.accepts(addr),
        }
    }
}
