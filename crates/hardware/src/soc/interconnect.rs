//! Routing graph and address routing.
//!
//! This module holds the wired topology and answers "where does this address go". It provides:
//! 1. **Node registration:** Nodes are appended and addressed by `NodeId`.
//! 2. **Port allocation:** Crossbars hand out fresh vector-port indices; other nodes have one
//!    port per side.
//! 3. **Connection:** Each edge joins one mem-side endpoint to one cpu-side endpoint, and an
//!    endpoint has at most one peer.
//! 4. **Routing:** A request is followed downstream from its origin; crossbars pick the unique
//!    peer whose predicate accepts the address, bridges filter and add delay, caches pass
//!    through, and memory controllers terminate the route.

use std::collections::HashMap;

use tracing::trace;

use crate::common::error::{Result, TopologyError};
use crate::common::size::Latency;
use crate::soc::node::{Endpoint, Node, NodeId, NodeKind, Side};
use crate::soc::traits::AddressSink;

/// The path a request takes from its origin to a memory controller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    hops: Vec<NodeId>,
    latency: Latency,
}

impl Route {
    /// Nodes visited, origin first and memory controller last.
    pub fn hops(&self) -> &[NodeId] {
        &self.hops
    }

    /// Sum of the bridge delays along the route.
    pub const fn latency(&self) -> Latency {
        self.latency
    }

    /// The memory controller that serves the request.
    pub fn terminal(&self) -> Option<NodeId> {
        self.hops.last().copied()
    }
}

/// Nodes and the edges joining their ports.
#[derive(Clone, Debug, Default)]
pub struct TopologyGraph {
    nodes: Vec<Node>,
    peers: HashMap<Endpoint, Endpoint>,
    /// `(mem_side, cpu_side)` pairs in connection order.
    edges: Vec<(Endpoint, Endpoint)>,
    /// Next free vector index per crossbar side.
    next_port: HashMap<(NodeId, Side), u32>,
}

impl TopologyGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a node and returns its identifier.
    ///
    /// # Arguments
    ///
    /// * `name` - Hierarchical name used in diagnostics.
    /// * `kind` - Role of the node.
    ///
    /// # Returns
    ///
    /// The identifier of the new node; identifiers follow insertion order.
    pub fn add_node(&mut self, name: impl Into<String>, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(name, kind));
        id
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The node with identifier `id`.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// All nodes with their identifiers, in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeId(i as u32), node))
    }

    /// Identifier of the first node named `name`.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes().find(|(_, n)| n.name() == name).map(|(id, _)| id)
    }

    /// Name of `id`, or its numeric form if it is not in the graph.
    pub fn name_of(&self, id: NodeId) -> String {
        self.node(id)
            .map_or_else(|| id.to_string(), |n| n.name().to_string())
    }

    /// Renders an endpoint as `name.side[index]`.
    pub fn describe(&self, ep: Endpoint) -> String {
        format!("{}.{}[{}]", self.name_of(ep.node), ep.side, ep.index)
    }

    /// Edges as `(mem_side, cpu_side)` pairs in connection order.
    pub fn edges(&self) -> &[(Endpoint, Endpoint)] {
        &self.edges
    }

    /// The peer of `ep`, if it is connected.
    pub fn peer(&self, ep: Endpoint) -> Option<Endpoint> {
        self.peers.get(&ep).copied()
    }

    /// Number of vector ports allocated on a crossbar side.
    pub fn port_count(&self, node: NodeId, side: Side) -> u32 {
        self.next_port.get(&(node, side)).copied().unwrap_or(0)
    }

    /// Returns a port of `node` on `side` ready to be connected.
    ///
    /// Crossbars allocate a fresh vector index on every call; other nodes always return
    /// their single index-0 port.
    pub fn port(&mut self, node: NodeId, side: Side) -> Result<Endpoint> {
        let n = self.nodes.get(node.index()).ok_or_else(|| TopologyError::NoSuchEndpoint {
            node: node.to_string(),
            endpoint: side.to_string(),
        })?;
        if !n.has_side(side) {
            return Err(TopologyError::NoSuchEndpoint {
                node: n.name().to_string(),
                endpoint: side.to_string(),
            });
        }
        let index = if n.is_vector(side) {
            let next = self.next_port.entry((node, side)).or_insert(0);
            let index = *next;
            *next += 1;
            index
        } else {
            0
        };
        Ok(Endpoint { node, side, index })
    }

    /// Joins two endpoints with an edge.
    ///
    /// Exactly one endpoint must be mem-side. Repeating an existing connection is a no-op.
    ///
    /// # Arguments
    ///
    /// * `a` - One endpoint.
    /// * `b` - The other endpoint.
    ///
    /// # Returns
    ///
    /// `EndpointAlreadyConnected` if either endpoint already has a different peer.
    pub fn connect(&mut self, a: Endpoint, b: Endpoint) -> Result<()> {
        self.check_endpoint(a)?;
        self.check_endpoint(b)?;
        if a.side == b.side || a.node == b.node {
            return Err(TopologyError::IncompatibleEndpoints {
                a: self.describe(a),
                b: self.describe(b),
            });
        }
        if self.peer(a) == Some(b) {
            return Ok(());
        }
        for ep in [a, b] {
            if let Some(existing) = self.peer(ep) {
                return Err(TopologyError::EndpointAlreadyConnected {
                    endpoint: self.describe(ep),
                    peer: self.describe(existing),
                });
            }
        }
        let (mem, cpu) = if a.side == Side::MemSide { (a, b) } else { (b, a) };
        let _ = self.peers.insert(mem, cpu);
        let _ = self.peers.insert(cpu, mem);
        self.edges.push((mem, cpu));
        trace!(from = %self.describe(mem), to = %self.describe(cpu), "connected");
        Ok(())
    }

    /// Connects a mem-side port of `upstream` to a cpu-side port of `downstream`.
    pub fn link(&mut self, upstream: NodeId, downstream: NodeId) -> Result<()> {
        let mem = self.port(upstream, Side::MemSide)?;
        let cpu = self.port(downstream, Side::CpuSide)?;
        self.connect(mem, cpu)
    }

    /// Nodes reachable through the mem-side ports of `node`, in port order.
    pub fn downstream(&self, node: NodeId) -> Vec<NodeId> {
        self.neighbours(node, Side::MemSide)
    }

    /// Nodes reachable through the cpu-side ports of `node`, in port order.
    pub fn upstream(&self, node: NodeId) -> Vec<NodeId> {
        self.neighbours(node, Side::CpuSide)
    }

    /// Follows `addr` from `origin` to the memory controller that serves it.
    ///
    /// # Arguments
    ///
    /// * `origin` - Node the request starts at (usually a requestor).
    /// * `addr` - Physical address.
    ///
    /// # Returns
    ///
    /// The route and its accumulated bridge delay, or the first routing failure.
    pub fn route(&self, origin: NodeId, addr: u64) -> Result<Route> {
        if self.node(origin).is_none() {
            return Err(TopologyError::NoSuchEndpoint {
                node: origin.to_string(),
                endpoint: "origin".into(),
            });
        }
        let unroutable = |at: NodeId| TopologyError::Unroutable {
            origin: self.name_of(origin),
            at: self.name_of(at),
            addr,
        };
        let mut hops = vec![origin];
        let mut latency = Latency::ZERO;
        let mut current = origin;
        loop {
            if hops.len() > self.nodes.len() {
                return Err(TopologyError::RoutingLoop {
                    origin: self.name_of(origin),
                    addr,
                });
            }
            let node = &self.nodes[current.index()];
            let next = match node.kind() {
                NodeKind::MemoryController(mc) => {
                    if mc.accepts(addr) {
                        return Ok(Route { hops, latency });
                    }
                    return Err(unroutable(current));
                }
                NodeKind::Bus(_) => self.select_downstream(origin, current, addr)?,
                NodeKind::Bridge(bridge) => {
                    if !bridge.accepts(addr) {
                        return Err(unroutable(current));
                    }
                    latency = latency + bridge.latency();
                    self.single_downstream(current)
                        .ok_or_else(|| unroutable(current))?
                }
                NodeKind::Requestor(_) | NodeKind::Cache(_) => self
                    .single_downstream(current)
                    .ok_or_else(|| unroutable(current))?,
            };
            hops.push(next);
            current = next;
        }
    }

    fn check_endpoint(&self, ep: Endpoint) -> Result<()> {
        let missing = || TopologyError::NoSuchEndpoint {
            node: self.name_of(ep.node),
            endpoint: format!("{}[{}]", ep.side, ep.index),
        };
        let node = self.node(ep.node).ok_or_else(missing)?;
        let valid = if node.is_vector(ep.side) {
            ep.index < self.port_count(ep.node, ep.side)
        } else {
            node.has_side(ep.side) && ep.index == 0
        };
        if valid { Ok(()) } else { Err(missing()) }
    }

    fn neighbours(&self, node: NodeId, side: Side) -> Vec<NodeId> {
        let Some(n) = self.node(node) else {
            return Vec::new();
        };
        let ports = if n.is_vector(side) {
            self.port_count(node, side)
        } else {
            u32::from(n.has_side(side))
        };
        (0..ports)
            .filter_map(|index| self.peer(Endpoint { node, side, index }))
            .map(|ep| ep.node)
            .collect()
    }

    fn single_downstream(&self, node: NodeId) -> Option<NodeId> {
        self.peer(Endpoint::mem_side(node)).map(|ep| ep.node)
    }

    /// Picks the unique mem-side peer of crossbar `bus` that accepts `addr`.
    fn select_downstream(&self, origin: NodeId, bus: NodeId, addr: u64) -> Result<NodeId> {
        let mut accepting = self
            .downstream(bus)
            .into_iter()
            .filter(|&id| self.nodes[id.index()].accepts(addr));
        let first = accepting.next().ok_or_else(|| TopologyError::Unroutable {
            origin: self.name_of(origin),
            at: self.name_of(bus),
            addr,
        })?;
        if let Some(second) = accepting.next() {
            return Err(TopologyError::AmbiguousRoute {
                at: self.name_of(bus),
                first: self.name_of(first),
                second: self.name_of(second),
                addr,
            });
        }
        Ok(first)
    }
}
