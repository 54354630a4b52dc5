//! Edge connection tests.
//!
//! Verifies vector-port allocation on crossbars, single ports elsewhere, idempotent
//! reconnection, and rejection of double, same-side, and missing endpoints.

use memtopo_core::common::addr::AddressPredicate;
use memtopo_core::common::error::TopologyError;
use memtopo_core::soc::interconnect::TopologyGraph;
use memtopo_core::soc::memory::controller::MemoryController;
use memtopo_core::soc::node::{
    Bus, Endpoint, NodeId, NodeKind, Requestor, RequestorKind, Side,
};
use pretty_assertions::assert_eq;

use crate::common::range;

fn requestor(graph: &mut TopologyGraph, name: &str) -> NodeId {
    graph.add_node(
        name,
        NodeKind::Requestor(Requestor::new(RequestorKind::DataPort, Some(0), Vec::new())),
    )
}

fn controller(graph: &mut TopologyGraph, name: &str) -> NodeId {
    graph.add_node(
        name,
        NodeKind::MemoryController(MemoryController::new(
            AddressPredicate::Range(range(0, 0x1000)),
            format!("{name}_out"),
        )),
    )
}

// ══════════════════════════════════════════════════════════
// 1. Port allocation
// ══════════════════════════════════════════════════════════

#[test]
fn bus_allocates_fresh_vector_indices() {
    let mut graph = TopologyGraph::new();
    let bus = graph.add_node("bus", NodeKind::Bus(Bus::new(64)));
    let indices: Vec<u32> = (0..3)
        .map(|_| graph.port(bus, Side::MemSide).expect("bus port").index)
        .collect();
    assert_eq!(indices, vec![0, 1, 2]);
    assert_eq!(graph.port_count(bus, Side::MemSide), 3);
    assert_eq!(graph.port_count(bus, Side::CpuSide), 0);
}

#[test]
fn non_bus_nodes_reuse_index_zero() {
    let mut graph = TopologyGraph::new();
    let cpu = requestor(&mut graph, "cpu");
    let a = graph.port(cpu, Side::MemSide).expect("mem side");
    let b = graph.port(cpu, Side::MemSide).expect("mem side");
    assert_eq!(a, Endpoint::mem_side(cpu));
    assert_eq!(a, b);
}

#[test]
fn requestor_has_no_cpu_side() {
    let mut graph = TopologyGraph::new();
    let cpu = requestor(&mut graph, "cpu");
    assert_eq!(
        graph.port(cpu, Side::CpuSide),
        Err(TopologyError::NoSuchEndpoint {
            node: "cpu".into(),
            endpoint: "cpu_side".into()
        })
    );
}

#[test]
fn controller_has_no_mem_side() {
    let mut graph = TopologyGraph::new();
    let mc = controller(&mut graph, "mc");
    assert!(graph.port(mc, Side::MemSide).is_err());
}

// ══════════════════════════════════════════════════════════
// 2. Connection
// ══════════════════════════════════════════════════════════

#[test]
fn connect_records_symmetric_peers() {
    let mut graph = TopologyGraph::new();
    let cpu = requestor(&mut graph, "cpu");
    let mc = controller(&mut graph, "mc");
    graph
        .connect(Endpoint::cpu_side(mc), Endpoint::mem_side(cpu))
        .expect("compatible endpoints");
    assert_eq!(graph.peer(Endpoint::mem_side(cpu)), Some(Endpoint::cpu_side(mc)));
    assert_eq!(graph.peer(Endpoint::cpu_side(mc)), Some(Endpoint::mem_side(cpu)));
    assert_eq!(
        graph.edges(),
        &[(Endpoint::mem_side(cpu), Endpoint::cpu_side(mc))]
    );
}

#[test]
fn reconnecting_same_pair_is_a_no_op() {
    let mut graph = TopologyGraph::new();
    let cpu = requestor(&mut graph, "cpu");
    let mc = controller(&mut graph, "mc");
    graph.link(cpu, mc).expect("first link");
    graph
        .connect(Endpoint::mem_side(cpu), Endpoint::cpu_side(mc))
        .expect("same pair again");
    assert_eq!(graph.edges().len(), 1);
}

#[test]
fn second_peer_is_rejected() {
    let mut graph = TopologyGraph::new();
    let cpu = requestor(&mut graph, "cpu");
    let first = controller(&mut graph, "first");
    let second = controller(&mut graph, "second");
    graph.link(cpu, first).expect("first link");
    assert_eq!(
        graph.link(cpu, second),
        Err(TopologyError::EndpointAlreadyConnected {
            endpoint: "cpu.mem_side[0]".into(),
            peer: "first.cpu_side[0]".into(),
        })
    );
    assert_eq!(graph.edges().len(), 1);
}

#[test]
fn same_side_endpoints_are_incompatible() {
    let mut graph = TopologyGraph::new();
    let a = requestor(&mut graph, "a");
    let b = requestor(&mut graph, "b");
    assert_eq!(
        graph.connect(Endpoint::mem_side(a), Endpoint::mem_side(b)),
        Err(TopologyError::IncompatibleEndpoints {
            a: "a.mem_side[0]".into(),
            b: "b.mem_side[0]".into(),
        })
    );
}

#[test]
fn unallocated_vector_index_is_missing() {
    let mut graph = TopologyGraph::new();
    let cpu = requestor(&mut graph, "cpu");
    let bus = graph.add_node("bus", NodeKind::Bus(Bus::new(64)));
    let phantom = Endpoint {
        node: bus,
        side: Side::CpuSide,
        index: 7,
    };
    assert!(matches!(
        graph.connect(Endpoint::mem_side(cpu), phantom),
        Err(TopologyError::NoSuchEndpoint { .. })
    ));
}

#[test]
fn downstream_and_upstream_follow_port_order() {
    let mut graph = TopologyGraph::new();
    let cpu = requestor(&mut graph, "cpu");
    let bus = graph.add_node("bus", NodeKind::Bus(Bus::new(64)));
    let a = controller(&mut graph, "a");
    let b = controller(&mut graph, "b");
    graph.link(cpu, bus).expect("cpu");
    graph.link(bus, a).expect("a");
    graph.link(bus, b).expect("b");
    assert_eq!(graph.downstream(bus), vec![a, b]);
    assert_eq!(graph.upstream(bus), vec![cpu]);
    assert_eq!(graph.find("b"), Some(b));
    assert_eq!(graph.len(), 4);
}
