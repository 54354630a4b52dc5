//! Whole-topology validation.
//!
//! This module checks a wired graph before it is handed to the simulation engine. It performs:
//! 1. **Single-peer check:** Every endpoint appears in at most one edge.
//! 2. **Disjointness:** Sibling bridges and controllers below one node never accept a common
//!    address; bit-interleaved siblings never share a match value.
//! 3. **Coverage:** Every advertised address is accepted by some controller below the system
//!    crossbar.
//! 4. **Reachability:** Every requestor routes every address of its operating ranges to
//!    exactly one controller.
//!
//! Coverage is decided exactly. The advertised ranges are cut at every controller range
//! boundary; inside a segment the active bit-interleaved predicates are compared over the
//! union of their constrained bits, and any uncovered bit pattern yields a gap witness. A
//! field whose every value is claimed covers its segment without enumeration.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::{debug, info};

use crate::common::addr::{AddressPredicate, AddressRange, next_masked_match};
use crate::common::constants::MAX_COVERAGE_BITS;
use crate::common::error::{Result, TopologyError};
use crate::soc::interconnect::TopologyGraph;
use crate::soc::node::{NodeId, NodeKind};

/// Checks structural invariants of a wired topology.
#[derive(Debug, Clone, Copy)]
pub struct TopologyValidator<'a> {
    graph: &'a TopologyGraph,
    system_bus: NodeId,
    advertised: &'a [AddressRange],
}

impl<'a> TopologyValidator<'a> {
    /// Creates a validator for `graph`.
    ///
    /// # Arguments
    ///
    /// * `graph` - The wired topology.
    /// * `system_bus` - Crossbar whose controllers must cover `advertised`.
    /// * `advertised` - Physical ranges the machine exposes.
    pub const fn new(
        graph: &'a TopologyGraph,
        system_bus: NodeId,
        advertised: &'a [AddressRange],
    ) -> Self {
        Self {
            graph,
            system_bus,
            advertised,
        }
    }

    /// Runs every check, returning the first violation.
    pub fn validate(&self) -> Result<()> {
        self.check_single_peer()?;
        self.check_disjointness()?;
        self.check_coverage()?;
        self.check_reachability()?;
        info!(
            nodes = self.graph.len(),
            edges = self.graph.edges().len(),
            "topology validated"
        );
        Ok(())
    }

    /// Every endpoint appears in at most one edge.
    pub fn check_single_peer(&self) -> Result<()> {
        let mut seen = HashMap::new();
        for &(mem, cpu) in self.graph.edges() {
            for (ep, other) in [(mem, cpu), (cpu, mem)] {
                match seen.insert(ep, other) {
                    Some(existing) if existing != other => {
                        return Err(TopologyError::EndpointAlreadyConnected {
                            endpoint: self.graph.describe(ep),
                            peer: self.graph.describe(existing),
                        });
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    /// Sibling filters below any node accept disjoint address sets.
    ///
    /// Bit-interleaved siblings that share one field over one range are disjoint exactly when
    /// their match values differ, so they are grouped and checked for repeats in one pass.
    /// Only predicates from different groups are compared pairwise.
    pub fn check_disjointness(&self) -> Result<()> {
        for (parent, _) in self.graph.nodes() {
            let mut groups: Vec<Vec<(NodeId, AddressPredicate)>> = Vec::new();
            let mut fields: HashMap<(AddressRange, u32, u32), usize> = HashMap::new();
            let mut owners: HashMap<(usize, u32), NodeId> = HashMap::new();
            for id in self.graph.downstream(parent) {
                let Some(predicates) = self.graph.node(id).and_then(|n| n.predicates()) else {
                    continue;
                };
                for predicate in predicates {
                    let AddressPredicate::Interleaved {
                        range,
                        bits,
                        high_bit,
                        match_value,
                    } = predicate
                    else {
                        groups.push(vec![(id, predicate)]);
                        continue;
                    };
                    let group = *fields.entry((range, bits, high_bit)).or_insert_with(|| {
                        groups.push(Vec::new());
                        groups.len() - 1
                    });
                    match owners.insert((group, match_value), id) {
                        Some(first) if first != id => {
                            return Err(TopologyError::DuplicateInterleaveMatch {
                                parent: self.graph.name_of(parent),
                                first: self.graph.name_of(first),
                                second: self.graph.name_of(id),
                                match_value,
                            });
                        }
                        _ => {}
                    }
                    if let Some(members) = groups.get_mut(group) {
                        members.push((id, predicate));
                    }
                }
            }
            for (i, first) in groups.iter().enumerate() {
                for second in &groups[i + 1..] {
                    for (a_id, a) in first {
                        for (b_id, b) in second {
                            if a_id != b_id {
                                self.check_pair(parent, (*a_id, a), (*b_id, b))?;
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn check_pair(
        &self,
        parent: NodeId,
        (first, a): (NodeId, &AddressPredicate),
        (second, b): (NodeId, &AddressPredicate),
    ) -> Result<()> {
        match (a, b) {
            (
                AddressPredicate::Interleaved {
                    range: ra,
                    bits: ba,
                    high_bit: ha,
                    match_value: ma,
                },
                AddressPredicate::Interleaved {
                    range: rb,
                    bits: bb,
                    high_bit: hb,
                    match_value: mb,
                },
            ) if ba == bb && ha == hb && ma == mb && ra.overlaps(rb) => {
                return Err(TopologyError::DuplicateInterleaveMatch {
                    parent: self.graph.name_of(parent),
                    first: self.graph.name_of(first),
                    second: self.graph.name_of(second),
                    match_value: *ma,
                });
            }
            _ => {}
        }
        if let Some(witness) = a.overlap_witness(b) {
            return Err(TopologyError::OverlappingPredicates {
                parent: self.graph.name_of(parent),
                first: self.graph.name_of(first),
                second: self.graph.name_of(second),
                witness,
            });
        }
        Ok(())
    }

    /// The controllers below the system crossbar cover every advertised address.
    pub fn check_coverage(&self) -> Result<()> {
        let predicates: Vec<AddressPredicate> = self
            .graph
            .downstream(self.system_bus)
            .into_iter()
            .filter_map(|id| match self.graph.node(id).map(|n| n.kind()) {
                Some(NodeKind::MemoryController(mc)) => Some(*mc.predicate()),
                _ => None,
            })
            .collect();
        for &range in self.advertised {
            for segment in segments(range, &predicates) {
                let active: Vec<&AddressPredicate> = predicates
                    .iter()
                    .filter(|p| p.range().contains_range(&segment))
                    .collect();
                if let Some(addr) = first_uncovered(segment, &active)? {
                    return Err(TopologyError::AddressSpaceGap {
                        bus: self.graph.name_of(self.system_bus),
                        range,
                        addr,
                    });
                }
            }
            debug!(%range, "advertised range covered");
        }
        Ok(())
    }

    /// Every requestor routes its operating ranges to exactly one controller each.
    ///
    /// Routing decisions only change at predicate range boundaries and across interleave
    /// fields, so each segment is routed at its ends and at the first address of every
    /// bit pattern selected by a predicate overlapping the segment.
    pub fn check_reachability(&self) -> Result<()> {
        let predicates: Vec<AddressPredicate> = self
            .graph
            .nodes()
            .filter_map(|(_, n)| n.predicates())
            .flatten()
            .collect();
        for (id, node) in self.graph.nodes() {
            let NodeKind::Requestor(requestor) = node.kind() else {
                continue;
            };
            let mut routed = 0usize;
            for &range in requestor.operating_ranges() {
                for segment in segments(range, &predicates) {
                    for addr in decision_points(segment, &predicates) {
                        let _ = self.graph.route(id, addr)?;
                        routed += 1;
                    }
                }
            }
            debug!(requestor = node.name(), routed, "requestor reachability checked");
        }
        Ok(())
    }
}

/// Cuts `range` at every predicate range boundary that falls strictly inside it.
fn segments(range: AddressRange, predicates: &[AddressPredicate]) -> Vec<AddressRange> {
    let mut cuts = BTreeSet::new();
    let _ = cuts.insert(range.base());
    let _ = cuts.insert(range.end());
    for p in predicates {
        let r = p.range();
        for bound in [r.base(), r.end()] {
            if bound > range.base() && bound < range.end() {
                let _ = cuts.insert(bound);
            }
        }
    }
    let cuts: Vec<u64> = cuts.into_iter().collect();
    cuts.windows(2)
        .filter_map(|w| AddressRange::from_bounds(w[0], w[1]).ok())
        .collect()
}

/// First address of `segment` accepted by none of `active`.
///
/// Every predicate in `active` spans the whole segment. Predicates are grouped by constrained
/// field; a field whose every value is claimed covers the segment on its own.
fn first_uncovered(segment: AddressRange, active: &[&AddressPredicate]) -> Result<Option<u64>> {
    if active.is_empty() {
        return Ok(Some(segment.base()));
    }
    if active.iter().any(|p| !p.is_interleaved()) {
        return Ok(None);
    }
    let mut fields: HashMap<u64, HashSet<u64>> = HashMap::new();
    for p in active {
        let _ = fields.entry(p.mask()).or_default().insert(p.value());
    }
    let complete = fields.iter().any(|(mask, values)| {
        mask.count_ones() < usize::BITS && values.len() == 1usize << mask.count_ones()
    });
    if complete {
        return Ok(None);
    }
    let union = fields.keys().fold(0u64, |m, mask| m | mask);
    if union.count_ones() > MAX_COVERAGE_BITS {
        return Err(TopologyError::InvalidConfig(format!(
            "{} interleave bits constrain {segment}; at most {MAX_COVERAGE_BITS} can be checked",
            union.count_ones()
        )));
    }
    let mut first: Option<u64> = None;
    let mut pattern = union;
    loop {
        let covered = fields
            .iter()
            .any(|(mask, values)| values.contains(&(pattern & mask)));
        let candidate = if covered {
            None
        } else {
            next_masked_match(segment.base(), union, pattern).filter(|&addr| addr < segment.end())
        };
        if let Some(addr) = candidate {
            first = Some(first.map_or(addr, |f| f.min(addr)));
        }
        if pattern == 0 {
            break;
        }
        pattern = (pattern - 1) & union;
    }
    Ok(first)
}

/// Addresses of `segment` at which routing decisions can differ.
fn decision_points(segment: AddressRange, predicates: &[AddressPredicate]) -> BTreeSet<u64> {
    let mut points = BTreeSet::new();
    let _ = points.insert(segment.base());
    let _ = points.insert(segment.last());
    for p in predicates {
        if let AddressPredicate::Interleaved {
            bits,
            high_bit,
            match_value,
            ..
        } = *p
            && p.range().overlaps(&segment)
        {
            let restricted = AddressPredicate::Interleaved {
                range: segment,
                bits,
                high_bit,
                match_value,
            };
            if let Some(addr) = restricted.first_match_from(segment.base()) {
                let _ = points.insert(addr);
            }
        }
    }
    points
}
