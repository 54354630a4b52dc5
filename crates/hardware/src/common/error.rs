//! Topology construction errors.
//!
//! This module defines the single error type returned by every fallible operation in the crate.
//! It provides:
//! 1. **Range errors:** Overflow, empty ranges, and out-of-range offsets.
//! 2. **Partition errors:** Flat slicing and bit-interleave preconditions.
//! 3. **Wiring errors:** Double connections, port mismatches, and unroutable addresses.
//! 4. **Validation errors:** Overlapping siblings, coverage gaps, and thread-count mismatches.
//!
//! Every variant is a deterministic configuration error: retrying with the same input
//! reproduces it, so none of them are retryable.

use thiserror::Error;

use super::addr::AddressRange;

/// Error raised while building, wiring, routing, or validating a topology.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    /// `base + size` does not fit in 64 bits.
    #[error("address range {base:#x} + {size:#x} overflows the 64-bit address space")]
    AddressOverflow {
        /// Requested base address.
        base: u64,
        /// Requested size in bytes.
        size: u64,
    },

    /// A range was requested with a size of zero.
    #[error("address range at {base:#x} has zero size")]
    EmptyRange {
        /// Requested base address.
        base: u64,
    },

    /// An address was looked up in a range that does not contain it.
    #[error("address {addr:#x} is outside {range}")]
    OutOfRange {
        /// The range that was queried.
        range: AddressRange,
        /// The offending address.
        addr: u64,
    },

    /// A range cannot be split into the requested number of equal parts.
    #[error("{range} cannot be split into {parts} equal parts")]
    InvalidPartition {
        /// The range being split.
        range: AddressRange,
        /// Requested number of parts.
        parts: u64,
    },

    /// Flat channel slicing does not divide the window evenly.
    #[error("window of {size:#x} bytes is not divisible by {channels} channels")]
    ChannelCountDoesNotDivide {
        /// Window size in bytes.
        size: u64,
        /// Requested channel count.
        channels: u32,
    },

    /// Bit interleaving requires a power-of-two channel count.
    #[error("bit interleaving needs a power-of-two channel count, got {channels}")]
    ChannelCountNotPowerOfTwo {
        /// Requested channel count.
        channels: u32,
    },

    /// Bit interleaving requires a power-of-two line size.
    #[error("interleave line size must be a power of two, got {line_size}")]
    LineSizeNotPowerOfTwo {
        /// Requested line size in bytes.
        line_size: u64,
    },

    /// The interleave field would extend past the top of the address.
    #[error("interleave field ending at bit {high_bit} does not fit in a 64-bit address")]
    InterleaveBitsOutOfRange {
        /// Computed high bit of the interleave field.
        high_bit: u32,
    },

    /// An endpoint already has a different peer.
    #[error("endpoint {endpoint} is already connected to {peer}")]
    EndpointAlreadyConnected {
        /// The endpoint that was reused.
        endpoint: String,
        /// Its existing peer.
        peer: String,
    },

    /// Two endpoints on the same side were connected.
    #[error("cannot connect {a} to {b}: an edge joins one mem-side and one cpu-side port")]
    IncompatibleEndpoints {
        /// First endpoint.
        a: String,
        /// Second endpoint.
        b: String,
    },

    /// The node does not expose the requested port.
    #[error("node {node} has no {endpoint} port")]
    NoSuchEndpoint {
        /// Node name.
        node: String,
        /// Endpoint description.
        endpoint: String,
    },

    /// No sink accepts the address along the route.
    #[error("address {addr:#x} from {origin} has no route past {at}")]
    Unroutable {
        /// Node the route started from.
        origin: String,
        /// Node where routing stopped.
        at: String,
        /// The address being routed.
        addr: u64,
    },

    /// More than one downstream peer of a bus accepts the address.
    #[error("address {addr:#x} is accepted by both {first} and {second} below {at}")]
    AmbiguousRoute {
        /// Bus where the route forked.
        at: String,
        /// First accepting peer.
        first: String,
        /// Second accepting peer.
        second: String,
        /// The address being routed.
        addr: u64,
    },

    /// The route visited more nodes than the graph holds.
    #[error("route for {addr:#x} from {origin} does not terminate")]
    RoutingLoop {
        /// Node the route started from.
        origin: String,
        /// The address being routed.
        addr: u64,
    },

    /// Sibling bridges or controllers accept a common address.
    #[error("{first} and {second} below {parent} both accept {witness:#x}")]
    OverlappingPredicates {
        /// Shared upstream node.
        parent: String,
        /// First sibling.
        first: String,
        /// Second sibling.
        second: String,
        /// An address accepted by both.
        witness: u64,
    },

    /// Bit-interleaved siblings share a match value.
    #[error("{first} and {second} below {parent} both match interleave value {match_value}")]
    DuplicateInterleaveMatch {
        /// Shared upstream node.
        parent: String,
        /// First sibling.
        first: String,
        /// Second sibling.
        second: String,
        /// Duplicated match value.
        match_value: u32,
    },

    /// Part of the advertised address space has no memory controller.
    #[error("no memory controller below {bus} covers {addr:#x} (advertised range {range})")]
    AddressSpaceGap {
        /// The system bus that was checked.
        bus: String,
        /// Advertised range containing the gap.
        range: AddressRange,
        /// First uncovered address.
        addr: u64,
    },

    /// A core's workload replica count differs from its hardware thread count.
    #[error("core {core} declares {threads} hardware threads but has {workloads} workload replicas")]
    ThreadCountMismatch {
        /// Core index.
        core: usize,
        /// Declared hardware threads.
        threads: usize,
        /// Assigned workload replicas.
        workloads: usize,
    },

    /// A configuration value is outside its legal domain.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A size, address, or latency string could not be parsed.
    #[error("cannot parse {0:?} as a size, address, or latency")]
    InvalidSize(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TopologyError>;
