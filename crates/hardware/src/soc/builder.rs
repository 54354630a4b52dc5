//! Topology construction and the top-level `Topology` type.
//!
//! This module builds the complete routing graph from configuration. It performs:
//! 1. **Window setup:** Derives the cacheable main window and the uncached MMIO window.
//! 2. **Memory side:** Creates the system crossbar, the main controller, and one controller
//!    per MMIO channel from the interleave plan.
//! 3. **Shared cache:** Wires the L2 crossbar and the shared L2 cache onto the system crossbar.
//! 4. **Per-core wiring:** Instruction path through the L1I; data path through a splitter that
//!    sends main-window addresses to the L1D and MMIO addresses around the caches.
//! 5. **Optional ports:** Page-table walkers and interrupt ports, as the core model declares.
//! 6. **Workloads:** One workload replica per hardware thread.
//! 7. **Validation:** Disjointness, coverage, and reachability before the topology is returned.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, info};

use crate::common::addr::{AddressPredicate, AddressRange};
use crate::common::error::{Result, TopologyError};
use crate::config::Config;
use crate::sim::workload::Workload;
use crate::soc::interconnect::{Route, TopologyGraph};
use crate::soc::memory::controller::{MemoryController, controller_bank, single_output_dir};
use crate::soc::memory::interleave::{InterleaveCalculator, InterleavePlan};
use crate::soc::node::{
    Bridge, Bus, Cache, CacheLevel, Node, NodeId, NodeKind, Requestor, RequestorKind,
};
use crate::soc::traits::{ConfiguredCore, CoreCapability, CoreModel};
use crate::soc::validate::TopologyValidator;

/// Nodes created for one core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreBinding {
    /// Core index.
    pub index: usize,
    /// Core model name.
    pub model: String,
    /// Instruction fetch requestor.
    pub instruction_port: NodeId,
    /// Data requestor.
    pub data_port: NodeId,
    /// Private L1 instruction cache.
    pub icache: NodeId,
    /// Private L1 data cache.
    pub dcache: NodeId,
    /// Crossbar splitting the data stream between the cached path and the bypass.
    pub data_splitter: NodeId,
    /// Bridge into the L1 data cache (main window only).
    pub cached_bridge: NodeId,
    /// Bridge around the caches to the system crossbar (MMIO window only).
    pub bypass_bridge: NodeId,
    /// Instruction-side page-table walker, if the model has one.
    pub instruction_walker: Option<NodeId>,
    /// Data-side page-table walker, if the model has one.
    pub data_walker: Option<NodeId>,
    /// Interrupt requestor, if the model has one.
    pub interrupt_requestor: Option<NodeId>,
    /// One workload per hardware thread; empty if the core is left idle.
    pub workloads: Vec<Workload>,
}

/// A validated, immutable machine topology.
///
/// Owns the routing graph plus the attributes the simulation engine needs (advertised memory
/// ranges, uncached mappings, and per-core bindings).
#[derive(Debug, Clone)]
pub struct Topology {
    graph: TopologyGraph,
    system_bus: NodeId,
    l2_bus: NodeId,
    l2_cache: NodeId,
    main_controller: NodeId,
    mmio_controllers: Vec<NodeId>,
    system_port: NodeId,
    cores: Vec<CoreBinding>,
    mem_ranges: Vec<AddressRange>,
    uncached_ranges: Vec<AddressRange>,
    mmio_plan: InterleavePlan,
    threads_per_core: usize,
}

impl Topology {
    /// The routing graph.
    pub const fn graph(&self) -> &TopologyGraph {
        &self.graph
    }

    /// The node with identifier `id`.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.graph.node(id)
    }

    /// System crossbar in front of every memory controller.
    pub const fn system_bus(&self) -> NodeId {
        self.system_bus
    }

    /// Crossbar in front of the shared L2.
    pub const fn l2_bus(&self) -> NodeId {
        self.l2_bus
    }

    /// Shared L2 cache.
    pub const fn l2_cache(&self) -> NodeId {
        self.l2_cache
    }

    /// Controller serving the main window.
    pub const fn main_controller(&self) -> NodeId {
        self.main_controller
    }

    /// Controllers serving the MMIO window, in channel order.
    pub fn mmio_controllers(&self) -> &[NodeId] {
        &self.mmio_controllers
    }

    /// Host access port on the system crossbar.
    pub const fn system_port(&self) -> NodeId {
        self.system_port
    }

    /// Per-core bindings in core order.
    pub fn cores(&self) -> &[CoreBinding] {
        &self.cores
    }

    /// Binding for core `index`.
    pub fn core(&self, index: usize) -> Option<&CoreBinding> {
        self.cores.get(index)
    }

    /// Hardware threads per core.
    pub const fn threads_per_core(&self) -> usize {
        self.threads_per_core
    }

    /// Physical ranges advertised to the engine: main first, then MMIO.
    pub fn mem_ranges(&self) -> &[AddressRange] {
        &self.mem_ranges
    }

    /// Ranges the process maps identity, non-cacheable.
    pub fn uncached_ranges(&self) -> &[AddressRange] {
        &self.uncached_ranges
    }

    /// How the MMIO window is divided among channels.
    pub const fn mmio_plan(&self) -> &InterleavePlan {
        &self.mmio_plan
    }

    /// Follows `addr` from `origin` to the controller that serves it.
    pub fn route(&self, origin: NodeId, addr: u64) -> Result<Route> {
        self.graph.route(origin, addr)
    }

    /// Diagnostics directory of every controller, main first.
    pub fn output_dirs(&self) -> Vec<&str> {
        std::iter::once(self.main_controller)
            .chain(self.mmio_controllers.iter().copied())
            .filter_map(|id| match self.graph.node(id).map(Node::kind) {
                Some(NodeKind::MemoryController(mc)) => Some(mc.output_dir()),
                _ => None,
            })
            .collect()
    }
}

/// Assembles a `Topology` from configuration, core models, and workloads.
pub struct TopologyBuilder {
    config: Config,
    default_model: ConfiguredCore,
    models: BTreeMap<usize, Box<dyn CoreModel>>,
    /// Replicas every core runs unless overridden; `None` leaves cores unbound.
    default_workloads: Option<Vec<Workload>>,
    /// Explicit per-core replica lists.
    workloads: BTreeMap<usize, Vec<Workload>>,
}

impl fmt::Debug for TopologyBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TopologyBuilder")
            .field("config", &self.config)
            .field("default_model", &self.default_model)
            .field("models", &self.models.keys().collect::<Vec<_>>())
            .field("default_workloads", &self.default_workloads)
            .field("workloads", &self.workloads)
            .finish()
    }
}

impl TopologyBuilder {
    /// Creates a builder for `config`.
    ///
    /// Every core uses the configured model and, if the configuration has a workload section,
    /// runs one replica of it per hardware thread.
    pub fn new(config: &Config) -> Self {
        let default_model =
            ConfiguredCore::new(&config.system.core_model, &config.system.capabilities);
        let default_workloads = config.workload.as_ref().map(|w| {
            w.to_workload(config.total_threads())
                .replicate(config.system.threads_per_core)
        });
        Self {
            config: config.clone(),
            default_model,
            models: BTreeMap::new(),
            default_workloads,
            workloads: BTreeMap::new(),
        }
    }

    /// Replaces the model of core `core`.
    #[must_use]
    pub fn with_core_model(mut self, core: usize, model: Box<dyn CoreModel>) -> Self {
        let _ = self.models.insert(core, model);
        self
    }

    /// Replaces the workloads of core `core`.
    ///
    /// The list must hold exactly one replica per hardware thread; an empty list is a
    /// mismatch, not a request to leave the core unbound.
    #[must_use]
    pub fn with_workloads(mut self, core: usize, workloads: Vec<Workload>) -> Self {
        let _ = self.workloads.insert(core, workloads);
        self
    }

    /// Builds and validates the topology.
    ///
    /// # Returns
    ///
    /// The topology, or the first configuration, partitioning, wiring, or validation error.
    pub fn build(mut self) -> Result<Topology> {
        self.config.validate()?;
        let core_count = self.config.system.core_count;
        if let Some(&core) = self
            .models
            .keys()
            .chain(self.workloads.keys())
            .find(|&&core| core >= core_count)
        {
            return Err(TopologyError::InvalidConfig(format!(
                "core {core} does not exist; the machine has {core_count} cores"
            )));
        }

        let memory = &self.config.memory;
        let main_range = memory.main_range()?;
        let mmio_range = memory.mmio_range()?;
        let mmio_plan = InterleaveCalculator::new(memory.line_size.bytes()).plan(
            mmio_range,
            memory.mmio_channel_count,
            memory.mmio_mode,
        )?;
        info!(
            cores = core_count,
            threads_per_core = self.config.system.threads_per_core,
            main = %main_range,
            mmio = %mmio_range,
            channels = mmio_plan.len(),
            mode = ?mmio_plan.mode(),
            "building topology"
        );

        let mut graph = TopologyGraph::new();
        let width = self.config.system.bus_width;
        let system_bus = graph.add_node("membus", NodeKind::Bus(Bus::new(width)));

        let main_controller = graph.add_node(
            "main_ctrl",
            NodeKind::MemoryController(
                MemoryController::new(
                    AddressPredicate::Range(main_range),
                    single_output_dir(&memory.main_output_prefix),
                )
                .with_config_path(&memory.main_config_path),
            ),
        );
        graph.link(system_bus, main_controller)?;

        let mut mmio_controllers = Vec::with_capacity(mmio_plan.len());
        for controller in controller_bank(
            &mmio_plan,
            &memory.mmio_output_prefix,
            &memory.mmio_config_path,
            memory.mmio_backed,
        ) {
            let name = format!("mmio_ch{}", controller.channel().unwrap_or_default());
            let id = graph.add_node(name, NodeKind::MemoryController(controller));
            graph.link(system_bus, id)?;
            mmio_controllers.push(id);
        }

        let l2_bus = graph.add_node("l2bus", NodeKind::Bus(Bus::new(width)));
        let l2_cache = graph.add_node(
            "l2cache",
            NodeKind::Cache(Cache::new(CacheLevel::L2, self.config.cache.l2)),
        );
        graph.link(l2_bus, l2_cache)?;
        graph.link(l2_cache, system_bus)?;

        let mut cores = Vec::with_capacity(core_count);
        for index in 0..core_count {
            let threads = self.config.system.threads_per_core;
            let workloads = match self.workloads.remove(&index) {
                Some(explicit) if explicit.len() != threads => {
                    return Err(TopologyError::ThreadCountMismatch {
                        core: index,
                        threads,
                        workloads: explicit.len(),
                    });
                }
                Some(explicit) => explicit,
                None => self.default_workloads.clone().unwrap_or_default(),
            };
            let model: &dyn CoreModel = self
                .models
                .get(&index)
                .map_or(&self.default_model as &dyn CoreModel, |m| m.as_ref());
            let wiring = CoreWiring {
                config: &self.config,
                system_bus,
                l2_bus,
                main_range,
                mmio_range,
            };
            let mut binding = wiring.wire(&mut graph, index, model)?;
            binding.workloads = workloads;
            cores.push(binding);
        }

        let system_port = graph.add_node(
            "system_port",
            NodeKind::Requestor(Requestor::new(
                RequestorKind::SystemPort,
                None,
                vec![main_range, mmio_range],
            )),
        );
        graph.link(system_port, system_bus)?;

        let mem_ranges = vec![main_range, mmio_range];
        TopologyValidator::new(&graph, system_bus, &mem_ranges).validate()?;
        info!(
            nodes = graph.len(),
            edges = graph.edges().len(),
            "topology built"
        );

        Ok(Topology {
            graph,
            system_bus,
            l2_bus,
            l2_cache,
            main_controller,
            mmio_controllers,
            system_port,
            cores,
            mem_ranges,
            uncached_ranges: vec![mmio_range],
            mmio_plan,
            threads_per_core: self.config.system.threads_per_core,
        })
    }
}

/// Shared context for wiring one core.
struct CoreWiring<'a> {
    config: &'a Config,
    system_bus: NodeId,
    l2_bus: NodeId,
    main_range: AddressRange,
    mmio_range: AddressRange,
}

impl CoreWiring<'_> {
    fn wire(
        &self,
        graph: &mut TopologyGraph,
        index: usize,
        model: &dyn CoreModel,
    ) -> Result<CoreBinding> {
        let cfg = self.config;
        let prefix = format!("core{index}");
        let core = Some(index);

        let instruction_port = graph.add_node(
            format!("{prefix}.icache_port"),
            NodeKind::Requestor(Requestor::new(
                RequestorKind::InstructionPort,
                core,
                vec![self.main_range],
            )),
        );
        let icache = graph.add_node(
            format!("{prefix}.icache"),
            NodeKind::Cache(Cache::new(CacheLevel::L1Instruction, cfg.cache.l1_i)),
        );
        graph.link(instruction_port, icache)?;
        graph.link(icache, self.l2_bus)?;

        let data_port = graph.add_node(
            format!("{prefix}.dcache_port"),
            NodeKind::Requestor(Requestor::new(
                RequestorKind::DataPort,
                core,
                vec![self.main_range, self.mmio_range],
            )),
        );
        let data_splitter = graph.add_node(
            format!("{prefix}.dsplit"),
            NodeKind::Bus(Bus::new(cfg.system.bus_width)),
        );
        graph.link(data_port, data_splitter)?;

        let cached_bridge = graph.add_node(
            format!("{prefix}.to_l1d"),
            NodeKind::Bridge(Bridge::new(
                vec![AddressPredicate::Range(self.main_range)],
                cfg.bridge.latency,
            )),
        );
        let bypass_bridge = graph.add_node(
            format!("{prefix}.bypass_mmio"),
            NodeKind::Bridge(Bridge::new(
                vec![AddressPredicate::Range(self.mmio_range)],
                cfg.bridge.bypass(),
            )),
        );
        graph.link(data_splitter, cached_bridge)?;
        graph.link(data_splitter, bypass_bridge)?;

        let dcache = graph.add_node(
            format!("{prefix}.dcache"),
            NodeKind::Cache(Cache::new(CacheLevel::L1Data, cfg.cache.l1_d)),
        );
        graph.link(cached_bridge, dcache)?;
        graph.link(dcache, self.l2_bus)?;
        graph.link(bypass_bridge, self.system_bus)?;

        let instruction_walker = self.optional_requestor(
            graph,
            model,
            CoreCapability::InstructionWalker,
            &format!("{prefix}.itb_walker"),
            index,
        )?;
        let data_walker = self.optional_requestor(
            graph,
            model,
            CoreCapability::DataWalker,
            &format!("{prefix}.dtb_walker"),
            index,
        )?;
        let interrupt_requestor = self.optional_requestor(
            graph,
            model,
            CoreCapability::InterruptController,
            &format!("{prefix}.interrupts"),
            index,
        )?;

        debug!(
            core = index,
            model = model.name(),
            walkers = u8::from(instruction_walker.is_some()) + u8::from(data_walker.is_some()),
            interrupts = interrupt_requestor.is_some(),
            "core wired"
        );

        Ok(CoreBinding {
            index,
            model: model.name().to_string(),
            instruction_port,
            data_port,
            icache,
            dcache,
            data_splitter,
            cached_bridge,
            bypass_bridge,
            instruction_walker,
            data_walker,
            interrupt_requestor,
            workloads: Vec::new(),
        })
    }

    /// Adds a requestor on the system crossbar when `model` supports `capability`.
    ///
    /// Walkers read page tables from the main window. Interrupt messages target other
    /// cores' interrupt controllers rather than memory, so the interrupt port declares no
    /// operating range.
    fn optional_requestor(
        &self,
        graph: &mut TopologyGraph,
        model: &dyn CoreModel,
        capability: CoreCapability,
        name: &str,
        core: usize,
    ) -> Result<Option<NodeId>> {
        if !model.supports(capability) {
            return Ok(None);
        }
        let (kind, ranges) = match capability {
            CoreCapability::InstructionWalker => {
                (RequestorKind::InstructionWalker, vec![self.main_range])
            }
            CoreCapability::DataWalker => (RequestorKind::DataWalker, vec![self.main_range]),
            CoreCapability::InterruptController => (RequestorKind::InterruptRequestor, Vec::new()),
        };
        let id = graph.add_node(
            name,
            NodeKind::Requestor(Requestor::new(kind, Some(core), ranges)),
        );
        graph.link(id, self.system_bus)?;
        Ok(Some(id))
    }
}
