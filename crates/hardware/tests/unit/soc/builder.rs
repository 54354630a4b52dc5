//! Topology builder tests.
//!
//! Verifies the per-core dual data path, shared L2 wiring, memory-side controllers,
//! capability-driven optional ports, workload replication, and configuration errors.

use memtopo_core::common::addr::AddressPredicate;
use memtopo_core::common::constants::GIB;
use memtopo_core::common::error::TopologyError;
use memtopo_core::common::size::{ByteSize, Latency};
use memtopo_core::config::WorkloadConfig;
use memtopo_core::sim::workload::Workload;
use memtopo_core::soc::memory::interleave::InterleaveMode;
use memtopo_core::soc::node::NodeKind;
use memtopo_core::soc::traits::CoreCapability;
use memtopo_core::{Config, Topology, TopologyBuilder};
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::common::mocks::cpu::core_with;
use crate::common::{MMIO_BASE, build, config_with, default_windows, terminal_name};

// ══════════════════════════════════════════════════════════
// 1. Reference machine
// ══════════════════════════════════════════════════════════

#[test]
fn reference_machine_has_expected_shape() {
    let topology = build(&Config::default());
    assert_eq!(topology.graph().len(), 27);
    assert_eq!(topology.graph().edges().len(), 28);
    assert_eq!(topology.cores().len(), 2);
    assert_eq!(topology.mmio_controllers().len(), 2);
    assert_eq!(topology.threads_per_core(), 1);
}

#[test]
fn advertises_main_then_mmio() {
    let topology = build(&Config::default());
    let (main, mmio) = default_windows();
    assert_eq!(topology.mem_ranges(), &[main, mmio]);
    assert_eq!(topology.uncached_ranges(), &[mmio]);
}

#[test]
fn controllers_write_to_prefixed_directories() {
    let topology = build(&Config::default());
    assert_eq!(
        topology.output_dirs(),
        vec![
            "ramulator_main_out",
            "ramulator_mmio_ch0_out",
            "ramulator_mmio_ch1_out"
        ]
    );
}

#[test]
fn mmio_channels_are_null_placeholders_by_default() {
    let topology = build(&Config::default());
    for &id in topology.mmio_controllers() {
        let Some(NodeKind::MemoryController(mc)) = topology.node(id).map(|n| n.kind()) else {
            panic!("mmio controller expected");
        };
        assert!(!mc.is_backed());
        assert!(mc.config_path().ends_with("gem5_pum_ram.yaml"));
    }
}

#[test]
fn topology_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Topology>();
}

// ══════════════════════════════════════════════════════════
// 2. Per-core data path
// ══════════════════════════════════════════════════════════

#[test]
fn main_memory_goes_through_l1d_and_l2() {
    let topology = build(&Config::default());
    let core = topology.core(0).expect("core 0");
    let route = topology.route(core.data_port, 0x1000).expect("routable");
    let hops = route.hops();
    assert_eq!(hops.first(), Some(&core.data_port));
    assert!(hops.contains(&core.cached_bridge));
    assert!(hops.contains(&core.dcache));
    assert!(hops.contains(&topology.l2_cache()));
    assert!(!hops.contains(&core.bypass_bridge));
    assert_eq!(route.terminal(), Some(topology.main_controller()));
    assert_eq!(hops.len(), 8);
}

#[test]
fn mmio_bypasses_every_cache() {
    let topology = build(&Config::default());
    let core = topology.core(1).expect("core 1");
    let route = topology.route(core.data_port, MMIO_BASE + 0x40).expect("routable");
    let hops = route.hops();
    assert!(hops.contains(&core.bypass_bridge));
    assert!(!hops.contains(&core.dcache));
    assert!(!hops.contains(&topology.l2_cache()));
    assert_eq!(hops.len(), 5);
    assert_eq!(
        topology.graph().name_of(route.terminal().expect("terminal")),
        "mmio_ch0"
    );
}

#[test]
fn cached_and_bypass_bridges_are_disjoint() {
    let topology = build(&Config::default());
    for core in topology.cores() {
        let allow = |id| match topology.node(id).map(|n| n.kind()) {
            Some(NodeKind::Bridge(b)) => b.allow().to_vec(),
            _ => Vec::new(),
        };
        let (main, mmio) = default_windows();
        assert_eq!(allow(core.cached_bridge), vec![AddressPredicate::Range(main)]);
        assert_eq!(allow(core.bypass_bridge), vec![AddressPredicate::Range(mmio)]);
    }
}

#[test]
fn instruction_fetch_has_no_bridge_delay() {
    let topology = build(&Config::default());
    let core = topology.core(0).expect("core 0");
    let route = topology
        .route(core.instruction_port, 0x8000)
        .expect("routable");
    assert_eq!(route.latency(), Latency::ZERO);
    assert!(route.hops().contains(&core.icache));
    assert_eq!(route.terminal(), Some(topology.main_controller()));
}

#[test]
fn bypass_latency_is_configured_separately() {
    let mut config = Config::default();
    config.bridge.bypass_latency = Some(Latency::from_nanos(6));
    let topology = build(&config);
    let core = topology.core(0).expect("core 0");
    let cached = topology.route(core.data_port, 0x40).expect("routable");
    let bypass = topology.route(core.data_port, MMIO_BASE).expect("routable");
    assert_eq!(cached.latency(), Latency::from_nanos(1));
    assert_eq!(bypass.latency(), Latency::from_nanos(6));
}

#[rstest]
#[case(InterleaveMode::Flat, MMIO_BASE + 0x40, "mmio_ch0")]
#[case(InterleaveMode::Flat, MMIO_BASE + 8 * GIB, "mmio_ch1")]
#[case(InterleaveMode::BitInterleaved, MMIO_BASE + 0x40, "mmio_ch1")]
#[case(InterleaveMode::BitInterleaved, MMIO_BASE + 0x80, "mmio_ch0")]
fn mmio_channel_follows_mode(
    #[case] mode: InterleaveMode,
    #[case] addr: u64,
    #[case] expected: &str,
) {
    let topology = build(&config_with(2, mode));
    let core = topology.core(0).expect("core 0");
    assert_eq!(terminal_name(&topology, core.data_port, addr), expected);
}

#[test]
fn address_past_mmio_window_is_unroutable() {
    let topology = build(&Config::default());
    let core = topology.core(0).expect("core 0");
    assert_eq!(
        topology.route(core.data_port, MMIO_BASE + 16 * GIB),
        Err(TopologyError::Unroutable {
            origin: "core0.dcache_port".into(),
            at: "core0.dsplit".into(),
            addr: MMIO_BASE + 16 * GIB,
        })
    );
}

// ══════════════════════════════════════════════════════════
// 3. Optional ports
// ══════════════════════════════════════════════════════════

#[test]
fn configured_model_gets_walkers_and_interrupts() {
    let topology = build(&Config::default());
    let core = topology.core(0).expect("core 0");
    let walker = core.instruction_walker.expect("itb walker");
    assert!(core.data_walker.is_some());
    assert!(core.interrupt_requestor.is_some());
    assert_eq!(core.model, "DerivO3CPU");
    assert_eq!(terminal_name(&topology, walker, 0x1000), "main_ctrl");
}

#[test]
fn mock_model_without_walkers_gets_only_interrupts() {
    let model = core_with("TimingSimpleCPU", &[CoreCapability::InterruptController]);
    let topology = TopologyBuilder::new(&Config::default())
        .with_core_model(1, Box::new(model))
        .build()
        .expect("topology should build");
    let core = topology.core(1).expect("core 1");
    assert_eq!(core.model, "TimingSimpleCPU");
    assert_eq!(core.instruction_walker, None);
    assert_eq!(core.data_walker, None);
    assert!(core.interrupt_requestor.is_some());
    assert_eq!(topology.graph().len(), 25);
}

#[test]
fn capabilities_can_be_disabled_in_config() {
    let mut config = Config::default();
    config.system.capabilities = vec![CoreCapability::DataWalker];
    let topology = build(&config);
    for core in topology.cores() {
        assert_eq!(core.instruction_walker, None);
        assert!(core.data_walker.is_some());
        assert_eq!(core.interrupt_requestor, None);
    }
}

#[test]
fn model_for_missing_core_is_rejected() {
    let model = core_with("Ghost", &[]);
    let result = TopologyBuilder::new(&Config::default())
        .with_core_model(7, Box::new(model))
        .build();
    assert!(matches!(result, Err(TopologyError::InvalidConfig(_))));
}

#[test]
fn system_port_reaches_both_windows() {
    let topology = build(&Config::default());
    let port = topology.system_port();
    assert_eq!(terminal_name(&topology, port, 0), "main_ctrl");
    assert_eq!(terminal_name(&topology, port, MMIO_BASE), "mmio_ch0");
}

// ══════════════════════════════════════════════════════════
// 4. Workloads
// ══════════════════════════════════════════════════════════

#[test]
fn single_replica_for_two_threads_is_a_mismatch() {
    let mut config = Config::default();
    config.system.threads_per_core = 2;
    let result = TopologyBuilder::new(&config)
        .with_workloads(0, vec![Workload::new("/bin/app")])
        .build();
    assert_eq!(
        result.map(|_| ()),
        Err(TopologyError::ThreadCountMismatch {
            core: 0,
            threads: 2,
            workloads: 1,
        })
    );
}

#[test]
fn explicit_empty_replica_list_is_a_mismatch() {
    let mut config = Config::default();
    config.system.threads_per_core = 2;
    let result = TopologyBuilder::new(&config)
        .with_workloads(0, Vec::new())
        .build();
    assert_eq!(
        result.map(|_| ()),
        Err(TopologyError::ThreadCountMismatch {
            core: 0,
            threads: 2,
            workloads: 0,
        })
    );
}

#[test]
fn explicit_replicas_override_configured_workload() {
    let mut config = Config::default();
    config.workload = Some(WorkloadConfig {
        binary: "/bin/app".into(),
        args: Vec::new(),
        env: Default::default(),
        openmp: false,
    });
    let topology = TopologyBuilder::new(&config)
        .with_workloads(1, vec![Workload::new("/bin/other")])
        .build()
        .expect("topology should build");
    let binary = |core: usize| {
        topology.core(core).expect("core exists").workloads[0]
            .binary()
            .to_path_buf()
    };
    assert_eq!(binary(0), std::path::PathBuf::from("/bin/app"));
    assert_eq!(binary(1), std::path::PathBuf::from("/bin/other"));
}

#[test]
fn configured_workload_is_replicated_with_openmp_env() {
    let mut config = Config::default();
    config.system.threads_per_core = 2;
    config.workload = Some(WorkloadConfig {
        binary: "/bin/app".into(),
        args: vec!["-n".into(), "4".into()],
        env: Default::default(),
        openmp: true,
    });
    let topology = build(&config);
    for core in topology.cores() {
        assert_eq!(core.workloads.len(), 2);
        let w = &core.workloads[0];
        assert_eq!(w.command(), vec!["/bin/app", "-n", "4"]);
        assert_eq!(w.env().get("OMP_NUM_THREADS").map(String::as_str), Some("4"));
        assert_eq!(w.env().get("OMP_PROC_BIND").map(String::as_str), Some("spread"));
        assert_eq!(w.env().get("OMP_PLACES").map(String::as_str), Some("cores"));
    }
}

#[test]
fn cores_without_workload_stay_unbound() {
    let topology = build(&Config::default());
    assert!(topology.cores().iter().all(|c| c.workloads.is_empty()));
}

// ══════════════════════════════════════════════════════════
// 5. Configuration errors
// ══════════════════════════════════════════════════════════

#[test]
fn five_flat_channels_abort_the_build() {
    let result = TopologyBuilder::new(&config_with(5, InterleaveMode::Flat)).build();
    assert_eq!(
        result.map(|_| ()),
        Err(TopologyError::ChannelCountDoesNotDivide {
            size: 16 * GIB,
            channels: 5
        })
    );
}

#[test]
fn widest_interleaved_bank_builds_and_validates() {
    let topology = build(&config_with(1024, InterleaveMode::BitInterleaved));
    let data = topology.core(0).expect("core 0").data_port;
    assert_eq!(terminal_name(&topology, data, MMIO_BASE), "mmio_ch0");
    assert_eq!(terminal_name(&topology, data, MMIO_BASE + 1023 * 64), "mmio_ch1023");
    assert_eq!(terminal_name(&topology, data, MMIO_BASE + 1024 * 64), "mmio_ch0");
}

#[test]
fn interleave_field_past_widest_aborts_the_build() {
    let result = TopologyBuilder::new(&config_with(2048, InterleaveMode::BitInterleaved)).build();
    assert_eq!(
        result.map(|_| ()),
        Err(TopologyError::InterleaveBitsOutOfRange { high_bit: 16 })
    );
}

#[test]
fn three_interleaved_channels_abort_the_build() {
    let result = TopologyBuilder::new(&config_with(3, InterleaveMode::BitInterleaved)).build();
    assert_eq!(
        result.map(|_| ()),
        Err(TopologyError::ChannelCountNotPowerOfTwo { channels: 3 })
    );
}

#[test]
fn zero_cores_is_invalid() {
    let mut config = Config::default();
    config.system.core_count = 0;
    assert!(matches!(
        TopologyBuilder::new(&config).build(),
        Err(TopologyError::InvalidConfig(_))
    ));
}

#[test]
fn mmio_overlapping_main_is_invalid() {
    let mut config = Config::default();
    config.memory.mmio_base = ByteSize(4 * GIB);
    assert!(matches!(
        TopologyBuilder::new(&config).build(),
        Err(TopologyError::InvalidConfig(msg)) if msg.contains("overlaps")
    ));
}

// ══════════════════════════════════════════════════════════
// 6. High core count
// ══════════════════════════════════════════════════════════

#[test]
fn thirty_three_cores_with_interleaved_channels() {
    let mut config = config_with(4, InterleaveMode::BitInterleaved);
    config.system.core_count = 33;
    config.bridge.bypass_latency = Some(Latency::from_nanos(6));
    let topology = build(&config);
    assert_eq!(topology.cores().len(), 33);
    assert_eq!(topology.graph().len(), 8 + 33 * 10 + 1);
    let last = topology.core(32).expect("core 32");
    assert_eq!(
        terminal_name(&topology, last.data_port, MMIO_BASE + 3 * 0x40),
        "mmio_ch3"
    );
}

// ══════════════════════════════════════════════════════════
// 7. Shipped configurations
// ══════════════════════════════════════════════════════════

#[rstest]
#[case("two_core.json", 2, 27)]
#[case("manycore.json", 33, 8 + 33 * 10 + 1)]
fn shipped_configs_build(#[case] file: &str, #[case] cores: usize, #[case] nodes: usize) {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../configs")
        .join(file);
    let config = Config::from_path(&path).expect("shipped config parses");
    let topology = build(&config);
    assert_eq!(topology.cores().len(), cores);
    assert_eq!(topology.graph().len(), nodes);
    assert!(
        topology
            .cores()
            .iter()
            .all(|c| c.workloads.len() == topology.threads_per_core() || c.workloads.is_empty())
    );
}
