//! Memory topology builder CLI.
//!
//! This binary builds and inspects topologies from a JSON configuration. It performs:
//! 1. **Check:** Build and validate a topology, then print its memory ranges and controllers.
//! 2. **Route:** Print the path each given address takes from a core's instruction or data port.
//!
//! Any build, validation, or routing error is printed and the process exits with status 1.

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use memtopo_core::common::size::parse_size;
use memtopo_core::soc::node::NodeKind;
use memtopo_core::{Config, Result, Topology, TopologyBuilder, TopologyError};

#[derive(Parser, Debug)]
#[command(
    name = "memtopo",
    author,
    version,
    about = "Address-space routing topology builder",
    long_about = "Build, validate, and query the memory routing topology of a simulated multi-core machine.\n\nExamples:\n  memtopo check configs/two_core.json\n  memtopo route configs/two_core.json --core 0 --port data 0x200000040 0x1000"
)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build and validate a topology, then print a summary.
    Check {
        /// JSON configuration file.
        config: PathBuf,

        /// Print the summary as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print the route of each address from one core port.
    Route {
        /// JSON configuration file.
        config: PathBuf,

        /// Core index.
        #[arg(long, default_value_t = 0)]
        core: usize,

        /// Port the requests originate from.
        #[arg(long, value_enum, default_value_t = Port::Data)]
        port: Port,

        /// Physical addresses (decimal, hex, or size-suffixed).
        #[arg(required = true, value_parser = parse_address)]
        addrs: Vec<u64>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Port {
    /// Instruction fetch port.
    Inst,
    /// Data port.
    Data,
}

fn parse_address(text: &str) -> std::result::Result<u64, String> {
    parse_size(text).map_err(|e| e.to_string())
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let outcome = match cli.command {
        Commands::Check { config, json } => cmd_check(&config, json),
        Commands::Route {
            config,
            core,
            port,
            addrs,
        } => cmd_route(&config, core, port, &addrs),
    };

    if let Err(e) = outcome {
        error!(error = %e, "topology error");
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn build(path: &Path) -> Result<Topology> {
    let config = Config::from_path(path)?;
    debug!(path = %path.display(), "configuration loaded");
    TopologyBuilder::new(&config).build()
}

/// Builds the topology and prints ranges, controllers, and per-core wiring.
fn cmd_check(path: &Path, as_json: bool) -> Result<()> {
    let topology = build(path)?;
    let graph = topology.graph();

    let controllers: Vec<_> = std::iter::once(topology.main_controller())
        .chain(topology.mmio_controllers().iter().copied())
        .filter_map(|id| graph.node(id))
        .filter_map(|node| match node.kind() {
            NodeKind::MemoryController(mc) => Some((node.name(), mc)),
            _ => None,
        })
        .collect();

    if as_json {
        let summary = json!({
            "nodes": graph.len(),
            "edges": graph.edges().len(),
            "mem_ranges": topology.mem_ranges().iter().map(ToString::to_string).collect::<Vec<_>>(),
            "uncached": topology.uncached_ranges().iter().map(ToString::to_string).collect::<Vec<_>>(),
            "mmio_mode": format!("{:?}", topology.mmio_plan().mode()),
            "controllers": controllers.iter().map(|(name, mc)| json!({
                "name": name,
                "predicate": mc.predicate().to_string(),
                "output_dir": mc.output_dir(),
                "config_path": mc.config_path(),
                "backed": mc.is_backed(),
            })).collect::<Vec<_>>(),
            "cores": topology.cores().iter().map(|c| json!({
                "index": c.index,
                "model": c.model,
                "walkers": usize::from(c.instruction_walker.is_some()) + usize::from(c.data_walker.is_some()),
                "interrupts": c.interrupt_requestor.is_some(),
                "threads": c.workloads.len(),
            })).collect::<Vec<_>>(),
        });
        println!("{summary:#}");
        return Ok(());
    }

    println!(
        "Topology OK: {} nodes, {} edges, {} cores x {} threads",
        graph.len(),
        graph.edges().len(),
        topology.cores().len(),
        topology.threads_per_core()
    );
    println!("Memory ranges:");
    for range in topology.mem_ranges() {
        println!("  {range}");
    }
    println!("Uncached identity mappings:");
    for range in topology.uncached_ranges() {
        println!("  {range}");
    }
    println!("Controllers ({:?} MMIO):", topology.mmio_plan().mode());
    for (name, mc) in &controllers {
        let predicate = mc.predicate().to_string();
        println!(
            "  {name:<12} {predicate:<48} -> {}{}",
            mc.output_dir(),
            if mc.is_backed() { "" } else { " (null)" }
        );
    }
    Ok(())
}

/// Prints the hop list, accumulated bridge delay, and serving controller per address.
fn cmd_route(path: &Path, core: usize, port: Port, addrs: &[u64]) -> Result<()> {
    let topology = build(path)?;
    let binding = topology.core(core).ok_or_else(|| {
        TopologyError::InvalidConfig(format!(
            "core {core} does not exist; the machine has {} cores",
            topology.cores().len()
        ))
    })?;
    let origin = match port {
        Port::Inst => binding.instruction_port,
        Port::Data => binding.data_port,
    };
    let graph = topology.graph();
    for &addr in addrs {
        let route = topology.route(origin, addr)?;
        let path: Vec<String> = route.hops().iter().map(|&id| graph.name_of(id)).collect();
        println!("{addr:#x}: {} (+{})", path.join(" -> "), route.latency());
    }
    Ok(())
}
