//! Configuration system for the topology builder.
//!
//! This module defines all configuration structures used to parameterize a topology. It provides:
//! 1. **Defaults:** Baseline machine constants (core count, windows, channel count, caches).
//! 2. **Structures:** Hierarchical config for system, memory, bridges, caches, and workload.
//! 3. **Loading:** JSON parsing from a string or a file, with every section optional.
//!
//! Sizes and addresses accept integers or suffixed strings (`"16GiB"`, `"0x2_0000_0000"`);
//! latencies accept nanosecond integers or suffixed strings (`"6ns"`).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};

use crate::common::addr::AddressRange;
use crate::common::error::{Result, TopologyError};
use crate::common::size::{ByteSize, Latency};
use crate::sim::workload::Workload;
use crate::soc::memory::interleave::InterleaveMode;
use crate::soc::traits::CoreCapability;

/// Default configuration constants.
///
/// These values reproduce the two-core reference machine when a section or field is not
/// explicitly overridden.
mod defaults {
    use crate::common::constants::{GIB, KIB, LINE_SIZE};

    /// Number of CPU cores.
    pub const CORE_COUNT: usize = 2;

    /// Hardware threads per core.
    pub const THREADS_PER_CORE: usize = 1;

    /// Width of every crossbar in bytes.
    pub const BUS_WIDTH: u64 = 64;

    /// Core clock frequency.
    pub const CLOCK: &str = "3GHz";

    /// CPU model name reported for configured cores.
    pub const CORE_MODEL: &str = "DerivO3CPU";

    /// Base of the cacheable main window.
    pub const MAIN_BASE: u64 = 0;

    /// Size of the cacheable main window (8 GiB).
    pub const MAIN_SIZE: u64 = 8 * GIB;

    /// Base of the uncached MMIO window.
    pub const MMIO_BASE: u64 = 0x2_0000_0000;

    /// Size of the uncached MMIO window (16 GiB).
    pub const MMIO_SIZE: u64 = 16 * GIB;

    /// Number of MMIO memory channels.
    pub const MMIO_CHANNELS: u32 = 2;

    /// Interleave granularity in bytes.
    pub const LINE: u64 = LINE_SIZE;

    /// Cached-path bridge delay in nanoseconds.
    pub const BRIDGE_LATENCY_NS: u64 = 1;

    /// Engine configuration file of the main controller.
    pub const MAIN_CONFIG_PATH: &str = "ext/ramulator2/ramulator2/gem5_base_ram.yaml";

    /// Engine configuration file shared by the MMIO channels.
    pub const MMIO_CONFIG_PATH: &str = "ext/ramulator2/ramulator2/gem5_pum_ram.yaml";

    /// Output directory prefix of the main controller.
    pub const MAIN_OUTPUT_PREFIX: &str = "ramulator_main";

    /// Output directory prefix of the MMIO channels.
    pub const MMIO_OUTPUT_PREFIX: &str = "ramulator_mmio";

    /// L1 cache size (32 KiB).
    pub const L1_SIZE: u64 = 32 * KIB;

    /// L1 associativity.
    pub const L1_ASSOC: u32 = 8;

    /// L1 tag, data, and response latency in cycles.
    pub const L1_LATENCY: u64 = 2;

    /// L1 miss status holding registers.
    pub const L1_MSHRS: u32 = 16;

    /// L1 targets per MSHR.
    pub const L1_TGTS_PER_MSHR: u32 = 8;

    /// L2 cache size (256 KiB).
    pub const L2_SIZE: u64 = 256 * KIB;

    /// L2 associativity.
    pub const L2_ASSOC: u32 = 16;

    /// L2 tag, data, and response latency in cycles.
    pub const L2_LATENCY: u64 = 12;

    /// L2 miss status holding registers.
    pub const L2_MSHRS: u32 = 64;

    /// L2 targets per MSHR.
    pub const L2_TGTS_PER_MSHR: u32 = 16;
}

/// Root configuration.
///
/// Every section is optional; `Config::default()` describes the two-core reference machine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Cores, threads, and crossbar width.
    #[serde(default)]
    pub system: SystemConfig,
    /// Address windows and memory controllers.
    #[serde(default)]
    pub memory: MemoryConfig,
    /// Per-core data-path bridge delays.
    #[serde(default)]
    pub bridge: BridgeConfig,
    /// Cache parameters.
    #[serde(default)]
    pub cache: CacheHierarchyConfig,
    /// Program run on every hardware thread.
    #[serde(default)]
    pub workload: Option<WorkloadConfig>,
}

impl Config {
    /// Parses a configuration from JSON text.
    ///
    /// # Arguments
    ///
    /// * `text` - JSON document; missing sections and fields take their defaults.
    ///
    /// # Returns
    ///
    /// The configuration, or `InvalidConfig` describing the first parse error.
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| TopologyError::InvalidConfig(e.to_string()))
    }

    /// Reads and parses a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            TopologyError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&text)
    }

    /// Checks value domains that serde cannot express.
    ///
    /// Structural properties (window overlap, coverage, channel divisibility) are reported
    /// by the builder and validator with their dedicated errors.
    pub fn validate(&self) -> Result<()> {
        if self.system.core_count == 0 {
            return Err(TopologyError::InvalidConfig(
                "system.core_count must be at least 1".into(),
            ));
        }
        if self.system.threads_per_core == 0 {
            return Err(TopologyError::InvalidConfig(
                "system.threads_per_core must be at least 1".into(),
            ));
        }
        if self.system.bus_width == 0 {
            return Err(TopologyError::InvalidConfig(
                "system.bus_width must be non-zero".into(),
            ));
        }
        if self.memory.line_size.bytes() == 0 {
            return Err(TopologyError::InvalidConfig(
                "memory.line_size must be non-zero".into(),
            ));
        }
        let main = self.memory.main_range()?;
        let mmio = self.memory.mmio_range()?;
        if main.overlaps(&mmio) {
            return Err(TopologyError::InvalidConfig(format!(
                "MMIO window {mmio} overlaps main memory {main}"
            )));
        }
        if self.memory.mmio_channel_count == 0 {
            return Err(TopologyError::InvalidConfig(
                "memory.mmio_channel_count must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Total hardware threads across all cores.
    pub const fn total_threads(&self) -> usize {
        self.system.core_count.saturating_mul(self.system.threads_per_core)
    }
}

/// Core and crossbar parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SystemConfig {
    /// Number of CPU cores.
    #[serde(default = "SystemConfig::default_core_count")]
    pub core_count: usize,

    /// Hardware threads per core.
    #[serde(default = "SystemConfig::default_threads_per_core")]
    pub threads_per_core: usize,

    /// Width of every crossbar in bytes.
    #[serde(default = "SystemConfig::default_bus_width")]
    pub bus_width: u64,

    /// Core clock frequency, passed through to the engine.
    #[serde(default = "SystemConfig::default_clock")]
    pub clock: String,

    /// Name of the configured core model.
    #[serde(default = "SystemConfig::default_core_model")]
    pub core_model: String,

    /// Optional ports exposed by the configured core model.
    #[serde(default = "SystemConfig::default_capabilities")]
    pub capabilities: Vec<CoreCapability>,
}

impl SystemConfig {
    fn default_core_count() -> usize {
        defaults::CORE_COUNT
    }

    fn default_threads_per_core() -> usize {
        defaults::THREADS_PER_CORE
    }

    fn default_bus_width() -> u64 {
        defaults::BUS_WIDTH
    }

    fn default_clock() -> String {
        defaults::CLOCK.to_string()
    }

    fn default_core_model() -> String {
        defaults::CORE_MODEL.to_string()
    }

    fn default_capabilities() -> Vec<CoreCapability> {
        CoreCapability::ALL.to_vec()
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            core_count: defaults::CORE_COUNT,
            threads_per_core: defaults::THREADS_PER_CORE,
            bus_width: defaults::BUS_WIDTH,
            clock: Self::default_clock(),
            core_model: Self::default_core_model(),
            capabilities: Self::default_capabilities(),
        }
    }
}

/// Address windows and memory controller parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    /// Base of the cacheable main window.
    #[serde(default = "MemoryConfig::default_main_base")]
    pub main_base: ByteSize,

    /// Size of the cacheable main window.
    #[serde(default = "MemoryConfig::default_main_size")]
    pub main_size: ByteSize,

    /// Base of the uncached MMIO window.
    #[serde(default = "MemoryConfig::default_mmio_base")]
    pub mmio_base: ByteSize,

    /// Size of the uncached MMIO window.
    #[serde(default = "MemoryConfig::default_mmio_size")]
    pub mmio_size: ByteSize,

    /// Number of MMIO memory channels.
    #[serde(default = "MemoryConfig::default_mmio_channel_count")]
    pub mmio_channel_count: u32,

    /// How the MMIO window is divided among channels.
    #[serde(default)]
    pub mmio_mode: InterleaveMode,

    /// Interleave granularity in bytes.
    #[serde(default = "MemoryConfig::default_line_size")]
    pub line_size: ByteSize,

    /// Whether MMIO channels are backed by host storage (`false` makes them null placeholders).
    #[serde(default)]
    pub mmio_backed: bool,

    /// Engine configuration file of the main controller.
    #[serde(default = "MemoryConfig::default_main_config_path")]
    pub main_config_path: String,

    /// Engine configuration file shared by the MMIO channels.
    #[serde(default = "MemoryConfig::default_mmio_config_path")]
    pub mmio_config_path: String,

    /// Output directory prefix of the main controller.
    #[serde(default = "MemoryConfig::default_main_output_prefix")]
    pub main_output_prefix: String,

    /// Output directory prefix of the MMIO channels.
    #[serde(default = "MemoryConfig::default_mmio_output_prefix")]
    pub mmio_output_prefix: String,
}

impl MemoryConfig {
    fn default_main_base() -> ByteSize {
        ByteSize(defaults::MAIN_BASE)
    }

    fn default_main_size() -> ByteSize {
        ByteSize(defaults::MAIN_SIZE)
    }

    fn default_mmio_base() -> ByteSize {
        ByteSize(defaults::MMIO_BASE)
    }

    fn default_mmio_size() -> ByteSize {
        ByteSize(defaults::MMIO_SIZE)
    }

    fn default_mmio_channel_count() -> u32 {
        defaults::MMIO_CHANNELS
    }

    fn default_line_size() -> ByteSize {
        ByteSize(defaults::LINE)
    }

    fn default_main_config_path() -> String {
        defaults::MAIN_CONFIG_PATH.to_string()
    }

    fn default_mmio_config_path() -> String {
        defaults::MMIO_CONFIG_PATH.to_string()
    }

    fn default_main_output_prefix() -> String {
        defaults::MAIN_OUTPUT_PREFIX.to_string()
    }

    fn default_mmio_output_prefix() -> String {
        defaults::MMIO_OUTPUT_PREFIX.to_string()
    }

    /// The cacheable main window `[main_base, main_base + main_size)`.
    pub fn main_range(&self) -> Result<AddressRange> {
        AddressRange::new(self.main_base.bytes(), self.main_size.bytes())
    }

    /// The uncached MMIO window `[mmio_base, mmio_base + mmio_size)`.
    pub fn mmio_range(&self) -> Result<AddressRange> {
        AddressRange::new(self.mmio_base.bytes(), self.mmio_size.bytes())
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            main_base: Self::default_main_base(),
            main_size: Self::default_main_size(),
            mmio_base: Self::default_mmio_base(),
            mmio_size: Self::default_mmio_size(),
            mmio_channel_count: defaults::MMIO_CHANNELS,
            mmio_mode: InterleaveMode::default(),
            line_size: Self::default_line_size(),
            mmio_backed: false,
            main_config_path: Self::default_main_config_path(),
            mmio_config_path: Self::default_mmio_config_path(),
            main_output_prefix: Self::default_main_output_prefix(),
            mmio_output_prefix: Self::default_mmio_output_prefix(),
        }
    }
}

/// Delays of the per-core data-path bridges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// Delay of the bridge into the L1 data cache.
    #[serde(default = "BridgeConfig::default_latency")]
    pub latency: Latency,

    /// Delay of the MMIO bypass bridge; falls back to `latency` when absent.
    #[serde(default)]
    pub bypass_latency: Option<Latency>,
}

impl BridgeConfig {
    fn default_latency() -> Latency {
        Latency::from_nanos(defaults::BRIDGE_LATENCY_NS)
    }

    /// Effective delay of the MMIO bypass bridge.
    pub fn bypass(&self) -> Latency {
        self.bypass_latency.unwrap_or(self.latency)
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            latency: Self::default_latency(),
            bypass_latency: None,
        }
    }
}

/// Parameters of one cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Capacity in bytes.
    pub size: ByteSize,

    /// Number of ways.
    pub assoc: u32,

    /// Tag lookup latency in cycles.
    pub tag_latency: u64,

    /// Data access latency in cycles.
    pub data_latency: u64,

    /// Response latency in cycles.
    pub response_latency: u64,

    /// Miss status holding registers.
    pub mshrs: u32,

    /// Targets per MSHR.
    pub tgts_per_mshr: u32,
}

impl CacheConfig {
    /// Reference L1 parameters (32 KiB, 8-way).
    pub const fn l1() -> Self {
        Self {
            size: ByteSize(defaults::L1_SIZE),
            assoc: defaults::L1_ASSOC,
            tag_latency: defaults::L1_LATENCY,
            data_latency: defaults::L1_LATENCY,
            response_latency: defaults::L1_LATENCY,
            mshrs: defaults::L1_MSHRS,
            tgts_per_mshr: defaults::L1_TGTS_PER_MSHR,
        }
    }

    /// Reference L2 parameters (256 KiB, 16-way).
    pub const fn l2() -> Self {
        Self {
            size: ByteSize(defaults::L2_SIZE),
            assoc: defaults::L2_ASSOC,
            tag_latency: defaults::L2_LATENCY,
            data_latency: defaults::L2_LATENCY,
            response_latency: defaults::L2_LATENCY,
            mshrs: defaults::L2_MSHRS,
            tgts_per_mshr: defaults::L2_TGTS_PER_MSHR,
        }
    }

    fn deserialize_l1<'de, D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        CacheSection::deserialize(deserializer).map(|section| section.over(Self::l1()))
    }

    fn deserialize_l2<'de, D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        CacheSection::deserialize(deserializer).map(|section| section.over(Self::l2()))
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::l1()
    }
}

/// JSON form of one cache section; absent fields keep the level's reference values.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CacheSection {
    size: Option<ByteSize>,
    assoc: Option<u32>,
    tag_latency: Option<u64>,
    data_latency: Option<u64>,
    response_latency: Option<u64>,
    mshrs: Option<u32>,
    tgts_per_mshr: Option<u32>,
}

impl CacheSection {
    fn over(self, base: CacheConfig) -> CacheConfig {
        CacheConfig {
            size: self.size.unwrap_or(base.size),
            assoc: self.assoc.unwrap_or(base.assoc),
            tag_latency: self.tag_latency.unwrap_or(base.tag_latency),
            data_latency: self.data_latency.unwrap_or(base.data_latency),
            response_latency: self.response_latency.unwrap_or(base.response_latency),
            mshrs: self.mshrs.unwrap_or(base.mshrs),
            tgts_per_mshr: self.tgts_per_mshr.unwrap_or(base.tgts_per_mshr),
        }
    }
}

/// Cache hierarchy: private L1 instruction and data caches, one shared L2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheHierarchyConfig {
    /// Per-core L1 instruction cache.
    #[serde(default = "CacheConfig::l1", deserialize_with = "CacheConfig::deserialize_l1")]
    pub l1_i: CacheConfig,

    /// Per-core L1 data cache.
    #[serde(default = "CacheConfig::l1", deserialize_with = "CacheConfig::deserialize_l1")]
    pub l1_d: CacheConfig,

    /// Shared L2 cache.
    #[serde(default = "CacheConfig::l2", deserialize_with = "CacheConfig::deserialize_l2")]
    pub l2: CacheConfig,
}

impl Default for CacheHierarchyConfig {
    fn default() -> Self {
        Self {
            l1_i: CacheConfig::l1(),
            l1_d: CacheConfig::l1(),
            l2: CacheConfig::l2(),
        }
    }
}

/// Program replicated onto every hardware thread.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkloadConfig {
    /// Executable path.
    pub binary: PathBuf,

    /// Command-line arguments after the executable.
    #[serde(default)]
    pub args: Vec<String>,

    /// Extra environment variables.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Adds the OpenMP thread-placement variables for the machine's total thread count.
    #[serde(default)]
    pub openmp: bool,
}

impl WorkloadConfig {
    /// The workload one hardware thread runs on a machine with `total_threads` threads.
    pub fn to_workload(&self, total_threads: usize) -> Workload {
        let mut workload = Workload::new(&self.binary).with_args(self.args.iter().cloned());
        for (key, value) in &self.env {
            workload = workload.with_env(key, value);
        }
        if self.openmp {
            workload = workload.with_openmp(total_threads);
        }
        workload
    }
}
