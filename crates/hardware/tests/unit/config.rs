//! Configuration unit tests.
//!
//! Verifies reference defaults, partial JSON overrides, suffixed sizes and latencies,
//! unknown-field rejection, file loading, and value-domain validation.

use std::io::Write;

use memtopo_core::common::constants::{GIB, KIB, MIB};
use memtopo_core::common::error::TopologyError;
use memtopo_core::common::size::{ByteSize, Latency};
use memtopo_core::config::{CacheConfig, Config};
use memtopo_core::soc::memory::interleave::InterleaveMode;
use memtopo_core::soc::traits::CoreCapability;
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::common::{MMIO_BASE, default_windows};

// ══════════════════════════════════════════════════════════
// 1. Defaults
// ══════════════════════════════════════════════════════════

#[test]
fn default_is_two_core_reference_machine() {
    let config = Config::default();
    assert_eq!(config.system.core_count, 2);
    assert_eq!(config.system.threads_per_core, 1);
    assert_eq!(config.system.core_model, "DerivO3CPU");
    assert_eq!(config.system.capabilities, CoreCapability::ALL.to_vec());
    assert_eq!(config.memory.mmio_channel_count, 2);
    assert_eq!(config.memory.mmio_mode, InterleaveMode::Flat);
    assert!(!config.memory.mmio_backed);
    assert_eq!(config.bridge.latency, Latency::from_nanos(1));
    assert_eq!(config.bridge.bypass(), Latency::from_nanos(1));
    assert_eq!(config.workload, None);
    assert_eq!(config.validate(), Ok(()));
}

#[test]
fn default_windows_match_reference() {
    let config = Config::default();
    let (main, mmio) = default_windows();
    assert_eq!(config.memory.main_range(), Ok(main));
    assert_eq!(config.memory.mmio_range(), Ok(mmio));
}

#[test]
fn default_caches_match_reference() {
    let cache = Config::default().cache;
    assert_eq!(cache.l1_i, CacheConfig::l1());
    assert_eq!(cache.l1_d.size, ByteSize(32 * KIB));
    assert_eq!(cache.l2.size, ByteSize(256 * KIB));
    assert_eq!(cache.l2.assoc, 16);
    assert_eq!(cache.l2.mshrs, 64);
}

#[test]
fn empty_document_equals_default() {
    assert_eq!(Config::from_json_str("{}"), Ok(Config::default()));
}

// ══════════════════════════════════════════════════════════
// 2. Parsing
// ══════════════════════════════════════════════════════════

#[test]
fn partial_sections_keep_remaining_defaults() {
    let config = Config::from_json_str(
        r#"{
            "system": { "core_count": 33, "threads_per_core": 2 },
            "memory": { "mmio_channel_count": 4, "mmio_mode": "bit_interleaved" },
            "cache": { "l2": { "size": "12MiB" } }
        }"#,
    )
    .expect("valid config");
    assert_eq!(config.system.core_count, 33);
    assert_eq!(config.system.bus_width, 64);
    assert_eq!(config.total_threads(), 66);
    assert_eq!(config.memory.mmio_mode, InterleaveMode::BitInterleaved);
    assert_eq!(config.memory.mmio_base, ByteSize(MMIO_BASE));
    assert_eq!(config.cache.l2.size, ByteSize(12 * MIB));
    assert_eq!(config.cache.l2.assoc, 16);
    assert_eq!(config.cache.l2.tag_latency, 12);
    assert_eq!(config.cache.l1_d, CacheConfig::l1());
}

#[test]
fn partial_cache_sections_keep_their_level_defaults() {
    let config = Config::from_json_str(
        r#"{ "cache": { "l1_d": { "assoc": 4 }, "l2": { "size": "12MiB" } } }"#,
    )
    .expect("valid config");
    assert_eq!(
        config.cache.l2,
        CacheConfig {
            size: ByteSize(12 * MIB),
            ..CacheConfig::l2()
        }
    );
    assert_eq!(
        config.cache.l1_d,
        CacheConfig {
            assoc: 4,
            ..CacheConfig::l1()
        }
    );
    assert_eq!(config.cache.l1_i, CacheConfig::l1());
}

#[test]
fn interleaved_is_accepted_as_mode_alias() {
    let config = Config::from_json_str(r#"{ "memory": { "mmio_mode": "interleaved" } }"#)
        .expect("valid config");
    assert_eq!(config.memory.mmio_mode, InterleaveMode::BitInterleaved);
}

#[rstest]
#[case(r#""0x2_0000_0000""#, MMIO_BASE)]
#[case(r#""8GiB""#, 8 * GIB)]
#[case("4096", 4096)]
fn addresses_accept_integers_and_strings(#[case] value: &str, #[case] expected: u64) {
    let text = format!(r#"{{ "memory": {{ "mmio_base": {value} }} }}"#);
    let config = Config::from_json_str(&text).expect("valid config");
    assert_eq!(config.memory.mmio_base, ByteSize(expected));
}

#[test]
fn bypass_latency_overrides_cached_latency() {
    let config = Config::from_json_str(r#"{ "bridge": { "latency": 2, "bypass_latency": "6ns" } }"#)
        .expect("valid config");
    assert_eq!(config.bridge.latency, Latency::from_nanos(2));
    assert_eq!(config.bridge.bypass(), Latency::from_nanos(6));
}

#[test]
fn workload_section_is_parsed() {
    let config = Config::from_json_str(
        r#"{ "workload": { "binary": "/opt/bench", "args": ["-s", "1"], "openmp": true,
             "env": { "GOMP_SPINCOUNT": "0" } } }"#,
    )
    .expect("valid config");
    let workload = config
        .workload
        .as_ref()
        .expect("workload section")
        .to_workload(config.total_threads());
    assert_eq!(workload.command(), vec!["/opt/bench", "-s", "1"]);
    assert_eq!(
        workload.env_list(),
        vec![
            "GOMP_SPINCOUNT=0",
            "OMP_NUM_THREADS=2",
            "OMP_PLACES=cores",
            "OMP_PROC_BIND=spread"
        ]
    );
}

#[rstest]
#[case(r#"{ "sytem": {} }"#)]
#[case(r#"{ "memory": { "mmio_chanels": 2 } }"#)]
#[case(r#"{ "memory": { "mmio_mode": "striped" } }"#)]
#[case(r#"{ "memory": { "main_size": "8 parsecs" } }"#)]
#[case(r#"{ "bridge": { "latency": "1 fortnight" } }"#)]
#[case(r#"{ "system": { "capabilities": ["telepathy"] } }"#)]
#[case(r#"{ "cache": { "l2": { "ways": 16 } } }"#)]
#[case("not json")]
fn malformed_documents_are_invalid(#[case] text: &str) {
    assert!(matches!(
        Config::from_json_str(text),
        Err(TopologyError::InvalidConfig(_))
    ));
}

// ══════════════════════════════════════════════════════════
// 3. Files
// ══════════════════════════════════════════════════════════

#[test]
fn from_path_reads_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(file, r#"{{ "system": {{ "core_count": 4 }} }}"#).expect("write config");
    let config = Config::from_path(file.path()).expect("valid config");
    assert_eq!(config.system.core_count, 4);
}

#[test]
fn from_path_reports_missing_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let missing = dir.path().join("absent.json");
    let Err(TopologyError::InvalidConfig(msg)) = Config::from_path(&missing) else {
        panic!("missing file should be invalid");
    };
    assert!(msg.starts_with("cannot read"));
}

// ══════════════════════════════════════════════════════════
// 4. Validation
// ══════════════════════════════════════════════════════════

#[rstest]
#[case::no_cores(|c: &mut Config| c.system.core_count = 0)]
#[case::no_threads(|c: &mut Config| c.system.threads_per_core = 0)]
#[case::no_bus_width(|c: &mut Config| c.system.bus_width = 0)]
#[case::no_line(|c: &mut Config| c.memory.line_size = ByteSize(0))]
#[case::no_channels(|c: &mut Config| c.memory.mmio_channel_count = 0)]
#[case::overlap(|c: &mut Config| c.memory.main_size = ByteSize(9 * GIB))]
fn out_of_domain_values_are_rejected(#[case] edit: fn(&mut Config)) {
    let mut config = Config::default();
    edit(&mut config);
    assert!(matches!(
        config.validate(),
        Err(TopologyError::InvalidConfig(_))
    ));
}

#[test]
fn empty_main_window_is_an_empty_range() {
    let mut config = Config::default();
    config.memory.main_size = ByteSize(0);
    assert_eq!(
        config.validate(),
        Err(TopologyError::EmptyRange { base: 0 })
    );
}
