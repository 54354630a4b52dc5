//! Memory controller tests.
//!
//! Verifies controller construction, acceptance, and per-channel output directories.

use memtopo_core::common::addr::AddressPredicate;
use memtopo_core::common::constants::GIB;
use memtopo_core::soc::memory::controller::{
    MemoryController, channel_output_dir, controller_bank, single_output_dir,
};
use memtopo_core::soc::memory::interleave::{InterleaveCalculator, InterleaveMode};
use memtopo_core::soc::traits::AddressSink;
use pretty_assertions::assert_eq;

use crate::common::{MMIO_BASE, range};

#[test]
fn output_directories_follow_prefix_convention() {
    assert_eq!(channel_output_dir("ramulator_mmio", 0), "ramulator_mmio_ch0_out");
    assert_eq!(channel_output_dir("ramulator_mmio", 12), "ramulator_mmio_ch12_out");
    assert_eq!(single_output_dir("ramulator_main"), "ramulator_main_out");
}

#[test]
fn controller_accepts_its_predicate() {
    let mc = MemoryController::new(AddressPredicate::Range(range(0, 0x1000)), "main_out");
    assert!(mc.accepts(0));
    assert!(mc.accepts(0xFFF));
    assert!(!mc.accepts(0x1000));
    assert!(mc.is_backed());
    assert_eq!(mc.channel(), None);
    assert_eq!(mc.config_path(), "");
}

#[test]
fn bank_has_one_controller_per_channel() {
    let plan = InterleaveCalculator::new(64)
        .plan(range(MMIO_BASE, 16 * GIB), 4, InterleaveMode::BitInterleaved)
        .expect("power-of-two channels");
    let bank = controller_bank(&plan, "ramulator_mmio", "pum.yaml", false);
    assert_eq!(bank.len(), 4);
    for (i, mc) in bank.iter().enumerate() {
        assert_eq!(mc.channel(), Some(i as u32));
        assert_eq!(mc.output_dir(), format!("ramulator_mmio_ch{i}_out"));
        assert_eq!(mc.config_path(), "pum.yaml");
        assert!(!mc.is_backed());
        assert_eq!(*mc.predicate(), plan.channels()[i].predicate);
    }
}
