//! Memory controller endpoints.
//!
//! This module provides:
//! 1. **MemoryController:** The terminal sink of every route, owning one address predicate.
//! 2. **Bank construction:** One controller per channel of an `InterleavePlan`.
//! 3. **Artifact naming:** The per-channel output directory handed to the simulation engine.
//!
//! Controllers carry only what the engine needs to instantiate them; their timing model is
//! the engine's concern.

use crate::common::addr::AddressPredicate;
use crate::soc::traits::AddressSink;

use super::interleave::InterleavePlan;

/// A terminal memory endpoint serving one address predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryController {
    predicate: AddressPredicate,
    channel: Option<u32>,
    config_path: String,
    output_dir: String,
    backed: bool,
}

impl MemoryController {
    /// Creates a backed controller for `predicate` writing diagnostics to `output_dir`.
    ///
    /// # Arguments
    ///
    /// * `predicate` - Addresses served by this controller.
    /// * `output_dir` - Engine-side diagnostics directory.
    ///
    /// # Returns
    ///
    /// A controller with no channel index and an empty engine config path.
    pub fn new(predicate: AddressPredicate, output_dir: impl Into<String>) -> Self {
        Self {
            predicate,
            channel: None,
            config_path: String::new(),
            output_dir: output_dir.into(),
            backed: true,
        }
    }

    /// Marks the controller as channel `channel` of a bank.
    #[must_use]
    pub const fn with_channel(mut self, channel: u32) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Sets the engine configuration file for this controller.
    #[must_use]
    pub fn with_config_path(mut self, path: impl Into<String>) -> Self {
        self.config_path = path.into();
        self
    }

    /// Sets whether the controller is backed by host storage or is a null placeholder.
    #[must_use]
    pub const fn with_backing(mut self, backed: bool) -> Self {
        self.backed = backed;
        self
    }

    /// Addresses served by this controller.
    pub const fn predicate(&self) -> &AddressPredicate {
        &self.predicate
    }

    /// Channel index within its bank, if it belongs to one.
    pub const fn channel(&self) -> Option<u32> {
        self.channel
    }

    /// Engine configuration file.
    pub fn config_path(&self) -> &str {
        &self.config_path
    }

    /// Engine diagnostics directory.
    pub fn output_dir(&self) -> &str {
        &self.output_dir
    }

    /// `false` when the channel is a null placeholder with no host storage.
    pub const fn is_backed(&self) -> bool {
        self.backed
    }
}

impl AddressSink for MemoryController {
    fn accepts(&self, addr: u64) -> bool {
        self.predicate.matches(addr)
    }
}

/// Diagnostics directory for channel `channel` of a bank: `"<prefix>_ch<N>_out"`.
pub fn channel_output_dir(prefix: &str, channel: u32) -> String {
    format!("{prefix}_ch{channel}_out")
}

/// Diagnostics directory for a stand-alone controller: `"<prefix>_out"`.
pub fn single_output_dir(prefix: &str) -> String {
    format!("{prefix}_out")
}

/// Builds one controller per channel of `plan`, in channel order.
///
/// # Arguments
///
/// * `plan` - Channel partition of the window.
/// * `prefix` - Output directory prefix.
/// * `config_path` - Engine configuration file shared by the bank.
/// * `backed` - Whether channels are backed by host storage.
pub fn controller_bank(
    plan: &InterleavePlan,
    prefix: &str,
    config_path: &str,
    backed: bool,
) -> Vec<MemoryController> {
    plan.channels()
        .iter()
        .map(|assignment| {
            MemoryController::new(
                assignment.predicate,
                channel_output_dir(prefix, assignment.channel),
            )
            .with_channel(assignment.channel)
            .with_config_path(config_path)
            .with_backing(backed)
        })
        .collect()
}
