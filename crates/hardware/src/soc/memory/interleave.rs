//! Channel partitioning of a memory window.
//!
//! This module computes how one contiguous address window is divided among memory channels.
//! It provides:
//! 1. **Flat mode:** Equal contiguous slices in address order.
//! 2. **Bit-interleaved mode:** Every channel spans the whole window and owns the addresses
//!    whose interleave field (just above the line offset) equals its index, so consecutive
//!    lines round-robin across channels.
//! 3. **Plans:** The ordered `(channel, predicate)` list plus a reverse lookup.

use serde::Deserialize;
use tracing::debug;

use crate::common::addr::{AddressPredicate, AddressRange};
use crate::common::constants::MAX_INTERLEAVE_BITS;
use crate::common::error::{Result, TopologyError};

/// How a window is divided among channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterleaveMode {
    /// Contiguous equal slices.
    #[default]
    Flat,
    /// Line-granularity striping selected by address bits.
    #[serde(alias = "interleaved")]
    BitInterleaved,
}

/// One channel's share of a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelAssignment {
    /// Channel index, `0..channels`.
    pub channel: u32,
    /// Addresses owned by the channel.
    pub predicate: AddressPredicate,
}

/// The result of partitioning a window among channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterleavePlan {
    parent: AddressRange,
    mode: InterleaveMode,
    line_size: u64,
    channels: Vec<ChannelAssignment>,
}

impl InterleavePlan {
    /// The window that was partitioned.
    pub const fn parent(&self) -> AddressRange {
        self.parent
    }

    /// Partitioning mode.
    pub const fn mode(&self) -> InterleaveMode {
        self.mode
    }

    /// Interleave granularity in bytes.
    pub const fn line_size(&self) -> u64 {
        self.line_size
    }

    /// Channel assignments in channel order.
    pub fn channels(&self) -> &[ChannelAssignment] {
        &self.channels
    }

    /// Number of channels.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Returns `true` if the plan has no channels.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Channel owning `addr`, or `None` if `addr` is outside the window.
    pub fn channel_of(&self, addr: u64) -> Option<u32> {
        self.channels
            .iter()
            .find(|c| c.predicate.matches(addr))
            .map(|c| c.channel)
    }
}

/// Computes channel partitions for a fixed line size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterleaveCalculator {
    line_size: u64,
}

impl InterleaveCalculator {
    /// Creates a calculator with the given interleave granularity in bytes.
    pub const fn new(line_size: u64) -> Self {
        Self { line_size }
    }

    /// Partitions `parent` among `channels` channels using `mode`.
    ///
    /// # Arguments
    ///
    /// * `parent` - The window to divide.
    /// * `channels` - Number of channels.
    /// * `mode` - Flat slicing or bit interleaving.
    ///
    /// # Returns
    ///
    /// The plan, or the first precondition that failed.
    pub fn plan(
        &self,
        parent: AddressRange,
        channels: u32,
        mode: InterleaveMode,
    ) -> Result<InterleavePlan> {
        let plan = match mode {
            InterleaveMode::Flat => self.flat(parent, channels)?,
            InterleaveMode::BitInterleaved => self.bit_interleaved(parent, channels)?,
        };
        debug!(
            window = %parent,
            channels,
            ?mode,
            line_size = self.line_size,
            "partitioned memory window"
        );
        Ok(plan)
    }

    /// Divides `parent` into `channels` equal contiguous slices.
    pub fn flat(&self, parent: AddressRange, channels: u32) -> Result<InterleavePlan> {
        let slices = parent
            .split_flat(u64::from(channels))
            .map_err(|_| TopologyError::ChannelCountDoesNotDivide {
                size: parent.size(),
                channels,
            })?;
        Ok(InterleavePlan {
            parent,
            mode: InterleaveMode::Flat,
            line_size: self.line_size,
            channels: (0..channels)
                .zip(slices)
                .map(|(channel, slice)| ChannelAssignment {
                    channel,
                    predicate: AddressPredicate::Range(slice),
                })
                .collect(),
        })
    }

    /// Stripes `parent` across `channels` channels at line granularity.
    pub fn bit_interleaved(&self, parent: AddressRange, channels: u32) -> Result<InterleavePlan> {
        let (bits, high_bit) = self.field_for(channels)?;
        let channels = (0..channels)
            .map(|channel| {
                AddressPredicate::interleaved(parent, bits, high_bit, channel)
                    .map(|predicate| ChannelAssignment { channel, predicate })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(InterleavePlan {
            parent,
            mode: InterleaveMode::BitInterleaved,
            line_size: self.line_size,
            channels,
        })
    }

    /// Interleave field `(bits, high_bit)` for `channels` channels.
    ///
    /// `bits = log2(channels)` and `high_bit = log2(line_size) + bits - 1`.
    pub fn field_for(&self, channels: u32) -> Result<(u32, u32)> {
        if !channels.is_power_of_two() {
            return Err(TopologyError::ChannelCountNotPowerOfTwo { channels });
        }
        if !self.line_size.is_power_of_two() {
            return Err(TopologyError::LineSizeNotPowerOfTwo {
                line_size: self.line_size,
            });
        }
        let bits = channels.trailing_zeros();
        let line_bits = self.line_size.trailing_zeros();
        let high_bit = (line_bits + bits).saturating_sub(1);
        if bits > MAX_INTERLEAVE_BITS || high_bit >= u64::BITS {
            return Err(TopologyError::InterleaveBitsOutOfRange { high_bit });
        }
        Ok((bits, high_bit))
    }
}
