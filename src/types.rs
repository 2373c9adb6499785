//! This module contains types describing the DecaDAC's slots and channels.

use strum_macros::{Display, EnumCount, EnumIter, EnumString, IntoStaticStr};

use crate::{
    error::ProtocolError,
    register::{CHANNEL_BLOCK_BASE, CHANNEL_BLOCK_SIZE},
};

/// Number of slots in a DecaDAC.
pub const SLOT_COUNT: u8 = 5;

/// Number of channels in each slot.
pub const CHANNELS_PER_SLOT: u8 = 4;

/// Operating mode of a slot.
///
/// The device offers no reliable read-back of the mode, so the driver caches whatever it last
/// set. See [`DacSlot::mode`](crate::slot::DacSlot::mode).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Display,
    EnumCount,
    EnumIter,
    EnumString,
    IntoStaticStr,
)]
#[repr(u8)]
pub enum SlotMode {
    /// Channel outputs are disconnected from the input and grounded with 10MOhm.
    Off = 0,
    /// 2-channel mode. Channels 0 and 1 are outputs, 2 and 3 fine-adjust them.
    Fine = 1,
    /// All 4 channels are used as outputs.
    #[default]
    Coarse = 2,
    /// Calibrated 2-channel mode. Only available on DACs which support calibration.
    FineCald = 3,
}

impl SlotMode {
    /// Whether this mode needs a calibrated DAC.
    pub const fn requires_calibration(&self) -> bool {
        matches!(self, SlotMode::FineCald)
    }
}

impl From<SlotMode> for u8 {
    fn from(value: SlotMode) -> Self {
        value as u8
    }
}

impl TryFrom<i64> for SlotMode {
    type Error = ProtocolError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SlotMode::Off),
            1 => Ok(SlotMode::Fine),
            2 => Ok(SlotMode::Coarse),
            3 => Ok(SlotMode::FineCald),
            other => Err(ProtocolError::UnknownSlotMode(other)),
        }
    }
}

/// Identifies one output channel by slot and channel-within-slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId {
    slot: u8,
    channel: u8,
}

impl ChannelId {
    /// Returns `None` if either index is out of range.
    pub const fn new(slot: u8, channel: u8) -> Option<Self> {
        if slot < SLOT_COUNT && channel < CHANNELS_PER_SLOT {
            Some(Self { slot, channel })
        } else {
            None
        }
    }

    pub const fn slot(&self) -> u8 {
        self.slot
    }

    pub const fn channel(&self) -> u8 {
        self.channel
    }

    /// Position in declaration order: slots ascending, then channels within a slot.
    pub const fn index(&self) -> usize {
        (self.slot * CHANNELS_PER_SLOT + self.channel) as usize
    }

    /// First word of this channel's register block.
    pub const fn base_address(&self) -> u32 {
        CHANNEL_BLOCK_BASE
            + (CHANNEL_BLOCK_SIZE * CHANNELS_PER_SLOT as u32) * self.slot as u32
            + CHANNEL_BLOCK_SIZE * self.channel as u32
    }

    /// The channels of `slot`, which must be below [`SLOT_COUNT`].
    pub(crate) fn of_slot(slot: u8) -> [ChannelId; CHANNELS_PER_SLOT as usize] {
        core::array::from_fn(|channel| ChannelId {
            slot,
            channel: channel as u8,
        })
    }

    /// Every channel of the DAC in declaration order.
    pub fn all() -> impl Iterator<Item = ChannelId> {
        (0..SLOT_COUNT).flat_map(|slot| {
            (0..CHANNELS_PER_SLOT).map(move |channel| ChannelId { slot, channel })
        })
    }
}

impl core::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Slot{}/Chan{}", self.slot, self.channel)
    }
}
