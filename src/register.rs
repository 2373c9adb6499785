//! This module is used to define the memory map of the DecaDAC.
//!
//! Memory is a flat space of 32-bit words addressed by integer. Each channel owns a block of 16
//! words starting at `1536 + 64 * slot + 16 * channel`, and a handful of fixed addresses at the
//! top of the space hold the EEPROM identity.

use crate::{
    error::{Error, Result},
    types::ChannelId,
};

/// Highest address the device accepts, inclusive.
pub const MAX_ADDRESS: u32 = 1_107_296_266;

/// Start of the per-channel register blocks.
pub const CHANNEL_BLOCK_BASE: u32 = 1536;

/// Words per channel block.
pub const CHANNEL_BLOCK_SIZE: u32 = 16;

/// __R__ - Reads [`EEPROM_MAGIC`] when an EEPROM is fitted.
pub const EEPROM_IDENTITY: u32 = 1_107_296_256;

/// Value of [`EEPROM_IDENTITY`] on a DAC with an EEPROM.
pub const EEPROM_MAGIC: u64 = 21930;

/// __R__ - Hardware version. Only meaningful with an EEPROM.
pub const HARDWARE_VERSION: u32 = 1_107_296_266;

/// __R__ - Serial number. Only meaningful with an EEPROM.
pub const SERIAL_NUMBER: u32 = 1_107_296_264;

/// Slot EEPROM address read to test for versa-EEPROM access.
pub const VERSA_EEPROM_TEST_ADDRESS: u32 = 6;

/// Slot EEPROM addresses of each channel's power-on value, indexed by channel number.
///
/// __Note:__ These are overwritten by a K3 calibration.
pub const VERSA_INITIAL_VALUE: [u32; 4] = [6, 8, 32774, 32776];

/// Exclusive upper bound of a single memory word.
pub const WORD_LIMIT: i64 = 1 << 32;

/// Registers within a channel block, as offsets from the block base.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u32)]
pub enum ChannelRegister {
    /// __R__ - Update (interrupt) period in microseconds.
    UpdatePeriod = 0,
    /// __R__ - Upper ramp limit, as a DAC code.
    UpperLimit = 4,
    /// __R__ - Lower ramp limit, as a DAC code.
    LowerLimit = 5,
    /// __R__ - Ramp slope. Two words, most significant first. Reads 0 once a ramp is complete.
    Slope = 6,
    /// __R__ - Current output value, as a DAC code.
    Value = 9,
}

impl ChannelRegister {
    /// How many words are read for this register.
    pub const fn words(&self) -> u8 {
        match self {
            ChannelRegister::Slope => 2,
            _ => 1,
        }
    }

    /// Absolute address of this register for the given channel.
    pub const fn address(&self, id: ChannelId) -> u32 {
        id.base_address() + *self as u32
    }
}

/// Check an address lies within the device's memory.
pub fn validate_address<I: embedded_io::Error>(address: i64) -> Result<u32, I> {
    match u32::try_from(address) {
        Ok(valid) if valid <= MAX_ADDRESS => Ok(valid),
        _ => Err(Error::Address(address)),
    }
}

/// Check a value fits in a single memory word.
pub fn validate_word<I: embedded_io::Error>(address: u32, value: i64) -> Result<u32, I> {
    if (0..WORD_LIMIT).contains(&value) {
        Ok(value as u32)
    } else {
        Err(Error::Value { address, value })
    }
}
