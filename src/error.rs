//! Our error types for the DecaDAC.

use thiserror::Error;

pub type Result<T, I> = core::result::Result<T, Error<I>>;

/// Custom error type for DecaDAC communications.
#[derive(Error, Debug)]
pub enum Error<I: embedded_io::Error> {
    #[error("Serial communication error")]
    Serial(I),
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("Invalid address {0}")]
    Address(i64),
    #[error(transparent)]
    Range(#[from] RangeError),
    #[error("Writing invalid value ({value}) to address {address}")]
    Value { address: u32, value: i64 },
    #[error("Invalid parameter: {0}")]
    InvalidParameter(&'static str),
    #[error("Not supported by this device: {0}")]
    Unsupported(&'static str),
    #[error("Timed out waiting for the device")]
    Timeout,
    #[error("Polling was cancelled")]
    Cancelled,
    #[error("Command or response does not fit in the buffer")]
    BufferOverflow,
}

/// The device answered with something we did not expect.
///
/// After any of these the device's address/slot/channel cursor is in an unknown state, so they
/// are never retried.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Unexpected terminator on response, should end with '!'")]
    MissingTerminator,
    #[error("Empty response")]
    EmptyResponse,
    #[error("Response is not an integer")]
    InvalidInteger,
    #[error("Response is not valid ASCII")]
    Encoding,
    #[error("Failed to set EEPROM address {address}")]
    AddressNotSet { address: u32 },
    #[error("Failed to write value ({value}) to address {address}")]
    WriteFailed { address: u32, value: u32 },
    #[error("DAC slot {slot} may not have been set")]
    SlotNotSet { slot: u8 },
    #[error("DAC channel {slot}/{channel} may not have been set")]
    ChannelNotSet { slot: u8, channel: u8 },
    #[error("Unknown slot mode {0}")]
    UnknownSlotMode(i64),
}

/// A voltage outside of a channel's configured output range.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
#[error("Cannot convert voltage {volt} V to a voltage code, value out of range ({min} V - {max} V)")]
pub struct RangeError {
    pub volt: f64,
    pub min: f64,
    pub max: f64,
}
