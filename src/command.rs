//! The DecaDAC's textual command language.
//!
//! Every command is a single letter followed by an optional argument and a `;`. Several commands
//! may be sent in one transaction, e.g. `U65535;L0;D1234;`. The device answers each one with
//! `<letter><value>!`, concatenated in the order they were issued.

use core::fmt::{self, Write};

use crate::error::{Error, ProtocolError, Result};

/// A single command understood by the DecaDAC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `B{slot};` - Select the active slot.
    SelectSlot(u8),
    /// `C{channel};` - Select the active channel within the active slot.
    SelectChannel(u8),
    /// `A{address};` - Move the memory cursor.
    SetAddress(u32),
    /// `p;` - Read the word under the cursor from main memory.
    ReadMemory,
    /// `e;` - Read the word under the cursor from the active slot's EEPROM.
    ReadVersaEeprom,
    /// `P{value};` - Write a word to main memory.
    WriteMemory(u32),
    /// `E{value};` - Write a word to the active slot's EEPROM.
    WriteVersaEeprom(u32),
    /// `M{mode};` - Set the active slot's mode.
    SetSlotMode(u8),
    /// `m;` - Get the active slot's mode.
    GetSlotMode,
    /// `U{code};` - Upper ramp limit of the active channel.
    UpperLimit(u16),
    /// `L{code};` - Lower ramp limit of the active channel.
    LowerLimit(u16),
    /// `S{slope};` - Ramp slope of the active channel.
    Slope(i64),
    /// `T{period};` - Update period of the active channel, in microseconds.
    UpdatePeriod(u16),
    /// `D{code};` - Set the active channel's output code directly.
    DirectSet(u16),
    /// `k;` - Ask whether calibration is supported.
    CalibrationCheck,
}

impl Command {
    /// The letter this command is sent with, which is also what the device echoes back.
    pub const fn letter(&self) -> char {
        match self {
            Command::SelectSlot(_) => 'B',
            Command::SelectChannel(_) => 'C',
            Command::SetAddress(_) => 'A',
            Command::ReadMemory => 'p',
            Command::ReadVersaEeprom => 'e',
            Command::WriteMemory(_) => 'P',
            Command::WriteVersaEeprom(_) => 'E',
            Command::SetSlotMode(_) => 'M',
            Command::GetSlotMode => 'm',
            Command::UpperLimit(_) => 'U',
            Command::LowerLimit(_) => 'L',
            Command::Slope(_) => 'S',
            Command::UpdatePeriod(_) => 'T',
            Command::DirectSet(_) => 'D',
            Command::CalibrationCheck => 'k',
        }
    }

    fn write_argument(&self, f: &mut impl Write) -> fmt::Result {
        match *self {
            Command::SelectSlot(v) | Command::SelectChannel(v) | Command::SetSlotMode(v) => {
                write!(f, "{v}")
            }
            Command::SetAddress(v) | Command::WriteMemory(v) | Command::WriteVersaEeprom(v) => {
                write!(f, "{v}")
            }
            Command::UpperLimit(v)
            | Command::LowerLimit(v)
            | Command::UpdatePeriod(v)
            | Command::DirectSet(v) => write!(f, "{v}"),
            Command::Slope(v) => write!(f, "{v}"),
            Command::ReadMemory
            | Command::ReadVersaEeprom
            | Command::GetSlotMode
            | Command::CalibrationCheck => Ok(()),
        }
    }

    /// The `<letter><argument>!` block the device answers a command with when it accepted it
    /// verbatim, as for slot and channel selection.
    pub fn write_echo(&self, f: &mut impl Write) -> fmt::Result {
        f.write_char(self.letter())?;
        self.write_argument(f)?;
        f.write_char('!')
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char(self.letter())?;
        self.write_argument(f)?;
        f.write_char(';')
    }
}

/// Render a sequence of commands into a single transaction.
pub fn encode<const L: usize, I: embedded_io::Error>(
    commands: &[Command],
) -> Result<heapless::String<L>, I> {
    let mut out: heapless::String<L> = heapless::String::new();
    for command in commands {
        write!(out, "{command}").map_err(|_| Error::BufferOverflow)?;
    }
    Ok(out)
}

/// Render the echo the device gives for a sequence of accepted commands.
pub fn encode_echo<const L: usize, I: embedded_io::Error>(
    commands: &[Command],
) -> Result<heapless::String<L>, I> {
    let mut out: heapless::String<L> = heapless::String::new();
    for command in commands {
        command
            .write_echo(&mut out)
            .map_err(|_| Error::BufferOverflow)?;
    }
    Ok(out)
}

/// Parse a response of the form `<cmd><value>!`, returning `<value>`.
///
/// Surrounding whitespace is ignored. For concatenated responses only the leading letter and the
/// final `!` are removed.
pub fn parse_response(raw: &str) -> core::result::Result<&str, ProtocolError> {
    let body = raw
        .trim()
        .strip_suffix('!')
        .ok_or(ProtocolError::MissingTerminator)?;
    let mut chars = body.chars();
    chars.next();
    Ok(chars.as_str())
}

/// Parse the integer payload of a response.
pub fn parse_integer(payload: &str) -> core::result::Result<i64, ProtocolError> {
    payload
        .trim()
        .parse::<i64>()
        .map_err(|_| ProtocolError::InvalidInteger)
}

/// Parse a single response and return its integer payload.
pub fn parse_integer_response(raw: &str) -> core::result::Result<i64, ProtocolError> {
    parse_integer(parse_response(raw)?)
}
