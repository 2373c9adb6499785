//! Reading and writing words of the DAC's memory.
//!
//! Access goes through the device's address cursor: `A{address};` moves it, then `p;`/`P{value};`
//! read or write main memory, and `e;`/`E{value};` the selected slot's EEPROM.

use log::debug;

use crate::{
    command::{self, Command},
    dac::Decadac,
    error::{Error, ProtocolError, Result},
    register,
};

/// Which memory an access goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryBank {
    /// The DAC's main memory.
    Main,
    /// The EEPROM on a slot's VERSADAC board.
    VersaEeprom { slot: u8 },
}

impl MemoryBank {
    fn query(&self) -> Command {
        match self {
            MemoryBank::Main => Command::ReadMemory,
            MemoryBank::VersaEeprom { .. } => Command::ReadVersaEeprom,
        }
    }

    fn write(&self, value: u32) -> Command {
        match self {
            MemoryBank::Main => Command::WriteMemory(value),
            MemoryBank::VersaEeprom { .. } => Command::WriteVersaEeprom(value),
        }
    }
}

/// Interpret a returned word. Negative 32-bit answers are taken as two's complement.
fn parse_word(raw: &str) -> core::result::Result<u32, ProtocolError> {
    let value = command::parse_integer_response(raw)?;
    u32::try_from(value)
        .or_else(|_| i32::try_from(value).map(|signed| signed as u32))
        .map_err(|_| ProtocolError::InvalidInteger)
}

impl<S: embedded_io::Read + embedded_io::Write, const L: usize> Decadac<S, L> {
    /// Read `word_count` consecutive words starting at `address`, most significant first.
    ///
    /// Reading zero words returns 0 without talking to the device. At most two words fit in the
    /// result.
    pub fn read_address(
        &mut self,
        address: i64,
        word_count: u8,
        bank: MemoryBank,
    ) -> Result<u64, S::Error> {
        if word_count == 0 {
            return Ok(0);
        }
        if word_count > 2 {
            return Err(Error::InvalidParameter("at most 2 words can be read at once"));
        }
        let start = register::validate_address::<S::Error>(address)?;

        if let MemoryBank::VersaEeprom { slot } = bank {
            self.select_slot(slot)?;
        }

        let mut value: u64 = 0;
        for offset in 0..u32::from(word_count) {
            let address = start + offset;
            self.set_address_cursor(address)?;
            let response = self.ask_commands(&[bank.query()])?;
            let word = parse_word(&response)?;
            value = (value << 32) | u64::from(word);
        }
        debug!(
            "{}: read {value} from {start} ({word_count} words, {bank:?})",
            self.config().name()
        );
        Ok(value)
    }

    /// Write a single word to `address`, then read it back to confirm.
    pub fn write_address(
        &mut self,
        address: i64,
        value: i64,
        bank: MemoryBank,
    ) -> Result<(), S::Error> {
        let address = register::validate_address::<S::Error>(address)?;
        let value = register::validate_word::<S::Error>(address, value)?;

        if let MemoryBank::VersaEeprom { slot } = bank {
            self.select_slot(slot)?;
        }

        self.set_address_cursor(address)?;
        self.ask_commands(&[bank.write(value)])?;
        let response = self.ask_commands(&[bank.query()])?;
        if parse_word(&response)? != value {
            return Err(ProtocolError::WriteFailed { address, value }.into());
        }
        debug!(
            "{}: wrote {value} to {address} ({bank:?})",
            self.config().name()
        );
        Ok(())
    }

    /// Point the device's address cursor at `address`, confirming the echo.
    fn set_address_cursor(&mut self, address: u32) -> Result<(), S::Error> {
        let response = self.ask_commands(&[Command::SetAddress(address)])?;
        let echoed = command::parse_integer_response(&response)?;
        if echoed != i64::from(address) {
            return Err(ProtocolError::AddressNotSet { address }.into());
        }
        Ok(())
    }
}
