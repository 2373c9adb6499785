//! This crate provides an interface for communicating with and controlling the Harvard DecaDAC,
//! a 20 channel voltage source built at Harvard.
//!
//! The DAC has 5 slots of 4 channels each. Every channel outputs a 16-bit code spread over its
//! voltage range, and can ramp between values by itself once given a limit and a slope.
//!
//! It talks the DecaDAC's ASCII command language, and works over any byte stream implementing
//! [embedded_io::Read] & [embedded_io::Write], typically a serial port or a USB serial adapter.
//!
//! Serial parameters (baud rate, parity...) are not touched by this crate, configure the port to
//! match the DAC before handing it over.
//!
//! ```no_run
//! # fn demo<S: embedded_io::Read + embedded_io::Write>(port: S) -> harvard_decadac::error::Result<(), S::Error> {
//! use harvard_decadac::{config::DacConfig, dac::Decadac, types::ChannelId};
//!
//! let mut dac: Decadac<S> = Decadac::new(port, DacConfig::default())?;
//! let id = ChannelId::new(0, 1).unwrap();
//! dac.channel(id).set_volt(1.25)?;
//! dac.channel(id).ramp(-0.5, 0.1, true)?;
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod command;
pub mod config;
pub mod dac;
pub mod error;
pub mod features;
pub mod memory;
pub mod ramp;
pub mod register;
mod select;
pub mod slot;
pub mod types;
pub mod voltage;

#[cfg(test)]
mod mock_serial;
