use log::{debug, info, trace};

use crate::{
    channel::{Channel, DacChannel},
    command::{self, Command},
    config::DacConfig,
    error::{Error, ProtocolError, Result},
    features::{Features, Identity},
    ramp::{Clock, Poll, StdClock},
    register::VERSA_INITIAL_VALUE,
    slot::{DacSlot, Slot},
    types::{ChannelId, SLOT_COUNT},
};

/// You can create a Decadac using any interface which implements [embedded_io::Read] & [embedded_io::Write].
///
/// The DAC echoes every command, and the driver always reads that echo before sending anything
/// else, so there is never more than one transaction in flight. `L` is the capacity of the
/// command and response buffers.
///
/// Getters read a value back from the device and `set_*` methods write one. Slot and
/// channel operations are reached through [`Self::slot`] and [`Self::channel`].
pub struct Decadac<S: embedded_io::Read + embedded_io::Write, const L: usize = 64> {
    interface: S,
    config: DacConfig,
    clock: Box<dyn Clock + Send>,
    features: Features,
    identity: Identity,
    slots: [Slot; SLOT_COUNT as usize],
}

impl<S: embedded_io::Read + embedded_io::Write, const L: usize> Decadac<S, L> {
    /// Connect to a DAC over `interface`.
    ///
    /// This detects the device's features, then puts every slot into the configured default
    /// mode.
    pub fn new(interface: S, config: DacConfig) -> Result<Self, S::Error> {
        Self::with_clock(interface, config, Box::new(StdClock::default()))
    }

    /// As [`Self::new`], timing ramps against `clock`.
    pub fn with_clock(
        interface: S,
        config: DacConfig,
        mut clock: Box<dyn Clock + Send>,
    ) -> Result<Self, S::Error> {
        let started = clock.now();
        let range = config.range();
        let mut dac = Self {
            interface,
            config,
            clock,
            features: Features::default(),
            identity: Identity::default(),
            slots: core::array::from_fn(|index| Slot::new(index as u8, range)),
        };

        let (features, identity) = dac.detect_features();
        dac.features = features;
        dac.identity = identity;

        // Channels only get an initial value register once we know the slot EEPROMs are there.
        if features.versa_eeprom_available {
            for slot in dac.slots.iter_mut() {
                for channel in slot.channels_mut() {
                    let address = VERSA_INITIAL_VALUE[channel.id().channel() as usize];
                    channel.set_initial_value_address(Some(address));
                }
            }
        }

        let mode = dac.config.default_slot_mode();
        for index in 0..SLOT_COUNT {
            dac.slot(index)?.set_mode(mode)?;
        }

        let elapsed = dac
            .clock
            .now()
            .checked_duration_since(started)
            .map_or(0, |duration| duration.ticks());
        info!(
            "Connected to Harvard DecaDAC {} (hw ver: {}, serial: {}) in {:.2}s",
            dac.config.name(),
            dac.identity.hardware_version,
            dac.identity.serial_number,
            elapsed as f64 / 1e6
        );
        Ok(dac)
    }

    /// Give back the underlying interface.
    pub fn release(self) -> S {
        self.interface
    }

    pub fn config(&self) -> &DacConfig {
        &self.config
    }

    /// Capabilities found while connecting.
    pub fn features(&self) -> Features {
        self.features
    }

    /// Serial number and hardware version found while connecting. Both are 0 without an EEPROM.
    pub fn identity(&self) -> Identity {
        self.identity
    }

    /// Identify the DAC. There is no `*IDN?` on this device, so this re-runs feature detection.
    ///
    /// Capabilities stay as they were found while connecting.
    pub fn get_idn(&mut self) -> Identity {
        let (_, identity) = self.detect_features();
        self.identity = identity;
        identity
    }

    /// Access a slot by index (0 - 4).
    pub fn slot(&mut self, index: u8) -> Result<DacSlot<'_, S, L>, S::Error> {
        if index >= SLOT_COUNT {
            return Err(Error::InvalidParameter("slot index must be 0 - 4"));
        }
        Ok(DacSlot::new(self, index))
    }

    /// Access a channel.
    pub fn channel(&mut self, id: ChannelId) -> DacChannel<'_, S, L> {
        DacChannel::new(self, id)
    }

    /// Set every channel to `volt`.
    ///
    /// Channels with ramping enabled ramp one after another, not simultaneously.
    pub fn set_all(&mut self, volt: f64) -> Result<(), S::Error> {
        for id in ChannelId::all() {
            self.channel(id).set_volt(volt)?;
        }
        Ok(())
    }

    /// Ramp every channel to `volt` at `rate` volts per second.
    ///
    /// All ramps are armed first, then each channel is polled in turn until its slope reads
    /// zero. Ramps start as soon as their commands are in, so they are not synchronised.
    pub fn ramp_all(&mut self, volt: f64, rate: f64) -> Result<(), S::Error> {
        for id in ChannelId::all() {
            self.channel(id).ramp(volt, rate, false)?;
        }
        debug!("{}: waiting for {} ramps", self.config.name(), ChannelId::all().count());
        let policy = self.config.poll_policy().clone();
        let poll = Poll::start(&policy, self.clock.as_mut());
        for id in ChannelId::all() {
            while self.channel(id).slope()? != 0 {
                poll.tick::<S::Error>(self.clock.as_mut())?;
            }
            self.channel_state_mut(id).finish_ramp();
        }
        Ok(())
    }

    /// Send a command and return the response line.
    ///
    /// Nothing is selected first, see [`DacSlot::ask`] and [`DacChannel::ask`] for that.
    pub fn ask(&mut self, command: &str) -> Result<heapless::String<L>, S::Error> {
        self.interface
            .write_all(command.as_bytes())
            .map_err(Error::Serial)?;

        // Read one byte at a time so we never consume part of the next response.
        let terminator = self.config.terminator();
        let mut line: heapless::Vec<u8, L> = heapless::Vec::new();
        let mut byte = [0u8; 1];
        loop {
            match self.interface.read(&mut byte) {
                Ok(0) => {
                    if line.is_empty() {
                        return Err(ProtocolError::EmptyResponse.into());
                    }
                    break;
                }
                Ok(_) => {
                    if byte[0] == terminator {
                        break;
                    }
                    line.push(byte[0]).map_err(|_| Error::BufferOverflow)?;
                }
                Err(e) => {
                    // If WouldBlock and we have some data, treat it as the whole response.
                    if matches!(
                        embedded_io::Error::kind(&e),
                        embedded_io::ErrorKind::Other | embedded_io::ErrorKind::TimedOut
                    ) && !line.is_empty()
                    {
                        break;
                    }
                    return Err(Error::Serial(e));
                }
            }
        }

        let response =
            heapless::String::from_utf8(line).map_err(|_| ProtocolError::Encoding)?;
        trace!("{}: {command:?} -> {:?}", self.config.name(), response.as_str());
        Ok(response)
    }

    /// Send a command. The DAC echoes everything, so this still reads and returns the response.
    pub fn write(&mut self, command: &str) -> Result<heapless::String<L>, S::Error> {
        self.ask(command)
    }

    /// Send a sequence of commands as one transaction.
    pub(crate) fn ask_commands(
        &mut self,
        commands: &[Command],
    ) -> Result<heapless::String<L>, S::Error> {
        let wire = command::encode::<L, S::Error>(commands)?;
        self.ask(&wire)
    }

    pub(crate) fn clock_mut(&mut self) -> &mut (dyn Clock + Send) {
        self.clock.as_mut()
    }

    pub(crate) fn slot_state(&self, index: u8) -> &Slot {
        &self.slots[index as usize]
    }

    pub(crate) fn slot_state_mut(&mut self, index: u8) -> &mut Slot {
        &mut self.slots[index as usize]
    }

    pub(crate) fn channel_state(&self, id: ChannelId) -> &Channel {
        self.slot_state(id.slot()).channel(id.channel())
    }

    pub(crate) fn channel_state_mut(&mut self, id: ChannelId) -> &mut Channel {
        self.slot_state_mut(id.slot()).channel_mut(id.channel())
    }

    #[cfg(test)]
    pub(crate) fn interface_mut(&mut self) -> &mut S {
        &mut self.interface
    }
}
