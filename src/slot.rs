//! Slots: groups of 4 channels sharing an operating mode.

use log::debug;

use crate::{
    channel::{Channel, DacChannel},
    command::{self, Command},
    dac::Decadac,
    error::{Error, Result},
    types::{CHANNELS_PER_SLOT, ChannelId, SlotMode},
    voltage::VoltageRange,
};

/// Host-side state of a slot.
#[derive(Debug, Clone)]
pub(crate) struct Slot {
    /// Last mode written. The device cannot be trusted to report it.
    mode: SlotMode,
    channels: [Channel; CHANNELS_PER_SLOT as usize],
}

impl Slot {
    pub(crate) fn new(index: u8, range: VoltageRange) -> Self {
        Self {
            mode: SlotMode::default(),
            channels: ChannelId::of_slot(index).map(|id| Channel::new(id, range)),
        }
    }

    pub(crate) fn channel(&self, channel: u8) -> &Channel {
        &self.channels[channel as usize]
    }

    pub(crate) fn channel_mut(&mut self, channel: u8) -> &mut Channel {
        &mut self.channels[channel as usize]
    }

    pub(crate) fn channels_mut(&mut self) -> impl Iterator<Item = &mut Channel> {
        self.channels.iter_mut()
    }
}

/// A slot of a connected DAC, borrowed from [`Decadac::slot`].
pub struct DacSlot<'a, S: embedded_io::Read + embedded_io::Write, const L: usize> {
    dac: &'a mut Decadac<S, L>,
    index: u8,
}

impl<'a, S: embedded_io::Read + embedded_io::Write, const L: usize> DacSlot<'a, S, L> {
    pub(crate) fn new(dac: &'a mut Decadac<S, L>, index: u8) -> Self {
        Self { dac, index }
    }

    pub fn index(&self) -> u8 {
        self.index
    }

    /// The mode this slot was last set to.
    pub fn mode(&self) -> SlotMode {
        self.dac.slot_state(self.index).mode
    }

    /// Put the slot into `mode`.
    ///
    /// [`SlotMode::FineCald`] is refused without calibration support, before anything is sent.
    pub fn set_mode(&mut self, mode: SlotMode) -> Result<(), S::Error> {
        if mode.requires_calibration() && !self.dac.features().calibration_supported {
            return Err(Error::Unsupported("FineCald mode needs calibration support"));
        }
        let response = self
            .dac
            .ask_slot(self.index, &[Command::SetSlotMode(mode.into())])?;
        command::parse_response(&response)?;
        self.dac.slot_state_mut(self.index).mode = mode;
        debug!("{}: slot {} set to {mode}", self.dac.config().name(), self.index);
        Ok(())
    }

    /// Ask the device for the slot's mode with `m;`.
    ///
    /// This does not touch the cached [`Self::mode`].
    pub fn query_mode(&mut self) -> Result<SlotMode, S::Error> {
        let response = self.dac.ask_slot(self.index, &[Command::GetSlotMode])?;
        let value = command::parse_integer_response(&response)?;
        Ok(SlotMode::try_from(value)?)
    }

    /// Send a raw command to this slot.
    pub fn ask(&mut self, command: &str) -> Result<heapless::String<L>, S::Error> {
        self.dac.ask_slot_raw(self.index, command)
    }

    /// Access one of this slot's channels (0 - 3).
    pub fn channel(&mut self, channel: u8) -> Result<DacChannel<'_, S, L>, S::Error> {
        let id = ChannelId::new(self.index, channel)
            .ok_or(Error::InvalidParameter("channel index must be 0 - 3"))?;
        Ok(self.dac.channel(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dac::tests::connected,
        error::ProtocolError,
        mock_serial::{MockSerialError, DeviceAnswers},
    };
    use strum::IntoEnumIterator;

    #[test]
    fn test_set_mode_caches() {
        let mut dac = connected(DeviceAnswers::BARE);
        dac.interface_mut().queue_responses(&["B3!", "M1!"]);
        let mut slot = dac.slot(3).unwrap();
        slot.set_mode(SlotMode::Fine).unwrap();
        assert_eq!(slot.mode(), SlotMode::Fine);
        assert_eq!(dac.interface_mut().written_str(), "B3;M1;");
        assert_eq!(dac.slot(2).unwrap().mode(), SlotMode::Coarse);
    }

    #[test]
    fn test_fine_cald_needs_calibration() {
        let mut dac = connected(DeviceAnswers::BARE);
        let result = dac.slot(0).unwrap().set_mode(SlotMode::FineCald);
        assert!(matches!(result, Err(Error::Unsupported(_))));
        assert!(dac.interface_mut().written_data().is_empty());
        assert_eq!(dac.slot(0).unwrap().mode(), SlotMode::Coarse);

        let mut dac = connected(DeviceAnswers::FULL);
        dac.interface_mut().queue_responses(&["B0!", "M3!"]);
        dac.slot(0).unwrap().set_mode(SlotMode::FineCald).unwrap();
        assert_eq!(dac.slot(0).unwrap().mode(), SlotMode::FineCald);
    }

    #[test]
    fn test_every_mode_is_sent_by_number() {
        let mut dac = connected(DeviceAnswers::FULL);
        let mut expected = String::new();
        for mode in SlotMode::iter() {
            let number = u8::from(mode);
            dac.interface_mut()
                .queue_responses(&["B1!", &format!("M{number}!")]);
            dac.slot(1).unwrap().set_mode(mode).unwrap();
            expected.push_str(&format!("B1;M{number};"));
        }
        assert_eq!(dac.interface_mut().written_str(), expected);
    }

    #[test]
    fn test_malformed_mode_response_keeps_cache() {
        let mut dac = connected(DeviceAnswers::BARE);
        dac.interface_mut().queue_responses(&["B0!", "M0"]);
        let result: Result<(), MockSerialError> = dac.slot(0).unwrap().set_mode(SlotMode::Off);
        assert!(matches!(
            result,
            Err(Error::Protocol(ProtocolError::MissingTerminator))
        ));
        assert_eq!(dac.slot(0).unwrap().mode(), SlotMode::Coarse);
    }

    #[test]
    fn test_query_mode() {
        let mut dac = connected(DeviceAnswers::BARE);
        dac.interface_mut()
            .queue_responses(&["B4!", "m0!", "B4!", "m9!"]);
        let mut slot = dac.slot(4).unwrap();
        assert_eq!(slot.query_mode().unwrap(), SlotMode::Off);
        // Querying leaves the cached mode alone.
        assert_eq!(slot.mode(), SlotMode::Coarse);
        assert!(matches!(
            slot.query_mode(),
            Err(Error::Protocol(ProtocolError::UnknownSlotMode(9)))
        ));
        assert_eq!(dac.interface_mut().written_str(), "B4;m;B4;m;");
    }

    #[test]
    fn test_slot_channel_bounds() {
        let mut dac = connected(DeviceAnswers::BARE);
        let mut slot = dac.slot(2).unwrap();
        assert_eq!(slot.channel(3).unwrap().id(), ChannelId::new(2, 3).unwrap());
        assert!(matches!(slot.channel(4), Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn test_raw_slot_command() {
        let mut dac = connected(DeviceAnswers::BARE);
        dac.interface_mut().queue_responses(&["B1!", "m2!"]);
        let response = dac.slot(1).unwrap().ask("m;").unwrap();
        assert_eq!(response.as_str(), "m2!");
        assert_eq!(dac.interface_mut().written_str(), "B1;m;");
    }
}
