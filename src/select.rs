//! Slot and channel selection.
//!
//! The DAC applies slot and channel commands to whichever slot/channel was last selected. The
//! driver keeps no memory of that cursor: every scoped command re-sends the selection, checking
//! the echo, in the same logical operation.

use log::trace;

use crate::{
    command::{self, Command},
    dac::Decadac,
    error::{ProtocolError, Result},
    types::ChannelId,
};

impl<S: embedded_io::Read + embedded_io::Write, const L: usize> Decadac<S, L> {
    /// Make `slot` the active slot.
    pub(crate) fn select_slot(&mut self, slot: u8) -> Result<(), S::Error> {
        let response = self.ask_commands(&[Command::SelectSlot(slot)])?;
        let echoed = command::parse_integer_response(&response)?;
        if echoed != i64::from(slot) {
            return Err(ProtocolError::SlotNotSet { slot }.into());
        }
        trace!("{}: selected slot {slot}", self.config().name());
        Ok(())
    }

    /// Make `id` the active slot and channel.
    pub(crate) fn select_channel(&mut self, id: ChannelId) -> Result<(), S::Error> {
        let prefix = [
            Command::SelectSlot(id.slot()),
            Command::SelectChannel(id.channel()),
        ];
        let response = self.ask_commands(&prefix)?;
        let expected = command::encode_echo::<L, S::Error>(&prefix)?;
        if response.trim() != expected.as_str() {
            return Err(ProtocolError::ChannelNotSet {
                slot: id.slot(),
                channel: id.channel(),
            }
            .into());
        }
        trace!("{}: selected {id}", self.config().name());
        Ok(())
    }

    /// Send commands to a slot, selecting it first.
    pub(crate) fn ask_slot(
        &mut self,
        slot: u8,
        commands: &[Command],
    ) -> Result<heapless::String<L>, S::Error> {
        self.select_slot(slot)?;
        self.ask_commands(commands)
    }

    /// Send commands to a channel, selecting it first.
    pub(crate) fn ask_channel(
        &mut self,
        id: ChannelId,
        commands: &[Command],
    ) -> Result<heapless::String<L>, S::Error> {
        self.select_channel(id)?;
        self.ask_commands(commands)
    }

    /// Send a raw command string to a channel, selecting it first.
    pub(crate) fn ask_channel_raw(
        &mut self,
        id: ChannelId,
        command: &str,
    ) -> Result<heapless::String<L>, S::Error> {
        self.select_channel(id)?;
        self.ask(command)
    }

    /// Send a raw command string to a slot, selecting it first.
    pub(crate) fn ask_slot_raw(
        &mut self,
        slot: u8,
        command: &str,
    ) -> Result<heapless::String<L>, S::Error> {
        self.select_slot(slot)?;
        self.ask(command)
    }
}
