//! Output channels.
//!
//! Channel settings live in two places. The ramp configuration (`enable_ramp`, `ramp_rate`) is
//! host-side only, everything else is read from or written to the channel's register block on
//! every call.

use fugit::MicrosDurationU32;
use log::debug;

use crate::{
    command::{self, Command},
    dac::Decadac,
    error::{Error, Result},
    memory::MemoryBank,
    ramp::{Poll, RampLimit, RampPlan, RampState, SLOPE_LIMIT},
    register::ChannelRegister,
    types::ChannelId,
    voltage::{MAX_CODE, VoltageRange},
};

/// Shortest update period the device accepts, in microseconds.
pub const MIN_UPDATE_PERIOD_US: u32 = 50;

/// Longest update period the device accepts, in microseconds.
pub const MAX_UPDATE_PERIOD_US: u32 = 65535;

/// Fastest ramp rate accepted by [`DacChannel::ramp`] and [`DacChannel::set_ramp_rate`], in
/// volts per second.
pub const MAX_RAMP_RATE: f64 = 10.0;

/// Host-side state of a channel.
#[derive(Debug, Clone)]
pub(crate) struct Channel {
    id: ChannelId,
    range: VoltageRange,
    enable_ramp: bool,
    /// Volts per second.
    ramp_rate: f64,
    /// Slot EEPROM address of the power-on value, only known with versa EEPROM access.
    initial_value_address: Option<u32>,
    ramp_state: RampState,
}

impl Channel {
    pub(crate) fn new(id: ChannelId, range: VoltageRange) -> Self {
        Self {
            id,
            range,
            enable_ramp: false,
            ramp_rate: 0.1,
            initial_value_address: None,
            ramp_state: RampState::Idle,
        }
    }

    pub(crate) fn id(&self) -> ChannelId {
        self.id
    }

    pub(crate) fn set_initial_value_address(&mut self, address: Option<u32>) {
        self.initial_value_address = address;
    }

    pub(crate) fn finish_ramp(&mut self) {
        self.ramp_state = RampState::Idle;
    }
}

/// A channel of a connected DAC, borrowed from [`Decadac::channel`].
///
/// Every call which talks to the device selects this channel first.
pub struct DacChannel<'a, S: embedded_io::Read + embedded_io::Write, const L: usize> {
    dac: &'a mut Decadac<S, L>,
    id: ChannelId,
}

impl<'a, S: embedded_io::Read + embedded_io::Write, const L: usize> DacChannel<'a, S, L> {
    pub(crate) fn new(dac: &'a mut Decadac<S, L>, id: ChannelId) -> Self {
        Self { dac, id }
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn range(&self) -> VoltageRange {
        self.state().range
    }

    fn state(&self) -> &Channel {
        self.dac.channel_state(self.id)
    }

    fn state_mut(&mut self) -> &mut Channel {
        self.dac.channel_state_mut(self.id)
    }

    /// Read a single-word register of this channel.
    fn read_word(&mut self, register: ChannelRegister) -> Result<u32, S::Error> {
        let value = self.dac.read_address(
            i64::from(register.address(self.id)),
            1,
            MemoryBank::Main,
        )?;
        // A single word always fits.
        Ok(value as u32)
    }

    /// Select this channel, send `commands` and check the device answered.
    fn send(&mut self, commands: &[Command]) -> Result<(), S::Error> {
        let response = self.dac.ask_channel(self.id, commands)?;
        command::parse_response(&response)?;
        Ok(())
    }

    /// The current output voltage.
    pub fn volt(&mut self) -> Result<f64, S::Error> {
        let code = self.read_word(ChannelRegister::Value)?;
        Ok(self.range().code_to_volt(code))
    }

    /// Set the output voltage.
    ///
    /// With ramping enabled this ramps at [`Self::ramp_rate`] and blocks until the ramp is done,
    /// otherwise the output jumps straight to `volt`.
    pub fn set_volt(&mut self, volt: f64) -> Result<(), S::Error> {
        let range = self.range();
        let code = range.volt_to_code(volt)?;

        if self.state().enable_ramp {
            let rate = self.state().ramp_rate;
            return self.ramp(range.code_to_volt(u32::from(code)), rate, true);
        }

        // Open the limits fully so the new value is not clamped.
        self.send(&[
            Command::UpperLimit(MAX_CODE),
            Command::LowerLimit(0),
            Command::DirectSet(code),
        ])?;
        self.state_mut().ramp_state = RampState::Idle;
        debug!("{}: {} set to code {code}", self.dac.config().name(), self.id);
        Ok(())
    }

    /// Ramp the output to `volt` at `rate` volts per second, at most [`MAX_RAMP_RATE`].
    ///
    /// The DAC runs the ramp by itself. With `block` this waits for it to finish as per
    /// [`Self::wait_for_ramp`], otherwise it returns once the ramp is armed. Nothing is sent if
    /// the output is already at `volt`.
    pub fn ramp(&mut self, volt: f64, rate: f64, block: bool) -> Result<(), S::Error> {
        if !(rate > 0.0 && rate <= MAX_RAMP_RATE) {
            return Err(Error::InvalidParameter("ramp rate must be in (0, 10] V/s"));
        }
        let range = self.range();
        range.volt_to_code(volt)?;

        let current = self.volt()?;
        if current == volt {
            return Ok(());
        }
        let period = self.update_period()?;
        let plan = RampPlan::new(&range, current, volt, period, rate)?;
        if !plan.fits_slope_register() {
            return Err(Error::InvalidParameter("ramp is too steep for the update period"));
        }

        // The limit has to be in place before the slope starts the ramp.
        match plan.limit() {
            RampLimit::Upper => self.send(&[Command::UpperLimit(plan.target_code)])?,
            RampLimit::Lower => self.send(&[Command::LowerLimit(plan.target_code)])?,
        }
        self.send(&[Command::Slope(plan.slope)])?;
        self.state_mut().ramp_state = RampState::Ramping { target: volt };
        debug!(
            "{}: {} ramping {current:.6} V -> {volt:.6} V over {:.3}s (slope {})",
            self.dac.config().name(),
            self.id,
            plan.duration_sec,
            plan.slope
        );

        if block {
            self.wait_for_ramp()?;
        }
        Ok(())
    }

    /// Poll the slope register until the device reports the ramp finished.
    ///
    /// How long this may take, and whether it can be cut short, is set by the
    /// [`PollPolicy`](crate::ramp::PollPolicy) in the [`DacConfig`](crate::config::DacConfig).
    pub fn wait_for_ramp(&mut self) -> Result<(), S::Error> {
        let policy = self.dac.config().poll_policy().clone();
        let poll = Poll::start(&policy, self.dac.clock_mut());
        while self.slope()? != 0 {
            poll.tick::<S::Error>(self.dac.clock_mut())?;
        }
        self.state_mut().finish_ramp();
        Ok(())
    }

    pub fn ramp_state(&self) -> RampState {
        self.state().ramp_state
    }

    /// Whether [`Self::set_volt`] ramps.
    pub fn enable_ramp(&self) -> bool {
        self.state().enable_ramp
    }

    pub fn set_enable_ramp(&mut self, enable: bool) {
        self.state_mut().enable_ramp = enable;
    }

    /// Rate used by [`Self::set_volt`] when ramping, in volts per second.
    pub fn ramp_rate(&self) -> f64 {
        self.state().ramp_rate
    }

    /// Must be above 0 and at most [`MAX_RAMP_RATE`].
    pub fn set_ramp_rate(&mut self, rate: f64) -> Result<(), S::Error> {
        if !(rate > 0.0 && rate <= MAX_RAMP_RATE) {
            return Err(Error::InvalidParameter("ramp rate must be in (0, 10] V/s"));
        }
        self.state_mut().ramp_rate = rate;
        Ok(())
    }

    /// Lowest voltage a ramp can reach.
    pub fn lower_limit(&mut self) -> Result<f64, S::Error> {
        let code = self.read_word(ChannelRegister::LowerLimit)?;
        Ok(self.range().code_to_volt(code))
    }

    pub fn set_lower_limit(&mut self, volt: f64) -> Result<(), S::Error> {
        let code = self.range().volt_to_code(volt)?;
        self.send(&[Command::LowerLimit(code)])
    }

    /// Highest voltage a ramp can reach.
    pub fn upper_limit(&mut self) -> Result<f64, S::Error> {
        let code = self.read_word(ChannelRegister::UpperLimit)?;
        Ok(self.range().code_to_volt(code))
    }

    pub fn set_upper_limit(&mut self, volt: f64) -> Result<(), S::Error> {
        let code = self.range().volt_to_code(volt)?;
        self.send(&[Command::UpperLimit(code)])
    }

    /// Time between output updates.
    pub fn update_period(&mut self) -> Result<MicrosDurationU32, S::Error> {
        let period = self.read_word(ChannelRegister::UpdatePeriod)?;
        Ok(MicrosDurationU32::from_ticks(period))
    }

    /// Must be between [`MIN_UPDATE_PERIOD_US`] and [`MAX_UPDATE_PERIOD_US`].
    pub fn set_update_period(&mut self, period: MicrosDurationU32) -> Result<(), S::Error> {
        let period = u16::try_from(period.ticks())
            .ok()
            .filter(|us| u32::from(*us) >= MIN_UPDATE_PERIOD_US)
            .ok_or(Error::InvalidParameter("update period must be 50 - 65535 us"))?;
        self.send(&[Command::UpdatePeriod(period)])
    }

    /// Raw slope register. 0 once a ramp has finished.
    pub fn slope(&mut self) -> Result<i64, S::Error> {
        let register = ChannelRegister::Slope;
        let value = self.dac.read_address(
            i64::from(register.address(self.id)),
            register.words(),
            MemoryBank::Main,
        )?;
        Ok(value as i64)
    }

    /// Write the slope register directly. This starts a ramp towards whichever limit it points
    /// at.
    pub fn set_slope(&mut self, slope: i64) -> Result<(), S::Error> {
        if slope.unsigned_abs() > SLOPE_LIMIT.unsigned_abs() {
            return Err(Error::InvalidParameter("slope must be within +/- 2^32"));
        }
        self.send(&[Command::Slope(slope)])
    }

    /// Whether this channel exposes a power-on value. Needs versa EEPROM access.
    pub fn has_initial_value(&self) -> bool {
        self.state().initial_value_address.is_some()
    }

    fn initial_value_address(&self) -> Result<u32, S::Error> {
        self.state()
            .initial_value_address
            .ok_or(Error::Unsupported("initial value needs versa EEPROM access"))
    }

    /// Voltage output at power-on.
    pub fn initial_value(&mut self) -> Result<f64, S::Error> {
        let address = self.initial_value_address()?;
        let bank = MemoryBank::VersaEeprom {
            slot: self.id.slot(),
        };
        let code = self.dac.read_address(i64::from(address), 1, bank)?;
        Ok(self.range().code_to_volt(code as u32))
    }

    pub fn set_initial_value(&mut self, volt: f64) -> Result<(), S::Error> {
        let address = self.initial_value_address()?;
        let code = self.range().volt_to_code(volt)?;
        let bank = MemoryBank::VersaEeprom {
            slot: self.id.slot(),
        };
        self.dac
            .write_address(i64::from(address), i64::from(code), bank)
    }

    /// Send a raw command to this channel.
    pub fn ask(&mut self, command: &str) -> Result<heapless::String<L>, S::Error> {
        self.dac.ask_channel_raw(self.id, command)
    }
}
