//! Ramp planning and completion polling.
//!
//! A ramp is run by the DAC itself: the host writes the limit it should stop at and a slope, and
//! the DAC steps its output every update period until it reaches the limit, at which point the
//! slope register reads back as zero.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use fugit::{MicrosDurationU32, MicrosDurationU64, TimerInstantU64};

use crate::{
    error::{Error, RangeError, Result},
    voltage::VoltageRange,
};

/// Fixed-point scale of the slope register. Note this is 65536 whereas voltage codes are scaled
/// by 65535.
pub const SLOPE_SCALE: f64 = 65536.0;

/// Largest slope magnitude the device accepts.
pub const SLOPE_LIMIT: i64 = 1 << 32;

/// Whether a channel is known to be ramping.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum RampState {
    #[default]
    Idle,
    /// A ramp has been armed towards `target` volts and has not yet been seen to finish.
    Ramping { target: f64 },
}

/// Which limit register stops a ramp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RampLimit {
    Upper,
    Lower,
}

/// Everything needed to arm a ramp on the device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RampPlan {
    pub current_code: u16,
    pub target_code: u16,
    /// Output updates per second.
    pub update_rate_hz: f64,
    /// How long the ramp should take.
    pub duration_sec: f64,
    /// Signed slope in 1/65536ths of a code per update.
    pub slope: i64,
}

impl RampPlan {
    /// Work out the slope taking `current_volt` to `target_volt` at `rate` volts per second.
    pub fn new(
        range: &VoltageRange,
        current_volt: f64,
        target_volt: f64,
        update_period: MicrosDurationU32,
        rate: f64,
    ) -> core::result::Result<Self, RangeError> {
        let current_code = range.volt_to_code(current_volt)?;
        let target_code = range.volt_to_code(target_volt)?;
        let update_rate_hz = 1.0 / (f64::from(update_period.ticks()) * 1e-6);
        let duration_sec = (current_volt - target_volt).abs() / rate;
        let slope = Self::slope_for(current_code, target_code, update_rate_hz, duration_sec);
        Ok(Self {
            current_code,
            target_code,
            update_rate_hz,
            duration_sec,
            slope,
        })
    }

    /// Number of DAC steps divided by the number of updates in the ramp, scaled by 65536.
    ///
    /// Slopes too large for an `i64` saturate, see [`Self::fits_slope_register`].
    pub fn slope_for(
        current_code: u16,
        target_code: u16,
        update_rate_hz: f64,
        duration_sec: f64,
    ) -> i64 {
        let steps = f64::from(target_code) - f64::from(current_code);
        (steps / (update_rate_hz * duration_sec) * SLOPE_SCALE).round() as i64
    }

    /// Whether the device can take this slope, i.e. its magnitude is at most [`SLOPE_LIMIT`].
    pub fn fits_slope_register(&self) -> bool {
        self.slope.unsigned_abs() <= SLOPE_LIMIT.unsigned_abs()
    }

    /// A rising ramp stops at the upper limit, anything else at the lower limit.
    pub fn limit(&self) -> RampLimit {
        if self.slope > 0 {
            RampLimit::Upper
        } else {
            RampLimit::Lower
        }
    }
}

/// A source of time for bounded polling.
pub trait Clock {
    /// Current time, microsecond resolution.
    fn now(&mut self) -> TimerInstantU64<1_000_000>;

    /// Block for `duration`.
    fn delay(&mut self, duration: MicrosDurationU64);
}

/// [`Clock`] backed by the operating system.
#[derive(Debug, Clone, Copy)]
pub struct StdClock {
    origin: std::time::Instant,
}

impl Default for StdClock {
    fn default() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

impl Clock for StdClock {
    fn now(&mut self) -> TimerInstantU64<1_000_000> {
        let micros = u64::try_from(self.origin.elapsed().as_micros()).unwrap_or(u64::MAX);
        TimerInstantU64::from_ticks(micros)
    }

    fn delay(&mut self, duration: MicrosDurationU64) {
        std::thread::sleep(std::time::Duration::from_micros(duration.ticks()));
    }
}

/// How to wait for the device to report a ramp as finished.
///
/// The default never times out, never sleeps between polls and cannot be cancelled, i.e. it
/// spins on the slope register until the DAC reports zero.
#[derive(Debug, Clone)]
pub struct PollPolicy {
    /// Give up with [`Error::Timeout`] after this long.
    pub timeout: Option<MicrosDurationU64>,
    /// Pause between polls.
    pub interval: MicrosDurationU64,
    /// Give up with [`Error::Cancelled`] once this is set.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            timeout: None,
            interval: MicrosDurationU64::from_ticks(0),
            cancel: None,
        }
    }
}

impl PollPolicy {
    /// Give up after `timeout`.
    pub fn with_timeout(mut self, timeout: MicrosDurationU64) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sleep for `interval` between polls.
    pub fn with_interval(mut self, interval: MicrosDurationU64) -> Self {
        self.interval = interval;
        self
    }

    /// Stop waiting once `cancel` is set, from any thread.
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// One bounded wait, started from a [`PollPolicy`].
pub(crate) struct Poll<'a> {
    policy: &'a PollPolicy,
    deadline: Option<TimerInstantU64<1_000_000>>,
}

impl<'a> Poll<'a> {
    pub(crate) fn start(policy: &'a PollPolicy, clock: &mut dyn Clock) -> Self {
        let deadline = policy.timeout.map(|timeout| clock.now() + timeout);
        Self { policy, deadline }
    }

    /// Call between two unsuccessful polls.
    pub(crate) fn tick<I: embedded_io::Error>(&self, clock: &mut dyn Clock) -> Result<(), I> {
        if let Some(cancel) = &self.policy.cancel {
            if cancel.load(Ordering::Relaxed) {
                return Err(Error::Cancelled);
            }
        }
        if let Some(deadline) = self.deadline {
            if clock.now() > deadline {
                return Err(Error::Timeout);
            }
        }
        if self.policy.interval.ticks() > 0 {
            clock.delay(self.policy.interval);
        }
        Ok(())
    }
}
