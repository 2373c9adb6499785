//! Connection-time configuration of a [`Decadac`](crate::dac::Decadac).

use crate::{ramp::PollPolicy, types::SlotMode, voltage::VoltageRange};

/// Settings fixed when connecting to a DAC.
///
/// ```
/// use harvard_decadac::config::DacConfig;
///
/// let config = DacConfig::new("gates").with_range(0.0, 10.0).unwrap();
/// assert_eq!(config.range().max_val(), 10.0);
/// ```
#[derive(Debug, Clone)]
pub struct DacConfig {
    /// What this DAC is called locally. Only used in log messages.
    name: String,
    /// Output range of every channel. The minimum corresponds to code 0, the maximum to 65535.
    range: VoltageRange,
    /// Mode every slot is put in while connecting.
    default_slot_mode: SlotMode,
    /// Byte ending each response line.
    terminator: u8,
    /// How ramps are waited on.
    poll: PollPolicy,
}

impl Default for DacConfig {
    fn default() -> Self {
        Self {
            name: String::from("decadac"),
            range: VoltageRange::default(),
            default_slot_mode: SlotMode::default(),
            terminator: b'\n',
            poll: PollPolicy::default(),
        }
    }
}

impl DacConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the output range. Returns `None` unless `min_val < max_val`.
    pub fn with_range(mut self, min_val: f64, max_val: f64) -> Option<Self> {
        self.range = VoltageRange::new(min_val, max_val)?;
        Some(self)
    }

    /// Set the mode slots are put in while connecting.
    pub fn with_default_slot_mode(mut self, mode: SlotMode) -> Self {
        self.default_slot_mode = mode;
        self
    }

    /// Set the byte which ends a response line.
    pub fn with_terminator(mut self, terminator: u8) -> Self {
        self.terminator = terminator;
        self
    }

    /// Set how ramps are waited on.
    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn range(&self) -> VoltageRange {
        self.range
    }

    pub fn default_slot_mode(&self) -> SlotMode {
        self.default_slot_mode
    }

    pub fn terminator(&self) -> u8 {
        self.terminator
    }

    pub fn poll_policy(&self) -> &PollPolicy {
        &self.poll
    }
}
