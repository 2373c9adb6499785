//! Connect-time capability probing.
//!
//! Every check is allowed to fail. A DAC without an EEPROM or calibration support is a normal
//! configuration, so a failed check only leaves the matching capability off.

use log::{debug, warn};

use crate::{
    command::{self, Command},
    dac::Decadac,
    memory::MemoryBank,
    register::{
        EEPROM_IDENTITY, EEPROM_MAGIC, HARDWARE_VERSION, SERIAL_NUMBER,
        VERSA_EEPROM_TEST_ADDRESS,
    },
};

/// What the connected DAC can do. Fixed once connected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Features {
    pub eeprom_available: bool,
    /// Access to the EEPROM on each slot's board.
    ///
    /// __Note:__ This is never enabled, even when the test read succeeds. Per-channel initial
    /// values are therefore never exposed.
    pub versa_eeprom_available: bool,
    pub calibration_supported: bool,
}

/// Identity read from the DAC's EEPROM. Both fields are 0 without an EEPROM.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Identity {
    pub serial_number: u64,
    pub hardware_version: u64,
}

impl<S: embedded_io::Read + embedded_io::Write, const L: usize> Decadac<S, L> {
    /// Detect the device's features. Never fails, any check which goes wrong is logged and
    /// treated as absent.
    pub(crate) fn detect_features(&mut self) -> (Features, Identity) {
        let mut features = Features::default();

        features.eeprom_available =
            match self.read_address(i64::from(EEPROM_IDENTITY), 1, MemoryBank::Main) {
                Ok(value) => value == EEPROM_MAGIC,
                Err(e) => {
                    warn!("{}: EEPROM check failed: {e}", self.config().name());
                    false
                }
            };

        match self.read_address(
            i64::from(VERSA_EEPROM_TEST_ADDRESS),
            1,
            MemoryBank::VersaEeprom { slot: 0 },
        ) {
            Ok(value) => debug!(
                "{}: versa EEPROM test read {value}, leaving versa EEPROM disabled",
                self.config().name()
            ),
            Err(e) => warn!("{}: versa EEPROM check failed: {e}", self.config().name()),
        }

        features.calibration_supported = match self.ask_commands(&[Command::CalibrationCheck]) {
            Ok(response) => match command::parse_response(&response) {
                Ok(payload) => !payload.is_empty(),
                Err(e) => {
                    warn!("{}: calibration check failed: {e}", self.config().name());
                    false
                }
            },
            Err(e) => {
                warn!("{}: calibration check failed: {e}", self.config().name());
                false
            }
        };

        let identity = if features.eeprom_available {
            Identity {
                hardware_version: self.read_identity_word(HARDWARE_VERSION, "hardware version"),
                serial_number: self.read_identity_word(SERIAL_NUMBER, "serial number"),
            }
        } else {
            Identity::default()
        };

        debug!("{}: {features:?}, {identity:?}", self.config().name());
        (features, identity)
    }

    fn read_identity_word(&mut self, address: u32, what: &str) -> u64 {
        self.read_address(i64::from(address), 1, MemoryBank::Main)
            .unwrap_or_else(|e| {
                warn!("{}: failed to read {what}: {e}", self.config().name());
                0
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::DacConfig,
        dac::tests::connected,
        mock_serial::{MockSerial, DeviceAnswers, queue_feature_detection},
    };

    #[test]
    fn test_full_featured_dac() {
        let mut dac = connected(DeviceAnswers::BARE);
        queue_feature_detection(dac.interface_mut(), DeviceAnswers::FULL);
        let (features, identity) = dac.detect_features();
        assert_eq!(
            features,
            Features {
                eeprom_available: true,
                versa_eeprom_available: false,
                calibration_supported: true,
            }
        );
        assert_eq!(
            identity,
            Identity {
                serial_number: 14081,
                hardware_version: 139,
            }
        );
        assert_eq!(
            dac.interface_mut().written_str(),
            "A1107296256;p;B0;A6;e;k;A1107296266;p;A1107296264;p;"
        );
    }

    #[test]
    fn test_bare_dac_skips_identity() {
        let mut dac = connected(DeviceAnswers::BARE);
        queue_feature_detection(dac.interface_mut(), DeviceAnswers::BARE);
        let (features, identity) = dac.detect_features();
        assert_eq!(features, Features::default());
        assert_eq!(identity, Identity::default());
        assert_eq!(dac.interface_mut().written_str(), "A1107296256;p;B0;A6;e;k;");
        assert!(dac.interface_mut().is_drained());
    }

    #[test]
    fn test_wrong_magic_means_no_eeprom() {
        let mut dac = connected(DeviceAnswers::BARE);
        dac.interface_mut()
            .queue_responses(&["A1107296256!", "p21931!", "B0!", "A6!", "e0!", "k!"]);
        let (features, identity) = dac.detect_features();
        assert!(!features.eeprom_available);
        assert!(!features.calibration_supported);
        assert_eq!(identity.serial_number, 0);
    }

    #[test]
    fn test_failed_checks_do_not_abort_detection() {
        let mut dac = connected(DeviceAnswers::BARE);
        // The address echo is wrong, so the EEPROM read gives up before querying.
        dac.interface_mut().queue_responses(&["A0!"]);
        // The slot select is never confirmed.
        dac.interface_mut().queue_responses(&["B1!"]);
        dac.interface_mut().queue_response("k1!");
        let (features, _) = dac.detect_features();
        assert!(!features.eeprom_available);
        assert!(features.calibration_supported);
        assert_eq!(dac.interface_mut().written_str(), "A1107296256;B0;k;");
    }

    #[test]
    fn test_versa_read_success_keeps_flag_off() {
        let mut mock = MockSerial::new();
        mock.queue_responses(&["A1107296256!", "p0!", "B0!", "A6!", "e12345!", "?"]);
        for slot in 0..crate::types::SLOT_COUNT {
            mock.queue_response(&format!("B{slot}!"));
            mock.queue_response("M2!");
        }
        let dac: Decadac<MockSerial> = Decadac::new(mock, DacConfig::default()).unwrap();
        assert!(!dac.features().versa_eeprom_available);
    }
}
