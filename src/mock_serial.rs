//! We use this mocking module in unit tests to emulate the DAC's serial port.

/// Capacity of each direction's buffer.
const CAPACITY: usize = 8192;

/// Our mock type used to emulate a serial port.
pub struct MockSerial {
    /// Buffer to store data written to the mock serial port
    write_buffer: heapless::Vec<u8, CAPACITY>,
    /// Buffer containing pre-configured response data to be read
    read_buffer: heapless::Vec<u8, CAPACITY>,
    /// Current position in the read buffer
    read_position: usize,
    /// Flag to simulate write errors
    should_error_on_write: bool,
    /// Flag to simulate read errors
    should_error_on_read: bool,
    /// Appended to every queued response line
    line_ending: &'static [u8],
}

#[derive(Debug, thiserror::Error)]
pub enum MockSerialError {
    /// Simulated timeout error
    #[error("Simulated timeout")]
    Timeout,
    /// Simulated buffer overflow
    #[error("Simulated buffer overflow")]
    BufferOverflow,
    /// Generic simulated error for testing
    #[error("Simulated serial error")]
    SimulatedError,
    /// Would block - no data available
    #[error("No data available")]
    WouldBlock,
}

impl embedded_io::Error for MockSerialError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            MockSerialError::Timeout => embedded_io::ErrorKind::TimedOut,
            MockSerialError::BufferOverflow => embedded_io::ErrorKind::OutOfMemory,
            MockSerialError::SimulatedError => embedded_io::ErrorKind::BrokenPipe,
            MockSerialError::WouldBlock => embedded_io::ErrorKind::Other,
        }
    }
}

impl embedded_io::ErrorType for MockSerial {
    type Error = MockSerialError;
}

impl embedded_io::Write for MockSerial {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if self.should_error_on_write {
            return Err(MockSerialError::SimulatedError);
        }
        self.write_buffer
            .extend_from_slice(buf)
            .map_err(|_| MockSerialError::BufferOverflow)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        if self.should_error_on_write {
            return Err(MockSerialError::SimulatedError);
        }
        Ok(())
    }
}

impl embedded_io::Read for MockSerial {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if self.should_error_on_read {
            return Err(MockSerialError::SimulatedError);
        }

        if self.read_position >= self.read_buffer.len() {
            return Err(MockSerialError::WouldBlock);
        }

        let available_bytes = self.read_buffer.len() - self.read_position;
        let bytes_to_read = core::cmp::min(buf.len(), available_bytes);
        buf[..bytes_to_read].copy_from_slice(
            &self.read_buffer[self.read_position..self.read_position + bytes_to_read],
        );
        self.read_position += bytes_to_read;
        Ok(bytes_to_read)
    }
}

impl MockSerial {
    /// Create a new MockSerial instance with empty buffers
    pub fn new() -> Self {
        Self {
            write_buffer: heapless::Vec::new(),
            read_buffer: heapless::Vec::new(),
            read_position: 0,
            should_error_on_write: false,
            should_error_on_read: false,
            line_ending: b"\n",
        }
    }

    /// Change what ends each queued response line.
    pub fn set_line_ending(&mut self, line_ending: &'static [u8]) {
        self.line_ending = line_ending;
    }

    /// Append raw bytes to be returned by read(), after anything already queued.
    pub fn queue_raw(&mut self, data: &[u8]) {
        self.read_buffer
            .extend_from_slice(data)
            .expect("mock read buffer full");
    }

    /// Queue one response line, as the DAC would send it.
    pub fn queue_response(&mut self, line: &str) {
        self.queue_raw(line.as_bytes());
        self.queue_raw(self.line_ending);
    }

    /// Queue several response lines.
    pub fn queue_responses(&mut self, lines: &[&str]) {
        for line in lines {
            self.queue_response(line);
        }
    }

    /// Get a reference to the data that was written to this mock serial port
    pub fn written_data(&self) -> &[u8] {
        &self.write_buffer
    }

    /// Everything written so far, as text.
    pub fn written_str(&self) -> &str {
        core::str::from_utf8(&self.write_buffer).expect("non-ASCII command written")
    }

    /// Clear the write buffer
    pub fn clear_written_data(&mut self) {
        self.write_buffer.clear();
    }

    /// Whether every queued response has been read.
    pub fn is_drained(&self) -> bool {
        self.read_position >= self.read_buffer.len()
    }

    /// Configure whether write operations should fail with an error
    pub fn set_write_error(&mut self, should_error: bool) {
        self.should_error_on_write = should_error;
    }

    /// Configure whether read operations should fail with an error
    pub fn set_read_error(&mut self, should_error: bool) {
        self.should_error_on_read = should_error;
    }
}

/// How the emulated DAC answers the connect-time feature checks.
#[derive(Debug, Clone, Copy)]
pub struct DeviceAnswers {
    pub eeprom: bool,
    pub calibration: bool,
}

impl DeviceAnswers {
    pub const FULL: DeviceAnswers = DeviceAnswers {
        eeprom: true,
        calibration: true,
    };

    pub const BARE: DeviceAnswers = DeviceAnswers {
        eeprom: false,
        calibration: false,
    };
}

/// Queue the responses to feature detection.
pub fn queue_feature_detection(mock: &mut MockSerial, answers: DeviceAnswers) {
    let identity = if answers.eeprom { "p21930!" } else { "p0!" };
    mock.queue_responses(&["A1107296256!", identity]);
    mock.queue_responses(&["B0!", "A6!", "e0!"]);
    mock.queue_response(if answers.calibration { "k1!" } else { "?" });
    if answers.eeprom {
        mock.queue_responses(&["A1107296266!", "p139!", "A1107296264!", "p14081!"]);
    }
}

/// Queue the responses to a full connect: feature detection then every slot put into Coarse mode.
pub fn queue_connect(mock: &mut MockSerial, answers: DeviceAnswers) {
    queue_feature_detection(mock, answers);
    for slot in 0..crate::types::SLOT_COUNT {
        mock.queue_response(&format!("B{slot}!"));
        mock.queue_response("M2!");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io::{Error, Read, Write};

    #[test]
    fn test_write_data() {
        let mut mock = MockSerial::new();
        mock.write_all(b"A1536;").unwrap();
        mock.write_all(b"p;").unwrap();
        assert_eq!(mock.written_str(), "A1536;p;");
        mock.clear_written_data();
        assert!(mock.written_data().is_empty());
    }

    #[test]
    fn test_read_queued_lines() {
        let mut mock = MockSerial::new();
        mock.queue_responses(&["A1536!", "p7!"]);

        let mut buffer = [0u8; 7];
        assert_eq!(mock.read(&mut buffer).unwrap(), 7);
        assert_eq!(&buffer, b"A1536!\n");
        assert!(!mock.is_drained());

        let mut buffer = [0u8; 16];
        assert_eq!(mock.read(&mut buffer).unwrap(), 4);
        assert_eq!(&buffer[..4], b"p7!\n");
        assert!(mock.is_drained());
    }

    #[test]
    fn test_read_would_block_when_drained() {
        let mut mock = MockSerial::new();
        let mut buffer = [0u8; 4];
        let err = mock.read(&mut buffer).unwrap_err();
        assert!(matches!(err, MockSerialError::WouldBlock));
        assert!(matches!(err.kind(), embedded_io::ErrorKind::Other));
    }

    #[test]
    fn test_error_flags_toggle() {
        let mut mock = MockSerial::new();

        mock.set_write_error(true);
        assert!(mock.write(b"p;").is_err());
        assert!(mock.flush().is_err());
        mock.set_write_error(false);
        assert!(mock.write(b"p;").is_ok());

        mock.queue_response("p1!");
        mock.set_read_error(true);
        let mut buffer = [0u8; 4];
        assert!(mock.read(&mut buffer).is_err());
        mock.set_read_error(false);
        assert!(mock.read(&mut buffer).is_ok());
    }

    #[test]
    fn test_errors_display() {
        assert_eq!(MockSerialError::WouldBlock.to_string(), "No data available");
        let err: &dyn core::error::Error = &MockSerialError::SimulatedError;
        assert_eq!(err.to_string(), "Simulated serial error");
    }

    #[test]
    fn test_error_kinds() {
        assert!(matches!(
            MockSerialError::Timeout.kind(),
            embedded_io::ErrorKind::TimedOut
        ));
        assert!(matches!(
            MockSerialError::BufferOverflow.kind(),
            embedded_io::ErrorKind::OutOfMemory
        ));
        assert!(matches!(
            MockSerialError::SimulatedError.kind(),
            embedded_io::ErrorKind::BrokenPipe
        ));
    }
}
