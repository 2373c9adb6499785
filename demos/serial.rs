use std::env;

use fugit::MicrosDurationU64;
use harvard_decadac::{config::DacConfig, dac::Decadac, ramp::PollPolicy, types::ChannelId};
use inquire::Select;
use serialport::SerialPort;

// Configuration constants - adjust these for your setup
const BAUD_RATE: u32 = 9600;
const SERIAL_TIMEOUT_MS: u64 = 500;
const SLOT: u8 = 0;
const CHANNEL: u8 = 0;
const SET_VOLTAGE: f64 = 0.5;
const RAMP_TARGET: f64 = -0.5;
const RAMP_RATE: f64 = 0.2; // V/s
const RAMP_TIMEOUT_S: u32 = 30;

pub struct PortWrapper(Box<dyn SerialPort>);

#[derive(Debug)]
pub struct IoError(std::io::Error);

impl core::fmt::Display for IoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl embedded_io::Error for IoError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self.0.kind() {
            std::io::ErrorKind::NotFound => embedded_io::ErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => embedded_io::ErrorKind::PermissionDenied,
            std::io::ErrorKind::BrokenPipe => embedded_io::ErrorKind::BrokenPipe,
            std::io::ErrorKind::InvalidInput => embedded_io::ErrorKind::InvalidInput,
            std::io::ErrorKind::InvalidData => embedded_io::ErrorKind::InvalidData,
            // A quiet line after a response just means the DAC has nothing more to say.
            std::io::ErrorKind::TimedOut => embedded_io::ErrorKind::TimedOut,
            std::io::ErrorKind::Interrupted => embedded_io::ErrorKind::Interrupted,
            std::io::ErrorKind::Unsupported => embedded_io::ErrorKind::Unsupported,
            _ => embedded_io::ErrorKind::Other,
        }
    }
}

impl embedded_io::ErrorType for PortWrapper {
    type Error = IoError;
}

impl embedded_io::Read for PortWrapper {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        std::io::Read::read(&mut self.0, buf).map_err(IoError)
    }
}

impl embedded_io::Write for PortWrapper {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        std::io::Write::write(&mut self.0, buf).map_err(IoError)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        std::io::Write::flush(&mut self.0).map_err(IoError)
    }
}

fn main() {
    // Get serial port from command line arg or interactive selection
    let port_name = env::args().nth(1).unwrap_or_else(|| {
        let ports = serialport::available_ports().expect("Failed to enumerate serial ports");

        if ports.is_empty() {
            eprintln!("No serial ports found!");
            std::process::exit(1);
        }

        let port_names: Vec<String> = ports.iter().map(|p| p.port_name.clone()).collect();

        Select::new("Select a serial port:", port_names)
            .prompt()
            .expect("Failed to select port")
    });

    println!("Using port: {}", port_name);

    let port = serialport::new(&port_name, BAUD_RATE)
        .timeout(std::time::Duration::from_millis(SERIAL_TIMEOUT_MS))
        .open()
        .expect("Failed to open serial port");

    let port = PortWrapper(port);

    // Don't wait on a ramp forever, and don't hammer the port while waiting.
    let poll = PollPolicy::default()
        .with_timeout(MicrosDurationU64::secs(u64::from(RAMP_TIMEOUT_S)))
        .with_interval(MicrosDurationU64::millis(50));
    let config = DacConfig::new("demo").with_poll_policy(poll);

    // Connecting runs feature detection and puts every slot in Coarse mode
    let mut dac: Decadac<PortWrapper, 128> =
        Decadac::new(port, config).expect("Failed to connect to the DAC");

    println!("Features: {:#?}", dac.features());
    println!("Identity: {:#?}", dac.identity());

    let id = ChannelId::new(SLOT, CHANNEL).expect("Invalid channel");
    let mut channel = dac.channel(id);

    println!("{id} is at {:.4}V", channel.volt().unwrap());
    println!(
        "Update period: {}us",
        channel.update_period().unwrap().ticks()
    );

    // Jump straight to a voltage
    channel.set_volt(SET_VOLTAGE).unwrap();
    println!("Set {id} to {SET_VOLTAGE}V, now at {:.4}V", channel.volt().unwrap());

    // Then ramp away from it, letting the DAC step the output
    println!("Ramping {id} to {RAMP_TARGET}V at {RAMP_RATE}V/s...");
    channel.ramp(RAMP_TARGET, RAMP_RATE, true).unwrap();
    println!("Ramp done, {id} is at {:.4}V", channel.volt().unwrap());
}
