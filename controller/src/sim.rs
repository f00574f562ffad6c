use std::{
    f64::consts::TAU,
    io::{self, Write},
    time::{Duration, Instant},
};

use anyhow::Context;
use chrono::{Local, NaiveDateTime, Utc};
use chrono_tz::Tz;
use tracing::{debug, info, warn};

use thermostat_common::{
    Actuator, CharacterDisplay, Clock, DriverFault, Indicator, TemperatureSensor, Transport,
};

const SIM_BASE_C: f64 = 22.0;
const SIM_SWING_C: f64 = 3.0;
const SIM_PERIOD_SECS: f64 = 240.0;

/// Slow sine around room temperature so both modes get exercised.
pub struct SimulatedSensor {
    start: Instant,
}

impl SimulatedSensor {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl TemperatureSensor for SimulatedSensor {
    fn read_celsius(&mut self) -> Result<f64, DriverFault> {
        let phase = self.start.elapsed().as_secs_f64() / SIM_PERIOD_SECS;
        Ok(SIM_BASE_C + SIM_SWING_C * (phase * TAU).sin())
    }
}

#[derive(Default)]
pub struct LogDisplay {
    lines: Option<(String, String)>,
}

impl CharacterDisplay for LogDisplay {
    fn clear(&mut self) -> Result<(), DriverFault> {
        Ok(())
    }

    fn render(&mut self, line1: &str, line2: &str) -> Result<(), DriverFault> {
        let next = (line1.to_string(), line2.to_string());
        // The clock line changes every second; only line 2 changes are worth an info line.
        if self.lines.as_ref().map(|(_, previous)| previous) != Some(&next.1) {
            info!("display [{}] [{}]", next.0, next.1);
        } else {
            debug!("display [{}] [{}]", next.0, next.1);
        }
        self.lines = Some(next);
        Ok(())
    }

    fn release(&mut self) -> Result<(), DriverFault> {
        self.lines = None;
        info!("display released");
        Ok(())
    }
}

pub struct LogIndicator {
    actuator: Actuator,
}

impl LogIndicator {
    pub fn new(actuator: Actuator) -> Self {
        Self { actuator }
    }
}

impl Indicator for LogIndicator {
    fn off(&mut self) -> Result<(), DriverFault> {
        info!("{} indicator off", self.actuator);
        Ok(())
    }

    fn set_steady(&mut self, level: f64) -> Result<(), DriverFault> {
        info!("{} indicator steady at {level:.2}", self.actuator);
        Ok(())
    }

    fn start_pulse(&mut self, fade_in_ms: u64, fade_out_ms: u64) -> Result<(), DriverFault> {
        info!(
            "{} indicator pulsing ({fade_in_ms}ms in, {fade_out_ms}ms out)",
            self.actuator
        );
        Ok(())
    }
}

/// Line transport onto a UART, or stdout when no port is configured.
pub struct SerialTransport {
    sink: Box<dyn Write + Send>,
}

impl SerialTransport {
    pub fn stdout() -> Self {
        Self::from_writer(io::stdout())
    }

    pub fn open(path: &str, baud: u32, timeout: Duration) -> anyhow::Result<Self> {
        let port = serialport::new(path, baud)
            .timeout(timeout)
            .open()
            .with_context(|| format!("failed to open serial port {path} at {baud} baud"))?;
        info!("status reports on {path} at {baud} baud");
        Ok(Self::from_writer(port))
    }

    pub fn from_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            sink: Box::new(writer),
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.sink.write_all(bytes)?;
        self.sink.flush()
    }
}

impl Transport for SerialTransport {
    fn send(&mut self, bytes: &[u8]) -> bool {
        match self.write_all(bytes) {
            Ok(()) => true,
            Err(err) => {
                warn!("serial write failed: {err}");
                false
            }
        }
    }
}

pub struct SystemClock {
    start: Instant,
    timezone: Option<Tz>,
}

impl SystemClock {
    pub fn new(timezone: Option<Tz>) -> Self {
        Self {
            start: Instant::now(),
            timezone,
        }
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.start
            .elapsed()
            .as_millis()
            .try_into()
            .unwrap_or(u64::MAX)
    }

    fn local_now(&self) -> NaiveDateTime {
        match self.timezone {
            Some(tz) => Utc::now().with_timezone(&tz).naive_local(),
            None => Local::now().naive_local(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn simulated_sensor_stays_in_swing() {
        let mut sensor = SimulatedSensor::new();
        let celsius = sensor.read_celsius().unwrap();
        assert!((SIM_BASE_C - SIM_SWING_C..=SIM_BASE_C + SIM_SWING_C).contains(&celsius));
    }

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(bytes);
            Ok(bytes.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct TimedOutPort;

    impl Write for TimedOutPort {
        fn write(&mut self, _bytes: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::TimedOut, "write timed out"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn serial_transport_writes_whole_lines() {
        let buffer = SharedBuffer::default();
        let mut transport = SerialTransport::from_writer(buffer.clone());

        assert!(transport.send(b"heat,65.00,70.00\n"));
        assert!(transport.send(b"off,70.00,72.00\n"));

        let written = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert_eq!(written, "heat,65.00,70.00\noff,70.00,72.00\n");
    }

    #[test]
    fn serial_write_timeout_reports_failure() {
        let mut transport = SerialTransport::from_writer(TimedOutPort);
        assert!(!transport.send(b"cool,80.00,75.00\n"));
    }

    #[test]
    fn missing_serial_port_fails_to_open() {
        let result = SerialTransport::open(
            "/dev/thermostat-no-such-port",
            115_200,
            Duration::from_secs(1),
        );
        assert!(result.is_err());
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new(None);
        let first = clock.now_ms();
        let second = clock.now_ms();
        assert!(second >= first);
    }
}
