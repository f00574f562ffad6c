use std::{fmt, str::FromStr};

use crate::{error::Error, ports::Transport, types::ThermostatMode};

/// One status line on the wire: `<mode>,<temp>,<set point>\n`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusReport {
    pub mode: ThermostatMode,
    pub temp_f: f64,
    pub set_point_f: f64,
}

impl StatusReport {
    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{},{:.2},{:.2}",
            self.mode.as_str().to_ascii_lowercase(),
            self.temp_f,
            self.set_point_f
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseReportError {
    #[error("expected 3 comma separated fields, found {0}")]
    FieldCount(usize),
    #[error("unknown mode label {0:?}")]
    Mode(String),
    #[error("invalid number {0:?}")]
    Number(String),
}

impl FromStr for StatusReport {
    type Err = ParseReportError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split(',').collect();
        let [mode, temp, set_point] = fields.as_slice() else {
            return Err(ParseReportError::FieldCount(fields.len()));
        };

        let mode = ThermostatMode::from_label(mode)
            .ok_or_else(|| ParseReportError::Mode(mode.to_string()))?;
        Ok(Self {
            mode,
            temp_f: parse_number(temp)?,
            set_point_f: parse_number(set_point)?,
        })
    }
}

fn parse_number(field: &str) -> Result<f64, ParseReportError> {
    field
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| ParseReportError::Number(field.to_string()))
}

/// Rate limits status lines onto the transport.
#[derive(Debug, Clone)]
pub struct StatusReporter {
    interval_ms: u64,
    last_sent_ms: Option<u64>,
}

impl StatusReporter {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_sent_ms: None,
        }
    }

    pub fn last_sent_ms(&self) -> Option<u64> {
        self.last_sent_ms
    }

    pub fn is_due(&self, now_ms: u64) -> bool {
        self.last_sent_ms
            .map(|last| now_ms.saturating_sub(last) >= self.interval_ms)
            .unwrap_or(true)
    }

    /// Sends `report` when the throttle window has elapsed. Returns whether a
    /// write was attempted. A rejected write still restarts the window, so it
    /// is not retried until the next one.
    pub fn report(
        &mut self,
        report: &StatusReport,
        now_ms: u64,
        transport: &mut dyn Transport,
    ) -> Result<bool, Error> {
        if !self.is_due(now_ms) {
            return Ok(false);
        }

        let delivered = transport.send(report.encode().as_bytes());
        self.last_sent_ms = Some(now_ms);

        if delivered {
            Ok(true)
        } else {
            Err(Error::TransportSend)
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Default)]
    pub(crate) struct RecordingTransport {
        pub lines: Vec<String>,
        pub reject: bool,
    }

    impl Transport for RecordingTransport {
        fn send(&mut self, bytes: &[u8]) -> bool {
            self.lines.push(String::from_utf8_lossy(bytes).into_owned());
            !self.reject
        }
    }

    fn sample(mode: ThermostatMode, temp_f: f64, set_point_f: f64) -> StatusReport {
        StatusReport {
            mode,
            temp_f,
            set_point_f,
        }
    }

    #[test]
    fn encodes_lower_case_mode_and_two_decimals() {
        assert_eq!(
            sample(ThermostatMode::Heat, 65.0, 70.0).encode(),
            "heat,65.00,70.00\n"
        );
        assert_eq!(
            sample(ThermostatMode::Cool, 80.0, 75.0).encode(),
            "cool,80.00,75.00\n"
        );
        assert_eq!(
            sample(ThermostatMode::Off, 71.456, 72.0).encode(),
            "off,71.46,72.00\n"
        );
    }

    #[test]
    fn parses_encoded_line() {
        let original = sample(ThermostatMode::Cool, 78.337, 74.0);
        let parsed: StatusReport = original.encode().parse().unwrap();

        assert_eq!(parsed.mode, ThermostatMode::Cool);
        assert!((parsed.temp_f - original.temp_f).abs() <= 0.01);
        assert!((parsed.set_point_f - original.set_point_f).abs() <= 0.01);
    }

    #[test]
    fn rejects_malformed_lines() {
        assert_eq!(
            "heat,70.00".parse::<StatusReport>(),
            Err(ParseReportError::FieldCount(2))
        );
        assert_eq!(
            "auto,70.00,72.00\n".parse::<StatusReport>(),
            Err(ParseReportError::Mode("auto".to_string()))
        );
        assert_eq!(
            "heat,warm,72.00\n".parse::<StatusReport>(),
            Err(ParseReportError::Number("warm".to_string()))
        );
    }

    #[test]
    fn windows_restart_from_each_send() {
        let mut reporter = StatusReporter::new(30_000);
        let mut transport = RecordingTransport::default();
        let report = sample(ThermostatMode::Off, 70.0, 72.0);

        let sent: Vec<bool> = [0, 10_000, 29_000, 31_000, 61_000]
            .into_iter()
            .map(|now| reporter.report(&report, now, &mut transport).unwrap())
            .collect();

        assert_eq!(sent, vec![true, false, false, true, true]);
        assert_eq!(transport.lines.len(), 3);
        assert_eq!(reporter.last_sent_ms(), Some(61_000));
    }

    #[test]
    fn failed_send_still_advances_window() {
        let mut reporter = StatusReporter::new(30_000);
        let mut transport = RecordingTransport {
            reject: true,
            ..RecordingTransport::default()
        };
        let report = sample(ThermostatMode::Heat, 65.0, 70.0);

        assert_eq!(
            reporter.report(&report, 0, &mut transport),
            Err(Error::TransportSend)
        );
        assert_eq!(reporter.report(&report, 1_000, &mut transport), Ok(false));
        assert_eq!(transport.lines.len(), 1);

        transport.reject = false;
        assert_eq!(reporter.report(&report, 30_000, &mut transport), Ok(true));
        assert_eq!(transport.lines.len(), 2);
    }
}
