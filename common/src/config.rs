use serde::{Deserialize, Serialize};

use crate::types::ThermostatMode;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThermostatConfig {
    pub tick_period_ms: u64,
    pub startup_pause_ms: u64,
    pub shutdown_pause_ms: u64,
    pub display_toggle_ms: u64,
    pub report_interval_ms: u64,
    pub display_width: usize,
    pub pulse_fade_in_ms: u64,
    pub pulse_fade_out_ms: u64,
    pub steady_level: f64,
    /// Readings outside this range count as sensor failures. `None` accepts
    /// any finite reading.
    pub valid_range_f: Option<TemperatureRange>,
}

impl Default for ThermostatConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: 500,
            startup_pause_ms: 2_000,
            shutdown_pause_ms: 1_000,
            display_toggle_ms: 5_000,
            report_interval_ms: 30_000,
            display_width: 16,
            pulse_fade_in_ms: 1_000,
            pulse_fade_out_ms: 1_000,
            steady_level: 1.0,
            valid_range_f: None,
        }
    }
}

impl ThermostatConfig {
    pub fn sanitize(&mut self) {
        let defaults = Self::default();

        if self.tick_period_ms == 0 {
            self.tick_period_ms = defaults.tick_period_ms;
        }
        if self.display_toggle_ms == 0 {
            self.display_toggle_ms = defaults.display_toggle_ms;
        }
        if self.display_width == 0 {
            self.display_width = defaults.display_width;
        }
        if !self.steady_level.is_finite() {
            self.steady_level = defaults.steady_level;
        }
        self.steady_level = self.steady_level.clamp(0.0, 1.0);

        if self.valid_range_f.is_some_and(|range| !range.is_valid()) {
            self.valid_range_f = None;
        }
    }

    pub fn is_plausible_temp(&self, temp_f: f64) -> bool {
        temp_f.is_finite()
            && self
                .valid_range_f
                .map_or(true, |range| range.contains(temp_f))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureRange {
    pub min_f: f64,
    pub max_f: f64,
}

impl TemperatureRange {
    pub fn contains(&self, temp_f: f64) -> bool {
        (self.min_f..=self.max_f).contains(&temp_f)
    }

    fn is_valid(&self) -> bool {
        self.min_f.is_finite() && self.max_f.is_finite() && self.min_f < self.max_f
    }
}

/// Optional clamp for the user set point. Absent means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SetPointLimits {
    pub min_f: f64,
    pub max_f: f64,
}

impl SetPointLimits {
    pub fn apply(&self, set_point_f: f64) -> f64 {
        set_point_f.clamp(self.min_f, self.max_f)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub initial_set_point_f: f64,
    pub initial_mode: ThermostatMode,
    pub set_point_limits: Option<SetPointLimits>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            initial_set_point_f: 72.0,
            initial_mode: ThermostatMode::Off,
            set_point_limits: None,
        }
    }
}

impl Settings {
    pub fn sanitize(&mut self) {
        if let Some(limits) = self.set_point_limits {
            let valid = limits.min_f.is_finite()
                && limits.max_f.is_finite()
                && limits.min_f <= limits.max_f;
            if !valid {
                self.set_point_limits = None;
            }
        }

        if !self.initial_set_point_f.is_finite() {
            self.initial_set_point_f = Self::default().initial_set_point_f;
        }
        if let Some(limits) = self.set_point_limits {
            self.initial_set_point_f = limits.apply(self.initial_set_point_f);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub thermostat: ThermostatConfig,
    pub settings: Settings,
    /// IANA zone for the clock line. Empty uses the system local time.
    pub timezone: String,
    /// Serial port that receives report lines. `None` writes to stdout.
    pub serial_path: Option<String>,
    pub serial_baud: u32,
    /// Write timeout on the serial port.
    pub serial_timeout_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            thermostat: ThermostatConfig::default(),
            settings: Settings::default(),
            timezone: String::new(),
            serial_path: None,
            serial_baud: 115_200,
            serial_timeout_ms: 1_000,
        }
    }
}

impl RuntimeConfig {
    pub fn sanitize(&mut self) {
        let defaults = Self::default();
        self.thermostat.sanitize();
        self.settings.sanitize();
        if self.serial_baud == 0 {
            self.serial_baud = defaults.serial_baud;
        }
        if self.serial_timeout_ms == 0 {
            self.serial_timeout_ms = defaults.serial_timeout_ms;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_json_keeps_defaults() {
        let runtime: RuntimeConfig = serde_json::from_str(
            r#"{"thermostat":{"report_interval_ms":60000},"timezone":"America/Chicago"}"#,
        )
        .unwrap();

        assert_eq!(runtime.thermostat.report_interval_ms, 60_000);
        assert_eq!(runtime.thermostat.tick_period_ms, 500);
        assert_eq!(runtime.thermostat.display_width, 16);
        assert_eq!(runtime.settings.initial_set_point_f, 72.0);
        assert_eq!(runtime.settings.set_point_limits, None);
        assert_eq!(runtime.thermostat.valid_range_f, None);
        assert_eq!(runtime.timezone, "America/Chicago");
        assert_eq!(runtime.serial_baud, 115_200);
        assert_eq!(runtime.serial_timeout_ms, 1_000);
    }

    #[test]
    fn zero_serial_settings_fall_back_to_defaults() {
        let mut runtime = RuntimeConfig {
            serial_path: Some("/dev/ttyUSB0".to_string()),
            serial_baud: 0,
            serial_timeout_ms: 0,
            ..RuntimeConfig::default()
        };
        runtime.sanitize();

        assert_eq!(runtime.serial_baud, 115_200);
        assert_eq!(runtime.serial_timeout_ms, 1_000);
        assert_eq!(runtime.serial_path.as_deref(), Some("/dev/ttyUSB0"));
    }

    #[test]
    fn sanitize_repairs_zero_periods_and_bad_range() {
        let mut config = ThermostatConfig {
            tick_period_ms: 0,
            display_width: 0,
            steady_level: 3.0,
            valid_range_f: Some(TemperatureRange {
                min_f: 100.0,
                max_f: 0.0,
            }),
            ..ThermostatConfig::default()
        };
        config.sanitize();

        assert_eq!(config.tick_period_ms, 500);
        assert_eq!(config.display_width, 16);
        assert_eq!(config.steady_level, 1.0);
        assert_eq!(config.valid_range_f, None);
    }

    #[test]
    fn inverted_limits_are_dropped() {
        let mut settings = Settings {
            set_point_limits: Some(SetPointLimits {
                min_f: 90.0,
                max_f: 50.0,
            }),
            ..Settings::default()
        };
        settings.sanitize();
        assert_eq!(settings.set_point_limits, None);
    }

    #[test]
    fn initial_set_point_respects_limits() {
        let mut settings = Settings {
            initial_set_point_f: 95.0,
            set_point_limits: Some(SetPointLimits {
                min_f: 50.0,
                max_f: 90.0,
            }),
            ..Settings::default()
        };
        settings.sanitize();
        assert_eq!(settings.initial_set_point_f, 90.0);
    }

    #[test]
    fn default_accepts_any_finite_reading() {
        let config = ThermostatConfig::default();
        assert!(config.is_plausible_temp(72.0));
        assert!(config.is_plausible_temp(160.0));
        assert!(config.is_plausible_temp(-60.0));
        assert!(!config.is_plausible_temp(f64::NAN));
        assert!(!config.is_plausible_temp(f64::INFINITY));
    }

    #[test]
    fn configured_range_rejects_outliers() {
        let config = ThermostatConfig {
            valid_range_f: Some(TemperatureRange {
                min_f: -40.0,
                max_f: 150.0,
            }),
            ..ThermostatConfig::default()
        };
        assert!(config.is_plausible_temp(150.0));
        assert!(!config.is_plausible_temp(151.0));
        assert!(!config.is_plausible_temp(f64::NEG_INFINITY));
    }
}
