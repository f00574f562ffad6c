use std::time::Duration;

use crate::{
    actuator::{ActuatorAction, ActuatorController, IndicatorProfile},
    config::ThermostatConfig,
    display::{DisplayFrame, DisplayMultiplexer},
    error::Error,
    ports::{CharacterDisplay, Clock, Indicator, TemperatureSensor, Transport},
    report::{StatusReport, StatusReporter},
    state::ThermostatState,
    types::celsius_to_fahrenheit,
};

pub const STARTUP_BANNER: (&str, &str) = ("Thermostat", "Starting up");
pub const SHUTDOWN_MESSAGE: (&str, &str) = ("Shutting down", "");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    Startup,
    Running,
    ShuttingDown,
    Terminated,
}

impl LoopPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Startup => "STARTUP",
            Self::Running => "RUNNING",
            Self::ShuttingDown => "SHUTTING_DOWN",
            Self::Terminated => "TERMINATED",
        }
    }
}

pub struct Peripherals<S, D, I, T> {
    pub sensor: S,
    pub display: D,
    pub heat: I,
    pub cool: I,
    pub transport: T,
}

/// Outcome of one tick. `temp_f` is `None` when the sensor step failed and
/// the rest of the tick was skipped.
#[derive(Debug, Default)]
pub struct TickReport {
    pub temp_f: Option<f64>,
    pub actuations: Vec<ActuatorAction>,
    pub frame: Option<DisplayFrame>,
    pub sent: Option<StatusReport>,
    pub errors: Vec<Error>,
}

pub struct ControlLoop<S, D, I, T, C> {
    config: ThermostatConfig,
    state: ThermostatState,
    peripherals: Peripherals<S, D, I, T>,
    clock: C,
    actuators: ActuatorController,
    display: DisplayMultiplexer,
    reporter: StatusReporter,
    phase: LoopPhase,
}

impl<S, D, I, T, C> ControlLoop<S, D, I, T, C>
where
    S: TemperatureSensor,
    D: CharacterDisplay,
    I: Indicator,
    T: Transport,
    C: Clock,
{
    pub fn new(
        config: ThermostatConfig,
        state: ThermostatState,
        peripherals: Peripherals<S, D, I, T>,
        clock: C,
    ) -> Self {
        Self {
            actuators: ActuatorController::new(IndicatorProfile::from_config(&config)),
            display: DisplayMultiplexer::from_config(&config),
            reporter: StatusReporter::new(config.report_interval_ms),
            config,
            state,
            peripherals,
            clock,
            phase: LoopPhase::Startup,
        }
    }

    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    pub fn state(&self) -> &ThermostatState {
        &self.state
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn peripherals(&self) -> &Peripherals<S, D, I, T> {
        &self.peripherals
    }

    pub fn peripherals_mut(&mut self) -> &mut Peripherals<S, D, I, T> {
        &mut self.peripherals
    }

    pub fn actuators(&self) -> &ActuatorController {
        &self.actuators
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.config.tick_period_ms)
    }

    pub fn startup_pause(&self) -> Duration {
        Duration::from_millis(self.config.startup_pause_ms)
    }

    pub fn shutdown_pause(&self) -> Duration {
        Duration::from_millis(self.config.shutdown_pause_ms)
    }

    /// Shows the banner and enters RUNNING. A display failure does not block startup.
    pub fn start(&mut self) -> Result<(), Error> {
        if self.phase != LoopPhase::Startup {
            return Ok(());
        }
        self.phase = LoopPhase::Running;
        let (line1, line2) = STARTUP_BANNER;
        self.show(&DisplayFrame::new(line1, line2, self.display.width()))
    }

    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();
        if self.phase != LoopPhase::Running {
            return report;
        }

        let now_ms = self.clock.now_ms();
        let temp_f = match self.read_temperature() {
            Ok(temp_f) => temp_f,
            Err(err) => {
                report.errors.push(err);
                return report;
            }
        };
        report.temp_f = Some(temp_f);

        let snapshot = self.state.snapshot();

        let update = self.actuators.update(
            snapshot.mode,
            temp_f,
            snapshot.set_point_f,
            &mut self.peripherals.heat,
            &mut self.peripherals.cool,
        );
        let aborted = update.driver_failed();
        report.actuations = update.issued;
        report.errors.extend(update.errors);
        if aborted {
            return report;
        }

        let frame = self.display.frame(
            now_ms,
            self.clock.local_now(),
            temp_f,
            snapshot.mode,
            snapshot.set_point_f,
        );
        if let Err(err) = self.show(&frame) {
            report.errors.push(err);
        }
        report.frame = Some(frame);

        let status = StatusReport {
            mode: snapshot.mode,
            temp_f,
            set_point_f: snapshot.set_point_f,
        };
        match self
            .reporter
            .report(&status, now_ms, &mut self.peripherals.transport)
        {
            Ok(true) => report.sent = Some(status),
            Ok(false) => {}
            Err(err) => report.errors.push(err),
        }

        report
    }

    /// First half of shutdown: indicators off and the goodbye message up.
    /// The host pauses for `shutdown_pause` before calling `finish_shutdown`.
    pub fn begin_shutdown(&mut self) -> Vec<Error> {
        if matches!(self.phase, LoopPhase::ShuttingDown | LoopPhase::Terminated) {
            return Vec::new();
        }
        self.phase = LoopPhase::ShuttingDown;

        let mut errors = self
            .actuators
            .stop_all(&mut self.peripherals.heat, &mut self.peripherals.cool);
        let (line1, line2) = SHUTDOWN_MESSAGE;
        if let Err(err) = self.show(&DisplayFrame::new(line1, line2, self.display.width())) {
            errors.push(err);
        }
        errors
    }

    pub fn finish_shutdown(&mut self) -> Vec<Error> {
        if self.phase != LoopPhase::ShuttingDown {
            return Vec::new();
        }
        self.phase = LoopPhase::Terminated;

        let display = &mut self.peripherals.display;
        [display.clear(), display.release()]
            .into_iter()
            .filter_map(Result::err)
            .map(Error::DisplayRender)
            .collect()
    }

    fn read_temperature(&mut self) -> Result<f64, Error> {
        let celsius = self
            .peripherals
            .sensor
            .read_celsius()
            .map_err(Error::SensorRead)?;
        let temp_f = celsius_to_fahrenheit(celsius);
        if !self.config.is_plausible_temp(temp_f) {
            return Err(Error::ImplausibleReading(temp_f));
        }
        Ok(temp_f)
    }

    fn show(&mut self, frame: &DisplayFrame) -> Result<(), Error> {
        let display = &mut self.peripherals.display;
        display
            .clear()
            .and_then(|()| display.render(&frame.line1, &frame.line2))
            .map_err(Error::DisplayRender)
    }
}
