pub mod actuator;
pub mod config;
pub mod control;
pub mod display;
pub mod error;
pub mod ports;
pub mod report;
pub mod state;
pub mod types;

pub use actuator::{ActuatorAction, ActuatorController, IndicatorCommand, VisualStates};
pub use config::{RuntimeConfig, SetPointLimits, Settings, TemperatureRange, ThermostatConfig};
pub use control::{ControlLoop, LoopPhase, Peripherals, TickReport};
pub use display::{DisplayFrame, DisplayMultiplexer, DisplayPage};
pub use error::{DriverFault, Error};
pub use ports::{CharacterDisplay, Clock, Indicator, TemperatureSensor, Transport};
pub use report::{ParseReportError, StatusReport, StatusReporter};
pub use state::{InputEvent, Snapshot, ThermostatState};
pub use types::{celsius_to_fahrenheit, Actuator, ThermostatMode, VisualState};
