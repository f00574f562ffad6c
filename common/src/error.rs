use thiserror::Error;

use crate::types::Actuator;

/// Failure reported by a hardware driver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DriverFault {
    pub message: String,
    /// Set by the driver when retrying cannot help (e.g. the PWM channel is gone).
    pub unrecoverable: bool,
}

impl DriverFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            unrecoverable: false,
        }
    }

    pub fn unrecoverable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            unrecoverable: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("sensor read failed: {0}")]
    SensorRead(DriverFault),
    #[error("implausible temperature reading {0}F")]
    ImplausibleReading(f64),
    #[error("display render failed: {0}")]
    DisplayRender(DriverFault),
    #[error("transport rejected status report")]
    TransportSend,
    #[error("{actuator} actuator driver failed: {fault}")]
    ActuatorDriver { actuator: Actuator, fault: DriverFault },
    #[error("{0} actuator is faulted and no longer commanded")]
    ActuatorFaulted(Actuator),
}

impl Error {
    pub fn is_sensor(&self) -> bool {
        matches!(self, Self::SensorRead(_) | Self::ImplausibleReading(_))
    }
}
