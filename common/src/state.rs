use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{
    config::{SetPointLimits, Settings},
    types::ThermostatMode,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    CycleMode,
    Increase,
    Decrease,
}

impl InputEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CycleMode => "cycle_mode",
            Self::Increase => "increase",
            Self::Decrease => "decrease",
        }
    }
}

/// Consistent copy of the user-controlled fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    pub mode: ThermostatMode,
    pub set_point_f: f64,
}

#[derive(Debug)]
struct Inner {
    mode: ThermostatMode,
    set_point_f: f64,
    limits: Option<SetPointLimits>,
}

/// Mode and set point shared between button handlers and the control loop.
///
/// Cloning yields another handle onto the same state. Both fields sit behind
/// one mutex so a reader never sees a half-applied input event.
#[derive(Debug, Clone)]
pub struct ThermostatState {
    inner: Arc<Mutex<Inner>>,
}

impl ThermostatState {
    pub fn new(settings: &Settings) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                mode: settings.initial_mode,
                set_point_f: settings.initial_set_point_f,
                limits: settings.set_point_limits,
            })),
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        let inner = self.lock();
        Snapshot {
            mode: inner.mode,
            set_point_f: inner.set_point_f,
        }
    }

    pub fn mode(&self) -> ThermostatMode {
        self.lock().mode
    }

    pub fn set_point_f(&self) -> f64 {
        self.lock().set_point_f
    }

    pub fn on_mode_cycle(&self) -> ThermostatMode {
        let mut inner = self.lock();
        inner.mode = inner.mode.next();
        inner.mode
    }

    pub fn on_increase(&self) -> f64 {
        self.adjust_set_point(1.0)
    }

    pub fn on_decrease(&self) -> f64 {
        self.adjust_set_point(-1.0)
    }

    pub fn apply(&self, event: InputEvent) -> Snapshot {
        match event {
            InputEvent::CycleMode => {
                self.on_mode_cycle();
            }
            InputEvent::Increase => {
                self.on_increase();
            }
            InputEvent::Decrease => {
                self.on_decrease();
            }
        }
        self.snapshot()
    }

    fn adjust_set_point(&self, delta_f: f64) -> f64 {
        let mut inner = self.lock();
        let next = inner.set_point_f + delta_f;
        inner.set_point_f = match inner.limits {
            Some(limits) => limits.apply(next),
            None => next,
        };
        inner.set_point_f
    }

    // Handlers only store plain values, so state behind a poisoned lock is still whole.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ThermostatState {
    fn default() -> Self {
        Self::new(&Settings::default())
    }
}
