use crate::{
    config::ThermostatConfig,
    error::{DriverFault, Error},
    ports::Indicator,
    types::{Actuator, ThermostatMode, VisualState},
};

/// Driver call that moves an indicator into a visual state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndicatorCommand {
    Off,
    Steady(f64),
    Pulse { fade_in_ms: u64, fade_out_ms: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActuatorAction {
    pub actuator: Actuator,
    pub target: VisualState,
    pub command: IndicatorCommand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VisualStates {
    pub heat: VisualState,
    pub cool: VisualState,
}

impl VisualStates {
    pub fn get(&self, actuator: Actuator) -> VisualState {
        match actuator {
            Actuator::Heat => self.heat,
            Actuator::Cool => self.cool,
        }
    }

    fn set(&mut self, actuator: Actuator, state: VisualState) {
        match actuator {
            Actuator::Heat => self.heat = state,
            Actuator::Cool => self.cool = state,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorProfile {
    pub steady_level: f64,
    pub fade_in_ms: u64,
    pub fade_out_ms: u64,
}

impl IndicatorProfile {
    pub fn from_config(config: &ThermostatConfig) -> Self {
        Self {
            steady_level: config.steady_level,
            fade_in_ms: config.pulse_fade_in_ms,
            fade_out_ms: config.pulse_fade_out_ms,
        }
    }

    fn command_for(&self, state: VisualState) -> IndicatorCommand {
        match state {
            VisualState::Off => IndicatorCommand::Off,
            VisualState::Solid => IndicatorCommand::Steady(self.steady_level),
            VisualState::Fade => IndicatorCommand::Pulse {
                fade_in_ms: self.fade_in_ms,
                fade_out_ms: self.fade_out_ms,
            },
        }
    }
}

impl Default for IndicatorProfile {
    fn default() -> Self {
        Self::from_config(&ThermostatConfig::default())
    }
}

/// Visual state each indicator should show. Comparisons are strict, so a
/// reading exactly at the set point is SOLID in both modes.
pub fn target_states(mode: ThermostatMode, temp_f: f64, set_point_f: f64) -> VisualStates {
    match mode {
        ThermostatMode::Off => VisualStates::default(),
        ThermostatMode::Heat => VisualStates {
            heat: if temp_f < set_point_f {
                VisualState::Fade
            } else {
                VisualState::Solid
            },
            cool: VisualState::Off,
        },
        ThermostatMode::Cool => VisualStates {
            heat: VisualState::Off,
            cool: if temp_f > set_point_f {
                VisualState::Fade
            } else {
                VisualState::Solid
            },
        },
    }
}

/// Pure transition: the next states plus the driver calls needed to get
/// there. Indicators already in their target state get no call, except that
/// entering OFF switches both drivers off once. Switch-offs are ordered
/// before switch-ons.
pub fn transition(
    mode: ThermostatMode,
    temp_f: f64,
    set_point_f: f64,
    previous: VisualStates,
    profile: &IndicatorProfile,
) -> (VisualStates, Vec<ActuatorAction>) {
    let next = target_states(mode, temp_f, set_point_f);
    let stop_both = mode == ThermostatMode::Off && previous != VisualStates::default();
    let mut actions: Vec<ActuatorAction> = Actuator::ALL
        .into_iter()
        .filter(|&actuator| stop_both || next.get(actuator) != previous.get(actuator))
        .map(|actuator| ActuatorAction {
            actuator,
            target: next.get(actuator),
            command: profile.command_for(next.get(actuator)),
        })
        .collect();
    actions.sort_by_key(|action| action.target != VisualState::Off);

    (next, actions)
}

#[derive(Debug, Default)]
pub struct ActuatorUpdate {
    pub issued: Vec<ActuatorAction>,
    pub errors: Vec<Error>,
}

impl ActuatorUpdate {
    /// A driver call failed this tick; faulted actuators being skipped do not count.
    pub fn driver_failed(&self) -> bool {
        self.errors
            .iter()
            .any(|err| matches!(err, Error::ActuatorDriver { .. }))
    }
}

/// Owns the visual state of both indicators and only touches a driver when
/// that indicator's state changes.
#[derive(Debug, Clone)]
pub struct ActuatorController {
    profile: IndicatorProfile,
    states: VisualStates,
    faulted: [bool; 2],
}

impl ActuatorController {
    pub fn new(profile: IndicatorProfile) -> Self {
        Self {
            profile,
            states: VisualStates::default(),
            faulted: [false; 2],
        }
    }

    pub fn states(&self) -> VisualStates {
        self.states
    }

    pub fn is_faulted(&self, actuator: Actuator) -> bool {
        self.faulted[actuator.index()]
    }

    pub fn update(
        &mut self,
        mode: ThermostatMode,
        temp_f: f64,
        set_point_f: f64,
        heat: &mut dyn Indicator,
        cool: &mut dyn Indicator,
    ) -> ActuatorUpdate {
        let (_, actions) = transition(mode, temp_f, set_point_f, self.states, &self.profile);
        let mut update = ActuatorUpdate::default();
        // Set once a switch-off does not happen; the other indicator then stays
        // off until it does, so the two are never lit together.
        let mut holding = false;

        for action in actions {
            let switch_off = action.command == IndicatorCommand::Off;
            if holding && !switch_off {
                continue;
            }
            if self.is_faulted(action.actuator) {
                holding |= switch_off;
                update.errors.push(Error::ActuatorFaulted(action.actuator));
                continue;
            }

            let result = match action.actuator {
                Actuator::Heat => issue(heat, action.command),
                Actuator::Cool => issue(cool, action.command),
            };

            // State is only committed on success so a failed call is retried next tick.
            match result {
                Ok(()) => {
                    self.states.set(action.actuator, action.target);
                    update.issued.push(action);
                }
                Err(fault) => {
                    holding |= switch_off;
                    if fault.unrecoverable {
                        self.faulted[action.actuator.index()] = true;
                    }
                    update.errors.push(Error::ActuatorDriver {
                        actuator: action.actuator,
                        fault,
                    });
                }
            }
        }

        update
    }

    /// Switches both indicators off regardless of tracked state.
    pub fn stop_all(&mut self, heat: &mut dyn Indicator, cool: &mut dyn Indicator) -> Vec<Error> {
        let results = [(Actuator::Heat, heat.off()), (Actuator::Cool, cool.off())];
        let mut errors = Vec::new();
        for (actuator, result) in results {
            match result {
                Ok(()) => self.states.set(actuator, VisualState::Off),
                Err(fault) => errors.push(Error::ActuatorDriver { actuator, fault }),
            }
        }
        errors
    }
}

impl Default for ActuatorController {
    fn default() -> Self {
        Self::new(IndicatorProfile::default())
    }
}

fn issue(driver: &mut dyn Indicator, command: IndicatorCommand) -> Result<(), DriverFault> {
    match command {
        IndicatorCommand::Off => driver.off(),
        IndicatorCommand::Steady(level) => driver.set_steady(level),
        IndicatorCommand::Pulse {
            fade_in_ms,
            fade_out_ms,
        } => driver.start_pulse(fade_in_ms, fade_out_ms),
    }
}
