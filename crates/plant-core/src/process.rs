use serde::Serialize;
use thiserror::Error;

/// Inclusive operating range of a process variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Clamp into the range. NaN collapses to the lower bound.
    pub fn clamp(&self, value: f64) -> f64 {
        if value.is_nan() {
            self.min
        } else {
            value.clamp(self.min, self.max)
        }
    }
}

pub const TEMPERATURE_RANGE: Range = Range::new(20.0, 100.0);
pub const PRESSURE_RANGE: Range = Range::new(50.0, 150.0);
pub const FLOW_RATE_RANGE: Range = Range::new(0.0, 85.0);
pub const TANK_LEVEL_RANGE: Range = Range::new(0.0, 100.0);

/// Tank level above which the high-level alarm is raised.
pub const LEVEL_HIGH_THRESHOLD: f64 = 90.0;
/// Tank level below which the low-level alarm is raised.
pub const LEVEL_LOW_THRESHOLD: f64 = 10.0;

/// The simulated plant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProcessState {
    /// °C
    pub temperature: f64,
    /// PSI
    pub pressure: f64,
    /// L/min
    pub flow_rate: f64,
    /// Percent full.
    pub tank_level: f64,
}

impl ProcessState {
    pub fn new() -> Self {
        Self {
            temperature: 25.0,
            pressure: 100.0,
            flow_rate: 50.0,
            tank_level: 75.0,
        }
    }

    /// Verify every field lies inside its operating range.
    pub fn check_bounds(&self) -> Result<(), ModelInvariantViolation> {
        let fields = [
            ("temperature", self.temperature, TEMPERATURE_RANGE),
            ("pressure", self.pressure, PRESSURE_RANGE),
            ("flow_rate", self.flow_rate, FLOW_RATE_RANGE),
            ("tank_level", self.tank_level, TANK_LEVEL_RANGE),
        ];
        for (field, value, range) in fields {
            if !range.contains(value) {
                return Err(ModelInvariantViolation {
                    field,
                    value,
                    min: range.min,
                    max: range.max,
                });
            }
        }
        Ok(())
    }

    pub fn level_high(&self) -> bool {
        self.tank_level > LEVEL_HIGH_THRESHOLD
    }

    pub fn level_low(&self) -> bool {
        self.tank_level < LEVEL_LOW_THRESHOLD
    }
}

impl Default for ProcessState {
    fn default() -> Self {
        Self::new()
    }
}

/// Actuator commands read from the controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActuatorState {
    pub pump_running: bool,
    pub valve_open: bool,
    pub heater_on: bool,
}

impl ActuatorState {
    /// Map the first three coils onto pump, valve and heater. Missing bits read as off.
    pub fn from_coils(coils: &[bool]) -> Self {
        let bit = |i: usize| coils.get(i).copied().unwrap_or(false);
        Self {
            pump_running: bit(0),
            valve_open: bit(1),
            heater_on: bit(2),
        }
    }
}

/// A computed field left its declared range. Indicates a model defect.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("{field} = {value} outside [{min}, {max}]")]
pub struct ModelInvariantViolation {
    pub field: &'static str,
    pub value: f64,
    pub min: f64,
    pub max: f64,
}
