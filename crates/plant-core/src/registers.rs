//! Field-bus register map and value encoding.
//!
//! Sensor values travel as unsigned 16-bit fixed-point integers with one
//! decimal digit of precision. The status word packs the actuator bits and
//! the two tank-level alarms.

use crate::process::{ActuatorState, ProcessState};
use serde::Serialize;

/// First coil of the actuator block.
pub const COIL_BASE: u16 = 0;
/// Coils read per cycle. Only the first three carry meaning.
pub const COIL_COUNT: u16 = 8;

/// First holding register of the sensor block.
pub const SENSOR_REGISTER_BASE: u16 = 0;
/// Temperature, pressure, flow, level, status word.
pub const SENSOR_REGISTER_COUNT: usize = 5;

pub const FIXED_POINT_SCALE: f64 = 10.0;

/// Scale by ten and truncate toward zero. Saturates at the `u16` bounds.
pub fn encode_fixed(value: f64) -> u16 {
    (value * FIXED_POINT_SCALE) as u16
}

pub fn decode_fixed(raw: u16) -> f64 {
    raw as f64 / FIXED_POINT_SCALE
}

/// Bit-packed actuator and alarm summary, recomputed every cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AlarmWord(u16);

impl AlarmWord {
    pub const PUMP_RUNNING: u16 = 1 << 0;
    pub const VALVE_OPEN: u16 = 1 << 1;
    pub const HEATER_ON: u16 = 1 << 2;
    pub const LEVEL_HIGH: u16 = 1 << 3;
    pub const LEVEL_LOW: u16 = 1 << 4;

    pub fn compute(state: &ProcessState, actuators: &ActuatorState) -> Self {
        let flags = [
            (actuators.pump_running, Self::PUMP_RUNNING),
            (actuators.valve_open, Self::VALVE_OPEN),
            (actuators.heater_on, Self::HEATER_ON),
            (state.level_high(), Self::LEVEL_HIGH),
            (state.level_low(), Self::LEVEL_LOW),
        ];
        Self(
            flags
                .iter()
                .filter(|(set, _)| *set)
                .fold(0, |word, (_, bit)| word | bit),
        )
    }

    pub fn bits(&self) -> u16 {
        self.0
    }

    pub fn contains(&self, bit: u16) -> bool {
        self.0 & bit == bit
    }
}

/// The five-register block written after every advance.
pub fn encode_sensor_block(state: &ProcessState, alarms: AlarmWord) -> [u16; SENSOR_REGISTER_COUNT] {
    [
        encode_fixed(state.temperature),
        encode_fixed(state.pressure),
        encode_fixed(state.flow_rate),
        encode_fixed(state.tank_level),
        alarms.bits(),
    ]
}
