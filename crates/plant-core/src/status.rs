use crate::process::{ActuatorState, ProcessState};
use crate::tags;
use log::info;
use serde::Serialize;

/// Periodic status snapshot handed to a [`StatusSink`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatusRecord {
    pub cycle: u64,
    pub temperature: f64,
    pub pressure: f64,
    pub flow_rate: f64,
    pub tank_level: f64,
    pub pump_running: bool,
    pub valve_open: bool,
    pub heater_on: bool,
}

impl StatusRecord {
    pub fn new(cycle: u64, process: &ProcessState, actuators: &ActuatorState) -> Self {
        Self {
            cycle,
            temperature: process.temperature,
            pressure: process.pressure,
            flow_rate: process.flow_rate,
            tank_level: process.tank_level,
            pump_running: actuators.pump_running,
            valve_open: actuators.valve_open,
            heater_on: actuators.heater_on,
        }
    }
}

pub trait StatusSink: Send {
    fn emit(&mut self, record: StatusRecord);
}

impl<S: StatusSink + ?Sized> StatusSink for Box<S> {
    fn emit(&mut self, record: StatusRecord) {
        (**self).emit(record)
    }
}

/// Writes each record through the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

impl StatusSink for LogSink {
    fn emit(&mut self, r: StatusRecord) {
        info!(
            target: "status",
            "cycle {}: {}={:.1}{} {}={:.1}{} {}={:.1}{} {}={:.1}{} pump={} valve={} heater={}",
            r.cycle,
            tags::TEMPERATURE_C.key,
            r.temperature,
            tags::TEMPERATURE_C.unit,
            tags::PRESSURE_PSI.key,
            r.pressure,
            tags::PRESSURE_PSI.unit,
            tags::FLOW_RATE_LPM.key,
            r.flow_rate,
            tags::FLOW_RATE_LPM.unit,
            tags::TANK_LEVEL_PCT.key,
            r.tank_level,
            tags::TANK_LEVEL_PCT.unit,
            on_off(r.pump_running),
            if r.valve_open { "open" } else { "closed" },
            on_off(r.heater_on),
        );
    }
}
