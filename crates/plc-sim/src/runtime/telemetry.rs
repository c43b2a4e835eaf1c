use plant_core::{ProcessSnapshot, StateExchange};
use plant_io::metrics::{
    init_metrics, serve_metrics, ALARM_WORD, CYCLES_EXECUTED, FLOW_RATE_LPM, HEATER_ON,
    LINK_STATE, PRESSURE_PSI, PUMP_RUNNING, READ_FAILURES, RECONNECTS, TANK_LEVEL_PCT,
    TEMPERATURE_C, VALVE_OPEN, WRITE_FAILURES,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::info;

pub fn init() {
    init_metrics();
}

pub fn start_metrics_server(addr: &Option<String>) -> Option<thread::JoinHandle<()>> {
    addr.as_ref().map(|addr| {
        info!(addr = %addr, "Starting metrics server");
        serve_metrics(addr.clone())
    })
}

fn flag(on: bool) -> f64 {
    if on {
        1.0
    } else {
        0.0
    }
}

/// Counters only move forward; apply the growth since the last snapshot.
#[derive(Default)]
struct CounterMarks {
    cycles: u64,
    read_failures: u64,
    write_failures: u64,
    reconnects: u64,
}

impl CounterMarks {
    fn apply(&mut self, snapshot: &ProcessSnapshot) {
        let advance = |mark: &mut u64, now: u64| {
            let delta = now.saturating_sub(*mark);
            *mark = now.max(*mark);
            delta
        };
        CYCLES_EXECUTED.inc_by(advance(&mut self.cycles, snapshot.cycle_count));
        READ_FAILURES.inc_by(advance(&mut self.read_failures, snapshot.read_failures));
        WRITE_FAILURES.inc_by(advance(&mut self.write_failures, snapshot.write_failures));
        RECONNECTS.inc_by(advance(&mut self.reconnects, snapshot.reconnects));
    }
}

fn apply_gauges(snapshot: &ProcessSnapshot) {
    TEMPERATURE_C.set(snapshot.process.temperature);
    PRESSURE_PSI.set(snapshot.process.pressure);
    FLOW_RATE_LPM.set(snapshot.process.flow_rate);
    TANK_LEVEL_PCT.set(snapshot.process.tank_level);
    PUMP_RUNNING.set(flag(snapshot.actuators.pump_running));
    VALVE_OPEN.set(flag(snapshot.actuators.valve_open));
    HEATER_ON.set(flag(snapshot.actuators.heater_on));
    ALARM_WORD.set(snapshot.alarms.bits() as f64);
    LINK_STATE.set(snapshot.connection.as_level() as f64);
}

pub fn start_metrics_updater(
    exchange: Arc<StateExchange>,
    stop: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut marks = CounterMarks::default();
        while !stop.load(Ordering::Relaxed) {
            let snapshot = exchange.read_state();
            apply_gauges(&snapshot);
            marks.apply(&snapshot);
            thread::sleep(Duration::from_millis(200));
        }
    })
}
