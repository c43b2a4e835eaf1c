use crate::bridge::{BridgeStats, ConnectionState, FieldBusBridge};
use crate::model::ProcessModel;
use crate::process::{ActuatorState, ProcessState};
use crate::registers::AlarmWord;
use crate::status::{StatusRecord, StatusSink};
use crate::sync::{ProcessSnapshot, StateExchange};
use crate::timebase::Clock;
use crate::transport::FieldBusTransport;
use log::{error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct ControlConfig {
    /// Sleep between cycles. Not shortened to absorb I/O latency.
    pub cycle_time: Duration,
    /// Emit a status record every this many cycles, starting with cycle 0.
    pub status_every: u64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            cycle_time: Duration::from_secs(1),
            status_every: 10,
        }
    }
}

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct ExecutionStats {
    pub cycles_executed: u64,
    pub status_reports: u64,
    pub invariant_violations: u64,
}

/// Everything one simulated plant owns: model, state and controller link.
pub struct PlantContext<T: FieldBusTransport> {
    pub model: ProcessModel,
    pub process: ProcessState,
    /// Commands in effect when running without a bridge.
    pub actuators: ActuatorState,
    pub bridge: Option<FieldBusBridge<T>>,
}

impl<T: FieldBusTransport> PlantContext<T> {
    pub fn new(model: ProcessModel, bridge: Option<FieldBusBridge<T>>) -> Self {
        Self {
            model,
            process: ProcessState::new(),
            actuators: ActuatorState::default(),
            bridge,
        }
    }

    pub fn connection(&self) -> ConnectionState {
        self.bridge
            .as_ref()
            .map(FieldBusBridge::state)
            .unwrap_or_default()
    }
}

/// Fixed-cadence read → advance → write loop.
pub struct Scheduler<T: FieldBusTransport, C: Clock, S: StatusSink> {
    plant: PlantContext<T>,
    clock: C,
    sink: S,
    config: ControlConfig,
    exchange: Option<Arc<StateExchange>>,
    stats: ExecutionStats,
}

impl<T: FieldBusTransport, C: Clock, S: StatusSink> Scheduler<T, C, S> {
    pub fn new(plant: PlantContext<T>, clock: C, sink: S, config: ControlConfig) -> Self {
        Self {
            plant,
            clock,
            sink,
            config,
            exchange: None,
            stats: ExecutionStats::default(),
        }
    }

    /// Publish a copied snapshot after every cycle.
    pub fn with_exchange(mut self, exchange: Arc<StateExchange>) -> Self {
        self.exchange = Some(exchange);
        self
    }

    pub fn plant(&self) -> &PlantContext<T> {
        &self.plant
    }

    pub fn stats(&self) -> &ExecutionStats {
        &self.stats
    }

    /// Link counters; all zero without a bridge.
    pub fn link_stats(&self) -> BridgeStats {
        self.plant
            .bridge
            .as_ref()
            .map(FieldBusBridge::stats)
            .unwrap_or_default()
    }

    /// Run until `stop` is raised, then close the link.
    pub fn run(&mut self, stop: &AtomicBool) -> ExecutionStats {
        if self.plant.bridge.is_some() {
            self.publish(ConnectionState::Connecting);
        }
        if let Some(bridge) = self.plant.bridge.as_mut() {
            if bridge.connect(&self.clock, stop) != ConnectionState::Connected
                && !stop.load(Ordering::Relaxed)
            {
                warn!("Starting in standalone mode; reconnect attempts continue in the background");
            }
        } else {
            info!("No field-bus bridge configured; running standalone");
        }

        info!(
            "Simulator loop started (cycle {:?}, status every {} cycles)",
            self.config.cycle_time, self.config.status_every
        );

        while !stop.load(Ordering::Relaxed) {
            self.run_cycle();
            if !self.clock.sleep(self.config.cycle_time, stop) {
                break;
            }
        }

        self.shutdown();
        self.stats
    }

    /// One cycle: read actuators, advance the model, write sensors.
    pub fn run_cycle(&mut self) {
        let cycle = self.stats.cycles_executed;
        let dt_s = self.config.cycle_time.as_secs_f64();
        let plant = &mut self.plant;

        let actuators = match plant.bridge.as_mut() {
            Some(bridge) => {
                bridge.maintain(&self.clock);
                if bridge.is_connected() {
                    // Failures are counted by the bridge.
                    let _ = bridge.read_actuators();
                }
                bridge.actuators()
            }
            None => plant.actuators,
        };
        plant.actuators = actuators;

        plant.process = plant.model.advance(&plant.process, &actuators, dt_s);
        if let Err(violation) = plant.process.check_bounds() {
            self.stats.invariant_violations += 1;
            error!("Process model defect: {violation}");
            if cfg!(debug_assertions) {
                panic!("process model left its envelope: {violation}");
            }
        }

        let alarms = AlarmWord::compute(&plant.process, &actuators);
        if let Some(bridge) = plant.bridge.as_mut() {
            if bridge.is_connected() {
                let _ = bridge.write_sensors(&plant.process, alarms);
            }
        }

        if self.config.status_every > 0 && cycle % self.config.status_every == 0 {
            self.sink
                .emit(StatusRecord::new(cycle, &plant.process, &actuators));
            self.stats.status_reports += 1;
        }

        self.stats.cycles_executed += 1;
        self.publish(self.plant.connection());
    }

    fn publish(&self, connection: ConnectionState) {
        let Some(exchange) = &self.exchange else {
            return;
        };
        let plant = &self.plant;
        let link = self.link_stats();
        exchange.publish_state(ProcessSnapshot {
            timestamp_us: self.clock.now().as_micros() as u64,
            cycle_count: self.stats.cycles_executed,
            process: plant.process,
            actuators: plant.actuators,
            alarms: AlarmWord::compute(&plant.process, &plant.actuators),
            connection,
            read_failures: link.read_failures,
            write_failures: link.write_failures,
            reconnects: link.reconnects,
        });
    }

    fn shutdown(&mut self) {
        if let Some(bridge) = self.plant.bridge.as_mut() {
            bridge.close();
        }
        self.publish(self.plant.connection());
        info!(
            "Simulator loop stopped after {} cycles",
            self.stats.cycles_executed
        );
    }
}
