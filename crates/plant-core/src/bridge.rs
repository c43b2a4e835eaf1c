use crate::process::{ActuatorState, ProcessState};
use crate::registers::{encode_sensor_block, AlarmWord, COIL_BASE, COIL_COUNT, SENSOR_REGISTER_BASE};
use crate::timebase::Clock;
use crate::transport::{FieldBusTransport, TransportError};
use log::{info, warn};
use serde::Serialize;
use std::sync::atomic::AtomicBool;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    /// Numeric encoding for gauges.
    pub fn as_level(&self) -> u8 {
        match self {
            Self::Disconnected => 0,
            Self::Connecting => 1,
            Self::Connected => 2,
        }
    }
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("connect failed after {attempts} attempts")]
    ConnectFailure { attempts: u32 },
    #[error("actuator read failed: {0}")]
    ReadFailure(#[source] TransportError),
    #[error("sensor write failed: {0}")]
    WriteFailure(#[source] TransportError),
}

#[derive(Clone, Debug)]
pub struct BridgeConfig {
    /// Attempts per `connect()` call.
    pub retries: u32,
    /// Pause between attempts, and minimum spacing of reconnects.
    pub retry_delay: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            retries: 10,
            retry_delay: Duration::from_secs(5),
        }
    }
}

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct BridgeStats {
    pub connect_attempts: u64,
    pub reconnects: u64,
    pub read_failures: u64,
    pub write_failures: u64,
}

/// Owns the controller link and the last-known-good actuator commands.
pub struct FieldBusBridge<T: FieldBusTransport> {
    transport: T,
    config: BridgeConfig,
    state: ConnectionState,
    actuators: ActuatorState,
    last_attempt: Option<Duration>,
    ever_connected: bool,
    stats: BridgeStats,
}

impl<T: FieldBusTransport> FieldBusBridge<T> {
    pub fn new(transport: T, config: BridgeConfig) -> Self {
        Self {
            transport,
            config,
            state: ConnectionState::Disconnected,
            actuators: ActuatorState::default(),
            last_attempt: None,
            ever_connected: false,
            stats: BridgeStats::default(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Last successfully read actuator commands.
    pub fn actuators(&self) -> ActuatorState {
        self.actuators
    }

    pub fn stats(&self) -> BridgeStats {
        self.stats
    }

    /// Run the full bounded retry sequence. Exhaustion is not fatal: the
    /// bridge stays `Disconnected` and the caller carries on standalone.
    /// Raising `stop` abandons the sequence during a backoff sleep.
    pub fn connect<C: Clock>(&mut self, clock: &C, stop: &AtomicBool) -> ConnectionState {
        let attempts = self.config.retries.max(1);
        info!(
            "Connecting to controller at {} ({} attempts, {:?} apart)",
            self.transport.peer(),
            attempts,
            self.config.retry_delay
        );

        for attempt in 1..=attempts {
            if self.attempt(clock) {
                return self.state;
            }
            if attempt < attempts && !clock.sleep(self.config.retry_delay, stop) {
                info!("Connect sequence cancelled after {attempt} attempts");
                return self.state;
            }
        }

        warn!("{}; continuing standalone", BridgeError::ConnectFailure { attempts });
        self.state
    }

    /// Cycle-boundary upkeep: while disconnected, make at most one connect
    /// attempt, spaced at least `retry_delay` from the previous one.
    pub fn maintain<C: Clock>(&mut self, clock: &C) -> ConnectionState {
        if self.state == ConnectionState::Connected {
            return self.state;
        }
        let due = match self.last_attempt {
            Some(at) => clock.now().saturating_sub(at) >= self.config.retry_delay,
            None => true,
        };
        let was_connected = self.ever_connected;
        if due && self.attempt(clock) && was_connected {
            self.stats.reconnects += 1;
        }
        self.state
    }

    fn attempt<C: Clock>(&mut self, clock: &C) -> bool {
        self.state = ConnectionState::Connecting;
        self.last_attempt = Some(clock.now());
        self.stats.connect_attempts += 1;
        match self.transport.connect() {
            Ok(()) => {
                self.state = ConnectionState::Connected;
                if self.ever_connected {
                    info!("Reconnected to controller at {}", self.transport.peer());
                } else {
                    info!("Connected to controller at {}", self.transport.peer());
                }
                self.ever_connected = true;
                true
            }
            Err(e) => {
                warn!(
                    "Connection attempt {} to {} failed: {}",
                    self.stats.connect_attempts,
                    self.transport.peer(),
                    e
                );
                self.state = ConnectionState::Disconnected;
                false
            }
        }
    }

    /// Read the actuator coils. On failure the last-known-good commands are
    /// kept and the link is marked down.
    pub fn read_actuators(&mut self) -> Result<ActuatorState, BridgeError> {
        if !self.is_connected() {
            return Err(BridgeError::ReadFailure(TransportError::NotConnected));
        }
        let result = self
            .transport
            .read_coils(COIL_BASE, COIL_COUNT)
            .and_then(|coils| {
                if coils.len() < 3 {
                    Err(TransportError::ShortResponse {
                        expected: 3,
                        got: coils.len(),
                    })
                } else {
                    Ok(ActuatorState::from_coils(&coils))
                }
            });

        match result {
            Ok(actuators) => {
                self.actuators = actuators;
                Ok(actuators)
            }
            Err(e) => {
                self.stats.read_failures += 1;
                let err = BridgeError::ReadFailure(e);
                self.degrade(&err);
                Err(err)
            }
        }
    }

    /// Write the sensor block and status word in one request; failures are
    /// not retried here.
    pub fn write_sensors(
        &mut self,
        state: &ProcessState,
        alarms: AlarmWord,
    ) -> Result<(), BridgeError> {
        if !self.is_connected() {
            return Err(BridgeError::WriteFailure(TransportError::NotConnected));
        }
        let block = encode_sensor_block(state, alarms);
        match self.transport.write_registers(SENSOR_REGISTER_BASE, &block) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.stats.write_failures += 1;
                let err = BridgeError::WriteFailure(e);
                self.degrade(&err);
                Err(err)
            }
        }
    }

    fn degrade(&mut self, err: &BridgeError) {
        warn!("{err}; link to {} marked down", self.transport.peer());
        self.transport.disconnect();
        self.state = ConnectionState::Disconnected;
    }

    pub fn close(&mut self) {
        if self.state != ConnectionState::Disconnected {
            info!("Closing controller link to {}", self.transport.peer());
            self.transport.disconnect();
            self.state = ConnectionState::Disconnected;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedTransport, TransportLog};
    use crate::timebase::ManualClock;

    fn config() -> BridgeConfig {
        BridgeConfig {
            retries: 10,
            retry_delay: Duration::from_secs(5),
        }
    }

    #[test]
    fn connects_on_first_success() {
        let (transport, log) = ScriptedTransport::pair();
        let mut bridge = FieldBusBridge::new(transport, config());
        let clock = ManualClock::new();
        let stop = AtomicBool::new(false);

        assert_eq!(bridge.connect(&clock, &stop), ConnectionState::Connected);
        assert_eq!(log.connects(), 1);
        assert_eq!(clock.now(), Duration::ZERO);
    }

    #[test]
    fn retries_with_fixed_delay_then_gives_up() {
        let (transport, log) = ScriptedTransport::pair();
        log.fail_connects(usize::MAX);
        let mut bridge = FieldBusBridge::new(transport, config());
        let clock = ManualClock::new();
        let stop = AtomicBool::new(false);

        assert_eq!(bridge.connect(&clock, &stop), ConnectionState::Disconnected);
        assert_eq!(log.connects(), 10);
        // Nine pauses between ten attempts.
        assert_eq!(clock.now(), Duration::from_secs(45));
    }

    #[test]
    fn succeeds_after_transient_failures() {
        let (transport, log) = ScriptedTransport::pair();
        log.fail_connects(3);
        let mut bridge = FieldBusBridge::new(transport, config());
        let clock = ManualClock::new();
        let stop = AtomicBool::new(false);

        assert_eq!(bridge.connect(&clock, &stop), ConnectionState::Connected);
        assert_eq!(log.connects(), 4);
        assert_eq!(clock.now(), Duration::from_secs(15));
    }

    #[test]
    fn stop_interrupts_backoff() {
        let (transport, log) = ScriptedTransport::pair();
        log.fail_connects(usize::MAX);
        let mut bridge = FieldBusBridge::new(transport, config());
        let stop = AtomicBool::new(true);

        bridge.connect(&ManualClock::new(), &stop);
        assert_eq!(log.connects(), 1);
        assert_eq!(bridge.state(), ConnectionState::Disconnected);
    }

    fn connected() -> (FieldBusBridge<ScriptedTransport>, TransportLog, ManualClock) {
        let (transport, log) = ScriptedTransport::pair();
        let mut bridge = FieldBusBridge::new(transport, config());
        let clock = ManualClock::new();
        bridge.connect(&clock, &AtomicBool::new(false));
        (bridge, log, clock)
    }

    #[test]
    fn read_maps_first_three_coils() {
        let (mut bridge, log, _clock) = connected();
        log.set_coils(vec![false, true, true, true, true, true, true, true]);

        let actuators = bridge.read_actuators().unwrap();
        assert!(!actuators.pump_running);
        assert!(actuators.valve_open);
        assert!(actuators.heater_on);
        assert_eq!(log.last_read(), Some((COIL_BASE, COIL_COUNT)));
    }

    #[test]
    fn read_failure_keeps_last_known_good() {
        let (mut bridge, log, _clock) = connected();
        log.set_coils(vec![true, false, true]);
        let good = bridge.read_actuators().unwrap();

        log.fail_reads(1);
        let err = bridge.read_actuators().unwrap_err();
        assert!(matches!(err, BridgeError::ReadFailure(_)));
        assert_eq!(bridge.actuators(), good);
        assert_eq!(bridge.state(), ConnectionState::Disconnected);
        assert_eq!(bridge.stats().read_failures, 1);
        assert_eq!(log.disconnects(), 1);
    }

    #[test]
    fn short_coil_response_is_a_read_failure() {
        let (mut bridge, log, _clock) = connected();
        log.set_coils(vec![true, true]);
        let err = bridge.read_actuators().unwrap_err();
        assert!(matches!(
            err,
            BridgeError::ReadFailure(TransportError::ShortResponse { expected: 3, got: 2 })
        ));
    }

    #[test]
    fn write_sends_single_five_register_block() {
        let (mut bridge, log, _clock) = connected();
        let state = ProcessState {
            temperature: 37.26,
            pressure: 120.0,
            flow_rate: 80.5,
            tank_level: 95.0,
        };
        let actuators = ActuatorState {
            pump_running: true,
            ..ActuatorState::default()
        };
        bridge
            .write_sensors(&state, AlarmWord::compute(&state, &actuators))
            .unwrap();

        assert_eq!(log.writes(), vec![(0, vec![372, 1200, 805, 950, 9])]);
    }

    #[test]
    fn write_failure_drops_link_without_retry() {
        let (mut bridge, log, _clock) = connected();
        log.fail_writes(1);
        let err = bridge
            .write_sensors(&ProcessState::new(), AlarmWord::default())
            .unwrap_err();
        assert!(matches!(err, BridgeError::WriteFailure(_)));
        assert_eq!(bridge.state(), ConnectionState::Disconnected);
        assert!(log.writes().is_empty());
        assert_eq!(log.write_calls(), 1);
    }

    #[test]
    fn io_refused_while_disconnected() {
        let (transport, log) = ScriptedTransport::pair();
        let mut bridge = FieldBusBridge::new(transport, config());
        assert!(matches!(
            bridge.read_actuators(),
            Err(BridgeError::ReadFailure(TransportError::NotConnected))
        ));
        assert!(bridge
            .write_sensors(&ProcessState::new(), AlarmWord::default())
            .is_err());
        assert_eq!(log.write_calls(), 0);
    }

    #[test]
    fn maintain_spaces_reconnects_by_retry_delay() {
        let (mut bridge, log, clock) = connected();
        log.fail_writes(1);
        let _ = bridge.write_sensors(&ProcessState::new(), AlarmWord::default());
        log.fail_connects(1);

        clock.advance(Duration::from_secs(5));
        assert_eq!(bridge.maintain(&clock), ConnectionState::Disconnected);
        assert_eq!(log.connects(), 2);

        clock.advance(Duration::from_secs(1));
        assert_eq!(bridge.maintain(&clock), ConnectionState::Disconnected);
        assert_eq!(log.connects(), 2);

        clock.advance(Duration::from_secs(4));
        assert_eq!(bridge.maintain(&clock), ConnectionState::Connected);
        assert_eq!(log.connects(), 3);
        assert_eq!(bridge.stats().reconnects, 1);
    }

    #[test]
    fn maintain_is_idle_while_connected() {
        let (mut bridge, log, clock) = connected();
        clock.advance(Duration::from_secs(60));
        bridge.maintain(&clock);
        assert_eq!(log.connects(), 1);
    }

    #[test]
    fn close_disconnects_once() {
        let (mut bridge, log, _clock) = connected();
        bridge.close();
        bridge.close();
        assert_eq!(log.disconnects(), 1);
        assert_eq!(bridge.state(), ConnectionState::Disconnected);
    }
}
