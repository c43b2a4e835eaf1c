use crate::bridge::ConnectionState;
use crate::process::{ActuatorState, ProcessState};
use crate::registers::AlarmWord;
use std::sync::Mutex;

/// Copy of the loop's state taken at the end of a cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProcessSnapshot {
    pub timestamp_us: u64,
    pub cycle_count: u64,
    pub process: ProcessState,
    pub actuators: ActuatorState,
    pub alarms: AlarmWord,
    pub connection: ConnectionState,
    pub read_failures: u64,
    pub write_failures: u64,
    pub reconnects: u64,
}

/// Single-slot handoff from the control loop to observers on other threads.
/// Readers always receive a copy, never a reference into live state.
#[derive(Debug, Default)]
pub struct StateExchange {
    latest: Mutex<ProcessSnapshot>,
}

impl StateExchange {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called by the control loop every cycle.
    pub fn publish_state(&self, snapshot: ProcessSnapshot) {
        *self.latest.lock().unwrap_or_else(|e| e.into_inner()) = snapshot;
    }

    pub fn read_state(&self) -> ProcessSnapshot {
        *self.latest.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_returns_last_published() {
        let exchange = StateExchange::new();
        assert_eq!(exchange.read_state().cycle_count, 0);

        for cycle_count in [7, 8] {
            exchange.publish_state(ProcessSnapshot {
                cycle_count,
                ..Default::default()
            });
        }
        assert_eq!(exchange.read_state().cycle_count, 8);
    }
}
