//! In-memory transport with scripted failures.

use crate::transport::{FieldBusTransport, TransportError};
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Script {
    coils: Vec<bool>,
    connect_failures: usize,
    read_failures: usize,
    write_failures: usize,
    connects: usize,
    disconnects: usize,
    write_calls: usize,
    last_read: Option<(u16, u16)>,
    writes: Vec<(u16, Vec<u16>)>,
}

/// Handle for scripting and inspecting a [`ScriptedTransport`] after it has
/// been moved into a bridge.
#[derive(Debug, Clone, Default)]
pub struct TransportLog {
    inner: Arc<Mutex<Script>>,
}

impl TransportLog {
    fn lock(&self) -> MutexGuard<'_, Script> {
        self.inner.lock().unwrap()
    }

    pub fn set_coils(&self, coils: Vec<bool>) {
        self.lock().coils = coils;
    }
    pub fn fail_connects(&self, n: usize) {
        self.lock().connect_failures = n;
    }
    pub fn fail_reads(&self, n: usize) {
        self.lock().read_failures = n;
    }
    pub fn fail_writes(&self, n: usize) {
        self.lock().write_failures = n;
    }
    pub fn connects(&self) -> usize {
        self.lock().connects
    }
    pub fn disconnects(&self) -> usize {
        self.lock().disconnects
    }
    pub fn write_calls(&self) -> usize {
        self.lock().write_calls
    }
    pub fn last_read(&self) -> Option<(u16, u16)> {
        self.lock().last_read
    }
    /// Successful register writes, in order.
    pub fn writes(&self) -> Vec<(u16, Vec<u16>)> {
        self.lock().writes.clone()
    }
}

fn take_failure(counter: &mut usize) -> bool {
    if *counter > 0 {
        *counter = counter.saturating_sub(1);
        true
    } else {
        false
    }
}

fn broken_pipe() -> TransportError {
    TransportError::Io(io::Error::new(io::ErrorKind::BrokenPipe, "scripted failure"))
}

#[derive(Debug)]
pub struct ScriptedTransport {
    log: TransportLog,
}

impl ScriptedTransport {
    pub fn pair() -> (Self, TransportLog) {
        let log = TransportLog::default();
        log.set_coils(vec![false; 8]);
        (Self { log: log.clone() }, log)
    }
}

impl FieldBusTransport for ScriptedTransport {
    fn connect(&mut self) -> Result<(), TransportError> {
        let mut script = self.log.lock();
        script.connects += 1;
        if take_failure(&mut script.connect_failures) {
            return Err(TransportError::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "scripted refusal",
            )));
        }
        Ok(())
    }

    fn read_coils(&mut self, addr: u16, count: u16) -> Result<Vec<bool>, TransportError> {
        let mut script = self.log.lock();
        script.last_read = Some((addr, count));
        if take_failure(&mut script.read_failures) {
            return Err(broken_pipe());
        }
        Ok(script.coils.clone())
    }

    fn write_registers(&mut self, addr: u16, values: &[u16]) -> Result<(), TransportError> {
        let mut script = self.log.lock();
        script.write_calls += 1;
        if take_failure(&mut script.write_failures) {
            return Err(broken_pipe());
        }
        script.writes.push((addr, values.to_vec()));
        Ok(())
    }

    fn disconnect(&mut self) {
        self.log.lock().disconnects += 1;
    }

    fn peer(&self) -> String {
        "scripted".to_string()
    }
}
