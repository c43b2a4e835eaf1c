use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("controller exception: {0}")]
    Exception(String),
    #[error("short response: expected {expected} values, got {got}")]
    ShortResponse { expected: usize, got: usize },
    #[error("not connected")]
    NotConnected,
    #[error("cannot resolve {0}")]
    Resolve(String),
}

/// Request/response access to the remote controller's coils and holding
/// registers. Every call must return within a bounded time.
pub trait FieldBusTransport: Send {
    fn connect(&mut self) -> Result<(), TransportError>;
    fn read_coils(&mut self, addr: u16, count: u16) -> Result<Vec<bool>, TransportError>;
    fn write_registers(&mut self, addr: u16, values: &[u16]) -> Result<(), TransportError>;
    fn disconnect(&mut self);
    /// Human-readable peer description for logs.
    fn peer(&self) -> String;
}
