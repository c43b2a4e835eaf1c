pub mod bridge;
pub mod control_loop;
pub mod model;
mod model_proptest;
pub mod process;
pub mod registers;
pub mod status;
pub mod sync;
pub mod tags;
#[cfg(test)]
mod testing;
pub mod timebase;
pub mod transport;

pub use bridge::{BridgeConfig, BridgeError, BridgeStats, ConnectionState, FieldBusBridge};
pub use control_loop::{ControlConfig, ExecutionStats, PlantContext, Scheduler};
pub use model::{Noise, NoiseProfile, ProcessModel};
pub use process::{ActuatorState, ModelInvariantViolation, ProcessState};
pub use registers::{decode_fixed, encode_fixed, AlarmWord};
pub use status::{LogSink, StatusRecord, StatusSink};
pub use sync::{ProcessSnapshot, StateExchange};
pub use timebase::{Clock, ManualClock, TimeBase};
pub use transport::{FieldBusTransport, TransportError};
