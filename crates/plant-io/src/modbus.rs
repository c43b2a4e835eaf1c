use plant_core::{FieldBusTransport, TransportError};
use std::future::Future;
use std::io;
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio_modbus::client::Context;
use tokio_modbus::prelude::*;
use tracing::debug;

#[derive(Clone, Debug)]
pub struct ModbusConfig {
    pub host: String,
    pub port: u16,
    pub unit_id: u8,
    /// Ceiling on any single connect, read or write.
    pub io_timeout: Duration,
}

impl Default for ModbusConfig {
    fn default() -> Self {
        Self {
            host: "openplc".to_string(),
            port: 502,
            unit_id: 1,
            io_timeout: Duration::from_millis(1500),
        }
    }
}

/// Blocking Modbus TCP client. Each call drives a private current-thread
/// runtime and is bounded by `io_timeout`.
pub struct ModbusTransport {
    config: ModbusConfig,
    runtime: Runtime,
    ctx: Option<Context>,
}

impl ModbusTransport {
    pub fn new(config: ModbusConfig) -> io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            config,
            runtime,
            ctx: None,
        })
    }
}

fn run_with_timeout<T, F>(
    runtime: &Runtime,
    timeout: Duration,
    fut: F,
) -> Result<T, TransportError>
where
    F: Future<Output = io::Result<T>>,
{
    // The timer has to be created inside the runtime.
    match runtime.block_on(async move { tokio::time::timeout(timeout, fut).await }) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(classify(e)),
        Err(_) => Err(TransportError::Timeout(timeout)),
    }
}

// tokio-modbus reports exception responses as `io::ErrorKind::Other`.
fn classify(e: io::Error) -> TransportError {
    match e.kind() {
        io::ErrorKind::Other => TransportError::Exception(e.to_string()),
        _ => TransportError::Io(e),
    }
}

impl FieldBusTransport for ModbusTransport {
    fn connect(&mut self) -> Result<(), TransportError> {
        self.ctx = None;
        let host = self.config.host.clone();
        let port = self.config.port;
        let slave = Slave(self.config.unit_id);

        let timeout = self.config.io_timeout;
        let ctx = self.runtime.block_on(async move {
            let attempt = async {
                let addr = tokio::net::lookup_host((host.as_str(), port))
                    .await
                    .map_err(|e| TransportError::Resolve(format!("{host}:{port}: {e}")))?
                    .next()
                    .ok_or_else(|| TransportError::Resolve(format!("{host}:{port}")))?;
                debug!(%addr, "Resolved controller address");
                let ctx = tcp::connect_slave(addr, slave).await?;
                Ok::<_, TransportError>(ctx)
            };
            match tokio::time::timeout(timeout, attempt).await {
                Ok(result) => result,
                Err(_) => Err(TransportError::Timeout(timeout)),
            }
        })?;

        self.ctx = Some(ctx);
        Ok(())
    }

    fn read_coils(&mut self, addr: u16, count: u16) -> Result<Vec<bool>, TransportError> {
        let ctx = self.ctx.as_mut().ok_or(TransportError::NotConnected)?;
        let mut coils = run_with_timeout(
            &self.runtime,
            self.config.io_timeout,
            ctx.read_coils(addr, count),
        )?;
        // Responses are padded to whole bytes.
        coils.truncate(count as usize);
        Ok(coils)
    }

    fn write_registers(&mut self, addr: u16, values: &[u16]) -> Result<(), TransportError> {
        let ctx = self.ctx.as_mut().ok_or(TransportError::NotConnected)?;
        run_with_timeout(
            &self.runtime,
            self.config.io_timeout,
            ctx.write_multiple_registers(addr, values),
        )
    }

    fn disconnect(&mut self) {
        // Dropping the context closes the socket.
        self.ctx = None;
    }

    fn peer(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_before_connect_is_refused() {
        let mut transport = ModbusTransport::new(ModbusConfig::default()).unwrap();
        assert!(matches!(
            transport.read_coils(0, 8),
            Err(TransportError::NotConnected)
        ));
        assert!(matches!(
            transport.write_registers(0, &[1, 2, 3]),
            Err(TransportError::NotConnected)
        ));
    }

    #[test]
    fn peer_is_host_and_port() {
        let transport = ModbusTransport::new(ModbusConfig {
            host: "10.0.0.5".to_string(),
            port: 5020,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(transport.peer(), "10.0.0.5:5020");
    }

    #[test]
    fn unresolvable_host_fails_to_connect() {
        let mut transport = ModbusTransport::new(ModbusConfig {
            host: "no-such-controller.invalid".to_string(),
            io_timeout: Duration::from_secs(2),
            ..Default::default()
        })
        .unwrap();
        assert!(transport.connect().is_err());
    }
}
