//! Prometheus metrics for the plant simulator.
//!
//! Counters track the loop and the controller link; gauges mirror the most
//! recent process snapshot.

use plant_core::tags;
use prometheus::{Encoder, Gauge, IntCounter, Registry, TextEncoder};
use std::sync::LazyLock;
use std::thread;
use tiny_http::{Header, Response, Server};

/// Global metrics registry
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

fn counter(name: &str, help: &str) -> IntCounter {
    let counter = IntCounter::new(name, help).unwrap();
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
}

fn gauge(name: &str, help: &str) -> Gauge {
    let gauge = Gauge::new(name, help).unwrap();
    REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
}

// ============================================================================
// Loop and link counters
// ============================================================================

pub static CYCLES_EXECUTED: LazyLock<IntCounter> =
    LazyLock::new(|| counter("plcsim_cycles_total", "Simulation cycles executed"));

pub static READ_FAILURES: LazyLock<IntCounter> = LazyLock::new(|| {
    counter(
        "plcsim_read_failures_total",
        "Failed actuator coil reads",
    )
});

pub static WRITE_FAILURES: LazyLock<IntCounter> = LazyLock::new(|| {
    counter(
        "plcsim_write_failures_total",
        "Failed sensor register writes",
    )
});

pub static RECONNECTS: LazyLock<IntCounter> = LazyLock::new(|| {
    counter(
        "plcsim_reconnects_total",
        "Successful reconnects after link loss",
    )
});

// ============================================================================
// Process gauges
// ============================================================================

pub static TEMPERATURE_C: LazyLock<Gauge> =
    LazyLock::new(|| gauge(tags::TEMPERATURE_C.metric, "Process temperature in Celsius"));

pub static PRESSURE_PSI: LazyLock<Gauge> =
    LazyLock::new(|| gauge(tags::PRESSURE_PSI.metric, "Process pressure in PSI"));

pub static FLOW_RATE_LPM: LazyLock<Gauge> =
    LazyLock::new(|| gauge(tags::FLOW_RATE_LPM.metric, "Flow rate in litres per minute"));

pub static TANK_LEVEL_PCT: LazyLock<Gauge> =
    LazyLock::new(|| gauge(tags::TANK_LEVEL_PCT.metric, "Tank level in percent"));

pub static PUMP_RUNNING: LazyLock<Gauge> =
    LazyLock::new(|| gauge(tags::PUMP_RUNNING.metric, "Pump command (1=running)"));

pub static VALVE_OPEN: LazyLock<Gauge> =
    LazyLock::new(|| gauge(tags::VALVE_OPEN.metric, "Valve command (1=open)"));

pub static HEATER_ON: LazyLock<Gauge> =
    LazyLock::new(|| gauge(tags::HEATER_ON.metric, "Heater command (1=on)"));

pub static ALARM_WORD: LazyLock<Gauge> =
    LazyLock::new(|| gauge(tags::ALARM_WORD.metric, "Packed status and alarm word"));

/// Controller link (0=disconnected,1=connecting,2=connected)
pub static LINK_STATE: LazyLock<Gauge> = LazyLock::new(|| {
    gauge(
        tags::LINK_STATE.metric,
        "Controller link state (0=disconnected,1=connecting,2=connected)",
    )
});

// ============================================================================
// Metrics HTTP Server
// ============================================================================

fn render() -> Result<Vec<u8>, prometheus::Error> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(buffer)
}

/// Start the metrics HTTP server on the given address.
/// Returns a join handle for the server thread.
pub fn serve_metrics(bind_addr: String) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let server = match Server::http(&bind_addr) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("Failed to start metrics server on {}: {}", bind_addr, e);
                return;
            }
        };

        tracing::info!("Metrics server listening on http://{}/metrics", bind_addr);

        for request in server.incoming_requests() {
            let path = request.url().to_string();
            let result = match path.as_str() {
                "/metrics" => match render() {
                    Ok(buffer) => {
                        let mut response = Response::from_data(buffer);
                        if let Ok(header) = Header::from_bytes(
                            &b"Content-Type"[..],
                            &b"text/plain; version=0.0.4"[..],
                        ) {
                            response = response.with_header(header);
                        }
                        request.respond(response)
                    }
                    Err(e) => {
                        tracing::warn!("Failed to encode metrics: {}", e);
                        request.respond(
                            Response::from_string("Internal Server Error").with_status_code(500),
                        )
                    }
                },
                "/health" => request.respond(Response::from_string("OK")),
                // Ready once the loop has completed a cycle.
                "/ready" if CYCLES_EXECUTED.get() > 0 => {
                    request.respond(Response::from_string("Ready"))
                }
                "/ready" => {
                    request.respond(Response::from_string("Not Ready").with_status_code(503))
                }
                _ => request.respond(Response::from_string("Not Found").with_status_code(404)),
            };
            if let Err(e) = result {
                tracing::debug!("Failed to send metrics response: {}", e);
            }
        }
    })
}

/// Initialize all metrics (forces lazy initialization)
pub fn init_metrics() {
    let _ = CYCLES_EXECUTED.get();
    let _ = READ_FAILURES.get();
    let _ = WRITE_FAILURES.get();
    let _ = RECONNECTS.get();
    let _ = TEMPERATURE_C.get();
    let _ = PRESSURE_PSI.get();
    let _ = FLOW_RATE_LPM.get();
    let _ = TANK_LEVEL_PCT.get();
    let _ = PUMP_RUNNING.get();
    let _ = VALVE_OPEN.get();
    let _ = HEATER_ON.get();
    let _ = ALARM_WORD.get();
    let _ = LINK_STATE.get();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendered_text_names_every_series() {
        init_metrics();
        TANK_LEVEL_PCT.set(42.0);
        let text = String::from_utf8(render().unwrap()).unwrap();
        for name in [
            "plcsim_cycles_total",
            "plcsim_write_failures_total",
            tags::TANK_LEVEL_PCT.metric,
            tags::LINK_STATE.metric,
        ] {
            assert!(text.contains(name), "missing {name}");
        }
        assert!(text.contains("plcsim_tank_level_percent 42"));
    }
}
