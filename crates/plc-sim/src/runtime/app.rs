use crate::runtime::config::RuntimeConfig;
use crate::runtime::logging::init_tracing;
use crate::runtime::sinks::{FanoutSink, JsonLinesSink};
use crate::runtime::telemetry;
use plant_core::{
    BridgeConfig, ControlConfig, FieldBusBridge, LogSink, PlantContext, ProcessModel, Scheduler,
    StateExchange, TimeBase,
};
use plant_io::{ModbusConfig, ModbusTransport};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

pub fn run_from_args() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let (config, unknown) =
        match RuntimeConfig::parse_with_unknown(&args, |key| std::env::var(key).ok()) {
            Ok(parsed) => parsed,
            Err(e) => {
                eprintln!("plc-sim: configuration error: {e}");
                eprintln!("Run with --help for usage.");
                return ExitCode::from(2);
            }
        };
    if config.show_help {
        RuntimeConfig::print_help();
        return ExitCode::SUCCESS;
    }

    init_tracing(config.json_logs);
    for flag in unknown {
        warn!(flag = %flag, "Ignoring unknown option");
    }
    run(config)
}

pub fn run(config: RuntimeConfig) -> ExitCode {
    let stop = Arc::new(AtomicBool::new(false));
    if let Err(e) = install_shutdown_handler(Arc::clone(&stop)) {
        warn!(error = %e, "Ctrl-C handler unavailable; stop with --run-seconds or SIGKILL");
    }

    let bridge = if config.standalone {
        None
    } else {
        let modbus = ModbusConfig {
            host: config.host.clone(),
            port: config.port,
            unit_id: config.unit_id,
            io_timeout: config.io_timeout,
        };
        match ModbusTransport::new(modbus) {
            Ok(transport) => Some(FieldBusBridge::new(
                transport,
                BridgeConfig {
                    retries: config.retries,
                    retry_delay: config.retry_delay,
                },
            )),
            Err(e) => {
                error!(error = %e, "Failed to build field-bus runtime");
                return ExitCode::FAILURE;
            }
        }
    };

    let model = match config.seed {
        Some(seed) => ProcessModel::with_seed(seed),
        None => ProcessModel::new(),
    };

    let mut sink = FanoutSink::new().with(LogSink);
    if config.status_json {
        sink = sink.with(JsonLinesSink::new(std::io::stdout()));
    }

    let control_config = ControlConfig {
        cycle_time: config.period,
        status_every: config.status_every,
    };
    let exchange = Arc::new(StateExchange::new());

    let metrics_enabled = config.metrics_addr.is_some();
    let updater_handle = if metrics_enabled {
        telemetry::init();
        let _server = telemetry::start_metrics_server(&config.metrics_addr);
        Some(telemetry::start_metrics_updater(
            Arc::clone(&exchange),
            Arc::clone(&stop),
        ))
    } else {
        None
    };

    info!(
        host = %config.host,
        port = config.port,
        unit_id = config.unit_id,
        period_ms = config.period.as_millis() as u64,
        retries = config.retries,
        retry_delay_ms = config.retry_delay.as_millis() as u64,
        standalone = config.standalone,
        "Starting plant simulator"
    );

    let plant = PlantContext::new(model, bridge);
    let mut scheduler = Scheduler::new(plant, TimeBase::new(), sink, control_config)
        .with_exchange(Arc::clone(&exchange));
    let stop_loop = Arc::clone(&stop);
    let loop_handle = thread::spawn(move || {
        let stats = scheduler.run(&stop_loop);
        (stats, scheduler.link_stats())
    });

    if let Some(seconds) = config.run_seconds {
        info!(seconds, "Running for limited duration");
        let deadline = Instant::now().checked_add(Duration::from_secs(seconds));
        while deadline.map_or(true, |d| Instant::now() < d) && !stop.load(Ordering::Relaxed) {
            thread::sleep(Duration::from_millis(50));
        }
        stop.store(true, Ordering::Relaxed);
    }

    let (stats, link) = match loop_handle.join() {
        Ok(result) => result,
        Err(_) => {
            error!("Simulator loop panicked");
            return ExitCode::FAILURE;
        }
    };
    stop.store(true, Ordering::Relaxed);
    if let Some(handle) = updater_handle {
        let _ = handle.join();
    }

    info!(
        cycles_executed = stats.cycles_executed,
        status_reports = stats.status_reports,
        read_failures = link.read_failures,
        write_failures = link.write_failures,
        reconnects = link.reconnects,
        "Run complete"
    );
    ExitCode::SUCCESS
}

/// Raise `stop` on Ctrl-C. The listener runs on its own thread with a
/// single-threaded runtime.
fn install_shutdown_handler(stop: Arc<AtomicBool>) -> std::io::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    thread::Builder::new()
        .name("shutdown-signal".to_string())
        .spawn(move || {
            runtime.block_on(async {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        info!("Shutdown signal received");
                        stop.store(true, Ordering::Relaxed);
                    }
                    Err(e) => warn!(error = %e, "Failed to listen for shutdown signal"),
                }
            });
        })?;
    Ok(())
}
