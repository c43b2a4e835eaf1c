mod app;
mod config;
mod logging;
mod sinks;
mod telemetry;

pub use app::run_from_args;
