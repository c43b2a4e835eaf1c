use std::net::IpAddr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} requires a value")]
    MissingValue(String),
    #[error("invalid value {value:?} for {option}: {reason}")]
    InvalidValue {
        option: String,
        value: String,
        reason: String,
    },
    #[error("malformed controller host {0:?}")]
    InvalidHost(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    pub show_help: bool,
    pub host: String,
    pub port: u16,
    pub unit_id: u8,
    pub period: Duration,
    pub retries: u32,
    pub retry_delay: Duration,
    pub io_timeout: Duration,
    pub status_every: u64,
    pub standalone: bool,
    pub run_seconds: Option<u64>,
    pub json_logs: bool,
    pub status_json: bool,
    pub metrics_addr: Option<String>,
    pub seed: Option<u64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            show_help: false,
            host: "openplc".to_string(),
            port: 502,
            unit_id: 1,
            period: Duration::from_secs(1),
            retries: 10,
            retry_delay: Duration::from_secs(5),
            io_timeout: Duration::from_millis(1500),
            status_every: 10,
            standalone: false,
            run_seconds: None,
            json_logs: false,
            status_json: false,
            metrics_addr: None,
            seed: None,
        }
    }
}

fn parse<T: std::str::FromStr>(option: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.parse::<T>().map_err(|e| ConfigError::InvalidValue {
        option: option.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn positive(option: &str, value: &str) -> Result<u64, ConfigError> {
    match parse::<u64>(option, value)? {
        0 => Err(ConfigError::InvalidValue {
            option: option.to_string(),
            value: value.to_string(),
            reason: "must be at least 1".to_string(),
        }),
        n => Ok(n),
    }
}

/// Upper bound on periods, delays and timeouts: one day.
const MAX_INTERVAL_MS: u64 = 86_400_000;
/// Upper bound on `--run-seconds`: one year.
const MAX_RUN_SECONDS: u64 = 366 * 86_400;

fn bounded(option: &str, value: &str, max: u64) -> Result<u64, ConfigError> {
    let n = positive(option, value)?;
    if n > max {
        return Err(ConfigError::InvalidValue {
            option: option.to_string(),
            value: value.to_string(),
            reason: format!("must be at most {max}"),
        });
    }
    Ok(n)
}

fn millis(option: &str, value: &str) -> Result<Duration, ConfigError> {
    bounded(option, value, MAX_INTERVAL_MS).map(Duration::from_millis)
}

/// Literal IP address or RFC 1123 host name.
pub fn validate_host(host: &str) -> Result<(), ConfigError> {
    if host.parse::<IpAddr>().is_ok() {
        return Ok(());
    }
    let label_ok = |label: &str| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    };
    let name = host.strip_suffix('.').unwrap_or(host);
    if name.is_empty() || name.len() > 253 || !name.split('.').all(label_ok) {
        return Err(ConfigError::InvalidHost(host.to_string()));
    }
    Ok(())
}

/// Flags that take a value, mapped to their environment fallback.
const VALUED: &[(&str, Option<&str>)] = &[
    ("--host", Some("PLC_HOST")),
    ("--port", Some("PLC_PORT")),
    ("--unit-id", Some("PLC_UNIT_ID")),
    ("--period-ms", Some("PLC_PERIOD_MS")),
    ("--retries", Some("PLC_RETRIES")),
    ("--retry-delay-ms", Some("PLC_RETRY_DELAY_MS")),
    ("--io-timeout-ms", Some("PLC_IO_TIMEOUT_MS")),
    ("--status-every", Some("PLC_STATUS_EVERY")),
    ("--metrics-addr", Some("PLC_METRICS_ADDR")),
    ("--seed", Some("PLC_SEED")),
    ("--run-seconds", None),
];

impl RuntimeConfig {
    /// Command-line flags win; environment variables fill the rest.
    /// Unknown flags are returned for the caller to report.
    pub fn parse_with_unknown<F>(
        args: &[String],
        env: F,
    ) -> Result<(Self, Vec<String>), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = RuntimeConfig::default();
        let mut values: Vec<(&str, String)> = Vec::new();
        let mut unknown = Vec::new();

        let mut i = 1;
        while i < args.len() {
            let arg = args[i].as_str();
            match arg {
                "--standalone" => cfg.standalone = true,
                "--json-logs" => cfg.json_logs = true,
                "--status-json" => cfg.status_json = true,
                "--help" | "-h" => {
                    cfg.show_help = true;
                    return Ok((cfg, unknown));
                }
                _ => match VALUED.iter().find(|(flag, _)| *flag == arg) {
                    Some((flag, _)) => {
                        let value = args
                            .get(i + 1)
                            .ok_or_else(|| ConfigError::MissingValue(flag.to_string()))?;
                        values.push((*flag, value.clone()));
                        i += 1;
                    }
                    None => unknown.push(arg.to_string()),
                },
            }
            i += 1;
        }

        for (flag, env_key) in VALUED {
            if values.iter().any(|(f, _)| f == flag) {
                continue;
            }
            if let Some(value) = env_key.and_then(&env) {
                values.push((*flag, value));
            }
        }

        for (flag, value) in &values {
            cfg.apply(flag, value)?;
        }
        validate_host(&cfg.host)?;
        Ok((cfg, unknown))
    }

    fn apply(&mut self, flag: &str, value: &str) -> Result<(), ConfigError> {
        match flag {
            "--host" => self.host = value.trim().to_string(),
            "--port" => self.port = parse(flag, value)?,
            "--unit-id" => self.unit_id = parse(flag, value)?,
            "--period-ms" => self.period = millis(flag, value)?,
            "--retries" => {
                self.retries = u32::try_from(positive(flag, value)?).map_err(|e| {
                    ConfigError::InvalidValue {
                        option: flag.to_string(),
                        value: value.to_string(),
                        reason: e.to_string(),
                    }
                })?
            }
            "--retry-delay-ms" => self.retry_delay = millis(flag, value)?,
            "--io-timeout-ms" => self.io_timeout = millis(flag, value)?,
            "--status-every" => self.status_every = positive(flag, value)?,
            "--metrics-addr" => self.metrics_addr = Some(value.to_string()),
            "--seed" => self.seed = Some(parse(flag, value)?),
            "--run-seconds" => {
                self.run_seconds = Some(bounded(flag, value, MAX_RUN_SECONDS)?)
            }
            _ => {}
        }
        Ok(())
    }

    pub fn print_help() {
        println!(
            r#"plc-sim - Closed-loop process simulator for a Modbus TCP controller

USAGE:
    plc-sim [OPTIONS]

OPTIONS:
    --host <HOST>            Controller host [env: PLC_HOST] [default: openplc]
    --port <PORT>            Controller Modbus TCP port [env: PLC_PORT] [default: 502]
    --unit-id <ID>           Modbus unit identifier [env: PLC_UNIT_ID] [default: 1]
    --period-ms <MS>         Cycle period [env: PLC_PERIOD_MS] [default: 1000]
    --retries <N>            Connect attempts per sequence [env: PLC_RETRIES] [default: 10]
    --retry-delay-ms <MS>    Delay between connect attempts [env: PLC_RETRY_DELAY_MS] [default: 5000]
    --io-timeout-ms <MS>     Ceiling on each connect/read/write [env: PLC_IO_TIMEOUT_MS] [default: 1500]
    --status-every <N>       Emit a status record every N cycles [env: PLC_STATUS_EVERY] [default: 10]
    --standalone             Run the model without any controller link
    --run-seconds <SECS>     Run for a fixed duration then exit
    --json-logs              Output logs in JSON format (for log aggregation)
    --status-json            Also print status records as JSON lines on stdout
    --metrics-addr <ADDR>    Enable Prometheus metrics server on address [env: PLC_METRICS_ADDR]
    --seed <N>               Seed the process noise for reproducible runs [env: PLC_SEED]
    -h, --help               Print this help message

ENVIRONMENT VARIABLES:
    RUST_LOG                 Set log filter (e.g., RUST_LOG=debug,plant_core=trace)

EXAMPLES:
    # Talk to a local OpenPLC runtime
    plc-sim --host 127.0.0.1

    # Short offline run with machine-readable status
    plc-sim --standalone --run-seconds 10 --status-json
"#
        );
    }
}
