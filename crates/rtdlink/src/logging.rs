//! Stderr logging for the `rtdlink` binary.
//!
//! `--log-level` applies one level to every crate. Setting `RTDLINK_LOG`
//! replaces it with `EnvFilter` directives, e.g.
//! `RTDLINK_LOG=rtdlink_frame=trace,info` to watch frame reassembly while
//! keeping per-patch board events at info.

use clap::ValueEnum;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

/// Environment variable holding per-crate filter directives.
pub const LOG_ENV: &str = "RTDLINK_LOG";

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Filter from `RTDLINK_LOG` when it parses, else from `level`.
fn build_filter(level: LogLevel, directives: Option<&str>) -> (EnvFilter, Option<ParseError>) {
    match directives.map(EnvFilter::try_new) {
        Some(Ok(filter)) => (filter, None),
        Some(Err(err)) => (EnvFilter::new(level.directive()), Some(err)),
        None => (EnvFilter::new(level.directive()), None),
    }
}

/// Install the stderr subscriber. Stdout is reserved for field output.
///
/// Targets are shown only under `RTDLINK_LOG`, where they are what the
/// directives select on.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let directives = std::env::var(LOG_ENV).ok();
    let (filter, rejected) = build_filter(level, directives.as_deref());
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(directives.is_some() && rejected.is_none());

    match format {
        LogFormat::Text => {
            let _ = builder.try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().try_init();
        }
    }

    if let Some(err) = rejected {
        tracing::warn!(var = LOG_ENV, error = %err, "ignoring invalid log filter");
    }
}
