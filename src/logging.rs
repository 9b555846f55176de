//! Logging setup
//!
//! Logs always go to stderr; stdout belongs to the wire protocol.
//!
//! Environment:
//! - `CAPGATE_LOG`: filter directive, falls back to `RUST_LOG`, then `info`
//! - `CAPGATE_LOG_FORMAT`: `json` for structured output, anything else is text
//! - `CAPGATE_LOG_DIR`: also write a daily rolling `capgate.log` there

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

use crate::core::{KernelError, KernelResult};

pub const LOG_ENV: &str = "CAPGATE_LOG";
pub const LOG_FORMAT_ENV: &str = "CAPGATE_LOG_FORMAT";
pub const LOG_DIR_ENV: &str = "CAPGATE_LOG_DIR";

/// HTTP stack crates are held at warn unless the directive names them
const DEFAULT_DIRECTIVE: &str = "info,hyper=warn,hyper_util=warn,reqwest=warn,h2=warn,rustls=warn";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "json" => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub directive: String,
    pub format: LogFormat,
    pub dir: Option<PathBuf>,
}

impl LogSettings {
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            directive: pick_directive(var(LOG_ENV), var("RUST_LOG")),
            format: LogFormat::parse(var(LOG_FORMAT_ENV).as_deref()),
            dir: var(LOG_DIR_ENV).map(PathBuf::from),
        }
    }
}

fn pick_directive(own: Option<String>, rust_log: Option<String>) -> String {
    own.or(rust_log).unwrap_or_else(|| DEFAULT_DIRECTIVE.to_string())
}

/// Keeps the file writer flushing; drop it only at shutdown
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// Initialize the global subscriber from the environment
pub fn init_logging() -> KernelResult<LogGuard> {
    init_with(&LogSettings::from_env())
}

pub fn init_with(settings: &LogSettings) -> KernelResult<LogGuard> {
    let filter = EnvFilter::try_new(&settings.directive).map_err(|e| {
        KernelError::invalid_config(format!("bad log filter '{}': {}", settings.directive, e))
    })?;

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    layers.push(match settings.format {
        LogFormat::Text => fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(std::io::stderr).boxed(),
    });

    let guard = match &settings.dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, "capgate.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            layers.push(fmt::layer().with_ansi(false).with_writer(writer).boxed());
            Some(guard)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| KernelError::other(format!("failed to install logger: {}", e)))?;

    if let Some(dir) = &settings.dir {
        tracing::info!("File logging enabled in {}", dir.display());
    }

    Ok(LogGuard { _file: guard })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_precedence() {
        assert_eq!(
            pick_directive(Some("debug".into()), Some("trace".into())),
            "debug"
        );
        assert_eq!(pick_directive(None, Some("trace".into())), "trace");
        assert_eq!(pick_directive(None, None), DEFAULT_DIRECTIVE);
        assert!(EnvFilter::try_new(DEFAULT_DIRECTIVE).is_ok());
    }

    #[test]
    fn test_log_format() {
        assert_eq!(LogFormat::parse(Some("JSON")), LogFormat::Json);
        assert_eq!(LogFormat::parse(Some("text")), LogFormat::Text);
        assert_eq!(LogFormat::parse(None), LogFormat::Text);
    }

    #[test]
    fn test_bad_directive_is_config_error() {
        let settings = LogSettings {
            directive: "capgate=verbose".into(),
            format: LogFormat::Text,
            dir: None,
        };
        assert!(matches!(
            init_with(&settings),
            Err(KernelError::InvalidConfig(_))
        ));
    }
}
